#[derive(Debug, Clone)]
pub enum AppAction {
    // Session
    Login {
        username: String,
        email: Option<String>,
    },
    Logout,

    // Search
    SearchChanged {
        term: String,
    },
    Search,

    // Selection
    SelectPeer {
        username: String,
    },
    SelectUser {
        username: String,
    },

    // Commands
    Invite {
        username: String,
        text: String,
    },
    Accept {
        username: String,
    },
    Decline {
        username: String,
    },
    Block {
        username: String,
    },
    Unblock {
        username: String,
    },
    SendMessage {
        username: String,
        text: String,
    },

    // UI
    ClearError,
}

impl AppAction {
    /// Log-safe action tag (never includes message text).
    pub fn tag(&self) -> &'static str {
        match self {
            // Session
            AppAction::Login { .. } => "Login",
            AppAction::Logout => "Logout",

            // Search
            AppAction::SearchChanged { .. } => "SearchChanged",
            AppAction::Search => "Search",

            // Selection
            AppAction::SelectPeer { .. } => "SelectPeer",
            AppAction::SelectUser { .. } => "SelectUser",

            // Commands
            AppAction::Invite { .. } => "Invite",
            AppAction::Accept { .. } => "Accept",
            AppAction::Decline { .. } => "Decline",
            AppAction::Block { .. } => "Block",
            AppAction::Unblock { .. } => "Unblock",
            AppAction::SendMessage { .. } => "SendMessage",

            // UI
            AppAction::ClearError => "ClearError",
        }
    }
}
