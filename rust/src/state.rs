use hangouts_storage_traits::{Command, Hangout, Message};
use serde::Serialize;

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct AppState {
    pub rev: u64,
    pub session: SessionState,
    pub transport: TransportStatus,
    pub presence: Presence,
    pub hangouts: HangoutsState,
    pub toast: Option<String>,
}

impl AppState {
    pub fn empty() -> Self {
        Self {
            rev: 0,
            session: SessionState::LoggedOut,
            transport: TransportStatus::Disconnected,
            presence: Presence::Offline,
            hangouts: HangoutsState::default(),
            toast: None,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum SessionState {
    LoggedOut,
    LoggedIn {
        username: String,
        email: Option<String>,
    },
}

impl SessionState {
    pub fn username(&self) -> Option<&str> {
        match self {
            SessionState::LoggedOut => None,
            SessionState::LoggedIn { username, .. } => Some(username),
        }
    }
}

/// Lifecycle of the duplex channel of the current session.
///
/// `Disconnected -> Connecting -> Open -> Closed | Errored`. There is no
/// transition out of `Closed` or `Errored` until the next login.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TransportStatus {
    Disconnected,
    Connecting,
    Open,
    Closed,
    Errored,
}

impl TransportStatus {
    pub fn is_open(self) -> bool {
        matches!(self, TransportStatus::Open)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Presence {
    Online,
    Offline,
}

/// Relationship store: everything the UI renders about peers.
///
/// Only [`crate::reduce`] produces new values of this type.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HangoutsState {
    pub peers: Vec<Hangout>,
    pub filtered_peers: Vec<Hangout>,
    pub active_peer: Option<Hangout>,
    pub messages: Option<Vec<Message>>,
    pub search_term: String,
    pub lookup_results: Vec<Hangout>,
    pub is_loading: bool,
    pub last_error: Option<String>,
    pub pending_command: Option<PendingCommand>,
}

impl HangoutsState {
    pub fn peer(&self, username: &str) -> Option<&Hangout> {
        self.peers.iter().find(|h| h.username == username)
    }

    pub fn is_active(&self, username: &str) -> bool {
        self.active_peer
            .as_ref()
            .is_some_and(|h| h.username == username)
    }
}

/// Command sent and not yet answered by a state change for the same peer.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct PendingCommand {
    pub command: Command,
    pub username: String,
}

pub(crate) fn now_millis() -> i64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_millis() as i64)
        .unwrap_or(0)
}
