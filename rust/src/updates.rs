use crate::AppAction;
use crate::state::AppState;

#[derive(Clone, Debug)]
pub enum AppUpdate {
    FullState(AppState),
}

impl AppUpdate {
    pub fn rev(&self) -> u64 {
        match self {
            AppUpdate::FullState(s) => s.rev,
        }
    }
}

#[derive(Debug)]
pub enum CoreMsg {
    Action(AppAction),
    Internal(Box<InternalEvent>),
}

/// Results of async work, posted back into the actor mailbox.
///
/// Every event carries the id of the session (or lookup) that started the
/// work, so results arriving after a logout are dropped.
#[derive(Debug)]
pub enum InternalEvent {
    // Transport channel
    TransportOpened {
        session_id: u64,
    },
    TransportClosed {
        session_id: u64,
    },
    TransportErrored {
        session_id: u64,
        error: String,
    },
    FrameReceived {
        session_id: u64,
        text: String,
    },

    // Lookup
    LookupCompleted {
        session_id: u64,
        token: u64,
        result: Result<Vec<hangouts_storage_traits::Hangout>, String>,
    },
}
