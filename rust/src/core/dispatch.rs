// Outbound command envelopes.

use hangouts_storage_traits::{Command, Hangout, Message};
use serde::Serialize;

/// Flat wire form of a command: the peer's fields minus `state`, plus `command`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CommandEnvelope {
    pub username: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    pub command: Command,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<Message>,
}

impl CommandEnvelope {
    pub fn to_json(&self) -> Result<String, DispatchError> {
        Ok(serde_json::to_string(self)?)
    }
}

#[derive(Debug, thiserror::Error)]
pub enum DispatchError {
    #[error("transport is not open")]
    TransportNotOpen,
    #[error("not logged in")]
    NotLoggedIn,
    #[error("unknown peer: {0}")]
    UnknownPeer(String),
    #[error("failed to encode command: {0}")]
    Encode(#[from] serde_json::Error),
}

/// Builds the envelope for `command` addressed to `peer`.
///
/// `INVITE` and `MESSAGE` embed a fresh message authored by `local_username`
/// and stamped with `now_ms`; the other commands never carry one.
pub fn build_envelope(
    command: Command,
    peer: &Hangout,
    local_username: &str,
    text: Option<&str>,
    now_ms: i64,
) -> CommandEnvelope {
    let message = command.carries_message().then(|| Message {
        text: text.unwrap_or_default().to_string(),
        timestamp: now_ms,
        username: local_username.to_string(),
    });
    CommandEnvelope {
        username: peer.username.clone(),
        email: peer.email.clone(),
        command,
        message,
    }
}

/// Presence announcement sent once the channel opens.
pub fn online_envelope(local_username: &str, local_email: Option<&str>) -> CommandEnvelope {
    CommandEnvelope {
        username: local_username.to_string(),
        email: local_email.map(ToString::to_string),
        command: Command::Online,
        message: None,
    }
}
