//! Types for the hangouts module

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use super::error::HangoutError;

/// Lifecycle state of a relationship with another user.
///
/// Serialized as the upper-case wire names (`"INVITER"`, `"MESSAGED"`, ...).
/// Anything outside this set fails to decode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum HangoutState {
    /// Selected from lookup results; nothing heard back yet. Local only.
    Invite,
    /// The peer invited the local user
    Inviter,
    /// An invite was accepted
    Accepted,
    /// Confirms an accept
    Accepter,
    /// Confirms a decline sent by the local user
    Decliner,
    /// The local user's invite was declined
    Declined,
    /// Confirms a block sent by the local user
    Blocker,
    /// The local user was blocked
    Blocked,
    /// Confirms an unblock sent by the local user
    Unblocker,
    /// The local user was unblocked
    Unblocked,
    /// The peer sent a message
    Messanger,
    /// Confirms a message sent by the local user
    Messaged,
    /// Confirms an invite sent by the local user
    Invited,
}

/// Partition a [`HangoutState`] belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StateRole {
    /// Local-only pending selection; never valid on the wire inbound
    Pending,
    /// Freshly received, not yet acknowledged; may create a new peer entry
    Request,
    /// Confirmation of a prior command; expected to update an existing entry
    Acknowledgement,
}

impl HangoutState {
    /// All states, in declaration order.
    pub const ALL: [HangoutState; 13] = [
        Self::Invite,
        Self::Inviter,
        Self::Accepted,
        Self::Accepter,
        Self::Decliner,
        Self::Declined,
        Self::Blocker,
        Self::Blocked,
        Self::Unblocker,
        Self::Unblocked,
        Self::Messanger,
        Self::Messaged,
        Self::Invited,
    ];

    /// Which partition this state belongs to
    pub fn role(self) -> StateRole {
        match self {
            Self::Invite => StateRole::Pending,
            Self::Inviter | Self::Accepted => StateRole::Request,
            Self::Accepter
            | Self::Decliner
            | Self::Declined
            | Self::Blocker
            | Self::Blocked
            | Self::Unblocker
            | Self::Unblocked
            | Self::Messanger
            | Self::Messaged
            | Self::Invited => StateRole::Acknowledgement,
        }
    }

    /// Whether a remote event may carry this state
    pub fn is_inbound(self) -> bool {
        !matches!(self.role(), StateRole::Pending)
    }

    /// Whether an embedded message on an event in this state was written by the peer
    pub fn peer_authored_message(self) -> bool {
        matches!(self, Self::Messanger | Self::Inviter)
    }

    /// Wire name
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Invite => "INVITE",
            Self::Inviter => "INVITER",
            Self::Accepted => "ACCEPTED",
            Self::Accepter => "ACCEPTER",
            Self::Decliner => "DECLINER",
            Self::Declined => "DECLINED",
            Self::Blocker => "BLOCKER",
            Self::Blocked => "BLOCKED",
            Self::Unblocker => "UNBLOCKER",
            Self::Unblocked => "UNBLOCKED",
            Self::Messanger => "MESSANGER",
            Self::Messaged => "MESSAGED",
            Self::Invited => "INVITED",
        }
    }
}

impl fmt::Display for HangoutState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for HangoutState {
    type Err = HangoutError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|state| state.as_str() == s)
            .ok_or_else(|| HangoutError::UnknownState(s.to_string()))
    }
}

/// Client-originated request for a state change.
///
/// Commands are never stored as states; the server turns each one into a
/// [`HangoutState`] and relays it to both participants.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Command {
    /// Ask a user to start a hangout
    Invite,
    /// Accept an invite
    Accept,
    /// Decline an invite
    Decline,
    /// Block a peer
    Block,
    /// Lift a block
    Unblock,
    /// Send a text message
    Message,
    /// Announce presence
    Online,
}

impl Command {
    /// Whether the envelope for this command embeds a freshly built message
    pub fn carries_message(self) -> bool {
        matches!(self, Self::Invite | Self::Message)
    }

    /// Wire name
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Invite => "INVITE",
            Self::Accept => "ACCEPT",
            Self::Decline => "DECLINE",
            Self::Block => "BLOCK",
            Self::Unblock => "UNBLOCK",
            Self::Message => "MESSAGE",
            Self::Online => "ONLINE",
        }
    }
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Command {
    type Err = HangoutError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_ascii_uppercase();
        [
            Self::Invite,
            Self::Accept,
            Self::Decline,
            Self::Block,
            Self::Unblock,
            Self::Message,
            Self::Online,
        ]
        .into_iter()
        .find(|command| command.as_str() == normalized)
        .ok_or_else(|| HangoutError::UnknownCommand(s.to_string()))
    }
}

/// One entry of a conversation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    /// Message body
    pub text: String,
    /// Milliseconds since the Unix epoch
    pub timestamp: i64,
    /// Author
    pub username: String,
}

/// A tracked relationship with another user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Hangout {
    /// Identity of the peer; unique within one user's collection
    pub username: String,
    /// Optional contact address
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    /// Current lifecycle state
    pub state: HangoutState,
    /// Message carried by invite and message events
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<Message>,
}

impl Hangout {
    /// Creates a hangout without email or message
    pub fn new(username: impl Into<String>, state: HangoutState) -> Self {
        Self {
            username: username.into(),
            email: None,
            state,
            message: None,
        }
    }

    /// Sets the email
    pub fn with_email(mut self, email: impl Into<String>) -> Self {
        self.email = Some(email.into());
        self
    }

    /// Sets the embedded message
    pub fn with_message(mut self, message: Message) -> Self {
        self.message = Some(message);
        self
    }
}
