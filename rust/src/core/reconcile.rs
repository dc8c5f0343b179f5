//! Merges inbound protocol events into the persisted peer collection.

use hangouts_storage_traits::{Hangout, HangoutState, Message, PeerRepository, StateRole, StorageError};

use super::store::StoreAction;

#[derive(Debug, thiserror::Error)]
pub enum ReconcileError {
    #[error("malformed frame: {0}")]
    Decode(#[from] serde_json::Error),
    #[error("state {state} is not valid inbound (peer {username})")]
    UnexpectedState {
        username: String,
        state: HangoutState,
    },
    #[error("cache error: {0}")]
    Storage(#[from] StorageError),
}

/// Outcome of one successful reconciliation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reconciliation {
    /// Peer collection as persisted
    pub hangouts: Vec<Hangout>,
    /// `PeerUpdated` when an entry was replaced, `PeerAdded` when appended
    pub action: StoreAction,
    /// Acknowledgement for a peer the collection did not contain
    pub unknown_peer: bool,
    /// Peer-authored message appended to the conversation cache
    pub appended_message: Option<Message>,
}

/// Parses one inbound text frame as a peer.
pub fn decode_frame(text: &str) -> Result<Hangout, ReconcileError> {
    Ok(serde_json::from_str(text)?)
}

/// Loads the collection of `local_username`, treating a never-written key as empty.
pub fn load_hangouts<R>(repo: &R, local_username: &str) -> Result<Vec<Hangout>, StorageError>
where
    R: PeerRepository + ?Sized,
{
    match repo.hangouts(local_username) {
        Ok(hangouts) => Ok(hangouts),
        Err(e) if e.is_cache_miss() => Ok(Vec::new()),
        Err(e) => Err(e),
    }
}

/// Loads the conversation with `peer_username`, treating a never-written key as empty.
pub fn load_messages<R>(repo: &R, peer_username: &str) -> Result<Vec<Message>, StorageError>
where
    R: PeerRepository + ?Sized,
{
    match repo.messages(peer_username) {
        Ok(messages) => Ok(messages),
        Err(e) if e.is_cache_miss() => Ok(Vec::new()),
        Err(e) => Err(e),
    }
}

/// Applies `inbound` to the collection of `local_username` and persists it.
///
/// Acknowledgements replace the entry with the same username; request states
/// append when absent. The collection is persisted before any embedded
/// message, so the cache is untouched when this returns an error. A message
/// that cannot be cached is logged and left out of `appended_message`.
pub fn reconcile<R>(
    repo: &R,
    local_username: &str,
    inbound: Hangout,
) -> Result<Reconciliation, ReconcileError>
where
    R: PeerRepository + ?Sized,
{
    let role = inbound.state.role();
    if role == StateRole::Pending {
        return Err(ReconcileError::UnexpectedState {
            username: inbound.username,
            state: inbound.state,
        });
    }

    let mut hangouts = load_hangouts(repo, local_username)?;
    let position = hangouts.iter().position(|h| h.username == inbound.username);

    let mut unknown_peer = false;
    let action = match (role, position) {
        (_, Some(idx)) => {
            hangouts[idx] = inbound.clone();
            StoreAction::PeerUpdated(inbound.clone())
        }
        (StateRole::Acknowledgement, None) => {
            tracing::warn!(
                local = %local_username,
                peer = %inbound.username,
                state = %inbound.state,
                "acknowledgement for unknown peer; appending"
            );
            unknown_peer = true;
            hangouts.push(inbound.clone());
            StoreAction::PeerAdded(inbound.clone())
        }
        (_, None) => {
            hangouts.push(inbound.clone());
            StoreAction::PeerAdded(inbound.clone())
        }
    };

    repo.put_hangouts(local_username, &hangouts)?;

    // The collection is the source of truth; a lost message is not worth failing the event for.
    let appended_message = match &inbound.message {
        Some(message) if inbound.state.peer_authored_message() => {
            match repo.append_message(&inbound.username, message.clone()) {
                Ok(_) => Some(message.clone()),
                Err(e) => {
                    tracing::warn!(
                        peer = %inbound.username,
                        err = %e,
                        "inbound message not cached"
                    );
                    None
                }
            }
        }
        _ => None,
    };

    tracing::debug!(
        local = %local_username,
        peer = %inbound.username,
        state = %inbound.state,
        action = action.tag(),
        "reconciled"
    );

    Ok(Reconciliation {
        hangouts,
        action,
        unknown_peer,
        appended_message,
    })
}
