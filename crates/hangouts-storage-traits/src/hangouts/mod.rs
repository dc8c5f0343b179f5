//! Hangouts module
//!
//! Typed access to the per-user peer collection and the per-conversation
//! message lists. Values are stored as JSON under fixed keys in any
//! [`CacheStore`], so every backend gets this layer for free.

use serde::Serialize;
use serde::de::DeserializeOwned;

pub mod error;
pub mod types;

use self::types::{Hangout, Message};
use crate::{CacheStore, StorageError};

/// Cache key of a user's peer collection
pub fn hangouts_key(username: &str) -> String {
    format!("{username}-hangouts")
}

/// Cache key of the conversation with a peer
pub fn messages_key(peer_username: &str) -> String {
    format!("{peer_username}-messages")
}

/// Repository over peer collections and conversations.
///
/// Reads of a key that was never written fail with
/// [`StorageError::CacheMiss`]; callers decide whether that means "empty".
pub trait PeerRepository {
    /// Peer collection of `username`, in stored order
    fn hangouts(&self, username: &str) -> Result<Vec<Hangout>, StorageError>;

    /// Replace the peer collection of `username`
    fn put_hangouts(&self, username: &str, hangouts: &[Hangout]) -> Result<(), StorageError>;

    /// Messages exchanged with `peer_username`, in insertion order
    fn messages(&self, peer_username: &str) -> Result<Vec<Message>, StorageError>;

    /// Replace the conversation with `peer_username`
    fn put_messages(&self, peer_username: &str, messages: &[Message])
    -> Result<(), StorageError>;

    /// Append one message and return the full conversation
    fn append_message(
        &self,
        peer_username: &str,
        message: Message,
    ) -> Result<Vec<Message>, StorageError> {
        let mut messages = match self.messages(peer_username) {
            Ok(messages) => messages,
            Err(e) if e.is_cache_miss() => Vec::new(),
            Err(e) => return Err(e),
        };
        messages.push(message);
        self.put_messages(peer_username, &messages)?;
        Ok(messages)
    }
}

fn read_json<S, T>(store: &S, key: &str) -> Result<T, StorageError>
where
    S: CacheStore + ?Sized,
    T: DeserializeOwned,
{
    let raw = store
        .get(key)?
        .ok_or_else(|| StorageError::CacheMiss(key.to_string()))?;
    serde_json::from_str(&raw).map_err(|e| StorageError::Deserialization(format!("{key}: {e}")))
}

fn write_json<S, T>(store: &S, key: &str, value: &T) -> Result<(), StorageError>
where
    S: CacheStore + ?Sized,
    T: Serialize + ?Sized,
{
    let raw = serde_json::to_string(value)
        .map_err(|e| StorageError::Serialization(format!("{key}: {e}")))?;
    store.put(key, raw)
}

impl<S> PeerRepository for S
where
    S: CacheStore + ?Sized,
{
    fn hangouts(&self, username: &str) -> Result<Vec<Hangout>, StorageError> {
        read_json(self, &hangouts_key(username))
    }

    fn put_hangouts(&self, username: &str, hangouts: &[Hangout]) -> Result<(), StorageError> {
        write_json(self, &hangouts_key(username), hangouts)
    }

    fn messages(&self, peer_username: &str) -> Result<Vec<Message>, StorageError> {
        read_json(self, &messages_key(peer_username))
    }

    fn put_messages(
        &self,
        peer_username: &str,
        messages: &[Message],
    ) -> Result<(), StorageError> {
        write_json(self, &messages_key(peer_username), messages)
    }
}
