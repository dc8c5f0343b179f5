//! Peer repository test functions

use hangouts_storage_traits::{
    CacheStore, HangoutState, PeerRepository, StorageError, hangouts::hangouts_key,
};

use super::{create_test_hangout, create_test_message};

/// Reading a collection that was never written is a cache miss, not an empty list
pub fn test_missing_collection_is_cache_miss<S>(storage: S)
where
    S: CacheStore,
{
    let err = storage.hangouts("alice").unwrap_err();
    assert_eq!(err, StorageError::CacheMiss("alice-hangouts".to_string()));

    let err = storage.messages("bob").unwrap_err();
    assert!(err.is_cache_miss());
}

/// A collection written and read back is structurally equal and keeps its order
pub fn test_hangouts_round_trip<S>(storage: S)
where
    S: CacheStore,
{
    let bob = create_test_hangout("bob", HangoutState::Accepted).with_message(
        create_test_message("bob", "hello", 1_700_000_000_000),
    );
    let carol = create_test_hangout("carol", HangoutState::Blocked);
    let dave = hangouts_storage_traits::Hangout::new("dave", HangoutState::Inviter);
    let collection = vec![bob, carol, dave];

    storage.put_hangouts("alice", &collection).unwrap();
    assert_eq!(storage.hangouts("alice").unwrap(), collection);

    // Other users are unaffected
    assert!(storage.hangouts("zed").unwrap_err().is_cache_miss());
}

/// A put replaces the whole value
pub fn test_put_replaces<S>(storage: S)
where
    S: CacheStore,
{
    storage
        .put_hangouts(
            "alice",
            &[
                create_test_hangout("bob", HangoutState::Inviter),
                create_test_hangout("carol", HangoutState::Inviter),
            ],
        )
        .unwrap();
    storage
        .put_hangouts("alice", &[create_test_hangout("bob", HangoutState::Accepted)])
        .unwrap();

    let stored = storage.hangouts("alice").unwrap();
    assert_eq!(stored.len(), 1);
    assert_eq!(stored[0].state, HangoutState::Accepted);

    storage.put_hangouts("alice", &[]).unwrap();
    assert!(storage.hangouts("alice").unwrap().is_empty());
}

/// Messages keep insertion order, never timestamp order
pub fn test_append_message_keeps_insertion_order<S>(storage: S)
where
    S: CacheStore,
{
    let first = create_test_message("alice", "later clock", 2_000);
    let second = create_test_message("bob", "earlier clock", 1_000);

    let after_first = storage.append_message("bob", first.clone()).unwrap();
    assert_eq!(after_first, vec![first.clone()]);

    let after_second = storage.append_message("bob", second.clone()).unwrap();
    assert_eq!(after_second, vec![first.clone(), second.clone()]);
    assert_eq!(storage.messages("bob").unwrap(), vec![first, second]);
}

/// Corrupt JSON under a known key surfaces as a deserialization error
pub fn test_corrupt_value_is_deserialization_error<S>(storage: S)
where
    S: CacheStore,
{
    storage
        .put(&hangouts_key("alice"), "{not json".to_string())
        .unwrap();
    let err = storage.hangouts("alice").unwrap_err();
    assert!(matches!(err, StorageError::Deserialization(_)), "{err:?}");
}

/// Raw key/value access
pub fn test_raw_get_put<S>(storage: S)
where
    S: CacheStore,
{
    assert_eq!(storage.get("k").unwrap(), None);
    storage.put("k", "v1".to_string()).unwrap();
    assert_eq!(storage.get("k").unwrap().as_deref(), Some("v1"));
    storage.put("k", "v2".to_string()).unwrap();
    assert_eq!(storage.get("k").unwrap().as_deref(), Some("v2"));
}
