//! Fixtures shared by backend test suites

use crate::hangouts::types::{Hangout, HangoutState, Message};

/// A hangout with an email derived from the username
pub fn create_test_hangout(username: &str, state: HangoutState) -> Hangout {
    Hangout::new(username, state).with_email(format!("{username}@example.com"))
}

/// A message authored by `username`
pub fn create_test_message(username: &str, text: &str, timestamp: i64) -> Message {
    Message {
        text: text.to_string(),
        timestamp,
        username: username.to_string(),
    }
}
