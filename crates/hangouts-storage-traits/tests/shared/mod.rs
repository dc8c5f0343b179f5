//! Backend-independent test functions

#![allow(dead_code)]

use hangouts_storage_traits::{Hangout, HangoutState, Message};

pub mod repository_tests;

pub fn create_test_hangout(username: &str, state: HangoutState) -> Hangout {
    Hangout::new(username, state).with_email(format!("{username}@example.com"))
}

pub fn create_test_message(username: &str, text: &str, timestamp: i64) -> Message {
    Message {
        text: text.to_string(),
        timestamp,
        username: username.to_string(),
    }
}
