//! Error types for the hangouts module

use std::fmt;

/// Error types for parsing hangout vocabulary
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HangoutError {
    /// Value is not a known hangout state
    UnknownState(String),
    /// Value is not a known command
    UnknownCommand(String),
}

impl std::error::Error for HangoutError {}

impl fmt::Display for HangoutError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::UnknownState(value) => write!(f, "Unknown hangout state: {value}"),
            Self::UnknownCommand(value) => write!(f, "Unknown command: {value}"),
        }
    }
}
