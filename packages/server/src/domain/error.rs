//! Domain error types.

use thiserror::Error;

/// Reasons a raw username is refused
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum UsernameError {
    #[error("invalid length {0} (expected 1 to 32 characters)")]
    InvalidLength(usize),

    #[error("invalid character {0:?}")]
    InvalidCharacter(char),
}

/// Errors raised while pushing a message to a connected user
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MessageSinkError {
    /// The recipient's connection is already closed
    #[error("recipient disconnected")]
    Disconnected,

    /// Writing to the recipient failed
    #[error("push failed: {0}")]
    PushFailed(String),
}
