//! UseCase 層のエラー型

use thiserror::Error;

/// Login failures. Each maps to a `login_status` value.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LoginError {
    #[error("bad username: {0}")]
    BadUsername(String),

    #[error("already logged in")]
    AlreadyLoggedIn,
}

impl LoginError {
    /// Value sent to the client as `login_status`.
    pub fn as_status(&self) -> &'static str {
        match self {
            Self::BadUsername(_) => "bad_username",
            Self::AlreadyLoggedIn => "already_logged_in",
        }
    }
}

/// `send_message` failures. The display text is the `send_fail` reason.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SendMessageError {
    #[error("not logged in")]
    NotLoggedIn,

    #[error("data is not a map")]
    NotAMap,

    #[error("invalid message payload")]
    InvalidPayload,

    #[error("invalid receivers")]
    InvalidReceivers,
}
