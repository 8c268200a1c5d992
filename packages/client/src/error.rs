//! Error types for the chat client.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ClientError {
    /// The server answered `log_in` with something other than "ok".
    #[error("Login as '{username}' was rejected: {status}")]
    LoginRejected { username: String, status: String },

    #[error("Connection error: {0}")]
    ConnectionError(String),
}
