//! Domain logic for client-side operations.
//!
//! Pure functions deciding what the runner does after a session ends.

use crate::error::ClientError;

/// Check if the client should exit immediately based on the error type.
///
/// A rejected login will be rejected again on every retry.
pub fn should_exit_immediately(error: &ClientError) -> bool {
    matches!(error, ClientError::LoginRejected { .. })
}

/// Check if the client should attempt to reconnect.
///
/// # Arguments
///
/// * `error` - The client error that occurred
/// * `current_attempt` - The current reconnection attempt count (0-indexed)
/// * `max_attempts` - The maximum number of reconnection attempts allowed
pub fn should_attempt_reconnect(
    error: &ClientError,
    current_attempt: u32,
    max_attempts: u32,
) -> bool {
    if should_exit_immediately(error) {
        return false;
    }

    current_attempt < max_attempts
}
