//! Parsing of the lines typed at the prompt.
//!
//! - plain text: message to everyone
//! - `/to alice,bob <text>`: direct message
//! - `/at <RFC3339> <text>`: scheduled message
//! - `/quit`: leave

use kairo_server::infrastructure::dto::websocket::SendMessageRequest;
use kairo_shared::time::parse_rfc3339;
use thiserror::Error;

/// A parsed input line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Send(SendMessageRequest),
    Quit,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CommandError {
    #[error("usage: {0}")]
    Usage(&'static str),

    #[error("'{0}' is not an RFC 3339 timestamp")]
    InvalidTimestamp(String),

    #[error("unknown command '/{0}'")]
    Unknown(String),
}

const TO_USAGE: &str = "/to alice,bob <text>";
const AT_USAGE: &str = "/at <RFC3339> <text>";

/// Parse one non-empty input line.
pub fn parse_command(line: &str) -> Result<Command, CommandError> {
    let line = line.trim();
    let Some(rest) = line.strip_prefix('/') else {
        return Ok(Command::Send(request(line, vec![], None)));
    };

    let (name, args) = split_word(rest);
    match name {
        "quit" => Ok(Command::Quit),
        "to" => {
            let (list, body) = split_word(args);
            let receivers: Vec<String> = list
                .split(',')
                .map(str::trim)
                .filter(|name| !name.is_empty())
                .map(str::to_string)
                .collect();
            if receivers.is_empty() || body.is_empty() {
                return Err(CommandError::Usage(TO_USAGE));
            }
            Ok(Command::Send(request(body, receivers, None)))
        }
        "at" => {
            let (at, body) = split_word(args);
            if at.is_empty() || body.is_empty() {
                return Err(CommandError::Usage(AT_USAGE));
            }
            let deliver_at = parse_rfc3339(at)
                .ok_or_else(|| CommandError::InvalidTimestamp(at.to_string()))?;
            Ok(Command::Send(request(
                body,
                vec![],
                Some(deliver_at.to_rfc3339()),
            )))
        }
        other => Err(CommandError::Unknown(other.to_string())),
    }
}

fn request(body: &str, receivers: Vec<String>, timestamp: Option<String>) -> SendMessageRequest {
    SendMessageRequest {
        body: body.to_string(),
        receivers,
        timestamp,
    }
}

/// Split off the first whitespace-delimited word.
fn split_word(input: &str) -> (&str, &str) {
    let input = input.trim_start();
    match input.split_once(char::is_whitespace) {
        Some((word, rest)) => (word, rest.trim()),
        None => (input, ""),
    }
}
