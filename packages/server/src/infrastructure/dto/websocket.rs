//! WebSocket message DTOs.
//!
//! Every message on the wire is a JSON envelope `{"kind": ..., "data": ...}`.
//! Clients send `log_in` and `send_message`; the server answers with one of
//! the [`ServerKind`] kinds.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Client → server: log in with a username string.
pub const KIND_LOG_IN: &str = "log_in";
/// Client → server: send (or schedule) a chat message.
pub const KIND_SEND_MESSAGE: &str = "send_message";

/// `login_status` values.
pub const LOGIN_STATUS_OK: &str = "ok";

/// Envelope received from a client. `data` is kept raw so each kind can
/// validate its own payload.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct InboundEnvelope {
    pub kind: String,
    #[serde(default)]
    pub data: Value,
}

/// Envelope sent by a client.
#[derive(Debug, Clone, Serialize)]
pub struct ClientEnvelope<'a, T: Serialize> {
    pub kind: &'a str,
    pub data: T,
}

/// Server → client envelope kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ServerKind {
    LoginStatus,
    MessageHistory,
    Users,
    UserLoggedIn,
    UserLoggedOut,
    NewMessage,
    SendSuccess,
    SendFail,
    ScheduleSuccess,
    Status,
}

/// Envelope sent by the server.
#[derive(Debug, Serialize)]
pub struct OutboundEnvelope<'a, T: Serialize> {
    pub kind: ServerKind,
    pub data: &'a T,
}

/// Envelope as seen by a client, with the payload left raw.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ServerEnvelope {
    pub kind: ServerKind,
    #[serde(default)]
    pub data: Value,
}

/// Serialize a server envelope to its JSON text.
pub fn encode_envelope<T: Serialize>(
    kind: ServerKind,
    data: &T,
) -> Result<String, serde_json::Error> {
    serde_json::to_string(&OutboundEnvelope { kind, data })
}

/// A persisted chat message on the wire.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessageDto {
    pub id: u64,
    pub sender: String,
    /// Omitted when the message is addressed to everyone.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub receivers: Vec<String>,
    pub timestamp: DateTime<Utc>,
    pub body: String,
}

/// One entry of the `users` list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserPresenceDto {
    pub username: String,
    pub online: bool,
}

/// Payload of `send_success`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SendSuccessDto {
    pub id: u64,
    pub timestamp: DateTime<Utc>,
}

/// Payload of `send_message`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SendMessageRequest {
    pub body: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub receivers: Vec<String>,
    /// RFC 3339 delivery time; absent means "now".
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<String>,
}
