//! WebSocket protocol over raw TCP: framing, handshake and live connections.

pub mod assembler;
pub mod connection;
pub mod error;
pub mod frame;
pub mod handshake;

pub use assembler::{Message, MessageKind};
pub use connection::{ConnectionConfig, ConnectionEvent, ConnectionState, WriteGuard, WsConnection};
pub use error::{
    CLOSE_GOING_AWAY, CLOSE_MESSAGE_TOO_BIG, CLOSE_NORMAL, CLOSE_PROTOCOL_ERROR, HandshakeError,
    WsError,
};
pub use frame::{DEFAULT_MAX_PAYLOAD_SIZE, Frame, Opcode, read_frame};
pub use handshake::{compute_accept_key, upgrade};
