//! Error types for the WebSocket protocol layer.

use std::io;

use thiserror::Error;

/// Close status code for a protocol violation (RFC 6455 Section 7.4.1).
pub const CLOSE_PROTOCOL_ERROR: u16 = 1002;
/// Close status code for a message too big to process.
pub const CLOSE_MESSAGE_TOO_BIG: u16 = 1009;
/// Close status code sent when the server goes away.
pub const CLOSE_GOING_AWAY: u16 = 1001;
/// Close status code for a normal closure.
pub const CLOSE_NORMAL: u16 = 1000;

/// Frame and connection level errors
#[derive(Debug, Error)]
pub enum WsError {
    /// The underlying stream failed or ended before a full frame arrived
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// Opcode outside the set defined by RFC 6455
    #[error("invalid opcode: 0x{0:X}")]
    InvalidOpcode(u8),

    /// Declared payload length exceeds the configured limit
    #[error("payload too large: {size} bytes (max: {max})")]
    PayloadTooLarge { size: u64, max: usize },

    /// A Text or Binary frame started while a fragmented message was open
    #[error("new data frame interleaved with a fragmented message")]
    InterleavedMessage,

    /// A write was attempted after the connection was closed
    #[error("connection already closed")]
    ConnectionClosed,
}

impl WsError {
    /// Close status code to send to the peer before giving up, if any.
    ///
    /// I/O failures get none: the socket is already unusable.
    pub fn close_code(&self) -> Option<u16> {
        match self {
            Self::InvalidOpcode(_) | Self::InterleavedMessage => Some(CLOSE_PROTOCOL_ERROR),
            Self::PayloadTooLarge { .. } => Some(CLOSE_MESSAGE_TOO_BIG),
            Self::Io(_) | Self::ConnectionClosed => None,
        }
    }
}

/// Errors raised while upgrading a TCP stream to a WebSocket connection
#[derive(Debug, Error)]
pub enum HandshakeError {
    #[error("I/O error during handshake: {0}")]
    Io(#[from] io::Error),

    #[error("connection closed before the handshake completed")]
    UnexpectedEof,

    #[error("HTTP request head exceeds {0} bytes")]
    RequestHeadTooLarge(usize),

    #[error("HTTP request line too short")]
    RequestLineTooShort,

    #[error("HTTP request line format invalid")]
    InvalidRequestLine,

    #[error("HTTP method '{0}' not allowed")]
    MethodNotAllowed(String),

    #[error("invalid HTTP header line: '{0}'")]
    InvalidHeader(String),

    #[error("HTTP header '{0}' not present")]
    MissingHeader(&'static str),
}
