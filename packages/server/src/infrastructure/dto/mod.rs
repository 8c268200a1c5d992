//! Data Transfer Objects (DTOs) for the chat protocol.
//!
//! - `websocket`: JSON envelopes exchanged over the WebSocket connection
//! - `conversion`: domain entity → DTO conversions

pub mod conversion;
pub mod websocket;
