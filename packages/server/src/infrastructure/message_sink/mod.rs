//! MessageSink implementations.

mod websocket;
