//! Kairo chat server library.
//!
//! Implements the WebSocket protocol directly on top of TCP sockets and runs
//! a small chat protocol (login, presence, broadcast, scheduled delivery) on
//! top of it.

// protocol
pub mod websocket;

// layers
pub mod domain;
pub mod infrastructure;
pub mod ui;
pub mod usecase;

pub mod config;
