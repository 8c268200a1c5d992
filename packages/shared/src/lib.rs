//! Utilities shared by the Kairo server and client.

pub mod logger;
pub mod time;
