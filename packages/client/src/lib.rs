//! Terminal chat client for the Kairo server.

pub mod command;
pub mod domain;
pub mod error;
pub mod formatter;
pub mod runner;
pub mod session;
mod ui;

pub use error::ClientError;
pub use runner::run_client;
