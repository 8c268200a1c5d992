//! UI 層: TCP の受付、接続ごとのハンドラ、スケジューラ

pub mod handler;
pub mod scheduler;
pub mod server;
pub mod signal;
pub mod state;

pub use server::Server;
pub use state::AppState;
