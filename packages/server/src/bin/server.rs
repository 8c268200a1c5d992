//! Kairo chat server.
//!
//! Speaks WebSocket directly over TCP and relays chat messages between
//! logged-in users.
//!
//! Run with:
//! ```not_rust
//! cargo run --bin kairo-server
//! cargo run --bin kairo-server -- --host 0.0.0.0 --port 3000 --log-format compact
//! ```

use std::{sync::Arc, time::Duration};

use clap::Parser;
use kairo_server::{
    config::{DEFAULT_HOST, DEFAULT_PORT, ServerConfig},
    ui::{AppState, Server},
    websocket::{ConnectionConfig, DEFAULT_MAX_PAYLOAD_SIZE},
};
use kairo_shared::{
    logger::{LogFormat, setup_logger},
    time::SystemClock,
};

#[derive(Parser, Debug)]
#[command(name = "kairo-server")]
#[command(about = "WebSocket chat server over raw TCP", long_about = None)]
struct Args {
    /// Host address to bind the server to
    #[arg(short = 'H', long, default_value = DEFAULT_HOST)]
    host: String,

    /// Port number to bind the server to
    #[arg(short = 'p', long, default_value_t = DEFAULT_PORT)]
    port: u16,

    /// Log output format
    #[arg(long, value_enum, default_value_t = LogFormat::Full)]
    log_format: LogFormat,

    /// How often scheduled messages are checked, in milliseconds
    #[arg(long, default_value_t = 1000)]
    scheduler_interval_ms: u64,

    /// Largest accepted frame payload, in bytes
    #[arg(long, default_value_t = DEFAULT_MAX_PAYLOAD_SIZE)]
    max_frame_size: usize,
}

#[tokio::main]
async fn main() {
    let args = Args::parse();

    // Initialize tracing
    setup_logger(env!("CARGO_BIN_NAME"), "debug", args.log_format);

    let config = ServerConfig {
        host: args.host,
        port: args.port,
        scheduler_interval: Duration::from_millis(args.scheduler_interval_ms.max(1)),
        connection: ConnectionConfig {
            max_payload_size: args.max_frame_size,
            ..ConnectionConfig::default()
        },
    };

    let state = Arc::new(AppState::in_memory(Arc::new(SystemClock)));
    let server = Server::new(state, config);
    if let Err(e) = server.run().await {
        tracing::error!("Server error: {}", e);
        std::process::exit(1);
    }
}
