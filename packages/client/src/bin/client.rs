//! Terminal chat client with reconnection support.
//!
//! Connects to a Kairo server, logs in with the given username and sends
//! every line typed at the prompt. Automatically reconnects on disconnection
//! (max 5 attempts with 5 second interval). A rejected login exits with 1.
//!
//! Run with:
//! ```not_rust
//! cargo run --bin kairo-client -- --username alice
//! cargo run --bin kairo-client -- -n bob --url ws://127.0.0.1:9000
//! ```

use clap::Parser;

use kairo_shared::logger::{LogFormat, setup_logger};

#[derive(Parser, Debug)]
#[command(name = "kairo-client")]
#[command(about = "Terminal client for the Kairo chat server", long_about = None)]
struct Args {
    /// Username to log in with (must not be in use)
    #[arg(short = 'n', long)]
    username: String,

    /// WebSocket server URL
    #[arg(short = 'u', long, default_value = "ws://127.0.0.1:8080")]
    url: String,

    /// Log output format
    #[arg(long, value_enum, default_value_t = LogFormat::Compact)]
    log_format: LogFormat,
}

#[tokio::main]
async fn main() {
    let args = Args::parse();

    setup_logger(env!("CARGO_BIN_NAME"), "info", args.log_format);

    if let Err(e) = kairo_client::run_client(args.url, args.username).await {
        tracing::error!("Client error: {}", e);
        std::process::exit(1);
    }
}
