//! Server configuration.

use std::time::Duration;

use crate::websocket::ConnectionConfig;

pub const DEFAULT_HOST: &str = "127.0.0.1";
pub const DEFAULT_PORT: u16 = 8080;
pub const DEFAULT_SCHEDULER_INTERVAL: Duration = Duration::from_secs(1);

/// Everything the server needs besides its state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    /// How often due scheduled messages are delivered.
    pub scheduler_interval: Duration,
    pub connection: ConnectionConfig,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: DEFAULT_HOST.to_string(),
            port: DEFAULT_PORT,
            scheduler_interval: DEFAULT_SCHEDULER_INTERVAL,
            connection: ConnectionConfig::default(),
        }
    }
}

impl ServerConfig {
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}
