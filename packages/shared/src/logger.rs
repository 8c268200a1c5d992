//! Logging setup utilities shared by the server and client binaries.

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Output format of the fmt layer, picked once at startup.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, clap::ValueEnum)]
pub enum LogFormat {
    /// Multi-field default formatter of `tracing-subscriber`.
    #[default]
    Full,
    /// Single-line formatter, handy when many connections log at once.
    Compact,
}

/// Build the default `EnvFilter` directive used when `RUST_LOG` is unset.
///
/// Every crate of the workspace plus the binary itself log at `default_log_level`.
pub fn default_directive(binary_name: &str, default_log_level: &str) -> String {
    let binary_target = binary_name.replace('-', "_");
    format!(
        "kairo_shared={level},kairo_server={level},kairo_client={level},{binary}={level}",
        level = default_log_level,
        binary = binary_target,
    )
}

/// Initialize the tracing subscriber with the specified default log level.
///
/// The log level can be overridden using the `RUST_LOG` environment variable.
///
/// # Arguments
///
/// * `binary_name` - The name of the binary (e.g., "kairo-server")
/// * `default_log_level` - The default log level (e.g., "debug", "info")
/// * `format` - Output format of log lines
///
/// # Examples
///
/// ```no_run
/// use kairo_shared::logger::{LogFormat, setup_logger};
///
/// setup_logger("kairo-server", "debug", LogFormat::Compact);
/// ```
pub fn setup_logger(binary_name: &str, default_log_level: &str, format: LogFormat) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| default_directive(binary_name, default_log_level).into());

    let (full, compact) = match format {
        LogFormat::Full => (Some(tracing_subscriber::fmt::layer()), None),
        LogFormat::Compact => (None, Some(tracing_subscriber::fmt::layer().compact())),
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(full)
        .with(compact)
        .init();
}
