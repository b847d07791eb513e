// Logging module for structured logging using the tracing crate

use crate::config::LoggingConfig;
use std::error::Error;
use tracing_subscriber::{fmt, EnvFilter};

/// Initialize the tracing subscriber for structured logging
///
/// The filter comes from `RUST_LOG` when it is set and valid, otherwise from
/// `config.level`. Output goes to stderr so that command output on stdout
/// stays machine-readable, either as human-readable lines or as JSON when
/// `config.json` is set.
///
/// # Errors
///
/// Returns an error if a global subscriber is already installed.
///
/// # Examples
///
/// ```
/// use photomark::config::LoggingConfig;
/// use photomark::logging::init_subscriber;
///
/// init_subscriber(&LoggingConfig::default()).expect("Failed to initialize logging");
///
/// tracing::info!("Application started");
/// ```
pub fn init_subscriber(config: &LoggingConfig) -> Result<(), Box<dyn Error + Send + Sync>> {
    let env_filter = build_filter(config);

    if config.json {
        fmt::Subscriber::builder()
            .with_env_filter(env_filter)
            .with_writer(std::io::stderr)
            .json()
            .try_init()
    } else {
        fmt::Subscriber::builder()
            .with_env_filter(env_filter)
            .with_writer(std::io::stderr)
            .with_target(false)
            .try_init()
    }
}

fn build_filter(config: &LoggingConfig) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.level))
}
