//! # Observability
//!
//! Tracing subscriber setup and Prometheus metrics.

pub mod metrics;

use crate::config::{LogFormat, VerifierConfig};
use crate::constants::DEFAULT_LOG_FILTER;

/// Install the global tracing subscriber
///
/// `RUST_LOG` takes precedence over the default filter. Returns without error
/// when a subscriber is already installed (tests, repeated CLI invocations).
pub fn init_tracing(config: &VerifierConfig) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| DEFAULT_LOG_FILTER.into());

    let result = match config.log_format {
        LogFormat::Json => tracing_subscriber::fmt()
            .json()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .try_init(),
        LogFormat::Text => tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .try_init(),
    };

    if let Err(e) = result {
        tracing::debug!("Tracing subscriber already initialized: {}", e);
    }
}
