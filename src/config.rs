//! # Verifier Configuration
//!
//! Process-level settings loaded from environment variables.

use std::time::Duration;

use crate::constants::{
    DEFAULT_AWS_REGION, DEFAULT_INDEX_DOCUMENT, DEFAULT_METRICS_PORT, DEFAULT_REPORT_TIMEOUT_SECS,
};

/// Log output format
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    Text,
    Json,
}

impl LogFormat {
    fn parse(value: &str) -> Self {
        if value.eq_ignore_ascii_case("json") {
            LogFormat::Json
        } else {
            LogFormat::Text
        }
    }
}

/// Verifier configuration
///
/// All settings have sensible defaults and can be overridden via environment variables.
#[derive(Debug, Clone)]
pub struct VerifierConfig {
    /// AWS region of the SES endpoint (`AWS_REGION`)
    pub region: String,
    /// Optional SES endpoint override, e.g. a local mock server (`SES_ENDPOINT_URL`)
    pub ses_endpoint_url: Option<String>,
    /// HTTP server port (`METRICS_PORT`)
    pub metrics_port: u16,
    /// Timeout for the terminal report `PUT` (`REPORT_TIMEOUT_SECS`)
    pub report_timeout_secs: u64,
    /// Document appended to directory-style paths (`DEFAULT_INDEX_DOCUMENT`)
    pub default_index_document: String,
    /// Re-verify the old domain when the create half of an update fails
    /// (`COMPENSATE_FAILED_UPDATE`)
    pub compensate_failed_update: bool,
    /// Log format (`LOG_FORMAT`: json, text)
    pub log_format: LogFormat,
}

impl Default for VerifierConfig {
    fn default() -> Self {
        Self {
            region: DEFAULT_AWS_REGION.to_string(),
            ses_endpoint_url: None,
            metrics_port: DEFAULT_METRICS_PORT,
            report_timeout_secs: DEFAULT_REPORT_TIMEOUT_SECS,
            default_index_document: DEFAULT_INDEX_DOCUMENT.to_string(),
            compensate_failed_update: false,
            log_format: LogFormat::Text,
        }
    }
}

impl VerifierConfig {
    /// Load configuration from environment variables with defaults
    pub fn from_env() -> Self {
        Self {
            region: std::env::var("AWS_REGION")
                .or_else(|_| std::env::var("AWS_DEFAULT_REGION"))
                .unwrap_or_else(|_| DEFAULT_AWS_REGION.to_string()),
            ses_endpoint_url: std::env::var("SES_ENDPOINT_URL")
                .ok()
                .filter(|v| !v.trim().is_empty()),
            metrics_port: env_var_or_default("METRICS_PORT", DEFAULT_METRICS_PORT),
            report_timeout_secs: env_var_or_default(
                "REPORT_TIMEOUT_SECS",
                DEFAULT_REPORT_TIMEOUT_SECS,
            ),
            default_index_document: env_var_or_default_str(
                "DEFAULT_INDEX_DOCUMENT",
                DEFAULT_INDEX_DOCUMENT,
            ),
            compensate_failed_update: env_var_or_default_bool("COMPENSATE_FAILED_UPDATE", false),
            log_format: LogFormat::parse(&env_var_or_default_str("LOG_FORMAT", "text")),
        }
    }

    /// Get report delivery timeout duration
    pub fn report_timeout(&self) -> Duration {
        Duration::from_secs(self.report_timeout_secs)
    }
}

/// Read environment variable or return default value
fn env_var_or_default<T: std::str::FromStr>(key: &str, default: T) -> T {
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

/// Read environment variable as boolean or return default
fn env_var_or_default_bool(key: &str, default: bool) -> bool {
    std::env::var(key)
        .ok()
        .map_or(default, |v| parse_bool(&v))
}

/// Read environment variable as string or return default
fn env_var_or_default_str(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}

fn parse_bool(value: &str) -> bool {
    matches!(
        value.trim().to_lowercase().as_str(),
        "true" | "1" | "yes" | "on"
    )
}
