//! # Constants
//!
//! Shared constants used throughout the verifier.
//!
//! These values represent reasonable defaults and can be overridden via
//! environment variables where applicable.

/// Default HTTP server port for lifecycle events, metrics and health probes
pub const DEFAULT_METRICS_PORT: u16 = 8080;

/// Default AWS region for the SES client
pub const DEFAULT_AWS_REGION: &str = "us-east-1";

/// Default timeout for delivering a terminal report to the orchestrator (seconds)
pub const DEFAULT_REPORT_TIMEOUT_SECS: u64 = 10;

/// Document appended to directory-style request paths
pub const DEFAULT_INDEX_DOCUMENT: &str = "index.html";

/// Default tracing filter when `RUST_LOG` is not set
pub const DEFAULT_LOG_FILTER: &str = "ses_domain_verifier=info,sesctl=info";

/// Prefix of the physical resource id reported when a Create fails before any
/// identity exists. A later Delete carrying this id has nothing to remove.
pub const FAILED_RESOURCE_ID_PREFIX: &str = "ses-domain-verifier-failed-";

/// Record name prefix SES looks up for the verification token
pub const VERIFICATION_RECORD_PREFIX: &str = "_amazonses";

/// TTL for the TXT and MX records derived from a verification (30 minutes)
pub const DNS_RECORD_TTL_SECS: u32 = 1800;

/// MX priority for the regional inbound SMTP endpoint
pub const INBOUND_MX_PRIORITY: u16 = 10;

/// Maximum length of a fully-qualified domain name
pub const MAX_DOMAIN_LENGTH: usize = 253;
