//! # SES Domain Verifier
//!
//! Long-running service that handles CloudFormation custom resource events for
//! SES domain identities.
//!
//! ## Overview
//!
//! 1. **Receives lifecycle events** - `POST /events` with a Create, Update or Delete request
//! 2. **Reconciles the identity** - verifies, deletes, or replaces the domain identity in SES
//! 3. **Reports back** - sends exactly one terminal report to the event's `ResponseURL`
//!
//! The verification token is returned in the report's `Data.VerificationToken`
//! so the stack can publish it as a `_amazonses` TXT record.
//!
//! The same server answers `POST /rewrite` for the CDN's directory-root rewrite,
//! and exposes `/metrics`, `/healthz` and `/readyz`.

use anyhow::{Context, Result};
use std::sync::Arc;
use tracing::info;

use ses_domain_verifier::config::VerifierConfig;
use ses_domain_verifier::observability;
use ses_domain_verifier::provider::ses::SesIdentityProvider;
use ses_domain_verifier::reporter::HttpResponseReporter;
use ses_domain_verifier::server::{start_server, ServerState};

#[tokio::main]
async fn main() -> Result<()> {
    // Configure rustls crypto provider FIRST, before any other operations
    // Required for rustls 0.23+ when no default provider is set via features
    rustls::crypto::ring::default_provider()
        .install_default()
        .map_err(|_already_installed| anyhow::anyhow!("Failed to install rustls crypto provider"))?;

    let config = VerifierConfig::from_env();
    observability::init_tracing(&config);

    info!("Starting SES Domain Verifier v{}", env!("CARGO_PKG_VERSION"));
    info!(
        region = %config.region,
        compensate_failed_update = config.compensate_failed_update,
        "Configuration loaded"
    );

    observability::metrics::register_metrics()?;

    let provider = Arc::new(SesIdentityProvider::new(&config).await);
    let reporter = Arc::new(
        HttpResponseReporter::new(config.report_timeout())
            .context("Failed to build terminal report client")?,
    );

    let port = config.metrics_port;
    let state = Arc::new(ServerState::new(provider, reporter, config));
    state.mark_ready();

    start_server(port, state).await?;

    info!("Server stopped");
    Ok(())
}
