//! # Amazon SES Identity Provider
//!
//! Implements `IdentityProvider` against the SES v1 API:
//! - `VerifyDomainIdentity` mints the verification token
//! - `DeleteIdentity` removes the identity
//!
//! SDK retries are disabled; every operation is exactly one request.

use async_trait::async_trait;
use aws_config::retry::RetryConfig;
use aws_config::{BehaviorVersion, Region};
use aws_sdk_ses::error::{DisplayErrorContext, ProvideErrorMetadata, SdkError};
use aws_sdk_ses::Client as SesClient;
use std::time::Instant;
use tracing::{info, info_span, warn, Instrument};

use crate::config::VerifierConfig;
use crate::observability::metrics;
use crate::provider::{IdentityProvider, ProviderError};

/// Error codes SES uses for a missing identity
const NOT_FOUND_CODES: &[&str] = &["NotFound", "NotFoundException", "ResourceNotFoundException"];

/// Error codes worth a later retry by the orchestrator
const TRANSIENT_CODES: &[&str] = &[
    "Throttling",
    "ThrottlingException",
    "TooManyRequestsException",
    "ServiceUnavailable",
    "InternalFailure",
    "RequestTimeout",
];

/// Amazon SES provider implementation
#[derive(Debug, Clone)]
pub struct SesIdentityProvider {
    client: SesClient,
    region: String,
}

impl SesIdentityProvider {
    /// Create a new SES client from the default credential chain
    pub async fn new(config: &VerifierConfig) -> Self {
        let mut builder = aws_config::defaults(BehaviorVersion::latest())
            .region(Region::new(config.region.clone()))
            .retry_config(RetryConfig::disabled());

        if let Some(endpoint) = &config.ses_endpoint_url {
            info!("Overriding SES endpoint to {}", endpoint);
            builder = builder.endpoint_url(endpoint);
        }

        let sdk_config = builder.load().await;
        info!(region = %config.region, "SES identity provider initialized");
        Self::from_client(SesClient::new(&sdk_config), &config.region)
    }

    /// Wrap an already configured SES client
    pub fn from_client(client: SesClient, region: &str) -> Self {
        Self {
            client,
            region: region.to_string(),
        }
    }

    pub fn region(&self) -> &str {
        &self.region
    }
}

#[async_trait]
impl IdentityProvider for SesIdentityProvider {
    async fn verify_identity(&self, domain: &str) -> Result<String, ProviderError> {
        let span = info_span!("ses.identity.verify", domain = domain, region = %self.region);
        let start = Instant::now();

        async move {
            let result = self
                .client
                .verify_domain_identity()
                .domain(domain)
                .send()
                .await;

            match result {
                Ok(output) => {
                    metrics::record_provider_operation(
                        "verify",
                        "success",
                        start.elapsed().as_secs_f64(),
                    );
                    info!(
                        provider = "ses",
                        domain = domain,
                        operation = "verify",
                        "Verification requested for domain {}",
                        domain
                    );
                    Ok(output.verification_token().to_string())
                }
                Err(e) => {
                    let error = classify_sdk_error(&e);
                    metrics::record_provider_operation(
                        "verify",
                        error.kind(),
                        start.elapsed().as_secs_f64(),
                    );
                    warn!(
                        provider = "ses",
                        domain = domain,
                        operation = "verify",
                        error.kind = error.kind(),
                        error_details = %DisplayErrorContext(&e),
                        "Failed to verify domain identity {}: {}",
                        domain,
                        error
                    );
                    Err(error)
                }
            }
        }
        .instrument(span)
        .await
    }

    async fn delete_identity(&self, domain: &str) -> Result<(), ProviderError> {
        let span = info_span!("ses.identity.delete", domain = domain, region = %self.region);
        let start = Instant::now();

        async move {
            let result = self.client.delete_identity().identity(domain).send().await;

            match result {
                Ok(_) => {
                    metrics::record_provider_operation(
                        "delete",
                        "success",
                        start.elapsed().as_secs_f64(),
                    );
                    info!(
                        provider = "ses",
                        domain = domain,
                        operation = "delete",
                        "Deleted domain identity {}",
                        domain
                    );
                    Ok(())
                }
                Err(e) => {
                    let error = classify_sdk_error(&e);
                    metrics::record_provider_operation(
                        "delete",
                        error.kind(),
                        start.elapsed().as_secs_f64(),
                    );
                    warn!(
                        provider = "ses",
                        domain = domain,
                        operation = "delete",
                        error.kind = error.kind(),
                        error_details = %DisplayErrorContext(&e),
                        "Failed to delete domain identity {}: {}",
                        domain,
                        error
                    );
                    Err(error)
                }
            }
        }
        .instrument(span)
        .await
    }
}

/// Map an SDK failure onto the provider error classes
fn classify_sdk_error<E, R>(error: &SdkError<E, R>) -> ProviderError
where
    E: ProvideErrorMetadata + std::error::Error + 'static,
    R: std::fmt::Debug,
{
    let transport_failure = matches!(
        error,
        SdkError::TimeoutError(_) | SdkError::DispatchFailure(_) | SdkError::ResponseError(_)
    );
    let message = error
        .message()
        .map_or_else(|| DisplayErrorContext(error).to_string(), str::to_string);

    classify(error.code(), transport_failure, message)
}

fn classify(code: Option<&str>, transport_failure: bool, message: String) -> ProviderError {
    if transport_failure {
        return ProviderError::Transient(message);
    }

    match code {
        Some(code) if NOT_FOUND_CODES.contains(&code) => ProviderError::NotFound(message),
        Some(code) if TRANSIENT_CODES.contains(&code) => ProviderError::Transient(message),
        _ => ProviderError::Rejected(message),
    }
}
