//! # Lifecycle Reconciler
//!
//! Drives the external identity through its lifecycle:
//!
//! ```text
//! Absent --verify--> PendingVerification --(DNS, out of band)--> Active --delete--> Absent
//! ```
//!
//! The reconciler holds no state of its own. SES is the only system of record
//! for whether an identity exists, so every operation is a function of the
//! request and the provider's answers.
//!
//! Domain identities cannot be renamed. An update is a delete of the old domain
//! followed by a verify of the new one, driven step by step through
//! [`UpdatePipeline`] so a failure is reported as the step it happened in.

use regex::Regex;
use serde::Serialize;
use std::sync::LazyLock;
use thiserror::Error;
use tracing::{info, warn};

use crate::constants::MAX_DOMAIN_LENGTH;
use crate::event::DomainProperties;
use crate::provider::{IdentityProvider, ProviderError};

static DOMAIN_LABEL: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[A-Za-z0-9]([A-Za-z0-9-]{0,61}[A-Za-z0-9])?$")
        .expect("domain label pattern is valid")
});

/// Result of a successful reconciliation
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct VerificationOutcome {
    /// The domain itself; `None` only for the no-op outcome
    pub physical_resource_id: Option<String>,
    /// Present after a Create or the create half of an Update
    pub verification_token: Option<String>,
}

impl VerificationOutcome {
    /// Outcome that carries nothing (unknown request types)
    pub fn empty() -> Self {
        Self::default()
    }

    fn verified(domain: &str, token: String) -> Self {
        Self {
            physical_resource_id: Some(domain.to_string()),
            verification_token: Some(token),
        }
    }

    fn deleted(domain: &str) -> Self {
        Self {
            physical_resource_id: Some(domain.to_string()),
            verification_token: None,
        }
    }
}

/// Position of an update in its delete-then-create sequence
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpdateStep {
    DeletePending,
    CreatePending,
    Done,
}

impl std::fmt::Display for UpdateStep {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            UpdateStep::DeletePending => "delete of the previous identity",
            UpdateStep::CreatePending => "verification of the new identity",
            UpdateStep::Done => "completion",
        })
    }
}

/// What happened to the previous identity after the create half of an update failed
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Compensation {
    /// Compensation disabled, or the failure happened before anything was deleted
    NotAttempted,
    /// The previous domain was verified again
    Restored,
    /// Re-verifying the previous domain failed as well
    Failed(String),
}

impl std::fmt::Display for Compensation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Compensation::NotAttempted => Ok(()),
            Compensation::Restored => f.write_str(" (previous identity re-verified)"),
            Compensation::Failed(e) => write!(f, " (re-verifying previous identity failed: {e})"),
        }
    }
}

#[derive(Debug, Error)]
pub enum ReconcileError {
    /// Missing or malformed domain; no provider call was made
    #[error("invalid {field}: {reason}")]
    Validation { field: &'static str, reason: String },

    #[error("{operation} of identity {domain} failed: {source}")]
    Provider {
        operation: &'static str,
        domain: String,
        #[source]
        source: ProviderError,
    },

    /// An update stopped part way; the state of the previous identity may be
    /// unknown to the caller
    #[error("update from {old_domain} to {new_domain} stopped at {step}: {source}{compensation}")]
    Sequencing {
        step: UpdateStep,
        old_domain: String,
        new_domain: String,
        #[source]
        source: ProviderError,
        compensation: Compensation,
    },
}

impl ReconcileError {
    /// Stable label for metrics and logs
    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            ReconcileError::Validation { .. } => "validation",
            ReconcileError::Provider { .. } => "provider",
            ReconcileError::Sequencing { .. } => "sequencing",
        }
    }

    /// The underlying cause without reconciler context
    pub fn root_message(&self) -> String {
        match self {
            ReconcileError::Validation { reason, .. } => reason.clone(),
            ReconcileError::Provider { source, .. } | ReconcileError::Sequencing { source, .. } => {
                source.message().to_string()
            }
        }
    }
}

/// Validate and normalise the domain of a property set
///
/// Surrounding whitespace and a single trailing dot are removed.
pub fn validate_domain(
    props: &DomainProperties,
    field: &'static str,
) -> Result<String, ReconcileError> {
    let invalid = |reason: String| ReconcileError::Validation { field, reason };

    let raw = props
        .domain
        .as_deref()
        .ok_or_else(|| invalid("Domain is required".to_string()))?;
    let domain = raw.trim();
    let domain = domain.strip_suffix('.').unwrap_or(domain);

    if domain.is_empty() {
        return Err(invalid("Domain must not be empty".to_string()));
    }
    if domain.len() > MAX_DOMAIN_LENGTH {
        return Err(invalid(format!(
            "Domain exceeds {MAX_DOMAIN_LENGTH} characters"
        )));
    }

    let labels: Vec<&str> = domain.split('.').collect();
    if labels.len() < 2 {
        return Err(invalid(format!("'{domain}' is not a fully-qualified domain")));
    }
    if let Some(label) = labels.iter().find(|l| !DOMAIN_LABEL.is_match(l)) {
        return Err(invalid(format!("'{domain}' has an invalid label '{label}'")));
    }

    Ok(domain.to_string())
}

/// Explicit delete-then-create sequence for an update
#[derive(Debug, Clone)]
pub struct UpdatePipeline {
    old_domain: String,
    new_domain: String,
    step: UpdateStep,
    token: Option<String>,
}

impl UpdatePipeline {
    pub fn new(old_domain: impl Into<String>, new_domain: impl Into<String>) -> Self {
        Self {
            old_domain: old_domain.into(),
            new_domain: new_domain.into(),
            step: UpdateStep::DeletePending,
            token: None,
        }
    }

    pub fn step(&self) -> UpdateStep {
        self.step
    }

    /// Execute the pending step and move to the next one
    ///
    /// A failed step leaves the pipeline where it was.
    pub async fn advance(
        &mut self,
        provider: &dyn IdentityProvider,
    ) -> Result<UpdateStep, ProviderError> {
        match self.step {
            UpdateStep::DeletePending => {
                match provider.delete_identity(&self.old_domain).await {
                    Ok(()) => {}
                    Err(e) if e.is_not_found() => {
                        info!(
                            domain = %self.old_domain,
                            "Previous identity already absent"
                        );
                    }
                    Err(e) => return Err(e),
                }
                self.step = UpdateStep::CreatePending;
            }
            UpdateStep::CreatePending => {
                let token = provider.verify_identity(&self.new_domain).await?;
                self.token = Some(token);
                self.step = UpdateStep::Done;
            }
            UpdateStep::Done => {}
        }
        Ok(self.step)
    }

    /// Outcome of a finished pipeline
    pub fn outcome(&self) -> Option<VerificationOutcome> {
        match (self.step, &self.token) {
            (UpdateStep::Done, Some(token)) => {
                Some(VerificationOutcome::verified(&self.new_domain, token.clone()))
            }
            _ => None,
        }
    }
}

/// Executes lifecycle operations against an identity provider
#[derive(Clone, Copy)]
pub struct Reconciler<'a> {
    provider: &'a dyn IdentityProvider,
    compensate_failed_update: bool,
}

impl std::fmt::Debug for Reconciler<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Reconciler")
            .field("compensate_failed_update", &self.compensate_failed_update)
            .finish_non_exhaustive()
    }
}

impl<'a> Reconciler<'a> {
    pub fn new(provider: &'a dyn IdentityProvider) -> Self {
        Self {
            provider,
            compensate_failed_update: false,
        }
    }

    /// Re-verify the old domain when the create half of an update fails
    #[must_use]
    pub fn with_compensation(mut self, enabled: bool) -> Self {
        self.compensate_failed_update = enabled;
        self
    }

    /// Begin verification of `props.Domain`
    pub async fn create(
        &self,
        props: &DomainProperties,
    ) -> Result<VerificationOutcome, ReconcileError> {
        let domain = validate_domain(props, "ResourceProperties")?;

        let token = self
            .provider
            .verify_identity(&domain)
            .await
            .map_err(|source| ReconcileError::Provider {
                operation: "verify",
                domain: domain.clone(),
                source,
            })?;

        info!(domain = %domain, "Domain identity pending verification");
        Ok(VerificationOutcome::verified(&domain, token))
    }

    /// Remove the identity for `props.Domain`; a missing identity is success
    pub async fn delete(
        &self,
        props: &DomainProperties,
    ) -> Result<VerificationOutcome, ReconcileError> {
        let domain = validate_domain(props, "ResourceProperties")?;

        match self.provider.delete_identity(&domain).await {
            Ok(()) => {
                info!(domain = %domain, "Domain identity deleted");
            }
            Err(e) if e.is_not_found() => {
                info!(domain = %domain, "Domain identity already absent");
            }
            Err(source) => {
                return Err(ReconcileError::Provider {
                    operation: "delete",
                    domain,
                    source,
                });
            }
        }

        Ok(VerificationOutcome::deleted(&domain))
    }

    /// Replace the identity of `old_props.Domain` with one for `new_props.Domain`
    ///
    /// Calls are strictly sequential: the old identity is deleted before the new
    /// one is verified, and a failed delete means the verify is never issued.
    /// When both property sets name the same domain nothing is deleted; the
    /// domain is verified again to return its token.
    pub async fn update(
        &self,
        resource_id: Option<&str>,
        new_props: &DomainProperties,
        old_props: Option<&DomainProperties>,
    ) -> Result<VerificationOutcome, ReconcileError> {
        let new_domain = validate_domain(new_props, "ResourceProperties")?;
        let old_domain = validate_domain(
            old_props.ok_or_else(|| ReconcileError::Validation {
                field: "OldResourceProperties",
                reason: "OldResourceProperties are required for Update".to_string(),
            })?,
            "OldResourceProperties",
        )?;

        info!(
            resource_id = resource_id.unwrap_or("-"),
            old_domain = %old_domain,
            new_domain = %new_domain,
            "Updating domain identity"
        );

        if old_domain == new_domain {
            return self.create(new_props).await;
        }

        let mut pipeline = UpdatePipeline::new(&old_domain, &new_domain);
        while pipeline.step() != UpdateStep::Done {
            let step = pipeline.step();
            if let Err(source) = pipeline.advance(self.provider).await {
                let compensation = if step == UpdateStep::CreatePending {
                    self.compensate(&old_domain).await
                } else {
                    Compensation::NotAttempted
                };
                warn!(
                    step = %step,
                    old_domain = %old_domain,
                    new_domain = %new_domain,
                    error = %source,
                    "Update stopped part way"
                );
                return Err(ReconcileError::Sequencing {
                    step,
                    old_domain,
                    new_domain,
                    source,
                    compensation,
                });
            }
        }

        pipeline.outcome().ok_or_else(|| ReconcileError::Validation {
            field: "ResourceProperties",
            reason: "update finished without a verification token".to_string(),
        })
    }

    async fn compensate(&self, old_domain: &str) -> Compensation {
        if !self.compensate_failed_update {
            return Compensation::NotAttempted;
        }

        match self.provider.verify_identity(old_domain).await {
            Ok(_) => {
                info!(domain = %old_domain, "Previous identity re-verified after failed update");
                Compensation::Restored
            }
            Err(e) => {
                warn!(domain = %old_domain, error = %e, "Could not re-verify previous identity");
                Compensation::Failed(e.message().to_string())
            }
        }
    }
}
