//! # Identity Provider Trait
//!
//! Abstract interface for the external messaging provider that owns domain
//! identities.
//!
//! Implementations are thin pass-throughs: one network call per operation, no
//! retry, no policy. Deciding that a missing identity is an acceptable delete
//! result belongs to the reconciler.

use async_trait::async_trait;
use thiserror::Error;

pub mod ses;

/// Classified provider failure
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ProviderError {
    /// The identity does not exist at the provider
    #[error("{0}")]
    NotFound(String),
    /// Throttling, timeouts and transport failures
    #[error("{0}")]
    Transient(String),
    /// Any other provider-side rejection (malformed domain, permissions, conflicts)
    #[error("{0}")]
    Rejected(String),
}

impl ProviderError {
    /// Provider message without classification
    pub fn message(&self) -> &str {
        match self {
            ProviderError::NotFound(m)
            | ProviderError::Transient(m)
            | ProviderError::Rejected(m) => m,
        }
    }

    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            ProviderError::NotFound(_) => "not_found",
            ProviderError::Transient(_) => "transient",
            ProviderError::Rejected(_) => "rejected",
        }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, ProviderError::NotFound(_))
    }
}

/// Provider trait for domain identity verification
#[async_trait]
pub trait IdentityProvider: Send + Sync {
    /// Ask the provider to begin verifying ownership of `domain`
    /// Returns the verification token to publish in DNS
    async fn verify_identity(&self, domain: &str) -> Result<String, ProviderError>;

    /// Remove the identity for `domain`
    async fn delete_identity(&self, domain: &str) -> Result<(), ProviderError>;
}
