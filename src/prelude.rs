//! # Prelude
//!
//! Re-exports commonly used types and traits for convenience.
//!
//! ## Usage
//!
//! ```rust
//! use ses_domain_verifier::prelude::*;
//! ```
//!
//! This brings into scope:
//! - Lifecycle event types (LifecycleEvent, RequestType, DomainProperties)
//! - Provider trait and error (IdentityProvider, ProviderError)
//! - Reconciler and dispatcher types
//! - Reporter trait and implementations
//! - Configuration

pub use crate::config::VerifierConfig;

pub use crate::event::{DomainProperties, EventBody, LifecycleEvent, RequestType};

pub use crate::provider::ses::SesIdentityProvider;
pub use crate::provider::{IdentityProvider, ProviderError};

pub use crate::reconciler::{
    ReconcileError, Reconciler, UpdatePipeline, UpdateStep, VerificationOutcome,
};

pub use crate::dispatcher::{
    dispatch, handle_event, handle_event_value, EventError, FailureOutcome, Outcome,
};

pub use crate::reporter::{
    DryRunReporter, HttpResponseReporter, ReportError, ReportStatus, ResponseReporter,
    TerminalReport,
};

pub use crate::rewrite::{rewrite, rewrite_uri, EdgeRequest, RewriteInput};
