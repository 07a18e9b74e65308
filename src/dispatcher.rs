//! # Event Dispatcher
//!
//! Routes a lifecycle event to the matching reconciler operation and turns the
//! result into an [`Outcome`].
//!
//! The orchestrator blocks until it receives a terminal report, so every event
//! must be reported exactly once. [`dispatch`] never fails: errors become a
//! failure outcome. [`handle_event`] hands that outcome by value to a single
//! reporter call. [`handle_event_value`] does the same for a raw body, so an
//! event that does not deserialize is still answered.

use serde_json::Value;
use std::time::Instant;
use thiserror::Error;
use tracing::{error, info, info_span, Instrument};

use crate::event::{EventBody, LifecycleEvent, MalformedEvent, MissingResponseUrl, RequestType};
use crate::observability::metrics;
use crate::reconciler::{ReconcileError, Reconciler, VerificationOutcome};
use crate::reporter::{ReportError, ResponseReporter, TerminalReport};

/// Description of a failed reconciliation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FailureOutcome {
    /// Error kind label (`validation`, `provider`, `sequencing`)
    pub kind: &'static str,
    /// Full description, including which operation failed
    pub message: String,
    /// Underlying cause as reported by the provider or validation
    pub detail: String,
}

impl From<&ReconcileError> for FailureOutcome {
    fn from(error: &ReconcileError) -> Self {
        Self {
            kind: error.kind(),
            message: error.to_string(),
            detail: error.root_message(),
        }
    }
}

/// Terminal result of one lifecycle event
#[must_use = "an outcome must be reported to the orchestrator exactly once"]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    Success(VerificationOutcome),
    Failure(FailureOutcome),
}

impl Outcome {
    pub fn is_success(&self) -> bool {
        matches!(self, Outcome::Success(_))
    }
}

/// Run the reconciler operation selected by the event's request type
pub async fn dispatch(event: &LifecycleEvent, reconciler: &Reconciler<'_>) -> Outcome {
    let span = info_span!(
        "lifecycle.dispatch",
        request_type = %event.request_type,
        request_id = %event.request_id,
        logical_resource_id = %event.logical_resource_id,
        domain = event.domain().unwrap_or("-"),
    );
    let start = Instant::now();
    metrics::increment_lifecycle_events(event.request_type.as_str());

    async move {
        info!("Received {} lifecycle event", event.request_type);

        let result = match event.request_type {
            RequestType::Create => reconciler.create(&event.resource_properties).await,
            RequestType::Delete if event.has_placeholder_id() => {
                info!(
                    physical_resource_id = event.physical_resource_id.as_deref().unwrap_or("-"),
                    "Resource was never provisioned, nothing to delete"
                );
                Ok(VerificationOutcome::empty())
            }
            RequestType::Delete => reconciler.delete(&event.resource_properties).await,
            RequestType::Update => {
                reconciler
                    .update(
                        event.physical_resource_id.as_deref(),
                        &event.resource_properties,
                        event.old_resource_properties.as_ref(),
                    )
                    .await
            }
            RequestType::Unknown => {
                info!("Unrecognized request type, reporting success without changes");
                Ok(VerificationOutcome::empty())
            }
        };

        metrics::observe_reconciliation_duration(start.elapsed().as_secs_f64());

        match result {
            Ok(outcome) => Outcome::Success(outcome),
            Err(e) => {
                error!(error.kind = e.kind(), "Lifecycle event failed: {}", e);
                metrics::increment_lifecycle_failures(e.kind());
                Outcome::Failure(FailureOutcome::from(&e))
            }
        }
    }
    .instrument(span)
    .await
}

/// Dispatch an event and deliver its terminal report
///
/// The reporter is called exactly once whatever the outcome. A delivery failure
/// is returned to the caller; it is not retried.
pub async fn handle_event(
    event: &LifecycleEvent,
    reconciler: &Reconciler<'_>,
    reporter: &dyn ResponseReporter,
) -> Result<TerminalReport, ReportError> {
    let outcome = dispatch(event, reconciler).await;
    deliver(event, outcome, reporter).await
}

/// Failure to answer a raw event body
#[derive(Debug, Error)]
pub enum EventError {
    /// The body names no callback target, so no report can be sent
    #[error(transparent)]
    MissingResponseUrl(#[from] MissingResponseUrl),

    #[error(transparent)]
    Report(#[from] ReportError),
}

/// Handle an event body that has not been deserialized yet
///
/// A body that names a `ResponseURL` is always reported exactly once; a body
/// that does not deserialize is reported as a validation failure without any
/// provider call.
pub async fn handle_event_value(
    body: &Value,
    reconciler: &Reconciler<'_>,
    reporter: &dyn ResponseReporter,
) -> Result<TerminalReport, EventError> {
    let report = match LifecycleEvent::from_value(body)? {
        EventBody::Valid(event) => handle_event(&event, reconciler, reporter).await?,
        EventBody::Malformed(malformed) => report_malformed(malformed, reporter).await?,
    };
    Ok(report)
}

async fn report_malformed(
    malformed: MalformedEvent,
    reporter: &dyn ResponseReporter,
) -> Result<TerminalReport, ReportError> {
    let MalformedEvent { envelope, error } = malformed;

    metrics::increment_lifecycle_events(envelope.request_type.as_str());
    metrics::increment_lifecycle_failures("validation");
    error!(
        request_type = %envelope.request_type,
        request_id = %envelope.request_id,
        logical_resource_id = %envelope.logical_resource_id,
        error.kind = "validation",
        "Malformed lifecycle event: {}",
        error
    );

    let outcome = Outcome::Failure(FailureOutcome {
        kind: "validation",
        message: format!("invalid lifecycle event: {error}"),
        detail: error,
    });
    deliver(&envelope, outcome, reporter).await
}

async fn deliver(
    event: &LifecycleEvent,
    outcome: Outcome,
    reporter: &dyn ResponseReporter,
) -> Result<TerminalReport, ReportError> {
    let delivered = reporter.report(event, outcome).await;
    match &delivered {
        Ok(report) => {
            metrics::increment_reports(report.status.as_str());
            info!(
                request_id = %event.request_id,
                status = report.status.as_str(),
                physical_resource_id = %report.physical_resource_id,
                "Terminal report delivered"
            );
        }
        Err(e) => {
            metrics::increment_report_delivery_errors();
            error!(
                request_id = %event.request_id,
                "Failed to deliver terminal report: {}",
                e
            );
        }
    }
    delivered
}
