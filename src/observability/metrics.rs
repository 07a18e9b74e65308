//! # Metrics
//!
//! Prometheus metrics for monitoring the verifier.
//!
//! ## Metrics Exposed
//!
//! - `ses_verifier_lifecycle_events_total` - Lifecycle events received, by request type
//! - `ses_verifier_lifecycle_failures_total` - Failed reconciliations, by error kind
//! - `ses_verifier_reconciliation_duration_seconds` - Duration of reconciliations
//! - `ses_verifier_provider_operations_total` - SES operations, by operation and result
//! - `ses_verifier_provider_operation_duration_seconds` - Duration of SES operations
//! - `ses_verifier_reports_total` - Terminal reports delivered, by status
//! - `ses_verifier_report_delivery_errors_total` - Terminal reports that could not be delivered

use anyhow::Result;
use prometheus::{Histogram, HistogramVec, IntCounter, IntCounterVec, Registry};
use std::sync::LazyLock;

// Metrics
pub(crate) static REGISTRY: LazyLock<Registry> = LazyLock::new(Registry::new);

static LIFECYCLE_EVENTS_TOTAL: LazyLock<IntCounterVec> = LazyLock::new(|| {
    IntCounterVec::new(
        prometheus::Opts::new(
            "ses_verifier_lifecycle_events_total",
            "Total number of lifecycle events by request type",
        ),
        &["request_type"],
    )
    .expect("Failed to create LIFECYCLE_EVENTS_TOTAL metric - this should never happen")
});

static LIFECYCLE_FAILURES_TOTAL: LazyLock<IntCounterVec> = LazyLock::new(|| {
    IntCounterVec::new(
        prometheus::Opts::new(
            "ses_verifier_lifecycle_failures_total",
            "Total number of failed reconciliations by error kind",
        ),
        &["kind"],
    )
    .expect("Failed to create LIFECYCLE_FAILURES_TOTAL metric - this should never happen")
});

static RECONCILIATION_DURATION: LazyLock<Histogram> = LazyLock::new(|| {
    Histogram::with_opts(
        prometheus::HistogramOpts::new(
            "ses_verifier_reconciliation_duration_seconds",
            "Duration of reconciliation in seconds",
        )
        .buckets(vec![0.1, 0.5, 1.0, 2.0, 5.0, 10.0, 30.0]),
    )
    .expect("Failed to create RECONCILIATION_DURATION metric - this should never happen")
});

static PROVIDER_OPERATIONS_TOTAL: LazyLock<IntCounterVec> = LazyLock::new(|| {
    IntCounterVec::new(
        prometheus::Opts::new(
            "ses_verifier_provider_operations_total",
            "Total number of SES operations by operation and result",
        ),
        &["operation", "result"],
    )
    .expect("Failed to create PROVIDER_OPERATIONS_TOTAL metric - this should never happen")
});

static PROVIDER_OPERATION_DURATION: LazyLock<HistogramVec> = LazyLock::new(|| {
    HistogramVec::new(
        prometheus::HistogramOpts::new(
            "ses_verifier_provider_operation_duration_seconds",
            "Duration of SES operations in seconds by operation",
        )
        .buckets(vec![0.1, 0.5, 1.0, 2.0, 5.0, 10.0]),
        &["operation"],
    )
    .expect("Failed to create PROVIDER_OPERATION_DURATION metric - this should never happen")
});

static REPORTS_TOTAL: LazyLock<IntCounterVec> = LazyLock::new(|| {
    IntCounterVec::new(
        prometheus::Opts::new(
            "ses_verifier_reports_total",
            "Total number of terminal reports delivered by status",
        ),
        &["status"],
    )
    .expect("Failed to create REPORTS_TOTAL metric - this should never happen")
});

static REPORT_DELIVERY_ERRORS_TOTAL: LazyLock<IntCounter> = LazyLock::new(|| {
    IntCounter::new(
        "ses_verifier_report_delivery_errors_total",
        "Total number of terminal reports that could not be delivered",
    )
    .expect("Failed to create REPORT_DELIVERY_ERRORS_TOTAL metric - this should never happen")
});

/// Register all collectors with the shared registry
///
/// Safe to call more than once; already registered collectors are skipped.
#[allow(
    clippy::missing_errors_doc,
    reason = "Only fails on conflicting metric descriptors"
)]
pub fn register_metrics() -> Result<()> {
    register(Box::new(LIFECYCLE_EVENTS_TOTAL.clone()))?;
    register(Box::new(LIFECYCLE_FAILURES_TOTAL.clone()))?;
    register(Box::new(RECONCILIATION_DURATION.clone()))?;
    register(Box::new(PROVIDER_OPERATIONS_TOTAL.clone()))?;
    register(Box::new(PROVIDER_OPERATION_DURATION.clone()))?;
    register(Box::new(REPORTS_TOTAL.clone()))?;
    register(Box::new(REPORT_DELIVERY_ERRORS_TOTAL.clone()))?;

    Ok(())
}

fn register(collector: Box<dyn prometheus::core::Collector>) -> Result<()> {
    match REGISTRY.register(collector) {
        Ok(()) | Err(prometheus::Error::AlreadyReg) => Ok(()),
        Err(e) => Err(e.into()),
    }
}

/// Encode the registry in the Prometheus text format
#[allow(
    clippy::missing_errors_doc,
    reason = "Only fails when the encoder rejects a metric family"
)]
pub fn gather_text() -> Result<Vec<u8>> {
    use prometheus::Encoder;

    let encoder = prometheus::TextEncoder::new();
    let mut buffer = Vec::new();
    encoder.encode(&REGISTRY.gather(), &mut buffer)?;
    Ok(buffer)
}

pub fn increment_lifecycle_events(request_type: &str) {
    LIFECYCLE_EVENTS_TOTAL
        .with_label_values(&[request_type])
        .inc();
}

pub fn increment_lifecycle_failures(kind: &str) {
    LIFECYCLE_FAILURES_TOTAL.with_label_values(&[kind]).inc();
}

pub fn observe_reconciliation_duration(duration: f64) {
    RECONCILIATION_DURATION.observe(duration);
}

pub fn record_provider_operation(operation: &str, result: &str, duration: f64) {
    PROVIDER_OPERATIONS_TOTAL
        .with_label_values(&[operation, result])
        .inc();
    PROVIDER_OPERATION_DURATION
        .with_label_values(&[operation])
        .observe(duration);
}

pub fn increment_reports(status: &str) {
    REPORTS_TOTAL.with_label_values(&[status]).inc();
}

pub fn increment_report_delivery_errors() {
    REPORT_DELIVERY_ERRORS_TOTAL.inc();
}
