//! Common test utilities for lifecycle tests
//!
//! Provides a scripted in-memory identity provider, a reporter that records
//! every delivery, event builders, and rustls crypto provider setup.

#![allow(dead_code, reason = "each test binary uses a different subset of helpers")]

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::{Mutex, Once};

use ses_domain_verifier::event::{DomainProperties, LifecycleEvent, RequestType};
use ses_domain_verifier::provider::{IdentityProvider, ProviderError};
use ses_domain_verifier::reporter::{ReportError, ResponseReporter, TerminalReport};

static RUSTLS_INIT: Once = Once::new();

/// Initialize rustls crypto provider for tests
///
/// Uses a `Once` to ensure it's only called once across all tests.
pub fn init_rustls() {
    RUSTLS_INIT.call_once(|| {
        // Ignore the error if another test binary helper already installed one
        let _ = rustls::crypto::ring::default_provider().install_default();
    });
}

/// A provider call as observed by [`FakeProvider`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Call {
    Verify(String),
    Delete(String),
}

pub fn verify(domain: &str) -> Call {
    Call::Verify(domain.to_string())
}

pub fn delete(domain: &str) -> Call {
    Call::Delete(domain.to_string())
}

/// In-memory provider with per-domain scripted failures
///
/// Successful verifies return `token-<domain>`.
#[derive(Debug, Default)]
pub struct FakeProvider {
    calls: Mutex<Vec<Call>>,
    verify_failures: HashMap<String, ProviderError>,
    delete_failures: HashMap<String, ProviderError>,
}

impl FakeProvider {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn fail_verify(mut self, domain: &str, error: ProviderError) -> Self {
        self.verify_failures.insert(domain.to_string(), error);
        self
    }

    pub fn fail_delete(mut self, domain: &str, error: ProviderError) -> Self {
        self.delete_failures.insert(domain.to_string(), error);
        self
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().unwrap().clone()
    }
}

pub fn token_for(domain: &str) -> String {
    format!("token-{domain}")
}

#[async_trait]
impl IdentityProvider for FakeProvider {
    async fn verify_identity(&self, domain: &str) -> Result<String, ProviderError> {
        self.calls.lock().unwrap().push(verify(domain));
        match self.verify_failures.get(domain) {
            Some(error) => Err(error.clone()),
            None => Ok(token_for(domain)),
        }
    }

    async fn delete_identity(&self, domain: &str) -> Result<(), ProviderError> {
        self.calls.lock().unwrap().push(delete(domain));
        match self.delete_failures.get(domain) {
            Some(error) => Err(error.clone()),
            None => Ok(()),
        }
    }
}

/// Reporter that records every report it is asked to deliver
#[derive(Debug, Default)]
pub struct RecordingReporter {
    reports: Mutex<Vec<TerminalReport>>,
    reject_with_status: Option<u16>,
}

impl RecordingReporter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record deliveries but answer each with an HTTP error status
    pub fn rejecting(status: u16) -> Self {
        Self {
            reports: Mutex::new(Vec::new()),
            reject_with_status: Some(status),
        }
    }

    pub fn reports(&self) -> Vec<TerminalReport> {
        self.reports.lock().unwrap().clone()
    }

    pub fn only_report(&self) -> TerminalReport {
        let reports = self.reports();
        assert_eq!(reports.len(), 1, "expected exactly one report, got {reports:?}");
        reports.into_iter().next().unwrap()
    }
}

#[async_trait]
impl ResponseReporter for RecordingReporter {
    async fn deliver(
        &self,
        _event: &LifecycleEvent,
        report: &TerminalReport,
    ) -> Result<(), ReportError> {
        self.reports.lock().unwrap().push(report.clone());
        match self.reject_with_status {
            Some(status) => Err(ReportError::Status {
                status,
                body: "AccessDenied".to_string(),
            }),
            None => Ok(()),
        }
    }
}

/// Event for `request_type` with `Domain` set in the resource properties
pub fn event(request_type: RequestType, domain: Option<&str>) -> LifecycleEvent {
    LifecycleEvent {
        request_type,
        response_url: "https://cloudformation-custom-resource-response.invalid/report".to_string(),
        stack_id: "arn:aws:cloudformation:us-east-1:123456789012:stack/mail/1".to_string(),
        request_id: "8c0a1d2e-request".to_string(),
        logical_resource_id: "DomainVerifier".to_string(),
        resource_type: Some("Custom::SesDomainVerifier".to_string()),
        physical_resource_id: None,
        resource_properties: domain.map(DomainProperties::new).unwrap_or_default(),
        old_resource_properties: None,
    }
}

pub fn create_event(domain: &str) -> LifecycleEvent {
    event(RequestType::Create, Some(domain))
}

pub fn delete_event(domain: &str) -> LifecycleEvent {
    let mut event = event(RequestType::Delete, Some(domain));
    event.physical_resource_id = Some(domain.to_string());
    event
}

pub fn update_event(old_domain: &str, new_domain: &str) -> LifecycleEvent {
    let mut event = event(RequestType::Update, Some(new_domain));
    event.physical_resource_id = Some(old_domain.to_string());
    event.old_resource_properties = Some(DomainProperties::new(old_domain));
    event
}
