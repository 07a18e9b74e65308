//! # Response Reporter
//!
//! Builds the CloudFormation custom resource response and delivers it to the
//! event's pre-signed `ResponseURL`.
//!
//! ```json
//! {
//!   "Status": "SUCCESS",
//!   "Reason": "Create completed for example.com",
//!   "PhysicalResourceId": "example.com",
//!   "StackId": "arn:aws:cloudformation:...",
//!   "RequestId": "5d478078-...",
//!   "LogicalResourceId": "SimpleEmailServiceDomainVerifier",
//!   "NoEcho": false,
//!   "Data": { "VerificationToken": "abc123" }
//! }
//! ```

use async_trait::async_trait;
use reqwest::header::{HeaderValue, CONTENT_TYPE};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, info};

use crate::dispatcher::Outcome;
use crate::event::LifecycleEvent;

/// Key under which the verification token is published to the stack
pub const VERIFICATION_TOKEN_KEY: &str = "VerificationToken";

/// Key carrying the failure description
pub const ERROR_KEY: &str = "error";

#[derive(Debug, Error)]
pub enum ReportError {
    #[error("failed to serialize terminal report: {0}")]
    Serialize(#[from] serde_json::Error),

    #[error("failed to send terminal report: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("terminal report rejected with HTTP {status}: {body}")]
    Status { status: u16, body: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ReportStatus {
    Success,
    Failed,
}

impl ReportStatus {
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            ReportStatus::Success => "SUCCESS",
            ReportStatus::Failed => "FAILED",
        }
    }
}

/// The single terminal message for one lifecycle event
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct TerminalReport {
    pub status: ReportStatus,
    pub reason: String,
    pub physical_resource_id: String,
    pub stack_id: String,
    pub request_id: String,
    pub logical_resource_id: String,
    pub no_echo: bool,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub data: BTreeMap<String, String>,
}

impl TerminalReport {
    /// Build the report for an outcome
    ///
    /// When the outcome names no physical id, the event's id is used, then a
    /// placeholder derived from the logical resource id.
    pub fn from_outcome(event: &LifecycleEvent, outcome: Outcome) -> Self {
        let fallback_id = || {
            event
                .physical_resource_id
                .clone()
                .unwrap_or_else(|| event.failure_placeholder_id())
        };

        let (status, reason, physical_resource_id, data) = match outcome {
            Outcome::Success(success) => {
                let physical_resource_id =
                    success.physical_resource_id.unwrap_or_else(fallback_id);
                let mut data = BTreeMap::new();
                if let Some(token) = success.verification_token {
                    data.insert(VERIFICATION_TOKEN_KEY.to_string(), token);
                }
                let reason = format!(
                    "{} completed for {}",
                    event.request_type, physical_resource_id
                );
                (ReportStatus::Success, reason, physical_resource_id, data)
            }
            Outcome::Failure(failure) => {
                let mut data = BTreeMap::new();
                data.insert(ERROR_KEY.to_string(), failure.detail);
                (ReportStatus::Failed, failure.message, fallback_id(), data)
            }
        };

        Self {
            status,
            reason,
            physical_resource_id,
            stack_id: event.stack_id.clone(),
            request_id: event.request_id.clone(),
            logical_resource_id: event.logical_resource_id.clone(),
            no_echo: false,
            data,
        }
    }

    pub fn verification_token(&self) -> Option<&str> {
        self.data.get(VERIFICATION_TOKEN_KEY).map(String::as_str)
    }

    pub fn error(&self) -> Option<&str> {
        self.data.get(ERROR_KEY).map(String::as_str)
    }
}

/// Delivers terminal reports to the orchestrator
#[async_trait]
pub trait ResponseReporter: Send + Sync {
    /// Send a built report to the event's callback target
    async fn deliver(
        &self,
        event: &LifecycleEvent,
        report: &TerminalReport,
    ) -> Result<(), ReportError>;

    /// Build the report for `outcome` and deliver it
    ///
    /// Consumes the outcome so it cannot be reported twice.
    async fn report(
        &self,
        event: &LifecycleEvent,
        outcome: Outcome,
    ) -> Result<TerminalReport, ReportError> {
        let report = TerminalReport::from_outcome(event, outcome);
        self.deliver(event, &report).await?;
        Ok(report)
    }
}

/// Reporter that `PUT`s the report to the pre-signed `ResponseURL`
#[derive(Debug, Clone)]
pub struct HttpResponseReporter {
    client: reqwest::Client,
}

impl HttpResponseReporter {
    /// Create a reporter with a bounded request timeout
    pub fn new(timeout: Duration) -> Result<Self, ReportError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent(concat!("ses-domain-verifier/", env!("CARGO_PKG_VERSION")))
            .build()?;
        Ok(Self { client })
    }
}

#[async_trait]
impl ResponseReporter for HttpResponseReporter {
    async fn deliver(
        &self,
        event: &LifecycleEvent,
        report: &TerminalReport,
    ) -> Result<(), ReportError> {
        let body = serde_json::to_string(report)?;
        debug!(response_url = %event.response_url, body = %body, "Sending terminal report");

        // Pre-signed S3 URLs are signed for an empty content type
        let response = self
            .client
            .put(&event.response_url)
            .header(CONTENT_TYPE, HeaderValue::from_static(""))
            .body(body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ReportError::Status {
                status: status.as_u16(),
                body,
            });
        }
        Ok(())
    }
}

/// Reporter that logs the report instead of sending it
#[derive(Debug, Clone, Copy, Default)]
pub struct DryRunReporter;

#[async_trait]
impl ResponseReporter for DryRunReporter {
    async fn deliver(
        &self,
        event: &LifecycleEvent,
        report: &TerminalReport,
    ) -> Result<(), ReportError> {
        info!(
            response_url = %event.response_url,
            status = report.status.as_str(),
            "Dry run: terminal report not sent"
        );
        Ok(())
    }
}
