//! # Lifecycle Events
//!
//! Custom resource requests sent by CloudFormation for an
//! `SESDomainOwnershipVerification` resource.
//!
//! # Example
//!
//! ```json
//! {
//!   "RequestType": "Update",
//!   "ResponseURL": "https://cloudformation-custom-resource-response.s3.amazonaws.com/...",
//!   "StackId": "arn:aws:cloudformation:us-east-1:123456789012:stack/site/guid",
//!   "RequestId": "5d478078-13e9-baf0-464a-7ef285ecc786",
//!   "LogicalResourceId": "SimpleEmailServiceDomainVerifier",
//!   "PhysicalResourceId": "old.example.com",
//!   "ResourceProperties": { "Domain": "new.example.com" },
//!   "OldResourceProperties": { "Domain": "old.example.com" }
//! }
//! ```

use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

use crate::constants::FAILED_RESOURCE_ID_PREFIX;

/// Lifecycle phase requested by the orchestrator
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
pub enum RequestType {
    Create,
    Update,
    Delete,
    /// Any value the orchestrator may add in the future; handled as a no-op
    #[serde(other)]
    Unknown,
}

impl RequestType {
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            RequestType::Create => "Create",
            RequestType::Update => "Update",
            RequestType::Delete => "Delete",
            RequestType::Unknown => "Unknown",
        }
    }
}

impl std::fmt::Display for RequestType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Resource properties of a domain verification resource
///
/// CloudFormation also sends `ServiceToken`; unknown keys are ignored.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
pub struct DomainProperties {
    #[serde(rename = "Domain", alias = "domain", default)]
    pub domain: Option<String>,
}

impl DomainProperties {
    pub fn new(domain: impl Into<String>) -> Self {
        Self {
            domain: Some(domain.into()),
        }
    }
}

/// A single create/update/delete request for one logical resource
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct LifecycleEvent {
    pub request_type: RequestType,
    /// Pre-signed URL that must receive exactly one terminal report
    #[serde(rename = "ResponseURL")]
    pub response_url: String,
    #[serde(default)]
    pub stack_id: String,
    #[serde(default)]
    pub request_id: String,
    #[serde(default)]
    pub logical_resource_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resource_type: Option<String>,
    /// Assigned by a prior Create/Update; absent on the first Create
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub physical_resource_id: Option<String>,
    #[serde(default)]
    pub resource_properties: DomainProperties,
    /// Present only on Update
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub old_resource_properties: Option<DomainProperties>,
}

impl LifecycleEvent {
    /// Parse an event from its JSON representation
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    /// Classify a raw event body
    ///
    /// A body that does not deserialize still yields a [`MalformedEvent`] as
    /// long as it names a `ResponseURL`, so the orchestrator can be told.
    pub fn from_value(value: &Value) -> Result<EventBody, MissingResponseUrl> {
        let error = match Self::deserialize(value) {
            Ok(event) => return Ok(EventBody::Valid(event)),
            Err(e) => e.to_string(),
        };

        let text = |key: &str| value.get(key).and_then(Value::as_str).map(str::to_string);
        let Some(response_url) = text("ResponseURL").filter(|url| !url.is_empty()) else {
            return Err(MissingResponseUrl(error));
        };

        let envelope = Self {
            request_type: value
                .get("RequestType")
                .and_then(|v| RequestType::deserialize(v).ok())
                .unwrap_or(RequestType::Unknown),
            response_url,
            stack_id: text("StackId").unwrap_or_default(),
            request_id: text("RequestId").unwrap_or_default(),
            logical_resource_id: text("LogicalResourceId").unwrap_or_default(),
            resource_type: text("ResourceType"),
            physical_resource_id: text("PhysicalResourceId"),
            resource_properties: DomainProperties::default(),
            old_resource_properties: None,
        };
        Ok(EventBody::Malformed(MalformedEvent { envelope, error }))
    }

    /// Domain named by the current resource properties, if any
    pub fn domain(&self) -> Option<&str> {
        self.resource_properties.domain.as_deref()
    }

    /// Physical resource id reported when a failure happens before any
    /// identity was provisioned
    pub fn failure_placeholder_id(&self) -> String {
        let logical = if self.logical_resource_id.is_empty() {
            "resource"
        } else {
            self.logical_resource_id.as_str()
        };
        format!("{FAILED_RESOURCE_ID_PREFIX}{logical}")
    }

    /// True when the physical resource id was minted by a failed Create
    pub fn has_placeholder_id(&self) -> bool {
        self.physical_resource_id
            .as_deref()
            .is_some_and(|id| id.starts_with(FAILED_RESOURCE_ID_PREFIX))
    }
}

/// A raw event body after classification
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EventBody {
    Valid(LifecycleEvent),
    Malformed(MalformedEvent),
}

/// Event body that failed to deserialize but names a callback target
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MalformedEvent {
    /// Envelope fields recovered from the body; resource properties are empty
    pub envelope: LifecycleEvent,
    /// Deserialization error
    pub error: String,
}

/// Event body without a usable `ResponseURL`; nothing can be reported
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("lifecycle event has no ResponseURL: {0}")]
pub struct MissingResponseUrl(pub String);
