//! # Directory-Root Rewriter
//!
//! Origin-request transformer for the CDN: a request for a directory-style path
//! (`/blog/`) is forwarded as a request for its index document
//! (`/blog/index.html`). Every other request passes through unchanged.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::borrow::Cow;

/// Append `default_document` to `uri` when it ends with a path separator
pub fn rewrite_uri<'a>(uri: &'a str, default_document: &str) -> Cow<'a, str> {
    if uri.ends_with('/') {
        Cow::Owned(format!("{uri}{default_document}"))
    } else {
        Cow::Borrowed(uri)
    }
}

/// Request as seen by the edge function; fields other than `uri` are kept as-is
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct EdgeRequest {
    pub uri: String,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl EdgeRequest {
    pub fn new(uri: impl Into<String>) -> Self {
        Self {
            uri: uri.into(),
            extra: Map::new(),
        }
    }

    #[must_use]
    pub fn rewrite_directory_root(mut self, default_document: &str) -> Self {
        if let Cow::Owned(uri) = rewrite_uri(&self.uri, default_document) {
            self.uri = uri;
        }
        self
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct CloudFrontPayload {
    pub request: EdgeRequest,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct OriginRequestRecord {
    pub cf: CloudFrontPayload,
}

/// CloudFront origin-request event
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct OriginRequestEvent {
    #[serde(rename = "Records")]
    pub records: Vec<OriginRequestRecord>,
}

/// Either a full origin-request event or a bare request
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(untagged)]
pub enum RewriteInput {
    OriginRequest(OriginRequestEvent),
    Request(EdgeRequest),
}

/// Rewrite a request or origin-request event
///
/// An origin-request event yields the request to forward, as an edge function
/// returns it. An event without records is returned unchanged.
#[must_use]
pub fn rewrite(input: RewriteInput, default_document: &str) -> RewriteInput {
    match input {
        RewriteInput::Request(request) => {
            RewriteInput::Request(request.rewrite_directory_root(default_document))
        }
        RewriteInput::OriginRequest(mut event) => {
            if event.records.is_empty() {
                return RewriteInput::OriginRequest(event);
            }
            let record = event.records.swap_remove(0);
            RewriteInput::Request(record.cf.request.rewrite_directory_root(default_document))
        }
    }
}
