//! SES Domain Verifier Library
//!
//! Custom resource controller that provisions Amazon SES domain identities on
//! behalf of CloudFormation, plus the directory-root rewrite used by the CDN
//! in front of the hosted sites.
//!
//! ## Quick Start
//!
//! ```rust
//! use ses_domain_verifier::prelude::*;
//! ```
//!
//! This brings commonly used types and traits into scope. For more specific imports,
//! use the individual modules.

pub mod config;
pub mod constants;
pub mod dispatcher;
pub mod dns;
pub mod event;
pub mod observability;
pub mod prelude;
pub mod provider;
pub mod reconciler;
pub mod reporter;
pub mod rewrite;
pub mod server;
