//! # DNS Records
//!
//! Records the hosted zone needs once a domain identity has been requested:
//! - TXT `_amazonses.<domain>` holding the verification token
//! - MX `<domain>` pointing at the regional SES inbound SMTP endpoint
//!
//! The verifier does not create these records; they are derived here so that
//! operators and tooling render them the same way.

use std::fmt;

use crate::constants::{DNS_RECORD_TTL_SECS, INBOUND_MX_PRIORITY, VERIFICATION_RECORD_PREFIX};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DnsRecord {
    Txt {
        name: String,
        value: String,
        ttl: u32,
    },
    Mx {
        name: String,
        priority: u16,
        host: String,
        ttl: u32,
    },
}

impl DnsRecord {
    pub fn name(&self) -> &str {
        match self {
            DnsRecord::Txt { name, .. } | DnsRecord::Mx { name, .. } => name,
        }
    }
}

impl fmt::Display for DnsRecord {
    /// Zone-file representation
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DnsRecord::Txt { name, value, ttl } => {
                write!(f, "{name}. {ttl} IN TXT \"{value}\"")
            }
            DnsRecord::Mx {
                name,
                priority,
                host,
                ttl,
            } => write!(f, "{name}. {ttl} IN MX {priority} {host}."),
        }
    }
}

/// Name of the TXT record SES checks for `domain`
pub fn verification_record_name(domain: &str) -> String {
    format!("{VERIFICATION_RECORD_PREFIX}.{domain}")
}

/// Regional inbound SMTP endpoint for mail receiving
pub fn inbound_smtp_host(region: &str) -> String {
    format!("inbound-smtp.{region}.amazonaws.com")
}

/// TXT and MX records for a verified, mail-receiving domain
pub fn verification_records(domain: &str, token: &str, region: &str) -> Vec<DnsRecord> {
    vec![
        DnsRecord::Txt {
            name: verification_record_name(domain),
            value: token.to_string(),
            ttl: DNS_RECORD_TTL_SECS,
        },
        DnsRecord::Mx {
            name: domain.to_string(),
            priority: INBOUND_MX_PRIORITY,
            host: inbound_smtp_host(region),
            ttl: DNS_RECORD_TTL_SECS,
        },
    ]
}
