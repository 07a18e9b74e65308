//! # SESCTL CLI
//!
//! Command-line interface for the SES Domain Verifier.
//!
//! Runs the same lifecycle handling as the service against a single event file,
//! which is useful for replaying a stuck custom resource by hand.
//!
//! ## Usage
//!
//! ```bash
//! # Handle an event and send the terminal report to its ResponseURL
//! sesctl handle --event event.json
//!
//! # Handle an event read from stdin without sending the report
//! cat event.json | sesctl handle --event - --dry-run
//!
//! # Preview the directory-root rewrite
//! sesctl rewrite /docs/
//!
//! # Print the DNS records for a verified domain
//! sesctl records example.com --token abc123 --region eu-west-1
//! ```

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::io::Read;
use std::path::{Path, PathBuf};

use ses_domain_verifier::config::VerifierConfig;
use ses_domain_verifier::dispatcher::handle_event_value;
use ses_domain_verifier::dns::verification_records;
use ses_domain_verifier::provider::ses::SesIdentityProvider;
use ses_domain_verifier::reconciler::Reconciler;
use ses_domain_verifier::reporter::{DryRunReporter, HttpResponseReporter, ResponseReporter};
use ses_domain_verifier::rewrite::rewrite_uri;

/// SES Domain Verifier CLI
#[derive(Parser)]
#[command(name = "sesctl")]
#[command(
    about = "SES Domain Verifier CLI",
    long_about = None,
    after_help = "\
Examples:
  sesctl handle --event event.json
  sesctl handle --event - --dry-run < event.json
  sesctl rewrite /docs/
  sesctl records example.com --token abc123
"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Handle a lifecycle event and report its outcome
    Handle {
        /// Path to the event JSON, or '-' for stdin
        #[arg(long, value_name = "PATH")]
        event: PathBuf,

        /// Print the terminal report without sending it to the ResponseURL
        #[arg(long)]
        dry_run: bool,
    },
    /// Apply the directory-root rewrite to a URI
    Rewrite {
        #[arg(value_name = "URI")]
        uri: String,

        /// Document served for directory paths (defaults to DEFAULT_INDEX_DOCUMENT)
        #[arg(long)]
        default_document: Option<String>,
    },
    /// Print the DNS records a verified domain needs
    Records {
        #[arg(value_name = "DOMAIN")]
        domain: String,

        /// Verification token returned by a Create or Update
        #[arg(long)]
        token: String,

        /// SES region (defaults to AWS_REGION)
        #[arg(long)]
        region: Option<String>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    // Configure rustls crypto provider FIRST, before any other operations
    rustls::crypto::ring::default_provider()
        .install_default()
        .map_err(|_already_installed| anyhow::anyhow!("Failed to install rustls crypto provider"))?;

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "sesctl=info,ses_domain_verifier=info".into()),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let config = VerifierConfig::from_env();

    match cli.command {
        Commands::Handle { event, dry_run } => handle_command(&config, &event, dry_run).await,
        Commands::Rewrite {
            uri,
            default_document,
        } => {
            let document = default_document.unwrap_or(config.default_index_document);
            println!("{}", rewrite_uri(&uri, &document));
            Ok(())
        }
        Commands::Records {
            domain,
            token,
            region,
        } => {
            let region = region.unwrap_or(config.region);
            for record in verification_records(&domain, &token, &region) {
                println!("{record}");
            }
            Ok(())
        }
    }
}

async fn handle_command(config: &VerifierConfig, path: &Path, dry_run: bool) -> Result<()> {
    let raw = read_event(path)?;
    let body: serde_json::Value =
        serde_json::from_str(&raw).context("Lifecycle event is not valid JSON")?;

    let provider = SesIdentityProvider::new(config).await;
    let reconciler = Reconciler::new(&provider).with_compensation(config.compensate_failed_update);

    let reporter: Box<dyn ResponseReporter> = if dry_run {
        Box::new(DryRunReporter)
    } else {
        Box::new(
            HttpResponseReporter::new(config.report_timeout())
                .context("Failed to build terminal report client")?,
        )
    };

    let report = handle_event_value(&body, &reconciler, reporter.as_ref())
        .await
        .context("Failed to report lifecycle event")?;

    println!("{}", serde_json::to_string_pretty(&report)?);
    Ok(())
}

fn read_event(path: &Path) -> Result<String> {
    if path.as_os_str() == "-" {
        let mut raw = String::new();
        std::io::stdin()
            .read_to_string(&mut raw)
            .context("Failed to read event from stdin")?;
        return Ok(raw);
    }
    std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read event file {}", path.display()))
}
