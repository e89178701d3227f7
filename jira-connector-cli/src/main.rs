//! Jira connector runner
//!
//! Usage:
//!   jira-connector --config connector.toml sync
//!   jira-connector --jira-url https://example.atlassian.net validate
//!
//! Output is JSON lines on stdout; logs go to stderr.

use anyhow::{Context, Result};
use clap::Parser;
use jira_connector_cli::{Args, run};
use jira_connector_sync::JiraConnector;
use tracing::info;
use tracing_subscriber::{EnvFilter, FmtSubscriber};

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    let default_level = if args.verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    FmtSubscriber::builder()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .compact()
        .init();

    let config = args.connector_config()?;
    info!(jira_url = %config.jira_url, admin_api = config.uses_admin_api(), "Jira connector starting");

    let connector = JiraConnector::from_config(config)
        .await
        .context("failed to set up the connector")?;

    let stdout = std::io::stdout();
    let mut out = stdout.lock();
    let records = run(&connector, &args.command, &mut out).await?;
    info!(records, "Done");
    Ok(())
}
