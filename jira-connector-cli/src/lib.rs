//! Argument parsing and command runners for the `jira-connector` binary.
//!
//! Every command writes JSON lines to the given writer, one record per line,
//! tagged with a `kind` field. Logs go to stderr.

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use clap::{Parser, Subcommand};
use jira_connector_sync::{ConnectorConfig, JiraConnector, ResourceSyncer};
use jira_connector_types::{Entitlement, Event, Grant, Profile, Resource, Ticket, TicketSchema};
use serde::Serialize;
use serde_json::Value;
use std::io::Write;
use std::path::PathBuf;
use tracing::{debug, info, warn};

#[derive(Parser, Debug)]
#[command(name = "jira-connector")]
#[command(about = "Syncs identities, access and tickets from Jira Cloud")]
pub struct Args {
    /// TOML config file. Flags and environment variables override its values
    #[arg(short, long, env = "JIRA_CONNECTOR_CONFIG")]
    pub config: Option<PathBuf>,

    /// Jira site URL, e.g. https://example.atlassian.net
    #[arg(long, env = "JIRA_URL")]
    pub jira_url: Option<String>,

    #[arg(long, env = "JIRA_EMAIL")]
    pub jira_email: Option<String>,

    #[arg(long, env = "JIRA_API_TOKEN", hide_env_values = true)]
    pub jira_api_token: Option<String>,

    /// Projects ticket schemas are listed for (comma separated)
    #[arg(long, env = "JIRA_PROJECT_KEYS", value_delimiter = ',')]
    pub jira_project_keys: Vec<String>,

    /// Skip the grants making every user a participant of public projects
    #[arg(long)]
    pub skip_project_participants: bool,

    /// Leave service desk customers out of the user listing
    #[arg(long)]
    pub skip_customer_users: bool,

    /// Enable the ticket commands
    #[arg(long)]
    pub ticketing: bool,

    /// Organization id; with the access token, users and groups come from the Admin API
    #[arg(long, env = "ATLASSIAN_ORG_ID")]
    pub atlassian_org_id: Option<String>,

    #[arg(long, env = "ATLASSIAN_ACCESS_TOKEN", hide_env_values = true)]
    pub atlassian_access_token: Option<String>,

    /// Enable verbose debug logging
    #[arg(short, long)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug, Clone, PartialEq)]
pub enum Command {
    /// Check the credentials against the site
    Validate,
    /// List resources with their entitlements and grants
    Sync {
        /// Resource type ids to sync; all when omitted
        #[arg(long = "type")]
        resource_types: Vec<String>,
    },
    /// List ticket schemas
    Schemas,
    /// Read tickets by id or key
    Tickets {
        #[arg(required = true)]
        ids: Vec<String>,
    },
    /// Read usage events from the audit log
    Events {
        /// Only events at or after this RFC 3339 time
        #[arg(long)]
        since: Option<DateTime<Utc>>,
    },
    /// Invite a user by email
    CreateAccount {
        email: String,
        /// Product to grant access to; repeatable
        #[arg(long = "product")]
        products: Vec<String>,
    },
}

impl Args {
    /// The config file, if any, with flags applied on top.
    pub fn connector_config(&self) -> Result<ConnectorConfig> {
        let mut config = match &self.config {
            Some(path) => ConnectorConfig::load_from(path)
                .with_context(|| format!("failed to load config from {}", path.display()))?,
            None => ConnectorConfig::default(),
        };

        if let Some(url) = &self.jira_url {
            config.jira_url = url.clone();
        }
        if let Some(email) = &self.jira_email {
            config.jira_email = email.clone();
        }
        if let Some(token) = &self.jira_api_token {
            config.jira_api_token = token.clone();
        }
        if !self.jira_project_keys.is_empty() {
            config.jira_project_keys = self.jira_project_keys.clone();
        }
        if self.atlassian_org_id.is_some() {
            config.atlassian_org_id = self.atlassian_org_id.clone();
        }
        if self.atlassian_access_token.is_some() {
            config.atlassian_access_token = self.atlassian_access_token.clone();
        }
        config.skip_project_participants |= self.skip_project_participants;
        config.skip_customer_users |= self.skip_customer_users;
        config.ticketing_enabled |= self.ticketing;

        config.validate()?;
        Ok(config)
    }
}

/// One output line.
#[derive(Debug, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Record<'a> {
    Valid { jira_url: &'a str },
    Resource(&'a Resource),
    Entitlement(&'a Entitlement),
    Grant(&'a Grant),
    Schema(&'a TicketSchema),
    Ticket(&'a Ticket),
    TicketError { id: &'a str, error: String },
    Event(&'a Event),
    Account(&'a Resource),
}

/// Writes one record as a JSON line.
pub fn emit<W: Write>(out: &mut W, record: &Record<'_>) -> Result<u64> {
    serde_json::to_writer(&mut *out, record)?;
    writeln!(out)?;
    Ok(1)
}

/// Runs `command`, returning the number of records written.
pub async fn run<W: Write>(connector: &JiraConnector, command: &Command, out: &mut W) -> Result<u64> {
    match command {
        Command::Validate => {
            connector.validate().await?;
            emit(out, &Record::Valid {
                jira_url: &connector.config().jira_url,
            })
        }
        Command::Sync { resource_types } => sync(connector, resource_types, out).await,
        Command::Schemas => schemas(connector, out).await,
        Command::Tickets { ids } => tickets(connector, ids, out).await,
        Command::Events { since } => events(connector, *since, out).await,
        Command::CreateAccount { email, products } => {
            let mut profile = Profile::new();
            if !products.is_empty() {
                profile.insert("products".to_string(), Value::from(products.clone()));
            }
            let account = connector.create_account(email, &profile).await?;
            info!(email = %email, "Invited user");
            emit(out, &Record::Account(&account))
        }
    }
}

async fn sync<W: Write>(connector: &JiraConnector, only: &[String], out: &mut W) -> Result<u64> {
    let mut written = 0;
    for resource_type in connector.resource_types() {
        if !only.is_empty() && !only.iter().any(|t| t == resource_type.id) {
            continue;
        }
        let syncer = connector.syncer(resource_type.id)?;
        let mut listed = 0;
        let mut token = String::new();
        loop {
            let page = syncer
                .list(None, &token)
                .await
                .with_context(|| format!("failed to list {}", resource_type.id))?;
            for resource in &page.items {
                written += emit(out, &Record::Resource(resource))?;
                if !resource_type.skip_entitlements_and_grants {
                    written += sync_access(syncer, resource, out).await?;
                }
            }
            listed += page.items.len();
            if page.next_token.is_empty() {
                break;
            }
            token = page.next_token;
        }
        info!(resource_type = resource_type.id, resources = listed, "Synced resource type");
    }
    Ok(written)
}

/// Entitlements and grants of one resource, all pages.
async fn sync_access<W: Write>(syncer: &dyn ResourceSyncer, resource: &Resource, out: &mut W) -> Result<u64> {
    let mut written = 0;

    let mut token = String::new();
    loop {
        let page = syncer.entitlements(resource, &token).await?;
        for entitlement in &page.items {
            written += emit(out, &Record::Entitlement(entitlement))?;
        }
        if page.next_token.is_empty() {
            break;
        }
        token = page.next_token;
    }

    let mut token = String::new();
    loop {
        let page = syncer.grants(resource, &token).await?;
        for grant in &page.items {
            written += emit(out, &Record::Grant(grant))?;
        }
        if page.next_token.is_empty() {
            break;
        }
        token = page.next_token;
    }

    debug!(resource = %resource.id.resource, records = written, "Synced access");
    Ok(written)
}

async fn schemas<W: Write>(connector: &JiraConnector, out: &mut W) -> Result<u64> {
    let mut written = 0;
    let mut token = String::new();
    loop {
        let page = connector.list_ticket_schemas(&token).await?;
        for schema in &page.items {
            written += emit(out, &Record::Schema(schema))?;
        }
        if page.next_token.is_empty() {
            return Ok(written);
        }
        token = page.next_token;
    }
}

async fn tickets<W: Write>(connector: &JiraConnector, ids: &[String], out: &mut W) -> Result<u64> {
    let mut written = 0;
    for (id, result) in ids.iter().zip(connector.bulk_get_tickets(ids).await?) {
        written += match result {
            Ok(ticket) => emit(out, &Record::Ticket(&ticket))?,
            Err(e) => {
                warn!(ticket_id = %id, error = %e, "Failed to read ticket");
                emit(out, &Record::TicketError {
                    id,
                    error: e.to_string(),
                })?
            }
        };
    }
    Ok(written)
}

async fn events<W: Write>(connector: &JiraConnector, since: Option<DateTime<Utc>>, out: &mut W) -> Result<u64> {
    let mut written = 0;
    let mut cursor = String::new();
    loop {
        let (events, state) = connector.list_events(since, &cursor).await?;
        for event in &events {
            written += emit(out, &Record::Event(event))?;
        }
        if !state.has_more {
            return Ok(written);
        }
        cursor = state.cursor;
    }
}
