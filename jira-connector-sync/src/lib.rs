//! Identity and ticketing sync for Jira Cloud.
//!
//! Turns a Jira site into resources, entitlements and grants, applies
//! membership changes back, and bridges tickets to Jira issues.
//!
//! # Resource model
//!
//! - **user**: Jira accounts (or organization users via the Admin API)
//! - **group**: Jira groups, with `member` entitlements
//! - **role**: global project roles, appointed through any project
//! - **project**: projects, with `lead` and `participate` entitlements
//! - **project-role**: one role inside one project, with `assigned`
//!
//! # Example
//!
//! ```no_run
//! use jira_connector_sync::{ConnectorConfig, JiraConnector, ResourceSyncer};
//!
//! # async fn run() -> Result<(), jira_connector_sync::ConnectorError> {
//! let config = ConnectorConfig::load_from("connector.toml".as_ref())?;
//! let connector = JiraConnector::from_config(config).await?;
//! connector.validate().await?;
//!
//! let users = connector.syncer("user")?.list(None, "").await?;
//! println!("{} users", users.items.len());
//! # Ok(())
//! # }
//! ```

pub mod config;
mod connector;
mod error;
pub mod events;
pub mod resources;
pub mod tickets;

pub use config::ConnectorConfig;
pub use connector::JiraConnector;
pub use error::{ConnectorError, ConnectorResult};
pub use events::{AuditCursor, EventFeed};
pub use resources::{ListPage, ResourceProvisioner, ResourceSyncer};
pub use tickets::{TicketManager, TicketRequest};
