//! REST clients for the Jira connector.
//!
//! - [`JiraClient`]: Jira Cloud REST API (basic auth), with project and role
//!   lookups memoized through a [`SessionStore`]
//! - [`AtlassianClient`]: Atlassian Admin API (bearer token) for organization
//!   users, groups and workspaces
//! - [`service_account`]: scoped-token URL resolution for service accounts
//!
//! Every failure is a [`ClientError`]; [`ClientError::code`] classifies it for
//! the host. No call is retried here.

pub mod atlassian;
mod error;
mod http;
mod jira;
pub mod models;
pub mod service_account;
mod session;

pub use atlassian::{AdminGroup, AdminUser, AtlassianClient, AtlassianConfig, Workspace};
pub use error::{ClientError, ClientResult};
pub use http::REQUEST_TIMEOUT;
pub use jira::{JiraClient, JiraConfig};
pub use session::{MemorySessionStore, SessionStore};
