//! Resource listers, entitlement and grant derivers, and provisioning.
//!
//! Each resource type has one syncer implementing [`ResourceSyncer`]; the
//! types that support provisioning also implement [`ResourceProvisioner`].
//! Every `list`/`grants` call issues one bounded fetch (except where a
//! derivation needs a full fan-out, documented on the syncer) and returns
//! the token for the next call.

mod group;
mod project;
mod project_role;
mod role;
mod user;

pub use group::GroupSyncer;
pub use project::ProjectSyncer;
pub use project_role::{ProjectRoleSyncer, parse_project_role_id};
pub use role::RoleSyncer;
pub use user::{UserSyncer, user_resource};

use crate::error::ConnectorResult;
use async_trait::async_trait;
use jira_connector_client::AtlassianClient;
use jira_connector_types::{
    CursorError, CursorStack, Entitlement, Grant, GrantOutcome, Profile, Resource, ResourceId,
    ResourceTrait, ResourceType, RevokeOutcome,
};
use serde_json::Value;
use std::sync::Arc;

/// Page size for the Jira REST API.
pub const PAGE_SIZE: u64 = 50;

pub const USER: ResourceType = ResourceType {
    id: "user",
    display_name: "User",
    traits: &[ResourceTrait::User],
    skip_entitlements_and_grants: true,
};

pub const GROUP: ResourceType = ResourceType {
    id: "group",
    display_name: "Group",
    traits: &[ResourceTrait::Group],
    skip_entitlements_and_grants: false,
};

pub const ROLE: ResourceType = ResourceType {
    id: "role",
    display_name: "Role",
    traits: &[ResourceTrait::Role],
    skip_entitlements_and_grants: false,
};

pub const PROJECT: ResourceType = ResourceType {
    id: "project",
    display_name: "Project",
    traits: &[ResourceTrait::Group],
    skip_entitlements_and_grants: false,
};

pub const PROJECT_ROLE: ResourceType = ResourceType {
    id: "project-role",
    display_name: "Project Role",
    traits: &[ResourceTrait::Role],
    skip_entitlements_and_grants: false,
};

/// Every resource type the connector exposes, in sync order.
pub const RESOURCE_TYPES: [&ResourceType; 5] = [&USER, &GROUP, &ROLE, &PROJECT, &PROJECT_ROLE];

/// Entitlement slugs.
pub const MEMBER: &str = "member";
pub const APPOINTED: &str = "appointed";
pub const PARTICIPATE: &str = "participate";
pub const LEAD: &str = "lead";
pub const ASSIGNED: &str = "assigned";

/// One page of results plus the token for the next call (empty when done).
#[derive(Debug, Clone, PartialEq)]
pub struct ListPage<T> {
    pub items: Vec<T>,
    pub next_token: String,
}

impl<T> ListPage<T> {
    pub fn new(items: Vec<T>, next_token: impl Into<String>) -> Self {
        Self {
            items,
            next_token: next_token.into(),
        }
    }

    /// A complete, single-page result.
    pub fn last(items: Vec<T>) -> Self {
        Self::new(items, String::new())
    }
}

/// Enumerates one resource type and derives its entitlements and grants.
#[async_trait]
pub trait ResourceSyncer: Send + Sync {
    fn resource_type(&self) -> &'static ResourceType;

    /// One page of resources.
    async fn list(&self, parent: Option<&ResourceId>, token: &str) -> ConnectorResult<ListPage<Resource>>;

    /// Entitlements offered by `resource`.
    async fn entitlements(&self, resource: &Resource, token: &str) -> ConnectorResult<ListPage<Entitlement>>;

    /// Grants held on `resource`. No ordering is guaranteed.
    async fn grants(&self, resource: &Resource, token: &str) -> ConnectorResult<ListPage<Grant>>;
}

/// Adds and removes grants on the remote system.
#[async_trait]
pub trait ResourceProvisioner: Send + Sync {
    async fn grant(&self, principal: &Resource, entitlement: &Entitlement) -> ConnectorResult<GrantOutcome>;

    async fn revoke(&self, grant: &Grant) -> ConnectorResult<RevokeOutcome>;
}

/// Admin API client together with the site ids it lists for.
#[derive(Clone)]
pub struct AdminDirectory {
    pub client: Arc<AtlassianClient>,
    pub site_ids: Vec<String>,
}

/// Site id of the current relay frame, `""` before the per-site expansion.
/// The frame must belong to `resource_type`.
pub(crate) fn site_frame(stack: &CursorStack, resource_type: &ResourceType) -> ConnectorResult<String> {
    let frame = stack.current().ok_or(CursorError::NoActiveFrame)?;
    if frame.resource_type_id != resource_type.id {
        return Err(CursorError::Malformed(format!(
            "page token belongs to '{}', not '{}'",
            frame.resource_type_id, resource_type.id
        ))
        .into());
    }
    Ok(frame.resource_id.clone())
}

pub(crate) fn profile<const N: usize>(entries: [(&str, Value); N]) -> Profile {
    entries
        .into_iter()
        .map(|(key, value)| (key.to_string(), value))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ConnectorError;
    use jira_connector_types::PageFrame;
    use serde_json::json;

    #[test]
    fn resource_type_ids_are_unique() {
        let mut ids: Vec<_> = RESOURCE_TYPES.iter().map(|t| t.id).collect();
        ids.sort_unstable();
        ids.dedup();
        assert_eq!(ids.len(), RESOURCE_TYPES.len());
        assert!(USER.skip_entitlements_and_grants);
    }

    #[test]
    fn profile_builds_map() {
        let p = profile([("name", json!("Platform")), ("project_id", json!("10000"))]);
        assert_eq!(p["name"], "Platform");
        assert_eq!(p.len(), 2);
    }

    #[test]
    fn site_frame_rejects_foreign_resource_type() {
        let mut stack = CursorStack::new();
        stack.push(PageFrame::new(PROJECT.id).with_resource_id("site-1"));
        let err = site_frame(&stack, &USER).unwrap_err();
        assert!(matches!(err, ConnectorError::Cursor(CursorError::Malformed(_))));

        stack.push(PageFrame::new(USER.id).with_resource_id("site-2"));
        assert_eq!(site_frame(&stack, &USER).unwrap(), "site-2");
    }
}
