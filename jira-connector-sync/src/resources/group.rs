//! Groups and their `member` entitlement.

use super::{AdminDirectory, GROUP, ListPage, MEMBER, PAGE_SIZE, ResourceProvisioner, ResourceSyncer, USER, profile, site_frame};
use crate::error::{ConnectorError, ConnectorResult};
use async_trait::async_trait;
use jira_connector_client::{AdminGroup, JiraClient};
use jira_connector_types::pagination::{next_offset_cursor, offset_cursor, relay_cursor};
use jira_connector_types::{
    Entitlement, Grant, GrantOutcome, PageFrame, Resource, ResourceId, ResourceType,
    RevokeOutcome,
};
use serde_json::json;
use std::sync::Arc;
use tracing::{debug, error, warn};

fn group_resource(id: &str, name: &str) -> Resource {
    Resource::group(
        &GROUP,
        id,
        name,
        profile([("id", json!(id)), ("name", json!(name))]),
    )
}

fn admin_group_resource(group: &AdminGroup) -> Resource {
    group_resource(&group.id, &group.name)
}

pub struct GroupSyncer {
    jira: Arc<JiraClient>,
    directory: Option<AdminDirectory>,
}

impl GroupSyncer {
    pub fn new(jira: Arc<JiraClient>, directory: Option<AdminDirectory>) -> Self {
        Self { jira, directory }
    }

    async fn list_jira_groups(&self, token: &str) -> ConnectorResult<ListPage<Resource>> {
        let (stack, offset) = offset_cursor(token, GROUP.id)?;
        let page = self.jira.bulk_groups(offset, PAGE_SIZE).await?;

        let resources = page
            .values
            .iter()
            .map(|g| group_resource(&g.group_id, &g.name))
            .collect();

        let next = next_offset_cursor(stack, offset, page.values.len(), PAGE_SIZE as usize)?;
        Ok(ListPage::new(resources, next))
    }

    /// The first call replaces the group frame with one frame per site; each
    /// later call pages through the groups of the site on top of the stack.
    async fn list_site_groups(&self, directory: &AdminDirectory, token: &str) -> ConnectorResult<ListPage<Resource>> {
        let (mut stack, cursor) = relay_cursor(token, GROUP.id)?;
        let site_id = site_frame(&stack, &GROUP)?;

        if site_id.is_empty() {
            stack.pop();
            for site in &directory.site_ids {
                stack.push(PageFrame::new(GROUP.id).with_resource_id(site));
            }
            debug!(sites = directory.site_ids.len(), "Expanding group listing per site");
            return Ok(ListPage::new(Vec::new(), stack.encode()?));
        }

        let (groups, next) = directory.client.list_groups(&site_id, &cursor).await?;
        stack.advance(next)?;
        Ok(ListPage::new(
            groups.iter().map(admin_group_resource).collect(),
            stack.encode()?,
        ))
    }
}

fn require_user(principal: &ResourceId, action: &str) -> ConnectorResult<()> {
    if principal.is_type(&USER) {
        return Ok(());
    }
    let message = format!("only users can be {action} groups");
    warn!(
        principal_type = %principal.resource_type,
        principal_id = %principal.resource,
        "{message}"
    );
    Err(ConnectorError::invalid(message))
}

#[async_trait]
impl ResourceSyncer for GroupSyncer {
    fn resource_type(&self) -> &'static ResourceType {
        &GROUP
    }

    async fn list(&self, _parent: Option<&ResourceId>, token: &str) -> ConnectorResult<ListPage<Resource>> {
        match &self.directory {
            Some(directory) => self.list_site_groups(directory, token).await,
            None => self.list_jira_groups(token).await,
        }
    }

    async fn entitlements(&self, resource: &Resource, _token: &str) -> ConnectorResult<ListPage<Entitlement>> {
        let member = Entitlement::assignment(resource, MEMBER)
            .with_grantable_to(&[&USER])
            .with_description(format!("Member of {} group", resource.display_name))
            .with_display_name(format!("{} group {MEMBER}", resource.display_name));
        Ok(ListPage::last(vec![member]))
    }

    async fn grants(&self, resource: &Resource, token: &str) -> ConnectorResult<ListPage<Grant>> {
        let (stack, offset) = offset_cursor(token, GROUP.id)?;
        let page = self
            .jira
            .group_members(&resource.id.resource, offset, PAGE_SIZE)
            .await?;

        let grants = page
            .values
            .iter()
            .map(|member| Grant::new(&resource.id, MEMBER, USER.resource_id(&member.account_id)))
            .collect();

        let next = next_offset_cursor(stack, offset, page.values.len(), PAGE_SIZE as usize)?;
        Ok(ListPage::new(grants, next))
    }
}

#[async_trait]
impl ResourceProvisioner for GroupSyncer {
    async fn grant(&self, principal: &Resource, entitlement: &Entitlement) -> ConnectorResult<GrantOutcome> {
        require_user(&principal.id, "granted to")?;
        let group_id = &entitlement.resource.resource;

        match self.jira.add_user_to_group(group_id, &principal.id.resource).await {
            Ok(()) => Ok(GrantOutcome::Granted),
            Err(e) if e.message_contains("User is already a member of") => Ok(GrantOutcome::AlreadyExists),
            Err(e) => {
                error!(group = %group_id, user = %principal.id.resource, error = %e, "Failed to add user to group");
                Err(e.into())
            }
        }
    }

    async fn revoke(&self, grant: &Grant) -> ConnectorResult<RevokeOutcome> {
        require_user(&grant.principal, "revoked from")?;
        let group_id = &grant.resource.resource;

        match self.jira.remove_user_from_group(group_id, &grant.principal.resource).await {
            Ok(()) => Ok(RevokeOutcome::Revoked),
            Err(e) if e.message_contains("not a member of") => Ok(RevokeOutcome::AlreadyRevoked),
            Err(e) => {
                error!(group = %group_id, user = %grant.principal.resource, error = %e, "Failed to remove user from group");
                Err(e.into())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn group_profile() {
        let group = group_resource("g-1", "devs");
        assert_eq!(group.id, GROUP.resource_id("g-1"));
        assert_eq!(group.profile_str("name"), Some("devs"));
        assert_eq!(group.profile_str("id"), Some("g-1"));
    }

    #[test]
    fn only_users_are_provisioned() {
        assert!(require_user(&USER.resource_id("u-1"), "granted to").is_ok());
        let err = require_user(&GROUP.resource_id("g-2"), "granted to").unwrap_err();
        assert_eq!(err.to_string(), "only users can be granted to groups");
    }
}
