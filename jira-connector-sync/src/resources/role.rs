//! Global project roles and their `appointed` entitlements.

use super::project::hydrate_projects;
use super::{APPOINTED, GROUP, ListPage, PAGE_SIZE, ROLE, ResourceSyncer, USER, profile};
use crate::error::{ConnectorError, ConnectorResult};
use async_trait::async_trait;
use jira_connector_client::JiraClient;
use jira_connector_client::models::Role;
use jira_connector_types::{Entitlement, Grant, Resource, ResourceId, ResourceType};
use serde_json::json;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, warn};

fn role_resource(role: &Role, project_name: Option<&str>) -> Resource {
    let display_name = match project_name {
        Some(project) => format!("{project} - {}", role.name),
        None => role.name.clone(),
    };
    let mut profile = profile([
        ("name", json!(role.name)),
        ("role_id", json!(role.id)),
        ("description", json!(role.description)),
    ]);
    if let Some(project) = project_name {
        profile.insert("project_name".to_string(), json!(project));
    }
    Resource::role(&ROLE, role.id.to_string(), display_name, profile)
}

/// Grants for every actor of `role` on `resource`.
pub(crate) fn actor_grants(resource: &ResourceId, slug: &str, role: &Role) -> Vec<Grant> {
    let users = role
        .actors
        .iter()
        .filter_map(|a| a.actor_user.as_ref())
        .filter(|u| !u.account_id.is_empty())
        .map(|u| Grant::new(resource, slug, USER.resource_id(&u.account_id)));
    let groups = role
        .actors
        .iter()
        .filter_map(|a| a.actor_group.as_ref())
        .filter(|g| !g.group_id.is_empty())
        .map(|g| Grant::new(resource, slug, GROUP.resource_id(&g.group_id)));
    users.chain(groups).collect()
}

pub struct RoleSyncer {
    jira: Arc<JiraClient>,
}

impl RoleSyncer {
    pub fn new(jira: Arc<JiraClient>) -> Self {
        Self { jira }
    }

    /// Maps each role id to the name of the first project using it.
    async fn project_names_by_role(&self) -> ConnectorResult<HashMap<u64, String>> {
        let mut names = HashMap::new();
        let mut start_at = 0;
        loop {
            let page = self.jira.search_projects(start_at, PAGE_SIZE, &[], &[]).await?;
            let count = page.values.len() as u64;
            let is_last = page.is_last;
            for project in &hydrate_projects(&self.jira, page.values).await? {
                match project.role_ids() {
                    Ok(ids) => {
                        for id in ids {
                            names.entry(id).or_insert_with(|| project.name.clone());
                        }
                    }
                    Err(e) => warn!(project_id = %project.id, error = %e, "Skipping project roles"),
                }
            }
            if is_last || count < PAGE_SIZE {
                return Ok(names);
            }
            start_at += count;
        }
    }
}

#[async_trait]
impl ResourceSyncer for RoleSyncer {
    fn resource_type(&self) -> &'static ResourceType {
        &ROLE
    }

    /// Lists every role in one page. Display names are prefixed with the
    /// owning project when the project walk succeeds.
    async fn list(&self, _parent: Option<&ResourceId>, _token: &str) -> ConnectorResult<ListPage<Resource>> {
        let roles = self.jira.list_roles().await?;

        let project_names = match self.project_names_by_role().await {
            Ok(names) => names,
            Err(e) => {
                warn!(error = %e, "Failed to map roles to projects, listing roles without project names");
                HashMap::new()
            }
        };
        debug!(roles = roles.len(), mapped = project_names.len(), "Listed roles");

        let resources = roles
            .iter()
            .map(|r| role_resource(r, project_names.get(&r.id).map(String::as_str)))
            .collect();
        Ok(ListPage::last(resources))
    }

    async fn entitlements(&self, resource: &Resource, _token: &str) -> ConnectorResult<ListPage<Entitlement>> {
        let display_name = format!("{} role {APPOINTED}", resource.display_name);
        let for_users = Entitlement::assignment(resource, APPOINTED)
            .with_grantable_to(&[&USER])
            .with_description(format!("Appointed to {} role", resource.display_name))
            .with_display_name(display_name.clone());
        let for_groups = Entitlement::assignment(resource, APPOINTED)
            .with_grantable_to(&[&GROUP])
            .with_description(format!("Members appointed to {} role", resource.display_name))
            .with_display_name(display_name);
        Ok(ListPage::last(vec![for_users, for_groups]))
    }

    async fn grants(&self, resource: &Resource, _token: &str) -> ConnectorResult<ListPage<Grant>> {
        let role_id = resource.id.resource.parse::<u64>().map_err(|_| {
            ConnectorError::invalid(format!("role id '{}' is not a number", resource.id.resource))
        })?;
        let role = self.jira.get_role(role_id).await?;
        Ok(ListPage::last(actor_grants(&resource.id, APPOINTED, &role)))
    }
}
