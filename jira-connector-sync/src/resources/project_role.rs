//! Roles scoped to one project, addressed as `{projectId}:{roleId}`.

use super::project::hydrate_projects;
use super::{
    ASSIGNED, GROUP, ListPage, MEMBER, PAGE_SIZE, PROJECT_ROLE, ResourceProvisioner,
    ResourceSyncer, USER, profile,
};
use crate::error::{ConnectorError, ConnectorResult};
use async_trait::async_trait;
use jira_connector_client::JiraClient;
use jira_connector_client::models::{GROUP_ROLE_ACTOR, Project, Role, RoleActor, USER_ROLE_ACTOR};
use jira_connector_types::pagination::{next_offset_cursor, offset_cursor};
use jira_connector_types::{
    Entitlement, Grant, GrantExpandable, GrantOutcome, Resource, ResourceId, ResourceType,
    RevokeOutcome,
};
use serde_json::json;
use std::sync::Arc;
use tracing::{error, info, warn};

/// Splits a project-role resource id into project id and role id.
pub fn parse_project_role_id(id: &str) -> ConnectorResult<(String, u64)> {
    let invalid = || ConnectorError::invalid(format!("invalid project role id '{id}'"));
    let (project_id, role_id) = id.split_once(':').ok_or_else(invalid)?;
    if project_id.is_empty() {
        return Err(invalid());
    }
    let role_id = role_id.parse::<u64>().map_err(|_| invalid())?;
    Ok((project_id.to_string(), role_id))
}

fn project_role_resource(project: &Project, role: &Role) -> Resource {
    Resource::role(
        &PROJECT_ROLE,
        format!("{}:{}", project.id, role.id),
        format!("{} - {}", project.name, role.name),
        profile([
            ("name", json!(role.name)),
            ("role_id", json!(role.id)),
            ("project_id", json!(project.id)),
            ("description", json!(role.description)),
        ]),
    )
}

/// Grant for one actor of a project role. Group grants ask the host to
/// expand them to the group's members.
fn actor_grant(resource: &ResourceId, actor: &RoleActor) -> Option<Grant> {
    match actor.actor_type.as_str() {
        USER_ROLE_ACTOR => {
            let account_id = actor.actor_user.as_ref()?.account_id.as_str();
            Some(Grant::new(resource, ASSIGNED, USER.resource_id(account_id)))
        }
        GROUP_ROLE_ACTOR => {
            let group = GROUP.resource_id(actor.actor_group.as_ref()?.group_id.as_str());
            let expandable = GrantExpandable {
                entitlement_ids: vec![Entitlement::id_for(&group, MEMBER)],
                resource_type_ids: vec![USER.id.to_string()],
            };
            Some(Grant::new(resource, ASSIGNED, group).with_expandable(expandable))
        }
        other => {
            warn!(actor_type = other, actor_id = actor.id, "Unknown role actor type");
            None
        }
    }
}

pub struct ProjectRoleSyncer {
    jira: Arc<JiraClient>,
}

impl ProjectRoleSyncer {
    pub fn new(jira: Arc<JiraClient>) -> Self {
        Self { jira }
    }
}

#[async_trait]
impl ResourceSyncer for ProjectRoleSyncer {
    fn resource_type(&self) -> &'static ResourceType {
        &PROJECT_ROLE
    }

    async fn list(&self, _parent: Option<&ResourceId>, token: &str) -> ConnectorResult<ListPage<Resource>> {
        let (stack, offset) = offset_cursor(token, PROJECT_ROLE.id)?;
        let page = self.jira.search_projects(offset, PAGE_SIZE, &[], &[]).await?;
        let count = page.values.len();
        let projects = hydrate_projects(&self.jira, page.values).await?;

        let mut resources = Vec::new();
        for project in &projects {
            for role_id in project.role_ids()? {
                let role = self.jira.get_role(role_id).await?;
                resources.push(project_role_resource(project, &role));
            }
        }

        let next = next_offset_cursor(stack, offset, count, PAGE_SIZE as usize)?;
        Ok(ListPage::new(resources, next))
    }

    async fn entitlements(&self, resource: &Resource, _token: &str) -> ConnectorResult<ListPage<Entitlement>> {
        let (project_id, role_id) = parse_project_role_id(&resource.id.resource)?;
        let project = self.jira.get_project(&project_id).await?;
        let role = self.jira.get_role(role_id).await?;

        let assigned = Entitlement::assignment(resource, ASSIGNED)
            .with_grantable_to(&[&USER, &GROUP])
            .with_description(format!(
                "Assigned to {} role on the {} project",
                role.name, project.name
            ))
            .with_display_name(format!("{} Assignment", resource.display_name));
        Ok(ListPage::last(vec![assigned]))
    }

    async fn grants(&self, resource: &Resource, _token: &str) -> ConnectorResult<ListPage<Grant>> {
        let (project_id, role_id) = parse_project_role_id(&resource.id.resource)?;
        let scoped = match self.jira.role_actors_for_project(&project_id, role_id).await {
            Ok(role) => role,
            Err(e) if e.status() == Some(404) => {
                return Err(ConnectorError::NotFound(format!(
                    "failed to get role actors for project: {e}"
                )));
            }
            Err(e) => return Err(e.into()),
        };

        let grants = scoped
            .actors
            .iter()
            .filter_map(|actor| actor_grant(&resource.id, actor))
            .collect();
        Ok(ListPage::last(grants))
    }
}

#[async_trait]
impl ResourceProvisioner for ProjectRoleSyncer {
    async fn grant(&self, principal: &Resource, entitlement: &Entitlement) -> ConnectorResult<GrantOutcome> {
        if !principal.id.is_type(&USER) {
            warn!(
                principal_type = %principal.id.resource_type,
                principal_id = %principal.id.resource,
                "Only users can be assigned to project roles"
            );
            return Err(ConnectorError::invalid("only users can be granted to project roles"));
        }
        if entitlement.id != Entitlement::id_for(&entitlement.resource, ASSIGNED) {
            warn!(entitlement_id = %entitlement.id, "Invalid project role entitlement");
            return Err(ConnectorError::invalid("invalid entitlement ID"));
        }

        let (project_id, role_id) = parse_project_role_id(&entitlement.resource.resource)?;
        let account_id = &principal.id.resource;
        match self
            .jira
            .add_actor_to_project_role(&project_id, role_id, account_id)
            .await
        {
            Ok(()) => Ok(GrantOutcome::Granted),
            Err(e) if e.message_contains("already a member of the project role.") => {
                info!(project_id = %project_id, role_id, user = %account_id, "User already a member of the project role");
                Ok(GrantOutcome::AlreadyExists)
            }
            Err(e) => {
                error!(project_id = %project_id, role_id, user = %account_id, error = %e, "Failed to add user to project role");
                Err(e.into())
            }
        }
    }

    async fn revoke(&self, grant: &Grant) -> ConnectorResult<RevokeOutcome> {
        let (project_id, role_id) = parse_project_role_id(&grant.resource.resource)?;
        let account_id = &grant.principal.resource;
        self.jira
            .remove_actor_from_project_role(&project_id, role_id, account_id)
            .await?;
        info!(project_id = %project_id, role_id, user = %account_id, "Removed user from project role");
        Ok(RevokeOutcome::Revoked)
    }
}
