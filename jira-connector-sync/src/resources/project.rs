//! Projects: `participate`, `lead` and one permission entitlement per
//! project role.

use super::{LEAD, ListPage, PAGE_SIZE, PARTICIPATE, PROJECT, ROLE, ResourceSyncer, USER, profile};
use crate::error::ConnectorResult;
use async_trait::async_trait;
use jira_connector_client::JiraClient;
use jira_connector_client::models::{Project, Role, USER_ROLE_ACTOR};
use jira_connector_types::pagination::{next_offset_cursor, offset_cursor};
use jira_connector_types::{Entitlement, Grant, Resource, ResourceId, ResourceType};
use serde_json::json;
use std::sync::Arc;
use tracing::debug;

pub(crate) fn project_resource(project: &Project) -> Resource {
    Resource::group(
        &PROJECT,
        &project.id,
        &project.name,
        profile([
            ("name", json!(project.name)),
            ("project_id", json!(project.id)),
            ("category", json!(project.category_name())),
        ]),
    )
}

/// Project search results omit the role links; projects without them are
/// re-read in full, from the session store when it holds them. The complete
/// records are written back to the session store.
pub(crate) async fn hydrate_projects(jira: &JiraClient, projects: Vec<Project>) -> ConnectorResult<Vec<Project>> {
    let missing: Vec<String> = projects
        .iter()
        .filter(|p| p.roles.is_empty())
        .map(|p| p.id.clone())
        .collect();
    let mut fetched = jira.get_projects(&missing).await?.into_iter();

    let full: Vec<Project> = projects
        .into_iter()
        .map(|project| {
            if project.roles.is_empty() {
                fetched.next().unwrap_or(project)
            } else {
                project
            }
        })
        .collect();
    jira.set_projects(&full).await;
    Ok(full)
}

pub struct ProjectSyncer {
    jira: Arc<JiraClient>,
    skip_project_participants: bool,
}

impl ProjectSyncer {
    pub fn new(jira: Arc<JiraClient>, skip_project_participants: bool) -> Self {
        Self {
            jira,
            skip_project_participants,
        }
    }

    async fn roles_for(&self, project: &Project) -> ConnectorResult<Vec<Role>> {
        let mut roles = Vec::with_capacity(project.roles.len());
        for role_id in project.role_ids()? {
            roles.push(self.jira.get_role(role_id).await?);
        }
        Ok(roles)
    }

    fn lead_grants(resource: &Resource, project: &Project) -> Vec<Grant> {
        project
            .lead
            .as_ref()
            .filter(|lead| !lead.account_id.is_empty())
            .map(|lead| Grant::new(&resource.id, LEAD, USER.resource_id(&lead.account_id)))
            .into_iter()
            .collect()
    }

    /// Every user in the site participates in a public project. This walks
    /// the full user directory once per project.
    async fn public_participant_grants(&self, resource: &Resource, project: &Project) -> ConnectorResult<Vec<Grant>> {
        if project.is_private || self.skip_project_participants {
            return Ok(Vec::new());
        }
        let users = self.jira.all_users(PAGE_SIZE).await?;
        debug!(project_id = %project.id, users = users.len(), "Granting participation to all users");
        Ok(users
            .iter()
            .map(|u| Grant::new(&resource.id, PARTICIPATE, USER.resource_id(&u.account_id)))
            .collect())
    }

    async fn role_permission_grants(&self, resource: &Resource, roles: &[Role]) -> ConnectorResult<Vec<Grant>> {
        let mut grants = Vec::new();
        for role in roles {
            let scoped = self
                .jira
                .role_actors_for_project(&resource.id.resource, role.id)
                .await?;
            grants.extend(
                scoped
                    .actors
                    .iter()
                    .filter(|a| a.actor_type.is_empty() || a.actor_type == USER_ROLE_ACTOR)
                    .filter_map(|a| a.actor_user.as_ref())
                    .filter(|u| !u.account_id.is_empty())
                    .map(|u| Grant::new(&resource.id, &role.name, USER.resource_id(&u.account_id))),
            );
        }
        Ok(grants)
    }
}

#[async_trait]
impl ResourceSyncer for ProjectSyncer {
    fn resource_type(&self) -> &'static ResourceType {
        &PROJECT
    }

    async fn list(&self, _parent: Option<&ResourceId>, token: &str) -> ConnectorResult<ListPage<Resource>> {
        let (stack, offset) = offset_cursor(token, PROJECT.id)?;
        let page = self.jira.search_projects(offset, PAGE_SIZE, &["lead"], &[]).await?;
        let count = page.values.len();
        let projects = hydrate_projects(&self.jira, page.values).await?;

        let resources = projects.iter().map(project_resource).collect();
        let next = next_offset_cursor(stack, offset, count, PAGE_SIZE as usize)?;
        Ok(ListPage::new(resources, next))
    }

    async fn entitlements(&self, resource: &Resource, _token: &str) -> ConnectorResult<ListPage<Entitlement>> {
        let name = &resource.display_name;
        let mut entitlements = vec![
            Entitlement::assignment(resource, PARTICIPATE)
                .with_grantable_to(&[&USER])
                .with_description(format!("Participating on {name} project"))
                .with_display_name(format!("{name} project {PARTICIPATE}")),
            Entitlement::assignment(resource, LEAD)
                .with_grantable_to(&[&USER])
                .with_description(format!("Leading {name} project"))
                .with_display_name(format!("{name} project {LEAD}")),
        ];

        let project = self.jira.get_project(&resource.id.resource).await?;
        for role in self.roles_for(&project).await? {
            entitlements.push(
                Entitlement::permission(resource, &role.name)
                    .with_grantable_to(&[&USER])
                    .with_description(format!("Role in {name} project"))
                    .with_display_name(format!("{name} project {}", role.name)),
            );
        }
        Ok(ListPage::last(entitlements))
    }

    async fn grants(&self, resource: &Resource, _token: &str) -> ConnectorResult<ListPage<Grant>> {
        let project = self.jira.get_project(&resource.id.resource).await?;

        let mut grants = Self::lead_grants(resource, &project);
        grants.extend(self.public_participant_grants(resource, &project).await?);

        let roles = self.roles_for(&project).await?;
        grants.extend(
            roles
                .iter()
                .map(|r| Grant::new(&resource.id, PARTICIPATE, ROLE.resource_id(r.id.to_string()))),
        );
        grants.extend(self.role_permission_grants(resource, &roles).await?);

        Ok(ListPage::last(grants))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use jira_connector_client::models::{ProjectCategory, User};

    #[test]
    fn project_profile_carries_category() {
        let project = Project {
            id: "10000".into(),
            key: "PLAT".into(),
            name: "Platform".into(),
            project_category: Some(ProjectCategory {
                name: "Engineering".into(),
            }),
            ..Default::default()
        };
        let resource = project_resource(&project);
        assert_eq!(resource.profile_str("category"), Some("Engineering"));
        assert_eq!(resource.profile_str("project_id"), Some("10000"));
    }

    #[test]
    fn lead_grant_requires_account() {
        let mut project = Project {
            id: "10000".into(),
            name: "Platform".into(),
            ..Default::default()
        };
        let resource = project_resource(&project);
        assert!(ProjectSyncer::lead_grants(&resource, &project).is_empty());

        project.lead = Some(User::default());
        assert!(ProjectSyncer::lead_grants(&resource, &project).is_empty());

        project.lead = Some(User {
            account_id: "u-lead".into(),
            ..Default::default()
        });
        let grants = ProjectSyncer::lead_grants(&resource, &project);
        assert_eq!(grants[0].id, "project:10000:lead:user:u-lead");
    }
}
