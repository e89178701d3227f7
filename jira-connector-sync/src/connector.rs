//! The connector facade the host drives.
//!
//! Owns the remote clients, one syncer per resource type, the ticket
//! manager and the event feed, and routes every host operation to them.

use crate::config::ConnectorConfig;
use crate::error::{ConnectorError, ConnectorResult};
use crate::events::EventFeed;
use crate::resources::{
    AdminDirectory, GROUP, GroupSyncer, ListPage, PROJECT, PROJECT_ROLE, ProjectRoleSyncer, ProjectSyncer,
    RESOURCE_TYPES, ROLE, ResourceProvisioner, ResourceSyncer, RoleSyncer, USER, UserSyncer,
};
use crate::tickets::{TicketManager, TicketRequest};
use chrono::{DateTime, Utc};
use jira_connector_client::{AtlassianClient, JiraClient, MemorySessionStore, SessionStore};
use jira_connector_types::{
    Entitlement, Event, Grant, GrantOutcome, Profile, Resource, ResourceType, RevokeOutcome,
    StreamState, Ticket, TicketSchema,
};
use std::sync::Arc;
use tracing::{debug, info, warn};

pub struct JiraConnector {
    config: ConnectorConfig,
    jira: Arc<JiraClient>,
    users: UserSyncer,
    groups: GroupSyncer,
    roles: RoleSyncer,
    projects: ProjectSyncer,
    project_roles: ProjectRoleSyncer,
    tickets: TicketManager,
    events: EventFeed,
}

impl JiraConnector {
    /// Builds a connector with an in-process session store.
    pub async fn from_config(config: ConnectorConfig) -> ConnectorResult<Self> {
        Self::with_session(config, Arc::new(MemorySessionStore::new())).await
    }

    /// Builds a connector memoizing lookups in `session`.
    ///
    /// Resolves the Jira base URL for the configured account and, when the
    /// Admin API is configured, the site ids of the Jira site.
    pub async fn with_session(config: ConnectorConfig, session: Arc<dyn SessionStore>) -> ConnectorResult<Self> {
        config.validate()?;

        let jira = Arc::new(JiraClient::connect(config.jira(), session).await?);

        let directory = match config.atlassian() {
            Some(admin) => {
                let client = AtlassianClient::new(admin)?;
                let site_ids = client.site_ids(jira.site_url()).await?;
                info!(sites = site_ids.len(), "Listing users and groups through the Admin API");
                Some(AdminDirectory {
                    client: Arc::new(client),
                    site_ids,
                })
            }
            None => None,
        };

        Ok(Self {
            users: UserSyncer::new(jira.clone(), directory.clone(), config.skip_customer_users),
            groups: GroupSyncer::new(jira.clone(), directory),
            roles: RoleSyncer::new(jira.clone()),
            projects: ProjectSyncer::new(jira.clone(), config.skip_project_participants),
            project_roles: ProjectRoleSyncer::new(jira.clone()),
            tickets: TicketManager::new(jira.clone(), config.project_keys()),
            events: EventFeed::new(jira.clone()),
            jira,
            config,
        })
    }

    #[must_use]
    pub fn config(&self) -> &ConnectorConfig {
        &self.config
    }

    /// Resource types in sync order.
    #[must_use]
    pub fn resource_types(&self) -> &'static [&'static ResourceType] {
        &RESOURCE_TYPES
    }

    /// Syncer for a resource type id.
    pub fn syncer(&self, resource_type: &str) -> ConnectorResult<&dyn ResourceSyncer> {
        let syncer: &dyn ResourceSyncer = match resource_type {
            t if t == USER.id => &self.users,
            t if t == GROUP.id => &self.groups,
            t if t == ROLE.id => &self.roles,
            t if t == PROJECT.id => &self.projects,
            t if t == PROJECT_ROLE.id => &self.project_roles,
            other => {
                return Err(ConnectorError::NotFound(format!("unknown resource type '{other}'")));
            }
        };
        Ok(syncer)
    }

    fn provisioner(&self, resource_type: &str) -> ConnectorResult<&dyn ResourceProvisioner> {
        let provisioner: &dyn ResourceProvisioner = match resource_type {
            t if t == GROUP.id => &self.groups,
            t if t == PROJECT_ROLE.id => &self.project_roles,
            other => {
                return Err(ConnectorError::Unimplemented(format!(
                    "provisioning is not supported for resource type '{other}'"
                )));
            }
        };
        Ok(provisioner)
    }

    /// Checks the credentials can read the account and the groups.
    ///
    /// A 401 on the group probe re-resolves the base URL once (service
    /// accounts move to the scoped API) and retries the probe once.
    pub async fn validate(&self) -> ConnectorResult<()> {
        let me = self.jira.myself().await?;
        debug!(account_id = %me.account_id, "Authenticated");

        match self.jira.bulk_groups(0, 1).await {
            Ok(_) => Ok(()),
            Err(e) if e.is_unauthorized() => {
                warn!(error = %e, "Group access unauthorized, re-resolving Jira base URL");
                self.jira.resolve_base_url().await?;
                self.jira.bulk_groups(0, 1).await?;
                Ok(())
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Adds `principal` to the entitlement's resource.
    pub async fn grant(&self, principal: &Resource, entitlement: &Entitlement) -> ConnectorResult<GrantOutcome> {
        self.provisioner(&entitlement.resource.resource_type)?
            .grant(principal, entitlement)
            .await
    }

    pub async fn revoke(&self, grant: &Grant) -> ConnectorResult<RevokeOutcome> {
        self.provisioner(&grant.resource.resource_type)?
            .revoke(grant)
            .await
    }

    /// Invites a user by email.
    pub async fn create_account(&self, email: &str, profile: &Profile) -> ConnectorResult<Resource> {
        self.users.create_account(email, profile).await
    }

    // ---- Ticketing ----

    fn tickets(&self) -> ConnectorResult<&TicketManager> {
        if self.config.ticketing_enabled {
            Ok(&self.tickets)
        } else {
            Err(ConnectorError::Unimplemented("ticketing is not enabled".to_string()))
        }
    }

    pub async fn list_ticket_schemas(&self, token: &str) -> ConnectorResult<ListPage<TicketSchema>> {
        self.tickets()?.list_ticket_schemas(token).await
    }

    pub async fn get_ticket_schema(&self, id: &str) -> ConnectorResult<TicketSchema> {
        self.tickets()?.get_ticket_schema(id).await
    }

    pub async fn get_ticket(&self, id: &str) -> ConnectorResult<Ticket> {
        self.tickets()?.get_ticket(id).await
    }

    pub async fn create_ticket(&self, ticket: &Ticket, schema: &TicketSchema) -> ConnectorResult<Ticket> {
        self.tickets()?.create_ticket(ticket, schema).await
    }

    pub async fn bulk_create_tickets(&self, requests: &[TicketRequest]) -> ConnectorResult<Vec<ConnectorResult<Ticket>>> {
        Ok(self.tickets()?.bulk_create_tickets(requests).await)
    }

    pub async fn bulk_get_tickets(&self, ids: &[String]) -> ConnectorResult<Vec<ConnectorResult<Ticket>>> {
        Ok(self.tickets()?.bulk_get_tickets(ids).await)
    }

    // ---- Events ----

    /// One page of audit events no older than `earliest`.
    pub async fn list_events(
        &self,
        earliest: Option<DateTime<Utc>>,
        cursor: &str,
    ) -> ConnectorResult<(Vec<Event>, StreamState)> {
        self.events.list(earliest, cursor).await
    }
}
