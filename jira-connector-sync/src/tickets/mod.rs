//! Ticketing bridge: schema discovery, ticket creation and retrieval.
//!
//! Derived schemas are memoized by id for the life of the manager. There is
//! no eviction; a new manager starts cold.

pub mod schema;
pub mod translate;

use crate::error::{ConnectorError, ConnectorResult};
use crate::resources::{ListPage, PAGE_SIZE};
use jira_connector_client::JiraClient;
use jira_connector_client::models::{IssueType, JiraStatus, MetaField, Project};
use jira_connector_types::pagination::{next_offset_cursor, offset_cursor};
use jira_connector_types::{Ticket, TicketSchema, TicketStatus};
use schema::{SchemaId, is_ticket_issue_type};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{debug, error, info, warn};

const SCHEMA_CURSOR_TYPE: &str = "ticket-schema";
const METADATA_PAGE_SIZE: u64 = 100;
const STATUS_PAGE_SIZE: u64 = 100;

/// One entry of a bulk creation request.
#[derive(Debug, Clone)]
pub struct TicketRequest {
    pub ticket: Ticket,
    pub schema: TicketSchema,
}

pub struct TicketManager {
    jira: Arc<JiraClient>,
    project_keys: Vec<String>,
    schemas: RwLock<HashMap<String, TicketSchema>>,
}

impl TicketManager {
    /// `project_keys` restricts schema listing; empty means every project.
    pub fn new(jira: Arc<JiraClient>, project_keys: Vec<String>) -> Self {
        Self {
            jira,
            project_keys,
            schemas: RwLock::new(HashMap::new()),
        }
    }

    /// Number of memoized schemas.
    pub async fn cached_schemas(&self) -> usize {
        self.schemas.read().await.len()
    }

    async fn cached(&self, id: &str) -> Option<TicketSchema> {
        self.schemas.read().await.get(id).cloned()
    }

    async fn remember(&self, schema: &TicketSchema) {
        self.schemas
            .write()
            .await
            .insert(schema.id.clone(), schema.clone());
    }

    /// All creation metadata for one project and issue type.
    async fn create_metadata(&self, project_id: &str, issue_type_id: &str) -> ConnectorResult<Vec<MetaField>> {
        let mut fields = Vec::new();
        loop {
            let page = self
                .jira
                .create_meta_issue_type(project_id, issue_type_id, fields.len() as u64, METADATA_PAGE_SIZE)
                .await?;
            let fetched = page.fields.len();
            fields.extend(page.fields);
            if fetched == 0 || fields.len() as u64 >= page.total {
                return Ok(fields);
            }
        }
    }

    /// "Done" statuses usable in `project_id`.
    async fn statuses(&self, project_id: &str) -> ConnectorResult<Vec<TicketStatus>> {
        let mut statuses: Vec<JiraStatus> = Vec::new();
        loop {
            let page = self
                .jira
                .search_statuses(project_id, statuses.len() as u64, STATUS_PAGE_SIZE)
                .await?;
            let fetched = page.values.len();
            statuses.extend(page.values);
            if fetched == 0 || page.is_last || statuses.len() as u64 >= page.total {
                return Ok(schema::ticket_statuses(&statuses, project_id));
            }
        }
    }

    async fn issue_type_schema(
        &self,
        project: &Project,
        issue_type: &IssueType,
        statuses: &[TicketStatus],
    ) -> ConnectorResult<TicketSchema> {
        let id = SchemaId::new(&project.key, &issue_type.id).to_string();
        if let Some(schema) = self.cached(&id).await {
            return Ok(schema);
        }

        let fields = self.create_metadata(&project.id, &issue_type.id).await?;
        let schema = schema::issue_type_schema(project, issue_type, &fields, statuses.to_vec());
        debug!(schema_id = %schema.id, fields = schema.custom_fields.len(), "Derived ticket schema");
        self.remember(&schema).await;
        Ok(schema)
    }

    /// One page of schemas, one per project and eligible issue type. A
    /// project or issue type whose schema cannot be derived is skipped.
    pub async fn list_ticket_schemas(&self, token: &str) -> ConnectorResult<ListPage<TicketSchema>> {
        let (stack, offset) = offset_cursor(token, SCHEMA_CURSOR_TYPE)?;
        let page = self
            .jira
            .search_projects(offset, PAGE_SIZE, &["issueTypes"], &self.project_keys)
            .await?;
        let several_projects = page.values.len() > 1;

        let mut schemas = Vec::new();
        for project in &page.values {
            let statuses = match self.statuses(&project.id).await {
                Ok(statuses) => statuses,
                Err(e) => {
                    warn!(project_key = %project.key, error = %e, "Skipping project, failed to read statuses");
                    continue;
                }
            };
            for issue_type in project.issue_types.iter().filter(|t| is_ticket_issue_type(t)) {
                match self.issue_type_schema(project, issue_type, &statuses).await {
                    Ok(mut schema) => {
                        if several_projects {
                            schema::qualify_display_name(&mut schema, &project.key);
                        }
                        schemas.push(schema);
                    }
                    Err(e) => warn!(
                        project_key = %project.key,
                        issue_type_id = %issue_type.id,
                        error = %e,
                        "Skipping ticket schema"
                    ),
                }
            }
        }

        let next = next_offset_cursor(stack, offset, page.values.len(), PAGE_SIZE as usize)?;
        Ok(ListPage::new(schemas, next))
    }

    /// Schema by id, either `{projectKey}:{issueTypeId}` or a bare project key.
    pub async fn get_ticket_schema(&self, id: &str) -> ConnectorResult<TicketSchema> {
        let schema_id = SchemaId::parse(id).ok_or_else(|| {
            ConnectorError::invalid(format!(
                "invalid schema id '{id}', expected 'projectKey:issueTypeId'"
            ))
        })?;
        if let Some(schema) = self.cached(id).await {
            return Ok(schema);
        }

        let project = self.jira.get_project(&schema_id.project_key).await?;
        let statuses = self.statuses(&project.id).await?;

        match &schema_id.issue_type_id {
            Some(issue_type_id) => {
                let issue_type = project
                    .issue_types
                    .iter()
                    .find(|t| &t.id == issue_type_id)
                    .ok_or_else(|| {
                        ConnectorError::NotFound(format!(
                            "issue type {issue_type_id} not found in project {}",
                            project.key
                        ))
                    })?;
                self.issue_type_schema(&project, issue_type, &statuses).await
            }
            None => {
                let schema = schema::project_schema(&project, statuses);
                self.remember(&schema).await;
                Ok(schema)
            }
        }
    }

    pub async fn get_ticket(&self, id: &str) -> ConnectorResult<Ticket> {
        let issue = self.jira.get_issue(id).await?;
        translate::issue_to_ticket(&issue, self.jira.site_url())
    }

    /// Creates an issue from `ticket` and reads it back.
    pub async fn create_ticket(&self, ticket: &Ticket, schema: &TicketSchema) -> ConnectorResult<Ticket> {
        let payload = translate::new_issue(ticket, schema)?;
        let project_key = payload.fields.project.key.clone();
        info!(project_key = %project_key, schema_id = %schema.id, "Creating issue");

        let created = self.jira.create_issue(payload).await.map_err(|e| {
            error!(project_key = %project_key, error = %e, "Failed to create issue");
            e
        })?;
        self.get_ticket(&created.id).await
    }

    /// Creates each ticket in turn; one failure does not stop the others.
    pub async fn bulk_create_tickets(&self, requests: &[TicketRequest]) -> Vec<ConnectorResult<Ticket>> {
        let mut results = Vec::with_capacity(requests.len());
        for request in requests {
            results.push(self.create_ticket(&request.ticket, &request.schema).await);
        }
        results
    }

    /// Reads each ticket in turn; one failure does not stop the others.
    pub async fn bulk_get_tickets(&self, ids: &[String]) -> Vec<ConnectorResult<Ticket>> {
        let mut results = Vec::with_capacity(ids.len());
        for id in ids {
            results.push(self.get_ticket(id).await);
        }
        results
    }
}
