//! Usage events read from the Jira audit log.
//!
//! The log is walked one filter at a time, in [`AUDIT_FILTERS`] order. The
//! stream cursor records which filter is active and how far into it the last
//! call got.

use crate::error::{ConnectorError, ConnectorResult};
use crate::resources::{GROUP, PROJECT, PROJECT_ROLE, USER};
use chrono::{DateTime, Utc};
use jira_connector_client::JiraClient;
use jira_connector_client::models::{AuditQuery, AuditRecord, parse_jira_time};
use jira_connector_types::{Event, Profile, Resource, ResourceId, StreamState, UsageEvent};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::sync::Arc;
use tracing::{debug, error};

/// Records fetched per call.
pub const EVENT_PAGE_SIZE: u64 = 100;

/// Audit categories turned into usage events.
pub const AUDIT_FILTERS: [&str; 10] = [
    "Deleted Jira issue",
    "Field added to Screen",
    "Field updated in Screen",
    "Field removed from Screen",
    "Sprint created",
    "Issue type created",
    "Issue type updated",
    "Workflow created",
    "Workflow updated",
    "Project updated",
];

/// Position in the audit walk.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuditCursor {
    pub filter_index: usize,
    pub offset: u64,
}

impl AuditCursor {
    /// An empty cursor starts at the first filter.
    pub fn decode(cursor: &str) -> ConnectorResult<Self> {
        if cursor.is_empty() {
            return Ok(Self::default());
        }
        serde_json::from_str(cursor)
            .map_err(|e| ConnectorError::invalid(format!("failed to decode event cursor: {e}")))
    }

    pub fn is_done(&self) -> bool {
        self.filter_index >= AUDIT_FILTERS.len()
    }

    /// Moves past `fetched` records of a filter holding `total` records.
    fn advance(&mut self, fetched: u64, total: u64) {
        self.offset += fetched;
        if fetched == 0 || self.offset >= total {
            self.filter_index += 1;
            self.offset = 0;
        }
    }
}

pub struct EventFeed {
    jira: Arc<JiraClient>,
}

impl EventFeed {
    pub fn new(jira: Arc<JiraClient>) -> Self {
        Self { jira }
    }

    /// One page of events no older than `earliest`.
    pub async fn list(
        &self,
        earliest: Option<DateTime<Utc>>,
        cursor: &str,
    ) -> ConnectorResult<(Vec<Event>, StreamState)> {
        let mut position = AuditCursor::decode(cursor)?;
        let mut events = Vec::new();

        if let Some(filter) = AUDIT_FILTERS.get(position.filter_index) {
            let query = AuditQuery {
                filter: (*filter).to_string(),
                from: earliest,
                offset: position.offset,
                limit: EVENT_PAGE_SIZE,
            };
            let page = self.jira.audit_records(&query).await?;
            debug!(filter, offset = position.offset, records = page.records.len(), total = page.total, "Read audit records");

            for record in page.records.iter().filter(|r| !r.author_account_id.is_empty()) {
                match usage_event(record) {
                    Some(event) => events.push(event),
                    None => error!(record_id = record.id, created = %record.created, "Failed to convert audit record to event"),
                }
            }
            position.advance(page.records.len() as u64, page.total);
        }

        let state = if position.is_done() {
            StreamState::default()
        } else {
            StreamState {
                cursor: serde_json::to_string(&position)?,
                has_more: true,
            }
        };
        Ok((events, state))
    }
}

/// Maps an audit object type to a resource type id. Unknown types pass through.
fn target_type(type_name: &str) -> &str {
    match type_name {
        "USER" => USER.id,
        "GROUP" => GROUP.id,
        "PROJECT" => PROJECT.id,
        "PROJECT_ROLE" => PROJECT_ROLE.id,
        other => other,
    }
}

fn usage_event(record: &AuditRecord) -> Option<Event> {
    let occurred_at = parse_jira_time(&record.created)?;

    let mut metadata = Profile::new();
    metadata.insert("category".into(), json!(record.category));
    metadata.insert("summary".into(), json!(record.summary));
    metadata.insert("remote_address".into(), json!(record.remote_address));
    if !record.changed_values.is_empty() {
        metadata.insert("changes".into(), json!(record.changed_values));
    }
    if !record.associated_items.is_empty() {
        metadata.insert("associated_items".into(), json!(record.associated_items));
    }
    if !record.description.is_empty() {
        metadata.insert("description".into(), json!(record.description));
    }

    let item = &record.object_item;
    Some(Event {
        id: record.id.to_string(),
        occurred_at,
        usage: UsageEvent {
            target: Resource::reference(ResourceId::new(target_type(&item.type_name), &item.id), &item.name),
            actor: Resource::reference(USER.resource_id(&record.author_account_id), ""),
            metadata,
        },
    })
}
