//! Conversion between tickets and Jira issues.

use super::schema::{COMPONENTS_FIELD, ISSUE_TYPE_FIELD, PROJECT_FIELD, SchemaId};
use crate::error::{ConnectorError, ConnectorResult};
use crate::resources::user_resource;
use jira_connector_client::models::{
    IdRef, Issue, IssueTypeRef, KeyRef, NewIssue, NewIssueFields, field_type, parse_jira_time,
};
use jira_connector_types::ticket::validate_ticket;
use jira_connector_types::{
    CustomField, CustomFieldValue, FieldValueError, Ticket, TicketSchema, TicketStatus, TicketType,
};
use serde_json::{Map, Value, json};

fn field_error(field: &str, err: FieldValueError) -> ConnectorError {
    ConnectorError::invalid(format!("field '{field}': {err}"))
}

/// Builds the issue-creation payload for `ticket`.
///
/// The ticket is validated against `schema` first. The issue type comes
/// from the schema id, or from the `issue_type` field for project-keyed
/// schemas; a ticket that resolves to no issue type is rejected.
pub fn new_issue(ticket: &Ticket, schema: &TicketSchema) -> ConnectorResult<NewIssue> {
    let schema_id = SchemaId::parse(&schema.id)
        .ok_or_else(|| ConnectorError::invalid(format!("invalid schema id '{}'", schema.id)))?;
    validate_ticket(schema, ticket)?;
    check_project(ticket, schema)?;

    let mut issue_type_id = schema_id.issue_type_id;
    let mut components = Vec::new();
    let mut extra = Map::new();

    for (id, field) in &schema.custom_fields {
        match id.as_str() {
            PROJECT_FIELD => {}
            COMPONENTS_FIELD => match ticket.field(id).and_then(CustomFieldValue::as_pick_objects) {
                Ok(picked) => {
                    components = picked.iter().map(|c| IdRef { id: c.id.clone() }).collect();
                }
                Err(FieldValueError::Missing) => {}
                Err(e) => return Err(field_error(id, e)),
            },
            ISSUE_TYPE_FIELD if issue_type_id.is_none() => {
                let picked = ticket
                    .field(id)
                    .and_then(CustomFieldValue::as_pick_object)
                    .map_err(|e| field_error(id, e))?;
                issue_type_id = Some(picked.id.clone());
            }
            ISSUE_TYPE_FIELD => {}
            _ => {
                if let Ok(value) = ticket.field(id) {
                    extra.insert(id.clone(), remote_value(field, value)?);
                }
            }
        }
    }

    let issue_type_id = issue_type_id
        .filter(|id| !id.is_empty())
        .ok_or_else(|| ConnectorError::invalid("unable to create ticket, issue type is required"))?;

    Ok(NewIssue {
        fields: NewIssueFields {
            summary: ticket.display_name.clone(),
            project: KeyRef {
                key: schema_id.project_key,
            },
            description: ticket.description.clone(),
            issuetype: IssueTypeRef {
                id: Some(issue_type_id),
                name: None,
            },
            status: ticket
                .status
                .as_ref()
                .filter(|s| !s.id.is_empty())
                .map(|s| IdRef { id: s.id.clone() }),
            labels: ticket.labels.iter().map(|l| l.replace(' ', "_")).collect(),
            components,
            extra,
        },
    })
}

/// A ticket naming a project must name the schema's project.
fn check_project(ticket: &Ticket, schema: &TicketSchema) -> ConnectorResult<()> {
    let Some(project) = &schema.project else {
        return Ok(());
    };
    match ticket.field(PROJECT_FIELD).and_then(CustomFieldValue::as_pick_object) {
        Ok(picked) if picked.id != project.id => Err(ConnectorError::invalid(format!(
            "ticket project '{}' does not match schema project '{}'",
            picked.id, project.id
        ))),
        Ok(_) | Err(FieldValueError::Missing) => Ok(()),
        Err(e) => Err(field_error(PROJECT_FIELD, e)),
    }
}

/// Shapes a custom-field value the way Jira's create endpoint expects it.
fn remote_value(field: &CustomField, value: &CustomFieldValue) -> ConnectorResult<Value> {
    Ok(match value {
        CustomFieldValue::String(s) => match field.remote_type.as_deref() {
            Some(field_type::USER) => json!({ "accountId": s }),
            Some(field_type::GROUP) => json!({ "name": s }),
            Some(field_type::NUMBER) => number(&field.id, s)?,
            _ => json!(s),
        },
        CustomFieldValue::Strings(values) | CustomFieldValue::PickStrings(values) => json!(values),
        CustomFieldValue::Bool(b) => json!(b),
        CustomFieldValue::Timestamp(t) => json!(t.to_rfc3339()),
        CustomFieldValue::PickString(s) => json!(s),
        CustomFieldValue::PickObject(choice) => json!({ "id": choice.id }),
        CustomFieldValue::PickObjects(choices) => {
            Value::Array(choices.iter().map(|c| json!({ "id": c.id })).collect())
        }
    })
}

fn number(field: &str, raw: &str) -> ConnectorResult<Value> {
    let raw = raw.trim();
    if let Ok(n) = raw.parse::<i64>() {
        return Ok(json!(n));
    }
    raw.parse::<f64>()
        .ok()
        .filter(|n| n.is_finite())
        .map(|n| json!(n))
        .ok_or_else(|| ConnectorError::invalid(format!("field '{field}': '{raw}' is not a number")))
}

/// Converts a Jira issue into a ticket. `site_url` is the browser-facing
/// Jira URL the ticket link points at.
pub fn issue_to_ticket(issue: &Issue, site_url: &str) -> ConnectorResult<Ticket> {
    let fields = issue
        .fields
        .as_ref()
        .ok_or_else(|| ConnectorError::NotFound(format!("issue {} has no fields", issue.id)))?;

    Ok(Ticket {
        id: issue.id.clone(),
        display_name: fields.summary.clone(),
        description: fields.description.clone().unwrap_or_default(),
        ticket_type: fields.issuetype.as_ref().map(|t| TicketType {
            id: t.id.clone(),
            display_name: t.name.clone(),
        }),
        status: fields.status.as_ref().map(|s| TicketStatus {
            id: s.id.clone(),
            display_name: s.name.clone(),
        }),
        labels: fields.labels.clone(),
        created_at: fields.created.as_deref().and_then(parse_jira_time),
        updated_at: fields.updated.as_deref().and_then(parse_jira_time),
        url: format!("{}/browse/{}", site_url.trim_end_matches('/'), issue.key),
        assignees: fields.assignee.iter().map(user_resource).collect(),
        reporter: fields.reporter.as_ref().map(user_resource),
        custom_fields: Default::default(),
    })
}
