//! Derivation of ticket schemas from Jira creation metadata.
//!
//! Every remote field maps to exactly one [`CustomFieldKind`]; the remote
//! type is kept on the field so the payload builder can shape values for
//! Jira (user and group references, numbers).

use jira_connector_client::models::{IssueType, JiraStatus, MetaField, Project, field_type};
use jira_connector_types::{
    CustomField, ObjectChoice, ProjectRef, TicketSchema, TicketStatus, TicketType,
};
use std::collections::BTreeMap;
use std::fmt;

/// Synthetic field pinning a ticket to the schema's project.
pub const PROJECT_FIELD: &str = "project";
/// Field carrying the issue type in project-keyed schemas.
pub const ISSUE_TYPE_FIELD: &str = "issue_type";
pub const COMPONENTS_FIELD: &str = "components";

/// Fields covered by top-level ticket attributes.
const IGNORED_FIELDS: [&str; 5] = ["issuetype", "project", "assignee", "summary", "reporter"];

/// Issue type names never offered as ticket schemas.
const SKIPPED_ISSUE_TYPES: [&str; 2] = ["Epic", "Bug"];

/// Identity of a schema: `{projectKey}:{issueTypeId}`, or just the project
/// key for schemas created before issue types were part of the id.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SchemaId {
    pub project_key: String,
    pub issue_type_id: Option<String>,
}

impl SchemaId {
    pub fn new(project_key: impl Into<String>, issue_type_id: impl Into<String>) -> Self {
        Self {
            project_key: project_key.into(),
            issue_type_id: Some(issue_type_id.into()),
        }
    }

    /// Returns `None` for an empty key, an empty issue type, or more than
    /// two segments.
    pub fn parse(raw: &str) -> Option<Self> {
        let mut parts = raw.split(':');
        let project_key = parts.next().filter(|k| !k.is_empty())?.to_string();
        let issue_type_id = match parts.next() {
            None => None,
            Some("") => return None,
            Some(id) => Some(id.to_string()),
        };
        if parts.next().is_some() {
            return None;
        }
        Some(Self {
            project_key,
            issue_type_id,
        })
    }

    pub fn is_legacy(&self) -> bool {
        self.issue_type_id.is_none()
    }
}

impl fmt::Display for SchemaId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.issue_type_id {
            Some(issue_type) => write!(f, "{}:{issue_type}", self.project_key),
            None => f.write_str(&self.project_key),
        }
    }
}

/// Whether tickets may be created with this issue type.
pub fn is_ticket_issue_type(issue_type: &IssueType) -> bool {
    !issue_type.subtask && !SKIPPED_ISSUE_TYPES.contains(&issue_type.name.as_str())
}

/// Custom fields, plus required system fields the ticket does not already
/// carry as top-level attributes.
pub fn is_schema_field(field: &MetaField) -> bool {
    if IGNORED_FIELDS.contains(&field.id()) {
        return false;
    }
    !field.schema.custom.is_empty() || field.required
}

/// Classifies one remote field.
pub fn classify(field: &MetaField) -> CustomField {
    let id = field.id();
    let name = field.name.as_str();
    let required = field.required;
    let choices: Vec<ObjectChoice> = field
        .allowed_values
        .iter()
        .map(|c| ObjectChoice::new(&c.id, c.display_name()))
        .collect();
    let has_choices = !choices.is_empty();
    let multi = !field.schema.items.is_empty();

    let custom = match field.schema.field_type.as_str() {
        field_type::STRING => CustomField::string(id, name, required),
        field_type::ARRAY => match (multi, has_choices) {
            (true, true) => CustomField::pick_objects(id, name, required, choices),
            (true, false) if field.schema.items == "component" => {
                CustomField::pick_objects(id, name, required, Vec::new())
            }
            (true, false) => CustomField::strings(id, name, required),
            (false, true) => CustomField::pick_object(id, name, required, choices),
            (false, false) => CustomField::string(id, name, required),
        },
        field_type::DATE | field_type::DATETIME => CustomField::timestamp(id, name, required),
        field_type::OBJECT | field_type::GROUP | field_type::USER | field_type::OPTION
            if has_choices =>
        {
            CustomField::pick_object(id, name, required, choices)
        }
        // Numbers stay text until the payload is built.
        _ => CustomField::string(id, name, required),
    };
    custom.with_remote_type(&field.schema.field_type)
}

fn project_field(project: &Project) -> CustomField {
    CustomField::pick_object(
        PROJECT_FIELD,
        "Project",
        true,
        vec![ObjectChoice::new(&project.id, &project.name)],
    )
}

fn project_ref(project: &Project) -> ProjectRef {
    ProjectRef {
        id: project.id.clone(),
        key: project.key.clone(),
        name: project.name.clone(),
    }
}

/// Appends the project key to a schema's display name, for listings that
/// span several projects.
pub fn qualify_display_name(schema: &mut TicketSchema, project_key: &str) {
    schema.display_name = format!("{} ({project_key})", schema.display_name);
}

/// Statuses usable in `project_id`, in remote order.
pub fn ticket_statuses(statuses: &[JiraStatus], project_id: &str) -> Vec<TicketStatus> {
    statuses
        .iter()
        .filter(|s| s.applies_to(project_id))
        .map(|s| TicketStatus {
            id: s.id.clone(),
            display_name: s.name.clone(),
        })
        .collect()
}

/// Schema for one project and issue type.
pub fn issue_type_schema(
    project: &Project,
    issue_type: &IssueType,
    fields: &[MetaField],
    statuses: Vec<TicketStatus>,
) -> TicketSchema {
    let mut custom_fields: BTreeMap<String, CustomField> = fields
        .iter()
        .filter(|f| is_schema_field(f))
        .map(classify)
        .map(|f| (f.id.clone(), f))
        .collect();
    custom_fields.insert(PROJECT_FIELD.to_string(), project_field(project));

    TicketSchema {
        id: SchemaId::new(&project.key, &issue_type.id).to_string(),
        display_name: issue_type.name.clone(),
        types: vec![TicketType {
            id: issue_type.id.clone(),
            display_name: issue_type.name.clone(),
        }],
        statuses,
        custom_fields,
        project: Some(project_ref(project)),
    }
}

/// Project-keyed schema: the issue type is picked per ticket.
pub fn project_schema(project: &Project, statuses: Vec<TicketStatus>) -> TicketSchema {
    let issue_types: Vec<&IssueType> = project
        .issue_types
        .iter()
        .filter(|t| is_ticket_issue_type(t))
        .collect();
    let choices = issue_types
        .iter()
        .map(|t| ObjectChoice::new(&t.id, &t.name))
        .collect();

    let mut custom_fields = BTreeMap::new();
    custom_fields.insert(PROJECT_FIELD.to_string(), project_field(project));
    custom_fields.insert(
        ISSUE_TYPE_FIELD.to_string(),
        CustomField::pick_object(ISSUE_TYPE_FIELD, "Issue Type", true, choices),
    );

    TicketSchema {
        id: project.key.clone(),
        display_name: project.name.clone(),
        types: issue_types
            .iter()
            .map(|t| TicketType {
                id: t.id.clone(),
                display_name: t.name.clone(),
            })
            .collect(),
        statuses,
        custom_fields,
        project: Some(project_ref(project)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use jira_connector_client::models::{Choice, FieldSchema, ScopeProject, StatusScope};
    use jira_connector_types::CustomFieldKind;
    use pretty_assertions::assert_eq;

    fn meta(key: &str, field_type: &str, items: &str, custom: bool, allowed: &[(&str, &str)]) -> MetaField {
        MetaField {
            key: key.into(),
            name: key.to_uppercase(),
            schema: FieldSchema {
                field_type: field_type.into(),
                items: items.into(),
                custom: if custom { "com.atlassian.custom".into() } else { String::new() },
                ..Default::default()
            },
            allowed_values: allowed
                .iter()
                .map(|(id, name)| Choice {
                    id: (*id).into(),
                    name: (*name).into(),
                    ..Default::default()
                })
                .collect(),
            ..Default::default()
        }
    }

    fn project() -> Project {
        Project {
            id: "10000".into(),
            key: "PLAT".into(),
            name: "Platform".into(),
            issue_types: vec![
                IssueType { id: "1".into(), name: "Task".into(), subtask: false },
                IssueType { id: "2".into(), name: "Epic".into(), subtask: false },
                IssueType { id: "3".into(), name: "Sub-task".into(), subtask: true },
                IssueType { id: "4".into(), name: "Bug".into(), subtask: false },
            ],
            ..Default::default()
        }
    }

    #[test]
    fn classification_table() {
        let cases = [
            (meta("a", "string", "", true, &[]), CustomFieldKind::String),
            (meta("b", "array", "string", true, &[]), CustomFieldKind::Strings),
            (meta("c", "array", "", true, &[]), CustomFieldKind::String),
            (meta("d", "date", "", true, &[]), CustomFieldKind::Timestamp),
            (meta("e", "datetime", "", true, &[]), CustomFieldKind::Timestamp),
            (meta("f", "number", "", true, &[]), CustomFieldKind::String),
            (meta("g", "user", "", true, &[]), CustomFieldKind::String),
            (meta("h", "any", "", true, &[]), CustomFieldKind::String),
        ];
        for (field, expected) in cases {
            assert_eq!(classify(&field).kind, expected, "field {}", field.key);
        }
    }

    #[test]
    fn choices_become_object_picks() {
        let multi = classify(&meta("labels", "array", "option", true, &[("1", "One")]));
        assert_eq!(
            multi.kind,
            CustomFieldKind::PickObjects { allowed: vec![ObjectChoice::new("1", "One")] }
        );

        let single = classify(&meta("tier", "array", "", true, &[("1", "Gold")]));
        assert!(matches!(single.kind, CustomFieldKind::PickObject { .. }));

        let option = classify(&meta("env", "option", "", true, &[("7", "Prod")]));
        assert!(matches!(option.kind, CustomFieldKind::PickObject { .. }));
        assert_eq!(option.remote_type.as_deref(), Some("option"));
    }

    #[test]
    fn components_without_choices_are_empty_object_picks() {
        let field = classify(&meta("components", "array", "component", false, &[]));
        assert_eq!(field.kind, CustomFieldKind::PickObjects { allowed: Vec::new() });
    }

    #[test]
    fn choice_display_falls_back_to_value() {
        let mut field = meta("env", "option", "", true, &[]);
        field.allowed_values.push(Choice {
            id: "9".into(),
            value: "Staging".into(),
            ..Default::default()
        });
        assert_eq!(
            classify(&field).kind,
            CustomFieldKind::PickObject { allowed: vec![ObjectChoice::new("9", "Staging")] }
        );
    }

    #[test]
    fn schema_field_filter() {
        assert!(is_schema_field(&meta("customfield_1", "string", "", true, &[])));
        assert!(!is_schema_field(&meta("priority", "priority", "", false, &[])));

        let mut required = meta("components", "array", "component", false, &[]);
        required.required = true;
        assert!(is_schema_field(&required));

        let mut summary = meta("summary", "string", "", false, &[]);
        summary.required = true;
        assert!(!is_schema_field(&summary));
    }

    #[test]
    fn issue_type_schema_injects_project() {
        let project = project();
        let fields = [meta("customfield_1", "string", "", true, &[])];
        let mut schema = issue_type_schema(&project, &project.issue_types[0], &fields, Vec::new());

        assert_eq!(schema.id, "PLAT:1");
        assert_eq!(schema.display_name, "Task");
        qualify_display_name(&mut schema, &project.key);
        assert_eq!(schema.display_name, "Task (PLAT)");
        let project_field = &schema.custom_fields[PROJECT_FIELD];
        assert!(project_field.required);
        assert_eq!(
            project_field.kind,
            CustomFieldKind::PickObject { allowed: vec![ObjectChoice::new("10000", "Platform")] }
        );
        assert!(schema.custom_fields.contains_key("customfield_1"));
    }

    #[test]
    fn project_schema_offers_eligible_issue_types() {
        let schema = project_schema(&project(), Vec::new());
        assert_eq!(schema.id, "PLAT");
        let ids: Vec<_> = schema.types.iter().map(|t| t.id.as_str()).collect();
        assert_eq!(ids, vec!["1"]);
        assert!(schema.custom_fields.contains_key(ISSUE_TYPE_FIELD));
    }

    #[test]
    fn schema_ids() {
        assert_eq!(SchemaId::parse("PLAT:1"), Some(SchemaId::new("PLAT", "1")));
        let legacy = SchemaId::parse("PLAT").unwrap();
        assert!(legacy.is_legacy());
        assert_eq!(legacy.to_string(), "PLAT");
        assert_eq!(SchemaId::parse(""), None);
        assert_eq!(SchemaId::parse("PLAT:"), None);
        assert_eq!(SchemaId::parse("A:1:2"), None);
    }

    #[test]
    fn statuses_filtered_by_scope() {
        let statuses = vec![
            JiraStatus { id: "1".into(), name: "Done".into(), scope: None },
            JiraStatus {
                id: "2".into(),
                name: "Shipped".into(),
                scope: Some(StatusScope {
                    scope_type: "PROJECT".into(),
                    project: Some(ScopeProject { id: "20000".into() }),
                }),
            },
        ];
        let ids: Vec<_> = ticket_statuses(&statuses, "10000").into_iter().map(|s| s.id).collect();
        assert_eq!(ids, vec!["1"]);
    }
}
