//! Jira REST API payloads.
//!
//! Only the attributes the connector reads are modelled; everything else in
//! the remote JSON is ignored.

use crate::error::{ClientError, ClientResult};
use chrono::{DateTime, Utc};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::LazyLock;

/// Remote custom field data types.
pub mod field_type {
    pub const STRING: &str = "string";
    pub const ARRAY: &str = "array";
    pub const DATE: &str = "date";
    pub const DATETIME: &str = "datetime";
    pub const NUMBER: &str = "number";
    pub const USER: &str = "user";
    pub const GROUP: &str = "group";
    pub const OBJECT: &str = "object";
    pub const OPTION: &str = "option";
}

/// Role actor kinds returned by the project role endpoints.
pub const USER_ROLE_ACTOR: &str = "atlassian-user-role-actor";
pub const GROUP_ROLE_ACTOR: &str = "atlassian-group-role-actor";

// ---- Users and groups ----

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    #[serde(default)]
    pub account_id: String,
    #[serde(default)]
    pub account_type: String,
    #[serde(default)]
    pub email_address: String,
    #[serde(default)]
    pub display_name: String,
    #[serde(default)]
    pub active: bool,
}

/// Members of a group come back in the user shape.
pub type GroupMember = User;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GroupSummary {
    #[serde(default)]
    pub group_id: String,
    pub name: String,
}

/// Envelope of the offset-paginated endpoints.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Page<T> {
    #[serde(default = "Vec::new")]
    pub values: Vec<T>,
    #[serde(default)]
    pub start_at: u64,
    #[serde(default)]
    pub max_results: u64,
    #[serde(default)]
    pub total: u64,
    #[serde(default)]
    pub is_last: bool,
}

// ---- Roles ----

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ActorUser {
    #[serde(default)]
    pub account_id: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ActorGroup {
    #[serde(default)]
    pub display_name: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub group_id: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RoleActor {
    #[serde(default)]
    pub id: u64,
    #[serde(default)]
    pub display_name: String,
    #[serde(rename = "type", default)]
    pub actor_type: String,
    #[serde(default)]
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub actor_user: Option<ActorUser>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub actor_group: Option<ActorGroup>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Role {
    pub id: u64,
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(rename = "self", default)]
    pub self_link: String,
    #[serde(default)]
    pub actors: Vec<RoleActor>,
}

static ROLE_ID_IN_LINK: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"/(\d+)/?$").expect("role link pattern is valid"));

/// Extracts the role id from a project role link such as
/// `https://site.atlassian.net/rest/api/3/project/10001/role/10002`.
pub fn parse_role_id(role_link: &str) -> ClientResult<u64> {
    ROLE_ID_IN_LINK
        .captures(role_link)
        .and_then(|c| c.get(1))
        .and_then(|m| m.as_str().parse::<u64>().ok())
        .ok_or_else(|| ClientError::RoleIdNotFound(role_link.to_string()))
}

// ---- Projects ----

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ProjectCategory {
    #[serde(default)]
    pub name: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct IssueType {
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub subtask: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Project {
    pub id: String,
    #[serde(default)]
    pub key: String,
    #[serde(default)]
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lead: Option<User>,
    #[serde(default)]
    pub issue_types: Vec<IssueType>,
    /// Role name to role link.
    #[serde(default)]
    pub roles: BTreeMap<String, String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub project_category: Option<ProjectCategory>,
    #[serde(default)]
    pub is_private: bool,
}

impl Project {
    /// Role ids parsed from the role links, in role-name order.
    pub fn role_ids(&self) -> ClientResult<Vec<u64>> {
        self.roles.values().map(|link| parse_role_id(link)).collect()
    }

    #[must_use]
    pub fn category_name(&self) -> &str {
        self.project_category.as_ref().map_or("", |c| c.name.as_str())
    }
}

// ---- Issue metadata and statuses ----

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FieldSchema {
    #[serde(rename = "type", default)]
    pub field_type: String,
    #[serde(default)]
    pub custom: String,
    #[serde(default)]
    pub custom_id: u64,
    #[serde(default)]
    pub items: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Choice {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub value: String,
}

impl Choice {
    /// The name, falling back to the value.
    #[must_use]
    pub fn display_name(&self) -> &str {
        if self.name.is_empty() {
            &self.value
        } else {
            &self.name
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MetaField {
    #[serde(default)]
    pub required: bool,
    #[serde(default)]
    pub schema: FieldSchema,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub key: String,
    #[serde(default)]
    pub field_id: String,
    #[serde(default)]
    pub has_default_value: bool,
    #[serde(default)]
    pub allowed_values: Vec<Choice>,
}

impl MetaField {
    /// Stable id of the field; older payloads only carry `fieldId`.
    #[must_use]
    pub fn id(&self) -> &str {
        if self.key.is_empty() {
            &self.field_id
        } else {
            &self.key
        }
    }
}

/// Page of creation metadata for one project and issue type.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateMetaPage {
    #[serde(default, alias = "values")]
    pub fields: Vec<MetaField>,
    #[serde(default)]
    pub start_at: u64,
    #[serde(default)]
    pub max_results: u64,
    #[serde(default)]
    pub total: u64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ScopeProject {
    #[serde(default)]
    pub id: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StatusScope {
    #[serde(rename = "type", default)]
    pub scope_type: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub project: Option<ScopeProject>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct JiraStatus {
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scope: Option<StatusScope>,
}

impl JiraStatus {
    /// Global statuses apply everywhere; project statuses only to their project.
    #[must_use]
    pub fn applies_to(&self, project_id: &str) -> bool {
        match &self.scope {
            None => true,
            Some(scope) if scope.scope_type.eq_ignore_ascii_case("GLOBAL") => true,
            Some(scope) => scope
                .project
                .as_ref()
                .is_some_and(|p| p.id == project_id),
        }
    }
}

// ---- Issues ----

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NamedRef {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub name: String,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct IssueFields {
    #[serde(default)]
    pub summary: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub issuetype: Option<NamedRef>,
    #[serde(default)]
    pub status: Option<NamedRef>,
    #[serde(default)]
    pub labels: Vec<String>,
    #[serde(default)]
    pub created: Option<String>,
    #[serde(default)]
    pub updated: Option<String>,
    #[serde(default)]
    pub assignee: Option<User>,
    #[serde(default)]
    pub reporter: Option<User>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct Issue {
    pub id: String,
    #[serde(default)]
    pub key: String,
    #[serde(default)]
    pub fields: Option<IssueFields>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct KeyRef {
    pub key: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct IdRef {
    pub id: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct IssueTypeRef {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

/// Fields of an issue-creation request. Anything not modelled goes into
/// `extra`, keyed by remote field id.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct NewIssueFields {
    pub summary: String,
    pub project: KeyRef,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub description: String,
    pub issuetype: IssueTypeRef,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<IdRef>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub labels: Vec<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub components: Vec<IdRef>,
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct NewIssue {
    pub fields: NewIssueFields,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct CreatedIssue {
    pub id: String,
    #[serde(default)]
    pub key: String,
}

// ---- Audit log ----

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuditObjectItem {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub type_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent_name: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuditChangedValue {
    #[serde(default)]
    pub field_name: String,
    #[serde(default)]
    pub changed_from: String,
    #[serde(default)]
    pub changed_to: String,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuditRecord {
    pub id: i64,
    #[serde(default)]
    pub summary: String,
    #[serde(default)]
    pub remote_address: String,
    #[serde(default)]
    pub author_account_id: String,
    #[serde(default)]
    pub created: String,
    #[serde(default)]
    pub category: String,
    #[serde(default)]
    pub event_source: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub object_item: AuditObjectItem,
    #[serde(default)]
    pub changed_values: Vec<AuditChangedValue>,
    #[serde(default)]
    pub associated_items: Vec<AuditObjectItem>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct AuditPage {
    #[serde(default)]
    pub offset: u64,
    #[serde(default)]
    pub limit: u64,
    #[serde(default)]
    pub total: u64,
    #[serde(default)]
    pub records: Vec<AuditRecord>,
}

/// Query for one page of audit records.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AuditQuery {
    pub filter: String,
    pub from: Option<DateTime<Utc>>,
    pub offset: u64,
    pub limit: u64,
}

/// Parses the timestamp formats Jira emits (`2024-01-15T10:30:00.000+0000`
/// and RFC 3339).
pub fn parse_jira_time(raw: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f%z")
        .or_else(|_| DateTime::parse_from_rfc3339(raw))
        .ok()
        .map(|t| t.with_timezone(&Utc))
}
