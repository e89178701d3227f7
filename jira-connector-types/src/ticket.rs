//! Ticket schemas, tickets and custom-field values.
//!
//! Custom fields are described by a [`CustomFieldKind`] and carry values as a
//! [`CustomFieldValue`]. Both are closed unions: reading a value of the wrong
//! shape is an explicit [`FieldValueError`], never a silent coercion.

use crate::error::{FieldValueError, TicketError, TicketResult};
use crate::resource::Resource;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

// ---- Choices, types, statuses ----

/// A selectable object (component, option, user, ...).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ObjectChoice {
    pub id: String,
    pub display_name: String,
}

impl ObjectChoice {
    pub fn new(id: impl Into<String>, display_name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            display_name: display_name.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TicketType {
    pub id: String,
    pub display_name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TicketStatus {
    pub id: String,
    pub display_name: String,
}

/// The project a schema creates tickets in.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProjectRef {
    pub id: String,
    pub key: String,
    pub name: String,
}

// ---- Custom field schema ----

/// Shape of a custom field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum CustomFieldKind {
    String,
    Strings,
    Bool,
    Timestamp,
    PickString { allowed: Vec<String> },
    PickStrings { allowed: Vec<String> },
    PickObject { allowed: Vec<ObjectChoice> },
    PickObjects { allowed: Vec<ObjectChoice> },
}

impl CustomFieldKind {
    #[must_use]
    pub fn name(&self) -> &'static str {
        match self {
            Self::String => "string",
            Self::Strings => "string list",
            Self::Bool => "boolean",
            Self::Timestamp => "timestamp",
            Self::PickString { .. } => "single pick",
            Self::PickStrings { .. } => "multi pick",
            Self::PickObject { .. } => "object pick",
            Self::PickObjects { .. } => "multi object pick",
        }
    }
}

/// A custom field definition inside a schema.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CustomField {
    pub id: String,
    pub display_name: String,
    pub required: bool,
    #[serde(flatten)]
    pub kind: CustomFieldKind,
    /// Remote type the field was derived from, used when building the remote
    /// payload (e.g. `user`, `group`, `number`).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub remote_type: Option<String>,
}

impl CustomField {
    fn simple(id: &str, display_name: &str, required: bool, kind: CustomFieldKind) -> Self {
        Self {
            id: id.into(),
            display_name: display_name.into(),
            required,
            kind,
            remote_type: None,
        }
    }

    /// Shorthand for a free text field.
    pub fn string(id: &str, display_name: &str, required: bool) -> Self {
        Self::simple(id, display_name, required, CustomFieldKind::String)
    }

    /// Shorthand for a list-of-text field.
    pub fn strings(id: &str, display_name: &str, required: bool) -> Self {
        Self::simple(id, display_name, required, CustomFieldKind::Strings)
    }

    pub fn bool(id: &str, display_name: &str, required: bool) -> Self {
        Self::simple(id, display_name, required, CustomFieldKind::Bool)
    }

    pub fn timestamp(id: &str, display_name: &str, required: bool) -> Self {
        Self::simple(id, display_name, required, CustomFieldKind::Timestamp)
    }

    pub fn pick_string(id: &str, display_name: &str, required: bool, allowed: Vec<String>) -> Self {
        Self::simple(id, display_name, required, CustomFieldKind::PickString { allowed })
    }

    pub fn pick_strings(
        id: &str,
        display_name: &str,
        required: bool,
        allowed: Vec<String>,
    ) -> Self {
        Self::simple(id, display_name, required, CustomFieldKind::PickStrings { allowed })
    }

    /// Shorthand for a single object pick.
    pub fn pick_object(
        id: &str,
        display_name: &str,
        required: bool,
        allowed: Vec<ObjectChoice>,
    ) -> Self {
        Self::simple(id, display_name, required, CustomFieldKind::PickObject { allowed })
    }

    /// Shorthand for a multi object pick.
    pub fn pick_objects(
        id: &str,
        display_name: &str,
        required: bool,
        allowed: Vec<ObjectChoice>,
    ) -> Self {
        Self::simple(id, display_name, required, CustomFieldKind::PickObjects { allowed })
    }

    #[must_use]
    pub fn with_remote_type(mut self, remote_type: impl Into<String>) -> Self {
        self.remote_type = Some(remote_type.into());
        self
    }
}

/// Normalized description of the fields a ticket of one kind carries.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct TicketSchema {
    pub id: String,
    pub display_name: String,
    #[serde(default)]
    pub types: Vec<TicketType>,
    #[serde(default)]
    pub statuses: Vec<TicketStatus>,
    #[serde(default)]
    pub custom_fields: BTreeMap<String, CustomField>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub project: Option<ProjectRef>,
}

impl TicketSchema {
    /// Ids of all required custom fields.
    pub fn required_fields(&self) -> impl Iterator<Item = &str> {
        self.custom_fields
            .values()
            .filter(|f| f.required)
            .map(|f| f.id.as_str())
    }
}

// ---- Values ----

/// Value of one custom field on a ticket.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum CustomFieldValue {
    String(String),
    Strings(Vec<String>),
    Bool(bool),
    Timestamp(DateTime<Utc>),
    PickString(String),
    PickStrings(Vec<String>),
    PickObject(ObjectChoice),
    PickObjects(Vec<ObjectChoice>),
}

impl CustomFieldValue {
    #[must_use]
    pub fn kind_name(&self) -> &'static str {
        match self {
            Self::String(_) => "string",
            Self::Strings(_) => "string list",
            Self::Bool(_) => "boolean",
            Self::Timestamp(_) => "timestamp",
            Self::PickString(_) => "single pick",
            Self::PickStrings(_) => "multi pick",
            Self::PickObject(_) => "object pick",
            Self::PickObjects(_) => "multi object pick",
        }
    }

    /// Empty strings and empty lists count as "not set".
    #[must_use]
    pub fn is_empty(&self) -> bool {
        match self {
            Self::String(s) | Self::PickString(s) => s.is_empty(),
            Self::Strings(v) | Self::PickStrings(v) => v.is_empty(),
            Self::PickObject(o) => o.id.is_empty(),
            Self::PickObjects(v) => v.is_empty(),
            Self::Bool(_) | Self::Timestamp(_) => false,
        }
    }

    fn matches(&self, kind: &CustomFieldKind) -> bool {
        matches!(
            (self, kind),
            (Self::String(_), CustomFieldKind::String)
                | (Self::Strings(_), CustomFieldKind::Strings)
                | (Self::Bool(_), CustomFieldKind::Bool)
                | (Self::Timestamp(_), CustomFieldKind::Timestamp)
                | (Self::PickString(_), CustomFieldKind::PickString { .. })
                | (Self::PickStrings(_), CustomFieldKind::PickStrings { .. })
                | (Self::PickObject(_), CustomFieldKind::PickObject { .. })
                | (Self::PickObjects(_), CustomFieldKind::PickObjects { .. })
        )
    }

    pub fn as_str(&self) -> Result<&str, FieldValueError> {
        match self {
            Self::String(s) => Ok(s),
            other => Err(other.wrong_shape("string")),
        }
    }

    pub fn as_pick_object(&self) -> Result<&ObjectChoice, FieldValueError> {
        match self {
            Self::PickObject(o) => Ok(o),
            other => Err(other.wrong_shape("object pick")),
        }
    }

    pub fn as_pick_objects(&self) -> Result<&[ObjectChoice], FieldValueError> {
        match self {
            Self::PickObjects(v) => Ok(v),
            other => Err(other.wrong_shape("multi object pick")),
        }
    }

    fn wrong_shape(&self, expected: &'static str) -> FieldValueError {
        FieldValueError::WrongShape {
            expected,
            found: self.kind_name(),
        }
    }
}

// ---- Ticket ----

/// A generic issue.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Ticket {
    #[serde(default)]
    pub id: String,
    pub display_name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ticket_type: Option<TicketType>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<TicketStatus>,
    #[serde(default)]
    pub labels: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub url: String,
    #[serde(default)]
    pub assignees: Vec<Resource>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reporter: Option<Resource>,
    #[serde(default)]
    pub custom_fields: BTreeMap<String, CustomFieldValue>,
}

impl Ticket {
    /// Value of a custom field; [`FieldValueError::Missing`] when unset or empty.
    pub fn field(&self, id: &str) -> Result<&CustomFieldValue, FieldValueError> {
        match self.custom_fields.get(id) {
            Some(v) if !v.is_empty() => Ok(v),
            _ => Err(FieldValueError::Missing),
        }
    }
}

/// Checks `ticket` against `schema`.
///
/// Every required field must be set; every set field must have the shape its
/// schema declares; pick values must be among the allowed choices when the
/// schema lists any. Fields the schema does not know are ignored.
pub fn validate_ticket(schema: &TicketSchema, ticket: &Ticket) -> TicketResult<()> {
    for field in schema.custom_fields.values() {
        let value = match ticket.custom_fields.get(&field.id) {
            Some(v) if !v.is_empty() => v,
            _ if field.required => {
                return Err(TicketError::MissingRequiredField {
                    field: field.id.clone(),
                });
            }
            _ => continue,
        };

        if !value.matches(&field.kind) {
            return Err(TicketError::WrongFieldShape {
                field: field.id.clone(),
                expected: field.kind.name(),
                found: value.kind_name(),
            });
        }

        check_choices(field, value)?;
    }
    Ok(())
}

fn check_choices(field: &CustomField, value: &CustomFieldValue) -> TicketResult<()> {
    let invalid = |v: &str| TicketError::InvalidChoice {
        field: field.id.clone(),
        value: v.to_string(),
    };

    match (&field.kind, value) {
        (CustomFieldKind::PickString { allowed }, CustomFieldValue::PickString(v))
            if !allowed.is_empty() && !allowed.contains(v) =>
        {
            Err(invalid(v))
        }
        (CustomFieldKind::PickStrings { allowed }, CustomFieldValue::PickStrings(vs))
            if !allowed.is_empty() =>
        {
            match vs.iter().find(|v| !allowed.contains(v)) {
                Some(v) => Err(invalid(v)),
                None => Ok(()),
            }
        }
        (CustomFieldKind::PickObject { allowed }, CustomFieldValue::PickObject(o))
            if !allowed.is_empty() && !allowed.iter().any(|a| a.id == o.id) =>
        {
            Err(invalid(&o.id))
        }
        (CustomFieldKind::PickObjects { allowed }, CustomFieldValue::PickObjects(os))
            if !allowed.is_empty() =>
        {
            match os.iter().find(|o| !allowed.iter().any(|a| a.id == o.id)) {
                Some(o) => Err(invalid(&o.id)),
                None => Ok(()),
            }
        }
        _ => Ok(()),
    }
}
