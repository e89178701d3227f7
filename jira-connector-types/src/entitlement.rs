//! Entitlements and grants.
//!
//! Ids follow the host conventions:
//! - entitlement: `{resource_type}:{resource_id}:{slug}`
//! - grant: `{entitlement_id}:{principal_type}:{principal_id}`

use crate::ids::{ResourceId, ResourceType};
use crate::resource::Resource;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntitlementPurpose {
    Assignment,
    Permission,
}

/// A named capability tied to exactly one resource.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Entitlement {
    pub id: String,
    pub resource: ResourceId,
    pub slug: String,
    pub display_name: String,
    pub description: String,
    pub purpose: EntitlementPurpose,
    /// Resource type ids that may hold this entitlement.
    pub grantable_to: Vec<String>,
}

impl Entitlement {
    /// Formats the id of the entitlement `slug` on `resource`.
    #[must_use]
    pub fn id_for(resource: &ResourceId, slug: &str) -> String {
        format!("{}:{}:{}", resource.resource_type, resource.resource, slug)
    }

    fn new(resource: &Resource, slug: &str, purpose: EntitlementPurpose) -> Self {
        Self {
            id: Self::id_for(&resource.id, slug),
            resource: resource.id.clone(),
            slug: slug.to_string(),
            display_name: slug.to_string(),
            description: String::new(),
            purpose,
            grantable_to: Vec::new(),
        }
    }

    /// Shorthand for an assignment entitlement.
    pub fn assignment(resource: &Resource, slug: &str) -> Self {
        Self::new(resource, slug, EntitlementPurpose::Assignment)
    }

    /// Shorthand for a permission entitlement.
    pub fn permission(resource: &Resource, slug: &str) -> Self {
        Self::new(resource, slug, EntitlementPurpose::Permission)
    }

    #[must_use]
    pub fn with_grantable_to(mut self, types: &[&ResourceType]) -> Self {
        self.grantable_to = types.iter().map(|t| t.id.to_string()).collect();
        self
    }

    #[must_use]
    pub fn with_display_name(mut self, display_name: impl Into<String>) -> Self {
        self.display_name = display_name.into();
        self
    }

    #[must_use]
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }
}

/// Tells the host to expand a grant transitively through other entitlements.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GrantExpandable {
    pub entitlement_ids: Vec<String>,
    pub resource_type_ids: Vec<String>,
}

/// `principal` holds entitlement `slug` on `resource`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Grant {
    pub id: String,
    pub entitlement_id: String,
    pub resource: ResourceId,
    pub slug: String,
    pub principal: ResourceId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expandable: Option<GrantExpandable>,
}

impl Grant {
    pub fn new(resource: &ResourceId, slug: &str, principal: ResourceId) -> Self {
        let entitlement_id = Entitlement::id_for(resource, slug);
        Self {
            id: format!(
                "{}:{}:{}",
                entitlement_id, principal.resource_type, principal.resource
            ),
            entitlement_id,
            resource: resource.clone(),
            slug: slug.to_string(),
            principal,
            expandable: None,
        }
    }

    #[must_use]
    pub fn with_expandable(mut self, expandable: GrantExpandable) -> Self {
        self.expandable = Some(expandable);
        self
    }
}

/// Result of a provisioning grant call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GrantOutcome {
    Granted,
    AlreadyExists,
}

/// Result of a provisioning revoke call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RevokeOutcome {
    Revoked,
    AlreadyRevoked,
}
