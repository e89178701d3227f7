//! Identifier types used throughout the connector.
//!
//! A resource is addressed by the pair `(resource_type, resource)`. Resource
//! types are static descriptors declared once by the sync layer.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Capability a resource type advertises to the host.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResourceTrait {
    User,
    Group,
    Role,
}

/// Describes one kind of resource the connector enumerates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ResourceType {
    pub id: &'static str,
    pub display_name: &'static str,
    pub traits: &'static [ResourceTrait],
    /// The host never asks for entitlements or grants of this type.
    pub skip_entitlements_and_grants: bool,
}

impl ResourceType {
    /// Builds the identity of a resource of this type.
    #[must_use]
    pub fn resource_id(&self, resource: impl Into<String>) -> ResourceId {
        ResourceId::new(self.id, resource)
    }
}

/// Stable identity of a resource: its type id plus the remote object id.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ResourceId {
    pub resource_type: String,
    pub resource: String,
}

impl ResourceId {
    /// Creates a resource id from a type id and a remote id.
    #[must_use]
    pub fn new(resource_type: impl Into<String>, resource: impl Into<String>) -> Self {
        Self {
            resource_type: resource_type.into(),
            resource: resource.into(),
        }
    }

    /// Returns true when this id belongs to the given resource type.
    #[must_use]
    pub fn is_type(&self, resource_type: &ResourceType) -> bool {
        self.resource_type == resource_type.id
    }
}

impl fmt::Display for ResourceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.resource_type, self.resource)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const WIDGET: ResourceType = ResourceType {
        id: "widget",
        display_name: "Widget",
        traits: &[ResourceTrait::Group],
        skip_entitlements_and_grants: false,
    };

    #[test]
    fn resource_id_from_type() {
        let id = WIDGET.resource_id("42");
        assert_eq!(id, ResourceId::new("widget", "42"));
        assert!(id.is_type(&WIDGET));
        assert_eq!(id.to_string(), "widget:42");
    }

    #[test]
    fn resource_type_serializes_traits_snake_case() {
        let json = serde_json::to_value(WIDGET).unwrap();
        assert_eq!(json["traits"][0], "group");
        assert_eq!(json["skip_entitlements_and_grants"], false);
    }
}
