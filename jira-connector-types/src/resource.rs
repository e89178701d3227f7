//! Normalized resources and their type-specific traits.
//!
//! Resources are value objects: built fresh by a lister, handed to the host,
//! never mutated afterwards.

use crate::ids::{ResourceId, ResourceType};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// String-keyed attribute map attached to a resource.
pub type Profile = serde_json::Map<String, Value>;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UserStatus {
    Enabled,
    Disabled,
    #[default]
    Unspecified,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AccountType {
    Human,
    Service,
    #[default]
    Unspecified,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserEmail {
    pub address: String,
    pub is_primary: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct UserTrait {
    pub profile: Profile,
    pub status: UserStatus,
    pub account_type: AccountType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub login: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub emails: Vec<UserEmail>,
}

impl UserTrait {
    #[must_use]
    pub fn with_status(mut self, status: UserStatus) -> Self {
        self.status = status;
        self
    }

    #[must_use]
    pub fn with_account_type(mut self, account_type: AccountType) -> Self {
        self.account_type = account_type;
        self
    }

    #[must_use]
    pub fn with_login(mut self, login: impl Into<String>) -> Self {
        self.login = Some(login.into());
        self
    }

    /// Adds an email address; the first primary one wins.
    #[must_use]
    pub fn with_email(mut self, address: impl Into<String>, is_primary: bool) -> Self {
        self.emails.push(UserEmail {
            address: address.into(),
            is_primary,
        });
        self
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GroupTrait {
    pub profile: Profile,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RoleTrait {
    pub profile: Profile,
}

/// Type-specific payload of a resource.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(tag = "trait", rename_all = "snake_case")]
pub enum ResourceTraits {
    User(UserTrait),
    Group(GroupTrait),
    Role(RoleTrait),
    /// Reference-only resource (event targets, grant principals).
    #[default]
    None,
}

/// A normalized entity exposed to the host.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Resource {
    pub id: ResourceId,
    pub display_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent: Option<ResourceId>,
    #[serde(default)]
    pub traits: ResourceTraits,
}

impl Resource {
    fn build(
        resource_type: &ResourceType,
        id: impl Into<String>,
        display_name: impl Into<String>,
        traits: ResourceTraits,
    ) -> Self {
        Self {
            id: resource_type.resource_id(id),
            display_name: display_name.into(),
            parent: None,
            traits,
        }
    }

    /// Shorthand for a user resource.
    pub fn user(
        resource_type: &ResourceType,
        id: impl Into<String>,
        display_name: impl Into<String>,
        user: UserTrait,
    ) -> Self {
        Self::build(resource_type, id, display_name, ResourceTraits::User(user))
    }

    /// Shorthand for a group resource.
    pub fn group(
        resource_type: &ResourceType,
        id: impl Into<String>,
        display_name: impl Into<String>,
        profile: Profile,
    ) -> Self {
        Self::build(
            resource_type,
            id,
            display_name,
            ResourceTraits::Group(GroupTrait { profile }),
        )
    }

    /// Shorthand for a role resource.
    pub fn role(
        resource_type: &ResourceType,
        id: impl Into<String>,
        display_name: impl Into<String>,
        profile: Profile,
    ) -> Self {
        Self::build(
            resource_type,
            id,
            display_name,
            ResourceTraits::Role(RoleTrait { profile }),
        )
    }

    /// A resource that only carries an identity and a name.
    pub fn reference(id: ResourceId, display_name: impl Into<String>) -> Self {
        Self {
            id,
            display_name: display_name.into(),
            parent: None,
            traits: ResourceTraits::None,
        }
    }

    #[must_use]
    pub fn with_parent(mut self, parent: ResourceId) -> Self {
        self.parent = Some(parent);
        self
    }

    /// Profile of the resource, if its trait carries one.
    #[must_use]
    pub fn profile(&self) -> Option<&Profile> {
        match &self.traits {
            ResourceTraits::User(t) => Some(&t.profile),
            ResourceTraits::Group(t) => Some(&t.profile),
            ResourceTraits::Role(t) => Some(&t.profile),
            ResourceTraits::None => None,
        }
    }

    /// String attribute from the profile.
    #[must_use]
    pub fn profile_str(&self, key: &str) -> Option<&str> {
        self.profile()?.get(key)?.as_str()
    }

    #[must_use]
    pub fn user_trait(&self) -> Option<&UserTrait> {
        match &self.traits {
            ResourceTraits::User(t) => Some(t),
            _ => None,
        }
    }
}
