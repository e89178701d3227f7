//! Core type definitions for the Jira connector.
//!
//! This crate defines the host-facing, I/O-free data model the connector
//! produces and consumes:
//! - Resource types, resource identities and resources with their traits
//! - Entitlements and grants
//! - Ticket schemas, tickets and typed custom-field values
//! - Usage events and stream state
//! - The page cursor codec used to thread pagination through the host
//!
//! Everything that talks to Jira lives in `jira-connector-client` and
//! `jira-connector-sync`, not here.

mod entitlement;
mod error;
mod event;
mod ids;
pub mod pagination;
mod resource;
pub mod ticket;

pub use entitlement::{
    Entitlement, EntitlementPurpose, Grant, GrantExpandable, GrantOutcome, RevokeOutcome,
};
pub use error::{CursorError, CursorResult, ErrorCode, FieldValueError, TicketError, TicketResult};
pub use event::{Event, StreamState, UsageEvent};
pub use ids::{ResourceId, ResourceTrait, ResourceType};
pub use pagination::{CursorStack, PageFrame};
pub use resource::{
    AccountType, GroupTrait, Profile, Resource, ResourceTraits, RoleTrait, UserEmail, UserStatus,
    UserTrait,
};
pub use ticket::{
    CustomField, CustomFieldKind, CustomFieldValue, ObjectChoice, ProjectRef, Ticket,
    TicketSchema, TicketStatus, TicketType,
};
