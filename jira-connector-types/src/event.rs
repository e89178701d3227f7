//! Usage events and the stream state returned alongside them.
//!
//! Events are immutable records of something an actor did to a target
//! resource, as reported by the remote audit log.

use crate::resource::{Profile, Resource};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One audit occurrence.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Event {
    pub id: String,
    pub occurred_at: DateTime<Utc>,
    pub usage: UsageEvent,
}

/// Who touched what.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UsageEvent {
    pub target: Resource,
    pub actor: Resource,
    #[serde(default, skip_serializing_if = "Profile::is_empty")]
    pub metadata: Profile,
}

/// Continuation state of an event stream.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StreamState {
    /// Opaque cursor to pass back; empty when the stream is drained.
    pub cursor: String,
    pub has_more: bool,
}
