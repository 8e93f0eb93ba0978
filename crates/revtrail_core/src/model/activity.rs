//! Activity stream records.
//!
//! # Responsibility
//! - Define the `Activity` (one per subject per revision) and
//!   `ActivityDetail` (one per contributing object) rows.
//!
//! # Invariants
//! - `ActivityDetail::activity_id` always points at exactly one `Activity`.
//! - Details have no sort key; discovery order is the only order.

use crate::model::revision::RevisionId;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

/// Stable identifier of an activity row.
pub type ActivityId = Uuid;

/// Stable identifier of any tracked domain object.
pub type ObjectId = Uuid;

/// Kind of change recorded for a subject or sub-entity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActivityType {
    New,
    Changed,
    Deleted,
}

impl ActivityType {
    /// Change-set buckets in the order the synthesizer walks them.
    pub const ALL: [ActivityType; 3] = [Self::New, Self::Changed, Self::Deleted];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::New => "new",
            Self::Changed => "changed",
            Self::Deleted => "deleted",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "new" => Some(Self::New),
            "changed" => Some(Self::Changed),
            "deleted" => Some(Self::Deleted),
            _ => None,
        }
    }
}

/// One subject's activity within one revision.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Activity {
    pub id: ActivityId,
    /// Subject the activity is about (e.g. a package).
    pub object_id: ObjectId,
    pub activity_type: ActivityType,
    /// Authenticated user id or an anonymous sentinel, never empty.
    pub user_id: String,
    pub revision_id: RevisionId,
    /// Unix epoch milliseconds.
    pub timestamp: i64,
    /// Snapshot of the subject at the time of the change.
    pub data: Option<Value>,
}

impl Activity {
    /// Creates an activity with a fresh id.
    pub fn new(
        object_id: ObjectId,
        activity_type: ActivityType,
        user_id: impl Into<String>,
        revision_id: RevisionId,
        timestamp: i64,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            object_id,
            activity_type,
            user_id: user_id.into(),
            revision_id,
            timestamp,
            data: None,
        }
    }

    pub fn with_data(mut self, data: Value) -> Self {
        self.data = Some(data);
        self
    }
}

/// One object's contribution to a parent activity.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActivityDetail {
    pub id: Uuid,
    pub activity_id: ActivityId,
    pub object_id: ObjectId,
    /// Entity type label, e.g. `Package` or `Resource`.
    pub object_type: String,
    /// What happened to this object, independent of the parent activity type.
    pub activity_type: ActivityType,
    pub data: Option<Value>,
}

impl ActivityDetail {
    pub fn new(
        activity_id: ActivityId,
        object_id: ObjectId,
        object_type: impl Into<String>,
        activity_type: ActivityType,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            activity_id,
            object_id,
            object_type: object_type.into(),
            activity_type,
            data: None,
        }
    }

    pub fn with_data(mut self, data: Value) -> Self {
        self.data = Some(data);
        self
    }
}
