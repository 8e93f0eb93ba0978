//! Revision domain model.
//!
//! # Responsibility
//! - Describe one unit of work: who made it, when, and why.
//!
//! # Invariants
//! - `id` is stable and never reused for another revision.
//! - A revision is immutable once its state is `Active`.

use serde::{Deserialize, Serialize};
use std::time::{SystemTime, UNIX_EPOCH};
use uuid::Uuid;

/// Stable revision identifier.
pub type RevisionId = Uuid;

/// Lifecycle state of a revision row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RevisionState {
    /// Created but its unit of work has not committed yet.
    Pending,
    /// Committed together with the mutations it describes.
    Active,
    /// Withdrawn by maintenance tooling.
    Deleted,
}

impl RevisionState {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Active => "active",
            Self::Deleted => "deleted",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "pending" => Some(Self::Pending),
            "active" => Some(Self::Active),
            "deleted" => Some(Self::Deleted),
            _ => None,
        }
    }
}

/// Authenticated account attached to a revision.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserRef {
    /// Stable account id, recorded as `user_id` on activities.
    pub id: String,
    /// Login name, kept for display only.
    pub name: String,
}

/// Identity and metadata of one unit of work.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Revision {
    pub id: RevisionId,
    /// Unix epoch milliseconds.
    pub timestamp: i64,
    /// Free-form author label. Anonymous edits carry the client address here.
    pub author: String,
    /// `None` when the change was made without logging in.
    pub user: Option<UserRef>,
    pub message: String,
    pub state: RevisionState,
}

impl Revision {
    /// Creates a pending revision stamped with the current time.
    pub fn new(author: impl Into<String>, user: Option<UserRef>) -> Self {
        Self {
            id: Uuid::new_v4(),
            timestamp: now_epoch_ms(),
            author: author.into(),
            user,
            message: String::new(),
            state: RevisionState::Pending,
        }
    }

    /// Sets the commit message.
    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = message.into();
        self
    }
}

/// Current wall-clock time in Unix epoch milliseconds.
///
/// Clock values before the epoch collapse to `0`.
pub fn now_epoch_ms() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|elapsed| i64::try_from(elapsed.as_millis()).unwrap_or(i64::MAX))
        .unwrap_or(0)
}
