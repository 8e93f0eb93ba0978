//! Optional activity capabilities of domain objects.
//!
//! # Responsibility
//! - Define the seam between activity synthesis and concrete entity types.
//! - Let each entity declare which capabilities it implements.
//!
//! # Invariants
//! - Capability accessors are pure inspection and never fail.
//! - `EntityError::CapabilityMismatch` is the only error meaning
//!   "this object does not participate"; every other variant is a real failure.

use crate::db::DbError;
use crate::model::activity::{Activity, ActivityDetail, ActivityId, ActivityType, ObjectId};
use crate::model::revision::Revision;
use std::error::Error;
use std::fmt::{Debug, Display, Formatter};
use std::sync::Arc;

/// Shared handle to a tracked domain object.
pub type ObjectRef = Arc<dyn DomainObject>;

pub type EntityResult<T> = Result<T, EntityError>;

/// Errors raised by entity capability methods.
#[derive(Debug)]
pub enum EntityError {
    /// The object cannot resolve the requested relation for its current shape.
    CapabilityMismatch {
        object_type: &'static str,
        message: String,
    },
    /// Entity-internal failure. Aborts the enclosing unit of work.
    Internal(String),
    /// Storage failure while an entity looked up related state.
    Db(DbError),
}

impl Display for EntityError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::CapabilityMismatch {
                object_type,
                message,
            } => write!(f, "{object_type} capability mismatch: {message}"),
            Self::Internal(message) => write!(f, "entity error: {message}"),
            Self::Db(err) => write!(f, "{err}"),
        }
    }
}

impl Error for EntityError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Db(err) => Some(err),
            Self::CapabilityMismatch { .. } | Self::Internal(_) => None,
        }
    }
}

impl From<DbError> for EntityError {
    fn from(value: DbError) -> Self {
        Self::Db(value)
    }
}

impl From<rusqlite::Error> for EntityError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Db(DbError::Sqlite(value))
    }
}

/// Capability tags, used for diagnostics.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Capability {
    /// Can be the subject of a top-level activity.
    Subject,
    /// Can describe its own change as an activity detail.
    Detail,
    /// Is owned by one or more subjects.
    Related,
}

impl Capability {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Subject => "activity_stream_item",
            Self::Detail => "activity_stream_detail",
            Self::Related => "related_packages",
        }
    }
}

/// Any object that can appear in a change set.
///
/// Concrete types opt into capabilities by overriding the `as_*` accessors.
pub trait DomainObject: Debug {
    /// Stable id, or `None` when the object cannot be correlated.
    fn object_id(&self) -> Option<ObjectId>;

    /// Type label used in logs and detail rows.
    fn object_type(&self) -> &'static str;

    fn as_subject(&self) -> Option<&dyn SubjectCapable> {
        None
    }

    fn as_detail_source(&self) -> Option<&dyn DetailCapable> {
        None
    }

    fn as_related(&self) -> Option<&dyn RelatedCapable> {
        None
    }

    /// Lists declared capabilities.
    fn capabilities(&self) -> Vec<Capability> {
        let mut declared = Vec::new();
        if self.as_subject().is_some() {
            declared.push(Capability::Subject);
        }
        if self.as_detail_source().is_some() {
            declared.push(Capability::Detail);
        }
        if self.as_related().is_some() {
            declared.push(Capability::Related);
        }
        declared
    }
}

/// Entities that can be "the subject" of an activity.
pub trait SubjectCapable {
    /// Builds this subject's activity, or `None` when the change is not
    /// representable (e.g. private objects).
    fn activity_stream_item(
        &self,
        activity_type: ActivityType,
        revision: &Revision,
        user_id: &str,
    ) -> EntityResult<Option<Activity>>;
}

/// Entities that can describe what specifically changed.
pub trait DetailCapable {
    fn activity_stream_detail(
        &self,
        activity_id: ActivityId,
        activity_type: ActivityType,
    ) -> EntityResult<Option<ActivityDetail>>;
}

/// Entities owned by one or more subjects.
pub trait RelatedCapable {
    /// Returns owning subjects. `None` entries are unresolved owners.
    fn related_subjects(&self) -> EntityResult<Vec<Option<ObjectRef>>>;
}
