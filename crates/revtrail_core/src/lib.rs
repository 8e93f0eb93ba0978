//! Revision-scoped change tracking and activity stream synthesis.
//! This crate owns the commit hook that turns one unit of work into an
//! audit trail of activities and activity details.

pub mod activity;
pub mod config;
pub mod db;
pub mod logging;
pub mod model;
pub mod repo;
pub mod service;

pub use activity::identity::{
    resolve_user_id, AnonymousActor, NOT_LOGGED_IN_USER_ID, UNKNOWN_ORIGIN_USER_ID,
};
pub use activity::probe::Participation;
pub use activity::synthesizer::{ActivitySynthesizer, FoldOutcome, PersistSummary, SkipReason};
pub use config::ActivityStreamConfig;
pub use logging::{default_log_level, init_logging, logging_status};
pub use model::activity::{Activity, ActivityDetail, ActivityId, ActivityType, ObjectId};
pub use model::change_set::ChangeSet;
pub use model::entity::{
    Capability, DetailCapable, DomainObject, EntityError, EntityResult, ObjectRef,
    RelatedCapable, SubjectCapable,
};
pub use model::package::{
    EntityState, Group, Member, Package, PackageExtra, PackageTag, Resource, Tag,
};
pub use model::revision::{Revision, RevisionId, RevisionState, UserRef};
pub use repo::activity_repo::{ActivitySink, ActivityStreamReader, SqliteActivityRepository};
pub use repo::revision_repo::{RevisionRepository, SqliteRevisionRepository};
pub use repo::{RepoError, RepoResult};
pub use service::revision_session::{
    CommitOutcome, HookOutcome, RevisionSession, SessionError, SessionResult,
};

/// Minimal health-check API for early integration.
pub fn ping() -> &'static str {
    "pong"
}

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}

#[cfg(test)]
mod tests {
    use super::{core_version, ping};

    #[test]
    fn ping_returns_pong() {
        assert_eq!(ping(), "pong");
    }

    #[test]
    fn version_is_not_empty() {
        assert!(!core_version().is_empty());
    }
}
