//! Domain model for revisions, change sets and the activity stream.
//!
//! # Responsibility
//! - Define the revision and activity records persisted by core.
//! - Define the optional capability contract entities use to describe
//!   their own changes.
//!
//! # Invariants
//! - Every persisted record is identified by a stable `Uuid`.
//! - At most one `Activity` exists per subject per revision.

pub mod activity;
pub mod change_set;
pub mod entity;
pub mod package;
pub mod revision;
