//! Acting-user resolution for revisions.

use crate::model::revision::Revision;

/// Sentinel used when a revision has no authenticated user.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AnonymousActor {
    /// Anonymous web edit. The client address is deliberately not recorded.
    NotLoggedIn,
    /// No user and no known network origin (e.g. background jobs).
    UnknownOrigin,
}

/// Activity `user_id` for anonymous web edits.
pub const NOT_LOGGED_IN_USER_ID: &str = "not logged in";
/// Activity `user_id` when the network origin is unknown too.
pub const UNKNOWN_ORIGIN_USER_ID: &str = "unknown IP address";

impl AnonymousActor {
    pub fn user_id(self) -> &'static str {
        match self {
            Self::NotLoggedIn => NOT_LOGGED_IN_USER_ID,
            Self::UnknownOrigin => UNKNOWN_ORIGIN_USER_ID,
        }
    }
}

/// Returns the `user_id` recorded on activities for `revision`.
///
/// Never fails: a missing or blank user id degrades to the sentinel.
pub fn resolve_user_id(revision: &Revision, anonymous: AnonymousActor) -> String {
    revision
        .user
        .as_ref()
        .map(|user| user.id.trim())
        .filter(|id| !id.is_empty())
        .unwrap_or_else(|| anonymous.user_id())
        .to_string()
}
