//! Activity stream configuration.
//!
//! Core reads no config files; callers build this value and pass it in.

use crate::activity::identity::AnonymousActor;

/// Switches that shape activity synthesis for one session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ActivityStreamConfig {
    /// When `false`, commits write no activity rows at all.
    pub enabled: bool,
    /// Sentinel recorded for revisions without an authenticated user.
    pub anonymous_actor: AnonymousActor,
}

impl Default for ActivityStreamConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            anonymous_actor: AnonymousActor::NotLoggedIn,
        }
    }
}

impl ActivityStreamConfig {
    /// Configuration that records revisions but no activity stream.
    pub fn disabled() -> Self {
        Self {
            enabled: false,
            ..Self::default()
        }
    }
}
