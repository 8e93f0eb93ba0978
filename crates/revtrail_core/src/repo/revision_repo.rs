//! Revision repository contracts and SQLite implementation.
//!
//! # Invariants
//! - A revision row exists before any activity references it.
//! - `user_id`/`user_name` are stored together or not at all.

use crate::model::revision::{Revision, RevisionId, RevisionState, UserRef};
use crate::repo::{parse_uuid, RepoError, RepoResult};
use rusqlite::{params, Connection, OptionalExtension, Row};

/// Repository interface for revision rows.
pub trait RevisionRepository {
    fn create_revision(&self, revision: &Revision) -> RepoResult<RevisionId>;
    fn get_revision(&self, id: RevisionId) -> RepoResult<Option<Revision>>;
    fn set_revision_state(&self, id: RevisionId, state: RevisionState) -> RepoResult<()>;
}

/// SQLite-backed revision repository.
pub struct SqliteRevisionRepository<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteRevisionRepository<'conn> {
    pub fn new(conn: &'conn Connection) -> Self {
        Self { conn }
    }
}

impl RevisionRepository for SqliteRevisionRepository<'_> {
    fn create_revision(&self, revision: &Revision) -> RepoResult<RevisionId> {
        self.conn.execute(
            "INSERT INTO revisions (
                id,
                timestamp,
                author,
                user_id,
                user_name,
                message,
                state
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7);",
            params![
                revision.id.to_string(),
                revision.timestamp,
                revision.author.as_str(),
                revision.user.as_ref().map(|user| user.id.as_str()),
                revision.user.as_ref().map(|user| user.name.as_str()),
                revision.message.as_str(),
                revision.state.as_str(),
            ],
        )?;
        Ok(revision.id)
    }

    fn get_revision(&self, id: RevisionId) -> RepoResult<Option<Revision>> {
        let row = self
            .conn
            .query_row(
                "SELECT id, timestamp, author, user_id, user_name, message, state
                 FROM revisions
                 WHERE id = ?1;",
                [id.to_string()],
                RawRevision::from_row,
            )
            .optional()?;
        row.map(RawRevision::into_revision).transpose()
    }

    fn set_revision_state(&self, id: RevisionId, state: RevisionState) -> RepoResult<()> {
        let changed = self.conn.execute(
            "UPDATE revisions SET state = ?2 WHERE id = ?1;",
            params![id.to_string(), state.as_str()],
        )?;
        if changed == 0 {
            return Err(RepoError::NotFound(id));
        }
        Ok(())
    }
}

struct RawRevision {
    id: String,
    timestamp: i64,
    author: String,
    user_id: Option<String>,
    user_name: Option<String>,
    message: String,
    state: String,
}

impl RawRevision {
    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get("id")?,
            timestamp: row.get("timestamp")?,
            author: row.get("author")?,
            user_id: row.get("user_id")?,
            user_name: row.get("user_name")?,
            message: row.get("message")?,
            state: row.get("state")?,
        })
    }

    fn into_revision(self) -> RepoResult<Revision> {
        let state = RevisionState::parse(&self.state).ok_or_else(|| {
            RepoError::InvalidData(format!(
                "invalid revision state `{}` in revisions.state",
                self.state
            ))
        })?;
        let user = match (self.user_id, self.user_name) {
            (Some(id), Some(name)) => Some(UserRef { id, name }),
            (None, None) => None,
            _ => {
                return Err(RepoError::InvalidData(
                    "revisions.user_id and revisions.user_name must both be set or both be null"
                        .to_string(),
                ));
            }
        };
        Ok(Revision {
            id: parse_uuid(&self.id, "revisions.id")?,
            timestamp: self.timestamp,
            author: self.author,
            user,
            message: self.message,
            state,
        })
    }
}
