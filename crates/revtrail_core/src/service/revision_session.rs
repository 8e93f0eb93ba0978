//! Revision-scoped unit of work with the activity stream commit hook.
//!
//! # Responsibility
//! - Own one SQLite transaction and the revision it records.
//! - Track touched domain objects into a `ChangeSet`.
//! - Synthesize and persist the activity stream right before commit.
//!
//! # Invariants
//! - Activity rows are written in the same transaction as the mutations they
//!   describe; either all become visible or none do.
//! - The activity hook persists at most once per session. The change set is
//!   sealed once it has run, so every tracked object is covered by the trail.
//! - A failed hook poisons the session; it can only be rolled back.
//! - Dropping a session without `commit` rolls everything back.

use crate::activity::synthesizer::{ActivitySynthesizer, FoldOutcome, PersistSummary};
use crate::config::ActivityStreamConfig;
use crate::db::DbError;
use crate::model::change_set::ChangeSet;
use crate::model::entity::{EntityError, ObjectRef};
use crate::model::revision::{Revision, RevisionId, RevisionState};
use crate::repo::activity_repo::SqliteActivityRepository;
use crate::repo::revision_repo::{RevisionRepository, SqliteRevisionRepository};
use crate::repo::RepoError;
use log::{debug, error, info};
use rusqlite::{Connection, Transaction, TransactionBehavior};
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::time::Instant;

pub type SessionResult<T> = Result<T, SessionError>;

/// Errors that abort a revision session.
#[derive(Debug)]
pub enum SessionError {
    /// An entity capability failed for a reason other than non-participation.
    Entity(EntityError),
    Repo(RepoError),
    Db(DbError),
    /// A session records exactly one revision.
    RevisionAlreadySet(RevisionId),
    /// Objects were tracked after the activity hook had already run.
    ChangeSetSealed,
    /// An earlier activity hook run failed; the session must be rolled back.
    HookFailed,
}

impl Display for SessionError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Entity(err) => write!(f, "{err}"),
            Self::Repo(err) => write!(f, "{err}"),
            Self::Db(err) => write!(f, "{err}"),
            Self::RevisionAlreadySet(id) => {
                write!(f, "session already records revision {id}")
            }
            Self::ChangeSetSealed => {
                write!(f, "activities already emitted; change set is sealed")
            }
            Self::HookFailed => write!(f, "activity hook failed; session must be rolled back"),
        }
    }
}

impl Error for SessionError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Entity(err) => Some(err),
            Self::Repo(err) => Some(err),
            Self::Db(err) => Some(err),
            Self::RevisionAlreadySet(_) | Self::ChangeSetSealed | Self::HookFailed => None,
        }
    }
}

impl From<EntityError> for SessionError {
    fn from(value: EntityError) -> Self {
        Self::Entity(value)
    }
}

impl From<RepoError> for SessionError {
    fn from(value: RepoError) -> Self {
        Self::Repo(value)
    }
}

impl From<DbError> for SessionError {
    fn from(value: DbError) -> Self {
        Self::Db(value)
    }
}

impl From<rusqlite::Error> for SessionError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Db(DbError::Sqlite(value))
    }
}

/// What the activity hook did for one session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HookOutcome {
    /// Activity streams are switched off.
    Disabled,
    /// No revision or change set was available.
    MissingContext,
    /// The hook already ran in this session.
    AlreadyEmitted,
    Persisted(PersistSummary),
}

/// Result of a successful commit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CommitOutcome {
    pub revision_id: Option<RevisionId>,
    pub hook: HookOutcome,
}

/// One unit of work against a migrated connection.
pub struct RevisionSession<'conn> {
    tx: Transaction<'conn>,
    config: ActivityStreamConfig,
    revision: Option<Revision>,
    change_set: Option<ChangeSet>,
    synthesizer: ActivitySynthesizer,
    activities_emitted: bool,
    hook_failed: bool,
}

impl<'conn> RevisionSession<'conn> {
    /// Opens an IMMEDIATE transaction for one revision.
    pub fn begin(conn: &'conn Connection, config: ActivityStreamConfig) -> SessionResult<Self> {
        let tx = Transaction::new_unchecked(conn, TransactionBehavior::Immediate)?;
        debug!(
            "event=session_begin module=session status=ok activity_streams={}",
            config.enabled
        );
        Ok(Self {
            tx,
            config,
            revision: None,
            change_set: None,
            synthesizer: ActivitySynthesizer::new(),
            activities_emitted: false,
            hook_failed: false,
        })
    }

    /// Records the revision this unit of work will commit as.
    pub fn set_revision(&mut self, revision: Revision) -> SessionResult<RevisionId> {
        if let Some(existing) = &self.revision {
            return Err(SessionError::RevisionAlreadySet(existing.id));
        }
        let id = SqliteRevisionRepository::new(&self.tx).create_revision(&revision)?;
        self.revision = Some(revision);
        Ok(id)
    }

    pub fn revision(&self) -> Option<&Revision> {
        self.revision.as_ref()
    }

    pub fn change_set(&self) -> Option<&ChangeSet> {
        self.change_set.as_ref()
    }

    /// Connection bound to this session's transaction, for domain writes.
    pub fn connection(&self) -> &Connection {
        &self.tx
    }

    pub fn track_new(&mut self, object: ObjectRef) -> SessionResult<()> {
        self.open_change_set()?.mark_new(object);
        Ok(())
    }

    pub fn track_changed(&mut self, object: ObjectRef) -> SessionResult<()> {
        self.open_change_set()?.mark_changed(object);
        Ok(())
    }

    pub fn track_deleted(&mut self, object: ObjectRef) -> SessionResult<()> {
        self.open_change_set()?.mark_deleted(object);
        Ok(())
    }

    /// Synthesizes and persists the activity stream for this session.
    ///
    /// Runs automatically from `commit`. Calling it earlier seals the change
    /// set: later `track_*` calls fail and later hook runs are no-ops.
    ///
    /// # Errors
    /// Any failure poisons the session. Every later `emit_activities` or
    /// `commit` returns `SessionError::HookFailed`.
    pub fn emit_activities(&mut self) -> SessionResult<HookOutcome> {
        if self.hook_failed {
            return Err(SessionError::HookFailed);
        }
        if !self.config.enabled {
            return Ok(HookOutcome::Disabled);
        }
        if self.activities_emitted {
            debug!("event=activity_hook module=session status=skipped reason=already_emitted");
            return Ok(HookOutcome::AlreadyEmitted);
        }

        let result = self.run_hook();
        if let Err(err) = &result {
            self.hook_failed = true;
            error!("event=activity_hook module=session status=error error={err}");
        }
        result
    }

    fn run_hook(&mut self) -> SessionResult<HookOutcome> {
        let fold = self.synthesizer.fold(
            self.change_set.as_ref(),
            self.revision.as_ref(),
            self.config.anonymous_actor,
        )?;
        if let FoldOutcome::Skipped(reason) = fold {
            debug!("event=activity_hook module=session status=skipped reason={reason:?}");
            return Ok(HookOutcome::MissingContext);
        }

        let summary = self
            .synthesizer
            .persist(&SqliteActivityRepository::new(&self.tx))?;
        self.activities_emitted = true;
        Ok(HookOutcome::Persisted(summary))
    }

    /// Runs the activity hook, activates the revision and commits.
    ///
    /// On any error the transaction is rolled back before returning.
    pub fn commit(mut self) -> SessionResult<CommitOutcome> {
        let started_at = Instant::now();
        let revision_id = self.revision.as_ref().map(|revision| revision.id);

        let result = self.finish();
        match &result {
            Ok(hook) => info!(
                "event=revision_commit module=session status=ok revision_id={} hook={:?} duration_ms={}",
                display_revision(revision_id),
                hook,
                started_at.elapsed().as_millis()
            ),
            Err(err) => error!(
                "event=revision_commit module=session status=error revision_id={} duration_ms={} error={}",
                display_revision(revision_id),
                started_at.elapsed().as_millis(),
                err
            ),
        }

        let hook = result?;
        self.tx.commit()?;
        Ok(CommitOutcome { revision_id, hook })
    }

    /// Discards every write made in this session.
    pub fn rollback(self) -> SessionResult<()> {
        self.tx.rollback()?;
        Ok(())
    }

    fn finish(&mut self) -> SessionResult<HookOutcome> {
        let hook = self.emit_activities()?;
        if let Some(revision) = self.revision.as_mut() {
            SqliteRevisionRepository::new(&self.tx)
                .set_revision_state(revision.id, RevisionState::Active)?;
            revision.state = RevisionState::Active;
        }
        Ok(hook)
    }

    fn open_change_set(&mut self) -> SessionResult<&mut ChangeSet> {
        if self.hook_failed {
            return Err(SessionError::HookFailed);
        }
        if self.activities_emitted {
            return Err(SessionError::ChangeSetSealed);
        }
        Ok(self.change_set.get_or_insert_with(ChangeSet::new))
    }
}

fn display_revision(revision_id: Option<RevisionId>) -> String {
    revision_id.map_or_else(|| "none".to_string(), |id| id.to_string())
}
