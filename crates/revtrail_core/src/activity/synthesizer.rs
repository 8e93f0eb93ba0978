//! Change-set folding into activities and activity details.
//!
//! # Responsibility
//! - Derive at most one `Activity` per subject from one unit of work.
//! - Collect `ActivityDetail` rows per activity in discovery order.
//! - Hand the result to an `ActivitySink` in a stable order.
//!
//! # Invariants
//! - A subject created in this unit of work is reported as `new`, never as
//!   `changed`, however many of its sub-entities also changed.
//! - A subject's activity is created once and reused for every later
//!   contributing object.
//! - Folding the same change set twice adds nothing the first fold did not.
//! - A failed fold leaves the accumulator exactly as it was before the call.

use crate::activity::identity::{resolve_user_id, AnonymousActor};
use crate::activity::probe::{self, Participation};
use crate::model::activity::{Activity, ActivityDetail, ActivityId, ActivityType, ObjectId};
use crate::model::change_set::ChangeSet;
use crate::model::entity::EntityResult;
use crate::model::revision::Revision;
use crate::repo::activity_repo::ActivitySink;
use crate::repo::RepoResult;
use indexmap::map::Entry;
use indexmap::IndexMap;
use log::{debug, info};
use std::collections::HashSet;

/// Why a fold did nothing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    MissingChangeSet,
    MissingRevision,
}

/// Result of one `fold` call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FoldOutcome {
    /// The hook ran outside a fully initialized unit of work.
    Skipped(SkipReason),
    /// Totals accumulated so far in this unit of work.
    Folded { activities: usize, details: usize },
}

/// Rows handed to the sink by `persist`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PersistSummary {
    pub activities: usize,
    pub details: usize,
}

/// Per-transaction accumulator of synthesized activity rows.
#[derive(Debug, Default, Clone)]
pub struct ActivitySynthesizer {
    activities: IndexMap<ObjectId, Activity>,
    details: IndexMap<ActivityId, Vec<ActivityDetail>>,
    new_subjects: HashSet<ObjectId>,
    folded: HashSet<(ActivityType, ObjectId)>,
}

impl ActivitySynthesizer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Folds one change set into the accumulated activity rows.
    ///
    /// Missing `change_set` or `revision` is a silent no-op. Entity failures
    /// other than capability mismatches are returned unchanged, and nothing
    /// from the failed call is kept.
    pub fn fold(
        &mut self,
        change_set: Option<&ChangeSet>,
        revision: Option<&Revision>,
        anonymous: AnonymousActor,
    ) -> EntityResult<FoldOutcome> {
        let Some(change_set) = change_set else {
            debug!("event=activity_fold module=activity status=skipped reason=missing_change_set");
            return Ok(FoldOutcome::Skipped(SkipReason::MissingChangeSet));
        };
        let Some(revision) = revision else {
            debug!("event=activity_fold module=activity status=skipped reason=missing_revision");
            return Ok(FoldOutcome::Skipped(SkipReason::MissingRevision));
        };

        let user_id = resolve_user_id(revision, anonymous);
        let checkpoint = self.clone();
        let folded = match self.fold_new_subjects(change_set, revision, &user_id) {
            Ok(()) => self.fold_related(change_set, revision, &user_id),
            Err(err) => Err(err),
        };
        if let Err(err) = folded {
            *self = checkpoint;
            return Err(err);
        }

        let details = self.detail_count();
        info!(
            "event=activity_fold module=activity status=ok revision_id={} objects={} activities={} details={}",
            revision.id,
            change_set.len(),
            self.activities.len(),
            details
        );
        Ok(FoldOutcome::Folded {
            activities: self.activities.len(),
            details,
        })
    }

    fn fold_new_subjects(
        &mut self,
        change_set: &ChangeSet,
        revision: &Revision,
        user_id: &str,
    ) -> EntityResult<()> {
        for object in change_set.bucket(ActivityType::New) {
            let Some(object_id) = object.object_id() else {
                continue;
            };
            if self.new_subjects.contains(&object_id) {
                continue;
            }
            let Some(activity) =
                probe::activity_stream_item(object.as_ref(), ActivityType::New, revision, user_id)?
            else {
                continue;
            };

            self.new_subjects.insert(object_id);
            let activity_id = match self.activities.entry(object_id) {
                Entry::Occupied(existing) => existing.get().id,
                Entry::Vacant(slot) => slot.insert(activity).id,
            };
            if let Some(detail) =
                probe::activity_stream_detail(object.as_ref(), activity_id, ActivityType::New)?
            {
                self.details.entry(activity_id).or_default().push(detail);
            }
        }
        Ok(())
    }

    fn fold_related(
        &mut self,
        change_set: &ChangeSet,
        revision: &Revision,
        user_id: &str,
    ) -> EntityResult<()> {
        for activity_type in ActivityType::ALL {
            for object in change_set.bucket(activity_type) {
                let Some(object_id) = object.object_id() else {
                    debug!(
                        "event=activity_fold module=activity status=skip reason=missing_id object_type={}",
                        object.object_type()
                    );
                    continue;
                };
                if self.new_subjects.contains(&object_id)
                    || self.folded.contains(&(activity_type, object_id))
                {
                    continue;
                }

                let subjects = match probe::related_subjects(object.as_ref())? {
                    Participation::Participating(subjects) => subjects,
                    Participation::NotParticipating => continue,
                };

                for subject in subjects.into_iter().flatten() {
                    let Some(subject_id) = subject.object_id() else {
                        continue;
                    };
                    let (activity_id, created) = match self.activities.get(&subject_id) {
                        Some(existing) => (existing.id, None),
                        None => match probe::activity_stream_item(
                            subject.as_ref(),
                            ActivityType::Changed,
                            revision,
                            user_id,
                        )? {
                            Some(activity) => (activity.id, Some(activity)),
                            None => continue,
                        },
                    };

                    // The contributing object, not the subject, describes the change.
                    let Some(detail) =
                        probe::activity_stream_detail(object.as_ref(), activity_id, activity_type)?
                    else {
                        continue;
                    };
                    if let Some(activity) = created {
                        self.activities.insert(subject_id, activity);
                    }
                    self.details.entry(activity_id).or_default().push(detail);
                }
                self.folded.insert((activity_type, object_id));
            }
        }
        Ok(())
    }

    /// Appends every activity, then every detail, then flushes the sink.
    pub fn persist<S: ActivitySink + ?Sized>(&self, sink: &S) -> RepoResult<PersistSummary> {
        let mut summary = PersistSummary::default();
        for activity in self.activities.values() {
            sink.append_activity(activity)?;
            summary.activities += 1;
        }
        for detail in self.details.values().flatten() {
            sink.append_detail(detail)?;
            summary.details += 1;
        }
        sink.flush()?;
        Ok(summary)
    }

    /// Activities keyed by subject id, in first-recorded order.
    pub fn activities(&self) -> &IndexMap<ObjectId, Activity> {
        &self.activities
    }

    /// Detail lists keyed by activity id, each in discovery order.
    pub fn details(&self) -> &IndexMap<ActivityId, Vec<ActivityDetail>> {
        &self.details
    }

    pub fn activity_for(&self, subject_id: ObjectId) -> Option<&Activity> {
        self.activities.get(&subject_id)
    }

    pub fn details_for(&self, activity_id: ActivityId) -> &[ActivityDetail] {
        self.details
            .get(&activity_id)
            .map(Vec::as_slice)
            .unwrap_or_default()
    }

    pub fn is_empty(&self) -> bool {
        self.activities.is_empty()
    }

    fn detail_count(&self) -> usize {
        self.details.values().map(Vec::len).sum()
    }
}
