//! Per-transaction change set.
//!
//! # Responsibility
//! - Partition touched objects into `new`, `changed` and `deleted` buckets.
//!
//! # Invariants
//! - Buckets are disjoint and keep first-touch order.
//! - One object appears at most once, matched by id, or by pointer when the
//!   object has no id.

use crate::model::activity::ActivityType;
use crate::model::entity::ObjectRef;
use std::sync::Arc;

/// Objects touched by one unit of work.
#[derive(Debug, Default, Clone)]
pub struct ChangeSet {
    new: Vec<ObjectRef>,
    changed: Vec<ObjectRef>,
    deleted: Vec<ObjectRef>,
}

impl ChangeSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records a freshly created object.
    pub fn mark_new(&mut self, object: ObjectRef) {
        if contains(&self.new, &object)
            || contains(&self.changed, &object)
            || contains(&self.deleted, &object)
        {
            return;
        }
        self.new.push(object);
    }

    /// Records a modification. Objects already new or deleted keep their bucket.
    pub fn mark_changed(&mut self, object: ObjectRef) {
        if contains(&self.new, &object)
            || contains(&self.changed, &object)
            || contains(&self.deleted, &object)
        {
            return;
        }
        self.changed.push(object);
    }

    /// Records a deletion.
    ///
    /// An object created and deleted within the same unit of work never existed
    /// outside it, so it leaves the change set entirely.
    pub fn mark_deleted(&mut self, object: ObjectRef) {
        if remove(&mut self.new, &object) {
            return;
        }
        remove(&mut self.changed, &object);
        if !contains(&self.deleted, &object) {
            self.deleted.push(object);
        }
    }

    /// Returns the bucket for one change kind.
    pub fn bucket(&self, activity_type: ActivityType) -> &[ObjectRef] {
        match activity_type {
            ActivityType::New => &self.new,
            ActivityType::Changed => &self.changed,
            ActivityType::Deleted => &self.deleted,
        }
    }

    pub fn len(&self) -> usize {
        self.new.len() + self.changed.len() + self.deleted.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

fn same_object(left: &ObjectRef, right: &ObjectRef) -> bool {
    match (left.object_id(), right.object_id()) {
        (Some(left_id), Some(right_id)) => left_id == right_id,
        _ => Arc::ptr_eq(left, right),
    }
}

fn contains(bucket: &[ObjectRef], object: &ObjectRef) -> bool {
    bucket.iter().any(|existing| same_object(existing, object))
}

fn remove(bucket: &mut Vec<ObjectRef>, object: &ObjectRef) -> bool {
    let before = bucket.len();
    bucket.retain(|existing| !same_object(existing, object));
    bucket.len() != before
}

#[cfg(test)]
mod tests {
    use super::ChangeSet;
    use crate::model::activity::ActivityType;
    use crate::model::entity::ObjectRef;
    use crate::model::package::{Package, Tag};
    use std::sync::Arc;

    fn package(name: &str) -> ObjectRef {
        Arc::new(Package::new(name))
    }

    #[test]
    fn changed_after_new_stays_new() {
        let object = package("warandpeace");
        let mut change_set = ChangeSet::new();
        change_set.mark_new(object.clone());
        change_set.mark_changed(object);

        assert_eq!(change_set.bucket(ActivityType::New).len(), 1);
        assert!(change_set.bucket(ActivityType::Changed).is_empty());
    }

    #[test]
    fn deleting_new_object_drops_it() {
        let object = package("annakarenina");
        let mut change_set = ChangeSet::new();
        change_set.mark_new(object.clone());
        change_set.mark_deleted(object);

        assert!(change_set.is_empty());
    }

    #[test]
    fn deleting_changed_object_moves_it() {
        let object = package("annakarenina");
        let mut change_set = ChangeSet::new();
        change_set.mark_changed(object.clone());
        change_set.mark_deleted(object.clone());
        change_set.mark_deleted(object);

        assert!(change_set.bucket(ActivityType::Changed).is_empty());
        assert_eq!(change_set.bucket(ActivityType::Deleted).len(), 1);
    }

    #[test]
    fn objects_without_id_dedupe_by_pointer() {
        let first: ObjectRef = Arc::new(Tag::unsaved("russian"));
        let second: ObjectRef = Arc::new(Tag::unsaved("russian"));
        let mut change_set = ChangeSet::new();
        change_set.mark_changed(first.clone());
        change_set.mark_changed(first);
        change_set.mark_changed(second);

        assert_eq!(change_set.bucket(ActivityType::Changed).len(), 2);
    }

    #[test]
    fn buckets_keep_first_touch_order() {
        let a = package("a");
        let b = package("b");
        let c = package("c");
        let mut change_set = ChangeSet::new();
        change_set.mark_changed(b.clone());
        change_set.mark_changed(a.clone());
        change_set.mark_changed(c.clone());
        change_set.mark_changed(b.clone());

        let ids: Vec<_> = change_set
            .bucket(ActivityType::Changed)
            .iter()
            .map(|object| object.object_id())
            .collect();
        assert_eq!(ids, vec![b.object_id(), a.object_id(), c.object_id()]);
    }
}
