//! Catalogue entities and their activity capabilities.
//!
//! # Responsibility
//! - Model packages, groups and the sub-entities owned by packages.
//! - Declare which activity capabilities each entity implements.
//!
//! # Invariants
//! - Packages and groups are subjects; resources, tags, extras and
//!   memberships report their changes on the owning package.
//! - A `changed` package whose state is `Deleted` is reported as `deleted`.
//! - Private packages never appear in the activity stream.

use crate::model::activity::{Activity, ActivityDetail, ActivityId, ActivityType, ObjectId};
use crate::model::entity::{
    DetailCapable, DomainObject, EntityError, EntityResult, ObjectRef, RelatedCapable,
    SubjectCapable,
};
use crate::model::revision::Revision;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::sync::Arc;
use uuid::Uuid;

/// Soft-delete state shared by catalogue entities.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntityState {
    Active,
    Deleted,
}

/// Dataset: the primary activity subject.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Package {
    pub id: ObjectId,
    pub name: String,
    pub title: Option<String>,
    pub state: EntityState,
    pub private: bool,
}

impl Package {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            name: name.into(),
            title: None,
            state: EntityState::Active,
            private: false,
        }
    }
}

impl DomainObject for Package {
    fn object_id(&self) -> Option<ObjectId> {
        Some(self.id)
    }

    fn object_type(&self) -> &'static str {
        "Package"
    }

    fn as_subject(&self) -> Option<&dyn SubjectCapable> {
        Some(self)
    }

    fn as_detail_source(&self) -> Option<&dyn DetailCapable> {
        Some(self)
    }

    fn as_related(&self) -> Option<&dyn RelatedCapable> {
        Some(self)
    }
}

impl SubjectCapable for Package {
    fn activity_stream_item(
        &self,
        activity_type: ActivityType,
        revision: &Revision,
        user_id: &str,
    ) -> EntityResult<Option<Activity>> {
        if self.private {
            return Ok(None);
        }
        let activity_type = match (activity_type, self.state) {
            (ActivityType::Changed, EntityState::Deleted) => ActivityType::Deleted,
            (other, _) => other,
        };
        let activity = Activity::new(
            self.id,
            activity_type,
            user_id,
            revision.id,
            revision.timestamp,
        )
        .with_data(snapshot(&[("package", self)])?);
        Ok(Some(activity))
    }
}

impl DetailCapable for Package {
    fn activity_stream_detail(
        &self,
        activity_id: ActivityId,
        activity_type: ActivityType,
    ) -> EntityResult<Option<ActivityDetail>> {
        let detail = ActivityDetail::new(activity_id, self.id, "Package", activity_type)
            .with_data(snapshot(&[("package", self)])?);
        Ok(Some(detail))
    }
}

impl RelatedCapable for Package {
    /// A package is its own subject, so edits to its own fields land on it.
    fn related_subjects(&self) -> EntityResult<Vec<Option<ObjectRef>>> {
        Ok(vec![Some(Arc::new(self.clone()) as ObjectRef)])
    }
}

/// Collection of packages. Subject-capable, but owned by nothing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Group {
    pub id: ObjectId,
    pub name: String,
    pub title: Option<String>,
    pub state: EntityState,
}

impl Group {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            name: name.into(),
            title: None,
            state: EntityState::Active,
        }
    }
}

impl DomainObject for Group {
    fn object_id(&self) -> Option<ObjectId> {
        Some(self.id)
    }

    fn object_type(&self) -> &'static str {
        "Group"
    }

    fn as_subject(&self) -> Option<&dyn SubjectCapable> {
        Some(self)
    }

    fn as_detail_source(&self) -> Option<&dyn DetailCapable> {
        Some(self)
    }
}

impl SubjectCapable for Group {
    fn activity_stream_item(
        &self,
        activity_type: ActivityType,
        revision: &Revision,
        user_id: &str,
    ) -> EntityResult<Option<Activity>> {
        let activity = Activity::new(
            self.id,
            activity_type,
            user_id,
            revision.id,
            revision.timestamp,
        )
        .with_data(snapshot(&[("group", self)])?);
        Ok(Some(activity))
    }
}

impl DetailCapable for Group {
    fn activity_stream_detail(
        &self,
        activity_id: ActivityId,
        activity_type: ActivityType,
    ) -> EntityResult<Option<ActivityDetail>> {
        let detail = ActivityDetail::new(activity_id, self.id, "Group", activity_type)
            .with_data(snapshot(&[("group", self)])?);
        Ok(Some(detail))
    }
}

/// Downloadable file or link attached to a package.
#[derive(Debug, Clone, Serialize)]
pub struct Resource {
    pub id: ObjectId,
    pub name: String,
    pub url: String,
    pub state: EntityState,
    /// Owning package id as stored on the row.
    pub package_id: Option<ObjectId>,
    /// Loaded owner. `None` when the owner row is gone.
    #[serde(skip)]
    pub package: Option<Arc<Package>>,
}

impl Resource {
    pub fn new(package: &Arc<Package>, name: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            name: name.into(),
            url: url.into(),
            state: EntityState::Active,
            package_id: Some(package.id),
            package: Some(Arc::clone(package)),
        }
    }
}

impl DomainObject for Resource {
    fn object_id(&self) -> Option<ObjectId> {
        Some(self.id)
    }

    fn object_type(&self) -> &'static str {
        "Resource"
    }

    fn as_detail_source(&self) -> Option<&dyn DetailCapable> {
        Some(self)
    }

    fn as_related(&self) -> Option<&dyn RelatedCapable> {
        Some(self)
    }
}

impl DetailCapable for Resource {
    fn activity_stream_detail(
        &self,
        activity_id: ActivityId,
        activity_type: ActivityType,
    ) -> EntityResult<Option<ActivityDetail>> {
        let detail = ActivityDetail::new(activity_id, self.id, "Resource", activity_type)
            .with_data(snapshot(&[("resource", self)])?);
        Ok(Some(detail))
    }
}

impl RelatedCapable for Resource {
    fn related_subjects(&self) -> EntityResult<Vec<Option<ObjectRef>>> {
        Ok(vec![owner(&self.package)])
    }
}

/// Free-form tag. Tags themselves carry no activity capabilities.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tag {
    pub id: Option<ObjectId>,
    pub name: String,
}

impl Tag {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            id: Some(Uuid::new_v4()),
            name: name.into(),
        }
    }

    /// Tag not yet assigned an id by storage.
    pub fn unsaved(name: impl Into<String>) -> Self {
        Self {
            id: None,
            name: name.into(),
        }
    }
}

impl DomainObject for Tag {
    fn object_id(&self) -> Option<ObjectId> {
        self.id
    }

    fn object_type(&self) -> &'static str {
        "Tag"
    }
}

/// Link between a tag and a package.
#[derive(Debug, Clone, Serialize)]
pub struct PackageTag {
    pub id: ObjectId,
    pub tag: Tag,
    pub state: EntityState,
    #[serde(skip)]
    pub package: Option<Arc<Package>>,
}

impl PackageTag {
    pub fn new(package: &Arc<Package>, tag: Tag) -> Self {
        Self {
            id: Uuid::new_v4(),
            tag,
            state: EntityState::Active,
            package: Some(Arc::clone(package)),
        }
    }
}

impl DomainObject for PackageTag {
    fn object_id(&self) -> Option<ObjectId> {
        Some(self.id)
    }

    fn object_type(&self) -> &'static str {
        "PackageTag"
    }

    fn as_detail_source(&self) -> Option<&dyn DetailCapable> {
        Some(self)
    }

    fn as_related(&self) -> Option<&dyn RelatedCapable> {
        Some(self)
    }
}

impl DetailCapable for PackageTag {
    /// Reported under the `tag` object type with both tag and package data.
    fn activity_stream_detail(
        &self,
        activity_id: ActivityId,
        activity_type: ActivityType,
    ) -> EntityResult<Option<ActivityDetail>> {
        let mut data = snapshot(&[("tag", &self.tag)])?;
        if let (Some(package), Value::Object(fields)) = (&self.package, &mut data) {
            fields.insert("package".to_string(), to_json("package", &**package)?);
        }
        let detail = ActivityDetail::new(activity_id, self.id, "tag", activity_type).with_data(data);
        Ok(Some(detail))
    }
}

impl RelatedCapable for PackageTag {
    fn related_subjects(&self) -> EntityResult<Vec<Option<ObjectRef>>> {
        Ok(vec![owner(&self.package)])
    }
}

/// Custom key/value field on a package.
#[derive(Debug, Clone, Serialize)]
pub struct PackageExtra {
    pub id: ObjectId,
    pub key: String,
    pub value: String,
    pub state: EntityState,
    #[serde(skip)]
    pub package: Option<Arc<Package>>,
}

impl PackageExtra {
    pub fn new(package: &Arc<Package>, key: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            key: key.into(),
            value: value.into(),
            state: EntityState::Active,
            package: Some(Arc::clone(package)),
        }
    }
}

impl DomainObject for PackageExtra {
    fn object_id(&self) -> Option<ObjectId> {
        Some(self.id)
    }

    fn object_type(&self) -> &'static str {
        "PackageExtra"
    }

    fn as_detail_source(&self) -> Option<&dyn DetailCapable> {
        Some(self)
    }

    fn as_related(&self) -> Option<&dyn RelatedCapable> {
        Some(self)
    }
}

impl DetailCapable for PackageExtra {
    fn activity_stream_detail(
        &self,
        activity_id: ActivityId,
        activity_type: ActivityType,
    ) -> EntityResult<Option<ActivityDetail>> {
        let detail = ActivityDetail::new(activity_id, self.id, "PackageExtra", activity_type)
            .with_data(snapshot(&[("package_extra", self)])?);
        Ok(Some(detail))
    }
}

impl RelatedCapable for PackageExtra {
    fn related_subjects(&self) -> EntityResult<Vec<Option<ObjectRef>>> {
        Ok(vec![owner(&self.package)])
    }
}

/// Group membership row. `table_name` names the member's kind.
///
/// Memberships describe no detail of their own; group-level activity for
/// them is emitted by the group layer, not by the commit hook.
#[derive(Debug, Clone, Serialize)]
pub struct Member {
    pub id: ObjectId,
    pub group_id: ObjectId,
    pub table_name: String,
    pub table_id: ObjectId,
    pub capacity: String,
    #[serde(skip)]
    pub package: Option<Arc<Package>>,
}

impl Member {
    /// Membership of a package in a group.
    pub fn of_package(group: &Group, package: &Arc<Package>) -> Self {
        Self {
            id: Uuid::new_v4(),
            group_id: group.id,
            table_name: "package".to_string(),
            table_id: package.id,
            capacity: "public".to_string(),
            package: Some(Arc::clone(package)),
        }
    }

    /// Membership of a user account in a group.
    pub fn of_user(group: &Group, user_id: ObjectId, capacity: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            group_id: group.id,
            table_name: "user".to_string(),
            table_id: user_id,
            capacity: capacity.into(),
            package: None,
        }
    }
}

impl DomainObject for Member {
    fn object_id(&self) -> Option<ObjectId> {
        Some(self.id)
    }

    fn object_type(&self) -> &'static str {
        "Member"
    }

    fn as_related(&self) -> Option<&dyn RelatedCapable> {
        Some(self)
    }
}

impl RelatedCapable for Member {
    fn related_subjects(&self) -> EntityResult<Vec<Option<ObjectRef>>> {
        if self.table_name != "package" {
            return Err(EntityError::CapabilityMismatch {
                object_type: "Member",
                message: format!("member table `{}` has no related packages", self.table_name),
            });
        }
        Ok(vec![owner(&self.package)])
    }
}

fn owner(package: &Option<Arc<Package>>) -> Option<ObjectRef> {
    package.as_ref().map(|package| Arc::clone(package) as ObjectRef)
}

fn snapshot<T: Serialize + ?Sized>(entries: &[(&str, &T)]) -> EntityResult<Value> {
    let mut fields = Map::new();
    for (key, value) in entries {
        fields.insert((*key).to_string(), to_json(key, *value)?);
    }
    Ok(Value::Object(fields))
}

fn to_json<T: Serialize + ?Sized>(key: &str, value: &T) -> EntityResult<Value> {
    serde_json::to_value(value)
        .map_err(|err| EntityError::Internal(format!("failed to snapshot `{key}`: {err}")))
}
