//! Capability probing and dispatch.
//!
//! # Responsibility
//! - Look up optional activity capabilities on a domain object.
//! - Dispatch `activity_stream_item` / `activity_stream_detail` when present.
//! - Classify `related_subjects` results into participation.
//!
//! # Invariants
//! - Probing never fails; absence is reported as `None`.
//! - Only `EntityError::CapabilityMismatch` is absorbed. Everything else
//!   is returned to the caller unchanged.

use crate::model::activity::{Activity, ActivityDetail, ActivityId, ActivityType};
use crate::model::entity::{
    Capability, DetailCapable, DomainObject, EntityError, EntityResult, ObjectRef,
    SubjectCapable,
};
use crate::model::revision::Revision;
use log::debug;

/// Whether an object takes part in subject-level activity.
#[derive(Debug)]
pub enum Participation {
    /// Owning subjects in discovery order. `None` entries are skipped by callers.
    Participating(Vec<Option<ObjectRef>>),
    NotParticipating,
}

/// Returns the subject capability, if the object declares it.
pub fn probe_subject(object: &dyn DomainObject) -> Option<&dyn SubjectCapable> {
    let capability = object.as_subject();
    if capability.is_none() {
        log_missing(object, Capability::Subject);
    }
    capability
}

/// Returns the detail capability, if the object declares it.
pub fn probe_detail(object: &dyn DomainObject) -> Option<&dyn DetailCapable> {
    let capability = object.as_detail_source();
    if capability.is_none() {
        log_missing(object, Capability::Detail);
    }
    capability
}

/// Builds the object's activity when it is subject-capable.
pub fn activity_stream_item(
    object: &dyn DomainObject,
    activity_type: ActivityType,
    revision: &Revision,
    user_id: &str,
) -> EntityResult<Option<Activity>> {
    match probe_subject(object) {
        Some(subject) => subject.activity_stream_item(activity_type, revision, user_id),
        None => Ok(None),
    }
}

/// Builds the object's detail row when it is detail-capable.
pub fn activity_stream_detail(
    object: &dyn DomainObject,
    activity_id: ActivityId,
    activity_type: ActivityType,
) -> EntityResult<Option<ActivityDetail>> {
    match probe_detail(object) {
        Some(source) => source.activity_stream_detail(activity_id, activity_type),
        None => Ok(None),
    }
}

/// Resolves owning subjects, treating absent or mismatched relations as
/// non-participation.
pub fn related_subjects(object: &dyn DomainObject) -> EntityResult<Participation> {
    let Some(related) = object.as_related() else {
        log_missing(object, Capability::Related);
        return Ok(Participation::NotParticipating);
    };

    match related.related_subjects() {
        Ok(subjects) => Ok(Participation::Participating(subjects)),
        Err(EntityError::CapabilityMismatch {
            object_type,
            message,
        }) => {
            debug!(
                "event=capability_probe module=activity status=mismatch capability={} object_type={} detail={}",
                Capability::Related.as_str(),
                object_type,
                message
            );
            Ok(Participation::NotParticipating)
        }
        Err(err) => Err(err),
    }
}

fn log_missing(object: &dyn DomainObject, capability: Capability) {
    debug!(
        "event=capability_probe module=activity status=absent capability={} object_type={} declared={}",
        capability.as_str(),
        object.object_type(),
        declared_capabilities(object)
    );
}

/// Comma-separated capability names, or `none`.
fn declared_capabilities(object: &dyn DomainObject) -> String {
    let declared = object
        .capabilities()
        .into_iter()
        .map(Capability::as_str)
        .collect::<Vec<_>>();
    if declared.is_empty() {
        "none".to_string()
    } else {
        declared.join(",")
    }
}

#[cfg(test)]
mod tests {
    use super::{
        activity_stream_detail, activity_stream_item, declared_capabilities, related_subjects,
        Participation,
    };
    use crate::model::activity::{ActivityType, ObjectId};
    use crate::model::entity::{DomainObject, EntityError, EntityResult, ObjectRef, RelatedCapable};
    use crate::model::package::{Group, Member, Package, Resource, Tag};
    use crate::model::revision::Revision;
    use uuid::Uuid;

    #[derive(Debug)]
    struct BrokenOwner;

    impl DomainObject for BrokenOwner {
        fn object_id(&self) -> Option<ObjectId> {
            Some(Uuid::nil())
        }

        fn object_type(&self) -> &'static str {
            "BrokenOwner"
        }

        fn as_related(&self) -> Option<&dyn RelatedCapable> {
            Some(self)
        }
    }

    impl RelatedCapable for BrokenOwner {
        fn related_subjects(&self) -> EntityResult<Vec<Option<ObjectRef>>> {
            Err(EntityError::Internal("owner lookup exploded".to_string()))
        }
    }

    #[test]
    fn missing_subject_capability_yields_none() {
        let revision = Revision::new("tester", None);
        let tag = Tag::new("russian");
        let activity = activity_stream_item(&tag, ActivityType::New, &revision, "u").unwrap();
        assert!(activity.is_none());
        assert!(activity_stream_detail(&tag, Uuid::new_v4(), ActivityType::New)
            .unwrap()
            .is_none());
    }

    #[test]
    fn subject_capability_is_dispatched() {
        let revision = Revision::new("tester", None);
        let package = Package::new("warandpeace");
        let activity = activity_stream_item(&package, ActivityType::New, &revision, "u")
            .unwrap()
            .unwrap();
        assert_eq!(activity.object_id, package.id);
        assert_eq!(activity.revision_id, revision.id);
    }

    #[test]
    fn absent_related_capability_is_not_participating() {
        let group = Group::new("david");
        assert!(matches!(
            related_subjects(&group).unwrap(),
            Participation::NotParticipating
        ));
    }

    #[test]
    fn capability_mismatch_is_not_participating() {
        let group = Group::new("david");
        let member = Member::of_user(&group, Uuid::new_v4(), "admin");
        assert!(matches!(
            related_subjects(&member).unwrap(),
            Participation::NotParticipating
        ));
    }

    #[test]
    fn other_related_errors_propagate() {
        let err = related_subjects(&BrokenOwner).unwrap_err();
        assert!(matches!(err, EntityError::Internal(_)));
    }

    #[test]
    fn declared_capabilities_lists_what_an_entity_implements() {
        let package = std::sync::Arc::new(Package::new("warandpeace"));
        let resource = Resource::new(&package, "csv", "http://example.com/data.csv");
        assert_eq!(
            declared_capabilities(&*package),
            "activity_stream_item,activity_stream_detail,related_packages"
        );
        assert_eq!(
            declared_capabilities(&resource),
            "activity_stream_detail,related_packages"
        );
        assert_eq!(declared_capabilities(&Tag::new("russian")), "none");
    }
}
