use revtrail_core::db::open_db_in_memory;
use revtrail_core::{
    Activity, ActivityDetail, ActivitySink, ActivityStreamReader, ActivityType, RepoError,
    Revision, RevisionRepository, RevisionState, SqliteActivityRepository,
    SqliteRevisionRepository, UserRef,
};
use rusqlite::Connection;
use serde_json::json;
use uuid::Uuid;

fn seed_revision(conn: &Connection) -> Revision {
    let revision = Revision::new(
        "tester",
        Some(UserRef {
            id: "user-tester".to_string(),
            name: "tester".to_string(),
        }),
    );
    SqliteRevisionRepository::new(conn)
        .create_revision(&revision)
        .unwrap();
    revision
}

fn activity_at(revision: &Revision, object_id: Uuid, user_id: &str, timestamp: i64) -> Activity {
    Activity::new(
        object_id,
        ActivityType::Changed,
        user_id,
        revision.id,
        timestamp,
    )
}

#[test]
fn activity_roundtrip_keeps_data_snapshot() {
    let conn = open_db_in_memory().unwrap();
    let revision = seed_revision(&conn);
    let repo = SqliteActivityRepository::new(&conn);

    let activity = Activity::new(
        Uuid::new_v4(),
        ActivityType::New,
        "user-tester",
        revision.id,
        revision.timestamp,
    )
    .with_data(json!({ "package": { "name": "warandpeace", "private": false } }));
    repo.append_activity(&activity).unwrap();

    let loaded = repo.get_activity(activity.id).unwrap().unwrap();
    assert_eq!(loaded, activity);
    assert!(repo.get_activity(Uuid::new_v4()).unwrap().is_none());
}

#[test]
fn object_stream_is_newest_first() {
    let conn = open_db_in_memory().unwrap();
    let revision = seed_revision(&conn);
    let repo = SqliteActivityRepository::new(&conn);
    let package_id = Uuid::new_v4();

    let older = activity_at(&revision, package_id, "user-tester", 1_000);
    let newer = activity_at(&revision, package_id, "user-tester", 2_000);
    let unrelated = activity_at(&revision, Uuid::new_v4(), "user-tester", 3_000);
    repo.append_activity(&older).unwrap();
    repo.append_activity(&newer).unwrap();
    repo.append_activity(&unrelated).unwrap();

    let ids: Vec<Uuid> = repo
        .list_object_activities(package_id, None)
        .unwrap()
        .into_iter()
        .map(|activity| activity.id)
        .collect();
    assert_eq!(ids, vec![newer.id, older.id]);
}

#[test]
fn equal_timestamps_fall_back_to_insertion_order() {
    let conn = open_db_in_memory().unwrap();
    let revision = seed_revision(&conn);
    let repo = SqliteActivityRepository::new(&conn);

    let first = activity_at(&revision, Uuid::new_v4(), "user-tester", 5_000);
    let second = activity_at(&revision, Uuid::new_v4(), "user-tester", 5_000);
    repo.append_activity(&first).unwrap();
    repo.append_activity(&second).unwrap();

    let ids: Vec<Uuid> = repo
        .list_recent_activities(None)
        .unwrap()
        .into_iter()
        .map(|activity| activity.id)
        .collect();
    assert_eq!(ids, vec![second.id, first.id]);
}

#[test]
fn user_stream_filters_by_actor_and_honors_limit() {
    let conn = open_db_in_memory().unwrap();
    let revision = seed_revision(&conn);
    let repo = SqliteActivityRepository::new(&conn);

    for timestamp in 0..5 {
        repo.append_activity(&activity_at(
            &revision,
            Uuid::new_v4(),
            "user-tester",
            timestamp,
        ))
        .unwrap();
    }
    repo.append_activity(&activity_at(
        &revision,
        Uuid::new_v4(),
        "not logged in",
        10,
    ))
    .unwrap();

    let mine = repo.list_user_activities("user-tester", Some(3)).unwrap();
    assert_eq!(mine.len(), 3);
    assert!(mine.iter().all(|activity| activity.user_id == "user-tester"));
    assert_eq!(mine[0].timestamp, 4);

    let anonymous = repo.list_user_activities("not logged in", None).unwrap();
    assert_eq!(anonymous.len(), 1);
}

#[test]
fn details_are_listed_in_insertion_order() {
    let conn = open_db_in_memory().unwrap();
    let revision = seed_revision(&conn);
    let repo = SqliteActivityRepository::new(&conn);
    let activity = activity_at(&revision, Uuid::new_v4(), "user-tester", 1);
    repo.append_activity(&activity).unwrap();

    let details = [
        ActivityDetail::new(activity.id, Uuid::new_v4(), "Resource", ActivityType::Deleted),
        ActivityDetail::new(activity.id, Uuid::new_v4(), "Package", ActivityType::Changed),
        ActivityDetail::new(activity.id, Uuid::new_v4(), "tag", ActivityType::New)
            .with_data(json!({ "tag": { "name": "russian" } })),
    ];
    for detail in &details {
        repo.append_detail(detail).unwrap();
    }

    let loaded = repo.list_activity_details(activity.id).unwrap();
    assert_eq!(loaded, details.to_vec());
}

#[test]
fn detail_without_parent_activity_is_rejected() {
    let conn = open_db_in_memory().unwrap();
    let repo = SqliteActivityRepository::new(&conn);

    let orphan = ActivityDetail::new(Uuid::new_v4(), Uuid::new_v4(), "Resource", ActivityType::New);
    let err = repo.append_detail(&orphan).unwrap_err();
    assert!(matches!(err, RepoError::Db(_)));
}

#[test]
fn corrupt_persisted_data_is_reported() {
    let conn = open_db_in_memory().unwrap();
    let revision = seed_revision(&conn);
    let repo = SqliteActivityRepository::new(&conn);
    let activity = activity_at(&revision, Uuid::new_v4(), "user-tester", 1);
    repo.append_activity(&activity).unwrap();

    conn.execute(
        "UPDATE activity SET data = '{not json' WHERE id = ?1;",
        [activity.id.to_string()],
    )
    .unwrap();

    let err = repo.get_activity(activity.id).unwrap_err();
    assert!(matches!(err, RepoError::InvalidData(message) if message.contains("activity.data")));
}

#[test]
fn revision_state_transitions_are_persisted() {
    let conn = open_db_in_memory().unwrap();
    let revision = seed_revision(&conn);
    let repo = SqliteRevisionRepository::new(&conn);

    let stored = repo.get_revision(revision.id).unwrap().unwrap();
    assert_eq!(stored, revision);
    assert_eq!(stored.state, RevisionState::Pending);

    repo.set_revision_state(revision.id, RevisionState::Active)
        .unwrap();
    let stored = repo.get_revision(revision.id).unwrap().unwrap();
    assert_eq!(stored.state, RevisionState::Active);
}

#[test]
fn anonymous_revision_has_no_user() {
    let conn = open_db_in_memory().unwrap();
    let repo = SqliteRevisionRepository::new(&conn);
    let revision = Revision::new("127.0.0.1", None);
    repo.create_revision(&revision).unwrap();

    let stored = repo.get_revision(revision.id).unwrap().unwrap();
    assert_eq!(stored.user, None);
    assert_eq!(stored.author, "127.0.0.1");
}

#[test]
fn missing_revision_state_update_is_not_found() {
    let conn = open_db_in_memory().unwrap();
    let repo = SqliteRevisionRepository::new(&conn);
    let missing = Uuid::new_v4();

    let err = repo
        .set_revision_state(missing, RevisionState::Deleted)
        .unwrap_err();
    assert!(matches!(err, RepoError::NotFound(id) if id == missing));
    assert!(repo.get_revision(missing).unwrap().is_none());
}
