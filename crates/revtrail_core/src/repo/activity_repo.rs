//! Activity stream persistence sink and read queries.
//!
//! # Responsibility
//! - Append synthesized `Activity` / `ActivityDetail` rows.
//! - Serve activity stream reads per object, per user and site-wide.
//!
//! # Invariants
//! - Activity lists are newest first, ties broken by insertion order.
//! - Detail lists are in insertion order; there is no other sort key.
//! - List limits default to 31 and clamp to 100.

use crate::model::activity::{Activity, ActivityDetail, ActivityId, ActivityType, ObjectId};
use crate::repo::{parse_uuid, RepoError, RepoResult};
use rusqlite::{params, Connection, OptionalExtension, Row};
use serde_json::Value;

const ACTIVITY_LIMIT_DEFAULT: u32 = 31;
const ACTIVITY_LIMIT_MAX: u32 = 100;

const ACTIVITY_SELECT_SQL: &str = "SELECT
    id,
    timestamp,
    user_id,
    object_id,
    revision_id,
    activity_type,
    data
FROM activity";

/// Destination for synthesized activity rows.
pub trait ActivitySink {
    fn append_activity(&self, activity: &Activity) -> RepoResult<()>;
    fn append_detail(&self, detail: &ActivityDetail) -> RepoResult<()>;

    /// Makes appended rows durable within the current unit of work.
    ///
    /// Sinks that write through on append need not override this.
    fn flush(&self) -> RepoResult<()> {
        Ok(())
    }
}

/// Read interface for persisted activity stream rows.
pub trait ActivityStreamReader {
    fn get_activity(&self, id: ActivityId) -> RepoResult<Option<Activity>>;
    fn list_object_activities(
        &self,
        object_id: ObjectId,
        limit: Option<u32>,
    ) -> RepoResult<Vec<Activity>>;
    fn list_user_activities(&self, user_id: &str, limit: Option<u32>) -> RepoResult<Vec<Activity>>;
    fn list_recent_activities(&self, limit: Option<u32>) -> RepoResult<Vec<Activity>>;
    fn list_activity_details(&self, activity_id: ActivityId) -> RepoResult<Vec<ActivityDetail>>;
}

/// SQLite-backed activity repository.
pub struct SqliteActivityRepository<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteActivityRepository<'conn> {
    pub fn new(conn: &'conn Connection) -> Self {
        Self { conn }
    }

    fn query_activities(
        &self,
        sql: &str,
        params: impl rusqlite::Params,
    ) -> RepoResult<Vec<Activity>> {
        let mut stmt = self.conn.prepare(sql)?;
        let mut rows = stmt.query(params)?;
        let mut activities = Vec::new();
        while let Some(row) = rows.next()? {
            activities.push(parse_activity_row(row)?);
        }
        Ok(activities)
    }
}

impl ActivitySink for SqliteActivityRepository<'_> {
    fn append_activity(&self, activity: &Activity) -> RepoResult<()> {
        self.conn.execute(
            "INSERT INTO activity (
                id,
                timestamp,
                user_id,
                object_id,
                revision_id,
                activity_type,
                data
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7);",
            params![
                activity.id.to_string(),
                activity.timestamp,
                activity.user_id.as_str(),
                activity.object_id.to_string(),
                activity.revision_id.to_string(),
                activity.activity_type.as_str(),
                encode_data(activity.data.as_ref())?,
            ],
        )?;
        Ok(())
    }

    fn append_detail(&self, detail: &ActivityDetail) -> RepoResult<()> {
        self.conn.execute(
            "INSERT INTO activity_detail (
                id,
                activity_id,
                object_id,
                object_type,
                activity_type,
                data
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6);",
            params![
                detail.id.to_string(),
                detail.activity_id.to_string(),
                detail.object_id.to_string(),
                detail.object_type.as_str(),
                detail.activity_type.as_str(),
                encode_data(detail.data.as_ref())?,
            ],
        )?;
        Ok(())
    }
}

impl ActivityStreamReader for SqliteActivityRepository<'_> {
    fn get_activity(&self, id: ActivityId) -> RepoResult<Option<Activity>> {
        let mut stmt = self
            .conn
            .prepare(&format!("{ACTIVITY_SELECT_SQL} WHERE id = ?1;"))?;
        let row = stmt
            .query_row([id.to_string()], |row| Ok(parse_activity_row(row)))
            .optional()?;
        row.transpose()
    }

    fn list_object_activities(
        &self,
        object_id: ObjectId,
        limit: Option<u32>,
    ) -> RepoResult<Vec<Activity>> {
        self.query_activities(
            &format!(
                "{ACTIVITY_SELECT_SQL}
                 WHERE object_id = ?1
                 ORDER BY timestamp DESC, rowid DESC
                 LIMIT ?2;"
            ),
            params![object_id.to_string(), normalize_activity_limit(limit)],
        )
    }

    fn list_user_activities(&self, user_id: &str, limit: Option<u32>) -> RepoResult<Vec<Activity>> {
        self.query_activities(
            &format!(
                "{ACTIVITY_SELECT_SQL}
                 WHERE user_id = ?1
                 ORDER BY timestamp DESC, rowid DESC
                 LIMIT ?2;"
            ),
            params![user_id, normalize_activity_limit(limit)],
        )
    }

    fn list_recent_activities(&self, limit: Option<u32>) -> RepoResult<Vec<Activity>> {
        self.query_activities(
            &format!(
                "{ACTIVITY_SELECT_SQL}
                 ORDER BY timestamp DESC, rowid DESC
                 LIMIT ?1;"
            ),
            [normalize_activity_limit(limit)],
        )
    }

    fn list_activity_details(&self, activity_id: ActivityId) -> RepoResult<Vec<ActivityDetail>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, activity_id, object_id, object_type, activity_type, data
             FROM activity_detail
             WHERE activity_id = ?1
             ORDER BY rowid ASC;",
        )?;
        let mut rows = stmt.query([activity_id.to_string()])?;
        let mut details = Vec::new();
        while let Some(row) = rows.next()? {
            details.push(parse_detail_row(row)?);
        }
        Ok(details)
    }
}

/// Applies the default and upper bound to a requested list limit.
pub fn normalize_activity_limit(limit: Option<u32>) -> u32 {
    limit
        .unwrap_or(ACTIVITY_LIMIT_DEFAULT)
        .clamp(1, ACTIVITY_LIMIT_MAX)
}

fn parse_activity_row(row: &Row<'_>) -> RepoResult<Activity> {
    let id: String = row.get("id")?;
    let object_id: String = row.get("object_id")?;
    let revision_id: String = row.get("revision_id")?;
    Ok(Activity {
        id: parse_uuid(&id, "activity.id")?,
        object_id: parse_uuid(&object_id, "activity.object_id")?,
        activity_type: parse_activity_type(row, "activity.activity_type")?,
        user_id: row.get("user_id")?,
        revision_id: parse_uuid(&revision_id, "activity.revision_id")?,
        timestamp: row.get("timestamp")?,
        data: decode_data(row, "activity.data")?,
    })
}

fn parse_detail_row(row: &Row<'_>) -> RepoResult<ActivityDetail> {
    let id: String = row.get("id")?;
    let activity_id: String = row.get("activity_id")?;
    let object_id: String = row.get("object_id")?;
    Ok(ActivityDetail {
        id: parse_uuid(&id, "activity_detail.id")?,
        activity_id: parse_uuid(&activity_id, "activity_detail.activity_id")?,
        object_id: parse_uuid(&object_id, "activity_detail.object_id")?,
        object_type: row.get("object_type")?,
        activity_type: parse_activity_type(row, "activity_detail.activity_type")?,
        data: decode_data(row, "activity_detail.data")?,
    })
}

fn parse_activity_type(row: &Row<'_>, column: &'static str) -> RepoResult<ActivityType> {
    let value: String = row.get("activity_type")?;
    ActivityType::parse(&value)
        .ok_or_else(|| RepoError::InvalidData(format!("invalid activity type `{value}` in {column}")))
}

fn encode_data(data: Option<&Value>) -> RepoResult<Option<String>> {
    data.map(|value| {
        serde_json::to_string(value)
            .map_err(|err| RepoError::InvalidData(format!("unencodable activity data: {err}")))
    })
    .transpose()
}

fn decode_data(row: &Row<'_>, column: &'static str) -> RepoResult<Option<Value>> {
    let Some(text) = row.get::<_, Option<String>>("data")? else {
        return Ok(None);
    };
    serde_json::from_str(&text)
        .map(Some)
        .map_err(|err| RepoError::InvalidData(format!("invalid json in {column}: {err}")))
}

#[cfg(test)]
mod tests {
    use super::normalize_activity_limit;

    #[test]
    fn limit_defaults_and_clamps() {
        assert_eq!(normalize_activity_limit(None), 31);
        assert_eq!(normalize_activity_limit(Some(0)), 1);
        assert_eq!(normalize_activity_limit(Some(500)), 100);
        assert_eq!(normalize_activity_limit(Some(7)), 7);
    }
}
