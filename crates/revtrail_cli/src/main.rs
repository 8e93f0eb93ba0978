//! CLI smoke entry point.
//!
//! # Responsibility
//! - Verify `revtrail_core` linkage and print its version.
//! - Commit one demo revision and print the resulting activity stream as JSON.
//!
//! Usage: `revtrail_cli [DB_PATH] [LOG_DIR]`. Without `DB_PATH` an in-memory
//! database is used.

use log::info;
use revtrail_core::db::{open_db, open_db_in_memory};
use revtrail_core::{
    ActivityStreamConfig, ActivityStreamReader, Package, PackageTag, Resource, Revision,
    RevisionSession, SqliteActivityRepository, Tag, UserRef,
};
use serde_json::json;
use std::error::Error;
use std::sync::Arc;

fn main() {
    if let Err(err) = run() {
        eprintln!("revtrail_cli error: {err}");
        std::process::exit(1);
    }
}

fn run() -> Result<(), Box<dyn Error>> {
    let mut args = std::env::args().skip(1);
    let db_path = args.next();
    if let Some(log_dir) = args.next() {
        revtrail_core::init_logging(revtrail_core::default_log_level(), &log_dir)?;
    }

    println!("revtrail_core ping={}", revtrail_core::ping());
    println!("revtrail_core version={}", revtrail_core::core_version());

    let conn = match db_path.as_deref() {
        Some(path) => open_db(path)?,
        None => open_db_in_memory()?,
    };

    let package = Arc::new(Package::new("warandpeace"));
    let resource = Arc::new(Resource::new(
        &package,
        "full text",
        "http://example.com/warandpeace.txt",
    ));
    let tag = Arc::new(PackageTag::new(&package, Tag::new("russian")));

    let mut session = RevisionSession::begin(&conn, ActivityStreamConfig::default())?;
    session.set_revision(
        Revision::new(
            "cli",
            Some(UserRef {
                id: "cli-user".to_string(),
                name: "cli".to_string(),
            }),
        )
        .with_message("demo revision"),
    )?;
    session.track_new(package.clone())?;
    session.track_new(resource)?;
    session.track_new(tag)?;
    let outcome = session.commit()?;
    info!(
        "event=cli_demo module=cli status=ok hook={:?}",
        outcome.hook
    );

    let repo = SqliteActivityRepository::new(&conn);
    let mut stream = Vec::new();
    for activity in repo.list_object_activities(package.id, None)? {
        let details = repo.list_activity_details(activity.id)?;
        stream.push(json!({ "activity": activity, "details": details }));
    }
    println!("{}", serde_json::to_string_pretty(&stream)?);
    Ok(())
}
