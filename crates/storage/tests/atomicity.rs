#![forbid(unsafe_code)]

mod common;

use common::{Fixture, page, tag, visit};
use pc_core::{Collection, LocalMutation};
use pc_storage::{SqliteStore, StoreConfig, StoreError};
use rusqlite::{Connection, params};
use tracing_test::traced_test;

fn count(fx: &Fixture, table: &str) -> i64 {
    let conn = Connection::open(fx.path().join("personal_cloud.db")).expect("open raw db");
    conn.query_row(&format!("SELECT COUNT(*) FROM {table}"), [], |row| row.get(0))
        .expect("count rows")
}

#[test]
fn missing_parent_leaves_no_trace() {
    let mut fx = Fixture::new();
    fx.translate(LocalMutation::create("pages", page("example.com/a")));
    let before = fx.log();

    let err = fx
        .try_translate(LocalMutation::create("tags", tag("example.com/b", "new-tag")))
        .expect_err("target is missing");
    assert!(matches!(err, StoreError::MissingParent { .. }));

    assert_eq!(fx.log(), before);
    assert_eq!(count(&fx, "tags"), 0);
    assert_eq!(count(&fx, "tag_connections"), 0);

    // The failed mutation did not consume a log id.
    let next = fx.translate(LocalMutation::create("visits", visit("example.com/a", 1, 1)));
    assert_eq!(next[0].log_id, before.len() as i64 + 1);
}

#[traced_test]
#[test]
fn batch_translation_skips_what_it_cannot_translate() {
    let mut fx = Fixture::new();
    let mutations = vec![
        LocalMutation::create("pages", page("example.com/a")),
        LocalMutation::create("bookmarks", page("example.com/a")),
        LocalMutation::create("visits", visit("example.com/missing", 1, 1)),
        LocalMutation::create("visits", visit("example.com/a", 2, 1)),
    ];
    let user = fx.user.clone();
    let device = fx.device.clone();
    let report = fx
        .store
        .translate_batch(&user, &device, &mutations)
        .expect("batch translation");

    assert_eq!(report.translated.len(), 3);
    assert_eq!(report.translated, fx.log());
    let rejected: Vec<usize> = report.rejected.iter().map(|r| r.index).collect();
    assert_eq!(rejected, vec![1, 2]);
    match &report.rejected[0].error {
        StoreError::UnknownCollection(name) => assert_eq!(name, "bookmarks"),
        other => panic!("unexpected error: {other:?}"),
    }
    match &report.rejected[1].error {
        StoreError::MissingParent { collection, .. } => {
            assert_eq!(*collection, Collection::ContentMetadata)
        }
        other => panic!("unexpected error: {other:?}"),
    }
    assert!(logs_contain("skipping local mutation"));
    assert!(logs_contain("bookmarks"));
}

#[test]
fn reopening_a_foreign_schema_requires_reset() {
    let fx = Fixture::new();
    let db = fx.path().join("personal_cloud.db");
    {
        let conn = Connection::open(&db).expect("open raw db");
        conn.execute(
            "UPDATE schema_state SET schema_version=?1 WHERE singleton=1",
            params![99],
        )
        .expect("tamper version");
    }
    let err = SqliteStore::open(fx.path()).expect_err("version mismatch");
    match err {
        StoreError::ResetRequired(msg) => assert_eq!(msg, "schema version mismatch"),
        other => panic!("unexpected error: {other:?}"),
    }

    let other = tempfile::tempdir().expect("temp dir");
    {
        let conn = Connection::open(other.path().join("personal_cloud.db")).expect("open raw db");
        conn.execute_batch("CREATE TABLE branches(id TEXT PRIMARY KEY);")
            .expect("foreign table");
    }
    let err = SqliteStore::open(other.path()).expect_err("foreign tables");
    assert!(matches!(err, StoreError::ResetRequired(_)));
}

#[test]
fn config_controls_file_name_and_download_limit() {
    let dir = tempfile::tempdir().expect("temp dir");
    let config = StoreConfig::from_toml_str(
        r#"
        db_file_name = "cloud.sqlite"
        download_limit = 2
        "#,
    )
    .expect("parse config")
    .with_storage_dir(dir.path());

    let mut store = SqliteStore::open_with_config(config).expect("open store");
    assert!(dir.path().join("cloud.sqlite").exists());
    assert_eq!(store.storage_dir(), dir.path());

    let user = pc_core::UserId::try_new("u1").expect("user id");
    let device = pc_core::DeviceId::try_new("d1").expect("device id");
    store
        .translate(&user, &device, &LocalMutation::create("pages", page("example.com/a")))
        .expect("translate");
    store
        .translate(&user, &device, &LocalMutation::create("visits", visit("example.com/a", 1, 1)))
        .expect("translate");

    let batch = store
        .download_client_updates(&pc_storage::DownloadRequest::new(
            user,
            0,
            pc_storage::CLIENT_SCHEMA_V25,
        ))
        .expect("download");
    assert!(batch.maybe_has_more);
    assert_eq!(batch.checkpoint.map(|checkpoint| checkpoint.log_id), Some(2));
}
