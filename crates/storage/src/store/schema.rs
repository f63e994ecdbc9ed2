#![forbid(unsafe_code)]

use super::StoreError;
use rusqlite::{Connection, OptionalExtension, params};
use std::collections::BTreeSet;

pub(crate) const STORE_SCHEMA_VERSION: i64 = 1;

const TABLES: [&str; 12] = [
    "schema_state",
    "change_sequences",
    "data_changes",
    "content_metadata",
    "content_locators",
    "content_reads",
    "annotations",
    "annotation_selectors",
    "tags",
    "tag_connections",
    "lists",
    "list_entries",
];

/// Refuses to open a database that was written by a different schema.
pub(crate) fn preflight_gate(conn: &Connection) -> Result<(), StoreError> {
    let mut stmt = conn.prepare(
        "SELECT name FROM sqlite_master WHERE type='table' AND name NOT LIKE 'sqlite_%'",
    )?;
    let mut rows = stmt.query([])?;
    let mut tables = BTreeSet::new();
    while let Some(row) = rows.next()? {
        tables.insert(row.get::<_, String>(0)?);
    }

    if tables.is_empty() {
        return Ok(());
    }

    let required: BTreeSet<&str> = TABLES.into_iter().collect();
    if tables
        .iter()
        .any(|table| !required.contains(table.as_str()))
    {
        return Err(StoreError::ResetRequired("unsupported tables detected"));
    }
    if required.iter().any(|table| !tables.contains(*table)) {
        return Err(StoreError::ResetRequired("required table is missing"));
    }

    let version = conn
        .query_row(
            "SELECT schema_version FROM schema_state WHERE singleton=1",
            [],
            |row| row.get::<_, i64>(0),
        )
        .optional()?;

    match version {
        Some(v) if v == STORE_SCHEMA_VERSION => Ok(()),
        Some(_) => Err(StoreError::ResetRequired("schema version mismatch")),
        None => Err(StoreError::ResetRequired("schema state row is missing")),
    }
}

pub(crate) fn install_schema(conn: &Connection, now_ms: i64) -> Result<(), StoreError> {
    conn.execute_batch(
        r#"
        CREATE TABLE IF NOT EXISTS schema_state (
          singleton INTEGER PRIMARY KEY CHECK(singleton = 1),
          schema_version INTEGER NOT NULL,
          created_at_ms INTEGER NOT NULL,
          updated_at_ms INTEGER NOT NULL
        );

        CREATE TABLE IF NOT EXISTS change_sequences (
          user_id TEXT PRIMARY KEY,
          last_log_id INTEGER NOT NULL,
          last_created_when INTEGER NOT NULL
        );

        CREATE TABLE IF NOT EXISTS data_changes (
          user_id TEXT NOT NULL,
          log_id INTEGER NOT NULL,
          created_when INTEGER NOT NULL,
          created_by_device TEXT NOT NULL,
          change_type TEXT NOT NULL CHECK(change_type IN ('create', 'modify', 'delete')),
          collection TEXT NOT NULL,
          object_id INTEGER NOT NULL,
          info_json TEXT,
          PRIMARY KEY(user_id, log_id)
        );

        CREATE INDEX IF NOT EXISTS idx_data_changes_user_time
          ON data_changes(user_id, created_when, log_id);

        CREATE TABLE IF NOT EXISTS content_metadata (
          id INTEGER PRIMARY KEY AUTOINCREMENT,
          user_id TEXT NOT NULL,
          normalized_url TEXT NOT NULL,
          title TEXT,
          created_when INTEGER NOT NULL,
          updated_when INTEGER NOT NULL,
          deleted_when INTEGER
        );

        CREATE UNIQUE INDEX IF NOT EXISTS idx_content_metadata_live_url
          ON content_metadata(user_id, normalized_url) WHERE deleted_when IS NULL;

        CREATE TABLE IF NOT EXISTS content_locators (
          id INTEGER PRIMARY KEY AUTOINCREMENT,
          user_id TEXT NOT NULL,
          metadata_id INTEGER NOT NULL,
          location TEXT NOT NULL,
          original_location TEXT NOT NULL,
          location_type TEXT NOT NULL,
          created_when INTEGER NOT NULL,
          updated_when INTEGER NOT NULL,
          deleted_when INTEGER,
          FOREIGN KEY(metadata_id) REFERENCES content_metadata(id) ON DELETE CASCADE
        );

        CREATE INDEX IF NOT EXISTS idx_content_locators_metadata
          ON content_locators(metadata_id);

        CREATE TABLE IF NOT EXISTS content_reads (
          id INTEGER PRIMARY KEY AUTOINCREMENT,
          user_id TEXT NOT NULL,
          metadata_id INTEGER NOT NULL,
          read_when INTEGER NOT NULL,
          read_duration INTEGER NOT NULL,
          scroll_perc REAL,
          scroll_max_perc REAL,
          created_when INTEGER NOT NULL,
          updated_when INTEGER NOT NULL,
          deleted_when INTEGER,
          FOREIGN KEY(metadata_id) REFERENCES content_metadata(id) ON DELETE CASCADE
        );

        CREATE UNIQUE INDEX IF NOT EXISTS idx_content_reads_live_key
          ON content_reads(metadata_id, read_when) WHERE deleted_when IS NULL;

        CREATE TABLE IF NOT EXISTS annotations (
          id INTEGER PRIMARY KEY AUTOINCREMENT,
          user_id TEXT NOT NULL,
          metadata_id INTEGER NOT NULL,
          local_id TEXT NOT NULL,
          url TEXT NOT NULL,
          body TEXT,
          comment TEXT,
          privacy_level TEXT NOT NULL CHECK(privacy_level IN ('private', 'protected', 'shared')),
          created_when INTEGER NOT NULL,
          updated_when INTEGER NOT NULL,
          deleted_when INTEGER,
          FOREIGN KEY(metadata_id) REFERENCES content_metadata(id) ON DELETE CASCADE
        );

        CREATE UNIQUE INDEX IF NOT EXISTS idx_annotations_live_key
          ON annotations(metadata_id, local_id) WHERE deleted_when IS NULL;
        CREATE UNIQUE INDEX IF NOT EXISTS idx_annotations_live_url
          ON annotations(user_id, url) WHERE deleted_when IS NULL;

        CREATE TABLE IF NOT EXISTS annotation_selectors (
          id INTEGER PRIMARY KEY AUTOINCREMENT,
          user_id TEXT NOT NULL,
          annotation_id INTEGER NOT NULL,
          selector_json TEXT NOT NULL,
          created_when INTEGER NOT NULL,
          updated_when INTEGER NOT NULL,
          deleted_when INTEGER,
          FOREIGN KEY(annotation_id) REFERENCES annotations(id) ON DELETE CASCADE
        );

        CREATE UNIQUE INDEX IF NOT EXISTS idx_annotation_selectors_live
          ON annotation_selectors(annotation_id) WHERE deleted_when IS NULL;

        CREATE TABLE IF NOT EXISTS tags (
          id INTEGER PRIMARY KEY AUTOINCREMENT,
          user_id TEXT NOT NULL,
          name TEXT NOT NULL,
          created_when INTEGER NOT NULL,
          updated_when INTEGER NOT NULL,
          UNIQUE(user_id, name)
        );

        CREATE TABLE IF NOT EXISTS tag_connections (
          id INTEGER PRIMARY KEY AUTOINCREMENT,
          user_id TEXT NOT NULL,
          tag_id INTEGER NOT NULL,
          collection TEXT NOT NULL
            CHECK(collection IN ('personalContentMetadata', 'personalAnnotation')),
          object_id INTEGER NOT NULL,
          created_when INTEGER NOT NULL,
          deleted_when INTEGER,
          FOREIGN KEY(tag_id) REFERENCES tags(id) ON DELETE CASCADE
        );

        CREATE UNIQUE INDEX IF NOT EXISTS idx_tag_connections_live
          ON tag_connections(tag_id, collection, object_id) WHERE deleted_when IS NULL;

        CREATE INDEX IF NOT EXISTS idx_tag_connections_target
          ON tag_connections(user_id, collection, object_id);

        CREATE TABLE IF NOT EXISTS lists (
          id INTEGER PRIMARY KEY AUTOINCREMENT,
          user_id TEXT NOT NULL,
          local_id INTEGER NOT NULL,
          name TEXT NOT NULL,
          created_when INTEGER NOT NULL,
          updated_when INTEGER NOT NULL,
          deleted_when INTEGER
        );

        CREATE UNIQUE INDEX IF NOT EXISTS idx_lists_live_key
          ON lists(user_id, local_id) WHERE deleted_when IS NULL;

        CREATE TABLE IF NOT EXISTS list_entries (
          id INTEGER PRIMARY KEY AUTOINCREMENT,
          user_id TEXT NOT NULL,
          list_id INTEGER NOT NULL,
          metadata_id INTEGER NOT NULL,
          full_url TEXT NOT NULL,
          created_when INTEGER NOT NULL,
          deleted_when INTEGER,
          FOREIGN KEY(list_id) REFERENCES lists(id) ON DELETE CASCADE,
          FOREIGN KEY(metadata_id) REFERENCES content_metadata(id) ON DELETE CASCADE
        );

        CREATE UNIQUE INDEX IF NOT EXISTS idx_list_entries_live_key
          ON list_entries(list_id, metadata_id) WHERE deleted_when IS NULL;

        CREATE INDEX IF NOT EXISTS idx_list_entries_metadata
          ON list_entries(metadata_id);
        "#,
    )?;

    conn.execute(
        "INSERT INTO schema_state(singleton, schema_version, created_at_ms, updated_at_ms) \
         VALUES (1, ?1, ?2, ?2) \
         ON CONFLICT(singleton) DO UPDATE SET updated_at_ms=excluded.updated_at_ms",
        params![STORE_SCHEMA_VERSION, now_ms],
    )?;

    Ok(())
}
