#![forbid(unsafe_code)]

use crate::store::StoreError;
use pc_core::{EntityId, UserId};
use rusqlite::{Connection, OptionalExtension, Row, params};

#[derive(Clone, Debug, PartialEq)]
pub(crate) struct ContentRow {
    pub id: EntityId,
    pub normalized_url: String,
    pub title: Option<String>,
}

impl ContentRow {
    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: EntityId::new(row.get(0)?),
            normalized_url: row.get(1)?,
            title: row.get(2)?,
        })
    }
}

const CONTENT_COLUMNS: &str = "id, normalized_url, title";

pub(crate) fn find_live_content(
    conn: &Connection,
    user: &UserId,
    normalized_url: &str,
) -> Result<Option<ContentRow>, StoreError> {
    Ok(conn
        .query_row(
            &format!(
                "SELECT {CONTENT_COLUMNS} FROM content_metadata \
                 WHERE user_id=?1 AND normalized_url=?2 AND deleted_when IS NULL"
            ),
            params![user.as_str(), normalized_url],
            ContentRow::from_row,
        )
        .optional()?)
}

pub(crate) fn content_by_id(
    conn: &Connection,
    user: &UserId,
    id: EntityId,
) -> Result<Option<ContentRow>, StoreError> {
    Ok(conn
        .query_row(
            &format!("SELECT {CONTENT_COLUMNS} FROM content_metadata WHERE user_id=?1 AND id=?2"),
            params![user.as_str(), id.get()],
            ContentRow::from_row,
        )
        .optional()?)
}

pub(crate) fn insert_content(
    conn: &Connection,
    user: &UserId,
    normalized_url: &str,
    title: Option<&str>,
    now: i64,
) -> Result<EntityId, StoreError> {
    conn.execute(
        "INSERT INTO content_metadata(user_id, normalized_url, title, created_when, updated_when) \
         VALUES (?1, ?2, ?3, ?4, ?4)",
        params![user.as_str(), normalized_url, title, now],
    )?;
    Ok(EntityId::new(conn.last_insert_rowid()))
}

pub(crate) fn update_content_title(
    conn: &Connection,
    id: EntityId,
    title: Option<&str>,
    now: i64,
) -> Result<(), StoreError> {
    conn.execute(
        "UPDATE content_metadata SET title=?2, updated_when=?3 WHERE id=?1",
        params![id.get(), title, now],
    )?;
    Ok(())
}

pub(crate) fn tombstone_content(
    conn: &Connection,
    id: EntityId,
    now: i64,
) -> Result<(), StoreError> {
    conn.execute(
        "UPDATE content_metadata SET deleted_when=?2, updated_when=?2 WHERE id=?1",
        params![id.get(), now],
    )?;
    Ok(())
}

#[derive(Clone, Debug, PartialEq)]
pub(crate) struct LocatorRow {
    pub id: EntityId,
    pub metadata_id: EntityId,
    pub location: String,
    pub original_location: String,
}

impl LocatorRow {
    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: EntityId::new(row.get(0)?),
            metadata_id: EntityId::new(row.get(1)?),
            location: row.get(2)?,
            original_location: row.get(3)?,
        })
    }
}

const LOCATOR_COLUMNS: &str = "id, metadata_id, location, original_location";

pub(crate) fn locator_by_id(
    conn: &Connection,
    user: &UserId,
    id: EntityId,
) -> Result<Option<LocatorRow>, StoreError> {
    Ok(conn
        .query_row(
            &format!("SELECT {LOCATOR_COLUMNS} FROM content_locators WHERE user_id=?1 AND id=?2"),
            params![user.as_str(), id.get()],
            LocatorRow::from_row,
        )
        .optional()?)
}

pub(crate) fn find_live_locator(
    conn: &Connection,
    metadata_id: EntityId,
    location: &str,
) -> Result<Option<LocatorRow>, StoreError> {
    Ok(conn
        .query_row(
            &format!(
                "SELECT {LOCATOR_COLUMNS} FROM content_locators \
                 WHERE metadata_id=?1 AND location=?2 AND deleted_when IS NULL \
                 ORDER BY id DESC LIMIT 1"
            ),
            params![metadata_id.get(), location],
            LocatorRow::from_row,
        )
        .optional()?)
}

pub(crate) fn live_locators(
    conn: &Connection,
    metadata_id: EntityId,
) -> Result<Vec<LocatorRow>, StoreError> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {LOCATOR_COLUMNS} FROM content_locators \
         WHERE metadata_id=?1 AND deleted_when IS NULL ORDER BY id ASC"
    ))?;
    let rows = stmt.query_map(params![metadata_id.get()], LocatorRow::from_row)?;
    Ok(rows.collect::<Result<Vec<_>, _>>()?)
}

/// The locator a page record is rebuilt from: newest live one, else newest tombstone.
pub(crate) fn current_locator(
    conn: &Connection,
    metadata_id: EntityId,
) -> Result<Option<LocatorRow>, StoreError> {
    Ok(conn
        .query_row(
            &format!(
                "SELECT {LOCATOR_COLUMNS} FROM content_locators WHERE metadata_id=?1 \
                 ORDER BY deleted_when IS NOT NULL, id DESC LIMIT 1"
            ),
            params![metadata_id.get()],
            LocatorRow::from_row,
        )
        .optional()?)
}

pub(crate) fn insert_locator(
    conn: &Connection,
    user: &UserId,
    metadata_id: EntityId,
    location: &str,
    original_location: &str,
    now: i64,
) -> Result<EntityId, StoreError> {
    conn.execute(
        "INSERT INTO content_locators(\
           user_id, metadata_id, location, original_location, location_type, created_when, \
           updated_when\
         ) VALUES (?1, ?2, ?3, ?4, 'remote', ?5, ?5)",
        params![user.as_str(), metadata_id.get(), location, original_location, now],
    )?;
    Ok(EntityId::new(conn.last_insert_rowid()))
}

pub(crate) fn update_locator_original(
    conn: &Connection,
    id: EntityId,
    original_location: &str,
    now: i64,
) -> Result<(), StoreError> {
    conn.execute(
        "UPDATE content_locators SET original_location=?2, updated_when=?3 WHERE id=?1",
        params![id.get(), original_location, now],
    )?;
    Ok(())
}

pub(crate) fn tombstone_locator(
    conn: &Connection,
    id: EntityId,
    now: i64,
) -> Result<(), StoreError> {
    conn.execute(
        "UPDATE content_locators SET deleted_when=?2, updated_when=?2 WHERE id=?1",
        params![id.get(), now],
    )?;
    Ok(())
}

#[derive(Clone, Debug, PartialEq)]
pub(crate) struct ReadRow {
    pub id: EntityId,
    pub metadata_id: EntityId,
    pub read_when: i64,
    pub read_duration: i64,
    pub scroll_perc: Option<f64>,
    pub scroll_max_perc: Option<f64>,
}

impl ReadRow {
    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: EntityId::new(row.get(0)?),
            metadata_id: EntityId::new(row.get(1)?),
            read_when: row.get(2)?,
            read_duration: row.get(3)?,
            scroll_perc: row.get(4)?,
            scroll_max_perc: row.get(5)?,
        })
    }

    pub fn progress(&self) -> ReadProgress {
        ReadProgress {
            duration: self.read_duration,
            scroll_perc: self.scroll_perc,
            scroll_max_perc: self.scroll_max_perc,
        }
    }
}

const READ_COLUMNS: &str =
    "id, metadata_id, read_when, read_duration, scroll_perc, scroll_max_perc";

/// Fields of a read that a visit update may change.
#[derive(Clone, Copy, Debug, PartialEq)]
pub(crate) struct ReadProgress {
    pub duration: i64,
    pub scroll_perc: Option<f64>,
    pub scroll_max_perc: Option<f64>,
}

pub(crate) fn read_by_id(
    conn: &Connection,
    user: &UserId,
    id: EntityId,
) -> Result<Option<ReadRow>, StoreError> {
    Ok(conn
        .query_row(
            &format!("SELECT {READ_COLUMNS} FROM content_reads WHERE user_id=?1 AND id=?2"),
            params![user.as_str(), id.get()],
            ReadRow::from_row,
        )
        .optional()?)
}

pub(crate) fn find_live_read(
    conn: &Connection,
    metadata_id: EntityId,
    read_when: i64,
) -> Result<Option<ReadRow>, StoreError> {
    Ok(conn
        .query_row(
            &format!(
                "SELECT {READ_COLUMNS} FROM content_reads \
                 WHERE metadata_id=?1 AND read_when=?2 AND deleted_when IS NULL"
            ),
            params![metadata_id.get(), read_when],
            ReadRow::from_row,
        )
        .optional()?)
}

pub(crate) fn live_reads(
    conn: &Connection,
    metadata_id: EntityId,
) -> Result<Vec<ReadRow>, StoreError> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {READ_COLUMNS} FROM content_reads \
         WHERE metadata_id=?1 AND deleted_when IS NULL ORDER BY read_when ASC, id ASC"
    ))?;
    let rows = stmt.query_map(params![metadata_id.get()], ReadRow::from_row)?;
    Ok(rows.collect::<Result<Vec<_>, _>>()?)
}

pub(crate) fn insert_read(
    conn: &Connection,
    user: &UserId,
    metadata_id: EntityId,
    read_when: i64,
    progress: ReadProgress,
    now: i64,
) -> Result<EntityId, StoreError> {
    conn.execute(
        "INSERT INTO content_reads(\
           user_id, metadata_id, read_when, read_duration, scroll_perc, scroll_max_perc, \
           created_when, updated_when\
         ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?7)",
        params![
            user.as_str(),
            metadata_id.get(),
            read_when,
            progress.duration,
            progress.scroll_perc,
            progress.scroll_max_perc,
            now
        ],
    )?;
    Ok(EntityId::new(conn.last_insert_rowid()))
}

pub(crate) fn update_read(
    conn: &Connection,
    id: EntityId,
    progress: ReadProgress,
    now: i64,
) -> Result<(), StoreError> {
    conn.execute(
        "UPDATE content_reads \
         SET read_duration=?2, scroll_perc=?3, scroll_max_perc=?4, updated_when=?5 \
         WHERE id=?1",
        params![
            id.get(),
            progress.duration,
            progress.scroll_perc,
            progress.scroll_max_perc,
            now
        ],
    )?;
    Ok(())
}

pub(crate) fn tombstone_read(conn: &Connection, id: EntityId, now: i64) -> Result<(), StoreError> {
    conn.execute(
        "UPDATE content_reads SET deleted_when=?2, updated_when=?2 WHERE id=?1",
        params![id.get(), now],
    )?;
    Ok(())
}
