#![forbid(unsafe_code)]

use crate::store::StoreError;
use pc_core::{EntityId, UserId};
use rusqlite::{Connection, OptionalExtension, Row, params};

#[derive(Clone, Debug, PartialEq, Eq)]
pub(crate) struct ListRow {
    pub id: EntityId,
    /// Client-generated list id shared by every device.
    pub local_id: i64,
    pub name: String,
    pub created_when: i64,
}

impl ListRow {
    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: EntityId::new(row.get(0)?),
            local_id: row.get(1)?,
            name: row.get(2)?,
            created_when: row.get(3)?,
        })
    }
}

const LIST_COLUMNS: &str = "id, local_id, name, created_when";

pub(crate) fn list_by_id(
    conn: &Connection,
    user: &UserId,
    id: EntityId,
) -> Result<Option<ListRow>, StoreError> {
    Ok(conn
        .query_row(
            &format!("SELECT {LIST_COLUMNS} FROM lists WHERE user_id=?1 AND id=?2"),
            params![user.as_str(), id.get()],
            ListRow::from_row,
        )
        .optional()?)
}

pub(crate) fn find_live_list(
    conn: &Connection,
    user: &UserId,
    local_id: i64,
) -> Result<Option<ListRow>, StoreError> {
    Ok(conn
        .query_row(
            &format!(
                "SELECT {LIST_COLUMNS} FROM lists \
                 WHERE user_id=?1 AND local_id=?2 AND deleted_when IS NULL"
            ),
            params![user.as_str(), local_id],
            ListRow::from_row,
        )
        .optional()?)
}

pub(crate) fn insert_list(
    conn: &Connection,
    user: &UserId,
    local_id: i64,
    name: &str,
    created_at: i64,
    now: i64,
) -> Result<EntityId, StoreError> {
    conn.execute(
        "INSERT INTO lists(user_id, local_id, name, created_when, updated_when) \
         VALUES (?1, ?2, ?3, ?4, ?5)",
        params![user.as_str(), local_id, name, created_at, now],
    )?;
    Ok(EntityId::new(conn.last_insert_rowid()))
}

pub(crate) fn rename_list(
    conn: &Connection,
    id: EntityId,
    name: &str,
    now: i64,
) -> Result<(), StoreError> {
    conn.execute(
        "UPDATE lists SET name=?2, updated_when=?3 WHERE id=?1",
        params![id.get(), name, now],
    )?;
    Ok(())
}

pub(crate) fn tombstone_list(conn: &Connection, id: EntityId, now: i64) -> Result<(), StoreError> {
    conn.execute(
        "UPDATE lists SET deleted_when=?2, updated_when=?2 WHERE id=?1",
        params![id.get(), now],
    )?;
    Ok(())
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub(crate) struct EntryRow {
    pub id: EntityId,
    pub list_id: EntityId,
    pub metadata_id: EntityId,
    pub full_url: String,
    pub created_when: i64,
}

impl EntryRow {
    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: EntityId::new(row.get(0)?),
            list_id: EntityId::new(row.get(1)?),
            metadata_id: EntityId::new(row.get(2)?),
            full_url: row.get(3)?,
            created_when: row.get(4)?,
        })
    }
}

const ENTRY_COLUMNS: &str = "id, list_id, metadata_id, full_url, created_when";

pub(crate) fn entry_by_id(
    conn: &Connection,
    user: &UserId,
    id: EntityId,
) -> Result<Option<EntryRow>, StoreError> {
    Ok(conn
        .query_row(
            &format!("SELECT {ENTRY_COLUMNS} FROM list_entries WHERE user_id=?1 AND id=?2"),
            params![user.as_str(), id.get()],
            EntryRow::from_row,
        )
        .optional()?)
}

pub(crate) fn find_live_entry(
    conn: &Connection,
    list_id: EntityId,
    metadata_id: EntityId,
) -> Result<Option<EntryRow>, StoreError> {
    Ok(conn
        .query_row(
            &format!(
                "SELECT {ENTRY_COLUMNS} FROM list_entries \
                 WHERE list_id=?1 AND metadata_id=?2 AND deleted_when IS NULL"
            ),
            params![list_id.get(), metadata_id.get()],
            EntryRow::from_row,
        )
        .optional()?)
}

pub(crate) fn live_entries_for_list(
    conn: &Connection,
    list_id: EntityId,
) -> Result<Vec<EntryRow>, StoreError> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {ENTRY_COLUMNS} FROM list_entries \
         WHERE list_id=?1 AND deleted_when IS NULL ORDER BY id ASC"
    ))?;
    let rows = stmt.query_map(params![list_id.get()], EntryRow::from_row)?;
    Ok(rows.collect::<Result<Vec<_>, _>>()?)
}

pub(crate) fn live_entries_for_content(
    conn: &Connection,
    metadata_id: EntityId,
) -> Result<Vec<EntryRow>, StoreError> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {ENTRY_COLUMNS} FROM list_entries \
         WHERE metadata_id=?1 AND deleted_when IS NULL ORDER BY id ASC"
    ))?;
    let rows = stmt.query_map(params![metadata_id.get()], EntryRow::from_row)?;
    Ok(rows.collect::<Result<Vec<_>, _>>()?)
}

pub(crate) fn insert_entry(
    conn: &Connection,
    user: &UserId,
    list_id: EntityId,
    metadata_id: EntityId,
    full_url: &str,
    created_at: i64,
) -> Result<EntityId, StoreError> {
    conn.execute(
        "INSERT INTO list_entries(user_id, list_id, metadata_id, full_url, created_when) \
         VALUES (?1, ?2, ?3, ?4, ?5)",
        params![user.as_str(), list_id.get(), metadata_id.get(), full_url, created_at],
    )?;
    Ok(EntityId::new(conn.last_insert_rowid()))
}

pub(crate) fn tombstone_entry(conn: &Connection, id: EntityId, now: i64) -> Result<(), StoreError> {
    conn.execute(
        "UPDATE list_entries SET deleted_when=?2 WHERE id=?1",
        params![id.get(), now],
    )?;
    Ok(())
}
