#![forbid(unsafe_code)]

use crate::store::{StoreError, is_constraint_violation};
use pc_core::{Collection, EntityId, TagTarget, UserId};
use rusqlite::{Connection, OptionalExtension, Row, params};

#[derive(Clone, Debug, PartialEq, Eq)]
pub(crate) struct TagRow {
    pub id: EntityId,
    pub name: String,
}

pub(crate) fn find_tag(
    conn: &Connection,
    user: &UserId,
    name: &str,
) -> Result<Option<TagRow>, StoreError> {
    Ok(conn
        .query_row(
            "SELECT id, name FROM tags WHERE user_id=?1 AND name=?2",
            params![user.as_str(), name],
            |row| {
                Ok(TagRow {
                    id: EntityId::new(row.get(0)?),
                    name: row.get(1)?,
                })
            },
        )
        .optional()?)
}

pub(crate) fn tag_by_id(
    conn: &Connection,
    user: &UserId,
    id: EntityId,
) -> Result<Option<TagRow>, StoreError> {
    Ok(conn
        .query_row(
            "SELECT id, name FROM tags WHERE user_id=?1 AND id=?2",
            params![user.as_str(), id.get()],
            |row| {
                Ok(TagRow {
                    id: EntityId::new(row.get(0)?),
                    name: row.get(1)?,
                })
            },
        )
        .optional()?)
}

/// Inserts a tag. `None` means another row already holds the name.
pub(crate) fn insert_tag(
    conn: &Connection,
    user: &UserId,
    name: &str,
    now: i64,
) -> Result<Option<EntityId>, StoreError> {
    match conn.execute(
        "INSERT INTO tags(user_id, name, created_when, updated_when) VALUES (?1, ?2, ?3, ?3)",
        params![user.as_str(), name, now],
    ) {
        Ok(_) => Ok(Some(EntityId::new(conn.last_insert_rowid()))),
        Err(err) if is_constraint_violation(&err) => Ok(None),
        Err(err) => Err(err.into()),
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub(crate) struct ConnectionRow {
    pub id: EntityId,
    pub tag_id: EntityId,
    pub target: TagTarget,
}

impl ConnectionRow {
    fn from_row(row: &Row<'_>) -> rusqlite::Result<(i64, i64, String, i64)> {
        Ok((row.get(0)?, row.get(1)?, row.get(2)?, row.get(3)?))
    }

    fn decode(
        (id, tag_id, collection, object_id): (i64, i64, String, i64),
    ) -> Result<Self, StoreError> {
        let target = Collection::parse(&collection)
            .and_then(|collection| TagTarget::from_parts(collection, EntityId::new(object_id)))
            .ok_or(StoreError::InvalidInput("corrupt tag connection target"))?;
        Ok(Self {
            id: EntityId::new(id),
            tag_id: EntityId::new(tag_id),
            target,
        })
    }
}

const CONNECTION_COLUMNS: &str = "id, tag_id, collection, object_id";

pub(crate) fn connection_by_id(
    conn: &Connection,
    user: &UserId,
    id: EntityId,
) -> Result<Option<ConnectionRow>, StoreError> {
    conn.query_row(
        &format!("SELECT {CONNECTION_COLUMNS} FROM tag_connections WHERE user_id=?1 AND id=?2"),
        params![user.as_str(), id.get()],
        ConnectionRow::from_row,
    )
    .optional()?
    .map(ConnectionRow::decode)
    .transpose()
}

pub(crate) fn find_live_connection(
    conn: &Connection,
    tag_id: EntityId,
    target: TagTarget,
) -> Result<Option<ConnectionRow>, StoreError> {
    conn.query_row(
        &format!(
            "SELECT {CONNECTION_COLUMNS} FROM tag_connections \
             WHERE tag_id=?1 AND collection=?2 AND object_id=?3 AND deleted_when IS NULL"
        ),
        params![tag_id.get(), target.collection().as_str(), target.id().get()],
        ConnectionRow::from_row,
    )
    .optional()?
    .map(ConnectionRow::decode)
    .transpose()
}

pub(crate) fn live_connections_for_target(
    conn: &Connection,
    user: &UserId,
    target: TagTarget,
) -> Result<Vec<ConnectionRow>, StoreError> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {CONNECTION_COLUMNS} FROM tag_connections \
         WHERE user_id=?1 AND collection=?2 AND object_id=?3 AND deleted_when IS NULL \
         ORDER BY id ASC"
    ))?;
    let raw = stmt
        .query_map(
            params![user.as_str(), target.collection().as_str(), target.id().get()],
            ConnectionRow::from_row,
        )?
        .collect::<Result<Vec<_>, _>>()?;
    raw.into_iter().map(ConnectionRow::decode).collect()
}

pub(crate) fn insert_connection(
    conn: &Connection,
    user: &UserId,
    tag_id: EntityId,
    target: TagTarget,
    now: i64,
) -> Result<EntityId, StoreError> {
    conn.execute(
        "INSERT INTO tag_connections(user_id, tag_id, collection, object_id, created_when) \
         VALUES (?1, ?2, ?3, ?4, ?5)",
        params![
            user.as_str(),
            tag_id.get(),
            target.collection().as_str(),
            target.id().get(),
            now
        ],
    )?;
    Ok(EntityId::new(conn.last_insert_rowid()))
}

pub(crate) fn tombstone_connection(
    conn: &Connection,
    id: EntityId,
    now: i64,
) -> Result<(), StoreError> {
    conn.execute(
        "UPDATE tag_connections SET deleted_when=?2 WHERE id=?1",
        params![id.get(), now],
    )?;
    Ok(())
}
