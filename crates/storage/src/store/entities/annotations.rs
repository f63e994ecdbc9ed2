#![forbid(unsafe_code)]

use crate::store::StoreError;
use pc_core::{EntityId, PrivacyLevel, UserId};
use rusqlite::{Connection, OptionalExtension, Row, params};
use serde_json::Value;

#[derive(Clone, Debug, PartialEq)]
pub(crate) struct AnnotationRow {
    pub id: EntityId,
    pub metadata_id: EntityId,
    pub local_id: String,
    pub fields: AnnotationFields,
    pub deleted_when: Option<i64>,
}

impl AnnotationRow {
    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        let privacy: String = row.get(5)?;
        Ok(Self {
            id: EntityId::new(row.get(0)?),
            metadata_id: EntityId::new(row.get(1)?),
            local_id: row.get(2)?,
            fields: AnnotationFields {
                body: row.get(3)?,
                comment: row.get(4)?,
                privacy_level: PrivacyLevel::parse(&privacy).unwrap_or_default(),
                created_when: row.get(6)?,
                last_edited: row.get(7)?,
            },
            deleted_when: row.get(8)?,
        })
    }

    pub fn is_live(&self) -> bool {
        self.deleted_when.is_none()
    }
}

/// Annotation fields owned by the annotation row itself.
#[derive(Clone, Debug, PartialEq, Eq)]
pub(crate) struct AnnotationFields {
    pub body: Option<String>,
    pub comment: Option<String>,
    pub privacy_level: PrivacyLevel,
    pub created_when: i64,
    pub last_edited: i64,
}

const ANNOTATION_COLUMNS: &str = "a.id, a.metadata_id, a.local_id, a.body, a.comment, \
     a.privacy_level, a.created_when, a.updated_when, a.deleted_when";

pub(crate) fn annotation_by_id(
    conn: &Connection,
    user: &UserId,
    id: EntityId,
) -> Result<Option<AnnotationRow>, StoreError> {
    Ok(conn
        .query_row(
            &format!(
                "SELECT {ANNOTATION_COLUMNS} FROM annotations a WHERE a.user_id=?1 AND a.id=?2"
            ),
            params![user.as_str(), id.get()],
            AnnotationRow::from_row,
        )
        .optional()?)
}

/// Live annotation whose full url (page location followed by its local id) is `url`.
pub(crate) fn find_live_annotation_by_url(
    conn: &Connection,
    user: &UserId,
    url: &str,
) -> Result<Option<AnnotationRow>, StoreError> {
    Ok(conn
        .query_row(
            &format!(
                "SELECT {ANNOTATION_COLUMNS} FROM annotations a \
                 WHERE a.user_id=?1 AND a.url=?2 AND a.deleted_when IS NULL"
            ),
            params![user.as_str(), url],
            AnnotationRow::from_row,
        )
        .optional()?)
}

pub(crate) fn find_live_annotation(
    conn: &Connection,
    metadata_id: EntityId,
    local_id: &str,
) -> Result<Option<AnnotationRow>, StoreError> {
    Ok(conn
        .query_row(
            &format!(
                "SELECT {ANNOTATION_COLUMNS} FROM annotations a \
                 WHERE a.metadata_id=?1 AND a.local_id=?2 AND a.deleted_when IS NULL"
            ),
            params![metadata_id.get(), local_id],
            AnnotationRow::from_row,
        )
        .optional()?)
}

pub(crate) fn live_annotations(
    conn: &Connection,
    metadata_id: EntityId,
) -> Result<Vec<AnnotationRow>, StoreError> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {ANNOTATION_COLUMNS} FROM annotations a \
         WHERE a.metadata_id=?1 AND a.deleted_when IS NULL ORDER BY a.id ASC"
    ))?;
    let rows = stmt.query_map(params![metadata_id.get()], AnnotationRow::from_row)?;
    Ok(rows.collect::<Result<Vec<_>, _>>()?)
}

pub(crate) fn insert_annotation(
    conn: &Connection,
    user: &UserId,
    metadata_id: EntityId,
    local_id: &str,
    url: &str,
    fields: &AnnotationFields,
) -> Result<EntityId, StoreError> {
    conn.execute(
        "INSERT INTO annotations(\
           user_id, metadata_id, local_id, url, body, comment, privacy_level, created_when, \
           updated_when\
         ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
        params![
            user.as_str(),
            metadata_id.get(),
            local_id,
            url,
            fields.body,
            fields.comment,
            fields.privacy_level.as_str(),
            fields.created_when,
            fields.last_edited
        ],
    )?;
    Ok(EntityId::new(conn.last_insert_rowid()))
}

pub(crate) fn update_annotation(
    conn: &Connection,
    id: EntityId,
    fields: &AnnotationFields,
) -> Result<(), StoreError> {
    conn.execute(
        "UPDATE annotations \
         SET body=?2, comment=?3, privacy_level=?4, created_when=?5, updated_when=?6 \
         WHERE id=?1",
        params![
            id.get(),
            fields.body,
            fields.comment,
            fields.privacy_level.as_str(),
            fields.created_when,
            fields.last_edited
        ],
    )?;
    Ok(())
}

pub(crate) fn tombstone_annotation(
    conn: &Connection,
    id: EntityId,
    now: i64,
) -> Result<(), StoreError> {
    conn.execute(
        "UPDATE annotations SET deleted_when=?2 WHERE id=?1",
        params![id.get(), now],
    )?;
    Ok(())
}

#[derive(Clone, Debug, PartialEq)]
pub(crate) struct SelectorRow {
    pub id: EntityId,
    pub annotation_id: EntityId,
    pub selector: Value,
}

impl SelectorRow {
    fn from_row(row: &Row<'_>) -> rusqlite::Result<(EntityId, EntityId, String)> {
        Ok((
            EntityId::new(row.get(0)?),
            EntityId::new(row.get(1)?),
            row.get(2)?,
        ))
    }

    fn decode((id, annotation_id, raw): (EntityId, EntityId, String)) -> Result<Self, StoreError> {
        Ok(Self {
            id,
            annotation_id,
            selector: serde_json::from_str(&raw)?,
        })
    }
}

pub(crate) fn selector_by_id(
    conn: &Connection,
    user: &UserId,
    id: EntityId,
) -> Result<Option<SelectorRow>, StoreError> {
    conn.query_row(
        "SELECT id, annotation_id, selector_json FROM annotation_selectors \
         WHERE user_id=?1 AND id=?2",
        params![user.as_str(), id.get()],
        SelectorRow::from_row,
    )
    .optional()?
    .map(SelectorRow::decode)
    .transpose()
}

pub(crate) fn live_selector(
    conn: &Connection,
    annotation_id: EntityId,
) -> Result<Option<SelectorRow>, StoreError> {
    conn.query_row(
        "SELECT id, annotation_id, selector_json FROM annotation_selectors \
         WHERE annotation_id=?1 AND deleted_when IS NULL",
        params![annotation_id.get()],
        SelectorRow::from_row,
    )
    .optional()?
    .map(SelectorRow::decode)
    .transpose()
}

/// Newest selector regardless of tombstones, for rebuilding a deleted annotation.
pub(crate) fn last_selector(
    conn: &Connection,
    annotation_id: EntityId,
) -> Result<Option<SelectorRow>, StoreError> {
    conn.query_row(
        "SELECT id, annotation_id, selector_json FROM annotation_selectors \
         WHERE annotation_id=?1 ORDER BY id DESC LIMIT 1",
        params![annotation_id.get()],
        SelectorRow::from_row,
    )
    .optional()?
    .map(SelectorRow::decode)
    .transpose()
}

pub(crate) fn insert_selector(
    conn: &Connection,
    user: &UserId,
    annotation_id: EntityId,
    selector: &Value,
    now: i64,
) -> Result<EntityId, StoreError> {
    conn.execute(
        "INSERT INTO annotation_selectors(\
           user_id, annotation_id, selector_json, created_when, updated_when\
         ) VALUES (?1, ?2, ?3, ?4, ?4)",
        params![
            user.as_str(),
            annotation_id.get(),
            serde_json::to_string(selector)?,
            now
        ],
    )?;
    Ok(EntityId::new(conn.last_insert_rowid()))
}

pub(crate) fn update_selector(
    conn: &Connection,
    id: EntityId,
    selector: &Value,
    now: i64,
) -> Result<(), StoreError> {
    conn.execute(
        "UPDATE annotation_selectors SET selector_json=?2, updated_when=?3 WHERE id=?1",
        params![id.get(), serde_json::to_string(selector)?, now],
    )?;
    Ok(())
}

pub(crate) fn tombstone_selector(
    conn: &Connection,
    id: EntityId,
    now: i64,
) -> Result<(), StoreError> {
    conn.execute(
        "UPDATE annotation_selectors SET deleted_when=?2, updated_when=?2 WHERE id=?1",
        params![id.get(), now],
    )?;
    Ok(())
}
