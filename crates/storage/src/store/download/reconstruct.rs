#![forbid(unsafe_code)]

//! Rebuilds device records from the normalized tables. Tombstoned rows are used as-is so a
//! record deleted later in the log still has its last state.

use super::schema::ClientSchema;
use crate::store::entities::{annotations, content, lists, tags};
use crate::store::{StoreError, resolver};
use pc_core::local::annotation_url;
use pc_core::{
    AnnotationRecord, CustomListRecord, EntityId, PageListEntryRecord, PageRecord, TagRecord,
    UserId, VisitRecord,
};
use rusqlite::Connection;
use serde_json::Value;

pub(super) fn page(
    conn: &Connection,
    user: &UserId,
    id: EntityId,
) -> Result<Option<Value>, StoreError> {
    let Some(page) = content::content_by_id(conn, user, id)? else {
        return Ok(None);
    };
    let full_url = content::current_locator(conn, page.id)?
        .map(|locator| locator.original_location)
        .unwrap_or_else(|| page.normalized_url.clone());
    let record = PageRecord {
        url: page.normalized_url,
        full_url,
        full_title: page.title,
    };
    Ok(Some(serde_json::to_value(record)?))
}

pub(super) fn visit(
    conn: &Connection,
    user: &UserId,
    id: EntityId,
) -> Result<Option<Value>, StoreError> {
    let Some(read) = content::read_by_id(conn, user, id)? else {
        return Ok(None);
    };
    let Some(page) = content::content_by_id(conn, user, read.metadata_id)? else {
        return Ok(None);
    };
    let record = VisitRecord {
        url: page.normalized_url,
        time: read.read_when,
        duration: read.read_duration,
        scroll_perc: read.scroll_perc,
        scroll_max_perc: read.scroll_max_perc,
    };
    Ok(Some(serde_json::to_value(record)?))
}

pub(super) fn annotation(
    conn: &Connection,
    user: &UserId,
    id: EntityId,
    schema: &dyn ClientSchema,
) -> Result<Option<Value>, StoreError> {
    let Some(annotation) = annotations::annotation_by_id(conn, user, id)? else {
        return Ok(None);
    };
    let Some(page) = content::content_by_id(conn, user, annotation.metadata_id)? else {
        return Ok(None);
    };
    let selector = if annotation.is_live() {
        annotations::live_selector(conn, annotation.id)?
    } else {
        annotations::last_selector(conn, annotation.id)?
    };

    let fields = annotation.fields;
    let mut record = AnnotationRecord {
        url: annotation_url(&page.normalized_url, &annotation.local_id),
        page_url: page.normalized_url,
        page_title: page.title,
        body: fields.body,
        comment: fields.comment,
        selector: selector.map(|selector| selector.selector),
        created_when: fields.created_when,
        last_edited: fields.last_edited,
        privacy_level: Some(fields.privacy_level),
    };
    schema.shape_annotation(&mut record);
    Ok(Some(serde_json::to_value(record)?))
}

pub(super) fn tag(
    conn: &Connection,
    user: &UserId,
    id: EntityId,
) -> Result<Option<Value>, StoreError> {
    let Some(connection) = tags::connection_by_id(conn, user, id)? else {
        return Ok(None);
    };
    let Some(tag) = tags::tag_by_id(conn, user, connection.tag_id)? else {
        return Ok(None);
    };
    let Some(url) = resolver::tag_target_url(conn, user, connection.target)? else {
        return Ok(None);
    };
    Ok(Some(serde_json::to_value(TagRecord { url, name: tag.name })?))
}

pub(super) fn list(
    conn: &Connection,
    user: &UserId,
    id: EntityId,
) -> Result<Option<Value>, StoreError> {
    let Some(list) = lists::list_by_id(conn, user, id)? else {
        return Ok(None);
    };
    let record = CustomListRecord {
        id: list.local_id,
        name: list.name,
        created_at: list.created_when,
    };
    Ok(Some(serde_json::to_value(record)?))
}

pub(super) fn list_entry(
    conn: &Connection,
    user: &UserId,
    id: EntityId,
) -> Result<Option<Value>, StoreError> {
    let Some(entry) = lists::entry_by_id(conn, user, id)? else {
        return Ok(None);
    };
    let Some(list) = lists::list_by_id(conn, user, entry.list_id)? else {
        return Ok(None);
    };
    let Some(page) = content::content_by_id(conn, user, entry.metadata_id)? else {
        return Ok(None);
    };
    let record = PageListEntryRecord {
        list_id: list.local_id,
        page_url: page.normalized_url,
        full_url: entry.full_url,
        created_at: entry.created_when,
    };
    Ok(Some(serde_json::to_value(record)?))
}
