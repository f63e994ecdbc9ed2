#![forbid(unsafe_code)]

//! Natural key <-> entity id.
//!
//! The write path only matches live rows and never trusts a numeric id sent by a device.
//! The read path also answers for tombstoned rows so that deletes can still be described.

use super::entities::{annotations, content, lists, tags};
use super::{SqliteStore, StoreError};
use pc_core::{Collection, EntityId, NaturalKey, TagTarget, UserId, local::annotation_url};
use rusqlite::Connection;

impl SqliteStore {
    /// Live entity identified by `key`.
    pub fn resolve(&self, user: &UserId, key: &NaturalKey) -> Result<EntityId, StoreError> {
        resolve_key(&self.conn, user, key)
    }

    /// Natural key of any entity ever written for `user`, tombstones included.
    pub fn natural_key(
        &self,
        user: &UserId,
        collection: Collection,
        id: EntityId,
    ) -> Result<NaturalKey, StoreError> {
        natural_key_of(&self.conn, user, collection, id)?
            .ok_or(StoreError::InvalidInput("unknown entity"))
    }
}

pub(crate) fn resolve_content(
    conn: &Connection,
    user: &UserId,
    normalized_url: &str,
) -> Result<content::ContentRow, StoreError> {
    content::find_live_content(conn, user, normalized_url)?
        .ok_or_else(|| StoreError::missing_parent(Collection::ContentMetadata, normalized_url))
}

pub(crate) fn resolve_annotation(
    conn: &Connection,
    user: &UserId,
    url: &str,
) -> Result<annotations::AnnotationRow, StoreError> {
    annotations::find_live_annotation_by_url(conn, user, url)?
        .ok_or_else(|| StoreError::missing_parent(Collection::Annotation, url))
}

pub(crate) fn resolve_list(
    conn: &Connection,
    user: &UserId,
    local_id: i64,
) -> Result<lists::ListRow, StoreError> {
    lists::find_live_list(conn, user, local_id)?
        .ok_or_else(|| StoreError::missing_parent(Collection::List, local_id))
}

/// A local tag url names either an annotation or a page; annotations are tried first.
pub(crate) fn find_tag_target(
    conn: &Connection,
    user: &UserId,
    url: &str,
) -> Result<Option<TagTarget>, StoreError> {
    if let Some(annotation) = annotations::find_live_annotation_by_url(conn, user, url)? {
        return Ok(Some(TagTarget::Annotation(annotation.id)));
    }
    Ok(content::find_live_content(conn, user, url)?
        .map(|content| TagTarget::ContentMetadata(content.id)))
}

pub(crate) fn resolve_tag_target(
    conn: &Connection,
    user: &UserId,
    url: &str,
) -> Result<TagTarget, StoreError> {
    find_tag_target(conn, user, url)?
        .ok_or_else(|| StoreError::missing_parent(Collection::ContentMetadata, url))
}

fn resolve_key(conn: &Connection, user: &UserId, key: &NaturalKey) -> Result<EntityId, StoreError> {
    let missing = |collection| StoreError::missing_parent(collection, key);
    match key {
        NaturalKey::Content { normalized_url } => {
            Ok(resolve_content(conn, user, normalized_url)?.id)
        }
        NaturalKey::Locator { location } => {
            let page = content::find_live_content(conn, user, location)?
                .ok_or_else(|| missing(Collection::ContentLocator))?;
            content::find_live_locator(conn, page.id, location)?
                .map(|locator| locator.id)
                .ok_or_else(|| missing(Collection::ContentLocator))
        }
        NaturalKey::Visit { url, time } => {
            let page = resolve_content(conn, user, url)?;
            content::find_live_read(conn, page.id, *time)?
                .map(|read| read.id)
                .ok_or_else(|| missing(Collection::ContentRead))
        }
        NaturalKey::Annotation { url } => Ok(resolve_annotation(conn, user, url)?.id),
        NaturalKey::Selector { annotation_url } => {
            let annotation = resolve_annotation(conn, user, annotation_url)?;
            annotations::live_selector(conn, annotation.id)?
                .map(|selector| selector.id)
                .ok_or_else(|| missing(Collection::AnnotationSelector))
        }
        NaturalKey::Tag { name } => tags::find_tag(conn, user, name)?
            .map(|tag| tag.id)
            .ok_or_else(|| missing(Collection::Tag)),
        NaturalKey::TagConnection { url, name } => {
            let tag = tags::find_tag(conn, user, name)?.ok_or_else(|| missing(Collection::Tag))?;
            let target = resolve_tag_target(conn, user, url)?;
            tags::find_live_connection(conn, tag.id, target)?
                .map(|connection| connection.id)
                .ok_or_else(|| missing(Collection::TagConnection))
        }
        NaturalKey::List { id } => Ok(resolve_list(conn, user, *id)?.id),
        NaturalKey::ListEntry { list_id, page_url } => {
            let list = resolve_list(conn, user, *list_id)?;
            let page = resolve_content(conn, user, page_url)?;
            lists::find_live_entry(conn, list.id, page.id)?
                .map(|entry| entry.id)
                .ok_or_else(|| missing(Collection::ListEntry))
        }
    }
}

/// Url a device knows a tag target by.
pub(crate) fn tag_target_url(
    conn: &Connection,
    user: &UserId,
    target: TagTarget,
) -> Result<Option<String>, StoreError> {
    match target {
        TagTarget::ContentMetadata(id) => {
            Ok(content::content_by_id(conn, user, id)?.map(|content| content.normalized_url))
        }
        TagTarget::Annotation(id) => annotation_url_by_id(conn, user, id),
    }
}

pub(crate) fn annotation_url_by_id(
    conn: &Connection,
    user: &UserId,
    id: EntityId,
) -> Result<Option<String>, StoreError> {
    let Some(annotation) = annotations::annotation_by_id(conn, user, id)? else {
        return Ok(None);
    };
    Ok(content::content_by_id(conn, user, annotation.metadata_id)?
        .map(|page| annotation_url(&page.normalized_url, &annotation.local_id)))
}

pub(crate) fn natural_key_of(
    conn: &Connection,
    user: &UserId,
    collection: Collection,
    id: EntityId,
) -> Result<Option<NaturalKey>, StoreError> {
    let page_url = |metadata_id: EntityId| -> Result<Option<String>, StoreError> {
        Ok(content::content_by_id(conn, user, metadata_id)?.map(|page| page.normalized_url))
    };

    let key = match collection {
        Collection::ContentMetadata => content::content_by_id(conn, user, id)?
            .map(|page| NaturalKey::Content {
                normalized_url: page.normalized_url,
            }),
        Collection::ContentLocator => content::locator_by_id(conn, user, id)?
            .map(|locator| NaturalKey::Locator {
                location: locator.location,
            }),
        Collection::ContentRead => match content::read_by_id(conn, user, id)? {
            Some(read) => page_url(read.metadata_id)?.map(|url| NaturalKey::Visit {
                url,
                time: read.read_when,
            }),
            None => None,
        },
        Collection::Annotation => {
            annotation_url_by_id(conn, user, id)?.map(|url| NaturalKey::Annotation { url })
        }
        Collection::AnnotationSelector => match annotations::selector_by_id(conn, user, id)? {
            Some(selector) => annotation_url_by_id(conn, user, selector.annotation_id)?
                .map(|annotation_url| NaturalKey::Selector { annotation_url }),
            None => None,
        },
        Collection::Tag => {
            tags::tag_by_id(conn, user, id)?.map(|tag| NaturalKey::Tag { name: tag.name })
        }
        Collection::TagConnection => {
            let Some(connection) = tags::connection_by_id(conn, user, id)? else {
                return Ok(None);
            };
            let Some(tag) = tags::tag_by_id(conn, user, connection.tag_id)? else {
                return Ok(None);
            };
            tag_target_url(conn, user, connection.target)?
                .map(|url| NaturalKey::TagConnection { url, name: tag.name })
        }
        Collection::List => lists::list_by_id(conn, user, id)?.map(|list| NaturalKey::List {
            id: list.local_id,
        }),
        Collection::ListEntry => {
            let Some(entry) = lists::entry_by_id(conn, user, id)? else {
                return Ok(None);
            };
            let Some(list) = lists::list_by_id(conn, user, entry.list_id)? else {
                return Ok(None);
            };
            page_url(entry.metadata_id)?.map(|page_url| NaturalKey::ListEntry {
                list_id: list.local_id,
                page_url,
            })
        }
    };
    Ok(key)
}
