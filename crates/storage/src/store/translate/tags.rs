#![forbid(unsafe_code)]

//! Local tags are `(url, name)` pairs. Each one unwinds to a shared Tag plus a connection to
//! whatever the url names. Tags themselves are never deleted here.

use super::record;
use crate::store::change_log::ChangeWriter;
use crate::store::entities::tags::{self, TagRow};
use crate::store::{StoreError, resolver};
use pc_core::{Collection, LocalChange, NaturalKey, TagRecord, TagTarget};
use rusqlite::Transaction;

pub(super) fn translate(
    tx: &Transaction<'_>,
    log: &mut ChangeWriter<'_>,
    change: &LocalChange,
) -> Result<(), StoreError> {
    match change {
        LocalChange::Create { object } => connect(tx, log, &record(object)?),
        LocalChange::Update { before, after } => {
            let before: TagRecord = record(before)?;
            let after: TagRecord = record(after)?;
            if before == after {
                return Ok(());
            }
            disconnect(tx, log, &before)?;
            connect(tx, log, &after)
        }
        LocalChange::Delete { object } => disconnect(tx, log, &record(object)?),
    }
}

fn connect(
    tx: &Transaction<'_>,
    log: &mut ChangeWriter<'_>,
    tag: &TagRecord,
) -> Result<(), StoreError> {
    let target = resolver::resolve_tag_target(tx, log.user(), &tag.url)?;
    let tag_row = ensure_tag(tx, log, &tag.name)?;
    if tags::find_live_connection(tx, tag_row.id, target)?.is_some() {
        return Ok(());
    }
    let id = tags::insert_connection(tx, log.user(), tag_row.id, target, log.now())?;
    log.created(tx, Collection::TagConnection, id)
}

fn ensure_tag(
    tx: &Transaction<'_>,
    log: &mut ChangeWriter<'_>,
    name: &str,
) -> Result<TagRow, StoreError> {
    if let Some(existing) = tags::find_tag(tx, log.user(), name)? {
        return Ok(existing);
    }
    match tags::insert_tag(tx, log.user(), name, log.now())? {
        Some(id) => {
            log.created(tx, Collection::Tag, id)?;
            Ok(TagRow {
                id,
                name: name.to_string(),
            })
        }
        None => tags::find_tag(tx, log.user(), name)?
            .ok_or(StoreError::InvalidInput("tag insert conflicted without a row")),
    }
}

/// Removing a connection that is already gone is a no-op.
fn disconnect(
    tx: &Transaction<'_>,
    log: &mut ChangeWriter<'_>,
    tag: &TagRecord,
) -> Result<(), StoreError> {
    let Some(tag_row) = tags::find_tag(tx, log.user(), &tag.name)? else {
        return Ok(());
    };
    let Some(target) = resolver::find_tag_target(tx, log.user(), &tag.url)? else {
        return Ok(());
    };
    let Some(connection) = tags::find_live_connection(tx, tag_row.id, target)? else {
        return Ok(());
    };
    tags::tombstone_connection(tx, connection.id, log.now())?;
    log.deleted(
        tx,
        Collection::TagConnection,
        connection.id,
        NaturalKey::TagConnection {
            url: tag.url.clone(),
            name: tag.name.clone(),
        },
    )
}

/// Deletes every live connection pointing at `target`, known to devices as `url`.
pub(super) fn delete_connections_to(
    tx: &Transaction<'_>,
    log: &mut ChangeWriter<'_>,
    target: TagTarget,
    url: &str,
) -> Result<(), StoreError> {
    for connection in tags::live_connections_for_target(tx, log.user(), target)? {
        let name = tags::tag_by_id(tx, log.user(), connection.tag_id)?
            .map(|tag| tag.name)
            .ok_or(StoreError::InvalidInput("tag connection without a tag"))?;
        tags::tombstone_connection(tx, connection.id, log.now())?;
        log.deleted(
            tx,
            Collection::TagConnection,
            connection.id,
            NaturalKey::TagConnection {
                url: url.to_string(),
                name,
            },
        )?;
    }
    Ok(())
}
