#![forbid(unsafe_code)]

use super::{ensure_identity_unchanged, record};
use crate::store::change_log::ChangeWriter;
use crate::store::entities::{content, lists};
use crate::store::{StoreError, resolver};
use pc_core::{
    Collection, CustomListRecord, LocalChange, LocalCollection, NaturalKey, PageListEntryRecord,
};
use rusqlite::Transaction;

pub(super) fn translate_list(
    tx: &Transaction<'_>,
    log: &mut ChangeWriter<'_>,
    change: &LocalChange,
) -> Result<(), StoreError> {
    match change {
        LocalChange::Create { object } => {
            let list: CustomListRecord = record(object)?;
            match lists::find_live_list(tx, log.user(), list.id)? {
                Some(existing) if existing.name == list.name => Ok(()),
                Some(existing) => {
                    lists::rename_list(tx, existing.id, &list.name, log.now())?;
                    log.modified(tx, Collection::List, existing.id)
                }
                None => {
                    let id = lists::insert_list(
                        tx,
                        log.user(),
                        list.id,
                        &list.name,
                        list.created_at,
                        log.now(),
                    )?;
                    log.created(tx, Collection::List, id)
                }
            }
        }
        LocalChange::Update { before, after } => {
            ensure_identity_unchanged(LocalCollection::CustomLists, before, after)?;
            let before: CustomListRecord = record(before)?;
            let after: CustomListRecord = record(after)?;
            if before.name == after.name {
                return Ok(());
            }
            let existing = resolver::resolve_list(tx, log.user(), after.id)?;
            lists::rename_list(tx, existing.id, &after.name, log.now())?;
            log.modified(tx, Collection::List, existing.id)
        }
        LocalChange::Delete { object } => {
            let list: CustomListRecord = record(object)?;
            let Some(existing) = lists::find_live_list(tx, log.user(), list.id)? else {
                return Ok(());
            };
            for entry in lists::live_entries_for_list(tx, existing.id)? {
                delete_entry(tx, log, &entry)?;
            }
            lists::tombstone_list(tx, existing.id, log.now())?;
            log.deleted(
                tx,
                Collection::List,
                existing.id,
                NaturalKey::List { id: list.id },
            )
        }
    }
}

pub(super) fn translate_entry(
    tx: &Transaction<'_>,
    log: &mut ChangeWriter<'_>,
    change: &LocalChange,
) -> Result<(), StoreError> {
    match change {
        LocalChange::Create { object } => {
            let entry: PageListEntryRecord = record(object)?;
            let list = resolver::resolve_list(tx, log.user(), entry.list_id)?;
            let page = resolver::resolve_content(tx, log.user(), &entry.page_url)?;
            if lists::find_live_entry(tx, list.id, page.id)?.is_some() {
                return Ok(());
            }
            let id = lists::insert_entry(
                tx,
                log.user(),
                list.id,
                page.id,
                &entry.full_url,
                entry.created_at,
            )?;
            log.created(tx, Collection::ListEntry, id)
        }
        // Only the keys mean anything to the cloud, and they cannot change.
        LocalChange::Update { before, after } => {
            ensure_identity_unchanged(LocalCollection::PageListEntries, before, after)
        }
        LocalChange::Delete { object } => {
            let entry: PageListEntryRecord = record(object)?;
            let Some(list) = lists::find_live_list(tx, log.user(), entry.list_id)? else {
                return Ok(());
            };
            let Some(page) = content::find_live_content(tx, log.user(), &entry.page_url)? else {
                return Ok(());
            };
            match lists::find_live_entry(tx, list.id, page.id)? {
                Some(existing) => delete_entry(tx, log, &existing),
                None => Ok(()),
            }
        }
    }
}

pub(super) fn delete_entry(
    tx: &Transaction<'_>,
    log: &mut ChangeWriter<'_>,
    entry: &lists::EntryRow,
) -> Result<(), StoreError> {
    let list = lists::list_by_id(tx, log.user(), entry.list_id)?
        .ok_or(StoreError::InvalidInput("list entry without a list"))?;
    let page = content::content_by_id(tx, log.user(), entry.metadata_id)?
        .ok_or(StoreError::InvalidInput("list entry without a page"))?;
    lists::tombstone_entry(tx, entry.id, log.now())?;
    log.deleted(
        tx,
        Collection::ListEntry,
        entry.id,
        NaturalKey::ListEntry {
            list_id: list.local_id,
            page_url: page.normalized_url,
        },
    )
}
