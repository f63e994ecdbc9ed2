#![forbid(unsafe_code)]

use super::{annotations, ensure_identity_unchanged, lists, record, tags};
use crate::store::change_log::ChangeWriter;
use crate::store::entities::content::{self, ContentRow};
use crate::store::entities::{annotations as annotation_rows, lists as list_rows};
use crate::store::{StoreError, resolver};
use pc_core::{Collection, LocalChange, LocalCollection, NaturalKey, PageRecord, TagTarget};
use rusqlite::Transaction;

pub(super) fn translate(
    tx: &Transaction<'_>,
    log: &mut ChangeWriter<'_>,
    change: &LocalChange,
) -> Result<(), StoreError> {
    match change {
        LocalChange::Create { object } => create(tx, log, &record(object)?),
        LocalChange::Update { before, after } => {
            ensure_identity_unchanged(LocalCollection::Pages, before, after)?;
            update(tx, log, &record(before)?, &record(after)?)
        }
        LocalChange::Delete { object } => {
            let page: PageRecord = record(object)?;
            match content::find_live_content(tx, log.user(), &page.url)? {
                Some(existing) => delete_page(tx, log, &existing),
                None => Ok(()),
            }
        }
    }
}

fn create(
    tx: &Transaction<'_>,
    log: &mut ChangeWriter<'_>,
    page: &PageRecord,
) -> Result<(), StoreError> {
    let user = log.user();
    let now = log.now();

    let Some(existing) = content::find_live_content(tx, user, &page.url)? else {
        let metadata_id =
            content::insert_content(tx, user, &page.url, page.full_title.as_deref(), now)?;
        log.created(tx, Collection::ContentMetadata, metadata_id)?;
        let locator_id =
            content::insert_locator(tx, user, metadata_id, &page.url, &page.full_url, now)?;
        log.created(tx, Collection::ContentLocator, locator_id)?;
        return Ok(());
    };

    // Another device created the page first: only record what differs.
    if existing.title != page.full_title {
        content::update_content_title(tx, existing.id, page.full_title.as_deref(), now)?;
        log.modified(tx, Collection::ContentMetadata, existing.id)?;
    }
    upsert_locator(tx, log, &existing, page)
}

fn update(
    tx: &Transaction<'_>,
    log: &mut ChangeWriter<'_>,
    before: &PageRecord,
    after: &PageRecord,
) -> Result<(), StoreError> {
    let page = resolver::resolve_content(tx, log.user(), &after.url)?;
    if before.full_title != after.full_title {
        content::update_content_title(tx, page.id, after.full_title.as_deref(), log.now())?;
        log.modified(tx, Collection::ContentMetadata, page.id)?;
    }
    if before.full_url != after.full_url {
        upsert_locator(tx, log, &page, after)?;
    }
    Ok(())
}

fn upsert_locator(
    tx: &Transaction<'_>,
    log: &mut ChangeWriter<'_>,
    page: &ContentRow,
    record: &PageRecord,
) -> Result<(), StoreError> {
    match content::find_live_locator(tx, page.id, &record.url)? {
        Some(locator) if locator.original_location == record.full_url => Ok(()),
        Some(locator) => {
            content::update_locator_original(tx, locator.id, &record.full_url, log.now())?;
            log.modified(tx, Collection::ContentLocator, locator.id)
        }
        None => {
            let locator_id = content::insert_locator(
                tx,
                log.user(),
                page.id,
                &record.url,
                &record.full_url,
                log.now(),
            )?;
            log.created(tx, Collection::ContentLocator, locator_id)
        }
    }
}

/// Deletes a page and everything hanging off it, children first.
pub(super) fn delete_page(
    tx: &Transaction<'_>,
    log: &mut ChangeWriter<'_>,
    page: &ContentRow,
) -> Result<(), StoreError> {
    let now = log.now();

    for annotation in annotation_rows::live_annotations(tx, page.id)? {
        annotations::delete_annotation(tx, log, page, &annotation)?;
    }
    tags::delete_connections_to(
        tx,
        log,
        TagTarget::ContentMetadata(page.id),
        &page.normalized_url,
    )?;
    for entry in list_rows::live_entries_for_content(tx, page.id)? {
        lists::delete_entry(tx, log, &entry)?;
    }
    for read in content::live_reads(tx, page.id)? {
        content::tombstone_read(tx, read.id, now)?;
        log.deleted(
            tx,
            Collection::ContentRead,
            read.id,
            NaturalKey::Visit {
                url: page.normalized_url.clone(),
                time: read.read_when,
            },
        )?;
    }
    for locator in content::live_locators(tx, page.id)? {
        content::tombstone_locator(tx, locator.id, now)?;
        log.deleted(
            tx,
            Collection::ContentLocator,
            locator.id,
            NaturalKey::Locator {
                location: locator.location,
            },
        )?;
    }

    content::tombstone_content(tx, page.id, now)?;
    log.deleted(
        tx,
        Collection::ContentMetadata,
        page.id,
        NaturalKey::Content {
            normalized_url: page.normalized_url.clone(),
        },
    )
}
