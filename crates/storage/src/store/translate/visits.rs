#![forbid(unsafe_code)]

use super::{ensure_identity_unchanged, record};
use crate::store::change_log::ChangeWriter;
use crate::store::entities::content::{self, ReadProgress};
use crate::store::{StoreError, resolver};
use pc_core::{Collection, LocalChange, LocalCollection, NaturalKey, VisitRecord};
use rusqlite::Transaction;

pub(super) fn translate(
    tx: &Transaction<'_>,
    log: &mut ChangeWriter<'_>,
    change: &LocalChange,
) -> Result<(), StoreError> {
    match change {
        LocalChange::Create { object } => create(tx, log, &record(object)?),
        LocalChange::Update { before, after } => {
            ensure_identity_unchanged(LocalCollection::Visits, before, after)?;
            let before: VisitRecord = record(before)?;
            let after: VisitRecord = record(after)?;
            if progress(&before) == progress(&after) {
                return Ok(());
            }
            let page = resolver::resolve_content(tx, log.user(), &after.url)?;
            let read = content::find_live_read(tx, page.id, after.time)?.ok_or_else(|| {
                StoreError::missing_parent(Collection::ContentRead, visit_key(&after))
            })?;
            content::update_read(tx, read.id, progress(&after), log.now())?;
            log.modified(tx, Collection::ContentRead, read.id)
        }
        LocalChange::Delete { object } => {
            let visit: VisitRecord = record(object)?;
            let Some(page) = content::find_live_content(tx, log.user(), &visit.url)? else {
                return Ok(());
            };
            let Some(read) = content::find_live_read(tx, page.id, visit.time)? else {
                return Ok(());
            };
            content::tombstone_read(tx, read.id, log.now())?;
            log.deleted(tx, Collection::ContentRead, read.id, visit_key(&visit))
        }
    }
}

fn create(
    tx: &Transaction<'_>,
    log: &mut ChangeWriter<'_>,
    visit: &VisitRecord,
) -> Result<(), StoreError> {
    let page = resolver::resolve_content(tx, log.user(), &visit.url)?;
    match content::find_live_read(tx, page.id, visit.time)? {
        Some(read) if read.progress() == progress(visit) => Ok(()),
        Some(read) => {
            content::update_read(tx, read.id, progress(visit), log.now())?;
            log.modified(tx, Collection::ContentRead, read.id)
        }
        None => {
            let read_id = content::insert_read(
                tx,
                log.user(),
                page.id,
                visit.time,
                progress(visit),
                log.now(),
            )?;
            log.created(tx, Collection::ContentRead, read_id)
        }
    }
}

fn progress(visit: &VisitRecord) -> ReadProgress {
    ReadProgress {
        duration: visit.duration,
        scroll_perc: visit.scroll_perc,
        scroll_max_perc: visit.scroll_max_perc,
    }
}

fn visit_key(visit: &VisitRecord) -> NaturalKey {
    NaturalKey::Visit {
        url: visit.url.clone(),
        time: visit.time,
    }
}
