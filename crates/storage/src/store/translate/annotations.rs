#![forbid(unsafe_code)]

use super::{ensure_identity_unchanged, record, tags};
use crate::store::change_log::ChangeWriter;
use crate::store::entities::annotations::{self, AnnotationFields, AnnotationRow};
use crate::store::entities::content::{self, ContentRow};
use crate::store::{StoreError, resolver};
use pc_core::local::annotation_url;
use pc_core::{
    AnnotationRecord, Collection, EntityId, LocalChange, LocalCollection, NaturalKey, PrivacyLevel,
    TagTarget,
};
use rusqlite::Transaction;
use serde_json::Value;

pub(super) fn translate(
    tx: &Transaction<'_>,
    log: &mut ChangeWriter<'_>,
    change: &LocalChange,
) -> Result<(), StoreError> {
    match change {
        LocalChange::Create { object } => create(tx, log, &record(object)?),
        LocalChange::Update { before, after } => {
            ensure_identity_unchanged(LocalCollection::Annotations, before, after)?;
            update(tx, log, &record(before)?, &record(after)?)
        }
        LocalChange::Delete { object } => {
            let annotation: AnnotationRecord = record(object)?;
            let local_id = local_id(&annotation)?;
            let Some(page) = content::find_live_content(tx, log.user(), &annotation.page_url)?
            else {
                return Ok(());
            };
            match annotations::find_live_annotation(tx, page.id, local_id)? {
                Some(existing) => delete_annotation(tx, log, &page, &existing),
                None => Ok(()),
            }
        }
    }
}

fn create(
    tx: &Transaction<'_>,
    log: &mut ChangeWriter<'_>,
    annotation: &AnnotationRecord,
) -> Result<(), StoreError> {
    let local_id = local_id(annotation)?;
    let page = resolver::resolve_content(tx, log.user(), &annotation.page_url)?;

    let annotation_id = match annotations::find_live_annotation(tx, page.id, local_id)? {
        Some(existing) => {
            let wanted = fields(annotation, existing.fields.privacy_level);
            if existing.fields != wanted {
                annotations::update_annotation(tx, existing.id, &wanted)?;
                log.modified(tx, Collection::Annotation, existing.id)?;
            }
            existing.id
        }
        None => {
            let taken = annotations::find_live_annotation_by_url(tx, log.user(), &annotation.url)?;
            if taken.is_some() {
                return Err(StoreError::InvalidInput(
                    "annotation url is already used under another page",
                ));
            }
            let wanted = fields(annotation, PrivacyLevel::default());
            let id = annotations::insert_annotation(
                tx,
                log.user(),
                page.id,
                local_id,
                &annotation.url,
                &wanted,
            )?;
            log.created(tx, Collection::Annotation, id)?;
            id
        }
    };
    sync_selector(tx, log, annotation_id, &annotation.url, annotation.selector.as_ref())
}

fn update(
    tx: &Transaction<'_>,
    log: &mut ChangeWriter<'_>,
    before: &AnnotationRecord,
    after: &AnnotationRecord,
) -> Result<(), StoreError> {
    let local_id = local_id(after)?;
    let page = resolver::resolve_content(tx, log.user(), &after.page_url)?;
    let existing = annotations::find_live_annotation(tx, page.id, local_id)?
        .ok_or_else(|| StoreError::missing_parent(Collection::Annotation, &after.url))?;

    let wanted = fields(after, existing.fields.privacy_level);
    if wanted != existing.fields {
        annotations::update_annotation(tx, existing.id, &wanted)?;
        log.modified(tx, Collection::Annotation, existing.id)?;
    }
    if before.selector != after.selector {
        sync_selector(tx, log, existing.id, &after.url, after.selector.as_ref())?;
    }
    Ok(())
}

/// Brings the live selector of an annotation in line with `wanted`.
fn sync_selector(
    tx: &Transaction<'_>,
    log: &mut ChangeWriter<'_>,
    annotation_id: EntityId,
    url: &str,
    wanted: Option<&Value>,
) -> Result<(), StoreError> {
    let now = log.now();
    match (annotations::live_selector(tx, annotation_id)?, wanted) {
        (None, None) => Ok(()),
        (Some(live), Some(wanted)) if live.selector == *wanted => Ok(()),
        (Some(live), Some(wanted)) => {
            annotations::update_selector(tx, live.id, wanted, now)?;
            log.modified(tx, Collection::AnnotationSelector, live.id)
        }
        (None, Some(wanted)) => {
            let id = annotations::insert_selector(tx, log.user(), annotation_id, wanted, now)?;
            log.created(tx, Collection::AnnotationSelector, id)
        }
        (Some(live), None) => {
            annotations::tombstone_selector(tx, live.id, now)?;
            log.deleted(
                tx,
                Collection::AnnotationSelector,
                live.id,
                NaturalKey::Selector {
                    annotation_url: url.to_string(),
                },
            )
        }
    }
}

/// Tag connections, then the selector, then the annotation.
pub(super) fn delete_annotation(
    tx: &Transaction<'_>,
    log: &mut ChangeWriter<'_>,
    page: &ContentRow,
    annotation: &AnnotationRow,
) -> Result<(), StoreError> {
    let url = annotation_url(&page.normalized_url, &annotation.local_id);
    let now = log.now();

    tags::delete_connections_to(tx, log, TagTarget::Annotation(annotation.id), &url)?;
    if let Some(selector) = annotations::live_selector(tx, annotation.id)? {
        annotations::tombstone_selector(tx, selector.id, now)?;
        log.deleted(
            tx,
            Collection::AnnotationSelector,
            selector.id,
            NaturalKey::Selector {
                annotation_url: url.clone(),
            },
        )?;
    }
    annotations::tombstone_annotation(tx, annotation.id, now)?;
    log.deleted(tx, Collection::Annotation, annotation.id, NaturalKey::Annotation { url })
}

fn local_id(annotation: &AnnotationRecord) -> Result<&str, StoreError> {
    annotation
        .local_id()
        .ok_or(StoreError::InvalidInput("annotation url must extend its page url"))
}

/// Devices on older local schemas never send `privacyLevel`; they keep `privacy`.
fn fields(annotation: &AnnotationRecord, privacy: PrivacyLevel) -> AnnotationFields {
    AnnotationFields {
        body: annotation.body.clone(),
        comment: annotation.comment.clone(),
        privacy_level: annotation.privacy_level.unwrap_or(privacy),
        created_when: annotation.created_when,
        last_edited: annotation.last_edited,
    }
}
