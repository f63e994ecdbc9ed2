#![forbid(unsafe_code)]

//! Local mutation -> normalized entity writes, one change-log entry per write.

mod annotations;
mod lists;
mod pages;
mod tags;
mod visits;

use super::change_log::ChangeWriter;
use super::{BatchReport, RejectedMutation, SqliteStore, StoreError};
use pc_core::{DataChange, DeviceId, LocalChange, LocalCollection, LocalMutation, UserId};
use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::{debug, warn};

impl SqliteStore {
    /// Translates one mutation atomically: either every entity write and its change-log entry
    /// commits, or nothing does.
    pub fn translate(
        &mut self,
        user: &UserId,
        device: &DeviceId,
        mutation: &LocalMutation,
    ) -> Result<Vec<DataChange>, StoreError> {
        let collection = LocalCollection::parse(&mutation.collection)
            .ok_or_else(|| StoreError::UnknownCollection(mutation.collection.clone()))?;
        let now = self.clock.now_ms();

        let tx = self.write_tx()?;
        let mut log = ChangeWriter::begin(&tx, user, device, now)?;
        let change = &mutation.change;
        match collection {
            LocalCollection::Pages => pages::translate(&tx, &mut log, change)?,
            LocalCollection::Visits => visits::translate(&tx, &mut log, change)?,
            LocalCollection::Annotations => annotations::translate(&tx, &mut log, change)?,
            LocalCollection::Tags => tags::translate(&tx, &mut log, change)?,
            LocalCollection::CustomLists => lists::translate_list(&tx, &mut log, change)?,
            LocalCollection::PageListEntries => lists::translate_entry(&tx, &mut log, change)?,
        }
        let written = log.finish();
        tx.commit()?;

        debug!(
            user = user.as_str(),
            device = device.as_str(),
            collection = collection.as_str(),
            kind = change_kind(change),
            entries = written.len(),
            "translated local mutation"
        );
        Ok(written)
    }

    /// Translates mutations in order, each in its own transaction. Mutations that cannot be
    /// translated are reported and skipped; storage failures stop the batch.
    pub fn translate_batch(
        &mut self,
        user: &UserId,
        device: &DeviceId,
        mutations: &[LocalMutation],
    ) -> Result<BatchReport, StoreError> {
        let mut report = BatchReport::default();
        for (index, mutation) in mutations.iter().enumerate() {
            match self.translate(user, device, mutation) {
                Ok(written) => report.translated.extend(written),
                Err(
                    error @ (StoreError::UnknownCollection(_)
                    | StoreError::MissingParent { .. }
                    | StoreError::InvalidInput(_)
                    | StoreError::Json(_)),
                ) => {
                    warn!(
                        user = user.as_str(),
                        index,
                        collection = %mutation.collection,
                        error = %error,
                        "skipping local mutation"
                    );
                    report.rejected.push(RejectedMutation { index, error });
                }
                Err(error) => return Err(error),
            }
        }
        Ok(report)
    }
}

fn change_kind(change: &LocalChange) -> &'static str {
    match change {
        LocalChange::Create { .. } => "create",
        LocalChange::Update { .. } => "update",
        LocalChange::Delete { .. } => "delete",
    }
}

fn record<T: DeserializeOwned>(value: &Value) -> Result<T, StoreError> {
    Ok(T::deserialize(value)?)
}

/// Rejects updates that change any identity field of `collection`.
fn ensure_identity_unchanged(
    collection: LocalCollection,
    before: &Value,
    after: &Value,
) -> Result<(), StoreError> {
    let changed = collection
        .identity_fields()
        .iter()
        .any(|field| before.get(field) != after.get(field));
    if changed {
        return Err(StoreError::InvalidInput("identity fields cannot be updated"));
    }
    Ok(())
}
