#![forbid(unsafe_code)]

//! Change log -> ordered device updates.

mod reconstruct;
mod schema;

pub use schema::{CLIENT_SCHEMA_V24, CLIENT_SCHEMA_V25};

use super::change_log::scan_changes_tx;
use super::entities::{annotations, content};
use super::{DownloadRequest, SqliteStore, StoreError, resolver};
use pc_core::{
    ClientUpdate, Collection, DataChange, DataChangeType, EntityId, LocalCollection, NaturalKey,
    UpdateBatch, UserId,
};
use rusqlite::Connection;
use schema::ClientSchema;
use serde_json::{Value, json};
use std::collections::HashSet;
use tracing::debug;

impl SqliteStore {
    /// Scans the user's change log after the request's checkpoint and turns the entries into
    /// updates the device can apply in order. Scan and reconstruction share one read snapshot.
    pub fn download_client_updates(
        &self,
        request: &DownloadRequest,
    ) -> Result<UpdateBatch, StoreError> {
        let schema = schema::client_schema(request.client_schema_version)?;
        let limit = request.limit.unwrap_or(self.config.download_limit);
        if limit == 0 {
            return Err(StoreError::InvalidInput("download limit must be positive"));
        }

        let tx = self.conn.unchecked_transaction()?;
        let mut scanned = scan_changes_tx(
            &tx,
            &request.user_id,
            request.start_time,
            request.after_log_id,
            Some(limit.saturating_add(1)),
        )?;
        let maybe_has_more = scanned.len() > limit;
        scanned.truncate(limit);

        let mut batch = BatchBuilder::default();
        for change in &scanned {
            if let Some(planned) = plan(&tx, &request.user_id, schema, change)? {
                batch.push(planned);
            }
        }
        tx.commit()?;

        let batch = batch.finish();
        debug!(
            user = request.user_id.as_str(),
            client_schema = schema.version(),
            scanned = scanned.len(),
            updates = batch.len(),
            maybe_has_more,
            "built client update batch"
        );

        Ok(UpdateBatch {
            batch,
            checkpoint: scanned.last().map(DataChange::checkpoint),
            maybe_has_more,
        })
    }
}

/// A local record is identified by its collection and the id of the entity it is built from.
type RootKey = (LocalCollection, EntityId);

enum Planned {
    Overwrite { root: RootKey, object: Value },
    Delete { root: RootKey, criteria: Value },
}

/// Keeps scan order. The first Overwrite of a record wins its position; later Overwrites of
/// the same record are dropped because every Overwrite carries the state at scan time.
#[derive(Default)]
struct BatchBuilder {
    settled: HashSet<RootKey>,
    updates: Vec<ClientUpdate>,
}

impl BatchBuilder {
    fn push(&mut self, planned: Planned) {
        match planned {
            Planned::Overwrite { root, object } => {
                if self.settled.insert(root) {
                    self.updates.push(ClientUpdate::Overwrite {
                        collection: root.0,
                        object,
                    });
                }
            }
            Planned::Delete { root, criteria } => {
                self.settled.insert(root);
                self.updates.push(ClientUpdate::Delete {
                    collection: root.0,
                    criteria,
                });
            }
        }
    }

    fn finish(self) -> Vec<ClientUpdate> {
        self.updates
    }
}

fn local_collection(collection: Collection) -> Option<LocalCollection> {
    match collection {
        Collection::ContentMetadata | Collection::ContentLocator => Some(LocalCollection::Pages),
        Collection::ContentRead => Some(LocalCollection::Visits),
        Collection::Annotation | Collection::AnnotationSelector => {
            Some(LocalCollection::Annotations)
        }
        Collection::Tag => None,
        Collection::TagConnection => Some(LocalCollection::Tags),
        Collection::List => Some(LocalCollection::CustomLists),
        Collection::ListEntry => Some(LocalCollection::PageListEntries),
    }
}

fn plan(
    conn: &Connection,
    user: &UserId,
    schema: &dyn ClientSchema,
    change: &DataChange,
) -> Result<Option<Planned>, StoreError> {
    let Some(local) = local_collection(change.collection) else {
        return Ok(None);
    };
    if !schema.supports(local) {
        return Ok(None);
    }

    match change.change_type {
        DataChangeType::Create | DataChangeType::Modify => {
            let Some(root) = root_of(conn, user, change.collection, change.object_id)? else {
                return Ok(None);
            };
            overwrite(conn, user, schema, (local, root))
        }
        DataChangeType::Delete => match change.collection {
            // The page record is removed by its metadata's own Delete.
            Collection::ContentLocator => Ok(None),
            Collection::AnnotationSelector => {
                let parent = match annotations::selector_by_id(conn, user, change.object_id)? {
                    Some(selector) => {
                        annotations::annotation_by_id(conn, user, selector.annotation_id)?
                            .filter(|annotation| annotation.is_live())
                    }
                    // Purged selector: the entry's key still names the annotation.
                    None => match &change.info {
                        Some(NaturalKey::Selector { annotation_url }) => {
                            annotations::find_live_annotation_by_url(conn, user, annotation_url)?
                        }
                        _ => None,
                    },
                };
                match parent {
                    Some(annotation) => overwrite(conn, user, schema, (local, annotation.id)),
                    None => Ok(None),
                }
            }
            _ => {
                let key = match &change.info {
                    Some(key) => Some(key.clone()),
                    None => {
                        resolver::natural_key_of(conn, user, change.collection, change.object_id)?
                    }
                };
                let Some(criteria) = key.as_ref().and_then(|key| criteria(local, key)) else {
                    debug!(
                        log_id = change.log_id,
                        collection = change.collection.as_str(),
                        "delete entry has no usable natural key"
                    );
                    return Ok(None);
                };
                Ok(Some(Planned::Delete {
                    root: (local, change.object_id),
                    criteria,
                }))
            }
        },
    }
}

/// Id of the entity whose local record an entry changes.
fn root_of(
    conn: &Connection,
    user: &UserId,
    collection: Collection,
    id: EntityId,
) -> Result<Option<EntityId>, StoreError> {
    match collection {
        Collection::ContentLocator => {
            Ok(content::locator_by_id(conn, user, id)?.map(|locator| locator.metadata_id))
        }
        Collection::AnnotationSelector => {
            Ok(annotations::selector_by_id(conn, user, id)?.map(|selector| selector.annotation_id))
        }
        _ => Ok(Some(id)),
    }
}

fn overwrite(
    conn: &Connection,
    user: &UserId,
    schema: &dyn ClientSchema,
    root: RootKey,
) -> Result<Option<Planned>, StoreError> {
    let (local, id) = root;
    let object = match local {
        LocalCollection::Pages => reconstruct::page(conn, user, id)?,
        LocalCollection::Visits => reconstruct::visit(conn, user, id)?,
        LocalCollection::Annotations => reconstruct::annotation(conn, user, id, schema)?,
        LocalCollection::Tags => reconstruct::tag(conn, user, id)?,
        LocalCollection::CustomLists => reconstruct::list(conn, user, id)?,
        LocalCollection::PageListEntries => reconstruct::list_entry(conn, user, id)?,
    };
    Ok(object.map(|object| Planned::Overwrite { root, object }))
}

/// `where` clause matching the device record a natural key names.
fn criteria(local: LocalCollection, key: &NaturalKey) -> Option<Value> {
    match (local, key) {
        (LocalCollection::Pages, NaturalKey::Content { normalized_url }) => {
            Some(json!({ "url": normalized_url }))
        }
        (LocalCollection::Visits, NaturalKey::Visit { url, time }) => {
            Some(json!({ "url": url, "time": time }))
        }
        (LocalCollection::Annotations, NaturalKey::Annotation { url }) => {
            Some(json!({ "url": url }))
        }
        (LocalCollection::Tags, NaturalKey::TagConnection { url, name }) => {
            Some(json!({ "url": url, "name": name }))
        }
        (LocalCollection::CustomLists, NaturalKey::List { id }) => Some(json!({ "id": id })),
        (LocalCollection::PageListEntries, NaturalKey::ListEntry { list_id, page_url }) => {
            Some(json!({ "listId": list_id, "pageUrl": page_url }))
        }
        _ => None,
    }
}
