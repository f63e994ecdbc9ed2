#![forbid(unsafe_code)]

//! In-memory device store used to check that downloaded batches replay correctly.

use crate::local::{LocalChange, LocalCollection, LocalMutation};
use crate::updates::ClientUpdate;
use serde_json::{Map, Value};
use std::collections::BTreeMap;

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ReplicaError {
    UnknownCollection(String),
    NotAnObject,
}

impl ReplicaError {
    pub fn message(&self) -> &'static str {
        match self {
            Self::UnknownCollection(_) => "unknown local collection",
            Self::NotAnObject => "record must be a JSON object",
        }
    }
}

#[derive(Clone, Debug, Default)]
pub struct LocalReplica {
    rows: BTreeMap<LocalCollection, Vec<Map<String, Value>>>,
}

impl LocalReplica {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn rows(&self, collection: LocalCollection) -> &[Map<String, Value>] {
        self.rows
            .get(&collection)
            .map(Vec::as_slice)
            .unwrap_or_default()
    }

    /// Applies a downloaded update. Returns whether the replica changed.
    pub fn apply(&mut self, update: &ClientUpdate) -> Result<bool, ReplicaError> {
        match update {
            ClientUpdate::Overwrite { collection, object } => {
                let object = object.as_object().ok_or(ReplicaError::NotAnObject)?;
                Ok(self.upsert(*collection, object.clone()))
            }
            ClientUpdate::Delete {
                collection,
                criteria,
            } => {
                let criteria = criteria.as_object().ok_or(ReplicaError::NotAnObject)?;
                Ok(self.remove_matching(*collection, criteria))
            }
        }
    }

    pub fn apply_all<'a>(
        &mut self,
        updates: impl IntoIterator<Item = &'a ClientUpdate>,
    ) -> Result<(), ReplicaError> {
        for update in updates {
            self.apply(update)?;
        }
        Ok(())
    }

    /// Applies a local mutation the way the device's own store would.
    pub fn apply_mutation(&mut self, mutation: &LocalMutation) -> Result<bool, ReplicaError> {
        let collection = LocalCollection::parse(&mutation.collection)
            .ok_or_else(|| ReplicaError::UnknownCollection(mutation.collection.clone()))?;
        match &mutation.change {
            LocalChange::Create { object } => {
                let object = object.as_object().ok_or(ReplicaError::NotAnObject)?;
                Ok(self.upsert(collection, object.clone()))
            }
            LocalChange::Update { before, after } => {
                let before = before.as_object().ok_or(ReplicaError::NotAnObject)?;
                let after = after.as_object().ok_or(ReplicaError::NotAnObject)?;
                let identity = identity_of(collection, before);
                let removed = self.remove_matching(collection, &identity);
                let inserted = self.upsert(collection, after.clone());
                Ok(removed || inserted)
            }
            LocalChange::Delete { object } => {
                let object = object.as_object().ok_or(ReplicaError::NotAnObject)?;
                let identity = identity_of(collection, object);
                Ok(self.remove_matching(collection, &identity))
            }
        }
    }

    fn upsert(&mut self, collection: LocalCollection, object: Map<String, Value>) -> bool {
        let identity = identity_of(collection, &object);
        let rows = self.rows.entry(collection).or_default();
        match rows.iter_mut().find(|row| matches_all(row, &identity)) {
            Some(row) if *row == object => false,
            Some(row) => {
                *row = object;
                true
            }
            None => {
                rows.push(object);
                true
            }
        }
    }

    fn remove_matching(
        &mut self,
        collection: LocalCollection,
        criteria: &Map<String, Value>,
    ) -> bool {
        let Some(rows) = self.rows.get_mut(&collection) else {
            return false;
        };
        let before = rows.len();
        rows.retain(|row| !matches_all(row, criteria));
        rows.len() != before
    }

    /// Rows per collection in a stable order, for comparing replicas built different ways.
    pub fn normalized(&self) -> BTreeMap<LocalCollection, Vec<String>> {
        self.rows
            .iter()
            .filter(|(_, rows)| !rows.is_empty())
            .map(|(collection, rows)| {
                let mut encoded: Vec<String> = rows
                    .iter()
                    .map(|row| Value::Object(row.clone()).to_string())
                    .collect();
                encoded.sort();
                (*collection, encoded)
            })
            .collect()
    }
}

impl PartialEq for LocalReplica {
    fn eq(&self, other: &Self) -> bool {
        self.normalized() == other.normalized()
    }
}

fn identity_of(collection: LocalCollection, object: &Map<String, Value>) -> Map<String, Value> {
    collection
        .identity_fields()
        .iter()
        .filter_map(|field| {
            object
                .get(*field)
                .map(|value| ((*field).to_string(), value.clone()))
        })
        .collect()
}

fn matches_all(row: &Map<String, Value>, criteria: &Map<String, Value>) -> bool {
    criteria
        .iter()
        .all(|(field, expected)| row.get(field) == Some(expected))
}
