#![forbid(unsafe_code)]

use crate::store::StoreError;
use pc_core::{AnnotationRecord, LocalCollection};

pub const CLIENT_SCHEMA_V24: u32 = 24;
pub const CLIENT_SCHEMA_V25: u32 = 25;

/// What a device at a given local schema version can store.
pub(crate) trait ClientSchema: Sync {
    fn version(&self) -> u32;

    fn collections(&self) -> &'static [LocalCollection];

    fn supports(&self, collection: LocalCollection) -> bool {
        self.collections().contains(&collection)
    }

    /// Adjusts a rebuilt annotation to the fields this version knows about.
    fn shape_annotation(&self, annotation: &mut AnnotationRecord);
}

struct Version24;

impl ClientSchema for Version24 {
    fn version(&self) -> u32 {
        CLIENT_SCHEMA_V24
    }

    fn collections(&self) -> &'static [LocalCollection] {
        &[
            LocalCollection::Pages,
            LocalCollection::Visits,
            LocalCollection::Annotations,
            LocalCollection::Tags,
        ]
    }

    fn shape_annotation(&self, annotation: &mut AnnotationRecord) {
        annotation.privacy_level = None;
    }
}

struct Version25;

impl ClientSchema for Version25 {
    fn version(&self) -> u32 {
        CLIENT_SCHEMA_V25
    }

    fn collections(&self) -> &'static [LocalCollection] {
        &LocalCollection::ALL
    }

    fn shape_annotation(&self, annotation: &mut AnnotationRecord) {
        annotation.privacy_level.get_or_insert_default();
    }
}

pub(crate) fn client_schema(version: u32) -> Result<&'static dyn ClientSchema, StoreError> {
    static V24: Version24 = Version24;
    static V25: Version25 = Version25;

    match version {
        CLIENT_SCHEMA_V24 => Ok(&V24),
        CLIENT_SCHEMA_V25 => Ok(&V25),
        other => Err(StoreError::SchemaVersionUnsupported(other)),
    }
}
