#![forbid(unsafe_code)]

use pc_core::Collection;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("io: {0}")]
    Io(#[from] std::io::Error),
    #[error("sqlite: {0}")]
    Sql(#[from] rusqlite::Error),
    #[error("json: {0}")]
    Json(#[from] serde_json::Error),
    #[error("config: {0}")]
    Config(String),
    #[error("invalid input: {0}")]
    InvalidInput(&'static str),
    #[error("RESET_REQUIRED: {0}")]
    ResetRequired(&'static str),
    /// A referenced entity could not be resolved; nothing was written for the mutation.
    #[error("missing parent {collection} ({key})")]
    MissingParent { collection: Collection, key: String },
    #[error("unknown local collection '{0}'")]
    UnknownCollection(String),
    #[error("client schema version {0} is not supported")]
    SchemaVersionUnsupported(u32),
}

impl StoreError {
    pub(crate) fn missing_parent(collection: Collection, key: impl std::fmt::Display) -> Self {
        Self::MissingParent {
            collection,
            key: key.to_string(),
        }
    }
}
