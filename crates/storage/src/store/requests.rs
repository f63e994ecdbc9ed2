#![forbid(unsafe_code)]

use super::StoreError;
use pc_core::{Checkpoint, DataChange, UserId};

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DownloadRequest {
    pub user_id: UserId,
    /// Exclusive lower bound on `createdWhen`.
    pub start_time: i64,
    /// With `after_log_id`, entries at exactly `start_time` and a larger log id are included.
    pub after_log_id: Option<i64>,
    pub client_schema_version: u32,
    /// Maximum number of change-log entries to scan; the store config supplies the default.
    pub limit: Option<usize>,
}

impl DownloadRequest {
    pub fn new(user_id: UserId, start_time: i64, client_schema_version: u32) -> Self {
        Self {
            user_id,
            start_time,
            after_log_id: None,
            client_schema_version,
            limit: None,
        }
    }

    /// Continues right after a checkpoint returned by an earlier download.
    pub fn resume(user_id: UserId, checkpoint: Checkpoint, client_schema_version: u32) -> Self {
        Self {
            after_log_id: Some(checkpoint.log_id),
            ..Self::new(user_id, checkpoint.time, client_schema_version)
        }
    }

    pub fn with_limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }
}

#[derive(Debug)]
pub struct RejectedMutation {
    pub index: usize,
    pub error: StoreError,
}

/// Outcome of translating several local mutations, each in its own transaction.
#[derive(Debug, Default)]
pub struct BatchReport {
    pub translated: Vec<DataChange>,
    pub rejected: Vec<RejectedMutation>,
}
