#![forbid(unsafe_code)]

use super::{SqliteStore, StoreError};
use pc_core::UserId;
use rusqlite::params;
use tracing::info;

/// Child tables first so no purge depends on a cascade.
const TOMBSTONED_TABLES: [&str; 8] = [
    "list_entries",
    "tag_connections",
    "annotation_selectors",
    "annotations",
    "content_reads",
    "content_locators",
    "lists",
    "content_metadata",
];

impl SqliteStore {
    /// Hard-deletes rows tombstoned before `deleted_before`. The change log is untouched;
    /// deletes already in it still download through their recorded natural key.
    pub fn purge_tombstones(
        &mut self,
        user: &UserId,
        deleted_before: i64,
    ) -> Result<usize, StoreError> {
        let tx = self.write_tx()?;
        let mut purged = 0;
        for table in TOMBSTONED_TABLES {
            purged += tx.execute(
                &format!(
                    "DELETE FROM {table} \
                     WHERE user_id=?1 AND deleted_when IS NOT NULL AND deleted_when < ?2"
                ),
                params![user.as_str(), deleted_before],
            )?;
        }
        tx.commit()?;

        info!(user = user.as_str(), deleted_before, purged, "purged tombstones");
        Ok(purged)
    }
}
