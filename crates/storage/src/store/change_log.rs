#![forbid(unsafe_code)]

use super::{SqliteStore, StoreError, to_sqlite_i64};
use pc_core::{Collection, DataChange, DataChangeType, DeviceId, EntityId, NaturalKey, UserId};
use rusqlite::{Connection, OptionalExtension, Transaction, params};
use tracing::debug;

impl SqliteStore {
    /// Appends one entry in its own transaction. Translation appends through [`ChangeWriter`]
    /// instead, inside the transaction that performs the entity write.
    pub fn append_change(
        &mut self,
        user: &UserId,
        device: &DeviceId,
        change_type: DataChangeType,
        collection: Collection,
        object_id: EntityId,
        info: Option<NaturalKey>,
    ) -> Result<DataChange, StoreError> {
        let now = self.clock.now_ms();
        let tx = self.write_tx()?;
        let at = next_change_time(&tx, user, now)?;
        let change = append_change_tx(
            &tx,
            user,
            device,
            at,
            change_type,
            collection,
            object_id,
            info,
        )?;
        tx.commit()?;
        Ok(change)
    }

    /// Entries after `(after_time, after_log_id)` in `(createdWhen, logId)` order.
    pub fn scan_changes(
        &self,
        user: &UserId,
        after_time: i64,
        after_log_id: Option<i64>,
        limit: Option<usize>,
    ) -> Result<Vec<DataChange>, StoreError> {
        scan_changes_tx(&self.conn, user, after_time, after_log_id, limit)
    }
}

/// Time for the entries of a new write: `now`, but strictly after the user's last entry so a
/// time-only cursor taken from an earlier download never hides it.
pub(crate) fn next_change_time(
    tx: &Transaction<'_>,
    user: &UserId,
    now: i64,
) -> Result<i64, StoreError> {
    let last: Option<i64> = tx
        .query_row(
            "SELECT last_created_when FROM change_sequences WHERE user_id=?1",
            params![user.as_str()],
            |row| row.get(0),
        )
        .optional()?;
    Ok(match last {
        Some(last) => now.max(last.saturating_add(1)),
        None => now,
    })
}

#[allow(clippy::too_many_arguments)]
pub(crate) fn append_change_tx(
    tx: &Transaction<'_>,
    user: &UserId,
    device: &DeviceId,
    now: i64,
    change_type: DataChangeType,
    collection: Collection,
    object_id: EntityId,
    info: Option<NaturalKey>,
) -> Result<DataChange, StoreError> {
    let last: Option<(i64, i64)> = tx
        .query_row(
            "SELECT last_log_id, last_created_when FROM change_sequences WHERE user_id=?1",
            params![user.as_str()],
            |row| Ok((row.get(0)?, row.get(1)?)),
        )
        .optional()?;
    let (last_log_id, last_created_when) = last.unwrap_or((0, i64::MIN));
    let log_id = last_log_id + 1;
    let created_when = now.max(last_created_when);

    tx.execute(
        r#"
        INSERT INTO change_sequences(user_id, last_log_id, last_created_when) VALUES (?1, ?2, ?3)
        ON CONFLICT(user_id) DO UPDATE SET
          last_log_id=excluded.last_log_id,
          last_created_when=excluded.last_created_when
        "#,
        params![user.as_str(), log_id, created_when],
    )?;

    let info_json = info.as_ref().map(serde_json::to_string).transpose()?;
    tx.execute(
        r#"
        INSERT INTO data_changes(
          user_id, log_id, created_when, created_by_device, change_type, collection, object_id,
          info_json
        ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
        "#,
        params![
            user.as_str(),
            log_id,
            created_when,
            device.as_str(),
            change_type.as_str(),
            collection.as_str(),
            object_id.get(),
            info_json,
        ],
    )?;

    Ok(DataChange {
        log_id,
        user_id: user.clone(),
        created_when,
        created_by_device: device.clone(),
        change_type,
        collection,
        object_id,
        info,
    })
}

pub(crate) fn scan_changes_tx(
    conn: &Connection,
    user: &UserId,
    after_time: i64,
    after_log_id: Option<i64>,
    limit: Option<usize>,
) -> Result<Vec<DataChange>, StoreError> {
    let limit = match limit {
        Some(limit) => to_sqlite_i64(limit)?,
        None => -1,
    };
    let mut stmt = conn.prepare(
        r#"
        SELECT log_id, created_when, created_by_device, change_type, collection, object_id,
               info_json
        FROM data_changes
        WHERE user_id=?1 AND (created_when > ?2 OR (created_when = ?2 AND log_id > ?3))
        ORDER BY created_when ASC, log_id ASC
        LIMIT ?4
        "#,
    )?;
    let mut rows = stmt.query(params![
        user.as_str(),
        after_time,
        after_log_id.unwrap_or(i64::MAX),
        limit
    ])?;

    let mut out = Vec::new();
    while let Some(row) = rows.next()? {
        let device: String = row.get(2)?;
        let change_type: String = row.get(3)?;
        let collection: String = row.get(4)?;
        let info_json: Option<String> = row.get(6)?;
        out.push(DataChange {
            log_id: row.get(0)?,
            user_id: user.clone(),
            created_when: row.get(1)?,
            created_by_device: DeviceId::try_new(device)
                .map_err(|_| StoreError::InvalidInput("corrupt change log device id"))?,
            change_type: DataChangeType::parse(&change_type)
                .ok_or(StoreError::InvalidInput("corrupt change log type"))?,
            collection: Collection::parse(&collection)
                .ok_or(StoreError::InvalidInput("corrupt change log collection"))?,
            object_id: EntityId::new(row.get(5)?),
            info: info_json
                .as_deref()
                .map(serde_json::from_str)
                .transpose()?,
        });
    }
    Ok(out)
}

/// Collects the change-log entries of one translation.
///
/// Every entity write goes through here so that a write and its entry share a transaction.
pub(crate) struct ChangeWriter<'a> {
    user: &'a UserId,
    device: &'a DeviceId,
    now: i64,
    written: Vec<DataChange>,
}

impl<'a> ChangeWriter<'a> {
    /// Starts the entries of one translation; they all share one time.
    pub(crate) fn begin(
        tx: &Transaction<'_>,
        user: &'a UserId,
        device: &'a DeviceId,
        now: i64,
    ) -> Result<Self, StoreError> {
        Ok(Self {
            user,
            device,
            now: next_change_time(tx, user, now)?,
            written: Vec::new(),
        })
    }

    pub(crate) fn user(&self) -> &'a UserId {
        self.user
    }

    pub(crate) fn now(&self) -> i64 {
        self.now
    }

    pub(crate) fn created(
        &mut self,
        tx: &Transaction<'_>,
        collection: Collection,
        id: EntityId,
    ) -> Result<(), StoreError> {
        self.record(tx, DataChangeType::Create, collection, id, None)
    }

    pub(crate) fn modified(
        &mut self,
        tx: &Transaction<'_>,
        collection: Collection,
        id: EntityId,
    ) -> Result<(), StoreError> {
        self.record(tx, DataChangeType::Modify, collection, id, None)
    }

    pub(crate) fn deleted(
        &mut self,
        tx: &Transaction<'_>,
        collection: Collection,
        id: EntityId,
        info: NaturalKey,
    ) -> Result<(), StoreError> {
        self.record(tx, DataChangeType::Delete, collection, id, Some(info))
    }

    fn record(
        &mut self,
        tx: &Transaction<'_>,
        change_type: DataChangeType,
        collection: Collection,
        id: EntityId,
        info: Option<NaturalKey>,
    ) -> Result<(), StoreError> {
        let change = append_change_tx(
            tx,
            self.user,
            self.device,
            self.now,
            change_type,
            collection,
            id,
            info,
        )?;
        debug!(
            log_id = change.log_id,
            change_type = change_type.as_str(),
            collection = collection.as_str(),
            object_id = id.get(),
            "appended change"
        );
        self.written.push(change);
        Ok(())
    }

    pub(crate) fn finish(self) -> Vec<DataChange> {
        self.written
    }
}
