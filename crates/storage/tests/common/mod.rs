#![forbid(unsafe_code)]
#![allow(dead_code)]

use pc_core::{
    Collection, DataChange, DataChangeType, DeviceId, LocalMutation, UpdateBatch, UserId,
};
use pc_storage::{DownloadRequest, ManualClock, SqliteStore, StoreError};
use serde_json::{Value, json};
use std::path::Path;
use std::sync::Arc;
use tempfile::TempDir;

pub const START: i64 = 555;

pub struct Fixture {
    dir: TempDir,
    pub store: SqliteStore,
    pub clock: Arc<ManualClock>,
    pub user: UserId,
    pub device: DeviceId,
}

impl Fixture {
    pub fn new() -> Self {
        Self::with_clock(ManualClock::stepping(START))
    }

    pub fn with_clock(clock: ManualClock) -> Self {
        let dir = tempfile::tempdir().expect("create temp dir");
        let clock = Arc::new(clock);
        let store = SqliteStore::open(dir.path())
            .expect("open store")
            .with_clock(clock.clone());
        Self {
            dir,
            store,
            clock,
            user: UserId::try_new("test-user").expect("user id"),
            device: DeviceId::try_new("device-1").expect("device id"),
        }
    }

    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    pub fn translate(&mut self, mutation: LocalMutation) -> Vec<DataChange> {
        self.store
            .translate(&self.user, &self.device, &mutation)
            .expect("translate mutation")
    }

    pub fn try_translate(
        &mut self,
        mutation: LocalMutation,
    ) -> Result<Vec<DataChange>, StoreError> {
        self.store.translate(&self.user, &self.device, &mutation)
    }

    pub fn download(&self, client_schema_version: u32) -> UpdateBatch {
        self.store
            .download_client_updates(&DownloadRequest::new(
                self.user.clone(),
                0,
                client_schema_version,
            ))
            .expect("download updates")
    }

    pub fn download_from(&self, request: DownloadRequest) -> UpdateBatch {
        self.store
            .download_client_updates(&request)
            .expect("download updates")
    }

    /// Every change-log entry of the fixture user.
    pub fn log(&self) -> Vec<DataChange> {
        self.store
            .scan_changes(&self.user, i64::MIN, None, None)
            .expect("scan change log")
    }
}

pub fn kinds(changes: &[DataChange]) -> Vec<(DataChangeType, Collection)> {
    changes
        .iter()
        .map(|change| (change.change_type, change.collection))
        .collect()
}

pub fn page(url: &str) -> Value {
    json!({ "url": url, "fullUrl": format!("https://{url}") })
}

pub fn titled_page(url: &str, title: &str) -> Value {
    json!({ "url": url, "fullUrl": format!("https://{url}"), "fullTitle": title })
}

pub fn visit(url: &str, time: i64, duration: i64) -> Value {
    json!({ "url": url, "time": time, "duration": duration })
}

pub fn annotation(page_url: &str, suffix: &str, body: &str) -> Value {
    json!({
        "url": format!("{page_url}{suffix}"),
        "pageUrl": page_url,
        "body": body,
        "createdWhen": 100,
        "lastEdited": 100,
        "privacyLevel": "private",
    })
}

pub fn tag(url: &str, name: &str) -> Value {
    json!({ "url": url, "name": name })
}

pub fn list(id: i64, name: &str) -> Value {
    json!({ "id": id, "name": name, "createdAt": 10 })
}

pub fn list_entry(list_id: i64, page_url: &str) -> Value {
    json!({
        "listId": list_id,
        "pageUrl": page_url,
        "fullUrl": format!("https://{page_url}"),
        "createdAt": 11,
    })
}
