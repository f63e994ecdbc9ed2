#![forbid(unsafe_code)]

mod common;

use common::{Fixture, annotation, page};
use pc_core::{ClientUpdate, Collection, LocalCollection, LocalMutation, LocalReplica};
use pc_storage::{CLIENT_SCHEMA_V25, DownloadRequest, StoreError};
use serde_json::json;

#[test]
fn purged_deletes_still_download_from_their_snapshot() {
    let mut fx = Fixture::new();
    let created = fx.translate(LocalMutation::create("pages", page("example.com/a")));
    fx.translate(LocalMutation::create("pages", page("example.com/b")));
    fx.translate(LocalMutation::delete("pages", page("example.com/a")));
    let deleted_at = fx.log().last().expect("delete entry").created_when;

    let user = fx.user.clone();
    assert_eq!(fx.store.purge_tombstones(&user, deleted_at).expect("purge"), 0);
    assert_eq!(
        fx.store.purge_tombstones(&user, deleted_at + 1).expect("purge"),
        2
    );

    let err = fx
        .store
        .natural_key(&fx.user, Collection::ContentMetadata, created[0].object_id)
        .expect_err("row is gone");
    assert!(matches!(err, StoreError::InvalidInput(_)));

    let batch = fx.download(CLIENT_SCHEMA_V25);
    assert_eq!(
        batch.batch,
        vec![
            ClientUpdate::Overwrite {
                collection: LocalCollection::Pages,
                object: page("example.com/b"),
            },
            ClientUpdate::Delete {
                collection: LocalCollection::Pages,
                criteria: json!({ "url": "example.com/a" }),
            },
        ]
    );
    // The change log itself is never purged.
    assert_eq!(fx.log().len(), 6);
}

#[test]
fn removed_selector_still_reaches_devices_after_purge() {
    let mut fx = Fixture::new();
    fx.translate(LocalMutation::create("pages", page("example.com/a")));
    let mut anchored = annotation("example.com/a", "/#1", "x");
    anchored["selector"] = json!({ "quote": "x" });
    fx.translate(LocalMutation::create("annotations", anchored.clone()));

    let mut device = LocalReplica::new();
    let first = fx.download(CLIENT_SCHEMA_V25);
    device.apply_all(&first.batch).expect("apply first download");
    let checkpoint = first.checkpoint.expect("checkpoint");

    let plain = annotation("example.com/a", "/#1", "x");
    fx.translate(LocalMutation::update("annotations", anchored, plain.clone()));
    let removed_at = fx.log().last().expect("selector delete").created_when;
    let user = fx.user.clone();
    assert_eq!(
        fx.store.purge_tombstones(&user, removed_at + 1).expect("purge"),
        1
    );

    let next = fx.download_from(DownloadRequest::resume(
        fx.user.clone(),
        checkpoint,
        CLIENT_SCHEMA_V25,
    ));
    assert_eq!(
        next.batch,
        vec![ClientUpdate::Overwrite {
            collection: LocalCollection::Annotations,
            object: plain.clone(),
        }]
    );
    device.apply_all(&next.batch).expect("apply second download");

    let mut expected = LocalReplica::new();
    expected
        .apply_mutation(&LocalMutation::create("pages", page("example.com/a")))
        .expect("page");
    expected
        .apply_mutation(&LocalMutation::create("annotations", plain))
        .expect("annotation");
    assert_eq!(device, expected);
}
