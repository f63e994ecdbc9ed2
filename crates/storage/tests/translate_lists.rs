#![forbid(unsafe_code)]

mod common;

use common::{Fixture, kinds, list, list_entry, page};
use pc_core::{Collection, DataChangeType, LocalMutation, NaturalKey};
use pc_storage::StoreError;
use serde_json::json;

#[test]
fn list_lifecycle() {
    let mut fx = Fixture::new();
    let created = fx.translate(LocalMutation::create("customLists", list(3, "Reading")));
    assert_eq!(kinds(&created), vec![(DataChangeType::Create, Collection::List)]);

    let renamed = fx.translate(LocalMutation::update(
        "customLists",
        list(3, "Reading"),
        list(3, "Read later"),
    ));
    assert_eq!(kinds(&renamed), vec![(DataChangeType::Modify, Collection::List)]);

    fx.translate(LocalMutation::create("pages", page("example.com/a")));
    fx.translate(LocalMutation::create("pages", page("example.com/b")));
    fx.translate(LocalMutation::create("pageListEntries", list_entry(3, "example.com/a")));
    fx.translate(LocalMutation::create("pageListEntries", list_entry(3, "example.com/b")));

    let deleted = fx.translate(LocalMutation::delete("customLists", list(3, "Read later")));
    assert_eq!(
        kinds(&deleted),
        vec![
            (DataChangeType::Delete, Collection::ListEntry),
            (DataChangeType::Delete, Collection::ListEntry),
            (DataChangeType::Delete, Collection::List),
        ]
    );
    assert_eq!(deleted[2].info, Some(NaturalKey::List { id: 3 }));
    assert_eq!(
        deleted[1].info,
        Some(NaturalKey::ListEntry {
            list_id: 3,
            page_url: "example.com/b".to_string(),
        })
    );
}

#[test]
fn entries_need_a_list_and_a_page() {
    let mut fx = Fixture::new();
    fx.translate(LocalMutation::create("pages", page("example.com/a")));

    let err = fx
        .try_translate(LocalMutation::create("pageListEntries", list_entry(9, "example.com/a")))
        .expect_err("list is missing");
    match err {
        StoreError::MissingParent { collection, key } => {
            assert_eq!(collection, Collection::List);
            assert_eq!(key, "9");
        }
        other => panic!("unexpected error: {other:?}"),
    }

    fx.translate(LocalMutation::create("customLists", list(9, "Later")));
    let err = fx
        .try_translate(LocalMutation::create("pageListEntries", list_entry(9, "example.com/b")))
        .expect_err("page is missing");
    assert!(matches!(
        err,
        StoreError::MissingParent {
            collection: Collection::ContentMetadata,
            ..
        }
    ));

    let created = fx.translate(LocalMutation::create(
        "pageListEntries",
        list_entry(9, "example.com/a"),
    ));
    assert_eq!(
        kinds(&created),
        vec![(DataChangeType::Create, Collection::ListEntry)]
    );
    let duplicate = fx.translate(LocalMutation::create(
        "pageListEntries",
        list_entry(9, "example.com/a"),
    ));
    assert!(duplicate.is_empty());
}

#[test]
fn entry_keys_are_immutable() {
    let mut fx = Fixture::new();
    fx.translate(LocalMutation::create("pages", page("example.com/a")));
    fx.translate(LocalMutation::create("customLists", list(1, "One")));
    fx.translate(LocalMutation::create("pageListEntries", list_entry(1, "example.com/a")));

    let mut moved = list_entry(1, "example.com/a");
    moved["listId"] = json!(2);
    let err = fx
        .try_translate(LocalMutation::update(
            "pageListEntries",
            list_entry(1, "example.com/a"),
            moved,
        ))
        .expect_err("list id is a key");
    assert!(matches!(err, StoreError::InvalidInput(_)));

    let mut touched = list_entry(1, "example.com/a");
    touched["createdAt"] = json!(99);
    let written = fx.translate(LocalMutation::update(
        "pageListEntries",
        list_entry(1, "example.com/a"),
        touched,
    ));
    assert!(written.is_empty());

    let err = fx
        .try_translate(LocalMutation::update("customLists", list(1, "One"), list(2, "One")))
        .expect_err("list id is a key");
    assert!(matches!(err, StoreError::InvalidInput(_)));
}
