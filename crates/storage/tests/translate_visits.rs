#![forbid(unsafe_code)]

mod common;

use common::{Fixture, kinds, page, visit};
use pc_core::{Collection, DataChangeType, LocalMutation, NaturalKey};
use pc_storage::StoreError;
use serde_json::json;

#[test]
fn visit_needs_its_page() {
    let mut fx = Fixture::new();
    let err = fx
        .try_translate(LocalMutation::create("visits", visit("example.com/a", 1, 5)))
        .expect_err("visit without a page");
    match err {
        StoreError::MissingParent { collection, key } => {
            assert_eq!(collection, Collection::ContentMetadata);
            assert_eq!(key, "example.com/a");
        }
        other => panic!("unexpected error: {other:?}"),
    }
    assert!(fx.log().is_empty());
}

#[test]
fn visit_lifecycle() {
    let mut fx = Fixture::new();
    fx.translate(LocalMutation::create("pages", page("example.com/a")));

    let created = fx.translate(LocalMutation::create("visits", visit("example.com/a", 1_000, 5)));
    assert_eq!(
        kinds(&created),
        vec![(DataChangeType::Create, Collection::ContentRead)]
    );

    let modified = fx.translate(LocalMutation::update(
        "visits",
        visit("example.com/a", 1_000, 5),
        json!({ "url": "example.com/a", "time": 1_000, "duration": 40, "scrollMaxPerc": 0.5 }),
    ));
    assert_eq!(
        kinds(&modified),
        vec![(DataChangeType::Modify, Collection::ContentRead)]
    );
    assert_eq!(modified[0].object_id, created[0].object_id);

    let same = fx.translate(LocalMutation::update(
        "visits",
        visit("example.com/a", 1_000, 40),
        visit("example.com/a", 1_000, 40),
    ));
    assert!(same.is_empty());

    let deleted = fx.translate(LocalMutation::delete("visits", visit("example.com/a", 1_000, 40)));
    assert_eq!(
        kinds(&deleted),
        vec![(DataChangeType::Delete, Collection::ContentRead)]
    );
    assert_eq!(
        deleted[0].info,
        Some(NaturalKey::Visit {
            url: "example.com/a".to_string(),
            time: 1_000,
        })
    );

    let again = fx.translate(LocalMutation::delete("visits", visit("example.com/a", 1_000, 40)));
    assert!(again.is_empty());
}

#[test]
fn two_visits_of_one_page_are_distinct_reads() {
    let mut fx = Fixture::new();
    fx.translate(LocalMutation::create("pages", page("example.com/a")));
    let first = fx.translate(LocalMutation::create("visits", visit("example.com/a", 1, 5)));
    let second = fx.translate(LocalMutation::create("visits", visit("example.com/a", 2, 5)));
    assert_ne!(first[0].object_id, second[0].object_id);

    let err = fx
        .try_translate(LocalMutation::update(
            "visits",
            visit("example.com/a", 1, 5),
            visit("example.com/a", 3, 5),
        ))
        .expect_err("time is part of the key");
    assert!(matches!(err, StoreError::InvalidInput(_)));
}
