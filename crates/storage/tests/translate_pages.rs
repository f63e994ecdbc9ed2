#![forbid(unsafe_code)]

mod common;

use common::{Fixture, START, annotation, kinds, list, list_entry, page, tag, titled_page, visit};
use pc_core::{Collection, DataChangeType, LocalMutation, NaturalKey};
use pc_storage::StoreError;
use serde_json::json;

#[test]
fn page_create_writes_metadata_then_locator() {
    let mut fx = Fixture::new();
    let written = fx.translate(LocalMutation::create("pages", page("example.com/a")));

    assert_eq!(
        kinds(&written),
        vec![
            (DataChangeType::Create, Collection::ContentMetadata),
            (DataChangeType::Create, Collection::ContentLocator),
        ]
    );
    assert_eq!(written[0].log_id, 1);
    assert_eq!(written[1].log_id, 2);
    assert!(written.iter().all(|change| change.created_when == START));
    assert!(written.iter().all(|change| change.created_by_device == fx.device));
    assert!(written.iter().all(|change| change.info.is_none()));
    assert_eq!(fx.log(), written);
}

#[test]
fn title_update_emits_a_single_metadata_modify() {
    let mut fx = Fixture::new();
    fx.translate(LocalMutation::create("pages", page("example.com/a")));

    let written = fx.translate(LocalMutation::update(
        "pages",
        page("example.com/a"),
        titled_page("example.com/a", "A page"),
    ));
    assert_eq!(
        kinds(&written),
        vec![(DataChangeType::Modify, Collection::ContentMetadata)]
    );

    let unchanged = fx.translate(LocalMutation::update(
        "pages",
        titled_page("example.com/a", "A page"),
        titled_page("example.com/a", "A page"),
    ));
    assert!(unchanged.is_empty());
}

#[test]
fn full_url_update_modifies_the_locator() {
    let mut fx = Fixture::new();
    fx.translate(LocalMutation::create("pages", page("example.com/a")));

    let written = fx.translate(LocalMutation::update(
        "pages",
        page("example.com/a"),
        json!({ "url": "example.com/a", "fullUrl": "http://www.example.com/a?utm=1" }),
    ));
    assert_eq!(
        kinds(&written),
        vec![(DataChangeType::Modify, Collection::ContentLocator)]
    );
}

#[test]
fn changing_the_page_url_is_rejected_without_writes() {
    let mut fx = Fixture::new();
    fx.translate(LocalMutation::create("pages", page("example.com/a")));
    let before = fx.log().len();

    let err = fx
        .try_translate(LocalMutation::update(
            "pages",
            page("example.com/a"),
            page("example.com/b"),
        ))
        .expect_err("url change must fail");
    match err {
        StoreError::InvalidInput(msg) => assert_eq!(msg, "identity fields cannot be updated"),
        other => panic!("unexpected error: {other:?}"),
    }
    assert_eq!(fx.log().len(), before);
}

#[test]
fn creating_an_existing_page_again_writes_nothing() {
    let mut fx = Fixture::new();
    fx.translate(LocalMutation::create("pages", page("example.com/a")));

    let again = fx.translate(LocalMutation::create("pages", page("example.com/a")));
    assert!(again.is_empty());

    let retitled = fx.translate(LocalMutation::create(
        "pages",
        titled_page("example.com/a", "From another device"),
    ));
    assert_eq!(
        kinds(&retitled),
        vec![(DataChangeType::Modify, Collection::ContentMetadata)]
    );
}

#[test]
fn page_delete_removes_children_before_the_page() {
    let mut fx = Fixture::new();
    fx.translate(LocalMutation::create("pages", page("example.com/a")));
    fx.translate(LocalMutation::create("visits", visit("example.com/a", 1_000, 30)));
    let mut note = annotation("example.com/a", "/#1", "quote");
    note["selector"] = json!({ "quote": "quote" });
    fx.translate(LocalMutation::create("annotations", note));
    fx.translate(LocalMutation::create("tags", tag("example.com/a/#1", "later")));
    fx.translate(LocalMutation::create("tags", tag("example.com/a", "reading")));
    fx.translate(LocalMutation::create("customLists", list(7, "Inbox")));
    fx.translate(LocalMutation::create("pageListEntries", list_entry(7, "example.com/a")));

    let written = fx.translate(LocalMutation::delete("pages", page("example.com/a")));
    assert_eq!(
        kinds(&written),
        vec![
            (DataChangeType::Delete, Collection::TagConnection),
            (DataChangeType::Delete, Collection::AnnotationSelector),
            (DataChangeType::Delete, Collection::Annotation),
            (DataChangeType::Delete, Collection::TagConnection),
            (DataChangeType::Delete, Collection::ListEntry),
            (DataChangeType::Delete, Collection::ContentRead),
            (DataChangeType::Delete, Collection::ContentLocator),
            (DataChangeType::Delete, Collection::ContentMetadata),
        ]
    );

    let infos: Vec<_> = written
        .iter()
        .map(|change| change.info.clone().expect("delete carries info"))
        .collect();
    assert_eq!(
        infos[0],
        NaturalKey::TagConnection {
            url: "example.com/a/#1".to_string(),
            name: "later".to_string(),
        }
    );
    assert_eq!(
        infos[2],
        NaturalKey::Annotation {
            url: "example.com/a/#1".to_string(),
        }
    );
    assert_eq!(
        infos[4],
        NaturalKey::ListEntry {
            list_id: 7,
            page_url: "example.com/a".to_string(),
        }
    );
    assert_eq!(
        infos[5],
        NaturalKey::Visit {
            url: "example.com/a".to_string(),
            time: 1_000,
        }
    );
    assert_eq!(
        infos[7],
        NaturalKey::Content {
            normalized_url: "example.com/a".to_string(),
        }
    );

    // Tags and lists outlive the page.
    fx.store
        .resolve(&fx.user, &NaturalKey::Tag { name: "reading".to_string() })
        .expect("tag survives");
    fx.store
        .resolve(&fx.user, &NaturalKey::List { id: 7 })
        .expect("list survives");
    let err = fx
        .store
        .resolve(
            &fx.user,
            &NaturalKey::Content {
                normalized_url: "example.com/a".to_string(),
            },
        )
        .expect_err("page is gone");
    assert!(matches!(err, StoreError::MissingParent { .. }));
}

#[test]
fn deleting_a_missing_page_is_a_no_op() {
    let mut fx = Fixture::new();
    let written = fx.translate(LocalMutation::delete("pages", page("example.com/nowhere")));
    assert!(written.is_empty());
    assert!(fx.log().is_empty());
}

#[test]
fn a_deleted_page_can_be_created_again() {
    let mut fx = Fixture::new();
    let first = fx.translate(LocalMutation::create("pages", page("example.com/a")));
    fx.translate(LocalMutation::delete("pages", page("example.com/a")));
    let second = fx.translate(LocalMutation::create("pages", page("example.com/a")));

    assert_eq!(
        kinds(&second),
        vec![
            (DataChangeType::Create, Collection::ContentMetadata),
            (DataChangeType::Create, Collection::ContentLocator),
        ]
    );
    assert_ne!(first[0].object_id, second[0].object_id);
    assert_eq!(
        fx.store
            .natural_key(&fx.user, Collection::ContentMetadata, first[0].object_id)
            .expect("tombstone keeps its key"),
        NaturalKey::Content {
            normalized_url: "example.com/a".to_string(),
        }
    );
}
