#![forbid(unsafe_code)]

mod common;

use common::{Fixture, kinds, page};
use pc_core::{
    Collection, DataChange, DataChangeType, DeviceId, EntityId, LocalMutation, NaturalKey, UserId,
};
use pc_storage::{ManualClock, SqliteStore};

fn append(fx: &mut Fixture, user: &UserId, at: i64) -> (i64, i64) {
    fx.clock.set(at);
    let change = fx
        .store
        .append_change(
            user,
            &fx.device,
            DataChangeType::Create,
            Collection::ContentMetadata,
            EntityId::new(1),
            None,
        )
        .expect("append change");
    (change.created_when, change.log_id)
}

#[test]
fn scan_orders_by_time_then_log_id() {
    let mut fx = Fixture::new();
    let user = fx.user.clone();
    assert_eq!(append(&mut fx, &user, 100), (100, 1));
    // A writer with a lagging clock lands right after earlier entries.
    assert_eq!(append(&mut fx, &user, 50), (101, 2));
    assert_eq!(append(&mut fx, &user, 200), (200, 3));

    let all: Vec<_> = fx.log().iter().map(|c| (c.created_when, c.log_id)).collect();
    assert_eq!(all, vec![(100, 1), (101, 2), (200, 3)]);

    let ids = |after_time, after_log_id, limit| -> Vec<i64> {
        fx.store
            .scan_changes(&user, after_time, after_log_id, limit)
            .expect("scan")
            .iter()
            .map(|change| change.log_id)
            .collect()
    };
    assert_eq!(ids(101, Some(1), None), vec![2, 3]);
    assert_eq!(ids(101, Some(2), None), vec![3]);
    assert_eq!(ids(101, None, None), vec![3]);
    assert_eq!(ids(100, None, None), vec![2, 3]);
    assert_eq!(ids(0, None, Some(1)), vec![1]);
    assert_eq!(ids(200, Some(3), None), Vec::<i64>::new());
}

#[test]
fn each_user_has_its_own_sequence() {
    let mut fx = Fixture::new();
    let user = fx.user.clone();
    let other = UserId::try_new("other-user").expect("user id");
    append(&mut fx, &user, 10);
    append(&mut fx, &user, 11);
    assert_eq!(append(&mut fx, &other, 12), (12, 1));
    assert_eq!(fx.log().len(), 2);
}

#[test]
fn delete_info_is_stored_with_the_entry() {
    let mut fx = Fixture::new();
    let key = NaturalKey::Visit {
        url: "example.com/a".to_string(),
        time: 9,
    };
    let user = fx.user.clone();
    let device = fx.device.clone();
    fx.store
        .append_change(
            &user,
            &device,
            DataChangeType::Delete,
            Collection::ContentRead,
            EntityId::new(4),
            Some(key.clone()),
        )
        .expect("append delete");
    let scanned = fx.log();
    assert_eq!(scanned.len(), 1);
    assert_eq!(scanned[0].info, Some(key));
    assert_eq!(scanned[0].change_type, DataChangeType::Delete);
}

#[test]
fn concurrent_writers_get_distinct_increasing_log_ids() {
    const WRITERS: usize = 4;
    const PAGES: usize = 10;

    let fx = Fixture::new();
    let stores: Vec<SqliteStore> = (0..WRITERS)
        .map(|_| SqliteStore::open(fx.path()).expect("open writer"))
        .collect();

    let threads: Vec<_> = stores
        .into_iter()
        .enumerate()
        .map(|(writer, mut store)| {
            let user = fx.user.clone();
            std::thread::spawn(move || {
                let device = DeviceId::try_new(format!("device-{writer}")).expect("device id");
                for n in 0..PAGES {
                    let url = format!("w{writer}.example.com/{n}");
                    store
                        .translate(&user, &device, &LocalMutation::create("pages", page(&url)))
                        .expect("translate page");
                }
            })
        })
        .collect();
    for thread in threads {
        thread.join().expect("writer thread");
    }

    let log = fx.log();
    assert_eq!(log.len(), WRITERS * PAGES * 2);
    for (index, change) in log.iter().enumerate() {
        assert_eq!(change.log_id, index as i64 + 1);
    }
    assert!(log.windows(2).all(|pair| pair[0].created_when <= pair[1].created_when));
    // Entries of different translations never share a time.
    assert!(log.chunks(2).collect::<Vec<_>>().windows(2).all(|pair| {
        pair[0][1].created_when < pair[1][0].created_when
    }));
    // A translation's entries are never interleaved with another writer's.
    for pair in log.chunks(2) {
        assert_eq!(pair[0].collection, Collection::ContentMetadata);
        assert_eq!(pair[1].collection, Collection::ContentLocator);
        assert_eq!(pair[0].created_by_device, pair[1].created_by_device);
    }
}

#[test]
fn writes_under_a_stuck_clock_get_distinct_times() {
    let mut fx = Fixture::with_clock(ManualClock::fixed(1_000));
    let first = fx.translate(LocalMutation::create("pages", page("example.com/a")));
    let second = fx.translate(LocalMutation::create("pages", page("example.com/b")));
    assert_eq!(
        kinds(&second),
        vec![
            (DataChangeType::Create, Collection::ContentMetadata),
            (DataChangeType::Create, Collection::ContentLocator),
        ]
    );

    let times = |changes: &[DataChange]| -> Vec<i64> {
        changes.iter().map(|change| change.created_when).collect()
    };
    assert_eq!(times(&first), vec![1_000, 1_000]);
    assert_eq!(times(&second), vec![1_001, 1_001]);
}
