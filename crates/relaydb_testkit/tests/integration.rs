//! End-to-end tests of the access layer over the in-memory engine.

use parking_lot::Mutex;
use relaydb_core::{
    CursorAction, DatabaseHandle, DatabaseManager, DbError, Descriptor, IndexQuery, Key, KeyRange,
    Order, SchemaEditor, StoreSpec,
};
use relaydb_testkit::prelude::*;
use serde_json::json;
use std::sync::Arc;

#[tokio::test]
async fn concurrent_opens_collapse_into_one_native_sequence() {
    init_tracing();
    let engine = CountingEngine::in_memory();
    let handle = Arc::new(DatabaseHandle::new(engine.clone(), "app"));

    let first = Arc::clone(&handle);
    let second = Arc::clone(&handle);
    let (a, b) = tokio::join!(
        first.open_database(Some(1), Some(people_schema())),
        second.open_database(Some(1), Some(people_schema())),
    );

    a.unwrap();
    b.unwrap();
    assert_eq!(engine.opens(), 1);
    assert!(handle.is_open());
    assert_eq!(handle.version(), Some(1));
}

#[tokio::test]
async fn auto_increment_keys_are_unique_and_strictly_increasing() {
    let (_manager, db) = open_people_db("app").await;

    let mut previous = None;
    for i in 0..8 {
        let key = db
            .add("people", person(&format!("p{i}"), &format!("{i}@x.com")), None)
            .await
            .unwrap();
        if let Some(previous) = previous {
            assert!(key > previous, "{key} should exceed {previous}");
        }
        previous = Some(key);
    }
}

#[tokio::test]
async fn deleting_an_absent_key_resolves() {
    let (_manager, db) = open_people_db("app").await;
    db.delete("people", 12345).await.unwrap();
}

#[tokio::test]
async fn update_is_read_back_through_the_same_handle() {
    let (_manager, db) = open_people_db("app").await;
    db.add("people", person("Dave", "d@x.com"), None)
        .await
        .unwrap();

    db.update(
        "people",
        json!({"id": 1, "name": "David", "email": "d@x.com"}),
        None,
    )
    .await
    .unwrap();

    let record = db.get_by_key("people", 1).await.unwrap().unwrap();
    assert_eq!(record["name"], json!("David"));
}

#[tokio::test]
async fn cursor_visits_only_the_range_in_ascending_order() {
    let (_manager, db) = open_people_db("app").await;
    for i in 0..6 {
        db.add("people", person(&format!("p{i}"), &format!("{i}@x.com")), None)
            .await
            .unwrap();
    }

    let visited = Arc::new(Mutex::new(Vec::new()));
    let visited_in_cb = Arc::clone(&visited);
    db.open_cursor("people", Some(KeyRange::bound(2, 4)), move |row| {
        visited_in_cb.lock().push(row.key);
        CursorAction::Advance
    })
    .await
    .unwrap();

    assert_eq!(*visited.lock(), vec![Key::Int(2), Key::Int(3), Key::Int(4)]);
}

#[tokio::test]
async fn people_scenario_from_first_open_to_constraint() {
    init_tracing();
    let manager = DatabaseManager::in_memory();
    let db = manager
        .open(&Descriptor::new("app"), Some(people_schema()))
        .await
        .unwrap();

    let key = db
        .add("people", person("Dave", "d@x.com"), None)
        .await
        .unwrap();
    assert_eq!(key, Key::Int(1));

    let record = db.get_by_key("people", 1).await.unwrap();
    assert_eq!(
        record,
        Some(json!({"id": 1, "name": "Dave", "email": "d@x.com"}))
    );

    let duplicate = db.add("people", person("Eve", "d@x.com"), None).await;
    assert!(matches!(duplicate, Err(DbError::Constraint { .. })));
}

#[tokio::test]
async fn clear_leaves_an_empty_store() {
    let (_manager, db) = open_people_db("app").await;
    for i in 0..3 {
        db.add("people", person(&format!("p{i}"), &format!("{i}@x.com")), None)
            .await
            .unwrap();
    }

    db.clear("people").await.unwrap();
    let records = db.get_all("people", None, None).await.unwrap();
    assert!(records.is_empty());
}

#[tokio::test]
async fn get_all_by_index_orders_over_index_keys() {
    let (_manager, db) = open_people_db("app").await;
    db.add("people", person("Dave", "d@x.com"), None)
        .await
        .unwrap();
    db.add("people", person("Al", "a@x.com"), None).await.unwrap();
    db.add("people", person("Eve", "e@x.com"), None).await.unwrap();

    let ascending = db
        .get_all("people", None, Some(IndexQuery::new("email")))
        .await
        .unwrap();
    let emails: Vec<_> = ascending.iter().map(|r| r["email"].clone()).collect();
    assert_eq!(
        emails,
        vec![json!("a@x.com"), json!("d@x.com"), json!("e@x.com")]
    );

    let descending = db
        .get_all(
            "people",
            Some(KeyRange::at_least("b@x.com")),
            Some(IndexQuery::new("email").order(Order::Desc)),
        )
        .await
        .unwrap();
    let emails: Vec<_> = descending.iter().map(|r| r["email"].clone()).collect();
    assert_eq!(emails, vec![json!("e@x.com"), json!("d@x.com")]);
}

#[tokio::test]
async fn unknown_store_and_index_surface_not_found_at_operation_time() {
    let (_manager, db) = open_people_db("app").await;

    assert!(matches!(
        db.get_by_key("ghosts", 1).await,
        Err(DbError::NotFound { .. })
    ));
    assert!(matches!(
        db.get_all("people", None, Some(IndexQuery::new("phone"))).await,
        Err(DbError::NotFound { .. })
    ));
}

#[tokio::test]
async fn manager_upgrades_and_rejects_downgrades() {
    let (manager, db) = open_people_db("app").await;

    let upgraded = manager
        .open(
            &Descriptor::new("app").version(2),
            Some(Box::new(|editor: &mut dyn SchemaEditor| {
                editor.create_store(StoreSpec::new("pets").auto_increment(true))
            })),
        )
        .await
        .unwrap();
    assert!(Arc::ptr_eq(&db, &upgraded));
    assert_eq!(db.version(), Some(2));
    assert!(db.store_names().unwrap().contains(&"pets".to_string()));

    let downgrade = manager.open(&Descriptor::new("app").version(1), None).await;
    assert!(matches!(
        downgrade,
        Err(DbError::Version {
            requested: 1,
            current: 2
        })
    ));
}

#[tokio::test]
async fn upgrade_blocked_by_a_foreign_connection_rejects_as_open_error() {
    init_tracing();
    let engine = CountingEngine::in_memory();

    // Two managers over one engine model two independent consumers.
    let first = DatabaseManager::new(engine.clone());
    let second = DatabaseManager::new(engine.clone());

    let _held = first
        .open(&Descriptor::new("app"), Some(people_schema()))
        .await
        .unwrap();

    let blocked = second.open(&Descriptor::new("app").version(2), None).await;
    assert!(matches!(blocked, Err(DbError::Open { .. })));
}

#[tokio::test]
async fn delete_database_then_reopen_starts_from_scratch() {
    let engine = CountingEngine::in_memory();
    let manager = DatabaseManager::new(engine.clone());

    let db = manager
        .open(&Descriptor::new("app"), Some(people_schema()))
        .await
        .unwrap();
    db.add("people", person("Dave", "d@x.com"), None)
        .await
        .unwrap();

    manager.delete_database("app").await.unwrap();
    assert_eq!(engine.deletes(), 1);

    let db = manager
        .open(&Descriptor::new("app"), Some(people_schema()))
        .await
        .unwrap();
    let records = db.get_all("people", None, None).await.unwrap();
    assert!(records.is_empty());
}

#[tokio::test]
async fn operations_against_an_open_handle_run_concurrently() {
    let (_manager, db) = open_people_db("app").await;
    for i in 0..4 {
        db.add("people", person(&format!("p{i}"), &format!("{i}@x.com")), None)
            .await
            .unwrap();
    }

    let reads = (1..=4).map(|i| {
        let db = Arc::clone(&db);
        tokio::spawn(async move { db.get_by_key("people", i).await })
    });
    for read in reads {
        assert!(read.await.unwrap().unwrap().is_some());
    }
}
