//! Property-based tests over the key model and scan behavior.

use proptest::prelude::*;
use relaydb_core::{
    DatabaseHandle, DatabaseManager, Descriptor, Key, KeyRange, SchemaEditor, StoreSpec,
};
use relaydb_testkit::prelude::*;
use serde_json::json;
use std::cmp::Ordering;
use std::collections::BTreeSet;
use std::sync::Arc;

fn variant_rank(key: &Key) -> u8 {
    match key {
        Key::Int(_) => 0,
        Key::Text(_) => 1,
        Key::Bytes(_) => 2,
    }
}

proptest! {
    #[test]
    fn key_order_is_total_and_ranks_variants(a in key_strategy(), b in key_strategy()) {
        // Antisymmetry of the derived order.
        match a.cmp(&b) {
            Ordering::Less => prop_assert_eq!(b.cmp(&a), Ordering::Greater),
            Ordering::Greater => prop_assert_eq!(b.cmp(&a), Ordering::Less),
            Ordering::Equal => prop_assert_eq!(&a, &b),
        }
        // Cross-variant comparisons follow Int < Text < Bytes.
        if variant_rank(&a) != variant_rank(&b) {
            prop_assert_eq!(
                a.cmp(&b),
                variant_rank(&a).cmp(&variant_rank(&b))
            );
        }
    }

    #[test]
    fn range_contains_is_consistent_with_bounds(key in key_strategy(), range in key_range_strategy()) {
        // `only` ranges contain exactly their key.
        let only = KeyRange::only(key.clone());
        prop_assert!(only.contains(&key));
        // An unbounded range contains whatever any other range contains.
        if range.contains(&key) {
            prop_assert!(KeyRange::all().contains(&key));
        }
    }
}

fn scan_store() -> relaydb_core::UpgradeHook {
    Box::new(|editor: &mut dyn SchemaEditor| editor.create_store(StoreSpec::new("kv")))
}

async fn seeded_db(keys: &BTreeSet<i64>) -> (DatabaseManager, Arc<DatabaseHandle>) {
    let manager = DatabaseManager::in_memory();
    let db = manager
        .open(&Descriptor::new("scan"), Some(scan_store()))
        .await
        .expect("open scan database");
    for key in keys {
        db.add("kv", json!({"k": key}), Some(Key::Int(*key)))
            .await
            .expect("seed record");
    }
    (manager, db)
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(24))]

    #[test]
    fn get_all_agrees_with_range_contains(
        keys in prop::collection::btree_set(0i64..40, 0..20),
        lower in prop::option::of(0i64..40),
        upper in prop::option::of(0i64..40),
        lower_open in any::<bool>(),
        upper_open in any::<bool>(),
    ) {
        let mut range = match (lower, upper) {
            (Some(lower), Some(upper)) => KeyRange::bound(lower, upper),
            (Some(lower), None) => KeyRange::at_least(lower),
            (None, Some(upper)) => KeyRange::at_most(upper),
            (None, None) => KeyRange::all(),
        };
        if lower_open {
            range = range.lower_open();
        }
        if upper_open {
            range = range.upper_open();
        }

        let expected: Vec<i64> = keys
            .iter()
            .copied()
            .filter(|k| range.contains(&Key::Int(*k)))
            .collect();

        let rt = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .expect("build runtime");
        let scanned: Vec<i64> = rt.block_on(async {
            let (_manager, db) = seeded_db(&keys).await;
            db.get_all("kv", Some(range), None)
                .await
                .expect("scan")
                .iter()
                .map(|record| record["k"].as_i64().expect("int key field"))
                .collect()
        });

        prop_assert_eq!(scanned, expected);
    }

    #[test]
    fn auto_keys_strictly_increase_across_interleaved_adds(batches in prop::collection::vec(1usize..5, 1..4)) {
        let rt = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .expect("build runtime");
        let keys: Vec<Key> = rt.block_on(async {
            let (_manager, db) = open_people_db("prop").await;
            let mut keys = Vec::new();
            for (batch, count) in batches.iter().enumerate() {
                for i in 0..*count {
                    let key = db
                        .add("people", person(&format!("p{batch}-{i}"), &format!("{batch}-{i}@x.com")), None)
                        .await
                        .expect("add");
                    keys.push(key);
                }
                // Deletes between batches must not make the generator reuse keys.
                if let Some(last) = keys.last().cloned() {
                    db.delete("people", last).await.expect("delete");
                }
            }
            keys
        });

        for pair in keys.windows(2) {
            prop_assert!(pair[0] < pair[1], "{} should precede {}", pair[0], pair[1]);
        }
    }
}
