//! Test fixtures and database helpers.
//!
//! Provides convenience functions for setting up test databases and the
//! canonical "people" schema used across the test suites.

use relaydb_core::{
    DatabaseHandle, DatabaseManager, Descriptor, IndexSpec, SchemaEditor, StoreSpec, UpgradeHook,
};
use serde_json::{json, Value};
use std::sync::{Arc, Once};

static TRACING: Once = Once::new();

/// Installs a tracing subscriber honoring `RUST_LOG`, once per process.
pub fn init_tracing() {
    TRACING.call_once(|| {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
            .with_test_writer()
            .try_init();
    });
}

/// Upgrade callback creating the canonical test schema: a `people` store
/// with an auto-increment `id` key and a unique `email` index.
pub fn people_schema() -> UpgradeHook {
    Box::new(|editor: &mut dyn SchemaEditor| {
        editor.create_store(StoreSpec::new("people").key_path("id").auto_increment(true))?;
        editor.create_index("people", IndexSpec::new("email", "email").unique(true))
    })
}

/// A record for the `people` store.
pub fn person(name: &str, email: &str) -> Value {
    json!({"name": name, "email": email})
}

/// Opens a fresh in-memory database with the people schema.
///
/// Returns the manager alongside the handle; dropping the manager closes
/// the handle.
pub async fn open_people_db(name: &str) -> (DatabaseManager, Arc<DatabaseHandle>) {
    init_tracing();
    let manager = DatabaseManager::in_memory();
    let handle = manager
        .open(&Descriptor::new(name), Some(people_schema()))
        .await
        .expect("failed to open people database");
    (manager, handle)
}
