//! Database handle: open/upgrade sequencing and the store operation set.

use crate::bridge::bridge;
use crate::cursor::{BridgedCursor, CursorRow};
use crate::descriptor::DEFAULT_VERSION;
use crate::error::{DbError, DbResult};
use parking_lot::Mutex;
use relaydb_engine::{
    CursorAction, EngineConnection, IndexQuery, Key, KeyRange, Operation, Order, Outcome,
    SchemaEditor, StorageEngine, UpgradeHook,
};
use serde_json::Value;
use std::sync::Arc;
use tracing::{debug, trace};

/// Lifecycle states of a database handle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HandleState {
    /// No connection; the initial state, and the state after `close`.
    Closed,
    /// An open sequence is in flight.
    Opening,
    /// The upgrade callback is running inside the open sequence.
    Upgrading,
    /// A live connection is held; operations are accepted.
    Open,
    /// The connection died underneath the handle. A fresh `open_database`
    /// starts over from here.
    Errored,
}

struct Shared {
    state: HandleState,
    version: u32,
    conn: Option<Arc<dyn EngineConnection>>,
}

/// A handle to one named, versioned database.
///
/// The handle owns its engine connection exclusively and is the only entry
/// point for operations against it. It is `Send + Sync`; clones of the
/// surrounding `Arc` may issue operations concurrently - each operation runs
/// in its own engine transaction. Only the open/upgrade sequence is
/// serialized.
///
/// # Example
///
/// ```rust,ignore
/// let handle = manager.open(&Descriptor::new("app"), Some(upgrade)).await?;
/// let key = handle.add("people", person, None).await?;
/// let record = handle.get_by_key("people", key).await?;
/// ```
pub struct DatabaseHandle {
    name: String,
    engine: Arc<dyn StorageEngine>,
    shared: Arc<Mutex<Shared>>,
    open_lock: tokio::sync::Mutex<()>,
}

impl DatabaseHandle {
    /// Creates a closed handle for the named database.
    #[must_use]
    pub fn new(engine: Arc<dyn StorageEngine>, name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            engine,
            shared: Arc::new(Mutex::new(Shared {
                state: HandleState::Closed,
                version: 0,
                conn: None,
            })),
            open_lock: tokio::sync::Mutex::new(()),
        }
    }

    /// The database name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The current lifecycle state.
    #[must_use]
    pub fn state(&self) -> HandleState {
        self.shared.lock().state
    }

    /// Whether the handle currently holds a live connection.
    #[must_use]
    pub fn is_open(&self) -> bool {
        self.state() == HandleState::Open
    }

    /// The open schema version, if the handle is open.
    #[must_use]
    pub fn version(&self) -> Option<u32> {
        let shared = self.shared.lock();
        (shared.state == HandleState::Open).then_some(shared.version)
    }

    /// Opens (or upgrades) the database.
    ///
    /// With no connection, a native open sequence runs for the requested
    /// version (default 1); if it exceeds the stored schema version, the
    /// `upgrade` callback is invoked synchronously inside the engine's
    /// upgrade notification with a schema editor valid only for that scope.
    ///
    /// Only one open sequence runs at a time per handle: a concurrent call
    /// waits and then observes the already-open state instead of racing a
    /// second native open. Requesting a version above the open one releases
    /// the connection and re-runs the sequence; requesting a lower version
    /// rejects with [`DbError::Version`].
    ///
    /// # Errors
    ///
    /// [`DbError::Version`] on a downgrade, [`DbError::Open`] on any native
    /// open/upgrade failure (including blocked-by-other-connections).
    pub async fn open_database(
        &self,
        version: Option<u32>,
        upgrade: Option<UpgradeHook>,
    ) -> DbResult<()> {
        let requested = version.unwrap_or(DEFAULT_VERSION);
        if self.already_satisfied(requested)? {
            return Ok(());
        }

        let _guard = self.open_lock.lock().await;
        // A caller queued behind a completed sequence sees its result here.
        if self.already_satisfied(requested)? {
            return Ok(());
        }

        {
            let mut shared = self.shared.lock();
            // Release our own connection first: an upgrade cannot start
            // while it is still open.
            if let Some(conn) = shared.conn.take() {
                conn.close();
            }
            shared.state = HandleState::Opening;
        }
        debug!(name = %self.name, version = requested, "opening database");

        let shared_for_hook = Arc::clone(&self.shared);
        let hook: UpgradeHook = Box::new(move |editor: &mut dyn SchemaEditor| {
            shared_for_hook.lock().state = HandleState::Upgrading;
            let result = match upgrade {
                Some(callback) => callback(editor),
                None => Ok(()),
            };
            shared_for_hook.lock().state = HandleState::Opening;
            result
        });

        let (notify, fut) = bridge::<Box<dyn EngineConnection>>();
        self.engine.open(&self.name, requested, hook, notify);

        match fut.settled().await {
            Ok(conn) => {
                let mut shared = self.shared.lock();
                shared.version = conn.version();
                shared.conn = Some(Arc::from(conn));
                shared.state = HandleState::Open;
                debug!(name = %self.name, version = shared.version, "database open");
                Ok(())
            }
            Err(error) => {
                let mut shared = self.shared.lock();
                shared.conn = None;
                shared.state = HandleState::Closed;
                drop(shared);
                Err(match error {
                    version @ DbError::Version { .. } => version,
                    open @ DbError::Open { .. } => open,
                    other => DbError::open(other.to_string()),
                })
            }
        }
    }

    fn already_satisfied(&self, requested: u32) -> DbResult<bool> {
        let shared = self.shared.lock();
        if shared.state == HandleState::Open {
            let current = shared.version;
            if requested < current {
                return Err(DbError::Version { requested, current });
            }
            if requested == current {
                return Ok(true);
            }
        }
        Ok(false)
    }

    /// Closes the handle's connection, if any. Idempotent.
    pub fn close(&self) {
        let mut shared = self.shared.lock();
        if let Some(conn) = shared.conn.take() {
            conn.close();
            debug!(name = %self.name, "database handle closed");
        }
        shared.state = HandleState::Closed;
    }

    /// Names of the object stores in the open schema.
    ///
    /// # Errors
    ///
    /// [`DbError::NotOpen`] if the handle is not open.
    pub fn store_names(&self) -> DbResult<Vec<String>> {
        Ok(self.connection()?.store_names())
    }

    /// Fetches a single record by primary key, or `None` if absent.
    pub async fn get_by_key(&self, store: &str, key: impl Into<Key>) -> DbResult<Option<Value>> {
        let outcome = self
            .request(Operation::Get {
                store: store.into(),
                key: key.into(),
            })
            .await?;
        match outcome {
            Outcome::Record(record) => Ok(record),
            other => Err(unexpected_outcome(&other)),
        }
    }

    /// Fetches all matching records, eagerly materialized and ordered.
    ///
    /// Without an index query the scan runs over primary keys in ascending
    /// order and `range` bounds those keys. With one, the scan runs over the
    /// index in the query's order and `range` bounds index keys instead.
    pub async fn get_all(
        &self,
        store: &str,
        range: Option<KeyRange>,
        index: Option<IndexQuery>,
    ) -> DbResult<Vec<Value>> {
        let outcome = self
            .request(Operation::GetAll {
                store: store.into(),
                range,
                index,
            })
            .await?;
        match outcome {
            Outcome::Records(records) => Ok(records),
            other => Err(unexpected_outcome(&other)),
        }
    }

    /// Fetches a single record through an index, or `None` if no record
    /// carries the index key.
    pub async fn get_by_index(
        &self,
        store: &str,
        index: &str,
        key: impl Into<Key>,
    ) -> DbResult<Option<Value>> {
        let outcome = self
            .request(Operation::GetByIndex {
                store: store.into(),
                index: index.into(),
                key: key.into(),
            })
            .await?;
        match outcome {
            Outcome::Record(record) => Ok(record),
            other => Err(unexpected_outcome(&other)),
        }
    }

    /// Inserts a record, resolving with its generated or supplied key.
    ///
    /// Omit `key` for stores with in-line keys or an auto-increment
    /// generator.
    ///
    /// # Errors
    ///
    /// [`DbError::Constraint`] on a key collision or unique-index violation.
    pub async fn add(&self, store: &str, value: Value, key: Option<Key>) -> DbResult<Key> {
        let outcome = self
            .request(Operation::Add {
                store: store.into(),
                value,
                key,
            })
            .await?;
        match outcome {
            Outcome::Key(key) => Ok(key),
            other => Err(unexpected_outcome(&other)),
        }
    }

    /// Inserts or overwrites a record.
    ///
    /// When `key` is omitted the record must carry the store's key field;
    /// a record with neither is rejected with [`DbError::Constraint`]
    /// rather than silently inserted under a fresh key.
    pub async fn update(&self, store: &str, value: Value, key: Option<Key>) -> DbResult<()> {
        let outcome = self
            .request(Operation::Put {
                store: store.into(),
                value,
                key,
            })
            .await?;
        match outcome {
            Outcome::Done => Ok(()),
            other => Err(unexpected_outcome(&other)),
        }
    }

    /// Deletes a record by primary key. Deleting an absent key succeeds.
    pub async fn delete(&self, store: &str, key: impl Into<Key>) -> DbResult<()> {
        let outcome = self
            .request(Operation::Delete {
                store: store.into(),
                key: key.into(),
            })
            .await?;
        match outcome {
            Outcome::Done => Ok(()),
            other => Err(unexpected_outcome(&other)),
        }
    }

    /// Removes every record from the store. The store's key generator is
    /// not reset.
    pub async fn clear(&self, store: &str) -> DbResult<()> {
        let outcome = self
            .request(Operation::Clear {
                store: store.into(),
            })
            .await?;
        match outcome {
            Outcome::Done => Ok(()),
            other => Err(unexpected_outcome(&other)),
        }
    }

    /// Iterates the store in ascending key order, optionally bounded by
    /// `range`, invoking `per_row` once per record.
    ///
    /// The callback runs synchronously inside each cursor-advance
    /// notification - never batched, never reordered - and steers the
    /// cursor through its returned [`CursorAction`]. The future resolves
    /// once the cursor is exhausted or stopped early, and rejects on any
    /// native cursor error.
    pub async fn open_cursor<F>(
        &self,
        store: &str,
        range: Option<KeyRange>,
        per_row: F,
    ) -> DbResult<()>
    where
        F: FnMut(CursorRow) -> CursorAction + Send + 'static,
    {
        let conn = self.connection()?;
        trace!(store, "opening cursor");
        let (sink, fut) = BridgedCursor::bridged(per_row);
        conn.open_cursor(store, range, Order::Asc, sink);
        fut.settled().await
    }

    /// Issues one operation in its own transaction scope and awaits the
    /// bridged outcome.
    async fn request(&self, operation: Operation) -> DbResult<Outcome> {
        let conn = self.connection()?;
        let mode = operation.mode();
        trace!(store = operation.store(), ?mode, "submitting request");
        let (notify, fut) = bridge::<Outcome>();
        conn.submit(mode, operation, notify);
        fut.settled().await
    }

    /// Fails fast with `NotOpen` unless a live connection is held. A
    /// connection the engine closed underneath us flips the handle to
    /// `Errored`.
    fn connection(&self) -> DbResult<Arc<dyn EngineConnection>> {
        let mut shared = self.shared.lock();
        match shared.state {
            HandleState::Open => match &shared.conn {
                Some(conn) if !conn.is_closed() => Ok(Arc::clone(conn)),
                _ => {
                    shared.conn = None;
                    shared.state = HandleState::Errored;
                    Err(DbError::NotOpen)
                }
            },
            _ => Err(DbError::NotOpen),
        }
    }
}

fn unexpected_outcome(outcome: &Outcome) -> DbError {
    DbError::transaction(format!("engine returned a mismatched outcome: {outcome:?}"))
}

impl std::fmt::Debug for DatabaseHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DatabaseHandle")
            .field("name", &self.name)
            .field("state", &self.state())
            .finish_non_exhaustive()
    }
}

impl Drop for DatabaseHandle {
    fn drop(&mut self) {
        self.close();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use relaydb_engine::{IndexSpec, MemoryEngine, SchemaEditor, StoreSpec};
    use serde_json::json;

    fn handle(name: &str) -> DatabaseHandle {
        DatabaseHandle::new(Arc::new(MemoryEngine::new()), name)
    }

    fn people_schema() -> UpgradeHook {
        Box::new(|editor: &mut dyn SchemaEditor| {
            editor.create_store(StoreSpec::new("people").key_path("id").auto_increment(true))?;
            editor.create_index("people", IndexSpec::new("email", "email").unique(true))
        })
    }

    async fn open_people(name: &str) -> DatabaseHandle {
        let handle = handle(name);
        handle
            .open_database(Some(1), Some(people_schema()))
            .await
            .unwrap();
        handle
    }

    #[tokio::test]
    async fn operations_fail_fast_before_open() {
        let handle = handle("app");
        assert!(matches!(
            handle.get_by_key("people", 1).await,
            Err(DbError::NotOpen)
        ));
        assert!(matches!(
            handle.add("people", json!({}), None).await,
            Err(DbError::NotOpen)
        ));
        assert!(matches!(handle.store_names(), Err(DbError::NotOpen)));
    }

    #[tokio::test]
    async fn open_defaults_to_version_one() {
        let handle = handle("app");
        handle.open_database(None, None).await.unwrap();
        assert_eq!(handle.version(), Some(1));
        assert_eq!(handle.state(), HandleState::Open);
    }

    #[tokio::test]
    async fn reopen_at_same_version_is_a_no_op() {
        let handle = open_people("app").await;
        handle.open_database(Some(1), None).await.unwrap();
        assert_eq!(handle.version(), Some(1));
    }

    #[tokio::test]
    async fn downgrade_is_a_version_error() {
        let handle = handle("app");
        handle.open_database(Some(3), None).await.unwrap();
        let result = handle.open_database(Some(2), None).await;
        assert!(matches!(
            result,
            Err(DbError::Version {
                requested: 2,
                current: 3
            })
        ));
        // The original connection survives a rejected downgrade.
        assert_eq!(handle.version(), Some(3));
    }

    #[tokio::test]
    async fn upgrade_to_higher_version_extends_the_schema() {
        let handle = open_people("app").await;
        handle
            .open_database(
                Some(2),
                Some(Box::new(|editor: &mut dyn SchemaEditor| {
                    assert_eq!(editor.old_version(), 1);
                    assert_eq!(editor.new_version(), 2);
                    editor.create_store(StoreSpec::new("pets").auto_increment(true))
                })),
            )
            .await
            .unwrap();
        assert_eq!(handle.version(), Some(2));
        assert_eq!(
            handle.store_names().unwrap(),
            vec!["people".to_string(), "pets".to_string()]
        );
    }

    #[tokio::test]
    async fn failed_upgrade_leaves_handle_closed_and_retryable() {
        let handle = handle("app");
        let result = handle
            .open_database(
                Some(1),
                Some(Box::new(|_editor: &mut dyn SchemaEditor| {
                    Err(relaydb_engine::EngineError::internal("schema bug"))
                })),
            )
            .await;
        assert!(matches!(result, Err(DbError::Open { .. })));
        assert_eq!(handle.state(), HandleState::Closed);

        handle
            .open_database(Some(1), Some(people_schema()))
            .await
            .unwrap();
        assert!(handle.is_open());
    }

    #[tokio::test]
    async fn add_then_get_round_trips() {
        let handle = open_people("app").await;
        let key = handle
            .add("people", json!({"name": "Dave", "email": "d@x.com"}), None)
            .await
            .unwrap();
        assert_eq!(key, Key::Int(1));

        let record = handle.get_by_key("people", key).await.unwrap();
        assert_eq!(
            record,
            Some(json!({"id": 1, "name": "Dave", "email": "d@x.com"}))
        );
    }

    #[tokio::test]
    async fn update_is_visible_to_the_next_read() {
        let handle = open_people("app").await;
        handle
            .add("people", json!({"name": "Dave", "email": "d@x.com"}), None)
            .await
            .unwrap();

        handle
            .update(
                "people",
                json!({"id": 1, "name": "David", "email": "d@x.com"}),
                None,
            )
            .await
            .unwrap();

        let record = handle.get_by_key("people", 1).await.unwrap().unwrap();
        assert_eq!(record["name"], json!("David"));
    }

    #[tokio::test]
    async fn get_by_index_finds_and_misses() {
        let handle = open_people("app").await;
        handle
            .add("people", json!({"name": "Dave", "email": "d@x.com"}), None)
            .await
            .unwrap();

        let found = handle
            .get_by_index("people", "email", "d@x.com")
            .await
            .unwrap();
        assert_eq!(found.unwrap()["name"], json!("Dave"));

        let missing = handle
            .get_by_index("people", "email", "nobody@x.com")
            .await
            .unwrap();
        assert!(missing.is_none());
    }

    #[tokio::test]
    async fn cursor_stops_early_on_request() {
        let handle = open_people("app").await;
        for i in 0..4 {
            handle
                .add(
                    "people",
                    json!({"name": format!("p{i}"), "email": format!("{i}@x.com")}),
                    None,
                )
                .await
                .unwrap();
        }

        let seen = Arc::new(Mutex::new(Vec::new()));
        let seen_in_cb = Arc::clone(&seen);
        handle
            .open_cursor("people", None, move |row| {
                let mut seen = seen_in_cb.lock();
                seen.push(row.key);
                if seen.len() == 2 {
                    CursorAction::Stop
                } else {
                    CursorAction::Advance
                }
            })
            .await
            .unwrap();

        assert_eq!(*seen.lock(), vec![Key::Int(1), Key::Int(2)]);
    }

    #[tokio::test]
    async fn close_returns_handle_to_closed() {
        let handle = open_people("app").await;
        handle.close();
        assert_eq!(handle.state(), HandleState::Closed);
        assert!(matches!(
            handle.get_by_key("people", 1).await,
            Err(DbError::NotOpen)
        ));
        // close is idempotent
        handle.close();
    }
}
