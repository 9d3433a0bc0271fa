//! In-memory reference engine.

use crate::engine::{CursorAction, CursorSink, EngineConnection, StorageEngine, UpgradeHook};
use crate::error::{EngineError, EngineResult};
use crate::key::{inject_at_path, key_at_path, Key, KeyRange, Order};
use crate::request::{Operation, Outcome, RequestNotifier, TxMode};
use crate::schema::{IndexSpec, SchemaEditor, StoreSpec};
use parking_lot::Mutex;
use serde_json::Value;
use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::sync::atomic::{AtomicBool, Ordering as AtomicOrdering};
use std::sync::{mpsc, Arc};
use std::thread;
use tracing::debug;

type Job = Box<dyn FnOnce() + Send + 'static>;

/// Single worker thread executing engine requests in FIFO order.
///
/// All request execution and every completion notification happens on this
/// thread, which is what makes the engine's notifications asynchronous with
/// respect to callers.
struct Dispatcher {
    queue: mpsc::Sender<Job>,
}

impl Dispatcher {
    fn spawn() -> Self {
        let (queue, jobs) = mpsc::channel::<Job>();
        thread::spawn(move || {
            while let Ok(job) = jobs.recv() {
                job();
            }
        });
        Self { queue }
    }

    fn dispatch(&self, job: Job) {
        // A send failure means the engine was dropped; the job's notifier is
        // dropped unfired and the caller observes that.
        let _ = self.queue.send(job);
    }
}

#[derive(Debug, Clone)]
struct IndexState {
    key_path: String,
    unique: bool,
}

#[derive(Debug, Clone)]
struct StoreState {
    key_path: Option<String>,
    auto_increment: bool,
    next_key: i64,
    records: BTreeMap<Key, Value>,
    indexes: BTreeMap<String, IndexState>,
}

impl StoreState {
    fn new(spec: StoreSpec) -> Self {
        Self {
            key_path: spec.key_path,
            auto_increment: spec.auto_increment,
            next_key: 1,
            records: BTreeMap::new(),
            indexes: BTreeMap::new(),
        }
    }
}

#[derive(Debug, Default)]
struct DatabaseState {
    version: u32,
    stores: BTreeMap<String, StoreState>,
    connections: usize,
}

/// Schema editor over a scratch copy of the stores; committed only when the
/// upgrade callback returns `Ok`.
struct MemoryEditor {
    stores: BTreeMap<String, StoreState>,
    old_version: u32,
    new_version: u32,
}

impl SchemaEditor for MemoryEditor {
    fn create_store(&mut self, spec: StoreSpec) -> EngineResult<()> {
        if self.stores.contains_key(&spec.name) {
            return Err(EngineError::constraint(format!(
                "store '{}' already exists",
                spec.name
            )));
        }
        let name = spec.name.clone();
        self.stores.insert(name, StoreState::new(spec));
        Ok(())
    }

    fn delete_store(&mut self, name: &str) -> EngineResult<()> {
        self.stores
            .remove(name)
            .map(|_| ())
            .ok_or_else(|| EngineError::store_not_found(name))
    }

    fn create_index(&mut self, store: &str, spec: IndexSpec) -> EngineResult<()> {
        let state = self
            .stores
            .get_mut(store)
            .ok_or_else(|| EngineError::store_not_found(store))?;
        if state.indexes.contains_key(&spec.name) {
            return Err(EngineError::constraint(format!(
                "index '{}' already exists on store '{store}'",
                spec.name
            )));
        }
        if spec.unique {
            let mut seen = BTreeSet::new();
            for value in state.records.values() {
                if let Some(index_key) = key_at_path(value, &spec.key_path) {
                    if !seen.insert(index_key) {
                        return Err(EngineError::constraint(format!(
                            "existing records violate unique index '{}'",
                            spec.name
                        )));
                    }
                }
            }
        }
        state.indexes.insert(
            spec.name,
            IndexState {
                key_path: spec.key_path,
                unique: spec.unique,
            },
        );
        Ok(())
    }

    fn delete_index(&mut self, store: &str, index: &str) -> EngineResult<()> {
        let state = self
            .stores
            .get_mut(store)
            .ok_or_else(|| EngineError::store_not_found(store))?;
        state
            .indexes
            .remove(index)
            .map(|_| ())
            .ok_or_else(|| EngineError::index_not_found(store, index))
    }

    fn store_names(&self) -> Vec<String> {
        self.stores.keys().cloned().collect()
    }

    fn old_version(&self) -> u32 {
        self.old_version
    }

    fn new_version(&self) -> u32 {
        self.new_version
    }
}

struct EngineInner {
    databases: Mutex<HashMap<String, Arc<Mutex<DatabaseState>>>>,
    dispatcher: Dispatcher,
}

impl EngineInner {
    fn database(&self, name: &str) -> Arc<Mutex<DatabaseState>> {
        let mut databases = self.databases.lock();
        Arc::clone(databases.entry(name.to_string()).or_default())
    }
}

/// An in-memory engine.
///
/// Databases live entirely in memory and disappear with the engine. The
/// engine is suitable for:
/// - Unit tests
/// - Integration tests
/// - Ephemeral databases that don't need persistence
///
/// # Thread Safety
///
/// The engine is thread-safe; clones share the same databases and the same
/// dispatch thread.
#[derive(Clone)]
pub struct MemoryEngine {
    inner: Arc<EngineInner>,
}

impl MemoryEngine {
    /// Creates an engine with no databases.
    #[must_use]
    pub fn new() -> Self {
        Self {
            inner: Arc::new(EngineInner {
                databases: Mutex::new(HashMap::new()),
                dispatcher: Dispatcher::spawn(),
            }),
        }
    }
}

impl Default for MemoryEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl StorageEngine for MemoryEngine {
    fn open(
        &self,
        name: &str,
        version: u32,
        upgrade: UpgradeHook,
        notify: RequestNotifier<Box<dyn EngineConnection>>,
    ) {
        let name = name.to_string();
        let inner = Arc::clone(&self.inner);
        self.inner.dispatcher.dispatch(Box::new(move || {
            let db = inner.database(&name);
            let mut state = db.lock();
            if version < state.version {
                let error = EngineError::VersionMismatch {
                    requested: version,
                    current: state.version,
                };
                drop(state);
                notify.error(error);
                return;
            }
            if version > state.version {
                if state.connections > 0 {
                    drop(state);
                    notify.error(EngineError::Blocked { name });
                    return;
                }
                debug!(name = %name, from = state.version, to = version, "upgrading database");
                let mut editor = MemoryEditor {
                    stores: state.stores.clone(),
                    old_version: state.version,
                    new_version: version,
                };
                match upgrade(&mut editor) {
                    Ok(()) => {
                        state.stores = editor.stores;
                        state.version = version;
                    }
                    Err(error) => {
                        drop(state);
                        notify.error(EngineError::upgrade_failed(error.to_string()));
                        return;
                    }
                }
            }
            state.connections += 1;
            let opened_version = state.version;
            drop(state);
            let connection = MemoryConnection {
                name,
                version: opened_version,
                db,
                closed: AtomicBool::new(false),
                inner,
            };
            notify.success(Box::new(connection));
        }));
    }

    fn delete_database(&self, name: &str, notify: RequestNotifier<()>) {
        let name = name.to_string();
        let inner = Arc::clone(&self.inner);
        self.inner.dispatcher.dispatch(Box::new(move || {
            let mut databases = inner.databases.lock();
            if let Some(db) = databases.get(&name) {
                if db.lock().connections > 0 {
                    drop(databases);
                    notify.error(EngineError::Blocked { name });
                    return;
                }
            }
            debug!(name = %name, "deleting database");
            databases.remove(&name);
            drop(databases);
            notify.success(());
        }));
    }
}

struct MemoryConnection {
    name: String,
    version: u32,
    db: Arc<Mutex<DatabaseState>>,
    closed: AtomicBool,
    inner: Arc<EngineInner>,
}

impl EngineConnection for MemoryConnection {
    fn name(&self) -> &str {
        &self.name
    }

    fn version(&self) -> u32 {
        self.version
    }

    fn store_names(&self) -> Vec<String> {
        self.db.lock().stores.keys().cloned().collect()
    }

    fn submit(&self, mode: TxMode, operation: Operation, notify: RequestNotifier<Outcome>) {
        if self.is_closed() {
            self.inner
                .dispatcher
                .dispatch(Box::new(move || notify.error(EngineError::Closed)));
            return;
        }
        let db = Arc::clone(&self.db);
        self.inner.dispatcher.dispatch(Box::new(move || {
            let mut state = db.lock();
            let result = execute(&mut state, mode, operation);
            drop(state);
            notify.settle(result);
        }));
    }

    fn open_cursor(
        &self,
        store: &str,
        range: Option<KeyRange>,
        order: Order,
        sink: Box<dyn CursorSink>,
    ) {
        let store = store.to_string();
        if self.is_closed() {
            self.inner
                .dispatcher
                .dispatch(Box::new(move || sink.error(EngineError::Closed)));
            return;
        }
        let db = Arc::clone(&self.db);
        self.inner.dispatcher.dispatch(Box::new(move || {
            let snapshot = {
                let state = db.lock();
                state.stores.get(&store).map(|st| {
                    let mut rows: Vec<(Key, Value)> = st
                        .records
                        .iter()
                        .filter(|(key, _)| range.as_ref().map_or(true, |r| r.contains(key)))
                        .map(|(key, value)| (key.clone(), value.clone()))
                        .collect();
                    if order == Order::Desc {
                        rows.reverse();
                    }
                    rows
                })
            };
            let Some(rows) = snapshot else {
                sink.error(EngineError::store_not_found(&store));
                return;
            };
            let mut sink = sink;
            for (key, value) in rows {
                if sink.row(key, value) == CursorAction::Stop {
                    break;
                }
            }
            sink.done();
        }));
    }

    fn close(&self) {
        if !self.closed.swap(true, AtomicOrdering::SeqCst) {
            let mut state = self.db.lock();
            state.connections = state.connections.saturating_sub(1);
        }
    }

    fn is_closed(&self) -> bool {
        self.closed.load(AtomicOrdering::SeqCst)
    }
}

impl Drop for MemoryConnection {
    fn drop(&mut self) {
        self.close();
    }
}

/// Runs one operation against the database state.
fn execute(db: &mut DatabaseState, mode: TxMode, operation: Operation) -> EngineResult<Outcome> {
    if operation.mode() == TxMode::ReadWrite && mode == TxMode::ReadOnly {
        return Err(EngineError::internal(
            "write operation submitted in a read-only transaction",
        ));
    }
    match operation {
        Operation::Get { store, key } => {
            let state = store_state(db, &store)?;
            Ok(Outcome::Record(state.records.get(&key).cloned()))
        }
        Operation::GetAll {
            store,
            range,
            index,
        } => {
            let state = store_state(db, &store)?;
            if let Some(query) = index {
                let idx = state
                    .indexes
                    .get(&query.name)
                    .ok_or_else(|| EngineError::index_not_found(&store, &query.name))?;
                let mut rows: Vec<(Key, Value)> = state
                    .records
                    .values()
                    .filter_map(|value| {
                        key_at_path(value, &idx.key_path).map(|ik| (ik, value.clone()))
                    })
                    .filter(|(ik, _)| range.as_ref().map_or(true, |r| r.contains(ik)))
                    .collect();
                rows.sort_by(|a, b| a.0.cmp(&b.0));
                if query.order == Order::Desc {
                    rows.reverse();
                }
                Ok(Outcome::Records(rows.into_iter().map(|(_, v)| v).collect()))
            } else {
                Ok(Outcome::Records(
                    state
                        .records
                        .iter()
                        .filter(|(key, _)| range.as_ref().map_or(true, |r| r.contains(key)))
                        .map(|(_, value)| value.clone())
                        .collect(),
                ))
            }
        }
        Operation::GetByIndex { store, index, key } => {
            let state = store_state(db, &store)?;
            let idx = state
                .indexes
                .get(&index)
                .ok_or_else(|| EngineError::index_not_found(&store, &index))?;
            let record = state
                .records
                .values()
                .find(|value| key_at_path(value, &idx.key_path).as_ref() == Some(&key))
                .cloned();
            Ok(Outcome::Record(record))
        }
        Operation::Add {
            store,
            mut value,
            key,
        } => {
            let state = store_state_mut(db, &store)?;
            let key = resolve_add_key(state, &mut value, key)?;
            if state.records.contains_key(&key) {
                return Err(EngineError::constraint(format!(
                    "key {key} already exists in store '{store}'"
                )));
            }
            check_unique_indexes(state, &key, &value)?;
            state.records.insert(key.clone(), value);
            Ok(Outcome::Key(key))
        }
        Operation::Put { store, value, key } => {
            let state = store_state_mut(db, &store)?;
            let key = resolve_put_key(state, &value, key)?;
            check_unique_indexes(state, &key, &value)?;
            state.records.insert(key, value);
            Ok(Outcome::Done)
        }
        Operation::Delete { store, key } => {
            let state = store_state_mut(db, &store)?;
            state.records.remove(&key);
            Ok(Outcome::Done)
        }
        Operation::Clear { store } => {
            let state = store_state_mut(db, &store)?;
            // The key generator survives a clear.
            state.records.clear();
            Ok(Outcome::Done)
        }
    }
}

fn store_state<'a>(db: &'a DatabaseState, store: &str) -> EngineResult<&'a StoreState> {
    db.stores
        .get(store)
        .ok_or_else(|| EngineError::store_not_found(store))
}

fn store_state_mut<'a>(db: &'a mut DatabaseState, store: &str) -> EngineResult<&'a mut StoreState> {
    db.stores
        .get_mut(store)
        .ok_or_else(|| EngineError::store_not_found(store))
}

/// Resolves the primary key for an insert, generating and injecting one
/// where the store's key generator applies.
fn resolve_add_key(
    state: &mut StoreState,
    value: &mut Value,
    explicit: Option<Key>,
) -> EngineResult<Key> {
    if let Some(key) = explicit {
        if state.key_path.is_some() {
            return Err(EngineError::invalid_key(
                "store uses an in-line key; omit the key argument",
            ));
        }
        return Ok(key);
    }
    if let Some(path) = state.key_path.clone() {
        if let Some(key) = key_at_path(value, &path) {
            bump_generator(state, &key);
            return Ok(key);
        }
        if state.auto_increment {
            let key = generate_key(state);
            if !inject_at_path(value, &path, &key) {
                return Err(EngineError::invalid_key(
                    "record must be an object to carry an in-line key",
                ));
            }
            return Ok(key);
        }
        return Err(EngineError::invalid_key(
            "value is missing the store's key field",
        ));
    }
    if state.auto_increment {
        return Ok(generate_key(state));
    }
    Err(EngineError::invalid_key(
        "store has no key generator; a key argument is required",
    ))
}

/// Resolves the primary key for an update. Updates never generate keys:
/// a record that carries neither an explicit key nor its in-line key field
/// is rejected rather than silently inserted under a fresh key.
fn resolve_put_key(state: &mut StoreState, value: &Value, explicit: Option<Key>) -> EngineResult<Key> {
    if let Some(key) = explicit {
        if state.key_path.is_some() {
            return Err(EngineError::invalid_key(
                "store uses an in-line key; omit the key argument",
            ));
        }
        return Ok(key);
    }
    if let Some(path) = state.key_path.clone() {
        if let Some(key) = key_at_path(value, &path) {
            bump_generator(state, &key);
            return Ok(key);
        }
        return Err(EngineError::constraint(
            "update requires the record to carry its key field",
        ));
    }
    Err(EngineError::constraint(
        "update requires a key argument for stores with out-of-line keys",
    ))
}

fn generate_key(state: &mut StoreState) -> Key {
    let key = Key::Int(state.next_key);
    state.next_key += 1;
    key
}

/// Keeps the generator ahead of explicitly supplied integer keys.
fn bump_generator(state: &mut StoreState, key: &Key) {
    if state.auto_increment {
        if let Key::Int(i) = key {
            if *i >= state.next_key {
                state.next_key = i + 1;
            }
        }
    }
}

fn check_unique_indexes(state: &StoreState, key: &Key, value: &Value) -> EngineResult<()> {
    for (name, index) in &state.indexes {
        if !index.unique {
            continue;
        }
        let Some(candidate) = key_at_path(value, &index.key_path) else {
            continue;
        };
        let collides = state.records.iter().any(|(existing_key, existing)| {
            existing_key != key && key_at_path(existing, &index.key_path) == Some(candidate.clone())
        });
        if collides {
            return Err(EngineError::constraint(format!(
                "unique index '{name}' violated by key {candidate}"
            )));
        }
    }
    Ok(())
}
