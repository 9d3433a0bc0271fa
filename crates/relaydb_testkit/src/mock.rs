//! Instrumented engine wrappers for testing.

use relaydb_engine::{
    EngineConnection, MemoryEngine, RequestNotifier, StorageEngine, UpgradeHook,
};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

/// A [`StorageEngine`] wrapper that counts native open sequences.
///
/// Used to assert that the access layer issues exactly as many native opens
/// as it promises - e.g. that two concurrent `open_database` calls collapse
/// into one.
pub struct CountingEngine {
    inner: Arc<dyn StorageEngine>,
    opens: AtomicUsize,
    deletes: AtomicUsize,
}

impl CountingEngine {
    /// Wraps an existing engine.
    pub fn wrap(inner: Arc<dyn StorageEngine>) -> Arc<Self> {
        Arc::new(Self {
            inner,
            opens: AtomicUsize::new(0),
            deletes: AtomicUsize::new(0),
        })
    }

    /// Wraps a fresh in-memory engine.
    pub fn in_memory() -> Arc<Self> {
        Self::wrap(Arc::new(MemoryEngine::new()))
    }

    /// Number of native open sequences issued so far.
    pub fn opens(&self) -> usize {
        self.opens.load(Ordering::SeqCst)
    }

    /// Number of delete-database requests issued so far.
    pub fn deletes(&self) -> usize {
        self.deletes.load(Ordering::SeqCst)
    }
}

impl StorageEngine for CountingEngine {
    fn open(
        &self,
        name: &str,
        version: u32,
        upgrade: UpgradeHook,
        notify: RequestNotifier<Box<dyn EngineConnection>>,
    ) {
        self.opens.fetch_add(1, Ordering::SeqCst);
        self.inner.open(name, version, upgrade, notify);
    }

    fn delete_database(&self, name: &str, notify: RequestNotifier<()>) {
        self.deletes.fetch_add(1, Ordering::SeqCst);
        self.inner.delete_database(name, notify);
    }
}
