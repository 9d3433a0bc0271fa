//! Owned registry of database handles.

use crate::bridge::bridge;
use crate::descriptor::Descriptor;
use crate::error::{DbError, DbResult};
use crate::handle::DatabaseHandle;
use parking_lot::Mutex;
use relaydb_engine::{MemoryEngine, StorageEngine, UpgradeHook};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::debug;

/// Hands out database handles and owns their lifetimes.
///
/// The manager holds the name → handle table explicitly - repeated open
/// requests for a name reuse the one handle (and therefore the one native
/// connection) instead of racing fresh opens. Dropping the manager closes
/// every handle it still owns.
///
/// # Example
///
/// ```rust
/// use relaydb_core::{DatabaseManager, Descriptor, SchemaEditor, StoreSpec};
///
/// # #[tokio::main(flavor = "current_thread")]
/// # async fn main() -> Result<(), relaydb_core::DbError> {
/// let manager = DatabaseManager::in_memory();
/// let handle = manager
///     .open(
///         &Descriptor::new("app"),
///         Some(Box::new(|editor: &mut dyn SchemaEditor| {
///             editor.create_store(StoreSpec::new("notes").auto_increment(true))
///         })),
///     )
///     .await?;
/// assert!(handle.is_open());
/// # Ok(())
/// # }
/// ```
pub struct DatabaseManager {
    engine: Arc<dyn StorageEngine>,
    handles: Mutex<HashMap<String, Arc<DatabaseHandle>>>,
}

impl DatabaseManager {
    /// Creates a manager over the given engine.
    #[must_use]
    pub fn new(engine: Arc<dyn StorageEngine>) -> Self {
        Self {
            engine,
            handles: Mutex::new(HashMap::new()),
        }
    }

    /// Creates a manager over a fresh in-memory engine.
    #[must_use]
    pub fn in_memory() -> Self {
        Self::new(Arc::new(MemoryEngine::new()))
    }

    /// Opens (or upgrades) the described database and returns its handle.
    ///
    /// The same handle is returned for repeated requests with the same
    /// name; the open sequence itself follows
    /// [`DatabaseHandle::open_database`].
    ///
    /// # Errors
    ///
    /// Propagates the open errors of [`DatabaseHandle::open_database`].
    pub async fn open(
        &self,
        descriptor: &Descriptor,
        upgrade: Option<UpgradeHook>,
    ) -> DbResult<Arc<DatabaseHandle>> {
        let handle = self.handle(descriptor.name());
        handle
            .open_database(Some(descriptor.target_version()), upgrade)
            .await?;
        Ok(handle)
    }

    /// The handle registered for `name`, if any.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<Arc<DatabaseHandle>> {
        self.handles.lock().get(name).cloned()
    }

    /// Names with a registered handle, sorted.
    #[must_use]
    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.handles.lock().keys().cloned().collect();
        names.sort();
        names
    }

    /// Closes and forgets the handle for `name`. Returns whether one was
    /// registered.
    pub fn close(&self, name: &str) -> bool {
        let removed = self.handles.lock().remove(name);
        match removed {
            Some(handle) => {
                handle.close();
                debug!(name, "handle released");
                true
            }
            None => false,
        }
    }

    /// Deletes the named database from the engine.
    ///
    /// A handle still registered for the name is closed and released first;
    /// the engine still refuses while other connections are open.
    ///
    /// # Errors
    ///
    /// [`DbError::Open`] if the engine reports the delete blocked.
    pub async fn delete_database(&self, name: &str) -> DbResult<()> {
        self.close(name);
        let (notify, fut) = bridge::<()>();
        self.engine.delete_database(name, notify);
        fut.settled().await.map_err(|error| match error {
            open @ DbError::Open { .. } => open,
            dropped @ DbError::Dropped => dropped,
            other => DbError::open(other.to_string()),
        })
    }

    fn handle(&self, name: &str) -> Arc<DatabaseHandle> {
        let mut handles = self.handles.lock();
        Arc::clone(
            handles
                .entry(name.to_string())
                .or_insert_with(|| Arc::new(DatabaseHandle::new(Arc::clone(&self.engine), name))),
        )
    }
}

impl Drop for DatabaseManager {
    fn drop(&mut self) {
        for handle in self.handles.lock().values() {
            handle.close();
        }
    }
}

impl std::fmt::Debug for DatabaseManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DatabaseManager")
            .field("names", &self.names())
            .finish_non_exhaustive()
    }
}
