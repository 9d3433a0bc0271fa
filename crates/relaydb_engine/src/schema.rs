//! Store and index schema definitions, and the upgrade-scope editor.

use crate::error::EngineResult;
use serde::{Deserialize, Serialize};

/// Definition of an object store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoreSpec {
    /// Store name, unique within the database.
    pub name: String,
    /// Dotted path to the key field inside records, for in-line keys.
    pub key_path: Option<String>,
    /// Whether the store generates integer keys itself.
    pub auto_increment: bool,
}

impl StoreSpec {
    /// Creates a store spec with out-of-line keys and no generator.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            key_path: None,
            auto_increment: false,
        }
    }

    /// Sets the in-line key path.
    #[must_use]
    pub fn key_path(mut self, path: impl Into<String>) -> Self {
        self.key_path = Some(path.into());
        self
    }

    /// Enables or disables the auto-increment key generator.
    #[must_use]
    pub fn auto_increment(mut self, enabled: bool) -> Self {
        self.auto_increment = enabled;
        self
    }
}

/// Definition of a secondary index over an object store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndexSpec {
    /// Index name, unique within the store.
    pub name: String,
    /// Dotted path to the indexed field inside records.
    pub key_path: String,
    /// Whether the index enforces uniqueness.
    pub unique: bool,
}

impl IndexSpec {
    /// Creates a non-unique index spec.
    #[must_use]
    pub fn new(name: impl Into<String>, key_path: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            key_path: key_path.into(),
            unique: false,
        }
    }

    /// Enables or disables the uniqueness constraint.
    #[must_use]
    pub fn unique(mut self, enabled: bool) -> Self {
        self.unique = enabled;
        self
    }
}

/// Schema-mutation capability handed to upgrade callbacks.
///
/// An editor is only valid inside the upgrade notification that produced it;
/// the `&mut` borrow prevents it from being retained or invoked afterwards.
/// Changes become visible atomically when the upgrade succeeds - a failed
/// callback leaves the stored schema untouched.
pub trait SchemaEditor {
    /// Creates an object store.
    ///
    /// # Errors
    ///
    /// Returns a constraint error if a store with the same name exists.
    fn create_store(&mut self, spec: StoreSpec) -> EngineResult<()>;

    /// Deletes an object store and all its records.
    ///
    /// # Errors
    ///
    /// Returns a not-found error if the store does not exist.
    fn delete_store(&mut self, name: &str) -> EngineResult<()>;

    /// Creates an index on an existing store.
    ///
    /// # Errors
    ///
    /// Returns a not-found error if the store does not exist, and a
    /// constraint error if the index name is taken or existing records
    /// already violate a uniqueness constraint.
    fn create_index(&mut self, store: &str, spec: IndexSpec) -> EngineResult<()>;

    /// Deletes an index from a store.
    ///
    /// # Errors
    ///
    /// Returns a not-found error if the store or index does not exist.
    fn delete_index(&mut self, store: &str, index: &str) -> EngineResult<()>;

    /// Names of the stores as currently edited.
    fn store_names(&self) -> Vec<String>;

    /// The schema version the database is upgrading from.
    fn old_version(&self) -> u32;

    /// The schema version the database is upgrading to.
    fn new_version(&self) -> u32;
}
