//! Error types for engine operations.

use thiserror::Error;

/// Result type for engine operations.
pub type EngineResult<T> = Result<T, EngineError>;

/// Errors reported by the native engine.
///
/// These arrive through the error notification of a request and are mapped
/// to the access-layer taxonomy by `relaydb_core`.
#[derive(Debug, Clone, Error)]
pub enum EngineError {
    /// The named object store does not exist in the current schema version.
    #[error("object store not found: {name}")]
    StoreNotFound {
        /// Name of the missing store.
        name: String,
    },

    /// The named index does not exist on the store.
    #[error("index not found: {index} on store {store}")]
    IndexNotFound {
        /// Store the index was looked up on.
        store: String,
        /// Name of the missing index.
        index: String,
    },

    /// Key collision or unique-index violation.
    #[error("constraint violation: {message}")]
    Constraint {
        /// Description of the violated constraint.
        message: String,
    },

    /// The requested version is below the stored schema version.
    #[error("requested version {requested} is below stored version {current}")]
    VersionMismatch {
        /// The version the caller requested.
        requested: u32,
        /// The schema version currently stored.
        current: u32,
    },

    /// An upgrade could not start because other connections are open.
    #[error("open of '{name}' blocked by other open connections")]
    Blocked {
        /// Name of the database being opened.
        name: String,
    },

    /// A key argument (or key field) was missing or not usable as a key.
    #[error("invalid key: {message}")]
    InvalidKey {
        /// Description of the key problem.
        message: String,
    },

    /// The upgrade callback failed; no schema changes were committed.
    #[error("upgrade failed: {message}")]
    UpgradeFailed {
        /// Description of the failure.
        message: String,
    },

    /// The connection has been closed.
    #[error("connection is closed")]
    Closed,

    /// Engine-internal transaction failure.
    #[error("engine error: {message}")]
    Internal {
        /// Description of the failure.
        message: String,
    },
}

impl EngineError {
    /// Creates a store-not-found error.
    pub fn store_not_found(name: impl Into<String>) -> Self {
        Self::StoreNotFound { name: name.into() }
    }

    /// Creates an index-not-found error.
    pub fn index_not_found(store: impl Into<String>, index: impl Into<String>) -> Self {
        Self::IndexNotFound {
            store: store.into(),
            index: index.into(),
        }
    }

    /// Creates a constraint violation error.
    pub fn constraint(message: impl Into<String>) -> Self {
        Self::Constraint {
            message: message.into(),
        }
    }

    /// Creates an invalid key error.
    pub fn invalid_key(message: impl Into<String>) -> Self {
        Self::InvalidKey {
            message: message.into(),
        }
    }

    /// Creates an upgrade failed error.
    pub fn upgrade_failed(message: impl Into<String>) -> Self {
        Self::UpgradeFailed {
            message: message.into(),
        }
    }

    /// Creates an engine-internal error.
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal {
            message: message.into(),
        }
    }
}
