//! Error types for the access layer.

use relaydb_engine::EngineError;
use thiserror::Error;

/// Result type for access-layer operations.
pub type DbResult<T> = Result<T, DbError>;

/// Errors surfaced through rejected operation futures.
///
/// Engine diagnostics arrive as [`EngineError`] and are folded into this
/// taxonomy by the `From` impl below; nothing is swallowed or retried.
#[derive(Debug, Error)]
pub enum DbError {
    /// The open/upgrade sequence failed, including blocked-by-other-
    /// connections conditions.
    #[error("open failed: {message}")]
    Open {
        /// Engine diagnostic for the failure.
        message: String,
    },

    /// A version lower than the currently open one was requested.
    #[error("version {requested} is lower than the open version {current}")]
    Version {
        /// The version the caller requested.
        requested: u32,
        /// The version currently open or stored.
        current: u32,
    },

    /// An operation was issued before the handle reached `Open`.
    #[error("database is not open")]
    NotOpen,

    /// A referenced store or index does not exist in the current schema.
    #[error("not found: {name}")]
    NotFound {
        /// The missing store or index.
        name: String,
    },

    /// Key collision or unique-index violation.
    #[error("constraint violation: {message}")]
    Constraint {
        /// Description of the violated constraint.
        message: String,
    },

    /// Generic native transaction failure.
    #[error("transaction failed: {message}")]
    Transaction {
        /// Engine diagnostic for the failure.
        message: String,
    },

    /// The engine discarded the request without firing either notification.
    #[error("request was dropped by the engine before completing")]
    Dropped,
}

impl DbError {
    /// Creates an open error.
    pub fn open(message: impl Into<String>) -> Self {
        Self::Open {
            message: message.into(),
        }
    }

    /// Creates a transaction error.
    pub fn transaction(message: impl Into<String>) -> Self {
        Self::Transaction {
            message: message.into(),
        }
    }
}

impl From<EngineError> for DbError {
    fn from(error: EngineError) -> Self {
        match error {
            EngineError::StoreNotFound { name } => DbError::NotFound { name },
            EngineError::IndexNotFound { store, index } => DbError::NotFound {
                name: format!("index '{index}' on store '{store}'"),
            },
            EngineError::Constraint { message } | EngineError::InvalidKey { message } => {
                DbError::Constraint { message }
            }
            EngineError::VersionMismatch { requested, current } => {
                DbError::Version { requested, current }
            }
            EngineError::Blocked { name } => DbError::Open {
                message: format!("open of '{name}' blocked by other open connections"),
            },
            EngineError::UpgradeFailed { message } => DbError::Open { message },
            EngineError::Closed => DbError::NotOpen,
            EngineError::Internal { message } => DbError::Transaction { message },
        }
    }
}
