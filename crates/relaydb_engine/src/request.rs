//! Request vocabulary: completion notifiers, operations, and outcomes.

use crate::error::EngineError;
use crate::key::{Key, KeyRange, Order};
use serde_json::Value;

/// A boxed single-use completion callback.
pub type Completion<T> = Box<dyn FnOnce(T) + Send + 'static>;

/// The paired completion callbacks of one native request.
///
/// The engine fires exactly one of the two; consuming `self` on both paths
/// makes a second notification unrepresentable.
pub struct RequestNotifier<T> {
    on_success: Completion<T>,
    on_error: Completion<EngineError>,
}

impl<T> RequestNotifier<T> {
    /// Pairs a success and an error callback into a notifier.
    pub fn new(
        on_success: impl FnOnce(T) + Send + 'static,
        on_error: impl FnOnce(EngineError) + Send + 'static,
    ) -> Self {
        Self {
            on_success: Box::new(on_success),
            on_error: Box::new(on_error),
        }
    }

    /// Fires the success notification.
    pub fn success(self, value: T) {
        (self.on_success)(value);
    }

    /// Fires the error notification.
    pub fn error(self, error: EngineError) {
        (self.on_error)(error);
    }

    /// Completes from a result, routing `Ok` to success and `Err` to error.
    pub fn settle(self, result: Result<T, EngineError>) {
        match result {
            Ok(value) => self.success(value),
            Err(error) => self.error(error),
        }
    }
}

/// Transaction mode for a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TxMode {
    /// Lookups, scans, and read cursors.
    ReadOnly,
    /// Inserts, updates, deletes, and clears.
    ReadWrite,
}

/// An index lookup parameterization for scans.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndexQuery {
    /// Name of the index to scan by.
    pub name: String,
    /// Ordering over index keys.
    pub order: Order,
}

impl IndexQuery {
    /// Creates an ascending index query.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            order: Order::Asc,
        }
    }

    /// Sets the scan order.
    #[must_use]
    pub fn order(mut self, order: Order) -> Self {
        self.order = order;
        self
    }
}

/// One native storage operation.
///
/// Each operation runs inside its own engine transaction scoped to the
/// store it names.
#[derive(Debug, Clone)]
pub enum Operation {
    /// Point lookup by primary key.
    Get {
        /// Target store.
        store: String,
        /// Primary key to look up.
        key: Key,
    },
    /// Eager scan of all matching records.
    GetAll {
        /// Target store.
        store: String,
        /// Optional bound over the scanned keys.
        range: Option<KeyRange>,
        /// Optional index to scan by; the range then bounds index keys.
        index: Option<IndexQuery>,
    },
    /// Point lookup through an index.
    GetByIndex {
        /// Target store.
        store: String,
        /// Index to look up through.
        index: String,
        /// Index key to match.
        key: Key,
    },
    /// Insert of a new record.
    Add {
        /// Target store.
        store: String,
        /// Record to insert.
        value: Value,
        /// Explicit key, for stores with out-of-line keys.
        key: Option<Key>,
    },
    /// Insert-or-overwrite of a record.
    Put {
        /// Target store.
        store: String,
        /// Record to write.
        value: Value,
        /// Explicit key, for stores with out-of-line keys.
        key: Option<Key>,
    },
    /// Delete by primary key. Deleting an absent key succeeds.
    Delete {
        /// Target store.
        store: String,
        /// Primary key to delete.
        key: Key,
    },
    /// Removal of every record in the store.
    Clear {
        /// Target store.
        store: String,
    },
}

impl Operation {
    /// The store this operation is scoped to.
    #[must_use]
    pub fn store(&self) -> &str {
        match self {
            Operation::Get { store, .. }
            | Operation::GetAll { store, .. }
            | Operation::GetByIndex { store, .. }
            | Operation::Add { store, .. }
            | Operation::Put { store, .. }
            | Operation::Delete { store, .. }
            | Operation::Clear { store } => store,
        }
    }

    /// The transaction mode this operation requires.
    #[must_use]
    pub fn mode(&self) -> TxMode {
        match self {
            Operation::Get { .. } | Operation::GetAll { .. } | Operation::GetByIndex { .. } => {
                TxMode::ReadOnly
            }
            Operation::Add { .. }
            | Operation::Put { .. }
            | Operation::Delete { .. }
            | Operation::Clear { .. } => TxMode::ReadWrite,
        }
    }
}

/// The success payload of a native request.
#[derive(Debug, Clone)]
pub enum Outcome {
    /// A single record, or nothing.
    Record(Option<Value>),
    /// An ordered sequence of records.
    Records(Vec<Value>),
    /// The key an insert resolved to.
    Key(Key),
    /// Completion without a payload.
    Done,
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    #[test]
    fn success_fires_only_the_success_callback() {
        let hits = Arc::new(AtomicUsize::new(0));
        let hits_ok = Arc::clone(&hits);
        let notifier = RequestNotifier::new(
            move |value: u32| {
                assert_eq!(value, 7);
                hits_ok.fetch_add(1, Ordering::SeqCst);
            },
            |_err| panic!("error path must not fire"),
        );
        notifier.success(7);
        assert_eq!(hits.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn settle_routes_err_to_error_callback() {
        let hits = Arc::new(AtomicUsize::new(0));
        let hits_err = Arc::clone(&hits);
        let notifier = RequestNotifier::new(
            |_value: u32| panic!("success path must not fire"),
            move |err| {
                assert!(matches!(err, EngineError::Closed));
                hits_err.fetch_add(1, Ordering::SeqCst);
            },
        );
        notifier.settle(Err(EngineError::Closed));
        assert_eq!(hits.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn operation_modes() {
        let get = Operation::Get {
            store: "s".into(),
            key: Key::Int(1),
        };
        let clear = Operation::Clear { store: "s".into() };
        assert_eq!(get.mode(), TxMode::ReadOnly);
        assert_eq!(clear.mode(), TxMode::ReadWrite);
        assert_eq!(get.store(), "s");
    }
}
