//! Engine capability traits.

use crate::error::{EngineError, EngineResult};
use crate::key::{Key, KeyRange, Order};
use crate::request::{Operation, Outcome, RequestNotifier, TxMode};
use crate::schema::SchemaEditor;
use serde_json::Value;

/// A caller-supplied schema-mutation callback, invoked synchronously inside
/// the engine's upgrade notification.
pub type UpgradeHook = Box<dyn FnOnce(&mut dyn SchemaEditor) -> EngineResult<()> + Send + 'static>;

/// A versioned, schema-evolving embedded storage engine.
///
/// Engines are **callback-driven**: every call here is non-blocking, and the
/// engine answers later through the supplied notifier, exactly once. The
/// access layer never sees engine threads or transactions directly.
///
/// # Invariants
///
/// - Exactly one of a notifier's success/error notifications fires per call.
/// - The upgrade hook runs before the success notification of the open that
///   triggered it, and its [`SchemaEditor`] is invalid outside that scope.
/// - Requests submitted on one connection complete in submission order.
///
/// # Implementors
///
/// - [`crate::MemoryEngine`] - in-memory reference engine
pub trait StorageEngine: Send + Sync {
    /// Begins an open sequence for the named database at `version`.
    ///
    /// If `version` exceeds the stored schema version the engine runs
    /// `upgrade` with a schema editor; the notifier then fires success with
    /// a live connection, or error if the open, the upgrade, or another
    /// still-open connection prevented it.
    fn open(
        &self,
        name: &str,
        version: u32,
        upgrade: UpgradeHook,
        notify: RequestNotifier<Box<dyn EngineConnection>>,
    );

    /// Deletes the named database and everything in it.
    ///
    /// Fails with [`EngineError::Blocked`] while connections are open.
    fn delete_database(&self, name: &str, notify: RequestNotifier<()>);
}

/// An open connection to one named, versioned database.
pub trait EngineConnection: Send + Sync {
    /// The database name this connection belongs to.
    fn name(&self) -> &str;

    /// The schema version this connection was opened at.
    fn version(&self) -> u32;

    /// Names of the object stores in the current schema.
    fn store_names(&self) -> Vec<String>;

    /// Submits one operation in its own transaction.
    ///
    /// The notifier fires success with the operation's [`Outcome`], or error
    /// with the engine diagnostic.
    fn submit(&self, mode: TxMode, operation: Operation, notify: RequestNotifier<Outcome>);

    /// Opens a cursor over `store`, optionally bounded by `range`.
    ///
    /// Rows are pushed through `sink` one at a time, in `order`, each within
    /// its own advance notification; the sink's terminal callback fires
    /// after exhaustion, an early stop, or an error.
    fn open_cursor(
        &self,
        store: &str,
        range: Option<KeyRange>,
        order: Order,
        sink: Box<dyn CursorSink>,
    );

    /// Closes the connection. Idempotent.
    fn close(&self);

    /// Whether the connection has been closed.
    fn is_closed(&self) -> bool;
}

/// Continuation control returned by a cursor row callback.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CursorAction {
    /// Advance to the next record.
    Advance,
    /// Stop iterating; the cursor completes without visiting further rows.
    Stop,
}

/// Receiver for cursor notifications.
///
/// The engine calls [`CursorSink::row`] once per record and finishes with
/// exactly one of the terminal callbacks.
pub trait CursorSink: Send {
    /// A record under the cursor. The returned action decides whether the
    /// engine advances or stops.
    fn row(&mut self, key: Key, value: Value) -> CursorAction;

    /// The cursor is exhausted or was stopped early.
    fn done(self: Box<Self>);

    /// The cursor failed.
    fn error(self: Box<Self>, error: EngineError);
}
