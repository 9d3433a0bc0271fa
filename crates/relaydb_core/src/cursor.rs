//! Cursor iteration support.

use crate::bridge::bridge;
use relaydb_engine::{CursorAction, CursorSink, EngineError, Key, RequestNotifier};
use serde_json::Value;

/// A record surfaced to the per-row cursor callback.
#[derive(Debug, Clone)]
pub struct CursorRow {
    /// Primary key of the record under the cursor.
    pub key: Key,
    /// The record itself.
    pub value: Value,
}

/// Adapts a caller-supplied per-row callback into the engine's cursor sink,
/// completing the bridged future on exhaustion, early stop, or error.
pub(crate) struct BridgedCursor<F> {
    per_row: F,
    notify: RequestNotifier<()>,
}

impl<F> BridgedCursor<F>
where
    F: FnMut(CursorRow) -> CursorAction + Send + 'static,
{
    /// Pairs the callback with a fresh bridge; the returned future resolves
    /// when the cursor session ends.
    pub(crate) fn bridged(per_row: F) -> (Box<Self>, crate::bridge::ResultFuture<()>) {
        let (notify, fut) = bridge::<()>();
        (Box::new(Self { per_row, notify }), fut)
    }
}

impl<F> CursorSink for BridgedCursor<F>
where
    F: FnMut(CursorRow) -> CursorAction + Send + 'static,
{
    fn row(&mut self, key: Key, value: Value) -> CursorAction {
        (self.per_row)(CursorRow { key, value })
    }

    fn done(self: Box<Self>) {
        self.notify.success(());
    }

    fn error(self: Box<Self>, error: EngineError) {
        self.notify.error(error);
    }
}
