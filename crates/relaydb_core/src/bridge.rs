//! One-shot bridge from engine notifications to futures.
//!
//! The engine speaks in paired success/error callbacks; callers await
//! futures. The bridge is the translation point: one `oneshot` channel per
//! request, its sender parked behind an `Option` that whichever notification
//! fires first takes. Settling twice is impossible - the second callback
//! finds the slot empty.

use crate::error::{DbError, DbResult};
use parking_lot::Mutex;
use relaydb_engine::{EngineError, RequestNotifier};
use std::sync::Arc;
use tokio::sync::oneshot;

/// The awaitable half of a bridged request.
pub(crate) struct ResultFuture<T> {
    rx: oneshot::Receiver<Result<T, EngineError>>,
}

impl<T> ResultFuture<T> {
    /// Waits for the request to settle.
    ///
    /// Resolves with the success payload, rejects with the mapped engine
    /// error, or rejects with [`DbError::Dropped`] if the engine discarded
    /// the notifier unfired. If the engine holds the notifier forever the
    /// future stays pending - that is the engine's failure mode, not masked
    /// here.
    pub(crate) async fn settled(self) -> DbResult<T> {
        match self.rx.await {
            Ok(Ok(value)) => Ok(value),
            Ok(Err(error)) => Err(error.into()),
            Err(_) => Err(DbError::Dropped),
        }
    }
}

/// Creates a notifier/future pair for one native request.
pub(crate) fn bridge<T: Send + 'static>() -> (RequestNotifier<T>, ResultFuture<T>) {
    let (tx, rx) = oneshot::channel();
    let slot = Arc::new(Mutex::new(Some(tx)));
    let success_slot = Arc::clone(&slot);
    let notifier = RequestNotifier::new(
        move |value: T| {
            if let Some(tx) = success_slot.lock().take() {
                let _ = tx.send(Ok(value));
            }
        },
        move |error: EngineError| {
            if let Some(tx) = slot.lock().take() {
                let _ = tx.send(Err(error));
            }
        },
    );
    (notifier, ResultFuture { rx })
}
