//! # RelayDB Engine
//!
//! Native engine boundary for RelayDB.
//!
//! This crate defines the contract between the asynchronous access layer and
//! the embedded storage engine it fronts. The engine is **callback-driven**:
//! every request eventually fires exactly one success or one error
//! notification, and cursors push rows through a sink. The engine does not
//! know about futures - turning notifications into awaitable results is the
//! job of `relaydb_core`.
//!
//! ## Contents
//!
//! - [`StorageEngine`] / [`EngineConnection`] - the engine capability traits
//! - [`SchemaEditor`] - the capability handed to upgrade callbacks
//! - [`RequestNotifier`], [`Operation`], [`Outcome`] - request vocabulary
//! - [`Key`], [`KeyRange`], [`Order`] - key model
//! - [`MemoryEngine`] - in-memory reference engine for tests and ephemeral
//!   databases
//!
//! ## Example
//!
//! ```rust
//! use relaydb_engine::{MemoryEngine, RequestNotifier, SchemaEditor, StorageEngine};
//!
//! let engine = MemoryEngine::new();
//! engine.open(
//!     "app",
//!     1,
//!     Box::new(|_editor: &mut dyn SchemaEditor| Ok(())),
//!     RequestNotifier::new(|_conn| { /* connected */ }, |err| panic!("{err}")),
//! );
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod engine;
mod error;
mod key;
mod memory;
mod request;
mod schema;

pub use engine::{CursorAction, CursorSink, EngineConnection, StorageEngine, UpgradeHook};
pub use error::{EngineError, EngineResult};
pub use key::{key_at_path, Key, KeyRange, Order};
pub use memory::MemoryEngine;
pub use request::{Completion, IndexQuery, Operation, Outcome, RequestNotifier, TxMode};
pub use schema::{IndexSpec, SchemaEditor, StoreSpec};
