//! # RelayDB Core
//!
//! Asynchronous access layer over callback-driven storage engines.
//!
//! This crate provides:
//! - One-shot bridging of engine success/error notifications into futures
//! - Database handles with open/upgrade sequencing and version policy
//! - The store operation set (lookups, scans, inserts, updates, deletes,
//!   clears)
//! - Cursor iteration under explicit caller control
//! - An owned name → handle registry
//!
//! ## Architecture
//!
//! The native engine (see `relaydb_engine`) executes every request
//! internally and answers through paired success/error callbacks. Each
//! operation here opens its own engine transaction, issues exactly one
//! request, and hands the caller a future that settles exactly once with
//! the request's outcome. Only the open/upgrade sequence is serialized;
//! operations against an open handle run concurrently.
//!
//! ## Example
//!
//! ```rust
//! use relaydb_core::{DatabaseManager, Descriptor, SchemaEditor, StoreSpec};
//! use serde_json::json;
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() -> Result<(), relaydb_core::DbError> {
//! let manager = DatabaseManager::in_memory();
//! let db = manager
//!     .open(
//!         &Descriptor::new("app"),
//!         Some(Box::new(|editor: &mut dyn SchemaEditor| {
//!             editor.create_store(StoreSpec::new("notes").key_path("id").auto_increment(true))
//!         })),
//!     )
//!     .await?;
//!
//! let key = db.add("notes", json!({"text": "hello"}), None).await?;
//! let note = db.get_by_key("notes", key).await?;
//! assert_eq!(note.unwrap()["text"], json!("hello"));
//! # Ok(())
//! # }
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod bridge;
mod cursor;
mod descriptor;
mod error;
mod handle;
mod manager;

pub use cursor::CursorRow;
pub use descriptor::{Descriptor, DEFAULT_VERSION};
pub use error::{DbError, DbResult};
pub use handle::{DatabaseHandle, HandleState};
pub use manager::DatabaseManager;

// Engine-boundary types that appear in this crate's API surface.
pub use relaydb_engine::{
    CursorAction, EngineError, EngineResult, IndexQuery, IndexSpec, Key, KeyRange, MemoryEngine,
    Order, SchemaEditor, StorageEngine, StoreSpec, UpgradeHook,
};
