//! # RelayDB Testkit
//!
//! Test utilities for RelayDB.
//!
//! This crate provides:
//! - Database fixtures over the in-memory engine
//! - An instrumented engine wrapper for asserting open/delete behavior
//! - Property-based test generators using proptest
//!
//! The cross-crate integration tests for the access layer live in this
//! crate's `tests/` directory.
//!
//! ## Usage
//!
//! ```rust,ignore
//! use relaydb_testkit::prelude::*;
//!
//! #[tokio::test]
//! async fn my_test() {
//!     let (manager, db) = open_people_db("app").await;
//!     db.add("people", person("Dave", "d@x.com"), None).await.unwrap();
//! }
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

pub mod fixtures;
pub mod generators;
pub mod mock;

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::fixtures::*;
    pub use crate::generators::*;
    pub use crate::mock::*;
}

pub use fixtures::*;
pub use generators::*;
pub use mock::*;
