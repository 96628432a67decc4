//! # ReconSync Testkit
//!
//! Test utilities for ReconSync.
//!
//! This crate provides:
//! - A fixture registry covering every key strategy and field kind
//! - A harness wrapping a server over an in-memory store
//! - Property-based test generators using proptest
//! - Concurrent upload stress helpers
//!
//! ## Usage
//!
//! ```rust,ignore
//! use reconsync_testkit::prelude::*;
//!
//! #[test]
//! fn saves_object() {
//!     let harness = TestHarness::new();
//!     let response = harness.upload(vec![item(DB_SYNC_OBJECT, "1", json!({"Text": "a"}))]);
//!     assert_no_errors(&response);
//! }
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

pub mod fixtures;
pub mod generators;
pub mod harness;
pub mod stress;

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::fixtures::*;
    pub use crate::generators::*;
    pub use crate::harness::*;
    pub use crate::stress::*;
    pub use serde_json::json;
}

pub use fixtures::*;
pub use generators::*;
pub use harness::*;
pub use stress::*;
