//! # ReconSync Core
//!
//! Reconciliation engine for offline-first mobile sync.
//!
//! This crate provides:
//! - Type registry with per-type field tables, key strategies and hooks
//! - Key resolution for text, integer, UUID, composite and generated keys
//! - Sparse payload merge with best-effort coercion
//! - Reference-collection resolution with placeholder rows
//! - Validation hooks with pre-merge snapshots
//! - The persistence interface and an in-memory reference store
//! - The upload/download coordinator

#![deny(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::unwrap_used, clippy::expect_used, clippy::panic)]

mod config;
mod context;
mod entity;
mod error;
mod hook;
mod key;
mod merge;
mod reconciler;
mod references;
mod schema;
mod store;
mod value;

pub use config::{ReconcilerConfig, UnknownFieldPolicy};
pub use context::RequestContext;
pub use entity::{Entity, EntitySnapshot};
pub use error::{
    ErrorKind, SchemaError, SchemaResult, StoreError, StoreResult, SyncError, SyncResult,
};
pub use hook::{AcceptAll, HookArgs, SyncHook, VisibilityFilter};
pub use key::{KeyComponent, KeyKind, KeyResolver, KeyStrategy, NativeKey, ResolvedKey};
pub use merge::{merge, MergeBase};
pub use reconciler::{ItemOutcome, Reconciler};
pub use references::{detach_references, resolve_references};
pub use schema::{
    FieldDescriptor, KeyConfig, Member, ReferenceDescriptor, SchemaConfig, TypeConfig,
    TypeDescriptor, TypeDescriptorBuilder, TypeRegistry, TypeRegistryBuilder,
};
pub use store::{
    ChangedRow, MemoryStore, ModelDef, ModelStats, StoreReader, StoreSession, SyncStore,
};
pub use value::{FieldType, FieldValue};

pub use reconsync_protocol as protocol;

/// Crate version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
