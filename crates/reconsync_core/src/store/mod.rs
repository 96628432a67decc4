//! Persistence interface consumed by the engine.
//!
//! The engine never talks to a database directly. It opens one
//! [`StoreSession`] per uploaded item, stages writes through it and commits,
//! so a fault on one item cannot leak into another. Cross-request
//! consistency is the store's business.

mod memory;

pub use memory::{MemoryStore, ModelDef, ModelStats};

use crate::entity::Entity;
use crate::error::StoreResult;
use crate::key::NativeKey;
use reconsync_protocol::ChangeTimestamp;

/// Read access to a store or an open session.
pub trait StoreReader {
    /// Finds a row by key. Rows staged in the same session are visible.
    fn find_by_key(&self, model: &str, key: &NativeKey) -> StoreResult<Option<Entity>>;

    /// Returns every live row of a model, in key order.
    fn scan(&self, model: &str) -> StoreResult<Vec<Entity>>;
}

/// A unit of work against the store.
///
/// Dropping a session without committing discards its staged writes.
pub trait StoreSession: StoreReader {
    /// Returns a fresh entity for a model. Models with generated keys
    /// assign the key here.
    fn create(&mut self, model: &str) -> StoreResult<Entity>;

    /// Stages a new row.
    fn insert(&mut self, model: &str, entity: Entity) -> StoreResult<()>;

    /// Stages a placeholder row standing in for a referenced key that no
    /// item has defined yet.
    ///
    /// Placeholders are exempt from required-field checks until a later
    /// write defines them, and commit leaves an existing row with the same
    /// key untouched.
    fn insert_placeholder(&mut self, model: &str, entity: Entity) -> StoreResult<()>;

    /// Stages a new state for an existing row.
    fn update(&mut self, model: &str, entity: Entity) -> StoreResult<()>;

    /// Stages a deletion. Returns false if there was no such row.
    fn delete(&mut self, model: &str, key: &NativeKey) -> StoreResult<bool>;

    /// Read view of this session.
    fn as_reader(&self) -> &dyn StoreReader;

    /// Applies every staged write atomically.
    ///
    /// Fails without applying anything on integrity violations: duplicate
    /// keys, null required fields, unknown models.
    fn commit(self: Box<Self>) -> StoreResult<()>;
}

/// A row reported by [`SyncStore::query_changed_since`].
#[derive(Debug, Clone, PartialEq)]
pub struct ChangedRow {
    /// Row state; for tombstones, the last state before deletion.
    pub entity: Entity,
    /// When the row last changed.
    pub timestamp: ChangeTimestamp,
    /// True for rows deleted since the cursor.
    pub is_deleted: bool,
}

/// A store the engine can reconcile against.
pub trait SyncStore: Send + Sync {
    /// Returns true if the store has a backing model with this name.
    fn has_model(&self, model: &str) -> bool;

    /// Opens a session.
    fn begin(&self) -> Box<dyn StoreSession + '_>;

    /// Rows of a model changed strictly after `since`, tombstones included,
    /// ordered by timestamp. Without a cursor: every live row, no
    /// tombstones.
    fn query_changed_since(
        &self,
        model: &str,
        since: Option<ChangeTimestamp>,
    ) -> StoreResult<Vec<ChangedRow>>;
}
