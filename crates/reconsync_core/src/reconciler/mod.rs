//! The reconciliation coordinator.
//!
//! [`Reconciler`] ties the registry, the merge engine, the reference
//! resolver and the hooks to a [`SyncStore`]. It owns no mutable state: all
//! consistency across concurrent requests is left to the store.

mod download;
mod upload;

pub use upload::ItemOutcome;

use crate::config::ReconcilerConfig;
use crate::schema::TypeRegistry;
use crate::store::SyncStore;
use std::sync::Arc;

/// Upload and download coordinator.
pub struct Reconciler<S> {
    registry: Arc<TypeRegistry>,
    store: Arc<S>,
    config: ReconcilerConfig,
}

impl<S: SyncStore> Reconciler<S> {
    /// Creates a reconciler with the default configuration.
    pub fn new(registry: Arc<TypeRegistry>, store: Arc<S>) -> Self {
        Self {
            registry,
            store,
            config: ReconcilerConfig::default(),
        }
    }

    /// Replaces the configuration.
    #[must_use]
    pub fn with_config(mut self, config: ReconcilerConfig) -> Self {
        self.config = config;
        self
    }

    /// The registry this reconciler serves.
    pub fn registry(&self) -> &TypeRegistry {
        &self.registry
    }

    /// The backing store.
    pub fn store(&self) -> &Arc<S> {
        &self.store
    }

    /// The engine configuration.
    pub fn config(&self) -> &ReconcilerConfig {
        &self.config
    }
}

impl<S> Clone for Reconciler<S> {
    fn clone(&self) -> Self {
        Self {
            registry: Arc::clone(&self.registry),
            store: Arc::clone(&self.store),
            config: self.config.clone(),
        }
    }
}
