//! A server over an in-memory store, with assertion helpers.

use crate::fixtures::{fixture_registry, UNMODELED_OBJECT};
use reconsync_core::{
    Entity, MemoryStore, ModelDef, NativeKey, Reconciler, ReconcilerConfig, RequestContext,
    ResolvedKey, SyncStore, TypeDescriptor, TypeRegistry,
};
use reconsync_protocol::{
    ChangeItem, DownloadCursor, DownloadRequest, DownloadResponse, UploadRequest, UploadResponse,
};
use reconsync_server::{ServerConfig, SyncServer};
use std::sync::Arc;

/// A test server with automatic fixture setup.
///
/// Every registered type gets a store model except [`UNMODELED_OBJECT`].
pub struct TestHarness {
    server: SyncServer<MemoryStore>,
}

impl TestHarness {
    /// Creates a harness over the fixture registry.
    pub fn new() -> Self {
        Self::with_registry(fixture_registry())
    }

    /// Creates a harness over a custom registry.
    pub fn with_registry(registry: TypeRegistry) -> Self {
        Self::build(registry, ReconcilerConfig::default(), ServerConfig::default())
    }

    /// Creates a harness over the fixture registry with engine options.
    pub fn with_config(config: ReconcilerConfig) -> Self {
        Self::build(fixture_registry(), config, ServerConfig::default())
    }

    /// Creates a harness from all its parts.
    pub fn build(registry: TypeRegistry, config: ReconcilerConfig, server: ServerConfig) -> Self {
        let store = MemoryStore::new();
        for descriptor in registry.iter().filter(|d| d.name() != UNMODELED_OBJECT) {
            store.register_model(ModelDef::for_descriptor(descriptor));
        }
        let reconciler =
            Reconciler::new(Arc::new(registry), Arc::new(store)).with_config(config);
        Self {
            server: SyncServer::new(server, reconciler),
        }
    }

    /// The server under test.
    pub fn server(&self) -> &SyncServer<MemoryStore> {
        &self.server
    }

    /// The backing store.
    pub fn store(&self) -> &MemoryStore {
        self.server.reconciler().store()
    }

    /// The registry.
    pub fn registry(&self) -> &TypeRegistry {
        self.server.reconciler().registry()
    }

    /// Uploads a batch anonymously.
    pub fn upload(&self, items: Vec<ChangeItem>) -> UploadResponse {
        self.upload_as(&RequestContext::anonymous(), items)
    }

    /// Uploads a batch with a caller context.
    pub fn upload_as(&self, context: &RequestContext, items: Vec<ChangeItem>) -> UploadResponse {
        self.server
            .handle_upload(&UploadRequest::new(items), context)
            .expect("upload accepted")
    }

    /// Downloads full snapshots of `types`.
    pub fn download(&self, types: &[&str]) -> DownloadResponse {
        self.download_as(&RequestContext::anonymous(), DownloadRequest::full(types.iter().copied()))
    }

    /// Downloads changes of `types` since `cursor`.
    pub fn download_since(&self, types: &[&str], cursor: DownloadCursor) -> DownloadResponse {
        self.download_as(
            &RequestContext::anonymous(),
            DownloadRequest::since(types.iter().copied(), cursor),
        )
    }

    /// Downloads with a caller context.
    pub fn download_as(&self, context: &RequestContext, request: DownloadRequest) -> DownloadResponse {
        self.server
            .handle_download(&request, context)
            .expect("download accepted")
    }

    /// Looks up a row by its wire key.
    pub fn get(&self, type_name: &str, raw_key: &str) -> Option<Entity> {
        let descriptor = self.descriptor(type_name);
        let key = self.resolve(descriptor, raw_key);
        self.store()
            .get(descriptor.model(), &key)
            .expect("model exists")
    }

    /// Number of live rows of a type.
    pub fn count(&self, type_name: &str) -> usize {
        let model = self.descriptor(type_name).model().to_string();
        self.store()
            .stats()
            .into_iter()
            .find(|m| m.name == model)
            .map_or(0, |m| m.rows)
    }

    /// Writes a row straight into the store, bypassing the engine, the way
    /// a server-side process would. Without `raw_key` the store assigns one.
    pub fn insert_direct(
        &self,
        type_name: &str,
        raw_key: Option<&str>,
        fill: impl FnOnce(&mut Entity),
    ) -> NativeKey {
        let descriptor = self.descriptor(type_name);
        let model = descriptor.model();
        let mut session = self.store().begin();
        let mut entity = match raw_key {
            Some(raw) => Entity::with_key(self.resolve(descriptor, raw)),
            None => session.create(model).expect("store assigns a key"),
        };
        let key = entity.key().cloned().expect("entity has a key");
        descriptor.apply_defaults(&mut entity);
        fill(&mut entity);
        descriptor.write_key_fields(&mut entity);
        session.insert(model, entity).expect("insert staged");
        session.commit().expect("direct insert commits");
        key
    }

    fn descriptor(&self, type_name: &str) -> &TypeDescriptor {
        self.registry()
            .get(type_name)
            .unwrap_or_else(|| panic!("{type_name} is not registered"))
    }

    fn resolve(&self, descriptor: &TypeDescriptor, raw_key: &str) -> NativeKey {
        match descriptor
            .key_strategy()
            .resolve(descriptor.name(), raw_key)
            .expect("valid key")
        {
            ResolvedKey::Known(key) => key,
            ResolvedKey::Unassigned => panic!("{raw_key:?} does not name a row"),
        }
    }
}

impl Default for TestHarness {
    fn default() -> Self {
        Self::new()
    }
}
