//! Main sync server.

use crate::config::ServerConfig;
use crate::error::ServerResult;
use crate::handler::{HandlerContext, RequestHandler};
use crate::stats::StatsSnapshot;
use reconsync_core::{Reconciler, RequestContext, SyncStore};
use reconsync_protocol::{DownloadRequest, DownloadResponse, UploadRequest, UploadResponse};
use std::sync::Arc;

/// The sync server.
///
/// Wraps a [`Reconciler`] with request limits and counters. It has no
/// transport of its own: an HTTP or RPC layer decodes the caller's
/// identity into a [`RequestContext`] and calls one of the `handle_*`
/// methods.
///
/// # Example
///
/// ```
/// use reconsync_core::{FieldDescriptor, MemoryStore, Reconciler, TypeDescriptor, TypeRegistry};
/// use reconsync_server::{ServerConfig, SyncServer};
/// use std::sync::Arc;
///
/// let registry = TypeRegistry::builder()
///     .register(TypeDescriptor::builder("Note").field(FieldDescriptor::text("Text")).build().unwrap())
///     .build()
///     .unwrap();
/// let store = MemoryStore::for_registry(&registry);
/// let server = SyncServer::new(
///     ServerConfig::default(),
///     Reconciler::new(Arc::new(registry), Arc::new(store)),
/// );
/// assert_eq!(server.stats().upload_batches, 0);
/// ```
pub struct SyncServer<S> {
    handler: RequestHandler<S>,
    context: Arc<HandlerContext<S>>,
}

impl<S: SyncStore> SyncServer<S> {
    /// Creates a new sync server.
    pub fn new(config: ServerConfig, reconciler: Reconciler<S>) -> Self {
        let context = Arc::new(HandlerContext::new(config, reconciler));
        let handler = RequestHandler::new(Arc::clone(&context));

        tracing::info!(
            types = context.reconciler.registry().len(),
            max_upload_batch = context.config.max_upload_batch,
            "sync server ready"
        );
        Self { handler, context }
    }

    /// Handles an upload request.
    pub fn handle_upload(
        &self,
        request: &UploadRequest,
        context: &RequestContext,
    ) -> ServerResult<UploadResponse> {
        self.handler.handle_upload(request, context)
    }

    /// Handles a download request.
    pub fn handle_download(
        &self,
        request: &DownloadRequest,
        context: &RequestContext,
    ) -> ServerResult<DownloadResponse> {
        self.handler.handle_download(request, context)
    }

    /// Handles a JSON-encoded upload request.
    pub fn handle_upload_json(&self, body: &[u8], context: &RequestContext) -> ServerResult<Vec<u8>> {
        self.handler.handle_upload_json(body, context)
    }

    /// Handles a JSON-encoded download request.
    pub fn handle_download_json(
        &self,
        body: &[u8],
        context: &RequestContext,
    ) -> ServerResult<Vec<u8>> {
        self.handler.handle_download_json(body, context)
    }

    /// The server configuration.
    pub fn config(&self) -> &ServerConfig {
        &self.context.config
    }

    /// The wrapped reconciler.
    pub fn reconciler(&self) -> &Reconciler<S> {
        &self.context.reconciler
    }

    /// Current counter values.
    pub fn stats(&self) -> StatsSnapshot {
        self.context.stats.snapshot()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use reconsync_core::{FieldDescriptor, MemoryStore, TypeDescriptor, TypeRegistry};
    use reconsync_protocol::{ChangeItem, Payload};

    fn create_server() -> SyncServer<MemoryStore> {
        let registry = TypeRegistry::builder()
            .register(
                TypeDescriptor::builder("Note")
                    .field(FieldDescriptor::text("Text"))
                    .build()
                    .unwrap(),
            )
            .build()
            .unwrap();
        let store = MemoryStore::for_registry(&registry);
        SyncServer::new(
            ServerConfig::default(),
            Reconciler::new(Arc::new(registry), Arc::new(store)),
        )
    }

    #[test]
    fn server_lifecycle() {
        let server = create_server();
        assert_eq!(server.config().max_upload_batch, 1000);
        assert_eq!(server.stats(), StatsSnapshot::default());
    }

    #[test]
    fn full_sync_flow() {
        let server = create_server();
        let ctx = RequestContext::for_principal("device-1");

        let mut payload = Payload::new();
        payload.insert("Text".into(), "hello".into());
        let upload = UploadRequest::new(vec![ChangeItem::upsert("Note", "n1", payload)]);
        assert!(server.handle_upload(&upload, &ctx).unwrap().all_succeeded());

        let first = server
            .handle_download(&DownloadRequest::full(["Note"]), &ctx)
            .unwrap();
        assert_eq!(first.changed_objects.len(), 1);

        let again = server
            .handle_download(&DownloadRequest::since(["Note"], first.next_cursor.clone()), &ctx)
            .unwrap();
        assert!(again.changed_objects.is_empty());

        let stats = server.stats();
        assert_eq!(stats.items_committed, 1);
        assert_eq!(stats.downloads, 2);
        assert_eq!(stats.objects_downloaded, 1);
    }
}
