//! Request handlers for the upload and download endpoints.

use crate::config::ServerConfig;
use crate::error::{ServerError, ServerResult};
use crate::stats::ServerStats;
use reconsync_core::{Reconciler, RequestContext, SyncStore};
use reconsync_protocol::{
    from_json_slice, to_json_vec, DownloadRequest, DownloadResponse, UploadRequest,
    UploadResponse,
};
use std::sync::Arc;

/// Context shared by every handler of one server.
pub struct HandlerContext<S> {
    /// Server configuration.
    pub config: ServerConfig,
    /// The reconciliation engine.
    pub reconciler: Reconciler<S>,
    /// Request counters.
    pub stats: ServerStats,
}

impl<S: SyncStore> HandlerContext<S> {
    /// Creates a new handler context.
    pub fn new(config: ServerConfig, reconciler: Reconciler<S>) -> Self {
        Self {
            config,
            reconciler,
            stats: ServerStats::new(),
        }
    }
}

/// Handler for sync requests.
pub struct RequestHandler<S> {
    context: Arc<HandlerContext<S>>,
}

impl<S: SyncStore> RequestHandler<S> {
    /// Creates a new request handler.
    pub fn new(context: Arc<HandlerContext<S>>) -> Self {
        Self { context }
    }

    /// Handles an upload request.
    ///
    /// Only limit violations fail the request; item failures are reported
    /// in the response.
    pub fn handle_upload(
        &self,
        request: &UploadRequest,
        context: &RequestContext,
    ) -> ServerResult<UploadResponse> {
        let limit = self.context.config.max_upload_batch;
        if request.len() > limit {
            self.context.stats.record_rejected();
            return Err(ServerError::InvalidRequest(format!(
                "Too many changes: {} > {}",
                request.len(),
                limit
            )));
        }

        let response = self.context.reconciler.upload(request, context);
        let failed = response.failures().count();
        let reported = response.results.len();
        self.context.stats.record_upload(
            (reported - failed) as u64,
            failed as u64,
            (request.len() - reported) as u64,
        );
        Ok(response)
    }

    /// Handles a download request.
    pub fn handle_download(
        &self,
        request: &DownloadRequest,
        context: &RequestContext,
    ) -> ServerResult<DownloadResponse> {
        let limit = self.context.config.max_download_types;
        if request.types.len() > limit {
            self.context.stats.record_rejected();
            return Err(ServerError::InvalidRequest(format!(
                "Too many types: {} > {}",
                request.types.len(),
                limit
            )));
        }

        let response = self.context.reconciler.download(request, context);
        self.context
            .stats
            .record_download(response.changed_objects.len() as u64);
        Ok(response)
    }

    /// Decodes a JSON upload body, handles it and encodes the response.
    pub fn handle_upload_json(&self, body: &[u8], context: &RequestContext) -> ServerResult<Vec<u8>> {
        let request: UploadRequest = from_json_slice(body).inspect_err(|error| {
            self.context.stats.record_rejected();
            tracing::warn!(error = %error, "undecodable upload body");
        })?;
        let response = self.handle_upload(&request, context)?;
        Ok(to_json_vec(&response)?)
    }

    /// Decodes a JSON download body, handles it and encodes the response.
    pub fn handle_download_json(
        &self,
        body: &[u8],
        context: &RequestContext,
    ) -> ServerResult<Vec<u8>> {
        let request: DownloadRequest = from_json_slice(body).inspect_err(|error| {
            self.context.stats.record_rejected();
            tracing::warn!(error = %error, "undecodable download body");
        })?;
        let response = self.handle_download(&request, context)?;
        Ok(to_json_vec(&response)?)
    }
}
