//! Upload command implementation.

use super::{open_server, CommandResult};
use reconsync_core::RequestContext;
use reconsync_protocol::UploadResponse;
use std::path::Path;

/// Applies the batch in `batch` and persists the store to `data`.
pub fn execute(
    schema: &Path,
    data: &Path,
    batch: &Path,
    principal: Option<String>,
) -> CommandResult<UploadResponse> {
    let server = open_server(schema, data)?;
    let body = std::fs::read(batch)?;
    let context = match principal {
        Some(principal) => RequestContext::for_principal(principal),
        None => RequestContext::anonymous(),
    };

    let bytes = server.handle_upload_json(&body, &context)?;
    let response: UploadResponse = reconsync_protocol::from_json_slice(&bytes)?;
    server.reconciler().store().save_to_path(data)?;

    let stats = server.stats();
    tracing::info!(
        committed = stats.items_committed,
        failed = stats.items_failed,
        skipped = stats.items_skipped,
        "batch applied"
    );
    Ok(response)
}

/// Runs the upload command.
pub fn run(schema: &Path, data: &Path, batch: &Path, principal: Option<String>) -> CommandResult<()> {
    let response = execute(schema, data, batch, principal)?;
    println!("{}", serde_json::to_string_pretty(&response)?);
    Ok(())
}
