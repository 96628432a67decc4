//! Download command implementation.

use super::{open_server, CommandResult};
use reconsync_core::RequestContext;
use reconsync_protocol::{DownloadCursor, DownloadRequest, DownloadResponse};
use serde_json::Value;
use std::path::Path;

/// Reads a cursor file. Accepts either a bare cursor object or a whole
/// download response, whose `nextCursor` is used.
pub fn read_cursor(path: &Path) -> CommandResult<DownloadCursor> {
    let text = std::fs::read_to_string(path)?;
    let mut value: Value = serde_json::from_str(&text)?;
    if let Some(next) = value.get_mut("nextCursor") {
        value = next.take();
    }
    Ok(serde_json::from_value(value)?)
}

/// Builds a download response for `types`.
pub fn execute(
    schema: &Path,
    data: &Path,
    types: Vec<String>,
    cursor: Option<&Path>,
) -> CommandResult<DownloadResponse> {
    let server = open_server(schema, data)?;
    let request = match cursor {
        Some(path) => DownloadRequest::since(types, read_cursor(path)?),
        None => DownloadRequest::full(types),
    };
    Ok(server.handle_download(&request, &RequestContext::anonymous())?)
}

/// Runs the download command.
pub fn run(
    schema: &Path,
    data: &Path,
    types: Vec<String>,
    cursor: Option<&Path>,
) -> CommandResult<()> {
    let response = execute(schema, data, types, cursor)?;
    println!("{}", serde_json::to_string_pretty(&response)?);
    Ok(())
}
