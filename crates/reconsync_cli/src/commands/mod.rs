//! CLI command implementations.

pub mod check_schema;
pub mod download;
pub mod inspect;
pub mod upload;

use reconsync_core::{MemoryStore, Reconciler, SchemaConfig, TypeRegistry};
use reconsync_server::{ServerConfig, SyncServer};
use std::path::Path;
use std::sync::Arc;

/// Result type shared by all commands.
pub type CommandResult<T> = Result<T, Box<dyn std::error::Error>>;

/// Loads and validates a schema file.
pub fn load_registry(schema: &Path) -> CommandResult<TypeRegistry> {
    Ok(SchemaConfig::load(schema)?.into_registry()?)
}

/// Opens the store snapshot at `data`, or an empty store if the file does
/// not exist yet. Models missing from the snapshot are added.
pub fn open_store(data: &Path, registry: &TypeRegistry) -> CommandResult<MemoryStore> {
    let store = if data.exists() {
        MemoryStore::load_from_path(data)?
    } else {
        tracing::debug!(path = %data.display(), "no snapshot yet, starting empty");
        MemoryStore::new()
    };
    store.ensure_models(registry);
    Ok(store)
}

/// Builds a server over the schema and store snapshot.
pub fn open_server(schema: &Path, data: &Path) -> CommandResult<SyncServer<MemoryStore>> {
    let registry = load_registry(schema)?;
    let store = open_store(data, &registry)?;
    let reconciler = Reconciler::new(Arc::new(registry), Arc::new(store));
    Ok(SyncServer::new(ServerConfig::default(), reconciler))
}
