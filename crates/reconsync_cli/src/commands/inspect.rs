//! Inspect command implementation.

use super::CommandResult;
use reconsync_core::{MemoryStore, ModelStats};
use serde::Serialize;
use std::path::Path;

/// Store inspection result.
#[derive(Debug, Serialize)]
pub struct InspectResult {
    /// Snapshot path.
    pub path: String,
    /// Live rows across all models.
    pub total_rows: usize,
    /// Tombstones across all models.
    pub total_tombstones: usize,
    /// Per-model statistics.
    pub models: Vec<ModelSummary>,
}

/// Statistics for a single model.
#[derive(Debug, Serialize)]
pub struct ModelSummary {
    /// Model name.
    pub name: String,
    /// Live rows.
    pub rows: usize,
    /// Tombstones.
    pub tombstones: usize,
}

impl From<ModelStats> for ModelSummary {
    fn from(stats: ModelStats) -> Self {
        Self {
            name: stats.name,
            rows: stats.rows,
            tombstones: stats.tombstones,
        }
    }
}

/// Collects statistics from the snapshot at `data`.
pub fn execute(data: &Path) -> CommandResult<InspectResult> {
    if !data.exists() {
        return Err(format!("No store found at {:?}", data).into());
    }
    let store = MemoryStore::load_from_path(data)?;
    let models: Vec<ModelSummary> = store.stats().into_iter().map(Into::into).collect();
    Ok(InspectResult {
        path: data.display().to_string(),
        total_rows: models.iter().map(|m| m.rows).sum(),
        total_tombstones: models.iter().map(|m| m.tombstones).sum(),
        models,
    })
}

/// Runs the inspect command.
pub fn run(data: &Path, format: &str) -> CommandResult<()> {
    let result = execute(data)?;
    match format {
        "json" => println!("{}", serde_json::to_string_pretty(&result)?),
        _ => print_text_output(&result),
    }
    Ok(())
}

fn print_text_output(result: &InspectResult) {
    println!("ReconSync Store Inspection");
    println!("==========================");
    println!();
    println!("Path: {}", result.path);
    println!();
    println!("Totals:");
    println!("  Live rows:  {}", result.total_rows);
    println!("  Tombstones: {}", result.total_tombstones);
    println!();
    println!("Models:");
    for model in &result.models {
        println!(
            "  {:<24} {} rows, {} tombstones",
            model.name, model.rows, model.tombstones
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::fixtures::{write, SCHEMA};
    use crate::commands::upload;

    #[test]
    fn counts_rows_and_tombstones() {
        let dir = tempfile::tempdir().unwrap();
        let schema = write(dir.path(), "schema.json", SCHEMA);
        let data = dir.path().join("store.json");
        let batch = write(
            dir.path(),
            "batch.json",
            r#"{"changes": [
                {"type": "Note", "primaryKey": "a", "payload": {"Text": "x"}},
                {"type": "Note", "primaryKey": "b", "payload": {"Text": "y"}},
                {"type": "Note", "primaryKey": "a", "isDeleted": true}
            ]}"#,
        );
        upload::execute(&schema, &data, &batch, None).unwrap();

        let result = execute(&data).unwrap();
        assert_eq!(result.total_rows, 1);
        assert_eq!(result.total_tombstones, 1);
        let names: Vec<_> = result.models.iter().map(|m| m.name.as_str()).collect();
        assert_eq!(names, ["Counter", "Note"]);
    }

    #[test]
    fn missing_store_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        assert!(execute(&dir.path().join("nope.json")).is_err());
    }
}
