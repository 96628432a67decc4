//! Schema validation command.

use super::{load_registry, CommandResult};
use std::path::Path;

/// One line of the schema report.
#[derive(Debug)]
pub struct TypeSummary {
    /// Wire type name.
    pub name: String,
    /// Store model.
    pub model: String,
    /// Key fields.
    pub key_fields: Vec<String>,
    /// Scalar field count.
    pub fields: usize,
    /// Reference fields.
    pub references: usize,
}

/// Validates the schema and summarizes its types.
pub fn execute(schema: &Path) -> CommandResult<Vec<TypeSummary>> {
    let registry = load_registry(schema)?;
    Ok(registry
        .iter()
        .map(|ty| TypeSummary {
            name: ty.name().to_string(),
            model: ty.model().to_string(),
            key_fields: ty.key_fields().to_vec(),
            fields: ty.fields().len(),
            references: ty.references().len(),
        })
        .collect())
}

/// Runs the check-schema command.
pub fn run(schema: &Path) -> CommandResult<()> {
    let types = execute(schema)?;
    println!("Schema OK: {} types", types.len());
    for ty in &types {
        println!(
            "  {} (model {}, key {}) {} fields, {} references",
            ty.name,
            ty.model,
            ty.key_fields.join("+"),
            ty.fields,
            ty.references
        );
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::fixtures::{write, SCHEMA};

    #[test]
    fn valid_schema() {
        let dir = tempfile::tempdir().unwrap();
        let schema = write(dir.path(), "schema.json", SCHEMA);
        let types = execute(&schema).unwrap();
        assert_eq!(types.len(), 2);
        let note = types.iter().find(|t| t.name == "Note").unwrap();
        assert_eq!(note.key_fields, ["Id"]);
        assert_eq!(note.references, 1);
    }

    #[test]
    fn dangling_reference_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let schema = write(
            dir.path(),
            "schema.json",
            r#"{"types": [{"name": "A", "references": [{"name": "B", "target": "Missing"}]}]}"#,
        );
        let err = execute(&schema).unwrap_err();
        assert!(err.to_string().contains("Missing"));
    }
}
