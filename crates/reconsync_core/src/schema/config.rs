//! Declarative schema files.
//!
//! A [`SchemaConfig`] describes registered types as data so a registry can be
//! loaded from JSON instead of being built in code. Hooks and visibility
//! filters are code and cannot be expressed here.

use super::descriptor::{FieldDescriptor, ReferenceDescriptor, TypeDescriptor};
use super::registry::TypeRegistry;
use crate::error::SchemaResult;
use crate::key::{KeyKind, KeyStrategy};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Key declaration of a type in a schema file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "strategy", rename_all = "snake_case")]
pub enum KeyConfig {
    /// Single text key.
    Text {
        /// Key field.
        #[serde(default = "default_key_field")]
        field: String,
    },
    /// Single integer key.
    Integer {
        /// Key field.
        #[serde(default = "default_key_field")]
        field: String,
    },
    /// Single UUID key.
    Uuid {
        /// Key field.
        #[serde(default = "default_key_field")]
        field: String,
    },
    /// Store-assigned integer key.
    AutoIncrement {
        /// Key field.
        #[serde(default = "default_key_field")]
        field: String,
    },
    /// Multi-field key.
    Composite {
        /// Key fields, in component order.
        fields: Vec<String>,
        /// Component kinds.
        parts: Vec<KeyKind>,
        /// Wire separator.
        #[serde(default = "default_separator")]
        separator: String,
    },
}

fn default_key_field() -> String {
    "Id".to_string()
}

fn default_separator() -> String {
    "|".to_string()
}

impl Default for KeyConfig {
    fn default() -> Self {
        KeyConfig::Text {
            field: default_key_field(),
        }
    }
}

/// One type in a schema file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TypeConfig {
    /// Wire type name.
    pub name: String,
    /// Store model name, when it differs from the wire name.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
    /// Key declaration.
    #[serde(default)]
    pub key: KeyConfig,
    /// Scalar fields.
    #[serde(default)]
    pub fields: Vec<FieldDescriptor>,
    /// Reference-collection fields.
    #[serde(default)]
    pub references: Vec<ReferenceDescriptor>,
}

impl TypeConfig {
    /// Builds the descriptor for this type.
    pub fn into_descriptor(self) -> SchemaResult<TypeDescriptor> {
        let mut builder = TypeDescriptor::builder(self.name);
        if let Some(model) = self.model {
            builder = builder.model(model);
        }
        builder = match self.key {
            KeyConfig::Text { field } => builder.key(field, KeyStrategy::text()),
            KeyConfig::Integer { field } => builder.key(field, KeyStrategy::integer()),
            KeyConfig::Uuid { field } => builder.key(field, KeyStrategy::uuid()),
            KeyConfig::AutoIncrement { field } => builder.key(field, KeyStrategy::AutoIncrement),
            KeyConfig::Composite {
                fields,
                parts,
                separator,
            } => builder.composite_key(fields, KeyStrategy::composite(separator, parts)),
        };
        for field in self.fields {
            builder = builder.field(field);
        }
        for reference in self.references {
            builder = builder.reference(reference.name, reference.target);
        }
        builder.build()
    }
}

/// A whole schema file.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SchemaConfig {
    /// Registered types.
    pub types: Vec<TypeConfig>,
}

impl SchemaConfig {
    /// Parses a schema from JSON text.
    pub fn from_json(text: &str) -> SchemaResult<Self> {
        Ok(serde_json::from_str(text)?)
    }

    /// Reads a schema from a JSON file.
    pub fn load(path: impl AsRef<Path>) -> SchemaResult<Self> {
        let text = std::fs::read_to_string(path)?;
        Self::from_json(&text)
    }

    /// Builds a registry with the default accept-all hook.
    pub fn into_registry(self) -> SchemaResult<TypeRegistry> {
        let mut builder = TypeRegistry::builder();
        for ty in self.types {
            builder = builder.register(ty.into_descriptor()?);
        }
        builder.build()
    }
}
