//! Per-type field tables.

use crate::entity::Entity;
use crate::error::{SchemaError, SchemaResult, SyncError, SyncResult};
use crate::hook::{SyncHook, VisibilityFilter};
use crate::key::{KeyStrategy, NativeKey};
use crate::value::{FieldType, FieldValue};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

/// A scalar field of a registered type.
///
/// Schema files may omit `nullable`; it then follows the same rule as
/// [`FieldDescriptor::new`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "FieldDescriptorDef")]
pub struct FieldDescriptor {
    /// Field name as it appears in payloads.
    pub name: String,
    /// Declared type.
    #[serde(rename = "type")]
    pub field_type: FieldType,
    /// Whether `null` is a legal value.
    pub nullable: bool,
    /// Whether the store rejects rows leaving this field null.
    pub required: bool,
    /// Excluded fields are never written by uploads nor shipped on download.
    pub excluded: bool,
}

#[derive(Deserialize)]
struct FieldDescriptorDef {
    name: String,
    #[serde(rename = "type")]
    field_type: FieldType,
    #[serde(default)]
    nullable: Option<bool>,
    #[serde(default)]
    required: bool,
    #[serde(default)]
    excluded: bool,
}

impl From<FieldDescriptorDef> for FieldDescriptor {
    fn from(def: FieldDescriptorDef) -> Self {
        let mut field = FieldDescriptor::new(def.name, def.field_type);
        if let Some(nullable) = def.nullable {
            field.nullable = nullable;
        }
        field.required = def.required;
        field.excluded = def.excluded;
        field
    }
}

impl FieldDescriptor {
    /// Creates a field. Text fields are nullable by default, others are not.
    #[must_use]
    pub fn new(name: impl Into<String>, field_type: FieldType) -> Self {
        Self {
            name: name.into(),
            field_type,
            nullable: field_type == FieldType::Text,
            required: false,
            excluded: false,
        }
    }

    /// Creates a nullable text field.
    #[must_use]
    pub fn text(name: impl Into<String>) -> Self {
        Self::new(name, FieldType::Text)
    }

    /// Creates an integer field.
    #[must_use]
    pub fn integer(name: impl Into<String>) -> Self {
        Self::new(name, FieldType::Integer)
    }

    /// Creates a float field.
    #[must_use]
    pub fn float(name: impl Into<String>) -> Self {
        Self::new(name, FieldType::Float)
    }

    /// Creates a boolean field.
    #[must_use]
    pub fn bool(name: impl Into<String>) -> Self {
        Self::new(name, FieldType::Bool)
    }

    /// Creates a UUID field.
    #[must_use]
    pub fn uuid(name: impl Into<String>) -> Self {
        Self::new(name, FieldType::Uuid)
    }

    /// Sets nullability.
    #[must_use]
    pub fn nullable(mut self, nullable: bool) -> Self {
        self.nullable = nullable;
        self
    }

    /// Marks the field required.
    #[must_use]
    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }

    /// Marks the field excluded from sync.
    #[must_use]
    pub fn excluded(mut self) -> Self {
        self.excluded = true;
        self
    }

    /// Value a freshly created entity holds for this field.
    #[must_use]
    pub fn default_value(&self) -> FieldValue {
        if self.nullable {
            FieldValue::Null
        } else {
            self.field_type.zero()
        }
    }

    /// Converts a payload value for this field.
    pub fn coerce(&self, value: &Value) -> SyncResult<FieldValue> {
        let coerced = self
            .field_type
            .coerce(value)
            .map_err(|reason| SyncError::field_coercion(&self.name, reason))?;
        if coerced.is_null() && !self.nullable {
            return Err(SyncError::field_coercion(&self.name, "field is not nullable"));
        }
        Ok(coerced)
    }
}

/// A reference-collection field: a set of keys of another registered type.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReferenceDescriptor {
    /// Field name as it appears in payloads.
    pub name: String,
    /// Wire name of the target type.
    pub target: String,
}

/// A payload member resolved against a descriptor.
#[derive(Debug, Clone, Copy)]
pub enum Member<'a> {
    /// A key field.
    Key(&'a FieldDescriptor),
    /// An ordinary scalar field.
    Field(&'a FieldDescriptor),
    /// A reference-collection field.
    Reference(&'a ReferenceDescriptor),
}

#[derive(Debug, Clone, Copy)]
enum Slot {
    Field(usize),
    Reference(usize),
}

/// Everything the engine knows about one registered type.
///
/// Built once through [`TypeDescriptor::builder`] and immutable afterwards.
pub struct TypeDescriptor {
    name: String,
    model: String,
    key_fields: Vec<String>,
    key: KeyStrategy,
    fields: Vec<FieldDescriptor>,
    references: Vec<ReferenceDescriptor>,
    exact: HashMap<String, Slot>,
    folded: HashMap<String, Option<Slot>>,
    hook: Option<Arc<dyn SyncHook>>,
    visibility: Option<Arc<dyn VisibilityFilter>>,
}

impl fmt::Debug for TypeDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TypeDescriptor")
            .field("name", &self.name)
            .field("model", &self.model)
            .field("key_fields", &self.key_fields)
            .field("key", &self.key)
            .field("fields", &self.fields)
            .field("references", &self.references)
            .field("has_hook", &self.hook.is_some())
            .field("has_visibility", &self.visibility.is_some())
            .finish()
    }
}

impl TypeDescriptor {
    /// Starts building a descriptor for a wire type name.
    pub fn builder(name: impl Into<String>) -> TypeDescriptorBuilder {
        TypeDescriptorBuilder::new(name)
    }

    /// Wire type name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Store model name.
    pub fn model(&self) -> &str {
        &self.model
    }

    /// Key field names, in key-component order.
    pub fn key_fields(&self) -> &[String] {
        &self.key_fields
    }

    /// Key strategy.
    pub fn key_strategy(&self) -> &KeyStrategy {
        &self.key
    }

    /// All scalar fields, key fields included.
    pub fn fields(&self) -> &[FieldDescriptor] {
        &self.fields
    }

    /// Reference-collection fields.
    pub fn references(&self) -> &[ReferenceDescriptor] {
        &self.references
    }

    /// Looks up a scalar field by exact name.
    pub fn field(&self, name: &str) -> Option<&FieldDescriptor> {
        match self.exact.get(name) {
            Some(Slot::Field(i)) => self.fields.get(*i),
            _ => None,
        }
    }

    /// Looks up a reference field by exact name.
    pub fn reference(&self, name: &str) -> Option<&ReferenceDescriptor> {
        match self.exact.get(name) {
            Some(Slot::Reference(i)) => self.references.get(*i),
            _ => None,
        }
    }

    /// Returns true if `name` is a key field.
    pub fn is_key_field(&self, name: &str) -> bool {
        self.key_fields.iter().any(|k| k == name)
    }

    /// Resolves a payload member name. Exact matches win; with
    /// `case_insensitive` an unambiguous case-folded match is accepted.
    pub fn member(&self, name: &str, case_insensitive: bool) -> Option<Member<'_>> {
        let slot = match self.exact.get(name) {
            Some(slot) => *slot,
            None if case_insensitive => self.folded.get(&name.to_lowercase()).copied().flatten()?,
            None => return None,
        };
        match slot {
            Slot::Field(i) => {
                let field = self.fields.get(i)?;
                if self.is_key_field(&field.name) {
                    Some(Member::Key(field))
                } else {
                    Some(Member::Field(field))
                }
            }
            Slot::Reference(i) => self.references.get(i).map(Member::Reference),
        }
    }

    /// The type's own hook, if one was installed.
    pub fn hook(&self) -> Option<&Arc<dyn SyncHook>> {
        self.hook.as_ref()
    }

    /// Returns true if the caller may download the entity.
    pub fn is_visible(&self, context: &crate::RequestContext, entity: &Entity) -> bool {
        self.visibility
            .as_ref()
            .map_or(true, |filter| filter.is_visible(context, entity))
    }

    /// Fields the store must see non-null on commit.
    pub fn required_fields(&self) -> impl Iterator<Item = &str> {
        self.fields
            .iter()
            .filter(|f| f.required)
            .map(|f| f.name.as_str())
    }

    /// Checks that a native key fits this type's key fields.
    pub fn check_key(&self, key: &NativeKey) -> SyncResult<()> {
        if key.len() != self.key_fields.len() {
            return Err(SyncError::key_resolution(
                &self.name,
                key.to_string(),
                format!(
                    "expected {} key components, found {}",
                    self.key_fields.len(),
                    key.len()
                ),
            ));
        }
        Ok(())
    }

    /// Copies the entity's key components into its key fields.
    pub fn write_key_fields(&self, entity: &mut Entity) {
        let Some(key) = entity.key().cloned() else {
            return;
        };
        for (field, component) in self.key_fields.iter().zip(key.components()) {
            entity.set(field.clone(), component.to_field_value());
        }
    }

    /// Resets every non-key, non-excluded field to its default.
    pub fn apply_defaults(&self, entity: &mut Entity) {
        for field in &self.fields {
            if field.excluded || self.is_key_field(&field.name) {
                continue;
            }
            entity.set(field.name.clone(), field.default_value());
        }
    }
}

/// Builder for [`TypeDescriptor`].
pub struct TypeDescriptorBuilder {
    name: String,
    model: Option<String>,
    key_fields: Vec<String>,
    key: KeyStrategy,
    fields: Vec<FieldDescriptor>,
    references: Vec<ReferenceDescriptor>,
    hook: Option<Arc<dyn SyncHook>>,
    visibility: Option<Arc<dyn VisibilityFilter>>,
}

impl TypeDescriptorBuilder {
    fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            model: None,
            key_fields: vec!["Id".to_string()],
            key: KeyStrategy::default(),
            fields: Vec::new(),
            references: Vec::new(),
            hook: None,
            visibility: None,
        }
    }

    /// Sets the store model name (defaults to the wire name).
    #[must_use]
    pub fn model(mut self, model: impl Into<String>) -> Self {
        self.model = Some(model.into());
        self
    }

    /// Sets a single key field and its strategy. The default is a text key
    /// named `Id`.
    #[must_use]
    pub fn key(mut self, field: impl Into<String>, strategy: KeyStrategy) -> Self {
        self.key_fields = vec![field.into()];
        self.key = strategy;
        self
    }

    /// Sets several key fields and their strategy.
    #[must_use]
    pub fn composite_key<I, S>(mut self, fields: I, strategy: KeyStrategy) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.key_fields = fields.into_iter().map(Into::into).collect();
        self.key = strategy;
        self
    }

    /// Adds a scalar field.
    #[must_use]
    pub fn field(mut self, field: FieldDescriptor) -> Self {
        self.fields.push(field);
        self
    }

    /// Adds a reference-collection field.
    #[must_use]
    pub fn reference(mut self, name: impl Into<String>, target: impl Into<String>) -> Self {
        self.references.push(ReferenceDescriptor {
            name: name.into(),
            target: target.into(),
        });
        self
    }

    /// Installs this type's validation hook.
    #[must_use]
    pub fn hook(mut self, hook: impl SyncHook + 'static) -> Self {
        self.hook = Some(Arc::new(hook));
        self
    }

    /// Installs a shared validation hook.
    #[must_use]
    pub fn shared_hook(mut self, hook: Arc<dyn SyncHook>) -> Self {
        self.hook = Some(hook);
        self
    }

    /// Installs a download visibility filter.
    #[must_use]
    pub fn visibility(mut self, filter: impl VisibilityFilter + 'static) -> Self {
        self.visibility = Some(Arc::new(filter));
        self
    }

    /// Validates the declaration and builds the descriptor.
    ///
    /// Key fields that were not declared are added with the type their key
    /// component requires.
    pub fn build(mut self) -> SchemaResult<TypeDescriptor> {
        let invalid_key = |reason: String| SchemaError::InvalidKey {
            type_name: self.name.clone(),
            reason,
        };

        if self.key_fields.is_empty() {
            return Err(invalid_key("no key fields".into()));
        }
        let kinds = self.key.component_kinds();
        if let Some(kinds) = &kinds {
            if kinds.len() != self.key_fields.len() {
                return Err(invalid_key(format!(
                    "{} key fields for a {}-component key",
                    self.key_fields.len(),
                    kinds.len()
                )));
            }
        }

        for (i, key_field) in self.key_fields.iter().enumerate() {
            let expected = kinds.as_ref().and_then(|k| k.get(i)).map(|k| k.field_type());
            match self.fields.iter().find(|f| &f.name == key_field) {
                Some(field) => {
                    if field.excluded || field.nullable {
                        return Err(invalid_key(format!(
                            "key field {key_field} cannot be excluded or nullable"
                        )));
                    }
                    if let Some(expected) = expected {
                        if field.field_type != expected {
                            return Err(invalid_key(format!(
                                "key field {key_field} is {} but the key needs {expected}",
                                field.field_type
                            )));
                        }
                    }
                }
                None => {
                    let Some(expected) = expected else {
                        return Err(invalid_key(format!(
                            "key field {key_field} must be declared for a custom key"
                        )));
                    };
                    self.fields
                        .push(FieldDescriptor::new(key_field.clone(), expected).nullable(false));
                }
            }
        }

        let mut exact = HashMap::new();
        let mut folded: HashMap<String, Option<Slot>> = HashMap::new();
        let names = self
            .fields
            .iter()
            .enumerate()
            .map(|(i, f)| (f.name.as_str(), Slot::Field(i)))
            .chain(
                self.references
                    .iter()
                    .enumerate()
                    .map(|(i, r)| (r.name.as_str(), Slot::Reference(i))),
            );
        for (name, slot) in names {
            if exact.insert(name.to_string(), slot).is_some() {
                return Err(SchemaError::DuplicateField {
                    type_name: self.name.clone(),
                    field: name.to_string(),
                });
            }
            folded
                .entry(name.to_lowercase())
                .and_modify(|existing| *existing = None)
                .or_insert(Some(slot));
        }

        Ok(TypeDescriptor {
            model: self.model.unwrap_or_else(|| self.name.clone()),
            name: self.name,
            key_fields: self.key_fields,
            key: self.key,
            fields: self.fields,
            references: self.references,
            exact,
            folded,
            hook: self.hook,
            visibility: self.visibility,
        })
    }
}
