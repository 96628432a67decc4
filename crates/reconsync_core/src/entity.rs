//! In-memory entity representation.

use crate::key::NativeKey;
use crate::value::FieldValue;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::ops::Deref;

/// A row of some registered type.
///
/// Scalar fields live in `values`; reference-collection fields hold the set
/// of target keys. Key fields are mirrored in `values` so they download like
/// any other field, but the row's identity is `key`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Entity {
    key: Option<NativeKey>,
    #[serde(default)]
    values: BTreeMap<String, FieldValue>,
    #[serde(default)]
    references: BTreeMap<String, BTreeSet<NativeKey>>,
}

impl Entity {
    /// Creates an entity without a key.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates an entity with the given key.
    #[must_use]
    pub fn with_key(key: NativeKey) -> Self {
        Self {
            key: Some(key),
            ..Self::default()
        }
    }

    /// Returns the entity's key, if it has been assigned.
    pub fn key(&self) -> Option<&NativeKey> {
        self.key.as_ref()
    }

    pub(crate) fn set_key(&mut self, key: NativeKey) {
        self.key = Some(key);
    }

    /// Returns a field value; unset fields read as null.
    pub fn get(&self, field: &str) -> &FieldValue {
        static NULL: FieldValue = FieldValue::Null;
        self.values.get(field).unwrap_or(&NULL)
    }

    /// Returns true if the field has been set.
    pub fn has(&self, field: &str) -> bool {
        self.values.contains_key(field)
    }

    /// Sets a field value.
    pub fn set(&mut self, field: impl Into<String>, value: impl Into<FieldValue>) {
        self.values.insert(field.into(), value.into());
    }

    /// Sets a field value (builder form).
    #[must_use]
    pub fn with(mut self, field: impl Into<String>, value: impl Into<FieldValue>) -> Self {
        self.set(field, value);
        self
    }

    /// Iterates over set fields in name order.
    pub fn values(&self) -> impl Iterator<Item = (&str, &FieldValue)> {
        self.values.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Returns the target keys of a reference field; empty when unset.
    pub fn references(&self, field: &str) -> impl Iterator<Item = &NativeKey> {
        self.references.get(field).into_iter().flatten()
    }

    /// Returns true if the reference field has ever been assigned.
    pub fn has_references(&self, field: &str) -> bool {
        self.references.contains_key(field)
    }

    /// Replaces the target set of a reference field.
    pub fn set_references(&mut self, field: impl Into<String>, targets: BTreeSet<NativeKey>) {
        self.references.insert(field.into(), targets);
    }

    /// Drops one target from a reference field. Returns true if it was there.
    pub fn remove_reference(&mut self, field: &str, target: &NativeKey) -> bool {
        self.references
            .get_mut(field)
            .is_some_and(|targets| targets.remove(target))
    }

    /// Iterates over assigned reference fields in name order.
    pub fn reference_fields(&self) -> impl Iterator<Item = (&str, &BTreeSet<NativeKey>)> {
        self.references.iter().map(|(k, v)| (k.as_str(), v))
    }
}

/// Detached copy of an entity taken before a merge.
///
/// Handed to validation hooks as the pre-image of an update.
#[derive(Debug, Clone, PartialEq)]
pub struct EntitySnapshot(Entity);

impl EntitySnapshot {
    /// Captures the current state of an entity.
    #[must_use]
    pub fn capture(entity: &Entity) -> Self {
        Self(entity.clone())
    }

    /// Consumes the snapshot, returning the captured entity.
    #[must_use]
    pub fn into_inner(self) -> Entity {
        self.0
    }
}

impl Deref for EntitySnapshot {
    type Target = Entity;

    fn deref(&self) -> &Entity {
        &self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unset_field_reads_null() {
        let entity = Entity::with_key(NativeKey::from("1")).with("Text", "a");
        assert_eq!(entity.get("Text"), &FieldValue::from("a"));
        assert!(entity.get("Missing").is_null());
        assert!(!entity.has("Missing"));
    }

    #[test]
    fn snapshot_is_detached() {
        let mut entity = Entity::new().with("Text", "before");
        let snapshot = EntitySnapshot::capture(&entity);
        entity.set("Text", "after");
        assert_eq!(snapshot.get("Text"), &FieldValue::from("before"));
    }

    #[test]
    fn references_default_to_empty() {
        let mut entity = Entity::new();
        assert_eq!(entity.references("Refs").count(), 0);
        assert!(!entity.has_references("Refs"));

        entity.set_references("Refs", [NativeKey::from("a")].into_iter().collect());
        assert_eq!(entity.references("Refs").count(), 1);
    }
}
