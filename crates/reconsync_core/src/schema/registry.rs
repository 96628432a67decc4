//! The set of types a configuration synchronizes.

use super::descriptor::TypeDescriptor;
use crate::error::{SchemaError, SchemaResult};
use crate::hook::{AcceptAll, SyncHook};
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

/// Immutable map from wire type name to [`TypeDescriptor`].
///
/// Built once at startup and shared by reference; the engine holds no other
/// mutable configuration.
pub struct TypeRegistry {
    types: BTreeMap<String, TypeDescriptor>,
    default_hook: Arc<dyn SyncHook>,
}

impl fmt::Debug for TypeRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TypeRegistry")
            .field("types", &self.types.keys().collect::<Vec<_>>())
            .finish()
    }
}

impl TypeRegistry {
    /// Starts building a registry.
    pub fn builder() -> TypeRegistryBuilder {
        TypeRegistryBuilder::default()
    }

    /// Looks up a type by wire name.
    pub fn get(&self, type_name: &str) -> Option<&TypeDescriptor> {
        self.types.get(type_name)
    }

    /// Returns true if the type is registered.
    pub fn contains(&self, type_name: &str) -> bool {
        self.types.contains_key(type_name)
    }

    /// Iterates over descriptors in wire-name order.
    pub fn iter(&self) -> impl Iterator<Item = &TypeDescriptor> {
        self.types.values()
    }

    /// Returns the number of registered types.
    pub fn len(&self) -> usize {
        self.types.len()
    }

    /// Returns true if no type is registered.
    pub fn is_empty(&self) -> bool {
        self.types.is_empty()
    }

    /// The hook that applies to a type: its own, else the registry default.
    pub fn hook_for<'a>(&'a self, descriptor: &'a TypeDescriptor) -> &'a dyn SyncHook {
        descriptor
            .hook()
            .map_or(self.default_hook.as_ref(), |hook| hook.as_ref())
    }
}

/// Builder for [`TypeRegistry`].
pub struct TypeRegistryBuilder {
    types: Vec<TypeDescriptor>,
    default_hook: Arc<dyn SyncHook>,
}

impl Default for TypeRegistryBuilder {
    fn default() -> Self {
        Self {
            types: Vec::new(),
            default_hook: Arc::new(AcceptAll),
        }
    }
}

impl TypeRegistryBuilder {
    /// Registers a type.
    #[must_use]
    pub fn register(mut self, descriptor: TypeDescriptor) -> Self {
        self.types.push(descriptor);
        self
    }

    /// Sets the hook used by types that do not install their own.
    #[must_use]
    pub fn default_hook(mut self, hook: impl SyncHook + 'static) -> Self {
        self.default_hook = Arc::new(hook);
        self
    }

    /// Validates cross-type constraints and builds the registry.
    pub fn build(self) -> SchemaResult<TypeRegistry> {
        let mut types = BTreeMap::new();
        for descriptor in self.types {
            let name = descriptor.name().to_string();
            if types.insert(name.clone(), descriptor).is_some() {
                return Err(SchemaError::DuplicateType(name));
            }
        }

        for descriptor in types.values() {
            for reference in descriptor.references() {
                if !types.contains_key(&reference.target) {
                    return Err(SchemaError::UnknownReferenceTarget {
                        type_name: descriptor.name().to_string(),
                        field: reference.name.clone(),
                        target: reference.target.clone(),
                    });
                }
            }
        }

        Ok(TypeRegistry {
            types,
            default_hook: self.default_hook,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::FieldDescriptor;

    fn note() -> TypeDescriptor {
        TypeDescriptor::builder("Note")
            .field(FieldDescriptor::text("Text"))
            .reference("Tags", "Tag")
            .build()
            .unwrap()
    }

    fn tag() -> TypeDescriptor {
        TypeDescriptor::builder("Tag").build().unwrap()
    }

    #[test]
    fn register_and_lookup() {
        let registry = TypeRegistry::builder()
            .register(note())
            .register(tag())
            .build()
            .unwrap();
        assert_eq!(registry.len(), 2);
        assert!(registry.contains("Note"));
        assert!(registry.get("Unknown").is_none());
        let names: Vec<_> = registry.iter().map(|d| d.name()).collect();
        assert_eq!(names, ["Note", "Tag"]);
    }

    #[test]
    fn reference_target_must_be_registered() {
        let err = TypeRegistry::builder().register(note()).build().unwrap_err();
        assert!(matches!(err, SchemaError::UnknownReferenceTarget { target, .. } if target == "Tag"));
    }

    #[test]
    fn duplicate_type_is_rejected() {
        let err = TypeRegistry::builder()
            .register(tag())
            .register(tag())
            .build()
            .unwrap_err();
        assert!(matches!(err, SchemaError::DuplicateType(name) if name == "Tag"));
    }

    fn accepts(registry: &TypeRegistry, type_name: &str) -> bool {
        use crate::context::RequestContext;
        use crate::entity::Entity;
        use crate::hook::HookArgs;
        use crate::store::{MemoryStore, SyncStore};
        use reconsync_protocol::ChangeItem;

        let descriptor = registry.get(type_name).unwrap();
        let store = MemoryStore::new();
        let session = store.begin();
        let change = ChangeItem::delete(type_name, "1");
        let context = RequestContext::anonymous();
        let mut entity = Entity::new();
        let mut args = HookArgs::new(
            &mut entity,
            None,
            session.as_reader(),
            &change,
            &context,
            descriptor,
        );
        registry.hook_for(descriptor).check_and_process(&mut args)
    }

    #[test]
    fn own_hook_overrides_default() {
        use crate::hook::HookArgs;

        let lenient = TypeDescriptor::builder("Lenient")
            .hook(|_: &mut HookArgs<'_>| true)
            .build()
            .unwrap();
        let registry = TypeRegistry::builder()
            .register(lenient)
            .register(tag())
            .default_hook(|args: &mut HookArgs<'_>| args.reject("closed"))
            .build()
            .unwrap();

        assert!(registry.get("Lenient").unwrap().hook().is_some());
        assert!(registry.get("Tag").unwrap().hook().is_none());
        assert!(accepts(&registry, "Lenient"));
        assert!(!accepts(&registry, "Tag"));
    }

    #[test]
    fn default_hook_accepts_everything() {
        let registry = TypeRegistry::builder().register(tag()).build().unwrap();
        assert!(accepts(&registry, "Tag"));
    }
}
