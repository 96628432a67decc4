//! Fixture types.
//!
//! One registered type per scenario family: text, integer, UUID and
//! generated keys, excluded fields, self-referencing collections, lenient
//! numeric fields, and a type that is registered but has no store model.

use reconsync_core::{
    FieldDescriptor, KeyKind, KeyStrategy, TypeDescriptor, TypeDescriptorBuilder, TypeRegistry,
    TypeRegistryBuilder,
};
use reconsync_protocol::{ChangeItem, UploadResponse};
use serde_json::Value;

/// Text key, `Text` field, excluded `Tags` field.
pub const DB_SYNC_OBJECT: &str = "DbSyncObject";
/// Same shape as [`DB_SYNC_OBJECT`], used by hook scenarios.
pub const IGNORED_FIELDS_OBJECT: &str = "DbSyncObjectWithIgnoredFields";
/// Text key with a `References` collection pointing at its own type.
pub const REF_SYNC_OBJECT: &str = "RefSyncObject";
/// Integer key.
pub const ID_INT_OBJECT: &str = "IdIntObject";
/// UUID key.
pub const ID_GUID_OBJECT: &str = "IdGuidObject";
/// Store-assigned integer key.
pub const ID_AUTOGENERATED_OBJECT: &str = "IdIntAutogeneratedObject";
/// Integer field clients tend to send as a string.
pub const INT_AS_STRING_OBJECT: &str = "IntFieldSentAsStringObject";
/// Composite `Region|Number` key.
pub const COMPOSITE_OBJECT: &str = "CompositeKeyObject";
/// Registered, but left out of the store.
pub const UNMODELED_OBJECT: &str = "UnknownSyncObject";

/// Every fixture type that has a store model.
pub const MODELED_TYPES: &[&str] = &[
    DB_SYNC_OBJECT,
    IGNORED_FIELDS_OBJECT,
    REF_SYNC_OBJECT,
    ID_INT_OBJECT,
    ID_GUID_OBJECT,
    ID_AUTOGENERATED_OBJECT,
    INT_AS_STRING_OBJECT,
    COMPOSITE_OBJECT,
];

/// Returns the descriptor builder of a fixture type so tests can attach
/// hooks or visibility filters before building.
///
/// # Panics
///
/// Panics on a name that is not a fixture type.
pub fn fixture_type(name: &str) -> TypeDescriptorBuilder {
    let builder = TypeDescriptor::builder(name);
    match name {
        DB_SYNC_OBJECT | IGNORED_FIELDS_OBJECT => builder
            .field(FieldDescriptor::text("Text"))
            .field(FieldDescriptor::text("Tags").excluded()),
        REF_SYNC_OBJECT => builder
            .field(FieldDescriptor::text("Text"))
            .reference("References", REF_SYNC_OBJECT),
        ID_INT_OBJECT => builder
            .key("Id", KeyStrategy::integer())
            .field(FieldDescriptor::text("Text")),
        ID_GUID_OBJECT => builder
            .key("Id", KeyStrategy::uuid())
            .field(FieldDescriptor::text("Text")),
        ID_AUTOGENERATED_OBJECT => builder
            .key("Id", KeyStrategy::AutoIncrement)
            .field(FieldDescriptor::text("Text")),
        INT_AS_STRING_OBJECT => builder.field(FieldDescriptor::integer("IntField")),
        COMPOSITE_OBJECT => builder
            .composite_key(
                ["Region", "Number"],
                KeyStrategy::composite("|", vec![KeyKind::Text, KeyKind::Integer]),
            )
            .field(FieldDescriptor::text("Text")),
        UNMODELED_OBJECT => builder.field(FieldDescriptor::text("Text")),
        other => panic!("{other} is not a fixture type"),
    }
}

/// Registry builder pre-loaded with every fixture type except `replaced`,
/// which the caller registers itself.
pub fn fixture_registry_builder_without(replaced: &[&str]) -> TypeRegistryBuilder {
    MODELED_TYPES
        .iter()
        .chain(std::iter::once(&UNMODELED_OBJECT))
        .filter(|name| !replaced.contains(name))
        .fold(TypeRegistry::builder(), |builder, name| {
            builder.register(fixture_type(name).build().expect("fixture type builds"))
        })
}

/// The full fixture registry with accept-all hooks.
pub fn fixture_registry() -> TypeRegistry {
    fixture_registry_builder_without(&[])
        .build()
        .expect("fixture registry builds")
}

/// Builds a change item from a JSON object.
pub fn item(type_name: &str, key: &str, payload: Value) -> ChangeItem {
    ChangeItem::from_json(type_name, key, payload)
}

/// Asserts a non-empty response with no failures.
///
/// # Panics
///
/// Panics listing every failure message.
pub fn assert_no_errors(response: &UploadResponse) {
    assert!(!response.results.is_empty(), "no results reported");
    let errors: Vec<_> = response
        .failures()
        .map(|r| format!("{}: {}", r.mobile_primary_key, r.error.as_deref().unwrap_or("")))
        .collect();
    assert!(errors.is_empty(), "upload failures: {}", errors.join(", "));
}
