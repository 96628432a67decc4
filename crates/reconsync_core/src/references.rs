//! Reference-collection resolution.
//!
//! A reference field in a payload is the complete new target set: a list
//! replaces the previous set, `null` or `[]` clears it and an absent field
//! leaves it alone. Every listed key must resolve to a row of the target
//! type. Keys that do not exist yet get a placeholder row holding only the
//! key and defaults, so an item may reference an object that a later item
//! in the same batch defines. Deleting a row removes its key from every
//! reference field that points at it.

use crate::config::ReconcilerConfig;
use crate::entity::Entity;
use crate::error::{StoreError, SyncError, SyncResult};
use crate::key::{NativeKey, ResolvedKey};
use crate::schema::{Member, ReferenceDescriptor, TypeDescriptor, TypeRegistry};
use crate::store::StoreSession;
use reconsync_protocol::Payload;
use serde_json::Value;
use std::collections::BTreeSet;

/// Rewrites the reference fields named in `payload` on `entity`.
///
/// Placeholders are staged in `session` and commit together with the item.
/// Returns the number of placeholders created.
pub fn resolve_references(
    entity: &mut Entity,
    payload: &Payload,
    descriptor: &TypeDescriptor,
    registry: &TypeRegistry,
    session: &mut dyn StoreSession,
    config: &ReconcilerConfig,
) -> SyncResult<usize> {
    let mut created = 0;
    for (name, value) in payload {
        let Some(Member::Reference(reference)) =
            descriptor.member(name, config.case_insensitive_fields)
        else {
            continue;
        };

        let raw_keys = raw_keys(reference, value)?;
        let mut targets = BTreeSet::new();
        for raw in raw_keys {
            let (key, placeholder) =
                resolve_target(entity, descriptor, reference, &raw, registry, session, config)?;
            created += usize::from(placeholder);
            targets.insert(key);
        }
        entity.set_references(reference.name.clone(), targets);
    }
    Ok(created)
}

fn raw_keys(reference: &ReferenceDescriptor, value: &Value) -> SyncResult<Vec<String>> {
    match value {
        Value::Null => Ok(Vec::new()),
        Value::Array(items) => items
            .iter()
            .map(|item| match item {
                Value::String(s) => Ok(s.clone()),
                Value::Number(n) => Ok(n.to_string()),
                other => Err(SyncError::reference(
                    &reference.name,
                    format!("{other} is not a key"),
                )),
            })
            .collect(),
        other => Err(SyncError::reference(
            &reference.name,
            format!("expected a list of keys, found {other}"),
        )),
    }
}

fn resolve_target(
    entity: &Entity,
    descriptor: &TypeDescriptor,
    reference: &ReferenceDescriptor,
    raw: &str,
    registry: &TypeRegistry,
    session: &mut dyn StoreSession,
    config: &ReconcilerConfig,
) -> SyncResult<(NativeKey, bool)> {
    let target = registry.get(&reference.target).ok_or_else(|| {
        SyncError::reference(
            &reference.name,
            format!("target type {} is not registered", reference.target),
        )
    })?;

    let key = match target.key_strategy().resolve(target.name(), raw)? {
        ResolvedKey::Known(key) => key,
        ResolvedKey::Unassigned => {
            return Err(SyncError::reference(&reference.name, "empty target key"));
        }
    };
    target.check_key(&key)?;

    let is_self = target.model() == descriptor.model() && entity.key() == Some(&key);
    if is_self || session.find_by_key(target.model(), &key)?.is_some() {
        return Ok((key, false));
    }

    if !config.create_placeholders {
        return Err(SyncError::reference(
            &reference.name,
            format!("{} {raw} does not exist", target.name()),
        ));
    }
    if target.key_strategy().is_generated() {
        return Err(SyncError::reference(
            &reference.name,
            format!("{} {raw} does not exist and its keys are assigned by the server", target.name()),
        ));
    }

    let mut placeholder = session.create(target.model())?;
    placeholder.set_key(key.clone());
    target.apply_defaults(&mut placeholder);
    target.write_key_fields(&mut placeholder);
    session.insert_placeholder(target.model(), placeholder)?;
    tracing::trace!(type_name = target.name(), key = %key, "created placeholder");
    Ok((key, true))
}

/// Removes a deleted row's key from every reference field that targets its
/// type, staging the rewritten rows in `session`.
///
/// Returns the number of rows rewritten.
pub fn detach_references(
    deleted: &TypeDescriptor,
    key: &NativeKey,
    registry: &TypeRegistry,
    session: &mut dyn StoreSession,
) -> SyncResult<usize> {
    let mut rewritten = 0;
    for owner in registry.iter() {
        let fields: Vec<&str> = owner
            .references()
            .iter()
            .filter(|r| r.target == deleted.name())
            .map(|r| r.name.as_str())
            .collect();
        if fields.is_empty() {
            continue;
        }
        let rows = match session.scan(owner.model()) {
            Ok(rows) => rows,
            Err(StoreError::UnknownModel { .. }) => continue,
            Err(error) => return Err(error.into()),
        };
        for mut row in rows {
            let mut changed = false;
            for field in &fields {
                changed |= row.remove_reference(field, key);
            }
            if changed {
                session.update(owner.model(), row)?;
                rewritten += 1;
            }
        }
    }
    if rewritten > 0 {
        tracing::trace!(type_name = deleted.name(), key = %key, rewritten, "detached references");
    }
    Ok(rewritten)
}
