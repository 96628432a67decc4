//! Sparse payload merge.
//!
//! A payload names only the fields the client touched. On create every
//! other field takes its default; on update every other field keeps its
//! persisted value. Key fields are never written from a payload, excluded
//! fields are skipped silently and reference fields are left to the
//! reference resolver.

use crate::config::{ReconcilerConfig, UnknownFieldPolicy};
use crate::entity::Entity;
use crate::error::{SyncError, SyncResult};
use crate::schema::{Member, TypeDescriptor};
use reconsync_protocol::Payload;

/// What a payload is merged onto.
#[derive(Debug)]
pub enum MergeBase<'a> {
    /// A fresh entity from the store, key already assigned.
    Fresh(Entity),
    /// A persisted entity; it is cloned, never modified in place.
    Existing(&'a Entity),
}

/// Applies a sparse payload and returns the merged entity.
///
/// Fails on the first value that cannot be coerced to its field's type, or
/// on an unknown member when the policy rejects those.
pub fn merge(
    base: MergeBase<'_>,
    payload: &Payload,
    descriptor: &TypeDescriptor,
    config: &ReconcilerConfig,
) -> SyncResult<Entity> {
    let mut entity = match base {
        MergeBase::Fresh(mut fresh) => {
            descriptor.apply_defaults(&mut fresh);
            descriptor.write_key_fields(&mut fresh);
            fresh
        }
        MergeBase::Existing(existing) => existing.clone(),
    };

    for (name, value) in payload {
        match descriptor.member(name, config.case_insensitive_fields) {
            Some(Member::Field(field)) if !field.excluded => {
                entity.set(field.name.clone(), field.coerce(value)?);
            }
            Some(Member::Field(_) | Member::Key(_) | Member::Reference(_)) => {}
            None => match config.unknown_fields {
                UnknownFieldPolicy::Ignore => {
                    tracing::trace!(field = %name, type_name = descriptor.name(), "ignoring unknown field");
                }
                UnknownFieldPolicy::Reject => {
                    return Err(SyncError::field_coercion(
                        name.clone(),
                        format!("{} has no such field", descriptor.name()),
                    ));
                }
            },
        }
    }

    Ok(entity)
}
