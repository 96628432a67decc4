//! Upload path: one store session per item, processed in request order.

use super::Reconciler;
use crate::context::RequestContext;
use crate::entity::EntitySnapshot;
use crate::error::{StoreError, SyncError, SyncResult};
use crate::hook::{run_hook, HookArgs};
use crate::key::ResolvedKey;
use crate::merge::{merge, MergeBase};
use crate::references::{detach_references, resolve_references};
use crate::schema::TypeDescriptor;
use crate::store::SyncStore;
use reconsync_protocol::{ChangeItem, UploadRequest, UploadResponse, UploadResult};

/// Terminal state of one uploaded item.
#[derive(Debug)]
pub enum ItemOutcome {
    /// The change was committed under this canonical key.
    Committed {
        /// Canonical client key (server-assigned for generated keys).
        key: String,
    },
    /// The change failed; nothing of it was committed.
    Rejected {
        /// The key the client sent.
        key: String,
        /// Why it failed.
        error: SyncError,
    },
    /// The type is not registered; no result is reported.
    Skipped,
}

impl ItemOutcome {
    /// Converts the outcome to its wire result; `None` for skipped items.
    pub fn into_result(self) -> Option<UploadResult> {
        match self {
            ItemOutcome::Committed { key } => Some(UploadResult::success(key)),
            ItemOutcome::Rejected { key, error } => Some(UploadResult::failure(key, error.to_string())),
            ItemOutcome::Skipped => None,
        }
    }

    /// Returns true for committed items.
    pub fn is_committed(&self) -> bool {
        matches!(self, ItemOutcome::Committed { .. })
    }
}

impl<S: SyncStore> Reconciler<S> {
    /// Reconciles a batch. Items are processed strictly in order and each
    /// commits on its own, so a failing item never affects its neighbours.
    pub fn upload(&self, request: &UploadRequest, context: &RequestContext) -> UploadResponse {
        let span = tracing::info_span!("upload", items = request.len(), principal = context.principal());
        let _guard = span.enter();

        let results: Vec<UploadResult> = request
            .changes
            .iter()
            .filter_map(|item| self.process_item(item, context).into_result())
            .collect();

        tracing::info!(
            attempted = results.len(),
            failed = results.iter().filter(|r| !r.success).count(),
            "upload finished"
        );
        UploadResponse { results }
    }

    /// Reconciles a single item.
    pub fn process_item(&self, item: &ChangeItem, context: &RequestContext) -> ItemOutcome {
        let Some(descriptor) = self.registry.get(&item.type_name) else {
            tracing::debug!(type_name = %item.type_name, "skipping unregistered type");
            return ItemOutcome::Skipped;
        };

        match self.apply(descriptor, item, context) {
            Ok(key) => {
                tracing::debug!(type_name = %item.type_name, key = %key, deleted = item.is_deleted, "committed");
                ItemOutcome::Committed { key }
            }
            Err(error) => {
                tracing::warn!(
                    type_name = %item.type_name,
                    key = %item.primary_key,
                    kind = ?error.kind(),
                    error = %error,
                    "change rejected"
                );
                ItemOutcome::Rejected {
                    key: item.primary_key.clone(),
                    error,
                }
            }
        }
    }

    fn apply(
        &self,
        descriptor: &TypeDescriptor,
        item: &ChangeItem,
        context: &RequestContext,
    ) -> SyncResult<String> {
        let model = descriptor.model();
        if !self.store.has_model(model) {
            return Err(SyncError::UnmodeledType {
                type_name: item.type_name.clone(),
            });
        }

        let strategy = descriptor.key_strategy();
        let resolved = strategy.resolve(&item.type_name, &item.primary_key)?;
        if let ResolvedKey::Known(key) = &resolved {
            descriptor.check_key(key)?;
        }

        let mut session = self.store.begin();
        let existing = match &resolved {
            ResolvedKey::Known(key) => session.find_by_key(model, key)?,
            ResolvedKey::Unassigned => None,
        };

        if item.is_deleted {
            let ResolvedKey::Known(key) = resolved else {
                return Ok(item.primary_key.clone());
            };
            if existing.is_some() {
                session.delete(model, &key)?;
                detach_references(descriptor, &key, &self.registry, session.as_mut())?;
                session.commit()?;
            }
            return Ok(strategy.render(&key));
        }

        let payload = item
            .parse_payload()
            .map_err(|error| SyncError::MalformedPayload {
                reason: error.to_string(),
            })?;
        let (mut entity, original) = match existing {
            Some(existing) => {
                let snapshot = EntitySnapshot::capture(&existing);
                let merged = merge(MergeBase::Existing(&existing), &payload, descriptor, &self.config)?;
                (merged, Some(snapshot))
            }
            None => {
                let mut fresh = session.create(model)?;
                if let (false, ResolvedKey::Known(key)) = (strategy.is_generated(), resolved) {
                    fresh.set_key(key);
                }
                if fresh.key().is_none() {
                    return Err(StoreError::KeyGenerationUnsupported {
                        model: model.to_string(),
                    }
                    .into());
                }
                let merged = merge(MergeBase::Fresh(fresh), &payload, descriptor, &self.config)?;
                (merged, None)
            }
        };
        let key = entity
            .key()
            .cloned()
            .ok_or_else(|| SyncError::from(StoreError::MissingKey { model: model.to_string() }))?;

        if original.is_some() {
            session.update(model, entity.clone())?;
        } else {
            session.insert(model, entity.clone())?;
        }

        let placeholders = resolve_references(
            &mut entity,
            &payload,
            descriptor,
            &self.registry,
            session.as_mut(),
            &self.config,
        )?;
        if placeholders > 0 {
            tracing::debug!(placeholders, "staged reference placeholders");
        }
        session.update(model, entity.clone())?;

        let hook = self.registry.hook_for(descriptor);
        {
            let mut args = HookArgs::new(
                &mut entity,
                original.as_ref(),
                session.as_reader(),
                item,
                context,
                descriptor,
            );
            run_hook(hook, &mut args)?;
        }
        descriptor.write_key_fields(&mut entity);

        session.update(model, entity)?;
        session.commit()?;
        Ok(strategy.render(&key))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hook::HookArgs;
    use crate::key::{KeyStrategy, NativeKey};
    use crate::schema::{FieldDescriptor, TypeRegistry};
    use crate::store::{MemoryStore, ModelDef};
    use crate::value::FieldValue;
    use crate::ErrorKind;
    use reconsync_protocol::Payload;
    use serde_json::json;
    use std::sync::Arc;

    fn payload(value: serde_json::Value) -> Payload {
        match value {
            serde_json::Value::Object(map) => map,
            _ => unreachable!(),
        }
    }

    fn registry() -> TypeRegistry {
        TypeRegistry::builder()
            .register(
                TypeDescriptor::builder("Note")
                    .field(FieldDescriptor::text("Text"))
                    .field(FieldDescriptor::text("Tags").excluded())
                    .reference("Links", "Note")
                    .build()
                    .unwrap(),
            )
            .register(
                TypeDescriptor::builder("Counter")
                    .key("Id", KeyStrategy::AutoIncrement)
                    .field(FieldDescriptor::integer("Value"))
                    .build()
                    .unwrap(),
            )
            .register(
                TypeDescriptor::builder("Guarded")
                    .field(FieldDescriptor::text("Text"))
                    .hook(|args: &mut HookArgs<'_>| {
                        if args.entity().get("Text").as_text() == Some("bad") {
                            return args.reject("bad text");
                        }
                        true
                    })
                    .build()
                    .unwrap(),
            )
            .register(TypeDescriptor::builder("Unmodeled").build().unwrap())
            .build()
            .unwrap()
    }

    fn reconciler() -> Reconciler<MemoryStore> {
        let registry = Arc::new(registry());
        let store = MemoryStore::new();
        for name in ["Note", "Guarded"] {
            store.register_model(ModelDef::new(name));
        }
        store.register_model(ModelDef::new("Counter").with_generated_keys());
        Reconciler::new(registry, Arc::new(store))
    }

    fn note(reconciler: &Reconciler<MemoryStore>, key: &str) -> Option<crate::Entity> {
        reconciler.store().get("Note", &NativeKey::from(key)).unwrap()
    }

    #[test]
    fn skipped_items_produce_no_result() {
        let r = reconciler();
        let request = UploadRequest::new(vec![
            ChangeItem::upsert("Nope", "1", Payload::new()),
            ChangeItem::upsert("Note", "1", payload(json!({"Text": "a"}))),
        ]);
        let response = r.upload(&request, &RequestContext::anonymous());
        assert_eq!(response.results, vec![UploadResult::success("1")]);
    }

    #[test]
    fn unmodeled_type_fails() {
        let r = reconciler();
        let outcome = r.process_item(
            &ChangeItem::upsert("Unmodeled", "1", Payload::new()),
            &RequestContext::anonymous(),
        );
        let ItemOutcome::Rejected { error, .. } = outcome else {
            panic!("expected a rejection");
        };
        assert_eq!(error.kind(), ErrorKind::UnmodeledType);
        assert!(error
            .to_string()
            .contains("The entity type Unmodeled is not part of the model"));
    }

    #[test]
    fn rejected_item_commits_nothing() {
        let r = reconciler();
        let ctx = RequestContext::anonymous();
        let outcome = r.process_item(
            &ChangeItem::upsert("Guarded", "1", payload(json!({"Text": "bad"}))),
            &ctx,
        );
        let ItemOutcome::Rejected { error, .. } = outcome else {
            panic!("expected a rejection");
        };
        assert_eq!(error.kind(), ErrorKind::HookRejection);
        assert!(r
            .store()
            .get("Guarded", &NativeKey::from("1"))
            .unwrap()
            .is_none());

        assert!(r
            .process_item(
                &ChangeItem::upsert("Guarded", "1", payload(json!({"Text": "good"}))),
                &ctx
            )
            .is_committed());
    }

    #[test]
    fn generated_key_is_reported() {
        let r = reconciler();
        let ctx = RequestContext::anonymous();
        let first = r.process_item(&ChangeItem::upsert("Counter", "", payload(json!({"Value": 3}))), &ctx);
        let second = r.process_item(&ChangeItem::upsert("Counter", "", payload(json!({"Value": 4}))), &ctx);
        assert!(matches!(first, ItemOutcome::Committed { ref key } if key == "1"));
        assert!(matches!(second, ItemOutcome::Committed { ref key } if key == "2"));

        let updated = r.process_item(&ChangeItem::upsert("Counter", "1", payload(json!({"Value": 9}))), &ctx);
        assert!(matches!(updated, ItemOutcome::Committed { ref key } if key == "1"));
        let row = r.store().get("Counter", &NativeKey::from(1)).unwrap().unwrap();
        assert_eq!(row.get("Value"), &FieldValue::Integer(9));
        assert_eq!(row.get("Id"), &FieldValue::Integer(1));
    }

    #[test]
    fn delete_then_recreate() {
        let r = reconciler();
        let ctx = RequestContext::anonymous();
        r.process_item(&ChangeItem::upsert("Note", "1", payload(json!({"Text": "a"}))), &ctx);
        assert!(r.process_item(&ChangeItem::delete("Note", "1"), &ctx).is_committed());
        assert!(note(&r, "1").is_none());

        assert!(r.process_item(&ChangeItem::delete("Note", "1"), &ctx).is_committed());

        r.process_item(&ChangeItem::upsert("Note", "1", payload(json!({"Text": "b"}))), &ctx);
        assert_eq!(note(&r, "1").unwrap().get("Text"), &FieldValue::from("b"));
    }

    #[test]
    fn malformed_payload_fails_only_its_item() {
        let r = reconciler();
        let request = UploadRequest::new(vec![
            ChangeItem::from_json("Note", "1", json!("{Id: '1', Text: 'x'}")),
            ChangeItem::from_json("Nope", "9", json!("{not json")),
            ChangeItem::upsert("Note", "2", payload(json!({"Text": "ok"}))),
        ]);
        let response = r.upload(&request, &RequestContext::anonymous());
        assert_eq!(response.results.len(), 2);
        assert!(!response.results[0].success);
        assert!(response.results[0]
            .error
            .as_deref()
            .is_some_and(|e| e.contains("malformed payload")));
        assert!(response.results[1].success);
        assert!(note(&r, "1").is_none());

        let ItemOutcome::Rejected { error, .. } = r.process_item(
            &ChangeItem::from_json("Note", "3", json!(17)),
            &RequestContext::anonymous(),
        ) else {
            panic!("expected a rejection");
        };
        assert_eq!(error.kind(), ErrorKind::MalformedPayload);
    }

    #[test]
    fn failure_does_not_abort_batch() {
        let r = reconciler();
        let request = UploadRequest::new(vec![
            ChangeItem::upsert("Counter", "abc", Payload::new()),
            ChangeItem::upsert("Note", "2", payload(json!({"Text": "ok"}))),
        ]);
        let response = r.upload(&request, &RequestContext::anonymous());
        assert_eq!(response.results.len(), 2);
        assert!(!response.results[0].success);
        assert!(response.results[1].success);
    }
}
