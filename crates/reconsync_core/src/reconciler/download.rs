//! Download path: per-type incremental or full snapshots.

use super::Reconciler;
use crate::context::RequestContext;
use crate::schema::TypeDescriptor;
use crate::store::{ChangedRow, SyncStore};
use reconsync_protocol::{DownloadRequest, DownloadResponse, DownloadedObject, Payload};
use serde_json::Value;
use std::collections::HashSet;

impl<S: SyncStore> Reconciler<S> {
    /// Collects rows changed since the request's per-type cursors.
    ///
    /// Unknown or unmodeled types yield no rows. The next cursor carries the
    /// highest timestamp seen per type, including rows hidden by a
    /// visibility filter; a type with neither rows nor an incoming cursor
    /// gets no cursor entry.
    pub fn download(&self, request: &DownloadRequest, context: &RequestContext) -> DownloadResponse {
        let span = tracing::info_span!("download", types = request.types.len(), principal = context.principal());
        let _guard = span.enter();

        let mut response = DownloadResponse::default();
        let mut seen = HashSet::new();
        for type_name in &request.types {
            if !seen.insert(type_name.as_str()) {
                continue;
            }
            let cursor = request.cursor_for(type_name);
            if let Some(cursor) = cursor {
                response.next_cursor.set(type_name.clone(), cursor);
            }

            let Some(descriptor) = self.registry.get(type_name) else {
                tracing::debug!(type_name = %type_name, "download of unregistered type");
                continue;
            };
            let rows = match self.store.query_changed_since(descriptor.model(), cursor) {
                Ok(rows) => rows,
                Err(error) => {
                    tracing::warn!(type_name = %type_name, error = %error, "download query failed");
                    continue;
                }
            };

            for row in rows {
                response.next_cursor.advance(type_name, row.timestamp);
                if descriptor.is_visible(context, &row.entity) {
                    response.changed_objects.push(self.to_downloaded(descriptor, &row));
                }
            }
        }

        tracing::info!(objects = response.changed_objects.len(), "download finished");
        response
    }

    /// Serializes a row with the upload exclusion rules. Tombstones carry
    /// only their key fields.
    fn to_downloaded(&self, descriptor: &TypeDescriptor, row: &ChangedRow) -> DownloadedObject {
        let entity = &row.entity;
        let mut payload = Payload::new();
        for field in descriptor.fields() {
            if field.excluded || (row.is_deleted && !descriptor.is_key_field(&field.name)) {
                continue;
            }
            payload.insert(field.name.clone(), entity.get(&field.name).to_json());
        }

        if !row.is_deleted {
            for reference in descriptor.references() {
                let target = self.registry.get(&reference.target);
                let keys = entity
                    .references(&reference.name)
                    .map(|key| {
                        Value::String(target.map_or_else(
                            || key.to_string(),
                            |t| t.key_strategy().render(key),
                        ))
                    })
                    .collect();
                payload.insert(reference.name.clone(), Value::Array(keys));
            }
        }

        DownloadedObject {
            type_name: descriptor.name().to_string(),
            mobile_primary_key: entity
                .key()
                .map(|key| descriptor.key_strategy().render(key))
                .unwrap_or_default(),
            payload,
            is_deleted: row.is_deleted,
            change_timestamp: row.timestamp,
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::context::RequestContext;
    use crate::entity::Entity;
    use crate::reconciler::Reconciler;
    use crate::schema::{FieldDescriptor, TypeDescriptor, TypeRegistry};
    use crate::store::MemoryStore;
    use reconsync_protocol::{
        ChangeItem, ChangeTimestamp, DownloadCursor, DownloadRequest, Payload, UploadRequest,
    };
    use serde_json::json;
    use std::sync::Arc;

    fn payload(value: serde_json::Value) -> Payload {
        match value {
            serde_json::Value::Object(map) => map,
            _ => unreachable!(),
        }
    }

    fn reconciler() -> Reconciler<MemoryStore> {
        let registry = TypeRegistry::builder()
            .register(
                TypeDescriptor::builder("Note")
                    .field(FieldDescriptor::text("Text"))
                    .field(FieldDescriptor::text("Tags").excluded())
                    .field(FieldDescriptor::text("Owner"))
                    .reference("Links", "Note")
                    .visibility(|ctx: &RequestContext, entity: &Entity| {
                        match entity.get("Owner").as_text() {
                            Some(owner) => ctx.principal() == Some(owner),
                            None => true,
                        }
                    })
                    .build()
                    .unwrap(),
            )
            .build()
            .unwrap();
        let store = MemoryStore::for_registry(&registry);
        Reconciler::new(Arc::new(registry), Arc::new(store))
    }

    fn upload(r: &Reconciler<MemoryStore>, items: Vec<ChangeItem>) {
        let response = r.upload(&UploadRequest::new(items), &RequestContext::anonymous());
        assert!(response.all_succeeded());
    }

    #[test]
    fn full_download_omits_excluded_fields() {
        let r = reconciler();
        upload(
            &r,
            vec![ChangeItem::upsert("Note", "1", payload(json!({"Text": "a", "Links": ["2"]})))],
        );

        let response = r.download(&DownloadRequest::full(["Note"]), &RequestContext::anonymous());
        assert_eq!(response.changed_objects.len(), 2);
        let first = &response.changed_objects[0];
        assert_eq!(first.mobile_primary_key, "1");
        assert_eq!(first.payload["Text"], json!("a"));
        assert_eq!(first.payload["Links"], json!(["2"]));
        assert_eq!(first.payload["Id"], json!("1"));
        assert!(!first.payload.contains_key("Tags"));
        assert!(response.next_cursor.get("Note").is_some());
    }

    #[test]
    fn incremental_download_reports_deletions() {
        let r = reconciler();
        upload(&r, vec![ChangeItem::upsert("Note", "1", payload(json!({"Text": "a"})))]);
        let cursor = r
            .download(&DownloadRequest::full(["Note"]), &RequestContext::anonymous())
            .next_cursor;

        upload(&r, vec![ChangeItem::delete("Note", "1")]);
        let response = r.download(&DownloadRequest::since(["Note"], cursor.clone()), &RequestContext::anonymous());
        assert_eq!(response.changed_objects.len(), 1);
        let tombstone = &response.changed_objects[0];
        assert!(tombstone.is_deleted);
        assert_eq!(tombstone.payload.len(), 1);
        assert!(response.next_cursor.get("Note") > cursor.get("Note"));

        let again = r.download(
            &DownloadRequest::since(["Note"], response.next_cursor.clone()),
            &RequestContext::anonymous(),
        );
        assert!(again.changed_objects.is_empty());
        assert_eq!(again.next_cursor, response.next_cursor);
    }

    #[test]
    fn unknown_types_yield_nothing() {
        let r = reconciler();
        let cursor = DownloadCursor::new().with("Ghost", ChangeTimestamp(5));
        let response = r.download(&DownloadRequest::since(["Ghost", "Note"], cursor), &RequestContext::anonymous());
        assert!(response.changed_objects.is_empty());
        assert_eq!(response.next_cursor.get("Ghost"), Some(ChangeTimestamp(5)));
        assert_eq!(response.next_cursor.get("Note"), None);
    }

    #[test]
    fn visibility_filter_hides_rows_but_advances_cursor() {
        let r = reconciler();
        upload(
            &r,
            vec![
                ChangeItem::upsert("Note", "1", payload(json!({"Owner": "alice"}))),
                ChangeItem::upsert("Note", "2", payload(json!({"Owner": "bob"}))),
            ],
        );

        let alice = r.download(&DownloadRequest::full(["Note"]), &RequestContext::for_principal("alice"));
        let keys: Vec<_> = alice.changed_objects.iter().map(|o| o.mobile_primary_key.as_str()).collect();
        assert_eq!(keys, ["1"]);

        let bob = r.download(&DownloadRequest::full(["Note"]), &RequestContext::for_principal("bob"));
        assert_eq!(bob.next_cursor, alice.next_cursor);
    }
}
