//! Upload and download messages.

use crate::cursor::{ChangeTimestamp, DownloadCursor};
use crate::error::{ProtocolError, ProtocolResult};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::borrow::Cow;

/// A sparse field map as sent by a client.
///
/// Absent keys mean "leave unchanged" on update and "use default" on create;
/// an explicit `null` is a value in its own right.
pub type Payload = serde_json::Map<String, Value>;

/// One client-reported mutation.
///
/// The payload is kept as received and only interpreted by
/// [`ChangeItem::parse_payload`], so a malformed payload fails its own item
/// instead of the whole batch.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChangeItem {
    /// Wire-level type name.
    #[serde(rename = "type")]
    pub type_name: String,
    /// Client-side primary key, as a string.
    pub primary_key: String,
    /// Raw payload: a JSON object, a string holding serialized JSON, or
    /// nothing.
    #[serde(default, alias = "serializedObject", skip_serializing_if = "Option::is_none")]
    pub payload: Option<Value>,
    /// Whether the client deleted the object.
    #[serde(default)]
    pub is_deleted: bool,
}

impl ChangeItem {
    /// Creates a create-or-update item.
    pub fn upsert(type_name: impl Into<String>, primary_key: impl Into<String>, payload: Payload) -> Self {
        Self::from_json(type_name, primary_key, Value::Object(payload))
    }

    /// Creates a deletion item.
    pub fn delete(type_name: impl Into<String>, primary_key: impl Into<String>) -> Self {
        Self {
            type_name: type_name.into(),
            primary_key: primary_key.into(),
            payload: None,
            is_deleted: true,
        }
    }

    /// Creates a create-or-update item from a raw payload value.
    pub fn from_json(type_name: impl Into<String>, primary_key: impl Into<String>, payload: Value) -> Self {
        Self {
            type_name: type_name.into(),
            primary_key: primary_key.into(),
            payload: Some(payload),
            is_deleted: false,
        }
    }

    /// Interprets the raw payload as a field map.
    ///
    /// A missing payload, `null` or a blank string yield an empty map. A
    /// string is parsed as serialized JSON and must hold an object.
    pub fn parse_payload(&self) -> ProtocolResult<Cow<'_, Payload>> {
        match &self.payload {
            None | Some(Value::Null) => Ok(Cow::Owned(Payload::new())),
            Some(Value::Object(map)) => Ok(Cow::Borrowed(map)),
            Some(Value::String(text)) if text.trim().is_empty() => Ok(Cow::Owned(Payload::new())),
            Some(Value::String(text)) => Ok(Cow::Owned(serde_json::from_str::<Payload>(text)?)),
            Some(other) => Err(ProtocolError::invalid_message(format!(
                "payload must be an object or serialized JSON, found {other}"
            ))),
        }
    }
}

/// An ordered batch of client changes.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadRequest {
    /// Changes in client order.
    #[serde(default, alias = "changeNotifications")]
    pub changes: Vec<ChangeItem>,
}

impl UploadRequest {
    /// Creates a request from a list of changes.
    pub fn new(changes: Vec<ChangeItem>) -> Self {
        Self { changes }
    }

    /// Returns the number of changes in the batch.
    pub fn len(&self) -> usize {
        self.changes.len()
    }

    /// Returns true if the batch has no changes.
    pub fn is_empty(&self) -> bool {
        self.changes.is_empty()
    }
}

/// Outcome of one attempted change.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadResult {
    /// Canonical primary key of the object (server-assigned for
    /// autogenerated keys).
    pub mobile_primary_key: String,
    /// Whether the change was committed.
    #[serde(rename = "isSuccess")]
    pub success: bool,
    /// Human-readable error for failed changes.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl UploadResult {
    /// Creates a successful result.
    pub fn success(mobile_primary_key: impl Into<String>) -> Self {
        Self {
            mobile_primary_key: mobile_primary_key.into(),
            success: true,
            error: None,
        }
    }

    /// Creates a failed result.
    pub fn failure(mobile_primary_key: impl Into<String>, error: impl Into<String>) -> Self {
        Self {
            mobile_primary_key: mobile_primary_key.into(),
            success: false,
            error: Some(error.into()),
        }
    }
}

/// Results for every attempted change, in request order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadResponse {
    /// One entry per attempted (not skipped) change.
    pub results: Vec<UploadResult>,
}

impl UploadResponse {
    /// Returns true if every attempted change was committed.
    pub fn all_succeeded(&self) -> bool {
        self.results.iter().all(|r| r.success)
    }

    /// Iterates over failed results.
    pub fn failures(&self) -> impl Iterator<Item = &UploadResult> {
        self.results.iter().filter(|r| !r.success)
    }
}

/// Request for server state of a set of types.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DownloadRequest {
    /// Wire type names to download.
    pub types: Vec<String>,
    /// Per-type cursor; types without an entry get a full snapshot.
    #[serde(default, alias = "lastChangeTime", skip_serializing_if = "Option::is_none")]
    pub cursor: Option<DownloadCursor>,
}

impl DownloadRequest {
    /// Creates a full-snapshot request.
    pub fn full<I, S>(types: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            types: types.into_iter().map(Into::into).collect(),
            cursor: None,
        }
    }

    /// Creates an incremental request.
    pub fn since<I, S>(types: I, cursor: DownloadCursor) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            types: types.into_iter().map(Into::into).collect(),
            cursor: Some(cursor),
        }
    }

    /// Returns the cursor timestamp for a type, if any.
    pub fn cursor_for(&self, type_name: &str) -> Option<ChangeTimestamp> {
        self.cursor.as_ref().and_then(|c| c.get(type_name))
    }
}

/// One server row as shipped to a client.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DownloadedObject {
    /// Wire-level type name.
    #[serde(rename = "type")]
    pub type_name: String,
    /// Canonical primary key.
    pub mobile_primary_key: String,
    /// Full field map (excluded fields never appear).
    pub payload: Payload,
    /// True for tombstones of rows deleted since the cursor.
    pub is_deleted: bool,
    /// When the row last changed.
    pub change_timestamp: ChangeTimestamp,
}

/// Changed rows plus the cursor for the next call.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DownloadResponse {
    /// Changed rows, grouped by requested type and ordered by timestamp.
    pub changed_objects: Vec<DownloadedObject>,
    /// Cursor to send with the next download.
    pub next_cursor: DownloadCursor,
}

impl DownloadResponse {
    /// Iterates over the rows of one type.
    pub fn objects_of<'a>(&'a self, type_name: &'a str) -> impl Iterator<Item = &'a DownloadedObject> {
        self.changed_objects
            .iter()
            .filter(move |o| o.type_name == type_name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn change_item_accepts_object_payload() {
        let item: ChangeItem = serde_json::from_value(json!({
            "type": "Note",
            "primaryKey": "1",
            "payload": {"Text": "hello"}
        }))
        .unwrap();

        assert_eq!(item.type_name, "Note");
        assert!(!item.is_deleted);
        assert_eq!(item.parse_payload().unwrap()["Text"], json!("hello"));
    }

    #[test]
    fn change_item_accepts_serialized_string_payload() {
        let item: ChangeItem = serde_json::from_value(json!({
            "type": "Note",
            "primaryKey": "1",
            "serializedObject": "{\"Text\": \"hello\"}"
        }))
        .unwrap();

        assert_eq!(item.parse_payload().unwrap()["Text"], json!("hello"));
    }

    #[test]
    fn empty_string_payload_means_none() {
        let item: ChangeItem = serde_json::from_value(json!({
            "type": "Note",
            "primaryKey": "1",
            "payload": "",
            "isDeleted": true
        }))
        .unwrap();

        assert!(item.parse_payload().unwrap().is_empty());
        assert!(item.is_deleted);
    }

    #[test]
    fn malformed_payload_decodes_but_fails_to_parse() {
        let request: UploadRequest = serde_json::from_value(json!({"changes": [
            {"type": "Note", "primaryKey": "1", "payload": "{Id: '1', Text: 'x'}"},
            {"type": "Note", "primaryKey": "2", "payload": 42},
            {"type": "Note", "primaryKey": "3", "payload": "[1, 2]"},
            {"type": "Note", "primaryKey": "4", "payload": {"Text": "ok"}}
        ]}))
        .unwrap();

        assert!(matches!(request.changes[0].parse_payload(), Err(ProtocolError::Json(_))));
        assert!(matches!(
            request.changes[1].parse_payload(),
            Err(ProtocolError::InvalidMessage(_))
        ));
        assert!(request.changes[2].parse_payload().is_err());
        assert!(request.changes[3].parse_payload().is_ok());
    }

    #[test]
    fn upload_result_wire_shape() {
        let ok = serde_json::to_value(UploadResult::success("7")).unwrap();
        assert_eq!(ok, json!({"mobilePrimaryKey": "7", "isSuccess": true}));

        let failed = serde_json::to_value(UploadResult::failure("7", "boom")).unwrap();
        assert_eq!(failed["error"], json!("boom"));
    }

    #[test]
    fn upload_request_accepts_legacy_field_name() {
        let request: UploadRequest = serde_json::from_value(json!({
            "changeNotifications": [{"type": "Note", "primaryKey": "1"}]
        }))
        .unwrap();
        assert_eq!(request.len(), 1);
        assert!(request.changes[0].payload.is_none());
        assert!(request.changes[0].parse_payload().unwrap().is_empty());
    }

    #[test]
    fn download_request_cursor_lookup() {
        let request = DownloadRequest::since(
            ["Note", "Tag"],
            DownloadCursor::new().with("Note", ChangeTimestamp(5)),
        );
        assert_eq!(request.cursor_for("Note"), Some(ChangeTimestamp(5)));
        assert_eq!(request.cursor_for("Tag"), None);
        assert_eq!(DownloadRequest::full(["Note"]).cursor_for("Note"), None);
    }

    #[test]
    fn response_failures() {
        let response = UploadResponse {
            results: vec![UploadResult::success("1"), UploadResult::failure("2", "bad")],
        };
        assert!(!response.all_succeeded());
        assert_eq!(response.failures().count(), 1);
    }
}
