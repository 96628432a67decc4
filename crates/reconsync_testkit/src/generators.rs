//! Property-based test generators using proptest.
//!
//! Strategies produce payloads and batches for the fixture types that keep
//! to the wire rules: keys are non-empty, field values match their
//! declared types.

use crate::fixtures::{DB_SYNC_OBJECT, REF_SYNC_OBJECT};
use proptest::prelude::*;
use reconsync_protocol::{ChangeItem, Payload};
use serde_json::Value;

/// Strategy for text keys.
pub fn text_key_strategy() -> impl Strategy<Value = String> {
    "[a-z0-9]{1,12}"
}

/// Strategy for free-form text values, including null.
pub fn text_value_strategy() -> impl Strategy<Value = Value> {
    prop_oneof![
        4 => ".{0,32}".prop_map(Value::String),
        1 => Just(Value::Null),
    ]
}

/// Strategy for sparse `DbSyncObject` payloads: any subset of `Text` and
/// `Tags`, the latter being excluded from sync.
pub fn sparse_payload_strategy() -> impl Strategy<Value = Payload> {
    (
        prop::option::of(text_value_strategy()),
        prop::option::of(text_value_strategy()),
    )
        .prop_map(|(text, tags)| {
            let mut payload = Payload::new();
            if let Some(text) = text {
                payload.insert("Text".into(), text);
            }
            if let Some(tags) = tags {
                payload.insert("Tags".into(), tags);
            }
            payload
        })
}

/// Strategy for a `DbSyncObject` upsert.
pub fn db_sync_item_strategy() -> impl Strategy<Value = ChangeItem> {
    (text_key_strategy(), sparse_payload_strategy())
        .prop_map(|(key, payload)| ChangeItem::upsert(DB_SYNC_OBJECT, key, payload))
}

/// A `RefSyncObject` graph: each node carries text and references to
/// other nodes of the same pool.
#[derive(Debug, Clone)]
pub struct RefGraph {
    /// Node keys with their text.
    pub nodes: Vec<(String, String)>,
    /// Outgoing references per node, by index into `nodes`.
    pub edges: Vec<Vec<usize>>,
}

impl RefGraph {
    /// One upsert per node, each carrying its full reference list.
    pub fn items(&self) -> Vec<ChangeItem> {
        self.nodes
            .iter()
            .zip(&self.edges)
            .map(|((key, text), edges)| {
                let refs: Vec<Value> = edges
                    .iter()
                    .map(|&i| Value::String(self.nodes[i].0.clone()))
                    .collect();
                let mut payload = Payload::new();
                payload.insert("Text".into(), Value::String(text.clone()));
                payload.insert("References".into(), Value::Array(refs));
                ChangeItem::upsert(REF_SYNC_OBJECT, key.clone(), payload)
            })
            .collect()
    }
}

/// Strategy for reference graphs of 1 to `max_nodes` nodes with distinct
/// keys.
pub fn ref_graph_strategy(max_nodes: usize) -> impl Strategy<Value = RefGraph> {
    prop::collection::btree_map(text_key_strategy(), "[a-z]{1,8}", 1..=max_nodes)
        .prop_flat_map(|nodes| {
            let nodes: Vec<(String, String)> = nodes.into_iter().collect();
            let len = nodes.len();
            let edges = prop::collection::vec(prop::collection::vec(0..len, 0..=len), len);
            (Just(nodes), edges)
        })
        .prop_map(|(nodes, edges)| RefGraph { nodes, edges })
}
