//! Property tests over the reconciliation invariants.

use proptest::prelude::*;
use reconsync_protocol::{ChangeItem, Payload};
use reconsync_testkit::prelude::*;
use serde_json::Value;
use std::collections::{BTreeMap, BTreeSet};

/// Wire view of every live row of a type, keyed by client key.
fn state_of(harness: &TestHarness, type_name: &str) -> BTreeMap<String, Payload> {
    harness
        .download(&[type_name])
        .changed_objects
        .into_iter()
        .map(|o| (o.mobile_primary_key, o.payload))
        .collect()
}

fn text_of(value: &Value) -> Option<&str> {
    value.as_str()
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn reupload_is_idempotent(items in prop::collection::vec(db_sync_item_strategy(), 1..12)) {
        let harness = TestHarness::new();
        harness.upload(items.clone());
        let once = state_of(&harness, DB_SYNC_OBJECT);

        let response = harness.upload(items);
        prop_assert!(response.all_succeeded());
        prop_assert_eq!(state_of(&harness, DB_SYNC_OBJECT), once);
    }

    #[test]
    fn absent_fields_keep_their_values(
        initial in "[a-z]{1,10}",
        tags in "[a-z]{1,10}",
        update in sparse_payload_strategy(),
    ) {
        let harness = TestHarness::new();
        harness.insert_direct(DB_SYNC_OBJECT, Some("k"), |row| {
            row.set("Text", initial.as_str());
            row.set("Tags", tags.as_str());
        });

        let response = harness.upload(vec![ChangeItem::upsert(DB_SYNC_OBJECT, "k", update.clone())]);
        prop_assert!(response.all_succeeded());

        let row = harness.get(DB_SYNC_OBJECT, "k").unwrap();
        let expected_text = match update.get("Text") {
            Some(value) => text_of(value),
            None => Some(initial.as_str()),
        };
        prop_assert_eq!(row.get("Text").as_text(), expected_text);
        prop_assert_eq!(row.get("Tags").as_text(), Some(tags.as_str()));
    }

    #[test]
    fn created_rows_default_unset_fields(payload in sparse_payload_strategy()) {
        let harness = TestHarness::new();
        harness.upload(vec![ChangeItem::upsert(DB_SYNC_OBJECT, "k", payload.clone())]);

        let row = harness.get(DB_SYNC_OBJECT, "k").unwrap();
        match payload.get("Text") {
            Some(value) => prop_assert_eq!(row.get("Text").as_text(), text_of(value)),
            None => prop_assert!(row.get("Text").is_null()),
        }
        prop_assert!(row.get("Tags").is_null());
    }

    #[test]
    fn references_match_the_last_list(graph in ref_graph_strategy(6)) {
        let harness = TestHarness::new();
        let response = harness.upload(graph.items());
        prop_assert!(response.all_succeeded());

        for ((key, text), edges) in graph.nodes.iter().zip(&graph.edges) {
            let row = harness.get(REF_SYNC_OBJECT, key).unwrap();
            prop_assert_eq!(row.get("Text").as_text(), Some(text.as_str()));
            let stored: BTreeSet<String> = row.references("References").map(|k| k.to_string()).collect();
            let expected: BTreeSet<String> = edges.iter().map(|&i| graph.nodes[i].0.clone()).collect();
            prop_assert_eq!(stored, expected);
        }
        prop_assert_eq!(harness.count(REF_SYNC_OBJECT), graph.nodes.len());
    }

    #[test]
    fn batch_order_does_not_matter(
        (graph, shuffled) in ref_graph_strategy(6).prop_flat_map(|graph| {
            let items = graph.items();
            (Just(graph), Just(items).prop_shuffle())
        })
    ) {
        let in_order = TestHarness::new();
        in_order.upload(graph.items());

        let reordered = TestHarness::new();
        let response = reordered.upload(shuffled);
        prop_assert!(response.all_succeeded());

        prop_assert_eq!(state_of(&in_order, REF_SYNC_OBJECT), state_of(&reordered, REF_SYNC_OBJECT));
    }

    #[test]
    fn unregistered_items_never_reported(
        registered in prop::collection::vec(db_sync_item_strategy(), 0..6),
        noise in prop::collection::vec(("[A-Z][a-z]{3,8}Ghost", text_key_strategy()), 0..6),
    ) {
        let harness = TestHarness::new();
        let mut items = registered.clone();
        items.extend(noise.into_iter().map(|(ty, key)| ChangeItem::upsert(ty, key, Payload::new())));

        let response = harness.upload(items);
        prop_assert_eq!(response.results.len(), registered.len());
    }
}
