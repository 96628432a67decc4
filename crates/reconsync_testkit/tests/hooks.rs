//! Validation hook scenarios.

use reconsync_core::{FieldValue, HookArgs, NativeKey, SyncHook};
use reconsync_testkit::prelude::*;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

fn harness_with_hook(hook: impl SyncHook + 'static) -> TestHarness {
    let registry = fixture_registry_builder_without(&[IGNORED_FIELDS_OBJECT])
        .register(fixture_type(IGNORED_FIELDS_OBJECT).hook(hook).build().unwrap())
        .build()
        .unwrap();
    TestHarness::with_registry(registry)
}

fn seed(harness: &TestHarness) {
    assert_no_errors(&harness.upload(vec![item(
        IGNORED_FIELDS_OBJECT,
        "1",
        json!({"Id": "1", "Text": "123", "Tags": "zxc"}),
    )]));
}

#[test]
fn hook_sees_original_and_merged_state() {
    let calls = Arc::new(AtomicUsize::new(0));
    let seen = Arc::clone(&calls);
    let harness = harness_with_hook(move |args: &mut HookArgs<'_>| {
        if let Some(original) = args.original() {
            assert_eq!(original.get("Text").as_text(), Some("123"));
            assert_eq!(args.entity().get("Text").as_text(), Some("asd"));
            seen.fetch_add(1, Ordering::SeqCst);
        }
        true
    });
    seed(&harness);

    assert_no_errors(&harness.upload(vec![item(
        IGNORED_FIELDS_OBJECT,
        "1",
        json!({"Id": "1", "Text": "asd", "Tags": "zxc"}),
    )]));
    assert_eq!(calls.load(Ordering::SeqCst), 1);

    let row = harness.get(IGNORED_FIELDS_OBJECT, "1").unwrap();
    assert_eq!(row.get("Text").as_text(), Some("asd"));
    assert!(row.get("Tags").is_null());
}

#[test]
fn hook_edits_are_persisted() {
    let harness = harness_with_hook(|args: &mut HookArgs<'_>| {
        if args.original().is_some() {
            args.entity_mut().set("Text", "qwe");
        }
        true
    });
    seed(&harness);

    assert_no_errors(&harness.upload(vec![item(
        IGNORED_FIELDS_OBJECT,
        "1",
        json!({"Id": "1", "Text": "asd", "Tags": "zxc"}),
    )]));
    assert_eq!(harness.get(IGNORED_FIELDS_OBJECT, "1").unwrap().get("Text").as_text(), Some("qwe"));
}

#[test]
fn hook_can_read_the_entity_from_the_store() {
    let harness = harness_with_hook(|args: &mut HookArgs<'_>| {
        let model = args.descriptor().model().to_string();
        let key = args.entity().key().cloned().unwrap();
        let found = args.store().find_by_key(&model, &key).unwrap();
        assert!(found.is_some());
        if args.original().is_some() {
            args.entity_mut().set("Text", "qwe");
        }
        true
    });
    seed(&harness);

    assert_no_errors(&harness.upload(vec![item(
        IGNORED_FIELDS_OBJECT,
        "1",
        json!({"Id": "1", "Text": "asd"}),
    )]));
    assert_eq!(harness.get(IGNORED_FIELDS_OBJECT, "1").unwrap().get("Text").as_text(), Some("qwe"));
}

#[test]
fn hook_receives_no_original_on_create() {
    let harness = harness_with_hook(|args: &mut HookArgs<'_>| {
        assert!(args.original().is_none());
        assert_eq!(args.change().primary_key, "new");
        true
    });
    assert_no_errors(&harness.upload(vec![item(IGNORED_FIELDS_OBJECT, "new", json!({"Text": "t"}))]));
}

#[test]
fn rejection_rolls_back_item_and_placeholders() {
    let registry = fixture_registry_builder_without(&[REF_SYNC_OBJECT])
        .register(
            fixture_type(REF_SYNC_OBJECT)
                .hook(|args: &mut HookArgs<'_>| {
                    if args.entity().get("Text").as_text() == Some("bad") {
                        return args.reject("Text may not be bad");
                    }
                    true
                })
                .build()
                .unwrap(),
        )
        .build()
        .unwrap();
    let harness = TestHarness::with_registry(registry);

    let response = harness.upload(vec![
        item(REF_SYNC_OBJECT, "1", json!({"Text": "bad", "References": ["2"]})),
        item(REF_SYNC_OBJECT, "3", json!({"Text": "good"})),
    ]);
    assert!(!response.results[0].success);
    assert!(response.results[0].error.as_deref().unwrap().contains("Text may not be bad"));
    assert!(response.results[1].success);
    assert_eq!(harness.count(REF_SYNC_OBJECT), 1);
    assert!(harness.get(REF_SYNC_OBJECT, "2").is_none());
}

#[test]
fn panicking_hook_fails_only_its_item() {
    let harness = harness_with_hook(|args: &mut HookArgs<'_>| {
        if args.change().primary_key == "boom" {
            panic!("hook exploded");
        }
        true
    });
    let response = harness.upload(vec![
        item(IGNORED_FIELDS_OBJECT, "boom", json!({"Text": "x"})),
        item(IGNORED_FIELDS_OBJECT, "fine", json!({"Text": "y"})),
    ]);
    assert!(!response.results[0].success);
    assert!(response.results[1].success);
    assert!(harness.get(IGNORED_FIELDS_OBJECT, "boom").is_none());
}

#[test]
fn default_hook_applies_to_types_without_their_own() {
    let registry = fixture_registry_builder_without(&[])
        .default_hook(|args: &mut HookArgs<'_>| {
            args.entity_mut().set("Text", FieldValue::from("stamped"));
            true
        })
        .build()
        .unwrap();
    let harness = TestHarness::with_registry(registry);
    assert_no_errors(&harness.upload(vec![item(DB_SYNC_OBJECT, "1", json!({"Text": "raw"}))]));
    let row = harness
        .store()
        .get(DB_SYNC_OBJECT, &NativeKey::from("1"))
        .unwrap()
        .unwrap();
    assert_eq!(row.get("Text").as_text(), Some("stamped"));
}
