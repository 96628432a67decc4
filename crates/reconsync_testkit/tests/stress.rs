//! Concurrent uploads against one store.

use reconsync_testkit::prelude::*;

#[test]
fn concurrent_uploads_account_for_every_item() {
    let harness = TestHarness::new();
    let config = StressConfig::default();
    let result = concurrent_uploads(&harness, &config);

    assert_eq!(result.committed + result.failed, result.total_items);
    assert!(result.committed > 0);
    assert!(harness.count(DB_SYNC_OBJECT) <= config.key_space);

    let stats = harness.server().stats();
    assert_eq!(stats.items_committed as usize, result.committed);
    assert_eq!(stats.upload_batches as usize, config.threads * config.batches);
}

#[test]
fn disjoint_keys_never_conflict() {
    let harness = TestHarness::new();
    let config = StressConfig {
        threads: 1,
        batches: 5,
        batch_size: 10,
        key_space: 1000,
    };
    let result = concurrent_uploads(&harness, &config);
    assert_eq!(result.failed, 0);
    assert!(result.items_per_second() >= 0.0);
}
