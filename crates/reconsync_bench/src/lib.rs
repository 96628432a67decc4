//! Benchmark utilities.

#![warn(missing_docs)]

use rand::distributions::Alphanumeric;
use rand::Rng;
use reconsync_protocol::{ChangeItem, Payload};
use reconsync_testkit::{DB_SYNC_OBJECT, REF_SYNC_OBJECT};
use serde_json::Value;

/// Random alphanumeric text of `len` characters.
pub fn random_text(len: usize) -> String {
    rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(len)
        .map(char::from)
        .collect()
}

/// `count` upserts of `DbSyncObject` with distinct keys and `text_len`
/// characters of text each.
pub fn plain_batch(count: usize, text_len: usize) -> Vec<ChangeItem> {
    (0..count)
        .map(|i| {
            let mut payload = Payload::new();
            payload.insert("Text".into(), Value::String(random_text(text_len)));
            payload.insert("Tags".into(), Value::String("ignored".into()));
            ChangeItem::upsert(DB_SYNC_OBJECT, format!("k{i}"), payload)
        })
        .collect()
}

/// `count` upserts of `RefSyncObject`, each referencing `fan_out` random
/// keys of the same batch.
pub fn reference_batch(count: usize, fan_out: usize) -> Vec<ChangeItem> {
    let mut rng = rand::thread_rng();
    (0..count)
        .map(|i| {
            let refs: Vec<Value> = (0..fan_out)
                .map(|_| Value::String(format!("r{}", rng.gen_range(0..count.max(1)))))
                .collect();
            let mut payload = Payload::new();
            payload.insert("Text".into(), Value::String(random_text(16)));
            payload.insert("References".into(), Value::Array(refs));
            ChangeItem::upsert(REF_SYNC_OBJECT, format!("r{i}"), payload)
        })
        .collect()
}
