//! Concurrent upload helpers.

use crate::fixtures::DB_SYNC_OBJECT;
use crate::harness::TestHarness;
use reconsync_core::RequestContext;
use reconsync_protocol::{ChangeItem, Payload, UploadRequest};
use serde_json::Value;
use std::thread;
use std::time::{Duration, Instant};

/// Result of a stress run.
#[derive(Debug, Clone)]
pub struct StressTestResult {
    /// Items sent.
    pub total_items: usize,
    /// Items committed.
    pub committed: usize,
    /// Items that failed.
    pub failed: usize,
    /// Wall time.
    pub duration: Duration,
}

impl StressTestResult {
    /// Items per second.
    pub fn items_per_second(&self) -> f64 {
        if self.duration.as_secs_f64() > 0.0 {
            self.total_items as f64 / self.duration.as_secs_f64()
        } else {
            0.0
        }
    }
}

/// Configuration for a stress run.
#[derive(Debug, Clone)]
pub struct StressConfig {
    /// Concurrent uploaders.
    pub threads: usize,
    /// Batches per uploader.
    pub batches: usize,
    /// Items per batch.
    pub batch_size: usize,
    /// Distinct keys shared by all uploaders; overlapping keys make
    /// uploaders race on the same rows.
    pub key_space: usize,
}

impl Default for StressConfig {
    fn default() -> Self {
        Self {
            threads: 4,
            batches: 10,
            batch_size: 20,
            key_space: 50,
        }
    }
}

/// Runs concurrent `DbSyncObject` uploads against the harness.
pub fn concurrent_uploads(harness: &TestHarness, config: &StressConfig) -> StressTestResult {
    let start = Instant::now();
    let (committed, failed) = thread::scope(|scope| {
        let workers: Vec<_> = (0..config.threads)
            .map(|worker| {
                scope.spawn(move || {
                    let ctx = RequestContext::for_principal(format!("worker-{worker}"));
                    let mut committed = 0;
                    let mut failed = 0;
                    for batch in 0..config.batches {
                        let items = (0..config.batch_size)
                            .map(|i| {
                                let n = (worker * 31 + batch * 7 + i) % config.key_space.max(1);
                                let mut payload = Payload::new();
                                payload.insert(
                                    "Text".into(),
                                    Value::String(format!("w{worker}b{batch}i{i}")),
                                );
                                ChangeItem::upsert(DB_SYNC_OBJECT, format!("k{n}"), payload)
                            })
                            .collect();
                        let response = harness
                            .server()
                            .handle_upload(&UploadRequest::new(items), &ctx)
                            .expect("batch within limits");
                        let failures = response.failures().count();
                        failed += failures;
                        committed += response.results.len() - failures;
                    }
                    (committed, failed)
                })
            })
            .collect();
        workers
            .into_iter()
            .map(|w| w.join().expect("uploader panicked"))
            .fold((0, 0), |(c, f), (wc, wf)| (c + wc, f + wf))
    });

    StressTestResult {
        total_items: config.threads * config.batches * config.batch_size,
        committed,
        failed,
        duration: start.elapsed(),
    }
}
