//! Server counters.
//!
//! All counters are atomic and may be read while requests are in flight.

use std::sync::atomic::{AtomicU64, Ordering};

/// Request and item counters for a running server.
#[derive(Debug, Default)]
pub struct ServerStats {
    /// Upload batches accepted.
    upload_batches: AtomicU64,
    /// Items committed.
    items_committed: AtomicU64,
    /// Items that failed.
    items_failed: AtomicU64,
    /// Items skipped because their type is not registered.
    items_skipped: AtomicU64,
    /// Download requests served.
    downloads: AtomicU64,
    /// Objects returned by downloads.
    objects_downloaded: AtomicU64,
    /// Requests refused as a whole.
    requests_rejected: AtomicU64,
}

impl ServerStats {
    /// Creates zeroed counters.
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn record_upload(&self, committed: u64, failed: u64, skipped: u64) {
        self.upload_batches.fetch_add(1, Ordering::Relaxed);
        self.items_committed.fetch_add(committed, Ordering::Relaxed);
        self.items_failed.fetch_add(failed, Ordering::Relaxed);
        self.items_skipped.fetch_add(skipped, Ordering::Relaxed);
    }

    pub(crate) fn record_download(&self, objects: u64) {
        self.downloads.fetch_add(1, Ordering::Relaxed);
        self.objects_downloaded.fetch_add(objects, Ordering::Relaxed);
    }

    pub(crate) fn record_rejected(&self) {
        self.requests_rejected.fetch_add(1, Ordering::Relaxed);
    }

    /// Upload batches accepted.
    pub fn upload_batches(&self) -> u64 {
        self.upload_batches.load(Ordering::Relaxed)
    }

    /// Items committed.
    pub fn items_committed(&self) -> u64 {
        self.items_committed.load(Ordering::Relaxed)
    }

    /// Items that failed.
    pub fn items_failed(&self) -> u64 {
        self.items_failed.load(Ordering::Relaxed)
    }

    /// Items skipped as unregistered.
    pub fn items_skipped(&self) -> u64 {
        self.items_skipped.load(Ordering::Relaxed)
    }

    /// Download requests served.
    pub fn downloads(&self) -> u64 {
        self.downloads.load(Ordering::Relaxed)
    }

    /// Objects returned by downloads.
    pub fn objects_downloaded(&self) -> u64 {
        self.objects_downloaded.load(Ordering::Relaxed)
    }

    /// Requests refused as a whole.
    pub fn requests_rejected(&self) -> u64 {
        self.requests_rejected.load(Ordering::Relaxed)
    }

    /// Copies all counters at once.
    pub fn snapshot(&self) -> StatsSnapshot {
        StatsSnapshot {
            upload_batches: self.upload_batches(),
            items_committed: self.items_committed(),
            items_failed: self.items_failed(),
            items_skipped: self.items_skipped(),
            downloads: self.downloads(),
            objects_downloaded: self.objects_downloaded(),
            requests_rejected: self.requests_rejected(),
        }
    }
}

/// Point-in-time copy of [`ServerStats`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StatsSnapshot {
    /// Upload batches accepted.
    pub upload_batches: u64,
    /// Items committed.
    pub items_committed: u64,
    /// Items that failed.
    pub items_failed: u64,
    /// Items skipped as unregistered.
    pub items_skipped: u64,
    /// Download requests served.
    pub downloads: u64,
    /// Objects returned by downloads.
    pub objects_downloaded: u64,
    /// Requests refused as a whole.
    pub requests_rejected: u64,
}
