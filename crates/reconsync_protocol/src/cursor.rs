//! Change timestamps and per-type download cursors.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::time::{SystemTime, UNIX_EPOCH};

/// The moment a row was last changed, in milliseconds since the Unix epoch.
///
/// Timestamps handed out by a store are strictly increasing, so they double
/// as a total order over committed changes.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct ChangeTimestamp(pub i64);

impl ChangeTimestamp {
    /// Creates a timestamp from milliseconds since the Unix epoch.
    #[must_use]
    pub const fn from_millis(millis: i64) -> Self {
        Self(millis)
    }

    /// Returns the current wall-clock time.
    #[must_use]
    pub fn now() -> Self {
        let millis = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_millis() as i64)
            .unwrap_or_default();
        Self(millis)
    }

    /// Returns the raw millisecond value.
    #[must_use]
    pub const fn as_millis(self) -> i64 {
        self.0
    }

    /// Returns the next representable timestamp.
    #[must_use]
    pub const fn next(self) -> Self {
        Self(self.0.saturating_add(1))
    }
}

impl fmt::Display for ChangeTimestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ts:{}", self.0)
    }
}

/// Per-type "last seen change" markers.
///
/// A type missing from the cursor is downloaded as a full snapshot.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DownloadCursor(BTreeMap<String, ChangeTimestamp>);

impl DownloadCursor {
    /// Creates an empty cursor.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the timestamp recorded for a type.
    pub fn get(&self, type_name: &str) -> Option<ChangeTimestamp> {
        self.0.get(type_name).copied()
    }

    /// Sets the timestamp for a type, replacing any previous value.
    pub fn set(&mut self, type_name: impl Into<String>, timestamp: ChangeTimestamp) {
        self.0.insert(type_name.into(), timestamp);
    }

    /// Sets the timestamp for a type (builder form).
    #[must_use]
    pub fn with(mut self, type_name: impl Into<String>, timestamp: ChangeTimestamp) -> Self {
        self.set(type_name, timestamp);
        self
    }

    /// Moves the marker for a type forward; never moves it backwards.
    pub fn advance(&mut self, type_name: &str, timestamp: ChangeTimestamp) {
        match self.0.get_mut(type_name) {
            Some(current) if *current >= timestamp => {}
            Some(current) => *current = timestamp,
            None => {
                self.0.insert(type_name.to_string(), timestamp);
            }
        }
    }

    /// Iterates over `(type name, timestamp)` pairs in type-name order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, ChangeTimestamp)> {
        self.0.iter().map(|(k, v)| (k.as_str(), *v))
    }

    /// Returns the number of types tracked.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Returns true if no type is tracked.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl FromIterator<(String, ChangeTimestamp)> for DownloadCursor {
    fn from_iter<I: IntoIterator<Item = (String, ChangeTimestamp)>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}
