//! Running event counters.
//!
//! [`EventAggregator`] keeps three independent counter maps (by bucket, by
//! operation type, by object key). Each map has its own lock, so concurrent
//! [`record`](EventAggregator::record) calls never lose an increment, while a
//! [`snapshot`](EventAggregator::snapshot) taken mid-flight may see some but
//! not all of one event's three increments.
//!
//! # Examples
//!
//! ```rust
//! use event_tally_core::{EventAggregator, EventFields};
//!
//! let aggregator = EventAggregator::default();
//! aggregator.record_fields(&EventFields::unknown());
//!
//! let stats = aggregator.snapshot();
//! assert_eq!(stats.by_bucket["unknown"], 1);
//! assert_eq!(stats.by_type["unknown"], 1);
//! assert_eq!(stats.by_object["unknown"], 1);
//! ```

use crate::classification::{ClassificationProfile, EventFields};
use crate::event::VerifiedEvent;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};
use tracing::trace;

/// Point-in-time copy of the counters, as served by `GET /stats`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventStats {
    pub by_bucket: BTreeMap<String, u64>,
    pub by_type: BTreeMap<String, u64>,
    pub by_object: BTreeMap<String, u64>,
}

/// A string-keyed counter map behind its own lock.
#[derive(Debug, Default)]
struct CounterMap {
    counts: Mutex<HashMap<String, u64>>,
}

impl CounterMap {
    // A panic elsewhere cannot leave a half-applied increment behind, so a
    // poisoned map is still consistent.
    fn lock(&self) -> MutexGuard<'_, HashMap<String, u64>> {
        self.counts.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn increment(&self, key: &str) {
        let mut counts = self.lock();
        match counts.get_mut(key) {
            Some(count) => *count = count.saturating_add(1),
            None => {
                counts.insert(key.to_string(), 1);
            }
        }
    }

    fn snapshot(&self) -> BTreeMap<String, u64> {
        self.lock()
            .iter()
            .map(|(key, count)| (key.clone(), *count))
            .collect()
    }
}

/// Concurrency-safe event counters.
///
/// Construct one per service and share it through `Arc`.
#[derive(Debug, Default)]
pub struct EventAggregator {
    profile: ClassificationProfile,
    by_bucket: CounterMap,
    by_type: CounterMap,
    by_object: CounterMap,
    recorded: AtomicU64,
}

impl EventAggregator {
    /// Create an aggregator that classifies events with `profile`.
    pub fn new(profile: ClassificationProfile) -> Self {
        Self {
            profile,
            ..Default::default()
        }
    }

    pub fn profile(&self) -> ClassificationProfile {
        self.profile
    }

    /// Classify a verified event and count it.
    ///
    /// Returns the fields that were counted. Missing or malformed fields are
    /// counted under `"unknown"`; this never fails.
    pub fn record(&self, event: &VerifiedEvent) -> EventFields {
        let fields = self.profile.classify(event);
        self.record_fields(&fields);
        fields
    }

    /// Count an already classified event.
    pub fn record_fields(&self, fields: &EventFields) {
        self.by_bucket.increment(&fields.bucket);
        self.by_type.increment(&fields.operation);
        self.by_object.increment(&fields.key);
        self.recorded.fetch_add(1, Ordering::Relaxed);

        trace!(
            bucket = %fields.bucket,
            operation = %fields.operation,
            key = %fields.key,
            "Counted event"
        );
    }

    /// Copy the current counters.
    pub fn snapshot(&self) -> EventStats {
        EventStats {
            by_bucket: self.by_bucket.snapshot(),
            by_type: self.by_type.snapshot(),
            by_object: self.by_object.snapshot(),
        }
    }

    /// Number of events recorded since start-up.
    pub fn total_recorded(&self) -> u64 {
        self.recorded.load(Ordering::Relaxed)
    }
}

#[cfg(test)]
#[path = "aggregator_tests.rs"]
mod tests;
