//! Ordered, capacity-bounded signal collection.
//!
//! Two entry points feed the same state:
//! - `replace_all`: a poll snapshot is authoritative and overwrites everything
//! - `append`: a pushed event is a delta, dropped if its dedup key is present
//!
//! Invariants held after every call:
//! - `len() <= capacity()`
//! - no two records share a `DedupKey`
//! - records are ordered oldest first, newest last

use std::collections::{HashSet, VecDeque};
use std::sync::Arc;

use serde_json::Value;
use sigdash_core::{normalize, DedupKey, DynClock, SignalRecord};
use tracing::{debug, warn};

/// Default number of visible signals.
pub const DEFAULT_CAPACITY: usize = 50;

/// Read-only copy of the feed, newest last.
pub type FeedSnapshot = Arc<[SignalRecord]>;

/// Result of `append`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppendOutcome {
    /// Record added at the tail; `evicted` records dropped from the head.
    Appended { evicted: usize },
    /// Dedup key already present, feed untouched.
    Duplicate,
    /// Payload failed normalization, feed untouched.
    Rejected,
}

impl AppendOutcome {
    /// Whether the feed changed.
    pub fn is_mutation(&self) -> bool {
        matches!(self, Self::Appended { .. })
    }
}

/// Result of `replace_all`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ReplaceSummary {
    /// Records installed.
    pub accepted: usize,
    /// Entries that failed normalization.
    pub skipped_invalid: usize,
    /// Entries repeating a dedup key earlier in the same snapshot.
    pub skipped_duplicate: usize,
    /// Oldest entries dropped to fit capacity.
    pub truncated: usize,
    /// Whether the installed records differ from the previous ones.
    pub changed: bool,
}

/// Bounded signal feed.
pub struct BoundedSignalFeed {
    capacity: usize,
    records: VecDeque<SignalRecord>,
    keys: HashSet<DedupKey>,
    clock: DynClock,
}

impl BoundedSignalFeed {
    /// Create an empty feed. A capacity of zero is raised to one.
    pub fn new(capacity: usize, clock: DynClock) -> Self {
        let capacity = capacity.max(1);
        Self {
            capacity,
            records: VecDeque::with_capacity(capacity + 1),
            keys: HashSet::with_capacity(capacity + 1),
            clock,
        }
    }

    /// Create an empty feed with `DEFAULT_CAPACITY`.
    pub fn with_default_capacity(clock: DynClock) -> Self {
        Self::new(DEFAULT_CAPACITY, clock)
    }

    /// Replace the whole feed with a poll snapshot.
    ///
    /// Entries are normalized in the given order; invalid entries and
    /// repeated keys are skipped individually. If more than `capacity`
    /// records remain, only the last `capacity` are kept. The new sequence
    /// is built completely before it replaces the old one.
    ///
    /// A record that is already in the feed keeps its original
    /// `received_at`, so replaying the same snapshot leaves the feed
    /// identical.
    pub fn replace_all(&mut self, entries: &[Value]) -> ReplaceSummary {
        let now = self.clock.now();
        let mut summary = ReplaceSummary::default();
        let mut seen: HashSet<DedupKey> = HashSet::with_capacity(entries.len());
        let mut fresh: Vec<SignalRecord> = Vec::with_capacity(entries.len());

        for (index, raw) in entries.iter().enumerate() {
            let record = match normalize(raw, now) {
                Ok(record) => record,
                Err(e) => {
                    warn!(index, error = %e, "Skipping invalid snapshot entry");
                    summary.skipped_invalid += 1;
                    continue;
                }
            };

            let key = record.key();
            if !seen.insert(key.clone()) {
                debug!(index, symbol = %key.symbol, "Skipping repeated snapshot entry");
                summary.skipped_duplicate += 1;
                continue;
            }

            let record = match self.find(&key) {
                Some(existing) => record.with_received_at(existing.received_at()),
                None => record,
            };
            fresh.push(record);
        }

        if fresh.len() > self.capacity {
            summary.truncated = fresh.len() - self.capacity;
            fresh.drain(..summary.truncated);
        }

        summary.accepted = fresh.len();
        summary.changed = !self.records.iter().eq(fresh.iter());

        self.keys = fresh.iter().map(SignalRecord::key).collect();
        self.records = fresh.into();

        debug!(
            accepted = summary.accepted,
            skipped_invalid = summary.skipped_invalid,
            skipped_duplicate = summary.skipped_duplicate,
            truncated = summary.truncated,
            changed = summary.changed,
            "Feed replaced from snapshot"
        );

        summary
    }

    /// Append one pushed event.
    ///
    /// No-op if the event fails normalization or its dedup key is already
    /// present. Otherwise the record goes to the tail and the oldest records
    /// are evicted until the feed fits its capacity.
    pub fn append(&mut self, raw: &Value) -> AppendOutcome {
        let record = match normalize(raw, self.clock.now()) {
            Ok(record) => record,
            Err(e) => {
                warn!(error = %e, "Skipping invalid push event");
                return AppendOutcome::Rejected;
            }
        };

        let key = record.key();
        if self.keys.contains(&key) {
            debug!(
                symbol = %key.symbol,
                time = %key.signal_time,
                direction = %key.direction,
                "Dropping duplicate push event"
            );
            return AppendOutcome::Duplicate;
        }

        self.records.push_back(record);
        self.keys.insert(key);

        let mut evicted = 0;
        while self.records.len() > self.capacity {
            if let Some(old) = self.records.pop_front() {
                self.keys.remove(&old.key());
                evicted += 1;
            }
        }

        AppendOutcome::Appended { evicted }
    }

    /// Current records, newest last.
    pub fn snapshot(&self) -> FeedSnapshot {
        self.records.iter().cloned().collect()
    }

    /// Iterate records, oldest first.
    pub fn iter(&self) -> impl DoubleEndedIterator<Item = &SignalRecord> + '_ {
        self.records.iter()
    }

    /// Most recently inserted record.
    pub fn latest(&self) -> Option<&SignalRecord> {
        self.records.back()
    }

    pub fn contains(&self, key: &DedupKey) -> bool {
        self.keys.contains(key)
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    fn find(&self, key: &DedupKey) -> Option<&SignalRecord> {
        if !self.keys.contains(key) {
            return None;
        }
        self.records.iter().find(|r| r.matches(key))
    }
}

impl std::fmt::Debug for BoundedSignalFeed {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BoundedSignalFeed")
            .field("capacity", &self.capacity)
            .field("len", &self.records.len())
            .finish()
    }
}
