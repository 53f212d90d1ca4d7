//! Aggregation buffer: running totals per (subject, metric, status).

use std::collections::HashMap;

use crate::types::{Status, Timestamp};

/// Identifies one bucket within a subject.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct AggregateKey {
    pub name: String,
    pub status: Status,
}

impl AggregateKey {
    pub fn new(name: impl Into<String>, status: Status) -> Self {
        Self {
            name: name.into(),
            status,
        }
    }
}

impl std::fmt::Display for AggregateKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}-{}", self.name, self.status)
    }
}

/// Accumulator state of one bucket.
#[derive(Debug, Clone, PartialEq)]
pub struct AggregateValue {
    /// Sum of scores absorbed since the window started.
    pub score: f64,
    /// Samples absorbed since the window started.
    pub count: u64,
    pub window_start: Timestamp,
    pub last_seen: Timestamp,
    /// Number of times this bucket has been flushed.
    pub flushes: u64,
}

impl AggregateValue {
    fn new(score: f32, now: Timestamp) -> Self {
        Self {
            score: score as f64,
            count: 1,
            window_start: now,
            last_seen: now,
            flushes: 0,
        }
    }

    /// True only for the sample that created the bucket.
    pub fn is_first_sight(&self) -> bool {
        self.count == 1 && self.flushes == 0
    }

    /// Elapsed milliseconds between the window start and the latest sample.
    pub fn window_millis(&self) -> u64 {
        self.last_seen.saturating_sub(self.window_start)
    }

    /// Mean of the absorbed scores.
    pub fn average(&self) -> f32 {
        if self.count == 0 {
            return 0.0;
        }
        (self.score / self.count as f64) as f32
    }

    /// Start a new window after the bucket has been flushed.
    pub fn reset(&mut self, now: Timestamp) {
        self.score = 0.0;
        self.count = 0;
        self.window_start = now;
        self.last_seen = now;
        self.flushes += 1;
    }
}

/// Per-subject map of aggregation buckets.
#[derive(Debug, Default)]
pub struct AggregationBuffer {
    content: HashMap<String, HashMap<AggregateKey, AggregateValue>>,
}

impl AggregationBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a sample and return the bucket it landed in.
    pub fn insert(
        &mut self,
        subject: &str,
        name: &str,
        status: Status,
        score: f32,
        now: Timestamp,
    ) -> &mut AggregateValue {
        let aggs = self.content.entry(subject.to_string()).or_insert_with(|| {
            tracing::debug!(subject = %subject, "New aggregate map");
            HashMap::new()
        });

        let key = AggregateKey::new(name, status);
        match aggs.entry(key) {
            std::collections::hash_map::Entry::Vacant(slot) => {
                tracing::trace!(subject = %subject, key = %slot.key(), "New aggregate value");
                slot.insert(AggregateValue::new(score, now))
            }
            std::collections::hash_map::Entry::Occupied(slot) => {
                let val = slot.into_mut();
                val.count += 1;
                val.score += score as f64;
                val.last_seen = val.last_seen.max(now);
                val
            }
        }
    }

    pub fn get(&self, subject: &str, name: &str, status: Status) -> Option<&AggregateValue> {
        self.content
            .get(subject)
            .and_then(|aggs| aggs.get(&AggregateKey::new(name, status)))
    }

    /// Total number of buckets across all subjects.
    pub fn len(&self) -> usize {
        self.content.values().map(HashMap::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
