//! Bounded record of failed source attempts.
//!
//! Purely diagnostic: nothing in the retrieval path reads it back.

use std::collections::VecDeque;

use chrono::{DateTime, Utc};
use serde::Serialize;

/// One failed attempt against one source.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AttemptRecord {
    pub feed: String,
    pub error: String,
    pub source: String,
    pub at: DateTime<Utc>,
}

/// FIFO ring of the most recent failures.
#[derive(Debug, Clone)]
pub struct AttemptLog {
    entries: VecDeque<AttemptRecord>,
    capacity: usize,
    recent_window: usize,
}

impl AttemptLog {
    pub const DEFAULT_CAPACITY: usize = 50;
    pub const DEFAULT_RECENT: usize = 10;

    pub fn new(capacity: usize, recent_window: usize) -> Self {
        Self {
            entries: VecDeque::with_capacity(capacity),
            capacity,
            recent_window,
        }
    }

    pub(crate) fn record(
        &mut self,
        feed: &str,
        source: &str,
        error: impl ToString,
        at: DateTime<Utc>,
    ) {
        self.entries.push_back(AttemptRecord {
            feed: feed.to_string(),
            error: error.to_string(),
            source: source.to_string(),
            at,
        });
        while self.entries.len() > self.capacity {
            self.entries.pop_front();
        }
    }

    /// The latest few entries, oldest first.
    pub fn recent(&self) -> Vec<AttemptRecord> {
        let skip = self.entries.len().saturating_sub(self.recent_window);
        self.entries.iter().skip(skip).cloned().collect()
    }

    /// Every retained entry, oldest first.
    pub fn entries(&self) -> Vec<AttemptRecord> {
        self.entries.iter().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }
}

impl Default for AttemptLog {
    fn default() -> Self {
        Self::new(Self::DEFAULT_CAPACITY, Self::DEFAULT_RECENT)
    }
}
