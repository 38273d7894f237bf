//! Time-bounded cache of retrieval results.
//!
//! Entries are keyed by feed identifier *and* item count, so asking for five
//! items never returns a cached list of ten.  The cache never reads the
//! clock itself: callers pass `now`, which keeps expiry fully deterministic
//! in tests.

use std::collections::HashMap;
use std::sync::Mutex;
use std::time::Duration;

use chrono::{DateTime, Utc};

use crate::source::{ArticleRecord, FeedRequest};

/// Source of the current time.
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

/// Wall-clock time.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// A clock that only moves when told to.
#[derive(Debug)]
pub struct ManualClock {
    now: Mutex<DateTime<Utc>>,
}

impl ManualClock {
    pub fn new(start: DateTime<Utc>) -> Self {
        Self {
            now: Mutex::new(start),
        }
    }

    pub fn advance(&self, by: Duration) {
        let by = chrono::Duration::from_std(by).unwrap_or(chrono::Duration::MAX);
        let mut now = self.now.lock().unwrap_or_else(|e| e.into_inner());
        *now += by;
    }
}

impl Clock for ManualClock {
    fn now(&self) -> DateTime<Utc> {
        *self.now.lock().unwrap_or_else(|e| e.into_inner())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey {
    feed: String,
    max_items: usize,
}

impl From<&FeedRequest> for CacheKey {
    fn from(request: &FeedRequest) -> Self {
        Self {
            feed: request.feed.clone(),
            max_items: request.max_items.get(),
        }
    }
}

#[derive(Debug, Clone)]
struct CacheEntry {
    records: Vec<ArticleRecord>,
    captured_at: DateTime<Utc>,
}

/// Cached retrieval results with a fixed time-to-live.
#[derive(Debug, Clone)]
pub struct FeedCache {
    entries: HashMap<CacheKey, CacheEntry>,
    ttl: chrono::Duration,
}

impl FeedCache {
    /// Five minutes.
    pub const DEFAULT_TTL: Duration = Duration::from_secs(5 * 60);

    pub fn new(ttl: Duration) -> Self {
        Self {
            entries: HashMap::new(),
            ttl: chrono::Duration::from_std(ttl).unwrap_or(chrono::Duration::MAX),
        }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl.to_std().unwrap_or(Duration::MAX)
    }

    /// Records stored under `key`, if the entry is still live at `now`.
    pub fn get(&self, key: &CacheKey, now: DateTime<Utc>) -> Option<Vec<ArticleRecord>> {
        self.entries
            .get(key)
            .filter(|entry| self.is_live(entry, now))
            .map(|entry| entry.records.clone())
    }

    /// Store `records` under `key`, replacing any earlier capture.
    pub fn insert(&mut self, key: CacheKey, records: Vec<ArticleRecord>, now: DateTime<Utc>) {
        self.entries.insert(
            key,
            CacheEntry {
                records,
                captured_at: now,
            },
        );
    }

    /// Drop entries that are no longer live.  Returns how many were removed.
    pub fn purge_expired(&mut self, now: DateTime<Utc>) -> usize {
        let before = self.entries.len();
        let ttl = self.ttl;
        self.entries
            .retain(|_, entry| now.signed_duration_since(entry.captured_at) < ttl);
        before - self.entries.len()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    /// Physically stored entries, live or not.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn is_live(&self, entry: &CacheEntry, now: DateTime<Utc>) -> bool {
        now.signed_duration_since(entry.captured_at) < self.ttl
    }
}

impl Default for FeedCache {
    fn default() -> Self {
        Self::new(Self::DEFAULT_TTL)
    }
}
