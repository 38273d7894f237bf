//! Feed retrieval: cache first, then each source in turn.
//!
//! ```text
//!  retrieve(req) ──► cache hit? ──yes──► records
//!                        │ no
//!                        ▼
//!        ┌──── source 1 ──► source 2 ──► … ──► source N ────┐
//!        │  (timeout each; failures go to the attempt log)  │
//!        └── first success: normalize, truncate, cache ─────┘
//!                        │ all failed
//!                        ▼
//!                 FeedUnavailable
//! ```
//!
//! Sources are never raced: a later source is only contacted once every
//! earlier one has failed.

use std::sync::{Arc, Mutex, MutexGuard};

use reqwest::Client;
use tracing::{debug, info, warn};

use crate::attempt_log::{AttemptLog, AttemptRecord};
use crate::cache::{CacheKey, Clock, FeedCache, SystemClock};
use crate::config::Config;
use crate::error::{ConfigError, ParseError, RetrieveError, SourceError};
use crate::source::{
    parse_markup, ArticleRecord, FeedRequest, FeedSource, HttpSource, SourcePayload,
};

const USER_AGENT: &str = concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION"));

/// Resolves feed requests to normalized article records.
pub struct FeedRetriever {
    sources: Vec<Box<dyn FeedSource>>,
    cache: Mutex<FeedCache>,
    attempts: Mutex<AttemptLog>,
    clock: Arc<dyn Clock>,
}

impl FeedRetriever {
    /// A retriever over `sources` (tried in order) with default cache and
    /// log settings and the system clock.
    pub fn new(sources: Vec<Box<dyn FeedSource>>) -> Self {
        Self {
            sources,
            cache: Mutex::new(FeedCache::default()),
            attempts: Mutex::new(AttemptLog::default()),
            clock: Arc::new(SystemClock),
        }
    }

    /// Build the HTTP source chain and limits described by `config`.
    pub fn from_config(config: &Config) -> Result<Self, ConfigError> {
        config.validate()?;

        let client = Client::builder().user_agent(USER_AGENT).build()?;
        let sources = config
            .sources
            .iter()
            .map(|s| Box::new(HttpSource::from_config(s, client.clone())) as Box<dyn FeedSource>)
            .collect();

        Ok(Self::new(sources)
            .with_cache(FeedCache::new(config.cache_ttl()))
            .with_attempt_log(AttemptLog::new(
                config.attempt_log.capacity,
                config.attempt_log.recent,
            )))
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn with_cache(mut self, cache: FeedCache) -> Self {
        self.cache = Mutex::new(cache);
        self
    }

    pub fn with_attempt_log(mut self, log: AttemptLog) -> Self {
        self.attempts = Mutex::new(log);
        self
    }

    /// Names of the configured sources, in attempt order.
    pub fn source_names(&self) -> Vec<&str> {
        self.sources.iter().map(|s| s.name()).collect()
    }

    /// Fetch up to `request.max_items` articles for `request.feed`.
    ///
    /// Fails only once every source has failed.
    pub async fn retrieve(&self, request: &FeedRequest) -> Result<Vec<ArticleRecord>, RetrieveError> {
        let key = CacheKey::from(request);
        let cached = self.lock_cache().get(&key, self.clock.now());
        if let Some(records) = cached {
            debug!(feed = %request.feed, "using cached data");
            return Ok(records);
        }

        let mut last_error: Option<SourceError> = None;

        for source in &self.sources {
            info!(source = source.name(), feed = %request.feed, "trying source");

            match self.attempt(source.as_ref(), request).await {
                Ok(records) => {
                    info!(
                        source = source.name(),
                        feed = %request.feed,
                        items = records.len(),
                        "source succeeded"
                    );
                    self.lock_cache()
                        .insert(key, records.clone(), self.clock.now());
                    return Ok(records);
                }
                Err(err) => {
                    warn!(source = source.name(), feed = %request.feed, error = %err, "source failed");
                    self.lock_attempts()
                        .record(&request.feed, source.name(), &err, self.clock.now());
                    last_error = Some(err);
                }
            }
        }

        Err(RetrieveError::FeedUnavailable {
            feed: request.feed.clone(),
            last_error: last_error
                .map(|e| e.to_string())
                .unwrap_or_else(|| "Unknown error".to_string()),
        })
    }

    /// One bounded attempt against one source, normalized and truncated.
    async fn attempt(
        &self,
        source: &dyn FeedSource,
        request: &FeedRequest,
    ) -> Result<Vec<ArticleRecord>, SourceError> {
        let limit = source.timeout();
        let payload = tokio::time::timeout(limit, source.fetch(request))
            .await
            .map_err(|_| SourceError::Timeout(limit))??;

        let max_items = request.max_items.get();
        let now = self.clock.now();

        let records: Vec<ArticleRecord> = match payload {
            SourcePayload::JsonItems(items) => items
                .into_iter()
                .take(max_items)
                .map(|raw| raw.normalize(now))
                .collect(),
            SourcePayload::Markup(document) => parse_markup(&document, max_items, now)?,
        };

        if records.is_empty() {
            return Err(ParseError::EmptyFeed.into());
        }
        Ok(records)
    }

    /// The most recent failed attempts, oldest first.
    pub fn recent_attempts(&self) -> Vec<AttemptRecord> {
        self.lock_attempts().recent()
    }

    /// Snapshot of the whole attempt log.
    pub fn attempt_log(&self) -> AttemptLog {
        self.lock_attempts().clone()
    }

    /// Drop every cached result.
    pub fn clear_cache(&self) {
        self.lock_cache().clear();
    }

    /// Drop cached results whose time-to-live has passed.
    pub fn purge_expired(&self) -> usize {
        let now = self.clock.now();
        self.lock_cache().purge_expired(now)
    }

    pub fn cached_entries(&self) -> usize {
        self.lock_cache().len()
    }

    // Never held across an await. Poisoning is ignored: every update is a
    // single insert or push.
    fn lock_cache(&self) -> MutexGuard<'_, FeedCache> {
        self.cache.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn lock_attempts(&self) -> MutexGuard<'_, AttemptLog> {
        self.attempts.lock().unwrap_or_else(|e| e.into_inner())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::ManualClock;
    use crate::source::RawArticle;
    use async_trait::async_trait;
    use chrono::{TimeZone, Utc};
    use std::num::NonZeroUsize;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    /// What a mock source does on every call.
    #[derive(Clone)]
    enum Behavior {
        Json(Vec<RawArticle>),
        Markup(String),
        Fail(&'static str),
        Hang,
    }

    struct MockSource {
        name: &'static str,
        behavior: Behavior,
        timeout: Duration,
        calls: Arc<AtomicUsize>,
    }

    impl MockSource {
        fn new(name: &'static str, behavior: Behavior) -> (Box<dyn FeedSource>, Arc<AtomicUsize>) {
            let calls = Arc::new(AtomicUsize::new(0));
            let source = Self {
                name,
                behavior,
                timeout: Duration::from_secs(1),
                calls: calls.clone(),
            };
            (Box::new(source), calls)
        }

        fn hanging(name: &'static str, timeout: Duration) -> (Box<dyn FeedSource>, Arc<AtomicUsize>) {
            let calls = Arc::new(AtomicUsize::new(0));
            let source = Self {
                name,
                behavior: Behavior::Hang,
                timeout,
                calls: calls.clone(),
            };
            (Box::new(source), calls)
        }
    }

    #[async_trait]
    impl FeedSource for MockSource {
        fn name(&self) -> &str {
            self.name
        }

        fn timeout(&self) -> Duration {
            self.timeout
        }

        async fn fetch(&self, _request: &FeedRequest) -> Result<SourcePayload, SourceError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            match &self.behavior {
                Behavior::Json(items) => Ok(SourcePayload::JsonItems(items.clone())),
                Behavior::Markup(text) => Ok(SourcePayload::Markup(text.clone().into_bytes())),
                Behavior::Fail(status) => Err(SourceError::Rejected {
                    source_name: self.name.to_string(),
                    status: status.to_string(),
                }),
                Behavior::Hang => {
                    tokio::time::sleep(Duration::from_secs(30)).await;
                    Err(SourceError::Rejected {
                        source_name: self.name.to_string(),
                        status: "woke up".to_string(),
                    })
                }
            }
        }
    }

    fn t0() -> chrono::DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 12, 1, 7, 0, 0).unwrap()
    }

    fn request(max: usize) -> FeedRequest {
        FeedRequest::new("https://www.powder.com/feed", NonZeroUsize::new(max).unwrap())
    }

    fn json_items(titles: &[&str]) -> Vec<RawArticle> {
        titles
            .iter()
            .map(|t| RawArticle {
                title: Some(t.to_string()),
                link: Some(format!("https://example.com/{t}")),
                ..Default::default()
            })
            .collect()
    }

    fn markup(titles: &[&str]) -> String {
        let items: String = titles
            .iter()
            .map(|t| format!("<item><title>{t}</title></item>"))
            .collect();
        format!(r#"<rss version="2.0"><channel><title>T</title><link>https://example.com</link><description>D</description>{items}</channel></rss>"#)
    }

    fn titles(records: &[ArticleRecord]) -> Vec<&str> {
        records.iter().map(|r| r.title.as_str()).collect()
    }

    fn retriever(sources: Vec<Box<dyn FeedSource>>, clock: Arc<ManualClock>) -> FeedRetriever {
        FeedRetriever::new(sources).with_clock(clock)
    }

    #[tokio::test]
    async fn first_source_success_skips_the_rest() {
        let clock = Arc::new(ManualClock::new(t0()));
        let (a, a_calls) = MockSource::new("A", Behavior::Json(json_items(&["one", "two"])));
        let (b, b_calls) = MockSource::new("B", Behavior::Markup(markup(&["x"])));
        let r = retriever(vec![a, b], clock);

        let records = r.retrieve(&request(10)).await.unwrap();

        assert_eq!(titles(&records), ["one", "two"]);
        assert_eq!(a_calls.load(Ordering::SeqCst), 1);
        assert_eq!(b_calls.load(Ordering::SeqCst), 0);
        assert!(r.recent_attempts().is_empty());
    }

    #[tokio::test]
    async fn falls_back_in_order_and_logs_each_failure() {
        let clock = Arc::new(ManualClock::new(t0()));
        let (a, _) = MockSource::new("A", Behavior::Fail("error"));
        let (b, _) = MockSource::new("B", Behavior::Markup("<html>nope</html>".into()));
        let (c, c_calls) = MockSource::new("C", Behavior::Markup(markup(&["from C"])));
        let r = retriever(vec![a, b, c], clock);

        let records = r.retrieve(&request(10)).await.unwrap();

        assert_eq!(titles(&records), ["from C"]);
        assert_eq!(c_calls.load(Ordering::SeqCst), 1);

        let log = r.recent_attempts();
        let sources: Vec<_> = log.iter().map(|e| e.source.as_str()).collect();
        assert_eq!(sources, ["A", "B"]);
        assert_eq!(log[0].error, "A returned status: error");
        assert_eq!(log[0].feed, "https://www.powder.com/feed");
        assert_eq!(log[0].at, t0());
    }

    #[tokio::test]
    async fn cached_result_is_served_without_network() {
        let clock = Arc::new(ManualClock::new(t0()));
        let (a, a_calls) = MockSource::new("A", Behavior::Json(json_items(&["one"])));
        let r = retriever(vec![a], clock.clone());

        let first = r.retrieve(&request(5)).await.unwrap();
        clock.advance(Duration::from_secs(299));
        let second = r.retrieve(&request(5)).await.unwrap();

        assert_eq!(first, second);
        assert_eq!(a_calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn expired_cache_goes_back_to_sources() {
        let clock = Arc::new(ManualClock::new(t0()));
        let (a, a_calls) = MockSource::new("A", Behavior::Json(json_items(&["one"])));
        let r = retriever(vec![a], clock.clone());

        r.retrieve(&request(5)).await.unwrap();
        clock.advance(Duration::from_secs(300));
        r.retrieve(&request(5)).await.unwrap();

        assert_eq!(a_calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn different_max_items_is_a_separate_cache_entry() {
        let clock = Arc::new(ManualClock::new(t0()));
        let (a, a_calls) = MockSource::new("A", Behavior::Json(json_items(&["1", "2", "3"])));
        let r = retriever(vec![a], clock);

        assert_eq!(r.retrieve(&request(3)).await.unwrap().len(), 3);
        assert_eq!(r.retrieve(&request(2)).await.unwrap().len(), 2);
        assert_eq!(a_calls.load(Ordering::SeqCst), 2);
        assert_eq!(r.cached_entries(), 2);
    }

    #[tokio::test]
    async fn json_items_are_truncated_in_source_order() {
        let clock = Arc::new(ManualClock::new(t0()));
        let (a, _) = MockSource::new("A", Behavior::Json(json_items(&["1", "2", "3", "4", "5"])));
        let r = retriever(vec![a], clock);

        let records = r.retrieve(&request(3)).await.unwrap();
        assert_eq!(titles(&records), ["1", "2", "3"]);
    }

    #[tokio::test]
    async fn markup_items_are_truncated_in_source_order() {
        let clock = Arc::new(ManualClock::new(t0()));
        let (a, _) = MockSource::new("A", Behavior::Markup(markup(&["a", "b", "c", "d"])));
        let r = retriever(vec![a], clock);

        let records = r.retrieve(&request(2)).await.unwrap();
        assert_eq!(titles(&records), ["a", "b"]);
    }

    #[tokio::test]
    async fn empty_feed_counts_as_source_failure() {
        let clock = Arc::new(ManualClock::new(t0()));
        let (a, _) = MockSource::new("A", Behavior::Markup(markup(&[])));
        let (b, _) = MockSource::new("B", Behavior::Json(Vec::new()));
        let (c, _) = MockSource::new("C", Behavior::Json(json_items(&["ok"])));
        let r = retriever(vec![a, b, c], clock);

        let records = r.retrieve(&request(5)).await.unwrap();

        assert_eq!(titles(&records), ["ok"]);
        let log = r.recent_attempts();
        assert_eq!(log.len(), 2);
        assert_eq!(log[0].error, "No items in feed");
        assert_eq!(log[1].error, "No items in feed");
    }

    #[tokio::test]
    async fn exhaustion_reports_the_last_error() {
        let clock = Arc::new(ManualClock::new(t0()));
        let (a, _) = MockSource::new("A", Behavior::Fail("error"));
        let (b, _) = MockSource::new("B", Behavior::Fail("rate_limited"));
        let r = retriever(vec![a, b], clock);

        let err = r.retrieve(&request(5)).await.unwrap_err();
        let RetrieveError::FeedUnavailable { feed, last_error } = &err;

        assert_eq!(feed, "https://www.powder.com/feed");
        assert_eq!(last_error, "B returned status: rate_limited");
        assert!(err.to_string().contains("Last error: B returned status: rate_limited"));
        assert_eq!(r.cached_entries(), 0);
    }

    #[tokio::test]
    async fn failures_are_not_cached() {
        let clock = Arc::new(ManualClock::new(t0()));
        let (a, a_calls) = MockSource::new("A", Behavior::Fail("error"));
        let r = retriever(vec![a], clock);

        assert!(r.retrieve(&request(5)).await.is_err());
        assert!(r.retrieve(&request(5)).await.is_err());
        assert_eq!(a_calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn no_sources_means_unknown_error() {
        let r = FeedRetriever::new(Vec::new());
        let err = r.retrieve(&request(1)).await.unwrap_err();
        assert!(err.to_string().contains("Last error: Unknown error"));
    }

    #[tokio::test]
    async fn slow_source_times_out_and_falls_through() {
        let clock = Arc::new(ManualClock::new(t0()));
        let (slow, _) = MockSource::hanging("Slow", Duration::from_millis(20));
        let (fast, _) = MockSource::new("Fast", Behavior::Json(json_items(&["quick"])));
        let r = retriever(vec![slow, fast], clock);

        let records = r.retrieve(&request(5)).await.unwrap();

        assert_eq!(titles(&records), ["quick"]);
        let log = r.recent_attempts();
        assert_eq!(log.len(), 1);
        assert_eq!(log[0].source, "Slow");
        assert_eq!(log[0].error, "request timed out after 20 ms");
    }

    #[tokio::test]
    async fn attempt_log_keeps_latest_fifty_across_calls() {
        let clock = Arc::new(ManualClock::new(t0()));
        let (a, _) = MockSource::new("A", Behavior::Fail("error"));
        let (b, _) = MockSource::new("B", Behavior::Fail("error"));
        let (c, _) = MockSource::new("C", Behavior::Fail("error"));
        let r = retriever(vec![a, b, c], clock.clone());

        // 20 calls x 3 sources = 60 failures.
        for _ in 0..20 {
            clock.advance(Duration::from_secs(1));
            let _ = r.retrieve(&request(5)).await;
        }

        let log = r.attempt_log();
        assert_eq!(log.len(), 50);
        let entries = log.entries();
        // The ten oldest (first three calls plus one) were evicted.
        assert_eq!(entries[0].source, "B");
        assert_eq!(entries[0].at, t0() + chrono::Duration::seconds(4));
        assert_eq!(r.recent_attempts().len(), 10);
    }

    #[tokio::test]
    async fn undated_items_use_the_retrieval_time() {
        let clock = Arc::new(ManualClock::new(t0()));
        let (a, _) = MockSource::new("A", Behavior::Json(json_items(&["x"])));
        let r = retriever(vec![a], clock);

        let records = r.retrieve(&request(1)).await.unwrap();
        assert_eq!(records[0].pub_date, t0().to_rfc3339());
    }

    #[tokio::test]
    async fn clear_cache_forces_refetch() {
        let clock = Arc::new(ManualClock::new(t0()));
        let (a, a_calls) = MockSource::new("A", Behavior::Json(json_items(&["x"])));
        let r = retriever(vec![a], clock);

        r.retrieve(&request(1)).await.unwrap();
        r.clear_cache();
        r.retrieve(&request(1)).await.unwrap();

        assert_eq!(a_calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn purge_expired_drops_dead_entries() {
        let clock = Arc::new(ManualClock::new(t0()));
        let (a, _) = MockSource::new("A", Behavior::Json(json_items(&["x"])));
        let r = retriever(vec![a], clock.clone());

        r.retrieve(&request(1)).await.unwrap();
        assert_eq!(r.purge_expired(), 0);

        clock.advance(Duration::from_secs(301));
        assert_eq!(r.purge_expired(), 1);
        assert_eq!(r.cached_entries(), 0);
    }

    #[test]
    fn from_config_builds_the_stock_chain() {
        let r = FeedRetriever::from_config(&Config::default()).unwrap();
        assert_eq!(r.source_names(), ["RSS2JSON", "AllOrigins", "CORSProxy"]);
    }

    #[tokio::test]
    async fn markup_with_trailing_garbage_falls_through() {
        let clock = Arc::new(ManualClock::new(t0()));
        let (a, _) = MockSource::new("A", Behavior::Markup(markup(&["a"]) + "<junk"));
        let (b, _) = MockSource::new("B", Behavior::Json(json_items(&["from B"])));
        let r = retriever(vec![a, b], clock);

        let records = r.retrieve(&request(5)).await.unwrap();

        assert_eq!(titles(&records), ["from B"]);
        assert_eq!(
            r.recent_attempts()[0].error,
            "XML parsing failed: content after the root element"
        );
    }

    #[test]
    fn retriever_and_its_futures_cross_threads() {
        fn assert_send_sync<T: Send + Sync>() {}
        fn assert_send<T: Send>(_: &T) {}

        assert_send_sync::<FeedRetriever>();

        let r = FeedRetriever::new(Vec::new());
        let req = request(1);
        assert_send(&r.retrieve(&req));
    }
}
