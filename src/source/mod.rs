//! Data source abstraction layer.
//!
//! This module defines the [`FeedSource`] trait, the [`SourcePayload`] a
//! source hands back, and the common [`ArticleRecord`] type.  Concrete
//! implementations live in sub-modules (currently only [`HttpSource`], which
//! covers every templated proxy endpoint).
//!
//! ## For contributors — adding a new source
//!
//! 1. Create a new file in this directory.
//! 2. Define a struct and implement [`FeedSource`] for it, returning either
//!    [`SourcePayload::JsonItems`] or [`SourcePayload::Markup`].
//! 3. Re-export it below and hand it to
//!    [`FeedRetriever::new`](crate::FeedRetriever::new).
//!
//! Caching, timeouts, fallback and normalization are all handled by the
//! retriever and stay source-agnostic.

pub mod article;
mod http;
pub mod markup;
mod rss2json;

pub use article::{ArticleRecord, RawArticle};
pub use http::HttpSource;
pub use markup::parse_markup;

use std::num::NonZeroUsize;
use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;

use crate::error::SourceError;

/// One retrieval: which feed, and how many items at most.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct FeedRequest {
    pub feed: String,
    pub max_items: NonZeroUsize,
}

impl FeedRequest {
    pub fn new(feed: impl Into<String>, max_items: NonZeroUsize) -> Self {
        Self {
            feed: feed.into(),
            max_items,
        }
    }
}

/// Which wire shape a source answers with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceKind {
    /// Pre-parsed items wrapped in a status envelope.
    Json,
    /// The feed's own syndication markup, relayed verbatim.
    Markup,
}

/// What a source returned, before normalization.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SourcePayload {
    JsonItems(Vec<RawArticle>),
    /// Undecoded document bytes; the XML declaration names the encoding.
    Markup(Vec<u8>),
}

/// Trait that every feed source must implement.
///
/// The retriever calls [`fetch()`](FeedSource::fetch) under its own
/// [`timeout()`](FeedSource::timeout); an attempt that overruns is dropped
/// and counts as a failure of this source only.
///
/// ## Implementing a new source
///
/// ```ignore
/// pub struct MySource { /* config fields */ }
///
/// #[async_trait]
/// impl FeedSource for MySource {
///     fn name(&self) -> &str { "my-source" }
///     fn timeout(&self) -> Duration { Duration::from_secs(3) }
///
///     async fn fetch(&self, request: &FeedRequest) -> Result<SourcePayload, SourceError> {
///         // Perform HTTP / IO, then hand back JSON items or markup.
///         todo!()
///     }
/// }
/// ```
#[async_trait]
pub trait FeedSource: Send + Sync {
    /// Label used in logs and in the attempt log.
    fn name(&self) -> &str;

    /// Upper bound for a single attempt against this source.
    fn timeout(&self) -> Duration;

    /// Fetch the feed through this source.
    async fn fetch(&self, request: &FeedRequest) -> Result<SourcePayload, SourceError>;
}
