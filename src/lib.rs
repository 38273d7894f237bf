//! feed-retriever: resolve RSS feeds to normalized articles.
//!
//! ## Architecture overview
//!
//! ```text
//!                ┌──────────────┐  hit   ┌───────────┐
//!  FeedRequest ─►│ FeedRetriever│◄──────►│ FeedCache │
//!                └──────┬───────┘        └───────────┘
//!                       │ miss: sources in order
//!         ┌─────────────┼──────────────┐
//!         ▼             ▼              ▼
//!     RSS2JSON      AllOrigins      CORSProxy      (source/)
//!    JsonItems       Markup          Markup
//!         └──────► normalize ◄─────────┘           (source/article, source/markup)
//!                       │ failures
//!                       ▼
//!                  AttemptLog
//! ```
//!
//! * **`source/`** — the [`FeedSource`] trait, the HTTP proxy implementation,
//!   the markup parser and the [`ArticleRecord`] type.
//! * **`retriever`** — cache lookup, sequential fallback, truncation.
//! * **`cache`** — TTL cache keyed by feed and item count, plus the clock.
//! * **`attempt_log`** — bounded diagnostics of failed attempts.
//! * **`publisher`** — display metadata for well-known feed publishers.
//! * **`config`** / **`logging`** — ambient setup used by the binary.

pub mod attempt_log;
pub mod cache;
pub mod config;
pub mod error;
pub mod logging;
pub mod publisher;
pub mod retriever;
pub mod source;

pub use attempt_log::{AttemptLog, AttemptRecord};
pub use cache::{Clock, FeedCache, ManualClock, SystemClock};
pub use config::Config;
pub use error::{ConfigError, ParseError, RetrieveError, SourceError};
pub use publisher::{Publishers, SourceDescriptor};
pub use retriever::FeedRetriever;
pub use source::{ArticleRecord, FeedRequest, FeedSource, HttpSource, SourceKind, SourcePayload};
