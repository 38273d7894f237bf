//! Error types for every layer of the retrieval pipeline.
//!
//! Only [`RetrieveError`] ever reaches callers of
//! [`FeedRetriever::retrieve`](crate::FeedRetriever::retrieve).
//! [`SourceError`] and [`ParseError`] are absorbed by the fallback chain and
//! end up as text in the attempt log.

use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;

/// The markup could not be turned into any articles.
#[derive(Debug, Error)]
pub enum ParseError {
    /// The document is not a well-formed syndication document.
    #[error("XML parsing failed: {0}")]
    Malformed(#[from] rss::Error),

    /// The document parsed but contains no `<item>` elements.
    #[error("No items in feed")]
    EmptyFeed,

    /// Something other than whitespace, comments or processing
    /// instructions follows the closing root tag.
    #[error("XML parsing failed: content after the root element")]
    TrailingContent,
}

/// One source did not produce usable data.
#[derive(Debug, Error)]
pub enum SourceError {
    #[error("request timed out after {} ms", .0.as_millis())]
    Timeout(Duration),

    #[error("request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("HTTP {0}")]
    Http(reqwest::StatusCode),

    /// The endpoint answered but reported a failure in its payload.
    #[error("{source_name} returned status: {status}")]
    Rejected { source_name: String, status: String },

    #[error("failed to decode response: {0}")]
    Decode(#[from] serde_json::Error),

    #[error(transparent)]
    Parse(#[from] ParseError),
}

/// The only failure visible to callers of the retriever.
#[derive(Debug, Error)]
pub enum RetrieveError {
    #[error(
        "Unable to load RSS feed after trying all proxies. This could be due to:\n  \
         - Network connectivity issues\n  \
         - Feed URL is incorrect or inaccessible\n  \
         - Access restrictions on the feed\n  \
         - Rate limiting from the feed provider\n\n\
         Last error: {last_error}"
    )]
    FeedUnavailable { feed: String, last_error: String },
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("invalid config: {0}")]
    Invalid(String),

    #[error("failed to create HTTP client: {0}")]
    HttpClient(#[from] reqwest::Error),
}
