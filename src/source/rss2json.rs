//! Response shape of JSON feed proxies (rss2json style).
//!
//! These endpoints do the XML work themselves and answer with
//! `{"status": "ok", "items": [...]}`.  Anything other than an `ok` status
//! with at least one item is a failure for that source.

use serde::Deserialize;

use super::RawArticle;
use crate::error::SourceError;

#[derive(Debug, Deserialize)]
struct JsonFeedResponse {
    #[serde(default)]
    status: Option<String>,
    #[serde(default)]
    items: Option<Vec<RawArticle>>,
}

/// Decode a JSON proxy body into raw items.
pub fn decode(source_name: &str, body: &[u8]) -> Result<Vec<RawArticle>, SourceError> {
    let response: JsonFeedResponse = serde_json::from_slice(body)?;
    let status = response.status.unwrap_or_else(|| "missing".to_string());

    match response.items {
        Some(items) if status == "ok" && !items.is_empty() => Ok(items),
        _ => Err(SourceError::Rejected {
            source_name: source_name.to_string(),
            status,
        }),
    }
}
