//! Templated HTTP proxy source.
//!
//! Every proxy endpoint is described by a URL template in which `{url}` is
//! replaced by the percent-encoded feed identifier and `{count}` by the
//! requested item count.  Whether the answer is JSON or markup is declared
//! up front through [`SourceKind`].

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;

use super::{rss2json, FeedRequest, FeedSource, SourceKind, SourcePayload};
use crate::config::SourceConfig;
use crate::error::SourceError;

/// A proxy endpoint reached over HTTP.
#[derive(Debug, Clone)]
pub struct HttpSource {
    name: String,
    kind: SourceKind,
    url_template: String,
    timeout: Duration,
    client: Client,
}

impl HttpSource {
    pub fn new(
        name: impl Into<String>,
        kind: SourceKind,
        url_template: impl Into<String>,
        timeout: Duration,
        client: Client,
    ) -> Self {
        Self {
            name: name.into(),
            kind,
            url_template: url_template.into(),
            timeout,
            client,
        }
    }

    pub fn from_config(config: &SourceConfig, client: Client) -> Self {
        Self::new(
            &config.name,
            config.kind,
            &config.url_template,
            Duration::from_millis(config.timeout_ms),
            client,
        )
    }

    /// The concrete URL requested for `request`.
    pub fn url_for(&self, request: &FeedRequest) -> String {
        self.url_template
            .replace("{url}", &urlencoding::encode(&request.feed))
            .replace("{count}", &request.max_items.to_string())
    }
}

#[async_trait]
impl FeedSource for HttpSource {
    fn name(&self) -> &str {
        &self.name
    }

    fn timeout(&self) -> Duration {
        self.timeout
    }

    async fn fetch(&self, request: &FeedRequest) -> Result<SourcePayload, SourceError> {
        let url = self.url_for(request);
        tracing::debug!(source = %self.name, %url, "requesting feed through proxy");

        let response = self.client.get(&url).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(SourceError::Http(status));
        }

        let body = response.bytes().await?;

        match self.kind {
            SourceKind::Json => Ok(SourcePayload::JsonItems(rss2json::decode(
                &self.name, &body,
            )?)),
            SourceKind::Markup => Ok(SourcePayload::Markup(body.to_vec())),
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
