//! Configuration loading.
//!
//! Everything has a default, so an empty file (or no file at all) yields the
//! stock proxy chain.  See `config.example.toml` for the full layout.

use std::path::Path;
use std::time::Duration;

use serde::Deserialize;

use crate::attempt_log::AttemptLog;
use crate::cache::FeedCache;
use crate::error::ConfigError;
use crate::source::SourceKind;

/// Application configuration.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Item count used when the caller does not ask for one.
    pub default_max_items: usize,
    pub cache: CacheConfig,
    pub attempt_log: AttemptLogConfig,
    pub logging: LoggingConfig,
    /// Proxy sources, tried in the order listed.
    pub sources: Vec<SourceConfig>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    pub ttl_secs: u64,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct AttemptLogConfig {
    pub capacity: usize,
    /// How many entries the diagnostics accessor returns.
    pub recent: usize,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Default level; `RUST_LOG` still takes precedence.
    pub level: String,
}

/// One proxy endpoint.
#[derive(Debug, Clone, Deserialize)]
pub struct SourceConfig {
    pub name: String,
    pub kind: SourceKind,
    /// `{url}` is replaced by the encoded feed URL, `{count}` by the item count.
    pub url_template: String,
    pub timeout_ms: u64,
}

impl SourceConfig {
    fn new(name: &str, kind: SourceKind, url_template: &str, timeout_ms: u64) -> Self {
        Self {
            name: name.to_string(),
            kind,
            url_template: url_template.to_string(),
            timeout_ms,
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            default_max_items: 10,
            cache: CacheConfig::default(),
            attempt_log: AttemptLogConfig::default(),
            logging: LoggingConfig::default(),
            sources: default_sources(),
        }
    }
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            ttl_secs: FeedCache::DEFAULT_TTL.as_secs(),
        }
    }
}

impl Default for AttemptLogConfig {
    fn default() -> Self {
        Self {
            capacity: AttemptLog::DEFAULT_CAPACITY,
            recent: AttemptLog::DEFAULT_RECENT,
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}

/// The stock chain: one JSON proxy, then two raw-markup relays with
/// progressively more slack.
pub fn default_sources() -> Vec<SourceConfig> {
    vec![
        SourceConfig::new(
            "RSS2JSON",
            SourceKind::Json,
            "https://api.rss2json.com/v1/api.json?rss_url={url}&count={count}",
            3000,
        ),
        SourceConfig::new(
            "AllOrigins",
            SourceKind::Markup,
            "https://api.allorigins.win/raw?url={url}",
            3500,
        ),
        SourceConfig::new(
            "CORSProxy",
            SourceKind::Markup,
            "https://corsproxy.io/?{url}",
            4000,
        ),
    ]
}

impl Config {
    /// Read and validate a TOML config file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let config = Self::from_toml(&text)?;
        tracing::debug!(path = %path.display(), sources = config.sources.len(), "loaded config");
        Ok(config)
    }

    pub fn from_toml(text: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.default_max_items == 0 {
            return Err(ConfigError::Invalid(
                "default_max_items must be at least 1".into(),
            ));
        }
        if self.sources.is_empty() {
            return Err(ConfigError::Invalid("at least one source is required".into()));
        }
        if self.attempt_log.capacity == 0 {
            return Err(ConfigError::Invalid(
                "attempt_log.capacity must be at least 1".into(),
            ));
        }
        for source in &self.sources {
            if source.timeout_ms == 0 {
                return Err(ConfigError::Invalid(format!(
                    "source {} has a zero timeout",
                    source.name
                )));
            }
            if !source.url_template.contains("{url}") {
                return Err(ConfigError::Invalid(format!(
                    "source {} url_template lacks a {{url}} placeholder",
                    source.name
                )));
            }
        }
        Ok(())
    }

    pub fn cache_ttl(&self) -> Duration {
        Duration::from_secs(self.cache.ttl_secs)
    }
}
