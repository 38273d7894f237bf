//! The normalized record every source converts its items into.
//!
//! `ArticleRecord` represents one syndicated item regardless of whether it
//! came from a JSON proxy or from parsed markup.  Sources produce loose
//! [`RawArticle`] values; [`RawArticle::normalize`] is the single place that
//! fills defaults, so both wire shapes end up with identical semantics.
//!
//! ## For contributors
//!
//! If you are adding a new source you do **not** need to touch this file.
//! Fill in whatever fields your payload offers on a `RawArticle` and let the
//! retriever normalize it.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Placeholder title for items that carry none.
pub const UNTITLED: &str = "Untitled";

/// Placeholder link for items that carry none.
pub const NO_LINK: &str = "#";

/// Shown by [`ArticleRecord::summary`] when an item has no readable text.
pub const EMPTY_SUMMARY: &str = "Click to read more...";

/// A single feed entry, normalized from any source.
///
/// Every field is always populated: missing values are replaced by the
/// documented defaults during normalization, never left empty where a
/// placeholder exists.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ArticleRecord {
    /// Headline, or [`UNTITLED`].
    pub title: String,

    /// Short description, possibly empty.
    pub description: String,

    /// Full content when the feed provides it, otherwise the description.
    pub content: String,

    /// URL of the full article, or [`NO_LINK`].
    pub link: String,

    /// Publication date exactly as the feed wrote it.
    ///
    /// When absent this is the retrieval time in RFC 3339.
    pub pub_date: String,

    /// Author, possibly empty.
    pub author: String,
}

impl ArticleRecord {
    /// Best-effort parse of [`pub_date`](Self::pub_date).
    ///
    /// Feeds use RFC 2822; JSON proxies and our own default use RFC 3339 or a
    /// bare `YYYY-MM-DD HH:MM:SS`.  Anything else yields `None`.
    pub fn published_at(&self) -> Option<DateTime<Utc>> {
        let raw = self.pub_date.as_str();
        DateTime::parse_from_rfc2822(raw)
            .or_else(|_| DateTime::parse_from_rfc3339(raw))
            .map(|dt| dt.with_timezone(&Utc))
            .ok()
            .or_else(|| {
                chrono::NaiveDateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S")
                    .ok()
                    .map(|naive| naive.and_utc())
            })
    }

    /// Plain-text teaser built from the content (or description).
    ///
    /// Tags are stripped, common entities decoded and whitespace collapsed.
    /// Text longer than `max_chars` characters is cut and suffixed with
    /// `...`.
    pub fn summary(&self, max_chars: usize) -> String {
        let source = if self.content.is_empty() {
            &self.description
        } else {
            &self.content
        };

        let text = collapse_whitespace(&strip_tags(source));
        if text.is_empty() {
            return EMPTY_SUMMARY.to_string();
        }

        if text.chars().count() > max_chars {
            let cut: String = text.chars().take(max_chars).collect();
            format!("{}...", cut.trim_end())
        } else {
            text
        }
    }
}

/// Item fields as delivered by a source, before defaults are applied.
///
/// Also the wire shape of items returned by JSON proxies, hence the
/// `Deserialize` impl.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct RawArticle {
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub content: Option<String>,
    #[serde(default)]
    pub link: Option<String>,
    #[serde(default, rename = "pubDate")]
    pub pub_date: Option<String>,
    #[serde(default)]
    pub author: Option<String>,
}

impl RawArticle {
    /// Apply defaults and trimming, producing a fully populated record.
    ///
    /// `now` supplies the publication date for undated items.
    pub fn normalize(self, now: DateTime<Utc>) -> ArticleRecord {
        let description = present(self.description).unwrap_or_default();
        let content = present(self.content).unwrap_or_else(|| description.clone());

        ArticleRecord {
            title: present(self.title).unwrap_or_else(|| UNTITLED.to_string()),
            content,
            description,
            link: present(self.link).unwrap_or_else(|| NO_LINK.to_string()),
            pub_date: present(self.pub_date).unwrap_or_else(|| now.to_rfc3339()),
            author: present(self.author).unwrap_or_default(),
        }
    }
}

/// Trimmed value, or `None` if it was missing or blank.
fn present(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn strip_tags(html: &str) -> String {
    let mut out = String::with_capacity(html.len());
    let mut in_tag = false;

    for ch in html.chars() {
        match ch {
            '<' => in_tag = true,
            '>' if in_tag => {
                in_tag = false;
                out.push(' ');
            }
            _ if !in_tag => out.push(ch),
            _ => {}
        }
    }

    decode_entities(&out)
}

/// Decode named and numeric character references in one pass.
///
/// Unknown or malformed references are left as written.
fn decode_entities(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut rest = text;

    while let Some(amp) = rest.find('&') {
        out.push_str(&rest[..amp]);
        let after = &rest[amp + 1..];

        let decoded = after
            .find(';')
            .filter(|&end| end <= 10)
            .and_then(|end| decode_entity(&after[..end]).map(|ch| (ch, end)));

        match decoded {
            Some((ch, end)) => {
                out.push(ch);
                rest = &after[end + 1..];
            }
            None => {
                out.push('&');
                rest = after;
            }
        }
    }

    out.push_str(rest);
    out
}

fn decode_entity(name: &str) -> Option<char> {
    let ch = match name {
        "amp" => '&',
        "lt" => '<',
        "gt" => '>',
        "quot" => '"',
        "apos" => '\'',
        "nbsp" => ' ',
        "hellip" => '\u{2026}',
        "lsquo" => '\u{2018}',
        "rsquo" => '\u{2019}',
        "ldquo" => '\u{201C}',
        "rdquo" => '\u{201D}',
        "ndash" => '\u{2013}',
        "mdash" => '\u{2014}',
        _ => return parse_numeric_entity(name).and_then(char::from_u32),
    };
    Some(ch)
}

/// `#123` or `#x7B`.
fn parse_numeric_entity(entity: &str) -> Option<u32> {
    if let Some(hex) = entity
        .strip_prefix("#x")
        .or_else(|| entity.strip_prefix("#X"))
    {
        u32::from_str_radix(hex, 16).ok()
    } else {
        entity.strip_prefix('#')?.parse().ok()
    }
}

fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
