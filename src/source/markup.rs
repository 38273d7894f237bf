//! Syndication markup parser.
//!
//! Turns raw RSS bytes (as relayed by the markup proxies) into
//! [`ArticleRecord`]s using the [`rss`] crate.  This is a pure function with
//! no I/O so the parsing rules can be tested without the network.

use chrono::{DateTime, Utc};

use super::{ArticleRecord, RawArticle};
use crate::error::ParseError;

/// Parse `document` and normalize at most `max_items` items, in document
/// order.
///
/// The bytes are handed to the XML reader undecoded, so the encoding named
/// in the XML declaration applies.  A document that is not well-formed
/// fails with [`ParseError::Malformed`], one with anything but whitespace,
/// comments or processing instructions after the closing root tag with
/// [`ParseError::TrailingContent`], and one without any `<item>` with
/// [`ParseError::EmptyFeed`].  `now` becomes the publication date of undated
/// items.
pub fn parse_markup(
    document: &[u8],
    max_items: usize,
    now: DateTime<Utc>,
) -> Result<Vec<ArticleRecord>, ParseError> {
    let channel = rss::Channel::read_from(document)?;

    // The reader stops at the first closing root tag and never looks past it.
    if root_end(document).is_some_and(|end| has_trailing_content(&document[end..])) {
        return Err(ParseError::TrailingContent);
    }

    if channel.items().is_empty() {
        return Err(ParseError::EmptyFeed);
    }

    let records = channel
        .items()
        .iter()
        .take(max_items)
        .map(|item| raw_article(item).normalize(now))
        .collect();

    Ok(records)
}

/// Offset just past the last `</rss>` or `</rdf:RDF>`.
fn root_end(document: &[u8]) -> Option<usize> {
    [b"</rss>".as_slice(), b"</rdf:RDF>".as_slice()]
        .into_iter()
        .filter_map(|tag| {
            document
                .windows(tag.len())
                .rposition(|window| window == tag)
                .map(|start| start + tag.len())
        })
        .max()
}

fn has_trailing_content(mut rest: &[u8]) -> bool {
    loop {
        rest = rest.trim_ascii_start();
        if rest.is_empty() {
            return false;
        }

        let terminator: &[u8] = if rest.starts_with(b"<!--") {
            b"-->"
        } else if rest.starts_with(b"<?") {
            b"?>"
        } else {
            return true;
        };

        match rest
            .windows(terminator.len())
            .position(|window| window == terminator)
        {
            Some(start) => rest = &rest[start + terminator.len()..],
            None => return true,
        }
    }
}

fn raw_article(item: &rss::Item) -> RawArticle {
    // Prefer <author>, fall back to the first <dc:creator>.
    let author = item
        .author()
        .filter(|a| !a.trim().is_empty())
        .map(String::from)
        .or_else(|| {
            item.dublin_core_ext()
                .and_then(|dc| dc.creators().first())
                .cloned()
        });

    RawArticle {
        title: item.title().map(String::from),
        description: item.description().map(String::from),
        content: item.content().map(String::from),
        link: item.link().map(String::from),
        pub_date: item.pub_date().map(String::from),
        author,
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
