//! Display metadata for known publishers.
//!
//! A feed identifier is matched against a fixed, ordered list of substrings;
//! the first hit wins.  Results are memoized per identifier for as long as
//! the [`Publishers`] value lives.

use std::collections::HashMap;
use std::sync::Mutex;

use serde::Serialize;

/// How a feed's publisher should be presented.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SourceDescriptor {
    pub name: &'static str,
    pub color: &'static str,
    pub emoji: &'static str,
    pub logo: Option<&'static str>,
}

struct Publisher {
    patterns: &'static [&'static str],
    descriptor: SourceDescriptor,
}

const fn publisher(
    patterns: &'static [&'static str],
    name: &'static str,
    color: &'static str,
    emoji: &'static str,
    logo: Option<&'static str>,
) -> Publisher {
    Publisher {
        patterns,
        descriptor: SourceDescriptor {
            name,
            color,
            emoji,
            logo,
        },
    }
}

// Order matters: earlier entries shadow later ones.
const KNOWN: &[Publisher] = &[
    publisher(&["onthesnow.com"], "OnTheSnow", "#0099FF", "❄️", None),
    publisher(&["powder.com"], "Powder Magazine", "#FF4444", "🏔️", None),
    publisher(&["skiingmagazine.com"], "Skiing Magazine", "#0066CC", "⛷️", None),
    publisher(&["skimag.com"], "SKI Magazine", "#CC0000", "🎿", None),
    publisher(&["freeskier.com"], "Freeskier", "#00AA00", "🏂", None),
    publisher(&["backcountrymagazine.com"], "Backcountry Magazine", "#8B4513", "🎒", None),
    publisher(&["coloradosun.com"], "Colorado Sun", "#FFA500", "☀️", None),
    publisher(&["summitdaily.com"], "Summit Daily", "#4A90E2", "⛰️", None),
    publisher(&["denverpost.com"], "Denver Post", "#003366", "📰", None),
    publisher(&["weather.com"], "Weather.com", "#1E88E5", "🌤️", None),
    publisher(
        &["espn.com"],
        "ESPN",
        "#C8102E",
        "📺",
        Some("https://a.espncdn.com/redesign/assets/img/logos/espn-logo-black.svg"),
    ),
    publisher(
        &["bbci.co.uk", "bbc.com"],
        "BBC Sport",
        "#000000",
        "🇬🇧",
        Some("https://static.files.bbci.co.uk/core/website/assets/static/icons/blocks/dark-mode/bbc-blocks-dark.svg"),
    ),
    publisher(&["yahoo.com"], "Yahoo Sports", "#720E9E", "🟣", None),
    publisher(&["cbssports.com"], "CBS Sports", "#0B71AF", "📺", None),
    publisher(&["si.com"], "Sports Illustrated", "#E4002B", "📰", None),
    publisher(&["foxsports.com"], "Fox Sports", "#000000", "🦊", None),
    publisher(&["covers.com"], "Covers", "#1a73e8", "🎲", None),
    publisher(&["actionnetwork.com"], "Action Network", "#FF6B35", "💰", None),
    publisher(&["vegasinsider.com"], "Vegas Insider", "#FFD700", "🎰", None),
    publisher(&["collegebaseballdaily.com"], "College Baseball Daily", "#003DA5", "⚾", None),
];

const FALLBACK: SourceDescriptor = SourceDescriptor {
    name: "Snow Sports News",
    color: "#0099FF",
    emoji: "🏂",
    logo: None,
};

/// Memoizing resolver from feed identifier to [`SourceDescriptor`].
#[derive(Debug, Default)]
pub struct Publishers {
    memo: Mutex<HashMap<String, SourceDescriptor>>,
}

impl Publishers {
    pub fn new() -> Self {
        Self::default()
    }

    /// Descriptor for `feed`, computed once per distinct identifier.
    pub fn resolve(&self, feed: &str) -> SourceDescriptor {
        let mut memo = self.memo.lock().unwrap_or_else(|e| e.into_inner());
        memo.entry(feed.to_string())
            .or_insert_with(|| classify(feed))
            .clone()
    }

    /// Number of identifiers resolved so far.
    pub fn memoized(&self) -> usize {
        self.memo.lock().unwrap_or_else(|e| e.into_inner()).len()
    }
}

fn classify(feed: &str) -> SourceDescriptor {
    KNOWN
        .iter()
        .find(|p| p.patterns.iter().any(|pat| feed.contains(pat)))
        .map(|p| p.descriptor.clone())
        .unwrap_or(FALLBACK)
}
