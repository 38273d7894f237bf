//! feed-retriever — fetch an RSS feed through a chain of proxies and print
//! its latest articles.
//!
//! * Loads the config (or uses the stock proxy chain).
//! * Resolves the feed's publisher for the header line.
//! * Retrieves the articles and prints them as text or JSON.
//!
//! On failure the troubleshooting message and the recent attempt log are
//! printed and the process exits non-zero.

use std::num::NonZeroUsize;
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;

use feed_retriever::{logging, ArticleRecord, Config, FeedRequest, FeedRetriever, Publishers};

/// Characters of article text shown per item in text mode.
const SUMMARY_CHARS: usize = 400;

#[derive(Debug, Parser)]
#[command(name = "feed-retriever", version, about)]
struct Cli {
    /// Feed URL to retrieve.
    #[arg(default_value = "https://www.powder.com/feed")]
    feed: String,

    /// Maximum number of articles (defaults to the config value).
    #[arg(short = 'n', long)]
    max_items: Option<NonZeroUsize>,

    /// Path to a TOML config file.
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Log level override (trace, debug, info, warn, error).
    #[arg(long)]
    log_level: Option<String>,

    /// Print articles as a JSON array.
    #[arg(long)]
    json: bool,

    /// Print the recent attempt log even on success.
    #[arg(long)]
    show_attempts: bool,
}

// ---------------------------------------------------------------------------
// Entry point
// ---------------------------------------------------------------------------

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // -- configuration -------------------------------------------------------
    let config = match &cli.config {
        Some(path) => Config::load(path)
            .with_context(|| format!("loading config from {}", path.display()))?,
        None => Config::default(),
    };

    logging::init(cli.log_level.as_deref().unwrap_or(&config.logging.level));

    let max_items = match cli.max_items {
        Some(n) => n,
        None => NonZeroUsize::new(config.default_max_items)
            .context("default_max_items must be at least 1")?,
    };

    // -- retrieval -----------------------------------------------------------
    let retriever = FeedRetriever::from_config(&config)?;
    let publishers = Publishers::new();
    let publisher = publishers.resolve(&cli.feed);
    let request = FeedRequest::new(cli.feed.clone(), max_items);

    let result = retriever.retrieve(&request).await;

    // -- output --------------------------------------------------------------
    let records = match result {
        Ok(records) => records,
        Err(err) => {
            tracing::error!(feed = %cli.feed, "feed unavailable");
            eprintln!("{err}");
            print_attempts(&retriever);
            std::process::exit(1);
        }
    };

    if cli.json {
        println!("{}", serde_json::to_string_pretty(&records)?);
    } else {
        println!(
            "{} {} ({} articles)\n",
            publisher.emoji,
            publisher.name,
            records.len()
        );
        for record in &records {
            print_record(record);
        }
    }

    if cli.show_attempts {
        print_attempts(&retriever);
    }

    Ok(())
}

fn print_record(record: &ArticleRecord) {
    let date = record
        .published_at()
        .map(|d| d.format("%B %-d, %Y").to_string())
        .unwrap_or_else(|| record.pub_date.clone());

    println!("{}", record.title);
    if record.author.is_empty() {
        println!("  {date}");
    } else {
        println!("  {date} · {}", record.author);
    }
    println!("  {}", record.summary(SUMMARY_CHARS));
    println!("  {}\n", record.link);
}

fn print_attempts(retriever: &FeedRetriever) {
    let recent = retriever.recent_attempts();
    if recent.is_empty() {
        return;
    }

    eprintln!("\nRecent failed attempts:");
    for entry in recent {
        eprintln!(
            "  {} [{}] {}: {}",
            entry.at.to_rfc3339(),
            entry.source,
            entry.feed,
            entry.error
        );
    }
}
