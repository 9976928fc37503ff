//! # AFL RSS Feed
//!
//! Scrapes the AFL.com.au news listing and publishes the stories that are new
//! since the previous run as an RSS 2.0 feed.
//!
//! ## Usage
//!
//! ```sh
//! afl_rss_feed --config config.yml --feed-output feed.xml --state-file previously_scraped.json
//! ```
//!
//! ## Architecture
//!
//! Each run is a straight pipeline:
//! 1. **Scraping**: walk the paginated listing, page by page, up to a page limit
//! 2. **Filtering**: drop excluded urls/titles and anything outside the recency window
//! 3. **Dedup**: keep only urls never published before
//! 4. **Output**: write the feed, then the updated dedup state
//!
//! The process exits non-zero when a run fails; in that case the previous
//! feed and state files are left exactly as they were.

use chrono::{Duration, Utc};
use clap::Parser;
use std::process::ExitCode;
use std::time::Duration as StdDuration;
use tracing::{debug, error, info};
use tracing_subscriber::{EnvFilter, fmt as tfmt};

use afl_rss_feed::cli::Cli;
use afl_rss_feed::dedup::{MaxAge, RetentionPolicy, Unbounded};
use afl_rss_feed::fetch::{HttpFetcher, RetryFetch};
use afl_rss_feed::pipeline::{Pipeline, Settings};

const RETRY_BASE_DELAY: StdDuration = StdDuration::from_millis(500);

#[tokio::main]
async fn main() -> ExitCode {
    // --- Tracing init ---
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tfmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_file(false)
        .with_line_number(false)
        .with_timer(tracing_subscriber::fmt::time::UtcTime::rfc_3339())
        .init();

    let start_time = std::time::Instant::now();
    info!("afl_rss_feed starting up");

    let args = Cli::parse();
    debug!(?args, "Parsed CLI arguments");

    let http = match HttpFetcher::new(StdDuration::from_secs(args.timeout_secs)) {
        Ok(http) => http,
        Err(e) => {
            error!(error = %e, "Failed to build HTTP client");
            return ExitCode::FAILURE;
        }
    };
    let fetcher = RetryFetch::new(http, args.retries as usize, RETRY_BASE_DELAY);

    let window = Duration::hours(i64::from(args.window_hours));
    let retention: Box<dyn RetentionPolicy> = match args.retain_days {
        Some(days) => Box::new(MaxAge::at_least(Duration::days(i64::from(days)), window)),
        None => Box::new(Unbounded),
    };

    let settings = Settings {
        config_path: args.config,
        feed_path: args.feed_output,
        state_path: args.state_file,
        start_url: args.start_url,
        max_pages: args.max_pages as usize,
        window,
        retention,
    };
    let pipeline = Pipeline::new(fetcher, settings);

    let result = pipeline.run(Utc::now()).await;
    let elapsed = start_time.elapsed();

    match result {
        Ok(summary) => {
            info!(
                ?elapsed,
                new = summary.new_articles,
                degraded = summary.is_degraded(),
                "Execution complete"
            );
            ExitCode::SUCCESS
        }
        Err(failure) => {
            error!(?elapsed, stage = %failure.stage, error = %failure.error, "Execution failed");
            ExitCode::FAILURE
        }
    }
}
