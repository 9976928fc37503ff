//! Command-line interface definitions for the AFL feed generator.
//!
//! Every option has a default, so a bare invocation scrapes
//! `https://www.afl.com.au/news` and writes `feed.xml` and
//! `previously_scraped.json` in the working directory.

use crate::scrapers::afl::NEWS_URL;
use clap::Parser;
use std::path::PathBuf;
use url::Url;

/// Command-line arguments for the AFL RSS feed generator.
///
/// # Examples
///
/// ```sh
/// # Defaults
/// afl_rss_feed
///
/// # Custom locations and a wider window
/// afl_rss_feed --config filters.yml --feed-output public/feed.xml --window-hours 48
///
/// # Forget seen urls after 30 days
/// afl_rss_feed --retain-days 30
/// ```
#[derive(Parser, Debug)]
#[command(author, version, about)]
pub struct Cli {
    /// YAML file with the `filters` section
    #[arg(short, long, default_value = "config.yml")]
    pub config: PathBuf,

    /// JSON file holding previously published article urls
    #[arg(short, long, default_value = "previously_scraped.json")]
    pub state_file: PathBuf,

    /// Where to write the RSS document
    #[arg(short, long, default_value = "feed.xml")]
    pub feed_output: PathBuf,

    /// First listing page to scrape
    #[arg(long, default_value = NEWS_URL)]
    pub start_url: Url,

    /// Maximum number of listing pages to fetch
    #[arg(long, default_value_t = 5, value_parser = clap::value_parser!(u32).range(1..))]
    pub max_pages: u32,

    /// Only articles published within this many hours are included
    #[arg(long, default_value_t = 24)]
    pub window_hours: u32,

    /// Per-request timeout in seconds
    #[arg(long, default_value_t = 30, value_parser = clap::value_parser!(u64).range(1..))]
    pub timeout_secs: u64,

    /// Extra attempts for a failed page fetch
    #[arg(long, default_value_t = 1)]
    pub retries: u32,

    /// Forget seen urls published more than this many days ago (default: never)
    #[arg(long)]
    pub retain_days: Option<u32>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_defaults() {
        let cli = Cli::parse_from(["afl_rss_feed"]);

        assert_eq!(cli.config, PathBuf::from("config.yml"));
        assert_eq!(cli.state_file, PathBuf::from("previously_scraped.json"));
        assert_eq!(cli.feed_output, PathBuf::from("feed.xml"));
        assert_eq!(cli.start_url.as_str(), "https://www.afl.com.au/news");
        assert_eq!(cli.max_pages, 5);
        assert_eq!(cli.window_hours, 24);
        assert_eq!(cli.timeout_secs, 30);
        assert_eq!(cli.retries, 1);
        assert!(cli.retain_days.is_none());
    }

    #[test]
    fn test_cli_short_flags() {
        let cli = Cli::parse_from([
            "afl_rss_feed",
            "-c",
            "/etc/afl/config.yml",
            "-s",
            "/var/lib/afl/state.json",
            "-f",
            "/srv/www/feed.xml",
        ]);

        assert_eq!(cli.config, PathBuf::from("/etc/afl/config.yml"));
        assert_eq!(cli.state_file, PathBuf::from("/var/lib/afl/state.json"));
        assert_eq!(cli.feed_output, PathBuf::from("/srv/www/feed.xml"));
    }

    #[test]
    fn test_cli_rejects_zero_pages() {
        assert!(Cli::try_parse_from(["afl_rss_feed", "--max-pages", "0"]).is_err());
        assert!(Cli::try_parse_from(["afl_rss_feed", "--start-url", "not a url"]).is_err());
    }

    #[test]
    fn test_cli_retention() {
        let cli = Cli::parse_from(["afl_rss_feed", "--retain-days", "7", "--max-pages", "2"]);
        assert_eq!(cli.retain_days, Some(7));
        assert_eq!(cli.max_pages, 2);
    }
}
