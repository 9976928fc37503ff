//! Filter configuration loaded from a YAML document.
//!
//! ```yaml
//! filters:
//!   urlPatterns:
//!     - /aflw/
//!   titleKeywords:
//!     - AFLW
//!   caseSensitive: true
//! ```
//!
//! A missing file, an empty document or a missing `filters` section all mean
//! "no exclusions beyond recency". A file that cannot be read or parsed is a
//! config failure, recovered by falling back to the same defaults.

use crate::errors::{Outcome, PipelineError};
use serde::{Deserialize, Serialize};
use std::io::ErrorKind;
use std::path::Path;
use tokio::fs;
use tracing::{info, instrument, warn};

/// Top-level configuration document.
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
pub struct Config {
    #[serde(default, deserialize_with = "null_as_default")]
    pub filters: FilterConfig,
}

/// Exclusion rules applied to scraped articles.
///
/// Empty lists exclude nothing along that dimension.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default, rename_all = "camelCase")]
pub struct FilterConfig {
    /// Substrings that exclude an article when found in its url.
    #[serde(alias = "url_patterns", deserialize_with = "null_as_default")]
    pub url_patterns: Vec<String>,
    /// Substrings that exclude an article when found in its title.
    #[serde(alias = "title_keywords", deserialize_with = "null_as_default")]
    pub title_keywords: Vec<String>,
    /// When false, patterns and keywords match regardless of case.
    #[serde(alias = "case_sensitive")]
    pub case_sensitive: bool,
}

impl Default for FilterConfig {
    fn default() -> Self {
        Self {
            url_patterns: Vec::new(),
            title_keywords: Vec::new(),
            case_sensitive: true,
        }
    }
}

impl FilterConfig {
    /// Drop blank rules, which would otherwise match every article.
    fn normalized(mut self) -> Self {
        let before = self.url_patterns.len() + self.title_keywords.len();
        self.url_patterns.retain(|p| !p.trim().is_empty());
        self.title_keywords.retain(|k| !k.trim().is_empty());
        let removed = before - (self.url_patterns.len() + self.title_keywords.len());
        if removed > 0 {
            warn!(removed, "Ignoring blank filter rules");
        }
        self
    }
}

fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: serde::Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

/// Parse a configuration document.
pub fn parse_config(text: &str) -> Result<Config, serde_yaml::Error> {
    if text.trim().is_empty() {
        return Ok(Config::default());
    }
    let config: Option<Config> = serde_yaml::from_str(text)?;
    Ok(config.unwrap_or_default())
}

/// Load the configuration at `path`, falling back to defaults on any problem.
#[instrument(level = "info", skip_all, fields(path = %path.display()))]
pub async fn load_config(path: &Path) -> Outcome<Config> {
    let failure = |reason: String| PipelineError::Config {
        path: path.display().to_string(),
        reason,
    };

    let text = match fs::read_to_string(path).await {
        Ok(text) => text,
        Err(e) if e.kind() == ErrorKind::NotFound => {
            info!("No config file; using default filters");
            return Outcome::Complete(Config::default());
        }
        Err(e) => {
            let err = failure(e.to_string());
            warn!(error = %err, "Could not read config; using default filters");
            return Outcome::Degraded(Config::default(), err);
        }
    };

    match parse_config(&text) {
        Ok(mut config) => {
            config.filters = config.filters.normalized();
            info!(
                url_patterns = config.filters.url_patterns.len(),
                title_keywords = config.filters.title_keywords.len(),
                case_sensitive = config.filters.case_sensitive,
                "Loaded configuration"
            );
            Outcome::Complete(config)
        }
        Err(e) => {
            let err = failure(e.to_string());
            warn!(error = %err, "Malformed config; using default filters");
            Outcome::Degraded(Config::default(), err)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_parse_camel_case_keys() {
        let config = parse_config(
            "filters:\n  urlPatterns: ['/aflw/']\n  titleKeywords: ['AFLW']\n",
        )
        .unwrap();
        assert_eq!(config.filters.url_patterns, vec!["/aflw/"]);
        assert_eq!(config.filters.title_keywords, vec!["AFLW"]);
        assert!(config.filters.case_sensitive);
    }

    #[test]
    fn test_parse_snake_case_keys() {
        let config = parse_config(
            "filters:\n  url_patterns: ['/aflw/']\n  title_keywords: []\n  case_sensitive: false\n",
        )
        .unwrap();
        assert_eq!(config.filters.url_patterns, vec!["/aflw/"]);
        assert!(config.filters.title_keywords.is_empty());
        assert!(!config.filters.case_sensitive);
    }

    #[test]
    fn test_missing_or_null_sections_default() {
        assert_eq!(parse_config("").unwrap(), Config::default());
        assert_eq!(parse_config("other: 1\n").unwrap(), Config::default());
        assert_eq!(parse_config("filters:\n").unwrap(), Config::default());
        assert_eq!(
            parse_config("filters:\n  urlPatterns:\n").unwrap(),
            Config::default()
        );
    }

    #[test]
    fn test_wrong_shape_is_error() {
        assert!(parse_config("filters: [1, 2]\n").is_err());
        assert!(parse_config("filters:\n  urlPatterns: 5\n").is_err());
    }

    #[test]
    fn test_utf8_keywords() {
        let config = parse_config("filters:\n  titleKeywords: ['Östersund', '足球']\n").unwrap();
        assert_eq!(config.filters.title_keywords, vec!["Östersund", "足球"]);
    }

    #[tokio::test]
    async fn test_load_missing_file_is_complete_default() {
        let dir = tempdir().unwrap();
        let outcome = load_config(&dir.path().join("config.yml")).await;
        assert!(!outcome.is_degraded());
        let (config, _) = outcome.into_parts();
        assert_eq!(config, Config::default());
    }

    #[tokio::test]
    async fn test_load_malformed_file_degrades_to_default() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("config.yml");
        std::fs::write(&path, "filters: {urlPatterns: [unclosed\n").unwrap();

        let (config, err) = load_config(&path).await.into_parts();
        assert_eq!(config, Config::default());
        assert_eq!(err.map(|e| e.kind()), Some("config"));
    }

    #[tokio::test]
    async fn test_load_drops_blank_rules() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("config.yml");
        std::fs::write(&path, "filters:\n  urlPatterns: ['', '/aflw/', '  ']\n").unwrap();

        let (config, err) = load_config(&path).await.into_parts();
        assert!(err.is_none());
        assert_eq!(config.filters.url_patterns, vec!["/aflw/"]);
    }
}
