//! Persistent duplicate suppression across runs.
//!
//! The state is an in-memory value threaded through a run: it is loaded once
//! at the start, [`DedupState::commit`] produces a new value from the old one,
//! and the new value is written back as a whole at the very end. A crash at
//! any point before the final write leaves the previous state file intact.
//!
//! # State File
//!
//! ```json
//! {
//!   "lastRunAt": "2025-03-10T00:00:00Z",
//!   "articles": [
//!     { "url": "https://www.afl.com.au/news/1/story", "published": "2025-03-09T10:00:00+08:00" }
//!   ]
//! }
//! ```
//!
//! Files written by the earlier Python generator (`last_run`, `pub_date`,
//! timestamps without an offset) load as well: offset-less times are read as
//! UTC and an unreadable `pub_date` becomes an unknown date.

use crate::errors::{Outcome, PipelineError};
use crate::models::Article;
use crate::scrapers::afl::parse_published;
use crate::utils::write_atomic;
use chrono::{DateTime, Duration, FixedOffset, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};
use std::fmt;
use std::io::{self, ErrorKind};
use std::path::PathBuf;
use tokio::fs;
use tracing::{info, instrument, warn};

/// Urls already published, with their last known publication time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "StateFile", into = "StateFile")]
pub struct DedupState {
    last_run_at: DateTime<Utc>,
    seen: BTreeMap<String, Option<DateTime<FixedOffset>>>,
}

#[derive(Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct StateFile {
    #[serde(alias = "last_run", deserialize_with = "lenient_run_time")]
    last_run_at: DateTime<Utc>,
    #[serde(default)]
    articles: Vec<SeenEntry>,
}

#[derive(Serialize, Deserialize)]
struct SeenEntry {
    url: String,
    #[serde(
        default,
        alias = "pub_date",
        deserialize_with = "lenient_published",
        skip_serializing_if = "Option::is_none"
    )]
    published: Option<DateTime<FixedOffset>>,
}

fn lenient_run_time<'de, D>(deserializer: D) -> Result<DateTime<Utc>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let raw = String::deserialize(deserializer)?;
    parse_published(&raw)
        .map(|dt| dt.with_timezone(&Utc))
        .ok_or_else(|| serde::de::Error::custom(format!("invalid run time {raw:?}")))
}

fn lenient_published<'de, D>(deserializer: D) -> Result<Option<DateTime<FixedOffset>>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    Ok(Option::<String>::deserialize(deserializer)?.and_then(|raw| parse_published(&raw)))
}

impl From<StateFile> for DedupState {
    fn from(file: StateFile) -> Self {
        Self {
            last_run_at: file.last_run_at,
            seen: file
                .articles
                .into_iter()
                .map(|entry| (entry.url, entry.published))
                .collect(),
        }
    }
}

impl From<DedupState> for StateFile {
    fn from(state: DedupState) -> Self {
        Self {
            last_run_at: state.last_run_at,
            articles: state
                .seen
                .into_iter()
                .map(|(url, published)| SeenEntry { url, published })
                .collect(),
        }
    }
}

impl DedupState {
    /// Empty state for a first run.
    pub fn new(now: DateTime<Utc>) -> Self {
        Self {
            last_run_at: now,
            seen: BTreeMap::new(),
        }
    }

    pub fn last_run_at(&self) -> DateTime<Utc> {
        self.last_run_at
    }

    pub fn len(&self) -> usize {
        self.seen.len()
    }

    pub fn is_empty(&self) -> bool {
        self.seen.is_empty()
    }

    pub fn contains(&self, url: &str) -> bool {
        self.seen.contains_key(url)
    }

    /// Articles whose url has not been seen, in input order.
    ///
    /// Identity is the url alone. A url repeated within `articles` is only
    /// returned once (first occurrence).
    pub fn diff_new(&self, articles: &[Article]) -> Vec<Article> {
        let mut batch: HashSet<&str> = HashSet::new();
        articles
            .iter()
            .filter(|a| !self.seen.contains_key(&a.url) && batch.insert(a.url.as_str()))
            .cloned()
            .collect()
    }

    /// New state with `new_articles` recorded and the run time advanced.
    ///
    /// `self` is left untouched, so a run that fails after this call still
    /// holds the previous state in full.
    pub fn commit(&self, new_articles: &[Article], run_time: DateTime<Utc>) -> DedupState {
        let mut next = self.clone();
        for article in new_articles {
            let slot = next.seen.entry(article.url.clone()).or_insert(None);
            if article.published_at.is_some() {
                *slot = article.published_at;
            }
        }
        next.last_run_at = run_time;
        next
    }

    /// Drop entries the retention policy no longer wants. Returns the count removed.
    pub fn prune(&mut self, policy: &dyn RetentionPolicy, now: DateTime<Utc>) -> usize {
        let before = self.seen.len();
        self.seen
            .retain(|_, published| policy.retains(*published, now));
        before - self.seen.len()
    }
}

/// Decides which seen entries survive between runs.
pub trait RetentionPolicy: fmt::Debug {
    fn retains(&self, published: Option<DateTime<FixedOffset>>, now: DateTime<Utc>) -> bool;
}

/// Keep every entry forever.
#[derive(Debug, Clone, Copy, Default)]
pub struct Unbounded;

impl RetentionPolicy for Unbounded {
    fn retains(&self, _published: Option<DateTime<FixedOffset>>, _now: DateTime<Utc>) -> bool {
        true
    }
}

/// Forget entries published more than `max_age` ago. Undated entries are kept.
#[derive(Debug, Clone, Copy)]
pub struct MaxAge {
    max_age: Duration,
}

impl MaxAge {
    /// A policy never shorter than `window`, so a forgotten url cannot
    /// qualify as recent again.
    pub fn at_least(max_age: Duration, window: Duration) -> Self {
        Self {
            max_age: max_age.max(window),
        }
    }
}

impl RetentionPolicy for MaxAge {
    fn retains(&self, published: Option<DateTime<FixedOffset>>, now: DateTime<Utc>) -> bool {
        match published {
            Some(published) => now.signed_duration_since(published) <= self.max_age,
            None => true,
        }
    }
}

/// File-backed storage for [`DedupState`].
#[derive(Debug, Clone)]
pub struct DedupStore {
    path: PathBuf,
}

impl DedupStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Load the persisted state.
    ///
    /// # Arguments
    ///
    /// * `now` - `lastRunAt` of the fresh state used when nothing can be loaded
    ///
    /// # Returns
    ///
    /// - `Outcome::Complete` with the stored state, or with a fresh state when
    ///   the file does not exist yet
    /// - `Outcome::Degraded` with a fresh state and a state error when the
    ///   file cannot be read or parsed
    #[instrument(level = "info", skip_all, fields(path = %self.path.display()))]
    pub async fn load(&self, now: DateTime<Utc>) -> Outcome<DedupState> {
        let failure = |reason: String| PipelineError::State {
            path: self.path.display().to_string(),
            reason,
        };

        let bytes = match fs::read(&self.path).await {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                info!("No dedup state yet; starting empty");
                return Outcome::Complete(DedupState::new(now));
            }
            Err(e) => {
                let err = failure(e.to_string());
                warn!(error = %err, "Could not read dedup state; starting empty");
                return Outcome::Degraded(DedupState::new(now), err);
            }
        };

        match serde_json::from_slice::<DedupState>(&bytes) {
            Ok(state) => {
                info!(
                    seen = state.len(),
                    last_run_at = %state.last_run_at,
                    "Loaded dedup state"
                );
                Outcome::Complete(state)
            }
            Err(e) => {
                let err = failure(e.to_string());
                warn!(error = %err, "Malformed dedup state; starting empty");
                Outcome::Degraded(DedupState::new(now), err)
            }
        }
    }

    /// Replace the persisted state with `state` in one atomic step.
    ///
    /// # Errors
    ///
    /// Returns a persistence error if the state cannot be serialized or the
    /// file cannot be replaced. The previous file is left intact in that case.
    #[instrument(level = "info", skip_all, fields(path = %self.path.display(), seen = state.len()))]
    pub async fn save(&self, state: &DedupState) -> Result<(), PipelineError> {
        let path = self.path.display().to_string();
        let json = serde_json::to_vec_pretty(state)
            .map_err(|e| PipelineError::persistence(&path, io::Error::other(e)))?;
        write_atomic(&self.path, &json)
            .await
            .map_err(|e| PipelineError::persistence(&path, e))?;
        info!("Saved dedup state");
        Ok(())
    }
}
