//! Run orchestration: scrape, filter, dedup, emit.
//!
//! A run moves through a fixed sequence of stages:
//!
//! ```text
//! INIT -> LOADED_STATE -> SCRAPED -> FILTERED -> DEDUPED -> FEED_BUILT -> STATE_SAVED -> DONE
//!   \________________________________ any failure ________________________________/-> FAILED
//! ```
//!
//! Config and state problems are recovered locally (defaults / empty state)
//! and so are failures on listing pages after the first. Everything else
//! aborts the run. Artifacts are only written once all in-memory work has
//! succeeded: the feed first, then the state. A crash between the two writes
//! re-emits items on the next run rather than losing them.

use crate::config::load_config;
use crate::dedup::{DedupStore, RetentionPolicy};
use crate::errors::PipelineError;
use crate::fetch::Fetch;
use crate::filter::{RejectionCounts, select};
use crate::models::{FeedItem, FeedMetadata};
use crate::outputs::rss::render_feed;
use crate::scrapers::paginator::scrape;
use crate::utils::{ensure_writable_dir, parent_dir, write_atomic};
use chrono::{DateTime, Duration, Utc};
use std::fmt;
use std::io;
use std::path::PathBuf;
use thiserror::Error;
use tracing::{debug, error, info, instrument, warn};
use url::Url;

/// Everything a run needs besides the fetcher.
#[derive(Debug)]
pub struct Settings {
    pub config_path: PathBuf,
    pub feed_path: PathBuf,
    pub state_path: PathBuf,
    pub start_url: Url,
    pub max_pages: usize,
    /// Recency window measured back from the run time.
    pub window: Duration,
    pub retention: Box<dyn RetentionPolicy>,
}

/// Orchestrator stages.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Init,
    LoadedState,
    Scraped,
    Filtered,
    Deduped,
    FeedBuilt,
    StateSaved,
    Done,
    Failed,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Stage::Init => "INIT",
            Stage::LoadedState => "LOADED_STATE",
            Stage::Scraped => "SCRAPED",
            Stage::Filtered => "FILTERED",
            Stage::Deduped => "DEDUPED",
            Stage::FeedBuilt => "FEED_BUILT",
            Stage::StateSaved => "STATE_SAVED",
            Stage::Done => "DONE",
            Stage::Failed => "FAILED",
        };
        f.write_str(name)
    }
}

/// A run that ended in `FAILED`.
#[derive(Debug, Error)]
#[error("run failed after {stage}: {error}")]
pub struct RunFailure {
    /// Last stage completed before the failure.
    pub stage: Stage,
    #[source]
    pub error: PipelineError,
}

/// A recovered failure recorded during a run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Degradation {
    pub kind: &'static str,
    pub message: String,
}

/// Counters reported when a run reaches `DONE`.
#[derive(Debug, Default)]
pub struct RunSummary {
    pub pages_fetched: usize,
    pub articles_fetched: usize,
    pub candidates_dropped: usize,
    pub filtered_out: RejectionCounts,
    /// Retained articles suppressed because their url was already published.
    pub duplicates: usize,
    pub new_articles: usize,
    pub feed_items: usize,
    pub feed_written: bool,
    pub pruned: usize,
    pub degradations: Vec<Degradation>,
}

impl RunSummary {
    pub fn is_degraded(&self) -> bool {
        !self.degradations.is_empty()
    }

    fn note(&mut self, degradation: Option<PipelineError>) {
        if let Some(err) = degradation {
            self.degradations.push(Degradation {
                kind: err.kind(),
                message: err.to_string(),
            });
        }
    }
}

/// The scrape-filter-dedup-emit pipeline.
pub struct Pipeline<F> {
    fetcher: F,
    settings: Settings,
    store: DedupStore,
}

impl<F: Fetch> Pipeline<F> {
    pub fn new(fetcher: F, settings: Settings) -> Self {
        let store = DedupStore::new(settings.state_path.clone());
        Self {
            fetcher,
            settings,
            store,
        }
    }

    /// Execute one run with `now` as the reference and run time.
    ///
    /// # Arguments
    ///
    /// * `now` - Reference time for the recency window, `lastBuildDate` of the
    ///   feed and `lastRunAt` of the saved state
    ///
    /// # Returns
    ///
    /// The [`RunSummary`] of a run that reached `DONE`. Recovered problems
    /// (config, state, later listing pages) are listed in its `degradations`.
    ///
    /// # Errors
    ///
    /// Returns a [`RunFailure`] naming the last completed stage if:
    /// - An output directory is not writable
    /// - The first listing page cannot be fetched or decoded
    /// - The feed or the state file cannot be written
    ///
    /// A failure before `FEED_BUILT` leaves both artifacts untouched; a
    /// failure after it leaves the previous state, so the same items are
    /// offered again next run.
    #[instrument(level = "info", skip_all, fields(start_url = %self.settings.start_url, %now))]
    pub async fn run(&self, now: DateTime<Utc>) -> Result<RunSummary, RunFailure> {
        let mut stage = Stage::Init;
        match self.execute(now, &mut stage).await {
            Ok(summary) => {
                advance(&mut stage, Stage::Done);
                report(&summary);
                Ok(summary)
            }
            Err(error) => {
                let failed_after = stage;
                advance(&mut stage, Stage::Failed);
                error!(
                    stage = %failed_after,
                    kind = error.kind(),
                    error = %error,
                    "Run failed; previous feed and state left untouched"
                );
                Err(RunFailure {
                    stage: failed_after,
                    error,
                })
            }
        }
    }

    async fn execute(
        &self,
        now: DateTime<Utc>,
        stage: &mut Stage,
    ) -> Result<RunSummary, PipelineError> {
        let settings = &self.settings;
        let mut summary = RunSummary::default();

        let (config, degraded) = load_config(&settings.config_path).await.into_parts();
        summary.note(degraded);
        for path in [&settings.feed_path, &settings.state_path] {
            let dir = parent_dir(path);
            ensure_writable_dir(&dir)
                .await
                .map_err(|e| PipelineError::persistence(dir.display().to_string(), e))?;
        }
        let (state, degraded) = self.store.load(now).await.into_parts();
        summary.note(degraded);
        advance(stage, Stage::LoadedState);

        let (scraped, degraded) = scrape(&self.fetcher, &settings.start_url, settings.max_pages)
            .await?
            .into_parts();
        summary.note(degraded);
        summary.pages_fetched = scraped.pages_fetched;
        summary.articles_fetched = scraped.articles.len();
        summary.candidates_dropped = scraped.dropped;
        advance(stage, Stage::Scraped);

        let selection = select(scraped.articles, &config.filters, now, settings.window);
        summary.filtered_out = selection.rejected;
        advance(stage, Stage::Filtered);

        let new_articles = state.diff_new(&selection.retained);
        summary.duplicates = selection.retained.len() - new_articles.len();
        summary.new_articles = new_articles.len();
        advance(stage, Stage::Deduped);

        if new_articles.is_empty() {
            info!("No new articles; feed and state left as they were");
            return Ok(summary);
        }

        let feed_path = settings.feed_path.display().to_string();
        let items: Vec<FeedItem> = new_articles.iter().map(FeedItem::from).collect();
        let document = render_feed(&FeedMetadata::afl(now), &items)
            .map_err(|e| PipelineError::persistence(&feed_path, io::Error::other(e)))?;
        write_atomic(&settings.feed_path, &document)
            .await
            .map_err(|e| PipelineError::persistence(&feed_path, e))?;
        summary.feed_items = items.len();
        summary.feed_written = true;
        info!(path = %feed_path, items = items.len(), "Wrote feed");
        advance(stage, Stage::FeedBuilt);

        let mut next = state.commit(&new_articles, now);
        summary.pruned = next.prune(settings.retention.as_ref(), now);
        self.store.save(&next).await?;
        advance(stage, Stage::StateSaved);

        Ok(summary)
    }
}

fn advance(stage: &mut Stage, next: Stage) {
    debug!(from = %stage, to = %next, "Stage transition");
    *stage = next;
}

fn report(summary: &RunSummary) {
    for degradation in &summary.degradations {
        warn!(kind = degradation.kind, message = %degradation.message, "Run degraded");
    }
    let filtered = &summary.filtered_out;
    info!(
        pages = summary.pages_fetched,
        fetched = summary.articles_fetched,
        dropped_candidates = summary.candidates_dropped,
        filtered_url_pattern = filtered.url_pattern,
        filtered_title_keyword = filtered.title_keyword,
        filtered_undated = filtered.undated,
        filtered_stale = filtered.stale,
        filtered_future_dated = filtered.future_dated,
        filtered_total = filtered.total(),
        duplicates = summary.duplicates,
        new = summary.new_articles,
        feed_items = summary.feed_items,
        feed_written = summary.feed_written,
        pruned = summary.pruned,
        degraded = summary.is_degraded(),
        "Run complete"
    );
}
