//! Error taxonomy and typed step outcomes for the feed pipeline.
//!
//! Every step of a run either succeeds, succeeds in a degraded way (some
//! input was lost or replaced by defaults, but there is still something to act
//! on), or fails fatally. The first two are expressed by [`Outcome`], the last
//! by `Err(PipelineError)`.
//!
//! | Kind | Raised by | Policy |
//! |------|-----------|--------|
//! | `transport` | fetcher | fatal on page 1, absorbed on later pages |
//! | `extraction` | extractor | fatal on page 1, absorbed on later pages |
//! | `config` | config loader | recovered with defaults |
//! | `state` | dedup state loader | recovered with an empty state |
//! | `persistence` | feed/state writers | always fatal |

use std::io;
use thiserror::Error;

/// Failures that can occur while producing the feed.
#[derive(Debug, Error)]
pub enum PipelineError {
    /// Network failure, timeout or non-success HTTP status.
    #[error("transport failure fetching {url}: {reason}")]
    Transport { url: String, reason: String },

    /// A fetched page could not be turned into article candidates.
    #[error("extraction failure for {url}: {reason}")]
    Extraction { url: String, reason: String },

    /// The filter configuration could not be read or parsed.
    #[error("config failure in {path}: {reason}")]
    Config { path: String, reason: String },

    /// The persisted dedup state could not be read or parsed.
    #[error("state failure in {path}: {reason}")]
    State { path: String, reason: String },

    /// Writing (or preparing to write) an output artifact failed.
    #[error("persistence failure for {path}: {source}")]
    Persistence {
        path: String,
        #[source]
        source: io::Error,
    },
}

impl PipelineError {
    /// Stable short label used in run summaries and log fields.
    pub fn kind(&self) -> &'static str {
        match self {
            PipelineError::Transport { .. } => "transport",
            PipelineError::Extraction { .. } => "extraction",
            PipelineError::Config { .. } => "config",
            PipelineError::State { .. } => "state",
            PipelineError::Persistence { .. } => "persistence",
        }
    }

    pub fn persistence(path: impl Into<String>, source: io::Error) -> Self {
        PipelineError::Persistence {
            path: path.into(),
            source,
        }
    }
}

/// Result of a step that can degrade instead of failing.
#[derive(Debug)]
pub enum Outcome<T> {
    /// The step did everything it was asked to.
    Complete(T),
    /// The step produced a usable value but lost something along the way.
    Degraded(T, PipelineError),
}

impl<T> Outcome<T> {
    /// Split into the value and the degradation, if any.
    pub fn into_parts(self) -> (T, Option<PipelineError>) {
        match self {
            Outcome::Complete(value) => (value, None),
            Outcome::Degraded(value, err) => (value, Some(err)),
        }
    }

    pub fn is_degraded(&self) -> bool {
        matches!(self, Outcome::Degraded(..))
    }
}
