//! Errors that end a pipeline run.

use thiserror::Error;

use chainwatch_core::{FeedError, UnitsError};

/// The only error values that leave the pipeline.
///
/// Per-identifier failures (misses, derivation failures, queue-full drops)
/// are counted and logged inside the pipeline and never surface here.
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("invalid pipeline config: {0}")]
    Config(String),

    #[error("invalid threshold: {0}")]
    Threshold(#[from] UnitsError),

    /// The initial subscription was refused.
    #[error("subscription failed: {0}")]
    Subscribe(FeedError),

    /// The feed died mid-run. Queued work was drained before this was returned.
    #[error("feed failed: {0}")]
    FeedFatal(FeedError),

    #[error("{0} worker(s) panicked")]
    WorkersPanicked(usize),
}

impl PipelineError {
    /// `true` for errors raised by the feed rather than local setup.
    pub fn is_feed_error(&self) -> bool {
        matches!(self, Self::Subscribe(_) | Self::FeedFatal(_))
    }
}
