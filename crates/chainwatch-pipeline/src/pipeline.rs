//! `Pipeline` — wires the feed, queue, workers and reporter together.

use std::future::Future;
use std::sync::Arc;

use tokio::task::JoinSet;
use tracing::{error, info, warn};

use chainwatch_core::{EnrichmentClient, EventSource, SenderRecovery};

use crate::config::PipelineConfig;
use crate::dispatcher::{dispatch, DispatchEnd};
use crate::error::PipelineError;
use crate::metrics::{MetricsSnapshot, PipelineMetrics};
use crate::queue;
use crate::report::Reporter;
use crate::worker::Worker;

/// A configured, not yet running pipeline.
///
/// # Usage
/// ```no_run
/// # use std::sync::Arc;
/// # use chainwatch_pipeline::{Pipeline, PipelineConfig, PipelineError, Reporter};
/// # use chainwatch_core::{EnrichmentClient, EventSource, SenderRecovery};
/// # async fn example(
/// #     source: Arc<dyn EventSource>,
/// #     enrichment: Arc<dyn EnrichmentClient>,
/// #     recovery: Arc<dyn SenderRecovery>,
/// #     reporter: Arc<dyn Reporter>,
/// # ) -> Result<(), PipelineError> {
/// let pipeline = Pipeline::new(PipelineConfig::default(), source, enrichment, recovery, reporter)?;
/// let summary = pipeline.run(async { let _ = tokio::signal::ctrl_c().await; }).await?;
/// println!("reported {}", summary.reported);
/// # Ok(()) }
/// ```
pub struct Pipeline {
    config: Arc<PipelineConfig>,
    source: Arc<dyn EventSource>,
    worker: Worker,
    metrics: Arc<PipelineMetrics>,
}

impl Pipeline {
    /// Validate `config` and assemble the pipeline.
    pub fn new(
        config: PipelineConfig,
        source: Arc<dyn EventSource>,
        enrichment: Arc<dyn EnrichmentClient>,
        recovery: Arc<dyn SenderRecovery>,
        reporter: Arc<dyn Reporter>,
    ) -> Result<Self, PipelineError> {
        let threshold = config.validate()?;
        let metrics = Arc::new(PipelineMetrics::new());
        let worker = Worker::new(enrichment, recovery, reporter, threshold, metrics.clone());
        Ok(Self {
            config: Arc::new(config),
            source,
            worker,
            metrics,
        })
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Shared counters; stays valid while and after the pipeline runs.
    pub fn metrics(&self) -> Arc<PipelineMetrics> {
        self.metrics.clone()
    }

    /// Subscribe and process until the feed fails or `shutdown` resolves.
    ///
    /// Either way the queue is closed and every identifier already admitted
    /// is processed before this returns. An operator shutdown yields the
    /// final counters; a feed failure yields [`PipelineError::FeedFatal`].
    pub async fn run<F>(self, shutdown: F) -> Result<MetricsSnapshot, PipelineError>
    where
        F: Future<Output = ()>,
    {
        let subscription = self
            .source
            .subscribe(&self.config.feed)
            .await
            .map_err(PipelineError::Subscribe)?;

        let (sender, receiver) = queue::channel(self.config.queue_capacity);
        let mut workers = JoinSet::new();
        for index in 0..self.config.workers {
            workers.spawn(self.worker.clone().run(index, receiver.clone()));
        }
        drop(receiver);

        info!(
            feed = %self.config.feed,
            workers = self.config.workers,
            queue_capacity = self.config.queue_capacity,
            threshold_eth = %self.config.threshold_eth,
            "pipeline started"
        );

        let end = dispatch(subscription, sender, &self.metrics, shutdown).await;
        match &end {
            DispatchEnd::Shutdown => info!("shutdown requested, draining queue"),
            DispatchEnd::Fatal(e) => warn!(error = %e, "feed failed, draining queue"),
        }

        let mut panicked = 0usize;
        while let Some(joined) = workers.join_next().await {
            if let Err(e) = joined {
                error!(error = %e, "worker task failed");
                panicked += 1;
            }
        }

        let summary = self.metrics.snapshot();
        info!(
            received = summary.received,
            admitted = summary.admitted,
            dropped = summary.dropped,
            missed = summary.missed,
            filtered = summary.filtered,
            reported = summary.reported,
            derive_failures = summary.derive_failures,
            "pipeline drained"
        );

        match end {
            DispatchEnd::Fatal(e) => Err(PipelineError::FeedFatal(e)),
            DispatchEnd::Shutdown if panicked > 0 => Err(PipelineError::WorkersPanicked(panicked)),
            DispatchEnd::Shutdown => Ok(summary),
        }
    }
}
