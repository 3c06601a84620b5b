//! Worker loop: pop, resolve, filter, derive, report.

use std::sync::Arc;

use alloy_primitives::U256;
use tracing::{debug, trace};

use chainwatch_core::{EnrichmentClient, FetchResult, SenderRecovery, TxHash};

use crate::metrics::PipelineMetrics;
use crate::queue::IngressReceiver;
use crate::report::{Report, Reporter};

/// What happened to one identifier.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    /// The enrichment lookup returned `NotAvailable`.
    Missed,
    /// Value at or below the threshold.
    Filtered,
    Reported(Report),
    /// Sender recovery failed.
    DeriveFailed,
}

/// Everything a worker needs. Cheap to clone; one clone per worker task.
#[derive(Clone)]
pub struct Worker {
    pub(crate) enrichment: Arc<dyn EnrichmentClient>,
    pub(crate) recovery: Arc<dyn SenderRecovery>,
    pub(crate) reporter: Arc<dyn Reporter>,
    pub(crate) threshold: U256,
    pub(crate) metrics: Arc<PipelineMetrics>,
}

impl Worker {
    pub fn new(
        enrichment: Arc<dyn EnrichmentClient>,
        recovery: Arc<dyn SenderRecovery>,
        reporter: Arc<dyn Reporter>,
        threshold: U256,
        metrics: Arc<PipelineMetrics>,
    ) -> Self {
        Self {
            enrichment,
            recovery,
            reporter,
            threshold,
            metrics,
        }
    }

    /// Handle a single identifier end to end.
    pub async fn process(&self, hash: TxHash) -> Outcome {
        let record = match self.enrichment.fetch_detail(hash).await {
            FetchResult::Found(record) => record,
            FetchResult::NotAvailable(reason) => {
                trace!(%hash, %reason, "not available");
                self.metrics.record_missed();
                return Outcome::Missed;
            }
        };

        if record.value <= self.threshold {
            self.metrics.record_filtered();
            return Outcome::Filtered;
        }

        let sender = match self.recovery.recover_sender(&record) {
            Ok(sender) => sender,
            Err(e) => {
                debug!(%hash, error = %e, "sender derivation failed");
                self.metrics.record_derive_failure();
                return Outcome::DeriveFailed;
            }
        };

        let report = Report::new(&record, sender);
        self.reporter.report(&report);
        self.metrics.record_reported();
        Outcome::Reported(report)
    }

    /// Consume the queue until it is closed and drained.
    pub async fn run(self, index: usize, queue: IngressReceiver) {
        debug!(worker = index, "worker started");
        let mut handled = 0u64;
        while let Some(hash) = queue.pop().await {
            self.process(hash).await;
            handled += 1;
        }
        debug!(worker = index, handled, "worker finished");
    }
}
