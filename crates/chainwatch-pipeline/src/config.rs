//! Pipeline configuration.

use alloy_primitives::U256;
use serde::{Deserialize, Serialize};
use tokio::sync::Semaphore;

use chainwatch_core::{units, PENDING_TX_FEED};

use crate::error::PipelineError;

/// Configuration consumed by [`Pipeline`](crate::Pipeline). Immutable once the
/// pipeline is built.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PipelineConfig {
    /// Feed name passed to `eth_subscribe`
    #[serde(default = "default_feed")]
    pub feed: String,
    /// Number of worker tasks
    #[serde(default = "default_workers")]
    pub workers: usize,
    /// Ingress queue capacity; identifiers arriving while full are dropped
    #[serde(default = "default_queue_capacity")]
    pub queue_capacity: usize,
    /// Minimum value in ether; only strictly larger transfers are reported
    #[serde(default = "default_threshold_eth")]
    pub threshold_eth: String,
    /// Chain id signatures must commit to
    #[serde(default = "default_chain_id")]
    pub chain_id: u64,
}

/// Largest queue the bounded channel can be built with.
pub const MAX_QUEUE_CAPACITY: usize = Semaphore::MAX_PERMITS;

fn default_feed() -> String { PENDING_TX_FEED.to_string() }
fn default_workers() -> usize { 5 }
fn default_queue_capacity() -> usize { 1_024 }
fn default_threshold_eth() -> String { "1".to_string() }
fn default_chain_id() -> u64 { 1 }

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            feed: default_feed(),
            workers: default_workers(),
            queue_capacity: default_queue_capacity(),
            threshold_eth: default_threshold_eth(),
            chain_id: default_chain_id(),
        }
    }
}

impl PipelineConfig {
    /// Threshold in wei.
    pub fn threshold_wei(&self) -> Result<U256, PipelineError> {
        Ok(units::parse_ether(&self.threshold_eth)?)
    }

    /// Check the sizing fields and parse the threshold.
    pub fn validate(&self) -> Result<U256, PipelineError> {
        if self.feed.is_empty() {
            return Err(PipelineError::Config("feed name is empty".into()));
        }
        if self.workers == 0 {
            return Err(PipelineError::Config("workers must be at least 1".into()));
        }
        if self.queue_capacity == 0 {
            return Err(PipelineError::Config(
                "queue_capacity must be at least 1".into(),
            ));
        }
        if self.queue_capacity > MAX_QUEUE_CAPACITY {
            return Err(PipelineError::Config(format!(
                "queue_capacity must be at most {MAX_QUEUE_CAPACITY}"
            )));
        }
        self.threshold_wei()
    }
}
