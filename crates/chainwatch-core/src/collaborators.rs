//! Collaborator seams the pipeline is written against.
//!
//! Concrete implementations live in `chainwatch-ws` (event source) and
//! `chainwatch-evm` (enrichment and sender recovery); tests plug in
//! in-memory fakes.

use alloy_primitives::Address;
use async_trait::async_trait;
use tokio::sync::{mpsc, oneshot};

use crate::error::{DeriveError, FeedError};
use crate::types::{TransactionRecord, TxHash};

/// A live feed subscription.
///
/// `ids` yields hashes in arrival order and is never restarted. `errors`
/// resolves at most once with the terminal reason; once it has fired `ids`
/// yields nothing further.
#[derive(Debug)]
pub struct Subscription {
    pub ids: mpsc::UnboundedReceiver<TxHash>,
    pub errors: oneshot::Receiver<FeedError>,
}

impl Subscription {
    /// Build a subscription together with the producer halves.
    pub fn channel() -> (
        mpsc::UnboundedSender<TxHash>,
        oneshot::Sender<FeedError>,
        Self,
    ) {
        let (id_tx, ids) = mpsc::unbounded_channel();
        let (err_tx, errors) = oneshot::channel();
        (id_tx, err_tx, Self { ids, errors })
    }
}

/// Push source of candidate transaction hashes.
#[async_trait]
pub trait EventSource: Send + Sync {
    /// Subscribe to the named feed (e.g. `newPendingTransactions`).
    async fn subscribe(&self, feed: &str) -> Result<Subscription, FeedError>;
}

/// Why a hash could not be enriched. All variants are treated the same by
/// the pipeline; the reason exists for trace logging only.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MissReason {
    /// The node does not know the hash (dropped or replaced).
    NotFound,
    /// The transaction was mined before it was looked up.
    NoLongerPending,
    /// The lookup itself failed.
    Transient(String),
}

impl std::fmt::Display for MissReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::NotFound => write!(f, "not found"),
            Self::NoLongerPending => write!(f, "no longer pending"),
            Self::Transient(e) => write!(f, "transient: {e}"),
        }
    }
}

/// Outcome of one enrichment lookup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FetchResult {
    Found(TransactionRecord),
    NotAvailable(MissReason),
}

/// Resolves a hash into a full transaction record.
#[async_trait]
pub trait EnrichmentClient: Send + Sync {
    async fn fetch_detail(&self, hash: TxHash) -> FetchResult;
}

/// Derives the signer of a transaction from its signature.
pub trait SenderRecovery: Send + Sync {
    fn recover_sender(&self, record: &TransactionRecord) -> Result<Address, DeriveError>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloy_primitives::B256;

    #[tokio::test]
    async fn subscription_channel_wires_both_halves() {
        let (id_tx, err_tx, mut sub) = Subscription::channel();
        id_tx.send(B256::repeat_byte(1)).unwrap();
        assert_eq!(sub.ids.recv().await, Some(B256::repeat_byte(1)));

        err_tx.send(FeedError::Closed).unwrap();
        assert_eq!(sub.errors.await.unwrap(), FeedError::Closed);
    }

    #[test]
    fn miss_reason_display() {
        assert_eq!(MissReason::NoLongerPending.to_string(), "no longer pending");
        assert_eq!(
            MissReason::Transient("timeout".into()).to_string(),
            "transient: timeout"
        );
    }
}
