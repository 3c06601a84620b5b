//! `eth_getTransactionByHash` enrichment.
//!
//! Every failure collapses into [`FetchResult::NotAvailable`]; the reason is
//! kept for trace logging only.

use std::sync::atomic::{AtomicU64, Ordering};

use async_trait::async_trait;
use serde_json::Value;

use chainwatch_core::{
    call, EnrichmentClient, FetchResult, MissReason, RpcTransport, TxHash,
};

use crate::rpc_tx::RpcTransaction;

/// Enrichment client over any JSON-RPC transport.
pub struct RpcEnrichmentClient<T> {
    transport: T,
    next_id: AtomicU64,
}

impl<T: RpcTransport> RpcEnrichmentClient<T> {
    pub fn new(transport: T) -> Self {
        Self {
            transport,
            next_id: AtomicU64::new(1),
        }
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    /// Raw lookup: `Ok(None)` when the node does not know the hash.
    pub async fn transaction_by_hash(
        &self,
        hash: TxHash,
    ) -> Result<Option<RpcTransaction>, chainwatch_core::TransportError> {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        call(
            &self.transport,
            id,
            "eth_getTransactionByHash",
            vec![Value::String(hash.to_string())],
        )
        .await
    }
}

#[async_trait]
impl<T: RpcTransport> EnrichmentClient for RpcEnrichmentClient<T> {
    async fn fetch_detail(&self, hash: TxHash) -> FetchResult {
        let tx = match self.transaction_by_hash(hash).await {
            Ok(Some(tx)) => tx,
            Ok(None) => return FetchResult::NotAvailable(MissReason::NotFound),
            Err(e) => return FetchResult::NotAvailable(MissReason::Transient(e.to_string())),
        };
        if !tx.is_pending() {
            return FetchResult::NotAvailable(MissReason::NoLongerPending);
        }
        match tx.into_record() {
            Ok(record) => FetchResult::Found(record),
            Err(e) => FetchResult::NotAvailable(MissReason::Transient(e.to_string())),
        }
    }
}
