//! Data model shared by the pipeline and its collaborators.

use alloy_primitives::{Address, Bytes, B256, U256};
use alloy_rlp::RlpEncodable;
use serde::{Deserialize, Serialize};

/// Identifier of one candidate event: a 32-byte transaction hash.
pub type TxHash = B256;

/// One EIP-2930 access list entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, RlpEncodable)]
#[serde(rename_all = "camelCase")]
pub struct AccessListItem {
    pub address: Address,
    #[serde(default)]
    pub storage_keys: Vec<B256>,
}

/// ECDSA signature fields as reported by the node.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TxSignature {
    /// Legacy `v` (27/28 or EIP-155 encoded) or the typed-transaction parity.
    pub v: u64,
    /// `yParity` when the node reports it separately.
    pub y_parity: Option<u8>,
    pub r: U256,
    pub s: U256,
}

/// The enriched view of a pending transaction.
///
/// Built by an [`EnrichmentClient`](crate::EnrichmentClient) and owned by the
/// worker that dequeued its hash; it is never shared between workers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransactionRecord {
    pub hash: TxHash,
    /// EIP-2718 type byte (0 for legacy).
    pub tx_type: u8,
    /// Chain id carried in the payload; `None` for pre-EIP-155 legacy txs.
    pub chain_id: Option<u64>,
    pub nonce: u64,
    pub gas_limit: u64,
    /// Receiver; `None` for contract creation.
    pub to: Option<Address>,
    /// Transferred value in wei.
    pub value: U256,
    pub input: Bytes,
    /// Legacy / EIP-2930 gas price.
    pub gas_price: Option<U256>,
    pub max_fee_per_gas: Option<U256>,
    pub max_priority_fee_per_gas: Option<U256>,
    pub max_fee_per_blob_gas: Option<U256>,
    pub access_list: Vec<AccessListItem>,
    pub blob_versioned_hashes: Vec<B256>,
    pub signature: TxSignature,
    /// Sender as claimed by the node. Informational; reports use the
    /// recovered sender.
    pub reported_from: Option<Address>,
    /// `true` while the transaction has no block number.
    pub pending: bool,
}

impl TransactionRecord {
    /// Price per unit of gas in wei.
    ///
    /// Legacy transactions carry `gasPrice`; fee-market transactions report
    /// their `maxFeePerGas` cap while pending.
    pub fn price_per_gas(&self) -> U256 {
        self.gas_price
            .or(self.max_fee_per_gas)
            .unwrap_or(U256::ZERO)
    }

    /// `true` if this transaction deploys a contract.
    pub fn is_contract_creation(&self) -> bool {
        self.to.is_none()
    }
}
