//! chainwatch-evm — EVM-specific collaborators for the ChainWatch pipeline.
//!
//! - [`RpcEnrichmentClient`] resolves a pending hash with
//!   `eth_getTransactionByHash` over any [`RpcTransport`](chainwatch_core::RpcTransport)
//! - [`EvmSenderRecovery`] rebuilds the signing hash of legacy, EIP-2930,
//!   EIP-1559 and EIP-4844 transactions and recovers the signer with secp256k1

pub mod enrichment;
pub mod recovery;
pub mod rpc_tx;
pub mod signing;

pub use enrichment::RpcEnrichmentClient;
pub use recovery::{address_from_key, recover_address, EvmSenderRecovery};
pub use rpc_tx::{RpcTransaction, TxParseError};
pub use signing::{signature_hash, signing_payload, SigningData};
