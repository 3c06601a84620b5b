//! chainwatch-core — foundation traits and types for ChainWatch.
//!
//! # Overview
//!
//! ChainWatch watches a node's pending-transaction feed and reports large
//! transfers. The core crate defines the pieces every other crate agrees on:
//!
//! - [`RpcTransport`]: the async trait every JSON-RPC transport implements
//! - [`JsonRpcRequest`] / [`JsonRpcResponse`]: wire types
//! - [`TransportError`] / [`FeedError`] / [`DeriveError`]: structured errors
//! - [`TxHash`] / [`TransactionRecord`]: the pipeline's data model
//! - [`EventSource`], [`EnrichmentClient`], [`SenderRecovery`]: the
//!   collaborator seams the pipeline is written against
//! - [`units`]: wei ⇄ display-unit conversion

pub mod collaborators;
pub mod error;
pub mod request;
pub mod transport;
pub mod types;
pub mod units;

pub use collaborators::{
    EnrichmentClient, EventSource, FetchResult, MissReason, SenderRecovery, Subscription,
};
pub use error::{DeriveError, FeedError, TransportError, UnitsError};
pub use request::{
    IncomingMessage, JsonRpcError, JsonRpcRequest, JsonRpcResponse, RpcId, RpcParam,
    SubscriptionNotification,
};
pub use transport::{call, RpcTransport};
pub use types::{AccessListItem, TransactionRecord, TxHash, TxSignature};

/// Name of the pending-transaction feed on geth-compatible nodes.
pub const PENDING_TX_FEED: &str = "newPendingTransactions";
