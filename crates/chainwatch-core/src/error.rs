//! Error types shared across ChainWatch crates.

use thiserror::Error;

use crate::request::JsonRpcError;

/// Errors that can occur during an RPC transport operation.
#[derive(Debug, Error)]
pub enum TransportError {
    /// HTTP request failed (connection refused, timeout, etc.).
    #[error("HTTP error: {0}")]
    Http(String),

    /// WebSocket connection/send/receive error.
    #[error("WebSocket error: {0}")]
    WebSocket(String),

    /// JSON-RPC protocol-level error returned by the node.
    #[error("RPC error {}: {}", .0.code, .0.message)]
    Rpc(JsonRpcError),

    /// Request timed out after the configured duration.
    #[error("Request timed out after {ms}ms")]
    Timeout { ms: u64 },

    /// Response could not be deserialized.
    #[error("Deserialization error: {0}")]
    Deserialization(#[from] serde_json::Error),

    /// The connection is gone and will not come back.
    #[error("Transport closed")]
    Closed,

    /// An unexpected error.
    #[error("{0}")]
    Other(String),
}

impl TransportError {
    /// Returns `true` if this is a node-side execution error.
    pub fn is_execution_error(&self) -> bool {
        matches!(self, Self::Rpc(_))
    }
}

/// Terminal failure of an event feed subscription.
///
/// Delivered at most once per subscription; after it fires the feed yields
/// no further identifiers.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum FeedError {
    /// The subscription request itself was rejected.
    #[error("subscribe to '{feed}' failed: {reason}")]
    SubscribeFailed { feed: String, reason: String },

    /// The underlying connection dropped.
    #[error("feed connection lost: {reason}")]
    ConnectionLost { reason: String },

    /// The node sent something the feed cannot interpret.
    #[error("feed protocol error: {0}")]
    Protocol(String),

    /// The feed ended without reporting a reason.
    #[error("feed closed")]
    Closed,
}

/// Failure to derive display data from a single transaction record.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum DeriveError {
    #[error("unsupported transaction type {0}")]
    UnsupportedType(u8),

    #[error("missing field: {0}")]
    MissingField(&'static str),

    #[error("invalid recovery id (v = {0})")]
    InvalidRecoveryId(u64),

    #[error("chain id mismatch: expected {expected}, got {actual}")]
    ChainIdMismatch { expected: u64, actual: u64 },

    #[error("malformed signature")]
    MalformedSignature,

    #[error("public key recovery failed")]
    RecoveryFailed,
}

/// Errors from parsing decimal amounts.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum UnitsError {
    #[error("empty amount")]
    Empty,

    #[error("invalid digit in amount '{0}'")]
    InvalidDigit(String),

    #[error("amount '{input}' has more than {decimals} fractional digits")]
    TooPrecise { input: String, decimals: u8 },

    #[error("amount '{0}' overflows 256 bits")]
    Overflow(String),
}
