//! chainwatch-http — HTTP JSON-RPC transport backed by `reqwest`.
//!
//! Used when enrichment lookups should go to a different endpoint than the
//! WebSocket feed (for example a local node for the feed and a paid
//! provider for lookups).

pub mod client;

pub use client::{HttpClientConfig, HttpRpcClient};
