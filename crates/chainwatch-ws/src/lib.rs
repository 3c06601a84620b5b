//! chainwatch-ws — WebSocket JSON-RPC transport for ChainWatch.
//!
//! # Features
//! - Request multiplexing over a single connection
//! - Subscription management (`eth_subscribe` / `eth_unsubscribe`)
//! - [`EventSource`](chainwatch_core::EventSource) for the pending
//!   transaction feed
//!
//! There is no reconnect loop: when the connection drops every in-flight
//! request fails and every subscription's error signal fires once. Restarting
//! is left to whatever supervises the process.

pub mod client;
pub mod source;
pub mod subscriptions;

pub use client::{WsClientConfig, WsRpcClient};
pub use subscriptions::{SubscriptionId, SubscriptionManager};
