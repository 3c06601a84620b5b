//! The `RpcTransport` trait, the core abstraction for JSON-RPC connections.

use std::sync::Arc;

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::error::TransportError;
use crate::request::{JsonRpcRequest, JsonRpcResponse};

/// The central async trait every RPC transport must implement.
///
/// # Thread Safety
/// Implementations must be `Send + Sync`; the worker pool shares one
/// transport across all workers.
///
/// # Object Safety
/// The trait is object-safe and can be stored as `Arc<dyn RpcTransport>`.
/// Typed calls go through the free function [`call`].
#[async_trait]
pub trait RpcTransport: Send + Sync + 'static {
    /// Send a single JSON-RPC request and return the response.
    async fn send(&self, req: JsonRpcRequest) -> Result<JsonRpcResponse, TransportError>;

    /// Return the transport's identifier (URL or name).
    fn url(&self) -> &str;
}

#[async_trait]
impl<T: RpcTransport + ?Sized> RpcTransport for Arc<T> {
    async fn send(&self, req: JsonRpcRequest) -> Result<JsonRpcResponse, TransportError> {
        (**self).send(req).await
    }

    fn url(&self) -> &str {
        (**self).url()
    }
}

/// Call `method` and deserialize the result.
pub async fn call<R, T>(
    transport: &R,
    id: u64,
    method: &str,
    params: Vec<Value>,
) -> Result<T, TransportError>
where
    R: RpcTransport + ?Sized,
    T: DeserializeOwned,
{
    let req = JsonRpcRequest::new(id, method, params);
    let resp = transport.send(req).await?;
    let result = resp.into_result().map_err(TransportError::Rpc)?;
    serde_json::from_value(result).map_err(TransportError::Deserialization)
}
