//! JSON-RPC 2.0 wire types, including `eth_subscription` notifications.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// JSON-RPC request ID: string, number, or null.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RpcId {
    Number(u64),
    String(String),
    Null,
}

impl RpcId {
    /// The numeric form of the id, if it has one.
    pub fn as_number(&self) -> Option<u64> {
        match self {
            Self::Number(n) => Some(*n),
            _ => None,
        }
    }
}

impl std::fmt::Display for RpcId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Number(n) => write!(f, "{n}"),
            Self::String(s) => write!(f, "{s}"),
            Self::Null => write!(f, "null"),
        }
    }
}

/// A single JSON-RPC parameter value.
pub type RpcParam = Value;

/// A JSON-RPC 2.0 request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JsonRpcRequest {
    pub jsonrpc: String,
    pub method: String,
    pub params: Vec<RpcParam>,
    pub id: RpcId,
}

impl JsonRpcRequest {
    /// Create a new JSON-RPC 2.0 request.
    pub fn new(id: u64, method: impl Into<String>, params: Vec<RpcParam>) -> Self {
        Self {
            jsonrpc: "2.0".into(),
            method: method.into(),
            params,
            id: RpcId::Number(id),
        }
    }
}

/// A JSON-RPC 2.0 error object.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JsonRpcError {
    pub code: i64,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
}

impl std::fmt::Display for JsonRpcError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "JSON-RPC error {}: {}", self.code, self.message)
    }
}

/// A JSON-RPC 2.0 response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JsonRpcResponse {
    pub jsonrpc: String,
    pub id: RpcId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<JsonRpcError>,
}

impl JsonRpcResponse {
    /// Returns `true` if this is a successful response (no error object).
    pub fn is_ok(&self) -> bool {
        self.error.is_none()
    }

    /// Unwrap the result value or return an error.
    ///
    /// A missing `result` maps to `Value::Null`, which is how nodes answer
    /// lookups for unknown hashes.
    pub fn into_result(self) -> Result<Value, JsonRpcError> {
        if let Some(err) = self.error {
            Err(err)
        } else {
            Ok(self.result.unwrap_or(Value::Null))
        }
    }
}

/// Server-initiated `eth_subscription` message.
///
/// ```json
/// {"jsonrpc":"2.0","method":"eth_subscription",
///  "params":{"subscription":"0xcd0c...","result":"0xd6fd..."}}
/// ```
#[derive(Debug, Clone, Deserialize)]
pub struct SubscriptionNotification {
    pub method: String,
    pub params: SubscriptionParams,
}

/// The `params` member of an `eth_subscription` notification.
#[derive(Debug, Clone, Deserialize)]
pub struct SubscriptionParams {
    pub subscription: String,
    pub result: Value,
}

/// One frame received from a JSON-RPC server on a duplex connection.
#[derive(Debug, Clone)]
pub enum IncomingMessage {
    Response(JsonRpcResponse),
    Notification(SubscriptionNotification),
}

impl IncomingMessage {
    /// Classify a raw text frame. Returns `None` for frames that are neither
    /// a response nor an `eth_subscription` notification.
    pub fn parse(text: &str) -> Option<Self> {
        let val: Value = serde_json::from_str(text).ok()?;
        if val.get("method").and_then(Value::as_str) == Some("eth_subscription") {
            return serde_json::from_value(val).ok().map(Self::Notification);
        }
        if val.get("id").is_some() {
            return serde_json::from_value(val).ok().map(Self::Response);
        }
        None
    }
}
