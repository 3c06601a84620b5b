//! HTTP JSON-RPC client backed by `reqwest`.
//!
//! One POST per request, no retries: a failed lookup is reported to the
//! caller, which treats it as a missed candidate. Concurrency is bounded by
//! the caller (the worker pool), and `reqwest` pools connections internally.

use std::time::Duration;

use async_trait::async_trait;

use chainwatch_core::{JsonRpcRequest, JsonRpcResponse, RpcTransport, TransportError};

/// Configuration for `HttpRpcClient`.
#[derive(Debug, Clone)]
pub struct HttpClientConfig {
    pub request_timeout: Duration,
    /// Idle connections kept per host; sized to the worker count.
    pub pool_max_idle_per_host: usize,
}

impl Default for HttpClientConfig {
    fn default() -> Self {
        Self {
            request_timeout: Duration::from_secs(10),
            pool_max_idle_per_host: 8,
        }
    }
}

/// HTTP JSON-RPC client.
pub struct HttpRpcClient {
    url: String,
    http: reqwest::Client,
    request_timeout: Duration,
}

impl HttpRpcClient {
    /// Create a new client for the given JSON-RPC endpoint URL.
    pub fn new(url: impl Into<String>, config: HttpClientConfig) -> Result<Self, TransportError> {
        let http = reqwest::Client::builder()
            .timeout(config.request_timeout)
            .pool_max_idle_per_host(config.pool_max_idle_per_host)
            .build()
            .map_err(|e| TransportError::Http(e.to_string()))?;

        Ok(Self {
            url: url.into(),
            http,
            request_timeout: config.request_timeout,
        })
    }

    /// Create with default configuration.
    pub fn default_for(url: impl Into<String>) -> Result<Self, TransportError> {
        Self::new(url, HttpClientConfig::default())
    }

    fn map_send_error(&self, e: reqwest::Error) -> TransportError {
        if e.is_timeout() {
            TransportError::Timeout {
                ms: self.request_timeout.as_millis() as u64,
            }
        } else {
            TransportError::Http(e.to_string())
        }
    }
}

#[async_trait]
impl RpcTransport for HttpRpcClient {
    async fn send(&self, req: JsonRpcRequest) -> Result<JsonRpcResponse, TransportError> {
        let resp = self
            .http
            .post(&self.url)
            .json(&req)
            .send()
            .await
            .map_err(|e| self.map_send_error(e))?;

        if !resp.status().is_success() {
            let status = resp.status().as_u16();
            let body = resp.text().await.unwrap_or_default();
            tracing::debug!(status, url = %self.url, method = %req.method, "HTTP error status");
            return Err(TransportError::Http(format!("HTTP {status}: {body}")));
        }

        resp.json::<JsonRpcResponse>()
            .await
            .map_err(|e| TransportError::Http(e.to_string()))
    }

    fn url(&self) -> &str {
        &self.url
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chainwatch_core::call;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;

    /// Serve one HTTP request with a fixed status and body.
    async fn serve_once(status: &'static str, body: &'static str) -> String {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            let (mut sock, _) = listener.accept().await.unwrap();
            let mut buf = vec![0u8; 8192];
            let mut read = 0;
            // Read until the end of the JSON body.
            loop {
                let n = sock.read(&mut buf[read..]).await.unwrap();
                read += n;
                if n == 0 || buf[..read].ends_with(b"}") {
                    break;
                }
            }
            let reply = format!(
                "HTTP/1.1 {status}\r\ncontent-type: application/json\r\ncontent-length: {}\r\nconnection: close\r\n\r\n{body}",
                body.len()
            );
            sock.write_all(reply.as_bytes()).await.unwrap();
        });
        format!("http://{addr}")
    }

    #[tokio::test]
    async fn call_round_trip() {
        let url = serve_once("200 OK", r#"{"jsonrpc":"2.0","id":1,"result":"0x10"}"#).await;
        let client = HttpRpcClient::default_for(url).unwrap();
        let block: String = call(&client, 1, "eth_blockNumber", vec![]).await.unwrap();
        assert_eq!(block, "0x10");
    }

    #[tokio::test]
    async fn non_success_status_is_http_error() {
        let url = serve_once("429 Too Many Requests", r#"{"error":"slow down"}"#).await;
        let client = HttpRpcClient::default_for(url).unwrap();
        let err = call::<_, serde_json::Value>(&client, 1, "eth_blockNumber", vec![])
            .await
            .unwrap_err();
        match err {
            TransportError::Http(msg) => assert!(msg.starts_with("HTTP 429"), "{msg}"),
            other => panic!("unexpected error: {other:?}"),
        }
    }
}
