//! WebSocket JSON-RPC client with request multiplexing and subscriptions.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use async_trait::async_trait;
use futures::{SinkExt, StreamExt};
use serde_json::Value;
use tokio::sync::{mpsc, oneshot};
use tokio::time;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream};

use chainwatch_core::{
    FeedError, IncomingMessage, JsonRpcRequest, JsonRpcResponse, RpcId, RpcTransport,
    TransportError,
};

use crate::subscriptions::{SubscriptionId, SubscriptionManager, SubscriptionStreams};

/// A request waiting for its response frame.
enum Pending {
    Call(oneshot::Sender<Result<JsonRpcResponse, TransportError>>),
    Subscribe {
        kind: String,
        tx: oneshot::Sender<Result<(SubscriptionId, SubscriptionStreams), TransportError>>,
    },
}

type PendingMap = Arc<Mutex<HashMap<u64, Pending>>>;
type WsStream = WebSocketStream<MaybeTlsStream<tokio::net::TcpStream>>;

fn lock_pending(pending: &PendingMap) -> MutexGuard<'_, HashMap<u64, Pending>> {
    pending.lock().unwrap_or_else(|e| e.into_inner())
}

/// Configuration for the WebSocket client.
#[derive(Debug, Clone)]
pub struct WsClientConfig {
    /// Maximum time to establish the connection.
    pub connect_timeout: Duration,
    /// Maximum time to wait for a single response.
    pub request_timeout: Duration,
}

impl Default for WsClientConfig {
    fn default() -> Self {
        Self {
            connect_timeout: Duration::from_secs(10),
            request_timeout: Duration::from_secs(10),
        }
    }
}

/// Command sent from callers to the background WS task.
enum WsCommand {
    Send(JsonRpcRequest),
    Close,
}

/// WebSocket JSON-RPC client.
///
/// A background task owns the connection. Requests from any number of
/// callers are multiplexed over it and matched to responses by id.
pub struct WsRpcClient {
    url: String,
    cmd_tx: mpsc::UnboundedSender<WsCommand>,
    pending: PendingMap,
    subscriptions: SubscriptionManager,
    next_id: AtomicU64,
    request_timeout: Duration,
}

impl WsRpcClient {
    /// Connect to `url` and start the background task.
    pub async fn connect(
        url: impl Into<String>,
        config: WsClientConfig,
    ) -> Result<Self, TransportError> {
        let url = url.into();
        tracing::info!(url = %url, "connecting via WebSocket");

        let (ws_stream, _) = time::timeout(
            config.connect_timeout,
            tokio_tungstenite::connect_async(url.as_str()),
        )
        .await
        .map_err(|_| TransportError::Timeout {
            ms: config.connect_timeout.as_millis() as u64,
        })?
        .map_err(|e| TransportError::WebSocket(e.to_string()))?;

        tracing::info!(url = %url, "WebSocket connected");

        let (cmd_tx, cmd_rx) = mpsc::unbounded_channel::<WsCommand>();
        let pending: PendingMap = Arc::new(Mutex::new(HashMap::new()));
        let subscriptions = SubscriptionManager::new();

        tokio::spawn(ws_task(
            url.clone(),
            ws_stream,
            cmd_rx,
            Arc::clone(&pending),
            subscriptions.clone(),
        ));

        Ok(Self {
            url,
            cmd_tx,
            pending,
            subscriptions,
            next_id: AtomicU64::new(1),
            request_timeout: config.request_timeout,
        })
    }

    fn next_id(&self) -> u64 {
        self.next_id.fetch_add(1, Ordering::Relaxed)
    }

    /// Queue `req` under `id`, or undo the registration if the task is gone.
    fn submit(&self, id: u64, entry: Pending, req: JsonRpcRequest) -> Result<(), TransportError> {
        lock_pending(&self.pending).insert(id, entry);
        if self.cmd_tx.send(WsCommand::Send(req)).is_err() {
            lock_pending(&self.pending).remove(&id);
            return Err(TransportError::Closed);
        }
        Ok(())
    }

    async fn await_reply<T>(
        &self,
        id: u64,
        rx: oneshot::Receiver<Result<T, TransportError>>,
    ) -> Result<T, TransportError> {
        match time::timeout(self.request_timeout, rx).await {
            Ok(Ok(result)) => result,
            Ok(Err(_)) => Err(TransportError::Closed),
            Err(_) => {
                lock_pending(&self.pending).remove(&id);
                Err(TransportError::Timeout {
                    ms: self.request_timeout.as_millis() as u64,
                })
            }
        }
    }

    /// Subscribe to a server-side event stream.
    ///
    /// `kind` is the subscription type (e.g. `"newPendingTransactions"`).
    /// The subscription is registered before any later frame is read, so no
    /// notification can slip past between the response and the caller.
    pub async fn eth_subscribe(
        &self,
        kind: &str,
        params: Vec<Value>,
    ) -> Result<(SubscriptionId, SubscriptionStreams), TransportError> {
        let id = self.next_id();
        let req = JsonRpcRequest::new(
            id,
            "eth_subscribe",
            std::iter::once(Value::String(kind.to_string()))
                .chain(params)
                .collect(),
        );
        let (tx, rx) = oneshot::channel();
        self.submit(
            id,
            Pending::Subscribe {
                kind: kind.to_string(),
                tx,
            },
            req,
        )?;
        self.await_reply(id, rx).await
    }

    /// Cancel a subscription on the node and drop its local state.
    pub async fn eth_unsubscribe(&self, sub: &SubscriptionId) -> Result<bool, TransportError> {
        self.subscriptions.remove(sub);
        let req = JsonRpcRequest::new(
            self.next_id(),
            "eth_unsubscribe",
            vec![Value::String(sub.0.clone())],
        );
        let resp = self.send(req).await?;
        let result = resp.into_result().map_err(TransportError::Rpc)?;
        Ok(result.as_bool().unwrap_or(false))
    }

    /// Number of live subscriptions on this connection.
    pub fn subscription_count(&self) -> usize {
        self.subscriptions.len()
    }

    /// Close the connection. Pending requests fail and subscriptions receive
    /// [`FeedError::Closed`].
    pub fn close(&self) {
        let _ = self.cmd_tx.send(WsCommand::Close);
    }
}

impl Drop for WsRpcClient {
    fn drop(&mut self) {
        self.close();
    }
}

#[async_trait]
impl RpcTransport for WsRpcClient {
    /// Send a request. The caller's id is replaced with a connection-unique
    /// one so concurrent callers never collide.
    async fn send(&self, mut req: JsonRpcRequest) -> Result<JsonRpcResponse, TransportError> {
        let id = self.next_id();
        req.id = RpcId::Number(id);
        let (tx, rx) = oneshot::channel();
        self.submit(id, Pending::Call(tx), req)?;
        self.await_reply(id, rx).await
    }

    fn url(&self) -> &str {
        &self.url
    }
}

/// Background task that owns the WebSocket connection.
async fn ws_task(
    url: String,
    ws_stream: WsStream,
    mut cmd_rx: mpsc::UnboundedReceiver<WsCommand>,
    pending: PendingMap,
    subscriptions: SubscriptionManager,
) {
    let (mut sink, mut stream) = ws_stream.split();

    let failure = loop {
        tokio::select! {
            cmd = cmd_rx.recv() => {
                match cmd {
                    None | Some(WsCommand::Close) => {
                        let _ = sink.send(Message::Close(None)).await;
                        break FeedError::Closed;
                    }
                    Some(WsCommand::Send(req)) => {
                        let msg = match serde_json::to_string(&req) {
                            Ok(msg) => msg,
                            Err(e) => {
                                fail_request(&pending, &req.id, TransportError::Deserialization(e));
                                continue;
                            }
                        };
                        if let Err(e) = sink.send(Message::Text(msg.into())).await {
                            break FeedError::ConnectionLost { reason: e.to_string() };
                        }
                    }
                }
            }
            msg = stream.next() => {
                match msg {
                    None => break FeedError::ConnectionLost { reason: "stream ended".into() },
                    Some(Err(e)) => break FeedError::ConnectionLost { reason: e.to_string() },
                    Some(Ok(Message::Text(text))) => {
                        handle_message(text.as_str(), &pending, &subscriptions);
                    }
                    Some(Ok(Message::Ping(data))) => {
                        let _ = sink.send(Message::Pong(data)).await;
                    }
                    Some(Ok(Message::Close(_))) => {
                        break FeedError::ConnectionLost { reason: "closed by server".into() };
                    }
                    Some(Ok(_)) => {}
                }
            }
        }
    };

    match &failure {
        FeedError::Closed => tracing::info!(url = %url, "WebSocket closed"),
        other => tracing::warn!(url = %url, error = %other, "WebSocket disconnected"),
    }

    let drained: Vec<_> = lock_pending(&pending).drain().collect();
    for (_, entry) in drained {
        let err = || TransportError::WebSocket(failure.to_string());
        match entry {
            Pending::Call(tx) => {
                let _ = tx.send(Err(err()));
            }
            Pending::Subscribe { tx, .. } => {
                let _ = tx.send(Err(err()));
            }
        }
    }
    subscriptions.fail_all(failure);
}

fn fail_request(pending: &PendingMap, id: &RpcId, err: TransportError) {
    let Some(id) = id.as_number() else { return };
    match lock_pending(pending).remove(&id) {
        Some(Pending::Call(tx)) => {
            let _ = tx.send(Err(err));
        }
        Some(Pending::Subscribe { tx, .. }) => {
            let _ = tx.send(Err(err));
        }
        None => {}
    }
}

fn handle_message(text: &str, pending: &PendingMap, subscriptions: &SubscriptionManager) {
    match IncomingMessage::parse(text) {
        Some(IncomingMessage::Notification(n)) => {
            let id = SubscriptionId(n.params.subscription);
            if !subscriptions.dispatch(&id, n.params.result) {
                tracing::trace!(subscription = %id, "notification for unknown subscription");
            }
        }
        Some(IncomingMessage::Response(resp)) => {
            let Some(id) = resp.id.as_number() else { return };
            let Some(entry) = lock_pending(pending).remove(&id) else {
                tracing::trace!(id, "response for unknown request");
                return;
            };
            match entry {
                Pending::Call(tx) => {
                    let _ = tx.send(Ok(resp));
                }
                Pending::Subscribe { kind, tx } => {
                    let result = match resp.into_result() {
                        Ok(Value::String(sub)) => {
                            let sub = SubscriptionId(sub);
                            let streams = subscriptions.register(sub.clone(), kind);
                            Ok((sub, streams))
                        }
                        Ok(other) => Err(TransportError::Other(format!(
                            "unexpected eth_subscribe result: {other}"
                        ))),
                        Err(e) => Err(TransportError::Rpc(e)),
                    };
                    if let Err(Ok((sub, _))) = tx.send(result) {
                        // Caller gave up (timeout); nobody will read this one.
                        subscriptions.remove(&sub);
                    }
                }
            }
        }
        None => tracing::debug!("failed to parse WS message as JSON-RPC"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    type CallRx = oneshot::Receiver<Result<JsonRpcResponse, TransportError>>;

    fn pending_call(pending: &PendingMap, id: u64) -> CallRx {
        let (tx, rx) = oneshot::channel();
        lock_pending(pending).insert(id, Pending::Call(tx));
        rx
    }

    #[tokio::test]
    async fn response_routed_by_id() {
        let pending: PendingMap = Arc::default();
        let subs = SubscriptionManager::new();
        let mut rx1 = pending_call(&pending, 1);
        let rx2 = pending_call(&pending, 2);

        handle_message(r#"{"jsonrpc":"2.0","id":2,"result":"0x2a"}"#, &pending, &subs);

        let resp = rx2.await.unwrap().unwrap();
        assert_eq!(resp.result, Some(Value::String("0x2a".into())));
        assert!(rx1.try_recv().is_err());
        assert_eq!(lock_pending(&pending).len(), 1);
    }

    #[tokio::test]
    async fn subscribe_response_registers_before_notifications() {
        let pending: PendingMap = Arc::default();
        let subs = SubscriptionManager::new();
        let (tx, rx) = oneshot::channel();
        lock_pending(&pending).insert(
            5,
            Pending::Subscribe {
                kind: "newPendingTransactions".into(),
                tx,
            },
        );

        handle_message(r#"{"jsonrpc":"2.0","id":5,"result":"0xsub"}"#, &pending, &subs);
        handle_message(
            r#"{"jsonrpc":"2.0","method":"eth_subscription","params":{"subscription":"0xsub","result":"0xaa"}}"#,
            &pending,
            &subs,
        );

        let (sub, mut streams) = rx.await.unwrap().unwrap();
        assert_eq!(sub, SubscriptionId("0xsub".into()));
        assert_eq!(streams.items.recv().await, Some(Value::String("0xaa".into())));
    }

    #[tokio::test]
    async fn rejected_subscribe_surfaces_rpc_error() {
        let pending: PendingMap = Arc::default();
        let subs = SubscriptionManager::new();
        let (tx, rx) = oneshot::channel();
        lock_pending(&pending).insert(
            9,
            Pending::Subscribe {
                kind: "bogus".into(),
                tx,
            },
        );

        handle_message(
            r#"{"jsonrpc":"2.0","id":9,"error":{"code":-32602,"message":"invalid subscription"}}"#,
            &pending,
            &subs,
        );

        assert!(matches!(rx.await.unwrap(), Err(TransportError::Rpc(e)) if e.code == -32602));
        assert!(subs.is_empty());
    }
}
