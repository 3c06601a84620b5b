//! End-to-end tests against a minimal in-process JSON-RPC WebSocket node.

use std::time::Duration;

use futures::{SinkExt, StreamExt};
use serde_json::{json, Value};
use tokio::net::TcpListener;
use tokio_tungstenite::tungstenite::Message;

use chainwatch_core::{call, EventSource, FeedError, RpcTransport, TransportError};
use chainwatch_ws::{WsClientConfig, WsRpcClient};

const HASH_A: &str = "0x1111111111111111111111111111111111111111111111111111111111111111";
const HASH_B: &str = "0x2222222222222222222222222222222222222222222222222222222222222222";

/// What the fake node does after answering `eth_subscribe`.
#[derive(Clone, Copy)]
enum AfterSubscribe {
    /// Push the notifications, then drop the TCP connection.
    PushThenDrop,
    /// Keep answering requests until the client goes away.
    Serve,
}

async fn spawn_node(hashes: Vec<&'static str>, after: AfterSubscribe) -> String {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    tokio::spawn(async move {
        let (tcp, _) = listener.accept().await.unwrap();
        let mut ws = tokio_tungstenite::accept_async(tcp).await.unwrap();

        while let Some(Ok(msg)) = ws.next().await {
            let Message::Text(text) = msg else { continue };
            let req: Value = serde_json::from_str(text.as_str()).unwrap();
            let id = req["id"].clone();
            let reply = match req["method"].as_str().unwrap() {
                "eth_subscribe" => json!({ "jsonrpc": "2.0", "id": id, "result": "0xsub" }),
                "eth_blockNumber" => json!({ "jsonrpc": "2.0", "id": id, "result": "0x10" }),
                "eth_unsubscribe" => json!({ "jsonrpc": "2.0", "id": id, "result": true }),
                _ => json!({
                    "jsonrpc": "2.0",
                    "id": id,
                    "error": { "code": -32601, "message": "method not found" }
                }),
            };
            ws.send(Message::Text(reply.to_string().into())).await.unwrap();

            if req["method"] == "eth_subscribe" {
                for hash in &hashes {
                    let note = json!({
                        "jsonrpc": "2.0",
                        "method": "eth_subscription",
                        "params": { "subscription": "0xsub", "result": hash }
                    });
                    ws.send(Message::Text(note.to_string().into())).await.unwrap();
                }
                if let AfterSubscribe::PushThenDrop = after {
                    return;
                }
            }
        }
    });

    format!("ws://{addr}")
}

fn config() -> WsClientConfig {
    WsClientConfig {
        connect_timeout: Duration::from_secs(5),
        request_timeout: Duration::from_secs(5),
    }
}

#[tokio::test]
async fn feed_delivers_hashes_then_fires_error_once() {
    let url = spawn_node(vec![HASH_A, HASH_B], AfterSubscribe::PushThenDrop).await;
    let client = WsRpcClient::connect(url, config()).await.unwrap();

    let mut sub = client.subscribe("newPendingTransactions").await.unwrap();

    assert_eq!(sub.ids.recv().await, Some(HASH_A.parse().unwrap()));
    assert_eq!(sub.ids.recv().await, Some(HASH_B.parse().unwrap()));
    assert_eq!(sub.ids.recv().await, None);

    let err = tokio::time::timeout(Duration::from_secs(5), sub.errors)
        .await
        .expect("error signal should fire")
        .expect("error signal should carry a reason");
    assert!(matches!(err, FeedError::ConnectionLost { .. }), "got {err:?}");
}

#[tokio::test]
async fn requests_are_multiplexed_alongside_subscription() {
    let url = spawn_node(vec![HASH_A], AfterSubscribe::Serve).await;
    let client = WsRpcClient::connect(url, config()).await.unwrap();

    let mut sub = client.subscribe("newPendingTransactions").await.unwrap();
    assert_eq!(client.subscription_count(), 1);

    let block: String = call(&client, 1, "eth_blockNumber", vec![]).await.unwrap();
    assert_eq!(block, "0x10");

    let err = call::<_, Value>(&client, 2, "eth_nope", vec![]).await.unwrap_err();
    assert!(err.is_execution_error());

    assert_eq!(sub.ids.recv().await, Some(HASH_A.parse().unwrap()));
    assert!(client.url().starts_with("ws://127.0.0.1:"));
}

#[tokio::test]
async fn unsubscribe_drops_local_state() {
    let url = spawn_node(vec![], AfterSubscribe::Serve).await;
    let client = WsRpcClient::connect(url, config()).await.unwrap();

    let (sub_id, _streams) = client
        .eth_subscribe("newPendingTransactions", vec![])
        .await
        .unwrap();
    assert_eq!(sub_id.0, "0xsub");
    assert_eq!(client.subscription_count(), 1);

    assert!(client.eth_unsubscribe(&sub_id).await.unwrap());
    assert_eq!(client.subscription_count(), 0);
}

#[tokio::test]
async fn requests_fail_after_connection_loss() {
    let url = spawn_node(vec![], AfterSubscribe::PushThenDrop).await;
    let client = WsRpcClient::connect(url, config()).await.unwrap();

    let sub = client.subscribe("newPendingTransactions").await.unwrap();
    let _ = sub.errors.await;

    let err = call::<_, String>(&client, 1, "eth_blockNumber", vec![])
        .await
        .unwrap_err();
    assert!(
        matches!(err, TransportError::Closed | TransportError::WebSocket(_)),
        "got {err:?}"
    );
}

#[tokio::test]
async fn connect_to_closed_port_fails() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let result = WsRpcClient::connect(format!("ws://{addr}"), config()).await;
    assert!(result.is_err());
}
