//! Pending-transaction feed on top of [`WsRpcClient`].

use alloy_primitives::B256;
use async_trait::async_trait;
use serde_json::Value;
use tokio::sync::{mpsc, oneshot};

use chainwatch_core::{EventSource, FeedError, Subscription, TxHash};

use crate::client::WsRpcClient;
use crate::subscriptions::{SubscriptionId, SubscriptionStreams};

#[async_trait]
impl EventSource for WsRpcClient {
    async fn subscribe(&self, feed: &str) -> Result<Subscription, FeedError> {
        let (sub_id, streams) =
            self.eth_subscribe(feed, vec![])
                .await
                .map_err(|e| FeedError::SubscribeFailed {
                    feed: feed.to_string(),
                    reason: e.to_string(),
                })?;
        tracing::info!(feed, subscription = %sub_id, "subscribed");

        let (id_tx, err_tx, subscription) = Subscription::channel();
        tokio::spawn(forward_hashes(sub_id, streams, id_tx, err_tx));
        Ok(subscription)
    }
}

/// Extract the transaction hash from a notification payload.
///
/// Nodes send either the bare hash or, when full transactions were
/// requested, an object carrying a `hash` member.
pub fn parse_tx_hash(value: &Value) -> Option<TxHash> {
    let raw = match value {
        Value::String(s) => s.as_str(),
        Value::Object(obj) => obj.get("hash")?.as_str()?,
        _ => return None,
    };
    raw.parse::<B256>().ok()
}

/// Relay hashes until the connection side closes, then relay the reason.
///
/// Every hash received before the failure is forwarded first, so the error
/// signal is always the last thing this subscription produces.
async fn forward_hashes(
    sub_id: SubscriptionId,
    streams: SubscriptionStreams,
    id_tx: mpsc::UnboundedSender<TxHash>,
    err_tx: oneshot::Sender<FeedError>,
) {
    let SubscriptionStreams { mut items, errors } = streams;

    while let Some(value) = items.recv().await {
        match parse_tx_hash(&value) {
            Some(hash) => {
                if id_tx.send(hash).is_err() {
                    tracing::debug!(subscription = %sub_id, "feed consumer gone");
                    return;
                }
            }
            None => {
                tracing::warn!(subscription = %sub_id, payload = %value, "unparseable feed item");
            }
        }
    }

    let reason = errors.await.unwrap_or(FeedError::Closed);
    let _ = err_tx.send(reason);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::subscriptions::SubscriptionManager;

    const HASH: &str = "0x5e1f0c0a4bd5b1a46c3e1c5a4c8b4e8f3f9f0b6d3c2a1b0e9d8c7b6a59483726";

    #[test]
    fn parse_hash_forms() {
        let expected: B256 = HASH.parse().unwrap();
        assert_eq!(parse_tx_hash(&Value::String(HASH.into())), Some(expected));
        assert_eq!(
            parse_tx_hash(&serde_json::json!({ "hash": HASH, "nonce": "0x1" })),
            Some(expected)
        );
        assert_eq!(parse_tx_hash(&Value::String("0x1234".into())), None);
        assert_eq!(parse_tx_hash(&serde_json::json!(42)), None);
    }

    #[tokio::test]
    async fn forwards_hashes_then_error() {
        let mgr = SubscriptionManager::new();
        let id = SubscriptionId("0xfeed".into());
        let streams = mgr.register(id.clone(), "newPendingTransactions".into());
        let (id_tx, err_tx, mut sub) = Subscription::channel();
        let task = tokio::spawn(forward_hashes(id.clone(), streams, id_tx, err_tx));

        mgr.dispatch(&id, Value::String(HASH.into()));
        mgr.dispatch(&id, Value::String("garbage".into()));
        mgr.fail_all(FeedError::ConnectionLost {
            reason: "reset".into(),
        });
        task.await.unwrap();

        assert_eq!(sub.ids.recv().await, Some(HASH.parse().unwrap()));
        assert_eq!(sub.ids.recv().await, None);
        assert_eq!(
            sub.errors.await.unwrap(),
            FeedError::ConnectionLost {
                reason: "reset".into()
            }
        );
    }
}
