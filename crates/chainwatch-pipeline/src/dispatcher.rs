//! Dispatcher: feed → ingress queue.

use std::future::Future;

use tracing::{debug, warn};

use chainwatch_core::{FeedError, Subscription};

use crate::metrics::PipelineMetrics;
use crate::queue::{IngressSender, PushError};

/// Why the dispatcher stopped admitting identifiers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DispatchEnd {
    /// The shutdown future completed.
    Shutdown,
    /// The feed's error signal fired, or the feed ended without one.
    Fatal(FeedError),
}

/// Admit identifiers from `subscription` until the feed fails or `shutdown`
/// resolves, then close the queue.
///
/// The error signal is polled before identifiers, so nothing is admitted
/// once it has fired. A full queue drops the identifier.
pub async fn dispatch<S>(
    subscription: Subscription,
    queue: IngressSender,
    metrics: &PipelineMetrics,
    shutdown: S,
) -> DispatchEnd
where
    S: Future<Output = ()>,
{
    let Subscription {
        mut ids,
        mut errors,
    } = subscription;
    tokio::pin!(shutdown);
    let mut ids_open = true;

    let end = loop {
        tokio::select! {
            biased;

            signal = &mut errors => {
                break DispatchEnd::Fatal(signal.unwrap_or(FeedError::Closed));
            }

            _ = &mut shutdown => break DispatchEnd::Shutdown,

            next = ids.recv(), if ids_open => match next {
                Some(hash) => {
                    metrics.record_received();
                    match queue.try_push(hash) {
                        Ok(()) => metrics.record_admitted(),
                        Err(PushError::Full(hash)) => {
                            metrics.record_dropped();
                            debug!(%hash, "ingress queue full, dropping");
                        }
                        Err(PushError::Closed(hash)) => {
                            metrics.record_dropped();
                            warn!(%hash, "no workers left, dropping");
                        }
                    }
                }
                // Wait for the error signal to say why.
                None => ids_open = false,
            },
        }
    };

    queue.close();
    end
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::queue;
    use chainwatch_core::TxHash;
    use std::future::pending;

    fn id(n: u8) -> TxHash {
        TxHash::repeat_byte(n)
    }

    #[tokio::test]
    async fn error_signal_preempts_pending_ids() {
        let (id_tx, err_tx, sub) = Subscription::channel();
        let (tx, rx) = queue::channel(2);
        let metrics = PipelineMetrics::new();
        for n in 1..=4 {
            id_tx.send(id(n)).unwrap();
        }
        drop(id_tx);
        err_tx
            .send(FeedError::ConnectionLost {
                reason: "eof".into(),
            })
            .unwrap();

        let end = dispatch(sub, tx, &metrics, pending::<()>()).await;
        assert!(matches!(end, DispatchEnd::Fatal(FeedError::ConnectionLost { .. })));
        assert_eq!(rx.pop().await, None);
        assert_eq!(metrics.snapshot().received, 0);
    }

    #[tokio::test]
    async fn full_queue_drops_and_counts() {
        let (id_tx, err_tx, sub) = Subscription::channel();
        let (tx, rx) = queue::channel(2);
        let metrics = PipelineMetrics::new();
        for n in 1..=4 {
            id_tx.send(id(n)).unwrap();
        }
        drop(id_tx);

        let run = tokio::spawn(async move {
            let end = dispatch(sub, tx, &metrics, pending::<()>()).await;
            (end, metrics.snapshot())
        });
        // Let the dispatcher consume the whole feed before the error fires.
        tokio::time::sleep(std::time::Duration::from_millis(50)).await;
        err_tx.send(FeedError::Closed).unwrap();
        let (end, snap) = run.await.unwrap();

        assert_eq!(end, DispatchEnd::Fatal(FeedError::Closed));
        assert_eq!(snap.received, 4);
        assert_eq!(snap.admitted, 2);
        assert_eq!(snap.dropped, 2);
        assert_eq!(rx.pop().await, Some(id(1)));
        assert_eq!(rx.pop().await, Some(id(2)));
        assert_eq!(rx.pop().await, None);
    }

    #[tokio::test]
    async fn dropped_error_signal_is_closed() {
        let (id_tx, err_tx, sub) = Subscription::channel();
        let (tx, _rx) = queue::channel(2);
        drop(id_tx);
        drop(err_tx);
        let end = dispatch(sub, tx, &PipelineMetrics::new(), pending::<()>()).await;
        assert_eq!(end, DispatchEnd::Fatal(FeedError::Closed));
    }

    #[tokio::test]
    async fn shutdown_closes_queue() {
        let (id_tx, _err_tx, sub) = Subscription::channel();
        let (tx, rx) = queue::channel(2);
        id_tx.send(id(1)).unwrap();

        let (stop_tx, stop_rx) = tokio::sync::oneshot::channel::<()>();
        let metrics = PipelineMetrics::new();
        let run = dispatch(sub, tx, &metrics, async {
            let _ = stop_rx.await;
        });
        tokio::pin!(run);

        // First poll admits the queued id, then parks.
        tokio::select! {
            _ = &mut run => panic!("dispatcher ended early"),
            _ = tokio::time::sleep(std::time::Duration::from_millis(20)) => {}
        }
        stop_tx.send(()).unwrap();
        assert_eq!(run.await, DispatchEnd::Shutdown);
        assert_eq!(rx.pop().await, Some(id(1)));
        assert_eq!(rx.pop().await, None);
    }
}
