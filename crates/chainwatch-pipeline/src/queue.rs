//! Bounded ingress queue: one producer, many consumers.
//!
//! Built on a bounded `tokio::sync::mpsc` channel. The sender half is owned
//! by the dispatcher and never blocks; the receiver half is shared by the
//! workers behind an async mutex, so each identifier is popped by exactly
//! one worker. Dropping (or [`close`](IngressSender::close)-ing) the sender
//! closes the queue: items already buffered are still handed out, then every
//! `pop` returns `None`.

use std::sync::Arc;

use thiserror::Error;
use tokio::sync::{mpsc, Mutex};

use chainwatch_core::TxHash;

/// Why `try_push` refused an identifier. The identifier is handed back.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum PushError {
    #[error("ingress queue full")]
    Full(TxHash),
    #[error("ingress queue closed")]
    Closed(TxHash),
}

/// Create a queue holding at most `capacity` identifiers.
///
/// # Panics
/// If `capacity` is zero or above
/// [`MAX_QUEUE_CAPACITY`](crate::config::MAX_QUEUE_CAPACITY).
pub fn channel(capacity: usize) -> (IngressSender, IngressReceiver) {
    let (tx, rx) = mpsc::channel(capacity);
    (
        IngressSender { tx },
        IngressReceiver {
            rx: Arc::new(Mutex::new(rx)),
        },
    )
}

/// Producer half, owned by the dispatcher.
#[derive(Debug)]
pub struct IngressSender {
    tx: mpsc::Sender<TxHash>,
}

impl IngressSender {
    /// Admit `id` without waiting.
    pub fn try_push(&self, id: TxHash) -> Result<(), PushError> {
        self.tx.try_send(id).map_err(|e| match e {
            mpsc::error::TrySendError::Full(id) => PushError::Full(id),
            mpsc::error::TrySendError::Closed(id) => PushError::Closed(id),
        })
    }

    /// Number of identifiers currently buffered.
    pub fn len(&self) -> usize {
        self.tx.max_capacity() - self.tx.capacity()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn capacity(&self) -> usize {
        self.tx.max_capacity()
    }

    /// Close the queue. Buffered identifiers remain poppable.
    pub fn close(self) {
        drop(self)
    }
}

/// Consumer half. Clone one per worker.
#[derive(Debug, Clone)]
pub struct IngressReceiver {
    rx: Arc<Mutex<mpsc::Receiver<TxHash>>>,
}

impl IngressReceiver {
    /// Wait for the next identifier; `None` once closed and drained.
    pub async fn pop(&self) -> Option<TxHash> {
        self.rx.lock().await.recv().await
    }
}
