//! Single-flight, strictly sequential write queue.
//!
//! Writes are keyed. While a key is enqueued or running, further `add` calls
//! with that key attach to the existing handle instead of enqueuing a second
//! write, and every caller sees the same settled outcome. One worker task
//! drains the queue in arrival order, one write at a time, through the
//! [`ResilientExecutor`].

use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;

use futures::future::{BoxFuture, FutureExt, Shared};
use parking_lot::Mutex;
use sunsafe_core::{AppError, ResilientExecutor};
use tokio::sync::{mpsc, oneshot};

/// `Ok(None)` means the store was unavailable and the write was dropped.
pub type WriteOutcome<T> = Result<Option<T>, AppError>;

/// Awaitable, cloneable handle to a queued write.
pub type WriteHandle<T> = Shared<BoxFuture<'static, WriteOutcome<T>>>;

type BoxedOperation<T> = Box<dyn FnMut() -> BoxFuture<'static, Result<T, AppError>> + Send>;

struct QueuedWrite<T> {
    key: String,
    operation: BoxedOperation<T>,
    settle: oneshot::Sender<WriteOutcome<T>>,
}

type PendingMap<T> = Arc<Mutex<HashMap<String, WriteHandle<T>>>>;

pub struct WriteQueue<T> {
    tx: mpsc::UnboundedSender<QueuedWrite<T>>,
    pending: PendingMap<T>,
}

impl<T> Clone for WriteQueue<T> {
    fn clone(&self) -> Self {
        Self {
            tx: self.tx.clone(),
            pending: self.pending.clone(),
        }
    }
}

impl<T> WriteQueue<T>
where
    T: Clone + Send + Sync + 'static,
{
    /// Start the queue's worker. Must be called from within a Tokio runtime;
    /// the worker stops once every clone of the queue is dropped and the
    /// remaining writes have drained.
    pub fn new(executor: ResilientExecutor) -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        let pending: PendingMap<T> = Arc::new(Mutex::new(HashMap::new()));

        tokio::spawn(drain(rx, executor, pending.clone()));

        Self { tx, pending }
    }

    /// Enqueue `operation` under `key`, or join the write already pending
    /// for that key.
    ///
    /// The write runs even if the returned handle is dropped.
    pub fn add<F, Fut>(&self, key: impl Into<String>, mut operation: F) -> WriteHandle<T>
    where
        F: FnMut() -> Fut + Send + 'static,
        Fut: Future<Output = Result<T, AppError>> + Send + 'static,
    {
        let key = key.into();
        let mut pending = self.pending.lock();

        if let Some(existing) = pending.get(&key) {
            tracing::debug!("Write {} already pending, joining it", key);
            return existing.clone();
        }

        let (settle, settled) = oneshot::channel();
        let handle: WriteHandle<T> = async move {
            settled
                .await
                .unwrap_or_else(|_| Err(AppError::Transport("write queue closed".into())))
        }
        .boxed()
        .shared();

        let queued = QueuedWrite {
            key: key.clone(),
            operation: Box::new(move || operation().boxed()),
            settle,
        };

        if self.tx.send(queued).is_err() {
            tracing::error!("Write queue worker is gone, rejecting {}", key);
            return futures::future::ready(Err(AppError::Transport(
                "write queue closed".into(),
            )))
            .boxed()
            .shared();
        }

        pending.insert(key, handle.clone());
        handle
    }

    /// Whether a write with this key is enqueued or running.
    pub fn is_pending(&self, key: &str) -> bool {
        self.pending.lock().contains_key(key)
    }

    pub fn pending_count(&self) -> usize {
        self.pending.lock().len()
    }
}

async fn drain<T>(
    mut rx: mpsc::UnboundedReceiver<QueuedWrite<T>>,
    executor: ResilientExecutor,
    pending: PendingMap<T>,
) where
    T: Clone + Send + Sync + 'static,
{
    while let Some(QueuedWrite {
        key,
        mut operation,
        settle,
    }) = rx.recv().await
    {
        let outcome = match executor.run(|| operation()).await {
            Ok(value) => Ok(Some(value)),
            Err(e) if e.is_store_unavailable() => {
                tracing::warn!("Operation queued for offline sync ({}): {}", key, e);
                Ok(None)
            }
            Err(e) => {
                tracing::error!("Write {} failed: {}", key, e);
                Err(e)
            }
        };

        // Free the key before the next write starts
        pending.lock().remove(&key);
        let _ = settle.send(outcome);
    }

    tracing::debug!("Write queue drained and closed");
}
