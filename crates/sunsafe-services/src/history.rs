//! Debounced, time-sorted view over a live query of UV records.

use std::collections::HashMap;
use std::time::Duration;

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

use crate::record::UvRecord;
use crate::store::{ChangeBatch, ChangeKind, DocumentChange, DocumentStore, LiveQuery};

/// Default quiet period before buffered changes become visible
pub const DEFAULT_FLUSH_INTERVAL: Duration = Duration::from_millis(1000);

/// Subscription to a collection's history.
///
/// Incoming changes are buffered by record id, so repeated updates to one
/// record collapse to the latest. The buffer is flushed into the visible list
/// once no new batch has arrived for the flush interval. Dropping the feed (or
/// calling [`HistoryFeed::unsubscribe`]) cancels any pending flush and
/// detaches the live query.
pub struct HistoryFeed {
    records: watch::Receiver<Vec<UvRecord>>,
    cancel: CancellationToken,
    task: Option<JoinHandle<()>>,
}

impl HistoryFeed {
    /// Must be called from within a Tokio runtime.
    pub fn subscribe<S>(store: &S, collection: &str, flush_interval: Duration) -> Self
    where
        S: DocumentStore + ?Sized,
    {
        tracing::debug!("Subscribing to history in {}", collection);
        Self::from_live_query(store.watch(collection), flush_interval)
    }

    pub fn from_live_query(live: LiveQuery, flush_interval: Duration) -> Self {
        let (tx, records) = watch::channel(Vec::new());
        let cancel = CancellationToken::new();

        let task = tokio::spawn(run_feed(live, tx, flush_interval, cancel.clone()));

        Self {
            records,
            cancel,
            task: Some(task),
        }
    }

    /// Current visible list, newest first.
    pub fn records(&self) -> Vec<UvRecord> {
        self.records.borrow().clone()
    }

    /// Receiver that is notified on every flush.
    pub fn updates(&self) -> watch::Receiver<Vec<UvRecord>> {
        self.records.clone()
    }

    /// Cancel the pending flush, detach the live query and wait for the feed
    /// task to finish.
    pub async fn unsubscribe(mut self) {
        self.cancel.cancel();
        if let Some(task) = self.task.take() {
            if let Err(e) = task.await {
                tracing::warn!("History feed task ended abnormally: {}", e);
            }
        }
    }
}

impl Drop for HistoryFeed {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}

async fn run_feed(
    mut live: LiveQuery,
    tx: watch::Sender<Vec<UvRecord>>,
    flush_interval: Duration,
    cancel: CancellationToken,
) {
    let mut buffer: HashMap<String, DocumentChange> = HashMap::new();
    let mut deadline: Option<Instant> = None;

    loop {
        tokio::select! {
            biased;

            _ = cancel.cancelled() => {
                if !buffer.is_empty() {
                    tracing::debug!("Dropping {} unflushed history changes", buffer.len());
                }
                break;
            }

            batch = live.recv() => match batch {
                Some(batch) => {
                    buffer_changes(&mut buffer, batch);
                    deadline = Some(Instant::now() + flush_interval);
                }
                None => {
                    tracing::debug!("Live query closed");
                    flush(&mut buffer, &tx);
                    break;
                }
            },

            _ = sleep_until(deadline), if deadline.is_some() => {
                deadline = None;
                flush(&mut buffer, &tx);
            }
        }
    }
}

fn flush(buffer: &mut HashMap<String, DocumentChange>, tx: &watch::Sender<Vec<UvRecord>>) {
    if buffer.is_empty() {
        return;
    }
    let changes: Vec<DocumentChange> = buffer.drain().map(|(_, c)| c).collect();
    tx.send_modify(|records| apply_changes(records, changes));
}

async fn sleep_until(deadline: Option<Instant>) {
    if let Some(deadline) = deadline {
        tokio::time::sleep_until(deadline).await;
    }
}

fn buffer_changes(buffer: &mut HashMap<String, DocumentChange>, batch: ChangeBatch) {
    for change in batch {
        let id = change.record.id.clone();
        let merged = match (buffer.remove(&id), change.kind) {
            // Still unseen by the visible list, keep it an add
            (Some(prev), ChangeKind::Modified) if prev.kind == ChangeKind::Added => {
                DocumentChange::added(change.record)
            }
            _ => change,
        };
        buffer.insert(id, merged);
    }
}

fn apply_changes(records: &mut Vec<UvRecord>, changes: Vec<DocumentChange>) {
    for change in changes {
        let position = records.iter().position(|r| r.id == change.record.id);
        match (change.kind, position) {
            (ChangeKind::Removed, Some(i)) => {
                records.remove(i);
            }
            (ChangeKind::Removed, None) => {}
            (_, Some(i)) => records[i] = change.record,
            (ChangeKind::Added, None) => records.push(change.record),
            (ChangeKind::Modified, None) => {
                tracing::debug!("Ignoring update for unknown record {}", change.record.id);
            }
        }
    }
    records.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
}
