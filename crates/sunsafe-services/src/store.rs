//! Remote document store boundary.
//!
//! `DocumentStore` is the seam to the hosted store SDK. `MemoryStore` is an
//! in-process implementation with the same observable behavior: store-assigned
//! ids, server timestamps, live queries that start with a snapshot, and a
//! network switch that makes writes fail as "unavailable".

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Duration as ChronoDuration, Utc};
use parking_lot::Mutex;
use sunsafe_core::{AppError, NetworkToggle};
use tokio::sync::mpsc;

use crate::record::{NewUvRecord, UvRecord};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChangeKind {
    Added,
    Modified,
    Removed,
}

#[derive(Debug, Clone, PartialEq)]
pub struct DocumentChange {
    pub kind: ChangeKind,
    pub record: UvRecord,
}

impl DocumentChange {
    pub fn added(record: UvRecord) -> Self {
        Self {
            kind: ChangeKind::Added,
            record,
        }
    }

    pub fn modified(record: UvRecord) -> Self {
        Self {
            kind: ChangeKind::Modified,
            record,
        }
    }

    pub fn removed(record: UvRecord) -> Self {
        Self {
            kind: ChangeKind::Removed,
            record,
        }
    }
}

/// One notification from a live query
pub type ChangeBatch = Vec<DocumentChange>;

/// Receiving end of a live query; dropping it detaches the listener.
pub type LiveQuery = mpsc::UnboundedReceiver<ChangeBatch>;

#[async_trait]
pub trait DocumentStore: NetworkToggle {
    /// Create a document with a store-assigned id and server timestamp.
    async fn create(&self, collection: &str, record: NewUvRecord) -> Result<String, AppError>;

    /// Live query over a collection, newest first. The first batch (if the
    /// collection is non-empty) is the current snapshot as `Added` changes.
    fn watch(&self, collection: &str) -> LiveQuery;
}

#[derive(Default)]
struct Inner {
    network_enabled: bool,
    reachable: bool,
    last_timestamp: Option<DateTime<Utc>>,
    collections: HashMap<String, Vec<UvRecord>>,
    watchers: HashMap<String, Vec<mpsc::UnboundedSender<ChangeBatch>>>,
}

/// In-process document store.
pub struct MemoryStore {
    inner: Mutex<Inner>,
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryStore {
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(Inner {
                network_enabled: true,
                reachable: true,
                ..Inner::default()
            }),
        }
    }

    /// Simulate the backend going away (or coming back), independent of the
    /// client-side network switch.
    pub fn set_reachable(&self, reachable: bool) {
        self.inner.lock().reachable = reachable;
    }

    pub fn is_network_enabled(&self) -> bool {
        self.inner.lock().network_enabled
    }

    /// Records in a collection, newest first.
    pub fn records(&self, collection: &str) -> Vec<UvRecord> {
        let inner = self.inner.lock();
        let mut records = inner.collections.get(collection).cloned().unwrap_or_default();
        records.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
        records
    }

    /// Number of attached live queries on a collection.
    pub fn watcher_count(&self, collection: &str) -> usize {
        let mut inner = self.inner.lock();
        match inner.watchers.get_mut(collection) {
            Some(senders) => {
                senders.retain(|tx| !tx.is_closed());
                senders.len()
            }
            None => 0,
        }
    }

    /// Server timestamps are strictly increasing.
    fn next_timestamp(inner: &mut Inner) -> DateTime<Utc> {
        let now = Utc::now();
        let ts = match inner.last_timestamp {
            Some(last) if now <= last => last + ChronoDuration::microseconds(1),
            _ => now,
        };
        inner.last_timestamp = Some(ts);
        ts
    }

    fn notify(inner: &mut Inner, collection: &str, batch: ChangeBatch) {
        if let Some(senders) = inner.watchers.get_mut(collection) {
            senders.retain(|tx| tx.send(batch.clone()).is_ok());
        }
    }
}

#[async_trait]
impl NetworkToggle for MemoryStore {
    async fn enable_network(&self) -> Result<(), AppError> {
        self.inner.lock().network_enabled = true;
        Ok(())
    }

    async fn disable_network(&self) -> Result<(), AppError> {
        self.inner.lock().network_enabled = false;
        tracing::debug!("Memory store network disabled");
        Ok(())
    }
}

#[async_trait]
impl DocumentStore for MemoryStore {
    async fn create(&self, collection: &str, record: NewUvRecord) -> Result<String, AppError> {
        let mut inner = self.inner.lock();

        if !inner.network_enabled {
            return Err(AppError::StoreUnavailable("client network is disabled".into()));
        }
        if !inner.reachable {
            return Err(AppError::StoreUnavailable("backend unreachable".into()));
        }

        let id = uuid::Uuid::new_v4().simple().to_string();
        let timestamp = Self::next_timestamp(&mut inner);
        let stored = UvRecord::from_new(id.clone(), timestamp, record);

        inner
            .collections
            .entry(collection.to_string())
            .or_default()
            .push(stored.clone());
        Self::notify(&mut inner, collection, vec![DocumentChange::added(stored)]);

        Ok(id)
    }

    fn watch(&self, collection: &str) -> LiveQuery {
        let (tx, rx) = mpsc::unbounded_channel();
        let mut inner = self.inner.lock();

        let mut snapshot: Vec<UvRecord> =
            inner.collections.get(collection).cloned().unwrap_or_default();
        if !snapshot.is_empty() {
            snapshot.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
            let batch = snapshot.into_iter().map(DocumentChange::added).collect();
            // Receiver is alive, cannot fail
            let _ = tx.send(batch);
        }

        inner
            .watchers
            .entry(collection.to_string())
            .or_default()
            .push(tx);
        rx
    }
}
