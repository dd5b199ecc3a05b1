//! Persistence of UV readings and the history view over them.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use sunsafe_core::{AppError, BackoffConfig, ConnectionState, HistoryConfig, ResilientExecutor};
use sunsafe_uv::UvResponse;

use crate::history::HistoryFeed;
use crate::record::{GeoPoint, NewUvRecord, RecordMetadata, SyncStatus};
use crate::store::DocumentStore;
use crate::write_queue::WriteQueue;

/// UV exposure history backed by a document store.
///
/// Writes go through a [`WriteQueue`] whose executor toggles the store's own
/// network switch, sharing the app's [`ConnectionState`].
pub struct UvHistory<S> {
    store: Arc<S>,
    state: Arc<ConnectionState>,
    queue: WriteQueue<String>,
    collection: String,
    flush_interval: Duration,
}

impl<S> UvHistory<S>
where
    S: DocumentStore + 'static,
{
    /// Must be called from within a Tokio runtime.
    pub fn new(
        store: Arc<S>,
        state: Arc<ConnectionState>,
        backoff: BackoffConfig,
        config: &HistoryConfig,
    ) -> Self {
        let executor = ResilientExecutor::new(state.clone(), store.clone(), backoff);

        Self {
            store,
            state,
            queue: WriteQueue::new(executor),
            collection: config.collection.clone(),
            flush_interval: config.flush_interval(),
        }
    }

    pub fn connection(&self) -> &Arc<ConnectionState> {
        &self.state
    }

    pub fn collection(&self) -> &str {
        &self.collection
    }

    /// Persist a UV reading.
    ///
    /// Returns the stored record id, or `None` when the store was unavailable
    /// and the write was dropped.
    ///
    /// # Errors
    /// Any other terminal store failure.
    pub async fn save_uv_record(&self, data: &UvResponse) -> Result<Option<String>, AppError> {
        let key = format!(
            "uv-{}-{}-{}",
            data.lat,
            data.lng,
            Utc::now().timestamp_millis()
        );
        let uv_index = data.result.uv;
        let risk_level = data.result.uv_max_risk.clone();
        let location = GeoPoint {
            latitude: data.lat,
            longitude: data.lng,
        };

        let store = self.store.clone();
        let state = self.state.clone();
        let collection = self.collection.clone();
        let outcome = self
            .queue
            .add(key.clone(), move || {
                // Metadata reflects the connection at the moment of this attempt
                let status = if state.is_online() {
                    SyncStatus::Synced
                } else {
                    SyncStatus::Pending
                };
                let record = NewUvRecord {
                    uv_index,
                    risk_level: risk_level.clone(),
                    location,
                    metadata: RecordMetadata {
                        status,
                        retry_count: state.retry_attempts(),
                        created_at: Utc::now().to_rfc3339(),
                    },
                };
                let store = store.clone();
                let collection = collection.clone();
                async move { store.create(&collection, record).await }
            })
            .await;

        match &outcome {
            Ok(Some(id)) => tracing::info!("Saved UV record {} as {}", key, id),
            Ok(None) => tracing::info!("UV record {} not persisted, store unavailable", key),
            Err(e) => tracing::error!("Failed to save UV record {}: {}", key, e),
        }
        outcome
    }

    /// Live, debounced view of the stored history, newest first.
    pub fn subscribe_history(&self) -> HistoryFeed {
        HistoryFeed::subscribe(self.store.as_ref(), &self.collection, self.flush_interval)
    }
}
