//! UV exposure records as persisted in the remote store.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoPoint {
    pub latitude: f64,
    pub longitude: f64,
}

/// Whether the write happened while the app believed it was online.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SyncStatus {
    Synced,
    Pending,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecordMetadata {
    pub status: SyncStatus,
    pub retry_count: u32,
    /// RFC 3339 client-side creation time
    pub created_at: String,
}

/// Record body sent to the store; id and timestamp are assigned remotely.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewUvRecord {
    pub uv_index: f64,
    pub risk_level: String,
    pub location: GeoPoint,
    #[serde(rename = "_metadata")]
    pub metadata: RecordMetadata,
}

/// A stored UV record. Never mutated after creation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UvRecord {
    pub id: String,
    pub uv_index: f64,
    pub risk_level: String,
    pub location: GeoPoint,
    pub timestamp: DateTime<Utc>,
    #[serde(rename = "_metadata")]
    pub metadata: RecordMetadata,
}

impl UvRecord {
    pub fn from_new(id: String, timestamp: DateTime<Utc>, record: NewUvRecord) -> Self {
        Self {
            id,
            uv_index: record.uv_index,
            risk_level: record.risk_level,
            location: record.location,
            timestamp,
            metadata: record.metadata,
        }
    }
}
