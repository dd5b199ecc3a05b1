//! Persistence services for Sunsafe: the document store seam, the
//! single-flight write queue and the debounced history feed.

pub mod history;
pub mod record;
pub mod store;
pub mod uv_history;
pub mod write_queue;

pub use history::{HistoryFeed, DEFAULT_FLUSH_INTERVAL};
pub use record::{GeoPoint, NewUvRecord, RecordMetadata, SyncStatus, UvRecord};
pub use store::{ChangeBatch, ChangeKind, DocumentChange, DocumentStore, LiveQuery, MemoryStore};
pub use uv_history::UvHistory;
pub use write_queue::{WriteHandle, WriteOutcome, WriteQueue};
