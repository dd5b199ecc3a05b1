//! Online/offline state shared by every remote operation.
//!
//! One `ConnectionState` is constructed per app (or per test) and handed to
//! the executor and the services by `Arc`. Listeners are notified
//! synchronously on every status update.

use std::collections::BTreeMap;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::{Arc, Weak};

use parking_lot::Mutex;

/// Default number of failures tolerated before going offline
pub const DEFAULT_MAX_RETRIES: u32 = 3;

type Listener = Arc<dyn Fn(bool) + Send + Sync>;

#[derive(Debug, Clone, Copy)]
struct Status {
    is_online: bool,
    retry_attempts: u32,
}

#[derive(Default)]
struct Listeners {
    next_id: u64,
    entries: BTreeMap<u64, Listener>,
}

/// Process-wide connectivity flag with a shared failure counter.
pub struct ConnectionState {
    status: Mutex<Status>,
    max_retries: u32,
    listeners: Arc<Mutex<Listeners>>,
}

impl std::fmt::Debug for ConnectionState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let status = *self.status.lock();
        f.debug_struct("ConnectionState")
            .field("is_online", &status.is_online)
            .field("retry_attempts", &status.retry_attempts)
            .field("max_retries", &self.max_retries)
            .field("listeners", &self.listener_count())
            .finish()
    }
}

impl Default for ConnectionState {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_RETRIES)
    }
}

impl ConnectionState {
    /// Starts online with no recorded failures.
    pub fn new(max_retries: u32) -> Self {
        Self {
            status: Mutex::new(Status {
                is_online: true,
                retry_attempts: 0,
            }),
            max_retries,
            listeners: Arc::new(Mutex::new(Listeners::default())),
        }
    }

    pub fn is_online(&self) -> bool {
        self.status.lock().is_online
    }

    pub fn retry_attempts(&self) -> u32 {
        self.status.lock().retry_attempts
    }

    pub fn max_retries(&self) -> u32 {
        self.max_retries
    }

    /// Set the online flag and notify every listener with the new value.
    ///
    /// Going online resets the failure counter. A panicking listener is
    /// logged and skipped; the remaining listeners are still called.
    pub fn set_online_status(&self, online: bool) {
        {
            let mut status = self.status.lock();
            let was_online = status.is_online;
            status.is_online = online;
            if online {
                status.retry_attempts = 0;
            }
            if was_online != online {
                tracing::info!(online, "Connection status changed");
            }
        }

        // Snapshot so listeners may subscribe/unsubscribe while being notified
        let snapshot: Vec<Listener> = self.listeners.lock().entries.values().cloned().collect();
        for listener in snapshot {
            if catch_unwind(AssertUnwindSafe(|| listener(online))).is_err() {
                tracing::error!("Connection listener panicked; continuing notification");
            }
        }
    }

    /// Count one failed attempt and return the updated counter.
    pub fn record_failure(&self) -> u32 {
        let mut status = self.status.lock();
        status.retry_attempts = status.retry_attempts.saturating_add(1);
        status.retry_attempts
    }

    /// Register a listener. It stays registered until the returned
    /// `Subscription` is dropped or unsubscribed.
    #[must_use = "dropping the subscription unsubscribes immediately"]
    pub fn subscribe<F>(&self, listener: F) -> Subscription
    where
        F: Fn(bool) + Send + Sync + 'static,
    {
        let mut listeners = self.listeners.lock();
        let id = listeners.next_id;
        listeners.next_id += 1;
        listeners.entries.insert(id, Arc::new(listener));

        Subscription {
            id,
            listeners: Arc::downgrade(&self.listeners),
        }
    }

    pub fn listener_count(&self) -> usize {
        self.listeners.lock().entries.len()
    }
}

/// Handle returned by [`ConnectionState::subscribe`].
pub struct Subscription {
    id: u64,
    listeners: Weak<Mutex<Listeners>>,
}

impl Subscription {
    pub fn unsubscribe(self) {
        // Drop does the work
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        if let Some(listeners) = self.listeners.upgrade() {
            listeners.lock().entries.remove(&self.id);
        }
    }
}
