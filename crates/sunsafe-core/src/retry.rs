//! Network-resilient execution of remote operations.
//!
//! Every remote call (UV lookups, store writes) goes through
//! [`ResilientExecutor::run`]. Failures are counted in the shared
//! [`ConnectionState`]; once the counter reaches `max_retries` the app is
//! flipped offline, the transport is disabled and the failure is returned.
//! Anything below that is retried after an exponential backoff.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;

use crate::connection::ConnectionState;
use crate::error::AppError;

/// Default backoff base, doubled per recorded failure
pub const DEFAULT_BACKOFF_BASE_MS: u64 = 100;
pub const DEFAULT_MAX_DELAY_MS: u64 = 5000;

/// Transport-level network switch (the remote store's own enable/disable).
#[async_trait]
pub trait NetworkToggle: Send + Sync {
    async fn enable_network(&self) -> Result<(), AppError>;
    async fn disable_network(&self) -> Result<(), AppError>;
}

/// Toggle for callers that have no transport to switch.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopToggle;

#[async_trait]
impl NetworkToggle for NoopToggle {
    async fn enable_network(&self) -> Result<(), AppError> {
        Ok(())
    }

    async fn disable_network(&self) -> Result<(), AppError> {
        Ok(())
    }
}

/// Backoff configuration
#[derive(Debug, Clone)]
pub struct BackoffConfig {
    /// Delay unit, multiplied by 2^attempt
    pub base_delay: Duration,
    /// Maximum delay between attempts
    pub max_delay: Duration,
}

impl Default for BackoffConfig {
    fn default() -> Self {
        Self {
            base_delay: Duration::from_millis(DEFAULT_BACKOFF_BASE_MS),
            max_delay: Duration::from_millis(DEFAULT_MAX_DELAY_MS),
        }
    }
}

impl BackoffConfig {
    pub fn new(base_delay: Duration) -> Self {
        Self {
            base_delay,
            ..Self::default()
        }
    }

    /// Delay after the given failure count: base * 2^attempt
    pub fn delay_for_attempt(&self, attempt: u32) -> Duration {
        let factor = 2u64.saturating_pow(attempt);
        let delay_ms = (self.base_delay.as_millis() as u64).saturating_mul(factor);
        let capped = delay_ms.min(self.max_delay.as_millis() as u64);
        Duration::from_millis(capped)
    }
}

/// Wraps remote operations with bounded retry and online/offline side effects.
#[derive(Clone)]
pub struct ResilientExecutor {
    state: Arc<ConnectionState>,
    transport: Arc<dyn NetworkToggle>,
    backoff: BackoffConfig,
}

impl std::fmt::Debug for ResilientExecutor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResilientExecutor")
            .field("state", &self.state)
            .field("backoff", &self.backoff)
            .finish_non_exhaustive()
    }
}

impl ResilientExecutor {
    pub fn new(
        state: Arc<ConnectionState>,
        transport: Arc<dyn NetworkToggle>,
        backoff: BackoffConfig,
    ) -> Self {
        Self {
            state,
            transport,
            backoff,
        }
    }

    pub fn state(&self) -> &Arc<ConnectionState> {
        &self.state
    }

    /// Run `operation` until it succeeds or the shared failure budget is spent.
    ///
    /// The counter is not reset on success; only an online transition on
    /// [`ConnectionState`] clears it.
    ///
    /// # Errors
    /// Returns the operation's last error once `max_retries` failures have
    /// been recorded.
    ///
    /// # Example
    /// ```ignore
    /// let body = executor.run(|| async { fetch().await }).await?;
    /// ```
    pub async fn run<F, Fut, T>(&self, mut operation: F) -> Result<T, AppError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, AppError>>,
    {
        loop {
            match self.attempt(&mut operation).await {
                Ok(value) => return Ok(value),
                Err(e) => {
                    let attempts = self.state.record_failure();

                    if attempts >= self.state.max_retries() {
                        tracing::error!(attempts, error = %e, "Retries exhausted, going offline");
                        self.state.set_online_status(false);
                        if let Err(disable_err) = self.transport.disable_network().await {
                            tracing::warn!("Failed to disable network: {}", disable_err);
                        }
                        return Err(e);
                    }

                    let delay = self.backoff.delay_for_attempt(attempts);
                    tracing::warn!(
                        "Attempt failed ({} of {}): {}; retrying in {:?}",
                        attempts,
                        self.state.max_retries(),
                        e,
                        delay
                    );
                    tokio::time::sleep(delay).await;
                }
            }
        }
    }

    async fn attempt<F, Fut, T>(&self, operation: &mut F) -> Result<T, AppError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, AppError>>,
    {
        if self.state.is_online() {
            self.transport.enable_network().await?;
        }
        operation().await
    }
}
