//! Shared foundation for Sunsafe: configuration, error taxonomy and the
//! network-resilience envelope every remote call runs through.

pub mod config;
pub mod connection;
pub mod error;
pub mod retry;

pub use config::{Config, HistoryConfig, NetworkConfig, UvConfig, ValidationResult};
pub use connection::{ConnectionState, Subscription};
pub use error::{AppError, ConfigError, ReqwestErrorExt};
pub use retry::{BackoffConfig, NetworkToggle, NoopToggle, ResilientExecutor};

use anyhow::Result;

/// Initialize tracing/logging
pub fn init() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .try_init()
        .map_err(|e| anyhow::anyhow!("Failed to initialize tracing: {}", e))?;

    tracing::info!("Sunsafe core initialized");
    Ok(())
}
