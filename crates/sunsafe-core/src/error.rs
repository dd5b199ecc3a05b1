//! Centralized error types for Sunsafe.
//!
//! This module provides a typed error hierarchy that:
//! - Classifies every failure the data-access layer can surface
//! - Provides user-friendly messages suitable for UI display
//! - Can be cloned, so callers sharing one in-flight write see the same outcome

use thiserror::Error;

/// Top-level error type for UV lookups and record persistence.
///
/// Use `user_message()` to get a UI-appropriate message.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum AppError {
    /// Bad input (coordinates out of range, denied location permission).
    /// Fails fast, never retried.
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// The client-side request timeout elapsed.
    #[error("Request timed out")]
    Timeout,

    /// The UV provider answered with a non-success status.
    #[error("{message}")]
    Provider { status: u16, message: String },

    /// The remote store reported itself unavailable.
    #[error("Store unavailable: {0}")]
    StoreUnavailable(String),

    /// Any other transport-level rejection.
    #[error("Transport failure: {0}")]
    Transport(String),

    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),
}

impl AppError {
    /// Returns a user-friendly message suitable for display in the UI.
    pub fn user_message(&self) -> &'static str {
        match self {
            AppError::InvalidArgument(_) => "Invalid location. Check your coordinates.",
            AppError::Timeout => "The request timed out. Please try again.",
            AppError::Provider { status, .. } if *status >= 500 => {
                "The UV service is experiencing issues. Please try again later."
            }
            AppError::Provider { .. } => "The UV service rejected the request.",
            AppError::StoreUnavailable(_) => "Saved locally. History will sync when back online.",
            AppError::Transport(_) => "Unable to connect. Check your internet connection.",
            AppError::Config(e) => e.user_message(),
        }
    }

    /// Whether the remote store classified this failure as "unavailable".
    pub fn is_store_unavailable(&self) -> bool {
        matches!(self, AppError::StoreUnavailable(_))
    }
}

/// Configuration errors.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ConfigError {
    #[error("Invalid configuration: {0}")]
    Invalid(String),

    #[error("Missing required setting: {0}")]
    MissingSetting(String),
}

impl ConfigError {
    pub fn user_message(&self) -> &'static str {
        match self {
            ConfigError::Invalid(_) => "Invalid configuration. Check your settings.",
            ConfigError::MissingSetting(_) => "A required setting is missing. Check your settings.",
        }
    }
}

/// Extension trait for converting reqwest errors to our error types.
pub trait ReqwestErrorExt {
    fn into_app_error(self) -> AppError;
}

impl ReqwestErrorExt for reqwest::Error {
    fn into_app_error(self) -> AppError {
        if self.is_timeout() {
            AppError::Timeout
        } else if let Some(status) = self.status() {
            AppError::Provider {
                status: status.as_u16(),
                message: format!("HTTP Error {}", status.as_u16()),
            }
        } else {
            AppError::Transport(self.to_string())
        }
    }
}
