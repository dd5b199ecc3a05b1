//! Geolocation boundary. Acquiring a fix and prompting for permission are
//! handled by the platform; this module only turns a fix into a validated
//! coordinate.

use async_trait::async_trait;
use sunsafe_core::AppError;

use crate::types::Coordinate;

/// A position report from the platform location service.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Fix {
    pub latitude: f64,
    pub longitude: f64,
    pub permission_granted: bool,
}

#[async_trait]
pub trait LocationProvider: Send + Sync {
    async fn current_fix(&self) -> Result<Fix, AppError>;
}

/// Provider that always reports the same position (manual entry, tests).
#[derive(Debug, Clone, Copy)]
pub struct FixedLocation {
    fix: Fix,
}

impl FixedLocation {
    pub fn new(latitude: f64, longitude: f64) -> Self {
        Self {
            fix: Fix {
                latitude,
                longitude,
                permission_granted: true,
            },
        }
    }

    pub fn denied() -> Self {
        Self {
            fix: Fix {
                latitude: 0.0,
                longitude: 0.0,
                permission_granted: false,
            },
        }
    }
}

#[async_trait]
impl LocationProvider for FixedLocation {
    async fn current_fix(&self) -> Result<Fix, AppError> {
        Ok(self.fix)
    }
}

/// Validated coordinate of the current fix.
///
/// # Errors
/// `InvalidArgument` when permission was denied or the fix is out of range.
pub async fn current_coordinate(provider: &dyn LocationProvider) -> Result<Coordinate, AppError> {
    let fix = provider.current_fix().await?;
    if !fix.permission_granted {
        return Err(AppError::InvalidArgument(
            "Location permission denied".to_string(),
        ));
    }
    Coordinate::new(fix.latitude, fix.longitude)
}
