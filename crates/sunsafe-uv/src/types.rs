use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};
use sunsafe_core::AppError;

/// Geographic coordinate, validated on construction.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinate {
    pub latitude: f64,
    pub longitude: f64,
}

impl Coordinate {
    /// Build a coordinate, rejecting non-finite or out-of-range components.
    pub fn new(latitude: f64, longitude: f64) -> Result<Self, AppError> {
        if !Self::is_valid(latitude, longitude) {
            return Err(AppError::InvalidArgument(format!(
                "Invalid coordinates provided: ({}, {})",
                latitude, longitude
            )));
        }
        Ok(Self {
            latitude,
            longitude,
        })
    }

    pub fn is_valid(latitude: f64, longitude: f64) -> bool {
        latitude.is_finite()
            && longitude.is_finite()
            && (-90.0..=90.0).contains(&latitude)
            && (-180.0..=180.0).contains(&longitude)
    }

    /// Quantized key: both components rounded to 4 decimals (~11m), ties
    /// away from zero.
    pub fn cache_key(&self) -> CacheKey {
        CacheKey(format!(
            "{:.4},{:.4}",
            quantize(self.latitude),
            quantize(self.longitude)
        ))
    }
}

/// Round to 4 decimals, half away from zero. Adding `0.0` folds `-0.0`
/// into `0.0` so both spellings of the origin share a key.
fn quantize(value: f64) -> f64 {
    (value * 1e4).round() / 1e4 + 0.0
}

/// Cache key derived from a [`Coordinate`]; nearby coordinates collide on purpose.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CacheKey(String);

impl CacheKey {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Fitzpatrick skin type, keyed `st1`..`st6` by the provider.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkinType {
    I,
    II,
    III,
    IV,
    V,
    VI,
}

impl SkinType {
    pub fn key(&self) -> &'static str {
        match self {
            Self::I => "st1",
            Self::II => "st2",
            Self::III => "st3",
            Self::IV => "st4",
            Self::V => "st5",
            Self::VI => "st6",
        }
    }
}

/// The `result` object of a UV lookup. Fields beyond the required ones are
/// kept verbatim in `extra`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UvResult {
    pub uv: f64,
    pub uv_max: f64,
    pub uv_max_risk: String,
    pub ozone: f64,
    /// Minutes to burn per skin type; the provider reports null when the sun is down
    #[serde(default)]
    pub safe_exposure_time: BTreeMap<String, Option<f64>>,
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

/// Raw provider body before the requesting coordinate is attached.
#[derive(Debug, Clone, Deserialize)]
pub(crate) struct ProviderPayload {
    pub result: UvResult,
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

impl ProviderPayload {
    pub(crate) fn attach(mut self, coordinate: Coordinate) -> UvResponse {
        self.extra.remove("lat");
        self.extra.remove("lng");
        UvResponse {
            result: self.result,
            lat: coordinate.latitude,
            lng: coordinate.longitude,
            extra: self.extra,
        }
    }
}

/// Provider payload plus the coordinate it was requested for.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UvResponse {
    pub result: UvResult,
    pub lat: f64,
    pub lng: f64,
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

impl UvResponse {
    pub fn coordinate(&self) -> Coordinate {
        Coordinate {
            latitude: self.lat,
            longitude: self.lng,
        }
    }

    pub fn uv_index(&self) -> f64 {
        self.result.uv
    }

    pub fn safe_exposure_minutes(&self, skin: SkinType) -> Option<f64> {
        self.result
            .safe_exposure_time
            .get(skin.key())
            .copied()
            .flatten()
    }
}
