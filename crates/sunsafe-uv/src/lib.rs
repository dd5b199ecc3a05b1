//! UV index service for Sunsafe
//!
//! Provides UV lookups via the OpenUV API with per-coordinate caching,
//! risk banding and a geolocation boundary.

pub mod cache;
pub mod location;
pub mod provider;
pub mod risk;
pub mod types;

pub use cache::RequestCache;
pub use location::{current_coordinate, FixedLocation, Fix, LocationProvider};
pub use provider::{ClientSettings, SurveyPoint, UvClient};
pub use risk::{risk_color, safety_tips, RiskLevel};
pub use types::*;
