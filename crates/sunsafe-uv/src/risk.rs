//! UV index bands, their display colors and protection advice.

use serde::{Deserialize, Serialize};

/// Color shown when the index cannot be read
pub const UNKNOWN_COLOR: &str = "#9E9E9E";

/// Exposure risk band for a UV index
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RiskLevel {
    Low,
    Moderate,
    High,
    VeryHigh,
    Extreme,
}

impl RiskLevel {
    /// Band for a UV index (thresholds at 3, 6, 8 and 11).
    /// Returns `None` for NaN or infinite input.
    pub fn from_uv_index(uv_index: f64) -> Option<Self> {
        if !uv_index.is_finite() {
            return None;
        }
        Some(if uv_index < 3.0 {
            Self::Low
        } else if uv_index < 6.0 {
            Self::Moderate
        } else if uv_index < 8.0 {
            Self::High
        } else if uv_index < 11.0 {
            Self::VeryHigh
        } else {
            Self::Extreme
        })
    }

    pub fn label(&self) -> &'static str {
        match self {
            Self::Low => "Low",
            Self::Moderate => "Moderate",
            Self::High => "High",
            Self::VeryHigh => "Very High",
            Self::Extreme => "Extreme",
        }
    }

    /// Green, yellow, orange, red, violet
    pub fn color(&self) -> &'static str {
        match self {
            Self::Low => "#4CAF50",
            Self::Moderate => "#FFC107",
            Self::High => "#FF9800",
            Self::VeryHigh => "#F44336",
            Self::Extreme => "#673AB7",
        }
    }

    /// Protection advice. Very high and extreme share the same list.
    pub fn safety_tips(&self) -> &'static [&'static str] {
        match self {
            Self::Low => &[
                "Wear sunglasses on bright days",
                "Apply SPF 15+ if spending extended time outside",
                "Reflective surfaces like snow/water can double UV exposure",
            ],
            Self::Moderate => &[
                "Apply SPF 30+ sunscreen every 2 hours",
                "Wear a wide-brimmed hat",
                "Seek shade during midday hours",
                "Wear UV-protective clothing",
            ],
            Self::High => &[
                "Apply SPF 50+ sunscreen liberally",
                "Wear sunglasses with UV protection",
                "Limit sun exposure between 10am-4pm",
                "Use extra caution near water/snow",
            ],
            Self::VeryHigh | Self::Extreme => &[
                "Avoid sun exposure between 10am-4pm",
                "Apply SPF 50+ every 60-80 minutes",
                "Wear long sleeves and pants",
                "Seek shade constantly",
                "Wear a wide-brimmed hat and UV-blocking sunglasses",
            ],
        }
    }
}

/// Display color for a UV index; grey when the index is unreadable.
pub fn risk_color(uv_index: f64) -> &'static str {
    RiskLevel::from_uv_index(uv_index)
        .map(|level| level.color())
        .unwrap_or(UNKNOWN_COLOR)
}

/// Protection advice for a UV index; empty when the index is unreadable.
pub fn safety_tips(uv_index: f64) -> &'static [&'static str] {
    RiskLevel::from_uv_index(uv_index)
        .map(|level| level.safety_tips())
        .unwrap_or(&[])
}
