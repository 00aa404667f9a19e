//! Road-traffic snapshot types.
//!
//! A snapshot is two `GeoJSON` feature collections for the same date and
//! hour: road-segment lines carrying a `status` property, and a weighted
//! point cloud used for heatmap rendering.

use geojson::{Feature, FeatureCollection};
use serde::{Deserialize, Serialize};
use strum_macros::{AsRefStr, Display, EnumString};

/// Congestion status of a road segment.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    AsRefStr,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum TrafficStatus {
    /// Free-flowing.
    Available,
    /// Slowed.
    Moderate,
    /// Jammed.
    Congested,
}

impl TrafficStatus {
    /// Reads the `status` property of a line feature. Missing or
    /// unrecognised values yield `None`.
    #[must_use]
    pub fn of_feature(feature: &Feature) -> Option<Self> {
        feature
            .property("status")
            .and_then(serde_json::Value::as_str)
            .and_then(|s| s.trim().to_lowercase().parse().ok())
    }
}

/// Number of line segments per status.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StatusCounts {
    pub available: usize,
    pub moderate: usize,
    pub congested: usize,
    /// Segments without a recognised status.
    pub unknown: usize,
}

/// Traffic lines and points for one date and hour.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrafficSnapshot {
    /// Road segments.
    pub lines: FeatureCollection,
    /// Weighted points for heatmap rendering.
    pub points: FeatureCollection,
}

impl TrafficSnapshot {
    /// Builds a snapshot, substituting an empty collection for a missing
    /// dataset.
    #[must_use]
    pub fn new(lines: Option<FeatureCollection>, points: Option<FeatureCollection>) -> Self {
        Self {
            lines: lines.unwrap_or_else(empty_collection),
            points: points.unwrap_or_else(empty_collection),
        }
    }

    /// Whether neither dataset has any features.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.lines.features.is_empty() && self.points.features.is_empty()
    }

    /// Tallies line segments by [`TrafficStatus`].
    #[must_use]
    pub fn status_counts(&self) -> StatusCounts {
        self.lines
            .features
            .iter()
            .fold(StatusCounts::default(), |mut counts, feature| {
                match TrafficStatus::of_feature(feature) {
                    Some(TrafficStatus::Available) => counts.available += 1,
                    Some(TrafficStatus::Moderate) => counts.moderate += 1,
                    Some(TrafficStatus::Congested) => counts.congested += 1,
                    None => counts.unknown += 1,
                }
                counts
            })
    }
}

/// A feature collection with no features.
#[must_use]
pub const fn empty_collection() -> FeatureCollection {
    FeatureCollection {
        bbox: None,
        features: Vec::new(),
        foreign_members: None,
    }
}
