#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Request and response types for the hotspot map backend.
//!
//! These mirror the JSON contract of the `/api/*` endpoints and are kept
//! apart from the domain types in `hotspot_map_location_models` so the
//! wire format can evolve (the locations endpoint has already changed
//! from a bare array to an object once).

use chrono::NaiveDate;
use geojson::FeatureCollection;
use hotspot_map_location_models::traffic::TrafficSnapshot;
use hotspot_map_location_models::{
    Coordinates, DetailedMetrics, LocationKind, TimePeriod, TimelineRange, UnifiedLocation,
};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Parameters of `GET /api/locations`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct LocationQuery {
    /// Aggregation window.
    pub time_period: TimePeriod,
    /// Day to load.
    pub date: NaiveDate,
    /// Slider hour; only set for [`TimePeriod::RealTime`].
    pub hour: Option<u8>,
}

impl LocationQuery {
    /// Builds the query for a store state. The slider hour is dropped
    /// unless the period is real-time.
    #[must_use]
    pub fn new(time_period: TimePeriod, date: NaiveDate, timeline: &TimelineRange) -> Self {
        Self {
            time_period,
            date,
            hour: time_period.uses_hour().then(|| timeline.hour()),
        }
    }

    /// Query-string pairs, excluding the cache-busting parameter.
    #[must_use]
    pub fn to_pairs(&self) -> Vec<(&'static str, String)> {
        let mut pairs = vec![
            ("time_period", self.time_period.to_string()),
            ("date", self.date.format("%Y-%m-%d").to_string()),
        ];
        if let Some(hour) = self.hour {
            pairs.push(("time", hour.to_string()));
        }
        pairs
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum RawLocationsResponse {
    Current {
        locations: Vec<Value>,
        #[serde(default)]
        traffic_data: Option<Value>,
        #[serde(default)]
        traffic_points: Option<Value>,
    },
    Legacy(Vec<Value>),
}

/// Parsed body of `GET /api/locations`.
#[derive(Debug, Clone, PartialEq)]
pub struct LocationsPayload {
    /// Locations that parsed and have valid coordinates.
    pub locations: Vec<UnifiedLocation>,
    /// Number of entries dropped as malformed or mis-located.
    pub dropped: usize,
    /// Traffic snapshot embedded in the same response, if any.
    pub traffic: Option<TrafficSnapshot>,
}

impl LocationsPayload {
    /// Parses either the current `{ locations, traffic_data?, traffic_points? }`
    /// object or the legacy bare array.
    ///
    /// Individual entries that fail to parse or carry invalid
    /// coordinates are dropped with a warning rather than failing the
    /// whole response.
    ///
    /// # Errors
    ///
    /// Returns an error if the body is neither of the two accepted shapes.
    pub fn parse(body: Value) -> Result<Self, serde_json::Error> {
        let (raw_locations, traffic_data, traffic_points) = match serde_json::from_value(body)? {
            RawLocationsResponse::Current {
                locations,
                traffic_data,
                traffic_points,
            } => (locations, traffic_data, traffic_points),
            RawLocationsResponse::Legacy(locations) => {
                log::debug!("Locations response in legacy array format");
                (locations, None, None)
            }
        };

        let total = raw_locations.len();
        let locations: Vec<UnifiedLocation> = raw_locations
            .into_iter()
            .filter_map(|raw| match serde_json::from_value::<UnifiedLocation>(raw) {
                Ok(location) if location.base.coordinates.is_valid() => Some(location),
                Ok(location) => {
                    log::warn!(
                        "Dropping location {}: invalid coordinates {:?}",
                        location.id(),
                        location.base.coordinates
                    );
                    None
                }
                Err(e) => {
                    log::warn!("Dropping malformed location: {e}");
                    None
                }
            })
            .collect();

        let lines = traffic_data.and_then(|v| parse_collection("traffic_data", v));
        let points = traffic_points.and_then(|v| parse_collection("traffic_points", v));
        let traffic = (lines.is_some() || points.is_some())
            .then(|| TrafficSnapshot::new(lines, points));

        Ok(Self {
            dropped: total - locations.len(),
            locations,
            traffic,
        })
    }
}

fn parse_collection(field: &str, value: Value) -> Option<FeatureCollection> {
    if value.is_null() {
        return None;
    }
    serde_json::from_value(value)
        .map_err(|e| log::warn!("Ignoring malformed {field}: {e}"))
        .ok()
}

/// Body of `GET /api/business-locations` entries.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BusinessLocation {
    /// Identifier.
    #[serde(deserialize_with = "hotspot_map_location_models::de::string")]
    pub id: String,
    /// Business name.
    pub name: String,
    /// Business category (e.g. `cafe`).
    #[serde(
        default,
        deserialize_with = "hotspot_map_location_models::de::opt_string",
        skip_serializing_if = "Option::is_none"
    )]
    pub category: Option<String>,
    /// Map position.
    pub coordinates: Coordinates,
}

/// Body of `POST /api/analyze-business`.
#[derive(Debug, Clone, Serialize)]
pub struct AnalyzeBusinessRequest<'a> {
    /// Free-text description of the planned business.
    pub text: &'a str,
}

/// Structured preferences extracted from a business description.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BusinessPreferences {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub business_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target_audience: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub preferred_area: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub keywords: Vec<String>,
    /// Any other fields the analyzer returned.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Body of `POST /api/llm-summary`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LlmSummaryRequest {
    /// What the user wants to open, in their own words.
    pub business_requirement: String,
    /// Metrics of the location being summarised.
    pub metrics: DetailedMetrics,
    /// Hotspot or event.
    pub location_type: LocationKind,
    /// Extra prompt instructions.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub instructions: Option<String>,
}

/// Response of `POST /api/llm-summary`.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct LlmSummaryResponse {
    /// Generated summary text.
    pub summary: String,
}
