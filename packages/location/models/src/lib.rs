#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Location, event and foot-traffic types shared across the hotspot map.
//!
//! The backend returns "hotspots" (natural points of interest with
//! traffic and demographic stats) and events in a single unified list.
//! [`UnifiedLocation`] models that list entry as a common
//! [`LocationBase`] plus a [`LocationDetails`] variant selected by the
//! `type` field, so consumers must match on the variant before reading
//! variant-specific fields.

pub mod de;
pub mod metrics;
pub mod time;
pub mod traffic;

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use strum_macros::{AsRefStr, Display, EnumString};

pub use metrics::DetailedMetrics;

/// Which variant of [`UnifiedLocation`] a value is.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    AsRefStr,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum LocationKind {
    /// A hotspot: a non-event point of interest.
    Natural,
    /// A scheduled event at a venue.
    Event,
}

impl LocationKind {
    /// Path segment used by the per-id API endpoints
    /// (`/api/locations/{id}/...` vs `/api/events/{id}/...`).
    #[must_use]
    pub const fn api_segment(self) -> &'static str {
        match self {
            Self::Natural => "locations",
            Self::Event => "events",
        }
    }
}

/// Coarse traffic level reported for a location.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    AsRefStr,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum TrafficLevel {
    /// Heavy traffic.
    High,
    /// Moderate traffic.
    Medium,
    /// Light traffic.
    Low,
}

/// Weather condition reported for a location.
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
pub enum WeatherType {
    /// Clear sky.
    Sunny,
    /// Overcast.
    Clouded,
    /// Rain.
    Rainy,
    /// Snow.
    Snowy,
}

/// Aggregation window the location list is requested for.
#[derive(
    Debug,
    Clone,
    Copy,
    Default,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    AsRefStr,
)]
#[serde(rename_all = "kebab-case")]
#[strum(serialize_all = "kebab-case")]
pub enum TimePeriod {
    /// A single hour, selected with the timeline slider.
    #[default]
    RealTime,
    /// Whole-day aggregate.
    Daily,
    /// Week aggregate.
    Weekly,
    /// Month aggregate.
    Monthly,
}

impl TimePeriod {
    /// Whether the timeline slider hour is significant for this period.
    #[must_use]
    pub const fn uses_hour(self) -> bool {
        matches!(self, Self::RealTime)
    }
}

/// Position of the timeline slider as percentages over a 24-hour clock.
///
/// `0` maps to 00:00 and `100` to the end of the day. Only `start`
/// drives data loading; `end` is kept for display.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TimelineRange {
    /// Slider start, `0.0..=100.0`.
    pub start: f64,
    /// Slider end, `0.0..=100.0`.
    pub end: f64,
}

impl TimelineRange {
    /// Width of the initial window opened ahead of the current hour.
    pub const DEFAULT_SPAN: f64 = 25.0;

    /// Creates a range starting at `hour`, extending
    /// [`Self::DEFAULT_SPAN`] percent ahead (capped at 100).
    #[must_use]
    pub fn at_hour(hour: u8) -> Self {
        let start = (f64::from(hour) / 24.0 * 100.0).round();
        Self {
            start,
            end: (start + Self::DEFAULT_SPAN).min(100.0),
        }
    }

    /// The hour (`0..=23`) selected by the slider start.
    ///
    /// Computed as `round(start / 100 * 24)`, clamped so that a slider
    /// pinned to the far right still selects 23:00.
    #[must_use]
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    pub fn hour(&self) -> u8 {
        let hour = (self.start / 100.0 * 24.0).round();
        if hour.is_nan() {
            return 0;
        }
        hour.clamp(0.0, 23.0) as u8
    }
}

/// A `[longitude, latitude]` pair.
///
/// Accepts `[lng, lat]` arrays and `{ "longitude", "latitude" }` objects
/// (also `lng`/`lon`/`lat`), with either numeric or string components.
/// Components that cannot be parsed become `NaN`; check
/// [`Coordinates::is_valid`] before using them.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Coordinates {
    /// Longitude (WGS84).
    pub longitude: f64,
    /// Latitude (WGS84).
    pub latitude: f64,
}

impl Coordinates {
    /// Creates a coordinate pair.
    #[must_use]
    pub const fn new(longitude: f64, latitude: f64) -> Self {
        Self {
            longitude,
            latitude,
        }
    }

    /// Whether both components are finite and within WGS84 bounds.
    #[must_use]
    pub fn is_valid(&self) -> bool {
        self.longitude.is_finite()
            && self.latitude.is_finite()
            && (-180.0..=180.0).contains(&self.longitude)
            && (-90.0..=90.0).contains(&self.latitude)
    }
}

impl Serialize for Coordinates {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        [self.longitude, self.latitude].serialize(serializer)
    }
}

#[derive(Deserialize)]
struct LenientF64(#[serde(deserialize_with = "de::f64_or_nan")] f64);

#[derive(Deserialize)]
#[serde(untagged)]
enum RawCoordinates {
    Pair(LenientF64, LenientF64),
    Object {
        #[serde(alias = "lng", alias = "lon")]
        longitude: LenientF64,
        #[serde(alias = "lat")]
        latitude: LenientF64,
    },
}

impl<'de> Deserialize<'de> for Coordinates {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        Ok(match RawCoordinates::deserialize(deserializer)? {
            RawCoordinates::Pair(lng, lat) => Self::new(lng.0, lat.0),
            RawCoordinates::Object {
                longitude,
                latitude,
            } => Self::new(longitude.0, latitude.0),
        })
    }
}

/// Whether a foot-traffic sample is observed, current, or forecast.
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
pub enum FootTrafficKind {
    /// Observed in an earlier hour.
    Past,
    /// The hour currently selected.
    Current,
    /// Forecast for a later hour.
    Predicted,
}

/// One hourly visitor-count sample.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FootTrafficPoint {
    /// Hour of day, `0..=23`.
    #[serde(deserialize_with = "de::hour")]
    pub hour: u8,
    /// Visitor count (or relative intensity).
    pub value: f64,
    /// Segment of the series this sample belongs to.
    #[serde(rename = "type")]
    pub kind: FootTrafficKind,
}

/// Fields shared by hotspots and events.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LocationBase {
    /// Identifier, unique within one fetch response.
    #[serde(deserialize_with = "de::string")]
    pub id: String,
    /// Display label.
    #[serde(default, deserialize_with = "de::string", alias = "name")]
    pub label: String,
    /// Street address.
    #[serde(default, deserialize_with = "de::opt_string", skip_serializing_if = "Option::is_none")]
    pub address: Option<String>,
    /// Map position.
    pub coordinates: Coordinates,
    /// Traffic level, if reported and recognised.
    #[serde(
        default,
        alias = "traffic_level",
        deserialize_with = "de::opt_enum",
        skip_serializing_if = "Option::is_none"
    )]
    pub traffic_level: Option<TrafficLevel>,
    /// Weather, if reported and recognised.
    #[serde(
        default,
        deserialize_with = "de::opt_enum",
        skip_serializing_if = "Option::is_none"
    )]
    pub weather: Option<WeatherType>,
    /// Hourly foot-traffic series embedded in the location payload.
    #[serde(default, alias = "foot_traffic", skip_serializing_if = "Option::is_none")]
    pub foot_traffic: Option<Vec<FootTrafficPoint>>,
}

/// Stats attached to a hotspot. All free-form strings.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NaturalDetails {
    #[serde(default, deserialize_with = "de::opt_string", skip_serializing_if = "Option::is_none")]
    pub population: Option<String>,
    #[serde(
        default,
        alias = "area_type",
        deserialize_with = "de::opt_string",
        skip_serializing_if = "Option::is_none"
    )]
    pub area_type: Option<String>,
    #[serde(
        default,
        alias = "peak_hour",
        deserialize_with = "de::opt_string",
        skip_serializing_if = "Option::is_none"
    )]
    pub peak_hour: Option<String>,
    #[serde(
        default,
        alias = "avg_daily_traffic",
        deserialize_with = "de::opt_string",
        skip_serializing_if = "Option::is_none"
    )]
    pub avg_daily_traffic: Option<String>,
    #[serde(
        default,
        alias = "dominant_demographics",
        deserialize_with = "de::opt_string",
        skip_serializing_if = "Option::is_none"
    )]
    pub dominant_demographics: Option<String>,
    #[serde(
        default,
        alias = "nearby_businesses",
        deserialize_with = "de::opt_string",
        skip_serializing_if = "Option::is_none"
    )]
    pub nearby_businesses: Option<String>,
}

/// Schedule and audience data attached to an event.
///
/// `start_time`/`end_time` are kept as received; use
/// [`EventDetails::start`] and [`EventDetails::end`] to parse them in
/// the event's own UTC offset.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EventDetails {
    #[serde(
        default,
        alias = "event_name",
        deserialize_with = "de::opt_string",
        skip_serializing_if = "Option::is_none"
    )]
    pub event_name: Option<String>,
    #[serde(
        default,
        alias = "place",
        deserialize_with = "de::opt_string",
        skip_serializing_if = "Option::is_none"
    )]
    pub venue: Option<String>,
    #[serde(
        default,
        alias = "start_time",
        deserialize_with = "de::opt_string",
        skip_serializing_if = "Option::is_none"
    )]
    pub start_time: Option<String>,
    #[serde(
        default,
        alias = "end_time",
        deserialize_with = "de::opt_string",
        skip_serializing_if = "Option::is_none"
    )]
    pub end_time: Option<String>,
    #[serde(default, deserialize_with = "de::opt_u32", skip_serializing_if = "Option::is_none")]
    pub capacity: Option<u32>,
    #[serde(
        default,
        alias = "expected_attendance",
        deserialize_with = "de::opt_u32",
        skip_serializing_if = "Option::is_none"
    )]
    pub expected_attendance: Option<u32>,
    #[serde(default, deserialize_with = "de::opt_string", skip_serializing_if = "Option::is_none")]
    pub demographics: Option<String>,
    /// Pre-formatted duration supplied by the backend, used when the
    /// timestamps cannot be parsed.
    #[serde(default, deserialize_with = "de::opt_string", skip_serializing_if = "Option::is_none")]
    pub duration: Option<String>,
    #[serde(default, deserialize_with = "de::opt_u32", skip_serializing_if = "Option::is_none")]
    pub score: Option<u32>,
}

impl EventDetails {
    /// Parses `start_time` in its embedded offset.
    ///
    /// # Errors
    ///
    /// Returns [`time::TimeParseError`] if the timestamp is malformed.
    pub fn start(&self) -> Result<Option<chrono::DateTime<chrono::FixedOffset>>, time::TimeParseError> {
        self.start_time.as_deref().map(time::parse_event_time).transpose()
    }

    /// Parses `end_time` in its embedded offset.
    ///
    /// # Errors
    ///
    /// Returns [`time::TimeParseError`] if the timestamp is malformed.
    pub fn end(&self) -> Result<Option<chrono::DateTime<chrono::FixedOffset>>, time::TimeParseError> {
        self.end_time.as_deref().map(time::parse_event_time).transpose()
    }

    /// Human-readable duration such as `1h 30m`.
    ///
    /// Computed from the timestamps when both parse, otherwise the
    /// backend-provided `duration` string.
    #[must_use]
    pub fn display_duration(&self) -> Option<String> {
        match (self.start(), self.end()) {
            (Ok(Some(start)), Ok(Some(end))) => Some(time::format_duration(&start, &end)),
            _ => self.duration.clone(),
        }
    }

    /// `HH:MM - HH:MM` in the event's own offset.
    #[must_use]
    pub fn display_time_range(&self) -> Option<String> {
        match (self.start(), self.end()) {
            (Ok(Some(start)), Ok(Some(end))) => Some(time::format_time_range(&start, &end)),
            _ => None,
        }
    }

    /// `Wed, 26/03 17:30 - 27/03 02:00` in the event's own offset.
    #[must_use]
    pub fn display_date_range(&self) -> Option<String> {
        match (self.start(), self.end()) {
            (Ok(Some(start)), Ok(Some(end))) => Some(time::format_date_range(&start, &end)),
            _ => None,
        }
    }

    #[must_use]
    pub fn score_category(&self) -> Option<time::ScoreCategory> {
        self.score.map(|score| time::ScoreCategory::from_score(f64::from(score)))
    }
}

/// Variant-specific data, selected by the `type` discriminant.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum LocationDetails {
    /// Hotspot stats.
    Natural(NaturalDetails),
    /// Event schedule and audience.
    Event(EventDetails),
}

/// A hotspot or event as shown on the map.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UnifiedLocation {
    /// Shared fields.
    #[serde(flatten)]
    pub base: LocationBase,
    /// Variant-specific fields.
    #[serde(flatten)]
    pub details: LocationDetails,
}

impl UnifiedLocation {
    /// The location id.
    #[must_use]
    pub fn id(&self) -> &str {
        &self.base.id
    }

    /// Which variant this location is.
    #[must_use]
    pub const fn kind(&self) -> LocationKind {
        match self.details {
            LocationDetails::Natural(_) => LocationKind::Natural,
            LocationDetails::Event(_) => LocationKind::Event,
        }
    }

    /// Event details, if this is an event.
    #[must_use]
    pub const fn as_event(&self) -> Option<&EventDetails> {
        match &self.details {
            LocationDetails::Event(event) => Some(event),
            LocationDetails::Natural(_) => None,
        }
    }

    /// Hotspot details, if this is a hotspot.
    #[must_use]
    pub const fn as_natural(&self) -> Option<&NaturalDetails> {
        match &self.details {
            LocationDetails::Natural(natural) => Some(natural),
            LocationDetails::Event(_) => None,
        }
    }

    /// Best display name: the event name for events, else the label.
    #[must_use]
    pub fn display_name(&self) -> &str {
        self.as_event()
            .and_then(|e| e.event_name.as_deref())
            .unwrap_or(&self.base.label)
    }
}
