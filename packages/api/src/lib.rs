#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! HTTP client for the hotspot map backend.
//!
//! Every endpoint the map consumes is exposed through the [`HotspotApi`]
//! trait so caches and stores can be exercised with an in-memory fake.
//! [`client::ApiClient`] is the `reqwest` implementation.
//!
//! Non-2xx responses are always errors. There is no shared retry or
//! backoff: callers decide per lookup whether to propagate or substitute
//! a default. The low-value lookups (map center, business locations,
//! business analysis) have `*_or_default` wrappers that log and fall
//! back to the values in [`fallback`].

pub mod client;
pub mod config;
pub mod fallback;

use chrono::NaiveDate;
use hotspot_map_api_models::{
    BusinessLocation, BusinessPreferences, LlmSummaryRequest, LocationQuery, LocationsPayload,
};
use hotspot_map_location_models::traffic::TrafficSnapshot;
use hotspot_map_location_models::{
    Coordinates, DetailedMetrics, FootTrafficPoint, LocationKind, TimePeriod,
};
use thiserror::Error;

pub use client::ApiClient;
pub use config::ApiConfig;

/// Errors from backend API calls.
#[derive(Debug, Error)]
pub enum ApiError {
    /// The request could not be sent or the body could not be read.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// The server answered with a non-2xx status.
    #[error("HTTP {status} from {url}")]
    Status {
        /// Response status.
        status: reqwest::StatusCode,
        /// Requested URL.
        url: String,
    },

    /// The body was not valid JSON or did not match the expected types.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// The body was JSON but not in any accepted shape.
    #[error("Malformed response: {message}")]
    Malformed {
        /// What was wrong with the response.
        message: String,
    },

    /// Coordinates in the response were missing, `NaN`, or out of range.
    #[error("Invalid coordinates in {context}")]
    InvalidCoordinates {
        /// What the coordinates belonged to.
        context: String,
    },

    /// The configured base URL cannot be used to build endpoint URLs.
    #[error("Invalid API base URL: {url}")]
    InvalidBaseUrl {
        /// The configured value.
        url: String,
    },
}

/// The backend endpoints consumed by the map.
#[async_trait::async_trait]
pub trait HotspotApi: Send + Sync {
    /// `GET /api/locations` for one date (and hour, in real-time mode).
    ///
    /// # Errors
    ///
    /// Returns [`ApiError`] on network failure, non-2xx status, or a
    /// response in neither the current nor the legacy shape.
    async fn fetch_locations(&self, query: &LocationQuery) -> Result<LocationsPayload, ApiError>;

    /// `GET /api/{locations|events}/{id}/detailed-metrics`.
    ///
    /// # Errors
    ///
    /// Returns [`ApiError`] on network failure, non-2xx status, or a
    /// non-object body.
    async fn fetch_detailed_metrics(
        &self,
        id: &str,
        kind: LocationKind,
    ) -> Result<DetailedMetrics, ApiError>;

    /// `GET /api/{locations|events}/{id}/foot-traffic`.
    ///
    /// Deprecated upstream: foot traffic is now embedded in location
    /// payloads. Only used when a location arrives without it.
    ///
    /// # Errors
    ///
    /// Returns [`ApiError`] on network failure, non-2xx status, or an
    /// unparseable series.
    async fn fetch_foot_traffic(
        &self,
        id: &str,
        kind: LocationKind,
        hour: Option<u8>,
    ) -> Result<Vec<FootTrafficPoint>, ApiError>;

    /// Traffic lines and points for one date and hour.
    ///
    /// The backend serves traffic through the combined locations
    /// endpoint, so the default implementation issues a real-time
    /// locations request and keeps only the embedded snapshot. A
    /// response without traffic yields an empty snapshot.
    ///
    /// # Errors
    ///
    /// Returns [`ApiError`] if the locations request fails.
    async fn fetch_traffic(&self, date: NaiveDate, hour: u8) -> Result<TrafficSnapshot, ApiError> {
        let query = LocationQuery {
            time_period: TimePeriod::RealTime,
            date,
            hour: Some(hour),
        };
        let payload = self.fetch_locations(&query).await?;
        Ok(payload
            .traffic
            .unwrap_or_else(|| TrafficSnapshot::new(None, None)))
    }

    /// `GET /api/business-locations`.
    ///
    /// # Errors
    ///
    /// Returns [`ApiError`] on network failure, non-2xx status, or an
    /// unparseable list.
    async fn fetch_business_locations(&self) -> Result<Vec<BusinessLocation>, ApiError>;

    /// `GET /api/tampere-center`.
    ///
    /// # Errors
    ///
    /// Returns [`ApiError`] on network failure, non-2xx status, or
    /// invalid coordinates.
    async fn fetch_map_center(&self) -> Result<Coordinates, ApiError>;

    /// `POST /api/analyze-business`.
    ///
    /// # Errors
    ///
    /// Returns [`ApiError`] on network failure, non-2xx status, or an
    /// unparseable body.
    async fn analyze_business(&self, text: &str) -> Result<BusinessPreferences, ApiError>;

    /// `POST /api/llm-summary`, returning the summary text.
    ///
    /// # Errors
    ///
    /// Returns [`ApiError`] on network failure, non-2xx status, or a body
    /// without a `summary` string.
    async fn llm_summary(&self, request: &LlmSummaryRequest) -> Result<String, ApiError>;
}

/// Map center, or the hardcoded city center if the lookup fails.
pub async fn map_center_or_default(api: &dyn HotspotApi) -> Coordinates {
    match api.fetch_map_center().await {
        Ok(center) => center,
        Err(e) => {
            log::warn!("Failed to fetch map center, using default: {e}");
            fallback::DEFAULT_CENTER
        }
    }
}

/// Business locations, or the hardcoded list if the lookup fails.
pub async fn business_locations_or_default(api: &dyn HotspotApi) -> Vec<BusinessLocation> {
    match api.fetch_business_locations().await {
        Ok(locations) => locations,
        Err(e) => {
            log::warn!("Failed to fetch business locations, using defaults: {e}");
            fallback::business_locations()
        }
    }
}

/// Business analysis, or a generic preference set if the analyzer fails.
pub async fn analyze_business_or_default(api: &dyn HotspotApi, text: &str) -> BusinessPreferences {
    match api.analyze_business(text).await {
        Ok(preferences) => preferences,
        Err(e) => {
            log::warn!("Business analysis failed, using default preferences: {e}");
            fallback::business_preferences()
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use super::*;

    /// Fails every call except `fetch_locations`, which returns the
    /// configured payload and records the query.
    struct Stub {
        payload: Option<LocationsPayload>,
        queries: Mutex<Vec<LocationQuery>>,
    }

    impl Stub {
        fn failing() -> Self {
            Self {
                payload: None,
                queries: Mutex::new(Vec::new()),
            }
        }
    }

    fn unavailable() -> ApiError {
        ApiError::Malformed {
            message: "unavailable".to_string(),
        }
    }

    #[async_trait::async_trait]
    impl HotspotApi for Stub {
        async fn fetch_locations(&self, query: &LocationQuery) -> Result<LocationsPayload, ApiError> {
            self.queries.lock().unwrap().push(*query);
            self.payload.clone().ok_or_else(unavailable)
        }

        async fn fetch_detailed_metrics(
            &self,
            _id: &str,
            _kind: LocationKind,
        ) -> Result<DetailedMetrics, ApiError> {
            Err(unavailable())
        }

        async fn fetch_foot_traffic(
            &self,
            _id: &str,
            _kind: LocationKind,
            _hour: Option<u8>,
        ) -> Result<Vec<FootTrafficPoint>, ApiError> {
            Err(unavailable())
        }

        async fn fetch_business_locations(&self) -> Result<Vec<BusinessLocation>, ApiError> {
            Err(unavailable())
        }

        async fn fetch_map_center(&self) -> Result<Coordinates, ApiError> {
            Err(unavailable())
        }

        async fn analyze_business(&self, _text: &str) -> Result<BusinessPreferences, ApiError> {
            Err(unavailable())
        }

        async fn llm_summary(&self, _request: &LlmSummaryRequest) -> Result<String, ApiError> {
            Err(unavailable())
        }
    }

    #[tokio::test]
    async fn low_value_lookups_fall_back() {
        let api = Stub::failing();
        assert_eq!(map_center_or_default(&api).await, fallback::DEFAULT_CENTER);
        assert_eq!(
            business_locations_or_default(&api).await,
            fallback::business_locations()
        );
        assert_eq!(
            analyze_business_or_default(&api, "bakery").await,
            fallback::business_preferences()
        );
    }

    #[tokio::test]
    async fn traffic_uses_real_time_locations_query() {
        let api = Stub {
            payload: Some(LocationsPayload {
                locations: Vec::new(),
                dropped: 0,
                traffic: None,
            }),
            queries: Mutex::new(Vec::new()),
        };
        let date = NaiveDate::from_ymd_opt(2025, 3, 26).unwrap();
        let snapshot = api.fetch_traffic(date, 12).await.unwrap();
        assert!(snapshot.is_empty());

        let queries = api.queries.lock().unwrap();
        assert_eq!(queries.len(), 1);
        assert_eq!(queries[0].time_period, TimePeriod::RealTime);
        assert_eq!(queries[0].hour, Some(12));
    }

    #[tokio::test]
    async fn traffic_propagates_locations_failure() {
        let api = Stub::failing();
        let date = NaiveDate::from_ymd_opt(2025, 3, 26).unwrap();
        assert!(api.fetch_traffic(date, 8).await.is_err());
    }
}
