//! `reqwest` implementation of [`HotspotApi`].
//!
//! Every request carries a `_=<unix millis>` query parameter so that
//! intermediate caches never serve a stale response. Bodies are read as
//! text first and then parsed, so a decode failure can be logged with a
//! preview of what the server actually sent.

use chrono::Utc;
use hotspot_map_api_models::{
    AnalyzeBusinessRequest, BusinessLocation, BusinessPreferences, LlmSummaryRequest,
    LlmSummaryResponse, LocationQuery, LocationsPayload,
};
use hotspot_map_location_models::{Coordinates, DetailedMetrics, FootTrafficPoint, LocationKind};
use reqwest::Url;
use serde::Serialize;
use serde_json::Value;

use crate::{ApiConfig, ApiError, HotspotApi};

/// Maximum length of the response body preview included in error logs.
const BODY_PREVIEW_LEN: usize = 300;

/// HTTP client for the backend.
#[derive(Debug, Clone)]
pub struct ApiClient {
    base_url: Url,
    client: reqwest::Client,
}

impl ApiClient {
    /// Creates a client for the configured backend.
    ///
    /// # Errors
    ///
    /// Returns [`ApiError::InvalidBaseUrl`] if the base URL does not parse
    /// or cannot carry a path, and [`ApiError::Http`] if the HTTP client
    /// cannot be built.
    pub fn new(config: &ApiConfig) -> Result<Self, ApiError> {
        let base_url = Url::parse(&config.base_url).map_err(|_| ApiError::InvalidBaseUrl {
            url: config.base_url.clone(),
        })?;
        if base_url.cannot_be_a_base() {
            return Err(ApiError::InvalidBaseUrl {
                url: config.base_url.clone(),
            });
        }

        let client = reqwest::Client::builder()
            .timeout(config.timeout())
            .build()?;

        Ok(Self { base_url, client })
    }

    /// Builds `{base}/api/{segments...}`, percent-encoding each segment.
    fn endpoint(&self, segments: &[&str]) -> Result<Url, ApiError> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|()| ApiError::InvalidBaseUrl {
                url: self.base_url.to_string(),
            })?
            .pop_if_empty()
            .push("api")
            .extend(segments);
        Ok(url)
    }

    async fn get_json(&self, url: Url, query: &[(&str, String)]) -> Result<Value, ApiError> {
        log::debug!("GET {url} {query:?}");
        let request = self
            .client
            .get(url)
            .query(query)
            .query(&[("_", cache_buster())]);
        read_json(request).await
    }

    async fn post_json<B: Serialize + Sync>(&self, url: Url, body: &B) -> Result<Value, ApiError> {
        log::debug!("POST {url}");
        let request = self
            .client
            .post(url)
            .query(&[("_", cache_buster())])
            .json(body);
        read_json(request).await
    }
}

fn cache_buster() -> String {
    Utc::now().timestamp_millis().to_string()
}

async fn read_json(request: reqwest::RequestBuilder) -> Result<Value, ApiError> {
    let response = request.send().await?;
    let url = response.url().to_string();
    let status = response.status();
    let text = response.text().await?;

    if !status.is_success() {
        log::debug!("HTTP {status} from {url}: {}", preview(&text));
        return Err(ApiError::Status { status, url });
    }

    serde_json::from_str(&text).map_err(|e| {
        log::warn!(
            "JSON parse failed for {url} ({} bytes): {e}\n  body preview: {}",
            text.len(),
            preview(&text)
        );
        ApiError::Json(e)
    })
}

fn preview(text: &str) -> &str {
    if text.len() <= BODY_PREVIEW_LEN {
        return text;
    }
    let mut end = BODY_PREVIEW_LEN;
    while !text.is_char_boundary(end) {
        end -= 1;
    }
    &text[..end]
}

#[async_trait::async_trait]
impl HotspotApi for ApiClient {
    async fn fetch_locations(&self, query: &LocationQuery) -> Result<LocationsPayload, ApiError> {
        let url = self.endpoint(&["locations"])?;
        let body = self.get_json(url, &query.to_pairs()).await?;
        let payload = LocationsPayload::parse(body)?;
        log::debug!(
            "Fetched {} locations ({} dropped, traffic embedded: {})",
            payload.locations.len(),
            payload.dropped,
            payload.traffic.is_some()
        );
        Ok(payload)
    }

    async fn fetch_detailed_metrics(
        &self,
        id: &str,
        kind: LocationKind,
    ) -> Result<DetailedMetrics, ApiError> {
        let url = self.endpoint(&[kind.api_segment(), id, "detailed-metrics"])?;
        let body = self.get_json(url, &[]).await?;
        if !body.is_object() {
            return Err(ApiError::Malformed {
                message: format!("detailed metrics for {id} is not an object"),
            });
        }
        Ok(DetailedMetrics::parse(body)?)
    }

    async fn fetch_foot_traffic(
        &self,
        id: &str,
        kind: LocationKind,
        hour: Option<u8>,
    ) -> Result<Vec<FootTrafficPoint>, ApiError> {
        let url = self.endpoint(&[kind.api_segment(), id, "foot-traffic"])?;
        let query: Vec<(&str, String)> = hour.map(|h| ("time", h.to_string())).into_iter().collect();
        let body = self.get_json(url, &query).await?;
        Ok(serde_json::from_value(body)?)
    }

    async fn fetch_business_locations(&self) -> Result<Vec<BusinessLocation>, ApiError> {
        let url = self.endpoint(&["business-locations"])?;
        let body = self.get_json(url, &[]).await?;
        Ok(serde_json::from_value(body)?)
    }

    async fn fetch_map_center(&self) -> Result<Coordinates, ApiError> {
        let url = self.endpoint(&["tampere-center"])?;
        let body = self.get_json(url, &[]).await?;
        let center: Coordinates = serde_json::from_value(body)?;
        if !center.is_valid() {
            return Err(ApiError::InvalidCoordinates {
                context: "map center".to_string(),
            });
        }
        Ok(center)
    }

    async fn analyze_business(&self, text: &str) -> Result<BusinessPreferences, ApiError> {
        let url = self.endpoint(&["analyze-business"])?;
        let body = self.post_json(url, &AnalyzeBusinessRequest { text }).await?;
        Ok(serde_json::from_value(body)?)
    }

    async fn llm_summary(&self, request: &LlmSummaryRequest) -> Result<String, ApiError> {
        let url = self.endpoint(&["llm-summary"])?;
        let body = self.post_json(url, request).await?;
        let response: LlmSummaryResponse = serde_json::from_value(body)?;
        Ok(response.summary)
    }
}
