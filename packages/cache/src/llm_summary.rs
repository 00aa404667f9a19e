//! Generated business-fit summaries.
//!
//! The summary endpoint is a passthrough to a language model and is
//! treated as a low-value lookup: callers that cannot show an error use
//! [`LlmSummaryCache::get_or_fallback`], which substitutes
//! [`fallback_summary`] built from the metrics they already have.

use std::sync::Arc;

use hotspot_map_api::HotspotApi;
use hotspot_map_api_models::LlmSummaryRequest;
use hotspot_map_location_models::{DetailedMetrics, LocationKind};

use crate::{CacheError, InFlightCache};

/// Prompt instructions sent with every summary request unless overridden.
pub const DEFAULT_INSTRUCTIONS: &str = "Create a small summary of why this zone would be a good \
     zone for the type of business the user is interested in.";

/// Everything needed to request a summary for one location.
#[derive(Debug, Clone, PartialEq)]
pub struct SummaryRequest {
    pub location_id: String,
    pub business_requirement: String,
    pub metrics: DetailedMetrics,
    pub location_type: LocationKind,
    pub instructions: Option<String>,
}

impl SummaryRequest {
    /// A request using [`DEFAULT_INSTRUCTIONS`].
    #[must_use]
    pub fn new(
        location_id: impl Into<String>,
        business_requirement: impl Into<String>,
        metrics: DetailedMetrics,
        location_type: LocationKind,
    ) -> Self {
        Self {
            location_id: location_id.into(),
            business_requirement: business_requirement.into(),
            metrics,
            location_type,
            instructions: Some(DEFAULT_INSTRUCTIONS.to_string()),
        }
    }

    /// Cache key: `"{location_id}::{business_requirement}"`.
    #[must_use]
    pub fn key(&self) -> String {
        format!("{}::{}", self.location_id, self.business_requirement)
    }

    fn to_api_request(&self) -> LlmSummaryRequest {
        LlmSummaryRequest {
            business_requirement: self.business_requirement.clone(),
            metrics: self.metrics.clone(),
            location_type: self.location_type,
            instructions: self.instructions.clone(),
        }
    }
}

/// Summaries keyed by location and business requirement.
#[derive(Clone)]
pub struct LlmSummaryCache {
    api: Arc<dyn HotspotApi>,
    entries: InFlightCache<String, String>,
}

impl LlmSummaryCache {
    #[must_use]
    pub fn new(api: Arc<dyn HotspotApi>) -> Self {
        Self {
            api,
            entries: InFlightCache::new("llm summary"),
        }
    }

    /// The summary for `request`. Only the location id and business
    /// requirement identify an entry; differing metrics or instructions
    /// for the same pair are served the cached summary.
    ///
    /// # Errors
    ///
    /// Returns [`CacheError`] if the summary endpoint failed. Nothing is
    /// cached in that case.
    pub async fn get(&self, request: &SummaryRequest) -> Result<String, CacheError> {
        let api = Arc::clone(&self.api);
        let body = request.to_api_request();
        self.entries
            .get_or_fetch(request.key(), move || async move { api.llm_summary(&body).await })
            .await
    }

    /// The summary for `request`, or [`fallback_summary`] of its metrics
    /// if the endpoint failed.
    pub async fn get_or_fallback(&self, request: &SummaryRequest) -> String {
        match self.get(request).await {
            Ok(summary) => summary,
            Err(e) => {
                log::warn!(
                    "LLM summary for {} failed, using local summary: {e}",
                    request.key()
                );
                fallback_summary(&request.metrics, request.location_type)
            }
        }
    }
}

fn first_text(metrics: &DetailedMetrics, keys: &[&str]) -> Option<String> {
    keys.iter().find_map(|key| metrics.text(key))
}

fn text_or(metrics: &DetailedMetrics, keys: &[&str], default: &str) -> String {
    first_text(metrics, keys).unwrap_or_else(|| default.to_string())
}

/// Rough wording for a free-form daily traffic figure.
fn traffic_description(avg_daily_traffic: &str) -> &'static str {
    let lower = avg_daily_traffic.to_lowercase();
    if lower.contains("2,500") || lower.contains("2500") {
        "significant"
    } else if lower.contains("1,") || lower.contains("1000") {
        "moderate"
    } else if lower.contains("high") {
        "high"
    } else if lower.contains("low") {
        "lower"
    } else {
        "varying"
    }
}

/// A short deterministic summary built only from `metrics`.
///
/// Missing fields are replaced with neutral wording, so the result is
/// always presentable.
#[must_use]
pub fn fallback_summary(metrics: &DetailedMetrics, kind: LocationKind) -> String {
    match kind {
        LocationKind::Natural => {
            let area_type = text_or(metrics, &["areaType", "area_type"], "mixed-use area");
            let traffic = text_or(
                metrics,
                &["avgDailyTraffic", "avg_daily_traffic"],
                "moderate",
            );
            let peak_hour = text_or(metrics, &["peakHour", "peak_hour"], "17:00");
            let demographics = text_or(
                metrics,
                &["dominantDemographics", "dominant_demographics"],
                "diverse demographics",
            );
            let businesses = first_text(metrics, &["nearbyBusinesses", "nearby_businesses"])
                .unwrap_or_else(|| match metrics.company_count() {
                    0 => "various".to_string(),
                    n => n.to_string(),
                });

            format!(
                "{area_type} with {} traffic ({traffic}/day). Peak time: {peak_hour}. \
                 {demographics} demographic. {businesses} nearby businesses.",
                traffic_description(&traffic)
            )
        }
        LocationKind::Event => {
            let event_type = text_or(metrics, &["event_type", "type"], "event");
            let attendance = text_or(
                metrics,
                &["expected_attendance", "expectedAttendance", "capacity"],
                "significant",
            );
            let duration = text_or(metrics, &["duration"], "limited timeframe");
            let demographics = text_or(metrics, &["demographics"], "diverse");
            let impact = text_or(
                metrics,
                &["peakTrafficImpact", "peak_traffic_impact"],
                "+40%",
            );

            format!(
                "{event_type} event. Expected attendance: {attendance}. Duration: {duration}. \
                 {demographics} demographic. Traffic impact: {impact}."
            )
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::Ordering;

    use super::*;
    use crate::testing::FakeApi;

    fn request(id: &str, requirement: &str) -> SummaryRequest {
        SummaryRequest::new(id, requirement, DetailedMetrics::default(), LocationKind::Natural)
    }

    #[test]
    fn key_joins_location_and_requirement() {
        assert_eq!(request("h-1", "cafe").key(), "h-1::cafe");
    }

    #[tokio::test]
    async fn keyed_by_location_and_requirement() {
        let api = Arc::new(FakeApi::default());
        let cache = LlmSummaryCache::new(api.clone());

        assert_eq!(cache.get(&request("h-1", "cafe")).await.unwrap(), "Good fit for cafe");
        cache.get(&request("h-1", "cafe")).await.unwrap();
        cache.get(&request("h-1", "gym")).await.unwrap();
        cache.get(&request("h-2", "cafe")).await.unwrap();

        assert_eq!(api.summary_calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn failure_falls_back_and_is_not_cached() {
        let api = Arc::new(FakeApi::default());
        api.failing.store(true, Ordering::SeqCst);
        let cache = LlmSummaryCache::new(api.clone());

        let summary = cache.get_or_fallback(&request("h-1", "cafe")).await;
        assert_eq!(
            summary,
            "mixed-use area with varying traffic (moderate/day). Peak time: 17:00. \
             diverse demographics demographic. various nearby businesses."
        );

        api.failing.store(false, Ordering::SeqCst);
        assert_eq!(
            cache.get_or_fallback(&request("h-1", "cafe")).await,
            "Good fit for cafe"
        );
        assert_eq!(api.summary_calls.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn natural_summary_uses_metrics() {
        let metrics = DetailedMetrics::parse(serde_json::json!({
            "areaType": "Commercial district",
            "avgDailyTraffic": "2,500",
            "peakHour": "12:00",
            "dominantDemographics": "Young professionals",
            "companies": [{}, {}, {}],
        }))
        .unwrap();

        assert_eq!(
            fallback_summary(&metrics, LocationKind::Natural),
            "Commercial district with significant traffic (2,500/day). Peak time: 12:00. \
             Young professionals demographic. 3 nearby businesses."
        );
    }

    #[test]
    fn event_summary_defaults() {
        let metrics = DetailedMetrics::parse(serde_json::json!({
            "event_type": "Concert",
            "expected_attendance": 1200,
        }))
        .unwrap();

        assert_eq!(
            fallback_summary(&metrics, LocationKind::Event),
            "Concert event. Expected attendance: 1200. Duration: limited timeframe. \
             diverse demographic. Traffic impact: +40%."
        );
    }
}
