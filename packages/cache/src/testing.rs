//! In-memory [`HotspotApi`] used by the cache tests.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use hotspot_map_api::{ApiError, HotspotApi};
use hotspot_map_api_models::{
    BusinessLocation, BusinessPreferences, LlmSummaryRequest, LocationQuery, LocationsPayload,
};
use hotspot_map_location_models::traffic::TrafficSnapshot;
use hotspot_map_location_models::{Coordinates, DetailedMetrics, FootTrafficPoint, LocationKind};
use tokio::sync::Notify;

/// Counts calls per endpoint. When `gate` is set every call waits for a
/// notification before answering; when `failing` is set every call fails.
#[derive(Default)]
pub struct FakeApi {
    pub metrics_calls: AtomicUsize,
    pub locations_calls: AtomicUsize,
    pub summary_calls: AtomicUsize,
    pub failing: AtomicBool,
    pub gate: Option<Arc<Notify>>,
    pub traffic: Option<TrafficSnapshot>,
}

impl FakeApi {
    pub fn gated(gate: &Arc<Notify>) -> Self {
        Self {
            gate: Some(Arc::clone(gate)),
            ..Self::default()
        }
    }

    async fn respond(&self) -> Result<(), ApiError> {
        if let Some(gate) = &self.gate {
            gate.notified().await;
        }
        if self.failing.load(Ordering::SeqCst) {
            return Err(ApiError::Malformed {
                message: "unavailable".to_string(),
            });
        }
        Ok(())
    }
}

#[async_trait::async_trait]
impl HotspotApi for FakeApi {
    async fn fetch_locations(&self, _query: &LocationQuery) -> Result<LocationsPayload, ApiError> {
        self.locations_calls.fetch_add(1, Ordering::SeqCst);
        self.respond().await?;
        Ok(LocationsPayload {
            locations: Vec::new(),
            dropped: 0,
            traffic: self.traffic.clone(),
        })
    }

    async fn fetch_detailed_metrics(
        &self,
        id: &str,
        _kind: LocationKind,
    ) -> Result<DetailedMetrics, ApiError> {
        self.metrics_calls.fetch_add(1, Ordering::SeqCst);
        self.respond().await?;
        Ok(DetailedMetrics::parse(serde_json::json!({
            "location_id": id,
            "population": 1200,
            "pois": [{ "name": "Library" }],
        }))?)
    }

    async fn fetch_foot_traffic(
        &self,
        _id: &str,
        _kind: LocationKind,
        _hour: Option<u8>,
    ) -> Result<Vec<FootTrafficPoint>, ApiError> {
        self.respond().await?;
        Ok(Vec::new())
    }

    async fn fetch_business_locations(&self) -> Result<Vec<BusinessLocation>, ApiError> {
        self.respond().await?;
        Ok(Vec::new())
    }

    async fn fetch_map_center(&self) -> Result<Coordinates, ApiError> {
        self.respond().await?;
        Ok(Coordinates::new(23.76, 61.50))
    }

    async fn analyze_business(&self, _text: &str) -> Result<BusinessPreferences, ApiError> {
        self.respond().await?;
        Ok(BusinessPreferences::default())
    }

    async fn llm_summary(&self, request: &LlmSummaryRequest) -> Result<String, ApiError> {
        self.summary_calls.fetch_add(1, Ordering::SeqCst);
        self.respond().await?;
        Ok(format!("Good fit for {}", request.business_requirement))
    }
}
