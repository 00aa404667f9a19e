//! In-memory [`HotspotApi`] used by the store tests.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use chrono::NaiveDate;
use hotspot_map_api::{ApiError, HotspotApi};
use hotspot_map_api_models::{
    BusinessLocation, BusinessPreferences, LlmSummaryRequest, LocationQuery, LocationsPayload,
};
use hotspot_map_location_models::traffic::TrafficSnapshot;
use hotspot_map_location_models::{
    Coordinates, DetailedMetrics, FootTrafficKind, FootTrafficPoint, LocationKind,
    UnifiedLocation,
};
use tokio::sync::Notify;

pub fn location(id: &str, kind: &str) -> UnifiedLocation {
    serde_json::from_value(serde_json::json!({
        "id": id,
        "label": format!("Location {id}"),
        "type": kind,
        "coordinates": [23.76, 61.49],
    }))
    .unwrap()
}

pub fn date() -> NaiveDate {
    NaiveDate::from_ymd_opt(2025, 3, 26).unwrap()
}

fn unavailable() -> ApiError {
    ApiError::Malformed {
        message: "unavailable".to_string(),
    }
}

/// Records every call. Locations, traffic and failures are configured
/// per test; metrics for an id and traffic for an hour can be held open
/// with a [`Notify`].
#[derive(Default)]
pub struct FakeApi {
    pub locations: Mutex<Vec<UnifiedLocation>>,
    pub traffic: Mutex<Option<TrafficSnapshot>>,
    pub queries: Mutex<Vec<LocationQuery>>,
    pub traffic_calls: AtomicUsize,
    pub foot_traffic_calls: AtomicUsize,
    fail_locations: AtomicBool,
    fail_metrics: AtomicBool,
    metrics_calls: Mutex<Vec<String>>,
    metrics_gates: Mutex<HashMap<String, Arc<Notify>>>,
    traffic_gates: Mutex<HashMap<u8, Arc<Notify>>>,
}

impl FakeApi {
    pub fn with_locations(locations: Vec<UnifiedLocation>) -> Self {
        Self {
            locations: Mutex::new(locations),
            ..Self::default()
        }
    }

    pub fn fail_locations(&self, fail: bool) {
        self.fail_locations.store(fail, Ordering::SeqCst);
    }

    pub fn fail_metrics(&self, fail: bool) {
        self.fail_metrics.store(fail, Ordering::SeqCst);
    }

    pub fn gate_metrics(&self, id: &str, gate: &Arc<Notify>) {
        self.metrics_gates
            .lock()
            .unwrap()
            .insert(id.to_string(), Arc::clone(gate));
    }

    pub fn gate_traffic(&self, hour: u8, gate: &Arc<Notify>) {
        self.traffic_gates
            .lock()
            .unwrap()
            .insert(hour, Arc::clone(gate));
    }

    pub fn metrics_calls(&self) -> Vec<String> {
        self.metrics_calls.lock().unwrap().clone()
    }

    pub fn queries(&self) -> Vec<LocationQuery> {
        self.queries.lock().unwrap().clone()
    }
}

#[async_trait::async_trait]
impl HotspotApi for FakeApi {
    async fn fetch_locations(&self, query: &LocationQuery) -> Result<LocationsPayload, ApiError> {
        self.queries.lock().unwrap().push(*query);
        if self.fail_locations.load(Ordering::SeqCst) {
            return Err(unavailable());
        }
        Ok(LocationsPayload {
            locations: self.locations.lock().unwrap().clone(),
            dropped: 0,
            traffic: self.traffic.lock().unwrap().clone(),
        })
    }

    async fn fetch_detailed_metrics(
        &self,
        id: &str,
        _kind: LocationKind,
    ) -> Result<DetailedMetrics, ApiError> {
        self.metrics_calls.lock().unwrap().push(id.to_string());
        let gate = self.metrics_gates.lock().unwrap().get(id).cloned();
        if let Some(gate) = gate {
            gate.notified().await;
        }
        if self.fail_metrics.load(Ordering::SeqCst) {
            return Err(unavailable());
        }
        Ok(DetailedMetrics::parse(serde_json::json!({ "location_id": id }))?)
    }

    async fn fetch_foot_traffic(
        &self,
        _id: &str,
        _kind: LocationKind,
        hour: Option<u8>,
    ) -> Result<Vec<FootTrafficPoint>, ApiError> {
        self.foot_traffic_calls.fetch_add(1, Ordering::SeqCst);
        Ok(vec![FootTrafficPoint {
            hour: hour.unwrap_or(0),
            value: 42.0,
            kind: FootTrafficKind::Current,
        }])
    }

    async fn fetch_traffic(&self, _date: NaiveDate, hour: u8) -> Result<TrafficSnapshot, ApiError> {
        self.traffic_calls.fetch_add(1, Ordering::SeqCst);
        let gate = self.traffic_gates.lock().unwrap().get(&hour).cloned();
        if let Some(gate) = gate {
            gate.notified().await;
        }
        Ok(self
            .traffic
            .lock()
            .unwrap()
            .clone()
            .unwrap_or_else(|| TrafficSnapshot::new(None, None)))
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
