//! Debounced loading of the unified location list.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use chrono::NaiveDate;
use hotspot_map_api::HotspotApi;
use hotspot_map_api_models::LocationQuery;
use hotspot_map_cache::{TrafficKey, TrafficSnapshotCache};
use hotspot_map_location_models::{FootTrafficPoint, TimePeriod, TimelineRange, UnifiedLocation};
use tokio::sync::watch;

use crate::debounce::Debouncer;
use crate::{StoreConfig, StoreError};

/// Shown when the location list cannot be loaded.
pub const LOCATIONS_ERROR: &str = "Failed to fetch locations. Please try again later.";

/// What the map currently shows.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LocationsState {
    pub locations: Vec<UnifiedLocation>,
    pub loading: bool,
    pub error: Option<String>,
    /// Query that produced `locations`.
    pub query: Option<LocationQuery>,
}

/// Loads the location list for the selected date and time.
///
/// Parameter changes are debounced, and only the result of the latest
/// change is ever committed. Failures keep the previous list, set
/// [`LOCATIONS_ERROR`] and are not retried; the next parameter change
/// triggers a new load. Dropping the store cancels a pending load.
pub struct LocationStore {
    api: Arc<dyn HotspotApi>,
    traffic: TrafficSnapshotCache,
    state: watch::Sender<LocationsState>,
    epoch: Arc<AtomicU64>,
    debouncer: Debouncer,
}

impl LocationStore {
    #[must_use]
    pub fn new(api: Arc<dyn HotspotApi>, traffic: TrafficSnapshotCache, config: &StoreConfig) -> Self {
        Self {
            api,
            traffic,
            state: watch::Sender::new(LocationsState::default()),
            epoch: Arc::new(AtomicU64::new(0)),
            debouncer: Debouncer::new(config.debounce()),
        }
    }

    #[must_use]
    pub fn state(&self) -> LocationsState {
        self.state.borrow().clone()
    }

    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<LocationsState> {
        self.state.subscribe()
    }

    /// Schedules a load for `date`. The hour from `timeline` is only
    /// sent in real-time mode.
    ///
    /// Must be called from within a `tokio` runtime.
    pub fn set_date_time(&self, date: NaiveDate, time_period: TimePeriod, timeline: &TimelineRange) {
        let query = LocationQuery::new(time_period, date, timeline);
        let ticket = self.epoch.fetch_add(1, Ordering::SeqCst) + 1;
        log::debug!("Scheduling locations load #{ticket}: {query:?}");
        self.state.send_modify(|state| state.loading = true);

        let api = Arc::clone(&self.api);
        let traffic = self.traffic.clone();
        let state = self.state.clone();
        let epoch = Arc::clone(&self.epoch);
        self.debouncer.schedule(async move {
            let result = api.fetch_locations(&query).await;
            state.send_if_modified(|state| {
                if epoch.load(Ordering::SeqCst) != ticket {
                    log::debug!("Discarding stale locations load #{ticket}");
                    return false;
                }
                state.loading = false;
                match result {
                    Ok(payload) => {
                        log::info!(
                            "Loaded {} locations for {} ({})",
                            payload.locations.len(),
                            query.date,
                            query.time_period
                        );
                        // Aggregate periods carry no hour; their traffic is not an
                        // hourly snapshot.
                        if let (Some(snapshot), Some(hour)) = (payload.traffic, query.hour) {
                            traffic.harvest(TrafficKey::new(query.date, hour), snapshot);
                        }
                        state.locations = payload.locations;
                        state.error = None;
                        state.query = Some(query);
                    }
                    Err(e) => {
                        log::error!("Failed to fetch locations: {e}");
                        state.error = Some(LOCATIONS_ERROR.to_string());
                    }
                }
                true
            });
        });
    }

    /// Cancels a pending load, leaving the current list in place.
    pub fn cancel(&self) {
        self.epoch.fetch_add(1, Ordering::SeqCst);
        if self.debouncer.cancel() {
            log::debug!("Cancelled pending locations load");
        }
        self.state.send_if_modified(|state| std::mem::replace(&mut state.loading, false));
    }

    /// Waits until no load is pending and returns the resulting state.
    pub async fn settled(&self) -> LocationsState {
        let mut receiver = self.state.subscribe();
        match receiver.wait_for(|state| !state.loading).await {
            Ok(state) => state.clone(),
            // The sender lives in `self`, so it cannot have been dropped.
            Err(_) => self.state(),
        }
    }

    /// A location from the current list.
    #[must_use]
    pub fn find(&self, id: &str) -> Option<UnifiedLocation> {
        self.state
            .borrow()
            .locations
            .iter()
            .find(|l| l.id() == id)
            .cloned()
    }

    /// Hourly foot traffic for a loaded location.
    ///
    /// Uses the series embedded in the location when present and only
    /// calls the per-location endpoint otherwise.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::UnknownLocation`] if `id` is not in the
    /// current list, and [`StoreError::Api`] if the fallback request
    /// fails.
    pub async fn foot_traffic(&self, id: &str) -> Result<Vec<FootTrafficPoint>, StoreError> {
        let location = self.find(id).ok_or_else(|| StoreError::UnknownLocation {
            id: id.to_string(),
        })?;
        if let Some(series) = location.base.foot_traffic.as_ref().filter(|s| !s.is_empty()) {
            return Ok(series.clone());
        }

        let hour = self.state.borrow().query.and_then(|q| q.hour);
        log::debug!("No embedded foot traffic for {id}, requesting it");
        self.api
            .fetch_foot_traffic(id, location.kind(), hour)
            .await
            .map_err(|e| {
                log::error!("Failed to fetch foot traffic for {id}: {e}");
                StoreError::Api(e)
            })
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use hotspot_map_location_models::traffic::TrafficSnapshot;

    use super::*;
    use crate::testing::{FakeApi, date, location};

    fn store(api: &Arc<FakeApi>) -> LocationStore {
        LocationStore::new(
            api.clone(),
            TrafficSnapshotCache::new(api.clone()),
            &StoreConfig::default(),
        )
    }

    #[tokio::test(start_paused = true)]
    async fn burst_issues_single_fetch_with_last_params() {
        let api = Arc::new(FakeApi::with_locations(vec![location("h-1", "natural")]));
        let store = store(&api);

        for hour in [8, 9, 10, 11] {
            store.set_date_time(date(), TimePeriod::RealTime, &TimelineRange::at_hour(hour));
            tokio::time::sleep(Duration::from_millis(100)).await;
        }
        assert!(api.queries().is_empty());
        assert!(store.state().loading);

        let state = store.settled().await;
        let queries = api.queries();
        assert_eq!(queries.len(), 1);
        assert_eq!(queries[0].hour, Some(11));
        assert_eq!(state.locations.len(), 1);
        assert_eq!(state.query, Some(queries[0]));
    }

    #[tokio::test(start_paused = true)]
    async fn hour_omitted_outside_real_time() {
        let api = Arc::new(FakeApi::default());
        let store = store(&api);

        store.set_date_time(date(), TimePeriod::Weekly, &TimelineRange::at_hour(15));
        store.settled().await;

        let queries = api.queries();
        assert_eq!(queries[0].hour, None);
        assert!(!queries[0].to_pairs().iter().any(|(k, _)| *k == "time"));
    }

    #[tokio::test(start_paused = true)]
    async fn failure_sets_error_and_keeps_list() {
        let api = Arc::new(FakeApi::with_locations(vec![location("h-1", "natural")]));
        let store = store(&api);

        store.set_date_time(date(), TimePeriod::RealTime, &TimelineRange::at_hour(9));
        store.settled().await;

        api.fail_locations(true);
        store.set_date_time(date(), TimePeriod::RealTime, &TimelineRange::at_hour(10));
        let state = store.settled().await;
        assert_eq!(state.error.as_deref(), Some(LOCATIONS_ERROR));
        assert_eq!(state.locations.len(), 1);
        assert!(!state.loading);

        tokio::time::sleep(Duration::from_secs(5)).await;
        assert_eq!(api.queries().len(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn cancel_prevents_fetch() {
        let api = Arc::new(FakeApi::default());
        let store = store(&api);

        store.set_date_time(date(), TimePeriod::RealTime, &TimelineRange::at_hour(9));
        store.cancel();
        tokio::time::sleep(Duration::from_secs(1)).await;

        assert!(api.queries().is_empty());
        assert!(!store.state().loading);
    }

    #[tokio::test(start_paused = true)]
    async fn harvests_embedded_traffic() {
        let api = Arc::new(FakeApi::default());
        *api.traffic.lock().unwrap() = Some(TrafficSnapshot::new(None, None));
        let traffic = TrafficSnapshotCache::new(api.clone());
        let store = LocationStore::new(api.clone(), traffic.clone(), &StoreConfig::default());

        store.set_date_time(
            date(),
            TimePeriod::RealTime,
            &TimelineRange { start: 50.0, end: 75.0 },
        );
        store.settled().await;

        assert!(traffic.cached(&TrafficKey::new(date(), 12)).is_some());
    }

    #[tokio::test(start_paused = true)]
    async fn aggregate_periods_do_not_harvest_traffic() {
        let api = Arc::new(FakeApi::default());
        *api.traffic.lock().unwrap() = Some(TrafficSnapshot::new(None, None));
        let traffic = TrafficSnapshotCache::new(api.clone());
        let store = LocationStore::new(api.clone(), traffic.clone(), &StoreConfig::default());

        store.set_date_time(date(), TimePeriod::Weekly, &TimelineRange::at_hour(12));
        store.settled().await;

        assert!(traffic.cached(&TrafficKey::new(date(), 12)).is_none());
        assert_eq!(api.traffic_calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn foot_traffic_prefers_embedded_series() {
        let mut embedded = location("h-1", "natural");
        embedded.base.foot_traffic = Some(vec![FootTrafficPoint {
            hour: 9,
            value: 10.0,
            kind: hotspot_map_location_models::FootTrafficKind::Past,
        }]);
        let api = Arc::new(FakeApi::with_locations(vec![embedded, location("e-1", "event")]));
        let store = store(&api);
        store.set_date_time(date(), TimePeriod::RealTime, &TimelineRange::at_hour(9));
        store.settled().await;

        let series = store.foot_traffic("h-1").await.unwrap();
        assert_eq!(series[0].value, 10.0);
        assert_eq!(api.foot_traffic_calls.load(Ordering::SeqCst), 0);

        let series = store.foot_traffic("e-1").await.unwrap();
        assert_eq!(series[0].hour, 9);
        assert_eq!(api.foot_traffic_calls.load(Ordering::SeqCst), 1);

        assert!(matches!(
            store.foot_traffic("missing").await,
            Err(StoreError::UnknownLocation { .. })
        ));
    }
}
