#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Client-side state for the hotspot map.
//!
//! [`HotspotMap`] owns one instance of every cache and store and is the
//! only place they are constructed. Each piece publishes its state
//! through a `tokio::sync::watch` channel so a UI (or the CLI) can
//! either read a snapshot or subscribe to changes.

pub mod comparison;
pub mod config;
pub mod debounce;
pub mod location_store;
pub mod selection;
pub mod traffic_feed;

#[cfg(test)]
mod testing;

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use chrono::NaiveDate;
use hotspot_map_api::{ApiError, HotspotApi};
use hotspot_map_cache::{CacheError, DetailedMetricsCache, LlmSummaryCache, TrafficSnapshotCache};
use hotspot_map_location_models::{DetailedMetrics, TimePeriod, TimelineRange, UnifiedLocation};
use thiserror::Error;
use tokio::task::JoinHandle;

pub use comparison::{ComparisonSelection, ComparisonState, ToggleOutcome};
pub use config::StoreConfig;
pub use location_store::{LocationStore, LocationsState};
pub use selection::{Selection, SelectionState};
pub use traffic_feed::{TrafficFeed, TrafficView};

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Location {id} is not in the current list")]
    UnknownLocation { id: String },

    #[error(transparent)]
    Api(#[from] ApiError),
}

/// Every store and cache for one map, sharing one API client.
pub struct HotspotMap {
    api: Arc<dyn HotspotApi>,
    config: StoreConfig,
    metrics: DetailedMetricsCache,
    summaries: LlmSummaryCache,
    locations: LocationStore,
    selection: Selection,
    comparison: Mutex<ComparisonSelection>,
    traffic: Arc<TrafficFeed>,
    date: Mutex<Option<NaiveDate>>,
}

impl HotspotMap {
    #[must_use]
    pub fn new(api: Arc<dyn HotspotApi>, config: StoreConfig) -> Self {
        Self::with_clock_hour(api, config, traffic_feed::local_hour())
    }

    /// Like [`Self::new`], with the traffic feed's starting clock hour
    /// given explicitly.
    #[must_use]
    pub fn with_clock_hour(api: Arc<dyn HotspotApi>, config: StoreConfig, clock_hour: u8) -> Self {
        let metrics = DetailedMetricsCache::new(Arc::clone(&api));
        let traffic_cache = TrafficSnapshotCache::new(Arc::clone(&api));
        Self {
            summaries: LlmSummaryCache::new(Arc::clone(&api)),
            locations: LocationStore::new(Arc::clone(&api), traffic_cache.clone(), &config),
            selection: Selection::new(metrics.clone()),
            comparison: Mutex::new(ComparisonSelection::new(config.max_comparison)),
            traffic: Arc::new(TrafficFeed::new(traffic_cache, clock_hour)),
            date: Mutex::new(None),
            metrics,
            config,
            api,
        }
    }

    #[must_use]
    pub fn api(&self) -> &Arc<dyn HotspotApi> {
        &self.api
    }

    #[must_use]
    pub const fn config(&self) -> &StoreConfig {
        &self.config
    }

    #[must_use]
    pub const fn locations(&self) -> &LocationStore {
        &self.locations
    }

    #[must_use]
    pub const fn selection(&self) -> &Selection {
        &self.selection
    }

    #[must_use]
    pub const fn traffic(&self) -> &Arc<TrafficFeed> {
        &self.traffic
    }

    #[must_use]
    pub const fn metrics(&self) -> &DetailedMetricsCache {
        &self.metrics
    }

    #[must_use]
    pub const fn summaries(&self) -> &LlmSummaryCache {
        &self.summaries
    }

    /// Changes the date and time shown. A different date deselects a
    /// selected event before the new list is scheduled.
    pub fn set_date_time(&self, date: NaiveDate, time_period: TimePeriod, timeline: &TimelineRange) {
        let previous = self
            .date
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .replace(date);
        if previous.is_some_and(|previous| previous != date) {
            self.selection.on_date_change();
        }
        self.locations.set_date_time(date, time_period, timeline);
    }

    /// Starts the traffic feed's clock polling.
    #[must_use]
    pub fn start_clock(&self) -> JoinHandle<()> {
        self.traffic.spawn_clock(self.config.clock_poll())
    }

    fn comparison_lock(&self) -> MutexGuard<'_, ComparisonSelection> {
        self.comparison.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn toggle_comparison(&self, location: UnifiedLocation) -> ToggleOutcome {
        self.comparison_lock().toggle(location)
    }

    pub fn clear_comparison(&self) {
        self.comparison_lock().clear();
    }

    #[must_use]
    pub fn comparison(&self) -> ComparisonSelection {
        self.comparison_lock().clone()
    }

    /// Detailed metrics for every compared location, in selection order.
    /// Requests run concurrently and share the metrics cache.
    pub async fn comparison_metrics(
        &self,
    ) -> Vec<(UnifiedLocation, Result<DetailedMetrics, CacheError>)> {
        let locations = self.comparison().locations().to_vec();
        let lookups = locations
            .iter()
            .map(|location| self.metrics.get(location.id(), location.kind()));
        let results = futures::future::join_all(lookups).await;
        locations.into_iter().zip(results).collect()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::Ordering;

    use super::*;
    use crate::testing::{FakeApi, date, location};

    fn map(api: &Arc<FakeApi>) -> HotspotMap {
        HotspotMap::with_clock_hour(api.clone(), StoreConfig::default(), 12)
    }

    #[tokio::test(start_paused = true)]
    async fn date_change_clears_selected_event() {
        let api = Arc::new(FakeApi::default());
        let map = map(&api);
        let timeline = TimelineRange::at_hour(12);

        map.set_date_time(date(), TimePeriod::RealTime, &timeline);
        map.selection().select(location("e-1", "event")).await;

        map.set_date_time(date(), TimePeriod::RealTime, &TimelineRange::at_hour(13));
        assert!(map.selection().selected_event().is_some());

        map.set_date_time(date().succ_opt().unwrap(), TimePeriod::RealTime, &timeline);
        assert!(map.selection().selected().is_none());
    }

    #[tokio::test]
    async fn comparison_metrics_follow_selection_order() {
        let api = Arc::new(FakeApi::default());
        let map = map(&api);

        map.toggle_comparison(location("b", "natural"));
        map.toggle_comparison(location("a", "natural"));
        let results = map.comparison_metrics().await;

        let ids: Vec<_> = results.iter().map(|(l, _)| l.id()).collect();
        assert_eq!(ids, ["b", "a"]);
        assert!(results.iter().all(|(_, metrics)| metrics.is_ok()));

        map.comparison_metrics().await;
        assert_eq!(api.metrics_calls().len(), 2);
    }

    #[tokio::test]
    async fn comparison_limit_comes_from_config() {
        let api = Arc::new(FakeApi::default());
        let config = StoreConfig {
            max_comparison: 2,
            ..StoreConfig::default()
        };
        let map = HotspotMap::with_clock_hour(api.clone(), config, 0);

        map.toggle_comparison(location("a", "natural"));
        map.toggle_comparison(location("b", "natural"));
        assert_eq!(
            map.toggle_comparison(location("c", "natural")),
            ToggleOutcome::Full
        );
        map.clear_comparison();
        assert!(map.comparison().is_empty());
        assert_eq!(api.traffic_calls.load(Ordering::SeqCst), 0);
    }
}
