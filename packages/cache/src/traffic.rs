//! Traffic snapshots keyed by date and hour.
//!
//! Lines and points for a key always come from the same combined fetch,
//! so a caller asking for points while lines are being fetched simply
//! joins that request.

use std::fmt;
use std::sync::Arc;

use chrono::NaiveDate;
use geojson::FeatureCollection;
use hotspot_map_api::HotspotApi;
use hotspot_map_location_models::TimelineRange;
use hotspot_map_location_models::traffic::TrafficSnapshot;

use crate::{CacheError, InFlightCache};

/// Identifies one traffic snapshot. Displays as `"{date}-{hour}"`, e.g.
/// `2025-03-26-12`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TrafficKey {
    pub date: NaiveDate,
    pub hour: u8,
}

impl TrafficKey {
    #[must_use]
    pub const fn new(date: NaiveDate, hour: u8) -> Self {
        Self { date, hour }
    }

    /// Key for the hour selected by the slider start.
    #[must_use]
    pub fn from_timeline(date: NaiveDate, timeline: &TimelineRange) -> Self {
        Self::new(date, timeline.hour())
    }
}

impl fmt::Display for TrafficKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.date.format("%Y-%m-%d"), self.hour)
    }
}

/// Snapshot cache. Entries are never evicted, but the current hour can
/// be refreshed in place with [`Self::refresh`].
#[derive(Clone)]
pub struct TrafficSnapshotCache {
    api: Arc<dyn HotspotApi>,
    entries: InFlightCache<TrafficKey, TrafficSnapshot>,
}

impl TrafficSnapshotCache {
    #[must_use]
    pub fn new(api: Arc<dyn HotspotApi>) -> Self {
        Self {
            api,
            entries: InFlightCache::new("traffic"),
        }
    }

    /// Lines and points for `key`.
    ///
    /// # Errors
    ///
    /// Returns [`CacheError`] if the combined fetch failed.
    pub async fn get_snapshot(&self, key: TrafficKey) -> Result<TrafficSnapshot, CacheError> {
        let api = Arc::clone(&self.api);
        self.entries
            .get_or_fetch(key, move || async move { api.fetch_traffic(key.date, key.hour).await })
            .await
    }

    /// Refetches `key` even if it is cached, keeping the old snapshot if
    /// the fetch fails.
    ///
    /// # Errors
    ///
    /// Returns [`CacheError`] if the fetch failed.
    pub async fn refresh(&self, key: TrafficKey) -> Result<TrafficSnapshot, CacheError> {
        let api = Arc::clone(&self.api);
        self.entries
            .refresh(key, move || async move { api.fetch_traffic(key.date, key.hour).await })
            .await
    }

    /// Road segments for `date` at `hour`.
    ///
    /// # Errors
    ///
    /// Returns [`CacheError`] if the combined fetch failed.
    pub async fn get_traffic_lines(
        &self,
        date: NaiveDate,
        hour: u8,
    ) -> Result<FeatureCollection, CacheError> {
        Ok(self.get_snapshot(TrafficKey::new(date, hour)).await?.lines)
    }

    /// Heatmap points for `date` at `hour`.
    ///
    /// # Errors
    ///
    /// Returns [`CacheError`] if the combined fetch failed.
    pub async fn get_traffic_points(
        &self,
        date: NaiveDate,
        hour: u8,
    ) -> Result<FeatureCollection, CacheError> {
        Ok(self.get_snapshot(TrafficKey::new(date, hour)).await?.points)
    }

    /// Stores a snapshot that arrived embedded in another response.
    /// An existing entry for `key` wins.
    pub fn harvest(&self, key: TrafficKey, snapshot: TrafficSnapshot) -> bool {
        self.entries.insert_if_absent(key, snapshot)
    }

    /// The cached snapshot for `key`, without fetching.
    #[must_use]
    pub fn cached(&self, key: &TrafficKey) -> Option<TrafficSnapshot> {
        self.entries.get(key)
    }
}

/// Decides when the displayed traffic snapshot must be reloaded.
///
/// A load is due on the first request, whenever the slider moves to a
/// different key than the last loaded one, and when the wall-clock hour
/// rolls over while the slider sits on the current hour. Loads triggered
/// by the clock must bypass the cache, since the snapshot for "now"
/// changes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RefreshPolicy {
    loaded: Option<TrafficKey>,
    clock_hour: u8,
}

impl RefreshPolicy {
    #[must_use]
    pub const fn new(clock_hour: u8) -> Self {
        Self {
            loaded: None,
            clock_hour,
        }
    }

    /// Whether a load is due for the slider position `key`.
    #[must_use]
    pub fn should_load(&self, key: TrafficKey) -> bool {
        self.loaded != Some(key)
    }

    /// Records a successful load of `key`.
    pub const fn mark_loaded(&mut self, key: TrafficKey) {
        self.loaded = Some(key);
    }

    /// The last successfully loaded key.
    #[must_use]
    pub const fn loaded(&self) -> Option<TrafficKey> {
        self.loaded
    }

    /// Records a clock reading. Returns `true` if the hour rolled over
    /// and the slider is on the new current hour, meaning the snapshot
    /// must be refreshed.
    pub const fn on_clock(&mut self, clock_hour: u8, slider_hour: u8) -> bool {
        if clock_hour == self.clock_hour {
            return false;
        }
        self.clock_hour = clock_hour;
        slider_hour == clock_hour
    }

    /// The last recorded wall-clock hour.
    #[must_use]
    pub const fn clock_hour(&self) -> u8 {
        self.clock_hour
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::Ordering;

    use hotspot_map_location_models::traffic::empty_collection;
    use tokio::sync::Notify;

    use super::*;
    use crate::testing::FakeApi;

    fn date() -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 3, 26).unwrap()
    }

    fn snapshot() -> TrafficSnapshot {
        let lines: FeatureCollection = serde_json::from_value(serde_json::json!({
            "type": "FeatureCollection",
            "features": [{
                "type": "Feature",
                "geometry": { "type": "LineString", "coordinates": [[23.76, 61.49], [23.77, 61.50]] },
                "properties": { "status": "moderate" }
            }]
        }))
        .unwrap();
        let points: FeatureCollection = serde_json::from_value(serde_json::json!({
            "type": "FeatureCollection",
            "features": [{
                "type": "Feature",
                "geometry": { "type": "Point", "coordinates": [23.76, 61.49] },
                "properties": { "weight": 0.8 }
            }]
        }))
        .unwrap();
        TrafficSnapshot::new(Some(lines), Some(points))
    }

    #[test]
    fn key_from_slider_position() {
        let key = TrafficKey::from_timeline(date(), &TimelineRange { start: 50.0, end: 75.0 });
        assert_eq!(key.hour, 12);
        assert_eq!(key.to_string(), "2025-03-26-12");
    }

    #[test]
    fn key_hour_is_not_zero_padded() {
        assert_eq!(TrafficKey::new(date(), 7).to_string(), "2025-03-26-7");
    }

    #[tokio::test]
    async fn lines_and_points_share_one_fetch() {
        let gate = Arc::new(Notify::new());
        let api = Arc::new(FakeApi {
            traffic: Some(snapshot()),
            ..FakeApi::gated(&gate)
        });
        let cache = TrafficSnapshotCache::new(api.clone());

        let lines = tokio::spawn({
            let cache = cache.clone();
            async move { cache.get_traffic_lines(date(), 12).await }
        });
        let points = tokio::spawn({
            let cache = cache.clone();
            async move { cache.get_traffic_points(date(), 12).await }
        });
        while api.locations_calls.load(Ordering::SeqCst) == 0 {
            tokio::task::yield_now().await;
        }
        gate.notify_one();

        assert_eq!(lines.await.unwrap().unwrap().features.len(), 1);
        assert_eq!(points.await.unwrap().unwrap().features.len(), 1);
        assert_eq!(api.locations_calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn harvested_snapshot_served_without_fetch() {
        let api = Arc::new(FakeApi::default());
        let cache = TrafficSnapshotCache::new(api.clone());
        let key = TrafficKey::new(date(), 9);

        assert!(cache.harvest(key, snapshot()));
        assert!(!cache.harvest(key, TrafficSnapshot::new(None, None)));

        let points = cache.get_traffic_points(date(), 9).await.unwrap();
        assert_eq!(points.features.len(), 1);
        assert_eq!(api.locations_calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn refresh_bypasses_cached_entry() {
        let api = Arc::new(FakeApi::default());
        let cache = TrafficSnapshotCache::new(api.clone());
        let key = TrafficKey::new(date(), 14);
        cache.harvest(key, snapshot());

        let refreshed = cache.refresh(key).await.unwrap();
        assert_eq!(refreshed.lines, empty_collection());
        assert_eq!(api.locations_calls.load(Ordering::SeqCst), 1);
        assert!(cache.cached(&key).unwrap().is_empty());
    }

    #[test]
    fn policy_loads_on_first_request_and_key_change() {
        let mut policy = RefreshPolicy::new(10);
        let key = TrafficKey::new(date(), 10);
        assert!(policy.should_load(key));
        policy.mark_loaded(key);
        assert!(!policy.should_load(key));
        assert!(policy.should_load(TrafficKey::new(date(), 11)));
        assert!(policy.should_load(TrafficKey::new(date().succ_opt().unwrap(), 10)));
        assert_eq!(policy.loaded(), Some(key));
    }

    #[test]
    fn policy_refreshes_only_when_pinned_to_now() {
        let mut policy = RefreshPolicy::new(10);
        assert!(!policy.on_clock(10, 10));
        assert!(!policy.on_clock(11, 15));
        assert!(!policy.on_clock(11, 11));
        assert!(policy.on_clock(12, 12));
        assert_eq!(policy.clock_hour(), 12);
    }
}
