//! Per-location detailed metrics.

use std::sync::Arc;

use hotspot_map_api::HotspotApi;
use hotspot_map_location_models::{DetailedMetrics, LocationKind};

use crate::{CacheError, InFlightCache};

/// Detailed metrics keyed by location id.
///
/// At most one request per id is outstanding at any time. Hotspot and
/// event ids share one key space, matching the uniqueness of ids within
/// a locations response.
#[derive(Clone)]
pub struct DetailedMetricsCache {
    api: Arc<dyn HotspotApi>,
    entries: InFlightCache<String, DetailedMetrics>,
}

impl DetailedMetricsCache {
    #[must_use]
    pub fn new(api: Arc<dyn HotspotApi>) -> Self {
        Self {
            api,
            entries: InFlightCache::new("detailed metrics"),
        }
    }

    /// Metrics for `id`, fetched from the `kind`-specific endpoint on a
    /// miss.
    ///
    /// # Errors
    ///
    /// Returns [`CacheError`] if the fetch failed. The next call for the
    /// same id issues a new request.
    pub async fn get(&self, id: &str, kind: LocationKind) -> Result<DetailedMetrics, CacheError> {
        let api = Arc::clone(&self.api);
        let owned_id = id.to_string();
        self.entries
            .get_or_fetch(id.to_string(), move || async move {
                api.fetch_detailed_metrics(&owned_id, kind).await
            })
            .await
    }

    /// Already-fetched metrics for `id`.
    #[must_use]
    pub fn cached(&self, id: &str) -> Option<DetailedMetrics> {
        self.entries.get(&id.to_string())
    }
}
