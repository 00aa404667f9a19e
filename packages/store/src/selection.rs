//! The single selected hotspot or event and its detailed metrics.

use std::sync::atomic::{AtomicU64, Ordering};

use hotspot_map_cache::DetailedMetricsCache;
use hotspot_map_location_models::{DetailedMetrics, LocationKind, UnifiedLocation};
use tokio::sync::watch;

/// Shown when the selected location's metrics cannot be loaded.
pub const METRICS_ERROR: &str = "Failed to fetch detailed metrics. Please try again later.";

#[derive(Debug, Clone, Default, PartialEq)]
pub struct SelectionState {
    pub location: Option<UnifiedLocation>,
    pub metrics: Option<DetailedMetrics>,
    pub loading: bool,
    pub error: Option<String>,
}

/// At most one selected location. Selecting a hotspot replaces a
/// selected event and vice versa.
///
/// Every selection change bumps an epoch. A metrics load only commits
/// if no newer selection happened while it was in flight, so a slow
/// response for an earlier location never overwrites the current one.
pub struct Selection {
    metrics: DetailedMetricsCache,
    epoch: AtomicU64,
    state: watch::Sender<SelectionState>,
}

impl Selection {
    #[must_use]
    pub fn new(metrics: DetailedMetricsCache) -> Self {
        Self {
            metrics,
            epoch: AtomicU64::new(0),
            state: watch::Sender::new(SelectionState::default()),
        }
    }

    #[must_use]
    pub fn state(&self) -> SelectionState {
        self.state.borrow().clone()
    }

    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<SelectionState> {
        self.state.subscribe()
    }

    #[must_use]
    pub fn selected(&self) -> Option<UnifiedLocation> {
        self.state.borrow().location.clone()
    }

    fn selected_of(&self, kind: LocationKind) -> Option<UnifiedLocation> {
        self.state
            .borrow()
            .location
            .as_ref()
            .filter(|l| l.kind() == kind)
            .cloned()
    }

    #[must_use]
    pub fn selected_hotspot(&self) -> Option<UnifiedLocation> {
        self.selected_of(LocationKind::Natural)
    }

    #[must_use]
    pub fn selected_event(&self) -> Option<UnifiedLocation> {
        self.selected_of(LocationKind::Event)
    }

    /// Selects `location` and loads its detailed metrics.
    ///
    /// Returns `false` if another selection change superseded this one
    /// before the metrics arrived, in which case nothing was committed.
    pub async fn select(&self, location: UnifiedLocation) -> bool {
        let epoch = self.epoch.fetch_add(1, Ordering::SeqCst) + 1;
        let id = location.id().to_string();
        let kind = location.kind();
        log::debug!("Selecting {kind} {id}");
        self.state.send_replace(SelectionState {
            location: Some(location),
            metrics: None,
            loading: true,
            error: None,
        });

        let result = self.metrics.get(&id, kind).await;

        let committed = self.state.send_if_modified(|state| {
            if self.epoch.load(Ordering::SeqCst) != epoch {
                return false;
            }
            state.loading = false;
            match result {
                Ok(metrics) => state.metrics = Some(metrics),
                Err(e) => {
                    log::error!("Failed to fetch detailed metrics for {id}: {e}");
                    state.error = Some(METRICS_ERROR.to_string());
                }
            }
            true
        });
        if !committed {
            log::debug!("Discarding metrics for {id}: selection changed");
        }
        committed
    }

    /// Deselects whatever is selected and abandons its metrics load.
    pub fn clear(&self) {
        self.epoch.fetch_add(1, Ordering::SeqCst);
        self.state.send_replace(SelectionState::default());
    }

    /// Events are tied to a date, so a date change deselects an event.
    /// A selected hotspot is kept. Returns whether the selection was
    /// cleared.
    pub fn on_date_change(&self) -> bool {
        if self.selected_event().is_none() {
            return false;
        }
        log::debug!("Date changed, clearing selected event");
        self.clear();
        true
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use tokio::sync::Notify;

    use super::*;
    use crate::testing::{FakeApi, location};

    fn selection(api: &Arc<FakeApi>) -> Arc<Selection> {
        Arc::new(Selection::new(DetailedMetricsCache::new(api.clone())))
    }

    #[tokio::test]
    async fn select_loads_metrics() {
        let api = Arc::new(FakeApi::default());
        let selection = selection(&api);

        assert!(selection.select(location("h-1", "natural")).await);
        let state = selection.state();
        assert_eq!(state.location.unwrap().id(), "h-1");
        assert!(!state.loading);
        assert_eq!(
            state.metrics.unwrap().text("location_id").as_deref(),
            Some("h-1")
        );
    }

    #[tokio::test]
    async fn hotspot_and_event_are_exclusive() {
        let api = Arc::new(FakeApi::default());
        let selection = selection(&api);

        selection.select(location("h-1", "natural")).await;
        selection.select(location("e-1", "event")).await;
        assert!(selection.selected_hotspot().is_none());
        assert_eq!(selection.selected_event().unwrap().id(), "e-1");
    }

    #[tokio::test]
    async fn stale_metrics_do_not_overwrite_newer_selection() {
        let api = Arc::new(FakeApi::default());
        let gate = Arc::new(Notify::new());
        api.gate_metrics("slow", &gate);
        let selection = selection(&api);

        let slow = tokio::spawn({
            let selection = Arc::clone(&selection);
            async move { selection.select(location("slow", "natural")).await }
        });
        while api.metrics_calls().is_empty() {
            tokio::task::yield_now().await;
        }

        assert!(selection.select(location("fast", "natural")).await);
        gate.notify_one();
        assert!(!slow.await.unwrap());

        let state = selection.state();
        assert_eq!(state.location.unwrap().id(), "fast");
        assert_eq!(
            state.metrics.unwrap().text("location_id").as_deref(),
            Some("fast")
        );
    }

    #[tokio::test]
    async fn failed_metrics_set_error() {
        let api = Arc::new(FakeApi::default());
        api.fail_metrics(true);
        let selection = selection(&api);

        assert!(selection.select(location("h-1", "natural")).await);
        let state = selection.state();
        assert_eq!(state.error.as_deref(), Some(METRICS_ERROR));
        assert!(state.metrics.is_none());
        assert!(!state.loading);
    }

    #[tokio::test]
    async fn date_change_clears_only_events() {
        let api = Arc::new(FakeApi::default());
        let selection = selection(&api);

        selection.select(location("h-1", "natural")).await;
        assert!(!selection.on_date_change());
        assert!(selection.selected().is_some());

        selection.select(location("e-1", "event")).await;
        assert!(selection.on_date_change());
        assert_eq!(selection.state(), SelectionState::default());
    }
}
