//! The traffic snapshot shown for the current slider position.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use chrono::{Local, NaiveDate, Timelike};
use hotspot_map_cache::{RefreshPolicy, TrafficKey, TrafficSnapshotCache};
use hotspot_map_location_models::TimelineRange;
use hotspot_map_location_models::traffic::TrafficSnapshot;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

/// Shown when traffic cannot be loaded.
pub const TRAFFIC_ERROR: &str = "Failed to fetch traffic data. Please try again later.";

#[derive(Debug, Clone, Default, PartialEq)]
pub struct TrafficView {
    /// Key of `snapshot`.
    pub key: Option<TrafficKey>,
    pub snapshot: Option<TrafficSnapshot>,
    pub loading: bool,
    pub error: Option<String>,
}

/// Keeps the traffic snapshot in step with the slider and the clock.
///
/// Moving the slider to a new key loads through the cache. A clock
/// rollover while the slider is on the current hour, and an explicit
/// [`TrafficFeed::refetch`], bypass the cache. Results for a key the
/// slider has since left are not shown.
pub struct TrafficFeed {
    cache: TrafficSnapshotCache,
    policy: Mutex<RefreshPolicy>,
    slider: Mutex<Option<TrafficKey>>,
    state: watch::Sender<TrafficView>,
}

/// The local wall-clock hour.
#[must_use]
pub fn local_hour() -> u8 {
    u8::try_from(Local::now().hour()).unwrap_or(0)
}

impl TrafficFeed {
    #[must_use]
    pub fn new(cache: TrafficSnapshotCache, clock_hour: u8) -> Self {
        Self {
            cache,
            policy: Mutex::new(RefreshPolicy::new(clock_hour)),
            slider: Mutex::new(None),
            state: watch::Sender::new(TrafficView::default()),
        }
    }

    fn policy(&self) -> MutexGuard<'_, RefreshPolicy> {
        self.policy.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn slider(&self) -> Option<TrafficKey> {
        *self.slider.lock().unwrap_or_else(PoisonError::into_inner)
    }

    #[must_use]
    pub fn state(&self) -> TrafficView {
        self.state.borrow().clone()
    }

    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<TrafficView> {
        self.state.subscribe()
    }

    /// Moves the slider. Loads if the position maps to a different key
    /// than the one last loaded.
    pub async fn set_slider(&self, date: NaiveDate, timeline: &TimelineRange) {
        let key = TrafficKey::from_timeline(date, timeline);
        *self.slider.lock().unwrap_or_else(PoisonError::into_inner) = Some(key);
        let due = self.policy().should_load(key);
        if due {
            self.load(key, false).await;
        } else {
            // Back on the key already shown; a load for a key the slider
            // left will be discarded and must not leave the view loading.
            self.state.send_if_modified(|view| {
                let changed = view.loading;
                view.loading = false;
                changed
            });
        }
    }

    /// Handles a wall-clock reading, refreshing if the hour rolled over
    /// onto the slider hour.
    pub async fn on_clock(&self, clock_hour: u8) {
        let Some(key) = self.slider() else {
            return;
        };
        let due = self.policy().on_clock(clock_hour, key.hour);
        if due {
            log::info!("Clock reached {clock_hour}:00, refreshing traffic for {key}");
            self.load(key, true).await;
        }
    }

    /// Reloads the current slider key, bypassing the cache. Joins a load
    /// that is already in flight for it.
    pub async fn refetch(&self) {
        if let Some(key) = self.slider() {
            self.load(key, true).await;
        }
    }

    async fn load(&self, key: TrafficKey, bypass_cache: bool) {
        self.state.send_modify(|view| {
            view.loading = true;
            view.error = None;
        });

        let result = if bypass_cache {
            self.cache.refresh(key).await
        } else {
            self.cache.get_snapshot(key).await
        };

        if self.slider() != Some(key) {
            log::debug!("Discarding traffic for {key}: slider moved");
            return;
        }
        match result {
            Ok(snapshot) => {
                self.policy().mark_loaded(key);
                self.state.send_replace(TrafficView {
                    key: Some(key),
                    snapshot: Some(snapshot),
                    loading: false,
                    error: None,
                });
            }
            Err(e) => {
                log::error!("Failed to fetch traffic for {key}: {e}");
                self.state.send_modify(|view| {
                    view.loading = false;
                    view.error = Some(TRAFFIC_ERROR.to_string());
                });
            }
        }
    }

    /// Polls [`local_hour`] every `poll` until the feed is dropped.
    #[must_use]
    pub fn spawn_clock(self: &Arc<Self>, poll: Duration) -> JoinHandle<()> {
        self.spawn_clock_with(poll, local_hour)
    }

    /// Polls `clock` every `poll` until the feed is dropped. A zero `poll`
    /// is treated as one second.
    #[must_use]
    pub fn spawn_clock_with<C>(self: &Arc<Self>, poll: Duration, clock: C) -> JoinHandle<()>
    where
        C: Fn() -> u8 + Send + 'static,
    {
        let feed = Arc::downgrade(self);
        tokio::spawn(async move {
            let mut interval = tokio::time::interval(poll.max(Duration::from_secs(1)));
            interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
            interval.tick().await;
            loop {
                interval.tick().await;
                let Some(feed) = feed.upgrade() else {
                    break;
                };
                feed.on_clock(clock()).await;
            }
        })
    }
}
