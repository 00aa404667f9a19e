//! Store timing and limits.

use std::time::Duration;

use serde::Deserialize;

/// Delay after the last parameter change before locations are fetched.
pub const DEFAULT_DEBOUNCE_MS: u64 = 300;

/// Maximum number of locations in one comparison.
pub const DEFAULT_MAX_COMPARISON: usize = 4;

/// How often the traffic feed checks whether the wall-clock hour rolled
/// over.
pub const DEFAULT_CLOCK_POLL_SECS: u64 = 60;

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    pub debounce_ms: u64,
    pub max_comparison: usize,
    pub clock_poll_secs: u64,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            debounce_ms: DEFAULT_DEBOUNCE_MS,
            max_comparison: DEFAULT_MAX_COMPARISON,
            clock_poll_secs: DEFAULT_CLOCK_POLL_SECS,
        }
    }
}

impl StoreConfig {
    /// Applies `HOTSPOT_MAP_DEBOUNCE_MS`, `HOTSPOT_MAP_MAX_COMPARISON` and
    /// `HOTSPOT_MAP_CLOCK_POLL_SECS` on top of the current values.
    /// Unparseable values and a zero poll interval are ignored.
    #[must_use]
    pub fn with_env_overrides(mut self) -> Self {
        if let Some(ms) = env_parse("HOTSPOT_MAP_DEBOUNCE_MS") {
            self.debounce_ms = ms;
        }
        if let Some(max) = env_parse("HOTSPOT_MAP_MAX_COMPARISON") {
            self.max_comparison = max;
        }
        match env_parse("HOTSPOT_MAP_CLOCK_POLL_SECS") {
            Some(0) => log::warn!("Ignoring HOTSPOT_MAP_CLOCK_POLL_SECS=0"),
            Some(secs) => self.clock_poll_secs = secs,
            None => {}
        }
        self
    }

    #[must_use]
    pub const fn debounce(&self) -> Duration {
        Duration::from_millis(self.debounce_ms)
    }

    /// The clock poll interval, at least one second.
    #[must_use]
    pub fn clock_poll(&self) -> Duration {
        Duration::from_secs(self.clock_poll_secs.max(1))
    }
}

fn env_parse<T: std::str::FromStr>(name: &str) -> Option<T> {
    let value = std::env::var(name).ok()?;
    match value.trim().parse() {
        Ok(parsed) => Some(parsed),
        Err(_) => {
            log::warn!("Ignoring unparseable {name}={value}");
            None
        }
    }
}
