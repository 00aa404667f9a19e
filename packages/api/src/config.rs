//! Backend connection settings.

use std::time::Duration;

use serde::Deserialize;

/// Default backend base URL.
pub const DEFAULT_BASE_URL: &str = "http://localhost:8000";

/// Default per-request timeout in seconds.
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Where the backend lives and how long to wait for it.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct ApiConfig {
    /// Base URL; endpoint paths (`/api/...`) are appended to it.
    pub base_url: String,
    /// Per-request timeout in seconds.
    pub timeout_secs: u64,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            timeout_secs: DEFAULT_TIMEOUT_SECS,
        }
    }
}

impl ApiConfig {
    /// Defaults overridden by `HOTSPOT_MAP_API_URL` and
    /// `HOTSPOT_MAP_API_TIMEOUT_SECS`.
    #[must_use]
    pub fn from_env() -> Self {
        Self::default().with_env_overrides()
    }

    /// Applies `HOTSPOT_MAP_API_URL` / `HOTSPOT_MAP_API_TIMEOUT_SECS` on
    /// top of the current values. Unparseable timeouts are ignored.
    #[must_use]
    pub fn with_env_overrides(mut self) -> Self {
        if let Ok(url) = std::env::var("HOTSPOT_MAP_API_URL") {
            self.base_url = url;
        }
        if let Some(secs) = std::env::var("HOTSPOT_MAP_API_TIMEOUT_SECS")
            .ok()
            .and_then(|v| v.parse().ok())
        {
            self.timeout_secs = secs;
        }
        self
    }

    /// The timeout as a [`Duration`].
    #[must_use]
    pub const fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}
