#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Request-deduplicating caches for data fetched on demand.
//!
//! Each cache is owned by one store instance and handed around by
//! reference; there is no process-wide cache state. All of them share the
//! resolution rules of [`inflight::InFlightCache`]: settled values are
//! returned directly, concurrent lookups of the same key join a single
//! request, and failures are never cached.

pub mod detailed_metrics;
pub mod inflight;
pub mod llm_summary;
pub mod traffic;

#[cfg(test)]
mod testing;

use std::sync::Arc;

use hotspot_map_api::ApiError;
use thiserror::Error;

pub use detailed_metrics::DetailedMetricsCache;
pub use inflight::InFlightCache;
pub use llm_summary::{LlmSummaryCache, SummaryRequest, fallback_summary};
pub use traffic::{RefreshPolicy, TrafficKey, TrafficSnapshotCache};

/// Errors returned by cache lookups.
///
/// `Clone` so that one settled fetch result can be handed to every
/// caller that joined it.
#[derive(Debug, Clone, Error)]
pub enum CacheError {
    /// The underlying API call failed.
    #[error("Fetch failed: {0}")]
    Fetch(Arc<ApiError>),

    /// The background fetch task panicked or was cancelled.
    #[error("Fetch task failed: {message}")]
    Task {
        /// Join error description.
        message: String,
    },
}

impl CacheError {
    /// The API error behind this failure, if there is one.
    #[must_use]
    pub fn api_error(&self) -> Option<&ApiError> {
        match self {
            Self::Fetch(e) => Some(e),
            Self::Task { .. } => None,
        }
    }
}
