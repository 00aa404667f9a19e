//! Per-location detailed metrics payload.
//!
//! The detailed-metrics endpoints return a loosely structured object
//! whose shape differs between hotspots and events and has changed over
//! time. The fields consumers rely on are typed here; everything else is
//! preserved in [`DetailedMetrics::extra`]. Older payloads nest the
//! point-of-interest lists under a `detailed` object; [`DetailedMetrics::parse`]
//! hoists them to the top level.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Keys that may be nested under `detailed` in older payloads.
const HOISTED_KEYS: &[&str] = &["pois", "places_for_rent", "companies"];

/// Detailed metrics for one hotspot or event.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DetailedMetrics {
    /// Points of interest near the location.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pois: Option<Vec<Value>>,
    /// Commercial premises available for rent nearby.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub places_for_rent: Option<Vec<Value>>,
    /// Registered companies nearby.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub companies: Option<Vec<Value>>,
    /// Every other field of the payload, unmodified.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl DetailedMetrics {
    /// Parses a raw payload and hoists nested `detailed` lists.
    ///
    /// # Errors
    ///
    /// Returns an error if the payload is not a JSON object or one of the
    /// typed list fields is not an array.
    pub fn parse(value: Value) -> Result<Self, serde_json::Error> {
        let mut metrics: Self = serde_json::from_value(value)?;
        metrics.hoist_detailed();
        Ok(metrics)
    }

    fn hoist_detailed(&mut self) {
        let Some(Value::Object(detailed)) = self.extra.get("detailed") else {
            return;
        };

        for key in HOISTED_KEYS {
            let Some(Value::Array(items)) = detailed.get(*key) else {
                continue;
            };
            let slot = match *key {
                "pois" => &mut self.pois,
                "places_for_rent" => &mut self.places_for_rent,
                _ => &mut self.companies,
            };
            if slot.is_none() {
                *slot = Some(items.clone());
            }
        }
    }

    /// Looks up an untyped field.
    #[must_use]
    pub fn field(&self, key: &str) -> Option<&Value> {
        self.extra.get(key)
    }

    /// Looks up an untyped field as text, stringifying numbers.
    #[must_use]
    pub fn text(&self, key: &str) -> Option<String> {
        match self.field(key)? {
            Value::String(s) if !s.trim().is_empty() => Some(s.clone()),
            Value::Number(n) => Some(n.to_string()),
            _ => None,
        }
    }

    /// Number of nearby points of interest.
    #[must_use]
    pub fn poi_count(&self) -> usize {
        self.pois.as_ref().map_or(0, Vec::len)
    }

    /// Number of nearby premises for rent.
    #[must_use]
    pub fn rental_count(&self) -> usize {
        self.places_for_rent.as_ref().map_or(0, Vec::len)
    }

    /// Number of nearby companies.
    #[must_use]
    pub fn company_count(&self) -> usize {
        self.companies.as_ref().map_or(0, Vec::len)
    }
}
