//! Hardcoded substitutes for low-value lookups.

use hotspot_map_api_models::{BusinessLocation, BusinessPreferences};
use hotspot_map_location_models::Coordinates;

/// Tampere city center (Keskustori).
pub const DEFAULT_CENTER: Coordinates = Coordinates::new(23.7610, 61.4978);

/// A handful of well-known central Tampere businesses.
#[must_use]
pub fn business_locations() -> Vec<BusinessLocation> {
    [
        ("b-1", "Stockmann Tampere", "retail", 23.7603, 61.4975),
        ("b-2", "Kauppahalli", "market", 23.7571, 61.4962),
        ("b-3", "Tullintori", "retail", 23.7740, 61.4995),
        ("b-4", "Ratina", "retail", 23.7663, 61.4915),
        ("b-5", "Finlayson", "mixed", 23.7584, 61.5012),
    ]
    .into_iter()
    .map(|(id, name, category, lng, lat)| BusinessLocation {
        id: id.to_string(),
        name: name.to_string(),
        category: Some(category.to_string()),
        coordinates: Coordinates::new(lng, lat),
    })
    .collect()
}

/// Generic preferences used when the analyzer is unavailable.
#[must_use]
pub fn business_preferences() -> BusinessPreferences {
    BusinessPreferences {
        business_type: Some("general".to_string()),
        target_audience: Some("general public".to_string()),
        preferred_area: Some("city center".to_string()),
        ..BusinessPreferences::default()
    }
}
