//! Multi-select for side-by-side comparison.

use hotspot_map_location_models::{LocationKind, UnifiedLocation};
use strum_macros::{AsRefStr, Display};

/// Comparison set state. An active set is never empty and holds
/// locations of a single kind, in selection order.
#[derive(Debug, Clone, Default, PartialEq)]
pub enum ComparisonState {
    #[default]
    Empty,
    Active {
        kind: LocationKind,
        locations: Vec<UnifiedLocation>,
    },
}

/// What a [`ComparisonSelection::toggle`] did.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, AsRefStr)]
#[strum(serialize_all = "snake_case")]
pub enum ToggleOutcome {
    /// The location joined the set.
    Added,
    /// The location was already in the set and left it.
    Removed,
    /// The location had a different kind and replaced the whole set.
    Replaced,
    /// The set is at capacity; nothing changed.
    Full,
}

/// Up to `max` locations of one kind, selected for comparison.
///
/// Selecting a location of a different kind than the active set
/// discards the set and starts a new one with just that location, so a
/// comparison never mixes hotspots and events.
#[derive(Debug, Clone, PartialEq)]
pub struct ComparisonSelection {
    max: usize,
    state: ComparisonState,
}

impl ComparisonSelection {
    /// An empty selection holding at most `max` locations (at least 1).
    #[must_use]
    pub fn new(max: usize) -> Self {
        Self {
            max: max.max(1),
            state: ComparisonState::Empty,
        }
    }

    #[must_use]
    pub const fn state(&self) -> &ComparisonState {
        &self.state
    }

    #[must_use]
    pub const fn max(&self) -> usize {
        self.max
    }

    /// Kind of the active set.
    #[must_use]
    pub const fn kind(&self) -> Option<LocationKind> {
        match &self.state {
            ComparisonState::Empty => None,
            ComparisonState::Active { kind, .. } => Some(*kind),
        }
    }

    /// Selected locations in selection order.
    #[must_use]
    pub fn locations(&self) -> &[UnifiedLocation] {
        match &self.state {
            ComparisonState::Empty => &[],
            ComparisonState::Active { locations, .. } => locations,
        }
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.locations().len()
    }

    #[must_use]
    pub const fn is_empty(&self) -> bool {
        matches!(self.state, ComparisonState::Empty)
    }

    #[must_use]
    pub fn contains(&self, id: &str) -> bool {
        self.locations().iter().any(|l| l.id() == id)
    }

    /// Adds or removes `location`. Identity is the location id.
    pub fn toggle(&mut self, location: UnifiedLocation) -> ToggleOutcome {
        let kind = location.kind();
        let outcome = match &mut self.state {
            ComparisonState::Active {
                kind: active,
                locations,
            } if *active == kind => {
                if let Some(index) = locations.iter().position(|l| l.id() == location.id()) {
                    locations.remove(index);
                    ToggleOutcome::Removed
                } else if locations.len() >= self.max {
                    ToggleOutcome::Full
                } else {
                    locations.push(location);
                    ToggleOutcome::Added
                }
            }
            ComparisonState::Active { .. } => {
                self.state = ComparisonState::Active {
                    kind,
                    locations: vec![location],
                };
                ToggleOutcome::Replaced
            }
            ComparisonState::Empty => {
                self.state = ComparisonState::Active {
                    kind,
                    locations: vec![location],
                };
                ToggleOutcome::Added
            }
        };

        if let ComparisonState::Active { locations, .. } = &self.state
            && locations.is_empty()
        {
            self.state = ComparisonState::Empty;
        }
        log::debug!("Comparison toggle: {outcome} ({} selected)", self.len());
        outcome
    }

    pub fn clear(&mut self) {
        self.state = ComparisonState::Empty;
    }
}
