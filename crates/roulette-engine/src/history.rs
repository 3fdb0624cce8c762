// crates/roulette-engine/src/history.rs
// Bounded rolling log of candidates already shown this session
//
// Also owns the "should we forget?" decision: a meal-time change or a large
// location jump means a different candidate universe, so history is wiped.

use crate::config::SessionConfig;
use crate::error::{EngineError, Result};
use crate::geo;
use roulette_types::{Candidate, LatLng, MealTime};
use std::collections::VecDeque;
use std::sync::Mutex;
use tracing::{debug, info};

/// Lookup of candidate ids the user has already been shown
pub trait SeenCandidates: Send + Sync {
    fn has_seen(&self, id: &str) -> bool;
}

/// Treats nothing as seen
#[derive(Debug, Clone, Copy, Default)]
pub struct NothingSeen;

impl SeenCandidates for NothingSeen {
    fn has_seen(&self, _id: &str) -> bool {
        false
    }
}

/// Why history was wiped
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ClearReason {
    MealTimeChanged(MealTime),
    LocationJump { meters: f64 },
    Explicit,
}

#[derive(Debug)]
pub struct HistoryTracker {
    entries: VecDeque<Candidate>,
    capacity: usize,
    jump_threshold_meters: f64,
    last_location: Option<LatLng>,
}

impl HistoryTracker {
    pub fn new(capacity: usize, jump_threshold_meters: f64) -> Self {
        let capacity = capacity.max(1);
        Self {
            entries: VecDeque::with_capacity(capacity + 1),
            capacity,
            jump_threshold_meters,
            last_location: None,
        }
    }

    pub fn from_config(config: &SessionConfig) -> Self {
        Self::new(config.history_capacity, config.jump_threshold_meters)
    }

    /// Append a shown candidate, evicting the oldest past capacity.
    ///
    /// Returns `false` (and changes nothing) if its id is already present.
    pub fn record(&mut self, candidate: Candidate) -> bool {
        if self.contains(&candidate.id) {
            return false;
        }
        self.entries.push_back(candidate);
        while self.entries.len() > self.capacity {
            if let Some(evicted) = self.entries.pop_front() {
                debug!(id = %evicted.id, "History full, evicted oldest entry");
            }
        }
        true
    }

    /// A different meal time is a different candidate universe
    pub fn on_meal_time_changed(&mut self, meal_time: MealTime) {
        self.clear_for(ClearReason::MealTimeChanged(meal_time));
    }

    /// Track a new location fix; returns `true` if history was cleared.
    ///
    /// The first fix (ever, or after a clear) only sets the baseline.
    pub fn on_location_updated(&mut self, location: LatLng) -> bool {
        let cleared = match self.last_location {
            None => {
                debug!(location = %location, "History baseline location set");
                false
            }
            Some(previous) => {
                let meters = geo::distance_m(previous, location);
                if meters > self.jump_threshold_meters {
                    self.clear_for(ClearReason::LocationJump { meters });
                    true
                } else {
                    false
                }
            }
        };
        self.last_location = Some(location);
        cleared
    }

    /// Rewind one step: drop the current entry and return the previous one
    pub fn go_back(&mut self) -> Result<Candidate> {
        if self.entries.len() < 2 {
            return Err(EngineError::NoHistory);
        }
        self.entries.pop_back();
        self.entries.back().cloned().ok_or(EngineError::NoHistory)
    }

    pub fn clear(&mut self) {
        self.clear_for(ClearReason::Explicit);
    }

    fn clear_for(&mut self, reason: ClearReason) {
        if !self.entries.is_empty() {
            info!(reason = ?reason, entries = self.entries.len(), "Clearing history");
        }
        self.entries.clear();
        self.last_location = None;
    }

    pub fn contains(&self, id: &str) -> bool {
        self.entries.iter().any(|c| c.id == id)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&Candidate> {
        self.entries.get(index)
    }

    pub fn latest(&self) -> Option<&Candidate> {
        self.entries.back()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Candidate> {
        self.entries.iter()
    }

    pub fn last_location(&self) -> Option<LatLng> {
        self.last_location
    }
}

impl SeenCandidates for Mutex<HistoryTracker> {
    fn has_seen(&self, id: &str) -> bool {
        match self.lock() {
            Ok(history) => history.contains(id),
            Err(poisoned) => poisoned.into_inner().contains(id),
        }
    }
}
