// crates/roulette-engine/src/config/session.rs
// Explicit per-session and per-engine settings threaded through every component

use roulette_types::{LatLng, MealTime};
use std::time::Duration;

pub const DEFAULT_MIN_THRESHOLD: usize = 5;
pub const DEFAULT_BATCH_SIZE: usize = 20;
pub const DEFAULT_HISTORY_CAPACITY: usize = 10;
pub const DEFAULT_JUMP_THRESHOLD_METERS: f64 = 5000.0;
pub const DEFAULT_KEPT_CAPACITY: usize = 9;
pub const DEFAULT_SEARCH_RADIUS_METERS: u32 = 1500;
pub const DEFAULT_PLACES_ENDPOINT: &str =
    "https://maps.googleapis.com/maps/api/place/nearbysearch/json";

/// Parameters that define one location + meal-time session
#[derive(Debug, Clone, PartialEq)]
pub struct SessionConfig {
    /// Unset until the first location fix arrives
    pub location: Option<LatLng>,
    pub meal_time: MealTime,
    /// Below this many valid candidates the pool prefetches in the background
    pub min_threshold: usize,
    /// Upper bound on pool size
    pub batch_size: usize,
    pub history_capacity: usize,
    /// A location change larger than this wipes history
    pub jump_threshold_meters: f64,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            location: None,
            meal_time: MealTime::default(),
            min_threshold: DEFAULT_MIN_THRESHOLD,
            batch_size: DEFAULT_BATCH_SIZE,
            history_capacity: DEFAULT_HISTORY_CAPACITY,
            jump_threshold_meters: DEFAULT_JUMP_THRESHOLD_METERS,
        }
    }
}

impl SessionConfig {
    pub fn new(location: LatLng, meal_time: MealTime) -> Self {
        Self {
            location: Some(location),
            meal_time,
            ..Self::default()
        }
    }

    pub fn with_thresholds(mut self, min_threshold: usize, batch_size: usize) -> Self {
        self.min_threshold = min_threshold;
        self.batch_size = batch_size;
        self
    }
}

/// Engine-level settings independent of the session
#[derive(Debug, Clone, PartialEq)]
pub struct EngineConfig {
    pub kept_capacity: usize,
    /// Minimum time the spin state lasts before the result is presented
    pub spin_duration: Duration,
    /// Auto-finish slides after this long; `None` waits for `finish_slide`
    pub slide_duration: Option<Duration>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            kept_capacity: DEFAULT_KEPT_CAPACITY,
            spin_duration: Duration::from_millis(800),
            slide_duration: None,
        }
    }
}

/// Places provider settings
#[derive(Debug, Clone, PartialEq)]
pub struct SearchConfig {
    pub radius_meters: u32,
    pub endpoint: String,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            radius_meters: DEFAULT_SEARCH_RADIUS_METERS,
            endpoint: DEFAULT_PLACES_ENDPOINT.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_session_defaults() {
        let config = SessionConfig::default();
        assert!(config.location.is_none());
        assert_eq!(config.min_threshold, 5);
        assert_eq!(config.batch_size, 20);
        assert_eq!(config.history_capacity, 10);
        assert_eq!(config.jump_threshold_meters, 5000.0);
    }

    #[test]
    fn test_session_new_sets_location() {
        let config = SessionConfig::new(LatLng::new(1.0, 2.0), MealTime::Lunch)
            .with_thresholds(2, 8);
        assert_eq!(config.location, Some(LatLng::new(1.0, 2.0)));
        assert_eq!(config.meal_time, MealTime::Lunch);
        assert_eq!((config.min_threshold, config.batch_size), (2, 8));
    }

    #[test]
    fn test_engine_defaults() {
        let config = EngineConfig::default();
        assert_eq!(config.kept_capacity, 9);
        assert!(config.slide_duration.is_none());
    }
}
