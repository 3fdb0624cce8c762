// crates/roulette-engine/src/config/file.rs
// File-based configuration from ~/.roulette/config.toml

use super::session::{EngineConfig, SearchConfig, SessionConfig};
use roulette_types::{LatLng, MealTime};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, warn};

/// Top-level config structure
#[derive(Debug, Deserialize, Default)]
pub struct RouletteConfig {
    #[serde(default)]
    pub session: SessionSection,
    #[serde(default)]
    pub engine: EngineSection,
    #[serde(default)]
    pub search: SearchSection,
}

/// Pool and history tunables
#[derive(Debug, Deserialize, Default)]
pub struct SessionSection {
    pub meal_time: Option<String>,
    pub min_threshold: Option<usize>,
    pub batch_size: Option<usize>,
    pub history_capacity: Option<usize>,
    pub jump_threshold_meters: Option<f64>,
}

/// Presentation timing
#[derive(Debug, Deserialize, Default)]
pub struct EngineSection {
    pub kept_capacity: Option<usize>,
    pub spin_duration_ms: Option<u64>,
    pub slide_duration_ms: Option<u64>,
}

/// Places provider section
#[derive(Debug, Deserialize, Default)]
pub struct SearchSection {
    pub radius_meters: Option<u32>,
    pub endpoint: Option<String>,
}

impl RouletteConfig {
    /// Load config from ROULETTE_CONFIG or ~/.roulette/config.toml
    pub fn load() -> Self {
        let path = super::env::config_path_override().unwrap_or_else(Self::config_path);
        Self::load_from(&path)
    }

    /// Load config from a specific path, falling back to defaults
    pub fn load_from(path: &Path) -> Self {
        match std::fs::read_to_string(path) {
            Ok(contents) => match toml::from_str(&contents) {
                Ok(config) => {
                    debug!(path = %path.display(), "Loaded config from file");
                    config
                }
                Err(e) => {
                    warn!(path = %path.display(), error = %e, "Failed to parse config file");
                    Self::default()
                }
            },
            Err(_) => {
                debug!(path = %path.display(), "Config file not found, using defaults");
                Self::default()
            }
        }
    }

    /// Get the config file path
    fn config_path() -> PathBuf {
        dirs::home_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(".roulette")
            .join("config.toml")
    }

    /// Configured meal time, if it names a known one
    pub fn meal_time(&self) -> Option<MealTime> {
        let name = self.session.meal_time.as_deref()?;
        let meal = MealTime::from_name(name);
        if meal.is_none() {
            warn!(value = name, "Unknown meal_time in config, ignoring");
        }
        meal
    }

    /// Build a session config for `location`, applying file overrides.
    ///
    /// An explicit `meal_time` argument wins over the file's.
    pub fn session_config(&self, location: LatLng, meal_time: Option<MealTime>) -> SessionConfig {
        let defaults = SessionConfig::default();
        let s = &self.session;
        SessionConfig {
            location: Some(location),
            meal_time: meal_time.or_else(|| self.meal_time()).unwrap_or_default(),
            min_threshold: s.min_threshold.unwrap_or(defaults.min_threshold),
            batch_size: s.batch_size.unwrap_or(defaults.batch_size).max(1),
            history_capacity: s
                .history_capacity
                .unwrap_or(defaults.history_capacity)
                .max(1),
            jump_threshold_meters: s
                .jump_threshold_meters
                .unwrap_or(defaults.jump_threshold_meters),
        }
    }

    pub fn engine_config(&self) -> EngineConfig {
        let defaults = EngineConfig::default();
        EngineConfig {
            kept_capacity: self.engine.kept_capacity.unwrap_or(defaults.kept_capacity),
            spin_duration: self
                .engine
                .spin_duration_ms
                .map(Duration::from_millis)
                .unwrap_or(defaults.spin_duration),
            slide_duration: self
                .engine
                .slide_duration_ms
                .map(Duration::from_millis)
                .or(defaults.slide_duration),
        }
    }

    pub fn search_config(&self) -> SearchConfig {
        let defaults = SearchConfig::default();
        SearchConfig {
            radius_meters: self.search.radius_meters.unwrap_or(defaults.radius_meters),
            endpoint: self.search.endpoint.clone().unwrap_or(defaults.endpoint),
        }
    }
}
