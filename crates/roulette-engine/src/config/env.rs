// crates/roulette-engine/src/config/env.rs
// Environment-based configuration

use std::path::PathBuf;
use tracing::{debug, warn};

/// API keys loaded from environment variables
#[derive(Debug, Clone, Default)]
pub struct ApiKeys {
    /// Places API key (PLACES_API_KEY or GOOGLE_PLACES_API_KEY)
    pub places: Option<String>,
}

impl ApiKeys {
    pub fn from_env() -> Self {
        let places =
            Self::read_key("PLACES_API_KEY").or_else(|| Self::read_key("GOOGLE_PLACES_API_KEY"));
        let keys = Self { places };
        if keys.places.is_some() {
            debug!("Places API key loaded");
        } else {
            warn!("No places API key configured - only fixture search is available");
        }
        keys
    }

    /// Read a single key from environment, filtering empty values
    fn read_key(name: &str) -> Option<String> {
        std::env::var(name).ok().filter(|k| !k.trim().is_empty())
    }

    pub fn has_places(&self) -> bool {
        self.places.is_some()
    }
}

/// Config file override (ROULETTE_CONFIG)
pub fn config_path_override() -> Option<PathBuf> {
    std::env::var("ROULETTE_CONFIG")
        .ok()
        .filter(|p| !p.trim().is_empty())
        .map(PathBuf::from)
}
