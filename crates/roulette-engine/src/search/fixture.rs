// crates/roulette-engine/src/search/fixture.rs
// Offline search provider backed by a JSON file of candidates

use super::PlaceSearch;
use crate::error::SearchError;
use async_trait::async_trait;
use roulette_types::{Candidate, LatLng, MealTime};
use std::path::Path;
use tracing::debug;

/// Serves a fixed candidate list regardless of location
#[derive(Debug, Clone)]
pub struct FixtureSearch {
    candidates: Vec<Candidate>,
}

impl FixtureSearch {
    pub fn new(candidates: Vec<Candidate>) -> Self {
        Self { candidates }
    }

    /// Load a JSON array of candidates
    pub fn from_path(path: &Path) -> Result<Self, SearchError> {
        let contents = std::fs::read_to_string(path)?;
        let candidates: Vec<Candidate> = serde_json::from_str(&contents)?;
        debug!(path = %path.display(), count = candidates.len(), "Loaded search fixture");
        Ok(Self::new(candidates))
    }

    pub fn len(&self) -> usize {
        self.candidates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.candidates.is_empty()
    }
}

#[async_trait]
impl PlaceSearch for FixtureSearch {
    async fn search(
        &self,
        _location: LatLng,
        _meal_time: MealTime,
    ) -> Result<Vec<Candidate>, SearchError> {
        Ok(self.candidates.clone())
    }

    fn name(&self) -> &'static str {
        "fixture"
    }
}
