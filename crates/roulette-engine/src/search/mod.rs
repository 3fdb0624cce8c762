// crates/roulette-engine/src/search/mod.rs
// Places search abstraction layer

mod fixture;
mod places;

pub use fixture::FixtureSearch;
pub use places::PlacesClient;

use crate::error::SearchError;
use async_trait::async_trait;
use roulette_types::{Candidate, LatLng, MealTime};

/// Asynchronous lookup of restaurants near a location.
///
/// Implementations may return an empty list or fail; no ordering is implied.
#[async_trait]
pub trait PlaceSearch: Send + Sync {
    async fn search(
        &self,
        location: LatLng,
        meal_time: MealTime,
    ) -> Result<Vec<Candidate>, SearchError>;

    /// Short provider name for logs
    fn name(&self) -> &'static str;
}
