// crates/roulette-engine/src/search/places.rs
// Google Places nearby-search client

use super::PlaceSearch;
use crate::config::SearchConfig;
use crate::error::SearchError;
use async_trait::async_trait;
use roulette_types::{Candidate, LatLng, MealTime, OpenPeriod, OpeningHours, OperationalStatus};
use serde::Deserialize;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

/// Place types too generic to describe a cuisine
const GENERIC_TYPES: &[&str] = &[
    "restaurant",
    "food",
    "point_of_interest",
    "establishment",
    "store",
    "meal_takeaway",
    "meal_delivery",
];

// ═══════════════════════════════════════
// RESPONSE SHAPES
// ═══════════════════════════════════════

#[derive(Debug, Deserialize)]
struct PlacesResponse {
    status: String,
    #[serde(default)]
    results: Vec<PlaceResult>,
    error_message: Option<String>,
}

#[derive(Debug, Deserialize)]
struct PlaceResult {
    place_id: String,
    name: String,
    geometry: Geometry,
    rating: Option<f32>,
    price_level: Option<u8>,
    #[serde(default)]
    types: Vec<String>,
    business_status: Option<String>,
    opening_hours: Option<PlaceOpeningHours>,
}

#[derive(Debug, Deserialize)]
struct Geometry {
    location: LatLng,
}

#[derive(Debug, Deserialize)]
struct PlaceOpeningHours {
    open_now: Option<bool>,
    #[serde(default)]
    periods: Vec<PlacePeriod>,
}

#[derive(Debug, Deserialize)]
struct PlacePeriod {
    open: DayTime,
    close: Option<DayTime>,
}

/// Day counts from Sunday = 0; time is "HHMM"
#[derive(Debug, Deserialize)]
struct DayTime {
    day: u8,
    time: String,
}

impl DayTime {
    /// Monday-based day index
    fn monday_day(&self) -> u8 {
        (self.day % 7 + 6) % 7
    }

    fn minute(&self) -> Option<u16> {
        if self.time.len() != 4 {
            return None;
        }
        let hours: u16 = self.time.get(0..2)?.parse().ok()?;
        let minutes: u16 = self.time.get(2..4)?.parse().ok()?;
        (hours < 24 && minutes < 60).then_some(hours * 60 + minutes)
    }
}

// ═══════════════════════════════════════
// CLIENT
// ═══════════════════════════════════════

/// Nearby-search client for restaurants
pub struct PlacesClient {
    api_key: String,
    config: SearchConfig,
    client: reqwest::Client,
}

impl PlacesClient {
    pub fn new(api_key: String, config: SearchConfig) -> Result<Self, SearchError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(15))
            .build()?;
        Ok(Self {
            api_key,
            config,
            client,
        })
    }

    fn request_url(&self, location: LatLng, meal_time: MealTime) -> Result<reqwest::Url, SearchError> {
        let mut params = vec![
            ("location", location.to_string()),
            ("radius", self.config.radius_meters.to_string()),
            ("type", "restaurant".to_string()),
            ("key", self.api_key.clone()),
        ];
        match meal_time {
            MealTime::Now => params.push(("opennow", "true".to_string())),
            MealTime::Breakfast => params.push(("keyword", "breakfast".to_string())),
            MealTime::LateNight => params.push(("keyword", "late night".to_string())),
            MealTime::Lunch | MealTime::Dinner => {}
        }
        reqwest::Url::parse_with_params(&self.config.endpoint, &params)
            .map_err(|e| SearchError::NotConfigured(format!("invalid places endpoint: {}", e)))
    }
}

#[async_trait]
impl PlaceSearch for PlacesClient {
    async fn search(
        &self,
        location: LatLng,
        meal_time: MealTime,
    ) -> Result<Vec<Candidate>, SearchError> {
        let start_time = Instant::now();
        let url = self.request_url(location, meal_time)?;

        debug!(location = %location, meal_time = %meal_time, "Executing places search");

        let response = self.client.get(url).send().await?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            warn!(status = %status, body = %body, "Places search failed");
            return Err(SearchError::Status {
                status: status.as_u16(),
                body,
            });
        }

        let data: PlacesResponse = response.json().await?;
        let candidates = into_candidates(data)?;

        info!(
            location = %location,
            results = candidates.len(),
            duration_ms = start_time.elapsed().as_millis() as u64,
            "Places search complete"
        );
        Ok(candidates)
    }

    fn name(&self) -> &'static str {
        "places"
    }
}

// ═══════════════════════════════════════
// MAPPING
// ═══════════════════════════════════════

fn into_candidates(data: PlacesResponse) -> Result<Vec<Candidate>, SearchError> {
    match data.status.as_str() {
        "OK" | "ZERO_RESULTS" => Ok(data.results.into_iter().map(to_candidate).collect()),
        other => Err(SearchError::Provider(match data.error_message {
            Some(msg) => format!("{}: {}", other, msg),
            None => other.to_string(),
        })),
    }
}

fn to_candidate(place: PlaceResult) -> Candidate {
    let status = match place.business_status.as_deref() {
        Some("OPERATIONAL") => OperationalStatus::Operational,
        Some("CLOSED_TEMPORARILY") | Some("CLOSED_PERMANENTLY") => OperationalStatus::Closed,
        _ => OperationalStatus::Unknown,
    };

    let cuisine_tags = place
        .types
        .iter()
        .filter(|t| !GENERIC_TYPES.contains(&t.as_str()))
        .map(|t| t.trim_end_matches("_restaurant").to_string())
        .collect();

    let hours = place.opening_hours.as_ref().and_then(to_opening_hours);
    if hours.is_none() && place.opening_hours.as_ref().and_then(|h| h.open_now) == Some(false) {
        debug!(place_id = %place.place_id, "Place reports closed now without periods");
    }

    Candidate {
        id: place.place_id,
        name: place.name,
        location: place.geometry.location,
        distance_km: 0.0,
        rating: place.rating,
        price_level: place.price_level,
        cuisine_tags,
        status,
        hours,
    }
}

fn to_opening_hours(hours: &PlaceOpeningHours) -> Option<OpeningHours> {
    if hours.periods.is_empty() {
        return None;
    }
    // A single open period without a close time means open around the clock
    if hours.periods.len() == 1 && hours.periods[0].close.is_none() {
        return Some(OpeningHours::always());
    }

    let periods: Vec<OpenPeriod> = hours
        .periods
        .iter()
        .filter_map(|p| {
            let close = p.close.as_ref()?;
            Some(OpenPeriod {
                day: p.open.monday_day(),
                open_minute: p.open.minute()?,
                close_minute: close.minute()?,
            })
        })
        .collect();

    (!periods.is_empty()).then(|| OpeningHours::new(periods))
}
