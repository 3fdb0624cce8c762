// crates/roulette-engine/src/geo.rs
// Great-circle distance between coordinates

use roulette_types::LatLng;

/// Mean Earth radius in meters
const EARTH_RADIUS_M: f64 = 6_371_000.0;

/// Haversine distance between two points, in meters
pub fn distance_m(a: LatLng, b: LatLng) -> f64 {
    let dlat = (b.lat - a.lat).to_radians();
    let dlng = (b.lng - a.lng).to_radians();
    let h = (dlat / 2.0).sin().powi(2)
        + a.lat.to_radians().cos() * b.lat.to_radians().cos() * (dlng / 2.0).sin().powi(2);
    let c = 2.0 * h.sqrt().atan2((1.0 - h).sqrt());
    EARTH_RADIUS_M * c
}

/// Haversine distance in kilometers
pub fn distance_km(a: LatLng, b: LatLng) -> f64 {
    distance_m(a, b) / 1000.0
}
