//! Geographic calculations

use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};

use crate::types::Coordinates;

/// Earth radius in kilometers
const EARTH_RADIUS_KM: f64 = 6371.0;

/// Road distance coefficient (straight line to road)
pub const ROAD_COEFFICIENT: f64 = 1.25;

/// Calculate Haversine distance between two points in kilometers
pub fn haversine_distance(from: &Coordinates, to: &Coordinates) -> f64 {
    let d_lat = (to.lat - from.lat).to_radians();
    let d_lon = (to.lng - from.lng).to_radians();

    let lat1 = from.lat.to_radians();
    let lat2 = to.lat.to_radians();

    let a = (d_lat / 2.0).sin().powi(2)
        + lat1.cos() * lat2.cos() * (d_lon / 2.0).sin().powi(2);

    let c = 2.0 * a.sqrt().asin();

    EARTH_RADIUS_KM * c
}

/// Estimate road distance in meters from straight-line distance
pub fn road_distance_meters(from: &Coordinates, to: &Coordinates, road_coefficient: f64) -> f64 {
    haversine_distance(from, to) * road_coefficient * 1000.0
}

/// Seconds needed to cover `meters` at `speed_kmh`
pub fn travel_seconds(meters: f64, speed_kmh: f64) -> f64 {
    if speed_kmh <= 0.0 {
        return 0.0;
    }
    meters / 1000.0 / speed_kmh * 3600.0
}

/// Deterministic stand-in coordinates for an address that was never geocoded.
///
/// Hashes the normalized address into the contiguous United States, away from
/// the borders.
pub fn synthetic_coordinates(address: &str) -> Coordinates {
    let mut hasher = DefaultHasher::new();
    address.trim().to_lowercase().hash(&mut hasher);
    let hash = hasher.finish();

    const LAT_MIN: f64 = 30.0;
    const LAT_MAX: f64 = 45.0;
    const LNG_MIN: f64 = -118.0;
    const LNG_MAX: f64 = -75.0;

    let lat_normalized = ((hash >> 32) as f64) / (u32::MAX as f64);
    let lng_normalized = ((hash & 0xFFFF_FFFF) as f64) / (u32::MAX as f64);

    Coordinates {
        lat: LAT_MIN + lat_normalized * (LAT_MAX - LAT_MIN),
        lng: LNG_MIN + lng_normalized * (LNG_MAX - LNG_MIN),
    }
}

/// Point `fraction` of the way from `from` to `to` (linear, fine for short hops)
pub fn interpolate(from: &Coordinates, to: &Coordinates, fraction: f64) -> Coordinates {
    let f = fraction.clamp(0.0, 1.0);
    Coordinates {
        lat: from.lat + (to.lat - from.lat) * f,
        lng: from.lng + (to.lng - from.lng) * f,
    }
}
