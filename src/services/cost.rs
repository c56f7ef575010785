//! Fuel cost, savings versus the input order, and the efficiency score

use crate::defaults::meters_to_miles;
use crate::services::matrix::DistanceMatrix;
use crate::services::tables::VehicleProfile;
use crate::types::{RouteSavings, Stop, StopKind};

/// Gallons and cost for a distance
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FuelEstimate {
    pub gallons: f64,
    pub price_per_gallon: f64,
    pub cost: f64,
}

pub fn fuel_estimate(miles: f64, profile: &VehicleProfile, price_per_gallon: f64) -> FuelEstimate {
    let gallons = if profile.fuel_economy_mpg > 0.0 {
        miles.max(0.0) / profile.fuel_economy_mpg
    } else {
        0.0
    };
    FuelEstimate {
        gallons,
        price_per_gallon,
        cost: gallons * price_per_gallon,
    }
}

fn is_deadhead(stops: &[Stop], from: usize, to: usize) -> bool {
    stops[from].kind == StopKind::Delivery && stops[to].kind == StopKind::Pickup
}

/// Delivery → pickup transitions still present in `order`
pub fn remaining_deadheads(stops: &[Stop], order: &[usize]) -> usize {
    order
        .windows(2)
        .filter(|pair| is_deadhead(stops, pair[0], pair[1]))
        .count()
}

/// Empty miles the optimized order no longer drives.
///
/// Each naive delivery → pickup hop is compared with the deadhead the
/// optimized order still drives out of the same delivery (zero when that
/// delivery is no longer followed by a pickup).
pub fn empty_miles_saved(
    matrix: &DistanceMatrix,
    stops: &[Stop],
    naive: &[usize],
    optimized: &[usize],
) -> f64 {
    let saved_meters: f64 = naive
        .windows(2)
        .filter(|pair| is_deadhead(stops, pair[0], pair[1]))
        .map(|pair| {
            let (delivery, pickup) = (pair[0], pair[1]);
            let still_driven = optimized
                .iter()
                .position(|&i| i == delivery)
                .and_then(|p| optimized.get(p + 1))
                .filter(|&&next| stops[next].kind == StopKind::Pickup)
                .map_or(0.0, |&next| matrix.distance(delivery, next));
            (matrix.distance(delivery, pickup) - still_driven).max(0.0)
        })
        .sum();
    meters_to_miles(saved_meters)
}

/// Savings of `optimized` over `naive`, all measured on the matrix and
/// floored at zero.
pub fn route_savings(
    matrix: &DistanceMatrix,
    stops: &[Stop],
    naive: &[usize],
    optimized: &[usize],
    closed: bool,
    profile: &VehicleProfile,
    price_per_gallon: f64,
) -> RouteSavings {
    let naive_meters = matrix.path_distance(naive, closed);
    let saved_meters = (naive_meters - matrix.path_distance(optimized, closed)).max(0.0);
    let saved_seconds =
        (matrix.path_duration(naive, closed) - matrix.path_duration(optimized, closed)).max(0.0);

    let distance_saved_miles = meters_to_miles(saved_meters);
    let percent_improvement = if naive_meters > 0.0 {
        saved_meters / naive_meters * 100.0
    } else {
        0.0
    };

    RouteSavings {
        distance_saved_miles,
        time_saved_minutes: saved_seconds / 60.0,
        fuel_cost_saved: fuel_estimate(distance_saved_miles, profile, price_per_gallon).cost,
        empty_miles_saved: empty_miles_saved(matrix, stops, naive, optimized),
        percent_improvement,
    }
}

/// 100, minus 10 per missed window, 5 per remaining deadhead and 15 when
/// degraded; clamped to 0..=100.
pub fn efficiency_score(missed_windows: usize, remaining_deadheads: usize, degraded: bool) -> u8 {
    let mut score: i64 = 100;
    score -= 10 * missed_windows as i64;
    score -= 5 * remaining_deadheads as i64;
    if degraded {
        score -= 15;
    }
    score.clamp(0, 100) as u8
}
