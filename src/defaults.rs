//! Engine-wide constants and configuration defaults

pub const DEFAULT_DWELL_MINUTES: u32 = 15;

pub const METERS_PER_MILE: f64 = 1609.344;

/// Average speed used when a leg has to be estimated from the matrix (55 mph).
pub const ESTIMATE_SPEED_MPH: f64 = 55.0;

/// Finite "unreachable" penalty for failed matrix cells (100,000 km).
pub const SENTINEL_DISTANCE_METERS: f64 = 100_000_000.0;
/// Travel time paired with the distance sentinel (~1157 days).
pub const SENTINEL_DURATION_SECONDS: f64 = 100_000_000.0;

pub const DEFAULT_MATRIX_BATCH_SIZE: usize = 10;
pub const DEFAULT_MATRIX_CONCURRENCY: usize = 4;

pub const TWO_OPT_MAX_PASSES: usize = 1000;
pub const TWO_OPT_EPSILON: f64 = 1e-6;

pub const DEFAULT_OPTIMIZE_TIMEOUT_SECS: u64 = 30;

/// Fraction of the nominal tank range considered usable.
pub const FUEL_SAFETY_FACTOR: f64 = 0.75;
/// Recommend refueling once this share of the safe range has been driven.
pub const FUEL_TRIGGER_FRACTION: f64 = 0.6;
/// Fuel-stop search radius when no max detour is given (5 miles).
pub const DEFAULT_FUEL_SEARCH_RADIUS_METERS: f64 = 8_046.72;

pub const MAX_COACHING_TIPS: usize = 5;

// Duty-hour rules
pub const DEFAULT_BREAK_AFTER_DRIVING_MINUTES: u32 = 480;
pub const DEFAULT_BREAK_DURATION_MINUTES: u32 = 30;
pub const DEFAULT_MEAL_INTERVAL_MINUTES: u32 = 360;
pub const DEFAULT_MEAL_DURATION_MINUTES: u32 = 30;

pub fn meters_to_miles(meters: f64) -> f64 {
    meters / METERS_PER_MILE
}

pub fn miles_to_meters(miles: f64) -> f64 {
    miles * METERS_PER_MILE
}

/// Minutes needed to drive `meters` at the estimate speed.
pub fn estimated_minutes(meters: f64) -> f64 {
    meters_to_miles(meters) / ESTIMATE_SPEED_MPH * 60.0
}
