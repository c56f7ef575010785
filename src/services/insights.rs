//! Route insights: corridors, rush-hour traffic, seasonal notes, fuel stops
//! and driver coaching tips.
//!
//! Everything here is table-driven heuristics over an assembled route. Only the
//! fuel-stop recommender talks to the geo provider.

use std::collections::HashSet;

use chrono::{DateTime, Datelike, NaiveDateTime, Timelike, Utc, Weekday};
use tracing::{debug, warn};

use crate::defaults::{
    miles_to_meters, DEFAULT_FUEL_SEARCH_RADIUS_METERS, ESTIMATE_SPEED_MPH, FUEL_SAFETY_FACTOR,
    FUEL_TRIGGER_FRACTION, MAX_COACHING_TIPS,
};
use crate::services::routing::{GeoProvider, Waypoint};
use crate::services::tables::{ReferenceTables, VehicleProfile};
use crate::types::{
    FuelStopRecommendation, Insight, InsightCategory, OptimizedStop, RouteLeg, RouteSavings,
    Severity, VehicleType,
};

fn insight(
    category: InsightCategory,
    severity: Severity,
    title: impl Into<String>,
    message: impl Into<String>,
    leg_index: Option<usize>,
) -> Insight {
    Insight {
        category,
        severity,
        title: title.into(),
        message: message.into(),
        leg_index,
    }
}

/// Endpoint stops of leg `k` (stops `k` and `k + 1`)
fn leg_endpoints(stops: &[OptimizedStop], k: usize) -> Option<(&OptimizedStop, &OptimizedStop)> {
    Some((stops.get(k)?, stops.get(k + 1)?))
}

// ---------------------------------------------------------------------------
// Corridors and traffic
// ---------------------------------------------------------------------------

/// One `info` insight per corridor, tagged with the first leg that touches it
pub fn corridor_insights(tables: &ReferenceTables, stops: &[OptimizedStop]) -> Vec<Insight> {
    let mut seen = HashSet::new();
    let mut insights = Vec::new();

    for k in 0..stops.len().saturating_sub(1) {
        let Some((from, to)) = leg_endpoints(stops, k) else {
            continue;
        };
        for corridor in &tables.corridors {
            let city = corridor
                .matched_city(&from.stop.address)
                .or_else(|| corridor.matched_city(&to.stop.address));
            let Some(city) = city else {
                continue;
            };
            if !seen.insert(corridor.name.as_str()) {
                continue;
            }
            insights.push(insight(
                InsightCategory::Corridor,
                Severity::Info,
                format!("{} corridor", corridor.name),
                format!(
                    "Leg {} passes through {} on the {} ({}).",
                    k + 1,
                    city,
                    corridor.name,
                    corridor.description
                ),
                Some(k),
            ));
        }
    }

    insights
}

/// Rush-hour warnings for legs arriving in a metro zone during its peak
pub fn traffic_insights(tables: &ReferenceTables, stops: &[OptimizedStop]) -> Vec<Insight> {
    let mut seen = HashSet::new();
    let mut insights = Vec::new();

    for k in 0..stops.len().saturating_sub(1) {
        let Some((from, to)) = leg_endpoints(stops, k) else {
            continue;
        };
        let Some(zone) = tables
            .zone_for(&to.stop.address)
            .or_else(|| tables.zone_for(&from.stop.address))
        else {
            continue;
        };
        let arrival = to.estimated_arrival;
        let Some(period) = zone.peak_at(arrival) else {
            continue;
        };
        if !seen.insert((zone.name.as_str(), period.as_str())) {
            continue;
        }
        insights.push(insight(
            InsightCategory::Traffic,
            Severity::Warning,
            format!("{} {} rush hour", zone.name, period.as_str()),
            format!(
                "Leg {} arrives around {}:00 local time. Expect about {}% longer travel; hotspots: {}.",
                k + 1,
                zone.local_hour(arrival),
                zone.delay_percent,
                zone.hotspots.join(", ")
            ),
            Some(k),
        ));
    }

    insights
}

// ---------------------------------------------------------------------------
// Seasonal notes
// ---------------------------------------------------------------------------

pub fn weather_insight(departure: DateTime<Utc>) -> Insight {
    let (severity, title, message) = match departure.month() {
        12 | 1 | 2 => (
            Severity::Warning,
            "Winter driving",
            "Snow and ice are possible on northern routes and mountain passes. Check chain requirements and allow extra stopping distance.",
        ),
        3..=5 => (
            Severity::Info,
            "Spring storms",
            "Severe thunderstorms and tornado watches are common across the Plains. Watch for high-wind advisories on open highway.",
        ),
        6..=8 => (
            Severity::Info,
            "Summer heat",
            "High temperatures stress tires and reefer units. Hurricane season is active along the Gulf and Atlantic coasts.",
        ),
        _ => (
            Severity::Info,
            "Fall conditions",
            "Hurricane season runs through November and morning fog is common in river valleys.",
        ),
    };
    insight(InsightCategory::Weather, severity, title, message, None)
}

/// April through October, when the route uses any named corridor
pub fn construction_insight(departure: DateTime<Utc>, legs: &[RouteLeg]) -> Option<Insight> {
    if !(4..=10).contains(&departure.month()) {
        return None;
    }
    let mut corridors: Vec<&str> = Vec::new();
    for name in legs.iter().flat_map(|leg| leg.corridors.iter()) {
        if !corridors.contains(&name.as_str()) {
            corridors.push(name);
        }
    }
    if corridors.is_empty() {
        return None;
    }
    Some(insight(
        InsightCategory::Construction,
        Severity::Info,
        "Construction season",
        format!(
            "Work zones are likely on {}. Expect lane closures and reduced speed limits.",
            corridors.join(", ")
        ),
        None,
    ))
}

// ---------------------------------------------------------------------------
// Fuel stops
// ---------------------------------------------------------------------------

/// Miles after which a refuel is recommended
pub fn fuel_trigger_miles(profile: &VehicleProfile) -> f64 {
    profile.tank_capacity_gallons * profile.fuel_economy_mpg * FUEL_SAFETY_FACTOR * FUEL_TRIGGER_FRACTION
}

/// Distance covered in `max_detour_minutes` at the estimate speed
pub fn fuel_search_radius_meters(max_detour_minutes: Option<u32>) -> f64 {
    match max_detour_minutes.filter(|&m| m > 0) {
        Some(minutes) => miles_to_meters(ESTIMATE_SPEED_MPH * f64::from(minutes) / 60.0),
        None => DEFAULT_FUEL_SEARCH_RADIUS_METERS,
    }
}

/// Walk the legs accumulating miles; each time the trigger is exceeded,
/// look for a station near the leg's endpoint and reset.
pub async fn recommend_fuel_stops(
    provider: &dyn GeoProvider,
    profile: &VehicleProfile,
    stops: &[OptimizedStop],
    legs: &[RouteLeg],
    max_detour_minutes: Option<u32>,
) -> Vec<FuelStopRecommendation> {
    let threshold = fuel_trigger_miles(profile);
    let radius = fuel_search_radius_meters(max_detour_minutes);
    let mut since_fuel = 0.0;
    let mut recommendations = Vec::new();

    for (k, leg) in legs.iter().enumerate() {
        since_fuel += leg.distance_miles;
        if since_fuel <= threshold {
            continue;
        }
        let Some(endpoint) = stops.get(k + 1) else {
            break;
        };

        let point = Waypoint::from(&endpoint.stop).resolved_coordinates();
        let station = match provider.nearby_points_of_interest(point, radius, "fuel").await {
            Ok(pois) => pois.into_iter().next(),
            Err(e) => {
                warn!("Fuel station search near {} failed: {}", endpoint.stop.id, e);
                None
            }
        };

        recommendations.push(FuelStopRecommendation {
            after_stop_index: k + 1,
            miles_since_last_fuel: since_fuel,
            reason: format!(
                "{:.0} miles since last fuel; refuel threshold is {:.1} miles",
                since_fuel, threshold
            ),
            station,
        });
        since_fuel = 0.0;
    }

    debug!("{} fuel stops recommended (threshold {:.1} mi)", recommendations.len(), threshold);
    recommendations
}

// ---------------------------------------------------------------------------
// Coaching tips
// ---------------------------------------------------------------------------

/// Inputs for coaching tips
#[derive(Debug, Clone, Copy)]
pub struct TipContext<'a> {
    pub savings: &'a RouteSavings,
    /// Departure in the start's local time; hour and weekday both come from here
    pub local_departure: NaiveDateTime,
    pub stop_count: usize,
    pub vehicle_type: VehicleType,
    pub remaining_deadheads: usize,
}

fn is_rush_hour(hour: u32) -> bool {
    (6..9).contains(&hour) || (15..19).contains(&hour)
}

fn vehicle_tip(vehicle_type: VehicleType) -> &'static str {
    match vehicle_type {
        VehicleType::SemiTruck => {
            "Check low-clearance bridges and truck-restricted streets near urban stops before you roll."
        }
        VehicleType::BoxTruck => {
            "Commercial loading zones fit a box truck; confirm height limits before entering parking structures."
        }
        VehicleType::CargoVan => {
            "A van fits standard parking; group nearby deliveries and walk them to save repositioning."
        }
        VehicleType::PickupTruck => {
            "Secure loads and stay within payload limits, especially with a hitched trailer."
        }
    }
}

fn day_tip(day: Weekday) -> Option<&'static str> {
    match day {
        Weekday::Mon => Some("Monday docks often carry weekend backlog; allow extra dwell time."),
        Weekday::Fri => Some("Receivers often close early on Fridays; front-load time-sensitive deliveries."),
        Weekday::Sat | Weekday::Sun => Some("Many receivers are closed on weekends; confirm hours before departing."),
        _ => None,
    }
}

/// Up to five tips, highest priority first
pub fn coaching_tips(ctx: &TipContext<'_>) -> Vec<Insight> {
    let mut candidates: Vec<(u8, &str, String)> = Vec::new();

    if ctx.savings.percent_improvement > 10.0 {
        candidates.push((
            1,
            "Big win from reordering",
            format!(
                "This order saves {:.1} miles ({:.0}%) over your original sequence.",
                ctx.savings.distance_saved_miles, ctx.savings.percent_improvement
            ),
        ));
    }
    if ctx.remaining_deadheads > 0 {
        candidates.push((
            2,
            "Fill empty legs",
            format!(
                "{} empty leg(s) remain between a delivery and the next pickup. Look for backhaul loads near those deliveries.",
                ctx.remaining_deadheads
            ),
        ));
    }
    let hour = ctx.local_departure.hour();
    if is_rush_hour(hour) {
        candidates.push((
            3,
            "Rush-hour departure",
            format!(
                "Leaving at {}:00 puts you in peak traffic. Departing before 6:00 or after 9:00 usually cuts urban delays.",
                hour
            ),
        ));
    }
    if ctx.stop_count > 8 {
        candidates.push((
            4,
            "Dense route",
            format!(
                "With {} stops, call ahead to confirm dock availability and avoid waiting.",
                ctx.stop_count
            ),
        ));
    }
    if let Some(tip) = day_tip(ctx.local_departure.weekday()) {
        candidates.push((5, "Day-of-week note", tip.to_string()));
    }
    candidates.push((6, "Vehicle tip", vehicle_tip(ctx.vehicle_type).to_string()));

    candidates.sort_by_key(|(priority, _, _)| *priority);
    candidates
        .into_iter()
        .take(MAX_COACHING_TIPS)
        .map(|(_, title, message)| insight(InsightCategory::Tip, Severity::Info, title, message, None))
        .collect()
}
