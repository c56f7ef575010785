//! Route types (optimizer output)

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::{Coordinates, Stop};

/// Vehicle class, selects fuel economy and tank size from the reference tables
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VehicleType {
    #[default]
    SemiTruck,
    BoxTruck,
    CargoVan,
    PickupTruck,
}

impl VehicleType {
    pub const fn as_str(self) -> &'static str {
        match self {
            VehicleType::SemiTruck => "semi_truck",
            VehicleType::BoxTruck => "box_truck",
            VehicleType::CargoVan => "cargo_van",
            VehicleType::PickupTruck => "pickup_truck",
        }
    }
}

/// Options for a single optimization request
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RouteOptions {
    pub vehicle_type: VehicleType,
    /// Departure from the first stop. Defaults to the time of the call.
    pub departure_time: Option<DateTime<Utc>>,
    pub return_to_origin: bool,
    pub avoid_highways: bool,
    /// Enables fuel-stop recommendations
    pub prioritize_fuel: bool,
    /// Advisory only: sizes the fuel-stop search radius, never bounds the tour.
    pub max_detour_minutes: Option<u32>,
}

/// Request to optimize a route (CLI input)
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OptimizeRouteRequest {
    pub stops: Vec<Stop>,
    #[serde(default)]
    pub options: RouteOptions,
}

/// A stop in its optimized position
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OptimizedStop {
    #[serde(flatten)]
    pub stop: Stop,
    /// 1-based visiting order
    pub order: usize,
    pub estimated_arrival: DateTime<Utc>,
    pub estimated_departure: DateTime<Utc>,
    pub distance_from_previous_meters: f64,
    pub distance_from_previous_miles: f64,
    pub duration_from_previous_minutes: f64,
}

/// A single turn-by-turn instruction
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RouteStep {
    pub instruction: String,
    pub distance_meters: f64,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub street_names: Vec<String>,
}

/// Directed edge between two consecutive stops
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RouteLeg {
    pub from_stop_id: String,
    pub to_stop_id: String,
    pub distance_meters: f64,
    pub distance_miles: f64,
    pub duration_minutes: f64,
    pub corridors: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub traffic_warning: Option<String>,
    /// [lng, lat] pairs (GeoJSON order)
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub polyline: Vec<[f64; 2]>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub steps: Vec<RouteStep>,
    /// `true` when the provider failed and the leg was derived from the matrix
    pub estimated: bool,
}

/// Aggregate route totals
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RouteSummary {
    pub total_distance_meters: f64,
    pub total_distance_miles: f64,
    /// Travel + dwell
    pub total_duration_minutes: f64,
    pub travel_minutes: f64,
    pub dwell_minutes: f64,
    pub fuel_gallons: f64,
    pub fuel_cost: f64,
    pub fuel_price_per_gallon: f64,
    pub stop_count: usize,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    /// 0-100
    pub efficiency_score: u8,
}

/// Comparison against the naive (input order) route. All fields are >= 0.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RouteSavings {
    pub distance_saved_miles: f64,
    pub time_saved_minutes: f64,
    pub fuel_cost_saved: f64,
    pub empty_miles_saved: f64,
    pub percent_improvement: f64,
}

/// A point of interest returned by the geo provider
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PointOfInterest {
    pub name: String,
    pub address: String,
    pub coordinates: Coordinates,
}

/// Advisory fuel stop, attached after a stop index
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FuelStopRecommendation {
    /// 0-based index into the optimized stops
    pub after_stop_index: usize,
    pub miles_since_last_fuel: f64,
    pub reason: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub station: Option<PointOfInterest>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BreakKind {
    /// Required by duty-hour rules
    Mandatory,
    /// Advisory meal break
    Meal,
}

/// Advisory break, attached after a stop index
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BreakRecommendation {
    pub after_stop_index: usize,
    pub kind: BreakKind,
    pub duration_minutes: u32,
    pub estimated_start: DateTime<Utc>,
    pub reason: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InsightCategory {
    Corridor,
    Traffic,
    Weather,
    Construction,
    Tip,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    Info,
    Warning,
    Critical,
}

/// Human-readable route insight
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Insight {
    pub category: InsightCategory,
    pub severity: Severity,
    pub title: String,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub leg_index: Option<usize>,
}

/// Warning about route issues
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RouteWarning {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stop_id: Option<String>,
    pub warning_type: String,
    pub message: String,
}

/// Result of route optimization
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OptimizedRoute {
    pub id: Uuid,
    pub stops: Vec<OptimizedStop>,
    pub legs: Vec<RouteLeg>,
    /// Last stop back to the first, when return-to-origin was requested
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub return_leg: Option<RouteLeg>,
    pub summary: RouteSummary,
    pub savings: RouteSavings,
    pub insights: Vec<Insight>,
    pub fuel_stops: Vec<FuelStopRecommendation>,
    pub warnings: Vec<RouteWarning>,
    /// Set when any matrix batch or leg fell back to an estimate
    pub degraded: bool,
    pub algorithm: String,
    pub solve_time_ms: u64,
}

impl OptimizedRoute {
    /// Stop identifiers in visiting order
    pub fn stop_ids(&self) -> Vec<&str> {
        self.stops.iter().map(|s| s.stop.id.as_str()).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_route_options_defaults_from_empty_json() {
        let options: RouteOptions = serde_json::from_str("{}").unwrap();
        assert_eq!(options.vehicle_type, VehicleType::SemiTruck);
        assert!(options.departure_time.is_none());
        assert!(!options.return_to_origin);
        assert!(!options.prioritize_fuel);
        assert!(options.max_detour_minutes.is_none());
    }

    #[test]
    fn test_vehicle_type_serializes_snake_case() {
        let json = serde_json::to_string(&VehicleType::CargoVan).unwrap();
        assert_eq!(json, "\"cargo_van\"");
        assert_eq!(VehicleType::CargoVan.as_str(), "cargo_van");
    }

    #[test]
    fn test_optimize_request_options_optional() {
        let json = r#"{"stops": [
            {"id": "a", "address": "Yard", "kind": "current_location"},
            {"id": "b", "address": "Dock 4", "kind": "pickup"}
        ]}"#;
        let request: OptimizeRouteRequest = serde_json::from_str(json).unwrap();
        assert_eq!(request.stops.len(), 2);
        assert!(!request.options.avoid_highways);
    }
}
