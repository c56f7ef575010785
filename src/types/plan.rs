//! Daily plan types

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use super::{BreakRecommendation, Coordinates, OptimizedRoute, Priority, RouteOptions, TimeWindow};

/// Where the driver starts the day
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DriverLocation {
    pub address: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub coordinates: Option<Coordinates>,
}

/// A shipment to move today: one pickup and one delivery
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Shipment {
    pub id: String,
    pub pickup_address: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pickup_coordinates: Option<Coordinates>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pickup_window: Option<TimeWindow>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pickup_dwell_minutes: Option<u32>,
    pub delivery_address: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub delivery_coordinates: Option<Coordinates>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub delivery_window: Option<TimeWindow>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub delivery_dwell_minutes: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub priority: Option<Priority>,
}

/// Request to generate a daily plan (CLI input)
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DailyPlanRequest {
    pub driver_location: DriverLocation,
    pub shipments: Vec<Shipment>,
    #[serde(default)]
    pub options: RouteOptions,
}

/// Day-level totals across all routes
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DailyTotals {
    pub distance_miles: f64,
    pub duration_minutes: f64,
    pub fuel_cost: f64,
    pub shipment_count: usize,
    pub stop_count: usize,
    pub break_minutes: u32,
}

/// One day's plan for a driver
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DailyPlan {
    pub date: NaiveDate,
    pub driver_start: DriverLocation,
    pub routes: Vec<OptimizedRoute>,
    pub totals: DailyTotals,
    pub breaks: Vec<BreakRecommendation>,
    pub summary: String,
    pub generated_at: DateTime<Utc>,
}
