//! Stop types (optimizer input)

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::defaults::DEFAULT_DWELL_MINUTES;

/// Coordinates
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Coordinates {
    pub lat: f64,
    pub lng: f64,
}

/// Kind of stop on a route
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StopKind {
    Pickup,
    Delivery,
    Fuel,
    Rest,
    CurrentLocation,
}

impl StopKind {
    pub const fn as_str(self) -> &'static str {
        match self {
            StopKind::Pickup => "pickup",
            StopKind::Delivery => "delivery",
            StopKind::Fuel => "fuel",
            StopKind::Rest => "rest",
            StopKind::CurrentLocation => "current_location",
        }
    }
}

/// Stop priority. Ordering follows rank: `High < Medium < Low`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Priority {
    High,
    #[default]
    Medium,
    Low,
}

impl Priority {
    pub const fn rank(self) -> u8 {
        match self {
            Priority::High => 0,
            Priority::Medium => 1,
            Priority::Low => 2,
        }
    }
}

/// Delivery/pickup time window
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TimeWindow {
    pub earliest: Option<DateTime<Utc>>,
    pub latest: Option<DateTime<Utc>>,
}

impl TimeWindow {
    pub fn new(earliest: Option<DateTime<Utc>>, latest: Option<DateTime<Utc>>) -> Self {
        Self { earliest, latest }
    }

    /// `true` if `arrival` is after the latest allowed time.
    pub fn is_missed_by(&self, arrival: DateTime<Utc>) -> bool {
        self.latest.is_some_and(|latest| arrival > latest)
    }
}

/// A location to visit
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Stop {
    pub id: String,
    pub address: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub coordinates: Option<Coordinates>,
    pub kind: StopKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub shipment_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub time_window: Option<TimeWindow>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dwell_minutes: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub priority: Option<Priority>,
}

impl Stop {
    pub fn new(id: impl Into<String>, address: impl Into<String>, kind: StopKind) -> Self {
        Self {
            id: id.into(),
            address: address.into(),
            coordinates: None,
            kind,
            shipment_id: None,
            time_window: None,
            dwell_minutes: None,
            priority: None,
        }
    }

    pub fn with_coordinates(mut self, lat: f64, lng: f64) -> Self {
        self.coordinates = Some(Coordinates { lat, lng });
        self
    }

    pub fn with_time_window(mut self, window: TimeWindow) -> Self {
        self.time_window = Some(window);
        self
    }

    pub fn with_priority(mut self, priority: Priority) -> Self {
        self.priority = Some(priority);
        self
    }

    pub fn with_dwell_minutes(mut self, minutes: u32) -> Self {
        self.dwell_minutes = Some(minutes);
        self
    }

    pub fn with_shipment(mut self, shipment_id: impl Into<String>) -> Self {
        self.shipment_id = Some(shipment_id.into());
        self
    }

    /// Expected dwell time. The driver's current location costs nothing.
    pub fn dwell(&self) -> u32 {
        match (self.dwell_minutes, self.kind) {
            (Some(explicit), _) => explicit,
            (None, StopKind::CurrentLocation) => 0,
            (None, _) => DEFAULT_DWELL_MINUTES,
        }
    }

    pub fn priority(&self) -> Priority {
        self.priority.unwrap_or_default()
    }

    /// Latest allowed arrival, if the stop carries one.
    pub fn deadline(&self) -> Option<DateTime<Utc>> {
        self.time_window.and_then(|tw| tw.latest)
    }
}
