//! Read-only reference tables: highway corridors, metro traffic zones,
//! regional fuel prices and vehicle profiles.
//!
//! Built once at startup (built-in defaults or a JSON file) and shared via
//! `Arc<ReferenceTables>`. Nothing in here is mutated after construction.

use std::collections::HashMap;
use std::path::Path;

use anyhow::{Context, Result};
use chrono::{DateTime, Duration, NaiveDateTime, Timelike, Utc};
use serde::{Deserialize, Serialize};

use crate::types::VehicleType;

/// Named highway corridor and the cities it passes through
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Corridor {
    pub name: String,
    pub description: String,
    pub cities: Vec<String>,
}

impl Corridor {
    /// First corridor city mentioned in `address`, if any
    pub fn matched_city(&self, address: &str) -> Option<&str> {
        let lower = address.to_lowercase();
        self.cities
            .iter()
            .find(|city| lower.contains(&city.to_lowercase()))
            .map(String::as_str)
    }
}

/// Local-time peak window, `[start_hour, end_hour)`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PeakWindow {
    pub start_hour: u32,
    pub end_hour: u32,
}

impl PeakWindow {
    pub const fn new(start_hour: u32, end_hour: u32) -> Self {
        Self { start_hour, end_hour }
    }

    pub fn contains_hour(&self, hour: u32) -> bool {
        hour >= self.start_hour && hour < self.end_hour
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PeakPeriod {
    Morning,
    Evening,
}

impl PeakPeriod {
    pub const fn as_str(self) -> &'static str {
        match self {
            PeakPeriod::Morning => "morning",
            PeakPeriod::Evening => "evening",
        }
    }
}

/// Metro area with rush-hour windows and typical delay
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MetroZone {
    pub name: String,
    pub cities: Vec<String>,
    /// Standard-time offset from UTC; daylight saving is not modelled.
    pub utc_offset_hours: i32,
    pub morning_peak: PeakWindow,
    pub evening_peak: PeakWindow,
    pub delay_percent: u32,
    pub hotspots: Vec<String>,
}

impl MetroZone {
    pub fn matches(&self, address: &str) -> bool {
        let lower = address.to_lowercase();
        self.cities.iter().any(|city| lower.contains(&city.to_lowercase()))
    }

    /// Wall-clock time in the zone
    pub fn local_time(&self, at: DateTime<Utc>) -> NaiveDateTime {
        (at + Duration::hours(i64::from(self.utc_offset_hours))).naive_utc()
    }

    /// Hour of day in the zone's local time
    pub fn local_hour(&self, at: DateTime<Utc>) -> u32 {
        self.local_time(at).hour()
    }

    pub fn peak_at(&self, at: DateTime<Utc>) -> Option<PeakPeriod> {
        let hour = self.local_hour(at);
        if self.morning_peak.contains_hour(hour) {
            Some(PeakPeriod::Morning)
        } else if self.evening_peak.contains_hour(hour) {
            Some(PeakPeriod::Evening)
        } else {
            None
        }
    }
}

/// Fuel characteristics of a vehicle class
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VehicleProfile {
    pub fuel_economy_mpg: f64,
    pub tank_capacity_gallons: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReferenceTables {
    pub corridors: Vec<Corridor>,
    pub metro_zones: Vec<MetroZone>,
    /// Price per gallon keyed by two-letter state code
    pub fuel_prices: HashMap<String, f64>,
    pub default_fuel_price: f64,
    pub vehicles: HashMap<VehicleType, VehicleProfile>,
}

impl Default for ReferenceTables {
    fn default() -> Self {
        Self::builtin()
    }
}

impl ReferenceTables {
    /// Load tables from a JSON file
    pub fn from_json_file(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read reference tables from {}", path.display()))?;
        serde_json::from_str(&raw)
            .with_context(|| format!("Invalid reference tables in {}", path.display()))
    }

    pub fn vehicle_profile(&self, vehicle_type: VehicleType) -> VehicleProfile {
        self.vehicles
            .get(&vehicle_type)
            .copied()
            .unwrap_or(VehicleProfile {
                fuel_economy_mpg: 6.5,
                tank_capacity_gallons: 150.0,
            })
    }

    /// State code found in `address` that has a price entry.
    /// Scans from the end since the state usually follows the city.
    pub fn state_code<'a>(&self, address: &'a str) -> Option<&'a str> {
        address
            .split(|c: char| !c.is_ascii_alphanumeric())
            .rev()
            .find(|token| {
                token.len() == 2
                    && token.chars().all(|c| c.is_ascii_uppercase())
                    && self.fuel_prices.contains_key(*token)
            })
    }

    /// Price per gallon for the region of `address`, or the fallback price
    pub fn fuel_price_for(&self, address: &str) -> f64 {
        self.state_code(address)
            .and_then(|state| self.fuel_prices.get(state).copied())
            .unwrap_or(self.default_fuel_price)
    }

    pub fn corridors_for<'a>(&'a self, address: &'a str) -> impl Iterator<Item = &'a Corridor> + 'a {
        self.corridors
            .iter()
            .filter(move |c| c.matched_city(address).is_some())
    }

    pub fn zone_for(&self, address: &str) -> Option<&MetroZone> {
        self.metro_zones.iter().find(|z| z.matches(address))
    }

    /// Built-in defaults
    pub fn builtin() -> Self {
        let corridor = |name: &str, description: &str, cities: &[&str]| Corridor {
            name: name.to_string(),
            description: description.to_string(),
            cities: cities.iter().map(|c| c.to_string()).collect(),
        };

        let corridors = vec![
            corridor(
                "I-95",
                "East Coast freight spine",
                &["Miami", "Jacksonville", "Savannah", "Richmond", "Washington", "Baltimore", "Philadelphia", "New York", "Boston"],
            ),
            corridor(
                "I-10",
                "Southern transcontinental route",
                &["Los Angeles", "Phoenix", "Tucson", "El Paso", "San Antonio", "Houston", "New Orleans", "Jacksonville"],
            ),
            corridor(
                "I-35",
                "NAFTA corridor from Laredo to the Twin Cities",
                &["Laredo", "San Antonio", "Austin", "Dallas", "Fort Worth", "Oklahoma City", "Kansas City", "Des Moines", "Minneapolis"],
            ),
            corridor(
                "I-40",
                "Cross-country route through the Sun Belt",
                &["Barstow", "Flagstaff", "Albuquerque", "Amarillo", "Oklahoma City", "Little Rock", "Memphis", "Nashville", "Knoxville", "Raleigh"],
            ),
            corridor(
                "I-80",
                "Northern transcontinental route",
                &["San Francisco", "Sacramento", "Reno", "Salt Lake City", "Cheyenne", "Omaha", "Des Moines", "Chicago", "Cleveland"],
            ),
            corridor(
                "I-5",
                "West Coast route",
                &["San Diego", "Los Angeles", "Sacramento", "Portland", "Seattle"],
            ),
            corridor("I-45", "Dallas to the Gulf Coast", &["Dallas", "Houston", "Galveston"]),
            corridor(
                "I-70",
                "Central east-west route",
                &["Denver", "Kansas City", "St. Louis", "Indianapolis", "Columbus", "Baltimore"],
            ),
        ];

        let zone = |name: &str,
                    cities: &[&str],
                    utc_offset_hours: i32,
                    morning: PeakWindow,
                    evening: PeakWindow,
                    delay_percent: u32,
                    hotspots: &[&str]| MetroZone {
            name: name.to_string(),
            cities: cities.iter().map(|c| c.to_string()).collect(),
            utc_offset_hours,
            morning_peak: morning,
            evening_peak: evening,
            delay_percent,
            hotspots: hotspots.iter().map(|h| h.to_string()).collect(),
        };

        let metro_zones = vec![
            zone(
                "Dallas-Fort Worth",
                &["Dallas", "Fort Worth", "Arlington", "Irving", "Plano"],
                -6,
                PeakWindow::new(7, 9),
                PeakWindow::new(16, 19),
                35,
                &["I-35E/I-30 Mixmaster", "LBJ Freeway (I-635)"],
            ),
            zone(
                "Houston",
                &["Houston", "Pasadena", "Sugar Land", "Katy"],
                -6,
                PeakWindow::new(6, 9),
                PeakWindow::new(15, 19),
                40,
                &["I-610/I-69 interchange", "I-45 North Freeway"],
            ),
            zone(
                "Los Angeles",
                &["Los Angeles", "Long Beach", "Ontario", "Anaheim"],
                -8,
                PeakWindow::new(6, 10),
                PeakWindow::new(15, 20),
                55,
                &["I-405 Sepulveda Pass", "I-5/I-10 East LA Interchange"],
            ),
            zone(
                "Atlanta",
                &["Atlanta", "Marietta", "Decatur"],
                -5,
                PeakWindow::new(6, 9),
                PeakWindow::new(16, 19),
                45,
                &["I-285/I-85 Spaghetti Junction", "Downtown Connector"],
            ),
            zone(
                "Chicago",
                &["Chicago", "Naperville", "Joliet", "Elk Grove Village"],
                -6,
                PeakWindow::new(6, 9),
                PeakWindow::new(15, 19),
                45,
                &["Jane Byrne Interchange", "I-94 Edens Expressway"],
            ),
            zone(
                "New York",
                &["New York", "Newark", "Jersey City", "Bronx", "Brooklyn"],
                -5,
                PeakWindow::new(6, 10),
                PeakWindow::new(15, 19),
                50,
                &["George Washington Bridge", "Cross Bronx Expressway"],
            ),
        ];

        let fuel_prices = [
            ("CA", 5.45),
            ("WA", 4.85),
            ("OR", 4.60),
            ("NV", 4.40),
            ("AZ", 3.95),
            ("NY", 4.35),
            ("PA", 4.25),
            ("IL", 4.05),
            ("TX", 3.45),
            ("OK", 3.35),
            ("LA", 3.50),
            ("GA", 3.60),
            ("FL", 3.75),
            ("TN", 3.55),
            ("MO", 3.40),
            ("OH", 3.85),
            ("CO", 3.80),
        ]
        .into_iter()
        .map(|(state, price)| (state.to_string(), price))
        .collect();

        let vehicles = [
            (VehicleType::SemiTruck, VehicleProfile { fuel_economy_mpg: 6.5, tank_capacity_gallons: 150.0 }),
            (VehicleType::BoxTruck, VehicleProfile { fuel_economy_mpg: 10.0, tank_capacity_gallons: 50.0 }),
            (VehicleType::CargoVan, VehicleProfile { fuel_economy_mpg: 18.0, tank_capacity_gallons: 25.0 }),
            (VehicleType::PickupTruck, VehicleProfile { fuel_economy_mpg: 15.0, tank_capacity_gallons: 30.0 }),
        ]
        .into_iter()
        .collect();

        Self {
            corridors,
            metro_zones,
            fuel_prices,
            default_fuel_price: 3.85,
            vehicles,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_state_code_from_address() {
        let tables = ReferenceTables::builtin();
        assert_eq!(tables.state_code("500 Commerce St, Dallas, TX 75202"), Some("TX"));
        assert_eq!(tables.state_code("1 Harbor Way, Long Beach, CA"), Some("CA"));
        assert_eq!(tables.state_code("Warehouse district"), None);
        // Unknown state codes are skipped
        assert_eq!(tables.state_code("12 Elm, Boise, ID"), None);
    }

    #[test]
    fn test_fuel_price_lookup_and_fallback() {
        let tables = ReferenceTables::builtin();
        assert_eq!(tables.fuel_price_for("Dallas, TX"), 3.45);
        assert_eq!(tables.fuel_price_for("Somewhere unknown"), 3.85);
    }

    #[test]
    fn test_corridors_for_address() {
        let tables = ReferenceTables::builtin();
        let names: Vec<&str> = tables
            .corridors_for("2200 Ross Ave, Dallas, TX")
            .map(|c| c.name.as_str())
            .collect();
        assert_eq!(names, vec!["I-35", "I-45"]);
        assert_eq!(tables.corridors_for("Small town, MT").count(), 0);
    }

    #[test]
    fn test_zone_peak_uses_local_time() {
        let tables = ReferenceTables::builtin();
        let zone = tables.zone_for("Main St, Houston, TX").unwrap();
        assert_eq!(zone.name, "Houston");

        // 13:00 UTC is 07:00 in Houston (UTC-6): morning peak
        let morning = Utc.with_ymd_and_hms(2026, 3, 2, 13, 0, 0).unwrap();
        assert_eq!(zone.peak_at(morning), Some(PeakPeriod::Morning));

        // 22:00 UTC is 16:00 local: evening peak
        let evening = Utc.with_ymd_and_hms(2026, 3, 2, 22, 0, 0).unwrap();
        assert_eq!(zone.peak_at(evening), Some(PeakPeriod::Evening));

        // 18:00 UTC is noon local
        let noon = Utc.with_ymd_and_hms(2026, 3, 2, 18, 0, 0).unwrap();
        assert_eq!(zone.peak_at(noon), None);
    }

    #[test]
    fn test_vehicle_profiles() {
        let tables = ReferenceTables::builtin();
        let semi = tables.vehicle_profile(VehicleType::SemiTruck);
        assert_eq!(semi.fuel_economy_mpg, 6.5);
        assert_eq!(tables.vehicle_profile(VehicleType::CargoVan).tank_capacity_gallons, 25.0);
    }

    #[test]
    fn test_tables_json_roundtrip_through_file() {
        let tables = ReferenceTables::builtin();
        let path = std::env::temp_dir().join(format!("route-engine-tables-{}.json", std::process::id()));
        std::fs::write(&path, serde_json::to_string(&tables).unwrap()).unwrap();

        let loaded = ReferenceTables::from_json_file(&path).unwrap();
        std::fs::remove_file(&path).ok();

        assert_eq!(loaded.corridors.len(), tables.corridors.len());
        assert_eq!(loaded.fuel_price_for("Reno, NV"), 4.40);
        assert_eq!(loaded.vehicle_profile(VehicleType::BoxTruck).fuel_economy_mpg, 10.0);
    }

    #[test]
    fn test_missing_tables_file_is_an_error() {
        let path = Path::new("/definitely/not/here/tables.json");
        assert!(ReferenceTables::from_json_file(path).is_err());
    }
}
