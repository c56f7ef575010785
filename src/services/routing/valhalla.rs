//! Valhalla routing engine client
//!
//! Valhalla API documentation:
//! https://valhalla.github.io/valhalla/api/matrix/api-reference/
//! https://valhalla.github.io/valhalla/api/turn-by-turn/api-reference/

use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::Client;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::{GeoProvider, LegDirections, MatrixCell, Waypoint};
use crate::services::nominatim::NominatimClient;
use crate::types::{Coordinates, PointOfInterest, RouteStep};

/// Valhalla client configuration
#[derive(Debug, Clone)]
pub struct ValhallaConfig {
    /// Base URL of Valhalla server (e.g., "http://localhost:8002")
    pub base_url: String,
    /// Request timeout in seconds
    pub timeout_seconds: u64,
    /// Valhalla costing model
    pub costing: String,
    /// Nominatim base URL for point-of-interest searches (optional)
    pub nominatim_url: Option<String>,
}

impl Default for ValhallaConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:8002".to_string(),
            timeout_seconds: 30,
            costing: "truck".to_string(),
            nominatim_url: None,
        }
    }
}

impl ValhallaConfig {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            ..Default::default()
        }
    }

    pub fn with_nominatim(mut self, nominatim_url: Option<String>) -> Self {
        self.nominatim_url = nominatim_url;
        self
    }
}

/// Valhalla routing client
pub struct ValhallaClient {
    client: Client,
    config: ValhallaConfig,
    poi_search: Option<NominatimClient>,
}

impl ValhallaClient {
    pub fn new(config: ValhallaConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(std::time::Duration::from_secs(config.timeout_seconds))
            .build()
            .context("Failed to create HTTP client")?;

        let poi_search = config
            .nominatim_url
            .as_deref()
            .map(NominatimClient::new)
            .transpose()?;

        Ok(Self {
            client,
            config,
            poi_search,
        })
    }

    fn costing_options(&self, avoid_highways: bool) -> Option<CostingOptions> {
        avoid_highways.then(|| CostingOptions {
            truck: HighwayCostingOptions { use_highways: 0.0 },
        })
    }

    /// Build the sources_to_targets request
    fn build_matrix_request(
        &self,
        origins: &[Waypoint],
        destinations: &[Waypoint],
        avoid_highways: bool,
    ) -> Result<MatrixRequest> {
        Ok(MatrixRequest {
            sources: to_locations(origins)?,
            targets: to_locations(destinations)?,
            costing: self.config.costing.clone(),
            units: "kilometers".to_string(),
            costing_options: self.costing_options(avoid_highways),
        })
    }

    /// Build the route request for a single leg
    fn build_route_request(
        &self,
        origin: &Waypoint,
        destination: &Waypoint,
        avoid_highways: bool,
    ) -> Result<RouteRequest> {
        Ok(RouteRequest {
            locations: to_locations(&[origin.clone(), destination.clone()])?,
            costing: self.config.costing.clone(),
            directions_type: "maneuvers".to_string(),
            units: "kilometers".to_string(),
            costing_options: self.costing_options(avoid_highways),
        })
    }

    async fn post<Req: Serialize + Sync, Resp: DeserializeOwned + Send>(
        &self,
        endpoint: &str,
        request: &Req,
    ) -> Result<Resp> {
        let url = format!("{}/{}", self.config.base_url, endpoint);

        let response = self
            .client
            .post(&url)
            .json(request)
            .send()
            .await
            .with_context(|| format!("Failed to send {} request to Valhalla", endpoint))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            anyhow::bail!("Valhalla {} returned error {}: {}", endpoint, status, body);
        }

        response
            .json()
            .await
            .with_context(|| format!("Failed to parse Valhalla {} response", endpoint))
    }
}

#[async_trait]
impl GeoProvider for ValhallaClient {
    async fn distance_matrix(
        &self,
        origins: &[Waypoint],
        destinations: &[Waypoint],
        avoid_highways: bool,
    ) -> Result<Vec<Vec<MatrixCell>>> {
        if origins.is_empty() || destinations.is_empty() {
            return Ok(vec![vec![]; origins.len()]);
        }

        let request = self.build_matrix_request(origins, destinations, avoid_highways)?;
        debug!(
            "Requesting {}x{} distance matrix from Valhalla",
            origins.len(),
            destinations.len()
        );

        let response: MatrixResponse = self.post("sources_to_targets", &request).await?;

        let rows = response
            .sources_to_targets
            .into_iter()
            .map(|row| {
                row.into_iter()
                    .map(|cell| MatrixCell {
                        // Convert km to meters
                        distance_meters: cell.distance.map(|d| d * 1000.0),
                        duration_seconds: cell.time,
                    })
                    .collect()
            })
            .collect();

        Ok(rows)
    }

    async fn directions(
        &self,
        origin: &Waypoint,
        destination: &Waypoint,
        avoid_highways: bool,
    ) -> Result<LegDirections> {
        let request = self.build_route_request(origin, destination, avoid_highways)?;
        debug!("Requesting directions {} -> {}", origin.address, destination.address);

        let response: RouteResponse = self.post("route", &request).await?;

        let mut polyline = Vec::new();
        let mut steps = Vec::new();
        for leg in &response.trip.legs {
            let coords = decode_polyline(&leg.shape, 6)?;
            // Skip the first point of subsequent legs (it's the last point of the previous one)
            let skip = usize::from(!polyline.is_empty() && !coords.is_empty());
            polyline.extend(coords.into_iter().skip(skip));

            for maneuver in &leg.maneuvers {
                steps.push(RouteStep {
                    instruction: maneuver.instruction.clone(),
                    distance_meters: maneuver.length * 1000.0,
                    street_names: maneuver.street_names.clone().unwrap_or_default(),
                });
            }
        }

        Ok(LegDirections {
            distance_meters: response.trip.summary.length * 1000.0,
            duration_seconds: response.trip.summary.time,
            corridor_hints: corridor_hints(&steps),
            polyline,
            steps,
        })
    }

    async fn nearby_points_of_interest(
        &self,
        point: Coordinates,
        radius_meters: f64,
        category: &str,
    ) -> Result<Vec<PointOfInterest>> {
        match &self.poi_search {
            Some(nominatim) => nominatim.search_nearby(point, radius_meters, category).await,
            None => anyhow::bail!("No point-of-interest search configured (set NOMINATIM_URL)"),
        }
    }

    fn name(&self) -> &str {
        "Valhalla"
    }
}

fn to_locations(waypoints: &[Waypoint]) -> Result<Vec<ValhallaLocation>> {
    waypoints
        .iter()
        .map(|w| {
            let c = w
                .coordinates
                .with_context(|| format!("Waypoint '{}' has no coordinates", w.address))?;
            Ok(ValhallaLocation {
                lat: c.lat,
                lon: c.lng,
                // 500m radius – enough to snap a building centroid onto the road
                radius: Some(500),
            })
        })
        .collect()
}

/// Highway-like street names from the maneuvers, first occurrence order
fn corridor_hints(steps: &[RouteStep]) -> Vec<String> {
    let mut hints: Vec<String> = Vec::new();
    for name in steps.iter().flat_map(|s| s.street_names.iter()) {
        if is_highway_name(name) && !hints.iter().any(|h| h == name) {
            hints.push(name.clone());
        }
    }
    hints
}

fn is_highway_name(name: &str) -> bool {
    let upper = name.to_uppercase();
    ["I ", "I-", "US ", "US-", "SR ", "SR-", "INTERSTATE"]
        .iter()
        .any(|prefix| upper.starts_with(prefix))
        || upper.contains("HIGHWAY")
        || upper.contains("HWY")
        || upper.contains("TURNPIKE")
}

// Valhalla API types

#[derive(Debug, Serialize)]
struct MatrixRequest {
    sources: Vec<ValhallaLocation>,
    targets: Vec<ValhallaLocation>,
    costing: String,
    units: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    costing_options: Option<CostingOptions>,
}

#[derive(Debug, Serialize)]
struct CostingOptions {
    truck: HighwayCostingOptions,
}

#[derive(Debug, Serialize)]
struct HighwayCostingOptions {
    /// 0.0 avoids highways, 1.0 prefers them
    use_highways: f64,
}

#[derive(Debug, Serialize, Clone)]
struct ValhallaLocation {
    lat: f64,
    lon: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    radius: Option<u32>,
}

#[derive(Debug, Deserialize)]
struct MatrixResponse {
    sources_to_targets: Vec<Vec<ValhallaMatrixCell>>,
}

#[derive(Debug, Deserialize)]
struct ValhallaMatrixCell {
    /// Distance in kilometers (when units="kilometers")
    distance: Option<f64>,
    /// Time in seconds
    time: Option<f64>,
}

#[derive(Debug, Serialize)]
struct RouteRequest {
    locations: Vec<ValhallaLocation>,
    costing: String,
    directions_type: String,
    units: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    costing_options: Option<CostingOptions>,
}

#[derive(Debug, Deserialize)]
struct RouteResponse {
    trip: Trip,
}

#[derive(Debug, Deserialize)]
struct Trip {
    legs: Vec<Leg>,
    summary: TripSummary,
}

#[derive(Debug, Deserialize)]
struct TripSummary {
    /// Kilometers
    length: f64,
    /// Seconds
    time: f64,
}

#[derive(Debug, Deserialize)]
struct Leg {
    /// Encoded polyline shape
    shape: String,
    #[serde(default)]
    maneuvers: Vec<Maneuver>,
}

#[derive(Debug, Deserialize)]
struct Maneuver {
    instruction: String,
    /// Kilometers
    length: f64,
    street_names: Option<Vec<String>>,
}

/// Decode an encoded polyline into [lng, lat] pairs.
/// Precision is 6 decimal places for Valhalla (vs 5 for Google)
fn decode_polyline(encoded: &str, precision: u32) -> Result<Vec<[f64; 2]>> {
    let factor = 10_f64.powi(precision as i32);
    let bytes = encoded.as_bytes();
    let mut coordinates = Vec::new();
    let mut lat = 0i64;
    let mut lng = 0i64;
    let mut i = 0;

    while i < bytes.len() {
        lat += decode_value(bytes, &mut i)?;
        lng += decode_value(bytes, &mut i)?;
        // GeoJSON uses [lng, lat] order
        coordinates.push([lng as f64 / factor, lat as f64 / factor]);
    }

    Ok(coordinates)
}

fn decode_value(bytes: &[u8], i: &mut usize) -> Result<i64> {
    let mut shift = 0;
    let mut result = 0i64;
    loop {
        let Some(&b) = bytes.get(*i) else {
            anyhow::bail!("Invalid polyline encoding");
        };
        let byte = b as i64 - 63;
        *i += 1;
        result |= (byte & 0x1f) << shift;
        shift += 5;
        if byte < 0x20 {
            break;
        }
    }
    Ok(if result & 1 != 0 { !(result >> 1) } else { result >> 1 })
}
