//! Geo provider abstraction: travel matrices, leg directions, nearby POIs
//!
//! Uses Valhalla (+ Nominatim for POIs) in production, mock for tests and as
//! a fallback when no routing server is reachable.

mod valhalla;

pub use valhalla::{ValhallaClient, ValhallaConfig};

use anyhow::Result;
use async_trait::async_trait;
use tracing::{info, warn};

use crate::services::geo::{self, ROAD_COEFFICIENT};
use crate::types::{Coordinates, PointOfInterest, RouteStep, Stop};

/// A location handed to the provider
#[derive(Debug, Clone, PartialEq)]
pub struct Waypoint {
    pub address: String,
    pub coordinates: Option<Coordinates>,
}

impl Waypoint {
    pub fn new(address: impl Into<String>, coordinates: Option<Coordinates>) -> Self {
        Self {
            address: address.into(),
            coordinates,
        }
    }

    /// Known coordinates, or a deterministic stand-in derived from the address
    pub fn resolved_coordinates(&self) -> Coordinates {
        self.coordinates
            .unwrap_or_else(|| geo::synthetic_coordinates(&self.address))
    }
}

impl From<&Stop> for Waypoint {
    fn from(stop: &Stop) -> Self {
        Self::new(stop.address.clone(), stop.coordinates)
    }
}

/// One origin/destination cell of a provider matrix.
/// `None` means the provider found no path.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct MatrixCell {
    pub distance_meters: Option<f64>,
    pub duration_seconds: Option<f64>,
}

impl MatrixCell {
    pub fn new(distance_meters: f64, duration_seconds: f64) -> Self {
        Self {
            distance_meters: Some(distance_meters),
            duration_seconds: Some(duration_seconds),
        }
    }

    pub fn unreachable() -> Self {
        Self::default()
    }
}

/// Concrete leg returned by the provider
#[derive(Debug, Clone, Default)]
pub struct LegDirections {
    pub distance_meters: f64,
    pub duration_seconds: f64,
    /// Named roads/highways the leg travels along
    pub corridor_hints: Vec<String>,
    /// [lng, lat] pairs (GeoJSON order)
    pub polyline: Vec<[f64; 2]>,
    pub steps: Vec<RouteStep>,
}

/// Geo provider trait for abstraction (Valhalla, mock, etc.)
#[async_trait]
pub trait GeoProvider: Send + Sync {
    /// Travel matrix, `result[i][j]` is `origins[i]` → `destinations[j]`.
    async fn distance_matrix(
        &self,
        origins: &[Waypoint],
        destinations: &[Waypoint],
        avoid_highways: bool,
    ) -> Result<Vec<Vec<MatrixCell>>>;

    /// Turn-by-turn detail for a single leg
    async fn directions(
        &self,
        origin: &Waypoint,
        destination: &Waypoint,
        avoid_highways: bool,
    ) -> Result<LegDirections>;

    /// Points of interest of `category` (e.g. "fuel") around `point`
    async fn nearby_points_of_interest(
        &self,
        point: Coordinates,
        radius_meters: f64,
        category: &str,
    ) -> Result<Vec<PointOfInterest>>;

    /// Get service name for logging
    fn name(&self) -> &str;
}

/// Mock geo provider for tests and offline runs
/// Uses Haversine distance × coefficient for estimation
pub struct MockGeoProvider {
    /// Coefficient for converting straight-line to road distance (default: 1.25)
    road_coefficient: f64,
    /// Average speed in km/h for time estimation (default: 88.5, i.e. 55 mph)
    average_speed_kmh: f64,
}

impl Default for MockGeoProvider {
    fn default() -> Self {
        Self {
            road_coefficient: ROAD_COEFFICIENT,
            average_speed_kmh: 88.5,
        }
    }
}

impl MockGeoProvider {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_params(road_coefficient: f64, average_speed_kmh: f64) -> Self {
        Self {
            road_coefficient,
            average_speed_kmh,
        }
    }

    fn estimate(&self, from: &Waypoint, to: &Waypoint) -> (f64, f64) {
        let meters = geo::road_distance_meters(
            &from.resolved_coordinates(),
            &to.resolved_coordinates(),
            self.road_coefficient,
        );
        (meters, geo::travel_seconds(meters, self.average_speed_kmh))
    }
}

#[async_trait]
impl GeoProvider for MockGeoProvider {
    async fn distance_matrix(
        &self,
        origins: &[Waypoint],
        destinations: &[Waypoint],
        _avoid_highways: bool,
    ) -> Result<Vec<Vec<MatrixCell>>> {
        Ok(origins
            .iter()
            .map(|origin| {
                destinations
                    .iter()
                    .map(|destination| {
                        let (meters, seconds) = self.estimate(origin, destination);
                        MatrixCell::new(meters, seconds)
                    })
                    .collect()
            })
            .collect())
    }

    async fn directions(
        &self,
        origin: &Waypoint,
        destination: &Waypoint,
        _avoid_highways: bool,
    ) -> Result<LegDirections> {
        let (meters, seconds) = self.estimate(origin, destination);
        let from = origin.resolved_coordinates();
        let to = destination.resolved_coordinates();
        let mid = geo::interpolate(&from, &to, 0.5);

        Ok(LegDirections {
            distance_meters: meters,
            duration_seconds: seconds,
            corridor_hints: vec![],
            polyline: vec![[from.lng, from.lat], [mid.lng, mid.lat], [to.lng, to.lat]],
            steps: vec![
                RouteStep {
                    instruction: format!("Depart {}", origin.address),
                    distance_meters: meters,
                    street_names: vec![],
                },
                RouteStep {
                    instruction: format!("Arrive at {}", destination.address),
                    distance_meters: 0.0,
                    street_names: vec![],
                },
            ],
        })
    }

    async fn nearby_points_of_interest(
        &self,
        point: Coordinates,
        radius_meters: f64,
        category: &str,
    ) -> Result<Vec<PointOfInterest>> {
        // A single result half-way to the search radius, due north
        let offset_deg = radius_meters / 2.0 / 111_320.0;
        let coordinates = Coordinates {
            lat: point.lat + offset_deg,
            lng: point.lng,
        };
        Ok(vec![PointOfInterest {
            name: format!("{} plaza {:.3},{:.3}", category, coordinates.lat, coordinates.lng),
            address: format!("{:.5}, {:.5}", coordinates.lat, coordinates.lng),
            coordinates,
        }])
    }

    fn name(&self) -> &str {
        "MockGeo"
    }
}

/// Create geo provider with automatic Valhalla detection and fallback
///
/// Tries to connect to Valhalla if URL is provided. Falls back to the mock
/// provider if Valhalla is unavailable or the URL is not configured.
pub async fn create_geo_provider_with_fallback(
    valhalla_url: Option<String>,
    nominatim_url: Option<String>,
) -> Box<dyn GeoProvider> {
    if let Some(url) = valhalla_url {
        match check_valhalla_health(&url).await {
            Ok(()) => match ValhallaClient::new(ValhallaConfig::new(&url).with_nominatim(nominatim_url)) {
                Ok(client) => {
                    info!("Valhalla routing service available at {}", url);
                    return Box::new(client);
                }
                Err(e) => {
                    warn!("Failed to build Valhalla client: {}. Falling back to mock geo provider.", e);
                }
            },
            Err(e) => {
                warn!("Valhalla not available at {}: {}. Falling back to mock geo provider.", url, e);
            }
        }
    }

    info!("Using mock geo provider (Valhalla not configured or unavailable)");
    Box::new(MockGeoProvider::new())
}

/// Check if Valhalla is healthy by making a simple status request
async fn check_valhalla_health(base_url: &str) -> Result<()> {
    let client = reqwest::Client::builder()
        .timeout(std::time::Duration::from_secs(5))
        .build()?;

    let url = format!("{}/status", base_url);
    let response = client.get(&url).send().await?;

    if response.status().is_success() {
        Ok(())
    } else {
        anyhow::bail!("Valhalla returned status {}", response.status())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dallas() -> Waypoint {
        Waypoint::new("Dallas, TX", Some(Coordinates { lat: 32.7767, lng: -96.7970 }))
    }

    fn houston() -> Waypoint {
        Waypoint::new("Houston, TX", Some(Coordinates { lat: 29.7604, lng: -95.3698 }))
    }

    fn austin() -> Waypoint {
        Waypoint::new("Austin, TX", Some(Coordinates { lat: 30.2672, lng: -97.7431 }))
    }

    #[tokio::test]
    async fn test_mock_matrix_empty_locations() {
        let provider = MockGeoProvider::new();
        let matrix = provider.distance_matrix(&[], &[], false).await.unwrap();
        assert!(matrix.is_empty());
    }

    #[tokio::test]
    async fn test_mock_matrix_shape_follows_origins_and_destinations() {
        let provider = MockGeoProvider::new();
        let matrix = provider
            .distance_matrix(&[dallas(), houston()], &[austin()], false)
            .await
            .unwrap();

        assert_eq!(matrix.len(), 2);
        assert_eq!(matrix[0].len(), 1);
        assert!(matrix[0][0].distance_meters.unwrap() > 0.0);
    }

    #[tokio::test]
    async fn test_mock_matrix_dallas_houston_reasonable() {
        let provider = MockGeoProvider::new();
        let matrix = provider
            .distance_matrix(&[dallas(), houston()], &[dallas(), houston()], false)
            .await
            .unwrap();

        assert_eq!(matrix[0][0].distance_meters, Some(0.0));
        assert_eq!(matrix[1][1].distance_meters, Some(0.0));

        // ~362 km straight line, ~450 km with the road coefficient
        let km = matrix[0][1].distance_meters.unwrap() / 1000.0;
        assert!(km > 420.0 && km < 480.0, "Expected ~450 km, got {} km", km);

        // ~450 km at 88.5 km/h is ~5 hours
        let hours = matrix[0][1].duration_seconds.unwrap() / 3600.0;
        assert!(hours > 4.5 && hours < 5.5, "Expected ~5 hours, got {} hours", hours);

        assert_eq!(matrix[0][1], matrix[1][0]);
    }

    #[tokio::test]
    async fn test_mock_matrix_resolves_missing_coordinates() {
        let provider = MockGeoProvider::new();
        let a = Waypoint::new("Dock 1, Memphis, TN", None);
        let b = Waypoint::new("Dock 7, Nashville, TN", None);
        let matrix = provider.distance_matrix(&[a.clone()], &[b.clone()], false).await.unwrap();
        let again = provider.distance_matrix(&[a], &[b], false).await.unwrap();
        assert!(matrix[0][0].distance_meters.unwrap() > 0.0);
        assert_eq!(matrix, again);
    }

    #[tokio::test]
    async fn test_mock_directions_match_matrix() {
        let provider = MockGeoProvider::new();
        let leg = provider.directions(&dallas(), &austin(), false).await.unwrap();
        let matrix = provider.distance_matrix(&[dallas()], &[austin()], false).await.unwrap();

        assert!((leg.distance_meters - matrix[0][0].distance_meters.unwrap()).abs() < 1e-6);
        assert_eq!(leg.polyline.len(), 3);
        assert_eq!(leg.steps.len(), 2);
        // GeoJSON order: [lng, lat]
        assert!((leg.polyline[0][0] - -96.7970).abs() < 1e-9);
    }

    #[tokio::test]
    async fn test_mock_nearby_poi_within_radius() {
        let provider = MockGeoProvider::new();
        let point = Coordinates { lat: 32.7767, lng: -96.7970 };
        let pois = provider.nearby_points_of_interest(point, 8_000.0, "fuel").await.unwrap();

        assert_eq!(pois.len(), 1);
        let km = geo::haversine_distance(&point, &pois[0].coordinates);
        assert!(km < 8.0, "POI {} km away", km);
        assert!(pois[0].name.starts_with("fuel"));
    }

    #[test]
    fn test_mock_provider_name() {
        assert_eq!(MockGeoProvider::new().name(), "MockGeo");
    }

    #[tokio::test]
    async fn test_create_geo_provider_with_fallback_no_url() {
        let provider = create_geo_provider_with_fallback(None, None).await;
        assert_eq!(provider.name(), "MockGeo");
    }

    #[tokio::test]
    async fn test_create_geo_provider_with_fallback_invalid_url() {
        let provider =
            create_geo_provider_with_fallback(Some("http://localhost:99999".to_string()), None).await;
        assert_eq!(provider.name(), "MockGeo");
    }

    #[tokio::test]
    #[ignore = "Requires running Valhalla server"]
    async fn test_create_geo_provider_with_fallback_valhalla_available() {
        let provider =
            create_geo_provider_with_fallback(Some("http://localhost:8002".to_string()), None).await;
        assert_eq!(provider.name(), "Valhalla");
    }
}
