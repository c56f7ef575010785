//! Geo providers for unit tests: a fixed-matrix provider and one that always fails.

use anyhow::{bail, Result};
use async_trait::async_trait;

use crate::defaults::estimated_minutes;
use crate::services::routing::{GeoProvider, LegDirections, MatrixCell, Waypoint};
use crate::types::{Coordinates, PointOfInterest, Stop, StopKind};

/// Serves distances from a fixed matrix. Waypoints are matched by address
/// (`node-<i>`); durations are derived at the estimate speed.
pub struct MatrixGeoProvider {
    distances: Vec<Vec<Option<f64>>>,
    addresses: Vec<String>,
    pub fail_directions: bool,
    pub fail_poi: bool,
    pub corridor_hints: Vec<String>,
}

impl MatrixGeoProvider {
    pub fn new(distances: Vec<Vec<Option<f64>>>) -> Self {
        let addresses = (0..distances.len()).map(|i| format!("node-{}", i)).collect();
        Self {
            distances,
            addresses,
            fail_directions: false,
            fail_poi: false,
            corridor_hints: vec![],
        }
    }

    pub fn from_meters(distances: Vec<Vec<f64>>) -> Self {
        Self::new(
            distances
                .into_iter()
                .map(|row| row.into_iter().map(Some).collect())
                .collect(),
        )
    }

    /// Replace the default `node-<i>` addresses
    pub fn with_addresses(mut self, addresses: &[&str]) -> Self {
        self.addresses = addresses.iter().map(|a| a.to_string()).collect();
        self
    }

    pub fn address(&self, index: usize) -> &str {
        &self.addresses[index]
    }

    pub fn waypoints(&self) -> Vec<Waypoint> {
        self.addresses.iter().map(|a| Waypoint::new(a.clone(), None)).collect()
    }

    /// Stop at matrix index `index`
    pub fn stop(&self, index: usize, kind: StopKind) -> Stop {
        Stop::new(format!("s{}", index), self.addresses[index].clone(), kind)
    }

    fn index_of(&self, waypoint: &Waypoint) -> Result<usize> {
        match self.addresses.iter().position(|a| *a == waypoint.address) {
            Some(index) => Ok(index),
            None => bail!("unknown waypoint {}", waypoint.address),
        }
    }

    fn cell(&self, from: usize, to: usize) -> MatrixCell {
        match self.distances[from][to] {
            Some(meters) => MatrixCell::new(meters, estimated_minutes(meters) * 60.0),
            None => MatrixCell::unreachable(),
        }
    }
}

#[async_trait]
impl GeoProvider for MatrixGeoProvider {
    async fn distance_matrix(
        &self,
        origins: &[Waypoint],
        destinations: &[Waypoint],
        _avoid_highways: bool,
    ) -> Result<Vec<Vec<MatrixCell>>> {
        origins
            .iter()
            .map(|origin| -> Result<Vec<MatrixCell>> {
                let from = self.index_of(origin)?;
                destinations
                    .iter()
                    .map(|destination| -> Result<MatrixCell> {
                        Ok(self.cell(from, self.index_of(destination)?))
                    })
                    .collect()
            })
            .collect()
    }

    async fn directions(
        &self,
        origin: &Waypoint,
        destination: &Waypoint,
        _avoid_highways: bool,
    ) -> Result<LegDirections> {
        if self.fail_directions {
            bail!("directions disabled");
        }
        let cell = self.cell(self.index_of(origin)?, self.index_of(destination)?);
        match (cell.distance_meters, cell.duration_seconds) {
            (Some(distance_meters), Some(duration_seconds)) => Ok(LegDirections {
                distance_meters,
                duration_seconds,
                corridor_hints: self.corridor_hints.clone(),
                ..Default::default()
            }),
            _ => bail!("no path from {} to {}", origin.address, destination.address),
        }
    }

    async fn nearby_points_of_interest(
        &self,
        point: Coordinates,
        _radius_meters: f64,
        category: &str,
    ) -> Result<Vec<PointOfInterest>> {
        if self.fail_poi {
            bail!("poi search disabled");
        }
        Ok(vec![PointOfInterest {
            name: format!("Test {} station", category),
            address: "Exit 1".to_string(),
            coordinates: point,
        }])
    }

    fn name(&self) -> &str {
        "MatrixTest"
    }
}

/// Provider whose every call fails
pub struct FailingGeoProvider;

#[async_trait]
impl GeoProvider for FailingGeoProvider {
    async fn distance_matrix(
        &self,
        _origins: &[Waypoint],
        _destinations: &[Waypoint],
        _avoid_highways: bool,
    ) -> Result<Vec<Vec<MatrixCell>>> {
        bail!("provider unavailable")
    }

    async fn directions(
        &self,
        _origin: &Waypoint,
        _destination: &Waypoint,
        _avoid_highways: bool,
    ) -> Result<LegDirections> {
        bail!("provider unavailable")
    }

    async fn nearby_points_of_interest(
        &self,
        _point: Coordinates,
        _radius_meters: f64,
        _category: &str,
    ) -> Result<Vec<PointOfInterest>> {
        bail!("provider unavailable")
    }

    fn name(&self) -> &str {
        "Failing"
    }
}
