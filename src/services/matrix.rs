//! Distance matrix builder
//!
//! Splits N waypoints into origin × destination batches, queries the geo
//! provider concurrently (bounded), and stitches the sub-matrices back into
//! one N×N matrix. Failed batches become sentinel penalties instead of errors.

use futures::stream::{self, StreamExt};
use tracing::{debug, warn};

use crate::defaults::{
    DEFAULT_MATRIX_BATCH_SIZE, DEFAULT_MATRIX_CONCURRENCY, SENTINEL_DISTANCE_METERS,
    SENTINEL_DURATION_SECONDS,
};
use crate::services::routing::{GeoProvider, MatrixCell, Waypoint};

/// Batching parameters for matrix construction
#[derive(Debug, Clone, Copy)]
pub struct MatrixConfig {
    /// Max origins (and destinations) per provider call
    pub batch_size: usize,
    /// Max provider calls in flight
    pub concurrency: usize,
    pub avoid_highways: bool,
}

impl Default for MatrixConfig {
    fn default() -> Self {
        Self {
            batch_size: DEFAULT_MATRIX_BATCH_SIZE,
            concurrency: DEFAULT_MATRIX_CONCURRENCY,
            avoid_highways: false,
        }
    }
}

/// Directed N×N travel matrix (meters / seconds)
#[derive(Debug, Clone)]
pub struct DistanceMatrix {
    distances: Vec<Vec<f64>>,
    durations: Vec<Vec<f64>>,
    /// Provider calls that failed or returned a malformed shape
    pub failed_batches: usize,
    /// Off-diagonal cells holding the sentinel penalty
    pub sentinel_cells: usize,
}

impl DistanceMatrix {
    /// Matrix from known distances; durations are derived at the estimate speed.
    pub fn from_distances(distances: Vec<Vec<f64>>) -> Self {
        let durations = distances
            .iter()
            .map(|row| {
                row.iter()
                    .map(|&meters| crate::defaults::estimated_minutes(meters) * 60.0)
                    .collect()
            })
            .collect();
        let sentinel_cells = count_sentinels(&distances);
        Self {
            distances,
            durations,
            failed_batches: 0,
            sentinel_cells,
        }
    }

    pub fn size(&self) -> usize {
        self.distances.len()
    }

    pub fn distance(&self, from: usize, to: usize) -> f64 {
        self.distances[from][to]
    }

    pub fn duration(&self, from: usize, to: usize) -> f64 {
        self.durations[from][to]
    }

    pub fn is_sentinel(&self, from: usize, to: usize) -> bool {
        from != to && self.distances[from][to] >= SENTINEL_DISTANCE_METERS
    }

    /// True when any part of the matrix is a fallback rather than provider data
    pub fn is_degraded(&self) -> bool {
        self.failed_batches > 0 || self.sentinel_cells > 0
    }

    /// Sum of distances along `order`, plus the closing edge when `closed`
    pub fn path_distance(&self, order: &[usize], closed: bool) -> f64 {
        self.path_sum(order, closed, |from, to| self.distance(from, to))
    }

    /// Sum of durations along `order`, plus the closing edge when `closed`
    pub fn path_duration(&self, order: &[usize], closed: bool) -> f64 {
        self.path_sum(order, closed, |from, to| self.duration(from, to))
    }

    fn path_sum(&self, order: &[usize], closed: bool, edge: impl Fn(usize, usize) -> f64) -> f64 {
        let open: f64 = order.windows(2).map(|pair| edge(pair[0], pair[1])).sum();
        match (closed, order.first(), order.last()) {
            (true, Some(&first), Some(&last)) if order.len() > 1 => open + edge(last, first),
            _ => open,
        }
    }
}

fn count_sentinels(distances: &[Vec<f64>]) -> usize {
    distances
        .iter()
        .enumerate()
        .map(|(i, row)| {
            row.iter()
                .enumerate()
                .filter(|&(j, &d)| i != j && d >= SENTINEL_DISTANCE_METERS)
                .count()
        })
        .sum()
}

/// One origin × destination block of the full matrix
#[derive(Debug, Clone, Copy)]
struct Batch {
    row_start: usize,
    row_len: usize,
    col_start: usize,
    col_len: usize,
}

fn plan_batches(n: usize, batch_size: usize) -> Vec<Batch> {
    let size = batch_size.max(1);
    let mut batches = Vec::new();
    for row_start in (0..n).step_by(size) {
        for col_start in (0..n).step_by(size) {
            batches.push(Batch {
                row_start,
                row_len: size.min(n - row_start),
                col_start,
                col_len: size.min(n - col_start),
            });
        }
    }
    batches
}

fn has_shape(rows: &[Vec<MatrixCell>], batch: &Batch) -> bool {
    rows.len() == batch.row_len && rows.iter().all(|row| row.len() == batch.col_len)
}

/// Build the full N×N matrix for `waypoints`.
///
/// Never fails: a provider error or malformed batch fills that batch with the
/// sentinel penalty, and unreachable cells do the same individually.
pub async fn build_distance_matrix(
    provider: &dyn GeoProvider,
    waypoints: &[Waypoint],
    config: &MatrixConfig,
) -> DistanceMatrix {
    let n = waypoints.len();
    let batches = plan_batches(n, config.batch_size);

    debug!(
        "Building {}x{} matrix with {} in {} batches (concurrency {})",
        n,
        n,
        provider.name(),
        batches.len(),
        config.concurrency
    );

    let results: Vec<_> = stream::iter(batches)
        .map(|batch| async move {
            let origins = &waypoints[batch.row_start..batch.row_start + batch.row_len];
            let destinations = &waypoints[batch.col_start..batch.col_start + batch.col_len];
            let result = provider
                .distance_matrix(origins, destinations, config.avoid_highways)
                .await;
            (batch, result)
        })
        .buffer_unordered(config.concurrency.max(1))
        .collect()
        .await;

    let mut distances = vec![vec![SENTINEL_DISTANCE_METERS; n]; n];
    let mut durations = vec![vec![SENTINEL_DURATION_SECONDS; n]; n];
    let mut failed_batches = 0;

    for (batch, result) in results {
        let rows = match result {
            Ok(rows) if has_shape(&rows, &batch) => rows,
            Ok(rows) => {
                warn!(
                    "Matrix batch at ({}, {}) returned {} rows, expected {}x{}; using sentinel",
                    batch.row_start,
                    batch.col_start,
                    rows.len(),
                    batch.row_len,
                    batch.col_len
                );
                failed_batches += 1;
                continue;
            }
            Err(e) => {
                warn!(
                    "Matrix batch at ({}, {}) failed: {}; using sentinel",
                    batch.row_start, batch.col_start, e
                );
                failed_batches += 1;
                continue;
            }
        };

        for (r, row) in rows.into_iter().enumerate() {
            for (c, cell) in row.into_iter().enumerate() {
                let (i, j) = (batch.row_start + r, batch.col_start + c);
                if let (Some(d), Some(t)) = (cell.distance_meters, cell.duration_seconds) {
                    distances[i][j] = d;
                    durations[i][j] = t;
                }
            }
        }
    }

    for i in 0..n {
        distances[i][i] = 0.0;
        durations[i][i] = 0.0;
    }

    let sentinel_cells = count_sentinels(&distances);
    if sentinel_cells > 0 {
        warn!("Distance matrix has {} sentinel cells", sentinel_cells);
    }

    DistanceMatrix {
        distances,
        durations,
        failed_batches,
        sentinel_cells,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::routing::MockGeoProvider;
    use crate::services::test_support::{FailingGeoProvider, MatrixGeoProvider};
    use crate::types::Coordinates;

    fn waypoints(n: usize) -> Vec<Waypoint> {
        (0..n)
            .map(|i| {
                Waypoint::new(
                    format!("Stop {}", i),
                    Some(Coordinates {
                        lat: 32.0 + i as f64 * 0.1,
                        lng: -97.0 + i as f64 * 0.1,
                    }),
                )
            })
            .collect()
    }

    #[test]
    fn test_plan_batches_covers_matrix() {
        let batches = plan_batches(25, 10);
        // 3 row chunks × 3 column chunks
        assert_eq!(batches.len(), 9);
        let cells: usize = batches.iter().map(|b| b.row_len * b.col_len).sum();
        assert_eq!(cells, 625);
        assert_eq!(batches.last().map(|b| b.row_len), Some(5));
    }

    #[test]
    fn test_plan_batches_zero_batch_size_is_clamped() {
        assert_eq!(plan_batches(3, 0).len(), 9);
    }

    #[tokio::test]
    async fn test_batched_matrix_matches_single_call() {
        let provider = MockGeoProvider::new();
        let points = waypoints(7);

        let batched = build_distance_matrix(
            &provider,
            &points,
            &MatrixConfig { batch_size: 3, concurrency: 2, avoid_highways: false },
        )
        .await;
        let single = build_distance_matrix(
            &provider,
            &points,
            &MatrixConfig { batch_size: 50, concurrency: 1, avoid_highways: false },
        )
        .await;

        assert_eq!(batched.size(), 7);
        assert!(!batched.is_degraded());
        for i in 0..7 {
            assert_eq!(batched.distance(i, i), 0.0);
            for j in 0..7 {
                assert!((batched.distance(i, j) - single.distance(i, j)).abs() < 1e-6);
            }
        }
    }

    #[tokio::test]
    async fn test_failed_provider_fills_sentinels() {
        let provider = FailingGeoProvider;
        let matrix = build_distance_matrix(&provider, &waypoints(4), &MatrixConfig::default()).await;

        assert_eq!(matrix.failed_batches, 1);
        assert_eq!(matrix.sentinel_cells, 12);
        assert!(matrix.is_degraded());
        assert_eq!(matrix.distance(2, 2), 0.0);
        assert_eq!(matrix.distance(0, 3), SENTINEL_DISTANCE_METERS);
        assert!(matrix.is_sentinel(0, 3));
    }

    #[tokio::test]
    async fn test_unreachable_cell_becomes_sentinel() {
        let provider = MatrixGeoProvider::new(vec![
            vec![Some(0.0), Some(1000.0), None],
            vec![Some(1000.0), Some(0.0), Some(2000.0)],
            vec![Some(1500.0), Some(2000.0), Some(0.0)],
        ]);
        let matrix = build_distance_matrix(&provider, &provider.waypoints(), &MatrixConfig::default()).await;

        assert_eq!(matrix.failed_batches, 0);
        assert_eq!(matrix.sentinel_cells, 1);
        assert!(matrix.is_sentinel(0, 2));
        assert!(!matrix.is_sentinel(2, 0));
        assert_eq!(matrix.distance(2, 0), 1500.0);
    }

    #[tokio::test]
    async fn test_matrix_is_directed() {
        let provider = MatrixGeoProvider::new(vec![
            vec![Some(0.0), Some(100.0)],
            vec![Some(300.0), Some(0.0)],
        ]);
        let matrix = build_distance_matrix(
            &provider,
            &provider.waypoints(),
            &MatrixConfig { batch_size: 1, concurrency: 4, avoid_highways: false },
        )
        .await;

        assert_eq!(matrix.distance(0, 1), 100.0);
        assert_eq!(matrix.distance(1, 0), 300.0);
    }

    #[test]
    fn test_path_distance_open_and_closed() {
        let matrix = DistanceMatrix::from_distances(vec![
            vec![0.0, 10.0, 15.0],
            vec![10.0, 0.0, 20.0],
            vec![15.0, 20.0, 0.0],
        ]);
        assert_eq!(matrix.path_distance(&[0, 1, 2], false), 30.0);
        assert_eq!(matrix.path_distance(&[0, 1, 2], true), 45.0);
        assert_eq!(matrix.path_distance(&[0], true), 0.0);
        assert_eq!(matrix.path_distance(&[], false), 0.0);
    }

    #[tokio::test]
    async fn test_empty_waypoints() {
        let matrix = build_distance_matrix(&MockGeoProvider::new(), &[], &MatrixConfig::default()).await;
        assert_eq!(matrix.size(), 0);
        assert!(!matrix.is_degraded());
    }
}
