//! Route optimizer: matrix → nearest neighbor → 2-opt → constraints →
//! assembly → costs → insights.

use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::Utc;
use tracing::{info, warn};
use uuid::Uuid;

use crate::defaults::{meters_to_miles, DEFAULT_OPTIMIZE_TIMEOUT_SECS};
use crate::error::{RouteError, RouteResult};
use crate::services::assembler::{assemble_route, AssemblyInput};
use crate::services::matrix::{build_distance_matrix, MatrixConfig};
use crate::services::routing::{GeoProvider, Waypoint};
use crate::services::tables::ReferenceTables;
use crate::services::{constraints, cost, insights, tour};
use crate::types::{OptimizedRoute, RouteOptions, RouteSummary, Stop};

pub const ALGORITHM: &str = "nearest_neighbor+2opt";

/// Tunables for the optimizer
#[derive(Debug, Clone, Copy)]
pub struct OptimizerConfig {
    pub matrix_batch_size: usize,
    pub matrix_concurrency: usize,
    /// Deadline used by `optimize_with_default_deadline`
    pub timeout: Duration,
}

impl Default for OptimizerConfig {
    fn default() -> Self {
        let matrix = MatrixConfig::default();
        Self {
            matrix_batch_size: matrix.batch_size,
            matrix_concurrency: matrix.concurrency,
            timeout: Duration::from_secs(DEFAULT_OPTIMIZE_TIMEOUT_SECS),
        }
    }
}

/// Multi-stop route optimizer
#[derive(Clone)]
pub struct RouteOptimizer {
    provider: Arc<dyn GeoProvider>,
    tables: Arc<ReferenceTables>,
    config: OptimizerConfig,
}

impl RouteOptimizer {
    pub fn new(provider: Arc<dyn GeoProvider>, tables: Arc<ReferenceTables>) -> Self {
        Self {
            provider,
            tables,
            config: OptimizerConfig::default(),
        }
    }

    pub fn with_config(mut self, config: OptimizerConfig) -> Self {
        self.config = config;
        self
    }

    pub fn tables(&self) -> &ReferenceTables {
        &self.tables
    }

    pub fn config(&self) -> &OptimizerConfig {
        &self.config
    }

    /// Optimize the visiting order of `stops`. The first stop is the fixed start.
    pub async fn optimize(&self, stops: &[Stop], options: &RouteOptions) -> RouteResult<OptimizedRoute> {
        if stops.len() < 2 {
            return Err(RouteError::InsufficientStops { found: stops.len() });
        }

        let started = Instant::now();
        let departure = options.departure_time.unwrap_or_else(Utc::now);
        let provider = self.provider.as_ref();
        let tables = self.tables.as_ref();
        let closed = options.return_to_origin;

        info!(
            "Optimizing {} stops with {} (vehicle: {}, return: {})",
            stops.len(),
            provider.name(),
            options.vehicle_type.as_str(),
            closed
        );

        // 1. Distance matrix
        let waypoints: Vec<Waypoint> = stops.iter().map(Waypoint::from).collect();
        let matrix_config = MatrixConfig {
            batch_size: self.config.matrix_batch_size,
            concurrency: self.config.matrix_concurrency,
            avoid_highways: options.avoid_highways,
        };
        let matrix = build_distance_matrix(provider, &waypoints, &matrix_config).await;

        // 2. Order: construct and improve off the async task, then apply soft constraints
        let (matrix, improved) = tokio::task::spawn_blocking(move || {
            let initial = tour::nearest_neighbor(&matrix);
            let improved = tour::two_opt(&matrix, initial, closed);
            (matrix, improved)
        })
        .await
        .map_err(|e| RouteError::SolverFailed {
            reason: e.to_string(),
        })?;
        let order = constraints::adjust(stops, improved);

        // 3. Concrete legs and clock
        let assembled = assemble_route(
            provider,
            tables,
            AssemblyInput {
                stops,
                order: &order,
                matrix: &matrix,
                departure,
                return_to_origin: closed,
                avoid_highways: options.avoid_highways,
            },
        )
        .await;

        // 4. Costs and savings
        let profile = tables.vehicle_profile(options.vehicle_type);
        let price = tables.fuel_price_for(&stops[0].address);
        let total_miles = meters_to_miles(assembled.total_distance_meters);
        let fuel = cost::fuel_estimate(total_miles, &profile, price);

        let naive: Vec<usize> = (0..stops.len()).collect();
        let savings = cost::route_savings(&matrix, stops, &naive, &order, closed, &profile, price);
        let remaining_deadheads = cost::remaining_deadheads(stops, &order);
        let degraded = matrix.is_degraded() || assembled.estimated_legs > 0;
        let efficiency_score =
            cost::efficiency_score(assembled.missed_windows(), remaining_deadheads, degraded);

        if degraded {
            warn!(
                "Route degraded: {} failed matrix batches, {} sentinel cells, {} estimated legs",
                matrix.failed_batches, matrix.sentinel_cells, assembled.estimated_legs
            );
        }

        // 5. Insights
        let mut route_insights = insights::corridor_insights(tables, &assembled.stops);
        route_insights.extend(insights::traffic_insights(tables, &assembled.stops));
        route_insights.push(insights::weather_insight(departure));
        let all_legs: Vec<_> = assembled
            .legs
            .iter()
            .chain(assembled.return_leg.iter())
            .cloned()
            .collect();
        route_insights.extend(insights::construction_insight(departure, &all_legs));

        let local_departure = tables
            .zone_for(&stops[0].address)
            .map_or_else(|| departure.naive_utc(), |zone| zone.local_time(departure));
        route_insights.extend(insights::coaching_tips(&insights::TipContext {
            savings: &savings,
            local_departure,
            stop_count: stops.len(),
            vehicle_type: options.vehicle_type,
            remaining_deadheads,
        }));

        let fuel_stops = if options.prioritize_fuel {
            insights::recommend_fuel_stops(
                provider,
                &profile,
                &assembled.stops,
                &assembled.legs,
                options.max_detour_minutes,
            )
            .await
        } else {
            vec![]
        };

        let summary = RouteSummary {
            total_distance_meters: assembled.total_distance_meters,
            total_distance_miles: total_miles,
            total_duration_minutes: assembled.travel_minutes + assembled.dwell_minutes,
            travel_minutes: assembled.travel_minutes,
            dwell_minutes: assembled.dwell_minutes,
            fuel_gallons: fuel.gallons,
            fuel_cost: fuel.cost,
            fuel_price_per_gallon: fuel.price_per_gallon,
            stop_count: stops.len(),
            start_time: assembled.start_time,
            end_time: assembled.end_time,
            efficiency_score,
        };

        let solve_time_ms = started.elapsed().as_millis() as u64;
        info!(
            "Optimized route: {:.1} mi, {:.0} min, saved {:.1} mi ({:.1}%), score {}, {} ms",
            summary.total_distance_miles,
            summary.total_duration_minutes,
            savings.distance_saved_miles,
            savings.percent_improvement,
            efficiency_score,
            solve_time_ms
        );

        Ok(OptimizedRoute {
            id: Uuid::new_v4(),
            stops: assembled.stops,
            legs: assembled.legs,
            return_leg: assembled.return_leg,
            summary,
            savings,
            insights: route_insights,
            fuel_stops,
            warnings: assembled.warnings,
            degraded,
            algorithm: ALGORITHM.to_string(),
            solve_time_ms,
        })
    }

    /// `optimize` bounded by `timeout`. No partial result on expiry.
    pub async fn optimize_with_deadline(
        &self,
        stops: &[Stop],
        options: &RouteOptions,
        timeout: Duration,
    ) -> RouteResult<OptimizedRoute> {
        match tokio::time::timeout(timeout, self.optimize(stops, options)).await {
            Ok(result) => result,
            Err(_) => {
                warn!("Route optimization exceeded {} ms deadline", timeout.as_millis());
                Err(RouteError::DeadlineExceeded {
                    timeout_ms: timeout.as_millis() as u64,
                })
            }
        }
    }

    /// `optimize_with_deadline` using the configured timeout
    pub async fn optimize_with_default_deadline(
        &self,
        stops: &[Stop],
        options: &RouteOptions,
    ) -> RouteResult<OptimizedRoute> {
        self.optimize_with_deadline(stops, options, self.config.timeout).await
    }
}
