//! Route assembly: concrete legs and a running clock over the final order.
//!
//! Leg directions are fetched concurrently first, then one synchronous fold
//! applies the clock. Failed legs fall back to the matrix distance driven at
//! the estimate speed, or to the road-adjusted straight line when the matrix
//! only holds the unreachable sentinel.

use chrono::{DateTime, Duration, Utc};
use futures::future::join_all;
use tracing::{debug, warn};

use crate::defaults::{estimated_minutes, meters_to_miles};
use crate::services::geo;
use crate::services::matrix::DistanceMatrix;
use crate::services::routing::{GeoProvider, LegDirections, Waypoint};
use crate::services::tables::ReferenceTables;
use crate::types::{OptimizedStop, RouteLeg, RouteWarning, Stop};

pub const TIME_WINDOW_MISSED: &str = "TIME_WINDOW_MISSED";
pub const UNREACHABLE_LEG: &str = "UNREACHABLE_LEG";

/// Everything the assembler needs about one optimized order
#[derive(Debug, Clone, Copy)]
pub struct AssemblyInput<'a> {
    pub stops: &'a [Stop],
    /// Indices into `stops`, in visiting order
    pub order: &'a [usize],
    pub matrix: &'a DistanceMatrix,
    pub departure: DateTime<Utc>,
    pub return_to_origin: bool,
    pub avoid_highways: bool,
}

/// Assembled route before costs and insights
#[derive(Debug, Clone)]
pub struct AssembledRoute {
    pub stops: Vec<OptimizedStop>,
    pub legs: Vec<RouteLeg>,
    pub return_leg: Option<RouteLeg>,
    pub warnings: Vec<RouteWarning>,
    pub total_distance_meters: f64,
    pub travel_minutes: f64,
    pub dwell_minutes: f64,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    /// Legs that fell back to matrix estimates
    pub estimated_legs: usize,
}

impl AssembledRoute {
    pub fn missed_windows(&self) -> usize {
        self.warnings
            .iter()
            .filter(|w| w.warning_type == TIME_WINDOW_MISSED)
            .count()
    }
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn minutes_duration(minutes: f64) -> Duration {
    Duration::milliseconds((minutes * 60_000.0).round() as i64)
}

/// Provider detail or matrix estimate for one leg, before the clock is applied
struct LegDraft {
    distance_meters: f64,
    duration_minutes: f64,
    directions: LegDirections,
    estimated: bool,
}

fn draft_leg(
    result: anyhow::Result<LegDirections>,
    matrix: &DistanceMatrix,
    waypoints: &[Waypoint],
    from: usize,
    to: usize,
) -> LegDraft {
    match result {
        Ok(directions) => LegDraft {
            distance_meters: directions.distance_meters,
            duration_minutes: directions.duration_seconds / 60.0,
            directions,
            estimated: false,
        },
        Err(e) => {
            // The sentinel only steers the solver; never report it as a distance
            let (distance_meters, source) = if matrix.is_sentinel(from, to) {
                let meters = geo::road_distance_meters(
                    &waypoints[from].resolved_coordinates(),
                    &waypoints[to].resolved_coordinates(),
                    geo::ROAD_COEFFICIENT,
                );
                (meters, "straight line")
            } else {
                (matrix.distance(from, to), "matrix")
            };
            warn!(
                "Directions {} -> {} failed: {}; estimating from {} ({:.0} m)",
                from, to, e, source, distance_meters
            );
            LegDraft {
                distance_meters,
                duration_minutes: estimated_minutes(distance_meters),
                directions: LegDirections::default(),
                estimated: true,
            }
        }
    }
}

/// Provider hints first, then table corridors through either endpoint
fn leg_corridors(tables: &ReferenceTables, hints: &[String], from: &Stop, to: &Stop) -> Vec<String> {
    let mut corridors: Vec<String> = Vec::new();
    let table_matches = tables
        .corridors_for(&from.address)
        .chain(tables.corridors_for(&to.address))
        .map(|c| c.name.clone());
    for name in hints.iter().cloned().chain(table_matches) {
        if !corridors.contains(&name) {
            corridors.push(name);
        }
    }
    corridors
}

/// Rush-hour note for a leg leaving at `departs`, if either endpoint is in a metro zone
pub fn traffic_warning(
    tables: &ReferenceTables,
    from: &Stop,
    to: &Stop,
    departs: DateTime<Utc>,
) -> Option<String> {
    let zone = tables
        .zone_for(&from.address)
        .or_else(|| tables.zone_for(&to.address))?;
    let period = zone.peak_at(departs)?;
    Some(format!(
        "{} {} rush hour: expect about {}% longer travel near {}",
        zone.name,
        period.as_str(),
        zone.delay_percent,
        zone.hotspots.join(", ")
    ))
}

// ---------------------------------------------------------------------------
// Fold
// ---------------------------------------------------------------------------

/// Running totals threaded through the leg fold
struct Clock {
    now: DateTime<Utc>,
    distance_meters: f64,
    travel_minutes: f64,
    dwell_minutes: f64,
}

impl Clock {
    fn drive(&mut self, draft: &LegDraft) {
        self.now += minutes_duration(draft.duration_minutes);
        self.distance_meters += draft.distance_meters;
        self.travel_minutes += draft.duration_minutes;
    }

    fn dwell(&mut self, minutes: u32) {
        self.now += Duration::minutes(i64::from(minutes));
        self.dwell_minutes += f64::from(minutes);
    }
}

fn build_leg(
    tables: &ReferenceTables,
    from: &Stop,
    to: &Stop,
    draft: LegDraft,
    departs: DateTime<Utc>,
) -> RouteLeg {
    RouteLeg {
        from_stop_id: from.id.clone(),
        to_stop_id: to.id.clone(),
        distance_meters: draft.distance_meters,
        distance_miles: meters_to_miles(draft.distance_meters),
        duration_minutes: draft.duration_minutes,
        corridors: leg_corridors(tables, &draft.directions.corridor_hints, from, to),
        traffic_warning: traffic_warning(tables, from, to, departs),
        polyline: draft.directions.polyline,
        steps: draft.directions.steps,
        estimated: draft.estimated,
    }
}

/// Fetch legs for `input.order` and walk the clock across them.
pub async fn assemble_route(
    provider: &dyn GeoProvider,
    tables: &ReferenceTables,
    input: AssemblyInput<'_>,
) -> AssembledRoute {
    let AssemblyInput {
        stops,
        order,
        matrix,
        departure,
        return_to_origin,
        avoid_highways,
    } = input;

    let waypoints: Vec<Waypoint> = stops.iter().map(Waypoint::from).collect();

    let mut pairs: Vec<(usize, usize)> = order.windows(2).map(|w| (w[0], w[1])).collect();
    let closing = match (return_to_origin, order.first(), order.last()) {
        (true, Some(&first), Some(&last)) if order.len() > 1 => Some((last, first)),
        _ => None,
    };
    pairs.extend(closing);

    let results = join_all(pairs.iter().map(|&(from, to)| {
        provider.directions(&waypoints[from], &waypoints[to], avoid_highways)
    }))
    .await;

    let mut drafts = pairs
        .iter()
        .zip(results)
        .map(|(&(from, to), result)| draft_leg(result, matrix, &waypoints, from, to));

    let mut warnings = Vec::new();
    for &(from, to) in &pairs {
        if matrix.is_sentinel(from, to) {
            warnings.push(RouteWarning {
                stop_id: Some(stops[to].id.clone()),
                warning_type: UNREACHABLE_LEG.to_string(),
                message: format!(
                    "No route found from {} to {}; distance is a straight-line estimate",
                    stops[from].id, stops[to].id
                ),
            });
        }
    }

    let mut clock = Clock {
        now: departure,
        distance_meters: 0.0,
        travel_minutes: 0.0,
        dwell_minutes: 0.0,
    };
    let mut optimized = Vec::with_capacity(order.len());
    let mut legs = Vec::with_capacity(order.len().saturating_sub(1));
    let mut estimated_legs = 0;

    for (position, &index) in order.iter().enumerate() {
        let stop = &stops[index];
        let (distance_meters, duration_minutes) = if position == 0 {
            (0.0, 0.0)
        } else {
            let previous = &stops[order[position - 1]];
            let Some(draft) = drafts.next() else {
                break;
            };
            let departs = clock.now;
            clock.drive(&draft);
            estimated_legs += usize::from(draft.estimated);
            let leg = build_leg(tables, previous, stop, draft, departs);
            let measured = (leg.distance_meters, leg.duration_minutes);
            legs.push(leg);
            measured
        };

        let arrival = clock.now;
        clock.dwell(stop.dwell());

        optimized.push(OptimizedStop {
            stop: stop.clone(),
            order: position + 1,
            estimated_arrival: arrival,
            estimated_departure: clock.now,
            distance_from_previous_meters: distance_meters,
            distance_from_previous_miles: meters_to_miles(distance_meters),
            duration_from_previous_minutes: duration_minutes,
        });
    }

    let return_leg = match (closing, drafts.next()) {
        (Some((from, to)), Some(draft)) => {
            let departs = clock.now;
            clock.drive(&draft);
            estimated_legs += usize::from(draft.estimated);
            Some(build_leg(tables, &stops[from], &stops[to], draft, departs))
        }
        _ => None,
    };

    for optimized_stop in &optimized {
        let Some(window) = optimized_stop.stop.time_window else {
            continue;
        };
        if let (true, Some(latest)) = (
            window.is_missed_by(optimized_stop.estimated_arrival),
            window.latest,
        ) {
            let late = (optimized_stop.estimated_arrival - latest).num_minutes();
            warnings.push(RouteWarning {
                stop_id: Some(optimized_stop.stop.id.clone()),
                warning_type: TIME_WINDOW_MISSED.to_string(),
                message: format!(
                    "Arrival at {} is {} min after the window closes at {}",
                    optimized_stop.estimated_arrival.format("%H:%M"),
                    late,
                    latest.format("%H:%M")
                ),
            });
        }
    }

    debug!(
        "Assembled {} legs ({} estimated), {:.1} mi, {:.0} min travel",
        legs.len() + usize::from(return_leg.is_some()),
        estimated_legs,
        meters_to_miles(clock.distance_meters),
        clock.travel_minutes
    );

    AssembledRoute {
        stops: optimized,
        legs,
        return_leg,
        warnings,
        total_distance_meters: clock.distance_meters,
        travel_minutes: clock.travel_minutes,
        dwell_minutes: clock.dwell_minutes,
        start_time: departure,
        end_time: clock.now,
        estimated_legs,
    }
}

// ===========================================================================
// Tests
// ===========================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::defaults::miles_to_meters;
    use crate::services::matrix::{build_distance_matrix, MatrixConfig};
    use crate::services::test_support::MatrixGeoProvider;
    use crate::types::{StopKind, TimeWindow};
    use chrono::TimeZone;

    fn t0() -> DateTime<Utc> {
        // 17:00 UTC on a Monday, 11:00 in Dallas
        Utc.with_ymd_and_hms(2026, 3, 2, 17, 0, 0).unwrap()
    }

    /// Three points 55 miles apart in a line: one hour per hop at the estimate speed
    fn line_provider() -> MatrixGeoProvider {
        let hop = miles_to_meters(55.0);
        MatrixGeoProvider::from_meters(vec![
            vec![0.0, hop, 2.0 * hop],
            vec![hop, 0.0, hop],
            vec![2.0 * hop, hop, 0.0],
        ])
    }

    async fn assemble(
        provider: &MatrixGeoProvider,
        stops: &[Stop],
        order: &[usize],
        return_to_origin: bool,
    ) -> AssembledRoute {
        let tables = ReferenceTables::builtin();
        let matrix = build_distance_matrix(provider, &provider.waypoints(), &MatrixConfig::default()).await;
        assemble_route(
            provider,
            &tables,
            AssemblyInput {
                stops,
                order,
                matrix: &matrix,
                departure: t0(),
                return_to_origin,
                avoid_highways: false,
            },
        )
        .await
    }

    #[tokio::test]
    async fn test_clock_walks_travel_and_dwell() {
        let provider = line_provider();
        let stops = vec![
            provider.stop(0, StopKind::CurrentLocation),
            provider.stop(1, StopKind::Pickup),
            provider.stop(2, StopKind::Delivery).with_dwell_minutes(30),
        ];
        let route = assemble(&provider, &stops, &[0, 1, 2], false).await;

        assert_eq!(route.legs.len(), 2);
        assert_eq!(route.legs[0].from_stop_id, "s0");
        assert_eq!(route.legs[0].to_stop_id, "s1");
        assert_eq!(route.legs[1].from_stop_id, "s1");
        assert_eq!(route.legs[1].to_stop_id, "s2");

        let first = &route.stops[0];
        assert_eq!(first.order, 1);
        assert_eq!(first.estimated_arrival, t0());
        assert_eq!(first.estimated_departure, t0());

        // 60 min drive, 15 min default dwell
        let second = &route.stops[1];
        assert_eq!(second.estimated_arrival, t0() + Duration::minutes(60));
        assert_eq!(second.estimated_departure, t0() + Duration::minutes(75));
        assert!((second.distance_from_previous_miles - 55.0).abs() < 1e-9);

        let third = &route.stops[2];
        assert_eq!(third.estimated_arrival, t0() + Duration::minutes(135));
        assert_eq!(route.end_time, t0() + Duration::minutes(165));

        assert!((route.travel_minutes - 120.0).abs() < 1e-6);
        assert_eq!(route.dwell_minutes, 45.0);
        assert_eq!(route.estimated_legs, 0);
        assert!(route.return_leg.is_none());
    }

    #[tokio::test]
    async fn test_follows_given_order() {
        let provider = line_provider();
        let stops: Vec<Stop> = (0..3).map(|i| provider.stop(i, StopKind::Delivery)).collect();
        let route = assemble(&provider, &stops, &[0, 2, 1], false).await;

        let ids: Vec<&str> = route.stops.iter().map(|s| s.stop.id.as_str()).collect();
        assert_eq!(ids, vec!["s0", "s2", "s1"]);
        assert!((route.legs[0].distance_miles - 110.0).abs() < 1e-9);
    }

    #[tokio::test]
    async fn test_return_leg_adds_distance_not_stops() {
        let provider = line_provider();
        let stops: Vec<Stop> = (0..3).map(|i| provider.stop(i, StopKind::Delivery)).collect();
        let route = assemble(&provider, &stops, &[0, 1, 2], true).await;

        assert_eq!(route.stops.len(), 3);
        assert_eq!(route.legs.len(), 2);
        let back = route.return_leg.as_ref().unwrap();
        assert_eq!(back.from_stop_id, "s2");
        assert_eq!(back.to_stop_id, "s0");
        assert!((meters_to_miles(route.total_distance_meters) - 220.0).abs() < 1e-6);
    }

    #[tokio::test]
    async fn test_failed_directions_fall_back_to_matrix() {
        let mut provider = line_provider();
        provider.fail_directions = true;
        let stops: Vec<Stop> = (0..3).map(|i| provider.stop(i, StopKind::Delivery)).collect();
        let route = assemble(&provider, &stops, &[0, 1, 2], false).await;

        assert_eq!(route.estimated_legs, 2);
        assert!(route.legs.iter().all(|l| l.estimated));
        assert!((route.legs[0].duration_minutes - 60.0).abs() < 1e-6);
        assert!(route.legs[0].polyline.is_empty());
    }

    #[tokio::test]
    async fn test_missed_window_reported() {
        let provider = line_provider();
        let stops = vec![
            provider.stop(0, StopKind::CurrentLocation),
            provider
                .stop(1, StopKind::Delivery)
                .with_time_window(TimeWindow::new(None, Some(t0() + Duration::minutes(30)))),
            provider
                .stop(2, StopKind::Delivery)
                .with_time_window(TimeWindow::new(None, Some(t0() + Duration::hours(5)))),
        ];
        let route = assemble(&provider, &stops, &[0, 1, 2], false).await;

        assert_eq!(route.missed_windows(), 1);
        let warning = &route.warnings[0];
        assert_eq!(warning.stop_id.as_deref(), Some("s1"));
        assert_eq!(warning.warning_type, TIME_WINDOW_MISSED);
        assert!(warning.message.contains("30 min"));
    }

    #[tokio::test]
    async fn test_corridors_and_traffic_from_tables() {
        let hop = miles_to_meters(30.0);
        let mut provider = MatrixGeoProvider::from_meters(vec![vec![0.0, hop], vec![hop, 0.0]])
            .with_addresses(&["100 Main St, Dallas, TX", "200 Elm St, Fort Worth, TX"]);
        provider.corridor_hints = vec!["I-30".to_string(), "I-35".to_string()];
        let stops = vec![
            provider.stop(0, StopKind::CurrentLocation),
            provider.stop(1, StopKind::Delivery),
        ];

        let tables = ReferenceTables::builtin();
        let matrix = build_distance_matrix(&provider, &provider.waypoints(), &MatrixConfig::default()).await;
        // 23:00 UTC is 17:00 in Dallas
        let rush = Utc.with_ymd_and_hms(2026, 3, 2, 23, 0, 0).unwrap();
        let route = assemble_route(
            &provider,
            &tables,
            AssemblyInput {
                stops: &stops,
                order: &[0, 1],
                matrix: &matrix,
                departure: rush,
                return_to_origin: false,
                avoid_highways: false,
            },
        )
        .await;

        let leg = &route.legs[0];
        assert_eq!(leg.corridors, vec!["I-30", "I-35", "I-45"]);
        let warning = leg.traffic_warning.as_deref().unwrap();
        assert!(warning.contains("Dallas-Fort Worth evening rush hour"));
        assert!(warning.contains("35%"));

        let midday = assemble(&provider, &stops, &[0, 1], false).await;
        assert!(midday.legs[0].traffic_warning.is_none());
    }

    #[tokio::test]
    async fn test_unreachable_pair_warns() {
        let provider = MatrixGeoProvider::new(vec![
            vec![Some(0.0), None],
            vec![None, Some(0.0)],
        ]);
        let stops: Vec<Stop> = (0..2).map(|i| provider.stop(i, StopKind::Delivery)).collect();
        let route = assemble(&provider, &stops, &[0, 1], false).await;

        assert_eq!(route.legs.len(), 1);
        assert!(route.legs[0].estimated);
        assert!(route.warnings.iter().any(|w| w.warning_type == UNREACHABLE_LEG));
    }

    #[tokio::test]
    async fn test_unreachable_leg_estimated_from_coordinates() {
        let mut provider = MatrixGeoProvider::new(vec![
            vec![Some(0.0), None],
            vec![None, Some(0.0)],
        ]);
        provider.fail_directions = true;
        // Dallas to Fort Worth, about 30 miles as the crow flies
        let stops = vec![
            provider
                .stop(0, StopKind::CurrentLocation)
                .with_coordinates(32.7767, -96.7970),
            provider
                .stop(1, StopKind::Delivery)
                .with_coordinates(32.7555, -97.3308),
        ];
        let route = assemble(&provider, &stops, &[0, 1], false).await;

        let leg = &route.legs[0];
        assert!(leg.estimated);
        assert!(leg.distance_miles > 30.0 && leg.distance_miles < 50.0);
        assert!(route.travel_minutes < 60.0);
        assert!((meters_to_miles(route.total_distance_meters) - leg.distance_miles).abs() < 1e-9);
        assert!(route.warnings.iter().any(|w| w.warning_type == UNREACHABLE_LEG));
    }
}
