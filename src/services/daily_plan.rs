//! Daily plan: shipments → stops → optimized route → breaks → summary text

use chrono::{DateTime, Utc};
use tracing::info;

use crate::defaults::{
    DEFAULT_BREAK_AFTER_DRIVING_MINUTES, DEFAULT_BREAK_DURATION_MINUTES,
    DEFAULT_MEAL_DURATION_MINUTES, DEFAULT_MEAL_INTERVAL_MINUTES,
};
use crate::error::RouteResult;
use crate::services::optimizer::RouteOptimizer;
use crate::types::{
    BreakKind, BreakRecommendation, DailyPlan, DailyTotals, DriverLocation, OptimizedRoute,
    RouteOptions, Shipment, Stop, StopKind,
};

pub const DRIVER_START_ID: &str = "driver-start";

/// Duty-hour thresholds for the break schedule
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DutyRules {
    /// Continuous driving before a mandatory break
    pub break_after_driving_minutes: u32,
    pub break_duration_minutes: u32,
    /// On-duty time between advisory meal breaks
    pub meal_interval_minutes: u32,
    pub meal_duration_minutes: u32,
}

impl Default for DutyRules {
    fn default() -> Self {
        Self {
            break_after_driving_minutes: DEFAULT_BREAK_AFTER_DRIVING_MINUTES,
            break_duration_minutes: DEFAULT_BREAK_DURATION_MINUTES,
            meal_interval_minutes: DEFAULT_MEAL_INTERVAL_MINUTES,
            meal_duration_minutes: DEFAULT_MEAL_DURATION_MINUTES,
        }
    }
}

/// Driver start plus a pickup and a delivery stop per shipment
pub fn shipment_stops(driver: &DriverLocation, shipments: &[Shipment]) -> Vec<Stop> {
    let mut stops = Vec::with_capacity(1 + shipments.len() * 2);
    stops.push(Stop {
        coordinates: driver.coordinates,
        ..Stop::new(DRIVER_START_ID, driver.address.clone(), StopKind::CurrentLocation)
    });

    for shipment in shipments {
        stops.push(Stop {
            id: format!("{}-pickup", shipment.id),
            address: shipment.pickup_address.clone(),
            coordinates: shipment.pickup_coordinates,
            kind: StopKind::Pickup,
            shipment_id: Some(shipment.id.clone()),
            time_window: shipment.pickup_window,
            dwell_minutes: shipment.pickup_dwell_minutes,
            priority: shipment.priority,
        });
        stops.push(Stop {
            id: format!("{}-delivery", shipment.id),
            address: shipment.delivery_address.clone(),
            coordinates: shipment.delivery_coordinates,
            kind: StopKind::Delivery,
            shipment_id: Some(shipment.id.clone()),
            time_window: shipment.delivery_window,
            dwell_minutes: shipment.delivery_dwell_minutes,
            priority: shipment.priority,
        });
    }

    stops
}

// ---------------------------------------------------------------------------
// Break schedule
// ---------------------------------------------------------------------------

/// Duty counters threaded through the break fold
#[derive(Debug, Default)]
struct DutyClock {
    driving_minutes: f64,
    on_duty_minutes: f64,
    meals_taken: u32,
}

impl DutyClock {
    fn record(
        &mut self,
        rules: &DutyRules,
        after_stop_index: usize,
        travel_minutes: f64,
        dwell_minutes: f64,
        at: DateTime<Utc>,
        breaks: &mut Vec<BreakRecommendation>,
    ) {
        self.driving_minutes += travel_minutes;
        self.on_duty_minutes += travel_minutes + dwell_minutes;

        if rules.break_after_driving_minutes > 0
            && self.driving_minutes >= f64::from(rules.break_after_driving_minutes)
        {
            breaks.push(BreakRecommendation {
                after_stop_index,
                kind: BreakKind::Mandatory,
                duration_minutes: rules.break_duration_minutes,
                estimated_start: at,
                reason: format!(
                    "{:.0} minutes of driving since the last break",
                    self.driving_minutes
                ),
            });
            self.driving_minutes = 0.0;
        }

        if rules.meal_interval_minutes > 0 {
            let interval = f64::from(rules.meal_interval_minutes);
            while self.on_duty_minutes >= interval * f64::from(self.meals_taken + 1) {
                self.meals_taken += 1;
                breaks.push(BreakRecommendation {
                    after_stop_index,
                    kind: BreakKind::Meal,
                    duration_minutes: rules.meal_duration_minutes,
                    estimated_start: at,
                    reason: format!(
                        "{:.0} minutes on duty; meal break advised every {} minutes",
                        self.on_duty_minutes, rules.meal_interval_minutes
                    ),
                });
            }
        }
    }
}

/// Walk the optimized stops (and return leg) accumulating driving and
/// on-duty time. Breaks are advisory and do not shift the route's clock.
pub fn schedule_breaks(route: &OptimizedRoute, rules: &DutyRules) -> Vec<BreakRecommendation> {
    let mut clock = DutyClock::default();
    let mut breaks = Vec::new();

    for (index, stop) in route.stops.iter().enumerate() {
        clock.record(
            rules,
            index,
            stop.duration_from_previous_minutes,
            f64::from(stop.stop.dwell()),
            stop.estimated_departure,
            &mut breaks,
        );
    }

    if let (Some(back), Some(last)) = (&route.return_leg, route.stops.len().checked_sub(1)) {
        clock.record(rules, last, back.duration_minutes, 0.0, route.summary.end_time, &mut breaks);
    }

    breaks
}

// ---------------------------------------------------------------------------
// Planner
// ---------------------------------------------------------------------------

fn format_minutes(minutes: f64) -> String {
    let total = minutes.max(0.0).round() as i64;
    format!("{}h {:02}m", total / 60, total % 60)
}

fn plan_summary(route: &OptimizedRoute, shipments: usize, breaks: &[BreakRecommendation]) -> String {
    let s = &route.summary;
    let mut text = format!(
        "{} shipment(s) across {} stops: {:.1} miles, about {} including dwell. Estimated fuel ${:.2} at ${:.2}/gal.",
        shipments,
        s.stop_count,
        s.total_distance_miles,
        format_minutes(s.total_duration_minutes),
        s.fuel_cost,
        s.fuel_price_per_gallon
    );
    if route.savings.distance_saved_miles > 0.0 {
        text.push_str(&format!(
            " Optimized order saves {:.1} miles ({:.0}%) and {} of driving.",
            route.savings.distance_saved_miles,
            route.savings.percent_improvement,
            format_minutes(route.savings.time_saved_minutes)
        ));
    }
    if route.savings.empty_miles_saved > 0.0 {
        text.push_str(&format!(
            " {:.1} empty miles eliminated.",
            route.savings.empty_miles_saved
        ));
    }
    if !breaks.is_empty() {
        text.push_str(&format!(" {} break(s) scheduled.", breaks.len()));
    }
    if !route.warnings.is_empty() {
        text.push_str(&format!(" {} warning(s) to review.", route.warnings.len()));
    }
    if route.degraded {
        text.push_str(" Some distances are estimates.");
    }
    text
}

/// Builds a day's plan for one driver
#[derive(Clone)]
pub struct DailyPlanner {
    optimizer: RouteOptimizer,
    rules: DutyRules,
}

impl DailyPlanner {
    pub fn new(optimizer: RouteOptimizer) -> Self {
        Self {
            optimizer,
            rules: DutyRules::default(),
        }
    }

    pub fn with_rules(mut self, rules: DutyRules) -> Self {
        self.rules = rules;
        self
    }

    pub async fn generate(
        &self,
        driver_location: &DriverLocation,
        shipments: &[Shipment],
        options: &RouteOptions,
    ) -> RouteResult<DailyPlan> {
        let stops = shipment_stops(driver_location, shipments);
        info!(
            "Generating daily plan: {} shipments, {} stops",
            shipments.len(),
            stops.len()
        );

        let route = self
            .optimizer
            .optimize_with_default_deadline(&stops, options)
            .await?;
        let breaks = schedule_breaks(&route, &self.rules);
        let summary = plan_summary(&route, shipments.len(), &breaks);

        let totals = DailyTotals {
            distance_miles: route.summary.total_distance_miles,
            duration_minutes: route.summary.total_duration_minutes,
            fuel_cost: route.summary.fuel_cost,
            shipment_count: shipments.len(),
            stop_count: route.summary.stop_count,
            break_minutes: breaks.iter().map(|b| b.duration_minutes).sum(),
        };

        Ok(DailyPlan {
            date: route.summary.start_time.date_naive(),
            driver_start: driver_location.clone(),
            routes: vec![route],
            totals,
            breaks,
            summary,
            generated_at: Utc::now(),
        })
    }
}
