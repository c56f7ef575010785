//! Soft constraint passes applied after 2-opt.
//!
//! Neither pass checks feasibility; both keep position 0 in place and only
//! stable-sort the rest, so running them again yields the same order.

use tracing::debug;

use crate::types::{Priority, Stop};

/// True when any stop carries a time window
pub fn has_time_windows(stops: &[Stop]) -> bool {
    stops.iter().any(|s| s.time_window.is_some())
}

/// True when any stop carries a non-default priority
pub fn has_priorities(stops: &[Stop]) -> bool {
    stops
        .iter()
        .any(|s| s.priority.is_some_and(|p| p != Priority::default()))
}

/// Sort everything after the start by latest allowed time; stops without a
/// deadline go last.
pub fn time_window_pass(stops: &[Stop], order: &mut [usize]) {
    if let Some(rest) = order.get_mut(1..) {
        rest.sort_by_key(|&i| match stops[i].deadline() {
            Some(latest) => (0, Some(latest)),
            None => (1, None),
        });
    }
}

/// Sort everything after the start by priority rank (high first).
pub fn priority_pass(stops: &[Stop], order: &mut [usize]) {
    if let Some(rest) = order.get_mut(1..) {
        rest.sort_by_key(|&i| stops[i].priority().rank());
    }
}

/// Apply the passes whose triggers are present: time windows, then priority.
pub fn adjust(stops: &[Stop], mut order: Vec<usize>) -> Vec<usize> {
    if has_time_windows(stops) {
        debug!("Applying time-window ordering");
        time_window_pass(stops, &mut order);
    }
    if has_priorities(stops) {
        debug!("Applying priority ordering");
        priority_pass(stops, &mut order);
    }
    order
}
