//! Error types returned by the optimization engine.
//!
//! Geo provider failures never show up here: they are absorbed into matrix
//! sentinels and leg estimates, and flagged through `OptimizedRoute::degraded`.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum RouteError {
    /// Fewer than two stops were given; nothing was computed.
    #[error("at least 2 stops are required to optimize a route, got {found}")]
    InsufficientStops { found: usize },

    /// The call-boundary deadline elapsed before optimization finished.
    #[error("route optimization did not finish within {timeout_ms} ms")]
    DeadlineExceeded { timeout_ms: u64 },

    /// The tour solver task panicked or was cancelled.
    #[error("route solver failed: {reason}")]
    SolverFailed { reason: String },
}

pub type RouteResult<T> = std::result::Result<T, RouteError>;
