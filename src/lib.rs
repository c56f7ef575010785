//! Route Engine - multi-stop route optimization for freight drivers
//!
//! Orders pickup/delivery stops with nearest neighbor + 2-opt, applies soft
//! time-window and priority passes, and attaches timing, fuel cost, savings
//! and driver insights.

pub mod config;
pub mod defaults;
pub mod error;
pub mod services;
pub mod types;

pub use error::{RouteError, RouteResult};
pub use services::daily_plan::{DailyPlanner, DutyRules};
pub use services::optimizer::{OptimizerConfig, RouteOptimizer};
pub use services::routing::{create_geo_provider_with_fallback, GeoProvider, MockGeoProvider};
pub use services::tables::ReferenceTables;
