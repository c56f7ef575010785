//! Route Engine CLI - optimizes routes and daily plans from JSON requests

mod cli;

use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use serde::de::DeserializeOwned;
use tracing::{error, info};
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use route_engine::config::Config;
use route_engine::types::{DailyPlanRequest, OptimizeRouteRequest};
use route_engine::{create_geo_provider_with_fallback, DailyPlanner, ReferenceTables, RouteOptimizer};

use cli::{Cli, Command};

fn read_request<T: DeserializeOwned>(path: &Path) -> Result<T> {
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read request file {}", path.display()))?;
    serde_json::from_str(&raw).with_context(|| format!("Invalid request in {}", path.display()))
}

async fn build_optimizer(config: &Config, tables: Arc<ReferenceTables>) -> RouteOptimizer {
    let provider =
        create_geo_provider_with_fallback(config.valhalla_url.clone(), config.nominatim_url.clone()).await;
    RouteOptimizer::new(Arc::from(provider), tables).with_config(config.optimizer_config())
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Logs directory - use LOGS_DIR env var or default to ./logs
    let logs_dir = std::env::var("LOGS_DIR").unwrap_or_else(|_| "./logs".to_string());
    std::fs::create_dir_all(&logs_dir).ok();

    // File appender for persistent logs (daily rotation)
    let file_appender = RollingFileAppender::new(Rotation::DAILY, &logs_dir, "route-engine.log");
    let (non_blocking, _guard) = tracing_appender::non_blocking(file_appender);

    // Logs go to stderr so stdout stays clean JSON
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "info,route_engine=debug".into()),
        ))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .with(tracing_subscriber::fmt::layer().with_writer(non_blocking).with_ansi(false))
        .init();

    let config = Config::from_env()?;
    info!("Configuration loaded");

    let tables = Arc::new(config.load_reference_tables()?);

    let output = match cli.command {
        Command::Tables => serde_json::to_string_pretty(tables.as_ref())?,
        Command::Optimize { input } => {
            let request: OptimizeRouteRequest = read_request(&input)?;
            let optimizer = build_optimizer(&config, tables).await;
            let route = optimizer
                .optimize_with_default_deadline(&request.stops, &request.options)
                .await;
            match route {
                Ok(route) => serde_json::to_string_pretty(&route)?,
                Err(e) => {
                    error!("Route optimization failed: {}", e);
                    return Err(e.into());
                }
            }
        }
        Command::Plan { input } => {
            let request: DailyPlanRequest = read_request(&input)?;
            let planner =
                DailyPlanner::new(build_optimizer(&config, tables).await).with_rules(config.duty_rules());
            let plan = planner
                .generate(&request.driver_location, &request.shipments, &request.options)
                .await;
            match plan {
                Ok(plan) => serde_json::to_string_pretty(&plan)?,
                Err(e) => {
                    error!("Daily plan failed: {}", e);
                    return Err(e.into());
                }
            }
        }
    };

    println!("{}", output);
    Ok(())
}
