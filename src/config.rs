//! Configuration management

use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use anyhow::{Context, Result};

use crate::defaults::{
    DEFAULT_BREAK_AFTER_DRIVING_MINUTES, DEFAULT_BREAK_DURATION_MINUTES,
    DEFAULT_MATRIX_BATCH_SIZE, DEFAULT_MATRIX_CONCURRENCY, DEFAULT_MEAL_DURATION_MINUTES,
    DEFAULT_MEAL_INTERVAL_MINUTES, DEFAULT_OPTIMIZE_TIMEOUT_SECS,
};
use crate::services::daily_plan::DutyRules;
use crate::services::optimizer::OptimizerConfig;
use crate::services::tables::ReferenceTables;

/// Application configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// Valhalla routing engine URL (optional, falls back to mock if unavailable)
    pub valhalla_url: Option<String>,

    /// Nominatim API URL (for fuel station search)
    pub nominatim_url: Option<String>,

    pub matrix_batch_size: usize,
    pub matrix_concurrency: usize,
    pub optimize_timeout_secs: u64,

    /// JSON file replacing the built-in reference tables
    pub reference_tables_path: Option<PathBuf>,

    pub break_after_driving_minutes: u32,
    pub break_duration_minutes: u32,
    pub meal_interval_minutes: u32,
    pub meal_duration_minutes: u32,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            valhalla_url: None,
            nominatim_url: None,
            matrix_batch_size: DEFAULT_MATRIX_BATCH_SIZE,
            matrix_concurrency: DEFAULT_MATRIX_CONCURRENCY,
            optimize_timeout_secs: DEFAULT_OPTIMIZE_TIMEOUT_SECS,
            reference_tables_path: None,
            break_after_driving_minutes: DEFAULT_BREAK_AFTER_DRIVING_MINUTES,
            break_duration_minutes: DEFAULT_BREAK_DURATION_MINUTES,
            meal_interval_minutes: DEFAULT_MEAL_INTERVAL_MINUTES,
            meal_duration_minutes: DEFAULT_MEAL_DURATION_MINUTES,
        }
    }
}

/// Non-empty value of an environment variable
fn env_string(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|v| !v.trim().is_empty())
}

/// Parse an environment variable, falling back to `default` when unset
fn env_parse<T>(name: &str, default: T) -> Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match env_string(name) {
        Some(raw) => raw
            .trim()
            .parse()
            .with_context(|| format!("{} must be a number, got {:?}", name, raw)),
        None => Ok(default),
    }
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self> {
        // Load .env file if present
        dotenvy::dotenv().ok();

        let defaults = Self::default();

        let matrix_batch_size = env_parse("MATRIX_BATCH_SIZE", defaults.matrix_batch_size)?;
        if matrix_batch_size == 0 {
            anyhow::bail!("MATRIX_BATCH_SIZE must be at least 1");
        }
        let matrix_concurrency = env_parse("MATRIX_CONCURRENCY", defaults.matrix_concurrency)?;
        if matrix_concurrency == 0 {
            anyhow::bail!("MATRIX_CONCURRENCY must be at least 1");
        }

        Ok(Self {
            valhalla_url: env_string("VALHALLA_URL"),
            nominatim_url: env_string("NOMINATIM_URL"),
            matrix_batch_size,
            matrix_concurrency,
            optimize_timeout_secs: env_parse("OPTIMIZE_TIMEOUT_SECS", defaults.optimize_timeout_secs)?,
            reference_tables_path: env_string("REFERENCE_TABLES_PATH").map(PathBuf::from),
            break_after_driving_minutes: env_parse(
                "BREAK_AFTER_DRIVING_MINUTES",
                defaults.break_after_driving_minutes,
            )?,
            break_duration_minutes: env_parse("BREAK_DURATION_MINUTES", defaults.break_duration_minutes)?,
            meal_interval_minutes: env_parse("MEAL_INTERVAL_MINUTES", defaults.meal_interval_minutes)?,
            meal_duration_minutes: env_parse("MEAL_DURATION_MINUTES", defaults.meal_duration_minutes)?,
        })
    }

    pub fn optimizer_config(&self) -> OptimizerConfig {
        OptimizerConfig {
            matrix_batch_size: self.matrix_batch_size,
            matrix_concurrency: self.matrix_concurrency,
            timeout: Duration::from_secs(self.optimize_timeout_secs),
        }
    }

    pub fn duty_rules(&self) -> DutyRules {
        DutyRules {
            break_after_driving_minutes: self.break_after_driving_minutes,
            break_duration_minutes: self.break_duration_minutes,
            meal_interval_minutes: self.meal_interval_minutes,
            meal_duration_minutes: self.meal_duration_minutes,
        }
    }

    /// Tables from `reference_tables_path`, or the built-in set
    pub fn load_reference_tables(&self) -> Result<ReferenceTables> {
        match &self.reference_tables_path {
            Some(path) => ReferenceTables::from_json_file(path),
            None => Ok(ReferenceTables::builtin()),
        }
    }
}
