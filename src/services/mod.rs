//! Route optimization services

pub mod assembler;
pub mod constraints;
pub mod cost;
pub mod daily_plan;
pub mod geo;
pub mod insights;
pub mod matrix;
pub mod nominatim;
pub mod optimizer;
pub mod routing;
pub mod tables;
pub mod tour;

#[cfg(test)]
pub(crate) mod test_support;
