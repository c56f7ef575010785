//! CLI argument parsing for the route-engine binary.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(name = "route-engine", about = "Multi-stop route optimization engine")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// Optimize a route from a JSON request file and print the result
    Optimize {
        /// Path to an optimize request ({"stops": [...], "options": {...}})
        #[arg(long, short)]
        input: PathBuf,
    },
    /// Build a daily plan from a JSON request file and print it
    Plan {
        /// Path to a plan request ({"driverLocation": {...}, "shipments": [...]})
        #[arg(long, short)]
        input: PathBuf,
    },
    /// Print the active reference tables
    Tables,
}
