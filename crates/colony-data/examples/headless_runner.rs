//! Headless colony runner.
//!
//! Loads a catalog, a colony snapshot and an optional simulator config, runs
//! the colony until work ends and prints a per-facility summary.
//!
//! Usage:
//!
//! ```text
//! cargo run -p colony-data --example headless_runner -- [catalog] [colony] [config]
//! ```
//!
//! Paths default to the bundled files under `data/`. Set `RUST_LOG=debug` to
//! see the simulator's own logging.

use colony_core::config::SimulationConfig;
use colony_core::simulator::{SimulationEndCondition, Simulator};
use colony_data::{load_catalog, load_colony, load_config, DataLoadError};
use std::path::{Path, PathBuf};
use tracing::info;
use tracing_subscriber::EnvFilter;

fn main() -> Result<(), DataLoadError> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_target(true)
        .init();

    let data = Path::new(env!("CARGO_MANIFEST_DIR")).join("data");
    let mut args = std::env::args().skip(1).map(PathBuf::from);
    let catalog_path = args.next().unwrap_or_else(|| data.join("catalog.toml"));
    let colony_path = args.next().unwrap_or_else(|| data.join("colony.json"));
    let config = match args.next() {
        Some(path) => load_config(&path)?,
        None => SimulationConfig::default(),
    };

    let catalog = load_catalog(&catalog_path)?;
    let colony = load_colony(&colony_path, &catalog)?;
    info!(
        facilities = colony.facilities.len(),
        routes = colony.routes.len(),
        time = %colony.time,
        "Colony loaded"
    );

    let outcome = Simulator::new(config).run(&colony, SimulationEndCondition::UntilWorkEnds, colony.time);
    let result = &outcome.colony;
    info!(
        evaluations = outcome.evaluations,
        reason = ?outcome.stop_reason,
        until = %result.time,
        "Simulation finished"
    );

    for facility in &result.facilities {
        let contents: Vec<String> = facility
            .store
            .iter()
            .map(|(commodity, quantity)| {
                let name = catalog
                    .commodity(commodity)
                    .map_or_else(|| commodity.to_string(), |c| c.name.clone());
                format!("{quantity} {name}")
            })
            .collect();
        println!(
            "{:>8}  {:<14} {:<13} {}",
            facility.id.to_string(),
            format!("{:?}", facility.kind),
            format!("{:?}", facility.status),
            contents.join(", ")
        );
    }
    Ok(())
}
