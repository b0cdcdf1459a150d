//! Colony Data -- file-based ingestion for the colony simulator.
//!
//! Reads colony snapshots, reference catalogs (commodity volumes and
//! schematics) and simulator configs from JSON, TOML or RON files and turns
//! them into `colony_core` types.
//!
//! - [`schema`] -- On-disk record structs.
//! - [`loader`] -- Format detection, deserialization and the `load_*` entry points.
//! - [`ingest`] -- Record to snapshot conversion.

pub mod ingest;
pub mod loader;
pub mod schema;

pub use loader::{load_catalog, load_colony, load_config, DataLoadError};
