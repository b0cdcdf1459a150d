//! Serde record structs for colony snapshots and reference catalogs.
//!
//! These mirror what an external game-data source hands over: pins, routes
//! and their contents keyed by external integer ids. They are resolved into
//! core types by [`crate::ingest`].

use chrono::{DateTime, Utc};
use colony_core::facility::FacilityKind;
use serde::Deserialize;

// ===========================================================================
// Colony snapshot
// ===========================================================================

/// A whole colony as stored on disk.
#[derive(Debug, Clone, Deserialize)]
pub struct ColonyRecord {
    pub time: DateTime<Utc>,
    #[serde(default)]
    pub pins: Vec<PinRecord>,
    #[serde(default)]
    pub routes: Vec<RouteRecord>,
}

/// One facility. Only `pin_id` and `kind` are required.
#[derive(Debug, Clone, Deserialize)]
pub struct PinRecord {
    pub pin_id: u64,
    pub kind: String,
    #[serde(default)]
    pub recipe_id: Option<u32>,
    #[serde(default)]
    pub cycle_time_secs: Option<i64>,
    #[serde(default)]
    pub last_cycle_start: Option<DateTime<Utc>>,
    #[serde(default)]
    pub contents: Vec<ContentRecord>,
    /// Capacity in cubic metres; per-kind default when absent.
    #[serde(default)]
    pub capacity: Option<f64>,
    #[serde(default)]
    pub extractor: Option<ExtractorRecord>,
}

#[derive(Debug, Clone, Copy, Deserialize)]
pub struct ContentRecord {
    pub type_id: u32,
    pub amount: u32,
}

/// The program an extractor pin is running.
#[derive(Debug, Clone, Deserialize)]
pub struct ExtractorRecord {
    pub product_type_id: u32,
    pub quantity_per_cycle: u32,
    pub install_time: DateTime<Utc>,
    pub expiry_time: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, Deserialize)]
pub struct RouteRecord {
    pub route_id: u64,
    pub source_pin_id: u64,
    pub destination_pin_id: u64,
    pub content_type_id: u32,
    pub quantity: u32,
}

// ===========================================================================
// Reference catalog
// ===========================================================================

/// Commodity volumes and schematics.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CatalogRecord {
    #[serde(default)]
    pub commodities: Vec<CommodityRecord>,
    #[serde(default)]
    pub schematics: Vec<SchematicRecord>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CommodityRecord {
    pub type_id: u32,
    pub name: String,
    /// Cubic metres per unit.
    pub volume: f64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SchematicRecord {
    pub schematic_id: u32,
    #[serde(default)]
    pub name: Option<String>,
    pub cycle_time_secs: i64,
    pub inputs: Vec<SchematicEntryRecord>,
    pub output: SchematicEntryRecord,
}

#[derive(Debug, Clone, Copy, Deserialize)]
pub struct SchematicEntryRecord {
    pub type_id: u32,
    pub quantity: u32,
}

// ===========================================================================
// Kind names and defaults
// ===========================================================================

/// Map a pin kind name to a [`FacilityKind`]. Unknown names are storage.
pub fn parse_kind(name: &str) -> FacilityKind {
    match name.trim().to_ascii_lowercase().as_str() {
        "extractor" => FacilityKind::Extractor,
        "processor" | "factory" => FacilityKind::Processor,
        "launchpad" => FacilityKind::Launchpad,
        "command_center" | "command-center" => FacilityKind::CommandCenter,
        _ => FacilityKind::Storage,
    }
}

/// Capacity in cubic metres used when a pin record leaves it out.
pub fn default_capacity(kind: FacilityKind) -> f64 {
    match kind {
        FacilityKind::Storage => 12_000.0,
        FacilityKind::Launchpad => 10_000.0,
        FacilityKind::CommandCenter => 500.0,
        FacilityKind::Processor => 500.0,
        FacilityKind::Extractor => 0.0,
    }
}
