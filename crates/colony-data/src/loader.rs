//! Format detection, deserialization and the file-level `load_*` entry points.
//!
//! Every data file is JSON, TOML or RON, picked by extension.

use crate::ingest::{build_catalog, build_colony};
use crate::schema::{CatalogRecord, ColonyRecord};
use colony_core::catalog::{Catalog, RecipeLookup, VolumeLookup};
use colony_core::colony::Colony;
use colony_core::config::SimulationConfig;
use serde::de::DeserializeOwned;
use std::path::{Path, PathBuf};

// ===========================================================================
// Errors
// ===========================================================================

/// Errors that can occur during data loading.
#[derive(Debug, thiserror::Error)]
pub enum DataLoadError {
    /// The file has an extension we don't support.
    #[error("unsupported format for file: {file}")]
    UnsupportedFormat { file: PathBuf },

    /// A deserialization error occurred.
    #[error("parse error in {file}: {detail}")]
    Parse { file: PathBuf, detail: String },

    /// Two pins in one colony share an id.
    #[error("duplicate pin id {pin_id}")]
    DuplicatePin { pin_id: u64 },

    /// An I/O error occurred.
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

// ===========================================================================
// Format detection
// ===========================================================================

/// Supported data file formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Format {
    Ron,
    Toml,
    Json,
}

/// Detect the format of a file based on its extension.
pub fn detect_format(path: &Path) -> Result<Format, DataLoadError> {
    match path
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_ascii_lowercase)
        .as_deref()
    {
        Some("ron") => Ok(Format::Ron),
        Some("toml") => Ok(Format::Toml),
        Some("json") => Ok(Format::Json),
        _ => Err(DataLoadError::UnsupportedFormat {
            file: path.to_path_buf(),
        }),
    }
}

// ===========================================================================
// Deserialization
// ===========================================================================

/// Deserialize `content` in `format`. `file` is only used for error messages.
pub fn deserialize_str<T: DeserializeOwned>(
    content: &str,
    format: Format,
    file: &Path,
) -> Result<T, DataLoadError> {
    let parse_error = |detail: String| DataLoadError::Parse {
        file: file.to_path_buf(),
        detail,
    };
    match format {
        Format::Ron => ron::from_str(content).map_err(|e| parse_error(e.to_string())),
        Format::Json => serde_json::from_str(content).map_err(|e| parse_error(e.to_string())),
        Format::Toml => toml::from_str(content).map_err(|e| parse_error(e.to_string())),
    }
}

/// Read a file and deserialize it according to its format (detected from extension).
pub fn deserialize_file<T: DeserializeOwned>(path: &Path) -> Result<T, DataLoadError> {
    let format = detect_format(path)?;
    let content = std::fs::read_to_string(path)?;
    deserialize_str(&content, format, path)
}

// ===========================================================================
// Entry points
// ===========================================================================

/// Load a commodity and schematic catalog.
pub fn load_catalog(path: &Path) -> Result<Catalog, DataLoadError> {
    let record: CatalogRecord = deserialize_file(path)?;
    tracing::debug!(
        file = %path.display(),
        commodities = record.commodities.len(),
        schematics = record.schematics.len(),
        "Loaded catalog"
    );
    Ok(build_catalog(&record))
}

/// Load a colony snapshot, resolving recipes and volumes through `catalog`.
pub fn load_colony<C>(path: &Path, catalog: &C) -> Result<Colony, DataLoadError>
where
    C: VolumeLookup + RecipeLookup + ?Sized,
{
    let record: ColonyRecord = deserialize_file(path)?;
    build_colony(record, catalog)
}

/// Load a simulator config. Missing fields take their defaults.
pub fn load_config(path: &Path) -> Result<SimulationConfig, DataLoadError> {
    deserialize_file(path)
}

// ===========================================================================
// Tests
// ===========================================================================
