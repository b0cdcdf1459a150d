//! Versioned binary encoding of colony snapshots via `bitcode`.
//!
//! Every payload carries a [`SnapshotHeader`] so stale or foreign data is
//! rejected before it is trusted.

use crate::colony::Colony;
use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Constants
// ---------------------------------------------------------------------------

/// Magic number identifying a colony snapshot.
pub const SNAPSHOT_MAGIC: u32 = 0xC010_0001;

/// Current format version. Increment when breaking the wire format.
pub const FORMAT_VERSION: u32 = 1;

// ---------------------------------------------------------------------------
// Error types
// ---------------------------------------------------------------------------

/// Errors from [`encode_colony`].
#[derive(Debug, thiserror::Error)]
pub enum SerializeError {
    #[error("bitcode encoding failed: {0}")]
    Encode(String),
}

/// Errors from [`decode_colony`] and [`read_snapshot_header`].
#[derive(Debug, thiserror::Error)]
pub enum DeserializeError {
    #[error("data too short for snapshot header")]
    TooShort,
    #[error("invalid magic number: expected 0x{:08X}, got 0x{:08X}", SNAPSHOT_MAGIC, .0)]
    InvalidMagic(u32),
    #[error("unsupported format version: expected {}, got {}", FORMAT_VERSION, .0)]
    UnsupportedVersion(u32),
    #[error("snapshot from future version {0} (this build supports up to {FORMAT_VERSION})")]
    FutureVersion(u32),
    #[error("bitcode decoding failed: {0}")]
    Decode(String),
}

// ---------------------------------------------------------------------------
// Header
// ---------------------------------------------------------------------------

/// Header written in front of every encoded colony.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SnapshotHeader {
    /// Must equal [`SNAPSHOT_MAGIC`].
    pub magic: u32,
    /// Format version the payload was written with.
    pub version: u32,
    /// Simulated time of the colony, unix seconds.
    pub simulated_at: i64,
}

impl SnapshotHeader {
    /// A header for the current format version.
    pub fn new(simulated_at: i64) -> Self {
        Self {
            magic: SNAPSHOT_MAGIC,
            version: FORMAT_VERSION,
            simulated_at,
        }
    }

    /// Check the magic number and that the version is exactly the current one.
    pub fn validate(&self) -> Result<(), DeserializeError> {
        if self.magic != SNAPSHOT_MAGIC {
            return Err(DeserializeError::InvalidMagic(self.magic));
        }
        if self.version > FORMAT_VERSION {
            return Err(DeserializeError::FutureVersion(self.version));
        }
        if self.version < FORMAT_VERSION {
            return Err(DeserializeError::UnsupportedVersion(self.version));
        }
        Ok(())
    }
}

#[derive(Debug, Serialize, Deserialize)]
struct ColonySnapshot {
    header: SnapshotHeader,
    colony: Colony,
}

#[derive(Serialize)]
struct ColonySnapshotRef<'a> {
    header: SnapshotHeader,
    colony: &'a Colony,
}

// ---------------------------------------------------------------------------
// Encode / decode
// ---------------------------------------------------------------------------

/// Encode `colony` with a versioned header.
pub fn encode_colony(colony: &Colony) -> Result<Vec<u8>, SerializeError> {
    let snapshot = ColonySnapshotRef {
        header: SnapshotHeader::new(colony.time.timestamp()),
        colony,
    };
    bitcode::serialize(&snapshot).map_err(|e| SerializeError::Encode(e.to_string()))
}

/// Decode a colony produced by [`encode_colony`].
pub fn decode_colony(data: &[u8]) -> Result<Colony, DeserializeError> {
    if data.len() < 8 {
        return Err(DeserializeError::TooShort);
    }
    let snapshot: ColonySnapshot =
        bitcode::deserialize(data).map_err(|e| DeserializeError::Decode(e.to_string()))?;
    snapshot.header.validate()?;
    Ok(snapshot.colony)
}

/// Decode only far enough to read the header.
pub fn read_snapshot_header(data: &[u8]) -> Result<SnapshotHeader, DeserializeError> {
    if data.len() < 8 {
        return Err(DeserializeError::TooShort);
    }
    let snapshot: ColonySnapshot =
        bitcode::deserialize(data).map_err(|e| DeserializeError::Decode(e.to_string()))?;
    Ok(snapshot.header)
}
