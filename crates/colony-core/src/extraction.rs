//! Extractor yield curve.
//!
//! Output per cycle follows a decaying base amount modulated by three cosine
//! waves. The computation is plain `f64` arithmetic in a fixed order, so the
//! same inputs give the same result on every platform.

use crate::catalog::seconds;
use crate::id::CommodityTypeId;
use chrono::{DateTime, TimeDelta, Utc};

/// Seconds in one yield-curve unit (15 minutes).
pub const CURVE_UNIT_SECS: f64 = 900.0;
pub const DECAY_FACTOR: f64 = 0.012;
pub const NOISE_FACTOR: f64 = 0.8;
const WAVE_FREQUENCIES: [f64; 3] = [1.0 / 12.0, 1.0 / 5.0, 1.0 / 2.0];

/// Units extracted during cycle `cycle_index` of a program.
pub fn cycle_yield(cycle_index: u64, quantity_per_cycle: u32, cycle_secs: i64) -> u32 {
    if quantity_per_cycle == 0 || cycle_secs <= 0 {
        return 0;
    }
    let base = f64::from(quantity_per_cycle);
    let width = cycle_secs as f64 / CURVE_UNIT_SECS;
    let t = (cycle_index as f64 + 0.5) * width;
    let decayed = base / (1.0 + t * DECAY_FACTOR);

    let phase = base.powf(0.7);
    let wave_a = (phase + t * WAVE_FREQUENCIES[0]).cos();
    let wave_b = (phase / 2.0 + t * WAVE_FREQUENCIES[1]).cos();
    let wave_c = (t * WAVE_FREQUENCIES[2]).cos();
    let noise = ((wave_a + wave_b + wave_c) / 3.0).max(0.0);

    let hourly = decayed * (1.0 + NOISE_FACTOR * noise);
    let units = (width * hourly).floor();
    if units.is_finite() && units > 0.0 {
        units.min(f64::from(u32::MAX)) as u32
    } else {
        0
    }
}

/// Number of whole cycles in a program, less the one still running at expiry.
pub fn total_cycles(install: DateTime<Utc>, expiry: DateTime<Utc>, cycle_secs: i64) -> i64 {
    if cycle_secs <= 0 {
        return 0;
    }
    (expiry - install).num_seconds().div_euclid(cycle_secs) - 1
}

/// Index of the cycle in progress at `now`.
pub fn current_cycle(install: DateTime<Utc>, now: DateTime<Utc>, cycle_secs: i64) -> i64 {
    if cycle_secs <= 0 {
        return 0;
    }
    (now - install).num_seconds().div_euclid(cycle_secs)
}

// ---------------------------------------------------------------------------
// Extractor program
// ---------------------------------------------------------------------------

/// What an extractor is set to pull out of the ground, and for how long.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct ExtractorProgram {
    pub product: CommodityTypeId,
    pub quantity_per_cycle: u32,
    pub install_time: DateTime<Utc>,
    pub expiry_time: DateTime<Utc>,
}

impl ExtractorProgram {
    /// Whether the program still has time left at `at`. Expiry itself is
    /// past the end.
    pub fn is_running(&self, at: DateTime<Utc>) -> bool {
        at < self.expiry_time
    }

    /// Output of the cycle that finished at `at`.
    pub fn output_at(&self, at: DateTime<Utc>, cycle_secs: i64) -> u32 {
        let index = (current_cycle(self.install_time, at, cycle_secs) - 1).max(0);
        cycle_yield(index as u64, self.quantity_per_cycle, cycle_secs)
    }

    /// Yield of every cycle that finishes by expiry, for charting. This is
    /// one more than [`total_cycles`]: the cycle starting at
    /// [`last_cycle_start`](Self::last_cycle_start) is delivered at or
    /// before expiry too.
    pub fn projected_output(&self, cycle_secs: i64) -> Vec<u32> {
        if cycle_secs <= 0 {
            return Vec::new();
        }
        let cycles = total_cycles(self.install_time, self.expiry_time, cycle_secs) + 1;
        (0..cycles.max(0) as u64)
            .map(|i| cycle_yield(i, self.quantity_per_cycle, cycle_secs))
            .collect()
    }

    /// Start of the final cycle; the last run happens at or before expiry.
    pub fn last_cycle_start(&self, cycle_secs: i64) -> DateTime<Utc> {
        let cycles = total_cycles(self.install_time, self.expiry_time, cycle_secs).max(0);
        self.install_time + seconds(cycles.saturating_mul(cycle_secs))
    }

    /// Time from install to expiry.
    pub fn duration(&self) -> TimeDelta {
        self.expiry_time - self.install_time
    }
}
