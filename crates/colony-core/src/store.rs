//! Bounded per-facility inventory with volume-capacity accounting.

use crate::catalog::VolumeTable;
use crate::fixed::{units_fitting, volume_of, Volume};
use crate::id::CommodityTypeId;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::Arc;

/// Commodity quantities held by one facility, bounded by a volume capacity.
///
/// Invariant: `used_volume() <= capacity` after every mutation. Additions that
/// would break it are rejected whole.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CommodityStore {
    contents: BTreeMap<CommodityTypeId, u32>,
    capacity: Volume,
    volumes: Arc<VolumeTable>,
}

impl CommodityStore {
    pub fn new(capacity: Volume, volumes: Arc<VolumeTable>) -> Self {
        Self {
            contents: BTreeMap::new(),
            capacity: capacity.max(Volume::ZERO),
            volumes,
        }
    }

    /// Build a store pre-filled with `contents`. Entries that do not fit are
    /// dropped in commodity order so the capacity invariant holds from the start.
    pub fn with_contents<I>(capacity: Volume, volumes: Arc<VolumeTable>, contents: I) -> Self
    where
        I: IntoIterator<Item = (CommodityTypeId, u32)>,
    {
        let mut store = Self::new(capacity, volumes);
        let mut merged: BTreeMap<CommodityTypeId, u32> = BTreeMap::new();
        for (commodity, amount) in contents {
            let entry = merged.entry(commodity).or_default();
            *entry = entry.saturating_add(amount);
        }
        for (commodity, amount) in merged {
            let fit = amount.min(store.max_addable(commodity));
            let added = store.add(commodity, fit);
            debug_assert_eq!(added, fit);
        }
        store
    }

    pub fn unit_volume(&self, commodity: CommodityTypeId) -> Volume {
        self.volumes.get(commodity)
    }

    pub fn capacity(&self) -> Volume {
        self.capacity
    }

    /// Sum of `quantity * unit_volume` over everything held.
    pub fn used_volume(&self) -> Volume {
        self.contents
            .iter()
            .fold(Volume::ZERO, |acc, (&c, &q)| {
                acc.saturating_add(volume_of(self.unit_volume(c), q))
            })
    }

    pub fn available_volume(&self) -> Volume {
        self.capacity.saturating_sub(self.used_volume()).max(Volume::ZERO)
    }

    /// True iff the full `amount` of `commodity` fits.
    pub fn has_space_for(&self, commodity: CommodityTypeId, amount: u32) -> bool {
        volume_of(self.unit_volume(commodity), amount) <= self.available_volume()
    }

    /// Largest whole quantity of `commodity` that would fit right now.
    pub fn max_addable(&self, commodity: CommodityTypeId) -> u32 {
        units_fitting(self.available_volume(), self.unit_volume(commodity))
    }

    /// Add exactly `amount` or nothing. Returns the amount added.
    #[must_use = "returns 0 when the amount did not fit"]
    pub fn add(&mut self, commodity: CommodityTypeId, amount: u32) -> u32 {
        if amount == 0 || !self.has_space_for(commodity, amount) {
            return 0;
        }
        let held = self.contents.entry(commodity).or_default();
        let Some(total) = held.checked_add(amount) else {
            return 0;
        };
        *held = total;
        amount
    }

    /// Remove up to `amount`. Returns the amount actually removed.
    #[must_use = "returns the quantity actually removed, which may be less than requested"]
    pub fn remove(&mut self, commodity: CommodityTypeId, amount: u32) -> u32 {
        let Some(held) = self.contents.get_mut(&commodity) else {
            return 0;
        };
        let removed = amount.min(*held);
        *held -= removed;
        if *held == 0 {
            self.contents.remove(&commodity);
        }
        removed
    }

    pub fn quantity(&self, commodity: CommodityTypeId) -> u32 {
        self.contents.get(&commodity).copied().unwrap_or(0)
    }

    /// Iterate held commodities in id order. Zero quantities are never stored.
    pub fn iter(&self) -> impl Iterator<Item = (CommodityTypeId, u32)> + '_ {
        self.contents.iter().map(|(&c, &q)| (c, q))
    }

    pub fn is_empty(&self) -> bool {
        self.contents.is_empty()
    }

    pub fn volumes(&self) -> &Arc<VolumeTable> {
        &self.volumes
    }
}
