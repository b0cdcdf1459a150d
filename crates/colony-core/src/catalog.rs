//! Reference data the simulator consults: per-unit commodity volumes and
//! manufacturing recipes.
//!
//! The simulator itself only sees the [`VolumeLookup`] and [`RecipeLookup`]
//! traits. [`Catalog`] is the in-memory implementation used by the data
//! loader and tests; it is frozen after [`CatalogBuilder::build`].

use crate::fixed::Volume;
use crate::id::{CommodityTypeId, RecipeId};
use chrono::TimeDelta;
use std::collections::{BTreeMap, BTreeSet, HashMap};

// ---------------------------------------------------------------------------
// Lookup seams
// ---------------------------------------------------------------------------

/// Resolves the volume of one unit of a commodity.
pub trait VolumeLookup {
    fn unit_volume(&self, commodity: CommodityTypeId) -> Option<Volume>;
}

/// Resolves a recipe by id.
pub trait RecipeLookup {
    fn recipe(&self, id: RecipeId) -> Option<Recipe>;
}

// ---------------------------------------------------------------------------
// Recipe types
// ---------------------------------------------------------------------------

/// A commodity and quantity consumed or produced by a recipe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct RecipeEntry {
    pub commodity: CommodityTypeId,
    pub quantity: u32,
}

/// A fixed input/output conversion rule followed by a processor.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct Recipe {
    pub id: RecipeId,
    pub inputs: Vec<RecipeEntry>,
    pub output: RecipeEntry,
    /// Seconds per production cycle.
    pub cycle_secs: i64,
}

impl Recipe {
    pub fn cycle_time(&self) -> TimeDelta {
        seconds(self.cycle_secs)
    }

    /// Quantity of `commodity` one cycle consumes, or 0 if it is not an input.
    pub fn input_quantity(&self, commodity: CommodityTypeId) -> u32 {
        self.inputs
            .iter()
            .filter(|e| e.commodity == commodity)
            .map(|e| e.quantity)
            .sum()
    }
}

/// Convert whole seconds to a `TimeDelta`, saturating on overflow.
pub(crate) fn seconds(secs: i64) -> TimeDelta {
    TimeDelta::try_seconds(secs).unwrap_or(if secs < 0 { TimeDelta::MIN } else { TimeDelta::MAX })
}

// ---------------------------------------------------------------------------
// Resolved volume table
// ---------------------------------------------------------------------------

/// Per-unit volumes resolved once for every commodity a colony references.
///
/// Shared by every store of one colony. Unresolved commodities weigh nothing.
#[derive(Debug, Clone, Default, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct VolumeTable {
    volumes: BTreeMap<CommodityTypeId, Volume>,
}

impl VolumeTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Resolve volumes for `commodities` through `lookup`. Missing entries are
    /// left out and read back as zero.
    pub fn resolve<L, I>(lookup: &L, commodities: I) -> Self
    where
        L: VolumeLookup + ?Sized,
        I: IntoIterator<Item = CommodityTypeId>,
    {
        let wanted: BTreeSet<CommodityTypeId> = commodities.into_iter().collect();
        let volumes = wanted
            .into_iter()
            .filter_map(|c| lookup.unit_volume(c).map(|v| (c, v)))
            .collect();
        Self { volumes }
    }

    pub fn insert(&mut self, commodity: CommodityTypeId, volume: Volume) {
        self.volumes.insert(commodity, volume);
    }

    pub fn get(&self, commodity: CommodityTypeId) -> Volume {
        self.volumes.get(&commodity).copied().unwrap_or(Volume::ZERO)
    }

    pub fn len(&self) -> usize {
        self.volumes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.volumes.is_empty()
    }
}

impl VolumeLookup for VolumeTable {
    fn unit_volume(&self, commodity: CommodityTypeId) -> Option<Volume> {
        self.volumes.get(&commodity).copied()
    }
}

// ---------------------------------------------------------------------------
// Catalog
// ---------------------------------------------------------------------------

/// A commodity definition in the catalog.
#[derive(Debug, Clone)]
pub struct CommodityDef {
    pub name: String,
    pub volume: Volume,
}

/// Builder for an immutable [`Catalog`].
#[derive(Debug, Default)]
pub struct CatalogBuilder {
    commodities: HashMap<CommodityTypeId, CommodityDef>,
    commodity_name_to_id: HashMap<String, CommodityTypeId>,
    recipes: HashMap<RecipeId, Recipe>,
}

impl CatalogBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a commodity under its external type id.
    pub fn register_commodity(&mut self, id: CommodityTypeId, name: &str, volume: Volume) -> &mut Self {
        self.commodities.insert(
            id,
            CommodityDef {
                name: name.to_string(),
                volume,
            },
        );
        self.commodity_name_to_id.insert(name.to_string(), id);
        self
    }

    /// Register a recipe under its external schematic id.
    pub fn register_recipe(
        &mut self,
        id: RecipeId,
        inputs: Vec<RecipeEntry>,
        output: RecipeEntry,
        cycle_secs: i64,
    ) -> &mut Self {
        self.recipes.insert(
            id,
            Recipe {
                id,
                inputs,
                output,
                cycle_secs,
            },
        );
        self
    }

    pub fn commodity_id(&self, name: &str) -> Option<CommodityTypeId> {
        self.commodity_name_to_id.get(name).copied()
    }

    /// Freeze the catalog. Recipes referencing unknown commodities are kept;
    /// their volumes simply resolve to zero.
    pub fn build(self) -> Catalog {
        Catalog {
            commodities: self.commodities,
            commodity_name_to_id: self.commodity_name_to_id,
            recipes: self.recipes,
        }
    }
}

/// Immutable reference catalog. Thread-safe to share.
#[derive(Debug, Default)]
pub struct Catalog {
    commodities: HashMap<CommodityTypeId, CommodityDef>,
    commodity_name_to_id: HashMap<String, CommodityTypeId>,
    recipes: HashMap<RecipeId, Recipe>,
}

impl Catalog {
    pub fn commodity(&self, id: CommodityTypeId) -> Option<&CommodityDef> {
        self.commodities.get(&id)
    }

    pub fn commodity_id(&self, name: &str) -> Option<CommodityTypeId> {
        self.commodity_name_to_id.get(name).copied()
    }

    pub fn commodity_count(&self) -> usize {
        self.commodities.len()
    }

    pub fn recipe_count(&self) -> usize {
        self.recipes.len()
    }
}

impl VolumeLookup for Catalog {
    fn unit_volume(&self, commodity: CommodityTypeId) -> Option<Volume> {
        self.commodities.get(&commodity).map(|c| c.volume)
    }
}

impl RecipeLookup for Catalog {
    fn recipe(&self, id: RecipeId) -> Option<Recipe> {
        self.recipes.get(&id).cloned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixed::f64_to_volume;

    fn setup_builder() -> CatalogBuilder {
        let mut b = CatalogBuilder::new();
        b.register_commodity(CommodityTypeId(2268), "Aqueous Liquids", f64_to_volume(0.01))
            .register_commodity(CommodityTypeId(3645), "Water", f64_to_volume(0.38));
        b.register_recipe(
            RecipeId(121),
            vec![RecipeEntry {
                commodity: CommodityTypeId(2268),
                quantity: 3000,
            }],
            RecipeEntry {
                commodity: CommodityTypeId(3645),
                quantity: 20,
            },
            1800,
        );
        b
    }

    #[test]
    fn register_and_build() {
        let catalog = setup_builder().build();
        assert_eq!(catalog.commodity_count(), 2);
        assert_eq!(catalog.recipe_count(), 1);
    }

    #[test]
    fn lookup_by_name() {
        let catalog = setup_builder().build();
        assert_eq!(catalog.commodity_id("Water"), Some(CommodityTypeId(3645)));
        assert!(catalog.commodity_id("Plasmoids").is_none());
    }

    #[test]
    fn recipe_lookup() {
        let catalog = setup_builder().build();
        let recipe = catalog.recipe(RecipeId(121)).unwrap();
        assert_eq!(recipe.output.quantity, 20);
        assert_eq!(recipe.cycle_time(), TimeDelta::minutes(30));
        assert_eq!(recipe.input_quantity(CommodityTypeId(2268)), 3000);
        assert_eq!(recipe.input_quantity(CommodityTypeId(3645)), 0);
        assert!(catalog.recipe(RecipeId(999)).is_none());
    }

    #[test]
    fn volume_table_defaults_missing_to_zero() {
        let catalog = setup_builder().build();
        let table = VolumeTable::resolve(
            &catalog,
            [CommodityTypeId(2268), CommodityTypeId(9999), CommodityTypeId(2268)],
        );
        assert_eq!(table.len(), 1);
        assert_eq!(table.get(CommodityTypeId(2268)), f64_to_volume(0.01));
        assert_eq!(table.get(CommodityTypeId(9999)), Volume::ZERO);
    }

    #[test]
    fn seconds_saturates() {
        assert_eq!(seconds(i64::MAX), TimeDelta::MAX);
        assert_eq!(seconds(60), TimeDelta::minutes(1));
    }
}
