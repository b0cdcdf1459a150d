//! Colony snapshots: facilities, routes, a simulated timestamp and the status
//! computed by the last simulation.
//!
//! A [`Colony`] is treated as an immutable value. The simulator clones it,
//! works on the clone and hands back a new snapshot.

use crate::catalog::{Recipe, RecipeLookup, VolumeLookup, VolumeTable};
use crate::extraction::ExtractorProgram;
use crate::facility::{Facility, FacilityKind, FacilityLookup, FacilityStatus};
use crate::fixed::Volume;
use crate::id::{CommodityTypeId, FacilityId, RecipeId, RouteId};
use crate::route::Route;
use crate::store::CommodityStore;
use chrono::{DateTime, Utc};
use std::collections::BTreeMap;
use std::sync::Arc;

// ---------------------------------------------------------------------------
// Status
// ---------------------------------------------------------------------------

/// Status of every facility at one instant.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct ColonyStatus {
    pub time: DateTime<Utc>,
    pub facilities: BTreeMap<FacilityId, FacilityStatus>,
}

impl ColonyStatus {
    /// Status of each facility in `facilities` at `at`.
    pub fn compute<'a, I, L>(facilities: I, routes: &[Route], lookup: &L, at: DateTime<Utc>) -> Self
    where
        I: IntoIterator<Item = &'a Facility>,
        L: FacilityLookup + ?Sized,
    {
        let facilities = facilities
            .into_iter()
            .map(|f| (f.id, f.status(at, routes, lookup)))
            .collect();
        Self { time: at, facilities }
    }

    /// A colony is working while at least one facility is active.
    pub fn is_working(&self) -> bool {
        self.facilities.values().any(|s| *s == FacilityStatus::Active)
    }

    pub fn has_full_storage(&self) -> bool {
        self.facilities.values().any(|s| *s == FacilityStatus::StorageFull)
    }

    pub fn get(&self, id: FacilityId) -> Option<FacilityStatus> {
        self.facilities.get(&id).copied()
    }

    pub fn count(&self, status: FacilityStatus) -> usize {
        self.facilities.values().filter(|s| **s == status).count()
    }
}

// ---------------------------------------------------------------------------
// Colony
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct Colony {
    pub facilities: Vec<Facility>,
    /// Shared between a snapshot and its simulated successors.
    pub routes: Arc<Vec<Route>>,
    pub time: DateTime<Utc>,
    /// Absent until a simulation has run.
    pub status: Option<ColonyStatus>,
}

impl Colony {
    pub fn new(facilities: Vec<Facility>, routes: Vec<Route>, time: DateTime<Utc>) -> Self {
        Self {
            facilities,
            routes: Arc::new(routes),
            time,
            status: None,
        }
    }

    pub fn facility(&self, id: FacilityId) -> Option<&Facility> {
        self.facilities.iter().find(|f| f.id == id)
    }

    /// Facilities keyed by id, borrowed.
    pub fn index(&self) -> BTreeMap<FacilityId, &Facility> {
        self.facilities.iter().map(|f| (f.id, f)).collect()
    }

    /// Status of the colony as it stands at `at`, without simulating.
    pub fn compute_status(&self, at: DateTime<Utc>) -> ColonyStatus {
        let index = self.index();
        ColonyStatus::compute(&self.facilities, &self.routes, &index, at)
    }

    /// Whether the last simulation left any facility active.
    pub fn is_working(&self) -> bool {
        self.status.as_ref().is_some_and(ColonyStatus::is_working)
    }

    /// Total quantity of `commodity` held across all facilities.
    pub fn total_quantity(&self, commodity: CommodityTypeId) -> u64 {
        self.facilities
            .iter()
            .map(|f| u64::from(f.store.quantity(commodity)))
            .sum()
    }
}

// ---------------------------------------------------------------------------
// Builder
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
enum PendingKind {
    Extractor { program: Option<ExtractorProgram> },
    Processor { recipe_id: Option<RecipeId>, cycle_secs: Option<i64> },
    Storage(FacilityKind),
}

#[derive(Debug, Clone)]
struct PendingFacility {
    id: FacilityId,
    kind: PendingKind,
    cycle_secs: i64,
    last_run: Option<DateTime<Utc>>,
    capacity: Volume,
    contents: Vec<(CommodityTypeId, u32)>,
}

/// Assembles a [`Colony`] from raw facility and route descriptions, resolving
/// recipes and commodity volumes through the catalog once.
#[derive(Debug, Clone)]
pub struct ColonyBuilder {
    time: DateTime<Utc>,
    facilities: Vec<PendingFacility>,
    routes: Vec<Route>,
}

impl ColonyBuilder {
    pub fn new(time: DateTime<Utc>) -> Self {
        Self {
            time,
            facilities: Vec::new(),
            routes: Vec::new(),
        }
    }

    pub fn extractor(
        &mut self,
        id: FacilityId,
        program: Option<ExtractorProgram>,
        cycle_secs: i64,
        last_run: Option<DateTime<Utc>>,
    ) -> &mut Self {
        self.facilities.push(PendingFacility {
            id,
            kind: PendingKind::Extractor { program },
            cycle_secs,
            last_run,
            capacity: Volume::ZERO,
            contents: Vec::new(),
        });
        self
    }

    /// Add a processor. A `cycle_secs` of `None` takes the recipe's cycle time.
    pub fn processor(
        &mut self,
        id: FacilityId,
        recipe_id: Option<RecipeId>,
        cycle_secs: Option<i64>,
        last_run: Option<DateTime<Utc>>,
        capacity: Volume,
        contents: Vec<(CommodityTypeId, u32)>,
    ) -> &mut Self {
        self.facilities.push(PendingFacility {
            id,
            kind: PendingKind::Processor { recipe_id, cycle_secs },
            cycle_secs: cycle_secs.unwrap_or(0),
            last_run,
            capacity,
            contents,
        });
        self
    }

    pub fn storage(
        &mut self,
        id: FacilityId,
        kind: FacilityKind,
        capacity: Volume,
        contents: Vec<(CommodityTypeId, u32)>,
    ) -> &mut Self {
        self.facilities.push(PendingFacility {
            id,
            kind: PendingKind::Storage(kind),
            cycle_secs: 0,
            last_run: None,
            capacity,
            contents,
        });
        self
    }

    pub fn route(
        &mut self,
        id: RouteId,
        source: FacilityId,
        destination: FacilityId,
        commodity: CommodityTypeId,
        quantity: u32,
    ) -> &mut Self {
        self.routes
            .push(Route::new(id, source, destination, commodity, quantity));
        self
    }

    pub fn build<C>(self, catalog: &C) -> Colony
    where
        C: VolumeLookup + RecipeLookup + ?Sized,
    {
        let recipes: BTreeMap<RecipeId, Recipe> = self
            .facilities
            .iter()
            .filter_map(|f| match f.kind {
                PendingKind::Processor {
                    recipe_id: Some(id),
                    ..
                } => catalog.recipe(id).map(|r| (id, r)),
                _ => None,
            })
            .collect();

        let mut referenced: Vec<CommodityTypeId> = Vec::new();
        for pending in &self.facilities {
            referenced.extend(pending.contents.iter().map(|(c, _)| *c));
            if let PendingKind::Extractor {
                program: Some(program),
            } = &pending.kind
            {
                referenced.push(program.product);
            }
        }
        referenced.extend(self.routes.iter().map(|r| r.commodity));
        for recipe in recipes.values() {
            referenced.extend(recipe.inputs.iter().map(|e| e.commodity));
            referenced.push(recipe.output.commodity);
        }
        let volumes = Arc::new(VolumeTable::resolve(catalog, referenced));

        let facilities = self
            .facilities
            .into_iter()
            .map(|pending| {
                let store = CommodityStore::with_contents(
                    pending.capacity,
                    Arc::clone(&volumes),
                    pending.contents,
                );
                match pending.kind {
                    PendingKind::Extractor { program } => {
                        Facility::extractor(pending.id, program, pending.cycle_secs, pending.last_run, store)
                    }
                    PendingKind::Processor {
                        recipe_id,
                        cycle_secs,
                    } => {
                        let recipe = recipe_id.and_then(|id| recipes.get(&id).cloned());
                        let cycle = cycle_secs
                            .or_else(|| recipe.as_ref().map(|r| r.cycle_secs))
                            .unwrap_or(0);
                        Facility::processor(pending.id, recipe_id, recipe, cycle, pending.last_run, store)
                    }
                    PendingKind::Storage(kind) => Facility::storage(pending.id, kind, store),
                }
            })
            .collect();

        Colony::new(facilities, self.routes, self.time)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::{CatalogBuilder, RecipeEntry};
    use crate::fixed::f64_to_volume;

    const ORE: CommodityTypeId = CommodityTypeId(2268);
    const WATER: CommodityTypeId = CommodityTypeId(3645);

    fn at(secs: i64) -> DateTime<Utc> {
        DateTime::from_timestamp(1_700_000_000 + secs, 0).unwrap()
    }

    fn catalog() -> crate::catalog::Catalog {
        let mut b = CatalogBuilder::new();
        b.register_commodity(ORE, "Aqueous Liquids", f64_to_volume(0.01))
            .register_commodity(WATER, "Water", f64_to_volume(0.38))
            .register_recipe(
                RecipeId(121),
                vec![RecipeEntry {
                    commodity: ORE,
                    quantity: 3000,
                }],
                RecipeEntry {
                    commodity: WATER,
                    quantity: 20,
                },
                1800,
            );
        b.build()
    }

    #[test]
    fn builder_resolves_recipes_and_volumes() {
        let mut b = ColonyBuilder::new(at(0));
        b.processor(FacilityId(1), Some(RecipeId(121)), None, None, f64_to_volume(500.0), vec![])
            .processor(FacilityId(2), Some(RecipeId(404)), Some(60), None, f64_to_volume(500.0), vec![])
            .storage(FacilityId(3), FacilityKind::Storage, f64_to_volume(12_000.0), vec![(ORE, 10)]);
        let colony = b.build(&catalog());

        let p = colony.facility(FacilityId(1)).unwrap();
        assert_eq!(p.cycle_secs, 1800);
        assert!(p.recipe.is_some());
        assert_eq!(p.store.unit_volume(WATER), f64_to_volume(0.38));

        let missing = colony.facility(FacilityId(2)).unwrap();
        assert_eq!(missing.recipe_id, Some(RecipeId(404)));
        assert!(missing.recipe.is_none());
        assert_eq!(missing.cycle_secs, 60);

        assert_eq!(colony.total_quantity(ORE), 10);
        assert!(colony.status.is_none());
        assert!(!colony.is_working());
    }

    #[test]
    fn dangling_routes_are_kept_and_inert() {
        let mut b = ColonyBuilder::new(at(0));
        b.storage(FacilityId(1), FacilityKind::Storage, f64_to_volume(100.0), vec![])
            .route(RouteId(1), FacilityId(1), FacilityId(99), ORE, 10);
        let colony = b.build(&catalog());
        assert_eq!(colony.routes.len(), 1);
        let status = colony.compute_status(at(0));
        assert_eq!(status.get(FacilityId(1)), Some(FacilityStatus::Idle));
        assert!(!status.is_working());
    }

    #[test]
    fn status_counts() {
        let mut b = ColonyBuilder::new(at(0));
        b.storage(FacilityId(1), FacilityKind::Storage, Volume::ZERO, vec![])
            .storage(FacilityId(2), FacilityKind::Launchpad, f64_to_volume(10.0), vec![])
            .processor(FacilityId(3), Some(RecipeId(121)), None, None, f64_to_volume(500.0), vec![]);
        let status = b.build(&catalog()).compute_status(at(0));
        assert!(status.has_full_storage());
        assert_eq!(status.count(FacilityStatus::StorageFull), 1);
        assert_eq!(status.count(FacilityStatus::InputMissing), 1);
        assert_eq!(status.count(FacilityStatus::Idle), 1);
    }
}
