//! Facilities (pins): the production and storage units of a colony.
//!
//! A facility owns its [`CommodityStore`] and a cycle timer. Facilities never
//! talk to each other directly; the simulator moves commodities between them
//! along routes. Status computation gets its neighbours through the
//! [`FacilityLookup`] parameter instead of a back-reference to the colony.

use crate::catalog::{seconds, Recipe};
use crate::extraction::ExtractorProgram;
use crate::fixed::{volume_of, Volume};
use crate::id::{CommodityTypeId, FacilityId, RecipeId};
use crate::route::{inbound, outbound, Route};
use crate::store::CommodityStore;
use chrono::{DateTime, TimeDelta, Utc};
use std::collections::BTreeMap;

/// Commodities produced by one run, keyed by type.
pub type Production = BTreeMap<CommodityTypeId, u32>;

// ---------------------------------------------------------------------------
// Kind and status
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub enum FacilityKind {
    Extractor,
    Processor,
    Storage,
    Launchpad,
    CommandCenter,
}

impl FacilityKind {
    /// Storage, launchpads and command centers only hold commodities.
    pub fn is_storage(self) -> bool {
        matches!(
            self,
            FacilityKind::Storage | FacilityKind::Launchpad | FacilityKind::CommandCenter
        )
    }

    /// Processors consume inputs delivered over routes.
    pub fn is_consumer(self) -> bool {
        self == FacilityKind::Processor
    }

    pub fn is_producer(self) -> bool {
        matches!(self, FacilityKind::Extractor | FacilityKind::Processor)
    }
}

/// Per-facility state at one instant. A projection of the snapshot, never a
/// source of truth.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub enum FacilityStatus {
    #[default]
    Idle,
    Active,
    StorageFull,
    InputMissing,
    OutputFull,
}

/// Read access to sibling facilities by id.
pub trait FacilityLookup {
    fn facility(&self, id: FacilityId) -> Option<&Facility>;
}

impl FacilityLookup for BTreeMap<FacilityId, Facility> {
    fn facility(&self, id: FacilityId) -> Option<&Facility> {
        self.get(&id)
    }
}

impl FacilityLookup for BTreeMap<FacilityId, &Facility> {
    fn facility(&self, id: FacilityId) -> Option<&Facility> {
        self.get(&id).copied()
    }
}

// ---------------------------------------------------------------------------
// Facility
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct Facility {
    pub id: FacilityId,
    pub kind: FacilityKind,
    /// Schematic reference for processors, kept even when it did not resolve.
    pub recipe_id: Option<RecipeId>,
    /// Resolved recipe. `None` means the processor never produces.
    pub recipe: Option<Recipe>,
    pub program: Option<ExtractorProgram>,
    pub cycle_secs: i64,
    pub last_run: Option<DateTime<Utc>>,
    pub store: CommodityStore,
    /// Status as of the last simulation that produced this facility.
    pub status: FacilityStatus,
}

impl Facility {
    /// An extractor running `program`, if any. `cycle_secs` of zero or less
    /// keeps it from ever running.
    pub fn extractor(
        id: FacilityId,
        program: Option<ExtractorProgram>,
        cycle_secs: i64,
        last_run: Option<DateTime<Utc>>,
        store: CommodityStore,
    ) -> Self {
        Self {
            id,
            kind: FacilityKind::Extractor,
            recipe_id: None,
            recipe: None,
            program,
            cycle_secs,
            last_run,
            store,
            status: FacilityStatus::Idle,
        }
    }

    /// A processor following `recipe`. `recipe_id` is kept for display even
    /// when the catalog could not resolve it.
    pub fn processor(
        id: FacilityId,
        recipe_id: Option<RecipeId>,
        recipe: Option<Recipe>,
        cycle_secs: i64,
        last_run: Option<DateTime<Utc>>,
        store: CommodityStore,
    ) -> Self {
        Self {
            id,
            kind: FacilityKind::Processor,
            recipe_id,
            recipe,
            program: None,
            cycle_secs,
            last_run,
            store,
            status: FacilityStatus::Idle,
        }
    }

    /// A holding-only facility. `kind` should be storage-like; producer kinds
    /// built through here have no recipe or program and never run.
    pub fn storage(id: FacilityId, kind: FacilityKind, store: CommodityStore) -> Self {
        Self {
            id,
            kind,
            recipe_id: None,
            recipe: None,
            program: None,
            cycle_secs: 0,
            last_run: None,
            store,
            status: FacilityStatus::Idle,
        }
    }

    pub fn cycle_time(&self) -> TimeDelta {
        seconds(self.cycle_secs)
    }

    /// `last_run + cycle`, or `now` if the facility never ran.
    pub fn next_run_time(&self, now: DateTime<Utc>) -> DateTime<Utc> {
        match self.last_run {
            Some(last) => last
                .checked_add_signed(self.cycle_time())
                .unwrap_or(DateTime::<Utc>::MAX_UTC),
            None => now,
        }
    }

    fn due_by(&self, until: DateTime<Utc>) -> bool {
        self.next_run_time(until) <= until
    }

    /// Whether a run is due by `until` and would do something.
    pub fn can_run(&self, until: DateTime<Utc>) -> bool {
        match self.kind {
            FacilityKind::Extractor => match &self.program {
                Some(program) if self.cycle_secs > 0 => {
                    let next = self.next_run_time(until);
                    next <= until && next <= program.expiry_time
                }
                _ => false,
            },
            FacilityKind::Processor => self.due_by(until) && self.has_all_inputs() && self.output_fits(),
            _ => false,
        }
    }

    /// Whether the run timer alone allows a run by `until`.
    pub fn is_due(&self, until: DateTime<Utc>) -> bool {
        self.kind.is_producer() && self.due_by(until)
    }

    pub fn has_all_inputs(&self) -> bool {
        match &self.recipe {
            Some(recipe) => recipe
                .inputs
                .iter()
                .all(|input| self.store.quantity(input.commodity) >= input.quantity),
            None => false,
        }
    }

    /// Units of `commodity` this facility would take in right now.
    ///
    /// Processors buffer one cycle's worth of each recipe input and nothing
    /// else; extractors take nothing.
    pub fn accepts(&self, commodity: CommodityTypeId) -> u32 {
        match self.kind {
            FacilityKind::Extractor => 0,
            FacilityKind::Processor => {
                let Some(recipe) = &self.recipe else {
                    return 0;
                };
                let wanted = recipe
                    .input_quantity(commodity)
                    .saturating_sub(self.store.quantity(commodity));
                wanted.min(self.store.max_addable(commodity))
            }
            _ => self.store.max_addable(commodity),
        }
    }

    fn has_room_for(&self, commodity: CommodityTypeId, quantity: u32) -> bool {
        if self.kind.is_consumer() {
            self.accepts(commodity) > 0
        } else {
            self.accepts(commodity) >= quantity
        }
    }

    /// Run one cycle at `at`. Returns what was produced, possibly nothing.
    pub fn run(&mut self, at: DateTime<Utc>) -> Production {
        let mut produced = Production::new();
        match self.kind {
            FacilityKind::Extractor => {
                let Some(program) = &self.program else {
                    return produced;
                };
                let amount = program.output_at(at, self.cycle_secs);
                if amount > 0 {
                    produced.insert(program.product, amount);
                }
                self.last_run = Some(at);
                self.status = FacilityStatus::Active;
            }
            FacilityKind::Processor => {
                let Some(recipe) = &self.recipe else {
                    return produced;
                };
                if !self.has_all_inputs() || !self.output_fits() {
                    return produced;
                }
                for input in &recipe.inputs {
                    let removed = self.store.remove(input.commodity, input.quantity);
                    debug_assert_eq!(removed, input.quantity);
                }
                produced.insert(recipe.output.commodity, recipe.output.quantity);
                self.last_run = Some(at);
                self.status = FacilityStatus::Active;
            }
            _ => {}
        }
        produced
    }

    /// Whether one cycle of output fits in the store once the held inputs
    /// for that cycle are consumed. Inputs still to be pulled in take the
    /// space they free, so only held ones count. False without a recipe.
    pub fn output_fits(&self) -> bool {
        let Some(recipe) = &self.recipe else {
            return false;
        };
        let freed = recipe.inputs.iter().fold(Volume::ZERO, |acc, input| {
            let held = self.store.quantity(input.commodity).min(input.quantity);
            acc.saturating_add(volume_of(self.store.unit_volume(input.commodity), held))
        });
        let needed = volume_of(self.store.unit_volume(recipe.output.commodity), recipe.output.quantity);
        needed <= self.store.available_volume().saturating_add(freed)
    }

    /// Compute this facility's status at `at` given the colony's routes and
    /// siblings.
    pub fn status<L>(&self, at: DateTime<Utc>, routes: &[Route], facilities: &L) -> FacilityStatus
    where
        L: FacilityLookup + ?Sized,
    {
        match self.kind {
            FacilityKind::Extractor => match &self.program {
                Some(program) if program.is_running(at) => FacilityStatus::Active,
                _ => FacilityStatus::Idle,
            },
            FacilityKind::Processor => self.processor_status(routes, facilities),
            _ => {
                if self.store.available_volume() > Volume::ZERO {
                    FacilityStatus::Idle
                } else {
                    FacilityStatus::StorageFull
                }
            }
        }
    }

    fn processor_status<L>(&self, routes: &[Route], facilities: &L) -> FacilityStatus
    where
        L: FacilityLookup + ?Sized,
    {
        let Some(recipe) = &self.recipe else {
            return FacilityStatus::Idle;
        };

        for input in &recipe.inputs {
            let held = self.store.quantity(input.commodity);
            if held >= input.quantity {
                continue;
            }
            let missing = input.quantity - held;
            let supplied = inbound(routes, self.id)
                .filter(|r| r.commodity == input.commodity)
                .filter_map(|r| facilities.facility(r.source))
                .any(|source| source.store.quantity(input.commodity) >= missing);
            if !supplied {
                return FacilityStatus::InputMissing;
            }
        }

        if !self.output_fits() {
            return FacilityStatus::OutputFull;
        }

        let output = recipe.output;
        let has_outlet = outbound(routes, self.id)
            .filter(|r| r.commodity == output.commodity)
            .filter_map(|r| facilities.facility(r.destination))
            .any(|dest| dest.has_room_for(output.commodity, output.quantity));
        if !has_outlet {
            return FacilityStatus::OutputFull;
        }

        FacilityStatus::Active
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::{RecipeEntry, VolumeTable};
    use crate::fixed::f64_to_volume;
    use crate::id::RouteId;
    use std::sync::Arc;

    const ORE: CommodityTypeId = CommodityTypeId(2268);
    const WATER: CommodityTypeId = CommodityTypeId(3645);

    fn at(secs: i64) -> DateTime<Utc> {
        DateTime::from_timestamp(1_700_000_000 + secs, 0).unwrap()
    }

    fn volumes() -> Arc<VolumeTable> {
        let mut t = VolumeTable::new();
        t.insert(ORE, f64_to_volume(0.01));
        t.insert(WATER, f64_to_volume(0.38));
        Arc::new(t)
    }

    fn store(capacity: f64) -> CommodityStore {
        CommodityStore::new(f64_to_volume(capacity), volumes())
    }

    fn recipe() -> Recipe {
        Recipe {
            id: RecipeId(121),
            inputs: vec![RecipeEntry {
                commodity: ORE,
                quantity: 3000,
            }],
            output: RecipeEntry {
                commodity: WATER,
                quantity: 20,
            },
            cycle_secs: 1800,
        }
    }

    fn processor(last_run: Option<DateTime<Utc>>) -> Facility {
        Facility::processor(FacilityId(2), Some(RecipeId(121)), Some(recipe()), 1800, last_run, store(500.0))
    }

    fn extractor() -> Facility {
        let program = ExtractorProgram {
            product: ORE,
            quantity_per_cycle: 100,
            install_time: at(0),
            expiry_time: at(36_000),
        };
        Facility::extractor(FacilityId(1), Some(program), 3600, Some(at(0)), store(0.0))
    }

    #[test]
    fn next_run_time_defaults_to_now() {
        let p = processor(None);
        assert_eq!(p.next_run_time(at(50)), at(50));
        let p = processor(Some(at(0)));
        assert_eq!(p.next_run_time(at(50)), at(1800));
    }

    #[test]
    fn extractor_runs_until_expiry() {
        let mut e = extractor();
        assert!(!e.can_run(at(3599)));
        assert!(e.can_run(at(3600)));
        let produced = e.run(at(3600));
        assert_eq!(produced.get(&ORE), Some(&646));
        assert_eq!(e.last_run, Some(at(3600)));

        e.last_run = Some(at(32_400));
        assert!(e.can_run(at(36_000)));
        e.last_run = Some(at(36_000));
        assert!(!e.can_run(at(1_000_000)));
    }

    #[test]
    fn extractor_without_cycle_time_never_runs() {
        let mut e = extractor();
        e.cycle_secs = 0;
        assert!(!e.can_run(at(3600)));
    }

    #[test]
    fn processor_needs_all_inputs() {
        let mut p = processor(None);
        assert!(!p.can_run(at(0)));
        assert!(p.run(at(0)).is_empty());
        assert_eq!(p.last_run, None);

        assert_eq!(p.store.add(ORE, 3000), 3000);
        assert!(p.can_run(at(0)));
        let produced = p.run(at(0));
        assert_eq!(produced.get(&WATER), Some(&20));
        assert_eq!(p.store.quantity(ORE), 0);
        assert_eq!(p.last_run, Some(at(0)));
    }

    #[test]
    fn processor_blocked_when_output_does_not_fit() {
        let mut p = Facility::processor(
            FacilityId(2),
            Some(RecipeId(121)),
            Some(recipe()),
            1800,
            None,
            store(31.0),
        );
        assert_eq!(p.store.add(ORE, 3000), 3000);
        // About 30 m3 freed by the ore, 7.6 m3 needed for the water.
        assert_eq!(p.run(at(0)).len(), 1);

        let mut tight = Facility::processor(
            FacilityId(3),
            Some(RecipeId(121)),
            Some(Recipe {
                output: RecipeEntry {
                    commodity: WATER,
                    quantity: 100,
                },
                ..recipe()
            }),
            1800,
            None,
            store(31.0),
        );
        assert_eq!(tight.store.add(ORE, 3000), 3000);
        assert!(!tight.output_fits());
        assert!(!tight.can_run(at(0)));
        assert!(tight.run(at(0)).is_empty());
        assert_eq!(tight.store.quantity(ORE), 3000);

        let lookup: BTreeMap<FacilityId, Facility> = BTreeMap::new();
        assert_eq!(tight.status(at(0), &[], &lookup), FacilityStatus::OutputFull);
    }

    #[test]
    fn output_room_counts_only_held_inputs() {
        let mut p = Facility::processor(
            FacilityId(2),
            Some(RecipeId(121)),
            Some(recipe()),
            1800,
            None,
            store(8.0),
        );
        // Empty: 8 m3 free, 7.6 m3 needed.
        assert!(p.output_fits());
        // 700 ore takes 7 m3 and frees the same on consumption.
        assert_eq!(p.store.add(ORE, 700), 700);
        assert!(p.output_fits());
        assert_eq!(p.store.add(WATER, 2), 2);
        assert!(!p.output_fits());
    }

    #[test]
    fn processor_without_recipe_is_inert() {
        let mut p = Facility::processor(FacilityId(2), Some(RecipeId(9)), None, 1800, None, store(500.0));
        assert!(!p.can_run(at(0)));
        assert!(p.run(at(0)).is_empty());
        assert_eq!(p.accepts(ORE), 0);
    }

    #[test]
    fn processor_accepts_one_cycle_of_inputs() {
        let mut p = processor(None);
        assert_eq!(p.accepts(ORE), 3000);
        assert_eq!(p.accepts(WATER), 0);
        assert_eq!(p.store.add(ORE, 1000), 1000);
        assert_eq!(p.accepts(ORE), 2000);
    }

    #[test]
    fn storage_never_produces() {
        let mut s = Facility::storage(FacilityId(3), FacilityKind::Storage, store(100.0));
        assert!(!s.can_run(DateTime::<Utc>::MAX_UTC));
        assert!(s.run(at(0)).is_empty());
    }

    #[test]
    fn storage_status_tracks_free_volume() {
        let capacity = volume_of(f64_to_volume(0.01), 50);
        let mut s = Facility::storage(
            FacilityId(3),
            FacilityKind::Storage,
            CommodityStore::new(capacity, volumes()),
        );
        let lookup: BTreeMap<FacilityId, Facility> = BTreeMap::new();
        assert_eq!(s.status(at(0), &[], &lookup), FacilityStatus::Idle);
        assert_eq!(s.store.add(ORE, 49), 49);
        assert_eq!(s.status(at(0), &[], &lookup), FacilityStatus::Idle);
        assert_eq!(s.store.add(ORE, 1), 1);
        assert_eq!(s.status(at(0), &[], &lookup), FacilityStatus::StorageFull);
    }

    #[test]
    fn processor_status_checks_inputs_then_outlets() {
        let p = processor(None);
        let mut silo = Facility::storage(FacilityId(3), FacilityKind::Storage, store(1000.0));
        let sink = Facility::storage(FacilityId(4), FacilityKind::Launchpad, store(1000.0));
        let routes = vec![
            Route::new(RouteId(1), FacilityId(3), FacilityId(2), ORE, 3000),
            Route::new(RouteId(2), FacilityId(2), FacilityId(4), WATER, 20),
        ];

        let lookup: BTreeMap<FacilityId, Facility> =
            [(silo.id, silo.clone()), (sink.id, sink.clone())].into_iter().collect();
        assert_eq!(p.status(at(0), &routes, &lookup), FacilityStatus::InputMissing);

        assert_eq!(silo.store.add(ORE, 3000), 3000);
        let lookup: BTreeMap<FacilityId, Facility> =
            [(silo.id, silo.clone()), (sink.id, sink)].into_iter().collect();
        assert_eq!(p.status(at(0), &routes, &lookup), FacilityStatus::Active);

        let full_sink = Facility::storage(FacilityId(4), FacilityKind::Launchpad, store(1.0));
        let lookup: BTreeMap<FacilityId, Facility> =
            [(silo.id, silo), (full_sink.id, full_sink)].into_iter().collect();
        assert_eq!(p.status(at(0), &routes, &lookup), FacilityStatus::OutputFull);
    }

    #[test]
    fn extractor_status_follows_program() {
        let e = extractor();
        let lookup: BTreeMap<FacilityId, Facility> = BTreeMap::new();
        assert_eq!(e.status(at(100), &[], &lookup), FacilityStatus::Active);
        assert_eq!(e.status(at(36_000), &[], &lookup), FacilityStatus::Idle);
    }
}
