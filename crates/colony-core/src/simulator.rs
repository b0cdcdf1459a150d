//! The colony simulator: a discrete-event loop over facility evaluations.
//!
//! # Run lifecycle
//!
//! 1. **Initializing** -- clone the snapshot into a [`Simulation`] scratch
//!    structure and enqueue every facility that can run before the horizon.
//! 2. **Draining** -- pop the earliest event, advance simulated time, evaluate
//!    the facility and route whatever it produced.
//! 3. **Terminated** -- compute every facility's status at the final time and
//!    return a new [`Colony`].
//!
//! The input snapshot is never mutated; routes are shared with the result.
//! Given the same snapshot and the same `now` a run is deterministic.

use crate::colony::{Colony, ColonyStatus};
use crate::config::SimulationConfig;
use crate::facility::{Facility, Production};
use crate::id::{CommodityTypeId, FacilityId};
use crate::route::{inbound, outbound, Route};
use crate::schedule::EventQueue;
use chrono::{DateTime, Utc};
use std::collections::BTreeMap;
use std::sync::Arc;

// ---------------------------------------------------------------------------
// Public types
// ---------------------------------------------------------------------------

/// How far a simulation runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub enum SimulationEndCondition {
    /// Stop at the wall-clock "now".
    UntilNow,
    /// Run forward until nothing in the colony is working any more.
    UntilWorkEnds,
}

/// Why a run stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum StopReason {
    /// No events left.
    QueueDrained,
    /// The next event lies after wall-clock now.
    ReachedNow,
    /// Work ended and every event up to that moment has fired.
    SoftEndReached,
    /// Work ended with a storage facility full; nothing will unblock.
    StorageFull,
    /// The configured evaluation cap was hit.
    EvaluationCap,
}

/// Result of [`Simulator::run`].
#[derive(Debug, Clone)]
pub struct SimulationOutcome {
    pub colony: Colony,
    pub evaluations: u64,
    pub stop_reason: StopReason,
}

/// One movement of commodities along a route.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Transfer {
    pub from: FacilityId,
    pub to: FacilityId,
    pub commodity: CommodityTypeId,
    pub quantity: u32,
}

/// What [`Simulation::route_commodity_output`] did with a batch of output.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RoutingResult {
    /// Transfers in the order they happened, including onward relays from
    /// storage destinations.
    pub transfers: Vec<Transfer>,
    /// Output no route could take.
    pub unrouted: Production,
}

impl RoutingResult {
    /// Total moved directly out of `source` for `commodity`.
    pub fn routed_from(&self, source: FacilityId, commodity: CommodityTypeId) -> u64 {
        self.transfers
            .iter()
            .filter(|t| t.from == source && t.commodity == commodity)
            .map(|t| u64::from(t.quantity))
            .sum()
    }
}

// ---------------------------------------------------------------------------
// Entry points
// ---------------------------------------------------------------------------

/// Simulate `colony` against the real wall clock with the default config.
pub fn simulate(colony: &Colony, condition: SimulationEndCondition) -> Colony {
    simulate_at(colony, condition, Utc::now())
}

/// Simulate `colony` with an injected wall-clock reading.
pub fn simulate_at(colony: &Colony, condition: SimulationEndCondition, now: DateTime<Utc>) -> Colony {
    Simulator::default().run(colony, condition, now).colony
}

/// Simulate independent colonies on the rayon pool. Results keep input order.
#[cfg(feature = "parallel")]
pub fn simulate_many(
    colonies: &[Colony],
    condition: SimulationEndCondition,
    now: DateTime<Utc>,
) -> Vec<Colony> {
    use rayon::prelude::*;

    colonies
        .par_iter()
        .map(|colony| simulate_at(colony, condition, now))
        .collect()
}

/// Runs simulations with a fixed [`SimulationConfig`].
#[derive(Debug, Clone, Default)]
pub struct Simulator {
    config: SimulationConfig,
}

impl Simulator {
    pub fn new(config: SimulationConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &SimulationConfig {
        &self.config
    }

    pub fn run(&self, colony: &Colony, condition: SimulationEndCondition, now: DateTime<Utc>) -> SimulationOutcome {
        let mut sim = Simulation::new(colony, condition, now, self.config.clone());
        sim.enqueue_runnable();
        sim.run()
    }
}

// ---------------------------------------------------------------------------
// Simulation scratch state
// ---------------------------------------------------------------------------

/// Mutable working copy of a colony for the duration of one run.
#[derive(Debug)]
pub struct Simulation<'a> {
    facilities: BTreeMap<FacilityId, Facility>,
    order: Vec<FacilityId>,
    routes: &'a [Route],
    shared_routes: Arc<Vec<Route>>,
    queue: EventQueue,
    condition: SimulationEndCondition,
    now: DateTime<Utc>,
    horizon: DateTime<Utc>,
    start: DateTime<Utc>,
    time: DateTime<Utc>,
    soft_end: Option<DateTime<Utc>>,
    evaluations: u64,
    config: SimulationConfig,
}

impl<'a> Simulation<'a> {
    /// Clone `colony` into a fresh working copy. Nothing is enqueued yet.
    pub fn new(
        colony: &'a Colony,
        condition: SimulationEndCondition,
        now: DateTime<Utc>,
        config: SimulationConfig,
    ) -> Self {
        let horizon = match condition {
            SimulationEndCondition::UntilNow => now,
            SimulationEndCondition::UntilWorkEnds => DateTime::<Utc>::MAX_UTC,
        };
        Self {
            facilities: colony.facilities.iter().map(|f| (f.id, f.clone())).collect(),
            order: colony.facilities.iter().map(|f| f.id).collect(),
            routes: colony.routes.as_slice(),
            shared_routes: Arc::clone(&colony.routes),
            queue: EventQueue::new(),
            condition,
            now,
            horizon,
            start: colony.time,
            time: colony.time,
            soft_end: None,
            evaluations: 0,
            config,
        }
    }

    pub fn facility(&self, id: FacilityId) -> Option<&Facility> {
        self.facilities.get(&id)
    }

    pub fn time(&self) -> DateTime<Utc> {
        self.time
    }

    pub fn evaluations(&self) -> u64 {
        self.evaluations
    }

    /// Enqueue every facility that can run before the horizon at its own
    /// next-run time, which may precede the snapshot time.
    pub fn enqueue_runnable(&mut self) {
        let ids: Vec<FacilityId> = self.facilities.keys().copied().collect();
        for id in ids {
            if self.can_run(id, self.horizon) {
                if let Some(f) = self.facilities.get(&id) {
                    let at = f.next_run_time(self.time);
                    self.queue.schedule(id, at);
                }
            }
        }
    }

    /// Whether `id` could do useful work by `until`, counting inputs that a
    /// processor could still pull from storage.
    fn can_run(&self, id: FacilityId, until: DateTime<Utc>) -> bool {
        let Some(f) = self.facilities.get(&id) else {
            return false;
        };
        f.can_run(until)
            || (f.kind.is_consumer() && f.is_due(until) && f.output_fits() && self.inputs_reachable(f))
    }

    /// Whether pulling from storage would complete every recipe input.
    ///
    /// Each source counts once, capped by its stock and the sum of its route
    /// limits. The total is capped by what the processor can take in.
    fn inputs_reachable(&self, facility: &Facility) -> bool {
        let Some(recipe) = &facility.recipe else {
            return false;
        };
        recipe.inputs.iter().all(|input| {
            let mut limits: BTreeMap<FacilityId, u64> = BTreeMap::new();
            for route in inbound(self.routes, facility.id).filter(|r| r.commodity == input.commodity) {
                *limits.entry(route.source).or_default() += u64::from(route.quantity);
            }
            let reachable: u64 = limits
                .into_iter()
                .filter_map(|(source, limit)| {
                    self.facilities
                        .get(&source)
                        .filter(|s| s.kind.is_storage())
                        .map(|s| u64::from(s.store.quantity(input.commodity)).min(limit))
                })
                .sum();
            let held = u64::from(facility.store.quantity(input.commodity));
            let absorbable = reachable.min(u64::from(facility.accepts(input.commodity)));
            held + absorbable >= u64::from(input.quantity)
        })
    }

    /// Schedule `id` at its next run time if it can run before the horizon.
    fn schedule(&mut self, id: FacilityId) {
        if self.can_run(id, self.horizon) {
            self.enqueue(id);
        }
    }

    /// Schedule `id` at its next run time, never earlier than now.
    fn enqueue(&mut self, id: FacilityId) {
        if let Some(f) = self.facilities.get(&id) {
            let at = f.next_run_time(self.time).max(self.time);
            self.queue.schedule(id, at);
        }
    }

    /// Drain the event queue and build the resulting snapshot.
    pub fn run(mut self) -> SimulationOutcome {
        tracing::debug!(
            facilities = self.facilities.len(),
            routes = self.routes.len(),
            queued = self.queue.len(),
            condition = ?self.condition,
            "Starting colony simulation"
        );

        let stop_reason = loop {
            if self.evaluations >= self.config.max_evaluations {
                tracing::warn!(
                    evaluations = self.evaluations,
                    "Simulation hit the evaluation cap"
                );
                break StopReason::EvaluationCap;
            }
            let Some(event) = self.queue.peek() else {
                break StopReason::QueueDrained;
            };
            if self.condition == SimulationEndCondition::UntilNow && event.time > self.now {
                break StopReason::ReachedNow;
            }
            if let Some(end) = self.soft_end
                && event.time > end
            {
                break StopReason::SoftEndReached;
            }
            self.queue.pop();
            self.time = event.time;

            if !self.can_run(event.facility, event.time) {
                continue;
            }
            self.evaluate(event.facility);

            if self.condition == SimulationEndCondition::UntilWorkEnds {
                let status = self.status_at(self.time);
                if !status.is_working() {
                    if status.has_full_storage() {
                        break StopReason::StorageFull;
                    }
                    if self.soft_end.is_none() {
                        self.soft_end = Some(self.time);
                    }
                }
            }
        };

        let final_time = match self.condition {
            SimulationEndCondition::UntilNow => self.now.max(self.start),
            SimulationEndCondition::UntilWorkEnds => self.time.max(self.start),
        };
        tracing::debug!(
            evaluations = self.evaluations,
            reason = ?stop_reason,
            time = %final_time,
            "Colony simulation finished"
        );

        SimulationOutcome {
            evaluations: self.evaluations,
            stop_reason,
            colony: self.into_colony(final_time),
        }
    }

    fn status_at(&self, at: DateTime<Utc>) -> ColonyStatus {
        ColonyStatus::compute(self.facilities.values(), self.routes, &self.facilities, at)
    }

    fn into_colony(mut self, at: DateTime<Utc>) -> Colony {
        let status = self.status_at(at);
        let mut facilities = Vec::with_capacity(self.order.len());
        for id in &self.order {
            if let Some(mut f) = self.facilities.remove(id) {
                f.status = status.get(f.id).unwrap_or_default();
                facilities.push(f);
            }
        }
        Colony {
            facilities,
            routes: self.shared_routes,
            time: at,
            status: Some(status),
        }
    }

    // -----------------------------------------------------------------------
    // Evaluation
    // -----------------------------------------------------------------------

    /// Evaluate one facility at the current simulated time.
    pub fn evaluate(&mut self, id: FacilityId) {
        let Some(kind) = self.facilities.get(&id).map(|f| f.kind) else {
            return;
        };
        if kind.is_consumer() {
            self.pull_inputs(id);
        }

        let time = self.time;
        let produced = match self.facilities.get_mut(&id) {
            Some(f) => f.run(time),
            None => return,
        };
        self.evaluations += 1;

        if self.config.log_evaluations {
            tracing::debug!(facility = %id, ?kind, time = %time, produced = produced.len(), "Evaluated facility");
        } else {
            tracing::trace!(facility = %id, ?kind, time = %time, produced = produced.len(), "Evaluated facility");
        }

        // A processor that just produced stays on the schedule for its next
        // cycle even if it cannot run yet; inputs may arrive in between. One
        // that produced nothing is still due, so requeueing it would fire
        // again at this instant; routing wakes it when inputs arrive.
        if kind.is_consumer() {
            if !produced.is_empty() {
                self.enqueue(id);
            }
        } else if self.can_run(id, self.horizon) {
            self.enqueue(id);
        }
        if produced.is_empty() {
            return;
        }
        let routed = self.route_commodity_output(id, produced);
        for (commodity, quantity) in &routed.unrouted {
            tracing::trace!(facility = %id, commodity = %commodity, quantity, "Output dropped, no route could take it");
        }
    }

    /// Pull recipe inputs from storage-like sources over inbound routes.
    fn pull_inputs(&mut self, id: FacilityId) {
        let routes = self.routes;
        for route in inbound(routes, id) {
            let Some(source) = self.facilities.get(&route.source) else {
                continue;
            };
            if !source.kind.is_storage() {
                continue;
            }
            let held = source.store.quantity(route.commodity);
            let accepted = self
                .facilities
                .get(&id)
                .map_or(0, |f| f.accepts(route.commodity));
            let amount = held.min(route.quantity).min(accepted);
            self.transfer(route.source, id, route.commodity, amount, true);
        }
    }

    /// Move `amount` of `commodity` into `to`, debiting `from` if requested.
    /// Returns the quantity moved, either `amount` or 0.
    fn transfer(
        &mut self,
        from: FacilityId,
        to: FacilityId,
        commodity: CommodityTypeId,
        amount: u32,
        debit_source: bool,
    ) -> u32 {
        if amount == 0 {
            return 0;
        }
        let added = match self.facilities.get_mut(&to) {
            Some(dest) => dest.store.add(commodity, amount),
            None => 0,
        };
        if added == 0 {
            return 0;
        }
        if debit_source && let Some(src) = self.facilities.get_mut(&from) {
            let removed = src.store.remove(commodity, added);
            debug_assert_eq!(removed, added);
        }
        tracing::trace!(from = %from, to = %to, commodity = %commodity, quantity = added, "Transferred");
        added
    }

    // -----------------------------------------------------------------------
    // Output routing
    // -----------------------------------------------------------------------

    /// Route `produced` out of `source` along its outbound routes.
    ///
    /// Routes into processors are served first, then routes into storage.
    /// Each storage route takes at most `ceil(remaining / storage routes left
    /// for that commodity)` so the first one cannot starve the rest. Routes
    /// are taken in route-list order within each group. A storage source is
    /// debited for what it sends; producer output has no backing stock.
    pub fn route_commodity_output(&mut self, source: FacilityId, produced: Production) -> RoutingResult {
        let Some(source_kind) = self.facilities.get(&source).map(|f| f.kind) else {
            return RoutingResult {
                transfers: Vec::new(),
                unrouted: produced,
            };
        };
        let source_is_storage = source_kind.is_storage();
        let routes = self.routes;

        let mut to_consumers: Vec<&Route> = Vec::new();
        let mut to_storage: Vec<&Route> = Vec::new();
        for route in outbound(routes, source) {
            if !produced.contains_key(&route.commodity) {
                continue;
            }
            match self.facilities.get(&route.destination).map(|f| f.kind) {
                Some(kind) if kind.is_consumer() => to_consumers.push(route),
                Some(kind) if kind.is_storage() => to_storage.push(route),
                _ => {}
            }
        }

        let mut remaining = produced;
        let mut transfers = Vec::new();

        for route in &to_consumers {
            if remaining.is_empty() {
                break;
            }
            let Some(&available) = remaining.get(&route.commodity) else {
                continue;
            };
            let amount = self.transferable(route, available, source_is_storage);
            self.commit(route, amount, source_is_storage, &mut remaining, &mut transfers);
        }

        for (i, route) in to_storage.iter().enumerate() {
            if remaining.is_empty() {
                break;
            }
            let Some(&available) = remaining.get(&route.commodity) else {
                continue;
            };
            let routes_left = to_storage[i..]
                .iter()
                .filter(|r| r.commodity == route.commodity)
                .count() as u32;
            let share = available.div_ceil(routes_left.max(1));
            let amount = self
                .transferable(route, available, source_is_storage)
                .min(share);
            self.commit(route, amount, source_is_storage, &mut remaining, &mut transfers);
        }

        let direct = transfers.clone();
        for t in direct {
            let Some(dest_kind) = self.facilities.get(&t.to).map(|f| f.kind) else {
                continue;
            };
            if dest_kind.is_consumer() {
                self.schedule(t.to);
            }
            if !source_is_storage && dest_kind.is_storage() {
                let relay = self.route_commodity_output(t.to, Production::from([(t.commodity, t.quantity)]));
                transfers.extend(relay.transfers);
            }
        }

        RoutingResult {
            transfers,
            unrouted: remaining,
        }
    }

    /// `min(available, route limit, destination space)`, and for storage
    /// sources, what the source actually holds.
    fn transferable(&self, route: &Route, available: u32, source_is_storage: bool) -> u32 {
        let space = self
            .facilities
            .get(&route.destination)
            .map_or(0, |f| f.accepts(route.commodity));
        let mut amount = available.min(route.quantity).min(space);
        if source_is_storage {
            let held = self
                .facilities
                .get(&route.source)
                .map_or(0, |f| f.store.quantity(route.commodity));
            amount = amount.min(held);
        }
        amount
    }

    fn commit(
        &mut self,
        route: &Route,
        amount: u32,
        source_is_storage: bool,
        remaining: &mut Production,
        transfers: &mut Vec<Transfer>,
    ) {
        let moved = self.transfer(route.source, route.destination, route.commodity, amount, source_is_storage);
        if moved == 0 {
            return;
        }
        if let Some(left) = remaining.get_mut(&route.commodity) {
            *left -= moved;
            if *left == 0 {
                remaining.remove(&route.commodity);
            }
        }
        transfers.push(Transfer {
            from: route.source,
            to: route.destination,
            commodity: route.commodity,
            quantity: moved,
        });
    }
}
