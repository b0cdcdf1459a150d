//! Colony Core -- production simulation for planetary colonies.
//!
//! Given a snapshot of a colony's facilities (extractors, processors and
//! storage) and the routes between them, the simulator works out how the
//! production network evolves in simulated time: what gets extracted,
//! manufactured and moved, and which state each facility ends up in.
//!
//! # Event Loop
//!
//! [`simulator::simulate`] clones the snapshot and drains a time-ordered queue
//! of facility evaluations:
//!
//! 1. **Pop** -- take the earliest event and advance simulated time to it.
//! 2. **Pull** -- processors draw recipe inputs from storage over inbound routes.
//! 3. **Run** -- the facility runs one cycle (extract or manufacture).
//! 4. **Route** -- output goes to processors first, then is spread over storage;
//!    storage relays onward in the same tick.
//! 5. **Reschedule** -- the facility and any fed processors are queued again.
//!
//! The run ends at wall-clock now, or once no facility is working any more,
//! and returns a new [`colony::Colony`] with a computed status.
//!
//! # Key Types
//!
//! - [`colony::Colony`] -- Immutable snapshot: facilities, routes, time, status.
//! - [`facility::Facility`] -- A pin with a cycle timer and a commodity store.
//! - [`store::CommodityStore`] -- Volume-bounded, all-or-nothing inventory.
//! - [`extraction::cycle_yield`] -- The extractor yield curve.
//! - [`schedule::EventQueue`] -- Binary-heap event queue, one live event per facility.
//! - [`catalog::Catalog`] -- Commodity volumes and recipes behind lookup traits.
//! - [`serialize`] -- Versioned snapshot encoding via bitcode.

pub mod catalog;
pub mod colony;
pub mod config;
pub mod extraction;
pub mod facility;
pub mod fixed;
pub mod id;
pub mod route;
pub mod schedule;
pub mod serialize;
pub mod simulator;
pub mod store;

#[cfg(any(test, feature = "test-utils"))]
pub mod test_utils;

pub use colony::{Colony, ColonyStatus};
pub use facility::{FacilityKind, FacilityStatus};
pub use simulator::{simulate, simulate_at, SimulationEndCondition};
