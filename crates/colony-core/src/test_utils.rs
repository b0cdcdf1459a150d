//! Shared test helpers for unit tests, integration tests and benchmarks.
//!
//! Gated behind `#[cfg(any(test, feature = "test-utils"))]`.

use crate::catalog::{Catalog, CatalogBuilder, RecipeEntry};
use crate::colony::{Colony, ColonyBuilder};
use crate::extraction::ExtractorProgram;
use crate::facility::FacilityKind;
use crate::fixed::{f64_to_volume, Volume};
use crate::id::*;
use chrono::{DateTime, Utc};

// ===========================================================================
// Time
// ===========================================================================

/// Fixed epoch for tests: 2023-11-14T22:13:20Z.
pub const EPOCH_SECS: i64 = 1_700_000_000;

/// `EPOCH_SECS + secs` as a timestamp.
pub fn at(secs: i64) -> DateTime<Utc> {
    DateTime::from_timestamp(EPOCH_SECS + secs, 0).unwrap_or(DateTime::<Utc>::MIN_UTC)
}

pub const HOUR: i64 = 3600;

// ===========================================================================
// Commodities
// ===========================================================================

// Raw resources (0.01 m3)
pub fn aqueous_liquids() -> CommodityTypeId {
    CommodityTypeId(2268)
}
pub fn microorganisms() -> CommodityTypeId {
    CommodityTypeId(2073)
}
pub fn base_metals() -> CommodityTypeId {
    CommodityTypeId(2267)
}

// Processed materials (0.38 m3)
pub fn water() -> CommodityTypeId {
    CommodityTypeId(3645)
}
pub fn bacteria() -> CommodityTypeId {
    CommodityTypeId(2393)
}
pub fn reactive_metals() -> CommodityTypeId {
    CommodityTypeId(2398)
}

// Refined commodities (1.5 m3)
pub fn mechanical_parts() -> CommodityTypeId {
    CommodityTypeId(3689)
}

pub fn purify_water() -> RecipeId {
    RecipeId(121)
}
pub fn culture_bacteria() -> RecipeId {
    RecipeId(131)
}
pub fn refine_metals() -> RecipeId {
    RecipeId(126)
}
pub fn assemble_parts() -> RecipeId {
    RecipeId(73)
}

pub fn volume(v: f64) -> Volume {
    f64_to_volume(v)
}

/// A catalog with three raw resources, three processed materials and one
/// refined commodity.
pub fn test_catalog() -> Catalog {
    let mut b = CatalogBuilder::new();
    b.register_commodity(aqueous_liquids(), "Aqueous Liquids", volume(0.01))
        .register_commodity(microorganisms(), "Microorganisms", volume(0.01))
        .register_commodity(base_metals(), "Base Metals", volume(0.01))
        .register_commodity(water(), "Water", volume(0.38))
        .register_commodity(bacteria(), "Bacteria", volume(0.38))
        .register_commodity(reactive_metals(), "Reactive Metals", volume(0.38))
        .register_commodity(mechanical_parts(), "Mechanical Parts", volume(1.5));

    for (recipe, input, output) in [
        (purify_water(), aqueous_liquids(), water()),
        (culture_bacteria(), microorganisms(), bacteria()),
        (refine_metals(), base_metals(), reactive_metals()),
    ] {
        b.register_recipe(
            recipe,
            vec![RecipeEntry {
                commodity: input,
                quantity: 3000,
            }],
            RecipeEntry {
                commodity: output,
                quantity: 20,
            },
            1800,
        );
    }
    b.register_recipe(
        assemble_parts(),
        vec![
            RecipeEntry {
                commodity: reactive_metals(),
                quantity: 40,
            },
            RecipeEntry {
                commodity: water(),
                quantity: 40,
            },
        ],
        RecipeEntry {
            commodity: mechanical_parts(),
            quantity: 5,
        },
        3600,
    );
    b.build()
}

// ===========================================================================
// Facilities
// ===========================================================================

/// A program installed at `install_secs` running until `expiry_secs`.
pub fn program(product: CommodityTypeId, per_cycle: u32, install_secs: i64, expiry_secs: i64) -> ExtractorProgram {
    ExtractorProgram {
        product,
        quantity_per_cycle: per_cycle,
        install_time: at(install_secs),
        expiry_time: at(expiry_secs),
    }
}

/// Add an hourly extractor installed at the epoch.
pub fn add_extractor(b: &mut ColonyBuilder, id: u64, product: CommodityTypeId, per_cycle: u32, cycles: i64) {
    b.extractor(
        FacilityId(id),
        Some(program(product, per_cycle, 0, cycles * HOUR)),
        HOUR,
        Some(at(0)),
    );
}

pub fn add_silo(b: &mut ColonyBuilder, id: u64, capacity: f64) {
    b.storage(FacilityId(id), FacilityKind::Storage, volume(capacity), vec![]);
}

pub fn add_factory(b: &mut ColonyBuilder, id: u64, recipe: RecipeId) {
    b.processor(FacilityId(id), Some(recipe), None, None, volume(500.0), vec![]);
}

/// Extractor (1) -> storage (2) -> water purifier (3) -> launchpad (4).
pub fn water_chain(cycles: i64) -> Colony {
    let mut b = ColonyBuilder::new(at(0));
    add_extractor(&mut b, 1, aqueous_liquids(), 1000, cycles);
    add_silo(&mut b, 2, 12_000.0);
    add_factory(&mut b, 3, purify_water());
    b.storage(FacilityId(4), FacilityKind::Launchpad, volume(10_000.0), vec![]);
    b.route(RouteId(1), FacilityId(1), FacilityId(2), aqueous_liquids(), 1_000_000)
        .route(RouteId(2), FacilityId(2), FacilityId(3), aqueous_liquids(), 3000)
        .route(RouteId(3), FacilityId(3), FacilityId(4), water(), 20);
    b.build(&test_catalog())
}
