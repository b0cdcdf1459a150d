//! Turns on-disk records into core types.
//!
//! Records reference pins, commodities and schematics by external integer
//! id. Routes to or from unknown pins are kept; the simulator treats them as
//! inert.

use crate::loader::DataLoadError;
use crate::schema::{default_capacity, parse_kind, CatalogRecord, ColonyRecord};
use colony_core::catalog::{Catalog, CatalogBuilder, RecipeEntry, RecipeLookup, VolumeLookup};
use colony_core::colony::{Colony, ColonyBuilder};
use colony_core::extraction::ExtractorProgram;
use colony_core::facility::FacilityKind;
use colony_core::fixed::f64_to_volume;
use colony_core::id::{CommodityTypeId, FacilityId, RecipeId, RouteId};
use std::collections::BTreeSet;

/// Build a [`Catalog`] from commodity and schematic records.
pub fn build_catalog(record: &CatalogRecord) -> Catalog {
    let mut builder = CatalogBuilder::new();
    for commodity in &record.commodities {
        builder.register_commodity(
            CommodityTypeId(commodity.type_id),
            &commodity.name,
            f64_to_volume(commodity.volume.max(0.0)),
        );
    }
    for schematic in &record.schematics {
        let inputs = schematic
            .inputs
            .iter()
            .map(|e| RecipeEntry {
                commodity: CommodityTypeId(e.type_id),
                quantity: e.quantity,
            })
            .collect();
        let output = RecipeEntry {
            commodity: CommodityTypeId(schematic.output.type_id),
            quantity: schematic.output.quantity,
        };
        builder.register_recipe(
            RecipeId(schematic.schematic_id),
            inputs,
            output,
            schematic.cycle_time_secs,
        );
    }
    builder.build()
}

/// Build a colony snapshot from `record`. Pin ids must be unique.
pub fn build_colony<C>(record: ColonyRecord, catalog: &C) -> Result<Colony, DataLoadError>
where
    C: VolumeLookup + RecipeLookup + ?Sized,
{
    let mut seen = BTreeSet::new();
    for pin in &record.pins {
        if !seen.insert(pin.pin_id) {
            return Err(DataLoadError::DuplicatePin { pin_id: pin.pin_id });
        }
    }

    let pin_count = record.pins.len();
    let route_count = record.routes.len();
    let mut builder = ColonyBuilder::new(record.time);

    for pin in record.pins {
        let id = FacilityId(pin.pin_id);
        let kind = parse_kind(&pin.kind);
        let capacity = f64_to_volume(pin.capacity.unwrap_or(default_capacity(kind)).max(0.0));
        let contents = pin
            .contents
            .iter()
            .map(|c| (CommodityTypeId(c.type_id), c.amount))
            .collect();

        match kind {
            FacilityKind::Extractor => {
                let program = pin.extractor.map(|e| ExtractorProgram {
                    product: CommodityTypeId(e.product_type_id),
                    quantity_per_cycle: e.quantity_per_cycle,
                    install_time: e.install_time,
                    expiry_time: e.expiry_time,
                });
                if program.is_none() {
                    tracing::debug!(pin = %id, "Extractor pin has no program");
                }
                builder.extractor(
                    id,
                    program,
                    pin.cycle_time_secs.unwrap_or(0),
                    pin.last_cycle_start,
                );
            }
            FacilityKind::Processor => {
                builder.processor(
                    id,
                    pin.recipe_id.map(RecipeId),
                    pin.cycle_time_secs,
                    pin.last_cycle_start,
                    capacity,
                    contents,
                );
            }
            _ => {
                builder.storage(id, kind, capacity, contents);
            }
        }
    }

    for route in record.routes {
        builder.route(
            RouteId(route.route_id),
            FacilityId(route.source_pin_id),
            FacilityId(route.destination_pin_id),
            CommodityTypeId(route.content_type_id),
            route.quantity,
        );
    }

    tracing::debug!(pins = pin_count, routes = route_count, "Ingested colony");
    Ok(builder.build(catalog))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::{ContentRecord, PinRecord, RouteRecord};
    use colony_core::test_utils::*;

    fn pin(pin_id: u64, kind: &str) -> PinRecord {
        PinRecord {
            pin_id,
            kind: kind.to_string(),
            recipe_id: None,
            cycle_time_secs: None,
            last_cycle_start: None,
            contents: Vec::new(),
            capacity: None,
            extractor: None,
        }
    }

    #[test]
    fn duplicate_pin_is_rejected() {
        let record = ColonyRecord {
            time: at(0),
            pins: vec![pin(1, "storage"), pin(1, "launchpad")],
            routes: Vec::new(),
        };
        let err = build_colony(record, &test_catalog()).unwrap_err();
        assert!(matches!(err, DataLoadError::DuplicatePin { pin_id: 1 }));
    }

    #[test]
    fn defaults_are_applied_per_kind() {
        let mut factory = pin(2, "Factory");
        factory.recipe_id = Some(purify_water().0);
        let mut silo = pin(3, "silo");
        silo.contents.push(ContentRecord {
            type_id: aqueous_liquids().0,
            amount: 500,
        });
        let record = ColonyRecord {
            time: at(0),
            pins: vec![pin(1, "launchpad"), factory, silo],
            routes: vec![RouteRecord {
                route_id: 9,
                source_pin_id: 3,
                destination_pin_id: 404,
                content_type_id: aqueous_liquids().0,
                quantity: 10,
            }],
        };
        let colony = build_colony(record, &test_catalog()).unwrap();

        let pad = colony.facility(FacilityId(1)).unwrap();
        assert_eq!(pad.kind, FacilityKind::Launchpad);
        assert_eq!(pad.store.capacity(), f64_to_volume(10_000.0));

        let factory = colony.facility(FacilityId(2)).unwrap();
        assert_eq!(factory.kind, FacilityKind::Processor);
        assert_eq!(factory.cycle_secs, 1800);
        assert_eq!(factory.store.capacity(), f64_to_volume(500.0));

        let silo = colony.facility(FacilityId(3)).unwrap();
        assert_eq!(silo.kind, FacilityKind::Storage);
        assert_eq!(silo.store.quantity(aqueous_liquids()), 500);

        // Dangling route survives ingestion.
        assert_eq!(colony.routes.len(), 1);
    }
}
