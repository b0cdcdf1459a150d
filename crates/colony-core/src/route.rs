//! Directed, quantity-bounded transport links between facilities.

use crate::id::{CommodityTypeId, FacilityId, RouteId};

/// Moves one commodity from `source` to `destination`, at most `quantity`
/// units per transfer. Immutable for the duration of a simulation.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct Route {
    pub id: RouteId,
    pub source: FacilityId,
    pub destination: FacilityId,
    pub commodity: CommodityTypeId,
    pub quantity: u32,
}

impl Route {
    pub fn new(
        id: RouteId,
        source: FacilityId,
        destination: FacilityId,
        commodity: CommodityTypeId,
        quantity: u32,
    ) -> Self {
        Self {
            id,
            source,
            destination,
            commodity,
            quantity,
        }
    }
}

/// Routes leaving `facility`, in list order.
pub fn outbound(routes: &[Route], facility: FacilityId) -> impl Iterator<Item = &Route> {
    routes.iter().filter(move |r| r.source == facility)
}

/// Routes arriving at `facility`, in list order.
pub fn inbound(routes: &[Route], facility: FacilityId) -> impl Iterator<Item = &Route> {
    routes.iter().filter(move |r| r.destination == facility)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn routes() -> Vec<Route> {
        vec![
            Route::new(RouteId(1), FacilityId(1), FacilityId(2), CommodityTypeId(10), 50),
            Route::new(RouteId(2), FacilityId(2), FacilityId(3), CommodityTypeId(11), 5),
            Route::new(RouteId(3), FacilityId(1), FacilityId(3), CommodityTypeId(10), 20),
        ]
    }

    #[test]
    fn outbound_keeps_list_order() {
        let routes = routes();
        let ids: Vec<RouteId> = outbound(&routes, FacilityId(1)).map(|r| r.id).collect();
        assert_eq!(ids, vec![RouteId(1), RouteId(3)]);
    }

    #[test]
    fn inbound_filters_by_destination() {
        let routes = routes();
        let ids: Vec<RouteId> = inbound(&routes, FacilityId(3)).map(|r| r.id).collect();
        assert_eq!(ids, vec![RouteId(2), RouteId(3)]);
        assert_eq!(inbound(&routes, FacilityId(1)).count(), 0);
    }
}
