//! Demand-producing entities around stations: settlements (whose house tiles
//! generate and consume cargo) and production sites (industries).
//!
//! Only the parts the catchment engine touches are modelled. Each entity keeps
//! a `stations_near` back-reference set that is written exclusively by
//! [`crate::catchment`].

use std::collections::BTreeSet;

use bitcode::{Decode, Encode};
use serde::{Deserialize, Serialize};

use crate::grid::{TileArea, TileFacet, TileGrid, TilePos};
use crate::station::{CargoId, StationId};

#[derive(
    Debug,
    Clone,
    Copy,
    Default,
    PartialEq,
    Eq,
    Hash,
    PartialOrd,
    Ord,
    Serialize,
    Deserialize,
    Encode,
    Decode,
)]
pub struct SettlementId(pub u32);

#[derive(
    Debug,
    Clone,
    Copy,
    Default,
    PartialEq,
    Eq,
    Hash,
    PartialOrd,
    Ord,
    Serialize,
    Deserialize,
    Encode,
    Decode,
)]
pub struct SiteId(pub u32);

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Encode, Decode)]
pub struct Settlement {
    pub id: SettlementId,
    pub name: String,
    pub xy: TilePos,
    /// Stations whose catchment covers at least one of this settlement's houses.
    pub stations_near: BTreeSet<StationId>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Encode, Decode)]
pub struct ProductionSite {
    pub id: SiteId,
    /// Bounding area of the site; not every tile in it need belong to the site.
    pub location: TileArea,
    pub accepts_cargo: Vec<CargoId>,
    /// Station built into the site itself (e.g. an oil rig's own dock).
    pub neutral_station: Option<StationId>,
    /// Stations whose catchment covers at least one of this site's tiles.
    pub stations_near: BTreeSet<StationId>,
}

impl ProductionSite {
    pub fn accepts_any_cargo(&self) -> bool {
        !self.accepts_cargo.is_empty()
    }

    /// Tiles inside `location` that actually belong to this site.
    pub fn tiles<'a>(&'a self, grid: &'a TileGrid) -> impl Iterator<Item = TilePos> + 'a {
        self.location.iter().filter(move |&pos| {
            matches!(grid.facet(pos), TileFacet::Industry { site } if *site == self.id)
        })
    }
}

/// Dense id-indexed storage for settlements and production sites.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, Encode, Decode)]
pub struct SiteRegistry {
    pub settlements: Vec<Settlement>,
    pub sites: Vec<ProductionSite>,
}

impl SiteRegistry {
    pub fn add_settlement(&mut self, name: impl Into<String>, xy: TilePos) -> SettlementId {
        let id = SettlementId(self.settlements.len() as u32);
        self.settlements.push(Settlement {
            id,
            name: name.into(),
            xy,
            stations_near: BTreeSet::new(),
        });
        id
    }

    pub fn add_site(&mut self, location: TileArea, accepts_cargo: Vec<CargoId>) -> SiteId {
        let id = SiteId(self.sites.len() as u32);
        self.sites.push(ProductionSite {
            id,
            location,
            accepts_cargo,
            neutral_station: None,
            stations_near: BTreeSet::new(),
        });
        id
    }

    pub fn settlement(&self, id: SettlementId) -> Option<&Settlement> {
        self.settlements.get(id.0 as usize)
    }

    pub fn settlement_mut(&mut self, id: SettlementId) -> Option<&mut Settlement> {
        self.settlements.get_mut(id.0 as usize)
    }

    pub fn site(&self, id: SiteId) -> Option<&ProductionSite> {
        self.sites.get(id.0 as usize)
    }

    pub fn site_mut(&mut self, id: SiteId) -> Option<&mut ProductionSite> {
        self.sites.get_mut(id.0 as usize)
    }

    /// Drop every back-reference to `station`.
    pub fn forget_station(&mut self, station: StationId) {
        for settlement in &mut self.settlements {
            settlement.stations_near.remove(&station);
        }
        for site in &mut self.sites {
            site.stations_near.remove(&station);
        }
    }

    pub fn clear_nearby_lists(&mut self) {
        for settlement in &mut self.settlements {
            settlement.stations_near.clear();
        }
        for site in &mut self.sites {
            site.stations_near.clear();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ids_are_dense_indices() {
        let mut reg = SiteRegistry::default();
        let a = reg.add_settlement("Northfield", TilePos::new(1, 1));
        let b = reg.add_settlement("Southport", TilePos::new(9, 9));
        assert_eq!(a, SettlementId(0));
        assert_eq!(b, SettlementId(1));
        assert_eq!(reg.settlement(b).map(|s| s.name.as_str()), Some("Southport"));
        assert!(reg.settlement(SettlementId(2)).is_none());
    }

    #[test]
    fn test_site_tiles_filter_by_owner() {
        let mut grid = TileGrid::new(16, 16);
        let mut reg = SiteRegistry::default();
        let area = TileArea::new(TilePos::new(2, 2), 2, 2);
        let id = reg.add_site(area, vec![3]);
        grid.set_facet(TilePos::new(2, 2), TileFacet::Industry { site: id });
        grid.set_facet(TilePos::new(3, 3), TileFacet::Industry { site: id });
        grid.set_facet(
            TilePos::new(3, 2),
            TileFacet::Industry { site: SiteId(7) },
        );

        let site = reg.site(id).unwrap();
        let tiles: Vec<_> = site.tiles(&grid).collect();
        assert_eq!(tiles, vec![TilePos::new(2, 2), TilePos::new(3, 3)]);
        assert!(site.accepts_any_cargo());
    }

    #[test]
    fn test_forget_station_purges_both_kinds() {
        let mut reg = SiteRegistry::default();
        let town = reg.add_settlement("Town", TilePos::new(0, 0));
        let site = reg.add_site(TileArea::new(TilePos::new(0, 0), 1, 1), vec![]);
        reg.settlement_mut(town)
            .unwrap()
            .stations_near
            .extend([StationId(1), StationId(2)]);
        reg.site_mut(site).unwrap().stations_near.insert(StationId(1));

        reg.forget_station(StationId(1));

        assert_eq!(
            reg.settlement(town).unwrap().stations_near,
            BTreeSet::from([StationId(2)])
        );
        assert!(reg.site(site).unwrap().stations_near.is_empty());
    }
}
