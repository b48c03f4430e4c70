//! Catchment engine.
//!
//! A station's catchment is the set of tiles it serves. It is derived from the
//! station's footprint and the radius of each of its tiles, and it is the only
//! writer of the `stations_near` back-references kept by settlements and
//! production sites.

mod tile_set;


use bevy::prelude::*;

pub use tile_set::CatchmentTileSet;

use crate::config::{CA_BUS, CA_DOCK, CA_NONE, CA_TRAIN, CA_TRUCK, CA_UNMODIFIED};
use crate::footprint::{Bounds, FootprintRect};
use crate::grid::{TileArea, TileFacet, TileGrid, TilePos};
use crate::settings::StationSettings;
use crate::sites::{ProductionSite, SettlementId, SiteId};
use crate::station::{AirportSpec, Station, StationId, StationType};
use crate::world::StationWorld;

// =============================================================================
// Radii
// =============================================================================

/// Catchment radius contributed by one station tile of type `kind`.
///
/// Buoys and waypoints serve nothing, regardless of policy.
pub fn tile_catchment_radius(
    kind: StationType,
    airport: Option<AirportSpec>,
    settings: &StationSettings,
) -> u32 {
    let inc = settings.catchment_increase;
    if settings.modified_catchment {
        match kind {
            StationType::Rail => CA_TRAIN + inc,
            StationType::Oilrig => CA_UNMODIFIED + inc,
            StationType::Airport => airport.map_or(CA_NONE, |spec| spec.catchment) + inc,
            StationType::Truck => CA_TRUCK + inc,
            StationType::Bus => CA_BUS + inc,
            StationType::Dock => CA_DOCK + inc,
            StationType::Buoy | StationType::Waypoint => CA_NONE,
        }
    } else {
        match kind {
            StationType::Buoy | StationType::Waypoint => CA_NONE,
            _ => CA_UNMODIFIED + inc,
        }
    }
}

/// Footprint grown by `radius` on every side, clamped to the map.
/// `None` for an empty footprint.
pub fn catchment_rect_using_radius(
    rect: &FootprintRect,
    radius: u32,
    grid: &TileGrid,
) -> Option<TileArea> {
    rect.to_area().map(|area| area.expand(radius, grid))
}

// =============================================================================
// Station-level queries
// =============================================================================

impl Station {
    pub fn catchment_rect(&self, settings: &StationSettings, grid: &TileGrid) -> Option<TileArea> {
        let radius = self
            .catchment_radius(settings.modified_catchment, settings.catchment_increase)
            .unwrap_or(CA_NONE);
        catchment_rect_using_radius(&self.rect, radius, grid)
    }

    /// Whether any house of `settlement` lies in this station's catchment.
    pub fn catchment_covers_town(&self, grid: &TileGrid, settlement: SettlementId) -> bool {
        self.catchment.iter().any(|tile| {
            matches!(grid.facet(tile), TileFacet::House { settlement: s } if *s == settlement)
        })
    }

    /// Record `site` as deliverable if it accepts at least one cargo.
    pub fn add_industry_to_deliver(&mut self, site: &ProductionSite) {
        if self.industries_near.contains(&site.id) || !site.accepts_any_cargo() {
            return;
        }
        self.industries_near.insert(site.id);
    }

    /// Whether a docking tile of this station lies within `max_distance` of
    /// `tile`. Tiles further than `spread + max_distance` from the sign are
    /// rejected without looking at docking tiles.
    pub fn is_within_range_of_docking_tile(
        &self,
        tile: TilePos,
        max_distance: u32,
        spread: u32,
    ) -> bool {
        if self.xy.manhattan(tile) > spread + max_distance {
            return false;
        }
        self.docking_tiles
            .iter()
            .any(|dock| dock.manhattan(tile) <= max_distance)
    }
}

fn count_station_tiles(grid: &TileGrid, station: StationId, bounds: Bounds) -> u32 {
    bounds
        .to_area()
        .iter()
        .filter(|&tile| {
            matches!(grid.facet(tile), TileFacet::Station { station: s, .. } if *s == station)
        })
        .count() as u32
}

// =============================================================================
// Recomputation
// =============================================================================

/// Remove `station` from every settlement's and site's nearby set.
pub fn remove_from_all_nearby_lists(world: &mut StationWorld, station: StationId) {
    world.sites.forget_station(station);
}

/// Rebuild one station's catchment and the back-references it implies.
///
/// With `no_clear_nearby_lists` the station's old back-references are left in
/// place; callers use it only right after clearing every list themselves.
pub fn recompute_catchment(
    world: &mut StationWorld,
    grid: &TileGrid,
    settings: &StationSettings,
    id: StationId,
    no_clear_nearby_lists: bool,
) {
    let StationWorld {
        stations, sites, ..
    } = world;
    let Some(station) = stations.get_mut(id) else {
        return;
    };

    station.industries_near.clear();
    if !no_clear_nearby_lists {
        sites.forget_station(id);
    }

    let Some(bounds) = station.rect.bounds() else {
        station.catchment.reset();
        return;
    };

    // Dedicated station of a site nobody else may serve: exactly the site's tiles.
    if !settings.serve_neutral_industries {
        if let Some(site) = station.industry.and_then(|site_id| sites.site_mut(site_id)) {
            station.catchment.initialize(site.location);
            let tiles: Vec<TilePos> = site.tiles(grid).collect();
            for tile in tiles {
                station.catchment.set_tile(tile);
            }
            let previous = std::mem::take(&mut site.stations_near);
            site.stations_near.insert(id);
            let site_id = site.id;

            station.industries_near.insert(site_id);
            station.station_tiles = count_station_tiles(grid, id, bounds);
            debug!(
                "Station #{}: catchment bound to site #{} ({} tiles)",
                id.0,
                site_id.0,
                station.catchment.len()
            );

            for other in previous.into_iter().filter(|&s| s != id) {
                if let Some(st) = stations.get_mut(other) {
                    st.industries_near.remove(&site_id);
                }
            }
            return;
        }
    }

    let mut station_tiles = 0;
    let mut serving = Vec::new();
    for tile in bounds.to_area().iter() {
        let TileFacet::Station { station: owner, kind, .. } = *grid.facet(tile) else {
            continue;
        };
        if owner != id {
            continue;
        }
        station_tiles += 1;

        let r = tile_catchment_radius(kind, station.airport, settings);
        if r != CA_NONE {
            serving.push((tile, r));
        }
    }
    station.station_tiles = station_tiles;

    let widest = serving.iter().map(|&(_, r)| r).max().unwrap_or(CA_NONE);
    let radius = station
        .catchment_radius(settings.modified_catchment, settings.catchment_increase)
        .unwrap_or(CA_NONE)
        .max(widest);
    station
        .catchment
        .initialize(bounds.to_area().expand(radius, grid));
    for (tile, r) in serving {
        for covered in TileArea::new(tile, 1, 1).expand(r, grid).iter() {
            station.catchment.set_tile(covered);
        }
    }

    let mut deliverable: Vec<SiteId> = Vec::new();
    for tile in station.catchment.iter() {
        match *grid.facet(tile) {
            TileFacet::House { settlement } => {
                if let Some(town) = sites.settlement_mut(settlement) {
                    town.stations_near.insert(id);
                }
            }
            TileFacet::Industry { site } => {
                let Some(site) = sites.site_mut(site) else {
                    continue;
                };
                if !settings.serve_neutral_industries && site.neutral_station.is_some() {
                    continue;
                }
                site.stations_near.insert(id);
                deliverable.push(site.id);
            }
            _ => {}
        }
    }
    for site_id in deliverable {
        if let Some(site) = sites.site(site_id) {
            station.add_industry_to_deliver(site);
        }
    }

    debug!(
        "Station #{}: catchment recomputed, {} tiles, {} deliverable sites",
        id.0,
        station.catchment.len(),
        station.industries_near.len()
    );
}

/// Clear the house at `pos`, then drop every station that no longer covers
/// any house of that settlement from its nearby set.
pub fn remove_house_tile(
    world: &mut StationWorld,
    grid: &mut TileGrid,
    pos: TilePos,
) -> Option<SettlementId> {
    let TileFacet::House { settlement } = *grid.facet(pos) else {
        return None;
    };
    grid.set_facet(pos, TileFacet::Clear);

    let StationWorld {
        stations, sites, ..
    } = world;
    let town = sites.settlement_mut(settlement)?;
    town.stations_near.retain(|&id| {
        stations
            .get(id)
            .is_some_and(|st| st.catchment_covers_town(grid, settlement))
    });
    Some(settlement)
}

/// Clear every back-reference list, then rebuild every station's catchment.
pub fn recompute_catchment_for_all(
    world: &mut StationWorld,
    grid: &TileGrid,
    settings: &StationSettings,
) {
    world.sites.clear_nearby_lists();
    let ids = world.stations.ids();
    for &id in &ids {
        recompute_catchment(world, grid, settings, id, true);
    }
    info!("Recomputed catchment for {} stations", ids.len());
}
