//! The station world: every station, settlement, production site and link
//! graph, plus the derived spatial index.
//!
//! Building and removing station tiles goes through here so that the
//! footprint, catchment, spatial index and grid stay in step.

use bevy::prelude::*;
use bitcode::{Decode, Encode};
use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::catchment::{recompute_catchment, remove_from_all_nearby_lists};
use crate::config::AIRPORT_INFRASTRUCTURE_PRICE;
use crate::error::StationError;
use crate::footprint::{AddMode, Bounds};
use crate::grid::{
    Axis, RailPlatform, RailType, TileArea, TileFacet, TileGrid, TilePos, TransportType,
};
use crate::link_graph::{LinkGraphId, LinkGraphRegistry};
use crate::settings::StationSettings;
use crate::sites::{SiteId, SiteRegistry};
use crate::spatial_index::StationSpatialIndex;
use crate::station::{
    AirportSpec, CargoId, Facilities, GoodsEntry, OwnerId, StationId, StationRegistry,
    StationType,
};

// =============================================================================
// Tile specification
// =============================================================================

/// What to build on a station tile.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Encode, Decode)]
pub struct TileSpec {
    pub kind: StationType,
    /// Rail stations and waypoints only; defaults to an X-axis rail platform.
    pub platform: Option<RailPlatform>,
    /// Airports only; defaults to [`AirportSpec::SMALL`].
    pub airport: Option<AirportSpec>,
    /// Binds the station to a production site as its neutral station.
    pub industry: Option<SiteId>,
}

impl TileSpec {
    pub fn of(kind: StationType) -> Self {
        Self {
            kind,
            platform: None,
            airport: None,
            industry: None,
        }
    }

    pub fn rail(rail_type: RailType, axis: Axis) -> Self {
        Self {
            platform: Some(RailPlatform {
                rail_type,
                axis,
                blocked: false,
            }),
            ..Self::of(StationType::Rail)
        }
    }

    pub fn airport(spec: AirportSpec) -> Self {
        Self {
            airport: Some(spec),
            ..Self::of(StationType::Airport)
        }
    }

    fn facet(&self, station: StationId) -> TileFacet {
        let platform = self.kind.has_rail().then(|| {
            self.platform.unwrap_or(RailPlatform {
                rail_type: RailType::Rail,
                axis: Axis::X,
                blocked: false,
            })
        });
        TileFacet::Station {
            station,
            kind: self.kind,
            platform,
        }
    }

    fn builds_on_water(&self) -> bool {
        matches!(
            self.kind,
            StationType::Dock | StationType::Buoy | StationType::Oilrig
        )
    }
}

// =============================================================================
// StationWorld resource
// =============================================================================

#[derive(Resource, Debug, Clone, Default)]
pub struct StationWorld {
    pub stations: StationRegistry,
    pub sites: SiteRegistry,
    pub link_graphs: LinkGraphRegistry,
    /// Derived from `stations`; rebuilt on load.
    pub spatial: StationSpatialIndex,
    /// Simulation tick, stamped onto stations as their build date.
    pub tick: u64,
}

impl StationWorld {
    // -------------------------------------------------------------------------
    // Validation
    // -------------------------------------------------------------------------

    fn check_free_tile(grid: &TileGrid, pos: TilePos, spec: &TileSpec) -> Result<(), StationError> {
        if !grid.in_bounds(pos) {
            return Err(StationError::out_of_bounds(pos));
        }
        match grid.facet(pos) {
            TileFacet::Clear => Ok(()),
            TileFacet::Water if spec.builds_on_water() => Ok(()),
            _ => Err(StationError::occupied(pos)),
        }
    }

    /// Reject empty areas and areas reaching past the map edge.
    fn check_area(grid: &TileGrid, area: TileArea) -> Result<(), StationError> {
        if area.is_empty() {
            return Err(StationError::empty_area(area.tile));
        }
        let end = area
            .checked_end()
            .ok_or_else(|| StationError::out_of_bounds(area.end()))?;
        for pos in [area.tile, end] {
            if !grid.in_bounds(pos) {
                return Err(StationError::out_of_bounds(pos));
            }
        }
        Ok(())
    }

    fn check_refs(&self, station: Option<StationId>, spec: &TileSpec) -> Result<(), StationError> {
        if let Some(id) = station {
            if !self.stations.contains(id) {
                return Err(StationError::StationNotFound(id));
            }
        }
        if let Some(site) = spec.industry {
            if self.sites.site(site).is_none() {
                return Err(StationError::SiteNotFound(site));
            }
        }
        Ok(())
    }

    /// Validate building `area` into `station` (a new station when `None`)
    /// without changing anything.
    pub fn check_build_rect(
        &self,
        grid: &TileGrid,
        settings: &StationSettings,
        station: Option<StationId>,
        area: TileArea,
        spec: &TileSpec,
        mode: AddMode,
    ) -> Result<(), StationError> {
        self.check_refs(station, spec)?;
        Self::check_area(grid, area)?;
        for pos in area.iter() {
            Self::check_free_tile(grid, pos, spec)?;
        }
        let mut rect = station
            .and_then(|id| self.stations.get(id))
            .map(|st| st.rect)
            .unwrap_or_default();
        let check_mode = if mode == AddMode::Force {
            AddMode::Force
        } else {
            AddMode::Test
        };
        rect.before_add_rect(area, check_mode, settings.station_spread)
    }

    // -------------------------------------------------------------------------
    // Building
    // -------------------------------------------------------------------------

    /// Build one station tile. See [`Self::build_rect`].
    #[allow(clippy::too_many_arguments)]
    pub fn build_tile(
        &mut self,
        grid: &mut TileGrid,
        settings: &StationSettings,
        rng: &mut impl Rng,
        station: Option<StationId>,
        owner: OwnerId,
        pos: TilePos,
        spec: TileSpec,
        mode: AddMode,
    ) -> Result<StationId, StationError> {
        self.build_rect(
            grid,
            settings,
            rng,
            station,
            owner,
            TileArea::new(pos, 1, 1),
            spec,
            mode,
        )
    }

    /// Build `area` as station tiles of `station`, creating a new station when
    /// `None`. Everything is validated before the first change, so a failed
    /// build leaves the world untouched. [`AddMode::Test`] stops after
    /// validation.
    #[allow(clippy::too_many_arguments)]
    pub fn build_rect(
        &mut self,
        grid: &mut TileGrid,
        settings: &StationSettings,
        rng: &mut impl Rng,
        station: Option<StationId>,
        owner: OwnerId,
        area: TileArea,
        spec: TileSpec,
        mode: AddMode,
    ) -> Result<StationId, StationError> {
        self.check_build_rect(grid, settings, station, area, &spec, mode)?;
        if mode == AddMode::Test {
            return Ok(station.unwrap_or_default());
        }

        let id = match station {
            Some(id) => id,
            None => {
                let id = self.stations.create(area.tile, owner);
                info!("Station #{} created at ({}, {})", id.0, area.tile.x, area.tile.y);
                id
            }
        };
        let tick = self.tick;
        let Some(st) = self.stations.get_mut(id) else {
            return Err(StationError::StationNotFound(id));
        };
        st.rect
            .before_add_rect(area, mode, settings.station_spread)?;
        debug!("Station #{}: footprint now {:?}", id.0, st.rect.bounds());

        let facet = spec.facet(id);
        for pos in area.iter() {
            grid.set_facet(pos, facet);
            st.add_facility(spec.kind.facility(), pos, owner, tick, &mut *rng);
            if spec.kind == StationType::Dock {
                st.docking_tiles.push(pos);
            }
        }
        if spec.kind == StationType::Airport {
            st.airport = Some(spec.airport.unwrap_or(AirportSpec::SMALL));
        }
        if let Some(site_id) = spec.industry {
            st.industry = Some(site_id);
            if let Some(site) = self.sites.site_mut(site_id) {
                site.neutral_station = Some(id);
            }
        }
        let sign = st.xy;

        self.spatial.insert(id, sign);
        recompute_catchment(self, grid, settings, id, false);
        Ok(id)
    }

    /// Associate a rail tunnel/bridge entrance with `station`, making it part
    /// of the station's footprint.
    pub fn link_entrance(
        &mut self,
        grid: &mut TileGrid,
        settings: &StationSettings,
        station: StationId,
        pos: TilePos,
    ) -> Result<(), StationError> {
        if !grid.in_bounds(pos) {
            return Err(StationError::out_of_bounds(pos));
        }
        let Some(st) = self.stations.get_mut(station) else {
            return Err(StationError::StationNotFound(station));
        };
        let TileFacet::TunnelBridge {
            kind,
            direction,
            transport: TransportType::Rail,
            rail_type,
            station: linked,
        } = *grid.facet(pos)
        else {
            return Err(StationError::not_a_rail_entrance(pos));
        };
        match linked {
            Some(other) if other == station => return Ok(()),
            Some(other) => {
                return Err(StationError::ForeignStation {
                    x: pos.x,
                    y: pos.y,
                    station: other,
                })
            }
            None => {}
        }
        st.rect
            .before_add_tile(pos, AddMode::Normal, settings.station_spread)?;
        grid.set_facet(
            pos,
            TileFacet::TunnelBridge {
                kind,
                direction,
                transport: TransportType::Rail,
                rail_type,
                station: Some(station),
            },
        );
        Ok(())
    }

    // -------------------------------------------------------------------------
    // Removal
    // -------------------------------------------------------------------------

    /// Remove the station tile at `pos`. Deletes the station when this was its
    /// last facility tile, releasing any linked entrances. Returns the owning
    /// station.
    pub fn remove_tile(
        &mut self,
        grid: &mut TileGrid,
        settings: &StationSettings,
        pos: TilePos,
    ) -> Result<StationId, StationError> {
        if !grid.in_bounds(pos) {
            return Err(StationError::out_of_bounds(pos));
        }
        let TileFacet::Station { station: id, .. } = *grid.facet(pos) else {
            return Err(StationError::not_a_station_tile(pos));
        };
        self.remove_tiles(grid, settings, id, TileArea::new(pos, 1, 1))?;
        Ok(id)
    }

    /// Remove every tile of `station` inside `area`.
    pub fn remove_rect(
        &mut self,
        grid: &mut TileGrid,
        settings: &StationSettings,
        station: StationId,
        area: TileArea,
    ) -> Result<(), StationError> {
        if !self.stations.contains(station) {
            return Err(StationError::StationNotFound(station));
        }
        Self::check_area(grid, area)?;
        self.remove_tiles(grid, settings, station, area)
    }

    fn remove_tiles(
        &mut self,
        grid: &mut TileGrid,
        settings: &StationSettings,
        id: StationId,
        area: TileArea,
    ) -> Result<(), StationError> {
        let owned: Vec<TilePos> = area
            .iter()
            .filter(|&pos| {
                matches!(grid.facet(pos), TileFacet::Station { station, .. } if *station == id)
            })
            .collect();
        if owned.is_empty() {
            return Err(StationError::not_a_station_tile(area.tile));
        }
        let Some(st) = self.stations.get_mut(id) else {
            return Err(StationError::StationNotFound(id));
        };

        for &pos in &owned {
            grid.set_facet(pos, TileFacet::Clear);
        }
        st.docking_tiles.retain(|p| !owned.contains(p));

        // Shrink over the hull of what was actually removed; it lies inside the footprint.
        let hull = owned
            .iter()
            .fold(Bounds::point(owned[0]), |acc, &p| acc.including(p));
        let empty = st.rect.after_remove_rect(grid, id, hull.to_area());
        debug!(
            "Station #{}: removed {} tiles, footprint now {:?}",
            id.0,
            owned.len(),
            st.rect.bounds()
        );

        if empty {
            self.delete_station(grid, id);
            return Ok(());
        }
        self.refresh_facilities(grid, id);
        // Linked entrances alone do not keep a station alive.
        if self
            .stations
            .get(id)
            .is_some_and(|st| st.facilities.is_empty())
        {
            self.delete_station(grid, id);
            return Ok(());
        }
        recompute_catchment(self, grid, settings, id, false);
        Ok(())
    }

    /// Drop facility bits with no remaining tile of that kind.
    fn refresh_facilities(&mut self, grid: &TileGrid, id: StationId) {
        let Some(st) = self.stations.get_mut(id) else {
            return;
        };
        let Some(area) = st.rect.to_area() else {
            st.facilities = Facilities::NONE;
            return;
        };
        let mut facilities = Facilities::NONE;
        for pos in area.iter() {
            if let TileFacet::Station { station, kind, .. } = *grid.facet(pos) {
                if station == id {
                    facilities.insert(kind.facility());
                }
            }
        }
        st.facilities = facilities;
        if !facilities.contains(Facilities::AIRPORT) {
            st.airport = None;
        }
    }

    /// Delete a station and every reference to it: its remaining tiles and
    /// entrance links on the grid, nearby lists, a site's neutral-station
    /// link, link-graph nodes and the spatial index.
    pub fn delete_station(&mut self, grid: &mut TileGrid, id: StationId) -> bool {
        let Some(st) = self.stations.get(id) else {
            return false;
        };

        if let Some(area) = st.rect.to_area() {
            for pos in area.iter() {
                let tile = grid.get_mut(pos);
                match tile.facet {
                    TileFacet::Station { station, .. } if station == id => {
                        tile.facet = TileFacet::Clear;
                    }
                    TileFacet::TunnelBridge {
                        kind,
                        direction,
                        transport,
                        rail_type,
                        station: Some(station),
                    } if station == id => {
                        tile.facet = TileFacet::TunnelBridge {
                            kind,
                            direction,
                            transport,
                            rail_type,
                            station: None,
                        };
                    }
                    _ => {}
                }
            }
        }

        remove_from_all_nearby_lists(self, id);
        for site in &mut self.sites.sites {
            if site.neutral_station == Some(id) {
                site.neutral_station = None;
            }
        }

        let Some(st) = self.stations.take(id) else {
            return false;
        };
        for (&cargo, goods) in &st.goods {
            self.release_node(cargo, goods);
        }
        self.spatial.remove(id);

        info!("Station #{} deleted", id.0);
        true
    }

    // -------------------------------------------------------------------------
    // Link graphs
    // -------------------------------------------------------------------------

    /// Add `station` as a node of `graph` for `cargo`, creating a new graph
    /// when `graph` is `None`. A station is a node of at most one graph per
    /// cargo: rejoining its current graph (or passing `None` while it has
    /// one) returns that graph, and moving to another graph first drops the
    /// old node.
    pub fn join_link_graph(
        &mut self,
        station: StationId,
        cargo: CargoId,
        graph: Option<LinkGraphId>,
    ) -> Result<LinkGraphId, StationError> {
        let Some(st) = self.stations.get(station) else {
            return Err(StationError::StationNotFound(station));
        };
        let requested = graph.filter(|g| self.link_graphs.get(*g).is_some());
        if let Some(current) = st.goods.get(&cargo).copied() {
            match (current.link_graph, requested) {
                (Some(existing), None) => return Ok(existing),
                (Some(existing), Some(g)) if existing == g => return Ok(existing),
                _ => self.release_node(cargo, &current),
            }
        }
        let graph = match requested {
            Some(g) => g,
            None => self.link_graphs.create(cargo),
        };
        let node = self
            .link_graphs
            .get_mut(graph)
            .map(|lg| lg.add_node(station))
            .unwrap_or_default();
        if let Some(st) = self.stations.get_mut(station) {
            st.goods.insert(
                cargo,
                GoodsEntry {
                    link_graph: Some(graph),
                    node,
                },
            );
        }
        Ok(graph)
    }

    /// Drop a goods entry's node from its graph and repoint the station
    /// whose node moved into the freed index.
    fn release_node(&mut self, cargo: CargoId, goods: &GoodsEntry) {
        let Some(graph) = goods.link_graph else {
            return;
        };
        let Some(moved) = self.link_graphs.remove_node(graph, goods.node) else {
            return;
        };
        if let Some(entry) = self
            .stations
            .get_mut(moved)
            .and_then(|other| other.goods.get_mut(&cargo))
            .filter(|entry| entry.link_graph == Some(graph))
        {
            entry.node = goods.node;
        }
    }

    // -------------------------------------------------------------------------
    // Misc
    // -------------------------------------------------------------------------

    pub fn rebuild_spatial_index(&mut self) {
        self.spatial.rebuild(&self.stations);
    }

    /// Monthly airport maintenance for `owner`: infrastructure price times
    /// each airport's maintenance factor, dropping the 3 fractional bits.
    pub fn airport_maintenance_cost(&self, owner: OwnerId) -> i64 {
        let total: i64 = self
            .stations
            .iter()
            .filter(|st| st.owner == owner && st.facilities.contains(Facilities::AIRPORT))
            .filter_map(|st| st.airport)
            .map(|spec| AIRPORT_INFRASTRUCTURE_PRICE * spec.maintenance_cost as i64)
            .sum();
        total >> 3
    }
}

// =============================================================================
// Saveable implementation
// =============================================================================

#[derive(Encode, Decode, Default)]
struct StationWorldSave {
    stations: StationRegistry,
    sites: SiteRegistry,
    link_graphs: LinkGraphRegistry,
    tick: u64,
}

impl crate::Saveable for StationWorld {
    const SAVE_KEY: &'static str = "station_world";

    fn save_to_bytes(&self) -> Option<Vec<u8>> {
        if self.stations.is_empty()
            && self.sites.settlements.is_empty()
            && self.sites.sites.is_empty()
            && self.link_graphs.is_empty()
            && self.tick == 0
        {
            return None;
        }
        Some(bitcode::encode(&StationWorldSave {
            stations: self.stations.clone(),
            sites: self.sites.clone(),
            link_graphs: self.link_graphs.clone(),
            tick: self.tick,
        }))
    }

    fn load_from_bytes(bytes: &[u8]) -> Self {
        let save: StationWorldSave = crate::decode_or_warn(Self::SAVE_KEY, bytes);
        let mut world = StationWorld {
            stations: save.stations,
            sites: save.sites,
            link_graphs: save.link_graphs,
            spatial: StationSpatialIndex::default(),
            tick: save.tick,
        };
        world.rebuild_spatial_index();
        world
    }
}

#[cfg(test)]
mod tests {
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    use super::*;
    use crate::Saveable;

    struct Fixture {
        grid: TileGrid,
        world: StationWorld,
        settings: StationSettings,
        rng: ChaCha8Rng,
    }

    impl Fixture {
        fn new() -> Self {
            Self {
                grid: TileGrid::new(64, 64),
                world: StationWorld::default(),
                settings: StationSettings::default(),
                rng: ChaCha8Rng::seed_from_u64(1),
            }
        }

        fn build(
            &mut self,
            station: Option<StationId>,
            pos: TilePos,
            spec: TileSpec,
        ) -> Result<StationId, StationError> {
            self.world.build_tile(
                &mut self.grid,
                &self.settings,
                &mut self.rng,
                station,
                OwnerId(0),
                pos,
                spec,
                AddMode::Normal,
            )
        }
    }

    #[test]
    fn test_first_tile_creates_station_and_sign() {
        let mut f = Fixture::new();
        let id = f
            .build(None, TilePos::new(10, 10), TileSpec::of(StationType::Bus))
            .unwrap();
        let st = f.world.stations.get(id).unwrap();
        assert_eq!(st.xy, TilePos::new(10, 10));
        assert!(st.facilities.contains(Facilities::BUS_STOP));
        assert_eq!(st.station_tiles, 1);
        assert_eq!(f.world.spatial.position(id), Some(TilePos::new(10, 10)));
        assert!(!st.catchment.is_empty());
    }

    #[test]
    fn test_build_on_occupied_tile_fails() {
        let mut f = Fixture::new();
        let id = f
            .build(None, TilePos::new(10, 10), TileSpec::of(StationType::Bus))
            .unwrap();
        let err = f
            .build(Some(id), TilePos::new(10, 10), TileSpec::of(StationType::Bus))
            .unwrap_err();
        assert_eq!(err, StationError::TileOccupied { x: 10, y: 10 });
        let err = f
            .build(None, TilePos::new(64, 0), TileSpec::of(StationType::Bus))
            .unwrap_err();
        assert_eq!(err, StationError::OutOfBounds { x: 64, y: 0 });
    }

    #[test]
    fn test_spread_violation_leaves_world_untouched() {
        let mut f = Fixture::new();
        f.settings.station_spread = 4;
        let id = f
            .build(None, TilePos::new(5, 5), TileSpec::rail(RailType::Rail, Axis::Y))
            .unwrap();
        f.build(Some(id), TilePos::new(5, 8), TileSpec::rail(RailType::Rail, Axis::Y))
            .unwrap();
        let before = f.world.stations.clone();

        let err = f
            .build(Some(id), TilePos::new(5, 9), TileSpec::rail(RailType::Rail, Axis::Y))
            .unwrap_err();
        assert!(matches!(err, StationError::TooSpreadOut { height: 5, .. }));
        assert_eq!(f.world.stations, before);
        assert_eq!(*f.grid.facet(TilePos::new(5, 9)), TileFacet::Clear);
    }

    #[test]
    fn test_test_mode_validates_only() {
        let mut f = Fixture::new();
        let result = f.world.build_rect(
            &mut f.grid,
            &f.settings,
            &mut f.rng,
            None,
            OwnerId(0),
            TileArea::new(TilePos::new(3, 3), 2, 5),
            TileSpec::rail(RailType::Rail, Axis::Y),
            AddMode::Test,
        );
        assert!(result.is_ok());
        assert!(f.world.stations.is_empty());
        assert_eq!(*f.grid.facet(TilePos::new(3, 3)), TileFacet::Clear);
    }

    #[test]
    fn test_remove_last_tile_deletes_station() {
        let mut f = Fixture::new();
        let town = f.world.sites.add_settlement("Town", TilePos::new(11, 10));
        f.grid
            .set_facet(TilePos::new(11, 10), TileFacet::House { settlement: town });
        let id = f
            .build(None, TilePos::new(10, 10), TileSpec::of(StationType::Truck))
            .unwrap();
        assert!(f.world.sites.settlement(town).unwrap().stations_near.contains(&id));

        let removed = f
            .world
            .remove_tile(&mut f.grid, &f.settings, TilePos::new(10, 10))
            .unwrap();
        assert_eq!(removed, id);
        assert!(!f.world.stations.contains(id));
        assert!(f.world.spatial.is_empty());
        assert!(f.world.sites.settlement(town).unwrap().stations_near.is_empty());
    }

    #[test]
    fn test_remove_non_station_tile_fails() {
        let mut f = Fixture::new();
        let err = f
            .world
            .remove_tile(&mut f.grid, &f.settings, TilePos::new(1, 1))
            .unwrap_err();
        assert_eq!(err, StationError::NotAStationTile { x: 1, y: 1 });
    }

    #[test]
    fn test_remove_tile_shrinks_and_refreshes_facilities() {
        let mut f = Fixture::new();
        let id = f
            .build(None, TilePos::new(10, 10), TileSpec::of(StationType::Bus))
            .unwrap();
        f.build(Some(id), TilePos::new(12, 10), TileSpec::of(StationType::Dock))
            .unwrap();
        assert_eq!(f.world.stations.get(id).unwrap().docking_tiles.len(), 1);

        f.world
            .remove_tile(&mut f.grid, &f.settings, TilePos::new(12, 10))
            .unwrap();
        let st = f.world.stations.get(id).unwrap();
        assert_eq!(st.rect.to_area(), Some(TileArea::new(TilePos::new(10, 10), 1, 1)));
        assert!(!st.facilities.contains(Facilities::DOCK));
        assert!(st.docking_tiles.is_empty());
    }

    #[test]
    fn test_remove_rect_of_platform() {
        let mut f = Fixture::new();
        let id = f
            .world
            .build_rect(
                &mut f.grid,
                &f.settings,
                &mut f.rng,
                None,
                OwnerId(0),
                TileArea::new(TilePos::new(20, 20), 1, 6),
                TileSpec::rail(RailType::Rail, Axis::Y),
                AddMode::Normal,
            )
            .unwrap();
        f.world
            .remove_rect(
                &mut f.grid,
                &f.settings,
                id,
                TileArea::new(TilePos::new(18, 22), 5, 10),
            )
            .unwrap();
        let st = f.world.stations.get(id).unwrap();
        assert_eq!(st.rect.to_area(), Some(TileArea::new(TilePos::new(20, 20), 1, 2)));
        assert_eq!(st.station_tiles, 2);
    }

    #[test]
    fn test_neutral_station_link_cleared_on_delete() {
        let mut f = Fixture::new();
        let site = f
            .world
            .sites
            .add_site(TileArea::new(TilePos::new(30, 30), 2, 2), vec![1]);
        let spec = TileSpec {
            industry: Some(site),
            ..TileSpec::of(StationType::Oilrig)
        };
        let id = f.build(None, TilePos::new(32, 30), spec).unwrap();
        assert_eq!(f.world.sites.site(site).unwrap().neutral_station, Some(id));

        f.world.delete_station(&mut f.grid, id);
        assert_eq!(f.world.sites.site(site).unwrap().neutral_station, None);
        assert_eq!(*f.grid.facet(TilePos::new(32, 30)), TileFacet::Clear);
    }

    #[test]
    fn test_missing_site_rejected() {
        let mut f = Fixture::new();
        let spec = TileSpec {
            industry: Some(SiteId(4)),
            ..TileSpec::of(StationType::Oilrig)
        };
        let err = f.build(None, TilePos::new(1, 1), spec).unwrap_err();
        assert_eq!(err, StationError::SiteNotFound(SiteId(4)));
    }

    #[test]
    fn test_delete_repoints_moved_link_graph_node() {
        let mut f = Fixture::new();
        let a = f
            .build(None, TilePos::new(5, 5), TileSpec::of(StationType::Bus))
            .unwrap();
        let b = f
            .build(None, TilePos::new(40, 40), TileSpec::of(StationType::Bus))
            .unwrap();
        let graph = f.world.join_link_graph(a, 0, None).unwrap();
        assert_eq!(f.world.join_link_graph(b, 0, Some(graph)).unwrap(), graph);
        assert_eq!(f.world.stations.get(b).unwrap().goods[&0].node, 1);

        f.world.delete_station(&mut f.grid, a);
        assert_eq!(f.world.stations.get(b).unwrap().goods[&0].node, 0);
        assert_eq!(f.world.link_graphs.get(graph).unwrap().nodes, vec![b]);

        f.world.delete_station(&mut f.grid, b);
        assert!(f.world.link_graphs.is_empty());
    }

    #[test]
    fn test_link_entrance_joins_footprint() {
        let mut f = Fixture::new();
        let id = f
            .build(None, TilePos::new(10, 5), TileSpec::rail(RailType::Rail, Axis::X))
            .unwrap();
        f.grid
            .build_tunnel(
                TilePos::new(11, 5),
                TilePos::new(15, 5),
                TransportType::Rail,
                RailType::Rail,
            )
            .unwrap();
        f.world
            .link_entrance(&mut f.grid, &f.settings, id, TilePos::new(11, 5))
            .unwrap();
        assert_eq!(f.grid.station_index(TilePos::new(11, 5)), Some(id));
        assert_eq!(
            f.world.stations.get(id).unwrap().rect.to_area(),
            Some(TileArea::new(TilePos::new(10, 5), 2, 1))
        );

        // Removing the only platform deletes the station and frees the entrance.
        f.world
            .remove_tile(&mut f.grid, &f.settings, TilePos::new(10, 5))
            .unwrap();
        assert!(!f.world.stations.contains(id));
        assert!(f.world.spatial.is_empty());
        assert_eq!(f.grid.station_index(TilePos::new(11, 5)), None);
    }

    #[test]
    fn test_link_entrance_rejects_road_and_plain_tiles() {
        let mut f = Fixture::new();
        let id = f
            .build(None, TilePos::new(10, 5), TileSpec::rail(RailType::Rail, Axis::X))
            .unwrap();
        f.grid
            .build_tunnel(
                TilePos::new(11, 5),
                TilePos::new(15, 5),
                TransportType::Road,
                RailType::Rail,
            )
            .unwrap();
        let err = f
            .world
            .link_entrance(&mut f.grid, &f.settings, id, TilePos::new(11, 5))
            .unwrap_err();
        assert_eq!(err, StationError::NotARailEntrance { x: 11, y: 5 });
        assert_eq!(f.grid.station_index(TilePos::new(11, 5)), None);

        let err = f
            .world
            .link_entrance(&mut f.grid, &f.settings, id, TilePos::new(10, 6))
            .unwrap_err();
        assert_eq!(err, StationError::NotARailEntrance { x: 10, y: 6 });
        assert_eq!(
            f.world.stations.get(id).unwrap().rect.to_area(),
            Some(TileArea::new(TilePos::new(10, 5), 1, 1))
        );
    }

    #[test]
    fn test_empty_area_is_rejected_before_any_change() {
        let mut f = Fixture::new();
        for area in [
            TileArea::new(TilePos::new(5, 5), 0, 3),
            TileArea::new(TilePos::new(5, 5), 3, 0),
        ] {
            let err = f
                .world
                .build_rect(
                    &mut f.grid,
                    &f.settings,
                    &mut f.rng,
                    None,
                    OwnerId(0),
                    area,
                    TileSpec::of(StationType::Bus),
                    AddMode::Normal,
                )
                .unwrap_err();
            assert_eq!(err, StationError::EmptyArea { x: 5, y: 5 });
        }
        assert!(f.world.stations.is_empty());
        assert!(f.world.spatial.is_empty());
    }

    #[test]
    fn test_remove_rect_rejects_degenerate_areas() {
        let mut f = Fixture::new();
        let id = f
            .build(None, TilePos::new(0, 0), TileSpec::of(StationType::Bus))
            .unwrap();
        let err = f
            .world
            .remove_rect(&mut f.grid, &f.settings, id, TileArea::new(TilePos::new(0, 0), 0, 1))
            .unwrap_err();
        assert_eq!(err, StationError::EmptyArea { x: 0, y: 0 });

        let err = f
            .world
            .remove_rect(
                &mut f.grid,
                &f.settings,
                id,
                TileArea::new(TilePos::new(0, 0), u32::MAX, 1),
            )
            .unwrap_err();
        assert_eq!(err, StationError::OutOfBounds { x: u32::MAX - 1, y: 0 });
        assert!(f.world.stations.contains(id));
    }

    #[test]
    fn test_rejoining_a_link_graph_keeps_one_node() {
        let mut f = Fixture::new();
        let a = f
            .build(None, TilePos::new(5, 5), TileSpec::of(StationType::Bus))
            .unwrap();
        let b = f
            .build(None, TilePos::new(40, 40), TileSpec::of(StationType::Bus))
            .unwrap();
        let graph = f.world.join_link_graph(a, 0, None).unwrap();
        f.world.join_link_graph(b, 0, Some(graph)).unwrap();
        assert_eq!(f.world.join_link_graph(a, 0, Some(graph)).unwrap(), graph);
        assert_eq!(f.world.join_link_graph(a, 0, None).unwrap(), graph);
        assert_eq!(f.world.link_graphs.get(graph).unwrap().nodes, vec![a, b]);

        f.world.delete_station(&mut f.grid, a);
        assert_eq!(f.world.link_graphs.get(graph).unwrap().nodes, vec![b]);
        assert_eq!(f.world.stations.get(b).unwrap().goods[&0].node, 0);
    }

    #[test]
    fn test_moving_to_another_link_graph_drops_old_node() {
        let mut f = Fixture::new();
        let a = f
            .build(None, TilePos::new(5, 5), TileSpec::of(StationType::Bus))
            .unwrap();
        let b = f
            .build(None, TilePos::new(20, 20), TileSpec::of(StationType::Bus))
            .unwrap();
        let c = f
            .build(None, TilePos::new(40, 40), TileSpec::of(StationType::Bus))
            .unwrap();
        let first = f.world.join_link_graph(a, 0, None).unwrap();
        f.world.join_link_graph(b, 0, Some(first)).unwrap();
        let second = f.world.join_link_graph(c, 0, None).unwrap();

        assert_eq!(f.world.join_link_graph(a, 0, Some(second)).unwrap(), second);
        assert_eq!(f.world.link_graphs.get(first).unwrap().nodes, vec![b]);
        assert_eq!(f.world.stations.get(b).unwrap().goods[&0].node, 0);
        assert_eq!(f.world.link_graphs.get(second).unwrap().nodes, vec![c, a]);
        assert_eq!(f.world.stations.get(a).unwrap().goods[&0].node, 1);

        f.world.delete_station(&mut f.grid, a);
        assert_eq!(f.world.link_graphs.get(second).unwrap().nodes, vec![c]);
        assert_eq!(f.world.link_graphs.get(first).unwrap().nodes, vec![b]);
    }

    #[test]
    fn test_airport_maintenance_cost() {
        let mut f = Fixture::new();
        f.build(
            None,
            TilePos::new(5, 5),
            TileSpec::airport(AirportSpec::SMALL),
        )
        .unwrap();
        f.build(
            None,
            TilePos::new(30, 30),
            TileSpec::airport(AirportSpec::CITY),
        )
        .unwrap();
        let expected = (AIRPORT_INFRASTRUCTURE_PRICE * (7 + 24)) >> 3;
        assert_eq!(f.world.airport_maintenance_cost(OwnerId(0)), expected);
        assert_eq!(f.world.airport_maintenance_cost(OwnerId(3)), 0);
    }

    #[test]
    fn test_saveable_roundtrip_rebuilds_spatial_index() {
        let mut f = Fixture::new();
        let id = f
            .build(None, TilePos::new(7, 9), TileSpec::of(StationType::Truck))
            .unwrap();
        f.world.tick = 99;

        let bytes = f.world.save_to_bytes().expect("should produce bytes");
        let restored = StationWorld::load_from_bytes(&bytes);
        assert_eq!(restored.stations, f.world.stations);
        assert_eq!(restored.tick, 99);
        assert_eq!(restored.spatial.position(id), Some(TilePos::new(7, 9)));
    }

    #[test]
    fn test_empty_world_skips_save() {
        assert!(StationWorld::default().save_to_bytes().is_none());
    }
}
