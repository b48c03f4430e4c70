//! Station entities and the id-indexed registry that owns them.

use std::collections::{BTreeMap, BTreeSet};

use bitcode::{Decode, Encode};
use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::catchment::CatchmentTileSet;
use crate::config::{CA_BUS, CA_DOCK, CA_NONE, CA_TRAIN, CA_TRUCK, CA_UNMODIFIED};
use crate::footprint::FootprintRect;
use crate::grid::{TileFacet, TileGrid, TilePos};
use crate::link_graph::{LinkGraphId, NodeId};
use crate::sites::SiteId;

// =============================================================================
// Identifiers
// =============================================================================

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
pub struct StationId(pub u32);

/// Company owning a station. `OwnerId::NONE` marks neutral stations.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize, Encode, Decode,
)]
pub struct OwnerId(pub u8);

impl OwnerId {
    pub const NONE: OwnerId = OwnerId(u8::MAX);
}

pub type CargoId = u8;

// =============================================================================
// Facilities
// =============================================================================

/// Sub-facility kind of an individual station tile.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Encode, Decode)]
pub enum StationType {
    Rail,
    Airport,
    Truck,
    Bus,
    Oilrig,
    Dock,
    Buoy,
    Waypoint,
}

impl StationType {
    /// Facility bit a tile of this type grants to its station.
    pub fn facility(self) -> Facilities {
        match self {
            StationType::Rail | StationType::Waypoint => Facilities::TRAIN,
            StationType::Airport => Facilities::AIRPORT,
            StationType::Truck => Facilities::TRUCK_STOP,
            StationType::Bus => Facilities::BUS_STOP,
            StationType::Oilrig | StationType::Dock | StationType::Buoy => Facilities::DOCK,
        }
    }

    pub fn has_rail(self) -> bool {
        matches!(self, StationType::Rail | StationType::Waypoint)
    }
}

#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize, Encode, Decode,
)]
pub struct Facilities(pub u8);

impl Facilities {
    pub const NONE: Facilities = Facilities(0);
    pub const TRAIN: Facilities = Facilities(1);
    pub const TRUCK_STOP: Facilities = Facilities(1 << 1);
    pub const BUS_STOP: Facilities = Facilities(1 << 2);
    pub const AIRPORT: Facilities = Facilities(1 << 3);
    pub const DOCK: Facilities = Facilities(1 << 4);

    pub fn contains(self, other: Facilities) -> bool {
        other.0 != 0 && self.0 & other.0 == other.0
    }

    pub fn insert(&mut self, other: Facilities) {
        self.0 |= other.0;
    }

    pub fn remove(&mut self, other: Facilities) {
        self.0 &= !other.0;
    }

    pub fn is_empty(self) -> bool {
        self.0 == 0
    }
}

/// Per-airport-layout tunables.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Encode, Decode)]
pub struct AirportSpec {
    pub catchment: u32,
    /// Maintenance factor with 3 fractional bits.
    pub maintenance_cost: u32,
}

impl AirportSpec {
    pub const SMALL: AirportSpec = AirportSpec {
        catchment: 4,
        maintenance_cost: 7,
    };
    pub const CITY: AirportSpec = AirportSpec {
        catchment: 5,
        maintenance_cost: 24,
    };
    pub const HELIPORT: AirportSpec = AirportSpec {
        catchment: 4,
        maintenance_cost: 4,
    };
    pub const METROPOLITAN: AirportSpec = AirportSpec {
        catchment: 6,
        maintenance_cost: 28,
    };
    pub const INTERNATIONAL: AirportSpec = AirportSpec {
        catchment: 8,
        maintenance_cost: 42,
    };
    pub const INTERCONTINENTAL: AirportSpec = AirportSpec {
        catchment: 10,
        maintenance_cost: 72,
    };
}

/// Link-graph membership of one cargo at one station.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Encode, Decode)]
pub struct GoodsEntry {
    pub link_graph: Option<LinkGraphId>,
    pub node: NodeId,
}

// =============================================================================
// Station
// =============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Encode, Decode)]
pub struct Station {
    pub id: StationId,
    pub owner: OwnerId,
    /// Sign location, set by the first facility built.
    pub xy: TilePos,
    pub facilities: Facilities,
    pub rect: FootprintRect,
    pub catchment: CatchmentTileSet,
    /// Sites this station can deliver to (they accept at least one cargo).
    pub industries_near: BTreeSet<SiteId>,
    /// Tiles of this station inside `rect`, refreshed by catchment recomputation.
    pub station_tiles: u32,
    pub docking_tiles: Vec<TilePos>,
    pub airport: Option<AirportSpec>,
    /// Production site this station is built into, if any.
    pub industry: Option<SiteId>,
    pub goods: BTreeMap<CargoId, GoodsEntry>,
    pub random_bits: u16,
    pub build_tick: u64,
}

impl Station {
    pub fn new(id: StationId, xy: TilePos, owner: OwnerId) -> Self {
        Self {
            id,
            owner,
            xy,
            facilities: Facilities::NONE,
            rect: FootprintRect::new(),
            catchment: CatchmentTileSet::default(),
            industries_near: BTreeSet::new(),
            station_tiles: 0,
            docking_tiles: Vec::new(),
            airport: None,
            industry: None,
            goods: BTreeMap::new(),
            random_bits: 0,
            build_tick: 0,
        }
    }

    /// Register a newly built facility. The first facility also places the
    /// sign and rolls the station's random bits.
    pub fn add_facility(
        &mut self,
        facility: Facilities,
        facil_xy: TilePos,
        owner: OwnerId,
        tick: u64,
        rng: &mut impl Rng,
    ) {
        if self.facilities.is_empty() {
            self.xy = facil_xy;
            self.random_bits = rng.gen();
        }
        self.facilities.insert(facility);
        self.owner = owner;
        self.build_tick = tick;
    }

    /// Catchment radius of the station as a whole: the widest radius of its
    /// present facilities, `None` without facilities.
    pub fn catchment_radius(&self, modified_catchment: bool, increase: u32) -> Option<u32> {
        let mut ret = CA_NONE;
        if modified_catchment {
            if self.facilities.contains(Facilities::BUS_STOP) {
                ret = ret.max(CA_BUS);
            }
            if self.facilities.contains(Facilities::TRUCK_STOP) {
                ret = ret.max(CA_TRUCK);
            }
            if self.facilities.contains(Facilities::TRAIN) {
                ret = ret.max(CA_TRAIN);
            }
            if self.facilities.contains(Facilities::DOCK) {
                ret = ret.max(CA_DOCK);
            }
            if self.facilities.contains(Facilities::AIRPORT) {
                ret = ret.max(self.airport.map_or(CA_NONE, |spec| spec.catchment));
            }
        } else if !self.facilities.is_empty() {
            ret = CA_UNMODIFIED;
        }

        (ret != CA_NONE).then_some(ret + increase)
    }

    pub fn tile_belongs_to_station(&self, grid: &TileGrid, tile: TilePos) -> bool {
        matches!(grid.facet(tile), TileFacet::Station { station, .. } if *station == self.id)
    }

    pub fn tile_belongs_to_rail_station(&self, grid: &TileGrid, tile: TilePos) -> bool {
        grid.rail_platform(tile)
            .is_some_and(|(station, _)| station == self.id)
    }
}

// =============================================================================
// Registry
// =============================================================================

/// Dense arena of stations. Freed slots are reused lowest-first.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, Encode, Decode)]
pub struct StationRegistry {
    slots: Vec<Option<Station>>,
}

impl StationRegistry {
    pub fn create(&mut self, xy: TilePos, owner: OwnerId) -> StationId {
        let index = self
            .slots
            .iter()
            .position(Option::is_none)
            .unwrap_or(self.slots.len());
        let id = StationId(index as u32);
        let station = Station::new(id, xy, owner);
        if index == self.slots.len() {
            self.slots.push(Some(station));
        } else {
            self.slots[index] = Some(station);
        }
        id
    }

    pub fn get(&self, id: StationId) -> Option<&Station> {
        self.slots.get(id.0 as usize).and_then(Option::as_ref)
    }

    pub fn get_mut(&mut self, id: StationId) -> Option<&mut Station> {
        self.slots.get_mut(id.0 as usize).and_then(Option::as_mut)
    }

    pub fn contains(&self, id: StationId) -> bool {
        self.get(id).is_some()
    }

    /// Remove and return the station, freeing its slot.
    pub fn take(&mut self, id: StationId) -> Option<Station> {
        self.slots.get_mut(id.0 as usize).and_then(Option::take)
    }

    /// Live stations in id order.
    pub fn iter(&self) -> impl Iterator<Item = &Station> {
        self.slots.iter().flatten()
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut Station> {
        self.slots.iter_mut().flatten()
    }

    pub fn ids(&self) -> Vec<StationId> {
        self.iter().map(|s| s.id).collect()
    }

    pub fn len(&self) -> usize {
        self.iter().count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
