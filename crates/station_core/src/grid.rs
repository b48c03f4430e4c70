//! Tile grid the station engine reads from and writes its own tiles into.
//!
//! Each tile carries a [`TileFacet`] that exposes only the attributes relevant
//! to its kind (station, plain rail, tunnel/bridge entrance, house, industry),
//! plus a `bridge_above` flag that is independent of the facet.

use bevy::prelude::*;
use bitcode::{Decode, Encode};
use serde::{Deserialize, Serialize};

use crate::config::{MAP_HEIGHT, MAP_WIDTH};
use crate::error::StationError;
use crate::sites::{SettlementId, SiteId};
use crate::station::{StationId, StationType};

// ---------------------------------------------------------------------------
// Coordinates and directions
// ---------------------------------------------------------------------------

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
pub struct TilePos {
    pub x: u32,
    pub y: u32,
}

impl TilePos {
    pub const fn new(x: u32, y: u32) -> Self {
        Self { x, y }
    }

    /// Offset by a signed delta. `None` when the result would be negative.
    pub fn offset(self, dx: i32, dy: i32) -> Option<TilePos> {
        Some(TilePos {
            x: self.x.checked_add_signed(dx)?,
            y: self.y.checked_add_signed(dy)?,
        })
    }

    pub fn step(self, dir: DiagDirection) -> Option<TilePos> {
        let (dx, dy) = dir.offset();
        self.offset(dx, dy)
    }

    pub fn manhattan(self, other: TilePos) -> u32 {
        self.x.abs_diff(other.x) + self.y.abs_diff(other.y)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Encode, Decode)]
pub enum Axis {
    X,
    Y,
}

impl Axis {
    /// Directions along this axis, decreasing coordinate first.
    pub fn directions(self) -> [DiagDirection; 2] {
        match self {
            Axis::X => [DiagDirection::NE, DiagDirection::SW],
            Axis::Y => [DiagDirection::NW, DiagDirection::SE],
        }
    }
}

/// The four directions along the grid axes.
///
/// NE and SW run along the X axis, NW and SE along the Y axis.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Encode, Decode)]
pub enum DiagDirection {
    NE,
    SE,
    SW,
    NW,
}

impl DiagDirection {
    pub const ALL: [DiagDirection; 4] = [
        DiagDirection::NE,
        DiagDirection::SE,
        DiagDirection::SW,
        DiagDirection::NW,
    ];

    pub fn offset(self) -> (i32, i32) {
        match self {
            DiagDirection::NE => (-1, 0),
            DiagDirection::SE => (0, 1),
            DiagDirection::SW => (1, 0),
            DiagDirection::NW => (0, -1),
        }
    }

    pub fn axis(self) -> Axis {
        match self {
            DiagDirection::NE | DiagDirection::SW => Axis::X,
            DiagDirection::SE | DiagDirection::NW => Axis::Y,
        }
    }

    pub fn reverse(self) -> DiagDirection {
        match self {
            DiagDirection::NE => DiagDirection::SW,
            DiagDirection::SE => DiagDirection::NW,
            DiagDirection::SW => DiagDirection::NE,
            DiagDirection::NW => DiagDirection::SE,
        }
    }

    /// Direction pointing from `from` to `to`, if both lie on one axis line.
    pub fn between(from: TilePos, to: TilePos) -> Option<DiagDirection> {
        if from == to {
            return None;
        }
        if from.y == to.y {
            Some(if to.x > from.x {
                DiagDirection::SW
            } else {
                DiagDirection::NE
            })
        } else if from.x == to.x {
            Some(if to.y > from.y {
                DiagDirection::SE
            } else {
                DiagDirection::NW
            })
        } else {
            None
        }
    }
}

// ---------------------------------------------------------------------------
// Rail attributes
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Encode, Decode)]
pub enum RailType {
    Rail,
    Electric,
    Monorail,
    Maglev,
}

impl RailType {
    /// Rail types sharing a family can run each other's trains.
    fn family(self) -> u8 {
        match self {
            RailType::Rail | RailType::Electric => 0,
            RailType::Monorail => 1,
            RailType::Maglev => 2,
        }
    }

    pub fn is_compatible(self, other: RailType) -> bool {
        self.family() == other.family()
    }
}

/// Track pieces present on a plain rail tile.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize, Encode, Decode,
)]
pub struct TrackBits(pub u8);

impl TrackBits {
    pub const NONE: TrackBits = TrackBits(0);
    pub const X: TrackBits = TrackBits(1);
    pub const Y: TrackBits = TrackBits(1 << 1);
    pub const UPPER: TrackBits = TrackBits(1 << 2);
    pub const LOWER: TrackBits = TrackBits(1 << 3);
    pub const LEFT: TrackBits = TrackBits(1 << 4);
    pub const RIGHT: TrackBits = TrackBits(1 << 5);
    pub const CROSS: TrackBits = TrackBits(Self::X.0 | Self::Y.0);

    pub fn contains(self, other: TrackBits) -> bool {
        self.0 & other.0 == other.0
    }

    /// Whether a straight track runs parallel to `axis`.
    pub fn has_axis(self, axis: Axis) -> bool {
        match axis {
            Axis::X => self.contains(TrackBits::X),
            Axis::Y => self.contains(TrackBits::Y),
        }
    }
}

impl std::ops::BitOr for TrackBits {
    type Output = TrackBits;

    fn bitor(self, rhs: TrackBits) -> TrackBits {
        TrackBits(self.0 | rhs.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Encode, Decode)]
pub enum TransportType {
    Rail,
    Road,
    Water,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Encode, Decode)]
pub enum TunnelBridgeKind {
    Tunnel,
    Bridge,
}

/// Platform attributes of a rail station or waypoint tile.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Encode, Decode)]
pub struct RailPlatform {
    pub rail_type: RailType,
    pub axis: Axis,
    /// Blocked tiles never extend a platform.
    pub blocked: bool,
}

// ---------------------------------------------------------------------------
// Tiles
// ---------------------------------------------------------------------------

#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, Encode, Decode,
)]
pub enum TileFacet {
    #[default]
    Clear,
    Water,
    Rail {
        rail_type: RailType,
        tracks: TrackBits,
        signals: bool,
    },
    Station {
        station: StationId,
        kind: StationType,
        /// Present for rail stations and waypoints only.
        platform: Option<RailPlatform>,
    },
    TunnelBridge {
        kind: TunnelBridgeKind,
        /// Points from this entrance towards the other end.
        direction: DiagDirection,
        transport: TransportType,
        rail_type: RailType,
        /// Entrances next to a platform may carry a station association.
        station: Option<StationId>,
    },
    House {
        settlement: SettlementId,
    },
    Industry {
        site: SiteId,
    },
}

#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, Encode, Decode,
)]
pub struct Tile {
    pub facet: TileFacet,
    pub bridge_above: bool,
}

// ---------------------------------------------------------------------------
// TileArea
// ---------------------------------------------------------------------------

/// Rectangle of tiles anchored at its north corner (minimal x and y).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Encode, Decode)]
pub struct TileArea {
    pub tile: TilePos,
    pub w: u32,
    pub h: u32,
}

impl TileArea {
    pub fn new(tile: TilePos, w: u32, h: u32) -> Self {
        Self { tile, w, h }
    }

    /// Area spanned by two opposite corners, in any order.
    pub fn from_corners(a: TilePos, b: TilePos) -> Self {
        let tile = TilePos::new(a.x.min(b.x), a.y.min(b.y));
        Self {
            tile,
            w: a.x.abs_diff(b.x) + 1,
            h: a.y.abs_diff(b.y) + 1,
        }
    }

    /// The south corner (maximal x and y). Saturates instead of overflowing;
    /// meaningless for a zero-sized area.
    pub fn end(&self) -> TilePos {
        TilePos::new(
            self.tile.x.saturating_add(self.w.saturating_sub(1)),
            self.tile.y.saturating_add(self.h.saturating_sub(1)),
        )
    }

    /// The south corner, or `None` for an empty area or one whose far edge
    /// does not fit in a coordinate.
    pub fn checked_end(&self) -> Option<TilePos> {
        if self.is_empty() {
            return None;
        }
        Some(TilePos::new(
            self.tile.x.checked_add(self.w - 1)?,
            self.tile.y.checked_add(self.h - 1)?,
        ))
    }

    pub fn is_empty(&self) -> bool {
        self.w == 0 || self.h == 0
    }

    pub fn contains(&self, pos: TilePos) -> bool {
        pos.x >= self.tile.x
            && pos.y >= self.tile.y
            && pos.x - self.tile.x < self.w
            && pos.y - self.tile.y < self.h
    }

    pub fn area(&self) -> u32 {
        self.w * self.h
    }

    /// Grow by `radius` in every direction, clamped to the map.
    pub fn expand(&self, radius: u32, grid: &TileGrid) -> TileArea {
        let x0 = self.tile.x.saturating_sub(radius);
        let y0 = self.tile.y.saturating_sub(radius);
        let end = self.end();
        let x1 = end.x.saturating_add(radius).min(grid.max_x());
        let y1 = end.y.saturating_add(radius).min(grid.max_y());
        TileArea::from_corners(TilePos::new(x0, y0), TilePos::new(x1, y1))
    }

    /// Row-major iteration over every tile in the area.
    pub fn iter(&self) -> impl Iterator<Item = TilePos> {
        let TileArea { tile, w, h } = *self;
        (0..h).flat_map(move |dy| (0..w).map(move |dx| TilePos::new(tile.x + dx, tile.y + dy)))
    }
}

// ---------------------------------------------------------------------------
// TileGrid resource
// ---------------------------------------------------------------------------

#[derive(Resource, Debug, Clone, Serialize, Deserialize)]
pub struct TileGrid {
    pub tiles: Vec<Tile>,
    pub width: u32,
    pub height: u32,
}

impl Default for TileGrid {
    fn default() -> Self {
        Self::new(MAP_WIDTH, MAP_HEIGHT)
    }
}

impl TileGrid {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            tiles: vec![Tile::default(); (width * height) as usize],
            width,
            height,
        }
    }

    #[inline]
    pub fn in_bounds(&self, pos: TilePos) -> bool {
        pos.x < self.width && pos.y < self.height
    }

    #[inline]
    pub fn max_x(&self) -> u32 {
        self.width - 1
    }

    #[inline]
    pub fn max_y(&self) -> u32 {
        self.height - 1
    }

    /// Flat index of `pos`. Scanning off the map is a caller bug.
    #[inline]
    pub fn index(&self, pos: TilePos) -> usize {
        assert!(
            self.in_bounds(pos),
            "tile ({}, {}) is outside the {}x{} map",
            pos.x,
            pos.y,
            self.width,
            self.height
        );
        (pos.y * self.width + pos.x) as usize
    }

    #[inline]
    pub fn get(&self, pos: TilePos) -> &Tile {
        &self.tiles[self.index(pos)]
    }

    #[inline]
    pub fn get_mut(&mut self, pos: TilePos) -> &mut Tile {
        let idx = self.index(pos);
        &mut self.tiles[idx]
    }

    #[inline]
    pub fn facet(&self, pos: TilePos) -> &TileFacet {
        &self.get(pos).facet
    }

    pub fn set_facet(&mut self, pos: TilePos, facet: TileFacet) {
        self.get_mut(pos).facet = facet;
    }

    /// One step in `dir`, or `None` when that leaves the map.
    pub fn step(&self, pos: TilePos, dir: DiagDirection) -> Option<TilePos> {
        pos.step(dir).filter(|p| self.in_bounds(*p))
    }

    /// Station association of a station tile or tunnel/bridge entrance.
    pub fn station_index(&self, pos: TilePos) -> Option<StationId> {
        match *self.facet(pos) {
            TileFacet::Station { station, .. } => Some(station),
            TileFacet::TunnelBridge { station, .. } => station,
            _ => None,
        }
    }

    /// Owning station and platform attributes of a rail station/waypoint tile.
    pub fn rail_platform(&self, pos: TilePos) -> Option<(StationId, RailPlatform)> {
        match *self.facet(pos) {
            TileFacet::Station {
                station,
                platform: Some(platform),
                ..
            } => Some((station, platform)),
            _ => None,
        }
    }

    pub fn is_rail_station_tile(&self, pos: TilePos) -> bool {
        self.rail_platform(pos).is_some()
    }

    /// `tile` continues the platform of `origin`: same station, compatible rail,
    /// same axis and not blocked.
    pub fn is_compatible_train_station_tile(&self, tile: TilePos, origin: TilePos) -> bool {
        match (self.rail_platform(tile), self.rail_platform(origin)) {
            (Some((st, p)), Some((origin_st, origin_p))) => {
                st == origin_st
                    && p.rail_type.is_compatible(origin_p.rail_type)
                    && p.axis == origin_p.axis
                    && !p.blocked
            }
            _ => false,
        }
    }

    /// Far entrance paired with the tunnel/bridge entrance at `pos`.
    ///
    /// Panics when `pos` is not an entrance or the pair is missing, both of
    /// which mean the map is corrupt.
    pub fn other_tunnel_bridge_end(&self, pos: TilePos) -> TilePos {
        let TileFacet::TunnelBridge {
            kind, direction, ..
        } = *self.facet(pos)
        else {
            panic!("tile ({}, {}) is not a tunnel/bridge entrance", pos.x, pos.y);
        };
        let mut cur = pos;
        loop {
            let Some(next) = self.step(cur, direction) else {
                panic!(
                    "tunnel/bridge entrance at ({}, {}) has no far end",
                    pos.x, pos.y
                );
            };
            cur = next;
            if let TileFacet::TunnelBridge {
                kind: other_kind,
                direction: other_dir,
                ..
            } = *self.facet(cur)
            {
                if other_kind == kind && other_dir == direction.reverse() {
                    return cur;
                }
            }
        }
    }

    /// Number of tiles strictly between two paired entrances.
    pub fn tunnel_bridge_length(begin: TilePos, end: TilePos) -> u32 {
        begin.manhattan(end).saturating_sub(1)
    }

    /// Lay a bridge between `a` and `b` and flag the tiles it spans.
    pub fn build_bridge(
        &mut self,
        a: TilePos,
        b: TilePos,
        transport: TransportType,
        rail_type: RailType,
    ) -> Result<(), StationError> {
        self.build_tunnel_bridge(TunnelBridgeKind::Bridge, a, b, transport, rail_type)
    }

    pub fn build_tunnel(
        &mut self,
        a: TilePos,
        b: TilePos,
        transport: TransportType,
        rail_type: RailType,
    ) -> Result<(), StationError> {
        self.build_tunnel_bridge(TunnelBridgeKind::Tunnel, a, b, transport, rail_type)
    }

    fn build_tunnel_bridge(
        &mut self,
        kind: TunnelBridgeKind,
        a: TilePos,
        b: TilePos,
        transport: TransportType,
        rail_type: RailType,
    ) -> Result<(), StationError> {
        for pos in [a, b] {
            if !self.in_bounds(pos) {
                return Err(StationError::out_of_bounds(pos));
            }
        }
        let Some(dir) = DiagDirection::between(a, b) else {
            return Err(StationError::occupied(b));
        };
        for (pos, direction) in [(a, dir), (b, dir.reverse())] {
            self.set_facet(
                pos,
                TileFacet::TunnelBridge {
                    kind,
                    direction,
                    transport,
                    rail_type,
                    station: None,
                },
            );
        }
        if kind == TunnelBridgeKind::Bridge {
            for pos in TileArea::from_corners(a, b).iter() {
                if pos != a && pos != b {
                    self.get_mut(pos).bridge_above = true;
                }
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_direction_offsets_and_axes() {
        assert_eq!(DiagDirection::NE.offset(), (-1, 0));
        assert_eq!(DiagDirection::SW.offset(), (1, 0));
        assert_eq!(DiagDirection::SE.axis(), Axis::Y);
        for dir in DiagDirection::ALL {
            assert_eq!(dir.reverse().reverse(), dir);
            assert_eq!(dir.reverse().axis(), dir.axis());
        }
    }

    #[test]
    fn test_direction_between() {
        let a = TilePos::new(5, 5);
        assert_eq!(
            DiagDirection::between(a, TilePos::new(9, 5)),
            Some(DiagDirection::SW)
        );
        assert_eq!(
            DiagDirection::between(a, TilePos::new(5, 1)),
            Some(DiagDirection::NW)
        );
        assert_eq!(DiagDirection::between(a, TilePos::new(6, 6)), None);
        assert_eq!(DiagDirection::between(a, a), None);
    }

    #[test]
    fn test_step_stops_at_map_edge() {
        let grid = TileGrid::new(8, 8);
        assert_eq!(grid.step(TilePos::new(0, 3), DiagDirection::NE), None);
        assert_eq!(grid.step(TilePos::new(7, 3), DiagDirection::SW), None);
        assert_eq!(
            grid.step(TilePos::new(3, 3), DiagDirection::SE),
            Some(TilePos::new(3, 4))
        );
    }

    #[test]
    fn test_rail_type_families() {
        assert!(RailType::Rail.is_compatible(RailType::Electric));
        assert!(RailType::Monorail.is_compatible(RailType::Monorail));
        assert!(!RailType::Rail.is_compatible(RailType::Maglev));
    }

    #[test]
    fn test_track_bits_axis() {
        assert!(TrackBits::X.has_axis(Axis::X));
        assert!(!TrackBits::X.has_axis(Axis::Y));
        assert!(TrackBits::CROSS.has_axis(Axis::Y));
        assert!(!(TrackBits::UPPER | TrackBits::LOWER).has_axis(Axis::X));
    }

    #[test]
    fn test_tile_area_iteration_is_row_major() {
        let area = TileArea::new(TilePos::new(2, 3), 2, 2);
        let tiles: Vec<_> = area.iter().collect();
        assert_eq!(
            tiles,
            vec![
                TilePos::new(2, 3),
                TilePos::new(3, 3),
                TilePos::new(2, 4),
                TilePos::new(3, 4)
            ]
        );
        assert_eq!(area.end(), TilePos::new(3, 4));
    }

    #[test]
    fn test_tile_area_checked_end_rejects_degenerate_areas() {
        assert_eq!(
            TileArea::new(TilePos::new(2, 3), 4, 1).checked_end(),
            Some(TilePos::new(5, 3))
        );
        assert_eq!(TileArea::new(TilePos::new(0, 0), 0, 1).checked_end(), None);
        assert_eq!(TileArea::new(TilePos::new(5, 5), 3, 0).checked_end(), None);
        let huge = TileArea::new(TilePos::new(10, 0), u32::MAX, 1);
        assert_eq!(huge.checked_end(), None);
        assert_eq!(huge.end(), TilePos::new(u32::MAX, 0));
        assert!(huge.contains(TilePos::new(u32::MAX, 0)));
        // w == 0 at the origin no longer underflows
        assert_eq!(TileArea::new(TilePos::new(0, 0), 0, 1).end(), TilePos::new(0, 0));
    }

    #[test]
    fn test_tile_area_expand_clamps_to_map() {
        let grid = TileGrid::new(16, 16);
        let area = TileArea::new(TilePos::new(1, 14), 1, 1).expand(3, &grid);
        assert_eq!(area.tile, TilePos::new(0, 11));
        assert_eq!(area.end(), TilePos::new(4, 15));
    }

    #[test]
    fn test_bridge_pairing_and_length() {
        let mut grid = TileGrid::new(32, 32);
        let a = TilePos::new(4, 10);
        let b = TilePos::new(9, 10);
        grid.build_bridge(a, b, TransportType::Rail, RailType::Rail)
            .unwrap();
        assert_eq!(grid.other_tunnel_bridge_end(a), b);
        assert_eq!(grid.other_tunnel_bridge_end(b), a);
        assert_eq!(TileGrid::tunnel_bridge_length(a, b), 4);
        assert!(grid.get(TilePos::new(6, 10)).bridge_above);
        assert!(!grid.get(a).bridge_above);
    }

    #[test]
    fn test_tunnel_skips_unrelated_entrances() {
        let mut grid = TileGrid::new(32, 32);
        grid.build_tunnel(
            TilePos::new(2, 2),
            TilePos::new(2, 12),
            TransportType::Rail,
            RailType::Rail,
        )
        .unwrap();
        // A bridge ramp facing back along the tunnel line is not its far end.
        grid.set_facet(
            TilePos::new(2, 6),
            TileFacet::TunnelBridge {
                kind: TunnelBridgeKind::Bridge,
                direction: DiagDirection::NW,
                transport: TransportType::Rail,
                rail_type: RailType::Rail,
                station: None,
            },
        );
        assert_eq!(
            grid.other_tunnel_bridge_end(TilePos::new(2, 2)),
            TilePos::new(2, 12)
        );
    }

    #[test]
    #[should_panic(expected = "outside")]
    fn test_out_of_bounds_access_panics() {
        let grid = TileGrid::new(8, 8);
        let _ = grid.get(TilePos::new(8, 0));
    }
}
