//! Platform length queries.
//!
//! A platform is a straight run of rail station tiles. It may be extended by
//! compatible tiles of a neighbouring station, by plain rail running under a
//! bridge, and by whole tunnel/bridge spans whose entrance faces along the run.

use crate::grid::{Axis, DiagDirection, RailType, TileFacet, TileGrid, TilePos, TransportType};
use crate::station::{Station, StationId};

/// What a walk compares candidate tiles against.
#[derive(Debug, Clone, Copy)]
struct Origin {
    station: StationId,
    rail_type: RailType,
    axis: Axis,
}

impl Origin {
    /// Panics unless `tile` is a rail station tile or a rail tunnel/bridge
    /// entrance carrying a station association.
    fn of(grid: &TileGrid, tile: TilePos) -> Self {
        if let Some((station, platform)) = grid.rail_platform(tile) {
            return Origin {
                station,
                rail_type: platform.rail_type,
                axis: platform.axis,
            };
        }
        match *grid.facet(tile) {
            TileFacet::TunnelBridge {
                direction,
                transport: TransportType::Rail,
                rail_type,
                station: Some(station),
                ..
            } => Origin {
                station,
                rail_type,
                axis: direction.axis(),
            },
            _ => panic!(
                "tile ({}, {}) is not a platform tile or station-linked rail entrance",
                tile.x, tile.y
            ),
        }
    }
}

/// How the tile stepped onto relates to the platform being measured.
enum Step {
    /// Compatible station tile of the origin station.
    Own,
    /// Counts, but only once an `Own` tile follows in a one-way walk.
    Provisional,
    /// Entrance facing along the walk; `span` includes both entrances.
    Span { far_end: TilePos, span: u32 },
    Stop,
}

fn classify(grid: &TileGrid, tile: TilePos, dir: DiagDirection, origin: &Origin) -> Step {
    match *grid.facet(tile) {
        TileFacet::Station {
            station,
            platform: Some(p),
            ..
        } => {
            if !p.rail_type.is_compatible(origin.rail_type) || p.axis != origin.axis || p.blocked {
                Step::Stop
            } else if station == origin.station {
                Step::Own
            } else {
                Step::Provisional
            }
        }
        TileFacet::Rail {
            rail_type,
            tracks,
            signals,
        } => {
            let extends = !signals
                && rail_type.is_compatible(origin.rail_type)
                && tracks.has_axis(dir.axis())
                && grid.get(tile).bridge_above;
            if extends {
                Step::Provisional
            } else {
                Step::Stop
            }
        }
        TileFacet::TunnelBridge {
            direction,
            transport: TransportType::Rail,
            ..
        } if direction == dir => {
            let far_end = grid.other_tunnel_bridge_end(tile);
            Step::Span {
                far_end,
                span: TileGrid::tunnel_bridge_length(tile, far_end) + 2,
            }
        }
        _ => Step::Stop,
    }
}

/// Whether `tile` is an entrance whose span lies in direction `dir`.
fn faces(grid: &TileGrid, tile: TilePos, dir: DiagDirection) -> bool {
    matches!(
        *grid.facet(tile),
        TileFacet::TunnelBridge { direction, transport: TransportType::Rail, .. } if direction == dir
    )
}

/// Tiles beyond `start` that extend the platform in `dir`, counting every
/// extending tile as confirmed.
fn walk_both_ways_leg(grid: &TileGrid, start: TilePos, dir: DiagDirection, origin: &Origin) -> u32 {
    let mut len = 0;
    let mut cur = start;

    if faces(grid, start, dir) {
        let far_end = grid.other_tunnel_bridge_end(start);
        len += TileGrid::tunnel_bridge_length(start, far_end) + 1;
        cur = far_end;
    }

    while let Some(next) = grid.step(cur, dir) {
        match classify(grid, next, dir, origin) {
            Step::Own | Step::Provisional => {
                len += 1;
                cur = next;
            }
            Step::Span { far_end, span } => {
                len += span;
                cur = far_end;
            }
            Step::Stop => break,
        }
    }
    len
}

/// Total platform length through `tile`, in both directions along its axis.
///
/// The start tile counts once. Panics if `tile` is neither a rail station tile
/// nor a station-linked rail tunnel/bridge entrance.
pub fn platform_length(grid: &TileGrid, tile: TilePos) -> u32 {
    let origin = Origin::of(grid, tile);
    let [back, forward] = origin.axis.directions();
    1 + walk_both_ways_leg(grid, tile, back, &origin) + walk_both_ways_leg(grid, tile, forward, &origin)
}

/// Platform length from `tile` in `dir` only, start tile included.
///
/// Tiles that are not the origin station's own (foreign station tiles, rail
/// under a bridge, tunnel/bridge spans) are held back until another own tile
/// confirms them; whatever is still held back when the walk ends is dropped.
pub fn platform_length_in_direction(grid: &TileGrid, tile: TilePos, dir: DiagDirection) -> u32 {
    let origin = Origin::of(grid, tile);
    let mut confirmed = 1;
    let mut provisional = 0;
    let mut cur = tile;

    if faces(grid, tile, dir) {
        let far_end = grid.other_tunnel_bridge_end(tile);
        provisional += TileGrid::tunnel_bridge_length(tile, far_end) + 1;
        cur = far_end;
    }

    while let Some(next) = grid.step(cur, dir) {
        match classify(grid, next, dir, &origin) {
            Step::Own => {
                confirmed += provisional + 1;
                provisional = 0;
                cur = next;
            }
            Step::Provisional => {
                provisional += 1;
                cur = next;
            }
            Step::Span { far_end, span } => {
                provisional += span;
                cur = far_end;
            }
            Step::Stop => break,
        }
    }
    confirmed
}

impl Station {
    /// Platform length through one of this station's own platform tiles or
    /// linked entrances.
    pub fn platform_length(&self, grid: &TileGrid, tile: TilePos) -> u32 {
        assert!(
            self.tile_belongs_to_rail_station(grid, tile)
                || grid.station_index(tile) == Some(self.id),
            "tile ({}, {}) is not part of station #{}",
            tile.x,
            tile.y,
            self.id.0
        );
        platform_length(grid, tile)
    }

    pub fn platform_length_in_direction(
        &self,
        grid: &TileGrid,
        tile: TilePos,
        dir: DiagDirection,
    ) -> u32 {
        assert!(
            self.tile_belongs_to_rail_station(grid, tile)
                || grid.station_index(tile) == Some(self.id),
            "tile ({}, {}) is not part of station #{}",
            tile.x,
            tile.y,
            self.id.0
        );
        platform_length_in_direction(grid, tile, dir)
    }
}
