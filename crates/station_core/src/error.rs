// ---------------------------------------------------------------------------
// StationError: recoverable failures surfaced to the command layer
// ---------------------------------------------------------------------------

use std::fmt;

use bitcode::{Decode, Encode};
use serde::{Deserialize, Serialize};

use crate::grid::TilePos;
use crate::sites::SiteId;
use crate::station::StationId;

/// Errors returned by footprint validation and station commands.
///
/// Programming errors (platform queries on non-platform tiles, grid access out
/// of bounds) are not represented here; those panic at the call site.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Encode, Decode)]
pub enum StationError {
    /// The bounding rectangle would exceed the configured spread.
    TooSpreadOut { width: u32, height: u32, limit: u32 },
    /// A command referenced a tile outside the map.
    OutOfBounds { x: u32, y: u32 },
    /// The tile already carries something that is not a plain tile.
    TileOccupied { x: u32, y: u32 },
    /// The tile is not a station tile, so it cannot be removed as one.
    NotAStationTile { x: u32, y: u32 },
    /// The tile belongs to a different station than the one addressed.
    ForeignStation { x: u32, y: u32, station: StationId },
    /// A build or removal area with zero width or height.
    EmptyArea { x: u32, y: u32 },
    /// Only rail tunnel/bridge entrances can join a station.
    NotARailEntrance { x: u32, y: u32 },
    StationNotFound(StationId),
    SiteNotFound(SiteId),
}

impl StationError {
    pub fn out_of_bounds(pos: TilePos) -> Self {
        StationError::OutOfBounds { x: pos.x, y: pos.y }
    }

    pub fn occupied(pos: TilePos) -> Self {
        StationError::TileOccupied { x: pos.x, y: pos.y }
    }

    pub fn not_a_station_tile(pos: TilePos) -> Self {
        StationError::NotAStationTile { x: pos.x, y: pos.y }
    }

    pub fn empty_area(pos: TilePos) -> Self {
        StationError::EmptyArea { x: pos.x, y: pos.y }
    }

    pub fn not_a_rail_entrance(pos: TilePos) -> Self {
        StationError::NotARailEntrance { x: pos.x, y: pos.y }
    }
}

impl fmt::Display for StationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StationError::TooSpreadOut {
                width,
                height,
                limit,
            } => write!(
                f,
                "Station too spread out: {width}x{height} exceeds the limit of {limit}"
            ),
            StationError::OutOfBounds { x, y } => write!(f, "Tile ({x}, {y}) is off the map"),
            StationError::TileOccupied { x, y } => {
                write!(f, "Tile ({x}, {y}) is already occupied")
            }
            StationError::NotAStationTile { x, y } => {
                write!(f, "Tile ({x}, {y}) is not a station tile")
            }
            StationError::ForeignStation { x, y, station } => write!(
                f,
                "Tile ({x}, {y}) belongs to another station (#{})",
                station.0
            ),
            StationError::EmptyArea { x, y } => {
                write!(f, "Area at ({x}, {y}) has no tiles")
            }
            StationError::NotARailEntrance { x, y } => {
                write!(f, "Tile ({x}, {y}) is not a rail tunnel or bridge entrance")
            }
            StationError::StationNotFound(id) => write!(f, "Station #{} does not exist", id.0),
            StationError::SiteNotFound(id) => {
                write!(f, "Production site #{} does not exist", id.0)
            }
        }
    }
}

impl std::error::Error for StationError {}
