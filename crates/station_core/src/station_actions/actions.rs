use bitcode::{Decode, Encode};
use serde::{Deserialize, Serialize};

use crate::footprint::AddMode;
use crate::grid::{TileArea, TilePos};
use crate::station::{OwnerId, StationId};
use crate::world::TileSpec;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Encode, Decode)]
pub enum StationCommand {
    BuildStationTile {
        station: Option<StationId>,
        owner: OwnerId,
        pos: TilePos,
        spec: TileSpec,
        mode: AddMode,
    },
    BuildRect {
        station: Option<StationId>,
        owner: OwnerId,
        area: TileArea,
        spec: TileSpec,
        mode: AddMode,
    },
    LinkEntrance {
        station: StationId,
        pos: TilePos,
    },
    RemoveStationTile {
        pos: TilePos,
    },
    RemoveRect {
        station: StationId,
        area: TileArea,
    },
    RemoveStation {
        station: StationId,
    },
}

impl StationCommand {
    /// The station a command names. `None` for builds that create a station
    /// and for single-tile removals, which find their station on the grid.
    pub fn station(&self) -> Option<StationId> {
        match *self {
            StationCommand::BuildStationTile { station, .. }
            | StationCommand::BuildRect { station, .. } => station,
            StationCommand::LinkEntrance { station, .. }
            | StationCommand::RemoveRect { station, .. }
            | StationCommand::RemoveStation { station } => Some(station),
            StationCommand::RemoveStationTile { .. } => None,
        }
    }

    /// Footprint mode of a build; `None` for every other command.
    pub fn mode(&self) -> Option<AddMode> {
        match *self {
            StationCommand::BuildStationTile { mode, .. }
            | StationCommand::BuildRect { mode, .. } => Some(mode),
            _ => None,
        }
    }

    /// A build in [`AddMode::Test`]: validates and never changes the world.
    pub fn is_dry_run(&self) -> bool {
        self.mode() == Some(AddMode::Test)
    }
}
