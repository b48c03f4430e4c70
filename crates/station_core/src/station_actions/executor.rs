//! Command executor system: drains the [`StationCommandQueue`] each
//! fixed-update tick and applies every queued [`StationCommand`] to the
//! [`StationWorld`], recording results in the [`StationCommandLog`].
//!
//! Builds are validated in full before the first change, so a rejected
//! command leaves the world as it was.

use bevy::prelude::*;

use crate::error::StationError;
use crate::footprint::AddMode;
use crate::grid::{TileArea, TileGrid};
use crate::settings::StationSettings;
use crate::station::{OwnerId, StationId};
use crate::station_rng::StationRng;
use crate::world::{StationWorld, TileSpec};

use super::result_log::{LoggedCommand, StationCommandLog};
use super::{CommandResult, StationCommand, StationCommandQueue};

// ---------------------------------------------------------------------------
// System
// ---------------------------------------------------------------------------

/// Drains all pending commands from the queue and executes them in order.
pub fn execute_station_commands(
    mut queue: ResMut<StationCommandQueue>,
    mut log: ResMut<StationCommandLog>,
    mut world: ResMut<StationWorld>,
    mut grid: ResMut<TileGrid>,
    mut rng: ResMut<StationRng>,
    settings: Res<StationSettings>,
) {
    for queued in queue.take() {
        let addressed = addressed_station(&queued.command, &grid);
        let result = execute_single(&queued.command, &mut world, &mut grid, &mut rng, &settings);
        let station = match result {
            CommandResult::Built(id) => Some(id),
            _ => addressed,
        };
        if let CommandResult::Error(e) = &result {
            warn!(
                "Station command from {:?} at tick {} rejected: {}",
                queued.source, queued.tick, e
            );
        }
        log.record(LoggedCommand {
            tick: queued.tick,
            source: queued.source,
            command: queued.command,
            station,
            result,
        });
    }
}

/// The station a command is about, looked up on the grid for single-tile
/// removals. Must run before the command clears the tile.
fn addressed_station(command: &StationCommand, grid: &TileGrid) -> Option<StationId> {
    match *command {
        StationCommand::RemoveStationTile { pos } if grid.in_bounds(pos) => {
            grid.station_index(pos)
        }
        _ => command.station(),
    }
}

// ---------------------------------------------------------------------------
// Dispatcher
// ---------------------------------------------------------------------------

/// Apply one command. Usable outside the ECS schedule.
pub fn execute_single(
    command: &StationCommand,
    world: &mut StationWorld,
    grid: &mut TileGrid,
    rng: &mut StationRng,
    settings: &StationSettings,
) -> CommandResult {
    match *command {
        StationCommand::BuildStationTile {
            station,
            owner,
            pos,
            spec,
            mode,
        } => execute_build(
            world,
            grid,
            rng,
            settings,
            station,
            owner,
            TileArea::new(pos, 1, 1),
            spec,
            mode,
        ),
        StationCommand::BuildRect {
            station,
            owner,
            area,
            spec,
            mode,
        } => execute_build(world, grid, rng, settings, station, owner, area, spec, mode),
        StationCommand::LinkEntrance { station, pos } => world
            .link_entrance(grid, settings, station, pos)
            .into(),
        StationCommand::RemoveStationTile { pos } => world
            .remove_tile(grid, settings, pos)
            .map(|_| ())
            .into(),
        StationCommand::RemoveRect { station, area } => {
            world.remove_rect(grid, settings, station, area).into()
        }
        StationCommand::RemoveStation { station } => {
            if world.delete_station(grid, station) {
                CommandResult::Success
            } else {
                CommandResult::Error(StationError::StationNotFound(station))
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Execution functions
// ---------------------------------------------------------------------------

#[allow(clippy::too_many_arguments)]
fn execute_build(
    world: &mut StationWorld,
    grid: &mut TileGrid,
    rng: &mut StationRng,
    settings: &StationSettings,
    station: Option<StationId>,
    owner: OwnerId,
    area: TileArea,
    spec: TileSpec,
    mode: AddMode,
) -> CommandResult {
    if mode == AddMode::Test {
        return match world.check_build_rect(grid, settings, station, area, &spec, mode) {
            Ok(()) => CommandResult::Validated(station),
            Err(e) => CommandResult::Error(e),
        };
    }
    match world.build_rect(grid, settings, &mut rng.0, station, owner, area, spec, mode) {
        Ok(id) => CommandResult::Built(id),
        Err(e) => CommandResult::Error(e),
    }
}
