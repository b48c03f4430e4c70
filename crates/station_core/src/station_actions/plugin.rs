//! Plugin that wires up the station command subsystem: queue, executor and log.

use bevy::prelude::*;

use super::executor::execute_station_commands;
use super::result_log::StationCommandLog;
use super::StationCommandQueue;
use crate::StationSet;

/// Registers the command queue, result log and executor system.
pub struct StationActionsPlugin;

impl Plugin for StationActionsPlugin {
    fn build(&self, app: &mut App) {
        app.init_resource::<StationCommandQueue>();
        app.init_resource::<StationCommandLog>();

        app.add_systems(
            FixedUpdate,
            execute_station_commands.in_set(StationSet::Commands),
        );
    }
}
