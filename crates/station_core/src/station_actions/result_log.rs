//! Bounded history of executed station commands.
//!
//! Every entry names the station the command touched, resolved at execution
//! time, so a station's recent history can be read back even for removals
//! that only addressed a tile.

use std::collections::VecDeque;

use bevy::prelude::*;

use super::{CommandResult, CommandSource, StationCommand};
use crate::footprint::AddMode;
use crate::station::StationId;

const CAPACITY: usize = 64;

#[derive(Debug, Clone, PartialEq)]
pub struct LoggedCommand {
    pub tick: u64,
    pub source: CommandSource,
    pub command: StationCommand,
    /// The station addressed, built or removed from. `None` when a new
    /// station was requested but not built, or a removal hit no station.
    pub station: Option<StationId>,
    pub result: CommandResult,
}

impl LoggedCommand {
    pub fn mode(&self) -> Option<AddMode> {
        self.command.mode()
    }

    pub fn is_rejected(&self) -> bool {
        !self.result.is_success()
    }
}

/// The last 64 executed commands, oldest first.
#[derive(Resource, Debug, Clone, Default)]
pub struct StationCommandLog {
    entries: VecDeque<LoggedCommand>,
}

impl StationCommandLog {
    pub fn record(&mut self, entry: LoggedCommand) {
        if self.entries.len() == CAPACITY {
            self.entries.pop_front();
        }
        self.entries.push_back(entry);
    }

    pub fn iter(&self) -> impl DoubleEndedIterator<Item = &LoggedCommand> {
        self.entries.iter()
    }

    pub fn last(&self) -> Option<&LoggedCommand> {
        self.entries.back()
    }

    pub fn for_station(&self, station: StationId) -> impl Iterator<Item = &LoggedCommand> {
        self.entries
            .iter()
            .filter(move |e| e.station == Some(station))
    }

    pub fn rejections(&self) -> impl Iterator<Item = &LoggedCommand> {
        self.entries.iter().filter(|e| e.is_rejected())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::StationError;
    use crate::grid::{TileArea, TilePos};
    use crate::station::{OwnerId, StationType};
    use crate::world::TileSpec;

    fn entry(tick: u64, station: Option<StationId>, result: CommandResult) -> LoggedCommand {
        LoggedCommand {
            tick,
            source: CommandSource::Player,
            command: StationCommand::RemoveStationTile {
                pos: TilePos::new(tick as u32, 0),
            },
            station,
            result,
        }
    }

    #[test]
    fn evicts_oldest_at_capacity() {
        let mut log = StationCommandLog::default();
        for tick in 0..70 {
            log.record(entry(tick, None, CommandResult::Success));
        }
        assert_eq!(log.len(), CAPACITY);
        assert_eq!(log.iter().next().map(|e| e.tick), Some(6));
        assert_eq!(log.last().map(|e| e.tick), Some(69));
    }

    #[test]
    fn filters_by_station_and_rejection() {
        let mut log = StationCommandLog::default();
        let a = StationId(1);
        let b = StationId(2);
        log.record(entry(0, Some(a), CommandResult::Built(a)));
        log.record(entry(1, Some(b), CommandResult::Success));
        log.record(entry(
            2,
            Some(a),
            CommandResult::Error(StationError::not_a_station_tile(TilePos::new(2, 0))),
        ));
        log.record(entry(
            3,
            None,
            CommandResult::Error(StationError::not_a_station_tile(TilePos::new(3, 0))),
        ));

        let ticks: Vec<u64> = log.for_station(a).map(|e| e.tick).collect();
        assert_eq!(ticks, vec![0, 2]);
        let ticks: Vec<u64> = log.rejections().map(|e| e.tick).collect();
        assert_eq!(ticks, vec![2, 3]);
    }

    #[test]
    fn mode_comes_from_build_commands_only() {
        let build = LoggedCommand {
            command: StationCommand::BuildRect {
                station: None,
                owner: OwnerId(0),
                area: TileArea::new(TilePos::new(0, 0), 2, 1),
                spec: TileSpec::of(StationType::Truck),
                mode: AddMode::Force,
            },
            ..entry(0, None, CommandResult::Validated(None))
        };
        assert_eq!(build.mode(), Some(AddMode::Force));
        assert_eq!(entry(0, None, CommandResult::Success).mode(), None);
    }
}
