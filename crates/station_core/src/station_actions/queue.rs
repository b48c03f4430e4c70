//! Commands waiting for the next fixed-update tick.
//!
//! Dry-run builds ([`AddMode::Test`](crate::footprint::AddMode::Test)) come in
//! bursts while a player drags out a rectangle. Only the latest one per source
//! and station matters, so the queue keeps just that one, and none of them are
//! written to a save.

use bevy::prelude::*;
use bitcode::{Decode, Encode};
use serde::{Deserialize, Serialize};

use super::StationCommand;
use crate::Saveable;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Encode, Decode)]
pub enum CommandSource {
    Player,
    Script,
    Replay,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Encode, Decode)]
pub struct QueuedCommand {
    pub tick: u64,
    pub source: CommandSource,
    pub command: StationCommand,
}

impl QueuedCommand {
    fn supersedes(&self, earlier: &QueuedCommand) -> bool {
        self.command.is_dry_run()
            && earlier.command.is_dry_run()
            && self.source == earlier.source
            && self.command.station() == earlier.command.station()
    }
}

#[derive(Resource, Debug, Clone, Default, PartialEq)]
pub struct StationCommandQueue {
    pending: Vec<QueuedCommand>,
}

impl StationCommandQueue {
    /// Append `command`. A dry-run build drops any earlier dry run still
    /// pending from the same source against the same station.
    pub fn push(&mut self, tick: u64, source: CommandSource, command: StationCommand) {
        let queued = QueuedCommand {
            tick,
            source,
            command,
        };
        self.pending.retain(|earlier| !queued.supersedes(earlier));
        self.pending.push(queued);
    }

    /// Everything pending, in arrival order.
    pub fn take(&mut self) -> Vec<QueuedCommand> {
        std::mem::take(&mut self.pending)
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }

    pub fn len(&self) -> usize {
        self.pending.len()
    }
}

impl Saveable for StationCommandQueue {
    const SAVE_KEY: &'static str = "station_command_queue";

    fn save_to_bytes(&self) -> Option<Vec<u8>> {
        let durable: Vec<QueuedCommand> = self
            .pending
            .iter()
            .filter(|q| !q.command.is_dry_run())
            .cloned()
            .collect();
        if durable.is_empty() {
            return None;
        }
        Some(bitcode::encode(&durable))
    }

    fn load_from_bytes(bytes: &[u8]) -> Self {
        Self {
            pending: crate::decode_or_warn(Self::SAVE_KEY, bytes),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::footprint::AddMode;
    use crate::grid::{TileArea, TilePos};
    use crate::station::{OwnerId, StationId, StationType};
    use crate::world::TileSpec;

    fn bus(station: Option<StationId>, x: u32, mode: AddMode) -> StationCommand {
        StationCommand::BuildRect {
            station,
            owner: OwnerId(0),
            area: TileArea::new(TilePos::new(x, 4), 1, 1),
            spec: TileSpec::of(StationType::Bus),
            mode,
        }
    }

    #[test]
    fn take_preserves_arrival_order() {
        let mut queue = StationCommandQueue::default();
        queue.push(
            10,
            CommandSource::Player,
            StationCommand::RemoveStation {
                station: StationId(3),
            },
        );
        queue.push(
            10,
            CommandSource::Script,
            StationCommand::RemoveStationTile {
                pos: TilePos::new(4, 4),
            },
        );
        queue.push(11, CommandSource::Replay, bus(None, 8, AddMode::Normal));

        assert_eq!(queue.len(), 3);
        let taken = queue.take();
        assert!(queue.is_empty());
        assert_eq!(taken[0].source, CommandSource::Player);
        assert_eq!(taken[1].source, CommandSource::Script);
        assert_eq!(taken[2].tick, 11);
        assert_eq!(taken[2].command, bus(None, 8, AddMode::Normal));
    }

    #[test]
    fn dry_run_replaces_earlier_dry_run_for_same_station() {
        let mut queue = StationCommandQueue::default();
        queue.push(1, CommandSource::Player, bus(Some(StationId(2)), 3, AddMode::Test));
        queue.push(1, CommandSource::Player, bus(Some(StationId(2)), 5, AddMode::Normal));
        queue.push(2, CommandSource::Player, bus(Some(StationId(2)), 4, AddMode::Test));

        let taken = queue.take();
        assert_eq!(taken.len(), 2);
        // the real build keeps its place ahead of the newer dry run
        assert_eq!(taken[0].command, bus(Some(StationId(2)), 5, AddMode::Normal));
        assert_eq!(taken[1].command, bus(Some(StationId(2)), 4, AddMode::Test));
        assert_eq!(taken[1].tick, 2);
    }

    #[test]
    fn dry_runs_from_other_sources_or_stations_are_kept() {
        let mut queue = StationCommandQueue::default();
        queue.push(1, CommandSource::Player, bus(None, 3, AddMode::Test));
        queue.push(1, CommandSource::Script, bus(None, 3, AddMode::Test));
        queue.push(1, CommandSource::Player, bus(Some(StationId(0)), 3, AddMode::Test));
        queue.push(1, CommandSource::Player, bus(None, 6, AddMode::Normal));
        queue.push(1, CommandSource::Player, bus(None, 7, AddMode::Normal));
        assert_eq!(queue.len(), 5);
    }

    #[test]
    fn saveable_roundtrip_drops_dry_runs() {
        let mut queue = StationCommandQueue::default();
        queue.push(
            42,
            CommandSource::Player,
            StationCommand::RemoveRect {
                station: StationId(0),
                area: TileArea::new(TilePos::new(1, 2), 3, 4),
            },
        );
        queue.push(42, CommandSource::Player, bus(None, 9, AddMode::Test));

        let bytes = queue
            .save_to_bytes()
            .expect("a pending removal should be saved");
        let restored = StationCommandQueue::load_from_bytes(&bytes);
        assert_eq!(restored.len(), 1);
        assert!(matches!(
            restored.pending[0].command,
            StationCommand::RemoveRect { .. }
        ));
    }

    #[test]
    fn queue_of_only_dry_runs_is_not_saved() {
        let mut queue = StationCommandQueue::default();
        assert!(queue.save_to_bytes().is_none());
        queue.push(0, CommandSource::Player, bus(None, 1, AddMode::Test));
        assert!(queue.save_to_bytes().is_none());
    }
}
