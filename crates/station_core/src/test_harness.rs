//! # TestWorld: headless harness for station integration tests
//!
//! Wraps `bevy::app::App` + [`StationCorePlugin`] so tests can lay out a map,
//! queue station commands, advance the fixed-update schedule and inspect the
//! resulting resources without a window or renderer.

use bevy::app::App;
use bevy::prelude::*;
use std::collections::BTreeMap;

use crate::footprint::AddMode;
use crate::grid::{
    Axis, RailType, TileArea, TileFacet, TileGrid, TilePos, TrackBits, TransportType,
};
use crate::settings::StationSettings;
use crate::sites::{SettlementId, SiteId};
use crate::station::{CargoId, OwnerId, Station, StationId};
use crate::station_actions::{
    CommandResult, CommandSource, StationCommand, StationCommandLog, StationCommandQueue,
};
use crate::world::{StationWorld, TileSpec};
use crate::{SaveableRegistry, StationCorePlugin};

/// A headless Bevy App wrapping `StationCorePlugin` for integration testing.
pub struct TestWorld {
    app: App,
}

impl Default for TestWorld {
    fn default() -> Self {
        Self::new()
    }
}

impl TestWorld {
    // -----------------------------------------------------------------------
    // Constructors
    // -----------------------------------------------------------------------

    /// An empty 64x64 map with default settings.
    pub fn new() -> Self {
        Self::with_size(64, 64)
    }

    pub fn with_size(width: u32, height: u32) -> Self {
        let mut app = App::new();
        app.add_plugins(MinimalPlugins);
        app.add_plugins(StationCorePlugin);
        app.insert_resource(TileGrid::new(width, height));
        // Run one update so Startup systems execute.
        app.update();
        Self { app }
    }

    // -----------------------------------------------------------------------
    // World setup (builder pattern: consumes and returns Self)
    // -----------------------------------------------------------------------

    pub fn with_settings(mut self, settings: StationSettings) -> Self {
        self.app.insert_resource(settings.validated());
        self
    }

    /// Put `facet` on every tile of `area`.
    pub fn with_facet_rect(mut self, area: TileArea, facet: TileFacet) -> Self {
        let mut grid = self.app.world_mut().resource_mut::<TileGrid>();
        for pos in area.iter() {
            grid.set_facet(pos, facet);
        }
        self
    }

    /// Plain track along `axis` over `area`.
    pub fn with_rail(self, area: TileArea, axis: Axis) -> Self {
        self.with_facet_rect(
            area,
            TileFacet::Rail {
                rail_type: RailType::Rail,
                tracks: match axis {
                    Axis::X => TrackBits::X,
                    Axis::Y => TrackBits::Y,
                },
                signals: false,
            },
        )
    }

    /// A settlement owning houses on every tile of `houses`.
    pub fn with_settlement(mut self, name: &str, houses: TileArea) -> (Self, SettlementId) {
        let id = self
            .app
            .world_mut()
            .resource_mut::<StationWorld>()
            .sites
            .add_settlement(name, houses.tile);
        let world = self.with_facet_rect(houses, TileFacet::House { settlement: id });
        (world, id)
    }

    /// A production site covering `area` that accepts `cargo`.
    pub fn with_site(mut self, area: TileArea, cargo: Vec<CargoId>) -> (Self, SiteId) {
        let id = self
            .app
            .world_mut()
            .resource_mut::<StationWorld>()
            .sites
            .add_site(area, cargo);
        let world = self.with_facet_rect(area, TileFacet::Industry { site: id });
        (world, id)
    }

    /// A rail bridge with ramps at `a` and `b`. Panics if they are not aligned.
    pub fn with_rail_bridge(mut self, a: TilePos, b: TilePos) -> Self {
        if let Err(e) = self
            .app
            .world_mut()
            .resource_mut::<TileGrid>()
            .build_bridge(a, b, TransportType::Rail, RailType::Rail)
        {
            panic!("bridge {a:?} -> {b:?}: {e}");
        }
        self
    }

    // -----------------------------------------------------------------------
    // Commands
    // -----------------------------------------------------------------------

    /// Queue a command for the next tick.
    pub fn queue(&mut self, command: StationCommand) {
        let tick = self.station_world().tick;
        self.app
            .world_mut()
            .resource_mut::<StationCommandQueue>()
            .push(tick, CommandSource::Player, command);
    }

    /// Queue `command`, run one tick and return its result.
    pub fn execute(&mut self, command: StationCommand) -> CommandResult {
        self.queue(command);
        self.tick(1);
        self.resource::<StationCommandLog>()
            .last()
            .map(|entry| entry.result.clone())
            .unwrap_or(CommandResult::Success)
    }

    /// Build `area` with `spec` through the command queue, returning the
    /// station id. Panics if the command fails.
    pub fn build(&mut self, station: Option<StationId>, area: TileArea, spec: TileSpec) -> StationId {
        let result = self.execute(StationCommand::BuildRect {
            station,
            owner: OwnerId(0),
            area,
            spec,
            mode: AddMode::Normal,
        });
        match result {
            CommandResult::Built(id) => id,
            other => panic!("build of {area:?} failed: {other:?}"),
        }
    }

    // -----------------------------------------------------------------------
    // Simulation
    // -----------------------------------------------------------------------

    /// Run the `FixedUpdate` schedule `n` times, independent of wall-clock time.
    pub fn tick(&mut self, n: u32) {
        for _ in 0..n {
            self.app.world_mut().run_schedule(FixedUpdate);
        }
    }

    // -----------------------------------------------------------------------
    // Save / load
    // -----------------------------------------------------------------------

    pub fn save(&self) -> BTreeMap<String, Vec<u8>> {
        let world = self.app.world();
        world.resource::<SaveableRegistry>().save_all(world)
    }

    pub fn load(&mut self, extensions: &BTreeMap<String, Vec<u8>>) {
        let world = self.app.world_mut();
        world.resource_scope(|world, registry: Mut<SaveableRegistry>| {
            registry.load_all(world, extensions);
        });
    }

    // -----------------------------------------------------------------------
    // Queries
    // -----------------------------------------------------------------------

    pub fn world_mut(&mut self) -> &mut World {
        self.app.world_mut()
    }

    pub fn resource<T: Resource>(&self) -> &T {
        self.app.world().resource::<T>()
    }

    pub fn resource_mut<T: Resource>(&mut self) -> Mut<'_, T> {
        self.app.world_mut().resource_mut::<T>()
    }

    pub fn grid(&self) -> &TileGrid {
        self.resource::<TileGrid>()
    }

    pub fn station_world(&self) -> &StationWorld {
        self.resource::<StationWorld>()
    }

    pub fn station(&self, id: StationId) -> &Station {
        self.station_world()
            .stations
            .get(id)
            .unwrap_or_else(|| panic!("station #{} does not exist", id.0))
    }

    pub fn settlement_stations(&self, id: SettlementId) -> Vec<StationId> {
        self.station_world()
            .sites
            .settlement(id)
            .map(|s| s.stations_near.iter().copied().collect())
            .unwrap_or_default()
    }

    pub fn site_stations(&self, id: SiteId) -> Vec<StationId> {
        self.station_world()
            .sites
            .site(id)
            .map(|s| s.stations_near.iter().copied().collect())
            .unwrap_or_default()
    }
}
