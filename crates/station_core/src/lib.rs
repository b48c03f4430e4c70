//! Station footprint, catchment-area and platform-length engine for a
//! tile-based transport simulation.
//!
//! [`StationCorePlugin`] installs the station world, its settings and the
//! command queue into a Bevy `App`. The building blocks are usable without
//! the ECS as well: see [`world::StationWorld`], [`footprint::FootprintRect`],
//! [`catchment`] and [`platform`].

use bevy::prelude::*;
use std::collections::BTreeMap;

pub mod catchment;
pub mod config;
pub mod error;
pub mod footprint;
pub mod grid;
pub mod link_graph;
pub mod platform;
pub mod settings;
pub mod sites;
pub mod spatial_index;
pub mod station;
pub mod station_actions;
pub mod station_rng;
pub mod world;

#[cfg(test)]
mod integration_tests;
#[cfg(any(test, feature = "bench"))]
pub mod test_harness;

use grid::TileGrid;
use settings::StationSettings;
use station_actions::{execute_station_commands, StationActionsPlugin, StationCommandQueue};
use station_rng::StationRng;
use world::StationWorld;

// ---------------------------------------------------------------------------
// Saveable resources
// ---------------------------------------------------------------------------

/// A resource persisted as one entry of the host's save-file extension map.
///
/// The host save system never names station types; it walks the
/// [`SaveableRegistry`] that [`StationCorePlugin`] fills.
pub trait Saveable: Resource + Default + Send + Sync + 'static {
    /// Extension-map key. Stable across versions.
    const SAVE_KEY: &'static str;

    /// `None` leaves the entry out of the save. Only return it when the
    /// resource is equivalent to its default: a missing entry loads as
    /// `Self::default()`.
    fn save_to_bytes(&self) -> Option<Vec<u8>>;

    fn load_from_bytes(bytes: &[u8]) -> Self;
}

/// `bitcode::decode`, or `T::default()` with a warning when the bytes are bad.
pub fn decode_or_warn<T: bitcode::DecodeOwned + Default>(key: &str, bytes: &[u8]) -> T {
    bitcode::decode(bytes).unwrap_or_else(|e| {
        warn!(
            "Saveable {}: could not decode {} bytes, using default: {}",
            key,
            bytes.len(),
            e
        );
        T::default()
    })
}

/// Save/load/reset hooks for one resource type.
pub struct SaveableEntry {
    pub key: &'static str,
    save: fn(&World) -> Option<Vec<u8>>,
    load: fn(&mut World, Option<&[u8]>),
}

fn save_resource<T: Saveable>(world: &World) -> Option<Vec<u8>> {
    world.get_resource::<T>()?.save_to_bytes()
}

fn load_resource<T: Saveable>(world: &mut World, bytes: Option<&[u8]>) {
    world.insert_resource(bytes.map_or_else(T::default, T::load_from_bytes));
}

#[derive(Resource, Default)]
pub struct SaveableRegistry {
    entries: Vec<SaveableEntry>,
}

impl SaveableRegistry {
    /// Register `T` under its `SAVE_KEY`. A second registration of the same key
    /// is ignored with a warning (and trips a debug assertion).
    pub fn register<T: Saveable>(&mut self) {
        if self.contains(T::SAVE_KEY) {
            warn!("SaveableRegistry: duplicate key '{}', keeping the first", T::SAVE_KEY);
            debug_assert!(false, "SaveableRegistry: duplicate key '{}'", T::SAVE_KEY);
            return;
        }
        self.entries.push(SaveableEntry {
            key: T::SAVE_KEY,
            save: save_resource::<T>,
            load: load_resource::<T>,
        });
    }

    pub fn contains(&self, key: &str) -> bool {
        self.entries.iter().any(|e| e.key == key)
    }

    /// Registered keys in registration order.
    pub fn keys(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.entries.iter().map(|e| e.key)
    }

    pub fn save_all(&self, world: &World) -> BTreeMap<String, Vec<u8>> {
        self.entries
            .iter()
            .filter_map(|entry| (entry.save)(world).map(|bytes| (entry.key.to_string(), bytes)))
            .collect()
    }

    /// Replace every registered resource from `extensions`. Keys the save does
    /// not carry were at their default when saved, so those resources are
    /// reset; keys nobody registered are ignored.
    pub fn load_all(&self, world: &mut World, extensions: &BTreeMap<String, Vec<u8>>) {
        for entry in &self.entries {
            (entry.load)(world, extensions.get(entry.key).map(Vec::as_slice));
        }
    }

    /// Reset every registered resource, as when starting a new map.
    pub fn reset_all(&self, world: &mut World) {
        for entry in &self.entries {
            (entry.load)(world, None);
        }
    }
}

// ---------------------------------------------------------------------------
// Plugin
// ---------------------------------------------------------------------------

/// Ordered phases for the station systems in `FixedUpdate`.
///
/// Configured as a chain: `Commands` → `Catchment`.
#[derive(SystemSet, Debug, Clone, PartialEq, Eq, Hash)]
pub enum StationSet {
    /// Tick bookkeeping, then every queued build/remove command.
    Commands,
    /// Catchment upkeep that follows from settings changes.
    Catchment,
}

pub struct StationCorePlugin;

impl Plugin for StationCorePlugin {
    fn build(&self, app: &mut App) {
        app.init_resource::<TileGrid>()
            .init_resource::<StationSettings>()
            .init_resource::<StationWorld>()
            .init_resource::<StationRng>()
            .configure_sets(
                FixedUpdate,
                (StationSet::Commands, StationSet::Catchment).chain(),
            )
            .add_systems(
                FixedUpdate,
                advance_station_tick
                    .before(execute_station_commands)
                    .in_set(StationSet::Commands),
            )
            .add_systems(
                FixedUpdate,
                recompute_catchment_on_settings_change.in_set(StationSet::Catchment),
            );

        app.add_plugins(StationActionsPlugin);

        // Register for save/load via the SaveableRegistry.
        app.init_resource::<SaveableRegistry>();
        let mut registry = app.world_mut().resource_mut::<SaveableRegistry>();
        registry.register::<StationSettings>();
        registry.register::<StationWorld>();
        registry.register::<StationRng>();
        registry.register::<StationCommandQueue>();
    }
}

fn advance_station_tick(mut world: ResMut<StationWorld>) {
    world.tick = world.tick.wrapping_add(1);
}

/// Every catchment depends on the radius policy, so a settings change
/// rebuilds all of them. Skipped on insertion (a fresh or loaded world
/// already carries consistent catchments).
fn recompute_catchment_on_settings_change(
    settings: Res<StationSettings>,
    grid: Res<TileGrid>,
    mut world: ResMut<StationWorld>,
) {
    if !settings.is_changed() || settings.is_added() {
        return;
    }
    info!("Station settings changed, rebuilding catchments");
    catchment::recompute_catchment_for_all(&mut world, &grid, &settings);
}
