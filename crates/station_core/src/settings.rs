//! Station tunables.
//!
//! A single [`StationSettings`] resource replaces the global game settings the
//! station engine used to read. Systems and core functions take it by
//! reference. It is registered as `Saveable` so overrides persist across
//! save/load cycles, and a change to it triggers a global catchment rebuild.

use bevy::prelude::*;
use serde::{Deserialize, Serialize};

use crate::config::{DEFAULT_STATION_SPREAD, MAX_CATCHMENT_INCREASE, MAX_STATION_SPREAD};

#[derive(
    Resource, Debug, Clone, PartialEq, Eq, Serialize, Deserialize, bitcode::Encode, bitcode::Decode,
)]
pub struct StationSettings {
    /// Maximum side length of a station's bounding rectangle, in tiles.
    pub station_spread: u32,
    /// Use per-facility catchment radii instead of one flat radius.
    pub modified_catchment: bool,
    /// Added to every non-zero catchment radius.
    pub catchment_increase: u32,
    /// When false, a site with its own neutral station is served by that
    /// station only.
    pub serve_neutral_industries: bool,
}

impl Default for StationSettings {
    fn default() -> Self {
        Self {
            station_spread: DEFAULT_STATION_SPREAD,
            modified_catchment: true,
            catchment_increase: 0,
            serve_neutral_industries: true,
        }
    }
}

impl StationSettings {
    /// Copy with every field clamped to its supported range.
    pub fn validated(&self) -> Self {
        Self {
            station_spread: self.station_spread.clamp(1, MAX_STATION_SPREAD),
            catchment_increase: self.catchment_increase.min(MAX_CATCHMENT_INCREASE),
            ..self.clone()
        }
    }
}

// ---------------------------------------------------------------------------
// Saveable implementation
// ---------------------------------------------------------------------------

impl crate::Saveable for StationSettings {
    const SAVE_KEY: &'static str = "station_settings";

    fn save_to_bytes(&self) -> Option<Vec<u8>> {
        Some(bitcode::encode(self))
    }

    fn load_from_bytes(bytes: &[u8]) -> Self {
        crate::decode_or_warn::<StationSettings>(Self::SAVE_KEY, bytes).validated()
    }
}

// ---------------------------------------------------------------------------
// Unit tests
// ---------------------------------------------------------------------------
