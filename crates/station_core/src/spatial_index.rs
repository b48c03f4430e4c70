use std::collections::BTreeMap;

use crate::config::{MAP_HEIGHT, MAP_WIDTH};
use crate::grid::{TileArea, TilePos};
use crate::station::{StationId, StationRegistry};

const BUCKET_TILES: u32 = 16; // tiles per bucket side

/// Bucketed lookup of stations by sign location.
///
/// Derived state: never saved, rebuilt from the station registry on load.
#[derive(Debug, Clone)]
pub struct StationSpatialIndex {
    buckets: Vec<Vec<StationId>>,
    buckets_x: u32,
    buckets_y: u32,
    positions: BTreeMap<StationId, TilePos>,
}

impl Default for StationSpatialIndex {
    fn default() -> Self {
        Self::new(MAP_WIDTH, MAP_HEIGHT)
    }
}

impl StationSpatialIndex {
    pub fn new(map_width: u32, map_height: u32) -> Self {
        let buckets_x = map_width.div_ceil(BUCKET_TILES).max(1);
        let buckets_y = map_height.div_ceil(BUCKET_TILES).max(1);
        Self {
            buckets: (0..buckets_x * buckets_y).map(|_| Vec::new()).collect(),
            buckets_x,
            buckets_y,
            positions: BTreeMap::new(),
        }
    }

    pub fn clear(&mut self) {
        for bucket in &mut self.buckets {
            bucket.clear();
        }
        self.positions.clear();
    }

    /// Insert `station` at `xy`, moving it if it was already indexed.
    pub fn insert(&mut self, station: StationId, xy: TilePos) {
        self.remove(station);
        let idx = self.flat_index(xy);
        self.buckets[idx].push(station);
        self.positions.insert(station, xy);
    }

    pub fn remove(&mut self, station: StationId) -> bool {
        let Some(xy) = self.positions.remove(&station) else {
            return false;
        };
        let idx = self.flat_index(xy);
        self.buckets[idx].retain(|&s| s != station);
        true
    }

    /// Drop everything and index every live station at its sign.
    pub fn rebuild(&mut self, stations: &StationRegistry) {
        self.clear();
        for st in stations.iter() {
            self.insert(st.id, st.xy);
        }
    }

    pub fn position(&self, station: StationId) -> Option<TilePos> {
        self.positions.get(&station).copied()
    }

    /// Stations whose sign lies inside `area`, in id order.
    pub fn query_rect(&self, area: TileArea) -> Vec<StationId> {
        if area.is_empty() {
            return Vec::new();
        }
        let end = area.end();
        let (min_bx, min_by) = self.bucket_of(area.tile);
        let (max_bx, max_by) = self.bucket_of(end);

        let mut result = Vec::new();
        for by in min_by..=max_by {
            for bx in min_bx..=max_bx {
                let bucket = &self.buckets[(by * self.buckets_x + bx) as usize];
                result.extend(
                    bucket
                        .iter()
                        .copied()
                        .filter(|s| self.positions.get(s).is_some_and(|&p| area.contains(p))),
                );
            }
        }
        result.sort_unstable();
        result
    }

    /// Closest station by Manhattan distance within `max_distance`. Ties go
    /// to the lower id.
    pub fn nearest(&self, pos: TilePos, max_distance: u32) -> Option<StationId> {
        let tile = TilePos::new(
            pos.x.saturating_sub(max_distance),
            pos.y.saturating_sub(max_distance),
        );
        let span = max_distance.saturating_mul(2).saturating_add(1);
        let area = TileArea::new(tile, span, span);
        self.query_rect(area)
            .into_iter()
            .filter_map(|s| {
                let d = self.positions.get(&s)?.manhattan(pos);
                (d <= max_distance).then_some((d, s))
            })
            .min()
            .map(|(_, s)| s)
    }

    pub fn len(&self) -> usize {
        self.positions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.positions.is_empty()
    }

    #[inline]
    fn bucket_of(&self, pos: TilePos) -> (u32, u32) {
        (
            (pos.x / BUCKET_TILES).min(self.buckets_x - 1),
            (pos.y / BUCKET_TILES).min(self.buckets_y - 1),
        )
    }

    #[inline]
    fn flat_index(&self, pos: TilePos) -> usize {
        let (bx, by) = self.bucket_of(pos);
        (by * self.buckets_x + bx) as usize
    }
}
