use bitcode::{Decode, Encode};
use serde::{Deserialize, Serialize};

use crate::grid::{TileArea, TilePos};

/// Bitmap of tiles scoped to one rectangular area.
///
/// An uninitialized (or reset) set has no area and contains nothing.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, Encode, Decode)]
pub struct CatchmentTileSet {
    area: Option<TileArea>,
    words: Vec<u64>,
}

impl CatchmentTileSet {
    /// Clear and rescope the set to `area`.
    pub fn initialize(&mut self, area: TileArea) {
        self.area = Some(area);
        self.words.clear();
        self.words.resize((area.area() as usize).div_ceil(64), 0);
    }

    pub fn reset(&mut self) {
        self.area = None;
        self.words.clear();
    }

    pub fn area(&self) -> Option<TileArea> {
        self.area
    }

    #[inline]
    fn bit(&self, pos: TilePos) -> Option<usize> {
        let area = self.area?;
        area.contains(pos)
            .then(|| ((pos.y - area.tile.y) * area.w + (pos.x - area.tile.x)) as usize)
    }

    /// Mark `pos`. The tile must lie inside the set's area.
    pub fn set_tile(&mut self, pos: TilePos) {
        let Some(bit) = self.bit(pos) else {
            panic!(
                "tile ({}, {}) lies outside the catchment area {:?}",
                pos.x, pos.y, self.area
            );
        };
        self.words[bit / 64] |= 1 << (bit % 64);
    }

    pub fn has_tile(&self, pos: TilePos) -> bool {
        self.bit(pos)
            .is_some_and(|bit| self.words[bit / 64] >> (bit % 64) & 1 == 1)
    }

    pub fn len(&self) -> usize {
        self.words.iter().map(|w| w.count_ones() as usize).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.words.iter().all(|&w| w == 0)
    }

    /// Set tiles in row-major order.
    pub fn iter(&self) -> impl Iterator<Item = TilePos> + '_ {
        let area = self.area;
        self.words
            .iter()
            .enumerate()
            .flat_map(|(wi, &word)| {
                let mut bits = word;
                std::iter::from_fn(move || {
                    if bits == 0 {
                        return None;
                    }
                    let b = bits.trailing_zeros() as usize;
                    bits &= bits - 1;
                    Some(wi * 64 + b)
                })
            })
            .filter_map(move |bit| {
                let a = area?;
                let bit = bit as u32;
                Some(TilePos::new(a.tile.x + bit % a.w, a.tile.y + bit / a.w))
            })
    }
}
