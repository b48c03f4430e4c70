//! Incrementally maintained bounding rectangle of a station's tiles.
//!
//! Additions are validated against the configured spread *before* the tile is
//! placed on the grid; removals shrink the rectangle *after* the tile is gone
//! by scanning the edge lines for remaining tiles of the same station.

use bitcode::{Decode, Encode};
use serde::{Deserialize, Serialize};

use crate::error::StationError;
use crate::grid::{TileArea, TileFacet, TileGrid, TilePos};
use crate::station::StationId;

/// How a footprint addition is validated and applied.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Encode, Decode)]
pub enum AddMode {
    /// Validate only. State is never mutated.
    Test,
    /// Validate and mutate; the caller rolls back if the whole command fails.
    Try,
    /// Skip the spread limit. Used for inherited layouts.
    Force,
    /// Validate, enforce the limit, mutate on success.
    Normal,
}

/// Inclusive tile bounds of a non-empty footprint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Encode, Decode)]
pub struct Bounds {
    pub left: u32,
    pub top: u32,
    pub right: u32,
    pub bottom: u32,
}

impl Bounds {
    pub fn point(pos: TilePos) -> Self {
        Self {
            left: pos.x,
            top: pos.y,
            right: pos.x,
            bottom: pos.y,
        }
    }

    pub fn width(&self) -> u32 {
        self.right - self.left + 1
    }

    pub fn height(&self) -> u32 {
        self.bottom - self.top + 1
    }

    pub fn contains(&self, pos: TilePos) -> bool {
        self.left <= pos.x && pos.x <= self.right && self.top <= pos.y && pos.y <= self.bottom
    }

    /// Smallest bounds covering `self` and `pos`.
    pub fn including(&self, pos: TilePos) -> Self {
        Self {
            left: self.left.min(pos.x),
            top: self.top.min(pos.y),
            right: self.right.max(pos.x),
            bottom: self.bottom.max(pos.y),
        }
    }

    pub fn to_area(&self) -> TileArea {
        TileArea::from_corners(
            TilePos::new(self.left, self.top),
            TilePos::new(self.right, self.bottom),
        )
    }
}

/// Minimal axis-aligned hull of a station's tiles.
///
/// Emptiness is an explicit state, so a 1x1 footprint at the map origin is a
/// perfectly ordinary footprint.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, Encode, Decode)]
pub struct FootprintRect {
    bounds: Option<Bounds>,
}

impl FootprintRect {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn bounds(&self) -> Option<Bounds> {
        self.bounds
    }

    pub fn is_empty(&self) -> bool {
        self.bounds.is_none()
    }

    pub fn make_empty(&mut self) {
        self.bounds = None;
    }

    /// Overwrite with explicit bounds, e.g. when restoring a saved station.
    pub fn set(&mut self, bounds: Bounds) {
        debug_assert!(bounds.left <= bounds.right && bounds.top <= bounds.bottom);
        self.bounds = Some(bounds);
    }

    pub fn to_area(&self) -> Option<TileArea> {
        self.bounds.map(|b| b.to_area())
    }

    /// Whether `pos` lies within `distance` tiles of the rectangle on both axes.
    pub fn pt_in_extended_rect(&self, pos: TilePos, distance: u32) -> bool {
        let Some(b) = self.bounds else {
            return false;
        };
        let (x, y) = (pos.x as i64, pos.y as i64);
        let d = distance as i64;
        b.left as i64 - d <= x
            && x <= b.right as i64 + d
            && b.top as i64 - d <= y
            && y <= b.bottom as i64 + d
    }

    /// Validate, and unless `mode` is [`AddMode::Test`] apply, the addition of
    /// one tile.
    pub fn before_add_tile(
        &mut self,
        pos: TilePos,
        mode: AddMode,
        spread: u32,
    ) -> Result<(), StationError> {
        self.grow_to_cover(pos, pos, mode, spread)
    }

    /// Validate/extend for a `w`x`h` area anchored at `area.tile`.
    pub fn before_add_rect(
        &mut self,
        area: TileArea,
        mode: AddMode,
        spread: u32,
    ) -> Result<(), StationError> {
        if area.is_empty() {
            return Ok(());
        }
        if mode != AddMode::Force && (area.w > spread || area.h > spread) {
            return Err(StationError::TooSpreadOut {
                width: area.w,
                height: area.h,
                limit: spread,
            });
        }
        let Some(end) = area.checked_end() else {
            return Err(StationError::out_of_bounds(area.end()));
        };
        self.grow_to_cover(area.tile, end, mode, spread)
    }

    fn grow_to_cover(
        &mut self,
        a: TilePos,
        b: TilePos,
        mode: AddMode,
        spread: u32,
    ) -> Result<(), StationError> {
        let candidate = match self.bounds {
            None => Bounds::point(a).including(b),
            Some(current) if current.contains(a) && current.contains(b) => return Ok(()),
            Some(current) => current.including(a).including(b),
        };

        // A fresh single tile always fits; anything larger is checked.
        let grows_existing = self.bounds.is_some() || a != b;
        if grows_existing
            && mode != AddMode::Force
            && (candidate.width() > spread || candidate.height() > spread)
        {
            return Err(StationError::TooSpreadOut {
                width: candidate.width(),
                height: candidate.height(),
                limit: spread,
            });
        }

        if mode != AddMode::Test {
            self.bounds = Some(candidate);
        }
        Ok(())
    }

    /// Whether any tile of `station` remains in the inclusive rectangle.
    ///
    /// Tunnel/bridge entrances count: they can carry a station association even
    /// though they are not station tiles.
    pub fn scan_for_station_tiles(
        grid: &TileGrid,
        station: StationId,
        left: u32,
        top: u32,
        right: u32,
        bottom: u32,
    ) -> bool {
        TileArea::from_corners(TilePos::new(left, top), TilePos::new(right, bottom))
            .iter()
            .any(|pos| match *grid.facet(pos) {
                TileFacet::Station { station: st, .. } => st == station,
                TileFacet::TunnelBridge { station: st, .. } => st == Some(station),
                _ => false,
            })
    }

    /// Shrink the rectangle after the tile at `pos` has been removed from the
    /// grid. Returns `true` when the footprint is now empty.
    pub fn after_remove_tile(&mut self, grid: &TileGrid, station: StationId, pos: TilePos) -> bool {
        let Some(mut b) = self.bounds else {
            return true;
        };
        let (mut x, mut y) = (pos.x, pos.y);

        loop {
            let left_edge = x == b.left;
            let right_edge = x == b.right;
            let top_edge = y == b.top;
            let bottom_edge = y == b.bottom;

            let reduce_x = (left_edge || right_edge)
                && !Self::scan_for_station_tiles(grid, station, x, b.top, x, b.bottom);
            let reduce_y = (top_edge || bottom_edge)
                && !Self::scan_for_station_tiles(grid, station, b.left, y, b.right, y);
            if !(reduce_x || reduce_y) {
                break;
            }

            // `x - 1` only happens when x is the right edge but not the left,
            // so x > left >= 0. Same for y.
            if reduce_x {
                if left_edge {
                    x += 1;
                    b.left = x;
                } else {
                    x -= 1;
                    b.right = x;
                }
            }
            if reduce_y {
                if top_edge {
                    y += 1;
                    b.top = y;
                } else {
                    y -= 1;
                    b.bottom = y;
                }
            }

            if b.left > b.right || b.top > b.bottom {
                self.bounds = None;
                return true;
            }
        }

        self.bounds = Some(b);
        false
    }

    /// [`Self::after_remove_tile`] for both opposite corners of a removed area.
    pub fn after_remove_rect(&mut self, grid: &TileGrid, station: StationId, area: TileArea) -> bool {
        debug_assert!(self.is_empty() || self.pt_in_extended_rect(area.tile, 0));
        debug_assert!(self.is_empty() || self.pt_in_extended_rect(area.end(), 0));

        let mut empty = self.after_remove_tile(grid, station, area.tile);
        if area.w != 1 || area.h != 1 {
            empty = self.after_remove_tile(grid, station, area.end()) || empty;
        }
        empty
    }
}
