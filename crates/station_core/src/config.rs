pub const MAP_WIDTH: u32 = 256;
pub const MAP_HEIGHT: u32 = 256;

/// Default maximum side length of a station's bounding rectangle.
pub const DEFAULT_STATION_SPREAD: u32 = 12;
/// Hard upper bound for the configurable spread.
pub const MAX_STATION_SPREAD: u32 = 64;

// Catchment radii (in tiles) per facility type under the modified policy.
pub const CA_NONE: u32 = 0;
pub const CA_BUS: u32 = 3;
pub const CA_TRUCK: u32 = 3;
pub const CA_TRAIN: u32 = 4;
pub const CA_DOCK: u32 = 5;

/// Flat radius used for every facility when the modified policy is off.
pub const CA_UNMODIFIED: u32 = 4;

/// Largest base radius of any facility (the intercontinental airport). The
/// configured increase, up to [`MAX_CATCHMENT_INCREASE`], comes on top.
pub const MAX_CATCHMENT: u32 = 10;
pub const MAX_CATCHMENT_INCREASE: u32 = 5;

/// Infrastructure price unit applied to airport maintenance factors.
pub const AIRPORT_INFRASTRUCTURE_PRICE: i64 = 500;
