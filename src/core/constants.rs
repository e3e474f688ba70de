//! Core constants for tile addressing and grid placement.
//! Keeping them in a single place makes it easier to tweak engine-wide magic numbers.

/// Zoom level used when the host does not pick one.
pub const DEFAULT_ZOOM: u8 = 5;

/// Default upper zoom bound for a full-grid layer (4^8 = 65 536 tiles).
pub const DEFAULT_MAX_ZOOM: u8 = 8;

/// Hard ceiling for any configured max zoom. A full grid at this level is
/// already 4^10 = 1 048 576 tiles.
pub const MAX_GRID_ZOOM: u8 = 10;

/// Host serving the tianditu `DataServer` endpoint.
pub const TIANDITU_HOST: &str = "tianditu.gov.cn";

/// tianditu exposes shards `t0` through `t7`.
pub const TIANDITU_SHARD_COUNT: u8 = 8;

/// Shard used when no load distribution is requested.
pub const DEFAULT_SHARD: u8 = 1;

/// Side length of a tile quad in world units.
pub const TILE_WORLD_SIZE: f32 = 1.0;
