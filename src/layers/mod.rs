pub mod tile;

pub use tile::{build_tile_layer, LoadProgress, Tile, TileLayer};
