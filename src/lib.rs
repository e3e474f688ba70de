//! # tilescene
//!
//! Places a web map's raster tile grid in 3D world space.
//!
//! A [`TileLayer`] enumerates every tile of one zoom level, asks a
//! [`TileAddressResolver`] for each tile's URL, requests the tile texture
//! asynchronously and positions one unit quad per tile so that the grid is
//! centred on the origin. Layers are owned by a [`Scene`], which in turn lives
//! in a caller-owned [`SceneContext`].

pub mod core;
pub mod layers;
pub mod prelude;
pub mod rendering;
pub mod runtime;
pub mod tiles;
pub use crate::core::constants;

// Re-export public API
pub use crate::core::{
    config::SceneConfig,
    geo::{TileCoord, Zoom},
};

pub use layers::tile::{Tile, TileLayer};

pub use rendering::{
    context::SceneContext,
    geometry::QuadGeometry,
    material::{Appearance, Material},
    scene::{LayerId, Scene, SceneContainer},
};

pub use tiles::{
    loader::{TextureLoader, TileEvent, TileFetcher, TileLoader, TileLoaderConfig},
    source::{LayerKind, ShardPolicy, TileAddressResolver, TileSource, UrlTemplate},
    texture::{Texture, TextureHandle, TextureState},
};

/// Result type used throughout the library
pub type Result<T> = std::result::Result<T, MapError>;

/// Common error types
#[derive(Debug, thiserror::Error)]
pub enum MapError {
    #[error("Unknown layer type: {0}")]
    UnknownLayerType(String),

    #[error("Invalid zoom {zoom}: expected 0..={max}")]
    InvalidZoom { zoom: i64, max: u8 },

    #[error("Failed to load tile {coord}: {reason}")]
    TileLoad { coord: TileCoord, reason: String },

    #[error("Invalid coordinates: {0}")]
    InvalidCoordinates(String),

    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("Decode error: {0}")]
    Decode(#[from] image::ImageError),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Runtime error: {0}")]
    Runtime(String),
}

/// Error type alias for convenience
pub type Error = MapError;

/// Initialise `env_logger` once; later calls are ignored.
#[cfg(feature = "debug")]
pub fn init_logging() {
    let _ = env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .try_init();
}
