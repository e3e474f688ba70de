//! Prelude module for common tilescene types and traits
//!
//! This module re-exports the most commonly used types, traits, and functions
//! for easy importing with `use tilescene::prelude::*;`

pub use crate::core::{
    config::SceneConfig,
    geo::{TileCoord, Zoom},
};

pub use crate::layers::tile::{Tile, TileLayer};

pub use crate::rendering::{
    context::SceneContext,
    geometry::QuadGeometry,
    material::{Appearance, Material},
    scene::{LayerId, Scene, SceneContainer},
};

pub use crate::tiles::{
    loader::{TextureLoader, TileEvent, TileFetcher, TileLoader, TileLoaderConfig},
    source::{LayerKind, ShardPolicy, TileAddressResolver, TileSource},
    texture::{Texture, TextureHandle, TextureState},
};

pub use crate::runtime::{AsyncHandle, AsyncSpawner};

pub use crate::{Error as MapError, Result};

pub use std::{
    pin::Pin,
    sync::{Arc, Mutex},
    time::Duration,
};

pub use fxhash::{FxHashMap as HashMap, FxHashSet as HashSet};

pub use futures::Future;
