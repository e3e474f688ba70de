pub mod context;
pub mod geometry;
pub mod material;
pub mod scene;

pub use context::SceneContext;
pub use geometry::{QuadGeometry, TileVertex};
pub use material::{Appearance, Material};
pub use scene::{LayerId, Scene, SceneContainer};
