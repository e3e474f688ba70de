pub mod loader;
pub mod source;
pub mod texture;

// Re-exports for convenience
pub use loader::{HttpFetcher, TextureLoader, TileEvent, TileFetcher, TileLoader, TileLoaderConfig};
pub use source::{resolve_url, LayerKind, ShardPolicy, TileAddressResolver, TileSource, UrlTemplate};
pub use texture::{Texture, TextureCompleter, TextureHandle, TextureState};
