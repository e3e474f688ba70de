//! Full-grid tile layers
//!
//! A [`TileLayer`] covers every tile of a single zoom level. It is built in one
//! synchronous pass: the grid is walked x-major then y, every tile gets its URL
//! from the resolver, a texture request is issued without waiting on it, and a
//! quad is placed at the tile's grid offset. The layer never changes shape
//! afterwards; switching zoom means building a new layer and detaching the old
//! one.

use nalgebra::Point3;

use crate::{
    core::geo::{TileCoord, Zoom},
    prelude::Arc,
    rendering::{
        geometry::QuadGeometry,
        material::{Appearance, Material},
        scene::{LayerId, SceneContainer},
    },
    tiles::{
        loader::TextureLoader,
        source::{LayerKind, TileAddressResolver, TileSource},
        texture::{TextureHandle, TextureState},
    },
};

/// One textured quad of the map.
#[derive(Debug)]
pub struct Tile {
    coord: TileCoord,
    position: Point3<f32>,
    url: String,
    geometry: Arc<QuadGeometry>,
    material: Material,
}

impl Tile {
    pub fn new(
        coord: TileCoord,
        url: String,
        geometry: Arc<QuadGeometry>,
        texture: TextureHandle,
    ) -> Self {
        Self {
            coord,
            position: coord.world_position(),
            url,
            geometry,
            material: Material::new(texture),
        }
    }

    pub fn coord(&self) -> TileCoord {
        self.coord
    }

    pub fn position(&self) -> Point3<f32> {
        self.position
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    pub fn geometry(&self) -> &QuadGeometry {
        &self.geometry
    }

    pub fn material(&self) -> &Material {
        &self.material
    }

    pub fn appearance(&self) -> Appearance {
        self.material.appearance()
    }

    /// Axis-aligned (min, max) world bounds of the quad.
    pub fn footprint(&self) -> (Point3<f32>, Point3<f32>) {
        self.geometry.footprint(&self.position)
    }
}

/// Texture load counts for a layer.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LoadProgress {
    pub pending: usize,
    pub ready: usize,
    pub failed: usize,
}

impl LoadProgress {
    pub fn total(&self) -> usize {
        self.pending + self.ready + self.failed
    }

    /// No load is outstanding.
    pub fn is_settled(&self) -> bool {
        self.pending == 0
    }
}

/// All tiles of one zoom level, in grid enumeration order.
#[derive(Debug)]
pub struct TileLayer {
    id: LayerId,
    name: String,
    kind: LayerKind,
    zoom: Zoom,
    tiles: Vec<Tile>,
    visible: bool,
    z_index: i32,
}

impl TileLayer {
    /// Builds every tile for `zoom`. Never blocks on texture loads.
    ///
    /// `id` tags the layer's texture requests and should come from
    /// [`SceneContainer::reserve_id`] of the container it will join.
    pub fn build(
        id: LayerId,
        source: &dyn TileSource,
        loader: &dyn TextureLoader,
        geometry: &Arc<QuadGeometry>,
        zoom: Zoom,
    ) -> Self {
        let mut tiles = Vec::with_capacity(zoom.grid_size());

        for coord in zoom.coords() {
            let url = source.url(coord);
            let texture = loader.request(id, coord, url.clone());
            tiles.push(Tile::new(coord, url, geometry.clone(), texture));
        }

        let kind = source.kind();
        log::info!(
            "built {} {} layer at zoom {} with {} tiles",
            id,
            kind,
            zoom,
            tiles.len()
        );

        Self {
            id,
            name: format!("{}-z{}", kind, zoom),
            kind,
            zoom,
            tiles,
            visible: true,
            z_index: 0,
        }
    }

    pub fn id(&self) -> LayerId {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn kind(&self) -> LayerKind {
        self.kind
    }

    pub fn zoom(&self) -> Zoom {
        self.zoom
    }

    pub fn tiles(&self) -> &[Tile] {
        &self.tiles
    }

    pub fn len(&self) -> usize {
        self.tiles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tiles.is_empty()
    }

    /// Looks a tile up by coordinate using the x-major layout.
    pub fn tile(&self, coord: TileCoord) -> Option<&Tile> {
        if coord.z != self.zoom.level() || !coord.is_valid() {
            return None;
        }
        let index = coord.x as usize * self.zoom.tile_count() as usize + coord.y as usize;
        self.tiles.get(index)
    }

    pub fn positions(&self) -> Vec<Point3<f32>> {
        self.tiles.iter().map(Tile::position).collect()
    }

    pub fn progress(&self) -> LoadProgress {
        self.tiles
            .iter()
            .fold(LoadProgress::default(), |mut progress, tile| {
                match tile.material.texture().state() {
                    TextureState::Pending => progress.pending += 1,
                    TextureState::Ready(_) => progress.ready += 1,
                    TextureState::Failed(_) => progress.failed += 1,
                }
                progress
            })
    }

    pub fn is_visible(&self) -> bool {
        self.visible
    }

    pub fn set_visible(&mut self, visible: bool) {
        self.visible = visible;
    }

    pub fn z_index(&self) -> i32 {
        self.z_index
    }

    /// Takes effect in a scene after `Scene::update_render_order`.
    pub fn set_z_index(&mut self, z_index: i32) {
        self.z_index = z_index;
    }

    pub fn set_opacity(&mut self, opacity: f32) {
        for tile in &mut self.tiles {
            tile.material.set_opacity(opacity);
        }
    }
}

/// Validates the request, builds the layer and hands it to `container`.
///
/// An unknown `layer_type` or out-of-range `zoom` fails before any tile is
/// created or any texture is requested.
pub fn build_tile_layer<C: SceneContainer + ?Sized>(
    container: &mut C,
    loader: &dyn TextureLoader,
    geometry: &Arc<QuadGeometry>,
    access_key: &str,
    layer_type: &str,
    zoom: i64,
    max_zoom: u8,
) -> crate::Result<LayerId> {
    let resolver = TileAddressResolver::for_tag(layer_type, access_key)?;
    let zoom = Zoom::new(zoom, max_zoom)?;
    let id = container.reserve_id();
    Ok(container.attach(TileLayer::build(id, &resolver, loader, geometry, zoom)))
}
