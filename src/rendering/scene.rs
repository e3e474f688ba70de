use serde::{Deserialize, Serialize};

use crate::layers::tile::TileLayer;
use crate::prelude::HashMap;

/// Handle to a layer attached to a scene.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct LayerId(u64);

impl LayerId {
    pub const fn new(raw: u64) -> Self {
        Self(raw)
    }

    pub fn raw(self) -> u64 {
        self.0
    }
}

impl std::fmt::Display for LayerId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "layer#{}", self.0)
    }
}

/// Anything that can take ownership of a tile layer and give it back.
///
/// A layer is built with an id from [`reserve_id`](Self::reserve_id) so its
/// load events are tagged before it is attached.
pub trait SceneContainer {
    fn reserve_id(&mut self) -> LayerId;

    fn attach(&mut self, layer: TileLayer) -> LayerId;

    fn detach(&mut self, id: LayerId) -> Option<TileLayer>;
}

/// Owns the layers of a scene, handling ordering and lookup
#[derive(Debug, Default)]
pub struct Scene {
    /// All layers indexed by ID
    layers: HashMap<LayerId, TileLayer>,
    /// Ordered list of layer IDs for rendering (sorted by z-index)
    render_order: Vec<LayerId>,
    next_id: u64,
}

impl Scene {
    pub fn new() -> Self {
        Self::default()
    }

    /// Gets a reference to a layer by ID
    pub fn layer(&self, id: LayerId) -> Option<&TileLayer> {
        self.layers.get(&id)
    }

    pub fn layer_mut(&mut self, id: LayerId) -> Option<&mut TileLayer> {
        self.layers.get_mut(&id)
    }

    pub fn contains(&self, id: LayerId) -> bool {
        self.layers.contains_key(&id)
    }

    /// Layer IDs in render order
    pub fn layer_ids(&self) -> &[LayerId] {
        &self.render_order
    }

    /// Gets all layers in render order
    pub fn layers(&self) -> impl Iterator<Item = (LayerId, &TileLayer)> {
        self.render_order
            .iter()
            .filter_map(|id| self.layers.get(id).map(|layer| (*id, layer)))
    }

    /// Visible layers in render order, the host's per-frame draw list.
    pub fn visible_layers(&self) -> impl Iterator<Item = (LayerId, &TileLayer)> {
        self.layers().filter(|(_, layer)| layer.is_visible())
    }

    /// Total tiles across all layers
    pub fn tile_count(&self) -> usize {
        self.layers.values().map(TileLayer::len).sum()
    }

    /// Updates the render order based on current z-indices
    pub fn update_render_order(&mut self) {
        let layers = &self.layers;
        self.render_order.sort_by_key(|id| {
            let z = layers.get(id).map(|l| l.z_index()).unwrap_or(0);
            (z, *id)
        });
    }

    /// Drops every layer, releasing their tiles and pending loads.
    pub fn clear(&mut self) {
        self.render_order.clear();
        self.layers.clear();
    }

    /// Gets the number of layers
    pub fn len(&self) -> usize {
        self.layers.len()
    }

    /// Checks if the scene is empty
    pub fn is_empty(&self) -> bool {
        self.layers.is_empty()
    }
}

impl SceneContainer for Scene {
    fn reserve_id(&mut self) -> LayerId {
        let id = LayerId(self.next_id);
        self.next_id += 1;
        id
    }

    fn attach(&mut self, layer: TileLayer) -> LayerId {
        let id = layer.id();
        let z_index = layer.z_index();

        if self.layers.insert(id, layer).is_some() {
            self.render_order.retain(|other| *other != id);
        }

        // Insert in sorted order by z-index
        let insert_pos = self
            .render_order
            .iter()
            .position(|other| {
                self.layers
                    .get(other)
                    .map(|l| l.z_index() > z_index)
                    .unwrap_or(false)
            })
            .unwrap_or(self.render_order.len());
        self.render_order.insert(insert_pos, id);

        id
    }

    fn detach(&mut self, id: LayerId) -> Option<TileLayer> {
        self.render_order.retain(|other| *other != id);
        self.layers.remove(&id)
    }
}
