//! Caller-owned scene state
//!
//! The host creates one [`SceneContext`] with [`SceneContext::init`], builds
//! and removes tile layers through it, drains load events from its frame loop
//! and finally calls [`SceneContext::teardown`]. Nothing here is global.

use crossbeam_channel::Receiver;

use crate::{
    core::{config::SceneConfig, geo::Zoom},
    layers::tile::TileLayer,
    prelude::Arc,
    rendering::{
        geometry::QuadGeometry,
        scene::{LayerId, Scene, SceneContainer},
    },
    tiles::{
        loader::{TextureLoader, TileEvent, TileLoader},
        source::LayerKind,
    },
    Result,
};

pub struct SceneContext {
    config: SceneConfig,
    scene: Scene,
    loader: Arc<dyn TextureLoader>,
    events: Option<Receiver<TileEvent>>,
    geometry: Arc<QuadGeometry>,
}

impl SceneContext {
    /// HTTP-backed context on the current tokio runtime.
    pub fn init(config: SceneConfig) -> Result<Self> {
        let loader = TileLoader::http(config.loader.clone())?;
        Self::with_tile_loader(config, loader)
    }

    /// Context using `loader`, forwarding its completion events.
    pub fn with_tile_loader(config: SceneConfig, loader: TileLoader) -> Result<Self> {
        let events = loader.events().clone();
        let mut context = Self::with_loader(config, Arc::new(loader))?;
        context.events = Some(events);
        Ok(context)
    }

    /// Context using any texture loader. No events are available.
    pub fn with_loader(config: SceneConfig, loader: Arc<dyn TextureLoader>) -> Result<Self> {
        config.validate()?;
        log::debug!("scene context ready (max zoom {})", config.max_zoom);
        Ok(Self {
            config,
            scene: Scene::new(),
            loader,
            events: None,
            geometry: Arc::new(QuadGeometry::unit()),
        })
    }

    /// Builds the full grid for `zoom` and attaches it to the scene.
    ///
    /// `layer_type` and `zoom` are validated before any tile exists or any
    /// texture is requested.
    pub fn build_tile_layer(
        &mut self,
        access_key: &str,
        layer_type: &str,
        zoom: i64,
    ) -> Result<LayerId> {
        let kind: LayerKind = layer_type.parse()?;
        let zoom = Zoom::new(zoom, self.config.max_zoom)?;
        let resolver = self.config.resolver(kind, access_key);

        let id = self.scene.reserve_id();
        let layer = TileLayer::build(id, &resolver, self.loader.as_ref(), &self.geometry, zoom);
        self.scene.attach(layer);
        log::info!("attached {} ({} layers in scene)", id, self.scene.len());
        Ok(id)
    }

    /// Builds the layer described by the config.
    pub fn build_default_layer(&mut self) -> Result<LayerId> {
        let access_key = self.config.access_key.clone();
        let kind = self.config.layer;
        let zoom = i64::from(self.config.zoom);
        self.build_tile_layer(&access_key, kind.code(), zoom)
    }

    /// Detaches and drops a layer, cancelling its outstanding loads.
    pub fn remove_layer(&mut self, id: LayerId) -> bool {
        match self.scene.detach(id) {
            Some(layer) => {
                log::info!("removed {} ({} tiles)", id, layer.len());
                true
            }
            None => false,
        }
    }

    /// Swaps `old` for a freshly built layer, e.g. after a zoom change. The
    /// old layer is kept if the new one cannot be built.
    pub fn replace_layer(
        &mut self,
        old: LayerId,
        access_key: &str,
        layer_type: &str,
        zoom: i64,
    ) -> Result<LayerId> {
        let id = self.build_tile_layer(access_key, layer_type, zoom)?;
        self.remove_layer(old);
        Ok(id)
    }

    /// Drains completion events without blocking.
    ///
    /// Events of layers that are no longer in the scene are dropped.
    pub fn poll_events(&self) -> Vec<TileEvent> {
        let Some(events) = &self.events else {
            return Vec::new();
        };

        let mut live = Vec::new();
        let mut stale = 0usize;
        for event in events.try_iter() {
            if !self.scene.contains(event.layer()) {
                stale += 1;
                continue;
            }
            if let TileEvent::Failed {
                layer,
                coord,
                reason,
                ..
            } = &event
            {
                log::warn!("tile {} of {} rendered without imagery: {}", coord, layer, reason);
            }
            live.push(event);
        }
        if stale > 0 {
            log::debug!("dropped {} events of removed layers", stale);
        }
        live
    }

    pub fn events(&self) -> Option<&Receiver<TileEvent>> {
        self.events.as_ref()
    }

    pub fn layer(&self, id: LayerId) -> Option<&TileLayer> {
        self.scene.layer(id)
    }

    pub fn scene(&self) -> &Scene {
        &self.scene
    }

    pub fn scene_mut(&mut self) -> &mut Scene {
        &mut self.scene
    }

    pub fn geometry(&self) -> &Arc<QuadGeometry> {
        &self.geometry
    }

    pub fn config(&self) -> &SceneConfig {
        &self.config
    }

    /// Releases every layer and the loader.
    pub fn teardown(mut self) {
        log::info!(
            "tearing down scene: {} layers, {} tiles",
            self.scene.len(),
            self.scene.tile_count()
        );
        self.scene.clear();
    }
}
