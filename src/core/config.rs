//! Scene configuration
//!
//! Settings can come from JSON (file or string) and be overridden from the
//! environment. Everything has a default, so an empty JSON object is valid.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::{
    constants::{DEFAULT_MAX_ZOOM, DEFAULT_ZOOM, MAX_GRID_ZOOM, TIANDITU_HOST},
    tiles::{
        loader::TileLoaderConfig,
        source::{LayerKind, ShardPolicy, TileAddressResolver},
    },
    MapError, Result,
};

pub const ENV_ACCESS_KEY: &str = "TILESCENE_ACCESS_KEY";
pub const ENV_LAYER: &str = "TILESCENE_LAYER";
pub const ENV_ZOOM: &str = "TILESCENE_ZOOM";
pub const ENV_MAX_ZOOM: &str = "TILESCENE_MAX_ZOOM";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SceneConfig {
    /// Tile service credential (`tk` parameter)
    pub access_key: String,
    /// Layer built by `SceneContext::build_default_layer`
    pub layer: LayerKind,
    pub zoom: u8,
    /// Largest zoom a full-grid layer may be built at
    pub max_zoom: u8,
    pub tile_host: String,
    pub shards: ShardPolicy,
    pub loader: TileLoaderConfig,
}

impl Default for SceneConfig {
    fn default() -> Self {
        Self {
            access_key: String::new(),
            layer: LayerKind::Vector,
            zoom: DEFAULT_ZOOM,
            max_zoom: DEFAULT_MAX_ZOOM,
            tile_host: TIANDITU_HOST.to_string(),
            shards: ShardPolicy::default(),
            loader: TileLoaderConfig::default(),
        }
    }
}

impl SceneConfig {
    pub fn from_json_str(json: &str) -> Result<Self> {
        let value: serde_json::Value = serde_json::from_str(json)?;
        // Same error as TILESCENE_LAYER for an unknown tag
        if let Some(tag) = value.get("layer").and_then(serde_json::Value::as_str) {
            tag.parse::<LayerKind>()?;
        }
        let config: Self = serde_json::from_value(value)?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let json = std::fs::read_to_string(path)?;
        Self::from_json_str(&json)
    }

    /// Applies `TILESCENE_*` overrides from the process environment.
    pub fn with_env(self) -> Result<Self> {
        self.with_overrides(std::env::vars())
    }

    /// Applies `TILESCENE_*` overrides from `vars`; other keys are ignored.
    pub fn with_overrides<I, K, V>(mut self, vars: I) -> Result<Self>
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: AsRef<str>,
    {
        for (key, value) in vars {
            let value = value.as_ref();
            match key.as_ref() {
                ENV_ACCESS_KEY => self.access_key = value.to_string(),
                ENV_LAYER => self.layer = value.parse()?,
                ENV_ZOOM => self.zoom = parse_zoom(ENV_ZOOM, value)?,
                ENV_MAX_ZOOM => self.max_zoom = parse_zoom(ENV_MAX_ZOOM, value)?,
                _ => {}
            }
        }
        self.validate()?;
        Ok(self)
    }

    pub fn validate(&self) -> Result<()> {
        if self.max_zoom > MAX_GRID_ZOOM {
            return Err(MapError::Config(format!(
                "max_zoom {} exceeds the supported ceiling {}",
                self.max_zoom, MAX_GRID_ZOOM
            )));
        }
        if self.zoom > self.max_zoom {
            return Err(MapError::InvalidZoom {
                zoom: i64::from(self.zoom),
                max: self.max_zoom,
            });
        }
        if self.tile_host.trim().is_empty() {
            return Err(MapError::Config("tile_host must not be empty".to_string()));
        }
        Ok(())
    }

    /// Resolver for `kind` using this config's host and shard policy.
    pub fn resolver(&self, kind: LayerKind, access_key: &str) -> TileAddressResolver {
        TileAddressResolver::with_host(kind, access_key, &self.tile_host)
            .with_shard_policy(self.shards)
    }
}

fn parse_zoom(key: &str, value: &str) -> Result<u8> {
    value
        .trim()
        .parse()
        .map_err(|e| MapError::Config(format!("{}={}: {}", key, value, e)))
}
