//! Tile address resolution
//!
//! Turns a layer kind, access key and [`TileCoord`] into the URL a texture
//! loader can fetch. Templates are parsed once into literal and placeholder
//! segments and rendered in a single left-to-right pass, so a substituted
//! value is never scanned for placeholders again.

use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::{
    constants::{DEFAULT_SHARD, TIANDITU_HOST, TIANDITU_SHARD_COUNT},
    core::geo::TileCoord,
    MapError, Result,
};

/// Trait representing anything that can produce tile URLs for a given coordinate.
pub trait TileSource: Send + Sync {
    /// Basemap style of the tiles this source serves.
    fn kind(&self) -> LayerKind;

    /// Build a URL for the requested `coord`.
    fn url(&self, coord: TileCoord) -> String;
}

/// Basemap style served by the tile service.
///
/// Serialized as its wire code and parsed with [`FromStr`], so config files
/// accept the same tags as the host API.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum LayerKind {
    /// Vector line-art basemap (`vec`)
    Vector,
    /// Satellite imagery basemap (`img`)
    Imagery,
}

impl LayerKind {
    pub const ALL: [LayerKind; 2] = [LayerKind::Vector, LayerKind::Imagery];

    /// Layer code used in the `T=<code>_w` query parameter.
    pub fn code(self) -> &'static str {
        match self {
            LayerKind::Vector => "vec",
            LayerKind::Imagery => "img",
        }
    }
}

impl std::fmt::Display for LayerKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.code())
    }
}

impl FromStr for LayerKind {
    type Err = MapError;

    fn from_str(tag: &str) -> Result<Self> {
        match tag.trim().to_ascii_lowercase().as_str() {
            "vec" | "vector" => Ok(LayerKind::Vector),
            "img" | "image" | "imagery" => Ok(LayerKind::Imagery),
            _ => Err(MapError::UnknownLayerType(tag.to_string())),
        }
    }
}

impl TryFrom<String> for LayerKind {
    type Error = MapError;

    fn try_from(tag: String) -> Result<Self> {
        tag.parse()
    }
}

impl From<LayerKind> for String {
    fn from(kind: LayerKind) -> String {
        kind.code().to_string()
    }
}

/// How the `{s}` shard subdomain is chosen for a tile.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "policy", rename_all = "snake_case")]
pub enum ShardPolicy {
    /// Always use the same shard.
    Fixed { shard: u8 },
    /// Spread tiles over `count` shards by `(x + y) % count`.
    RoundRobin { count: u8 },
}

impl ShardPolicy {
    pub fn select(&self, coord: TileCoord) -> u8 {
        match *self {
            ShardPolicy::Fixed { shard } => shard,
            // Guard against a zero shard count
            ShardPolicy::RoundRobin { count: 0 } => DEFAULT_SHARD,
            ShardPolicy::RoundRobin { count } => {
                ((u64::from(coord.x) + u64::from(coord.y)) % u64::from(count)) as u8
            }
        }
    }

    /// Round robin over every tianditu shard.
    pub fn tianditu_round_robin() -> Self {
        ShardPolicy::RoundRobin {
            count: TIANDITU_SHARD_COUNT,
        }
    }
}

impl Default for ShardPolicy {
    fn default() -> Self {
        ShardPolicy::Fixed {
            shard: DEFAULT_SHARD,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Placeholder {
    Shard,
    X,
    Y,
    Zoom,
    AccessKey,
}

impl Placeholder {
    fn parse(name: &str) -> Option<Self> {
        match name {
            "s" => Some(Placeholder::Shard),
            "x" => Some(Placeholder::X),
            "y" => Some(Placeholder::Y),
            "z" => Some(Placeholder::Zoom),
            "tk" => Some(Placeholder::AccessKey),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Segment {
    Literal(String),
    Placeholder(Placeholder),
}

/// A pre-parsed URL pattern with `{s}`, `{x}`, `{y}`, `{z}` and `{tk}` sites.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UrlTemplate {
    segments: Vec<Segment>,
}

impl UrlTemplate {
    pub fn parse(template: &str) -> Result<Self> {
        let mut segments = Vec::new();
        let mut rest = template;

        while let Some(open) = rest.find('{') {
            if open > 0 {
                segments.push(Segment::Literal(rest[..open].to_string()));
            }
            let after = &rest[open + 1..];
            let close = after.find('}').ok_or_else(|| {
                MapError::Config(format!("unclosed placeholder in template `{}`", template))
            })?;
            let name = &after[..close];
            let placeholder = Placeholder::parse(name).ok_or_else(|| {
                MapError::Config(format!(
                    "unknown placeholder `{{{}}}` in template `{}`",
                    name, template
                ))
            })?;
            segments.push(Segment::Placeholder(placeholder));
            rest = &after[close + 1..];
        }
        if !rest.is_empty() {
            segments.push(Segment::Literal(rest.to_string()));
        }

        Ok(Self { segments })
    }

    /// tianditu `DataServer` pattern for `kind` on `host`.
    pub fn data_server(kind: LayerKind, host: &str) -> Self {
        let literal = |text: String| Segment::Literal(text);
        Self {
            segments: vec![
                literal("https://t".to_string()),
                Segment::Placeholder(Placeholder::Shard),
                literal(format!(".{}/DataServer?T={}_w&x=", host, kind.code())),
                Segment::Placeholder(Placeholder::X),
                literal("&y=".to_string()),
                Segment::Placeholder(Placeholder::Y),
                literal("&l=".to_string()),
                Segment::Placeholder(Placeholder::Zoom),
                literal("&tk=".to_string()),
                Segment::Placeholder(Placeholder::AccessKey),
            ],
        }
    }

    /// Substitutes every placeholder in one pass.
    pub fn render(&self, coord: TileCoord, shard: u8, access_key: &str) -> String {
        use std::fmt::Write;

        let mut url = String::with_capacity(self.estimated_len() + access_key.len());
        for segment in &self.segments {
            // Writing into a String cannot fail
            let _ = match segment {
                Segment::Literal(text) => url.write_str(text),
                Segment::Placeholder(Placeholder::Shard) => write!(url, "{}", shard),
                Segment::Placeholder(Placeholder::X) => write!(url, "{}", coord.x),
                Segment::Placeholder(Placeholder::Y) => write!(url, "{}", coord.y),
                Segment::Placeholder(Placeholder::Zoom) => write!(url, "{}", coord.z),
                Segment::Placeholder(Placeholder::AccessKey) => url.write_str(access_key),
            };
        }
        url
    }

    fn estimated_len(&self) -> usize {
        self.segments
            .iter()
            .map(|segment| match segment {
                Segment::Literal(text) => text.len(),
                Segment::Placeholder(_) => 4,
            })
            .sum()
    }
}

impl FromStr for UrlTemplate {
    type Err = MapError;

    fn from_str(template: &str) -> Result<Self> {
        Self::parse(template)
    }
}

/// Resolves tile URLs for one layer kind and access key.
#[derive(Debug, Clone)]
pub struct TileAddressResolver {
    kind: LayerKind,
    access_key: String,
    template: UrlTemplate,
    shards: ShardPolicy,
}

impl TileAddressResolver {
    /// Resolver for the public tianditu service.
    pub fn new(kind: LayerKind, access_key: impl Into<String>) -> Self {
        Self::with_host(kind, access_key, TIANDITU_HOST)
    }

    /// Resolver for a string layer tag such as `"vec"` or `"img"`.
    pub fn for_tag(tag: &str, access_key: impl Into<String>) -> Result<Self> {
        Ok(Self::new(tag.parse()?, access_key))
    }

    /// Resolver for a `DataServer` endpoint on a different host.
    pub fn with_host(kind: LayerKind, access_key: impl Into<String>, host: &str) -> Self {
        Self {
            kind,
            access_key: access_key.into(),
            template: UrlTemplate::data_server(kind, host),
            shards: ShardPolicy::default(),
        }
    }

    /// Resolver with a caller-supplied template.
    pub fn with_template(
        kind: LayerKind,
        access_key: impl Into<String>,
        template: &str,
    ) -> Result<Self> {
        Ok(Self {
            kind,
            access_key: access_key.into(),
            template: UrlTemplate::parse(template)?,
            shards: ShardPolicy::default(),
        })
    }

    pub fn with_shard_policy(mut self, shards: ShardPolicy) -> Self {
        self.shards = shards;
        self
    }

    pub fn kind(&self) -> LayerKind {
        self.kind
    }

    pub fn access_key(&self) -> &str {
        &self.access_key
    }

    pub fn resolve(&self, coord: TileCoord) -> String {
        self.template
            .render(coord, self.shards.select(coord), &self.access_key)
    }
}

impl TileSource for TileAddressResolver {
    fn kind(&self) -> LayerKind {
        self.kind
    }

    fn url(&self, coord: TileCoord) -> String {
        self.resolve(coord)
    }
}

/// One-shot resolution from a string layer tag.
pub fn resolve_url(layer_type: &str, coord: TileCoord, access_key: &str) -> Result<String> {
    Ok(TileAddressResolver::for_tag(layer_type, access_key)?.resolve(coord))
}
