use nalgebra::Point3;
use serde::{Deserialize, Serialize};

use crate::{constants::MAX_GRID_ZOOM, MapError, Result};

/// Validated zoom level for a full-grid tile layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "i64", into = "u8")]
pub struct Zoom(u8);

impl Zoom {
    /// Checks `zoom` against `0..=max` before anything is allocated for it.
    /// `max` is capped at [`MAX_GRID_ZOOM`].
    pub fn new(zoom: i64, max: u8) -> Result<Self> {
        let max = max.min(MAX_GRID_ZOOM);
        if zoom < 0 || zoom > i64::from(max) {
            return Err(MapError::InvalidZoom { zoom, max });
        }
        Ok(Self(zoom as u8))
    }

    pub fn level(self) -> u8 {
        self.0
    }

    /// Tiles per axis at this zoom (`2^zoom`).
    pub fn tile_count(self) -> u32 {
        1u32 << self.0
    }

    /// Total number of tiles in the grid (`4^zoom`).
    pub fn grid_size(self) -> usize {
        let count = self.tile_count() as usize;
        count * count
    }

    /// All coordinates of the grid, x-major then y.
    pub fn coords(self) -> impl Iterator<Item = TileCoord> {
        let count = self.tile_count();
        let z = self.0;
        (0..count).flat_map(move |x| (0..count).map(move |y| TileCoord { x, y, z }))
    }
}

impl TryFrom<i64> for Zoom {
    type Error = MapError;

    fn try_from(zoom: i64) -> Result<Self> {
        Self::new(zoom, MAX_GRID_ZOOM)
    }
}

impl From<Zoom> for u8 {
    fn from(zoom: Zoom) -> u8 {
        zoom.0
    }
}

impl std::fmt::Display for Zoom {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Tile coordinates in the standard web map tile system
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TileCoord {
    pub x: u32,
    pub y: u32,
    pub z: u8,
}

impl TileCoord {
    pub fn new(x: u32, y: u32, z: u8) -> Self {
        Self { x, y, z }
    }

    /// Tiles per axis at this coordinate's zoom, 0 if that does not fit a `u32`.
    pub fn tile_count(&self) -> u32 {
        1u32.checked_shl(u32::from(self.z)).unwrap_or(0)
    }

    /// Checks if the tile coordinates are valid for the zoom level
    pub fn is_valid(&self) -> bool {
        self.x < self.tile_count() && self.y < self.tile_count()
    }

    /// Like [`is_valid`](Self::is_valid) but reports why.
    pub fn validate(&self) -> Result<()> {
        if self.is_valid() {
            Ok(())
        } else {
            Err(MapError::InvalidCoordinates(format!(
                "tile {} is outside the {}x{} grid",
                self,
                self.tile_count(),
                self.tile_count()
            )))
        }
    }

    /// Integer grid offset of the tile's centre from the world origin.
    ///
    /// The half width is computed with integer division, so the single tile
    /// of zoom 0 sits on the origin. Row 0 is the top of the map, so rows grow
    /// towards negative world Y.
    pub fn grid_offset(&self) -> (i64, i64) {
        let half = i64::from(self.tile_count() / 2);
        (i64::from(self.x) - half, half - i64::from(self.y))
    }

    /// World-space position of the tile quad (`z` is always 0).
    pub fn world_position(&self) -> Point3<f32> {
        let (x, y) = self.grid_offset();
        Point3::new(x as f32, y as f32, 0.0)
    }
}

impl std::fmt::Display for TileCoord {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}/{}", self.z, self.x, self.y)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_zoom_bounds() {
        assert!(Zoom::new(0, 8).is_ok());
        assert!(Zoom::new(8, 8).is_ok());
        assert!(matches!(
            Zoom::new(-1, 8),
            Err(MapError::InvalidZoom { zoom: -1, max: 8 })
        ));
        assert!(matches!(Zoom::new(9, 8), Err(MapError::InvalidZoom { .. })));
        assert!(Zoom::try_from(40i64).is_err());
        assert!(Zoom::new(11, 255).is_err());
    }

    #[test]
    fn test_grid_enumeration_order() {
        let zoom = Zoom::new(1, 8).unwrap();
        let coords: Vec<_> = zoom.coords().map(|c| (c.x, c.y)).collect();
        assert_eq!(coords, vec![(0, 0), (0, 1), (1, 0), (1, 1)]);
        assert_eq!(zoom.grid_size(), 4);
    }

    #[test]
    fn test_world_position() {
        assert_eq!(TileCoord::new(0, 0, 0).world_position(), Point3::new(0.0, 0.0, 0.0));
        assert_eq!(TileCoord::new(0, 0, 1).world_position(), Point3::new(-1.0, 1.0, 0.0));
        assert_eq!(TileCoord::new(1, 1, 1).world_position(), Point3::new(0.0, 0.0, 0.0));
        assert_eq!(TileCoord::new(31, 0, 5).grid_offset(), (15, 16));
    }

    #[test]
    fn test_tile_coord_validity() {
        assert!(TileCoord::new(3, 3, 2).is_valid());
        assert!(!TileCoord::new(4, 0, 2).is_valid());
        assert!(TileCoord::new(0, 4, 2).validate().is_err());
        assert!(!TileCoord::new(0, 0, 40).is_valid());
        assert_eq!(TileCoord::new(5, 2, 5).to_string(), "5/5/2");
    }
}
