use bytemuck::{Pod, Zeroable};
use nalgebra::{Point3, Vector3};

use crate::constants::TILE_WORLD_SIZE;

/// Vertex layout of a tile quad: position (12) + texcoord (8).
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Pod, Zeroable)]
pub struct TileVertex {
    pub position: [f32; 3],
    pub tex_coords: [f32; 2],
}

/// Square plane in the XY plane, centred on its local origin.
///
/// One instance is shared by every tile of every layer; tiles only differ in
/// their translation and material.
#[derive(Debug, Clone, PartialEq)]
pub struct QuadGeometry {
    size: f32,
    vertices: [TileVertex; 4],
    indices: [u16; 6],
}

impl QuadGeometry {
    pub fn new(size: f32) -> Self {
        let h = size / 2.0;
        // Texture row 0 is the top of the tile image
        let vertices = [
            TileVertex {
                position: [-h, -h, 0.0],
                tex_coords: [0.0, 1.0],
            },
            TileVertex {
                position: [h, -h, 0.0],
                tex_coords: [1.0, 1.0],
            },
            TileVertex {
                position: [h, h, 0.0],
                tex_coords: [1.0, 0.0],
            },
            TileVertex {
                position: [-h, h, 0.0],
                tex_coords: [0.0, 0.0],
            },
        ];
        Self {
            size,
            vertices,
            indices: [0, 1, 2, 0, 2, 3],
        }
    }

    pub fn unit() -> Self {
        Self::new(TILE_WORLD_SIZE)
    }

    pub fn size(&self) -> f32 {
        self.size
    }

    pub fn vertices(&self) -> &[TileVertex] {
        &self.vertices
    }

    pub fn indices(&self) -> &[u16] {
        &self.indices
    }

    /// Raw vertex buffer contents for upload.
    pub fn vertex_bytes(&self) -> &[u8] {
        bytemuck::cast_slice(&self.vertices)
    }

    pub fn index_bytes(&self) -> &[u8] {
        bytemuck::cast_slice(&self.indices)
    }

    /// Axis-aligned (min, max) corners of the quad placed at `position`.
    pub fn footprint(&self, position: &Point3<f32>) -> (Point3<f32>, Point3<f32>) {
        let half = Vector3::new(self.size / 2.0, self.size / 2.0, 0.0);
        (*position - half, *position + half)
    }
}

impl Default for QuadGeometry {
    fn default() -> Self {
        Self::unit()
    }
}
