//! Vertex layout of chunk meshes.
//!
//! Positions are integer offsets from the chunk origin in world units; the draw
//! uniforms carry the origin, so a mesh never needs rebuilding when the world
//! is shifted.

use cgmath::Point3;

use crate::engine_state::voxels::block::{block_side::BlockSide, BlockId};

#[repr(C)]
#[derive(Copy, Clone, Debug, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct Vertex {
    x: i32,
    y: i32,
    z: i32,
    block_id: u32,
    side: u32,
    /// Index of the voxel in its chunk, compared against the selected index
    voxel_index: u32,
    tex_coords: [f32; 2],
}

impl Vertex {
    pub fn new(pos: Point3<i32>, block_id: BlockId, side: BlockSide, u: f32, v: f32, voxel_index: u32) -> Self {
        Vertex {
            x: pos.x,
            y: pos.y,
            z: pos.z,
            block_id: block_id as u32,
            side: side as u32,
            voxel_index,
            tex_coords: [u, v],
        }
    }

    pub fn position(&self) -> Point3<i32> {
        Point3::new(self.x, self.y, self.z)
    }

    pub fn block_id(&self) -> BlockId {
        self.block_id as BlockId
    }

    pub fn voxel_index(&self) -> u32 {
        self.voxel_index
    }

    pub fn side(&self) -> Option<BlockSide> {
        BlockSide::from_index(self.side)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_vertex_is_tightly_packed() {
        assert_eq!(std::mem::size_of::<Vertex>(), 32);
        let vertex = Vertex::new(Point3::new(1, 2, 3), 4, BlockSide::TOP, 0.0, 1.0, 9);
        let bytes: &[u8] = bytemuck::bytes_of(&vertex);
        assert_eq!(bytes.len(), 32);
        assert_eq!(vertex.side(), Some(BlockSide::TOP));
    }
}
