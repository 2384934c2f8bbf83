//! Per-side vertex and index buffers for one chunk layer.

use crate::engine_state::{rendering::Vertex, voxels::block::block_side::BlockSide};

use super::face::Face;

#[derive(Debug, Clone)]
pub struct MeshSide {
    pub vertices: Vec<Vertex>,
    pub indices: Vec<u32>,
    /// Number of indices
    pub len: u32,
    pub side: BlockSide,
}

impl MeshSide {
    pub fn new(side: BlockSide) -> Self {
        MeshSide {
            vertices: Vec::new(),
            indices: Vec::new(),
            len: 0,
            side,
        }
    }

    pub fn quad_count(&self) -> usize {
        self.vertices.len() / 4
    }
}

/// Geometry split by block side, in [`BlockSide::all`] order.
#[derive(Debug, Clone)]
pub struct Mesh {
    pub mesh: [MeshSide; 6],
}

impl Default for Mesh {
    fn default() -> Self {
        Self::new()
    }
}

impl Mesh {
    pub fn new() -> Self {
        Mesh {
            mesh: BlockSide::all().map(MeshSide::new),
        }
    }

    /// Appends one face to the buffer of its side.
    pub fn add_face(&mut self, face: &Face, voxel_index: u32) {
        let side = &mut self.mesh[face.block_side as usize];
        let faces_so_far = side.quad_count() as u32;
        side.vertices
            .extend(Mesh::generate_face_vertices(face, voxel_index));
        side.indices
            .extend(Mesh::generate_face_indices(faces_so_far));
        side.len = side.indices.len() as u32;
    }

    pub fn side(&self, side: BlockSide) -> &MeshSide {
        &self.mesh[side as usize]
    }

    pub fn quad_count(&self) -> usize {
        self.mesh.iter().map(MeshSide::quad_count).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.mesh.iter().all(|side| side.vertices.is_empty())
    }

    pub fn generate_face_vertices(face: &Face, voxel_index: u32) -> [Vertex; 4] {
        let size = face.size() as f32;
        [
            Vertex::new(face.ll, face.block_id, face.block_side, 0.0, size, voxel_index),
            Vertex::new(face.lr, face.block_id, face.block_side, size, size, voxel_index),
            Vertex::new(face.ul, face.block_id, face.block_side, 0.0, 0.0, voxel_index),
            Vertex::new(face.ur, face.block_id, face.block_side, size, 0.0, voxel_index),
        ]
    }

    pub fn generate_face_indices(num_faces_generated: u32) -> [u32; 6] {
        let base = num_faces_generated * 4;
        [base, base + 1, base + 3, base, base + 3, base + 2]
    }

    pub fn get_vertex_lens(&self) -> [u64; 6] {
        self.mesh.each_ref().map(|side| side.vertices.len() as u64)
    }
}
