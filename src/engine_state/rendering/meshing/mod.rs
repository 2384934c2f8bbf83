//! Mesh generation for chunks.
//!
//! Converts the voxels of one chunk into quads, one per visible voxel side, split
//! into an opaque and a transparent sub-mesh. A side is hidden when the
//! neighbouring voxel is opaque, or when both voxels are the same transparent
//! block (no internal water faces). Sides on the chunk border are always emitted
//! since neighbouring chunks may be at a different level of detail.
//!
//! # Architecture
//! - [`build_chunk_mesh`]: Voxels to [`MeshGeometry`], on the CPU
//! - [`ChunkMesh`]: The uploaded result, owned exclusively by its chunk
//! - `mesh/`: Face and per-side buffer types
//!
//! # Performance Considerations
//! - Opacity is precomputed into a padded bit vector so neighbour tests never
//!   branch on the chunk border
//! - Building is single-threaded and bounded per frame by the renderer's budget

use bitvec::vec::BitVec;
use log::warn;

use crate::{
    engine_state::voxels::{
        block::{block_side::BlockSide, BlockRegistry, AIR},
        chunk::ChunkData,
    },
    error::Result,
};

use super::backend::{DrawUniforms, MeshHandle, MeshLayer, RenderBackend, RenderPass};

mod mesh;

pub use mesh::*;

/// CPU-side geometry of one chunk.
#[derive(Debug, Clone, Default)]
pub struct MeshGeometry {
    pub opaque: Mesh,
    pub transparent: Mesh,
}

impl MeshGeometry {
    pub fn quad_count(&self) -> usize {
        self.opaque.quad_count() + self.transparent.quad_count()
    }

    pub fn is_empty(&self) -> bool {
        self.opaque.is_empty() && self.transparent.is_empty()
    }
}

/// Builds the face-culled geometry of a chunk.
///
/// # Arguments
/// * `data` - Voxels of the chunk, at any voxel size
/// * `blocks` - Registry deciding which blocks are transparent
pub fn build_chunk_mesh(data: &ChunkData, blocks: &BlockRegistry) -> MeshGeometry {
    let grid = data.grid_size();
    let vs = data.voxel_size();
    let padded = grid + 2;
    let padded_index = |gx: i32, gy: i32, gz: i32| ((gx + 1) + (gz + 1) * padded + (gy + 1) * padded * padded) as usize;

    let mut opaque: BitVec = BitVec::repeat(false, (padded * padded * padded) as usize);
    for gy in 0..grid {
        for gz in 0..grid {
            for gx in 0..grid {
                let block = data.get_grid(gx, gy, gz).unwrap_or(AIR);
                if block != AIR && !blocks.is_transparent(block) {
                    opaque.set(padded_index(gx, gy, gz), true);
                }
            }
        }
    }

    let mut geometry = MeshGeometry::default();
    for gy in 0..grid {
        for gz in 0..grid {
            for gx in 0..grid {
                let block = data.get_grid(gx, gy, gz).unwrap_or(AIR);
                if block == AIR {
                    continue;
                }
                let transparent = blocks.is_transparent(block);
                let voxel_index = data.grid_index(gx, gy, gz) as u32;
                for side in BlockSide::all() {
                    let normal = side.normal();
                    let (nx, ny, nz) = (gx + normal.x, gy + normal.y, gz + normal.z);
                    if opaque[padded_index(nx, ny, nz)] {
                        continue;
                    }
                    if transparent && data.get_grid(nx, ny, nz) == Some(block) {
                        continue;
                    }
                    let face = Face::new(gx * vs, gy * vs, gz * vs, vs, block, side);
                    if transparent {
                        geometry.transparent.add_face(&face, voxel_index);
                    } else {
                        geometry.opaque.add_face(&face, voxel_index);
                    }
                }
            }
        }
    }
    geometry
}

/// An uploaded chunk mesh.
///
/// A mesh without a handle has no geometry at all: empty chunks are never
/// uploaded, but still count as meshed.
#[derive(Debug, Clone, PartialEq)]
pub struct ChunkMesh {
    handle: Option<MeshHandle>,
    opaque_quads: usize,
    transparent_quads: usize,
}

impl ChunkMesh {
    /// A mesh with no geometry.
    pub fn empty() -> Self {
        Self {
            handle: None,
            opaque_quads: 0,
            transparent_quads: 0,
        }
    }

    /// Uploads `geometry` and wraps the handle.
    ///
    /// # Returns
    /// The mesh, or the backend's upload error
    pub fn upload(
        data: &ChunkData,
        geometry: &MeshGeometry,
        backend: &mut dyn RenderBackend,
    ) -> Result<Self> {
        if geometry.is_empty() {
            return Ok(Self::empty());
        }
        let handle = backend.upload_mesh(data.key(), geometry)?;
        Ok(Self {
            handle: Some(handle),
            opaque_quads: geometry.opaque.quad_count(),
            transparent_quads: geometry.transparent.quad_count(),
        })
    }

    pub fn handle(&self) -> Option<MeshHandle> {
        self.handle
    }

    pub fn has_transparent(&self) -> bool {
        self.transparent_quads > 0
    }

    /// Draws the opaque sub-mesh.
    ///
    /// # Returns
    /// `true` if a draw was issued
    pub fn render(&self, backend: &mut dyn RenderBackend, pass: RenderPass, uniforms: &DrawUniforms) -> bool {
        match self.handle {
            Some(handle) if self.opaque_quads > 0 => {
                backend.draw(pass, handle, MeshLayer::Opaque, uniforms);
                true
            }
            _ => false,
        }
    }

    /// Draws the transparent sub-mesh.
    ///
    /// # Returns
    /// `true` if a draw was issued
    pub fn render_transparent(&self, backend: &mut dyn RenderBackend, uniforms: &DrawUniforms) -> bool {
        match self.handle {
            Some(handle) if self.transparent_quads > 0 => {
                backend.draw(RenderPass::Transparent, handle, MeshLayer::Transparent, uniforms);
                true
            }
            _ => false,
        }
    }

    /// Frees the backend buffers. Failures are logged, never propagated.
    pub fn release(self, backend: &mut dyn RenderBackend) {
        if let Some(handle) = self.handle {
            if let Err(error) = backend.release_mesh(handle) {
                warn!("Failed to release chunk mesh: {}", error);
            }
        }
    }
}
