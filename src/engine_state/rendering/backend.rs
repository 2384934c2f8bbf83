//! # Render Backend
//!
//! The seam between the renderer and the graphics API. The renderer decides what
//! is drawn, in which pass and with which uniforms; a backend owns the GPU
//! buffers behind each [`MeshHandle`] and turns draw calls into API commands.
//!
//! [`RecordingBackend`] keeps every call in memory instead. The headless driver
//! and the tests render through it.

use std::collections::HashSet;

use log::trace;

use crate::{
    engine_state::voxels::chunk::ChunkKey,
    error::{EngineError, Result},
};

use super::meshing::MeshGeometry;

/// Identifies an uploaded chunk mesh inside a backend.
pub type MeshHandle = u64;

/// The fixed draw passes of a frame, in submission order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RenderPass {
    /// Full-resolution chunk meshes
    Opaque,
    /// Reduced-resolution chunk meshes
    Reduced,
    /// Transparent sub-meshes of full-resolution chunks, back to front
    Transparent,
}

/// Which sub-mesh of an uploaded chunk mesh to draw.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MeshLayer {
    Opaque,
    Transparent,
}

/// Uniform values passed with every chunk draw.
#[repr(C)]
#[derive(Copy, Clone, Debug, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct DrawUniforms {
    pub chunk_origin: [i32; 3],
    pub voxel_size: i32,
    pub fog_color: [f32; 3],
    pub fog_density: f32,
    /// Voxel index to highlight, or [`NO_SELECTION`]
    pub selected_index: i32,
    /// Number of textures per atlas row
    pub atlas_size: u32,
    pub _padding: [u32; 2],
}

/// Selected index sent with every draw that does not contain the selected voxel.
pub const NO_SELECTION: i32 = -1;

/// An entity drawn between the opaque and transparent chunk passes.
#[repr(C)]
#[derive(Copy, Clone, Debug, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct EntityInstance {
    pub position: [f32; 3],
    pub scale: f32,
    pub color: [f32; 4],
}

/// Graphics API abstraction used by the renderer.
pub trait RenderBackend {
    /// Uploads the geometry of one chunk and returns a handle to it.
    fn upload_mesh(&mut self, key: ChunkKey, geometry: &MeshGeometry) -> Result<MeshHandle>;

    /// Frees the buffers behind `handle`.
    fn release_mesh(&mut self, handle: MeshHandle) -> Result<()>;

    /// Draws one layer of an uploaded mesh.
    fn draw(&mut self, pass: RenderPass, handle: MeshHandle, layer: MeshLayer, uniforms: &DrawUniforms);

    /// Draws the entity instances of this frame.
    fn draw_entities(&mut self, entities: &[EntityInstance]);
}

/// A call received by a [`RecordingBackend`].
#[derive(Debug, Clone, PartialEq)]
pub enum BackendCall {
    Upload {
        key: ChunkKey,
        handle: MeshHandle,
        quads: usize,
    },
    Release {
        handle: MeshHandle,
    },
    Draw {
        pass: RenderPass,
        handle: MeshHandle,
        layer: MeshLayer,
        chunk_origin: [i32; 3],
        selected_index: i32,
    },
    Entities {
        count: usize,
    },
}

/// Backend that records calls instead of talking to a GPU.
#[derive(Debug, Default)]
pub struct RecordingBackend {
    pub calls: Vec<BackendCall>,
    /// When set, every upload fails
    pub fail_uploads: bool,
    /// When set, every release fails
    pub fail_releases: bool,
    next_handle: MeshHandle,
    live: HashSet<MeshHandle>,
}

impl RecordingBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Handles uploaded and not yet released.
    pub fn live_meshes(&self) -> usize {
        self.live.len()
    }

    pub fn is_live(&self, handle: MeshHandle) -> bool {
        self.live.contains(&handle)
    }

    /// Draw calls only, in submission order.
    pub fn draws(&self) -> impl Iterator<Item = &BackendCall> {
        self.calls
            .iter()
            .filter(|call| matches!(call, BackendCall::Draw { .. } | BackendCall::Entities { .. }))
    }

    pub fn uploads(&self) -> usize {
        self.calls
            .iter()
            .filter(|call| matches!(call, BackendCall::Upload { .. }))
            .count()
    }

    pub fn clear(&mut self) {
        self.calls.clear();
    }
}

impl RenderBackend for RecordingBackend {
    fn upload_mesh(&mut self, key: ChunkKey, geometry: &MeshGeometry) -> Result<MeshHandle> {
        if self.fail_uploads {
            return Err(EngineError::MeshUpload {
                key,
                message: "uploads disabled".to_string(),
            });
        }
        self.next_handle += 1;
        let handle = self.next_handle;
        self.live.insert(handle);
        trace!("Uploading mesh {} for chunk {:?}", handle, key);
        self.calls.push(BackendCall::Upload {
            key,
            handle,
            quads: geometry.quad_count(),
        });
        Ok(handle)
    }

    fn release_mesh(&mut self, handle: MeshHandle) -> Result<()> {
        if self.fail_releases {
            return Err(EngineError::MeshRelease {
                handle,
                message: "releases disabled".to_string(),
            });
        }
        if !self.live.remove(&handle) {
            return Err(EngineError::MeshRelease {
                handle,
                message: "unknown handle".to_string(),
            });
        }
        trace!("Releasing mesh {}", handle);
        self.calls.push(BackendCall::Release { handle });
        Ok(())
    }

    fn draw(&mut self, pass: RenderPass, handle: MeshHandle, layer: MeshLayer, uniforms: &DrawUniforms) {
        self.calls.push(BackendCall::Draw {
            pass,
            handle,
            layer,
            chunk_origin: uniforms.chunk_origin,
            selected_index: uniforms.selected_index,
        });
    }

    fn draw_entities(&mut self, entities: &[EntityInstance]) {
        self.calls.push(BackendCall::Entities {
            count: entities.len(),
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_uniforms_have_no_implicit_padding() {
        assert_eq!(std::mem::size_of::<DrawUniforms>(), 48);
        assert_eq!(std::mem::size_of::<EntityInstance>(), 32);
    }

    #[test]
    fn test_release_of_unknown_handle_fails() {
        let mut backend = RecordingBackend::new();
        let handle = backend
            .upload_mesh(ChunkKey::new(0, 0, 0, 1), &MeshGeometry::default())
            .unwrap();
        assert!(backend.is_live(handle));
        backend.release_mesh(handle).unwrap();
        assert!(matches!(
            backend.release_mesh(handle),
            Err(EngineError::MeshRelease { .. })
        ));
        assert_eq!(backend.live_meshes(), 0);
    }
}
