//! # Chunk Module
//!
//! Chunks are the unit of generation, caching and meshing. Every chunk covers the
//! same `chunk_width`³ region of the world; the level of detail only changes how
//! many voxels that region is split into.
//!
//! ## Variants
//!
//! - [`Chunk::Full`]: voxel size 1. Can be edited, can hold the selected voxel and
//!   contributes transparent geometry.
//! - [`Chunk::Reduced`]: voxel size 2, 4, ... Read-only, rendered with the reduced
//!   pass and re-tested against the frustum before drawing.
//!
//! Both variants own their voxel data and, exclusively, their mesh. A mesh is
//! marked stale rather than dropped when the voxels change, and keeps rendering
//! until its replacement has been uploaded.

use cgmath::Point3;

use crate::engine_state::rendering::meshing::ChunkMesh;

mod chunk_data;

pub use chunk_data::ChunkData;

/// Identity of a chunk: world-space origin plus voxel size.
///
/// The same region generated at two levels of detail yields two distinct keys.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ChunkKey {
    pub wx: i32,
    pub wy: i32,
    pub wz: i32,
    pub voxel_size: i32,
}

impl ChunkKey {
    pub fn new(wx: i32, wy: i32, wz: i32, voxel_size: i32) -> Self {
        Self {
            wx,
            wy,
            wz,
            voxel_size,
        }
    }

    /// Key of the chunk containing world position `position`.
    ///
    /// # Arguments
    /// * `position` - Any world position
    /// * `width` - Chunk width in world units
    /// * `voxel_size` - Level of detail of the requested chunk
    pub fn containing(position: Point3<i32>, width: i32, voxel_size: i32) -> Self {
        Self::new(
            num::Integer::div_floor(&position.x, &width) * width,
            num::Integer::div_floor(&position.y, &width) * width,
            num::Integer::div_floor(&position.z, &width) * width,
            voxel_size,
        )
    }

    pub fn origin(&self) -> Point3<i32> {
        Point3::new(self.wx, self.wy, self.wz)
    }

    /// World-space centre of the chunk.
    pub fn center(&self, width: i32) -> Point3<f32> {
        let half = width as f32 / 2.0;
        Point3::new(
            self.wx as f32 + half,
            self.wy as f32 + half,
            self.wz as f32 + half,
        )
    }

    /// World-space bounding box of the chunk as `(min, max)`.
    pub fn bounds(&self, width: i32) -> (Point3<f32>, Point3<f32>) {
        (
            Point3::new(self.wx as f32, self.wy as f32, self.wz as f32),
            Point3::new(
                (self.wx + width) as f32,
                (self.wy + width) as f32,
                (self.wz + width) as f32,
            ),
        )
    }
}

/// Where a chunk's mesh is in its lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MeshState {
    /// No mesh has been built yet
    Missing,
    /// The mesh matches the voxel content
    Ready,
    /// The voxels changed after the mesh was built; it still renders until replaced
    Stale,
}

/// A chunk's exclusively owned mesh plus an explicit staleness flag.
#[derive(Debug, Default)]
pub struct MeshSlot {
    mesh: Option<ChunkMesh>,
    stale: bool,
}

impl MeshSlot {
    pub fn mesh(&self) -> Option<&ChunkMesh> {
        self.mesh.as_ref()
    }

    pub fn has_mesh(&self) -> bool {
        self.mesh.is_some()
    }

    pub fn state(&self) -> MeshState {
        match (&self.mesh, self.stale) {
            (None, _) => MeshState::Missing,
            (Some(_), true) => MeshState::Stale,
            (Some(_), false) => MeshState::Ready,
        }
    }

    pub fn mark_stale(&mut self) {
        self.stale = true;
    }

    /// Returns `true` if the mesh is missing or stale.
    ///
    /// A chunk's voxel size is part of its key, so a mesh never outlives a
    /// change of detail level.
    pub fn needs_rebuild(&self) -> bool {
        self.mesh.is_none() || self.stale
    }

    /// Installs a freshly built mesh.
    ///
    /// # Returns
    /// The mesh it replaces, which the caller must release.
    pub fn replace(&mut self, mesh: ChunkMesh) -> Option<ChunkMesh> {
        self.stale = false;
        self.mesh.replace(mesh)
    }

    /// Removes the mesh so it can be released.
    pub fn take(&mut self) -> Option<ChunkMesh> {
        self.stale = false;
        self.mesh.take()
    }
}

/// A full-resolution chunk.
#[derive(Debug)]
pub struct FullChunk {
    data: ChunkData,
    mesh: MeshSlot,
    loaded: bool,
}

/// A reduced-resolution chunk used far away from the camera.
#[derive(Debug)]
pub struct ReducedChunk {
    data: ChunkData,
    mesh: MeshSlot,
}

/// A chunk at either level of detail.
#[derive(Debug)]
pub enum Chunk {
    Full(FullChunk),
    Reduced(ReducedChunk),
}

impl FullChunk {
    /// Returns `true` once the chunk has been handed to the chunk manager.
    pub fn is_loaded(&self) -> bool {
        self.loaded
    }
}

impl Chunk {
    /// Wraps voxel data in the variant matching its voxel size.
    pub fn new(data: ChunkData) -> Self {
        if data.voxel_size() == 1 {
            Chunk::Full(FullChunk {
                data,
                mesh: MeshSlot::default(),
                loaded: false,
            })
        } else {
            Chunk::Reduced(ReducedChunk {
                data,
                mesh: MeshSlot::default(),
            })
        }
    }

    pub fn key(&self) -> ChunkKey {
        self.data().key()
    }

    pub fn voxel_size(&self) -> i32 {
        self.data().voxel_size()
    }

    pub fn is_reduced(&self) -> bool {
        matches!(self, Chunk::Reduced(_))
    }

    pub fn data(&self) -> &ChunkData {
        match self {
            Chunk::Full(chunk) => &chunk.data,
            Chunk::Reduced(chunk) => &chunk.data,
        }
    }

    pub fn data_mut(&mut self) -> &mut ChunkData {
        match self {
            Chunk::Full(chunk) => &mut chunk.data,
            Chunk::Reduced(chunk) => &mut chunk.data,
        }
    }

    pub fn mesh_slot(&self) -> &MeshSlot {
        match self {
            Chunk::Full(chunk) => &chunk.mesh,
            Chunk::Reduced(chunk) => &chunk.mesh,
        }
    }

    pub fn mesh_slot_mut(&mut self) -> &mut MeshSlot {
        match self {
            Chunk::Full(chunk) => &mut chunk.mesh,
            Chunk::Reduced(chunk) => &mut chunk.mesh,
        }
    }

    /// Split borrow of the voxel data and the mesh slot.
    pub fn parts_mut(&mut self) -> (&mut ChunkData, &mut MeshSlot) {
        match self {
            Chunk::Full(chunk) => (&mut chunk.data, &mut chunk.mesh),
            Chunk::Reduced(chunk) => (&mut chunk.data, &mut chunk.mesh),
        }
    }

    /// Full chunks report whether they were loaded; reduced chunks whether they
    /// finished generating.
    pub fn is_ready(&self) -> bool {
        match self {
            Chunk::Full(chunk) => chunk.loaded && chunk.data.is_generated(),
            Chunk::Reduced(chunk) => chunk.data.is_generated(),
        }
    }

    pub(crate) fn mark_loaded(&mut self) {
        if let Chunk::Full(chunk) = self {
            chunk.loaded = true;
        }
    }

    /// Folds a pending voxel edit into the mesh state: an edited chunk marks its
    /// mesh stale exactly once, however many edits happened since the last frame.
    pub fn sync_mesh_state(&mut self) {
        let (data, mesh) = self.parts_mut();
        if data.was_updated() {
            data.clear_updated();
            if mesh.has_mesh() {
                mesh.mark_stale();
            }
        }
    }
}
