//! # Rendering System
//!
//! Turns the chunks selected for a frame into draw calls on a [`RenderBackend`].
//!
//! ## Architecture
//!
//! - `Renderer`: Per-frame driver; selects chunks, keeps meshes current and
//!   issues draws in a fixed pass order
//! - `meshing`: CPU mesh generation and the per-chunk uploaded mesh
//! - `backend`: The graphics API seam and a recording implementation
//! - `frame_budget`: Wall-clock budget for mesh building
//! - `transparency`: Back-to-front ordering of transparent geometry
//!
//! ## Frame Order
//!
//! 1. Full-resolution chunk meshes (opaque)
//! 2. Reduced-resolution chunk meshes
//! 3. Entities
//! 4. Transparent sub-meshes of full-resolution chunks, furthest first
//!
//! ## Performance Considerations
//!
//! - Meshes are only rebuilt when missing or stale
//! - Once the meshing budget is spent, chunks keep drawing their previous mesh;
//!   chunks without any mesh wait for a later frame
//! - Chunks are visited nearest first, so the budget favours what is closest

use std::sync::Arc;
use web_time::Duration;

use log::{debug, warn};

use crate::{
    config::RenderConfig,
    core::MtResource,
    engine_state::{
        camera_state::CameraSnapshot,
        voxels::{
            block::BlockRegistry,
            chunk::{Chunk, ChunkKey},
            chunk_manager::{ChunkManager, Selection},
        },
    },
};

pub mod backend;
pub mod frame_budget;
pub mod meshing;
pub mod transparency;
mod vertex;

pub use backend::{
    BackendCall, DrawUniforms, EntityInstance, MeshHandle, MeshLayer, RecordingBackend, RenderBackend,
    RenderPass, NO_SELECTION,
};
pub use frame_budget::FrameBudget;
pub use meshing::{build_chunk_mesh, ChunkMesh, MeshGeometry};
pub use transparency::sort_back_to_front;
pub use vertex::Vertex;

/// What happened during one frame.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FrameReport {
    /// Full-resolution chunks selected for the frame
    pub full_chunks: usize,
    /// Reduced-resolution chunks that passed the frustum re-test
    pub reduced_chunks: usize,
    pub meshes_built: usize,
    /// Chunks that needed a rebuild but drew their previous mesh
    pub meshes_reused: usize,
    /// Chunks that needed a first mesh after the budget ran out
    pub chunks_skipped: usize,
    pub upload_failures: usize,
    pub opaque_draws: usize,
    pub reduced_draws: usize,
    pub transparent_draws: usize,
    pub entities: usize,
    /// Time spent in the frame, meshing included
    pub elapsed: Duration,
}

/// Per-frame chunk renderer.
pub struct Renderer {
    blocks: Arc<BlockRegistry>,
    budget: FrameBudget,
    width: i32,
    fog_color: [f32; 3],
    fog_density: f32,
    atlas_size: u32,
}

impl Renderer {
    /// Creates a renderer for chunks of `width` voxels.
    ///
    /// # Arguments
    /// * `config` - Meshing budget, fog and atlas parameters
    /// * `blocks` - Registry deciding which blocks go to the transparent pass
    /// * `width` - Chunk width in voxels
    pub fn new(config: &RenderConfig, blocks: Arc<BlockRegistry>, width: i32) -> Self {
        Self {
            blocks,
            budget: FrameBudget::from_millis(config.meshing_budget_ms),
            width,
            fog_color: config.fog_color,
            fog_density: config.fog_density,
            atlas_size: config.atlas_size,
        }
    }

    pub fn meshing_budget(&self) -> Duration {
        self.budget.budget()
    }

    pub fn set_meshing_budget(&mut self, budget: Duration) {
        self.budget.set_budget(budget);
    }

    /// Renders one frame.
    ///
    /// # Arguments
    /// * `camera` - Camera snapshot the whole frame is computed from
    /// * `chunk_manager` - Source of the visible chunks; missing chunks are
    ///   recorded in it for generation
    /// * `entities` - Instances drawn between the opaque and transparent passes
    /// * `selection` - The voxel to highlight, if any
    /// * `backend` - Receives uploads, releases and draws
    ///
    /// # Returns
    /// Counters describing the frame
    pub fn render_frame(
        &mut self,
        camera: &CameraSnapshot,
        chunk_manager: &mut ChunkManager,
        entities: &[EntityInstance],
        selection: Option<&Selection>,
        backend: &mut dyn RenderBackend,
    ) -> FrameReport {
        self.budget.start_frame();
        let mut report = FrameReport::default();

        let frustum = camera.frustum();
        let chunks = chunk_manager.get_render_chunks(&frustum, camera.position.x, camera.position.z);

        let mut transparent = Vec::new();
        for chunk in &chunks.full {
            let mut guard = chunk.get_mut();
            if !guard.is_ready() {
                continue;
            }
            report.full_chunks += 1;
            guard.sync_mesh_state();
            if !self.prepare_mesh(&mut guard, backend, &mut report) {
                continue;
            }
            let Some(mesh) = guard.mesh_slot().mesh() else {
                continue;
            };
            let uniforms = self.uniforms(&guard, selection, MeshLayer::Opaque);
            if mesh.render(backend, RenderPass::Opaque, &uniforms) {
                report.opaque_draws += 1;
            }
            if mesh.has_transparent() {
                let distance2 = camera.distance2(guard.key().center(self.width));
                transparent.push((distance2, chunk.clone()));
            }
        }

        for chunk in &chunks.reduced {
            let mut guard = chunk.get_mut();
            if !guard.data().is_generated() {
                continue;
            }
            let (min, max) = guard.key().bounds(self.width);
            if !frustum.test_aabb(min, max) {
                continue;
            }
            report.reduced_chunks += 1;
            guard.sync_mesh_state();
            if !self.prepare_mesh(&mut guard, backend, &mut report) {
                continue;
            }
            if let Some(mesh) = guard.mesh_slot().mesh() {
                let uniforms = self.uniforms(&guard, None, MeshLayer::Opaque);
                if mesh.render(backend, RenderPass::Reduced, &uniforms) {
                    report.reduced_draws += 1;
                }
            }
        }

        if !entities.is_empty() {
            backend.draw_entities(entities);
            report.entities = entities.len();
        }

        sort_back_to_front(&mut transparent, |(distance2, _)| *distance2);
        for (_, chunk) in &transparent {
            let guard = chunk.get();
            if let Some(mesh) = guard.mesh_slot().mesh() {
                let uniforms = self.uniforms(&guard, selection, MeshLayer::Transparent);
                if mesh.render_transparent(backend, &uniforms) {
                    report.transparent_draws += 1;
                }
            }
        }

        report.elapsed = self.budget.elapsed();
        debug!("{:?}", report);
        report
    }

    /// Makes sure `chunk` has a mesh to draw, rebuilding it while budget remains.
    ///
    /// # Returns
    /// `true` if the chunk has a mesh afterwards, fresh or stale
    fn prepare_mesh(&self, chunk: &mut Chunk, backend: &mut dyn RenderBackend, report: &mut FrameReport) -> bool {
        if !chunk.mesh_slot().needs_rebuild() {
            return true;
        }

        if self.budget.is_exhausted() {
            if chunk.mesh_slot().has_mesh() {
                report.meshes_reused += 1;
                return true;
            }
            report.chunks_skipped += 1;
            return false;
        }

        let geometry = build_chunk_mesh(chunk.data(), &self.blocks);
        match ChunkMesh::upload(chunk.data(), &geometry, backend) {
            Ok(mesh) => {
                if let Some(previous) = chunk.mesh_slot_mut().replace(mesh) {
                    previous.release(backend);
                }
                report.meshes_built += 1;
                true
            }
            Err(error) => {
                warn!("Failed to upload mesh for chunk {:?}: {}", chunk.key(), error);
                report.upload_failures += 1;
                chunk.mesh_slot().has_mesh()
            }
        }
    }

    /// Uniforms for one draw of `chunk`. The selected index is only sent with the
    /// layer that holds the selected voxel.
    fn uniforms(&self, chunk: &Chunk, selection: Option<&Selection>, layer: MeshLayer) -> DrawUniforms {
        let key = chunk.key();
        DrawUniforms {
            chunk_origin: [key.wx, key.wy, key.wz],
            voxel_size: key.voxel_size,
            fog_color: self.fog_color,
            fog_density: self.fog_density,
            selected_index: self.selected_index(chunk, key, selection, layer),
            atlas_size: self.atlas_size,
            _padding: [0; 2],
        }
    }

    fn selected_index(&self, chunk: &Chunk, key: ChunkKey, selection: Option<&Selection>, layer: MeshLayer) -> i32 {
        let Some(selection) = selection.filter(|selection| selection.key == key) else {
            return NO_SELECTION;
        };
        let Some(&block) = chunk.data().blocks().get(selection.voxel_index as usize) else {
            return NO_SELECTION;
        };
        let selected_layer = if self.blocks.is_transparent(block) {
            MeshLayer::Transparent
        } else {
            MeshLayer::Opaque
        };
        if selected_layer == layer {
            selection.voxel_index as i32
        } else {
            NO_SELECTION
        }
    }
}

/// Releases the meshes of chunks leaving the cache.
pub fn release_chunk_meshes(chunks: Vec<MtResource<Chunk>>, backend: &mut dyn RenderBackend) {
    for chunk in chunks {
        let mesh = chunk.get_mut().mesh_slot_mut().take();
        if let Some(mesh) = mesh {
            mesh.release(backend);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        config::EngineConfig,
        engine_state::{
            camera_state::CameraState,
            voxels::{
                block::AIR,
                chunk::MeshState,
                terrain::{BiomeRegistry, FlatMapGenerator, GeneratorPipeline, NoStructure, TerrainGenerator},
            },
        },
    };
    use cgmath::{Deg, Point3};

    fn setup() -> (EngineConfig, ChunkManager, Renderer) {
        let mut config = EngineConfig::default();
        config.chunk_width = 16;
        config.render.render_distance = 1;
        config.render.min_chunk_y = 0;
        config.render.max_chunk_y = 0;
        config.render.full_detail_distance = 1000.0;

        let blocks = Arc::new(BlockRegistry::with_defaults());
        let mut pipeline = GeneratorPipeline::new(
            7,
            16,
            0,
            Box::new(FlatMapGenerator::new(8, 0)),
            blocks.clone(),
            BiomeRegistry::single("plain", Box::new(NoStructure)),
        );
        pipeline.register(Box::new(TerrainGenerator::from_registry(&blocks).unwrap()));

        let renderer = Renderer::new(&config.render, blocks, config.chunk_width);
        let manager = ChunkManager::new(Arc::new(pipeline), &config);
        (config, manager, renderer)
    }

    fn looking_down(config: &EngineConfig) -> CameraSnapshot {
        let mut state = CameraState::new(Point3::new(8.0, 60.0, 8.0), &config.render);
        state.camera.set_pitch(Deg(-89.0));
        state.snapshot()
    }

    fn mesh_handle(chunk: &MtResource<Chunk>) -> Option<MeshHandle> {
        chunk.get().mesh_slot().mesh().and_then(|mesh| mesh.handle())
    }

    #[test]
    fn test_first_frame_builds_and_draws() {
        let (config, mut manager, mut renderer) = setup();
        let chunk = manager.ensure_generated(Point3::new(0, 0, 0), 1).unwrap();

        let mut backend = RecordingBackend::new();
        let report = renderer.render_frame(&looking_down(&config), &mut manager, &[], None, &mut backend);
        assert_eq!(report.full_chunks, 1);
        assert_eq!(report.meshes_built, 1);
        assert_eq!(report.opaque_draws, 1);
        assert_eq!(chunk.get().mesh_slot().state(), MeshState::Ready);
    }

    #[test]
    fn test_exhausted_budget_skips_chunks_without_mesh() {
        let (config, mut manager, mut renderer) = setup();
        let chunk = manager.ensure_generated(Point3::new(0, 0, 0), 1).unwrap();
        renderer.set_meshing_budget(Duration::ZERO);

        let mut backend = RecordingBackend::new();
        let report = renderer.render_frame(&looking_down(&config), &mut manager, &[], None, &mut backend);
        assert_eq!(report.meshes_built, 0);
        assert_eq!(report.chunks_skipped, 1);
        assert_eq!(backend.uploads(), 0);
        assert_eq!(chunk.get().mesh_slot().state(), MeshState::Missing);
    }

    #[test]
    fn test_exhausted_budget_reuses_stale_mesh() {
        let (config, mut manager, mut renderer) = setup();
        let chunk = manager.ensure_generated(Point3::new(0, 0, 0), 1).unwrap();
        let camera = looking_down(&config);
        let mut backend = RecordingBackend::new();
        renderer.render_frame(&camera, &mut manager, &[], None, &mut backend);
        let handle = mesh_handle(&chunk);
        assert!(handle.is_some());

        assert!(manager.set_block(Point3::new(1, 1, 1), AIR));
        renderer.set_meshing_budget(Duration::ZERO);
        backend.clear();
        let report = renderer.render_frame(&camera, &mut manager, &[], None, &mut backend);

        assert_eq!(report.meshes_reused, 1);
        assert_eq!(chunk.get().mesh_slot().state(), MeshState::Stale);
        assert_eq!(mesh_handle(&chunk), handle);
        assert!(backend
            .draws()
            .any(|call| matches!(call, BackendCall::Draw { handle: drawn, .. } if Some(*drawn) == handle)));
    }

    #[test]
    fn test_rebuild_releases_previous_mesh() {
        let (config, mut manager, mut renderer) = setup();
        manager.ensure_generated(Point3::new(0, 0, 0), 1).unwrap();
        let camera = looking_down(&config);
        let mut backend = RecordingBackend::new();
        renderer.render_frame(&camera, &mut manager, &[], None, &mut backend);
        assert_eq!(backend.live_meshes(), 1);

        assert!(manager.set_block(Point3::new(1, 1, 1), AIR));
        let report = renderer.render_frame(&camera, &mut manager, &[], None, &mut backend);
        assert_eq!(report.meshes_built, 1);
        assert_eq!(backend.live_meshes(), 1);
    }

    #[test]
    fn test_failed_upload_keeps_previous_mesh() {
        let (config, mut manager, mut renderer) = setup();
        let chunk = manager.ensure_generated(Point3::new(0, 0, 0), 1).unwrap();
        let camera = looking_down(&config);
        let mut backend = RecordingBackend::new();
        renderer.render_frame(&camera, &mut manager, &[], None, &mut backend);

        assert!(manager.set_block(Point3::new(1, 1, 1), AIR));
        backend.fail_uploads = true;
        let report = renderer.render_frame(&camera, &mut manager, &[], None, &mut backend);
        assert_eq!(report.upload_failures, 1);
        assert_eq!(report.opaque_draws, 1);
        assert_eq!(chunk.get().mesh_slot().state(), MeshState::Stale);
    }

    #[test]
    fn test_selection_goes_to_the_layer_holding_the_voxel() {
        let (config, mut manager, mut renderer) = setup();
        let water = renderer.blocks.id_for_name("water").unwrap();
        let chunk = manager.ensure_generated(Point3::new(0, 0, 0), 1).unwrap();
        assert!(manager.set_block(Point3::new(4, 7, 4), water));
        let selection = manager.select_voxel(Point3::new(4, 7, 4)).unwrap();

        {
            let guard = chunk.get();
            assert_eq!(
                renderer.uniforms(&guard, Some(&selection), MeshLayer::Opaque).selected_index,
                NO_SELECTION
            );
            assert_eq!(
                renderer.uniforms(&guard, Some(&selection), MeshLayer::Transparent).selected_index,
                selection.voxel_index as i32
            );
        }

        let mut backend = RecordingBackend::new();
        renderer.render_frame(&looking_down(&config), &mut manager, &[], Some(&selection), &mut backend);
        let selected: Vec<&BackendCall> = backend
            .draws()
            .filter(|call| matches!(call, BackendCall::Draw { selected_index, .. } if *selected_index != NO_SELECTION))
            .collect();
        assert_eq!(selected.len(), 1);
        assert!(matches!(
            selected[0],
            BackendCall::Draw {
                pass: RenderPass::Transparent,
                ..
            }
        ));
    }

    #[test]
    fn test_release_chunk_meshes_frees_backend_buffers() {
        let (config, mut manager, mut renderer) = setup();
        manager.ensure_generated(Point3::new(0, 0, 0), 1).unwrap();
        let mut backend = RecordingBackend::new();
        renderer.render_frame(&looking_down(&config), &mut manager, &[], None, &mut backend);
        assert_eq!(backend.live_meshes(), 1);

        let evicted = manager.evict_outside(1.0e6, 1.0e6);
        assert_eq!(evicted.len(), 1);
        release_chunk_meshes(evicted, &mut backend);
        assert_eq!(backend.live_meshes(), 0);
    }
}
