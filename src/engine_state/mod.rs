//! # Engine State Module
//!
//! Ties the subsystems together into a frame loop.
//!
//! ## Key Components
//!
//! * `EngineState` - Owns every subsystem and runs one frame at a time
//! * `camera_state` - Camera, projection and the per-frame snapshot
//! * `rendering` - Chunk selection, meshing and draw submission
//! * `task_management` - Worker pool for chunk generation
//! * `voxels` - Blocks, chunks, terrain generation and the chunk cache
//!
//! ## Frame Order
//!
//! 1. Completed generation results are applied to the chunk cache
//! 2. Chunks beyond the retention distance are evicted and their meshes released
//! 3. The frame is rendered from a camera snapshot
//! 4. Chunks found missing while rendering are turned into generation tasks
//! 5. Queued tasks are handed to idle workers

use std::sync::Arc;

use cgmath::Point3;
use log::{debug, info};

use crate::{config::EngineConfig, error::Result};

use camera_state::CameraState;
use rendering::{release_chunk_meshes, EntityInstance, FrameReport, RenderBackend, Renderer};
use task_management::TaskManager;
use voxels::{chunk_manager::ChunkManager, terrain::GeneratorPipeline};

pub mod camera_state;
pub mod rendering;
pub mod task_management;
pub mod voxels;

/// Height above the base terrain height the camera starts at.
const SPAWN_HEIGHT: f32 = 48.0;

/// The main state container for the engine.
///
/// # Examples
///
/// ```no_run
/// use voxel_terrain::{config::EngineConfig, engine_state::{rendering::RecordingBackend, EngineState}};
///
/// let mut engine = EngineState::new(EngineConfig::default()).unwrap();
/// let mut backend = RecordingBackend::new();
/// loop {
///     engine.camera_state.camera.translate(1.0, 0.0, 0.0);
///     engine.frame(&[], None, &mut backend);
/// }
/// ```
pub struct EngineState {
    pub config: EngineConfig,
    /// The live camera; each frame renders from a snapshot of it
    pub camera_state: CameraState,
    pub chunk_manager: ChunkManager,
    pub task_manager: TaskManager,
    pub renderer: Renderer,
}

impl EngineState {
    /// Builds every subsystem from `config`.
    ///
    /// # Returns
    /// An error if the configuration is invalid or names unknown blocks
    pub fn new(config: EngineConfig) -> Result<Self> {
        let pipeline = Arc::new(GeneratorPipeline::from_config(&config)?);
        info!(
            "Engine starting with seed {}, chunk width {} and generators {:?}",
            config.seed,
            config.chunk_width,
            pipeline.generator_names()
        );

        let renderer = Renderer::new(&config.render, pipeline.blocks().clone(), config.chunk_width);
        let chunk_manager = ChunkManager::new(pipeline, &config);
        let task_manager = TaskManager::new(config.generation.workers);
        let spawn = Point3::new(
            0.0,
            config.generation.terrain.base_height as f32 + SPAWN_HEIGHT,
            0.0,
        );
        let camera_state = CameraState::new(spawn, &config.render);

        Ok(Self {
            config,
            camera_state,
            chunk_manager,
            task_manager,
            renderer,
        })
    }

    /// Runs one frame.
    ///
    /// # Arguments
    /// * `entities` - Entity instances to draw this frame
    /// * `selected` - World position of the voxel under the cursor, if any
    /// * `backend` - Graphics backend receiving the frame
    ///
    /// # Returns
    /// The renderer's report for the frame
    pub fn frame(
        &mut self,
        entities: &[EntityInstance],
        selected: Option<Point3<i32>>,
        backend: &mut dyn RenderBackend,
    ) -> FrameReport {
        self.task_manager.process_completed_tasks(&mut self.chunk_manager);

        let snapshot = self.camera_state.snapshot();
        let evicted = self
            .chunk_manager
            .evict_outside(snapshot.position.x, snapshot.position.z);
        release_chunk_meshes(evicted, backend);

        let selection = selected.and_then(|position| self.chunk_manager.select_voxel(position));
        let report = self.renderer.render_frame(
            &snapshot,
            &mut self.chunk_manager,
            entities,
            selection.as_ref(),
            backend,
        );

        let mut requested = 0;
        for key in self.chunk_manager.take_missing() {
            if let Some(task) = self.chunk_manager.request_generation(key) {
                self.task_manager.publish_task(Box::new(task));
                requested += 1;
            }
        }
        if requested > 0 {
            debug!("Requested generation of {} chunks", requested);
        }
        self.task_manager.process_queued_tasks();

        report
    }

    /// Returns `true` when no generation work is queued, in flight or awaiting
    /// its result.
    pub fn is_idle(&self) -> bool {
        self.task_manager.is_idle() && self.chunk_manager.pending_generations() == 0
    }
}
