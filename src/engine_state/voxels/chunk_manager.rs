//! # Chunk Manager
//!
//! Owns the chunk cache and answers the renderer's "which chunks are visible"
//! query. Chunks enter the cache either synchronously through
//! [`ChunkManager::ensure_generated`] or asynchronously: the renderer's query
//! records missing chunks, the engine turns them into generation tasks, and the
//! results come back through [`ChunkManager::apply_generated`].
//!
//! ## Architecture
//!
//! - The cache is an LRU keyed by [`ChunkKey`] and capped by configuration; chunks
//!   pushed out by the cap are kept aside until their meshes are released
//! - Every in-flight generation request holds a ticket; a result is only applied
//!   when its ticket is still pending, so results for chunks evicted or
//!   generated synchronously in the meantime are dropped
//! - The level of detail of a chunk is chosen from its horizontal distance to the
//!   viewer by [`lod_voxel_size`]
//!
//! ## Performance Considerations
//!
//! - Only the render-distance square around the viewer is searched, and each
//!   candidate is tested against the frustum before the cache is consulted
//! - Generation never blocks the frame unless a caller asks for it explicitly

use std::collections::{HashMap, HashSet};
use std::num::NonZeroUsize;
use std::sync::Arc;

use cgmath::Point3;
use log::{debug, warn};
use lru::LruCache;

use crate::{
    config::EngineConfig,
    core::MtResource,
    engine_state::camera_state::Frustum,
    error::Result,
};

use super::{
    block::{BlockId, AIR},
    chunk::{Chunk, ChunkKey},
    tasks::ChunkGenerationTask,
    terrain::GeneratorPipeline,
};

/// Voxel size to render a chunk with, given its distance to the viewer.
///
/// Chunks closer than `full_detail_distance` get voxel size 1. Beyond that the
/// voxel size doubles each time the distance doubles, up to the coarsest of
/// `lod_levels` levels. The result never decreases with distance.
pub fn lod_voxel_size(distance: f32, full_detail_distance: f32, lod_levels: u32) -> i32 {
    if distance < full_detail_distance || lod_levels <= 1 {
        return 1;
    }
    let level = 1 + (distance / full_detail_distance).log2().floor().max(0.0) as u32;
    1 << level.min(lod_levels - 1)
}

/// Chunks selected for one frame, each list ordered nearest first.
#[derive(Default)]
pub struct RenderChunks {
    pub full: Vec<MtResource<Chunk>>,
    pub reduced: Vec<MtResource<Chunk>>,
}

/// The voxel under the cursor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Selection {
    pub key: ChunkKey,
    pub position: Point3<i32>,
    pub voxel_index: u32,
}

pub struct ChunkManager {
    pipeline: Arc<GeneratorPipeline>,
    width: i32,
    chunks: LruCache<ChunkKey, MtResource<Chunk>>,
    /// Chunks pushed out of the cache whose meshes still need releasing
    overflow: Vec<MtResource<Chunk>>,
    pending: HashMap<ChunkKey, u64>,
    next_ticket: u64,
    missing: Vec<ChunkKey>,
    pipeline_runs: usize,
    render_distance: i32,
    full_detail_distance: f32,
    lod_levels: u32,
    min_chunk_y: i32,
    max_chunk_y: i32,
    retention_distance: f32,
}

impl ChunkManager {
    pub fn new(pipeline: Arc<GeneratorPipeline>, config: &EngineConfig) -> Self {
        let capacity =
            NonZeroUsize::new(config.generation.max_cached_chunks).unwrap_or(NonZeroUsize::MIN);
        Self {
            width: pipeline.width(),
            pipeline,
            chunks: LruCache::new(capacity),
            overflow: Vec::new(),
            pending: HashMap::new(),
            next_ticket: 0,
            missing: Vec::new(),
            pipeline_runs: 0,
            render_distance: config.render.render_distance,
            full_detail_distance: config.render.full_detail_distance,
            lod_levels: config.render.lod_levels,
            min_chunk_y: config.render.min_chunk_y,
            max_chunk_y: config.render.max_chunk_y,
            retention_distance: config.generation.retention_distance,
        }
    }

    pub fn width(&self) -> i32 {
        self.width
    }

    pub fn pipeline(&self) -> &Arc<GeneratorPipeline> {
        &self.pipeline
    }

    /// Number of times the generator pipeline produced a chunk for this manager.
    pub fn pipeline_runs(&self) -> usize {
        self.pipeline_runs
    }

    /// Number of cached chunks.
    pub fn len(&self) -> usize {
        self.chunks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.chunks.is_empty()
    }

    /// Number of generation requests still waiting for a result.
    pub fn pending_generations(&self) -> usize {
        self.pending.len()
    }

    pub fn get_chunk(&mut self, key: &ChunkKey) -> Option<MtResource<Chunk>> {
        self.chunks.get(key).cloned()
    }

    /// Returns the chunk containing `position` at `voxel_size`, generating it
    /// on the calling thread if it is not cached.
    ///
    /// Idempotent: a cached chunk is returned as is and the pipeline is not run
    /// again. A pending asynchronous request for the same chunk is cancelled.
    ///
    /// # Arguments
    /// * `position` - Any world position inside the chunk
    /// * `voxel_size` - Level of detail of the chunk
    ///
    /// # Returns
    /// The shared chunk, or the generation error
    pub fn ensure_generated(&mut self, position: Point3<i32>, voxel_size: i32) -> Result<MtResource<Chunk>> {
        let key = ChunkKey::containing(position, self.width, voxel_size);
        if let Some(chunk) = self.chunks.get(&key) {
            return Ok(chunk.clone());
        }

        let mut chunk = self.pipeline.generate_chunk(key)?;
        self.pipeline_runs += 1;
        if self.pending.remove(&key).is_some() {
            debug!("Chunk {:?} generated synchronously, dropping pending request", key);
        }
        chunk.mark_loaded();
        Ok(self.insert(key, chunk))
    }

    fn insert(&mut self, key: ChunkKey, chunk: Chunk) -> MtResource<Chunk> {
        let chunk = MtResource::new(chunk);
        if let Some((evicted_key, evicted)) = self.chunks.push(key, chunk.clone()) {
            if evicted_key != key {
                debug!("Chunk cache full, evicting {:?}", evicted_key);
                self.pending.remove(&evicted_key);
            }
            self.overflow.push(evicted);
        }
        chunk
    }

    /// Selects the chunks to render this frame.
    ///
    /// Searches the render-distance square around the viewer over the configured
    /// vertical layers, picks each position's level of detail from its distance,
    /// and keeps the chunks whose bounds intersect the frustum. Chunks that are
    /// not cached are remembered for [`Self::take_missing`]; chunks that are not
    /// ready are never returned.
    ///
    /// # Arguments
    /// * `frustum` - The view frustum of this frame
    /// * `viewer_x`, `viewer_z` - Horizontal viewer position used for level of detail
    pub fn get_render_chunks(&mut self, frustum: &Frustum, viewer_x: f32, viewer_z: f32) -> RenderChunks {
        let width = self.width;
        let center_x = (viewer_x / width as f32).floor() as i32;
        let center_z = (viewer_z / width as f32).floor() as i32;
        let radius = self.render_distance;

        let mut full = Vec::new();
        let mut reduced = Vec::new();
        for dx in -radius..=radius {
            for dz in -radius..=radius {
                let wx = (center_x + dx) * width;
                let wz = (center_z + dz) * width;
                let cx = wx as f32 + width as f32 / 2.0;
                let cz = wz as f32 + width as f32 / 2.0;
                let distance = ((cx - viewer_x).powi(2) + (cz - viewer_z).powi(2)).sqrt();
                let voxel_size = lod_voxel_size(distance, self.full_detail_distance, self.lod_levels);

                for cy in self.min_chunk_y..=self.max_chunk_y {
                    let key = ChunkKey::new(wx, cy * width, wz, voxel_size);
                    let (min, max) = key.bounds(width);
                    if !frustum.test_aabb(min, max) {
                        continue;
                    }
                    match self.chunks.get(&key) {
                        Some(chunk) => {
                            let ready = chunk.get().is_ready();
                            if !ready {
                                continue;
                            }
                            if voxel_size == 1 {
                                full.push((distance, chunk.clone()));
                            } else {
                                reduced.push((distance, chunk.clone()));
                            }
                        }
                        None => {
                            if !self.pending.contains_key(&key) {
                                self.missing.push(key);
                            }
                        }
                    }
                }
            }
        }

        full.sort_by(|a, b| a.0.total_cmp(&b.0));
        reduced.sort_by(|a, b| a.0.total_cmp(&b.0));
        RenderChunks {
            full: full.into_iter().map(|(_, chunk)| chunk).collect(),
            reduced: reduced.into_iter().map(|(_, chunk)| chunk).collect(),
        }
    }

    /// Drains the chunks found missing by the last render queries, without
    /// duplicates and in the order they were found.
    pub fn take_missing(&mut self) -> Vec<ChunkKey> {
        let mut seen = HashSet::new();
        std::mem::take(&mut self.missing)
            .into_iter()
            .filter(|key| seen.insert(*key))
            .collect()
    }

    /// Creates a generation task for `key` unless the chunk is cached or already
    /// requested.
    pub fn request_generation(&mut self, key: ChunkKey) -> Option<ChunkGenerationTask> {
        if self.chunks.contains(&key) || self.pending.contains_key(&key) {
            return None;
        }
        self.next_ticket += 1;
        self.pending.insert(key, self.next_ticket);
        Some(ChunkGenerationTask::new(self.pipeline.clone(), key, self.next_ticket))
    }

    /// Applies the result of a generation task.
    ///
    /// # Returns
    /// `true` if the chunk was inserted; `false` if the request is no longer
    /// pending or generation failed, in which case the chunk will be requested
    /// again the next time it is missing.
    pub fn apply_generated(&mut self, key: ChunkKey, ticket: u64, result: Result<Chunk>) -> bool {
        if self.pending.get(&key) != Some(&ticket) {
            debug!("Dropping stale generation result for {:?}", key);
            return false;
        }
        self.pending.remove(&key);

        match result {
            Ok(mut chunk) => {
                self.pipeline_runs += 1;
                chunk.mark_loaded();
                self.insert(key, chunk);
                true
            }
            Err(error) => {
                warn!("Generation failed for chunk {:?}: {}", key, error);
                false
            }
        }
    }

    /// Removes every chunk whose centre lies further than the retention distance
    /// from the viewer, horizontally, and cancels pending requests out there.
    ///
    /// # Returns
    /// The removed chunks, together with chunks pushed out by the cache cap since
    /// the last call. Their meshes must be released by the caller.
    pub fn evict_outside(&mut self, viewer_x: f32, viewer_z: f32) -> Vec<MtResource<Chunk>> {
        let width = self.width;
        let retention = self.retention_distance;
        let beyond = |key: &ChunkKey| {
            let center = key.center(width);
            (center.x - viewer_x).powi(2) + (center.z - viewer_z).powi(2) > retention * retention
        };

        let evicted_keys: Vec<ChunkKey> = self
            .chunks
            .iter()
            .map(|(key, _)| *key)
            .filter(|key| beyond(key))
            .collect();
        self.pending.retain(|key, _| !beyond(key));

        let mut evicted = std::mem::take(&mut self.overflow);
        evicted.extend(evicted_keys.iter().filter_map(|key| self.chunks.pop(key)));
        if !evicted.is_empty() {
            debug!("Evicted {} chunks", evicted.len());
        }
        evicted
    }

    /// Edits one voxel of a cached full-resolution chunk.
    ///
    /// # Returns
    /// `true` if the voxel changed. Edits to chunks that are not cached at full
    /// resolution are ignored.
    pub fn set_block(&mut self, position: Point3<i32>, block: BlockId) -> bool {
        let key = ChunkKey::containing(position, self.width, 1);
        let Some(chunk) = self.chunks.get(&key) else {
            return false;
        };
        let origin = key.origin();
        let mut chunk = chunk.get_mut();
        if !chunk.is_ready() {
            return false;
        }
        chunk.data_mut().set_block(
            position.x - origin.x,
            position.y - origin.y,
            position.z - origin.z,
            block,
        )
    }

    /// Block at `position` in the cached full-resolution chunk, if any.
    pub fn get_block(&mut self, position: Point3<i32>) -> Option<BlockId> {
        let key = ChunkKey::containing(position, self.width, 1);
        let origin = key.origin();
        let chunk = self.chunks.get(&key)?;
        let block = chunk.get().data().get_block(
            position.x - origin.x,
            position.y - origin.y,
            position.z - origin.z,
        );
        block
    }

    /// Resolves the solid voxel at `position` to a selection.
    ///
    /// # Returns
    /// `None` if the full-resolution chunk is not ready or the voxel is air
    pub fn select_voxel(&mut self, position: Point3<i32>) -> Option<Selection> {
        let key = ChunkKey::containing(position, self.width, 1);
        let origin = key.origin();
        let chunk = self.chunks.get(&key)?;
        let chunk = chunk.get();
        if !chunk.is_ready() {
            return None;
        }
        let (x, y, z) = (position.x - origin.x, position.y - origin.y, position.z - origin.z);
        let data = chunk.data();
        match data.get_block(x, y, z) {
            Some(block) if block != AIR => Some(Selection {
                key,
                position,
                voxel_index: data.index(x, y, z)? as u32,
            }),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine_state::{
        camera_state::{Camera, Projection},
        voxels::{
            block::BlockRegistry,
            terrain::{BiomeRegistry, FlatMapGenerator, NoStructure, TerrainGenerator},
        },
    };
    use cgmath::Deg;

    fn flat_pipeline(width: i32) -> Arc<GeneratorPipeline> {
        let blocks = BlockRegistry::with_defaults();
        let mut pipeline = GeneratorPipeline::new(
            42,
            width,
            0,
            Box::new(FlatMapGenerator::new(8, 0)),
            Arc::new(blocks.clone()),
            BiomeRegistry::single("plain", Box::new(NoStructure)),
        );
        pipeline.register(Box::new(TerrainGenerator::from_registry(&blocks).unwrap()));
        Arc::new(pipeline)
    }

    fn config() -> EngineConfig {
        let mut config = EngineConfig::default();
        config.chunk_width = 16;
        config.render.render_distance = 2;
        config.render.min_chunk_y = 0;
        config.render.max_chunk_y = 0;
        config.render.full_detail_distance = 20.0;
        config.generation.retention_distance = 48.0;
        config
    }

    fn manager() -> ChunkManager {
        ChunkManager::new(flat_pipeline(16), &config())
    }

    /// Camera high above the origin looking straight down sees every column.
    fn frustum_looking_down() -> Frustum {
        let camera = Camera::new(Point3::new(8.0, 200.0, 8.0), Deg(0.0), Deg(-90.0));
        let projection = Projection::new(100, 100, Deg(120.0), 0.1, 1000.0);
        Frustum::from_view_proj(&(projection.calc_matrix() * camera.calc_matrix()))
    }

    #[test]
    fn test_lod_is_monotonic() {
        assert_eq!(lod_voxel_size(0.0, 32.0, 4), 1);
        assert_eq!(lod_voxel_size(31.9, 32.0, 4), 1);
        assert_eq!(lod_voxel_size(32.0, 32.0, 4), 2);
        assert_eq!(lod_voxel_size(63.9, 32.0, 4), 2);
        assert_eq!(lod_voxel_size(64.0, 32.0, 4), 4);
        assert_eq!(lod_voxel_size(10_000.0, 32.0, 4), 8);
        assert_eq!(lod_voxel_size(10_000.0, 32.0, 1), 1);

        let mut previous = 1;
        for step in 0..400 {
            let size = lod_voxel_size(step as f32, 32.0, 4);
            assert!(size >= previous);
            previous = size;
        }
    }

    #[test]
    fn test_ensure_generated_is_idempotent() {
        let mut manager = manager();
        let first = manager.ensure_generated(Point3::new(3, 4, 5), 1).unwrap();
        let second = manager.ensure_generated(Point3::new(15, 0, 0), 1).unwrap();
        assert!(first.ptr_eq(&second));
        assert_eq!(manager.pipeline_runs(), 1);
        assert!(first.get().is_ready());
    }

    #[test]
    fn test_missing_chunks_are_recorded_once() {
        let mut manager = manager();
        let frustum = frustum_looking_down();
        let chunks = manager.get_render_chunks(&frustum, 8.0, 8.0);
        assert!(chunks.full.is_empty() && chunks.reduced.is_empty());
        manager.get_render_chunks(&frustum, 8.0, 8.0);

        let missing = manager.take_missing();
        assert_eq!(missing.len(), 25);
        assert!(missing.contains(&ChunkKey::new(0, 0, 0, 1)));
        assert!(manager.take_missing().is_empty());
    }

    #[test]
    fn test_render_chunks_are_split_by_detail_and_sorted() {
        let mut manager = manager();
        let frustum = frustum_looking_down();
        manager.get_render_chunks(&frustum, 8.0, 8.0);
        for key in manager.take_missing() {
            manager.ensure_generated(key.origin(), key.voxel_size).unwrap();
        }

        let chunks = manager.get_render_chunks(&frustum, 8.0, 8.0);
        // Centre plus its four direct neighbours lie within 20 units
        assert_eq!(chunks.full.len(), 5);
        assert_eq!(chunks.reduced.len(), 20);
        assert_eq!(chunks.full[0].get().key(), ChunkKey::new(0, 0, 0, 1));
        assert!(chunks.reduced.iter().all(|chunk| chunk.get().is_reduced()));
    }

    #[test]
    fn test_stale_generation_result_is_dropped() {
        let mut manager = manager();
        let key = ChunkKey::new(16, 0, 0, 1);
        let task = manager.request_generation(key).unwrap();
        assert!(manager.request_generation(key).is_none());

        // Generated synchronously before the task came back
        manager.ensure_generated(key.origin(), 1).unwrap();
        let result = manager.pipeline().generate_chunk(key);
        assert!(!manager.apply_generated(key, task.ticket(), result));
        assert_eq!(manager.pipeline_runs(), 1);
    }

    #[test]
    fn test_generation_result_applied_once() {
        let mut manager = manager();
        let key = ChunkKey::new(0, 0, 16, 2);
        let task = manager.request_generation(key).unwrap();
        let result = manager.pipeline().generate_chunk(key);
        assert!(manager.apply_generated(key, task.ticket(), result));
        assert!(manager.get_chunk(&key).unwrap().get().is_ready());
        let again = manager.pipeline().generate_chunk(key);
        assert!(!manager.apply_generated(key, task.ticket(), again));
    }

    #[test]
    fn test_eviction_by_distance_and_cap() {
        let mut config = config();
        config.generation.max_cached_chunks = 2;
        let mut manager = ChunkManager::new(flat_pipeline(16), &config);
        manager.ensure_generated(Point3::new(0, 0, 0), 1).unwrap();
        manager.ensure_generated(Point3::new(16, 0, 0), 1).unwrap();
        manager.ensure_generated(Point3::new(32, 0, 0), 1).unwrap();
        assert_eq!(manager.len(), 2);

        let far = ChunkKey::new(160, 0, 0, 1);
        manager.request_generation(far).unwrap();

        // The cap pushed out the first chunk; the viewer is near x = 32
        let evicted = manager.evict_outside(40.0, 8.0);
        assert_eq!(evicted.len(), 1);
        assert_eq!(evicted[0].get().key(), ChunkKey::new(0, 0, 0, 1));
        assert_eq!(manager.pending_generations(), 0);

        let evicted = manager.evict_outside(400.0, 8.0);
        assert_eq!(evicted.len(), 2);
        assert!(manager.is_empty());
    }

    #[test]
    fn test_edits_and_selection() {
        let mut manager = manager();
        manager.ensure_generated(Point3::new(0, 0, 0), 1).unwrap();
        let stone = manager.get_block(Point3::new(1, 2, 3)).unwrap();
        assert_ne!(stone, AIR);

        let selection = manager.select_voxel(Point3::new(1, 2, 3)).unwrap();
        assert_eq!(selection.voxel_index, 1 + 3 * 16 + 2 * 256);
        assert!(manager.select_voxel(Point3::new(1, 12, 3)).is_none());

        assert!(manager.set_block(Point3::new(1, 2, 3), AIR));
        assert!(!manager.set_block(Point3::new(1, 2, 3), AIR));
        assert!(manager.select_voxel(Point3::new(1, 2, 3)).is_none());
        // Not cached: ignored
        assert!(!manager.set_block(Point3::new(500, 2, 3), AIR));
    }
}
