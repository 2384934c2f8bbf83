//! # Generator Interface
//!
//! A generator fills or modifies the voxels of one chunk. Generators are
//! registered with the [`GeneratorPipeline`](super::GeneratorPipeline) and run in
//! ascending priority order, so a later generator overwrites what an earlier one
//! wrote ("last writer wins").

use crate::{engine_state::voxels::chunk::ChunkData, error::Result};

use super::{biome::BiomeRegistry, biome_map::MapFragment, cave_map::CaveMap};

/// Everything a generator may read besides the chunk it writes.
///
/// All of it is precomputed for the chunk's own footprint; generators never look
/// at neighbouring chunks.
pub struct GenerationInput<'a> {
    pub cave_map: &'a CaveMap,
    pub map: &'a MapFragment,
    pub biomes: &'a BiomeRegistry,
    pub sea_level: i32,
}

/// A named, prioritised stage of chunk generation.
pub trait Generator: Send + Sync {
    /// Name used in logs and generator listings.
    fn name(&self) -> &str;

    /// Lower priorities run first.
    fn priority(&self) -> i32;

    /// Fixed per-generator value mixed into the world seed.
    fn generator_seed(&self) -> u64;

    /// Writes this generator's voxels into `chunk`.
    ///
    /// # Arguments
    /// * `seed` - World seed already combined with [`Generator::generator_seed`]
    /// * `chunk` - Chunk being generated; its key gives the world origin
    /// * `input` - Precomputed maps for the chunk footprint
    fn generate(&self, seed: u64, chunk: &mut ChunkData, input: &GenerationInput<'_>) -> Result<()>;
}
