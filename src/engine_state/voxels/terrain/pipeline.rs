//! # Generator Pipeline
//!
//! Owns everything needed to turn a [`ChunkKey`] into a generated [`Chunk`]: the
//! registered generators, the map generator, the optional cave carver and the
//! block and biome registries. It holds no per-chunk state and is shared across
//! generation workers behind an `Arc`.
//!
//! ## Ordering
//!
//! Generators are kept sorted by priority with a stable sort, so generators of
//! equal priority run in registration order.

use std::sync::Arc;

use log::debug;

use crate::{
    config::EngineConfig,
    engine_state::voxels::{
        block::BlockRegistry,
        chunk::{Chunk, ChunkData, ChunkKey},
    },
    error::{EngineError, Result},
};

use super::{
    biome::BiomeRegistry,
    biome_map::{MapGenerator, NoiseMapGenerator},
    cave_map::{CaveCarver, CaveMap},
    generator::{GenerationInput, Generator},
    ore_generator::OreGenerator,
    terrain_generator::TerrainGenerator,
};

/// Seed offset of the cave noise, kept apart from the height noise.
const CAVE_SEED: u64 = 0x2f1b_9a4c_71e3_d805;

pub struct GeneratorPipeline {
    seed: u64,
    width: i32,
    sea_level: i32,
    generators: Vec<Box<dyn Generator>>,
    map_generator: Box<dyn MapGenerator>,
    cave_carver: Option<CaveCarver>,
    blocks: Arc<BlockRegistry>,
    biomes: BiomeRegistry,
}

impl GeneratorPipeline {
    /// Creates an empty pipeline; generators are added with [`Self::register`].
    pub fn new(
        seed: u64,
        width: i32,
        sea_level: i32,
        map_generator: Box<dyn MapGenerator>,
        blocks: Arc<BlockRegistry>,
        biomes: BiomeRegistry,
    ) -> Self {
        Self {
            seed,
            width,
            sea_level,
            generators: Vec::new(),
            map_generator,
            cave_carver: None,
            blocks,
            biomes,
        }
    }

    /// Builds the default pipeline described by `config`: noise height map,
    /// default biomes, optional caves, terrain then ores.
    ///
    /// # Returns
    /// An error if the configuration is invalid or names unknown blocks
    pub fn from_config(config: &EngineConfig) -> Result<Self> {
        config.validate()?;
        let blocks = if config.blocks.is_empty() {
            BlockRegistry::with_defaults()
        } else {
            BlockRegistry::from_config(&config.blocks)?
        };
        let biomes = BiomeRegistry::with_defaults(&blocks)?;
        let terrain = TerrainGenerator::from_registry(&blocks)?;
        let ores = OreGenerator::from_config(&blocks, &config.generation.ores)?;
        let map_generator = NoiseMapGenerator::new(config.seed, &config.generation.terrain, config.sea_level);

        let mut pipeline = Self::new(
            config.seed,
            config.chunk_width,
            config.sea_level,
            Box::new(map_generator),
            Arc::new(blocks),
            biomes,
        );
        if config.generation.caves.enabled {
            pipeline = pipeline.with_caves(CaveCarver::new(config.seed ^ CAVE_SEED, &config.generation.caves));
        }
        pipeline.register(Box::new(terrain));
        pipeline.register(Box::new(ores));
        Ok(pipeline)
    }

    pub fn with_caves(mut self, carver: CaveCarver) -> Self {
        self.cave_carver = Some(carver);
        self
    }

    /// Adds a generator, keeping the list sorted by priority.
    pub fn register(&mut self, generator: Box<dyn Generator>) {
        debug!(
            "Registering generator {} with priority {}",
            generator.name(),
            generator.priority()
        );
        self.generators.push(generator);
        self.generators.sort_by_key(|generator| generator.priority());
    }

    /// Generator names in execution order.
    pub fn generator_names(&self) -> Vec<&str> {
        self.generators.iter().map(|generator| generator.name()).collect()
    }

    pub fn seed(&self) -> u64 {
        self.seed
    }

    pub fn width(&self) -> i32 {
        self.width
    }

    pub fn blocks(&self) -> &Arc<BlockRegistry> {
        &self.blocks
    }

    pub fn biomes(&self) -> &BiomeRegistry {
        &self.biomes
    }

    /// Runs every generator against a fresh chunk at `key`.
    ///
    /// The maps are computed first from the key alone, then each generator runs
    /// in priority order with the world seed mixed with its own seed. The chunk
    /// is marked generated only after the last generator succeeded.
    ///
    /// # Arguments
    /// * `key` - Chunk origin and voxel size; the origin must be aligned to the
    ///   chunk width
    ///
    /// # Returns
    /// The generated chunk, or the first generator error
    pub fn generate_chunk(&self, key: ChunkKey) -> Result<Chunk> {
        let width = self.width;
        let vs = key.voxel_size;
        if vs <= 0 || width % vs != 0 {
            return Err(EngineError::Generation {
                key,
                message: format!("voxel size {} does not divide chunk width {}", vs, width),
            });
        }

        let map = self
            .map_generator
            .generate_fragment(key.wx, key.wz, width, vs, &self.biomes);
        let cave_map = CaveMap::generate(
            (key.wx, key.wy, key.wz),
            width,
            vs,
            &map,
            self.cave_carver.as_ref(),
        );
        let input = GenerationInput {
            cave_map: &cave_map,
            map: &map,
            biomes: &self.biomes,
            sea_level: self.sea_level,
        };

        let mut data = ChunkData::new(key, width);
        for generator in &self.generators {
            generator.generate(self.seed ^ generator.generator_seed(), &mut data, &input)?;
        }
        data.mark_generated();
        Ok(Chunk::new(data))
    }
}
