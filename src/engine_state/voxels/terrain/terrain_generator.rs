//! # Terrain Generator
//!
//! Lays down the base strata of a chunk: stone below the surface, water in air
//! below sea level, and surface decoration delegated to each column's biome.
//!
//! ## Column Walk
//!
//! Each column is walked from the top slab downward. The cave map tells whether a
//! slab is solid, and the walk remembers whether the slab above it was air. On an
//! air-to-solid transition the local RNG is reseeded from the world position of
//! the transition and the biome's surface structure runs; it reports the lowest
//! height it wrote and the walk resumes with plain stone just below that.
//!
//! Because the RNG is reseeded per transition from world coordinates alone, the
//! content of a chunk depends only on the world seed and the chunk's own position.

use crate::{
    engine_state::voxels::{
        block::{BlockId, BlockRegistry, AIR},
        chunk::ChunkData,
    },
    error::{EngineError, Result},
};

use super::generator::{GenerationInput, Generator};

/// Base terrain generator.
#[derive(Debug, Clone)]
pub struct TerrainGenerator {
    stone: BlockId,
    water: BlockId,
}

impl TerrainGenerator {
    pub const NAME: &'static str = "terrain";
    pub const PRIORITY: i32 = 1024;
    pub const GENERATOR_SEED: u64 = 0x65c7_f9fd_c064_1f94;

    /// Creates the generator with explicit stone and water blocks.
    pub fn new(stone: BlockId, water: BlockId) -> Self {
        Self { stone, water }
    }

    /// Resolves `stone` and `water` from the block registry.
    pub fn from_registry(registry: &BlockRegistry) -> Result<Self> {
        Ok(Self::new(
            registry.id_for_name("stone")?,
            registry.id_for_name("water")?,
        ))
    }

    /// Three odd per-axis multipliers derived from the seed.
    fn axis_seeds(seed: u64) -> (i64, i64, i64) {
        let mut rng = fastrand::Rng::with_seed(seed);
        (
            (rng.i32(..) | 1) as i64,
            (rng.i32(..) | 1) as i64,
            (rng.i32(..) | 1) as i64,
        )
    }

    /// Seed for the structure RNG at world position `(x, y, z)`.
    fn position_seed(axis_seeds: (i64, i64, i64), x: i32, y: i32, z: i32) -> u64 {
        let (seed_x, seed_y, seed_z) = axis_seeds;
        let hash = seed_x.wrapping_mul(x as i64).wrapping_shl(32)
            ^ seed_y.wrapping_mul(y as i64)
            ^ seed_z.wrapping_mul(z as i64);
        hash as u64
    }
}

impl Generator for TerrainGenerator {
    fn name(&self) -> &str {
        Self::NAME
    }

    fn priority(&self) -> i32 {
        Self::PRIORITY
    }

    fn generator_seed(&self) -> u64 {
        Self::GENERATOR_SEED
    }

    fn generate(&self, seed: u64, chunk: &mut ChunkData, input: &GenerationInput<'_>) -> Result<()> {
        let key = chunk.key();
        let width = chunk.width();
        let vs = chunk.voxel_size();
        let axis_seeds = Self::axis_seeds(seed);
        let mut rng = fastrand::Rng::with_seed(seed);

        for x in (0..width).step_by(vs as usize) {
            for z in (0..width).step_by(vs as usize) {
                let column = input.map.get(x, z).ok_or_else(|| EngineError::Generation {
                    key,
                    message: format!("map fragment has no column at ({}, {})", x, z),
                })?;
                let structure = input
                    .biomes
                    .get(column.biome)
                    .map(|biome| biome.structure.as_ref());

                let mut make_surface = true;
                let mut y = width - vs;
                while y >= 0 {
                    if input.cave_map.is_solid(x, y, z) {
                        let surface = if make_surface {
                            input
                                .cave_map
                                .find_terrain_change_above(x, z, y)
                                .map(|change| change - vs)
                        } else {
                            None
                        };
                        match (surface, structure) {
                            (Some(surface), Some(structure)) => {
                                rng.seed(Self::position_seed(
                                    axis_seeds,
                                    key.wx + x,
                                    key.wy + surface,
                                    key.wz + z,
                                ));
                                let bottom = input.cave_map.find_terrain_change_below(x, z, surface);
                                let lowest = structure.apply(chunk, surface, bottom, x, z, &mut rng);
                                y = (y + vs).min(lowest);
                            }
                            _ => chunk.update_block_in_generation(x, y, z, self.stone),
                        }
                        make_surface = false;
                    } else {
                        let world_y = key.wy + y;
                        let block = if world_y < input.sea_level
                            && world_y >= column.height - (vs - 1)
                        {
                            self.water
                        } else {
                            AIR
                        };
                        chunk.update_block_in_generation(x, y, z, block);
                        make_surface = true;
                    }
                    y -= vs;
                }
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine_state::voxels::{
        chunk::ChunkKey,
        terrain::{
            biome::{BiomeRegistry, LayeredStructure, NoStructure, StructureLayer},
            biome_map::{FlatMapGenerator, MapGenerator},
            cave_map::CaveMap,
        },
    };

    const STONE: BlockId = 1;
    const WATER: BlockId = 2;
    const GRASS: BlockId = 3;

    fn generate_flat(height: i32, sea_level: i32, origin_y: i32, biomes: &BiomeRegistry) -> ChunkData {
        let width = 16;
        let key = ChunkKey::new(0, origin_y, 0, 1);
        let map = FlatMapGenerator::new(height, 0).generate_fragment(0, 0, width, 1, biomes);
        let cave_map = CaveMap::generate((0, origin_y, 0), width, 1, &map, None);
        let mut chunk = ChunkData::new(key, width);
        let input = GenerationInput {
            cave_map: &cave_map,
            map: &map,
            biomes,
            sea_level,
        };
        TerrainGenerator::new(STONE, WATER)
            .generate(7, &mut chunk, &input)
            .unwrap();
        chunk
    }

    #[test]
    fn test_water_fills_air_below_sea_level() {
        let biomes = BiomeRegistry::single("plain", Box::new(NoStructure));
        let chunk = generate_flat(4, 10, 0, &biomes);
        for y in 0..16 {
            let expected = match y {
                0..=3 => STONE,
                4..=9 => WATER,
                _ => AIR,
            };
            assert_eq!(chunk.get_block(5, y, 5), Some(expected), "y = {}", y);
        }
    }

    #[test]
    fn test_surface_structure_runs_once_per_transition() {
        let biomes = BiomeRegistry::single(
            "grass",
            Box::new(LayeredStructure::new(vec![StructureLayer {
                block: GRASS,
                min_depth: 1,
                max_depth: 1,
            }])),
        );
        let chunk = generate_flat(8, 0, 0, &biomes);
        assert_eq!(chunk.get_block(3, 7, 3), Some(GRASS));
        assert_eq!(chunk.get_block(3, 6, 3), Some(STONE));
        assert_eq!(chunk.get_block(3, 0, 3), Some(STONE));
        assert_eq!(chunk.get_block(3, 8, 3), Some(AIR));
    }

    #[test]
    fn test_buried_chunk_gets_no_surface() {
        let biomes = BiomeRegistry::single(
            "grass",
            Box::new(LayeredStructure::new(vec![StructureLayer {
                block: GRASS,
                min_depth: 1,
                max_depth: 1,
            }])),
        );
        // Terrain reaches far above the chunk, so its top slab is not a surface
        let chunk = generate_flat(100, 0, 0, &biomes);
        assert!(chunk.blocks().iter().all(|block| *block == STONE));
    }

    #[test]
    fn test_chunk_at_surface_top_gets_decorated() {
        let biomes = BiomeRegistry::single(
            "grass",
            Box::new(LayeredStructure::new(vec![StructureLayer {
                block: GRASS,
                min_depth: 1,
                max_depth: 1,
            }])),
        );
        // Surface exactly at the chunk's upper edge
        let chunk = generate_flat(16, 0, 0, &biomes);
        assert_eq!(chunk.get_block(0, 15, 0), Some(GRASS));
        assert_eq!(chunk.get_block(0, 14, 0), Some(STONE));
    }

    #[test]
    fn test_position_seed_depends_on_every_axis() {
        let seeds = TerrainGenerator::axis_seeds(42);
        let base = TerrainGenerator::position_seed(seeds, 1, 2, 3);
        assert_ne!(base, TerrainGenerator::position_seed(seeds, 2, 2, 3));
        assert_ne!(base, TerrainGenerator::position_seed(seeds, 1, 3, 3));
        assert_ne!(base, TerrainGenerator::position_seed(seeds, 1, 2, 4));
    }
}
