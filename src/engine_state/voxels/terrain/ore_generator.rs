//! # Ore Generator
//!
//! Replaces stone with ore veins after the base terrain has been laid down. Each
//! vein is a short random walk started from a position drawn from an RNG seeded by
//! the chunk origin, so veins never depend on neighbouring chunks and stop at the
//! chunk border.

use crate::{
    config::OreConfig,
    engine_state::voxels::{
        block::{BlockId, BlockRegistry},
        chunk::ChunkData,
    },
    error::Result,
};

use super::generator::{GenerationInput, Generator};

/// A resolved ore vein description.
#[derive(Debug, Clone, PartialEq)]
pub struct OreVein {
    pub block: BlockId,
    pub veins_per_chunk: u32,
    pub vein_size: u32,
    pub max_height: i32,
}

/// Ore placement, run after [`TerrainGenerator`](super::TerrainGenerator).
#[derive(Debug, Clone)]
pub struct OreGenerator {
    stone: BlockId,
    veins: Vec<OreVein>,
}

impl OreGenerator {
    pub const NAME: &'static str = "ores";
    pub const PRIORITY: i32 = 2048;
    pub const GENERATOR_SEED: u64 = 0x88e6_c0b3_52f1_0d47;

    pub fn new(stone: BlockId, veins: Vec<OreVein>) -> Self {
        Self { stone, veins }
    }

    /// Resolves every configured ore against the block registry.
    ///
    /// # Returns
    /// [`EngineError::UnknownBlock`](crate::error::EngineError::UnknownBlock) for the
    /// first ore whose block is not registered
    pub fn from_config(registry: &BlockRegistry, ores: &[OreConfig]) -> Result<Self> {
        let veins = ores
            .iter()
            .map(|ore| {
                Ok(OreVein {
                    block: registry.id_for_name(&ore.block)?,
                    veins_per_chunk: ore.veins_per_chunk,
                    vein_size: ore.vein_size,
                    max_height: ore.max_height,
                })
            })
            .collect::<Result<Vec<_>>>()?;
        Ok(Self::new(registry.id_for_name("stone")?, veins))
    }

    fn chunk_seed(seed: u64, wx: i32, wy: i32, wz: i32) -> u64 {
        let mut rng = fastrand::Rng::with_seed(seed);
        let hash = (wx as i64).wrapping_mul(rng.i64(..) | 1)
            ^ (wy as i64).wrapping_mul(rng.i64(..) | 1)
            ^ (wz as i64).wrapping_mul(rng.i64(..) | 1);
        seed ^ hash as u64
    }
}

impl Generator for OreGenerator {
    fn name(&self) -> &str {
        Self::NAME
    }

    fn priority(&self) -> i32 {
        Self::PRIORITY
    }

    fn generator_seed(&self) -> u64 {
        Self::GENERATOR_SEED
    }

    fn generate(&self, seed: u64, chunk: &mut ChunkData, _input: &GenerationInput<'_>) -> Result<()> {
        let key = chunk.key();
        let width = chunk.width();
        let vs = chunk.voxel_size();
        let mut rng = fastrand::Rng::with_seed(Self::chunk_seed(seed, key.wx, key.wy, key.wz));

        for vein in &self.veins {
            for _ in 0..vein.veins_per_chunk {
                let mut x = rng.i32(0..width);
                let mut y = rng.i32(0..width);
                let mut z = rng.i32(0..width);
                // Reduced chunks get fewer, coarser steps covering the same volume
                let steps = (vein.vein_size as i32 / vs).max(1);
                for _ in 0..steps {
                    if key.wy + y < vein.max_height && chunk.get_block(x, y, z) == Some(self.stone) {
                        chunk.update_block_in_generation(x, y, z, vein.block);
                    }
                    match rng.u8(0..6) {
                        0 => x += vs,
                        1 => x -= vs,
                        2 => y += vs,
                        3 => y -= vs,
                        4 => z += vs,
                        _ => z -= vs,
                    }
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
        block::AIR,
        chunk::ChunkKey,
        terrain::{
            biome::{BiomeRegistry, NoStructure},
            biome_map::{FlatMapGenerator, MapGenerator},
            cave_map::CaveMap,
        },
    };

    const STONE: BlockId = 1;
    const ORE: BlockId = 9;

    fn run(chunk: &mut ChunkData, max_height: i32) {
        let biomes = BiomeRegistry::single("plain", Box::new(NoStructure));
        let map = FlatMapGenerator::new(0, 0).generate_fragment(0, 0, chunk.width(), 1, &biomes);
        let cave_map = CaveMap::generate((0, 0, 0), chunk.width(), 1, &map, None);
        let input = GenerationInput {
            cave_map: &cave_map,
            map: &map,
            biomes: &biomes,
            sea_level: 0,
        };
        OreGenerator::new(
            STONE,
            vec![OreVein {
                block: ORE,
                veins_per_chunk: 20,
                vein_size: 8,
                max_height,
            }],
        )
        .generate(3, chunk, &input)
        .unwrap();
    }

    fn stone_chunk() -> ChunkData {
        let mut chunk = ChunkData::new(ChunkKey::new(0, 0, 0, 1), 16);
        for x in 0..16 {
            for y in 0..16 {
                for z in 0..16 {
                    chunk.update_block_in_generation(x, y, z, STONE);
                }
            }
        }
        chunk
    }

    #[test]
    fn test_ore_only_replaces_stone() {
        let mut chunk = ChunkData::new(ChunkKey::new(0, 0, 0, 1), 16);
        run(&mut chunk, 100);
        assert!(chunk.blocks().iter().all(|block| *block == AIR));
    }

    #[test]
    fn test_ore_placed_in_stone() {
        let mut chunk = stone_chunk();
        run(&mut chunk, 100);
        assert!(chunk.blocks().iter().any(|block| *block == ORE));
    }

    #[test]
    fn test_ore_respects_max_height() {
        let mut chunk = stone_chunk();
        run(&mut chunk, 8);
        for y in 8..16 {
            for x in 0..16 {
                for z in 0..16 {
                    assert_eq!(chunk.get_block(x, y, z), Some(STONE));
                }
            }
        }
    }
}
