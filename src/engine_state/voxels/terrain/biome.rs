//! # Biomes and Surface Structures
//!
//! A biome owns a [`SurfaceStructure`] policy that the terrain generator invokes
//! once for every air-to-solid transition in a column of that biome. The policy
//! may overwrite voxels from the surface downward and reports the lowest height
//! it touched; plain stone fills in below that.
//!
//! Structures only draw randomness from the RNG they are handed, which the
//! terrain generator seeds from the world position of the surface. Given the same
//! seed and position a structure always writes the same voxels.

use crate::{
    engine_state::voxels::{
        block::{BlockId, BlockRegistry},
        chunk::ChunkData,
    },
    error::{EngineError, Result},
};

/// Index of a biome in its [`BiomeRegistry`].
pub type BiomeId = usize;

/// Decoration applied at a surface transition.
pub trait SurfaceStructure: Send + Sync {
    /// Decorates the column at local `(x, z)` starting from the surface voxel `top_y`.
    ///
    /// # Arguments
    /// * `chunk` - Chunk being generated
    /// * `top_y` - Local height of the topmost solid voxel
    /// * `bottom` - Local height of the next air voxel below, if the column has one
    ///   inside the chunk; nothing at or below it may be written
    /// * `x`, `z` - Local column position
    /// * `rng` - Deterministically seeded random source
    ///
    /// # Returns
    /// The lowest local height written, or `top_y + voxel_size` if nothing was written.
    fn apply(
        &self,
        chunk: &mut ChunkData,
        top_y: i32,
        bottom: Option<i32>,
        x: i32,
        z: i32,
        rng: &mut fastrand::Rng,
    ) -> i32;
}

/// Leaves the column untouched.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoStructure;

impl SurfaceStructure for NoStructure {
    fn apply(
        &self,
        chunk: &mut ChunkData,
        top_y: i32,
        _bottom: Option<i32>,
        _x: i32,
        _z: i32,
        _rng: &mut fastrand::Rng,
    ) -> i32 {
        top_y + chunk.voxel_size()
    }
}

/// One layer of a [`LayeredStructure`]; its depth is drawn from `min_depth..=max_depth`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StructureLayer {
    pub block: BlockId,
    pub min_depth: i32,
    pub max_depth: i32,
}

/// Stacks layers of blocks below the surface, e.g. one grass then two to four dirt.
///
/// Depths are in world units, so a reduced chunk covers the same depth with fewer
/// voxels.
#[derive(Debug, Clone, Default)]
pub struct LayeredStructure {
    layers: Vec<StructureLayer>,
}

impl LayeredStructure {
    pub fn new(layers: Vec<StructureLayer>) -> Self {
        Self { layers }
    }

    /// Appends a layer resolved from the block registry.
    pub fn with_layer(
        mut self,
        registry: &BlockRegistry,
        block: &str,
        min_depth: i32,
        max_depth: i32,
    ) -> Result<Self> {
        self.layers.push(StructureLayer {
            block: registry.id_for_name(block)?,
            min_depth,
            max_depth: max_depth.max(min_depth),
        });
        Ok(self)
    }
}

impl SurfaceStructure for LayeredStructure {
    fn apply(
        &self,
        chunk: &mut ChunkData,
        top_y: i32,
        bottom: Option<i32>,
        x: i32,
        z: i32,
        rng: &mut fastrand::Rng,
    ) -> i32 {
        let vs = chunk.voxel_size();
        let floor = bottom.unwrap_or(-1).max(-1);
        let mut y = top_y;
        for layer in &self.layers {
            let depth = rng.i32(layer.min_depth..=layer.max_depth);
            let slabs = (depth + vs - 1) / vs;
            for _ in 0..slabs {
                if y <= floor {
                    return y + vs;
                }
                chunk.update_block_in_generation(x, y, z, layer.block);
                y -= vs;
            }
        }
        y + vs
    }
}

/// A named biome: where it appears and how its surface looks.
pub struct Biome {
    pub name: String,
    /// Surface height range relative to sea level, inclusive
    pub height_range: (i32, i32),
    /// Temperature range, inclusive
    pub temperature_range: (f64, f64),
    pub structure: Box<dyn SurfaceStructure>,
}

impl Biome {
    pub fn new(name: &str, structure: Box<dyn SurfaceStructure>) -> Self {
        Self {
            name: name.to_string(),
            height_range: (i32::MIN, i32::MAX),
            temperature_range: (f64::NEG_INFINITY, f64::INFINITY),
            structure,
        }
    }

    pub fn with_height_range(mut self, min: i32, max: i32) -> Self {
        self.height_range = (min, max);
        self
    }

    pub fn with_temperature_range(mut self, min: f64, max: f64) -> Self {
        self.temperature_range = (min, max);
        self
    }

    fn accepts(&self, relative_height: i32, temperature: f64) -> bool {
        (self.height_range.0..=self.height_range.1).contains(&relative_height)
            && (self.temperature_range.0..=self.temperature_range.1).contains(&temperature)
    }
}

/// Ordered set of biomes. Selection picks the first biome that accepts a column.
pub struct BiomeRegistry {
    biomes: Vec<Biome>,
}

impl BiomeRegistry {
    /// Creates a registry containing a single biome that accepts every column.
    pub fn single(name: &str, structure: Box<dyn SurfaceStructure>) -> Self {
        Self {
            biomes: vec![Biome::new(name, structure)],
        }
    }

    /// Creates a registry from a list of biomes; the first one is the fallback.
    pub fn new(biomes: Vec<Biome>) -> Result<Self> {
        if biomes.is_empty() {
            return Err(EngineError::invalid_config(
                "biomes",
                "at least one biome is required",
            ));
        }
        Ok(Self { biomes })
    }

    /// The built-in biome set: ocean floors, beaches, cold tundra, rocky highlands
    /// and grassland.
    pub fn with_defaults(blocks: &BlockRegistry) -> Result<Self> {
        let grassland = Biome::new(
            "grassland",
            Box::new(
                LayeredStructure::default()
                    .with_layer(blocks, "grass", 1, 1)?
                    .with_layer(blocks, "dirt", 2, 4)?,
            ),
        );
        let ocean = Biome::new(
            "ocean",
            Box::new(
                LayeredStructure::default()
                    .with_layer(blocks, "sand", 1, 3)?
                    .with_layer(blocks, "gravel", 0, 2)?,
            ),
        )
        .with_height_range(i32::MIN, -5);
        let beach = Biome::new(
            "beach",
            Box::new(LayeredStructure::default().with_layer(blocks, "sand", 2, 4)?),
        )
        .with_height_range(-4, 3);
        let highlands = Biome::new("highlands", Box::new(NoStructure)).with_height_range(48, i32::MAX);
        let tundra = Biome::new(
            "tundra",
            Box::new(LayeredStructure::default().with_layer(blocks, "dirt", 1, 3)?),
        )
        .with_temperature_range(f64::NEG_INFINITY, -0.35);

        Self::new(vec![grassland, ocean, beach, highlands, tundra])
    }

    /// Picks the biome for a column. The first registered biome is the fallback.
    ///
    /// # Arguments
    /// * `relative_height` - Surface height minus sea level
    /// * `temperature` - Column temperature
    pub fn select(&self, relative_height: i32, temperature: f64) -> BiomeId {
        self.biomes
            .iter()
            .enumerate()
            .skip(1)
            .find(|(_, biome)| biome.accepts(relative_height, temperature))
            .map_or(0, |(id, _)| id)
    }

    pub fn get(&self, id: BiomeId) -> Option<&Biome> {
        self.biomes.get(id)
    }

    pub fn id_for_name(&self, name: &str) -> Result<BiomeId> {
        self.biomes
            .iter()
            .position(|biome| biome.name == name)
            .ok_or_else(|| EngineError::UnknownBiome {
                name: name.to_string(),
            })
    }

    pub fn len(&self) -> usize {
        self.biomes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.biomes.is_empty()
    }
}
