//! # Engine Configuration
//!
//! Every tunable of the terrain and rendering core lives in [`EngineConfig`].
//! Configurations are plain JSON documents; any field that is left out falls back
//! to its default, so an empty object `{}` is a valid configuration.
//!
//! ```json
//! {
//!     "seed": 42,
//!     "chunk_width": 32,
//!     "render": { "meshing_budget_ms": 8, "full_detail_distance": 64.0 }
//! }
//! ```
//!
//! Configurations are validated once at startup with [`EngineConfig::validate`];
//! a configuration that fails validation is never handed to the engine.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{EngineError, Result};

/// Largest supported number of voxels along one axis of a chunk.
///
/// Column masks in the cave map are stored as `u128`, one bit per slab.
pub const MAX_CHUNK_GRID: i32 = 128;

/// Top-level configuration for the engine.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// World seed, the only source of terrain randomness
    pub seed: u64,
    /// Width of a chunk in world units, shared by every level of detail
    pub chunk_width: i32,
    /// World height below which air above the terrain is filled with water
    pub sea_level: i32,
    /// Block table; when empty the built-in default table is used
    pub blocks: Vec<BlockConfig>,
    /// Terrain generation settings
    pub generation: GenerationConfig,
    /// Renderer settings
    pub render: RenderConfig,
}

/// A single entry of the block table.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct BlockConfig {
    pub name: String,
    #[serde(default)]
    pub transparent: bool,
}

/// Settings for the generator pipeline and the chunk cache.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GenerationConfig {
    /// Number of background generation workers
    pub workers: usize,
    pub terrain: TerrainNoiseConfig,
    pub caves: CaveConfig,
    pub ores: Vec<OreConfig>,
    /// Hard cap on cached chunks; the least recently used chunk is dropped first
    pub max_cached_chunks: usize,
    /// Horizontal distance beyond which chunks are evicted
    pub retention_distance: f32,
}

/// Parameters of the noise driven height map.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TerrainNoiseConfig {
    pub base_height: i32,
    pub amplitude: f64,
    pub scale: f64,
    pub octaves: usize,
    /// Scale of the temperature noise used to pick biomes
    pub temperature_scale: f64,
}

/// Cave carving parameters.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CaveConfig {
    pub enabled: bool,
    pub scale: f64,
    /// Noise values within `[-threshold, threshold]` are carved out
    pub threshold: f64,
    /// Depth below the surface that is never carved
    pub crust_depth: i32,
}

/// One kind of ore vein placed by the ore generator.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct OreConfig {
    pub block: String,
    pub veins_per_chunk: u32,
    pub vein_size: u32,
    /// Veins are only placed below this world height
    pub max_height: i32,
}

/// Renderer and level of detail settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RenderConfig {
    /// Horizontal radius of the chunk search, in chunks
    pub render_distance: i32,
    /// Chunks whose centre is closer than this are rendered at full resolution
    pub full_detail_distance: f32,
    /// Number of detail levels, voxel sizes 1, 2, 4 ...
    pub lod_levels: u32,
    /// Lowest chunk layer considered for rendering, in chunks
    pub min_chunk_y: i32,
    /// Highest chunk layer considered for rendering, in chunks
    pub max_chunk_y: i32,
    /// Time per frame after which no new meshes are built
    pub meshing_budget_ms: u64,
    pub fov_degrees: f32,
    pub znear: f32,
    pub zfar: f32,
    pub viewport_width: u32,
    pub viewport_height: u32,
    pub fog_color: [f32; 3],
    pub fog_density: f32,
    pub atlas_size: u32,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            seed: 0,
            chunk_width: 32,
            sea_level: 0,
            blocks: Vec::new(),
            generation: GenerationConfig::default(),
            render: RenderConfig::default(),
        }
    }
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            workers: 4,
            terrain: TerrainNoiseConfig::default(),
            caves: CaveConfig::default(),
            ores: vec![
                OreConfig {
                    block: "coal_ore".to_string(),
                    veins_per_chunk: 6,
                    vein_size: 8,
                    max_height: 32,
                },
                OreConfig {
                    block: "iron_ore".to_string(),
                    veins_per_chunk: 3,
                    vein_size: 5,
                    max_height: -16,
                },
            ],
            max_cached_chunks: 4096,
            retention_distance: 512.0,
        }
    }
}

impl Default for TerrainNoiseConfig {
    fn default() -> Self {
        Self {
            base_height: 8,
            amplitude: 40.0,
            scale: 0.005,
            octaves: 4,
            temperature_scale: 0.002,
        }
    }
}

impl Default for CaveConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            scale: 0.04,
            threshold: 0.08,
            crust_depth: 6,
        }
    }
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            render_distance: 8,
            full_detail_distance: 96.0,
            lod_levels: 3,
            min_chunk_y: -2,
            max_chunk_y: 3,
            meshing_budget_ms: 12,
            fov_degrees: 70.0,
            znear: 0.1,
            zfar: 1000.0,
            viewport_width: 1280,
            viewport_height: 720,
            fog_color: [0.6, 0.7, 0.85],
            fog_density: 0.002,
            atlas_size: 16,
        }
    }
}

impl EngineConfig {
    /// Parses a configuration from a JSON string.
    ///
    /// # Arguments
    /// * `json` - The JSON document
    ///
    /// # Returns
    /// The parsed configuration, or [`EngineError::ConfigParse`] if the document is malformed
    pub fn from_json_str(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Reads and parses a configuration file.
    ///
    /// # Arguments
    /// * `path` - Location of the JSON file
    ///
    /// # Returns
    /// The parsed configuration, or an I/O or parse error
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        Self::from_json_str(&contents)
    }

    /// Voxel size of the coarsest detail level.
    pub fn max_voxel_size(&self) -> i32 {
        1 << self.render.lod_levels.saturating_sub(1)
    }

    /// Checks the configuration for values the engine cannot work with.
    ///
    /// Block names referenced by ore veins are checked later, when the block
    /// registry is resolved.
    pub fn validate(&self) -> Result<()> {
        if self.chunk_width <= 0 || self.chunk_width & (self.chunk_width - 1) != 0 {
            return Err(EngineError::invalid_config(
                "chunk_width",
                format!("{} is not a positive power of two", self.chunk_width),
            ));
        }
        if self.chunk_width > MAX_CHUNK_GRID {
            return Err(EngineError::invalid_config(
                "chunk_width",
                format!("{} exceeds {}", self.chunk_width, MAX_CHUNK_GRID),
            ));
        }
        if self.render.lod_levels == 0 || self.render.lod_levels > 8 {
            return Err(EngineError::invalid_config(
                "render.lod_levels",
                "must be between 1 and 8",
            ));
        }
        if self.max_voxel_size() > self.chunk_width {
            return Err(EngineError::invalid_config(
                "render.lod_levels",
                format!(
                    "voxel size {} is larger than the chunk width {}",
                    self.max_voxel_size(),
                    self.chunk_width
                ),
            ));
        }
        if self.render.full_detail_distance <= 0.0 {
            return Err(EngineError::invalid_config(
                "render.full_detail_distance",
                "must be positive",
            ));
        }
        if self.render.render_distance < 0 {
            return Err(EngineError::invalid_config(
                "render.render_distance",
                "must not be negative",
            ));
        }
        if self.render.min_chunk_y > self.render.max_chunk_y {
            return Err(EngineError::invalid_config(
                "render.min_chunk_y",
                "must not be above render.max_chunk_y",
            ));
        }
        if self.render.viewport_width == 0 || self.render.viewport_height == 0 {
            return Err(EngineError::invalid_config(
                "render.viewport_width",
                "viewport must not be empty",
            ));
        }
        if self.generation.workers == 0 {
            return Err(EngineError::invalid_config(
                "generation.workers",
                "at least one worker is required",
            ));
        }
        if self.generation.max_cached_chunks == 0 {
            return Err(EngineError::invalid_config(
                "generation.max_cached_chunks",
                "must be positive",
            ));
        }
        if self.generation.terrain.octaves == 0 {
            return Err(EngineError::invalid_config(
                "generation.terrain.octaves",
                "must be positive",
            ));
        }
        Ok(())
    }
}
