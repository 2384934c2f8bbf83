//! # Biome Map
//!
//! The [`MapFragment`] holds, for every column of a chunk's horizontal footprint,
//! the surface height and the biome that decorates it. Fragments are produced by a
//! [`MapGenerator`] before any voxel is written and are passed explicitly to the
//! generators; nothing in a fragment depends on which chunks were generated before.

use noise::{Fbm, MultiFractal, NoiseFn, Perlin};

use crate::config::TerrainNoiseConfig;

use super::biome::{BiomeId, BiomeRegistry};

/// Folds a 64-bit world seed into the 32-bit seed the noise functions take.
///
/// Both halves contribute, so seeds differing only in their high word still
/// produce different noise.
pub(crate) fn fold_seed(seed: u64) -> u32 {
    (seed ^ (seed >> 32)) as u32
}

/// Biome and surface height of one column.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MapColumn {
    pub biome: BiomeId,
    /// World height of the first air voxel above the terrain
    pub height: i32,
}

/// Per-column biome assignment and surface height for one chunk footprint.
#[derive(Debug, Clone, PartialEq)]
pub struct MapFragment {
    width: i32,
    voxel_size: i32,
    grid: i32,
    columns: Vec<MapColumn>,
}

impl MapFragment {
    /// Builds a fragment from columns laid out x-major, one per voxel column.
    pub fn new(width: i32, voxel_size: i32, columns: Vec<MapColumn>) -> Self {
        let grid = width / voxel_size;
        debug_assert_eq!(columns.len(), (grid * grid) as usize);
        Self {
            width,
            voxel_size,
            grid,
            columns,
        }
    }

    /// Column covering local position `(x, z)`, or `None` outside the footprint.
    pub fn get(&self, x: i32, z: i32) -> Option<MapColumn> {
        if !(0..self.width).contains(&x) || !(0..self.width).contains(&z) {
            return None;
        }
        let vs = self.voxel_size;
        self.columns
            .get(((x / vs) + (z / vs) * self.grid) as usize)
            .copied()
    }

    pub fn height(&self, x: i32, z: i32) -> Option<i32> {
        self.get(x, z).map(|column| column.height)
    }

    pub fn biome(&self, x: i32, z: i32) -> Option<BiomeId> {
        self.get(x, z).map(|column| column.biome)
    }
}

/// Produces the map fragment for a chunk footprint.
pub trait MapGenerator: Send + Sync {
    /// # Arguments
    /// * `wx`, `wz` - World position of the footprint's corner
    /// * `width` - Footprint width in world units
    /// * `voxel_size` - Spacing of the sampled columns
    /// * `biomes` - Registry used to pick a biome per column
    fn generate_fragment(
        &self,
        wx: i32,
        wz: i32,
        width: i32,
        voxel_size: i32,
        biomes: &BiomeRegistry,
    ) -> MapFragment;
}

/// Map generator with the same height and biome everywhere.
#[derive(Debug, Clone)]
pub struct FlatMapGenerator {
    height: i32,
    biome: BiomeId,
}

impl FlatMapGenerator {
    pub fn new(height: i32, biome: BiomeId) -> Self {
        Self { height, biome }
    }
}

impl MapGenerator for FlatMapGenerator {
    fn generate_fragment(
        &self,
        _wx: i32,
        _wz: i32,
        width: i32,
        voxel_size: i32,
        _biomes: &BiomeRegistry,
    ) -> MapFragment {
        let grid = width / voxel_size;
        let column = MapColumn {
            biome: self.biome,
            height: self.height,
        };
        MapFragment::new(width, voxel_size, vec![column; (grid * grid) as usize])
    }
}

/// Fractal Perlin height map with a second Perlin field for temperature.
///
/// Heights are sampled at world coordinates, so a column has the same height in a
/// full-resolution chunk and in every reduced chunk that samples it.
pub struct NoiseMapGenerator {
    height_noise: Fbm<Perlin>,
    temperature_noise: Perlin,
    base_height: i32,
    amplitude: f64,
    scale: f64,
    temperature_scale: f64,
    sea_level: i32,
}

impl NoiseMapGenerator {
    pub fn new(seed: u64, config: &TerrainNoiseConfig, sea_level: i32) -> Self {
        let seed = fold_seed(seed);
        Self {
            height_noise: Fbm::<Perlin>::new(seed).set_octaves(config.octaves),
            temperature_noise: Perlin::new(seed.wrapping_add(1)),
            base_height: config.base_height,
            amplitude: config.amplitude,
            scale: config.scale,
            temperature_scale: config.temperature_scale,
            sea_level,
        }
    }

    /// Surface height of the column at world position `(x, z)`.
    pub fn height_at(&self, x: i32, z: i32) -> i32 {
        let sample = self
            .height_noise
            .get([x as f64 * self.scale, z as f64 * self.scale]);
        self.base_height + (sample * self.amplitude).floor() as i32
    }

    /// Temperature of the column at world position `(x, z)`, roughly in `[-1, 1]`.
    pub fn temperature_at(&self, x: i32, z: i32) -> f64 {
        self.temperature_noise.get([
            x as f64 * self.temperature_scale,
            z as f64 * self.temperature_scale,
        ])
    }
}

impl MapGenerator for NoiseMapGenerator {
    fn generate_fragment(
        &self,
        wx: i32,
        wz: i32,
        width: i32,
        voxel_size: i32,
        biomes: &BiomeRegistry,
    ) -> MapFragment {
        let grid = width / voxel_size;
        let mut columns = Vec::with_capacity((grid * grid) as usize);
        for gz in 0..grid {
            for gx in 0..grid {
                let x = wx + gx * voxel_size;
                let z = wz + gz * voxel_size;
                let height = self.height_at(x, z);
                let biome = biomes.select(height - self.sea_level, self.temperature_at(x, z));
                columns.push(MapColumn { biome, height });
            }
        }
        MapFragment::new(width, voxel_size, columns)
    }
}
