//! # Cave Map
//!
//! Per-column solid/air summary of a chunk, computed before any generator runs.
//!
//! Each `(x, z)` column of the chunk is stored as a `u128` mask: bit `i` is set
//! when the slab at local height `i * voxel_size` is solid. A separate flag records
//! the solidity of the slab directly above the chunk so that the topmost slab can
//! be recognised as a surface (or not) without looking at the neighbouring chunk.
//!
//! ## Queries
//!
//! [`CaveMap::find_terrain_change_above`] and [`CaveMap::find_terrain_change_below`]
//! answer "where does solidity flip next" for a column with a mask, a shift and a
//! trailing or leading zero count, so the terrain generator never scans a column.
//! Both return `None` when there is no flip inside the chunk or when asked about a
//! position outside it.

use noise::{NoiseFn, Perlin};

use crate::config::CaveConfig;

use super::biome_map::{fold_seed, MapFragment};

/// 3D Perlin cave carver.
///
/// Samples inside `[-threshold, threshold]` are carved to air, except within
/// `crust_depth` of the surface so caves never open the terrain from above.
#[derive(Debug, Clone)]
pub struct CaveCarver {
    perlin: Perlin,
    scale: f64,
    threshold: f64,
    crust_depth: i32,
}

impl CaveCarver {
    pub fn new(seed: u64, config: &CaveConfig) -> Self {
        Self {
            perlin: Perlin::new(fold_seed(seed)),
            scale: config.scale,
            threshold: config.threshold,
            crust_depth: config.crust_depth,
        }
    }

    /// Returns `true` if the voxel at world position `(x, y, z)` is carved out of
    /// a column whose surface height is `height`.
    pub fn carves(&self, x: i32, y: i32, z: i32, height: i32) -> bool {
        if y >= height - self.crust_depth {
            return false;
        }
        let sample = self.perlin.get([
            x as f64 * self.scale,
            y as f64 * self.scale,
            z as f64 * self.scale,
        ]);
        (-self.threshold..=self.threshold).contains(&sample)
    }
}

/// Packed solid/air masks for every column of one chunk.
#[derive(Debug, Clone, PartialEq)]
pub struct CaveMap {
    width: i32,
    voxel_size: i32,
    grid: i32,
    columns: Vec<u128>,
    ceilings: Vec<bool>,
}

impl CaveMap {
    /// Builds the cave map for the chunk at `(wx, wy, wz)`.
    ///
    /// # Arguments
    /// * `origin` - World position of the chunk origin
    /// * `width` - Chunk width in world units
    /// * `voxel_size` - Level of detail; one bit covers `voxel_size` world units
    /// * `map` - Surface heights for the chunk's columns
    /// * `carver` - Optional cave carver
    pub fn generate(
        origin: (i32, i32, i32),
        width: i32,
        voxel_size: i32,
        map: &MapFragment,
        carver: Option<&CaveCarver>,
    ) -> Self {
        let (wx, wy, wz) = origin;
        let grid = width / voxel_size;
        let mut columns = Vec::with_capacity((grid * grid) as usize);
        let mut ceilings = Vec::with_capacity((grid * grid) as usize);

        let is_solid = |x: i32, y: i32, z: i32, height: i32| {
            y < height && !carver.is_some_and(|carver| carver.carves(x, y, z, height))
        };

        for gz in 0..grid {
            for gx in 0..grid {
                let x = gx * voxel_size;
                let z = gz * voxel_size;
                let height = map.height(x, z).unwrap_or(i32::MIN);
                let mut mask = 0u128;
                for gy in 0..grid {
                    if is_solid(wx + x, wy + gy * voxel_size, wz + z, height) {
                        mask |= 1u128 << gy;
                    }
                }
                columns.push(mask);
                ceilings.push(is_solid(wx + x, wy + width, wz + z, height));
            }
        }

        Self {
            width,
            voxel_size,
            grid,
            columns,
            ceilings,
        }
    }

    /// Builds a cave map from explicit column masks, laid out x-major.
    pub fn from_columns(width: i32, voxel_size: i32, columns: Vec<u128>, ceilings: Vec<bool>) -> Self {
        let grid = width / voxel_size;
        debug_assert_eq!(columns.len(), (grid * grid) as usize);
        debug_assert_eq!(ceilings.len(), (grid * grid) as usize);
        Self {
            width,
            voxel_size,
            grid,
            columns,
            ceilings,
        }
    }

    /// Number of slabs per column, `width / voxel_size`.
    pub fn bit_count(&self) -> u32 {
        self.grid as u32
    }

    pub fn voxel_size(&self) -> i32 {
        self.voxel_size
    }

    fn column_index(&self, x: i32, z: i32) -> Option<usize> {
        if !(0..self.width).contains(&x) || !(0..self.width).contains(&z) {
            return None;
        }
        let vs = self.voxel_size;
        Some(((x / vs) + (z / vs) * self.grid) as usize)
    }

    fn valid_bits(&self) -> u128 {
        if self.grid >= 128 {
            u128::MAX
        } else {
            (1u128 << self.grid) - 1
        }
    }

    /// Raw mask of column `(x, z)`.
    pub fn column(&self, x: i32, z: i32) -> Option<u128> {
        self.column_index(x, z).map(|index| self.columns[index])
    }

    /// Solidity of the slab directly above the chunk in column `(x, z)`.
    pub fn ceiling(&self, x: i32, z: i32) -> Option<bool> {
        self.column_index(x, z).map(|index| self.ceilings[index])
    }

    /// Returns `true` if the slab covering `(x, y, z)` is solid.
    pub fn is_solid(&self, x: i32, y: i32, z: i32) -> bool {
        if !(0..self.width).contains(&y) {
            return false;
        }
        self.column(x, z)
            .is_some_and(|mask| mask >> (y / self.voxel_size) & 1 == 1)
    }

    /// Smallest local height above `y` at which solidity differs from `y`.
    ///
    /// The slab directly above the chunk counts; a flip there is reported as
    /// `width`.
    pub fn find_terrain_change_above(&self, x: i32, z: i32, y: i32) -> Option<i32> {
        let index = self.column_index(x, z)?;
        if !(0..self.width).contains(&y) {
            return None;
        }
        let mask = self.columns[index];
        let slab = (y / self.voxel_size) as u32;
        let solid = mask >> slab & 1 == 1;
        let differing = (if solid { !mask } else { mask }) & self.valid_bits();

        let above = differing.checked_shr(slab + 1).unwrap_or(0);
        if above != 0 {
            let flip = slab + 1 + above.trailing_zeros();
            return Some(flip as i32 * self.voxel_size);
        }
        if self.ceilings[index] != solid {
            return Some(self.width);
        }
        None
    }

    /// Largest local height below `y` at which solidity differs from `y`.
    pub fn find_terrain_change_below(&self, x: i32, z: i32, y: i32) -> Option<i32> {
        let index = self.column_index(x, z)?;
        if !(0..self.width).contains(&y) {
            return None;
        }
        let mask = self.columns[index];
        let slab = (y / self.voxel_size) as u32;
        let solid = mask >> slab & 1 == 1;
        let differing = (if solid { !mask } else { mask }) & self.valid_bits();

        let below = differing & ((1u128 << slab) - 1);
        if below == 0 {
            return None;
        }
        let flip = 127 - below.leading_zeros();
        Some(flip as i32 * self.voxel_size)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_high_seed_bits_change_the_caves() {
        let config = CaveConfig::default();
        let low = CaveCarver::new(1, &config);
        let high = CaveCarver::new(1 + (1 << 32), &config);
        let differing = (0..32)
            .flat_map(|x| (0..32).flat_map(move |z| (0..32).map(move |y| (x, y, z))))
            .filter(|&(x, y, z)| low.carves(x, y, z, 100) != high.carves(x, y, z, 100))
            .count();
        assert!(differing > 0);
    }

    /// Straight column walk used as the reference for the bit tricks.
    fn scan_above(map: &CaveMap, x: i32, z: i32, y: i32) -> Option<i32> {
        let vs = map.voxel_size();
        let solid = map.is_solid(x, y, z);
        let mut probe = (y / vs + 1) * vs;
        while probe < map.width {
            if map.is_solid(x, probe, z) != solid {
                return Some(probe);
            }
            probe += vs;
        }
        (map.ceiling(x, z) != Some(solid)).then_some(map.width)
    }

    fn scan_below(map: &CaveMap, x: i32, z: i32, y: i32) -> Option<i32> {
        let vs = map.voxel_size();
        let solid = map.is_solid(x, y, z);
        let mut probe = (y / vs - 1) * vs;
        while probe >= 0 {
            if map.is_solid(x, probe, z) != solid {
                return Some(probe);
            }
            probe -= vs;
        }
        None
    }

    fn random_map(width: i32, voxel_size: i32, seed: u64) -> CaveMap {
        let mut rng = fastrand::Rng::with_seed(seed);
        let grid = width / voxel_size;
        let count = (grid * grid) as usize;
        let columns = (0..count)
            .map(|_| {
                // Mix of dense, sparse and layered columns
                match rng.u8(0..3) {
                    0 => rng.u128(..),
                    1 => rng.u128(..) & rng.u128(..) & rng.u128(..),
                    _ => (1u128 << rng.u32(0..grid as u32)) - 1,
                }
            })
            .collect();
        let ceilings = (0..count).map(|_| rng.bool()).collect();
        CaveMap::from_columns(width, voxel_size, columns, ceilings)
    }

    #[test]
    fn test_bit_count_matches_grid() {
        assert_eq!(random_map(32, 1, 1).bit_count(), 32);
        assert_eq!(random_map(32, 4, 1).bit_count(), 8);
        assert_eq!(random_map(128, 1, 1).bit_count(), 128);
    }

    #[test]
    fn test_queries_match_linear_scan() {
        for (width, voxel_size, seed) in [(16, 1, 7), (32, 2, 11), (128, 1, 13), (64, 8, 17)] {
            let map = random_map(width, voxel_size, seed);
            for x in (0..width).step_by(voxel_size as usize).take(6) {
                for z in (0..width).step_by(voxel_size as usize).take(6) {
                    for y in (0..width).step_by(voxel_size as usize) {
                        assert_eq!(
                            map.find_terrain_change_above(x, z, y),
                            scan_above(&map, x, z, y),
                            "above at ({}, {}, {}) width {} vs {}",
                            x, y, z, width, voxel_size
                        );
                        assert_eq!(
                            map.find_terrain_change_below(x, z, y),
                            scan_below(&map, x, z, y),
                            "below at ({}, {}, {}) width {} vs {}",
                            x, y, z, width, voxel_size
                        );
                    }
                }
            }
        }
    }

    #[test]
    fn test_out_of_range_queries_return_none() {
        let map = random_map(16, 1, 3);
        assert_eq!(map.find_terrain_change_above(16, 0, 0), None);
        assert_eq!(map.find_terrain_change_above(0, -1, 0), None);
        assert_eq!(map.find_terrain_change_above(0, 0, 16), None);
        assert_eq!(map.find_terrain_change_below(0, 0, -1), None);
        assert_eq!(map.column(0, 16), None);
    }

    #[test]
    fn test_solid_column_under_solid_ceiling_has_no_change() {
        let grid = 8;
        let map = CaveMap::from_columns(8, 1, vec![0xFF; grid * grid], vec![true; grid * grid]);
        assert_eq!(map.find_terrain_change_above(0, 0, 7), None);
        assert_eq!(map.find_terrain_change_below(0, 0, 7), None);
    }

    #[test]
    fn test_solid_column_under_open_sky_changes_at_width() {
        let grid = 8;
        let map = CaveMap::from_columns(8, 1, vec![0xFF; grid * grid], vec![false; grid * grid]);
        assert_eq!(map.find_terrain_change_above(3, 4, 7), Some(8));
    }
}
