//! # Chunk Storage
//!
//! Dense voxel storage for one cubic region of the world.
//!
//! A chunk always spans `width` world units along each axis. At voxel size `vs` it
//! holds `(width / vs)³` voxels, each covering a `vs`-wide cube. All accessors take
//! local coordinates in world units (`0..width`) and map them onto the voxel grid,
//! so generators can step through a chunk with `step_by(voxel_size)` regardless of
//! its level of detail.
//!
//! ## Memory Layout
//!
//! Voxels are stored x-major within a row, rows stacked along z, planes stacked
//! along y: `index = gx + gz * grid + gy * grid²`. The same index is written into
//! every vertex of the voxel so the shader can highlight a selected voxel.

use crate::engine_state::voxels::block::{BlockId, AIR};

use super::ChunkKey;

/// Voxel content of a single chunk plus its generation and edit flags.
#[derive(Debug, Clone, PartialEq)]
pub struct ChunkData {
    key: ChunkKey,
    width: i32,
    grid: i32,
    blocks: Vec<BlockId>,
    generated: bool,
    updated: bool,
}

impl ChunkData {
    /// Creates an all-air chunk.
    ///
    /// # Arguments
    /// * `key` - Origin and voxel size of the chunk
    /// * `width` - Edge length of the chunk in world units
    pub fn new(key: ChunkKey, width: i32) -> Self {
        let grid = (width / key.voxel_size).max(1);
        Self {
            key,
            width,
            grid,
            blocks: vec![AIR; (grid * grid * grid) as usize],
            generated: false,
            updated: false,
        }
    }

    pub fn key(&self) -> ChunkKey {
        self.key
    }

    pub fn width(&self) -> i32 {
        self.width
    }

    pub fn voxel_size(&self) -> i32 {
        self.key.voxel_size
    }

    /// Number of voxels along one axis.
    pub fn grid_size(&self) -> i32 {
        self.grid
    }

    /// Raw voxel array in storage order.
    pub fn blocks(&self) -> &[BlockId] {
        &self.blocks
    }

    /// Storage index of the voxel covering local position `(x, y, z)`.
    ///
    /// # Returns
    /// `None` if the position lies outside the chunk.
    pub fn index(&self, x: i32, y: i32, z: i32) -> Option<usize> {
        if !(0..self.width).contains(&x)
            || !(0..self.width).contains(&y)
            || !(0..self.width).contains(&z)
        {
            return None;
        }
        let vs = self.key.voxel_size;
        Some(self.grid_index(x / vs, y / vs, z / vs))
    }

    /// Storage index of grid cell `(gx, gy, gz)`. The cell must be in range.
    pub fn grid_index(&self, gx: i32, gy: i32, gz: i32) -> usize {
        (gx + gz * self.grid + gy * self.grid * self.grid) as usize
    }

    /// Block stored in grid cell `(gx, gy, gz)`, or `None` outside the grid.
    pub fn get_grid(&self, gx: i32, gy: i32, gz: i32) -> Option<BlockId> {
        let range = 0..self.grid;
        if range.contains(&gx) && range.contains(&gy) && range.contains(&gz) {
            Some(self.blocks[self.grid_index(gx, gy, gz)])
        } else {
            None
        }
    }

    /// Block covering local position `(x, y, z)`, or `None` outside the chunk.
    pub fn get_block(&self, x: i32, y: i32, z: i32) -> Option<BlockId> {
        self.index(x, y, z).map(|index| self.blocks[index])
    }

    /// Writes a voxel during generation.
    ///
    /// Does not touch the edit flag; positions outside the chunk are ignored so
    /// that structures reaching over the chunk border stay harmless.
    pub fn update_block_in_generation(&mut self, x: i32, y: i32, z: i32, block: BlockId) {
        if let Some(index) = self.index(x, y, z) {
            self.blocks[index] = block;
        }
    }

    /// Edits a voxel of a generated chunk and marks the chunk as updated.
    ///
    /// # Returns
    /// `true` if the stored block changed
    pub fn set_block(&mut self, x: i32, y: i32, z: i32, block: BlockId) -> bool {
        match self.index(x, y, z) {
            Some(index) if self.blocks[index] != block => {
                self.blocks[index] = block;
                self.updated = true;
                true
            }
            _ => false,
        }
    }

    pub fn is_generated(&self) -> bool {
        self.generated
    }

    /// Marks the voxel content as final. Called once the whole pipeline has run.
    pub fn mark_generated(&mut self) {
        self.generated = true;
    }

    /// Returns `true` if the content changed since the last [`ChunkData::clear_updated`].
    pub fn was_updated(&self) -> bool {
        self.updated
    }

    pub fn clear_updated(&mut self) {
        self.updated = false;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reduced_chunk_has_fewer_voxels() {
        let full = ChunkData::new(ChunkKey::new(0, 0, 0, 1), 16);
        let reduced = ChunkData::new(ChunkKey::new(0, 0, 0, 4), 16);
        assert_eq!(full.blocks().len(), 16 * 16 * 16);
        assert_eq!(reduced.blocks().len(), 4 * 4 * 4);
        assert!(reduced.blocks().iter().all(|block| *block == AIR));
    }

    #[test]
    fn test_positions_inside_one_voxel_share_an_index() {
        let data = ChunkData::new(ChunkKey::new(0, 0, 0, 4), 16);
        assert_eq!(data.index(4, 8, 12), data.index(7, 11, 15));
        assert_ne!(data.index(3, 8, 12), data.index(4, 8, 12));
        assert_eq!(data.index(16, 0, 0), None);
        assert_eq!(data.index(0, -1, 0), None);
    }

    #[test]
    fn test_generation_writes_do_not_flag_updates() {
        let mut data = ChunkData::new(ChunkKey::new(0, 0, 0, 1), 8);
        data.update_block_in_generation(1, 2, 3, 5);
        data.update_block_in_generation(100, 2, 3, 5);
        assert_eq!(data.get_block(1, 2, 3), Some(5));
        assert!(!data.was_updated());
    }

    #[test]
    fn test_edits_flag_updates_only_on_change() {
        let mut data = ChunkData::new(ChunkKey::new(0, 0, 0, 1), 8);
        assert!(!data.set_block(0, 0, 0, AIR));
        assert!(!data.was_updated());
        assert!(data.set_block(0, 0, 0, 3));
        assert!(data.was_updated());
        data.clear_updated();
        assert!(!data.was_updated());
    }
}
