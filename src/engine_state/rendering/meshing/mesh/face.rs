use cgmath::Point3;

use crate::engine_state::voxels::block::{block_side::BlockSide, BlockId};

/// One visible side of a voxel, as four corners in chunk-local world units.
///
/// Corners are named as seen from outside the voxel: lower left, lower right,
/// upper left, upper right.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Face {
    pub lr: Point3<i32>,
    pub ll: Point3<i32>,
    pub ur: Point3<i32>,
    pub ul: Point3<i32>,
    pub block_id: BlockId,
    pub block_side: BlockSide,
}

impl Face {
    /// Builds the face of the voxel whose low corner is `(i, j, k)` and whose
    /// edge length is `size`.
    pub fn new(i: i32, j: i32, k: i32, size: i32, block_id: BlockId, block_side: BlockSide) -> Self {
        let (i1, j1, k1) = (i + size, j + size, k + size);
        let (ll, lr, ul, ur) = match block_side {
            BlockSide::FRONT => (
                Point3::new(i, j, k),
                Point3::new(i, j, k1),
                Point3::new(i, j1, k),
                Point3::new(i, j1, k1),
            ),
            BlockSide::BACK => (
                Point3::new(i1, j, k1),
                Point3::new(i1, j, k),
                Point3::new(i1, j1, k1),
                Point3::new(i1, j1, k),
            ),
            BlockSide::BOTTOM => (
                Point3::new(i, j, k1),
                Point3::new(i, j, k),
                Point3::new(i1, j, k1),
                Point3::new(i1, j, k),
            ),
            BlockSide::TOP => (
                Point3::new(i, j1, k),
                Point3::new(i, j1, k1),
                Point3::new(i1, j1, k),
                Point3::new(i1, j1, k1),
            ),
            BlockSide::LEFT => (
                Point3::new(i1, j, k),
                Point3::new(i, j, k),
                Point3::new(i1, j1, k),
                Point3::new(i, j1, k),
            ),
            BlockSide::RIGHT => (
                Point3::new(i, j, k1),
                Point3::new(i1, j, k1),
                Point3::new(i, j1, k1),
                Point3::new(i1, j1, k1),
            ),
        };
        Face {
            ll,
            lr,
            ul,
            ur,
            block_id,
            block_side,
        }
    }

    /// Edge length of the (square) face.
    pub fn size(&self) -> i32 {
        let edge = self.lr - self.ll;
        edge.x.abs().max(edge.y.abs()).max(edge.z.abs())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_faces_lie_on_their_side_plane() {
        for side in BlockSide::all() {
            let face = Face::new(2, 4, 6, 2, 1, side);
            let normal = side.normal();
            // Offset of the plane from the voxel's low corner along the normal axis
            let expected = if normal.x + normal.y + normal.z > 0 { 2 } else { 0 };
            for corner in [face.ll, face.lr, face.ul, face.ur] {
                let offset = corner - Point3::new(2, 4, 6);
                let along = offset.x * normal.x.abs() + offset.y * normal.y.abs() + offset.z * normal.z.abs();
                assert_eq!(along, expected, "{:?}", side);
            }
            assert_eq!(face.size(), 2);
        }
    }
}
