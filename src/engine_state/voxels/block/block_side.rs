//! # Block Side Module
//!
//! This module defines the six faces of a voxel and the neighbour offset each face
//! looks at. The mesher culls a face when the neighbour behind it hides it.

use cgmath::Vector3;
use num_derive::FromPrimitive;

/// Represents the six possible faces of a voxel block.
///
/// Each variant carries the integer stored in the `side` field of a
/// [`Vertex`](crate::engine_state::rendering::Vertex), so the discriminants must
/// stay stable.
///
/// The order is: [FRONT, BACK, BOTTOM, TOP, LEFT, RIGHT]
#[derive(PartialEq, Eq, Hash, Copy, Clone, Debug, FromPrimitive)]
pub enum BlockSide {
    /// The face at the low x edge of the voxel (facing negative X)
    FRONT = 0,

    /// The face at the high x edge of the voxel (facing positive X)
    BACK = 1,

    /// The bottom face (facing negative Y)
    BOTTOM = 2,

    /// The top face (facing positive Y)
    TOP = 3,

    /// The face at the low z edge of the voxel (facing negative Z)
    LEFT = 4,

    /// The face at the high z edge of the voxel (facing positive Z)
    RIGHT = 5,
}

impl BlockSide {
    /// Returns an array containing all six block faces in a consistent order.
    ///
    /// The order is: [FRONT, BACK, BOTTOM, TOP, LEFT, RIGHT]
    pub fn all() -> [BlockSide; 6] {
        [
            BlockSide::FRONT,
            BlockSide::BACK,
            BlockSide::BOTTOM,
            BlockSide::TOP,
            BlockSide::LEFT,
            BlockSide::RIGHT,
        ]
    }

    /// Converts the integer stored in a vertex back into a side.
    ///
    /// # Returns
    /// `None` if `value` does not name a side.
    pub fn from_index(value: u32) -> Option<BlockSide> {
        num::FromPrimitive::from_u32(value)
    }

    /// Offset, in grid cells, of the neighbour this face looks at.
    pub fn normal(self) -> Vector3<i32> {
        match self {
            BlockSide::FRONT => Vector3::new(-1, 0, 0),
            BlockSide::BACK => Vector3::new(1, 0, 0),
            BlockSide::BOTTOM => Vector3::new(0, -1, 0),
            BlockSide::TOP => Vector3::new(0, 1, 0),
            BlockSide::LEFT => Vector3::new(0, 0, -1),
            BlockSide::RIGHT => Vector3::new(0, 0, 1),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_index_round_trips_for_every_side() {
        for side in BlockSide::all() {
            assert_eq!(BlockSide::from_index(side as u32), Some(side));
        }
        assert_eq!(BlockSide::from_index(6), None);
    }

    #[test]
    fn test_opposite_sides_have_opposite_normals() {
        assert_eq!(BlockSide::FRONT.normal(), -BlockSide::BACK.normal());
        assert_eq!(BlockSide::BOTTOM.normal(), -BlockSide::TOP.normal());
        assert_eq!(BlockSide::LEFT.normal(), -BlockSide::RIGHT.normal());
    }
}
