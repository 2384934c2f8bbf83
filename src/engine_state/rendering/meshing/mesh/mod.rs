//! Face and buffer types used to turn voxels into triangles.
//!
//! - [`Face`]: One visible voxel side
//! - [`Mesh`]: Vertices and indices grouped by block side

mod face;
mod mesh;

pub use face::Face;
pub use mesh::*;
