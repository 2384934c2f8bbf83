//! # Voxel World
//!
//! Representation, generation and caching of the voxel world.
//!
//! ## Architecture
//!
//! * **Block**: Block ids, the block registry and the six voxel sides
//! * **Chunk**: Cubic regions of voxels at a level of detail, each owning its mesh
//! * **Terrain**: The generator pipeline that fills chunks from the world seed
//! * **Chunk manager**: The chunk cache and visible-chunk selection
//! * **Tasks**: Chunk generation on worker threads
//!
//! ## Data Flow
//!
//! 1. The renderer asks the chunk manager for the chunks in view
//! 2. Chunks not cached are reported missing and turned into generation tasks
//! 3. Workers run the generator pipeline; results are applied on the main thread
//! 4. Generated chunks are returned by the next query and meshed by the renderer
//!
//! ## Thread Safety
//!
//! * Chunks are shared as [`MtResource`](crate::core::MtResource) so the renderer can
//!   hold them while the cache changes
//! * Workers only read the generator pipeline; they never touch the cache

pub mod block;
pub mod chunk;
pub mod chunk_manager;
pub mod tasks;
pub mod terrain;
