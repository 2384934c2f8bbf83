//! # Core Module
//!
//! Shared-ownership primitives used throughout the engine.
//!
//! ## Key Components
//! - `MtResource`: Thread-safe reference-counted resource with read-write locking.
//!   Chunks live in the cache as `MtResource<Chunk>` so the renderer and the
//!   eviction path can hold them without copying voxel data.

pub mod mt_resource;

pub use mt_resource::MtResource;
