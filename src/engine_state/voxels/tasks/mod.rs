//! # Voxel Task System
//!
//! Background work on the voxel world. Chunk generation is the only task; it is
//! published by the engine for every chunk the renderer found missing.

pub mod chunk_generation_task;

pub use chunk_generation_task::{ChunkGenerationTask, ChunkGenerationTaskResult};
