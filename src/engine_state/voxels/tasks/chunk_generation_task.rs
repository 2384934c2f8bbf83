//! # Chunk Generation Task
//!
//! Runs the generator pipeline for one chunk on a worker thread. The result is
//! handed back to the [`ChunkManager`] on the main thread, which inserts the chunk
//! only if its request is still pending.

use std::sync::Arc;

use crate::{
    engine_state::{
        task_management::task::{Task, TaskResult},
        voxels::{
            chunk::{Chunk, ChunkKey},
            chunk_manager::ChunkManager,
            terrain::GeneratorPipeline,
        },
    },
    error::Result,
};

/// A request to generate the chunk at `key`.
pub struct ChunkGenerationTask {
    pipeline: Arc<GeneratorPipeline>,
    key: ChunkKey,
    /// Identifies this request among requests for the same key
    ticket: u64,
}

impl ChunkGenerationTask {
    /// Creates a new chunk generation task.
    ///
    /// # Arguments
    /// * `pipeline` - The shared generator pipeline
    /// * `key` - The chunk to generate
    /// * `ticket` - Ticket under which the chunk manager recorded the request
    pub fn new(pipeline: Arc<GeneratorPipeline>, key: ChunkKey, ticket: u64) -> Self {
        ChunkGenerationTask {
            pipeline,
            key,
            ticket,
        }
    }

    pub fn key(&self) -> ChunkKey {
        self.key
    }

    pub fn ticket(&self) -> u64 {
        self.ticket
    }
}

impl Task for ChunkGenerationTask {
    fn process(&self) -> Box<dyn TaskResult + Send> {
        Box::new(ChunkGenerationTaskResult {
            key: self.key,
            ticket: self.ticket,
            result: self.pipeline.generate_chunk(self.key),
        })
    }
}

/// The generated chunk, or the error that stopped its generation.
pub struct ChunkGenerationTaskResult {
    key: ChunkKey,
    ticket: u64,
    result: Result<Chunk>,
}

impl TaskResult for ChunkGenerationTaskResult {
    fn handle_result(self: Box<Self>, chunk_manager: &mut ChunkManager) -> Vec<Box<dyn Task + Send>> {
        chunk_manager.apply_generated(self.key, self.ticket, self.result);
        Vec::new()
    }
}
