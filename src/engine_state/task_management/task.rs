//! # Task System Core Traits
//!
//! The building blocks of the background work system.
//!
//! ## Core Components
//! - `Task`: A unit of work executed on a worker thread
//! - `TaskResult`: The outcome of a task, applied on the main thread
//!
//! ## Task Lifecycle
//! 1. A `Task` is created and scheduled via `TaskManager::publish_task()`
//! 2. The task's `process()` method is called on a worker thread
//! 3. The task returns a boxed `TaskResult`
//! 4. The result's `handle_result()` is called on the main thread with the chunk manager
//! 5. The result can spawn follow-up tasks
//!
//! ## Thread Safety
//! - `Task` must be `Send` to be transferred between threads
//! - `TaskResult` must be `Send` to be transferred back to the main thread
//! - Tasks never touch the chunk cache; only results do, on the main thread

use crate::engine_state::voxels::chunk_manager::ChunkManager;

/// A unit of work that can be executed on a worker thread.
///
/// Tasks own everything they need. Shared read-only state, such as the generator
/// pipeline, is held behind an `Arc`.
pub trait Task: Send {
    /// Performs the work and returns a result for the main thread.
    ///
    /// # Implementation Notes
    /// - Runs on a worker thread; must not block on main-thread state
    /// - Errors are carried inside the result rather than returned
    fn process(&self) -> Box<dyn TaskResult + Send>;
}

/// The result of processing a `Task`, applied on the main thread.
pub trait TaskResult: Send {
    /// Applies the result to the chunk manager.
    ///
    /// # Arguments
    /// * `chunk_manager` - The chunk cache the result is applied to
    ///
    /// # Returns
    /// Follow-up tasks to schedule (can be empty)
    fn handle_result(self: Box<Self>, chunk_manager: &mut ChunkManager) -> Vec<Box<dyn Task + Send>>;
}
