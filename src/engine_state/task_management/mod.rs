//! # Task Management System
//!
//! A cross-platform worker pool for executing work off the main thread, using OS
//! threads natively and `wasm_thread` web workers on wasm targets. Chunk
//! generation is its main client.
//!
//! ## Architecture Overview
//!
//! - `TaskManager`: Central coordinator for task distribution and worker management
//! - `Task`: A unit of work that can be executed asynchronously
//! - `TaskResult`: The result of a completed task, which can spawn additional tasks
//! - `TaskChannel`: Communication channel between the main thread and one worker
//!
//! ## Task Lifecycle
//! 1. Tasks are created and published via `TaskManager::publish_task()`
//! 2. The manager distributes tasks to available worker channels using round-robin
//! 3. Workers process tasks and send results back
//! 4. Results are applied to the chunk manager on the main thread in
//!    `process_completed_tasks()`
//! 5. Results can spawn new tasks
//!
//! ## Performance Considerations
//! - Each worker holds at most `MAX_TASKS_IN_FLIGHT` tasks, the rest wait in a queue
//!   on the main thread so that stale requests can still be dropped cheaply
//! - Tasks own their data; the generator pipeline is shared through an `Arc`

pub mod task;

use std::collections::VecDeque;
use std::sync::mpsc::{channel, Receiver, Sender};

use log::{debug, info, warn};
use task::{Task, TaskResult};

cfg_if::cfg_if! {
    if #[cfg(target_family = "wasm")] {
        use wasm_thread::{self as thread, JoinHandle};
    } else {
        use std::thread::{self, JoinHandle};
    }
}

use super::voxels::chunk_manager::ChunkManager;

/// A communication channel between the main thread and a worker thread.
///
/// # Fields
/// - `task_sender`: Sends tasks from main thread to worker
/// - `result_receiver`: Receives task results from worker
/// - `num_tasks_in_flight`: Tracks number of tasks currently being processed
/// - `_worker`: Handle to the worker thread (kept alive by this struct)
#[derive(Debug)]
pub struct TaskChannel {
    task_sender: Sender<Box<dyn Task + Send>>,
    result_receiver: Receiver<Box<dyn TaskResult + Send>>,
    num_tasks_in_flight: usize,
    _worker: JoinHandle<()>,
}

/// Manages a pool of worker threads and coordinates task execution.
///
/// Dropping the manager closes every task channel, which ends the worker loops.
pub struct TaskManager {
    channels: Vec<TaskChannel>,
    queued_tasks: VecDeque<Box<dyn Task + Send>>,
    current_channel: usize,
}

/// Maximum number of tasks that can be in flight per worker channel.
pub const MAX_TASKS_IN_FLIGHT: usize = 1;

impl TaskManager {
    /// Creates a new `TaskManager` with the specified number of worker threads.
    ///
    /// # Arguments
    /// * `num_workers` - Number of worker threads to create. With zero workers every
    ///   published task stays queued.
    pub fn new(num_workers: usize) -> Self {
        let mut channels = Vec::with_capacity(num_workers);

        info!(
            "Starting {} task workers, available parallelism: {:?}",
            num_workers,
            thread::available_parallelism()
        );

        for _ in 0..num_workers {
            let (task_tx, task_rx) = channel::<Box<dyn Task + Send>>();
            let (result_tx, result_rx) = channel::<Box<dyn TaskResult + Send>>();

            let worker = thread::spawn(move || {
                while let Ok(task) = task_rx.recv() {
                    let result = task.process();
                    if result_tx.send(result).is_err() {
                        break;
                    }
                }
            });

            channels.push(TaskChannel {
                task_sender: task_tx,
                result_receiver: result_rx,
                num_tasks_in_flight: 0,
                _worker: worker,
            });
        }

        TaskManager {
            channels,
            queued_tasks: VecDeque::new(),
            current_channel: 0,
        }
    }

    /// Attempts to send a task to a specific worker channel.
    ///
    /// # Returns
    /// - `Ok(())` if the task was sent
    /// - `Err(task)` if the worker disconnected, handing the task back for requeueing
    fn try_send_task(
        &mut self,
        task: Box<dyn Task + Send>,
        channel_idx: usize,
    ) -> Result<(), Box<dyn Task + Send>> {
        match self.channels[channel_idx].task_sender.send(task) {
            Ok(_) => {
                self.channels[channel_idx].num_tasks_in_flight += 1;
                Ok(())
            }
            Err(task) => {
                warn!("Task worker {} disconnected", channel_idx);
                Err(task.0)
            }
        }
    }

    /// Finds the next channel below `MAX_TASKS_IN_FLIGHT`, round-robin from the
    /// last used channel.
    fn find_available_channel(&self) -> Option<usize> {
        let len = self.channels.len();
        (0..len)
            .map(|offset| (self.current_channel + offset) % len)
            .find(|idx| self.channels[*idx].num_tasks_in_flight < MAX_TASKS_IN_FLIGHT)
    }

    /// Publishes a new task for execution.
    ///
    /// # Returns
    /// - `true` if the task was immediately scheduled on an available worker
    /// - `false` if the task was queued because all workers are busy
    pub fn publish_task(&mut self, task: Box<dyn Task + Send>) -> bool {
        match self.find_available_channel() {
            Some(channel_idx) => match self.try_send_task(task, channel_idx) {
                Ok(_) => {
                    self.current_channel = (channel_idx + 1) % self.channels.len();
                    true
                }
                Err(task) => {
                    self.queued_tasks.push_back(task);
                    false
                }
            },
            None => {
                self.queued_tasks.push_back(task);
                false
            }
        }
    }

    /// Moves queued tasks to workers, oldest first, until every worker is busy.
    pub fn process_queued_tasks(&mut self) {
        while let Some(channel_idx) = self.find_available_channel() {
            let Some(task) = self.queued_tasks.pop_front() else {
                break;
            };
            match self.try_send_task(task, channel_idx) {
                Ok(_) => self.current_channel = (channel_idx + 1) % self.channels.len(),
                Err(task) => {
                    self.queued_tasks.push_front(task);
                    break;
                }
            }
        }
    }

    /// Applies every completed result to the chunk manager and publishes the
    /// follow-up tasks they return.
    ///
    /// Must be called from the main thread, typically once per frame.
    ///
    /// # Returns
    /// The number of results applied
    pub fn process_completed_tasks(&mut self, chunk_manager: &mut ChunkManager) -> usize {
        let mut tasks_to_queue = Vec::new();
        let mut completed = 0;
        for channel in &mut self.channels {
            while let Ok(result) = channel.result_receiver.try_recv() {
                channel.num_tasks_in_flight = channel.num_tasks_in_flight.saturating_sub(1);
                completed += 1;
                tasks_to_queue.extend(result.handle_result(chunk_manager));
            }
        }

        if completed > 0 {
            debug!("Applied {} task results", completed);
        }

        for task in tasks_to_queue {
            self.publish_task(task);
        }
        completed
    }

    /// Tasks currently being processed by workers.
    pub fn tasks_in_flight(&self) -> usize {
        self.channels
            .iter()
            .map(|channel| channel.num_tasks_in_flight)
            .sum()
    }

    /// Tasks waiting for a free worker.
    pub fn queued_tasks(&self) -> usize {
        self.queued_tasks.len()
    }

    /// Returns `true` when nothing is queued or in flight.
    pub fn is_idle(&self) -> bool {
        self.queued_tasks.is_empty() && self.tasks_in_flight() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{config::EngineConfig, engine_state::voxels::terrain::GeneratorPipeline};
    use std::sync::{
        atomic::{AtomicUsize, Ordering},
        Arc,
    };
    use std::time::{Duration, Instant};

    struct CountingTask {
        processed: Arc<AtomicUsize>,
        follow_up: bool,
    }

    struct CountingResult {
        processed: Arc<AtomicUsize>,
        follow_up: bool,
    }

    impl Task for CountingTask {
        fn process(&self) -> Box<dyn TaskResult + Send> {
            self.processed.fetch_add(1, Ordering::SeqCst);
            Box::new(CountingResult {
                processed: self.processed.clone(),
                follow_up: self.follow_up,
            })
        }
    }

    impl TaskResult for CountingResult {
        fn handle_result(self: Box<Self>, _chunk_manager: &mut ChunkManager) -> Vec<Box<dyn Task + Send>> {
            if self.follow_up {
                vec![Box::new(CountingTask {
                    processed: self.processed,
                    follow_up: false,
                })]
            } else {
                Vec::new()
            }
        }
    }

    fn chunk_manager() -> ChunkManager {
        let config = EngineConfig::default();
        let pipeline = Arc::new(GeneratorPipeline::from_config(&config).unwrap());
        ChunkManager::new(pipeline, &config)
    }

    fn drain(manager: &mut TaskManager, chunks: &mut ChunkManager) {
        let deadline = Instant::now() + Duration::from_secs(10);
        while !manager.is_idle() {
            assert!(Instant::now() < deadline, "tasks did not finish");
            manager.process_completed_tasks(chunks);
            manager.process_queued_tasks();
            std::thread::sleep(Duration::from_millis(1));
        }
    }

    #[test]
    fn test_tasks_beyond_worker_count_are_queued() {
        let mut manager = TaskManager::new(1);
        let processed = Arc::new(AtomicUsize::new(0));
        for _ in 0..3 {
            manager.publish_task(Box::new(CountingTask {
                processed: processed.clone(),
                follow_up: false,
            }));
        }
        assert_eq!(manager.tasks_in_flight(), 1);
        assert_eq!(manager.queued_tasks(), 2);

        let mut chunks = chunk_manager();
        drain(&mut manager, &mut chunks);
        assert_eq!(processed.load(Ordering::SeqCst), 3);
    }

    #[test]
    fn test_results_can_publish_follow_up_tasks() {
        let mut manager = TaskManager::new(2);
        let processed = Arc::new(AtomicUsize::new(0));
        manager.publish_task(Box::new(CountingTask {
            processed: processed.clone(),
            follow_up: true,
        }));

        let mut chunks = chunk_manager();
        drain(&mut manager, &mut chunks);
        assert_eq!(processed.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn test_without_workers_tasks_stay_queued() {
        let mut manager = TaskManager::new(0);
        assert!(!manager.publish_task(Box::new(CountingTask {
            processed: Arc::new(AtomicUsize::new(0)),
            follow_up: false,
        })));
        manager.process_queued_tasks();
        assert_eq!(manager.queued_tasks(), 1);
        assert!(!manager.is_idle());
    }
}
