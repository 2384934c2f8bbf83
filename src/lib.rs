//! # Voxel Terrain
//!
//! Chunked voxel terrain generation and level-of-detail rendering.
//!
//! Terrain is a pure function of a world seed and a chunk coordinate: a cave map
//! and a biome map are computed for the chunk, then an ordered pipeline of
//! generators fills its voxels. The renderer selects the chunks inside the view
//! frustum each frame, picks a resolution for each from its distance to the
//! camera, builds meshes within a per-frame time budget and submits draws in a
//! fixed order to a pluggable graphics backend.
//!
//! ## Key Modules
//!
//! * `config` - Engine configuration, loaded from JSON
//! * `core` - Shared-ownership primitives
//! * `engine_state` - Camera, chunks, terrain generation, workers and rendering
//! * `error` - The crate-wide error type
//!
//! ## Usage
//!
//! ```no_run
//! use voxel_terrain::{config::EngineConfig, engine_state::{rendering::RecordingBackend, EngineState}};
//!
//! voxel_terrain::init_logger();
//! let mut engine = EngineState::new(EngineConfig::default()).unwrap();
//! let mut backend = RecordingBackend::new();
//! let report = engine.frame(&[], None, &mut backend);
//! ```
//!
//! ## Performance Considerations
//!
//! * Chunks are generated on a worker pool and never block the frame
//! * Distant chunks are stored and meshed at reduced resolution
//! * Mesh building stops for the frame once the meshing budget is spent

pub mod config;
pub mod core;
pub mod engine_state;
pub mod error;

pub use config::EngineConfig;
pub use engine_state::EngineState;
pub use error::{EngineError, Result};

/// Initializes logging for the current target.
///
/// Natively this installs an `env_logger` writing to stdout and filtered by
/// `RUST_LOG`. On wasm it routes logs and panics to the browser console.
/// Calling it more than once has no further effect.
pub fn init_logger() {
    cfg_if::cfg_if! {
        if #[cfg(target_family = "wasm")] {
            std::panic::set_hook(Box::new(console_error_panic_hook::hook));
            if console_log::init_with_level(log::Level::Info).is_err() {
                log::warn!("Logger already initialized");
            }
        } else {
            let mut log_builder = env_logger::Builder::new();
            if log_builder
                .target(env_logger::Target::Stdout)
                .parse_env("RUST_LOG")
                .try_init()
                .is_ok()
            {
                log::info!("Logger initialized");
            }
        }
    }
}
