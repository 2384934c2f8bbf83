//! # Engine Errors
//!
//! A single error type shared by every subsystem. Startup paths (configuration
//! loading, registry resolution, generator construction) return these errors to
//! the caller; per-chunk paths log them and keep the frame going.

use crate::engine_state::voxels::chunk::ChunkKey;

/// Result alias used throughout the crate.
pub type Result<T> = std::result::Result<T, EngineError>;

/// Errors produced by the terrain and rendering core.
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    #[error("Unknown block: {name}")]
    UnknownBlock { name: String },

    #[error("Unknown biome: {name}")]
    UnknownBiome { name: String },

    #[error("Invalid configuration for {field}: {reason}")]
    InvalidConfig { field: String, reason: String },

    #[error("Failed to read configuration: {0}")]
    ConfigIo(#[from] std::io::Error),

    #[error("Failed to parse configuration: {0}")]
    ConfigParse(#[from] serde_json::Error),

    #[error("Generation failed for chunk {key:?}: {message}")]
    Generation { key: ChunkKey, message: String },

    #[error("Mesh upload failed for chunk {key:?}: {message}")]
    MeshUpload { key: ChunkKey, message: String },

    #[error("Mesh release failed for handle {handle}: {message}")]
    MeshRelease { handle: u64, message: String },
}

impl EngineError {
    /// Shorthand for an [`EngineError::InvalidConfig`].
    pub fn invalid_config(field: impl Into<String>, reason: impl Into<String>) -> Self {
        EngineError::InvalidConfig {
            field: field.into(),
            reason: reason.into(),
        }
    }
}
