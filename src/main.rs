//! # Headless Terrain Driver
//!
//! Runs the engine without a window: the camera flies a fixed path over the
//! terrain, frames are rendered into a recording backend and each frame's report
//! is logged.
//!
//! ## Usage
//!
//! ```bash
//! RUST_LOG=info cargo run --release -- [config.json] [frames]
//! ```

use std::process::ExitCode;

use cgmath::{Deg, Point3};
use log::{error, info};
use voxel_terrain::{
    engine_state::rendering::{EntityInstance, RecordingBackend},
    EngineConfig, EngineState,
};

/// Frames rendered when no count is given.
const DEFAULT_FRAMES: u32 = 600;

/// Distance the camera moves forward each frame.
const CAMERA_SPEED: f32 = 0.5;

/// The voxel at height `y` in the column containing `position`.
fn voxel_below(position: Point3<f32>, y: i32) -> Point3<i32> {
    Point3::new(position.x.floor() as i32, y, position.z.floor() as i32)
}

fn main() -> ExitCode {
    voxel_terrain::init_logger();

    let mut args = std::env::args().skip(1);
    let config = match args.next() {
        Some(path) => match EngineConfig::from_path(&path) {
            Ok(config) => config,
            Err(e) => {
                error!("Could not load {}: {}", path, e);
                return ExitCode::FAILURE;
            }
        },
        None => EngineConfig::default(),
    };
    let frames = args
        .next()
        .and_then(|frames| frames.parse().ok())
        .unwrap_or(DEFAULT_FRAMES);

    let mut engine = match EngineState::new(config) {
        Ok(engine) => engine,
        Err(e) => {
            error!("Could not start engine: {}", e);
            return ExitCode::FAILURE;
        }
    };
    engine.camera_state.camera.set_pitch(Deg(-25.0));

    let mut backend = RecordingBackend::new();
    for frame in 0..frames {
        engine.camera_state.camera.translate(CAMERA_SPEED, 0.0, 0.0);
        engine.camera_state.camera.rotate(Deg(0.1), Deg(0.0));

        let position = engine.camera_state.camera.position;
        let marker = EntityInstance {
            position: [position.x + 4.0, position.y - 2.0, position.z],
            scale: 1.0,
            color: [1.0, 0.2, 0.2, 1.0],
        };
        let below = voxel_below(position, engine.config.generation.terrain.base_height);

        let report = engine.frame(&[marker], Some(below), &mut backend);
        if frame % 60 == 0 {
            info!(
                "Frame {}: {} full, {} reduced, {} built, {} reused, {} skipped, {} cached, {} live meshes",
                frame,
                report.full_chunks,
                report.reduced_chunks,
                report.meshes_built,
                report.meshes_reused,
                report.chunks_skipped,
                engine.chunk_manager.len(),
                backend.live_meshes()
            );
        }
        backend.clear();
    }

    info!("Rendered {} frames", frames);
    ExitCode::SUCCESS
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_voxel_below_rounds_down_at_negative_coordinates() {
        assert_eq!(voxel_below(Point3::new(3.7, 50.0, 0.2), 8), Point3::new(3, 8, 0));
        assert_eq!(voxel_below(Point3::new(-0.5, 50.0, -3.2), 8), Point3::new(-1, 8, -4));
    }
}
