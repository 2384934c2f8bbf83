//! # Camera State Management
//!
//! - `Camera`: The viewer's position and orientation
//! - `Projection`: The perspective projection
//! - `CameraSnapshot`: An immutable copy of both, taken once per frame
//! - `Frustum`: Clip planes derived from a snapshot's view-projection matrix
//!
//! Rendering only ever sees a snapshot, so moving the camera while a frame is
//! being prepared cannot change which chunks that frame selects.

use cgmath::{Deg, Matrix4, Point3, Rad};

use crate::config::RenderConfig;

pub mod camera;
pub mod frustum;

pub use camera::{Camera, Projection};
pub use frustum::Frustum;

/// Owns the live camera and projection.
#[derive(Debug, Clone)]
pub struct CameraState {
    pub camera: Camera,
    pub projection: Projection,
}

/// Camera and projection frozen for the duration of one frame.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CameraSnapshot {
    pub position: Point3<f32>,
    pub yaw: Rad<f32>,
    pub pitch: Rad<f32>,
    pub projection: Projection,
}

impl CameraState {
    /// Creates a camera at `position` looking along +X, with the projection
    /// described by `config`.
    pub fn new(position: Point3<f32>, config: &RenderConfig) -> Self {
        Self {
            camera: Camera::new(position, Deg(0.0), Deg(0.0)),
            projection: Projection::new(
                config.viewport_width,
                config.viewport_height,
                Deg(config.fov_degrees),
                config.znear,
                config.zfar,
            ),
        }
    }

    pub fn snapshot(&self) -> CameraSnapshot {
        CameraSnapshot {
            position: self.camera.position,
            yaw: self.camera.yaw,
            pitch: self.camera.pitch,
            projection: self.projection,
        }
    }
}

impl CameraSnapshot {
    pub fn camera(&self) -> Camera {
        Camera::new(self.position, self.yaw, self.pitch)
    }

    /// Projection times view.
    pub fn view_proj(&self) -> Matrix4<f32> {
        self.projection.calc_matrix() * self.camera().calc_matrix()
    }

    pub fn frustum(&self) -> Frustum {
        Frustum::from_view_proj(&self.view_proj())
    }

    /// Squared distance from the camera to `point`.
    pub fn distance2(&self, point: Point3<f32>) -> f32 {
        use cgmath::MetricSpace;
        self.position.distance2(point)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_snapshot_is_unaffected_by_later_moves() {
        let mut state = CameraState::new(Point3::new(1.0, 2.0, 3.0), &RenderConfig::default());
        let snapshot = state.snapshot();
        state.camera.translate(10.0, 0.0, 0.0);
        assert_eq!(snapshot.position, Point3::new(1.0, 2.0, 3.0));
        assert_ne!(state.snapshot().position, snapshot.position);
    }
}
