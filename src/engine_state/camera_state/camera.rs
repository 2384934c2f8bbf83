//! # Camera Implementation
//!
//! - `Camera`: Position and orientation of the viewer in world space
//! - `Projection`: Perspective projection settings
//!
//! The view matrix is right-handed and the projection maps depth into `[0, 1]`,
//! the convention of modern GPU APIs.

use cgmath::*;
use std::f32::consts::FRAC_PI_2;

/// Transformation matrix to convert from OpenGL's clip space to a `[0, 1]` depth range.
///
/// 1. Scales the Z coordinate from [-1, 1] to [-0.5, 0.5]
/// 2. Translates the Z coordinate from [-0.5, 0.5] to [0, 1]
#[rustfmt::skip]
pub const OPENGL_TO_WGPU_MATRIX: cgmath::Matrix4<f32> = cgmath::Matrix4::new(
    1.0, 0.0, 0.0, 0.0,
    0.0, 1.0, 0.0, 0.0,
    0.0, 0.0, 0.5, 0.0,
    0.0, 0.0, 0.5, 1.0,
);

/// Safe limit for pitch to prevent gimbal lock
const SAFE_FRAC_PI_2: f32 = FRAC_PI_2 - 0.0001;

/// A first-person camera.
///
/// A yaw of zero looks along +X, positive yaw turns towards +Z.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Camera {
    /// The camera's position in world space
    pub position: Point3<f32>,
    /// Horizontal rotation (around Y axis) in radians
    pub yaw: Rad<f32>,
    /// Vertical rotation (around X axis) in radians
    pub pitch: Rad<f32>,
}

impl Camera {
    /// Creates a new camera with the specified position and orientation.
    ///
    /// # Arguments
    /// * `position` - Initial position of the camera in world space
    /// * `yaw` - Initial yaw (horizontal rotation around Y axis)
    /// * `pitch` - Initial pitch, clamped just short of straight up or down
    pub fn new<V: Into<Point3<f32>>, Y: Into<Rad<f32>>, P: Into<Rad<f32>>>(
        position: V,
        yaw: Y,
        pitch: P,
    ) -> Self {
        let mut camera = Self {
            position: position.into(),
            yaw: yaw.into(),
            pitch: Rad(0.0),
        };
        camera.set_pitch(pitch);
        camera
    }

    /// Gets the camera's normalized forward direction.
    pub fn get_view_vec(&self) -> Vector3<f32> {
        let (pitch_sin, pitch_cos) = self.pitch.0.sin_cos();
        let (yaw_sin, yaw_cos) = self.yaw.0.sin_cos();
        Vector3::new(pitch_cos * yaw_cos, pitch_sin, pitch_cos * yaw_sin).normalize()
    }

    pub fn set_pitch<P: Into<Rad<f32>>>(&mut self, pitch: P) {
        let pitch = pitch.into();
        self.pitch = Rad(pitch.0.clamp(-SAFE_FRAC_PI_2, SAFE_FRAC_PI_2));
    }

    /// Turns the camera by the given angles.
    pub fn rotate<Y: Into<Rad<f32>>, P: Into<Rad<f32>>>(&mut self, yaw: Y, pitch: P) {
        self.yaw += yaw.into();
        let pitch = self.pitch + pitch.into();
        self.set_pitch(pitch);
    }

    /// Moves the camera along its horizontal forward and right axes and the
    /// world up axis.
    pub fn translate(&mut self, forward: f32, right: f32, up: f32) {
        let (yaw_sin, yaw_cos) = self.yaw.0.sin_cos();
        let forward_vec = Vector3::new(yaw_cos, 0.0, yaw_sin);
        let right_vec = Vector3::new(-yaw_sin, 0.0, yaw_cos);
        self.position += forward_vec * forward + right_vec * right + Vector3::unit_y() * up;
    }

    /// Calculates the view matrix for this camera.
    ///
    /// # Returns
    /// A 4x4 matrix transforming world coordinates into view space
    pub fn calc_matrix(&self) -> Matrix4<f32> {
        Matrix4::look_to_rh(self.position, self.get_view_vec(), Vector3::unit_y())
    }
}

/// Perspective projection settings.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Projection {
    /// Aspect ratio (width / height)
    aspect: f32,
    /// Vertical field of view in radians
    fovy: Rad<f32>,
    /// Near clipping plane distance
    znear: f32,
    /// Far clipping plane distance
    zfar: f32,
}

impl Projection {
    /// Creates a new projection with the given parameters.
    ///
    /// # Arguments
    /// * `width` - Viewport width in pixels
    /// * `height` - Viewport height in pixels
    /// * `fovy` - Vertical field of view
    /// * `znear` - Near clipping plane distance
    /// * `zfar` - Far clipping plane distance
    pub fn new<F: Into<Rad<f32>>>(width: u32, height: u32, fovy: F, znear: f32, zfar: f32) -> Self {
        Self {
            aspect: width as f32 / height.max(1) as f32,
            fovy: fovy.into(),
            znear,
            zfar,
        }
    }

    /// Updates the projection's aspect ratio for viewport resizing.
    pub fn resize(&mut self, width: u32, height: u32) {
        self.aspect = width as f32 / height.max(1) as f32;
    }

    pub fn zfar(&self) -> f32 {
        self.zfar
    }

    /// Calculates the projection matrix, with depth mapped to `[0, 1]`.
    pub fn calc_matrix(&self) -> Matrix4<f32> {
        OPENGL_TO_WGPU_MATRIX * perspective(self.fovy, self.aspect, self.znear, self.zfar)
    }
}
