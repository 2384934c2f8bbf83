//! # View Frustum
//!
//! Six clip planes extracted from a view-projection matrix (Gribb/Hartmann),
//! used to decide which chunks are visible. Planes point inwards, so a point is
//! inside when its signed distance to every plane is non-negative.

use cgmath::{InnerSpace, Matrix, Matrix4, Point3, Vector3, Vector4};

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Frustum {
    /// Left, right, bottom, top, near, far; `xyz` is the unit normal, `w` the offset
    planes: [Vector4<f32>; 6],
}

impl Frustum {
    /// Extracts the planes from a view-projection matrix whose clip-space depth
    /// runs from 0 to 1.
    pub fn from_view_proj(view_proj: &Matrix4<f32>) -> Self {
        let r0 = view_proj.row(0);
        let r1 = view_proj.row(1);
        let r2 = view_proj.row(2);
        let r3 = view_proj.row(3);

        let planes = [r3 + r0, r3 - r0, r3 + r1, r3 - r1, r2, r3 - r2].map(|plane| {
            let length = plane.truncate().magnitude();
            if length > f32::EPSILON {
                plane / length
            } else {
                plane
            }
        });
        Self { planes }
    }

    /// Signed distances of `point` to each plane.
    fn distances(&self, point: Point3<f32>) -> impl Iterator<Item = f32> + '_ {
        self.planes
            .iter()
            .map(move |plane| plane.truncate().dot(Vector3::new(point.x, point.y, point.z)) + plane.w)
    }

    pub fn contains_point(&self, point: Point3<f32>) -> bool {
        self.distances(point).all(|distance| distance >= 0.0)
    }

    /// Tests an axis-aligned box against the frustum.
    ///
    /// Conservative: a box is only rejected when it lies entirely behind one
    /// plane, so a few boxes near frustum corners pass without being visible.
    pub fn test_aabb(&self, min: Point3<f32>, max: Point3<f32>) -> bool {
        self.planes.iter().all(|plane| {
            // Corner furthest along the plane normal
            let corner = Vector3::new(
                if plane.x >= 0.0 { max.x } else { min.x },
                if plane.y >= 0.0 { max.y } else { min.y },
                if plane.z >= 0.0 { max.z } else { min.z },
            );
            plane.truncate().dot(corner) + plane.w >= 0.0
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine_state::camera_state::camera::{Camera, Projection};
    use cgmath::Deg;

    fn looking_along_x() -> Frustum {
        let camera = Camera::new(Point3::new(0.0, 0.0, 0.0), Deg(0.0), Deg(0.0));
        let projection = Projection::new(100, 100, Deg(90.0), 0.1, 100.0);
        Frustum::from_view_proj(&(projection.calc_matrix() * camera.calc_matrix()))
    }

    #[test]
    fn test_points_in_front_and_behind() {
        let frustum = looking_along_x();
        assert!(frustum.contains_point(Point3::new(10.0, 0.0, 0.0)));
        assert!(!frustum.contains_point(Point3::new(-10.0, 0.0, 0.0)));
        assert!(!frustum.contains_point(Point3::new(200.0, 0.0, 0.0)));
        assert!(!frustum.contains_point(Point3::new(10.0, 0.0, 50.0)));
    }

    #[test]
    fn test_aabb_partially_inside_passes() {
        let frustum = looking_along_x();
        assert!(frustum.test_aabb(Point3::new(5.0, -1.0, -1.0), Point3::new(6.0, 1.0, 1.0)));
        // Straddles the left plane
        assert!(frustum.test_aabb(Point3::new(5.0, 0.0, -20.0), Point3::new(6.0, 1.0, 0.0)));
        assert!(!frustum.test_aabb(Point3::new(-20.0, -1.0, -1.0), Point3::new(-10.0, 1.0, 1.0)));
        assert!(!frustum.test_aabb(Point3::new(5.0, -1.0, 30.0), Point3::new(6.0, 1.0, 40.0)));
    }
}
