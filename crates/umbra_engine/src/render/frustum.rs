//! Frustum extraction and visibility tests
//!
//! Shadow passes cull against the six clip planes of the shadow camera,
//! extracted from its combined view-projection matrix with the
//! Gribb-Hartmann method (the [0, 1]-depth variant: the near plane comes
//! from the third row alone).

use crate::foundation::math::{Mat4, Vec3, Vec4};

/// Plane defined by normal and distance from origin
#[derive(Debug, Clone, Copy)]
pub struct Plane {
    /// Normal vector (normalized)
    pub normal: Vec3,
    /// Distance from origin along the normal
    pub distance: f32,
}

impl Plane {
    /// Build a plane from an unnormalized (a, b, c, d) row combination
    fn from_coefficients(coefficients: Vec4) -> Self {
        let normal = Vec3::new(coefficients.x, coefficients.y, coefficients.z);
        let length = normal.magnitude();
        Self {
            normal: normal / length,
            distance: coefficients.w / length,
        }
    }

    /// Calculate signed distance from plane to point
    pub fn distance_to_point(&self, point: Vec3) -> f32 {
        self.normal.dot(&point) + self.distance
    }
}

/// Frustum for visibility culling
#[derive(Debug, Clone)]
pub struct Frustum {
    /// Six planes defining the frustum (left, right, bottom, top, near, far)
    pub planes: [Plane; 6],
}

impl Frustum {
    /// Extract frustum planes from a view-projection matrix
    ///
    /// Uses the Gribb-Hartmann row combinations. The matrix is expected to
    /// map depth to [0, 1], so the near plane is the bare third row.
    pub fn from_matrix(matrix: &Mat4) -> Self {
        let row = |i: usize| {
            Vec4::new(
                matrix[(i, 0)],
                matrix[(i, 1)],
                matrix[(i, 2)],
                matrix[(i, 3)],
            )
        };
        let (r0, r1, r2, r3) = (row(0), row(1), row(2), row(3));

        Self {
            planes: [
                Plane::from_coefficients(r3 + r0),
                Plane::from_coefficients(r3 - r0),
                Plane::from_coefficients(r3 + r1),
                Plane::from_coefficients(r3 - r1),
                Plane::from_coefficients(r2),
                Plane::from_coefficients(r3 - r2),
            ],
        }
    }

    /// Check whether a bounding sphere touches the frustum
    pub fn intersects_sphere(&self, center: Vec3, radius: f32) -> bool {
        self.planes
            .iter()
            .all(|plane| plane.distance_to_point(center) >= -radius)
    }
}

/// Unproject the 8 corners of an NDC depth slice back to world space
///
/// `inverse_view_projection` is the inverse of the P × X × V chain;
/// `near_z` and `far_z` are NDC depths in [0, 1] bounding the slice.
/// Corner order is the 4 near corners followed by the 4 far corners.
pub fn slice_corners(inverse_view_projection: &Mat4, near_z: f32, far_z: f32) -> [Vec3; 8] {
    let mut corners = [Vec3::zeros(); 8];
    let xy = [(-1.0, -1.0), (1.0, -1.0), (-1.0, 1.0), (1.0, 1.0)];

    for (i, &(x, y)) in xy.iter().enumerate() {
        for (j, &z) in [near_z, far_z].iter().enumerate() {
            let clip = inverse_view_projection * Vec4::new(x, y, z, 1.0);
            corners[j * 4 + i] = Vec3::new(clip.x, clip.y, clip.z) / clip.w;
        }
    }

    corners
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::render::camera::CameraData;
    use approx::assert_relative_eq;

    fn looking_down_negative_z() -> CameraData {
        let mut camera = CameraData::perspective(std::f32::consts::FRAC_PI_2, 1.0, 1.0, 100.0);
        camera.target = Vec3::new(0.0, 0.0, -1.0);
        camera.place(Vec3::zeros());
        camera
    }

    #[test]
    fn sphere_in_front_is_kept() {
        let camera = looking_down_negative_z();
        let frustum = Frustum::from_matrix(&camera.view_projection());

        assert!(frustum.intersects_sphere(Vec3::new(0.0, 0.0, -10.0), 1.0));
    }

    #[test]
    fn sphere_behind_camera_is_culled() {
        let camera = looking_down_negative_z();
        let frustum = Frustum::from_matrix(&camera.view_projection());

        assert!(!frustum.intersects_sphere(Vec3::new(0.0, 0.0, 10.0), 1.0));
    }

    #[test]
    fn sphere_straddling_a_side_plane_is_kept() {
        let camera = looking_down_negative_z();
        let frustum = Frustum::from_matrix(&camera.view_projection());

        // At z = -10 with a 90 degree fov the right plane sits at x = 10
        assert!(frustum.intersects_sphere(Vec3::new(10.5, 0.0, -10.0), 1.0));
        assert!(!frustum.intersects_sphere(Vec3::new(12.5, 0.0, -10.0), 1.0));
    }

    #[test]
    fn slice_corners_round_trip_through_projection() {
        let camera = looking_down_negative_z();
        let view_projection = camera.view_projection();
        let inverse = view_projection
            .try_inverse()
            .expect("view projection must invert");

        let corners = slice_corners(&inverse, 0.0, 1.0);
        // Near corners sit on the near plane (z = -near in view space)
        assert_relative_eq!(corners[0].z, -1.0, epsilon = 1e-3);
        // Far corners sit on the far plane
        assert_relative_eq!(corners[4].z, -100.0, epsilon = 1e-2);
    }
}
