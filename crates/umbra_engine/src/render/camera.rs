//! # 3D Camera System
//!
//! Camera state attached to scene nodes, used both for the viewing camera
//! and for the per-light shadow cameras the pipeline creates.
//!
//! ## Design Principles
//! - **Library-agnostic**: No graphics-API dependencies in camera math
//! - **Placement-driven**: The view matrix is recomputed from an explicit
//!   position/target/up triple, never inferred from partial state
//! - **Mathematical correctness**: Standard right-handed Y-up view space,
//!   with the clip-coordinate flip applied at projection time

use crate::foundation::math::{Mat4, Mat4Ext, Vec3};

/// Projection parameters for a camera
#[derive(Debug, Clone, PartialEq)]
pub enum Projection {
    /// Perspective projection (spot-light shadow cameras, viewing cameras)
    Perspective {
        /// Vertical field of view in radians
        fov: f32,
        /// Viewport aspect ratio (width / height)
        aspect: f32,
        /// Near clipping plane distance
        near: f32,
        /// Far clipping plane distance
        far: f32,
    },
    /// Orthographic projection (directional-light shadow cameras)
    Orthographic {
        /// Left bound of the view box
        left: f32,
        /// Right bound of the view box
        right: f32,
        /// Top bound of the view box
        top: f32,
        /// Bottom bound of the view box
        bottom: f32,
        /// Near clipping plane distance
        near: f32,
        /// Far clipping plane distance
        far: f32,
    },
}

/// Camera state carried by a camera node
///
/// The node's world matrix (maintained by the transform hierarchy) supplies
/// the camera position; orientation comes from the target/up pair via
/// look-at placement, matching how shadow cameras are aimed at their
/// light's target every frame.
#[derive(Debug, Clone)]
pub struct CameraData {
    /// Projection parameters
    pub projection: Projection,

    /// Point the camera is looking at in world space
    pub target: Vec3,

    /// Up vector for camera orientation
    pub up: Vec3,

    view: Mat4,
}

impl CameraData {
    /// Create a perspective camera looking at the origin
    pub fn perspective(fov: f32, aspect: f32, near: f32, far: f32) -> Self {
        Self {
            projection: Projection::Perspective {
                fov,
                aspect,
                near,
                far,
            },
            target: Vec3::zeros(),
            up: Vec3::new(0.0, 1.0, 0.0),
            view: Mat4::identity(),
        }
    }

    /// Create an orthographic camera looking at the origin
    pub fn orthographic(left: f32, right: f32, top: f32, bottom: f32, near: f32, far: f32) -> Self {
        Self {
            projection: Projection::Orthographic {
                left,
                right,
                top,
                bottom,
                near,
                far,
            },
            target: Vec3::zeros(),
            up: Vec3::new(0.0, 1.0, 0.0),
            view: Mat4::identity(),
        }
    }

    /// Recompute the view matrix from a world position and the stored
    /// target/up pair
    ///
    /// If the view direction is nearly parallel to the up vector the up
    /// vector is swapped for +Z, so straight-down lights still produce a
    /// well-formed basis.
    pub fn place(&mut self, position: Vec3) {
        let direction = self.target - position;
        let mut up = self.up;
        if direction.magnitude() > 0.0 {
            let alignment = direction.normalize().dot(&up.normalize()).abs();
            if alignment > 0.999 {
                up = Vec3::new(0.0, 0.0, 1.0);
            }
        }
        self.view = Mat4::look_at(position, self.target, up);
        log::trace!("Camera placed at {position:?}, target {:?}", self.target);
    }

    /// World-to-camera (view) matrix from the last placement
    pub fn view_matrix(&self) -> Mat4 {
        self.view
    }

    /// Projection matrix for the current parameters, depth in [0, 1]
    pub fn projection_matrix(&self) -> Mat4 {
        match self.projection {
            Projection::Perspective {
                fov,
                aspect,
                near,
                far,
            } => Mat4::perspective(fov, aspect, near, far),
            Projection::Orthographic {
                left,
                right,
                top,
                bottom,
                near,
                far,
            } => Mat4::orthographic(left, right, top, bottom, near, far),
        }
    }

    /// Combined view-projection matrix: P × X × V
    ///
    /// X is the clip-coordinate flip; culling, shadow matrices, and
    /// unprojection all use this same chain so they agree exactly.
    pub fn view_projection(&self) -> Mat4 {
        self.projection_matrix() * Mat4::clip_coordinate_transform() * self.view
    }

    /// Near/far clip distances of the current projection
    pub fn clip_range(&self) -> (f32, f32) {
        match self.projection {
            Projection::Perspective { near, far, .. }
            | Projection::Orthographic { near, far, .. } => (near, far),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::foundation::math::Point3;
    use approx::assert_relative_eq;

    #[test]
    fn placed_camera_centers_its_target() {
        let mut camera = CameraData::perspective(std::f32::consts::FRAC_PI_4, 1.0, 0.1, 100.0);
        camera.target = Vec3::new(0.0, 0.0, -5.0);
        camera.place(Vec3::new(0.0, 0.0, 5.0));

        let clip = camera.view_projection();
        let projected = clip.transform_point(&Point3::new(0.0, 0.0, -5.0));

        assert_relative_eq!(projected.x, 0.0, epsilon = 1e-5);
        assert_relative_eq!(projected.y, 0.0, epsilon = 1e-5);
        assert!(projected.z > 0.0 && projected.z < 1.0);
    }

    #[test]
    fn straight_down_placement_stays_finite() {
        let mut camera = CameraData::orthographic(-1.0, 1.0, 1.0, -1.0, 0.1, 10.0);
        camera.target = Vec3::zeros();
        camera.place(Vec3::new(0.0, 5.0, 0.0));

        let view = camera.view_matrix();
        for r in 0..4 {
            for c in 0..4 {
                assert!(view[(r, c)].is_finite());
            }
        }
    }
}
