//! Math utilities and types
//!
//! Provides fundamental math types for 3D graphics, re-exported from
//! nalgebra with engine-specific extensions for transforms and projections.

pub use nalgebra::{Matrix3, Matrix4, Quaternion, Unit, Vector2, Vector3, Vector4};

/// 2D vector type
pub type Vec2 = Vector2<f32>;

/// 3D vector type
pub type Vec3 = Vector3<f32>;

/// 4D vector type
pub type Vec4 = Vector4<f32>;

/// 3x3 matrix type
pub type Mat3 = Matrix3<f32>;

/// 4x4 matrix type
pub type Mat4 = Matrix4<f32>;

/// 3D point type
pub type Point3 = nalgebra::Point3<f32>;

/// Quaternion type for rotations
pub type Quat = Unit<Quaternion<f32>>;

/// Rotation component of a local transform
///
/// Nodes may be authored with Euler angles or driven by quaternions (bone
/// animation typically produces the latter); both compose into the same
/// local matrix.
#[derive(Debug, Clone, PartialEq)]
pub enum Rotation {
    /// Euler angles in radians, applied in XYZ order
    Euler(Vec3),

    /// Unit quaternion
    Quaternion(Quat),
}

impl Rotation {
    /// Identity rotation
    pub fn identity() -> Self {
        Self::Quaternion(Quat::identity())
    }

    /// Convert to a homogeneous rotation matrix
    pub fn to_matrix(&self) -> Mat4 {
        match self {
            Self::Euler(angles) => {
                nalgebra::Rotation3::from_euler_angles(angles.x, angles.y, angles.z)
                    .to_homogeneous()
            }
            Self::Quaternion(quat) => quat.to_homogeneous(),
        }
    }
}

impl Default for Rotation {
    fn default() -> Self {
        Self::identity()
    }
}

/// Transform representing position, rotation, and scale
#[derive(Debug, Clone, PartialEq)]
pub struct Transform {
    /// Position in the parent's space
    pub position: Vec3,

    /// Rotation component
    pub rotation: Rotation,

    /// Scale factors
    pub scale: Vec3,
}

impl Default for Transform {
    fn default() -> Self {
        Self {
            position: Vec3::zeros(),
            rotation: Rotation::identity(),
            scale: Vec3::new(1.0, 1.0, 1.0),
        }
    }
}

impl Transform {
    /// Create a new identity transform
    pub fn identity() -> Self {
        Self::default()
    }

    /// Create a transform with only position
    pub fn from_position(position: Vec3) -> Self {
        Self {
            position,
            ..Default::default()
        }
    }

    /// Convert to a transformation matrix (translation * rotation * scale)
    pub fn to_matrix(&self) -> Mat4 {
        Mat4::new_translation(&self.position)
            * self.rotation.to_matrix()
            * Mat4::new_nonuniform_scaling(&self.scale)
    }
}

/// Math utility functions
pub mod utils {
    /// Degrees to radians conversion factor
    pub const DEG_TO_RAD: f32 = std::f32::consts::PI / 180.0;

    /// Convert degrees to radians
    pub fn deg_to_rad(degrees: f32) -> f32 {
        degrees * DEG_TO_RAD
    }
}

/// Extension trait for Mat4 with projection and view constructors
pub trait Mat4Ext {
    /// Create a perspective projection matrix with depth mapped to [0, 1]
    fn perspective(fov_y: f32, aspect: f32, near: f32, far: f32) -> Mat4;

    /// Create an orthographic projection matrix with depth mapped to [0, 1]
    fn orthographic(left: f32, right: f32, top: f32, bottom: f32, near: f32, far: f32) -> Mat4;

    /// Create a look-at view matrix (world space to camera space)
    fn look_at(eye: Vec3, target: Vec3, up: Vec3) -> Mat4;

    /// Create the intermediate clip-coordinate transformation
    ///
    /// Flips Y and Z to move from standard Y-up right-handed view space to
    /// the Y-down, Z-into-screen clip conventions of the target graphics API.
    fn clip_coordinate_transform() -> Mat4;

    /// Extract the translation column as a 3D vector
    fn translation_part(&self) -> Vec3;

    /// Largest per-axis scale factor encoded in the upper 3x3 block
    fn max_scale(&self) -> f32;
}

impl Mat4Ext for Mat4 {
    fn perspective(fov_y: f32, aspect: f32, near: f32, far: f32) -> Mat4 {
        // P = [a⁻¹/tan(φ/2)    0              0                    0           ]
        //     [0               1/tan(φ/2)     0                    0           ]
        //     [0               0              f/(f-n)              -nf/(f-n)   ]
        //     [0               0              1                    0           ]
        let tan_half_fovy = (fov_y * 0.5).tan();

        let mut result = Mat4::zeros();

        result[(0, 0)] = 1.0 / (aspect * tan_half_fovy);
        result[(1, 1)] = 1.0 / tan_half_fovy;
        result[(2, 2)] = far / (far - near);
        result[(2, 3)] = -(near * far) / (far - near);
        result[(3, 2)] = 1.0;

        result
    }

    fn orthographic(left: f32, right: f32, top: f32, bottom: f32, near: f32, far: f32) -> Mat4 {
        let mut result = Mat4::identity();

        result[(0, 0)] = 2.0 / (right - left);
        result[(1, 1)] = 2.0 / (top - bottom);
        result[(2, 2)] = 1.0 / (far - near);
        result[(0, 3)] = -(right + left) / (right - left);
        result[(1, 3)] = -(top + bottom) / (top - bottom);
        result[(2, 3)] = -near / (far - near);

        result
    }

    fn look_at(eye: Vec3, target: Vec3, up: Vec3) -> Mat4 {
        // Right-handed look-at, Y-up view space
        let forward = (target - eye).normalize();
        let right = forward.cross(&up).normalize();
        let camera_up = right.cross(&forward);

        let translation = Mat4::new(
            1.0, 0.0, 0.0, -eye.x,
            0.0, 1.0, 0.0, -eye.y,
            0.0, 0.0, 1.0, -eye.z,
            0.0, 0.0, 0.0, 1.0,
        );

        let rotation = Mat4::new(
            right.x, right.y, right.z, 0.0,
            camera_up.x, camera_up.y, camera_up.z, 0.0,
            -forward.x, -forward.y, -forward.z, 0.0,
            0.0, 0.0, 0.0, 1.0,
        );

        rotation * translation
    }

    fn clip_coordinate_transform() -> Mat4 {
        // X axis unchanged, Y flipped (up becomes down), Z flipped
        // (forward becomes into screen)
        Mat4::new(
            1.0, 0.0, 0.0, 0.0,
            0.0, -1.0, 0.0, 0.0,
            0.0, 0.0, -1.0, 0.0,
            0.0, 0.0, 0.0, 1.0,
        )
    }

    fn translation_part(&self) -> Vec3 {
        Vec3::new(self[(0, 3)], self[(1, 3)], self[(2, 3)])
    }

    fn max_scale(&self) -> f32 {
        let sx = Vec3::new(self[(0, 0)], self[(1, 0)], self[(2, 0)]).magnitude();
        let sy = Vec3::new(self[(0, 1)], self[(1, 1)], self[(2, 1)]).magnitude();
        let sz = Vec3::new(self[(0, 2)], self[(1, 2)], self[(2, 2)]).magnitude();
        sx.max(sy).max(sz)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn transform_composes_translation_rotation_scale() {
        let transform = Transform {
            position: Vec3::new(1.0, 2.0, 3.0),
            rotation: Rotation::identity(),
            scale: Vec3::new(2.0, 2.0, 2.0),
        };

        let matrix = transform.to_matrix();
        let p = matrix.transform_point(&Point3::new(1.0, 0.0, 0.0));

        assert_relative_eq!(p.x, 3.0, epsilon = 1e-5);
        assert_relative_eq!(p.y, 2.0, epsilon = 1e-5);
        assert_relative_eq!(p.z, 3.0, epsilon = 1e-5);
    }

    #[test]
    fn euler_and_quaternion_rotations_agree() {
        let angles = Vec3::new(0.3, -0.7, 1.1);
        let euler = Rotation::Euler(angles).to_matrix();
        let quat =
            Rotation::Quaternion(Quat::from_euler_angles(angles.x, angles.y, angles.z)).to_matrix();

        for r in 0..4 {
            for c in 0..4 {
                assert_relative_eq!(euler[(r, c)], quat[(r, c)], epsilon = 1e-5);
            }
        }
    }

    #[test]
    fn orthographic_maps_bounds_to_unit_cube() {
        let proj = Mat4::orthographic(-10.0, 10.0, 10.0, -10.0, 1.0, 100.0);

        let near_corner = proj.transform_point(&Point3::new(-10.0, -10.0, 1.0));
        assert_relative_eq!(near_corner.x, -1.0, epsilon = 1e-5);
        assert_relative_eq!(near_corner.y, -1.0, epsilon = 1e-5);
        assert_relative_eq!(near_corner.z, 0.0, epsilon = 1e-5);

        let far_corner = proj.transform_point(&Point3::new(10.0, 10.0, 100.0));
        assert_relative_eq!(far_corner.x, 1.0, epsilon = 1e-5);
        assert_relative_eq!(far_corner.y, 1.0, epsilon = 1e-5);
        assert_relative_eq!(far_corner.z, 1.0, epsilon = 1e-5);
    }

    #[test]
    fn max_scale_reads_largest_axis() {
        let matrix = Mat4::new_nonuniform_scaling(&Vec3::new(2.0, 5.0, 1.0));
        assert_relative_eq!(matrix.max_scale(), 5.0, epsilon = 1e-5);
    }
}
