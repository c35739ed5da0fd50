//! Skinned meshes and bones
//!
//! Bones are scene nodes, but their matrices live in the owning skin's
//! local frame rather than scene-root space. The skin keeps the flattened
//! per-bone offset palette (skin matrix x inverse bind) that skinned draws
//! upload to the GPU.

use crate::foundation::math::{Mat4, Vec4};
use crate::scene::mesh::MeshData;
use crate::scene::node::NodeId;

/// Number of floats per joint matrix in the flattened palette
pub const FLOATS_PER_JOINT: usize = 16;

/// Fallback weight vector for degenerate (all-zero) skin weights
pub const FALLBACK_WEIGHT: [f32; 4] = [1.0, 0.0, 0.0, 0.0];

/// Payload of a bone node
#[derive(Debug, Clone)]
pub struct BoneData {
    /// Owning skinned mesh, as a non-owning back-reference
    pub skin: Option<NodeId>,

    pub(crate) skin_matrix: Mat4,
}

impl BoneData {
    /// Create a bone belonging to the given skin
    pub fn new(skin: Option<NodeId>) -> Self {
        Self {
            skin,
            skin_matrix: Mat4::identity(),
        }
    }

    /// The bone's transform in the skin's local frame
    pub fn skin_matrix(&self) -> Mat4 {
        self.skin_matrix
    }
}

/// Payload of a skinned-mesh node
#[derive(Debug, Clone)]
pub struct SkinData {
    /// Rendering data shared with plain meshes
    pub mesh: MeshData,

    /// Bones in palette order; each is also a node somewhere under the mesh
    pub bones: Vec<NodeId>,

    /// Per-vertex skin weights
    pub skin_weights: Vec<Vec4>,

    pub(crate) inverse_binds: Option<Vec<Mat4>>,
    pub(crate) joint_matrices: Vec<f32>,
}

impl SkinData {
    /// Create a skin around existing mesh data
    pub fn new(mesh: MeshData) -> Self {
        Self {
            mesh,
            bones: Vec::new(),
            skin_weights: Vec::new(),
            inverse_binds: None,
            joint_matrices: Vec::new(),
        }
    }

    /// The flattened joint palette, 16 floats per bone in palette order
    pub fn joint_matrices(&self) -> &[f32] {
        &self.joint_matrices
    }

    /// Whether the inverse bind matrices have been captured yet
    pub fn has_inverse_binds(&self) -> bool {
        self.inverse_binds.is_some()
    }

    /// Drop the captured inverse binds so the next update re-captures them
    /// from the current pose
    pub(crate) fn clear_inverse_binds(&mut self) {
        self.inverse_binds = None;
    }

    /// Grow the joint palette to cover all registered bones
    pub(crate) fn ensure_palette(&mut self) {
        let wanted = self.bones.len() * FLOATS_PER_JOINT;
        if self.joint_matrices.len() != wanted {
            self.joint_matrices.resize(wanted, 0.0);
        }
    }

    /// Rescale every skin-weight vector so its components sum to one
    ///
    /// A zero-magnitude input has no meaningful direction to preserve and
    /// is replaced with the fallback weight instead of dividing by zero.
    pub fn normalize_skin_weights(&mut self) {
        for weights in &mut self.skin_weights {
            let sum = weights.x + weights.y + weights.z + weights.w;
            if sum == 0.0 {
                *weights = Vec4::new(
                    FALLBACK_WEIGHT[0],
                    FALLBACK_WEIGHT[1],
                    FALLBACK_WEIGHT[2],
                    FALLBACK_WEIGHT[3],
                );
            } else {
                *weights /= sum;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::render::gpu::GeometryHandle;
    use approx::assert_relative_eq;

    fn test_skin() -> SkinData {
        SkinData::new(MeshData::buffer(GeometryHandle(0), 36, 1.0))
    }

    #[test]
    fn weights_are_rescaled_to_unit_sum() {
        let mut skin = test_skin();
        skin.skin_weights = vec![Vec4::new(2.0, 2.0, 0.0, 0.0), Vec4::new(0.5, 0.25, 0.25, 0.0)];

        skin.normalize_skin_weights();

        for weights in &skin.skin_weights {
            let sum = weights.x + weights.y + weights.z + weights.w;
            assert_relative_eq!(sum, 1.0, epsilon = 1e-6);
        }
        assert_relative_eq!(skin.skin_weights[0].x, 0.5, epsilon = 1e-6);
    }

    #[test]
    fn zero_weights_fall_back_to_first_joint() {
        let mut skin = test_skin();
        skin.skin_weights = vec![Vec4::zeros()];

        skin.normalize_skin_weights();

        assert_eq!(skin.skin_weights[0], Vec4::new(1.0, 0.0, 0.0, 0.0));
    }
}
