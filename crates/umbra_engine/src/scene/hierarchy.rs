//! World and skin matrix propagation
//!
//! One pass per frame walks the tree top-down, recomputing local matrices
//! from their transform components and composing world matrices through
//! parents. Two dirty flags keep the pass cheap: `local_auto_update`
//! (recompose the local matrix) and `world_needs_update` (the world matrix
//! is stale). A recomposed local matrix always forces the subtree below it.
//!
//! Bones are the exception: their matrices accumulate in the owning skin's
//! local frame (the skin matrix), not in scene-root space, so a skinned
//! mesh drives its bone children through a separate path seeded with the
//! identity matrix.

use crate::foundation::math::Mat4;
use crate::scene::node::{NodeId, NodeKind, SceneError, SceneTree};

impl SceneTree {
    /// Update world matrices for the whole tree
    ///
    /// Must run to completion before visibility or shadow work reads any
    /// world matrix.
    pub fn update_world_all(&mut self) {
        let root = self.root();
        self.update_world(root, false);
    }

    /// Update world matrices for a node and its subtree
    ///
    /// `force` recomputes the world matrix even when no dirty flag is set;
    /// it propagates downward once any ancestor actually changed.
    pub fn update_world(&mut self, id: NodeId, force: bool) {
        if !self.contains(id) {
            return;
        }

        let force = self.refresh_matrices(id, force);

        if matches!(self.nodes[id].kind, NodeKind::SkinnedMesh(_)) {
            self.update_skin_children(id);
            self.finalize_skin(id);
        } else {
            for index in 0..self.nodes[id].children.len() {
                let child = self.nodes[id].children[index];
                self.update_world(child, force);
            }
        }
    }

    /// Recompute local and world matrices for one node, returning the
    /// propagation flag for its children
    fn refresh_matrices(&mut self, id: NodeId, mut force: bool) -> bool {
        if self.nodes[id].local_auto_update {
            let local = self.nodes[id].transform.to_matrix();
            self.nodes[id].local_matrix = local;
            force = true;
        }

        if force || self.nodes[id].world_needs_update {
            let world = match self.nodes[id].parent {
                Some(parent) => self.nodes[parent].world_matrix * self.nodes[id].local_matrix,
                None => self.nodes[id].local_matrix,
            };
            let node = &mut self.nodes[id];
            node.world_matrix = world;
            node.world_needs_update = false;
            force = true;
        }

        force
    }

    /// Drive a bone through the skin-matrix path
    ///
    /// Same dirty-flag logic as the ordinary path, but the result lands in
    /// the bone's skin matrix: `parent_skin x local`, or `local` alone at
    /// the top of the chain.
    fn update_bone(&mut self, id: NodeId, parent_skin: Option<&Mat4>, mut force: bool) {
        if self.nodes[id].local_auto_update {
            let local = self.nodes[id].transform.to_matrix();
            self.nodes[id].local_matrix = local;
            force = true;
        }

        if force || self.nodes[id].world_needs_update {
            let local = self.nodes[id].local_matrix;
            let skin = match parent_skin {
                Some(parent) => parent * local,
                None => local,
            };
            if let NodeKind::Bone(bone) = &mut self.nodes[id].kind {
                bone.skin_matrix = skin;
            }
            self.nodes[id].world_needs_update = false;
            force = true;
        }

        let skin_matrix = match &self.nodes[id].kind {
            NodeKind::Bone(bone) => bone.skin_matrix,
            _ => return,
        };

        for index in 0..self.nodes[id].children.len() {
            let child = self.nodes[id].children[index];
            if matches!(self.nodes[child].kind, NodeKind::Bone(_)) {
                self.update_bone(child, Some(&skin_matrix), force);
            } else {
                self.update_world(child, true);
            }
        }
    }

    /// Update a skinned mesh's direct children
    ///
    /// Bone children start their skin-matrix chains from the identity;
    /// everything else gets a forced ordinary world update.
    fn update_skin_children(&mut self, id: NodeId) {
        for index in 0..self.nodes[id].children.len() {
            let child = self.nodes[id].children[index];
            if matches!(self.nodes[child].kind, NodeKind::Bone(_)) {
                self.update_bone(child, None, false);
            } else {
                self.update_world(child, true);
            }
        }
    }

    /// Capture inverse binds on the first pass, then refresh the flattened
    /// joint palette: `offset = skin_matrix x inverse_bind` per bone
    fn finalize_skin(&mut self, id: NodeId) {
        let bone_count = match &self.nodes[id].kind {
            NodeKind::SkinnedMesh(skin) => skin.bones.len(),
            _ => return,
        };

        let needs_binds = matches!(
            &self.nodes[id].kind,
            NodeKind::SkinnedMesh(skin) if skin.inverse_binds.is_none()
        );
        if needs_binds {
            let mut binds = Vec::with_capacity(bone_count);
            for index in 0..bone_count {
                let skin_matrix = self.bone_skin_matrix(id, index);
                binds.push(skin_matrix.try_inverse().unwrap_or_else(Mat4::identity));
            }
            if let NodeKind::SkinnedMesh(skin) = &mut self.nodes[id].kind {
                skin.inverse_binds = Some(binds);
                skin.ensure_palette();
            }
        }

        for index in 0..bone_count {
            let inverse = match &self.nodes[id].kind {
                NodeKind::SkinnedMesh(skin) => skin
                    .inverse_binds
                    .as_ref()
                    .map_or_else(Mat4::identity, |binds| binds[index]),
                _ => return,
            };
            let offset = self.bone_skin_matrix(id, index) * inverse;
            if let NodeKind::SkinnedMesh(skin) = &mut self.nodes[id].kind {
                skin.ensure_palette();
                let floats = offset.as_slice();
                skin.joint_matrices[index * 16..(index + 1) * 16].copy_from_slice(floats);
            }
        }
    }

    fn bone_skin_matrix(&self, mesh: NodeId, index: usize) -> Mat4 {
        let bone = match &self.nodes[mesh].kind {
            NodeKind::SkinnedMesh(skin) => skin.bones[index],
            _ => return Mat4::identity(),
        };
        match self.nodes.get(bone).map(|node| node.kind()) {
            Some(NodeKind::Bone(data)) => data.skin_matrix,
            _ => Mat4::identity(),
        }
    }

    /// Re-pose a skinned mesh
    ///
    /// Forces a full world update of the mesh subtree, re-captures the
    /// inverse binds from the resulting skin matrices, and normalizes the
    /// per-vertex skin weights (zero-magnitude vectors fall back to the
    /// first joint).
    pub fn pose(&mut self, id: NodeId) -> Result<(), SceneError> {
        match &mut self
            .nodes
            .get_mut(id)
            .ok_or(SceneError::NodeMissing(id))?
            .kind
        {
            NodeKind::SkinnedMesh(skin) => skin.clear_inverse_binds(),
            _ => {
                return Err(SceneError::KindMismatch {
                    id,
                    expected: "skinned mesh",
                })
            }
        }

        self.update_world(id, true);

        if let NodeKind::SkinnedMesh(skin) = &mut self.nodes[id].kind {
            skin.normalize_skin_weights();
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::foundation::math::{Transform, Vec3, Vec4};
    use crate::render::gpu::GeometryHandle;
    use crate::scene::mesh::MeshData;
    use crate::scene::skin::SkinData;
    use approx::assert_relative_eq;

    fn assert_mat4_eq(a: &Mat4, b: &Mat4) {
        for r in 0..4 {
            for c in 0..4 {
                assert_relative_eq!(a[(r, c)], b[(r, c)], epsilon = 1e-4);
            }
        }
    }

    fn translated(tree: &mut SceneTree, parent: NodeId, x: f32, y: f32, z: f32) -> NodeId {
        let id = tree.spawn(parent, NodeKind::Group).unwrap();
        tree[id].transform = Transform::from_position(Vec3::new(x, y, z));
        id
    }

    #[test]
    fn world_is_parent_world_times_local_everywhere() {
        let mut tree = SceneTree::new();
        let root = tree.root();
        let a = translated(&mut tree, root, 1.0, 0.0, 0.0);
        let b = translated(&mut tree, a, 0.0, 2.0, 0.0);
        let c = translated(&mut tree, b, 0.0, 0.0, 3.0);
        tree[a].transform.scale = Vec3::new(2.0, 2.0, 2.0);

        tree.update_world_all();

        for id in [a, b, c] {
            let parent = tree[id].parent().unwrap();
            let expected = tree[parent].world_matrix() * tree[id].local_matrix();
            assert_mat4_eq(&tree[id].world_matrix(), &expected);
        }
    }

    #[test]
    fn clean_subtrees_are_left_alone_until_dirtied() {
        let mut tree = SceneTree::new();
        let root = tree.root();
        let a = translated(&mut tree, root, 5.0, 0.0, 0.0);
        tree.update_world_all();

        // Freeze the local matrix, then move the component data without
        // marking anything dirty: nothing may change.
        tree[a].local_auto_update = false;
        tree[a].transform.position = Vec3::new(9.0, 9.0, 9.0);
        tree.update_world_all();
        assert_relative_eq!(tree[a].world_matrix()[(0, 3)], 5.0, epsilon = 1e-5);

        tree[a].set_local_matrix(Transform::from_position(Vec3::new(7.0, 0.0, 0.0)).to_matrix());
        tree.update_world_all();
        assert_relative_eq!(tree[a].world_matrix()[(0, 3)], 7.0, epsilon = 1e-5);
    }

    fn skinned_mesh(tree: &mut SceneTree) -> (NodeId, NodeId, NodeId) {
        let root = tree.root();
        let skin = SkinData::new(MeshData::buffer(GeometryHandle(0), 36, 1.0));
        let mesh = tree.spawn(root, NodeKind::SkinnedMesh(skin)).unwrap();
        let upper = tree
            .add_bone(mesh, mesh, Transform::from_position(Vec3::new(1.0, 0.0, 0.0)))
            .unwrap();
        let lower = tree
            .add_bone(mesh, upper, Transform::from_position(Vec3::new(0.0, 1.0, 0.0)))
            .unwrap();
        (mesh, upper, lower)
    }

    #[test]
    fn bone_matrices_live_in_skin_space() {
        let mut tree = SceneTree::new();
        let (mesh, upper, lower) = skinned_mesh(&mut tree);
        // Move the whole mesh far away; bone skin matrices must not care
        tree[mesh].transform.position = Vec3::new(100.0, 0.0, 0.0);

        tree.update_world_all();

        let upper_skin = match tree[upper].kind() {
            NodeKind::Bone(bone) => bone.skin_matrix(),
            _ => unreachable!(),
        };
        let lower_skin = match tree[lower].kind() {
            NodeKind::Bone(bone) => bone.skin_matrix(),
            _ => unreachable!(),
        };

        assert_relative_eq!(upper_skin[(0, 3)], 1.0, epsilon = 1e-5);
        assert_relative_eq!(lower_skin[(0, 3)], 1.0, epsilon = 1e-5);
        assert_relative_eq!(lower_skin[(1, 3)], 1.0, epsilon = 1e-5);
    }

    #[test]
    fn inverse_binds_are_captured_once() {
        let mut tree = SceneTree::new();
        let (mesh, upper, _) = skinned_mesh(&mut tree);

        tree.update_world_all();

        // At bind pose every offset is the identity
        match tree[mesh].kind() {
            NodeKind::SkinnedMesh(skin) => {
                assert!(skin.has_inverse_binds());
                let palette = skin.joint_matrices();
                assert_eq!(palette.len(), 32);
                assert_relative_eq!(palette[0], 1.0, epsilon = 1e-5);
                assert_relative_eq!(palette[12], 0.0, epsilon = 1e-5);
            }
            _ => unreachable!(),
        }

        // Move a bone: binds stay, offsets move
        tree[upper].transform.position = Vec3::new(2.0, 0.0, 0.0);
        tree.update_world_all();

        match tree[mesh].kind() {
            NodeKind::SkinnedMesh(skin) => {
                // Column-major: translation x lives at flat index 12
                assert_relative_eq!(skin.joint_matrices()[12], 1.0, epsilon = 1e-5);
            }
            _ => unreachable!(),
        }
    }

    #[test]
    fn pose_normalizes_weights_and_recaptures_binds() {
        let mut tree = SceneTree::new();
        let (mesh, upper, _) = skinned_mesh(&mut tree);
        tree.update_world_all();

        tree[upper].transform.position = Vec3::new(3.0, 0.0, 0.0);
        if let NodeKind::SkinnedMesh(skin) = tree[mesh].kind_mut() {
            skin.skin_weights = vec![Vec4::new(3.0, 1.0, 0.0, 0.0), Vec4::zeros()];
        }

        tree.pose(mesh).unwrap();

        match tree[mesh].kind() {
            NodeKind::SkinnedMesh(skin) => {
                // New bind pose captured: offsets are identity again
                assert_relative_eq!(skin.joint_matrices()[12], 0.0, epsilon = 1e-5);
                assert_relative_eq!(skin.skin_weights[0].x, 0.75, epsilon = 1e-5);
                assert_relative_eq!(skin.skin_weights[0].y, 0.25, epsilon = 1e-5);
                assert_eq!(skin.skin_weights[1], Vec4::new(1.0, 0.0, 0.0, 0.0));
            }
            _ => unreachable!(),
        }
    }
}
