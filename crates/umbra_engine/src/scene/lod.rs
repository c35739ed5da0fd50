//! Level-of-detail selection
//!
//! A LOD node owns an ascending-by-distance list of (child, threshold)
//! pairs and shows exactly one of them based on the node's distance from
//! the camera.

use crate::foundation::math::{Mat4, Mat4Ext};
use crate::scene::node::{NodeId, NodeKind, SceneError, SceneTree};

/// One detail level of a LOD node
#[derive(Debug, Clone, Copy)]
pub struct LodLevel {
    /// Child node shown at this level
    pub node: NodeId,
    /// Camera distance at which this level becomes active
    pub distance: f32,
}

/// Payload of a LOD node
#[derive(Debug, Clone, Default)]
pub struct LodData {
    pub(crate) levels: Vec<LodLevel>,
}

impl LodData {
    /// Create an empty level list
    pub fn new() -> Self {
        Self::default()
    }

    /// Registered levels in ascending distance order
    pub fn levels(&self) -> &[LodLevel] {
        &self.levels
    }
}

impl SceneTree {
    /// Register a detail level on a LOD node and attach it as a child
    ///
    /// The distance is normalized to its absolute value. Insertion is a
    /// stable ascending insert: the level lands before the first entry
    /// with a strictly greater distance, so equal distances keep their
    /// insertion order.
    pub fn add_lod_level(
        &mut self,
        lod: NodeId,
        node: NodeId,
        distance: f32,
    ) -> Result<(), SceneError> {
        let distance = distance.abs();

        match &mut self
            .get_mut(lod)
            .ok_or(SceneError::NodeMissing(lod))?
            .kind
        {
            NodeKind::Lod(data) => {
                let at = data
                    .levels
                    .iter()
                    .position(|level| level.distance > distance)
                    .unwrap_or(data.levels.len());
                data.levels.insert(at, LodLevel { node, distance });
            }
            _ => {
                return Err(SceneError::KindMismatch {
                    id: lod,
                    expected: "lod",
                })
            }
        }

        self.attach(lod, node)
    }

    /// Select the active level of one LOD node against a camera view matrix
    ///
    /// The distance is the scalar projection of the node's world position
    /// onto the camera's depth axis: the third row of the world-to-camera
    /// matrix applied to the world translation, negated. Levels are scanned
    /// in ascending order; the highest-index level whose threshold the
    /// distance meets (`>=`, so a boundary distance activates the level) is
    /// shown and every other level is hidden. With fewer than two levels
    /// this is a no-op.
    pub fn update_lod(&mut self, lod: NodeId, camera_view: &Mat4) -> Result<(), SceneError> {
        let levels = match &self.get(lod).ok_or(SceneError::NodeMissing(lod))?.kind {
            NodeKind::Lod(data) => data.levels.clone(),
            _ => {
                return Err(SceneError::KindMismatch {
                    id: lod,
                    expected: "lod",
                })
            }
        };
        if levels.len() < 2 {
            return Ok(());
        }

        let translation = self[lod].world_matrix().translation_part();
        let distance = -(camera_view[(2, 0)] * translation.x
            + camera_view[(2, 1)] * translation.y
            + camera_view[(2, 2)] * translation.z
            + camera_view[(2, 3)]);

        let active = levels
            .iter()
            .rposition(|level| distance >= level.distance)
            .unwrap_or(0);

        for (index, level) in levels.iter().enumerate() {
            if let Some(node) = self.get_mut(level.node) {
                node.visible = index == active;
            }
        }
        Ok(())
    }

    /// Update every LOD node in the tree against a camera view matrix
    pub fn update_lods(&mut self, camera_view: &Mat4) {
        let lods: Vec<NodeId> = self
            .iter()
            .filter(|(_, node)| matches!(node.kind(), NodeKind::Lod(_)))
            .map(|(id, _)| id)
            .collect();

        for lod in lods {
            // Node kind already checked; missing nodes cannot occur here
            let _ = self.update_lod(lod, camera_view);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::foundation::math::Vec3;
    use crate::render::camera::CameraData;

    fn view_from(position: Vec3) -> Mat4 {
        let mut camera = CameraData::perspective(1.0, 1.0, 0.1, 1000.0);
        camera.target = Vec3::zeros();
        camera.place(position);
        camera.view_matrix()
    }

    fn lod_with_levels(tree: &mut SceneTree, distances: &[f32]) -> (NodeId, Vec<NodeId>) {
        let root = tree.root();
        let lod = tree.spawn(root, NodeKind::Lod(LodData::new())).unwrap();
        let mut nodes = Vec::new();
        for &distance in distances {
            let level = tree.insert(NodeKind::Group);
            tree.add_lod_level(lod, level, distance).unwrap();
            nodes.push(level);
        }
        (lod, nodes)
    }

    fn visible_levels(tree: &SceneTree, nodes: &[NodeId]) -> Vec<bool> {
        nodes.iter().map(|&n| tree[n].visible).collect()
    }

    #[test]
    fn negative_distances_are_normalized() {
        let mut tree = SceneTree::new();
        let (lod, _) = lod_with_levels(&mut tree, &[-50.0, 10.0]);

        match tree[lod].kind() {
            NodeKind::Lod(data) => {
                assert_eq!(data.levels()[0].distance, 10.0);
                assert_eq!(data.levels()[1].distance, 50.0);
            }
            _ => unreachable!(),
        }
    }

    #[test]
    fn ties_keep_insertion_order() {
        let mut tree = SceneTree::new();
        let (lod, nodes) = lod_with_levels(&mut tree, &[10.0, 10.0, 5.0]);

        match tree[lod].kind() {
            NodeKind::Lod(data) => {
                let order: Vec<NodeId> = data.levels().iter().map(|l| l.node).collect();
                assert_eq!(order, vec![nodes[2], nodes[0], nodes[1]]);
            }
            _ => unreachable!(),
        }
    }

    #[test]
    fn exactly_one_level_is_visible() {
        let mut tree = SceneTree::new();
        let (lod, nodes) = lod_with_levels(&mut tree, &[0.0, 50.0, 200.0]);
        tree.update_world_all();

        let view = view_from(Vec3::new(0.0, 0.0, 100.0));
        tree.update_lod(lod, &view).unwrap();

        assert_eq!(visible_levels(&tree, &nodes), vec![false, true, false]);
    }

    #[test]
    fn boundary_distance_activates_the_level() {
        let mut tree = SceneTree::new();
        let (lod, nodes) = lod_with_levels(&mut tree, &[0.0, 100.0]);
        tree.update_world_all();

        let view = view_from(Vec3::new(0.0, 0.0, 100.0));
        tree.update_lod(lod, &view).unwrap();

        assert_eq!(visible_levels(&tree, &nodes), vec![false, true]);
    }

    #[test]
    fn single_level_is_left_untouched() {
        let mut tree = SceneTree::new();
        let (lod, nodes) = lod_with_levels(&mut tree, &[25.0]);
        tree.update_world_all();

        let view = view_from(Vec3::new(0.0, 0.0, 1.0));
        tree.update_lod(lod, &view).unwrap();

        assert!(tree[nodes[0]].visible);
    }
}
