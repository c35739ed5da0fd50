//! Scene registries and per-frame deltas
//!
//! The scene tracks which tree nodes are lights and which are ordinary
//! renderables, and records what was added or removed since the renderer
//! last looked. Membership is a set: repeated adds or removes of the same
//! node are idempotent, and an add followed by a remove inside the same
//! frame cancels out to an empty net delta.

use crate::scene::node::{NodeId, NodeKind, SceneTree};

/// Light and renderable registries with add/remove delta tracking
#[derive(Debug, Default)]
pub struct Scene {
    renderables: Vec<NodeId>,
    lights: Vec<NodeId>,
    added: Vec<NodeId>,
    removed: Vec<NodeId>,
}

impl Scene {
    /// Create an empty scene
    pub fn new() -> Self {
        Self::default()
    }

    /// Registered renderable nodes
    pub fn renderables(&self) -> &[NodeId] {
        &self.renderables
    }

    /// Registered light nodes
    pub fn lights(&self) -> &[NodeId] {
        &self.lights
    }

    /// Whether a node is in the renderable registry
    pub fn contains_renderable(&self, id: NodeId) -> bool {
        self.renderables.contains(&id)
    }

    /// Whether a node is in the light registry
    pub fn contains_light(&self, id: NodeId) -> bool {
        self.lights.contains(&id)
    }

    /// Take the added/removed delta lists, leaving them empty
    ///
    /// Read-once: the renderer consumes the deltas and the next frame
    /// starts clean.
    pub fn take_deltas(&mut self) -> (Vec<NodeId>, Vec<NodeId>) {
        (
            std::mem::take(&mut self.added),
            std::mem::take(&mut self.removed),
        )
    }

    /// Register a node and all of its descendants
    ///
    /// Lights go to the light registry; a light whose target node is still
    /// unparented gets the target attached under the root so its world
    /// matrix is maintained. Cameras and bones are structural only. Every
    /// other node lands in the renderable registry and the added delta; a
    /// node still sitting in the removed delta from earlier this frame is
    /// resurrected instead (the pending removal is cancelled).
    pub fn add_object(&mut self, tree: &mut SceneTree, id: NodeId) {
        if !tree.contains(id) {
            return;
        }

        enum Class {
            Light(Option<NodeId>),
            Structural,
            Renderable,
        }

        let class = match tree[id].kind() {
            NodeKind::Light(light) => Class::Light(light.target),
            NodeKind::Camera(_) | NodeKind::Bone(_) | NodeKind::CameraHelper(_) => {
                Class::Structural
            }
            _ => Class::Renderable,
        };

        match class {
            Class::Light(target) => {
                if !self.lights.contains(&id) {
                    self.lights.push(id);
                    log::debug!("light {id:?} registered");
                }
                if let Some(target) = target {
                    let unparented = tree.get(target).is_some_and(|n| n.parent().is_none())
                        && target != tree.root();
                    if unparented {
                        // A dangling target would never get a world matrix
                        if let Err(err) = tree.attach(tree.root(), target) {
                            log::warn!("could not attach light target: {err}");
                        }
                    }
                }
            }
            Class::Structural => {}
            Class::Renderable => {
                if !self.renderables.contains(&id) {
                    self.renderables.push(id);
                    if let Some(at) = self.removed.iter().position(|&r| r == id) {
                        // Same-frame re-add cancels the pending removal
                        self.removed.swap_remove(at);
                    } else {
                        self.added.push(id);
                    }
                }
            }
        }

        let child_count = tree[id].children().len();
        for index in 0..child_count {
            let child = tree[id].children()[index];
            self.add_object(tree, child);
        }
    }

    /// Unregister a node and all of its descendants
    ///
    /// Mirrors [`Scene::add_object`]: membership leaves the relevant
    /// registry, and a node that was added earlier this same frame simply
    /// disappears from the added delta instead of entering the removed one.
    pub fn remove_object(&mut self, tree: &SceneTree, id: NodeId) {
        if !tree.contains(id) {
            return;
        }

        match tree[id].kind() {
            NodeKind::Light(_) => {
                if let Some(at) = self.lights.iter().position(|&l| l == id) {
                    self.lights.remove(at);
                    log::debug!("light {id:?} unregistered");
                }
            }
            NodeKind::Camera(_) | NodeKind::Bone(_) | NodeKind::CameraHelper(_) => {}
            _ => {
                if let Some(at) = self.renderables.iter().position(|&r| r == id) {
                    self.renderables.remove(at);
                    if let Some(pending) = self.added.iter().position(|&a| a == id) {
                        self.added.swap_remove(pending);
                    } else {
                        self.removed.push(id);
                    }
                }
            }
        }

        for index in 0..tree[id].children().len() {
            let child = tree[id].children()[index];
            self.remove_object(tree, child);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::foundation::math::Vec3;
    use crate::scene::light::Light;
    use crate::scene::mesh::MeshData;
    use crate::render::gpu::GeometryHandle;

    fn mesh_kind() -> NodeKind {
        NodeKind::Mesh(MeshData::buffer(GeometryHandle(0), 36, 1.0))
    }

    #[test]
    fn classification_routes_nodes_to_registries() {
        let mut tree = SceneTree::new();
        let mut scene = Scene::new();
        let root = tree.root();

        let group = tree.spawn(root, NodeKind::Group).unwrap();
        let mesh = tree.spawn(group, mesh_kind()).unwrap();
        let light = tree
            .spawn(group, NodeKind::Light(Light::directional(Vec3::new(1.0, 1.0, 1.0), 1.0)))
            .unwrap();

        scene.add_object(&mut tree, group);

        assert!(scene.contains_renderable(group));
        assert!(scene.contains_renderable(mesh));
        assert!(scene.contains_light(light));
        assert!(!scene.contains_renderable(light));
    }

    #[test]
    fn double_add_keeps_membership_a_set() {
        let mut tree = SceneTree::new();
        let mut scene = Scene::new();
        let mesh = tree.spawn(tree.root(), mesh_kind()).unwrap();

        scene.add_object(&mut tree, mesh);
        scene.add_object(&mut tree, mesh);

        assert_eq!(scene.renderables().len(), 1);
        let (added, removed) = scene.take_deltas();
        assert_eq!(added, vec![mesh]);
        assert!(removed.is_empty());
    }

    #[test]
    fn same_frame_add_remove_cancels_out() {
        let mut tree = SceneTree::new();
        let mut scene = Scene::new();
        let mesh = tree.spawn(tree.root(), mesh_kind()).unwrap();

        scene.add_object(&mut tree, mesh);
        scene.remove_object(&tree, mesh);

        assert!(!scene.contains_renderable(mesh));
        let (added, removed) = scene.take_deltas();
        assert!(added.is_empty());
        assert!(removed.is_empty());
    }

    #[test]
    fn same_frame_remove_add_cancels_out() {
        let mut tree = SceneTree::new();
        let mut scene = Scene::new();
        let mesh = tree.spawn(tree.root(), mesh_kind()).unwrap();

        scene.add_object(&mut tree, mesh);
        let _ = scene.take_deltas();

        scene.remove_object(&tree, mesh);
        scene.add_object(&mut tree, mesh);

        assert!(scene.contains_renderable(mesh));
        let (added, removed) = scene.take_deltas();
        assert!(added.is_empty());
        assert!(removed.is_empty());
    }

    #[test]
    fn unparented_light_target_is_attached() {
        let mut tree = SceneTree::new();
        let mut scene = Scene::new();

        let target = tree.insert(NodeKind::Group);
        let mut light = Light::directional(Vec3::new(1.0, 1.0, 1.0), 1.0);
        light.target = Some(target);
        let light = tree.spawn(tree.root(), NodeKind::Light(light)).unwrap();

        scene.add_object(&mut tree, light);

        assert_eq!(tree[target].parent(), Some(tree.root()));
    }

    #[test]
    fn deltas_are_read_once() {
        let mut tree = SceneTree::new();
        let mut scene = Scene::new();
        let mesh = tree.spawn(tree.root(), mesh_kind()).unwrap();

        scene.add_object(&mut tree, mesh);
        let (added, _) = scene.take_deltas();
        assert_eq!(added.len(), 1);

        let (added, removed) = scene.take_deltas();
        assert!(added.is_empty());
        assert!(removed.is_empty());
    }
}
