//! Scene tree nodes
//!
//! Nodes live in a slot-map arena and refer to each other by [`NodeId`];
//! parent/child links are ids, so back-references (a bone's owning skin, a
//! virtual light's source) never keep their target alive. The parent/child
//! relation is a tree: attachment that would close a cycle is rejected
//! before it can corrupt the update traversal.

use thiserror::Error;

use crate::foundation::collections::{new_key_type, HandleMap};
use crate::foundation::math::{Mat4, Transform, Vec3};
use crate::render::camera::CameraData;
use crate::scene::light::Light;
use crate::scene::lod::LodData;
use crate::scene::mesh::MeshData;
use crate::scene::skin::{BoneData, SkinData};

new_key_type! {
    /// Stable identifier of a node in a [`SceneTree`]
    pub struct NodeId;
}

/// Errors raised at the scene-tree boundary
#[derive(Error, Debug)]
pub enum SceneError {
    /// Attaching the child would make it its own ancestor
    #[error("attaching {child:?} under {parent:?} would create a cycle")]
    CycleDetected {
        /// Intended parent
        parent: NodeId,
        /// Offending child
        child: NodeId,
    },

    /// The node is not (or no longer) present in the tree
    #[error("node {0:?} is not in the tree")]
    NodeMissing(NodeId),

    /// The node exists but holds a different payload kind
    #[error("node {id:?} is not a {expected}")]
    KindMismatch {
        /// Offending node
        id: NodeId,
        /// Payload kind the caller asked for
        expected: &'static str,
    },
}

/// Debug helper payload visualizing a shadow camera's frustum
#[derive(Debug, Clone)]
pub struct CameraHelperData {
    /// World-space frustum corners, near quad then far quad
    pub corners: [Vec3; 8],
}

/// Payload determining what a node is
///
/// The set is closed: classification is a match resolved at construction
/// time, never a per-frame type test.
#[derive(Debug, Clone)]
pub enum NodeKind {
    /// Plain grouping node with no renderable payload
    Group,
    /// Renderable mesh
    Mesh(MeshData),
    /// Renderable mesh deformed by a bone palette
    SkinnedMesh(SkinData),
    /// Bone inside a skin hierarchy
    Bone(BoneData),
    /// Viewing or shadow camera
    Camera(CameraData),
    /// Light source
    Light(Light),
    /// Level-of-detail selector
    Lod(LodData),
    /// Debug frustum-visualization helper
    CameraHelper(CameraHelperData),
}

/// A single element of the scene tree
#[derive(Debug, Clone)]
pub struct Node {
    pub(crate) parent: Option<NodeId>,
    pub(crate) children: Vec<NodeId>,

    /// Local transform components, composed into the local matrix when
    /// `local_auto_update` is set
    pub transform: Transform,

    /// Recompute the local matrix from the transform components on update
    pub local_auto_update: bool,

    /// Whether this node is drawn (and, for LOD levels, selected)
    pub visible: bool,

    pub(crate) local_matrix: Mat4,
    pub(crate) world_matrix: Mat4,
    pub(crate) world_needs_update: bool,

    pub(crate) kind: NodeKind,
}

impl Node {
    fn new(kind: NodeKind) -> Self {
        Self {
            parent: None,
            children: Vec::new(),
            transform: Transform::identity(),
            local_auto_update: true,
            visible: true,
            local_matrix: Mat4::identity(),
            world_matrix: Mat4::identity(),
            world_needs_update: true,
            kind,
        }
    }

    /// The node's payload
    pub fn kind(&self) -> &NodeKind {
        &self.kind
    }

    /// Mutable access to the node's payload
    pub fn kind_mut(&mut self) -> &mut NodeKind {
        &mut self.kind
    }

    /// Parent node, if attached
    pub fn parent(&self) -> Option<NodeId> {
        self.parent
    }

    /// Children in insertion order
    pub fn children(&self) -> &[NodeId] {
        &self.children
    }

    /// Cached local matrix from the last update pass
    pub fn local_matrix(&self) -> Mat4 {
        self.local_matrix
    }

    /// Cached world matrix from the last update pass
    pub fn world_matrix(&self) -> Mat4 {
        self.world_matrix
    }

    /// Set the local matrix directly, bypassing the transform components
    pub fn set_local_matrix(&mut self, matrix: Mat4) {
        self.local_matrix = matrix;
        self.local_auto_update = false;
        self.world_needs_update = true;
    }

    /// Mark the world matrix stale so the next update recomputes it
    pub fn mark_world_dirty(&mut self) {
        self.world_needs_update = true;
    }
}

/// Arena-backed scene tree
///
/// Owns every node; the root is a plain group created on construction.
#[derive(Debug)]
pub struct SceneTree {
    pub(crate) nodes: HandleMap<NodeId, Node>,
    root: NodeId,
}

impl SceneTree {
    /// Create a tree holding only the root group
    pub fn new() -> Self {
        let mut nodes = HandleMap::with_key();
        let root = nodes.insert(Node::new(NodeKind::Group));
        Self { nodes, root }
    }

    /// The root node
    pub fn root(&self) -> NodeId {
        self.root
    }

    /// Number of live nodes, including the root
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Whether the tree holds only the root
    pub fn is_empty(&self) -> bool {
        self.nodes.len() <= 1
    }

    /// Whether the id refers to a live node
    pub fn contains(&self, id: NodeId) -> bool {
        self.nodes.contains_key(id)
    }

    /// Insert a detached node
    pub fn insert(&mut self, kind: NodeKind) -> NodeId {
        self.nodes.insert(Node::new(kind))
    }

    /// Insert a node and attach it under a parent
    pub fn spawn(&mut self, parent: NodeId, kind: NodeKind) -> Result<NodeId, SceneError> {
        let id = self.insert(kind);
        if let Err(err) = self.attach(parent, id) {
            self.nodes.remove(id);
            return Err(err);
        }
        Ok(id)
    }

    /// Borrow a node
    pub fn get(&self, id: NodeId) -> Option<&Node> {
        self.nodes.get(id)
    }

    /// Mutably borrow a node
    pub fn get_mut(&mut self, id: NodeId) -> Option<&mut Node> {
        self.nodes.get_mut(id)
    }

    fn node(&self, id: NodeId) -> Result<&Node, SceneError> {
        self.nodes.get(id).ok_or(SceneError::NodeMissing(id))
    }

    /// Iterate over every live (id, node) pair
    pub fn iter(&self) -> impl Iterator<Item = (NodeId, &Node)> {
        self.nodes.iter()
    }

    /// Whether `ancestor` appears on `node`'s parent chain
    pub fn is_ancestor(&self, ancestor: NodeId, node: NodeId) -> bool {
        let mut current = self.nodes.get(node).and_then(|n| n.parent);
        while let Some(id) = current {
            if id == ancestor {
                return true;
            }
            current = self.nodes.get(id).and_then(|n| n.parent);
        }
        false
    }

    /// Attach `child` under `parent`, detaching it from any previous parent
    ///
    /// Rejects self-attachment and any attachment that would make `child`
    /// an ancestor of itself; an accidental cycle would otherwise hang the
    /// world-update traversal.
    pub fn attach(&mut self, parent: NodeId, child: NodeId) -> Result<(), SceneError> {
        self.node(parent)?;
        self.node(child)?;

        if parent == child || self.is_ancestor(child, parent) {
            return Err(SceneError::CycleDetected { parent, child });
        }

        self.detach(child);

        self.nodes[parent].children.push(child);
        let node = &mut self.nodes[child];
        node.parent = Some(parent);
        node.world_needs_update = true;
        Ok(())
    }

    /// Detach a node from its parent, leaving it and its subtree alive
    pub fn detach(&mut self, child: NodeId) {
        let Some(parent) = self.nodes.get(child).and_then(|n| n.parent) else {
            return;
        };
        self.nodes[parent].children.retain(|&c| c != child);
        self.nodes[child].parent = None;
        self.nodes[child].world_needs_update = true;
    }

    /// Detach a node and release it together with its whole subtree
    pub fn remove_subtree(&mut self, id: NodeId) {
        if !self.nodes.contains_key(id) {
            return;
        }
        self.detach(id);

        let mut pending = vec![id];
        while let Some(current) = pending.pop() {
            if let Some(node) = self.nodes.remove(current) {
                pending.extend(node.children);
            }
        }
    }

    /// Borrow a node's light payload
    pub fn light(&self, id: NodeId) -> Result<&Light, SceneError> {
        match &self.node(id)?.kind {
            NodeKind::Light(light) => Ok(light),
            _ => Err(SceneError::KindMismatch {
                id,
                expected: "light",
            }),
        }
    }

    /// Mutably borrow a node's light payload
    pub fn light_mut(&mut self, id: NodeId) -> Result<&mut Light, SceneError> {
        match &mut self
            .nodes
            .get_mut(id)
            .ok_or(SceneError::NodeMissing(id))?
            .kind
        {
            NodeKind::Light(light) => Ok(light),
            _ => Err(SceneError::KindMismatch {
                id,
                expected: "light",
            }),
        }
    }

    /// Borrow a node's camera payload
    pub fn camera(&self, id: NodeId) -> Result<&CameraData, SceneError> {
        match &self.node(id)?.kind {
            NodeKind::Camera(camera) => Ok(camera),
            _ => Err(SceneError::KindMismatch {
                id,
                expected: "camera",
            }),
        }
    }

    /// Mutably borrow a node's camera payload
    pub fn camera_mut(&mut self, id: NodeId) -> Result<&mut CameraData, SceneError> {
        match &mut self
            .nodes
            .get_mut(id)
            .ok_or(SceneError::NodeMissing(id))?
            .kind
        {
            NodeKind::Camera(camera) => Ok(camera),
            _ => Err(SceneError::KindMismatch {
                id,
                expected: "camera",
            }),
        }
    }

    /// Create a bone under `parent`, registering it in `skin`'s bone list
    ///
    /// The bone becomes both a scene child of `parent` (the skin itself or
    /// another bone) and the next palette entry of the skin.
    pub fn add_bone(
        &mut self,
        skin: NodeId,
        parent: NodeId,
        transform: Transform,
    ) -> Result<NodeId, SceneError> {
        if !matches!(self.node(skin)?.kind, NodeKind::SkinnedMesh(_)) {
            return Err(SceneError::KindMismatch {
                id: skin,
                expected: "skinned mesh",
            });
        }

        let bone = self.insert(NodeKind::Bone(BoneData::new(Some(skin))));
        self.nodes[bone].transform = transform;
        self.attach(parent, bone)?;

        match &mut self.nodes[skin].kind {
            NodeKind::SkinnedMesh(data) => {
                data.bones.push(bone);
                data.ensure_palette();
            }
            _ => unreachable!("kind checked above"),
        }
        Ok(bone)
    }
}

impl Default for SceneTree {
    fn default() -> Self {
        Self::new()
    }
}

impl std::ops::Index<NodeId> for SceneTree {
    type Output = Node;

    fn index(&self, id: NodeId) -> &Node {
        &self.nodes[id]
    }
}

impl std::ops::IndexMut<NodeId> for SceneTree {
    fn index_mut(&mut self, id: NodeId) -> &mut Node {
        &mut self.nodes[id]
    }
}
