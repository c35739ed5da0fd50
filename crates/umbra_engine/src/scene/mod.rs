//! Scene management system
//!
//! The scene side of the engine: an arena-backed node tree with cached
//! local/world matrices, the registries that tell the renderer which nodes
//! are lights and which are renderables, skinned-mesh bone hierarchies,
//! and level-of-detail selection.
//!
//! ## Architecture
//!
//! ```text
//! SceneTree (nodes, transforms)
//!      |
//! Scene (registries, deltas)
//!      |
//! ShadowPipeline / lit pass (graphics)
//! ```
//!
//! Per frame, world matrices are updated for the whole tree first; LOD
//! visibility and every render pass read them afterwards.

pub mod graph;
mod hierarchy;
pub mod light;
pub mod lod;
pub mod mesh;
pub mod node;
pub mod skin;

pub use graph::Scene;
pub use light::{CascadeConfig, Light, LightKind, ShadowSettings};
pub use lod::{LodData, LodLevel};
pub use mesh::{Geometry, MeshData, PrimitiveRange};
pub use node::{Node, NodeId, NodeKind, SceneError, SceneTree};
pub use skin::{BoneData, SkinData};
