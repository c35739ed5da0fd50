//! # Umbra Engine
//!
//! The scene-graph and shadow-mapping core of a real-time 3D renderer.
//!
//! ## Features
//!
//! - **Scene tree**: Arena-backed transform hierarchy with cached world
//!   matrices and cycle-safe attachment
//! - **Skinning**: Bone chains updated in skin-local space with lazily
//!   captured inverse bind matrices
//! - **Scene registries**: Light/renderable tracking with per-frame
//!   add/remove deltas for the renderer
//! - **LOD**: Distance-driven detail selection
//! - **Shadow maps**: Per-light shadow cameras, cascaded directional
//!   lights via virtual lights, frustum culling, depth-material dispatch
//!
//! ## Quick Start
//!
//! ```rust
//! use umbra_engine::prelude::*;
//!
//! let mut tree = SceneTree::new();
//! let mut scene = Scene::new();
//! let root = tree.root();
//!
//! let camera = tree
//!     .spawn(root, NodeKind::Camera(CameraData::perspective(1.0, 16.0 / 9.0, 0.1, 1000.0)))
//!     .unwrap();
//!
//! let mut sun = Light::directional(Vec3::new(1.0, 1.0, 0.9), 1.0);
//! sun.cast_shadow = true;
//! let sun = tree.spawn(root, NodeKind::Light(sun)).unwrap();
//! scene.add_object(&mut tree, sun);
//!
//! let mut gpu = RecordingContext::new();
//! let mut shadows = ShadowPipeline::new(PipelineConfig::enabled(), &mut gpu);
//!
//! // Per frame: transforms first, then visibility, then shadows
//! tree.update_world_all();
//! let view = tree.camera(camera).unwrap().view_matrix();
//! tree.update_lods(&view);
//! shadows.render(&mut tree, &scene, camera, &mut gpu).unwrap();
//! ```

#![warn(missing_docs)]
#![warn(clippy::all, clippy::pedantic, clippy::nursery)]
#![allow(clippy::module_name_repetitions, clippy::similar_names, clippy::too_many_arguments)]

pub mod config;
pub mod foundation;
pub mod render;
pub mod scene;

pub use config::{ConfigError, PipelineConfig, RenderStateConfig};

/// Common imports for engine users
pub mod prelude {
    pub use crate::{
        config::{PipelineConfig, RenderStateConfig},
        foundation::{
            logging,
            math::{Mat4, Mat4Ext, Quat, Rotation, Transform, Vec3, Vec4},
        },
        render::{
            CameraData, GeometryHandle, GpuContext, Projection, RecordingContext, ShadowPipeline,
        },
        scene::{
            Light, LightKind, LodData, MeshData, NodeId, NodeKind, Scene, SceneError, SceneTree,
            SkinData,
        },
    };
}
