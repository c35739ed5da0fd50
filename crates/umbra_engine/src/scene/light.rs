//! Light nodes and their shadow state
//!
//! Lights are scene nodes. Directional and spot lights can cast shadows;
//! the shadow camera, render target, and (for cascaded directionals) the
//! per-cascade virtual lights are created lazily by the shadow pipeline on
//! the first frame that touches the light, then reused for the light's
//! lifetime.

use serde::{Deserialize, Serialize};

use crate::foundation::math::{Mat4, Vec3};
use crate::render::gpu::RenderTargetHandle;
use crate::scene::node::NodeId;

/// Types of lights supported by the scene
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LightKind {
    /// Directional light (like sunlight) with parallel rays
    Directional,
    /// Spot light that creates a cone of light from a position
    Spot,
    /// Point light that radiates in all directions from a position
    Point,
}

/// Shadow-camera and shadow-map parameters of a single light
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ShadowSettings {
    /// Near plane of the shadow camera
    pub camera_near: f32,
    /// Far plane of the shadow camera
    pub camera_far: f32,
    /// Field of view in radians, used by spot-light shadow cameras
    pub camera_fov: f32,
    /// Half-extent of the orthographic box for non-cascaded directionals
    pub camera_extent: f32,
    /// Shadow map width in texels
    pub map_width: u32,
    /// Shadow map height in texels
    pub map_height: u32,
    /// Depth bias applied when sampling
    pub bias: f32,
    /// Shadow darkness factor in [0, 1]
    pub darkness: f32,
}

impl Default for ShadowSettings {
    fn default() -> Self {
        Self {
            camera_near: 1.0,
            camera_far: 2000.0,
            camera_fov: crate::foundation::math::utils::deg_to_rad(60.0),
            camera_extent: 500.0,
            map_width: 512,
            map_height: 512,
            bias: 0.0,
            darkness: 0.5,
        }
    }
}

/// Cascade configuration of a directional light
///
/// Split tables are NDC depths in [0, 1] over the viewing camera's
/// frustum; cascade `i` covers the slice `near_z[i] .. far_z[i]`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CascadeConfig {
    /// Number of cascades to render
    pub count: usize,
    /// Per-cascade slice start, NDC depth
    pub near_z: Vec<f32>,
    /// Per-cascade slice end, NDC depth
    pub far_z: Vec<f32>,
    /// Per-cascade depth bias
    pub bias: Vec<f32>,
    /// Per-cascade shadow map width
    pub width: Vec<u32>,
    /// Per-cascade shadow map height
    pub height: Vec<u32>,
    /// Offset of the cascade anchor relative to the viewing camera
    pub offset: Vec3,
}

impl Default for CascadeConfig {
    fn default() -> Self {
        Self {
            count: 2,
            near_z: vec![0.0, 0.995, 0.999],
            far_z: vec![0.995, 0.999, 1.0],
            bias: vec![0.0, 0.0, 0.0],
            width: vec![512, 512, 512],
            height: vec![512, 512, 512],
            offset: Vec3::new(0.0, 0.0, -1000.0),
        }
    }
}

/// Lazily created shadow resources, reused across frames
#[derive(Debug, Clone, Copy)]
pub struct ShadowResources {
    /// Shadow camera node, registered in the scene tree
    pub camera: NodeId,
    /// Depth render target for the shadow map
    pub target: RenderTargetHandle,
    /// Debug frustum-visualization helper node, when enabled
    pub helper: Option<NodeId>,
}

/// Back-reference carried by a virtual cascade light
#[derive(Debug, Clone, Copy)]
pub struct VirtualSource {
    /// The real light this cascade belongs to
    pub light: NodeId,
    /// Cascade index within the real light
    pub cascade: usize,
}

/// Payload of a light node
#[derive(Debug, Clone)]
pub struct Light {
    /// RGB color values for the light (0.0 to 1.0 range)
    pub color: Vec3,
    /// Light intensity multiplier
    pub intensity: f32,
    /// The kind of light
    pub kind: LightKind,
    /// Whether this light should cast shadows
    pub cast_shadow: bool,
    /// Whether a directional light renders cascaded shadow maps
    pub shadow_cascade: bool,
    /// Node the light is aimed at
    pub target: Option<NodeId>,
    /// Shadow-camera and map parameters
    pub shadow: ShadowSettings,
    /// Cascade configuration, used when `shadow_cascade` is set
    pub cascade: CascadeConfig,

    pub(crate) resources: Option<ShadowResources>,
    pub(crate) shadow_matrix: Mat4,
    pub(crate) virtual_lights: Vec<NodeId>,
    pub(crate) virtual_of: Option<VirtualSource>,
    pub(crate) cascade_slice: Option<(f32, f32)>,
}

impl Light {
    /// Create a directional light
    pub fn directional(color: Vec3, intensity: f32) -> Self {
        Self::new(LightKind::Directional, color, intensity)
    }

    /// Create a spot light
    pub fn spot(color: Vec3, intensity: f32) -> Self {
        Self::new(LightKind::Spot, color, intensity)
    }

    /// Create a point light
    pub fn point(color: Vec3, intensity: f32) -> Self {
        Self::new(LightKind::Point, color, intensity)
    }

    fn new(kind: LightKind, color: Vec3, intensity: f32) -> Self {
        Self {
            color,
            intensity,
            kind,
            cast_shadow: false,
            shadow_cascade: false,
            target: None,
            shadow: ShadowSettings::default(),
            cascade: CascadeConfig::default(),
            resources: None,
            shadow_matrix: Mat4::identity(),
            virtual_lights: Vec::new(),
            virtual_of: None,
            cascade_slice: None,
        }
    }

    /// The shadow matrix computed by the last pipeline pass
    ///
    /// Maps world space into the [0, 1] texture space of this light's
    /// shadow map.
    pub fn shadow_matrix(&self) -> Mat4 {
        self.shadow_matrix
    }

    /// The shadow map handle, once resources have been acquired
    pub fn shadow_map(&self) -> Option<RenderTargetHandle> {
        self.resources.map(|r| r.target)
    }

    /// The shadow camera node, once resources have been acquired
    pub fn shadow_camera(&self) -> Option<NodeId> {
        self.resources.map(|r| r.camera)
    }

    /// Virtual cascade lights realized for this light so far
    pub fn virtual_lights(&self) -> &[NodeId] {
        &self.virtual_lights
    }

    /// Whether this light is a synthesized per-cascade virtual light
    pub fn is_virtual(&self) -> bool {
        self.virtual_of.is_some()
    }

    /// Source of a virtual light: the real light and the cascade index
    pub fn virtual_source(&self) -> Option<VirtualSource> {
        self.virtual_of
    }
}
