//! Rendering subsystem
//!
//! Cameras, frustum culling, the GPU-context boundary, and the shadow-map
//! pipeline. Everything here consumes world matrices settled by the scene
//! side; nothing mutates transforms except the pipeline's own shadow
//! cameras and virtual lights.

pub mod camera;
pub mod depth_material;
pub mod frustum;
pub mod gpu;
pub mod shadow;

pub use camera::{CameraData, Projection};
pub use depth_material::{DepthFeatures, DepthMaterialSet};
pub use frustum::{Frustum, Plane};
pub use gpu::{
    BlendMode, CullMode, GeometryHandle, GpuContext, MaterialHandle, RecordingContext,
    RenderTargetHandle, TargetFormat, Winding,
};
pub use shadow::{ShadowError, ShadowPipeline};
