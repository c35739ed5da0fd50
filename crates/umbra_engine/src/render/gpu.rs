//! GPU context boundary
//!
//! The engine core never talks to a graphics API directly. Everything the
//! shadow pipeline needs from the backend - render targets, depth-material
//! programs, uniform uploads, draw submission, global render state - goes
//! through the [`GpuContext`] trait, so the same pipeline code runs against
//! a real backend or against the [`RecordingContext`] used by tests and the
//! demo binary.

use serde::{Deserialize, Serialize};

use crate::foundation::math::Mat4;
use crate::render::depth_material::DepthFeatures;

/// Stable handle to a backend render target
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RenderTargetHandle(pub u32);

/// Stable handle to a compiled material program
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct MaterialHandle(pub u32);

/// Stable handle to uploaded geometry buffers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct GeometryHandle(pub u32);

/// Pixel format of an allocated render target
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TargetFormat {
    /// Depth-only target for shadow maps
    Depth,
    /// Color + depth target
    Color,
}

/// Triangle winding treated as front-facing
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Winding {
    /// Counter-clockwise front faces
    CounterClockwise,
    /// Clockwise front faces
    Clockwise,
}

/// Face culling mode
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CullMode {
    /// Cull nothing
    None,
    /// Cull front faces
    Front,
    /// Cull back faces
    Back,
}

/// Framebuffer blending mode
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BlendMode {
    /// No blending
    None,
    /// Standard alpha blending
    Alpha,
    /// Additive blending
    Additive,
}

/// Backend surface consumed by the shadow pipeline
///
/// Implementations are expected to be cheap to call; the pipeline issues
/// state changes and draws in submission order with no internal batching.
pub trait GpuContext {
    /// Allocate a render target of the given size and format
    fn create_render_target(
        &mut self,
        width: u32,
        height: u32,
        format: TargetFormat,
    ) -> RenderTargetHandle;

    /// Bind a render target, or the default framebuffer for `None`
    fn set_render_target(&mut self, target: Option<RenderTargetHandle>);

    /// Clear the currently bound target
    fn clear(&mut self);

    /// Compile a depth-only material variant for the given feature pair
    fn compile_depth_material(&mut self, features: DepthFeatures) -> MaterialHandle;

    /// Bind a material program for subsequent draws
    fn bind_material(&mut self, material: MaterialHandle);

    /// Upload the model-view and projection matrices for the next draw
    fn set_matrices(&mut self, model_view: &Mat4, projection: &Mat4);

    /// Upload a flattened joint-matrix palette for skinned draws
    fn upload_joint_matrices(&mut self, data: &[u8]);

    /// Issue an indexed draw over buffer geometry
    fn draw_indexed(&mut self, geometry: GeometryHandle, index_count: u32);

    /// Issue a non-indexed draw over a vertex range of legacy geometry
    fn draw_arrays(&mut self, geometry: GeometryHandle, first: u32, count: u32);

    /// Set the clear color used by subsequent clears
    fn set_clear_color(&mut self, color: [f32; 4]);

    /// Set the front-face winding
    fn set_front_face(&mut self, winding: Winding);

    /// Set the face-culling mode
    fn set_cull_mode(&mut self, mode: CullMode);

    /// Set the framebuffer blending mode
    fn set_blending(&mut self, mode: BlendMode);
}

/// A single draw recorded by [`RecordingContext`]
#[derive(Debug, Clone, PartialEq)]
pub struct DrawCall {
    /// Target bound when the draw was issued
    pub target: Option<RenderTargetHandle>,
    /// Material bound when the draw was issued
    pub material: Option<MaterialHandle>,
    /// Geometry drawn
    pub geometry: GeometryHandle,
    /// Index count for indexed draws, vertex count otherwise
    pub count: u32,
    /// Whether the draw went through the indexed path
    pub indexed: bool,
}

/// Headless [`GpuContext`] that records every call instead of rendering
///
/// Used by the integration tests and the demo binary to observe what the
/// pipeline submitted without a graphics device.
#[derive(Debug, Default)]
pub struct RecordingContext {
    /// (width, height, format) of every allocated target, by handle index
    pub targets: Vec<(u32, u32, TargetFormat)>,
    /// Every draw issued, in submission order
    pub draws: Vec<DrawCall>,
    /// Number of clears issued
    pub clears: usize,
    /// Number of joint-palette uploads
    pub joint_uploads: usize,
    /// Depth materials compiled, by feature bits
    pub compiled_materials: Vec<DepthFeatures>,
    /// Most recent clear color set
    pub clear_color: [f32; 4],
    /// Most recent front-face winding set
    pub front_face: Option<Winding>,
    /// Most recent cull mode set
    pub cull_mode: Option<CullMode>,
    /// Most recent blend mode set
    pub blending: Option<BlendMode>,
    bound_target: Option<RenderTargetHandle>,
    bound_material: Option<MaterialHandle>,
}

impl RecordingContext {
    /// Create an empty recording context
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of draws issued against a specific render target
    pub fn draws_to(&self, target: RenderTargetHandle) -> usize {
        self.draws
            .iter()
            .filter(|draw| draw.target == Some(target))
            .count()
    }
}

impl GpuContext for RecordingContext {
    fn create_render_target(
        &mut self,
        width: u32,
        height: u32,
        format: TargetFormat,
    ) -> RenderTargetHandle {
        let handle = RenderTargetHandle(self.targets.len() as u32);
        self.targets.push((width, height, format));
        handle
    }

    fn set_render_target(&mut self, target: Option<RenderTargetHandle>) {
        self.bound_target = target;
    }

    fn clear(&mut self) {
        self.clears += 1;
    }

    fn compile_depth_material(&mut self, features: DepthFeatures) -> MaterialHandle {
        let handle = MaterialHandle(self.compiled_materials.len() as u32);
        self.compiled_materials.push(features);
        handle
    }

    fn bind_material(&mut self, material: MaterialHandle) {
        self.bound_material = Some(material);
    }

    fn set_matrices(&mut self, _model_view: &Mat4, _projection: &Mat4) {}

    fn upload_joint_matrices(&mut self, _data: &[u8]) {
        self.joint_uploads += 1;
    }

    fn draw_indexed(&mut self, geometry: GeometryHandle, index_count: u32) {
        self.draws.push(DrawCall {
            target: self.bound_target,
            material: self.bound_material,
            geometry,
            count: index_count,
            indexed: true,
        });
    }

    fn draw_arrays(&mut self, geometry: GeometryHandle, _first: u32, count: u32) {
        self.draws.push(DrawCall {
            target: self.bound_target,
            material: self.bound_material,
            geometry,
            count,
            indexed: false,
        });
    }

    fn set_clear_color(&mut self, color: [f32; 4]) {
        self.clear_color = color;
    }

    fn set_front_face(&mut self, winding: Winding) {
        self.front_face = Some(winding);
    }

    fn set_cull_mode(&mut self, mode: CullMode) {
        self.cull_mode = Some(mode);
    }

    fn set_blending(&mut self, mode: BlendMode) {
        self.blending = Some(mode);
    }
}
