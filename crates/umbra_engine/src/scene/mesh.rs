//! Renderable mesh payloads
//!
//! Geometry itself lives on the GPU side behind handles; the scene only
//! keeps what culling and depth-material dispatch need.

use crate::render::gpu::{GeometryHandle, MaterialHandle};

/// A contiguous vertex range of a legacy-geometry primitive
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PrimitiveRange {
    /// First vertex of the primitive
    pub first: u32,
    /// Vertex count of the primitive
    pub count: u32,
}

/// Geometry source for a renderable node
///
/// Buffer geometry is submitted with a single indexed draw; legacy geometry
/// is walked primitive by primitive through the non-indexed path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Geometry {
    /// Indexed buffer geometry
    Buffer {
        /// GPU-side buffer handle
        handle: GeometryHandle,
        /// Number of indices to draw
        index_count: u32,
    },
    /// Legacy per-primitive geometry
    Legacy {
        /// GPU-side buffer handle
        handle: GeometryHandle,
        /// Primitive ranges drawn one by one
        primitives: Vec<PrimitiveRange>,
    },
}

/// Rendering data carried by mesh and skinned-mesh nodes
#[derive(Debug, Clone)]
pub struct MeshData {
    /// Geometry source
    pub geometry: Geometry,

    /// Radius of the local-space bounding sphere
    pub bounding_radius: f32,

    /// Whether the geometry carries morph-target attributes
    pub morph_targets: bool,

    /// Whether this mesh is rendered into shadow maps
    pub cast_shadow: bool,

    /// Explicit depth material, overriding the variant table when present
    pub custom_depth_material: Option<MaterialHandle>,
}

impl MeshData {
    /// Create mesh data for indexed buffer geometry
    pub fn buffer(handle: GeometryHandle, index_count: u32, bounding_radius: f32) -> Self {
        Self {
            geometry: Geometry::Buffer {
                handle,
                index_count,
            },
            bounding_radius,
            morph_targets: false,
            cast_shadow: true,
            custom_depth_material: None,
        }
    }

    /// Create mesh data for legacy per-primitive geometry
    pub fn legacy(
        handle: GeometryHandle,
        primitives: Vec<PrimitiveRange>,
        bounding_radius: f32,
    ) -> Self {
        Self {
            geometry: Geometry::Legacy { handle, primitives },
            bounding_radius,
            morph_targets: false,
            cast_shadow: true,
            custom_depth_material: None,
        }
    }
}
