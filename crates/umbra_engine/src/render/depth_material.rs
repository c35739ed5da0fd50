//! Depth-only material variants for shadow rendering
//!
//! Shadow passes render geometry with one of four precompiled depth-only
//! programs, selected by whether the object carries morph targets and
//! whether it is skinned. An object's explicit depth-material override
//! always wins over the variant table.

use bitflags::bitflags;

use crate::render::gpu::{GpuContext, MaterialHandle};

bitflags! {
    /// Geometry features that select a depth-material variant
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct DepthFeatures: u8 {
        /// Geometry carries morph-target attributes
        const MORPH_TARGETS = 1 << 0;
        /// Geometry is driven by a joint palette
        const SKINNING = 1 << 1;
    }
}

/// The four precompiled depth-material variants, indexed by feature bits
#[derive(Debug)]
pub struct DepthMaterialSet {
    materials: [MaterialHandle; 4],
}

impl DepthMaterialSet {
    /// Compile all four variants up front
    pub fn compile(gpu: &mut dyn GpuContext) -> Self {
        let mut materials = [MaterialHandle(0); 4];
        for (bits, slot) in materials.iter_mut().enumerate() {
            let features = DepthFeatures::from_bits_truncate(bits as u8);
            *slot = gpu.compile_depth_material(features);
        }
        Self { materials }
    }

    /// Select the variant matching a feature pair
    pub fn select(&self, features: DepthFeatures) -> MaterialHandle {
        self.materials[features.bits() as usize]
    }
}
