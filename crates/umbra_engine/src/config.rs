//! # Pipeline Configuration
//!
//! Serde-backed configuration for the shadow pipeline and the ambient
//! render state it restores after its passes. Loadable from TOML so
//! applications can tune shadow behavior without recompiling.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::render::gpu::{BlendMode, CullMode, Winding};

/// Errors raised while loading configuration
#[derive(Error, Debug)]
pub enum ConfigError {
    /// The TOML source failed to parse or deserialize
    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),
}

/// Ambient render state restored after the shadow passes
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RenderStateConfig {
    /// Clear color of the main framebuffer
    pub clear_color: [f32; 4],
    /// Front-face winding of the lit pass
    pub front_face: Winding,
    /// Face-culling mode of the lit pass
    pub cull_mode: CullMode,
    /// Blending mode of the lit pass
    pub blending: BlendMode,
}

impl Default for RenderStateConfig {
    fn default() -> Self {
        Self {
            clear_color: [0.0, 0.0, 0.0, 1.0],
            front_face: Winding::CounterClockwise,
            cull_mode: CullMode::Back,
            blending: BlendMode::None,
        }
    }
}

/// Shadow pipeline configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Master switch; a disabled pipeline renders nothing
    pub enabled: bool,
    /// Create frustum-visualization helper nodes for shadow cameras
    pub debug_camera_helpers: bool,
    /// Render state restored once all shadow passes finish
    pub restore: RenderStateConfig,
}

impl PipelineConfig {
    /// Configuration with shadows enabled and everything else default
    pub fn enabled() -> Self {
        Self {
            enabled: true,
            ..Self::default()
        }
    }

    /// Parse a configuration from TOML text
    pub fn from_toml_str(source: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(source)?)
    }
}
