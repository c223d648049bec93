//! Export configuration
//!
//! All per-session switches live in one value handed down through the
//! passes; nothing reads ambient state.

use serde::{Deserialize, Serialize};

/// Root-motion correction applied after sampling a clip
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RootMotion {
    /// Keys are written as sampled
    #[default]
    None,
    /// Blend the root translation back to its start pose over the clip
    Linear,
    /// Pin the root translation to the first frame
    Locked,
}

/// Where material polygon flags come from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MaterialFlagSource {
    /// Derive flags from shader introspection
    #[default]
    Structural,
    /// Derive flags from substrings of the material name
    NameBased,
}

/// Session-wide export settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ExportConfig {
    /// Name of the node to use as skeleton root; first joint in
    /// traversal order when absent
    pub root_hint: Option<String>,

    /// Uniform scale applied to all positions (points and bone
    /// translations alike)
    pub point_scale: f32,

    /// Overrides the provider's frame rate when set
    pub frame_rate_override: Option<f32>,

    /// Root-motion correction mode
    pub root_motion: RootMotion,

    /// How polygon flags are derived for each material
    pub material_flag_source: MaterialFlagSource,
}

impl Default for ExportConfig {
    fn default() -> Self {
        Self {
            root_hint: None,
            point_scale: 1.0,
            frame_rate_override: None,
            root_motion: RootMotion::default(),
            material_flag_source: MaterialFlagSource::default(),
        }
    }
}

impl ExportConfig {
    /// Validate settings that have hard constraints
    pub fn validate(&self) -> crate::Result<()> {
        if self.point_scale <= 0.0 || !self.point_scale.is_finite() {
            return Err(crate::Error::InvalidConfig {
                message: format!("point_scale must be positive and finite, got {}", self.point_scale),
            });
        }
        if let Some(rate) = self.frame_rate_override {
            if rate <= 0.0 || !rate.is_finite() {
                return Err(crate::Error::InvalidConfig {
                    message: format!("frame_rate_override must be positive, got {rate}"),
                });
            }
        }
        Ok(())
    }
}
