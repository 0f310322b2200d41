//! Render/bake configuration and bake modes.

use serde::{Deserialize, Serialize};

/// Render engine used for baking.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RenderEngine {
    /// UV-space rasterizing engine that evaluates the shading graph directly.
    Raster,
}

/// Compute device requested for baking.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ComputeDevice {
    Cpu,
    Gpu,
}

/// How texels outside UV islands are filled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MarginType {
    /// Extend island border texels outward.
    Extend,
}

/// Physically faithful capture passes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NativePass {
    /// Surface roughness.
    Roughness,
    /// Diffuse reflectance color (near-black for metals).
    Diffuse,
}

/// What a bake invocation captures.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BakeMode {
    /// Raw emission of the surface shader.
    Emit,
    /// A native physical pass.
    Native(NativePass),
}

/// Scene-wide render configuration, set once before any bake.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RenderConfig {
    /// Render engine.
    pub engine: RenderEngine,
    /// Compute device.
    pub device: ComputeDevice,
    /// Samples per texel.
    pub samples: u32,
    /// Whether to denoise the result.
    pub denoise: bool,
    /// Margin in pixels around UV islands.
    pub margin: u32,
    /// Margin fill strategy.
    pub margin_type: MarginType,
    /// Whether the target is cleared before capture.
    pub clear_before_bake: bool,
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            engine: RenderEngine::Raster,
            device: ComputeDevice::Cpu,
            samples: 16,
            denoise: false,
            margin: 16,
            margin_type: MarginType::Extend,
            clear_before_bake: true,
        }
    }
}

impl RenderConfig {
    /// Sets the sample count.
    pub fn samples(mut self, samples: u32) -> Self {
        self.samples = samples;
        self
    }

    /// Sets the margin.
    pub fn margin(mut self, margin: u32) -> Self {
        self.margin = margin;
        self
    }

    /// Sets whether the target is cleared before capture.
    pub fn clear_before_bake(mut self, clear: bool) -> Self {
        self.clear_before_bake = clear;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_matches_fast_cpu_bake() {
        let config = RenderConfig::default();
        assert_eq!(config.device, ComputeDevice::Cpu);
        assert_eq!(config.samples, 16);
        assert!(!config.denoise);
        assert_eq!(config.margin_type, MarginType::Extend);
        assert!(config.clear_before_bake);
    }

    #[test]
    fn bake_mode_serializes_snake_case() {
        let json = serde_json::to_string(&BakeMode::Native(NativePass::Roughness)).unwrap();
        assert_eq!(json, r#"{"native":"roughness"}"#);
    }
}
