//! Pipeline configuration.

use serde::{Deserialize, Serialize};

use flatbake_scene::{ComputeDevice, ExportOptions, MarginType, RenderConfig, RenderEngine};

/// Default width and height of every baked image.
pub const DEFAULT_BAKE_RESOLUTION: u32 = 1024;

/// Default padding around UV islands, in pixels.
pub const DEFAULT_BAKE_MARGIN: u32 = 16;

/// Default samples per texel. Nothing is lit, so few are needed.
pub const DEFAULT_BAKE_SAMPLES: u32 = 16;

/// What to do when a channel's bake call fails.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BakeFailurePolicy {
    /// Record the channel as failed, leave it out of the clean material and
    /// carry on with the remaining channels and objects.
    #[default]
    SkipChannel,
    /// End the run without exporting.
    AbortRun,
}

/// Configuration for one conversion run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Width and height of every baked image.
    pub bake_resolution: u32,
    /// Padding around UV islands, in pixels.
    pub bake_margin: u32,
    /// Samples per texel.
    pub bake_samples: u32,
    /// Organic-surface mode: skip every optional channel.
    pub skip_metallic: bool,
    /// Bake failure handling.
    pub bake_failure: BakeFailurePolicy,
    /// Options handed to the exporter.
    pub export: ExportOptions,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            bake_resolution: DEFAULT_BAKE_RESOLUTION,
            bake_margin: DEFAULT_BAKE_MARGIN,
            bake_samples: DEFAULT_BAKE_SAMPLES,
            skip_metallic: false,
            bake_failure: BakeFailurePolicy::default(),
            export: ExportOptions::default(),
        }
    }
}

impl PipelineConfig {
    /// Sets the bake resolution.
    pub fn resolution(mut self, resolution: u32) -> Self {
        self.bake_resolution = resolution;
        self
    }

    /// Sets the island margin.
    pub fn margin(mut self, margin: u32) -> Self {
        self.bake_margin = margin;
        self
    }

    /// Sets the sample count.
    pub fn samples(mut self, samples: u32) -> Self {
        self.bake_samples = samples;
        self
    }

    /// Enables or disables organic-surface mode.
    pub fn skip_metallic(mut self, skip: bool) -> Self {
        self.skip_metallic = skip;
        self
    }

    /// Sets the bake failure policy.
    pub fn on_bake_failure(mut self, policy: BakeFailurePolicy) -> Self {
        self.bake_failure = policy;
        self
    }
}

impl From<&PipelineConfig> for RenderConfig {
    fn from(config: &PipelineConfig) -> Self {
        RenderConfig {
            engine: RenderEngine::Raster,
            device: ComputeDevice::Cpu,
            samples: config.bake_samples,
            denoise: false,
            margin: config.bake_margin,
            margin_type: MarginType::Extend,
            clear_before_bake: true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_defaults() {
        let config = PipelineConfig::default();
        assert_eq!(config.bake_resolution, 1024);
        assert_eq!(config.bake_margin, 16);
        assert_eq!(config.bake_failure, BakeFailurePolicy::SkipChannel);
        assert!(config.export.embed_textures);
        assert!(config.export.apply_mesh_modifiers);
    }

    #[test]
    fn test_render_config_follows_pipeline() {
        let config = PipelineConfig::default().samples(4).margin(2);
        let render = RenderConfig::from(&config);
        assert_eq!(
            render,
            RenderConfig {
                samples: 4,
                margin: 2,
                ..RenderConfig::default()
            }
        );
    }

    #[test]
    fn test_partial_json() {
        let config: PipelineConfig =
            serde_json::from_str(r#"{"skip_metallic": true, "bake_failure": "abort_run"}"#).unwrap();
        assert!(config.skip_metallic);
        assert_eq!(config.bake_failure, BakeFailurePolicy::AbortRun);
        assert_eq!(config.bake_samples, DEFAULT_BAKE_SAMPLES);
    }
}
