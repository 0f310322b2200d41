//! Conversion orchestration.
//!
//! Per object: `UV check → material check → bake each channel → synthesize →
//! swap`. Objects and channels run strictly one after another; the engine and
//! the graph selection are single shared values.

use std::collections::BTreeMap;
use std::path::Path;

use tracing::{info, info_span, warn};

use flatbake_scene::{
    BakeEngine, ImageStore, Material, RenderConfig, Scene, SceneExporter, SceneImporter,
    Unwrapper, CHANNELS,
};

use crate::config::{BakeFailurePolicy, PipelineConfig};
use crate::error::{PipelineError, PipelineResult};
use crate::extract::{capture_channel, BakeContext, ExtractionOutcome};
use crate::report::{
    ChannelReport, ChannelStatus, ConversionReport, ObjectOutcome, ObjectReport, SkipReason,
};
use crate::synthesize::{clean_material_name, synthesize};
use crate::uv::{ensure_parametrization, UvResolution};

/// The collaborators a pipeline drives.
pub struct Collaborators<'a> {
    pub importer: &'a dyn SceneImporter,
    pub engine: &'a mut dyn BakeEngine,
    pub unwrapper: &'a dyn Unwrapper,
    pub store: &'a mut dyn ImageStore,
    pub exporter: &'a dyn SceneExporter,
}

/// Runs conversions with one configuration.
pub struct Pipeline<'a> {
    config: PipelineConfig,
    parts: Collaborators<'a>,
}

/// Result of processing one object, before the swap.
enum Processed {
    Clean {
        material: Material,
        channels: Vec<ChannelReport>,
    },
    Skipped(SkipReason),
}

impl<'a> Pipeline<'a> {
    /// Creates a pipeline.
    pub fn new(config: PipelineConfig, parts: Collaborators<'a>) -> Self {
        Self { config, parts }
    }

    /// The active configuration.
    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Imports `input`, flattens every object's material and exports once to `output`.
    pub fn convert(&mut self, input: &Path, output: &Path) -> PipelineResult<ConversionReport> {
        if !input.exists() {
            return Err(PipelineError::ResourceNotFound {
                path: input.to_path_buf(),
            });
        }

        info!("Importing: {}", input.display());
        let mut scene = self.parts.importer.import(input)?;
        if scene.objects.is_empty() {
            return Err(PipelineError::NoMeshesFound {
                path: input.to_path_buf(),
            });
        }

        let objects = self.process_scene(&mut scene)?;

        info!("Exporting: {}", output.display());
        self.parts.exporter.export(&scene, output, &self.config.export)?;
        let output_bytes = std::fs::metadata(output)
            .ok()
            .map(|m| m.len())
            .filter(|&len| len > 0)
            .ok_or_else(|| PipelineError::ExportArtifactMissing {
                path: output.to_path_buf(),
            })?;

        Ok(ConversionReport {
            input: input.to_path_buf(),
            output: output.to_path_buf(),
            objects,
            output_bytes,
        })
    }

    /// Configures the engine, then converts every object of `scene` in place.
    pub fn process_scene(&mut self, scene: &mut Scene) -> PipelineResult<Vec<ObjectReport>> {
        self.parts.engine.configure(&RenderConfig::from(&self.config));

        let mut reports = Vec::with_capacity(scene.objects.len());
        for index in 0..scene.objects.len() {
            let name = scene.objects[index].name.clone();
            let span = info_span!("object", name = %name);
            let _enter = span.enter();
            info!("Processing: {}", name);

            let (uv_synthesized, processed) = self.process_object(scene, index)?;
            let outcome = match processed {
                Processed::Clean { material, channels } => {
                    let material_name = material.name.clone();
                    let id = scene.add_material(material);
                    // Converted objects always carry their source material in slot 0.
                    scene.objects[index].material_slots[0] = Some(id);
                    info!("Created: {}", material_name);
                    ObjectOutcome::Converted {
                        material: material_name,
                        channels,
                    }
                }
                Processed::Skipped(reason) => {
                    warn!("Skipping {}: {}", name, reason);
                    ObjectOutcome::Skipped(reason)
                }
            };
            reports.push(ObjectReport {
                name,
                uv_synthesized,
                outcome,
            });
        }
        Ok(reports)
    }

    fn process_object(&mut self, scene: &mut Scene, index: usize) -> PipelineResult<(bool, Processed)> {
        let Scene {
            objects,
            materials,
            images,
        } = scene;
        let mesh = &mut objects[index];

        let uv_synthesized = match ensure_parametrization(mesh, self.parts.unwrapper) {
            Ok(UvResolution::Existing) => false,
            Ok(UvResolution::Synthesized) => true,
            Err(e) => {
                warn!("UV unwrap failed for {}: {}", mesh.name, e);
                return Ok((false, Processed::Skipped(SkipReason::NoUv)));
            }
        };
        let mesh = &*mesh;

        let material = match mesh
            .primary_material()
            .and_then(|id| materials.get_mut(id.index()))
        {
            Some(material) => material,
            None => return Ok((uv_synthesized, Processed::Skipped(SkipReason::NoMaterial))),
        };
        if !material.use_nodes {
            return Ok((uv_synthesized, Processed::Skipped(SkipReason::NotNodeBased)));
        }

        let mut ctx = BakeContext {
            engine: &mut *self.parts.engine,
            store: &mut *self.parts.store,
            resolution: self.config.bake_resolution,
        };
        let mut baked = BTreeMap::new();
        let mut channels = Vec::new();
        for descriptor in CHANNELS
            .iter()
            .filter(|d| !(d.optional && self.config.skip_metallic))
        {
            let span = info_span!("channel", channel = %descriptor.channel);
            let _enter = span.enter();

            match capture_channel(&mut ctx, mesh, &mut material.graph, images, descriptor) {
                Ok(extraction) => {
                    baked.insert(descriptor.channel, extraction.image);
                    let status = match extraction.outcome {
                        ExtractionOutcome::Baked { .. } => ChannelStatus::Baked,
                        ExtractionOutcome::Defaulted(reason) => ChannelStatus::Defaulted(reason),
                    };
                    channels.push(ChannelReport {
                        channel: descriptor.channel,
                        status,
                        image_path: Some(extraction.path),
                    });
                }
                Err(source) => match self.config.bake_failure {
                    BakeFailurePolicy::SkipChannel => {
                        warn!("Bake failed for {} {}: {}", mesh.name, descriptor.channel, source);
                        channels.push(ChannelReport {
                            channel: descriptor.channel,
                            status: ChannelStatus::Failed {
                                message: source.to_string(),
                            },
                            image_path: None,
                        });
                    }
                    BakeFailurePolicy::AbortRun => {
                        return Err(PipelineError::BakeOperationFailed {
                            object: mesh.name.clone(),
                            channel: descriptor.channel,
                            source,
                        });
                    }
                },
            }
        }

        let clean = synthesize(clean_material_name(&mesh.name), &baked, images).map_err(|source| {
            PipelineError::Synthesis {
                object: mesh.name.clone(),
                source,
            }
        })?;
        Ok((
            uv_synthesized,
            Processed::Clean {
                material: clean,
                channels,
            },
        ))
    }
}
