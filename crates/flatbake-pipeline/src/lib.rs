//! flatbake Pipeline
//!
//! Flattens node-graph PBR materials into one image per physical channel,
//! wired straight into a fresh shader hub, so that formats which only
//! understand `image → shader input` keep every texture.
//!
//! # Stages
//!
//! 1. **UV resolution** ([`uv`]): every mesh gets a parametrization, projected
//!    automatically when missing.
//! 2. **Channel extraction** ([`extract`], [`native`]): each channel of the
//!    [`CHANNELS`](flatbake_scene::CHANNELS) table is captured into its own
//!    image, either by rerouting the signal through a temporary emitter or by
//!    the engine's native pass. The source graph is restored afterwards.
//! 3. **Synthesis** ([`synthesize`]): a clean material with direct
//!    image → hub links replaces the object's first slot.
//! 4. **Export**: the whole scene is written once.
//!
//! Collaborators (importer, bake engine, unwrapper, image store, exporter) are
//! passed in through [`Collaborators`].
//!
//! # Example
//!
//! ```no_run
//! use std::path::Path;
//! use flatbake_pipeline::{Collaborators, Pipeline, PipelineConfig};
//! # fn parts() -> Collaborators<'static> { unimplemented!() }
//!
//! let mut pipeline = Pipeline::new(PipelineConfig::default(), parts());
//! let report = pipeline.convert(Path::new("model.glb"), Path::new("model.fbx"))?;
//! println!("{} objects converted", report.converted_count());
//! # Ok::<(), flatbake_pipeline::PipelineError>(())
//! ```

pub mod config;
pub mod error;
pub mod extract;
pub mod native;
pub mod orchestrator;
pub mod report;
pub mod synthesize;
pub mod uv;

#[cfg(test)]
mod testing;

pub use config::{BakeFailurePolicy, PipelineConfig};
pub use error::{ExtractError, PipelineError, PipelineResult};
pub use extract::{capture_channel, extract_channel, BakeContext, Extraction, ExtractionOutcome};
pub use native::bake_native;
pub use orchestrator::{Collaborators, Pipeline};
pub use report::{
    ChannelReport, ChannelStatus, ChannelUnavailable, ConversionReport, ObjectOutcome,
    ObjectReport, SkipReason,
};
pub use synthesize::{clean_material_name, synthesize};
pub use uv::{ensure_parametrization, UvResolution};
