//! Collaborator traits the pipeline drives.
//!
//! The pipeline never talks to a file format, renderer or file system
//! directly. Concrete implementations live in the backend and interchange
//! crates; tests substitute fakes.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{BakeError, ExportError, ImportError, StoreError, UnwrapError};
use crate::graph::MaterialGraph;
use crate::image::{Image, ImageId, ImageRegistry};
use crate::mesh::{MeshObject, Scene};
use crate::render::{BakeMode, RenderConfig};

/// Reads a scene file.
pub trait SceneImporter {
    /// Imports every mesh object, material and image of the file.
    fn import(&self, path: &Path) -> Result<Scene, ImportError>;
}

/// One bake invocation.
pub struct BakeRequest<'a> {
    /// What to capture.
    pub mode: BakeMode,
    /// Mesh whose UV layer is baked over.
    pub mesh: &'a MeshObject,
    /// Material graph holding the designated bake target.
    pub material: &'a MaterialGraph,
    /// Image registry; the engine writes into the target image.
    pub images: &'a mut ImageRegistry,
}

/// Summary of a finished bake.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BakeStats {
    /// Image that received the capture.
    pub target: ImageId,
    /// Texels covered by at least one UV triangle.
    pub covered_texels: u64,
}

/// Render/bake engine.
///
/// Not reentrant: the active bake target is a single value per graph and
/// callers must serialize invocations.
pub trait BakeEngine {
    /// Applies the scene-wide render configuration.
    fn configure(&mut self, config: &RenderConfig);

    /// Captures into the graph's designated bake target. Blocks until done.
    fn bake(&mut self, request: BakeRequest<'_>) -> Result<BakeStats, BakeError>;
}

/// Automatic UV parametrization.
pub trait Unwrapper {
    /// Writes a new UV layer onto the mesh.
    fn unwrap(&self, mesh: &mut MeshObject) -> Result<(), UnwrapError>;
}

/// Temporary storage for baked images.
pub trait ImageStore {
    /// Writes the image's pixels to the store and records the file path on it.
    fn persist(&mut self, image: &mut Image) -> Result<PathBuf, StoreError>;
}

/// How the exporter applies `global_scale`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScaleMode {
    /// Scale the geometry and write a unit scale factor of one.
    FbxAll,
    /// Leave the geometry and write the scale into the unit scale factor.
    FbxUnits,
}

/// Options passed to the exporter.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExportOptions {
    /// Embed texture file contents into the output.
    pub embed_textures: bool,
    /// Apply mesh modifiers before writing geometry.
    pub apply_mesh_modifiers: bool,
    /// How `global_scale` is applied.
    pub scale_mode: ScaleMode,
    /// Uniform scale.
    pub global_scale: f64,
}

impl Default for ExportOptions {
    fn default() -> Self {
        Self {
            embed_textures: true,
            apply_mesh_modifiers: true,
            scale_mode: ScaleMode::FbxAll,
            global_scale: 1.0,
        }
    }
}

/// Writes a scene file.
pub trait SceneExporter {
    /// Writes the whole scene to `path`.
    fn export(&self, scene: &Scene, path: &Path, options: &ExportOptions) -> Result<(), ExportError>;
}
