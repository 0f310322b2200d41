//! flatbake Interchange
//!
//! File-format collaborators for the flatbake pipeline:
//!
//! - **[`GltfImporter`]** reads `.gltf` / `.glb` scenes and rebuilds each
//!   material as a shading graph, including packed-channel wiring.
//! - **[`FbxExporter`]** writes binary FBX 7.4 with textures embedded. The
//!   FBX material model only recognizes image textures linked directly into
//!   shader inputs, which is why materials are flattened before export.
//!
//! # Example
//!
//! ```no_run
//! use std::path::Path;
//! use flatbake_interchange::{FbxExporter, GltfImporter};
//! use flatbake_scene::{ExportOptions, SceneExporter, SceneImporter};
//!
//! let scene = GltfImporter::new().import(Path::new("model.glb"))?;
//! FbxExporter::new().export(&scene, Path::new("model.fbx"), &ExportOptions::default())?;
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

pub mod fbx;
pub mod importer;

pub use fbx::FbxExporter;
pub use importer::GltfImporter;
