//! flatbake Raster Backend
//!
//! This crate provides the file-format-independent collaborators of the
//! flatbake pipeline:
//!
//! - **[`RasterEngine`]**: a deterministic bake engine that rasterizes a mesh's
//!   UV layer into the designated target image and evaluates the material
//!   graph at every sample. No lighting is simulated, so emission and native
//!   property passes are exact.
//! - **[`SmartProject`]**: angle-based automatic UV projection for meshes
//!   that arrive without a parametrization.
//! - **[`PngImageStore`]**: persists baked images as PNG files in a
//!   temporary directory that outlives the export.
//!
//! # Determinism
//!
//! - Sub-sample jitter comes from a PCG32 generator seeded from the texel
//!   coordinate, so the same mesh, material and configuration always bake
//!   to identical pixels.
//! - PNG encoding uses fixed compression and filter settings.
//!
//! # Example
//!
//! ```no_run
//! use flatbake_backend_raster::{PngImageStore, RasterEngine, SmartProject};
//! use flatbake_scene::{BakeEngine, RenderConfig};
//!
//! let mut engine = RasterEngine::new();
//! engine.configure(&RenderConfig::default().samples(4));
//! let unwrapper = SmartProject::default();
//! let store = PngImageStore::new().unwrap();
//! println!("textures go to {}", store.dir().display());
//! # let _ = unwrapper;
//! ```

mod eval;
mod margin;

pub mod engine;
pub mod png;
pub mod rng;
pub mod unwrap;

pub use engine::RasterEngine;
pub use png::{encode_png, PngConfig, PngImageStore};
pub use rng::TexelRng;
pub use unwrap::SmartProject;
