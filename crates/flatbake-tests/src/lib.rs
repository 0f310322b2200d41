//! flatbake End-to-End Test Infrastructure
//!
//! This crate provides integration tests for the conversion flow:
//!
//! - Conversion: glTF fixture -> flattened FBX with embedded textures
//! - Validation: the exported FBX parses and its textures are valid PNGs
//! - **Determinism**: repeated conversions embed identical textures
//! - Restoration: source materials come out of a conversion unchanged
//!
//! ## Running Tests
//!
//! ```bash
//! cargo test -p flatbake-tests
//! ```
//!
//! ## Fixtures
//!
//! ```rust,ignore
//! use flatbake_tests::fixtures::{packed_metal_cube, SceneFixture};
//! use flatbake_tests::harness::TestHarness;
//!
//! let harness = TestHarness::new();
//! let input = harness.scene(&packed_metal_cube(), "helmet.gltf");
//! let result = harness.convert(&input, "helmet.fbx", Default::default())?;
//! assert_eq!(result.fbx()?.textures.len(), 3);
//! ```

pub mod fixtures;
pub mod format_validators;
pub mod harness;

// Re-export commonly used items
pub use fixtures::{MaterialFixture, ObjectFixture, SceneFixture, Shape};
pub use format_validators::{png_rgb_pixels, validate_fbx, validate_png, FbxInfo, FbxTexture, FormatError};
pub use harness::{ConvertResult, TestHarness};
