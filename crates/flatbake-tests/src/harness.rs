//! Test harness for running conversions against files on disk.

use std::fs;
use std::path::{Path, PathBuf};

use tempfile::TempDir;

use flatbake_pipeline::{ConversionReport, PipelineConfig};

use crate::fixtures::SceneFixture;
use crate::format_validators::{self, FbxInfo};

// Re-export FormatError for convenience
pub use crate::format_validators::FormatError;

/// Result of one conversion run.
#[derive(Debug)]
pub struct ConvertResult {
    pub output: PathBuf,
    pub report: ConversionReport,
}

impl ConvertResult {
    /// Reads the exported file.
    pub fn bytes(&self) -> Vec<u8> {
        fs::read(&self.output).expect("Failed to read converted output")
    }

    /// Parses the exported file as FBX.
    pub fn fbx(&self) -> Result<FbxInfo, FormatError> {
        format_validators::validate_fbx(&self.bytes())
    }
}

/// A scratch directory holding fixture scenes and converted outputs.
pub struct TestHarness {
    /// Working directory for test inputs and outputs.
    pub work_dir: TempDir,
}

impl TestHarness {
    /// Create a new test harness.
    pub fn new() -> Self {
        Self {
            work_dir: TempDir::new().expect("Failed to create work dir"),
        }
    }

    /// Get the working directory path.
    pub fn path(&self) -> &Path {
        self.work_dir.path()
    }

    /// Writes a fixture scene into the work dir.
    pub fn scene(&self, fixture: &SceneFixture, name: &str) -> PathBuf {
        fixture.write(self.path(), name)
    }

    /// Converts `input` into `output` (relative to the work dir).
    ///
    /// Runs the same collaborators as the `convert` command, as a library
    /// call rather than a subprocess.
    pub fn convert(
        &self,
        input: &Path,
        output: &str,
        config: PipelineConfig,
    ) -> anyhow::Result<ConvertResult> {
        let output = self.path().join(output);
        let report = flatbake_cli::commands::convert::execute(input, &output, config)?;
        Ok(ConvertResult { output, report })
    }
}

impl Default for TestHarness {
    fn default() -> Self {
        Self::new()
    }
}
