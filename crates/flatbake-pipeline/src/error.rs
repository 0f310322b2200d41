//! Error types for the conversion pipeline.
//!
//! Only the conditions here end a run. Everything else degrades per object
//! or per channel and is recorded in the [`ConversionReport`](crate::ConversionReport).

use std::path::PathBuf;

use thiserror::Error;

use flatbake_scene::{
    BakeError, Channel, ExportError, FlatbakeError, GraphError, ImportError, StoreError,
};

/// Result type for pipeline operations.
pub type PipelineResult<T> = Result<T, PipelineError>;

/// Fatal pipeline errors.
#[derive(Debug, Error)]
pub enum PipelineError {
    /// The input path does not exist.
    #[error("Input file not found: {path}")]
    ResourceNotFound { path: PathBuf },

    /// The importer failed.
    #[error(transparent)]
    Import(#[from] ImportError),

    /// The imported scene has no mesh objects.
    #[error("No mesh objects found in {path}")]
    NoMeshesFound { path: PathBuf },

    /// A channel bake failed under the abort policy.
    #[error("Baking {channel} of '{object}' failed: {source}")]
    BakeOperationFailed {
        object: String,
        channel: Channel,
        #[source]
        source: ExtractError,
    },

    /// The clean material could not be assembled.
    #[error("Failed to synthesize material for '{object}': {source}")]
    Synthesis {
        object: String,
        #[source]
        source: GraphError,
    },

    /// The exporter failed.
    #[error(transparent)]
    Export(#[from] ExportError),

    /// The exporter returned but left no output behind.
    #[error("Export artifact missing or empty: {path}")]
    ExportArtifactMissing { path: PathBuf },
}

impl FlatbakeError for PipelineError {
    fn code(&self) -> &'static str {
        match self {
            PipelineError::ResourceNotFound { .. } => "PIPELINE_001",
            PipelineError::Import(e) => e.code(),
            PipelineError::NoMeshesFound { .. } => "PIPELINE_002",
            PipelineError::BakeOperationFailed { .. } => "PIPELINE_003",
            PipelineError::Synthesis { .. } => "PIPELINE_004",
            PipelineError::Export(e) => e.code(),
            PipelineError::ExportArtifactMissing { .. } => "PIPELINE_005",
        }
    }

    fn category(&self) -> &'static str {
        match self {
            PipelineError::Import(_) => "import",
            PipelineError::Export(_) => "export",
            _ => "pipeline",
        }
    }
}

/// Failure of a single channel extraction.
///
/// The source graph has already been restored when this is returned.
#[derive(Debug, Error)]
pub enum ExtractError {
    /// The bake engine failed.
    #[error(transparent)]
    Bake(#[from] BakeError),

    /// The baked image could not be persisted.
    #[error(transparent)]
    Store(#[from] StoreError),

    /// The temporary graph rewiring was rejected.
    #[error(transparent)]
    Graph(#[from] GraphError),
}

impl FlatbakeError for ExtractError {
    fn code(&self) -> &'static str {
        match self {
            ExtractError::Bake(e) => e.code(),
            ExtractError::Store(e) => e.code(),
            ExtractError::Graph(e) => e.code(),
        }
    }

    fn category(&self) -> &'static str {
        match self {
            ExtractError::Bake(e) => e.category(),
            ExtractError::Store(e) => e.category(),
            ExtractError::Graph(e) => e.category(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use flatbake_scene::BakeTargetError;

    #[test]
    fn test_codes() {
        let err = PipelineError::NoMeshesFound {
            path: PathBuf::from("a.glb"),
        };
        assert_eq!(err.code(), "PIPELINE_002");
        assert_eq!(err.category(), "pipeline");
        assert!(err.to_string().contains("a.glb"));

        let err = PipelineError::BakeOperationFailed {
            object: "Cube".into(),
            channel: Channel::Metallic,
            source: ExtractError::Bake(BakeError::from(BakeTargetError::NoBakeTarget)),
        };
        assert_eq!(err.code(), "PIPELINE_003");
        assert!(err.to_string().contains("metallic of 'Cube'"));
    }

    #[test]
    fn test_extract_error_forwards_codes() {
        let err = ExtractError::from(BakeError::NoSurfaceShader);
        assert_eq!(err.code(), "BAKE_006");
        assert_eq!(err.category(), "bake");
    }
}
