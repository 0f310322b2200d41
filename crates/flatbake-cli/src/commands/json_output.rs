//! JSON output types for the `--json` flag.

use serde::{Deserialize, Serialize};

use flatbake_pipeline::{ConversionReport, PipelineError};
use flatbake_scene::{FlatbakeError, StoreError};

use super::inspect::SceneSummary;

/// Error codes for CLI-level failures. Pipeline and collaborator errors keep
/// their own codes.
pub mod error_codes {
    /// Failure without a more specific code
    pub const UNCLASSIFIED: &str = "CLI_001";
    /// JSON serialization error
    pub const JSON_SERIALIZE: &str = "CLI_002";
}

/// A structured error.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct JsonError {
    /// Stable error code (e.g. "PIPELINE_002", "IMPORT_001")
    pub code: String,
    /// Human-readable error message
    pub message: String,
}

impl JsonError {
    /// Builds an error from an `anyhow` chain, recovering the typed code when possible.
    pub fn from_anyhow(err: &anyhow::Error) -> Self {
        let code = if let Some(e) = err.downcast_ref::<PipelineError>() {
            e.code()
        } else if let Some(e) = err.downcast_ref::<StoreError>() {
            e.code()
        } else if err.downcast_ref::<serde_json::Error>().is_some() {
            error_codes::JSON_SERIALIZE
        } else {
            error_codes::UNCLASSIFIED
        };
        Self {
            code: code.to_string(),
            message: format!("{:#}", err),
        }
    }
}

/// Output of `convert --json`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ConvertOutput {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub report: Option<ConversionReport>,
    /// BLAKE3 hash of the exported file
    #[serde(skip_serializing_if = "Option::is_none")]
    pub output_hash: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<JsonError>,
}

impl ConvertOutput {
    pub fn success(report: ConversionReport, output_hash: String) -> Self {
        Self {
            success: true,
            report: Some(report),
            output_hash: Some(output_hash),
            error: None,
        }
    }

    pub fn failure(error: JsonError) -> Self {
        Self {
            success: false,
            report: None,
            output_hash: None,
            error: Some(error),
        }
    }
}

/// Output of `inspect --json`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct InspectOutput {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub scene: Option<SceneSummary>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<JsonError>,
}
