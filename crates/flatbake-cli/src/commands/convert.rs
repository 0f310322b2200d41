//! Convert command implementation
//!
//! Wires the concrete collaborators (glTF importer, raster bake engine,
//! smart-projection unwrapper, PNG store, FBX exporter) into the pipeline and
//! reports the result.

use std::fs;
use std::path::Path;
use std::process::ExitCode;

use anyhow::{Context, Result};
use colored::Colorize;

use flatbake_backend_raster::{PngImageStore, RasterEngine, SmartProject};
use flatbake_interchange::{FbxExporter, GltfImporter};
use flatbake_pipeline::{
    ChannelStatus, Collaborators, ConversionReport, ObjectOutcome, Pipeline, PipelineConfig,
};

use super::json_output::{ConvertOutput, JsonError};
use crate::cli_args::ConvertArgs;

/// Run the convert command
///
/// # Returns
/// Exit code: 0 success, 1 error
pub fn run(args: &ConvertArgs) -> Result<ExitCode> {
    let config = args.config();
    if args.json {
        run_json(&args.input, &args.output, config)
    } else {
        run_human(&args.input, &args.output, config)
    }
}

/// Runs one conversion with the default collaborators.
pub fn execute(input: &Path, output: &Path, config: PipelineConfig) -> Result<ConversionReport> {
    let importer = GltfImporter::new();
    let mut engine = RasterEngine::new();
    let unwrapper = SmartProject::default();
    // Baked PNGs live here until the exporter has embedded them.
    let mut store = PngImageStore::new()?;
    let exporter = FbxExporter::new();

    let mut pipeline = Pipeline::new(
        config,
        Collaborators {
            importer: &importer,
            engine: &mut engine,
            unwrapper: &unwrapper,
            store: &mut store,
            exporter: &exporter,
        },
    );
    let report = pipeline.convert(input, output)?;
    Ok(report)
}

fn output_hash(output: &Path) -> Result<String> {
    let data = fs::read(output).with_context(|| format!("Failed to read {}", output.display()))?;
    Ok(blake3::hash(&data).to_hex().to_string())
}

fn run_human(input: &Path, output: &Path, config: PipelineConfig) -> Result<ExitCode> {
    println!(
        "{} {} -> {}",
        "Converting:".cyan().bold(),
        input.display(),
        output.display()
    );
    if config.skip_metallic {
        println!("{}", "Organic mode: metallic channel disabled".dimmed());
    }

    let report = execute(input, output, config)?;
    print_report(&report);

    let hash = output_hash(output)?;
    println!("{} {}", "Hash:".dimmed(), &hash[..16]);
    println!(
        "{} {} bytes",
        "SUCCESS:".green().bold(),
        report.output_bytes
    );
    Ok(ExitCode::SUCCESS)
}

fn print_report(report: &ConversionReport) {
    for object in &report.objects {
        match &object.outcome {
            ObjectOutcome::Converted { material, channels } => {
                let uv = if object.uv_synthesized {
                    " (UV map created)".dimmed().to_string()
                } else {
                    String::new()
                };
                println!("  {} {} -> {}{}", "+".green(), object.name, material, uv);
                for channel in channels {
                    let status = match &channel.status {
                        ChannelStatus::Baked => "baked".green(),
                        ChannelStatus::Defaulted(reason) => {
                            format!("default ({})", reason).yellow()
                        }
                        ChannelStatus::Failed { message } => format!("failed: {}", message).red(),
                    };
                    println!("      {:<12} {}", channel.channel.to_string(), status);
                }
            }
            ObjectOutcome::Skipped(reason) => {
                println!("  {} {} skipped: {}", "-".yellow(), object.name, reason);
            }
        }
    }
    println!(
        "{} {} converted, {} skipped",
        "Objects:".dimmed(),
        report.converted_count(),
        report.skipped_count()
    );
}

fn run_json(input: &Path, output: &Path, config: PipelineConfig) -> Result<ExitCode> {
    let result = execute(input, output, config)
        .and_then(|report| Ok(ConvertOutput::success(report, output_hash(output)?)));
    let (out, code) = match result {
        Ok(out) => (out, ExitCode::SUCCESS),
        Err(e) => (ConvertOutput::failure(JsonError::from_anyhow(&e)), ExitCode::from(1)),
    };
    println!("{}", serde_json::to_string_pretty(&out)?);
    Ok(code)
}

#[cfg(test)]
mod tests {
    use super::*;
    use flatbake_pipeline::PipelineError;

    #[test]
    fn test_missing_input_is_reported_with_code() {
        let dir = tempfile::tempdir().unwrap();
        let err = execute(
            &dir.path().join("missing.glb"),
            &dir.path().join("out.fbx"),
            PipelineConfig::default(),
        )
        .unwrap_err();

        assert!(matches!(
            err.downcast_ref::<PipelineError>(),
            Some(PipelineError::ResourceNotFound { .. })
        ));
        assert_eq!(JsonError::from_anyhow(&err).code, "PIPELINE_001");
        assert!(!dir.path().join("out.fbx").exists());
    }

    #[test]
    fn test_unreadable_scene_is_an_import_error() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("broken.glb");
        std::fs::write(&input, b"not a gltf file").unwrap();

        let err = execute(&input, &dir.path().join("out.fbx"), PipelineConfig::default())
            .unwrap_err();

        assert!(matches!(
            err.downcast_ref::<PipelineError>(),
            Some(PipelineError::Import(_))
        ));
        assert!(JsonError::from_anyhow(&err).code.starts_with("IMPORT_"));
    }
}
