//! CLI argument definitions for the flatbake command-line interface.
//!
//! All `#[derive(Parser)]` and `#[derive(Subcommand)]` types are defined here,
//! keeping `main.rs` focused on dispatch logic.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};

use flatbake_pipeline::config::{
    DEFAULT_BAKE_MARGIN, DEFAULT_BAKE_RESOLUTION, DEFAULT_BAKE_SAMPLES,
};
use flatbake_pipeline::{BakeFailurePolicy, PipelineConfig};

/// flatbake - bake node-graph PBR materials into flat per-channel textures
#[derive(Parser)]
#[command(name = "flatbake")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Show debug logs
    #[arg(short, long, global = true, conflicts_with = "quiet")]
    pub verbose: bool,

    /// Only show warnings and errors
    #[arg(short, long, global = true)]
    pub quiet: bool,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Convert a glTF scene into an FBX file with one texture per channel
    Convert(ConvertArgs),

    /// List mesh objects and how their material channels are wired
    Inspect {
        /// Path to the input scene (.gltf or .glb)
        input: PathBuf,

        /// Output machine-readable JSON (no colored output)
        #[arg(long)]
        json: bool,
    },
}

#[derive(Args, Debug)]
pub struct ConvertArgs {
    /// Path to the input scene (.gltf or .glb)
    pub input: PathBuf,

    /// Path of the FBX file to write
    pub output: PathBuf,

    /// Organic surfaces: do not bake the metallic channel
    #[arg(long)]
    pub no_metallic: bool,

    /// Width and height of every baked texture
    #[arg(long, default_value_t = DEFAULT_BAKE_RESOLUTION, value_parser = clap::value_parser!(u32).range(1..))]
    pub resolution: u32,

    /// Padding around UV islands, in pixels
    #[arg(long, default_value_t = DEFAULT_BAKE_MARGIN)]
    pub margin: u32,

    /// Samples per texel
    #[arg(long, default_value_t = DEFAULT_BAKE_SAMPLES, value_parser = clap::value_parser!(u32).range(1..))]
    pub samples: u32,

    /// What to do when a channel bake fails
    #[arg(long, value_enum, default_value_t = FailurePolicyArg::SkipChannel)]
    pub on_bake_failure: FailurePolicyArg,

    /// Output machine-readable JSON (no colored output)
    #[arg(long)]
    pub json: bool,
}

impl ConvertArgs {
    /// Pipeline configuration for these arguments.
    pub fn config(&self) -> PipelineConfig {
        PipelineConfig::default()
            .resolution(self.resolution)
            .margin(self.margin)
            .samples(self.samples)
            .skip_metallic(self.no_metallic)
            .on_bake_failure(self.on_bake_failure.into())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum FailurePolicyArg {
    /// Leave the channel out and keep going
    SkipChannel,
    /// Stop the run without exporting
    Abort,
}

impl From<FailurePolicyArg> for BakeFailurePolicy {
    fn from(arg: FailurePolicyArg) -> Self {
        match arg {
            FailurePolicyArg::SkipChannel => BakeFailurePolicy::SkipChannel,
            FailurePolicyArg::Abort => BakeFailurePolicy::AbortRun,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;
    use pretty_assertions::assert_eq;

    fn convert(args: &[&str]) -> ConvertArgs {
        let cli = Cli::try_parse_from(args).unwrap();
        match cli.command {
            Commands::Convert(args) => args,
            Commands::Inspect { .. } => panic!("expected convert"),
        }
    }

    #[test]
    fn test_cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_convert_defaults() {
        let args = convert(&["flatbake", "convert", "in.glb", "out.fbx"]);
        assert_eq!(args.input, PathBuf::from("in.glb"));
        assert_eq!(args.output, PathBuf::from("out.fbx"));
        assert_eq!(args.config(), PipelineConfig::default());
    }

    #[test]
    fn test_convert_flags() {
        let args = convert(&[
            "flatbake",
            "convert",
            "in.glb",
            "out.fbx",
            "--no-metallic",
            "--resolution",
            "256",
            "--on-bake-failure",
            "abort",
        ]);
        let config = args.config();
        assert!(config.skip_metallic);
        assert_eq!(config.bake_resolution, 256);
        assert_eq!(config.bake_failure, BakeFailurePolicy::AbortRun);
    }

    #[test]
    fn test_zero_resolution_is_rejected() {
        assert!(
            Cli::try_parse_from(["flatbake", "convert", "a.glb", "b.fbx", "--resolution", "0"])
                .is_err()
        );
    }

    #[test]
    fn test_missing_output_is_rejected() {
        assert!(Cli::try_parse_from(["flatbake", "convert", "a.glb"]).is_err());
    }

    #[test]
    fn test_global_verbosity() {
        let cli = Cli::try_parse_from(["flatbake", "inspect", "a.glb", "-v"]).unwrap();
        assert!(cli.verbose);
        assert!(Cli::try_parse_from(["flatbake", "-v", "-q", "inspect", "a.glb"]).is_err());
    }
}
