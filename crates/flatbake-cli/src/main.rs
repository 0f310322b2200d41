//! flatbake - flattens node-graph PBR materials into per-channel textures
//!
//! This binary provides the `convert` and `inspect` commands.

use std::process::ExitCode;

use clap::Parser;

use flatbake_cli::cli_args::{Cli, Commands};
use flatbake_cli::{commands, logging};

fn main() -> ExitCode {
    let cli = Cli::parse();
    logging::init(cli.verbose, cli.quiet);

    let result = match &cli.command {
        Commands::Convert(args) => commands::convert::run(args),
        Commands::Inspect { input, json } => commands::inspect::run(input, *json),
    };

    match result {
        Ok(code) => code,
        Err(e) => {
            eprintln!("{}: {:#}", colored::Colorize::red("error"), e);
            ExitCode::from(1)
        }
    }
}
