//! flatbake CLI library.
//!
//! Argument definitions, logging setup and the `convert` / `inspect`
//! commands behind the `flatbake` binary.

pub mod cli_args;
pub mod commands;
pub mod logging;
