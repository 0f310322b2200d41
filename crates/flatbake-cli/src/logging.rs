//! Tracing subscriber setup.
//!
//! Logs go to stderr so stdout stays clean for results and `--json` output.

use tracing_subscriber::EnvFilter;

/// Environment variable holding a filter directive, e.g. `flatbake_pipeline=debug`.
pub const LOG_ENV: &str = "FLATBAKE_LOG";

/// Directive used when no filter comes from the environment.
pub fn default_directive(verbose: bool, quiet: bool) -> &'static str {
    if verbose {
        "debug"
    } else if quiet {
        "warn"
    } else {
        "info"
    }
}

/// Installs the global fmt subscriber.
///
/// `-v` and `-q` take precedence over `FLATBAKE_LOG`. Calling this twice is
/// harmless; the second call leaves the first subscriber in place.
pub fn init(verbose: bool, quiet: bool) {
    let filter = if verbose || quiet {
        EnvFilter::new(default_directive(verbose, quiet))
    } else {
        EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new(default_directive(false, false)))
    };

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}
