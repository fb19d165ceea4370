use anyhow::{Context as AnyhowContext, Result};
use std::fs::OpenOptions;
use std::path::Path;

/// Level forced by `--quiet` / `--verbose`; otherwise `RUST_LOG` or `info` applies
pub(crate) const fn level_override(quiet: bool, verbose: bool) -> Option<log::LevelFilter> {
    if quiet {
        Some(log::LevelFilter::Warn)
    } else if verbose {
        Some(log::LevelFilter::Debug)
    } else {
        None
    }
}

/// Initialise `env_logger` once: stderr, or the given log file
pub(crate) fn init(quiet: bool, verbose: bool, log_file: Option<&Path>) -> Result<()> {
    let mut builder =
        env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"));
    if let Some(level) = level_override(quiet, verbose) {
        builder.filter_level(level);
    }
    // HTTP client internals are only useful when debugging the transport
    if !verbose {
        builder.filter_module("reqwest", log::LevelFilter::Warn);
        builder.filter_module("hyper", log::LevelFilter::Warn);
    }

    match log_file {
        Some(path) => {
            let file = OpenOptions::new()
                .create(true)
                .append(true)
                .open(path)
                .with_context(|| format!("Cannot open log file {}", path.display()))?;
            builder.target(env_logger::Target::Pipe(Box::new(file)));
        }
        None => {
            builder.target(env_logger::Target::Stderr);
        }
    }
    builder.init();
    Ok(())
}
