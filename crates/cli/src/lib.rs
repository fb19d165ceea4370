//! # Knowledge CLI
//!
//! `knowledge-extractor`: resolves configuration (defaults < TOML file < environment < flags),
//! sets up logging, wires Ctrl-C to cancellation and runs the extraction pipeline.

use anyhow::{Context as AnyhowContext, Result};
use clap::Parser;
use knowledge_indexer::{IndexerError, KnowledgeExtractor};
use std::io;
use tokio_util::sync::CancellationToken;

mod flags;
mod logging;
mod report;

pub use flags::{resolve_config, Cli};

/// Exit status for configuration problems found before any processing
const EXIT_CONFIG: i32 = 2;
/// Exit status after an interrupted run whose partial output was saved
const EXIT_INTERRUPTED: i32 = 130;

fn print_stdout(text: &str) -> Result<()> {
    use std::io::Write;

    let mut stdout = io::stdout().lock();
    if let Err(err) = stdout
        .write_all(text.as_bytes())
        .and_then(|_| stdout.write_all(b"\n"))
        .and_then(|_| stdout.flush())
    {
        if err.kind() == io::ErrorKind::BrokenPipe {
            return Ok(());
        }
        return Err(err.into());
    }
    Ok(())
}

pub async fn main_entry() -> Result<()> {
    let cli = Cli::parse();
    logging::init(cli.quiet, cli.verbose, cli.log_file.as_deref())?;

    let config = match resolve_config(&cli) {
        Ok(config) => config,
        Err(err) => {
            log::error!("{err:#}");
            std::process::exit(EXIT_CONFIG);
        }
    };
    if config.dry_run {
        log::info!("Dry run: the model will not be called");
    }

    let extractor = match KnowledgeExtractor::new(config) {
        Ok(extractor) => extractor,
        Err(IndexerError::Config(err)) => {
            log::error!("{err}");
            std::process::exit(EXIT_CONFIG);
        }
        Err(err) => return Err(err.into()),
    };

    let cancel = CancellationToken::new();
    let signal_cancel = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            log::warn!("Interrupted; finishing with the results resolved so far");
            signal_cancel.cancel();
        }
    });

    let outcome = match extractor.with_cancellation(cancel).run().await {
        Ok(outcome) => outcome,
        Err(IndexerError::Config(err)) => {
            log::error!("{err}");
            std::process::exit(EXIT_CONFIG);
        }
        Err(err) => return Err(err).context("Extraction failed"),
    };

    if cli.json {
        print_stdout(&serde_json::to_string_pretty(&outcome.stats)?)?;
    } else {
        print_stdout(&report::render_summary(&outcome))?;
    }

    if outcome.cancelled {
        std::process::exit(EXIT_INTERRUPTED);
    }
    Ok(())
}
