//! Experiment CLI
//!
//! Offline analysis for agent tournaments:
//! 1. `batches`: per-batch metric rows from a tournament log
//! 2. `correlate`: heuristic weight / Elo tables plus a correlation report
//! 3. `format-weights`: floats of a pasted weights string
//! 4. `train` / `predict`: the board-state win-rate model

use std::io;

use anyhow::Result;
use clap::Parser;
use tracing::info;

mod cli;
mod commands;
mod config;

use crate::cli::{Cli, Command};
use crate::config::ExperimentConfig;

fn init_tracing(level: &str) -> Result<()> {
    use tracing_subscriber::{fmt, prelude::*, EnvFilter};

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(io::stderr))
        .with(filter)
        .init();

    Ok(())
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(&cli.log_level)?;

    let mut config = ExperimentConfig::load(cli.config.as_deref())?;
    let stdout = io::stdout();
    let mut out = stdout.lock();

    match cli.command {
        Command::Batches(args) => {
            config.batches.apply(&args);
            config.validate()?;
            let scan =
                commands::batches(&config.batches, &args.log, args.out.as_deref(), &mut out)?;
            info!(records = scan.records.len(), "batch scan complete");
        }
        Command::Correlate(args) => {
            config.correlate.apply(&args);
            info!(
                alignment = %config.correlate.alignment,
                log = %args.log.display(),
                "correlating"
            );
            commands::correlate(&config.correlate, &args.log, args.report.as_deref(), &mut out)?;
        }
        Command::FormatWeights { weights } => {
            commands::format_weights(&weights, &mut out)?;
        }
        Command::Predict(args) => {
            let model = args.model.unwrap_or(config.model.path);
            commands::predict(&model, &args.state, &mut out)?;
        }
        Command::Train(args) => {
            config.train.apply(&args);
            config.validate()?;
            let model_out = args.out.unwrap_or(config.model.path.clone());
            commands::train(&config.train, &model_out, &mut out)?;
        }
    }

    Ok(())
}
