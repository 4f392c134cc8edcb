//! Subcommand implementations
//!
//! Each command takes its resolved configuration and writes user-facing
//! output to `out`; progress goes through `tracing`.

use std::fs::File;
use std::io::{BufReader, BufWriter, Write};
use std::path::Path;

use anyhow::{Context, Result};
use log_extract::{
    format_weights_string, read_batches, run_correlator, write_batches, write_tables, Alignment,
    BackfillCorrelator, BatchScan, CorrelationReport, TopRankCorrelator, WeightsTable,
};
use tracing::{info, warn};
use winrate_model::{train_from_files, TrainReport, WinRatePredictor};

use crate::config::{BatchesConfig, CorrelateConfig, TrainSection};

fn open_log(path: &Path) -> Result<BufReader<File>> {
    let file = File::open(path).with_context(|| format!("failed to open log {}", path.display()))?;
    Ok(BufReader::new(file))
}

pub fn batches<W: Write>(
    config: &BatchesConfig,
    log: &Path,
    dest: Option<&Path>,
    out: &mut W,
) -> Result<BatchScan> {
    let scan = read_batches(open_log(log)?, &config.reader_config())
        .with_context(|| format!("failed to scan {}", log.display()))?;

    if let Some(batch) = scan.unterminated {
        warn!(batch, "log ended inside a batch block; block not emitted");
    }
    if !scan.abandoned.is_empty() {
        warn!(batches = ?scan.abandoned, "abandoned unclosed batch blocks");
    }

    match dest {
        Some(path) => {
            let file = File::create(path)
                .with_context(|| format!("failed to create {}", path.display()))?;
            write_batches(&scan.records, BufWriter::new(file))?;
            info!(records = scan.records.len(), path = %path.display(), "wrote batch metrics");
        }
        None => write_batches(&scan.records, &mut *out)?,
    }
    Ok(scan)
}

pub fn correlate<W: Write>(
    config: &CorrelateConfig,
    log: &Path,
    report_path: Option<&Path>,
    out: &mut W,
) -> Result<CorrelationReport> {
    let reader = open_log(log)?;
    let table: WeightsTable = match config.alignment {
        Alignment::TemporalBackfill => {
            run_correlator(reader, BackfillCorrelator::with_pairing(config.pairing))
        }
        Alignment::TopRanked => run_correlator(reader, TopRankCorrelator::new()),
    }
    .with_context(|| format!("failed to align {}", log.display()))?;

    let written = write_tables(&table, &config.out_dir)
        .with_context(|| format!("failed to write tables to {}", config.out_dir.display()))?;
    info!(
        heuristics = written.len(),
        samples = table.sample_count(),
        unresolved = table.unresolved_count(),
        dir = %config.out_dir.display(),
        "wrote heuristic tables"
    );

    let report = CorrelationReport::from_table(config.alignment, &table);
    if let Some(path) = report_path {
        report
            .save(path)
            .with_context(|| format!("failed to save report {}", path.display()))?;
    }
    write!(out, "{}", report.generate_report())?;
    Ok(report)
}

pub fn format_weights<W: Write>(weights: &str, out: &mut W) -> Result<()> {
    writeln!(out, "{}", format_weights_string(weights))?;
    Ok(())
}

pub fn predict<W: Write>(model: &Path, state: &str, out: &mut W) -> Result<f32> {
    let predictor = WinRatePredictor::load(model)
        .with_context(|| format!("failed to load model {}", model.display()))?;
    let ratio = predictor
        .predict(state)
        .with_context(|| format!("cannot evaluate `{}`", state))?;
    writeln!(out, "{}", ratio)?;
    Ok(ratio)
}

pub fn train<W: Write>(
    section: &TrainSection,
    model_out: &Path,
    out: &mut W,
) -> Result<TrainReport> {
    let report = train_from_files(&section.params, &section.games, &section.states)
        .context("training failed")?;
    report
        .model
        .save(model_out)
        .with_context(|| format!("failed to save model {}", model_out.display()))?;
    info!(path = %model_out.display(), "saved model");

    writeln!(
        out,
        "states: {}  train: {}  test: {}",
        report.states, report.train_size, report.test_size
    )?;
    writeln!(out, "train mse: {:.6}", report.train_mse)?;
    match report.test_mse {
        Some(mse) => writeln!(out, "test mse:  {:.6}", mse)?,
        None => writeln!(out, "test mse:  n/a (no held-out states)")?,
    }
    Ok(report)
}

#[cfg(test)]
#[path = "commands_tests.rs"]
mod commands_tests;
