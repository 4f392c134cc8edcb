//! Command-line interface

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};
use log_extract::{Alignment, EloPairing};

#[derive(Parser, Debug)]
#[command(name = "experiment")]
#[command(about = "Tournament log extraction and win-rate model tooling")]
#[command(
    long_about = "Extracts per-batch metrics and heuristic/Elo tables from agent
tournament logs, and trains or queries the board-state win-rate model.

Defaults are read from experiment.toml when present. CLI flags take
highest priority."
)]
pub struct Cli {
    /// Configuration file (default: experiment.toml, if it exists)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Log filter (trace, debug, info, warn, error); RUST_LOG takes precedence
    #[arg(long, global = true, default_value = "info")]
    pub log_level: String,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Extract per-batch metric rows from a tournament log
    Batches(BatchesArgs),
    /// Pair heuristic weights with Elo ratings and write one table per heuristic
    Correlate(CorrelateArgs),
    /// Print the floats of a pasted `Weights { ... }` string space-separated
    FormatWeights {
        /// The weights string, quoted
        weights: String,
    },
    /// Predict the black win ratio of a board state
    Predict(PredictArgs),
    /// Train the win-rate regressor from game and state tables
    Train(TrainArgs),
}

#[derive(Args, Debug, Default)]
pub struct BatchesArgs {
    /// Tournament log to scan
    #[arg(long)]
    pub log: PathBuf,

    /// Batch numbering step
    #[arg(long)]
    pub step: Option<u32>,

    /// Heuristic name to extract (repeatable; none means every float)
    #[arg(long = "field")]
    pub fields: Vec<String>,

    /// Abandon a block that has not closed after this many lines
    #[arg(long)]
    pub max_capture_lines: Option<usize>,

    /// Write rows here instead of stdout
    #[arg(long)]
    pub out: Option<PathBuf>,
}

#[derive(Args, Debug, Default)]
pub struct CorrelateArgs {
    /// Tournament log to scan
    #[arg(long)]
    pub log: PathBuf,

    /// backfill or top-ranked
    #[arg(long)]
    pub alignment: Option<Alignment>,

    /// Back-fill Elo order: reversed or chronological
    #[arg(long)]
    pub pairing: Option<EloPairing>,

    /// Directory for the per-heuristic tables
    #[arg(long)]
    pub out_dir: Option<PathBuf>,

    /// Also save the correlation report as JSON
    #[arg(long)]
    pub report: Option<PathBuf>,
}

#[derive(Args, Debug, Default)]
pub struct PredictArgs {
    /// Model artifact (.json, or .onnx with the `onnx` feature)
    #[arg(long)]
    pub model: Option<PathBuf>,

    /// Board-state notation, e.g. b:b/bb/bbb/bbbb/3/4/3/4/3/wwww/www/ww/w
    pub state: String,
}

#[derive(Args, Debug, Default)]
pub struct TrainArgs {
    /// Game table CSV (game_id,result)
    #[arg(long)]
    pub games: Option<PathBuf>,

    /// State table CSV (state_id,state,game_id,...)
    #[arg(long)]
    pub states: Option<PathBuf>,

    /// Where to write the trained model
    #[arg(long)]
    pub out: Option<PathBuf>,

    /// Hidden layer width
    #[arg(long)]
    pub hidden: Option<usize>,

    #[arg(long)]
    pub epochs: Option<usize>,

    /// Adam step size
    #[arg(long)]
    pub learning_rate: Option<f64>,

    /// Mini-batch size
    #[arg(long)]
    pub batch_size: Option<usize>,

    /// Share of states held out for evaluation
    #[arg(long)]
    pub test_fraction: Option<f64>,

    #[arg(long)]
    pub seed: Option<u64>,
}
