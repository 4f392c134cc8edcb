//! Configuration for the experiment CLI
//!
//! Values are loaded from `experiment.toml` (every key optional) and then
//! overridden by command-line flags.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use log_extract::{Alignment, BatchReaderConfig, EloPairing, FieldSelection};
use serde::{Deserialize, Serialize};
use tracing::debug;
use winrate_model::TrainConfig;

use crate::cli::{BatchesArgs, CorrelateArgs, TrainArgs};

pub const DEFAULT_CONFIG_PATH: &str = "experiment.toml";

mod defaults {
    pub const STEP: u32 = 1;
    pub const OUT_DIR: &str = "heuristic_elo_data";
    pub const MODEL_PATH: &str = "model.json";
    pub const GAMES: &str = "game_table.txt";
    pub const STATES: &str = "state_table.txt";
}

/// Root configuration structure matching experiment.toml
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExperimentConfig {
    pub batches: BatchesConfig,
    pub correlate: CorrelateConfig,
    pub model: ModelConfig,
    pub train: TrainSection,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BatchesConfig {
    pub step: u32,
    /// Empty means every float in the block
    pub fields: Vec<String>,
    pub max_capture_lines: Option<usize>,
}

impl Default for BatchesConfig {
    fn default() -> Self {
        Self {
            step: defaults::STEP,
            fields: Vec::new(),
            max_capture_lines: None,
        }
    }
}

impl BatchesConfig {
    pub fn apply(&mut self, args: &BatchesArgs) {
        if let Some(step) = args.step {
            self.step = step;
        }
        if !args.fields.is_empty() {
            self.fields = args.fields.clone();
        }
        if args.max_capture_lines.is_some() {
            self.max_capture_lines = args.max_capture_lines;
        }
    }

    pub fn reader_config(&self) -> BatchReaderConfig {
        let config =
            BatchReaderConfig::new(self.step, FieldSelection::from_fields(self.fields.clone()));
        match self.max_capture_lines {
            Some(max) => config.with_max_capture_lines(max),
            None => config,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CorrelateConfig {
    pub alignment: Alignment,
    /// Only used by the back-fill alignment
    pub pairing: EloPairing,
    pub out_dir: PathBuf,
}

impl Default for CorrelateConfig {
    fn default() -> Self {
        Self {
            alignment: Alignment::default(),
            pairing: EloPairing::default(),
            out_dir: PathBuf::from(defaults::OUT_DIR),
        }
    }
}

impl CorrelateConfig {
    pub fn apply(&mut self, args: &CorrelateArgs) {
        if let Some(alignment) = args.alignment {
            self.alignment = alignment;
        }
        if let Some(pairing) = args.pairing {
            self.pairing = pairing;
        }
        if let Some(dir) = &args.out_dir {
            self.out_dir = dir.clone();
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ModelConfig {
    /// Artifact read by `predict` and written by `train`
    pub path: PathBuf,
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            path: PathBuf::from(defaults::MODEL_PATH),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TrainSection {
    pub games: PathBuf,
    pub states: PathBuf,
    #[serde(flatten)]
    pub params: TrainConfig,
}

impl Default for TrainSection {
    fn default() -> Self {
        Self {
            games: PathBuf::from(defaults::GAMES),
            states: PathBuf::from(defaults::STATES),
            params: TrainConfig::default(),
        }
    }
}

impl TrainSection {
    pub fn apply(&mut self, args: &TrainArgs) {
        if let Some(games) = &args.games {
            self.games = games.clone();
        }
        if let Some(states) = &args.states {
            self.states = states.clone();
        }
        if let Some(hidden) = args.hidden {
            self.params.hidden_units = hidden;
        }
        if let Some(epochs) = args.epochs {
            self.params.epochs = epochs;
        }
        if let Some(lr) = args.learning_rate {
            self.params.learning_rate = lr;
        }
        if let Some(batch_size) = args.batch_size {
            self.params.batch_size = batch_size;
        }
        if let Some(fraction) = args.test_fraction {
            self.params.test_fraction = fraction;
        }
        if let Some(seed) = args.seed {
            self.params.seed = seed;
        }
    }
}

impl ExperimentConfig {
    pub fn from_toml(text: &str) -> Result<Self> {
        let config: Self = toml::from_str(text).context("invalid configuration")?;
        config.validate()?;
        Ok(config)
    }

    /// Load the configuration file.
    ///
    /// An explicitly named file must exist. When `path` is `None` the
    /// default `experiment.toml` is read if present, defaults otherwise.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let (path, explicit) = match path {
            Some(path) => (path, true),
            None => (Path::new(DEFAULT_CONFIG_PATH), false),
        };

        if !explicit && !path.exists() {
            debug!(path = %path.display(), "no config file, using defaults");
            return Ok(Self::default());
        }

        let text = fs::read_to_string(path)
            .with_context(|| format!("failed to read config {}", path.display()))?;
        Self::from_toml(&text).with_context(|| format!("in config {}", path.display()))
    }

    pub fn validate(&self) -> Result<()> {
        if self.batches.step == 0 {
            bail!("batches.step must be positive");
        }
        if self.batches.max_capture_lines == Some(0) {
            bail!("batches.max_capture_lines must be positive");
        }
        self.train
            .params
            .validate()
            .context("invalid [train] section")?;
        Ok(())
    }
}

#[cfg(test)]
#[path = "config_tests.rs"]
mod config_tests;
