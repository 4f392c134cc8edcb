//! Win-rate trainer
//!
//! Joins the game and state tables, labels every distinct board state with
//! the fraction of its games won by black, and fits an [`MlpRegressor`] on
//! the decoded states.

use std::collections::{BTreeMap, HashMap};
use std::fs::File;
use std::path::Path;

use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::error::{ModelError, Result};
use crate::features::decode_board;
use crate::regressor::{FitConfig, MlpRegressor};

/// One row of the game table. `result` is 1 for a white win, 0 for black.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct GameRecord {
    pub game_id: String,
    pub result: f64,
}

/// One row of the state table; other columns are ignored.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct StateRecord {
    pub state_id: String,
    pub state: String,
    pub game_id: String,
}

fn read_table<T: serde::de::DeserializeOwned>(path: &Path) -> Result<Vec<T>> {
    let file = File::open(path).map_err(|e| ModelError::unavailable(path, e))?;
    let mut rdr = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .from_reader(file);
    let mut rows = Vec::new();
    for row in rdr.deserialize() {
        rows.push(row?);
    }
    Ok(rows)
}

pub fn load_games(path: &Path) -> Result<Vec<GameRecord>> {
    read_table(path)
}

pub fn load_states(path: &Path) -> Result<Vec<StateRecord>> {
    read_table(path)
}

/// Aggregated outcome of one distinct board state
#[derive(Debug, Clone, PartialEq)]
pub struct StateOutcome {
    pub state: String,
    /// Sum of game results (white wins)
    pub wins: f64,
    /// Number of joined (state, game) rows
    pub games: usize,
    pub black_win_ratio: f64,
}

/// Inner-join states with games on `game_id` and group by state.
///
/// Output is sorted by state. States whose game is missing from the game
/// table are dropped.
pub fn aggregate(games: &[GameRecord], states: &[StateRecord]) -> Vec<StateOutcome> {
    let mut results: HashMap<&str, Vec<f64>> = HashMap::new();
    for game in games {
        let entry = results.entry(game.game_id.as_str()).or_default();
        if !entry.is_empty() {
            warn!(game_id = %game.game_id, "duplicate game id in game table");
        }
        entry.push(game.result);
    }

    let mut grouped: BTreeMap<&str, (f64, usize)> = BTreeMap::new();
    let mut unmatched = 0usize;
    for state in states {
        match results.get(state.game_id.as_str()) {
            Some(game_results) => {
                let acc = grouped.entry(state.state.as_str()).or_insert((0.0, 0));
                for result in game_results {
                    acc.0 += result;
                    acc.1 += 1;
                }
            }
            None => unmatched += 1,
        }
    }
    if unmatched > 0 {
        warn!(unmatched, "state rows reference unknown games");
    }

    grouped
        .into_iter()
        .map(|(state, (wins, games))| StateOutcome {
            state: state.to_string(),
            wins,
            games,
            black_win_ratio: 1.0 - wins / games as f64,
        })
        .collect()
}

/// Decoded features and labels, row-aligned
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TrainingSet {
    pub features: Vec<Vec<f32>>,
    pub labels: Vec<f32>,
}

impl TrainingSet {
    pub fn len(&self) -> usize {
        self.labels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }

    /// Width of every feature vector, if any rows exist.
    pub fn width(&self) -> Option<usize> {
        self.features.first().map(Vec::len)
    }

    fn subset(&self, indices: &[usize]) -> TrainingSet {
        TrainingSet {
            features: indices.iter().map(|&i| self.features[i].clone()).collect(),
            labels: indices.iter().map(|&i| self.labels[i]).collect(),
        }
    }
}

/// Decode every aggregated state. Undecodable states are skipped.
pub fn build_dataset(outcomes: &[StateOutcome]) -> Result<TrainingSet> {
    let mut set = TrainingSet::default();
    for outcome in outcomes {
        let features = match decode_board(&outcome.state) {
            Ok(features) => features,
            Err(e) => {
                warn!(error = %e, "skipping undecodable state");
                continue;
            }
        };
        if let Some(expected) = set.width() {
            if features.len() != expected {
                return Err(ModelError::StructuralMismatch {
                    expected,
                    actual: features.len(),
                });
            }
        }
        set.features.push(features);
        set.labels.push(outcome.black_win_ratio as f32);
    }
    if set.is_empty() {
        return Err(ModelError::EmptyDataset);
    }
    Ok(set)
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TrainConfig {
    pub hidden_units: usize,
    pub epochs: usize,
    /// Adam step size
    pub learning_rate: f64,
    /// Mini-batch size, capped at the training set size
    pub batch_size: usize,
    /// Share of states held out for evaluation
    pub test_fraction: f64,
    pub seed: u64,
}

impl Default for TrainConfig {
    fn default() -> Self {
        Self {
            hidden_units: 100,
            epochs: 200,
            learning_rate: 0.001,
            batch_size: 200,
            test_fraction: 0.25,
            seed: 42,
        }
    }
}

impl TrainConfig {
    pub fn validate(&self) -> Result<()> {
        if self.hidden_units == 0 {
            return Err(ModelError::InvalidConfig("hidden_units must be positive".into()));
        }
        if self.epochs == 0 {
            return Err(ModelError::InvalidConfig("epochs must be positive".into()));
        }
        if self.batch_size == 0 {
            return Err(ModelError::InvalidConfig("batch_size must be positive".into()));
        }
        if self.learning_rate.is_nan() || self.learning_rate <= 0.0 {
            return Err(ModelError::InvalidConfig(format!(
                "learning_rate must be positive, got {}",
                self.learning_rate
            )));
        }
        if !(0.0..1.0).contains(&self.test_fraction) {
            return Err(ModelError::InvalidConfig(format!(
                "test_fraction must be in [0, 1), got {}",
                self.test_fraction
            )));
        }
        Ok(())
    }

    pub fn fit_config(&self) -> FitConfig {
        FitConfig::new()
            .with_epochs(self.epochs)
            .with_learning_rate(self.learning_rate)
            .with_batch_size(self.batch_size)
    }

    /// Number of held-out rows for a dataset of `n` rows. At least one row
    /// always remains for training.
    pub fn test_size(&self, n: usize) -> usize {
        let wanted = (self.test_fraction * n as f64).ceil() as usize;
        wanted.min(n.saturating_sub(1))
    }
}

#[derive(Debug, Clone)]
pub struct TrainReport {
    pub model: MlpRegressor,
    /// Distinct states after the join
    pub states: usize,
    pub train_size: usize,
    pub test_size: usize,
    pub train_mse: f32,
    /// `None` when nothing was held out
    pub test_mse: Option<f32>,
    pub epoch_losses: Vec<f32>,
}

pub fn train(
    config: &TrainConfig,
    games: &[GameRecord],
    states: &[StateRecord],
) -> Result<TrainReport> {
    config.validate()?;

    let outcomes = aggregate(games, states);
    let dataset = build_dataset(&outcomes)?;
    let width = dataset.width().ok_or(ModelError::EmptyDataset)?;

    let mut rng = StdRng::seed_from_u64(config.seed);
    let mut order: Vec<usize> = (0..dataset.len()).collect();
    order.shuffle(&mut rng);
    let test_size = config.test_size(order.len());
    let (test_idx, train_idx) = order.split_at(test_size);
    let train_set = dataset.subset(train_idx);
    let test_set = dataset.subset(test_idx);

    info!(
        states = outcomes.len(),
        train = train_set.len(),
        test = test_set.len(),
        width,
        "training win-rate regressor"
    );

    let mut model = MlpRegressor::new(width, config.hidden_units, &mut rng);
    let epoch_losses = model.fit(
        &train_set.features,
        &train_set.labels,
        &config.fit_config(),
        &mut rng,
    )?;

    let train_mse = model.mse(&train_set.features, &train_set.labels)?;
    let test_mse = if test_set.is_empty() {
        None
    } else {
        Some(model.mse(&test_set.features, &test_set.labels)?)
    };
    info!(train_mse, test_mse = ?test_mse, "training complete");

    Ok(TrainReport {
        model,
        states: outcomes.len(),
        train_size: train_set.len(),
        test_size: test_set.len(),
        train_mse,
        test_mse,
        epoch_losses,
    })
}

pub fn train_from_files(
    config: &TrainConfig,
    games_path: &Path,
    states_path: &Path,
) -> Result<TrainReport> {
    let games = load_games(games_path)?;
    let states = load_states(states_path)?;
    info!(
        games = games.len(),
        states = states.len(),
        "loaded training tables"
    );
    train(config, &games, &states)
}

#[cfg(test)]
#[path = "trainer_tests.rs"]
mod trainer_tests;
