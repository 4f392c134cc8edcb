//! Single-hidden-layer perceptron regressor
//!
//! ```text
//! Input:  [batch, input_width]
//! FC1:    input_width -> hidden_units, ReLU
//! FC2:    hidden_units -> 1  (predicted black win ratio)
//! ```
//!
//! Trained with Adam on mean squared error over shuffled mini-batches.
//! Artifacts are two JSON files: the network record at `<stem>.json` and its
//! shape at `<stem>.config.json`.

use std::path::{Path, PathBuf};

use burn::backend::{Autodiff, NdArray};
use burn::module::{AutodiffModule, Param};
use burn::nn::{Initializer, Linear, LinearConfig, Relu};
use burn::optim::{AdamConfig, GradientsParams, Optimizer};
use burn::prelude::*;
use burn::record::{FullPrecisionSettings, PrettyJsonFileRecorder};
use burn::tensor::TensorData;
use rand::seq::SliceRandom;
use rand::Rng;
use tracing::debug;

use crate::error::ModelError;

// Two-parameter form so burn's `Config` derive (which expands to bare
// `Result<T, E>`) still resolves; identical to `crate::error::Result<T>`.
type Result<T, E = ModelError> = std::result::Result<T, E>;

type InferBackend = NdArray<f32>;
type TrainBackend = Autodiff<InferBackend>;
type Device = <TrainBackend as Backend>::Device;

#[derive(Module, Debug)]
pub struct RegressorNetwork<B: Backend> {
    hidden: Linear<B>,
    output: Linear<B>,
    relu: Relu,
}

#[derive(Config, Debug)]
pub struct RegressorNetworkConfig {
    pub input_width: usize,
    #[config(default = 100)]
    pub hidden_units: usize,
}

impl RegressorNetworkConfig {
    /// All-zero network; predicts 0.0 for every input.
    pub fn init_zeros<B: Backend>(&self, device: &B::Device) -> RegressorNetwork<B> {
        RegressorNetwork {
            hidden: LinearConfig::new(self.input_width, self.hidden_units)
                .with_initializer(Initializer::Zeros)
                .init(device),
            output: LinearConfig::new(self.hidden_units, 1)
                .with_initializer(Initializer::Zeros)
                .init(device),
            relu: Relu::new(),
        }
    }

    /// Glorot-uniform weights drawn from `rng`, zero biases.
    pub fn init_seeded<B: Backend, R: Rng + ?Sized>(
        &self,
        rng: &mut R,
        device: &B::Device,
    ) -> RegressorNetwork<B> {
        let mut network = self.init_zeros(device);
        network.hidden.weight = glorot(self.input_width, self.hidden_units, rng, device);
        network.output.weight = glorot(self.hidden_units, 1, rng, device);
        network
    }
}

fn glorot<B: Backend, R: Rng + ?Sized>(
    fan_in: usize,
    fan_out: usize,
    rng: &mut R,
    device: &B::Device,
) -> Param<Tensor<B, 2>> {
    let bound = (6.0 / (fan_in + fan_out).max(1) as f32).sqrt();
    let values: Vec<f32> = (0..fan_in * fan_out)
        .map(|_| rng.gen_range(-bound..=bound))
        .collect();
    Param::from_tensor(Tensor::from_data(
        TensorData::new(values, [fan_in, fan_out]),
        device,
    ))
}

impl<B: Backend> RegressorNetwork<B> {
    /// Forward pass: input [batch, input_width] -> output [batch, 1].
    pub fn forward(&self, input: Tensor<B, 2>) -> Tensor<B, 2> {
        let x = self.relu.forward(self.hidden.forward(input));
        self.output.forward(x)
    }
}

/// Optimizer settings for [`MlpRegressor::fit`]
#[derive(Config, Debug)]
pub struct FitConfig {
    #[config(default = 200)]
    pub epochs: usize,
    #[config(default = 1e-3)]
    pub learning_rate: f64,
    /// Capped at the number of samples
    #[config(default = 200)]
    pub batch_size: usize,
}

#[derive(Debug, Clone)]
pub struct MlpRegressor {
    config: RegressorNetworkConfig,
    network: RegressorNetwork<TrainBackend>,
    device: Device,
}

impl MlpRegressor {
    pub fn new<R: Rng + ?Sized>(input_width: usize, hidden_units: usize, rng: &mut R) -> Self {
        let device = Device::default();
        let config = RegressorNetworkConfig::new(input_width).with_hidden_units(hidden_units);
        let network = config.init_seeded(rng, &device);
        Self {
            config,
            network,
            device,
        }
    }

    pub fn zeros(input_width: usize, hidden_units: usize) -> Self {
        let device = Device::default();
        let config = RegressorNetworkConfig::new(input_width).with_hidden_units(hidden_units);
        let network = config.init_zeros(&device);
        Self {
            config,
            network,
            device,
        }
    }

    pub fn input_width(&self) -> usize {
        self.config.input_width
    }

    pub fn hidden_units(&self) -> usize {
        self.config.hidden_units
    }

    /// Every weight and bias, flattened in layer order.
    pub fn parameters(&self) -> Result<Vec<f32>> {
        let network = self.network.valid();
        let mut flat = to_vec(network.hidden.weight.val())?;
        if let Some(bias) = &network.hidden.bias {
            flat.extend(to_vec(bias.val())?);
        }
        flat.extend(to_vec(network.output.weight.val())?);
        if let Some(bias) = &network.output.bias {
            flat.extend(to_vec(bias.val())?);
        }
        Ok(flat)
    }

    pub fn predict(&self, features: &[f32]) -> Result<f32> {
        self.check_width(features)?;
        let input = batch_input::<InferBackend>(&[features], self.input_width(), &self.device);
        let output = to_vec(self.network.valid().forward(input))?;
        output
            .first()
            .copied()
            .ok_or_else(|| ModelError::Tensor("empty output tensor".into()))
    }

    /// Mean squared error over a set of samples.
    pub fn mse(&self, xs: &[Vec<f32>], ys: &[f32]) -> Result<f32> {
        self.check_samples(xs, ys)?;
        let rows: Vec<&[f32]> = xs.iter().map(Vec::as_slice).collect();
        let input = batch_input::<InferBackend>(&rows, self.input_width(), &self.device);
        let predictions = to_vec(self.network.valid().forward(input))?;
        let total: f32 = predictions
            .iter()
            .zip(ys)
            .map(|(p, y)| (p - y) * (p - y))
            .sum();
        Ok(total / xs.len() as f32)
    }

    /// Train with Adam, reshuffling the samples every epoch.
    ///
    /// Returns the sample-weighted mean batch loss of each epoch.
    pub fn fit<R: Rng + ?Sized>(
        &mut self,
        xs: &[Vec<f32>],
        ys: &[f32],
        config: &FitConfig,
        rng: &mut R,
    ) -> Result<Vec<f32>> {
        self.check_samples(xs, ys)?;
        if config.batch_size == 0 {
            return Err(ModelError::InvalidConfig("batch_size must be positive".into()));
        }

        let width = self.input_width();
        let batch_size = config.batch_size.min(xs.len());
        let mut optimizer =
            AdamConfig::new().init::<TrainBackend, RegressorNetwork<TrainBackend>>();
        let mut order: Vec<usize> = (0..xs.len()).collect();
        let mut losses = Vec::with_capacity(config.epochs);

        for epoch in 0..config.epochs {
            order.shuffle(rng);
            let mut total = 0.0;
            for chunk in order.chunks(batch_size) {
                let rows: Vec<&[f32]> = chunk.iter().map(|&i| xs[i].as_slice()).collect();
                let labels: Vec<f32> = chunk.iter().map(|&i| ys[i]).collect();

                let input = batch_input::<TrainBackend>(&rows, width, &self.device);
                let targets = Tensor::<TrainBackend, 2>::from_data(
                    TensorData::new(labels, [chunk.len(), 1]),
                    &self.device,
                );

                let diff = self.network.forward(input) - targets;
                let loss = (diff.clone() * diff).mean();
                let loss_val = to_vec(loss.clone())?.first().copied().unwrap_or(0.0);
                total += loss_val * chunk.len() as f32;

                let grads = GradientsParams::from_grads(loss.backward(), &self.network);
                self.network = optimizer.step(config.learning_rate, self.network.clone(), grads);
            }
            let loss = total / xs.len() as f32;
            debug!(epoch, loss, "epoch complete");
            losses.push(loss);
        }
        Ok(losses)
    }

    fn check_width(&self, features: &[f32]) -> Result<()> {
        if features.len() != self.input_width() {
            return Err(ModelError::StructuralMismatch {
                expected: self.input_width(),
                actual: features.len(),
            });
        }
        Ok(())
    }

    fn check_samples(&self, xs: &[Vec<f32>], ys: &[f32]) -> Result<()> {
        if xs.is_empty() {
            return Err(ModelError::EmptyDataset);
        }
        if xs.len() != ys.len() {
            return Err(ModelError::StructuralMismatch {
                expected: xs.len(),
                actual: ys.len(),
            });
        }
        xs.iter().try_for_each(|x| self.check_width(x))
    }

    /// Write the network record to `path` and its shape next to it.
    pub fn save(&self, path: &Path) -> Result<()> {
        let (weights, shape) = artifact_paths(path);
        self.config
            .save(&shape)
            .map_err(|e| ModelError::unavailable(&shape, e))?;
        self.network
            .valid()
            .save_file(weights.clone(), &recorder())
            .map_err(|e| ModelError::InvalidArtifact(format!("{}: {:?}", weights.display(), e)))?;
        Ok(())
    }

    pub fn load(path: &Path) -> Result<Self> {
        let (weights, shape) = artifact_paths(path);
        for file in [&weights, &shape] {
            if !file.exists() {
                return Err(ModelError::unavailable(
                    file,
                    std::io::Error::new(std::io::ErrorKind::NotFound, "artifact file not found"),
                ));
            }
        }

        let config = RegressorNetworkConfig::load(&shape)
            .map_err(|e| ModelError::InvalidArtifact(format!("{}: {:?}", shape.display(), e)))?;
        let device = Device::default();
        let network: RegressorNetwork<TrainBackend> = config
            .init_zeros(&device)
            .load_file(weights.clone(), &recorder(), &device)
            .map_err(|e| ModelError::InvalidArtifact(format!("{}: {:?}", weights.display(), e)))?;

        let model = Self {
            config,
            network,
            device,
        };
        model.validate()?;
        Ok(model)
    }

    fn validate(&self) -> Result<()> {
        let hidden = self.network.hidden.weight.val().dims();
        let output = self.network.output.weight.val().dims();
        let expected_hidden = [self.config.input_width, self.config.hidden_units];
        let expected_output = [self.config.hidden_units, 1];
        if hidden != expected_hidden || output != expected_output {
            return Err(ModelError::InvalidArtifact(format!(
                "layer shapes {:?} and {:?} disagree with config {:?} and {:?}",
                hidden, output, expected_hidden, expected_output
            )));
        }
        Ok(())
    }
}

fn recorder() -> PrettyJsonFileRecorder<FullPrecisionSettings> {
    PrettyJsonFileRecorder::<FullPrecisionSettings>::new()
}

/// `model.json` -> (`model.json`, `model.config.json`)
pub fn artifact_paths(path: &Path) -> (PathBuf, PathBuf) {
    (path.with_extension("json"), path.with_extension("config.json"))
}

fn batch_input<B: Backend>(rows: &[&[f32]], width: usize, device: &B::Device) -> Tensor<B, 2> {
    let mut flat = Vec::with_capacity(rows.len() * width);
    for row in rows {
        flat.extend_from_slice(row);
    }
    Tensor::from_data(TensorData::new(flat, [rows.len(), width]), device)
}

fn to_vec<B: Backend, const D: usize>(tensor: Tensor<B, D>) -> Result<Vec<f32>> {
    tensor
        .into_data()
        .to_vec::<f32>()
        .map_err(|e| ModelError::Tensor(format!("{:?}", e)))
}

#[cfg(test)]
#[path = "regressor_tests.rs"]
mod regressor_tests;
