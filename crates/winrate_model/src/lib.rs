//! Board-State Win-Rate Model
//!
//! This crate trains and serves a small regressor that maps a board-state
//! string to the predicted fraction of games black goes on to win.
//!
//! # Artifacts
//!
//! Two artifact formats are supported, chosen by file extension:
//! 1. **JSON** (default): an [`MlpRegressor`] record written by the [`trainer`],
//!    with its layer shape in a `<stem>.config.json` sidecar
//! 2. **ONNX** (`.onnx`, feature `onnx`): an externally trained model with a
//!    `[1, width] -> [1, 1]` signature
//!
//! ```ignore
//! let predictor = WinRatePredictor::load(Path::new("model.json"))?;
//! let black_win_ratio = predictor.predict("b:b/bb/bbb/bbbb/3/4/3/4/3/wwww/www/ww/w")?;
//! ```

mod error;
mod features;
mod regressor;
pub mod trainer;

#[cfg(feature = "onnx")]
mod onnx_model;

pub use error::{ModelError, Result};
pub use features::{
    decode_board, parse_board, BoardState, Side, BLACK_CODE, BOARD_SQUARES, EMPTY_CODE,
    START_POSITION, WHITE_CODE,
};
#[cfg(feature = "onnx")]
pub use onnx_model::OnnxRegressor;
pub use regressor::{FitConfig, MlpRegressor, RegressorNetwork, RegressorNetworkConfig};
pub use trainer::{train, train_from_files, TrainConfig, TrainReport};

use std::path::{Path, PathBuf};
use tracing::debug;

/// A loaded regressor that maps a feature vector to a scalar prediction.
pub trait WinRateModel: Send {
    /// Number of features the model expects.
    fn input_width(&self) -> usize;

    fn predict(&self, features: &[f32]) -> Result<f32>;
}

impl WinRateModel for MlpRegressor {
    fn input_width(&self) -> usize {
        MlpRegressor::input_width(self)
    }

    fn predict(&self, features: &[f32]) -> Result<f32> {
        MlpRegressor::predict(self, features)
    }
}

#[cfg(feature = "onnx")]
impl WinRateModel for OnnxRegressor {
    fn input_width(&self) -> usize {
        OnnxRegressor::input_width(self)
    }

    fn predict(&self, features: &[f32]) -> Result<f32> {
        OnnxRegressor::predict(self, features)
    }
}

/// Win-rate predictor for board-state strings.
pub struct WinRatePredictor {
    model: Box<dyn WinRateModel>,
    /// Path the model was loaded from (if any)
    artifact: Option<PathBuf>,
}

impl WinRatePredictor {
    pub fn new(model: impl WinRateModel + 'static) -> Self {
        Self {
            model: Box::new(model),
            artifact: None,
        }
    }

    /// Load a model artifact, picking the format by extension.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Err(ModelError::unavailable(
                path,
                std::io::Error::new(std::io::ErrorKind::NotFound, "model artifact not found"),
            ));
        }

        let is_onnx = path
            .extension()
            .map_or(false, |ext| ext.eq_ignore_ascii_case("onnx"));
        let model: Box<dyn WinRateModel> = if is_onnx {
            Self::load_onnx(path)?
        } else {
            Box::new(MlpRegressor::load(path)?)
        };
        debug!(path = %path.display(), width = model.input_width(), "loaded model artifact");

        Ok(Self {
            model,
            artifact: Some(path.to_path_buf()),
        })
    }

    #[cfg(feature = "onnx")]
    fn load_onnx(path: &Path) -> Result<Box<dyn WinRateModel>> {
        Ok(Box::new(OnnxRegressor::load(path)?))
    }

    #[cfg(not(feature = "onnx"))]
    fn load_onnx(path: &Path) -> Result<Box<dyn WinRateModel>> {
        Err(ModelError::InvalidArtifact(format!(
            "{}: ONNX artifacts need the `onnx` feature",
            path.display()
        )))
    }

    pub fn input_width(&self) -> usize {
        self.model.input_width()
    }

    pub fn artifact_path(&self) -> Option<&Path> {
        self.artifact.as_deref()
    }

    /// Predict the black win ratio for a board-state string.
    pub fn predict(&self, notation: &str) -> Result<f32> {
        let features = decode_board(notation)?;
        self.predict_features(&features)
    }

    pub fn predict_features(&self, features: &[f32]) -> Result<f32> {
        let expected = self.model.input_width();
        if features.len() != expected {
            return Err(ModelError::StructuralMismatch {
                expected,
                actual: features.len(),
            });
        }
        self.model.predict(features)
    }
}
