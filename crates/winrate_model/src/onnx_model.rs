//! ONNX model loading and inference
//!
//! Lets externally trained regressors serve predictions.
//! Requires the `onnx` feature to be enabled.

use std::path::Path;
use tract_onnx::prelude::*;

use crate::error::{ModelError, Result};

/// Wrapper around an ONNX regressor with a `[1, width] -> [1, 1]` signature.
pub struct OnnxRegressor {
    model: SimplePlan<TypedFact, Box<dyn TypedOp>, Graph<TypedFact, Box<dyn TypedOp>>>,
    input_width: usize,
}

impl OnnxRegressor {
    /// Load an ONNX model from the given path.
    pub fn load(path: &Path) -> Result<Self> {
        let invalid = |stage: &str, e: TractError| {
            ModelError::InvalidArtifact(format!("{}: {}: {}", path.display(), stage, e))
        };

        let model = tract_onnx::onnx()
            .model_for_path(path)
            .map_err(|e| invalid("load", e))?
            .into_optimized()
            .map_err(|e| invalid("optimize", e))?
            .into_runnable()
            .map_err(|e| invalid("plan", e))?;

        let input_fact = model
            .model()
            .input_fact(0)
            .map_err(|e| invalid("input fact", e))?;

        let input_width = input_fact
            .shape
            .iter()
            .filter_map(|d| d.to_i64().ok())
            .product::<i64>() as usize;

        Ok(Self { model, input_width })
    }

    pub fn input_width(&self) -> usize {
        self.input_width
    }

    pub fn predict(&self, features: &[f32]) -> Result<f32> {
        if features.len() != self.input_width {
            return Err(ModelError::StructuralMismatch {
                expected: self.input_width,
                actual: features.len(),
            });
        }

        let input: Tensor =
            tract_ndarray::Array::from_shape_vec((1, self.input_width), features.to_vec())
                .map_err(|e| ModelError::InvalidArtifact(format!("input shape: {}", e)))?
                .into();

        let result = self
            .model
            .run(tvec!(input.into()))
            .map_err(|e| ModelError::InvalidArtifact(format!("inference failed: {}", e)))?;
        let output = result[0]
            .to_array_view::<f32>()
            .map_err(|e| ModelError::InvalidArtifact(format!("non-f32 output: {}", e)))?;

        output
            .iter()
            .next()
            .copied()
            .ok_or_else(|| ModelError::InvalidArtifact("empty output tensor".into()))
    }
}

#[cfg(test)]
#[path = "onnx_model_tests.rs"]
mod onnx_model_tests;
