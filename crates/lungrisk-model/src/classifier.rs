//! Logistic regression classifier over the canonical feature vector.
//!
//! A single linear layer maps the 27 predictor columns to 2 class logits,
//! softmaxed into probabilities. Weights start at zero rather than from a
//! random draw, so a fixed shuffle seed reproduces a training run bit for
//! bit; the logistic loss is convex, so the starting point does not change
//! the optimum.
//!
//! # Architecture
//!
//! ```text
//! Input (27) → Linear(2) → Softmax
//! ```

use candle_core::{DType, Device, Tensor, D};
use candle_nn::{Init, Linear, Module, VarBuilder, VarMap};
use lungrisk_core::{LungRiskError, Result, FEATURE_COUNT};
use std::path::Path;

/// File name of the weights within a model directory.
pub const MODEL_FILE: &str = "model.safetensors";

/// Number of output classes (no cancer, cancer).
const NUM_CLASSES: usize = 2;

/// Variable-name prefix the weights are stored under.
const VAR_PREFIX: &str = "classifier";

/// Binary logistic regression classifier.
#[derive(Debug)]
pub struct RiskClassifier {
    linear: Linear,
    device: Device,
}

impl RiskClassifier {
    fn build(vb: &VarBuilder, device: &Device) -> Result<Self> {
        let vb = vb.pp(VAR_PREFIX);
        let weight = vb
            .get_with_hints((NUM_CLASSES, FEATURE_COUNT), "weight", Init::Const(0.0))
            .map_err(|e| {
                LungRiskError::Model(format!("Failed to bind classifier weight: {e}"))
            })?;
        let bias = vb
            .get_with_hints(NUM_CLASSES, "bias", Init::Const(0.0))
            .map_err(|e| LungRiskError::Model(format!("Failed to bind classifier bias: {e}")))?;
        Ok(Self {
            linear: Linear::new(weight, Some(bias)),
            device: device.clone(),
        })
    }

    /// Create a zero-initialized classifier whose parameters live in `varmap`.
    ///
    /// The caller feeds `varmap.all_vars()` to the optimizer and saves the
    /// map once fitting is done.
    pub fn new_trainable(varmap: &VarMap, device: &Device) -> Result<Self> {
        let vb = VarBuilder::from_varmap(varmap, DType::F32, device);
        Self::build(&vb, device)
    }

    /// Load a classifier from a safetensors weights file.
    ///
    /// Returns an error if the file cannot be read or the stored tensors do
    /// not match the expected architecture.
    pub fn load(path: &Path, device: &Device) -> Result<Self> {
        // SAFETY: memory-mapping safetensors is the standard candle pattern.
        let vb = unsafe {
            VarBuilder::from_mmaped_safetensors(&[path], DType::F32, device).map_err(|e| {
                LungRiskError::Model(format!("Failed to load weights {}: {e}", path.display()))
            })?
        };
        Self::build(&vb, device)
    }

    /// Compute class logits for a batch of feature rows of shape `[n, 27]`.
    pub fn forward(&self, inputs: &Tensor) -> Result<Tensor> {
        self.linear
            .forward(inputs)
            .map_err(|e| LungRiskError::Model(format!("Classifier forward failed: {e}")))
    }

    /// Probability of the positive class for one feature vector.
    ///
    /// The slice must be in canonical column order; a wrong length is a
    /// schema error, not a model error.
    pub fn predict(&self, features: &[f32]) -> Result<f64> {
        if features.len() != FEATURE_COUNT {
            return Err(LungRiskError::Schema(format!(
                "feature vector has {} values (expected {FEATURE_COUNT})",
                features.len()
            )));
        }

        let input = Tensor::new(features, &self.device)
            .map_err(|e| LungRiskError::Model(format!("Failed to create input tensor: {e}")))?
            .unsqueeze(0)
            .map_err(|e| LungRiskError::Model(format!("Failed to shape input tensor: {e}")))?;

        let logits = self.forward(&input)?;
        let probs = candle_nn::ops::softmax(&logits, D::Minus1)
            .map_err(|e| LungRiskError::Model(format!("Softmax failed: {e}")))?;
        let probs_vec: Vec<f32> = probs
            .squeeze(0)
            .and_then(|t| t.to_vec1())
            .map_err(|e| LungRiskError::Model(format!("Failed to extract probabilities: {e}")))?;

        let positive = probs_vec.get(1).copied().ok_or_else(|| {
            LungRiskError::Model("softmax produced fewer than two classes".to_string())
        })?;
        Ok(f64::from(positive))
    }

    /// Returns a reference to the device this classifier runs on.
    pub fn device(&self) -> &Device {
        &self.device
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
