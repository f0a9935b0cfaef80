//! End-to-end training run: load the dataset, split, fit, evaluate, persist.

use crate::data::{load_dataset, split_dataset, BatchIterator, DataSplit, Dataset};
use crate::metrics::ValidationMetrics;
use candle_core::{Device, Tensor, D};
use candle_nn::{Optimizer, VarMap};
use chrono::Utc;
use lungrisk_core::{FeatureSchema, LungRiskError, Result, TrainSettings};
use lungrisk_model::{ModelManifest, RiskClassifier, CLASS_LABELS, MODEL_FILE};
use std::path::{Path, PathBuf};

/// File name of the accuracy report within a model directory.
pub const ACCURACY_FILE: &str = "model_accuracy.txt";

/// Fitting stops before the epoch cap once the mean epoch loss moves less
/// than this between consecutive epochs.
const LOSS_TOLERANCE: f64 = 1e-7;

/// Summary of a completed training run.
#[derive(Debug, Clone)]
pub struct TrainOutcome {
    /// Accuracy on the held-out partition, in `[0, 1]`.
    pub accuracy: f64,
    /// Full confusion-matrix tally on the held-out partition.
    pub metrics: ValidationMetrics,
    /// Directory the artifacts were written to.
    pub model_dir: PathBuf,
    /// Rows used for fitting.
    pub train_rows: usize,
    /// Rows held out for evaluation.
    pub test_rows: usize,
    /// Epochs actually run before converging or hitting the cap.
    pub epochs_run: usize,
    /// Mean training loss of the final epoch.
    pub final_loss: f64,
}

/// Run the full pipeline: load, split, fit, evaluate, persist.
///
/// Nothing is written unless fitting and evaluation succeed, so a malformed
/// dataset (including one without the label column) leaves no partial
/// artifacts behind. With the same dataset and settings, the run is
/// reproducible down to the stored coefficients: weights start at zero and
/// every shuffle is seeded.
pub fn train(
    dataset_path: &Path,
    output_dir: &Path,
    settings: &TrainSettings,
) -> Result<TrainOutcome> {
    settings.validate()?;
    let device = Device::Cpu;

    let dataset = load_dataset(dataset_path)?;
    tracing::info!(
        rows = dataset.rows,
        positive = dataset.positive_rows(),
        negative = dataset.negative_rows(),
        path = %dataset_path.display(),
        "Dataset loaded"
    );

    let (inputs, labels) = dataset.to_tensors(&device)?;
    let split = split_dataset(&inputs, &labels, settings.test_ratio, settings.seed)?;

    let varmap = VarMap::new();
    let model = RiskClassifier::new_trainable(&varmap, &device)?;

    let mut optimizer = candle_nn::AdamW::new(
        varmap.all_vars(),
        candle_nn::ParamsAdamW {
            lr: settings.learning_rate,
            weight_decay: settings.weight_decay,
            ..Default::default()
        },
    )
    .map_err(|e| LungRiskError::Model(format!("Failed to create optimizer: {e}")))?;

    let mut batch_iter = BatchIterator::new(
        split.train_inputs.clone(),
        split.train_labels.clone(),
        settings.batch_size,
    );

    let mut previous_loss = f64::MAX;
    let mut final_loss = 0.0;
    let mut epochs_run = 0;

    for epoch in 0..settings.max_epochs {
        batch_iter.reshuffle(settings.seed, epoch);

        let mut epoch_loss = 0.0;
        let mut batch_count = 0usize;

        while let Some((batch_inputs, batch_labels)) = batch_iter.next_batch()? {
            let logits = model.forward(&batch_inputs)?;
            let loss = candle_nn::loss::cross_entropy(&logits, &batch_labels)
                .map_err(|e| LungRiskError::Model(format!("Loss computation failed: {e}")))?;
            optimizer
                .backward_step(&loss)
                .map_err(|e| LungRiskError::Model(format!("Backward step failed: {e}")))?;

            let loss_value = loss
                .to_scalar::<f32>()
                .map_err(|e| LungRiskError::Model(format!("Loss readback failed: {e}")))?;
            epoch_loss += f64::from(loss_value);
            batch_count += 1;
        }

        let avg_loss = if batch_count > 0 {
            epoch_loss / batch_count as f64
        } else {
            0.0
        };
        epochs_run = epoch + 1;
        final_loss = avg_loss;
        tracing::debug!(epoch = epochs_run, train_loss = avg_loss, "Epoch complete");

        if (previous_loss - avg_loss).abs() < LOSS_TOLERANCE {
            tracing::info!(epoch = epochs_run, train_loss = avg_loss, "Fitting converged");
            break;
        }
        previous_loss = avg_loss;
    }

    let metrics = evaluate(&model, &split.test_inputs, &split.test_labels)?;
    tracing::info!(%metrics, epochs = epochs_run, "Held-out evaluation complete");

    persist_artifacts(&varmap, &dataset, &split, &metrics, settings.seed, output_dir)?;

    Ok(TrainOutcome {
        accuracy: metrics.accuracy(),
        metrics,
        model_dir: output_dir.to_path_buf(),
        train_rows: split.train_indices.len(),
        test_rows: split.test_indices.len(),
        epochs_run,
        final_loss,
    })
}

/// Score a partition and tally its confusion matrix.
fn evaluate(
    model: &RiskClassifier,
    inputs: &Tensor,
    labels: &Tensor,
) -> Result<ValidationMetrics> {
    let logits = model.forward(inputs)?;
    let probs = candle_nn::ops::softmax(&logits, D::Minus1)
        .map_err(|e| LungRiskError::Model(format!("Softmax failed: {e}")))?;
    let rows: Vec<Vec<f32>> = probs
        .to_vec2()
        .map_err(|e| LungRiskError::Model(format!("Failed to read probabilities: {e}")))?;
    let truth: Vec<i64> = labels
        .to_vec1()
        .map_err(|e| LungRiskError::Model(format!("Failed to read labels: {e}")))?;

    let mut metrics = ValidationMetrics::default();
    for (row, &label) in rows.iter().zip(truth.iter()) {
        let negative = row.first().copied().unwrap_or(0.0);
        let positive = row.get(1).copied().unwrap_or(0.0);
        // Ties go to class 0, matching a strict 0.5 decision threshold.
        metrics.record(positive > negative, label == 1);
    }
    Ok(metrics)
}

fn persist_artifacts(
    varmap: &VarMap,
    dataset: &Dataset,
    split: &DataSplit,
    metrics: &ValidationMetrics,
    seed: u64,
    output_dir: &Path,
) -> Result<()> {
    std::fs::create_dir_all(output_dir).map_err(|e| {
        LungRiskError::Model(format!(
            "Failed to create output directory {}: {e}",
            output_dir.display()
        ))
    })?;

    let weights_path = output_dir.join(MODEL_FILE);
    varmap.save(&weights_path).map_err(|e| {
        LungRiskError::Model(format!(
            "Failed to save weights {}: {e}",
            weights_path.display()
        ))
    })?;

    ModelManifest {
        schema: FeatureSchema::canonical(),
        model_file: MODEL_FILE.to_string(),
        class_labels: CLASS_LABELS.to_vec(),
        seed,
        trained_at: Utc::now(),
        train_rows: split.train_indices.len(),
        test_rows: split.test_indices.len(),
        positive_rows: dataset.positive_rows(),
        negative_rows: dataset.negative_rows(),
        test_accuracy: metrics.accuracy(),
    }
    .write(output_dir)?;

    let report = format!("Accuracy: {:.2}%\n", metrics.accuracy() * 100.0);
    std::fs::write(output_dir.join(ACCURACY_FILE), report)
        .map_err(|e| LungRiskError::Model(format!("Failed to write accuracy report: {e}")))?;

    tracing::info!(dir = %output_dir.display(), "Artifacts written");
    Ok(())
}
