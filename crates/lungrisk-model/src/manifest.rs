//! Model artifact manifest.
//!
//! A trained model is persisted as a weights file plus a manifest that pins
//! the feature schema, split sizes, and held-out accuracy of the run that
//! produced it. Loading validates the embedded schema against the canonical
//! one, so a stale or foreign artifact is rejected up front instead of
//! producing silently misaligned predictions.

use chrono::{DateTime, Utc};
use lungrisk_core::{FeatureSchema, LungRiskError, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// File name of the manifest within a model directory.
pub const MANIFEST_FILE: &str = "manifest.json";

/// Label values in class-index order: logit 0 predicts `0`, logit 1 predicts `1`.
pub const CLASS_LABELS: [i64; 2] = [0, 1];

/// Metadata describing one persisted model artifact.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelManifest {
    /// Feature schema the model was trained with.
    pub schema: FeatureSchema,
    /// Weights file name, relative to the manifest's directory.
    pub model_file: String,
    /// Label values in class-index order.
    pub class_labels: Vec<i64>,
    /// Seed used for the split and batch shuffles.
    pub seed: u64,
    /// When the training run finished.
    pub trained_at: DateTime<Utc>,
    /// Rows in the training partition.
    pub train_rows: usize,
    /// Rows in the held-out test partition.
    pub test_rows: usize,
    /// Rows labeled positive across the full dataset.
    pub positive_rows: usize,
    /// Rows labeled negative across the full dataset.
    pub negative_rows: usize,
    /// Accuracy on the held-out partition, in `[0, 1]`.
    pub test_accuracy: f64,
}

impl ModelManifest {
    /// Write the manifest as pretty-printed JSON into `dir`.
    pub fn write(&self, dir: &Path) -> Result<()> {
        let json = serde_json::to_string_pretty(self)?;
        let path = dir.join(MANIFEST_FILE);
        std::fs::write(&path, json).map_err(|e| {
            LungRiskError::Model(format!("Failed to write manifest {}: {e}", path.display()))
        })
    }

    /// Read and validate the manifest stored in `dir`.
    ///
    /// Returns a [`LungRiskError::Schema`] when the embedded schema does not
    /// match the canonical one this build understands, or when the manifest
    /// does not name a weights file.
    pub fn load(dir: &Path) -> Result<Self> {
        let path = dir.join(MANIFEST_FILE);
        let content = std::fs::read_to_string(&path).map_err(|e| {
            LungRiskError::Model(format!("Failed to read manifest {}: {e}", path.display()))
        })?;
        let manifest: Self = serde_json::from_str(&content)?;
        manifest.schema.validate()?;
        if manifest.model_file.is_empty() {
            return Err(LungRiskError::Schema(
                "manifest does not name a model file".to_string(),
            ));
        }
        if manifest.class_labels != CLASS_LABELS {
            return Err(LungRiskError::Schema(format!(
                "manifest class labels {:?} do not match {CLASS_LABELS:?}",
                manifest.class_labels
            )));
        }
        Ok(manifest)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::classifier::MODEL_FILE;

    fn sample_manifest() -> ModelManifest {
        ModelManifest {
            schema: FeatureSchema::canonical(),
            model_file: MODEL_FILE.to_string(),
            class_labels: CLASS_LABELS.to_vec(),
            seed: 42,
            trained_at: Utc::now(),
            train_rows: 800,
            test_rows: 200,
            positive_rows: 430,
            negative_rows: 570,
            test_accuracy: 0.915,
        }
    }

    #[test]
    fn test_write_load_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let manifest = sample_manifest();
        manifest.write(dir.path()).unwrap();

        let loaded = ModelManifest::load(dir.path()).unwrap();
        assert_eq!(loaded, manifest);
    }

    #[test]
    fn test_load_rejects_stale_schema_version() {
        let dir = tempfile::tempdir().unwrap();
        let mut manifest = sample_manifest();
        manifest.schema.version = 99;
        manifest.write(dir.path()).unwrap();

        let err = ModelManifest::load(dir.path()).unwrap_err();
        assert!(matches!(err, LungRiskError::Schema(_)), "got: {err}");
    }

    #[test]
    fn test_load_rejects_reordered_columns() {
        let dir = tempfile::tempdir().unwrap();
        let mut manifest = sample_manifest();
        manifest.schema.columns.swap(0, 1);
        manifest.write(dir.path()).unwrap();

        assert!(ModelManifest::load(dir.path()).is_err());
    }

    #[test]
    fn test_load_rejects_empty_model_file() {
        let dir = tempfile::tempdir().unwrap();
        let mut manifest = sample_manifest();
        manifest.model_file = String::new();
        manifest.write(dir.path()).unwrap();

        let err = ModelManifest::load(dir.path()).unwrap_err();
        assert!(err.to_string().contains("model file"));
    }

    #[test]
    fn test_load_rejects_foreign_class_labels() {
        let dir = tempfile::tempdir().unwrap();
        let mut manifest = sample_manifest();
        manifest.class_labels = vec![1, 0];
        manifest.write(dir.path()).unwrap();

        let err = ModelManifest::load(dir.path()).unwrap_err();
        assert!(err.to_string().contains("class labels"), "got: {err}");
    }

    #[test]
    fn test_load_missing_manifest_fails() {
        let dir = tempfile::tempdir().unwrap();
        let err = ModelManifest::load(dir.path()).unwrap_err();
        assert!(matches!(err, LungRiskError::Model(_)), "got: {err}");
    }

    #[test]
    fn test_load_rejects_malformed_json() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join(MANIFEST_FILE), "{ not json").unwrap();

        let err = ModelManifest::load(dir.path()).unwrap_err();
        assert!(matches!(err, LungRiskError::Serialization(_)), "got: {err}");
    }
}
