//! Scoring surface: load a persisted model and turn intakes into assessments.

use candle_core::Device;
use lungrisk_core::{PatientIntake, Result, RiskAssessment};
use std::path::Path;

use crate::classifier::RiskClassifier;
use crate::manifest::ModelManifest;

/// A loaded model plus its manifest, ready to score intake records.
///
/// Loading is the only fallible setup step; scoring afterwards touches no
/// files. One scorer can serve any number of requests.
#[derive(Debug)]
pub struct RiskScorer {
    classifier: RiskClassifier,
    manifest: ModelManifest,
}

impl RiskScorer {
    /// Load the model artifact stored in `dir`.
    ///
    /// The manifest is read first and its schema checked against the
    /// canonical one, so a stale or foreign artifact fails here rather than
    /// at scoring time.
    pub fn load(dir: &Path) -> Result<Self> {
        let manifest = ModelManifest::load(dir)?;
        let weights = dir.join(&manifest.model_file);
        let classifier = RiskClassifier::load(&weights, &Device::Cpu)?;
        tracing::info!(
            model = %weights.display(),
            test_accuracy = manifest.test_accuracy,
            "Risk model loaded"
        );
        Ok(Self {
            classifier,
            manifest,
        })
    }

    /// Score one intake record.
    pub fn score(&self, intake: &PatientIntake) -> Result<RiskAssessment> {
        self.score_vector(&intake.encode())
    }

    /// Score a raw feature vector in canonical column order.
    pub fn score_vector(&self, features: &[f32]) -> Result<RiskAssessment> {
        let positive = self.classifier.predict(features)?;
        Ok(RiskAssessment::from_percentage(positive * 100.0))
    }

    /// Manifest of the loaded artifact.
    #[must_use]
    pub fn manifest(&self) -> &ModelManifest {
        &self.manifest
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
