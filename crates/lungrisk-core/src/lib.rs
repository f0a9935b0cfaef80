//! Core types, schema, and errors for the lungrisk pipeline.
//!
//! This crate contains the shared vocabulary between the trainer and the
//! risk scorer: the canonical feature schema, the categorical encodings, the
//! per-request intake record, the risk-tier policy, and the error types.

use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Feature schema
// ---------------------------------------------------------------------------

/// Number of predictor columns in the canonical schema.
pub const FEATURE_COUNT: usize = 27;

/// Name of the binary label column. The trainer aborts if it is absent.
pub const LABEL_COLUMN: &str = "LungCancer";

/// Name of the categorical gender column within the predictors.
pub const GENDER_COLUMN: &str = "gender";

/// Current schema version written into model manifests.
pub const SCHEMA_VERSION: u32 = 1;

/// Canonical predictor columns, in the exact order the model consumes them.
///
/// | Index | Column | Encoding |
/// |-------|--------|----------|
/// | 0 | age | years |
/// | 1 | smoking | 0/1 |
/// | 2 | smoking_duration | years |
/// | 3 | pack_years | count |
/// | 4 | secondhand_smoke | 0/1 |
/// | 5 | alcohol_consumption | 0/1 |
/// | 6 | exercise | 0/1 |
/// | 7 | diet | 0/1 |
/// | 8 | daily_water_intake | liters |
/// | 9 | yellow_fingers | 0/1 |
/// | 10 | anxiety | 0/1 |
/// | 11 | peer_pressure | 0/1 |
/// | 12 | chronic_disease | 0/1 |
/// | 13 | fatigue | 0/1 |
/// | 14 | allergy | 0/1 |
/// | 15 | wheezing | 0/1 |
/// | 16 | coughing | 0/1 |
/// | 17 | shortness_of_breath | 0/1 |
/// | 18 | chest_pain | 0/1 |
/// | 19 | previous_infections | 0/1 |
/// | 20 | genetic_disorders | 0/1 |
/// | 21 | family_history | 0/1 |
/// | 22 | pollution_exposure | 0/1 |
/// | 23 | occupation | 0/1 |
/// | 24 | bmi | kg/m2 |
/// | 25 | stress_level | 0/1/2 |
/// | 26 | gender | male=1, female=0 |
pub const FEATURE_NAMES: [&str; FEATURE_COUNT] = [
    "age",
    "smoking",
    "smoking_duration",
    "pack_years",
    "secondhand_smoke",
    "alcohol_consumption",
    "exercise",
    "diet",
    "daily_water_intake",
    "yellow_fingers",
    "anxiety",
    "peer_pressure",
    "chronic_disease",
    "fatigue",
    "allergy",
    "wheezing",
    "coughing",
    "shortness_of_breath",
    "chest_pain",
    "previous_infections",
    "genetic_disorders",
    "family_history",
    "pollution_exposure",
    "occupation",
    "bmi",
    "stress_level",
    "gender",
];

/// Named, versioned feature schema.
///
/// Binds a model artifact to the exact feature ordering and label column it
/// was trained with. Written into the model manifest by the trainer and
/// validated by the scorer at load time, so a vector/column mismatch is a
/// reported error instead of a silently wrong prediction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeatureSchema {
    /// Schema version; bumped whenever the column set or ordering changes.
    pub version: u32,
    /// Ordered predictor column names.
    pub columns: Vec<String>,
    /// Label column name.
    pub label: String,
}

impl FeatureSchema {
    /// The canonical schema this build of the pipeline understands.
    #[must_use]
    pub fn canonical() -> Self {
        Self {
            version: SCHEMA_VERSION,
            columns: FEATURE_NAMES.iter().map(|s| (*s).to_string()).collect(),
            label: LABEL_COLUMN.to_string(),
        }
    }

    /// Check this schema against the canonical one.
    ///
    /// Returns a [`LungRiskError::Schema`] naming the first discrepancy
    /// (version, label, column count, or column name/position).
    pub fn validate(&self) -> Result<()> {
        if self.version != SCHEMA_VERSION {
            return Err(LungRiskError::Schema(format!(
                "unsupported schema version {} (expected {SCHEMA_VERSION})",
                self.version
            )));
        }
        if self.label != LABEL_COLUMN {
            return Err(LungRiskError::Schema(format!(
                "unexpected label column '{}' (expected '{LABEL_COLUMN}')",
                self.label
            )));
        }
        if self.columns.len() != FEATURE_COUNT {
            return Err(LungRiskError::Schema(format!(
                "schema lists {} feature columns (expected {FEATURE_COUNT})",
                self.columns.len()
            )));
        }
        for (i, (have, want)) in self.columns.iter().zip(FEATURE_NAMES.iter()).enumerate() {
            if have != want {
                return Err(LungRiskError::Schema(format!(
                    "feature column {i} is '{have}' (expected '{want}')"
                )));
            }
        }
        Ok(())
    }
}

impl Default for FeatureSchema {
    fn default() -> Self {
        Self::canonical()
    }
}

// ---------------------------------------------------------------------------
// Categorical encodings
// ---------------------------------------------------------------------------

/// Gender as recorded in the dataset and on the intake form.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Sex {
    /// Encoded as `1`.
    Male,
    /// Encoded as `0`.
    Female,
}

impl Sex {
    /// Numeric encoding used in the feature vector.
    #[must_use]
    pub fn encode(self) -> f32 {
        match self {
            Self::Male => 1.0,
            Self::Female => 0.0,
        }
    }
}

impl std::fmt::Display for Sex {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Male => write!(f, "male"),
            Self::Female => write!(f, "female"),
        }
    }
}

impl std::str::FromStr for Sex {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "male" => Ok(Self::Male),
            "female" => Ok(Self::Female),
            _ => Err(format!("unrecognized gender value: {s}")),
        }
    }
}

// Deserialization routes through FromStr, so JSON intakes accept the same
// spellings as dataset cells.
impl<'de> Deserialize<'de> for Sex {
    fn deserialize<D>(deserializer: D) -> std::result::Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let value = String::deserialize(deserializer)?;
        value.parse().map_err(serde::de::Error::custom)
    }
}

/// Binary yes/no answer on the intake form.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum YesNo {
    /// Encoded as `1`.
    Yes,
    /// Encoded as `0`.
    No,
}

impl YesNo {
    /// Numeric encoding used in the feature vector.
    #[must_use]
    pub fn encode(self) -> f32 {
        match self {
            Self::Yes => 1.0,
            Self::No => 0.0,
        }
    }
}

impl std::fmt::Display for YesNo {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Yes => write!(f, "yes"),
            Self::No => write!(f, "no"),
        }
    }
}

impl std::str::FromStr for YesNo {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "yes" => Ok(Self::Yes),
            "no" => Ok(Self::No),
            _ => Err(format!("unrecognized yes/no value: {s}")),
        }
    }
}

impl<'de> Deserialize<'de> for YesNo {
    fn deserialize<D>(deserializer: D) -> std::result::Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let value = String::deserialize(deserializer)?;
        value.parse().map_err(serde::de::Error::custom)
    }
}

/// Three-state stress answer on the intake form.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum StressLevel {
    /// Encoded as `0`.
    Low,
    /// Encoded as `1`.
    Medium,
    /// Encoded as `2`.
    High,
}

impl StressLevel {
    /// Numeric encoding used in the feature vector.
    #[must_use]
    pub fn encode(self) -> f32 {
        match self {
            Self::Low => 0.0,
            Self::Medium => 1.0,
            Self::High => 2.0,
        }
    }
}

impl std::fmt::Display for StressLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Low => write!(f, "low"),
            Self::Medium => write!(f, "medium"),
            Self::High => write!(f, "high"),
        }
    }
}

impl std::str::FromStr for StressLevel {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "low" => Ok(Self::Low),
            "medium" => Ok(Self::Medium),
            "high" => Ok(Self::High),
            _ => Err(format!("unrecognized stress level: {s}")),
        }
    }
}

impl<'de> Deserialize<'de> for StressLevel {
    fn deserialize<D>(deserializer: D) -> std::result::Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let value = String::deserialize(deserializer)?;
        value.parse().map_err(serde::de::Error::custom)
    }
}

// ---------------------------------------------------------------------------
// Intake record
// ---------------------------------------------------------------------------

/// One subject's answers, collected once per scoring request.
///
/// Immutable by construction: build it, call [`PatientIntake::encode`], drop
/// it. Field order mirrors [`FEATURE_NAMES`]; `encode` is the only place the
/// answer-to-number conversion happens, so the trainer's dataset encoding and
/// the scorer's request encoding cannot drift apart.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PatientIntake {
    /// Age in years.
    pub age: f32,
    /// Current smoker.
    pub smoking: YesNo,
    /// Smoking duration in years.
    pub smoking_duration: f32,
    /// Pack years (packs per day times years smoked).
    pub pack_years: f32,
    /// Exposure to secondhand smoke.
    pub secondhand_smoke: YesNo,
    /// Regular alcohol consumption.
    pub alcohol_consumption: YesNo,
    /// Regular exercise (at least 30 minutes per day).
    pub exercise: YesNo,
    /// Healthy diet (fruits, vegetables, balanced nutrition).
    pub diet: YesNo,
    /// Daily water intake in liters.
    pub daily_water_intake: f32,
    /// Yellowed fingers.
    pub yellow_fingers: YesNo,
    /// Anxiety.
    pub anxiety: YesNo,
    /// Peer pressure.
    pub peer_pressure: YesNo,
    /// Chronic disease.
    pub chronic_disease: YesNo,
    /// Fatigue.
    pub fatigue: YesNo,
    /// Allergy.
    pub allergy: YesNo,
    /// Wheezing.
    pub wheezing: YesNo,
    /// Coughing.
    pub coughing: YesNo,
    /// Shortness of breath.
    pub shortness_of_breath: YesNo,
    /// Chest pain.
    pub chest_pain: YesNo,
    /// Previous lung infections.
    pub previous_infections: YesNo,
    /// Genetic disorders.
    pub genetic_disorders: YesNo,
    /// Family history of lung cancer.
    pub family_history: YesNo,
    /// Exposure to air pollution (city, factory).
    pub pollution_exposure: YesNo,
    /// Works in a high-risk occupation (mining, construction).
    pub occupation: YesNo,
    /// Body mass index.
    pub bmi: f32,
    /// Stress level.
    pub stress_level: StressLevel,
    /// Gender.
    pub gender: Sex,
}

impl PatientIntake {
    /// Encode the answers into the canonical feature vector.
    ///
    /// Positions follow [`FEATURE_NAMES`] exactly.
    #[must_use]
    pub fn encode(&self) -> [f32; FEATURE_COUNT] {
        [
            self.age,
            self.smoking.encode(),
            self.smoking_duration,
            self.pack_years,
            self.secondhand_smoke.encode(),
            self.alcohol_consumption.encode(),
            self.exercise.encode(),
            self.diet.encode(),
            self.daily_water_intake,
            self.yellow_fingers.encode(),
            self.anxiety.encode(),
            self.peer_pressure.encode(),
            self.chronic_disease.encode(),
            self.fatigue.encode(),
            self.allergy.encode(),
            self.wheezing.encode(),
            self.coughing.encode(),
            self.shortness_of_breath.encode(),
            self.chest_pain.encode(),
            self.previous_infections.encode(),
            self.genetic_disorders.encode(),
            self.family_history.encode(),
            self.pollution_exposure.encode(),
            self.occupation.encode(),
            self.bmi,
            self.stress_level.encode(),
            self.gender.encode(),
        ]
    }
}

// ---------------------------------------------------------------------------
// Risk tiers
// ---------------------------------------------------------------------------

/// Percentage at or above which a subject is at least medium risk.
pub const MEDIUM_RISK_FROM: f64 = 30.0;

/// Percentage at or above which a subject is high risk.
pub const HIGH_RISK_FROM: f64 = 70.0;

/// Coarse risk bucket derived from the predicted percentage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RiskTier {
    /// Percentage below [`MEDIUM_RISK_FROM`].
    Low,
    /// Percentage in `[MEDIUM_RISK_FROM, HIGH_RISK_FROM)`.
    Medium,
    /// Percentage at or above [`HIGH_RISK_FROM`].
    High,
}

impl RiskTier {
    /// Classify a percentage using the fixed half-open thresholds.
    ///
    /// `p < 30` is Low, `30 <= p < 70` is Medium, `p >= 70` is High.
    #[must_use]
    pub fn from_percentage(percentage: f64) -> Self {
        if percentage < MEDIUM_RISK_FROM {
            Self::Low
        } else if percentage < HIGH_RISK_FROM {
            Self::Medium
        } else {
            Self::High
        }
    }

    /// Display color used by presentation layers.
    #[must_use]
    pub fn color(self) -> &'static str {
        match self {
            Self::Low => "green",
            Self::Medium => "orange",
            Self::High => "red",
        }
    }

    /// Advisory message shown alongside the tier. Informational only.
    #[must_use]
    pub fn advisory(self) -> &'static str {
        match self {
            Self::Low => "You have a low chance of lung cancer, but maintain a healthy lifestyle.",
            Self::Medium => "You may want to schedule a check-up for a thorough evaluation.",
            Self::High => {
                "It is advised to consult a doctor immediately for further tests and preventive measures."
            }
        }
    }
}

impl std::fmt::Display for RiskTier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Low => write!(f, "Low"),
            Self::Medium => write!(f, "Medium"),
            Self::High => write!(f, "High"),
        }
    }
}

/// Result of scoring one feature vector.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RiskAssessment {
    /// Probability of the positive class, scaled to `[0, 100]`.
    pub percentage: f64,
    /// Tier derived from the percentage.
    pub tier: RiskTier,
}

impl RiskAssessment {
    /// Build an assessment from a percentage, deriving the tier.
    #[must_use]
    pub fn from_percentage(percentage: f64) -> Self {
        Self {
            percentage,
            tier: RiskTier::from_percentage(percentage),
        }
    }
}

impl std::fmt::Display for RiskAssessment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:.2}% ({})", self.percentage, self.tier)
    }
}

// ---------------------------------------------------------------------------
// Training settings
// ---------------------------------------------------------------------------

/// Settings for a training run.
///
/// Deserializable from YAML, with every field optional:
///
/// ```yaml
/// learning_rate: 0.05
/// max_epochs: 1000
/// seed: 42
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrainSettings {
    /// AdamW learning rate.
    #[serde(default = "default_learning_rate")]
    pub learning_rate: f64,
    /// AdamW weight decay (L2 penalty).
    #[serde(default = "default_weight_decay")]
    pub weight_decay: f64,
    /// Mini-batch size.
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,
    /// Epoch cap; enough for the convex logistic loss to converge.
    #[serde(default = "default_max_epochs")]
    pub max_epochs: usize,
    /// Fraction of rows held out for the test partition.
    #[serde(default = "default_test_ratio")]
    pub test_ratio: f64,
    /// Seed for the split shuffle and the per-epoch batch reshuffle.
    #[serde(default = "default_seed")]
    pub seed: u64,
}

fn default_learning_rate() -> f64 {
    0.05
}

fn default_weight_decay() -> f64 {
    1e-4
}

fn default_batch_size() -> usize {
    256
}

fn default_max_epochs() -> usize {
    1000
}

fn default_test_ratio() -> f64 {
    0.2
}

fn default_seed() -> u64 {
    42
}

impl Default for TrainSettings {
    fn default() -> Self {
        Self {
            learning_rate: default_learning_rate(),
            weight_decay: default_weight_decay(),
            batch_size: default_batch_size(),
            max_epochs: default_max_epochs(),
            test_ratio: default_test_ratio(),
            seed: default_seed(),
        }
    }
}

impl TrainSettings {
    /// Check the settings before a run starts.
    pub fn validate(&self) -> Result<()> {
        if !self.learning_rate.is_finite() || self.learning_rate <= 0.0 {
            return Err(LungRiskError::Config(format!(
                "learning_rate must be positive and finite (got {})",
                self.learning_rate
            )));
        }
        if !self.weight_decay.is_finite() || self.weight_decay < 0.0 {
            return Err(LungRiskError::Config(format!(
                "weight_decay must be non-negative and finite (got {})",
                self.weight_decay
            )));
        }
        if self.batch_size == 0 {
            return Err(LungRiskError::Config(
                "batch_size must be at least 1".to_string(),
            ));
        }
        if self.max_epochs == 0 {
            return Err(LungRiskError::Config(
                "max_epochs must be at least 1".to_string(),
            ));
        }
        if !(self.test_ratio > 0.0 && self.test_ratio < 1.0) {
            return Err(LungRiskError::Config(format!(
                "test_ratio must be strictly between 0 and 1 (got {})",
                self.test_ratio
            )));
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Error types
// ---------------------------------------------------------------------------

/// Core error types.
#[derive(thiserror::Error, Debug)]
pub enum LungRiskError {
    /// Malformed dataset content (unreadable file, bad cell, bad label value).
    #[error("Dataset error: {0}")]
    Dataset(String),

    /// The label column is absent from the dataset header.
    #[error("Missing label column '{column}' in dataset")]
    MissingLabel {
        /// The expected label column name.
        column: String,
    },

    /// Canonical-schema violation (columns, manifest, or vector length).
    #[error("Schema error: {0}")]
    Schema(String),

    /// Model construction, fitting, persistence, or inference error.
    #[error("Model error: {0}")]
    Model(String),

    /// Serialization / deserialization error.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Configuration error.
    #[error("Configuration error: {0}")]
    Config(String),
}

/// Convenience alias for `std::result::Result<T, LungRiskError>`.
pub type Result<T> = std::result::Result<T, LungRiskError>;

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
