//! Risk model for the lungrisk pipeline.
//!
//! Wraps a single-layer logistic regression classifier built on candle,
//! together with the manifest that binds each persisted artifact to the
//! feature schema it was trained with.
//!
//! # Modules
//!
//! - [`classifier`] — model architecture, forward pass, and weight loading
//! - [`manifest`] — versioned artifact metadata written next to the weights
//! - [`scorer`] — load a persisted model and score intake records

pub mod classifier;
pub mod manifest;
pub mod scorer;

pub use classifier::{RiskClassifier, MODEL_FILE};
pub use manifest::{ModelManifest, CLASS_LABELS, MANIFEST_FILE};
pub use scorer::RiskScorer;
