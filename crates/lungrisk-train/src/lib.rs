//! Training pipeline for the lungrisk model.
//!
//! Turns a survey CSV into a persisted model artifact: load and encode the
//! dataset, split off a held-out test partition, fit the logistic regression
//! classifier, evaluate it, and write the weights, manifest, and accuracy
//! report.
//!
//! # Modules
//!
//! - [`data`] — CSV loading, schema matching, splitting, batch iteration
//! - [`metrics`] — confusion-matrix tally for the held-out evaluation
//! - [`trainer`] — the end-to-end training run

pub mod data;
pub mod metrics;
pub mod trainer;

/// Re-export commonly used types for trainer callers.
pub mod prelude {
    pub use crate::data::{load_dataset, split_dataset, BatchIterator, DataSplit, Dataset};
    pub use crate::metrics::ValidationMetrics;
    pub use crate::trainer::{train, TrainOutcome, ACCURACY_FILE};
}
