//! Dataset loading, deterministic splitting, and batch iteration.
//!
//! The loader matches CSV columns to the canonical schema by name, not by
//! position, so a reordered export still trains correctly and a file with
//! the wrong columns is rejected before any fitting happens. Header and cell
//! whitespace is stripped on read.

use candle_core::{DType, Device, Tensor};
use lungrisk_core::{
    LungRiskError, Result, Sex, FEATURE_COUNT, FEATURE_NAMES, GENDER_COLUMN, LABEL_COLUMN,
};
use rand::seq::SliceRandom;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use std::path::Path;

// ---------------------------------------------------------------------------
// Dataset
// ---------------------------------------------------------------------------

/// In-memory dataset: a row-major feature matrix plus binary labels.
#[derive(Debug, Clone)]
pub struct Dataset {
    /// Feature values in canonical column order, `rows * FEATURE_COUNT` long.
    pub features: Vec<f32>,
    /// One 0/1 label per row.
    pub labels: Vec<i64>,
    /// Number of data rows.
    pub rows: usize,
}

impl Dataset {
    /// Build the `[rows, 27]` input tensor and `[rows]` i64 label tensor.
    pub fn to_tensors(&self, device: &Device) -> Result<(Tensor, Tensor)> {
        let inputs = Tensor::from_vec(self.features.clone(), (self.rows, FEATURE_COUNT), device)
            .map_err(|e| LungRiskError::Model(format!("Failed to create input tensor: {e}")))?;
        let labels = Tensor::new(self.labels.as_slice(), device)
            .map_err(|e| LungRiskError::Model(format!("Failed to create label tensor: {e}")))?;
        Ok((inputs, labels))
    }

    /// Rows labeled positive.
    #[must_use]
    pub fn positive_rows(&self) -> usize {
        self.labels.iter().filter(|&&label| label == 1).count()
    }

    /// Rows labeled negative.
    #[must_use]
    pub fn negative_rows(&self) -> usize {
        self.rows - self.positive_rows()
    }
}

/// Load and encode a survey CSV.
///
/// The header must contain exactly the canonical feature columns plus the
/// label column, in any order. A missing label column is reported as
/// [`LungRiskError::MissingLabel`]; all other header problems are schema
/// errors. Cell problems are dataset errors naming the 1-based data row.
pub fn load_dataset(path: &Path) -> Result<Dataset> {
    let mut reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .from_path(path)
        .map_err(|e| {
            LungRiskError::Dataset(format!("Failed to open dataset {}: {e}", path.display()))
        })?;

    let headers = reader
        .headers()
        .map_err(|e| {
            LungRiskError::Dataset(format!("Failed to read dataset header: {e}"))
        })?
        .clone();
    let columns: Vec<&str> = headers.iter().collect();

    let label_position = columns
        .iter()
        .position(|column| *column == LABEL_COLUMN)
        .ok_or_else(|| LungRiskError::MissingLabel {
            column: LABEL_COLUMN.to_string(),
        })?;

    let mut feature_positions = Vec::with_capacity(FEATURE_COUNT);
    for name in FEATURE_NAMES {
        let position = columns
            .iter()
            .position(|column| *column == name)
            .ok_or_else(|| {
                LungRiskError::Schema(format!("dataset is missing feature column '{name}'"))
            })?;
        feature_positions.push(position);
    }

    if columns.len() != FEATURE_COUNT + 1 {
        return Err(LungRiskError::Schema(format!(
            "dataset has {} columns (expected {})",
            columns.len(),
            FEATURE_COUNT + 1
        )));
    }

    let mut features: Vec<f32> = Vec::new();
    let mut labels: Vec<i64> = Vec::new();

    for (row_index, record) in reader.records().enumerate() {
        let row = row_index + 1;
        let record = record.map_err(|e| {
            LungRiskError::Dataset(format!("Failed to read dataset row {row}: {e}"))
        })?;

        let label_cell = record.get(label_position).ok_or_else(|| {
            LungRiskError::Dataset(format!("row {row} is missing the '{LABEL_COLUMN}' value"))
        })?;
        labels.push(parse_label(label_cell, row)?);

        for (&position, name) in feature_positions.iter().zip(FEATURE_NAMES.iter()) {
            let cell = record.get(position).ok_or_else(|| {
                LungRiskError::Dataset(format!("row {row} is missing the '{name}' value"))
            })?;
            features.push(parse_feature(cell, name, row)?);
        }
    }

    let rows = labels.len();
    if rows == 0 {
        return Err(LungRiskError::Dataset(format!(
            "dataset {} contains no data rows",
            path.display()
        )));
    }

    tracing::debug!(rows, path = %path.display(), "Dataset parsed");
    Ok(Dataset {
        features,
        labels,
        rows,
    })
}

fn parse_label(cell: &str, row: usize) -> Result<i64> {
    let value: f64 = cell.parse().map_err(|_| {
        LungRiskError::Dataset(format!("row {row} has invalid label '{cell}'"))
    })?;
    if value == 0.0 {
        Ok(0)
    } else if value == 1.0 {
        Ok(1)
    } else {
        Err(LungRiskError::Dataset(format!(
            "row {row} has non-binary label '{cell}'"
        )))
    }
}

fn parse_feature(cell: &str, column: &str, row: usize) -> Result<f32> {
    if column == GENDER_COLUMN {
        let sex: Sex = cell
            .parse()
            .map_err(|e| LungRiskError::Dataset(format!("row {row}: {e}")))?;
        return Ok(sex.encode());
    }

    let value: f32 = cell.parse().map_err(|_| {
        LungRiskError::Dataset(format!(
            "row {row} has invalid value '{cell}' for column '{column}'"
        ))
    })?;
    if !value.is_finite() {
        return Err(LungRiskError::Dataset(format!(
            "row {row} has non-finite value for column '{column}'"
        )));
    }
    Ok(value)
}

// ---------------------------------------------------------------------------
// Train/test split
// ---------------------------------------------------------------------------

/// Train/test split over pre-built tensors.
pub struct DataSplit {
    pub train_inputs: Tensor,
    pub train_labels: Tensor,
    pub test_inputs: Tensor,
    pub test_labels: Tensor,
    pub train_indices: Vec<usize>,
    pub test_indices: Vec<usize>,
}

/// Split rows into train and held-out test partitions.
///
/// The row order is shuffled with a ChaCha8 RNG seeded from `seed`, so the
/// same seed always produces the same partition. The test partition gets
/// `ceil(rows * test_ratio)` rows, clamped so both partitions are non-empty.
pub fn split_dataset(
    inputs: &Tensor,
    labels: &Tensor,
    test_ratio: f64,
    seed: u64,
) -> Result<DataSplit> {
    let n = inputs
        .dim(0)
        .map_err(|e| LungRiskError::Model(format!("Failed to read input rows: {e}")))?;
    if n < 2 {
        return Err(LungRiskError::Dataset(format!(
            "at least two rows are required to split a dataset (got {n})"
        )));
    }

    let labels_vec: Vec<i64> = labels
        .to_vec1()
        .map_err(|e| LungRiskError::Model(format!("Failed to read labels: {e}")))?;

    let mut order: Vec<usize> = (0..n).collect();
    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    order.shuffle(&mut rng);

    let test_count = ((n as f64 * test_ratio).ceil() as usize).clamp(1, n - 1);
    let test_indices: Vec<usize> = order[..test_count].to_vec();
    let train_indices: Vec<usize> = order[test_count..].to_vec();

    let device = inputs.device().clone();
    let train_inputs = gather_rows(inputs, &train_indices, &device)?;
    let test_inputs = gather_rows(inputs, &test_indices, &device)?;

    let train_labels_vec: Vec<i64> = train_indices.iter().map(|&i| labels_vec[i]).collect();
    let test_labels_vec: Vec<i64> = test_indices.iter().map(|&i| labels_vec[i]).collect();

    let train_labels = Tensor::new(train_labels_vec.as_slice(), &device)
        .map_err(|e| LungRiskError::Model(format!("Failed to create train label tensor: {e}")))?;
    let test_labels = Tensor::new(test_labels_vec.as_slice(), &device)
        .map_err(|e| LungRiskError::Model(format!("Failed to create test label tensor: {e}")))?;

    tracing::debug!(
        train = train_indices.len(),
        test = test_indices.len(),
        seed,
        "Dataset split"
    );

    Ok(DataSplit {
        train_inputs,
        train_labels,
        test_inputs,
        test_labels,
        train_indices,
        test_indices,
    })
}

fn gather_rows(tensor: &Tensor, indices: &[usize], device: &Device) -> Result<Tensor> {
    if indices.is_empty() {
        let cols = tensor
            .dim(1)
            .map_err(|e| LungRiskError::Model(format!("Failed to read input columns: {e}")))?;
        return Tensor::zeros((0, cols), DType::F32, device)
            .map_err(|e| LungRiskError::Model(format!("Failed to create empty tensor: {e}")));
    }
    let idx: Vec<u32> = indices.iter().map(|&i| i as u32).collect();
    let idx_tensor = Tensor::new(idx.as_slice(), device)
        .map_err(|e| LungRiskError::Model(format!("Failed to create index tensor: {e}")))?;
    tensor
        .index_select(&idx_tensor, 0)
        .map_err(|e| LungRiskError::Model(format!("Failed to gather rows: {e}")))
}

// ---------------------------------------------------------------------------
// Batch iteration
// ---------------------------------------------------------------------------

/// Mini-batch iterator over pre-loaded tensors. Reshuffles indices each epoch.
pub struct BatchIterator {
    inputs: Tensor,
    labels: Tensor,
    indices: Vec<usize>,
    batch_size: usize,
    pos: usize,
}

impl BatchIterator {
    pub fn new(inputs: Tensor, labels: Tensor, batch_size: usize) -> Self {
        let n = inputs.dim(0).unwrap_or(0);
        Self {
            inputs,
            labels,
            indices: (0..n).collect(),
            batch_size: batch_size.max(1),
            pos: 0,
        }
    }

    /// Reset to a fresh pass whose order is a pure function of `(seed, epoch)`.
    pub fn reshuffle(&mut self, seed: u64, epoch: usize) {
        let mut rng = ChaCha8Rng::seed_from_u64(seed.wrapping_add(epoch as u64));
        self.indices = (0..self.indices.len()).collect();
        self.indices.shuffle(&mut rng);
        self.pos = 0;
    }

    /// Returns the next mini-batch, or `None` once the epoch is exhausted.
    pub fn next_batch(&mut self) -> Result<Option<(Tensor, Tensor)>> {
        let n = self.indices.len();
        if self.pos >= n {
            return Ok(None);
        }

        let end = (self.pos + self.batch_size).min(n);
        let batch_idx: Vec<u32> = self.indices[self.pos..end]
            .iter()
            .map(|&i| i as u32)
            .collect();
        self.pos = end;

        let device = self.inputs.device().clone();
        let idx_tensor = Tensor::new(batch_idx.as_slice(), &device)
            .map_err(|e| LungRiskError::Model(format!("Failed to create batch index: {e}")))?;
        let batch_inputs = self
            .inputs
            .index_select(&idx_tensor, 0)
            .map_err(|e| LungRiskError::Model(format!("Failed to gather batch inputs: {e}")))?;
        let batch_labels = self
            .labels
            .index_select(&idx_tensor, 0)
            .map_err(|e| LungRiskError::Model(format!("Failed to gather batch labels: {e}")))?;

        Ok(Some((batch_inputs, batch_labels)))
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn header() -> String {
        let mut columns: Vec<&str> = FEATURE_NAMES.to_vec();
        columns.push(LABEL_COLUMN);
        columns.join(",")
    }

    fn csv_row(age: f32, gender: &str, label: i64) -> String {
        let mut cells: Vec<String> = vec!["0".to_string(); FEATURE_COUNT];
        cells[0] = age.to_string();
        cells[26] = gender.to_string();
        cells.push(label.to_string());
        cells.join(",")
    }

    fn write_csv(content: &str) -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        write!(file, "{content}").unwrap();
        file
    }

    fn sample_csv(rows: usize) -> String {
        let mut lines = vec![header()];
        for i in 0..rows {
            let gender = if i % 2 == 0 { "male" } else { "female" };
            lines.push(csv_row(20.0 + i as f32, gender, (i % 2) as i64));
        }
        lines.join("\n")
    }

    #[test]
    fn test_load_small_csv() {
        let file = write_csv(&sample_csv(4));
        let dataset = load_dataset(file.path()).unwrap();

        assert_eq!(dataset.rows, 4);
        assert_eq!(dataset.labels, vec![0, 1, 0, 1]);
        assert_eq!(dataset.features.len(), 4 * FEATURE_COUNT);
        // First row: age 20, male.
        assert!((dataset.features[0] - 20.0).abs() < f32::EPSILON);
        assert!((dataset.features[26] - 1.0).abs() < f32::EPSILON);
        // Second row: female.
        assert!(dataset.features[FEATURE_COUNT + 26].abs() < f32::EPSILON);
        assert_eq!(dataset.positive_rows(), 2);
        assert_eq!(dataset.negative_rows(), 2);
    }

    #[test]
    fn test_header_and_cell_whitespace_is_trimmed() {
        let padded_header: String = header()
            .split(',')
            .map(|c| format!(" {c} "))
            .collect::<Vec<_>>()
            .join(",");
        let content = format!("{padded_header}\n{}", csv_row(40.0, " male ", 1));
        let file = write_csv(&content);

        let dataset = load_dataset(file.path()).unwrap();
        assert_eq!(dataset.rows, 1);
        assert!((dataset.features[26] - 1.0).abs() < f32::EPSILON);
    }

    #[test]
    fn test_columns_matched_by_name_not_position() {
        // Label first, gender second, remaining features in canonical order.
        let mut columns = vec![LABEL_COLUMN, GENDER_COLUMN];
        columns.extend(FEATURE_NAMES.iter().filter(|&&c| c != GENDER_COLUMN));
        let mut cells = vec!["1".to_string(), "female".to_string()];
        cells.extend(std::iter::repeat("7".to_string()).take(FEATURE_COUNT - 1));
        let content = format!("{}\n{}", columns.join(","), cells.join(","));
        let file = write_csv(&content);

        let dataset = load_dataset(file.path()).unwrap();
        assert_eq!(dataset.labels, vec![1]);
        // Gender still lands in slot 26 and all numeric features in their slots.
        assert!(dataset.features[26].abs() < f32::EPSILON);
        assert!((dataset.features[0] - 7.0).abs() < f32::EPSILON);
    }

    #[test]
    fn test_missing_label_column_is_specific_error() {
        let content = format!("{}\n{}", FEATURE_NAMES.join(","), vec!["0"; FEATURE_COUNT].join(","));
        let file = write_csv(&content);

        let err = load_dataset(file.path()).unwrap_err();
        match err {
            LungRiskError::MissingLabel { column } => assert_eq!(column, LABEL_COLUMN),
            other => panic!("expected MissingLabel, got: {other}"),
        }
    }

    #[test]
    fn test_missing_feature_column_rejected() {
        let mut columns: Vec<&str> = FEATURE_NAMES.iter().filter(|&&c| c != "bmi").copied().collect();
        columns.push(LABEL_COLUMN);
        let content = format!("{}\n{}", columns.join(","), vec!["0"; columns.len()].join(","));
        let file = write_csv(&content);

        let err = load_dataset(file.path()).unwrap_err();
        assert!(matches!(err, LungRiskError::Schema(_)), "got: {err}");
        assert!(err.to_string().contains("bmi"));
    }

    #[test]
    fn test_extra_column_rejected() {
        let content = format!(
            "{},notes\n{},hello",
            header(),
            csv_row(30.0, "male", 0)
        );
        let file = write_csv(&content);

        let err = load_dataset(file.path()).unwrap_err();
        assert!(matches!(err, LungRiskError::Schema(_)), "got: {err}");
    }

    #[test]
    fn test_unknown_gender_value_is_located_error() {
        let content = format!(
            "{}\n{}\n{}",
            header(),
            csv_row(30.0, "male", 0),
            csv_row(40.0, "other", 1)
        );
        let file = write_csv(&content);

        let err = load_dataset(file.path()).unwrap_err();
        let message = err.to_string();
        assert!(message.contains("row 2"), "got: {message}");
        assert!(message.contains("unrecognized gender"), "got: {message}");
    }

    #[test]
    fn test_non_numeric_cell_rejected() {
        let mut row = csv_row(30.0, "male", 0);
        row = row.replacen("30", "thirty", 1);
        let content = format!("{}\n{row}", header());
        let file = write_csv(&content);

        let err = load_dataset(file.path()).unwrap_err();
        assert!(err.to_string().contains("age"), "got: {err}");
    }

    #[test]
    fn test_non_binary_label_rejected() {
        let content = format!("{}\n{}", header(), csv_row(30.0, "male", 2));
        let file = write_csv(&content);

        let err = load_dataset(file.path()).unwrap_err();
        assert!(err.to_string().contains("non-binary"), "got: {err}");
    }

    #[test]
    fn test_header_only_dataset_rejected() {
        let file = write_csv(&header());
        let err = load_dataset(file.path()).unwrap_err();
        assert!(err.to_string().contains("no data rows"), "got: {err}");
    }

    #[test]
    fn test_split_is_deterministic_for_a_seed() {
        let file = write_csv(&sample_csv(10));
        let dataset = load_dataset(file.path()).unwrap();
        let device = Device::Cpu;
        let (inputs, labels) = dataset.to_tensors(&device).unwrap();

        let first = split_dataset(&inputs, &labels, 0.2, 42).unwrap();
        let second = split_dataset(&inputs, &labels, 0.2, 42).unwrap();

        assert_eq!(first.train_indices, second.train_indices);
        assert_eq!(first.test_indices, second.test_indices);
    }

    #[test]
    fn test_split_sizes_and_coverage() {
        let file = write_csv(&sample_csv(10));
        let dataset = load_dataset(file.path()).unwrap();
        let device = Device::Cpu;
        let (inputs, labels) = dataset.to_tensors(&device).unwrap();

        let split = split_dataset(&inputs, &labels, 0.2, 42).unwrap();
        assert_eq!(split.test_indices.len(), 2);
        assert_eq!(split.train_indices.len(), 8);

        let mut all: Vec<usize> = split
            .train_indices
            .iter()
            .chain(split.test_indices.iter())
            .copied()
            .collect();
        all.sort_unstable();
        assert_eq!(all, (0..10).collect::<Vec<_>>());

        assert_eq!(split.train_inputs.dims(), &[8, FEATURE_COUNT]);
        assert_eq!(split.test_inputs.dims(), &[2, FEATURE_COUNT]);
    }

    #[test]
    fn test_split_rejects_single_row() {
        let file = write_csv(&sample_csv(1));
        let dataset = load_dataset(file.path()).unwrap();
        let device = Device::Cpu;
        let (inputs, labels) = dataset.to_tensors(&device).unwrap();

        assert!(split_dataset(&inputs, &labels, 0.2, 42).is_err());
    }

    #[test]
    fn test_batch_iterator_exhausts() {
        let device = Device::Cpu;
        let inputs = Tensor::zeros((10, 4), DType::F32, &device).unwrap();
        let labels = Tensor::zeros(10, DType::I64, &device).unwrap();

        let mut iter = BatchIterator::new(inputs, labels, 3);
        iter.reshuffle(42, 0);

        let mut count = 0;
        while iter.next_batch().unwrap().is_some() {
            count += 1;
        }
        assert_eq!(count, 4); // ceil(10/3) = 4
    }

    #[test]
    fn test_reshuffle_depends_only_on_seed_and_epoch() {
        let device = Device::Cpu;
        let labels_vec: Vec<i64> = (0..10).collect();
        let inputs = Tensor::zeros((10, 4), DType::F32, &device).unwrap();
        let labels = Tensor::new(labels_vec.as_slice(), &device).unwrap();

        let collect_order = |iter: &mut BatchIterator| {
            let mut order = Vec::new();
            while let Some((_, batch_labels)) = iter.next_batch().unwrap() {
                order.extend(batch_labels.to_vec1::<i64>().unwrap());
            }
            order
        };

        let mut first = BatchIterator::new(inputs.clone(), labels.clone(), 4);
        first.reshuffle(42, 3);
        let first_order = collect_order(&mut first);

        // A second iterator reaches epoch 3 after visiting another epoch first.
        let mut second = BatchIterator::new(inputs, labels, 4);
        second.reshuffle(42, 7);
        let _ = collect_order(&mut second);
        second.reshuffle(42, 3);
        let second_order = collect_order(&mut second);

        assert_eq!(first_order, second_order);
    }
}
