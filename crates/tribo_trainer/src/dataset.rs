//! CSV dataset loading and splitting
//!
//! One row per sample; the header names every column. The four target
//! columns and the optional sample identifier are separated from the
//! features; every remaining column is a feature, numeric except for the
//! base-oil category, which is placed after the numeric columns.

use std::collections::HashSet;
use std::path::Path;

use tribo_core::{
    FeatureTable, FeatureValue, CATEGORICAL_FEATURE, SAMPLE_ID_COLUMN, TARGET_COLUMNS,
};

use crate::deterministic::LcgRng;
use crate::errors::TrainerError;

/// Training dataset with named feature columns and multi-output targets
#[derive(Clone, Debug)]
pub struct Dataset {
    pub table: FeatureTable,
    /// Row-major target values, one entry per `target_names`
    pub targets: Vec<Vec<f64>>,
    pub target_names: Vec<String>,
    pub numerical_features: Vec<String>,
    pub categorical_features: Vec<String>,
}

impl Dataset {
    /// Load dataset from a CSV file with a header row
    pub fn from_csv<P: AsRef<Path>>(path: P) -> Result<Self, TrainerError> {
        let path = path.as_ref();
        if !path.is_file() {
            return Err(TrainerError::DataMissing(path.to_path_buf()));
        }

        let mut reader = csv::ReaderBuilder::new()
            .trim(csv::Trim::All)
            .from_path(path)
            .map_err(|err| TrainerError::Dataset(format!("failed to open CSV: {err}")))?;

        let headers: Vec<String> = reader
            .headers()
            .map_err(|err| TrainerError::Dataset(format!("failed to read header: {err}")))?
            .iter()
            .map(str::to_string)
            .collect();

        let mut seen = HashSet::new();
        for header in &headers {
            if !seen.insert(header.as_str()) {
                return Err(TrainerError::Dataset(format!("duplicate column '{header}'")));
            }
        }

        let mut target_idx = Vec::with_capacity(TARGET_COLUMNS.len());
        for target in TARGET_COLUMNS {
            let idx = headers
                .iter()
                .position(|h| h == target)
                .ok_or_else(|| TrainerError::Dataset(format!("missing target column '{target}'")))?;
            target_idx.push(idx);
        }

        // Numeric columns keep their file order; the category goes last, matching
        // the order the column transformer consumes them in.
        let (categorical_idx, mut feature_idx): (Vec<usize>, Vec<usize>) = (0..headers.len())
            .filter(|i| !target_idx.contains(i) && headers[*i] != SAMPLE_ID_COLUMN)
            .partition(|&i| headers[i] == CATEGORICAL_FEATURE);
        if categorical_idx.is_empty() {
            return Err(TrainerError::Schema(format!(
                "'{CATEGORICAL_FEATURE}' not found in features"
            )));
        }
        feature_idx.extend(categorical_idx);
        let feature_columns: Vec<String> = feature_idx.iter().map(|&i| headers[i].clone()).collect();

        let mut table = FeatureTable::new(feature_columns.clone())?;
        let mut targets = Vec::new();

        for (row_idx, record) in reader.records().enumerate() {
            // Header is line 1
            let line = row_idx + 2;
            let record = record
                .map_err(|err| TrainerError::Dataset(format!("line {line}: {err}")))?;

            if record.iter().all(str::is_empty) {
                continue;
            }

            let mut row = Vec::with_capacity(feature_idx.len());
            for (&i, column) in feature_idx.iter().zip(&feature_columns) {
                let cell = record.get(i).unwrap_or("");
                if column == CATEGORICAL_FEATURE {
                    if cell.is_empty() {
                        return Err(TrainerError::Dataset(format!(
                            "line {line}, column '{column}': empty category"
                        )));
                    }
                    row.push(FeatureValue::Category(cell.to_string()));
                } else {
                    row.push(FeatureValue::Number(parse_number(cell, line, column)?));
                }
            }

            let mut target_row = Vec::with_capacity(target_idx.len());
            for (&i, name) in target_idx.iter().zip(TARGET_COLUMNS) {
                target_row.push(parse_number(record.get(i).unwrap_or(""), line, name)?);
            }

            table.push_row(row)?;
            targets.push(target_row);
        }

        if targets.is_empty() {
            return Err(TrainerError::Dataset("dataset is empty".into()));
        }

        let numerical_features = feature_columns
            .iter()
            .filter(|c| c.as_str() != CATEGORICAL_FEATURE)
            .cloned()
            .collect();

        Ok(Self {
            table,
            targets,
            target_names: TARGET_COLUMNS.iter().map(|t| t.to_string()).collect(),
            numerical_features,
            categorical_features: vec![CATEGORICAL_FEATURE.to_string()],
        })
    }

    /// Get number of samples
    pub fn len(&self) -> usize {
        self.targets.len()
    }

    /// Check if dataset is empty
    pub fn is_empty(&self) -> bool {
        self.targets.is_empty()
    }

    pub fn feature_count(&self) -> usize {
        self.table.n_columns()
    }

    /// Values of one target across all rows
    pub fn target_column(&self, target: usize) -> Vec<f64> {
        self.targets.iter().map(|row| row[target]).collect()
    }

    /// Keep only the rows at `indices`
    pub fn select(&self, indices: &[usize]) -> Self {
        Self {
            table: self.table.select_rows(indices),
            targets: indices.iter().map(|&i| self.targets[i].clone()).collect(),
            target_names: self.target_names.clone(),
            numerical_features: self.numerical_features.clone(),
            categorical_features: self.categorical_features.clone(),
        }
    }

    /// Seeded holdout split: returns `(train, test)`.
    /// The test set holds `ceil(test_fraction * len)` rows.
    pub fn train_test_split(&self, test_fraction: f64, seed: u64) -> Result<(Self, Self), TrainerError> {
        if !(test_fraction > 0.0 && test_fraction < 1.0) {
            return Err(TrainerError::Dataset(format!(
                "test fraction must be in (0, 1), got {test_fraction}"
            )));
        }

        let n = self.len();
        let n_test = (test_fraction * n as f64).ceil() as usize;
        if n_test == 0 || n_test >= n {
            return Err(TrainerError::Dataset(format!(
                "cannot split {n} samples with test fraction {test_fraction}"
            )));
        }

        let mut indices: Vec<usize> = (0..n).collect();
        LcgRng::new(seed).shuffle(&mut indices);
        let (test_idx, train_idx) = indices.split_at(n_test);

        Ok((self.select(train_idx), self.select(test_idx)))
    }

    /// Min and max of every numeric feature, for logging
    pub fn feature_ranges(&self) -> Vec<(String, f64, f64)> {
        self.numerical_features
            .iter()
            .filter_map(|name| {
                let idx = self.table.column_index(name)?;
                let (min, max) = self.table.rows().iter().fold(
                    (f64::INFINITY, f64::NEG_INFINITY),
                    |(lo, hi), row| match row[idx] {
                        FeatureValue::Number(v) => (lo.min(v), hi.max(v)),
                        _ => (lo, hi),
                    },
                );
                Some((name.clone(), min, max))
            })
            .collect()
    }
}

fn parse_number(cell: &str, line: usize, column: &str) -> Result<f64, TrainerError> {
    match cell.parse::<f64>() {
        Ok(v) if v.is_finite() => Ok(v),
        _ => Err(TrainerError::Dataset(format!(
            "line {line}, column '{column}': invalid number '{cell}'"
        ))),
    }
}
