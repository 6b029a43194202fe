//! Feature preprocessing
//!
//! A column transformer holds an ordered list of named transformers, each
//! owning a list of input columns. Output features are produced transformer
//! by transformer, in registration order:
//!
//! - `standard_scaler`: `(x - mean) / scale`; missing values pass through as NaN
//! - `one_hot`: one indicator per known category; unknown or missing
//!   categories encode as all zeros
//! - `passthrough`: values copied unchanged
//! - `drop`: columns ignored

use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashMap, HashSet};

use crate::errors::{CoreError, Result};
use crate::table::{FeatureTable, FeatureValue};

/// Per-column standardization parameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StandardScaler {
    pub mean: Vec<f64>,
    pub scale: Vec<f64>,
}

impl StandardScaler {
    /// Fit on column-major values; zero-variance columns get a unit scale
    pub fn fit(columns: &[Vec<f64>]) -> Self {
        let mut mean = Vec::with_capacity(columns.len());
        let mut scale = Vec::with_capacity(columns.len());

        for values in columns {
            if values.is_empty() {
                mean.push(0.0);
                scale.push(1.0);
                continue;
            }
            let n = values.len() as f64;
            let m = values.iter().sum::<f64>() / n;
            let var = values.iter().map(|v| (v - m) * (v - m)).sum::<f64>() / n;
            let std = var.sqrt();

            mean.push(m);
            scale.push(if std > f64::EPSILON { std } else { 1.0 });
        }

        Self { mean, scale }
    }

    pub fn transform_value(&self, idx: usize, value: f64) -> f64 {
        (value - self.mean[idx]) / self.scale[idx]
    }
}

/// Per-column category vocabularies
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OneHotEncoder {
    pub categories: Vec<Vec<String>>,
}

impl OneHotEncoder {
    /// Fit on column-major values; categories are kept sorted
    pub fn fit(columns: &[Vec<String>]) -> Self {
        let categories = columns
            .iter()
            .map(|values| {
                values
                    .iter()
                    .cloned()
                    .collect::<BTreeSet<_>>()
                    .into_iter()
                    .collect()
            })
            .collect();

        Self { categories }
    }

    pub fn output_width(&self) -> usize {
        self.categories.iter().map(Vec::len).sum()
    }

    fn encode_into(&self, idx: usize, value: Option<&str>, out: &mut Vec<f64>) {
        let known = &self.categories[idx];
        let hit = value.and_then(|v| known.iter().position(|c| c == v));
        out.extend((0..known.len()).map(|i| if Some(i) == hit { 1.0 } else { 0.0 }));
    }
}

/// A fitted transformer
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Transformer {
    StandardScaler(StandardScaler),
    OneHot(OneHotEncoder),
    Passthrough,
    Drop,
}

/// A named transformer bound to its input columns
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransformerEntry {
    pub name: String,
    pub transformer: Transformer,
    pub columns: Vec<String>,
}

impl TransformerEntry {
    fn output_width(&self) -> usize {
        match &self.transformer {
            Transformer::StandardScaler(_) | Transformer::Passthrough => self.columns.len(),
            Transformer::OneHot(encoder) => encoder.output_width(),
            Transformer::Drop => 0,
        }
    }
}

/// Ordered set of column transformers
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ColumnTransformer {
    pub transformers: Vec<TransformerEntry>,
}

impl ColumnTransformer {
    /// Fit a scaler over `numerical` and an encoder over `categorical`.
    /// Any other table column is registered under a dropping remainder.
    pub fn fit(table: &FeatureTable, numerical: &[String], categorical: &[String]) -> Result<Self> {
        let mut numeric_values = Vec::with_capacity(numerical.len());
        for column in numerical {
            let idx = require_column(table, column)?;
            let mut values = Vec::with_capacity(table.n_rows());
            for row in table.rows() {
                match &row[idx] {
                    FeatureValue::Number(v) if v.is_finite() => values.push(*v),
                    other => {
                        return Err(CoreError::InvalidValue {
                            column: column.clone(),
                            reason: format!("cannot fit scaler on {other:?}"),
                        })
                    }
                }
            }
            numeric_values.push(values);
        }

        let mut category_values = Vec::with_capacity(categorical.len());
        for column in categorical {
            let idx = require_column(table, column)?;
            let mut values = Vec::with_capacity(table.n_rows());
            for row in table.rows() {
                match &row[idx] {
                    FeatureValue::Category(s) => values.push(s.clone()),
                    other => {
                        return Err(CoreError::InvalidValue {
                            column: column.clone(),
                            reason: format!("cannot fit encoder on {other:?}"),
                        })
                    }
                }
            }
            category_values.push(values);
        }

        let used: HashSet<&String> = numerical.iter().chain(categorical).collect();
        let remainder: Vec<String> = table
            .columns()
            .iter()
            .filter(|c| !used.contains(c))
            .cloned()
            .collect();

        Ok(Self {
            transformers: vec![
                TransformerEntry {
                    name: "num".into(),
                    transformer: Transformer::StandardScaler(StandardScaler::fit(&numeric_values)),
                    columns: numerical.to_vec(),
                },
                TransformerEntry {
                    name: "cat".into(),
                    transformer: Transformer::OneHot(OneHotEncoder::fit(&category_values)),
                    columns: categorical.to_vec(),
                },
                TransformerEntry {
                    name: "remainder".into(),
                    transformer: Transformer::Drop,
                    columns: remainder,
                },
            ],
        })
    }

    /// Input columns consumed by the transformers, in registration order.
    /// Dropped transformers are skipped; repeats keep their first position.
    pub fn feature_order(&self) -> Vec<String> {
        let mut seen = HashSet::new();
        self.transformers
            .iter()
            .filter(|entry| entry.transformer != Transformer::Drop)
            .flat_map(|entry| entry.columns.iter())
            .filter(|column| seen.insert(column.as_str()))
            .cloned()
            .collect()
    }

    /// Number of features produced per row
    pub fn output_width(&self) -> usize {
        self.transformers.iter().map(TransformerEntry::output_width).sum()
    }

    /// Check parameter vectors match their column lists
    pub fn validate(&self) -> Result<()> {
        for entry in &self.transformers {
            let expected = entry.columns.len();
            let actual = match &entry.transformer {
                Transformer::StandardScaler(s) => {
                    if s.mean.len() != s.scale.len() {
                        return Err(CoreError::InvalidModel(format!(
                            "transformer '{}' has {} means but {} scales",
                            entry.name,
                            s.mean.len(),
                            s.scale.len()
                        )));
                    }
                    if s.scale.iter().any(|v| !v.is_finite() || *v == 0.0) {
                        return Err(CoreError::InvalidModel(format!(
                            "transformer '{}' has a zero or non-finite scale",
                            entry.name
                        )));
                    }
                    s.mean.len()
                }
                Transformer::OneHot(e) => e.categories.len(),
                Transformer::Passthrough | Transformer::Drop => expected,
            };
            if actual != expected {
                return Err(CoreError::InvalidModel(format!(
                    "transformer '{}' is fitted on {} columns but lists {}",
                    entry.name, actual, expected
                )));
            }
        }
        Ok(())
    }

    /// Transform every row of `table` into a dense feature vector
    pub fn transform(&self, table: &FeatureTable) -> Result<Vec<Vec<f64>>> {
        let index: HashMap<&str, usize> = table
            .columns()
            .iter()
            .enumerate()
            .map(|(i, c)| (c.as_str(), i))
            .collect();

        let width = self.output_width();
        let mut out = Vec::with_capacity(table.n_rows());

        for row in table.rows() {
            let mut features = Vec::with_capacity(width);

            for entry in &self.transformers {
                for (col_idx, column) in entry.columns.iter().enumerate() {
                    if entry.transformer == Transformer::Drop {
                        break;
                    }
                    let cell = index
                        .get(column.as_str())
                        .map(|&i| &row[i])
                        .ok_or_else(|| {
                            CoreError::ColumnMismatch(format!("column '{column}' not in input"))
                        })?;

                    match &entry.transformer {
                        Transformer::StandardScaler(scaler) => {
                            let v = numeric_cell(column, cell)?;
                            features.push(scaler.transform_value(col_idx, v));
                        }
                        Transformer::Passthrough => features.push(numeric_cell(column, cell)?),
                        Transformer::OneHot(encoder) => {
                            let value = match cell {
                                FeatureValue::Category(s) => Some(s.as_str()),
                                FeatureValue::Missing => None,
                                FeatureValue::Number(_) => {
                                    return Err(CoreError::InvalidValue {
                                        column: column.clone(),
                                        reason: "expected a category".into(),
                                    })
                                }
                            };
                            encoder.encode_into(col_idx, value, &mut features);
                        }
                        Transformer::Drop => {}
                    }
                }
            }

            out.push(features);
        }

        Ok(out)
    }
}

fn require_column(table: &FeatureTable, column: &str) -> Result<usize> {
    table
        .column_index(column)
        .ok_or_else(|| CoreError::ColumnMismatch(format!("column '{column}' not in table")))
}

fn numeric_cell(column: &str, cell: &FeatureValue) -> Result<f64> {
    match cell {
        FeatureValue::Number(v) => Ok(*v),
        FeatureValue::Missing => Ok(f64::NAN),
        FeatureValue::Category(_) => Err(CoreError::InvalidValue {
            column: column.to_string(),
            reason: "expected a number".into(),
        }),
    }
}
