//! Preprocessing + regression pipeline
//!
//! The pipeline remembers the exact input columns it was fitted on and
//! refuses tables whose header differs in names or order.

use serde::{Deserialize, Serialize};
use std::collections::HashSet;

use crate::errors::{CoreError, Result};
use crate::forest::MultiOutputRegressor;
use crate::preprocess::ColumnTransformer;
use crate::table::FeatureTable;

/// Current artifact layout version
pub const PIPELINE_FORMAT_VERSION: u32 = 1;

/// A fitted column transformer followed by a multi-output forest
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Pipeline {
    pub format_version: u32,

    /// Input columns seen at fit time, in order
    pub feature_names_in: Vec<String>,

    /// Output names, one per estimator
    pub target_names: Vec<String>,

    pub preprocessor: ColumnTransformer,
    pub regressor: MultiOutputRegressor,
}

impl Pipeline {
    pub fn new(
        feature_names_in: Vec<String>,
        target_names: Vec<String>,
        preprocessor: ColumnTransformer,
        regressor: MultiOutputRegressor,
    ) -> Self {
        Self {
            format_version: PIPELINE_FORMAT_VERSION,
            feature_names_in,
            target_names,
            preprocessor,
            regressor,
        }
    }

    /// Validate pipeline structure
    pub fn validate(&self) -> Result<()> {
        if self.format_version != PIPELINE_FORMAT_VERSION {
            return Err(CoreError::InvalidModel(format!(
                "unsupported pipeline format version: {}",
                self.format_version
            )));
        }

        let mut seen = HashSet::new();
        for name in &self.feature_names_in {
            if !seen.insert(name.as_str()) {
                return Err(CoreError::InvalidModel(format!(
                    "input column '{name}' listed twice"
                )));
            }
        }

        for column in self.preprocessor.feature_order() {
            if !seen.contains(column.as_str()) {
                return Err(CoreError::InvalidModel(format!(
                    "preprocessor consumes unknown column '{column}'"
                )));
            }
        }

        self.preprocessor.validate()?;
        self.regressor.validate(self.preprocessor.output_width())?;

        if self.regressor.n_outputs() != self.target_names.len() {
            return Err(CoreError::InvalidModel(format!(
                "{} estimators for {} targets",
                self.regressor.n_outputs(),
                self.target_names.len()
            )));
        }

        Ok(())
    }

    /// Require the table header to equal the fitted column list
    pub fn check_columns(&self, table: &FeatureTable) -> Result<()> {
        let given = table.columns();
        if given == self.feature_names_in.as_slice() {
            return Ok(());
        }

        if given.len() != self.feature_names_in.len() {
            return Err(CoreError::ColumnMismatch(format!(
                "expected {} columns, got {}",
                self.feature_names_in.len(),
                given.len()
            )));
        }

        let (pos, (expected, actual)) = self
            .feature_names_in
            .iter()
            .zip(given)
            .enumerate()
            .find(|(_, (e, a))| e != a)
            .ok_or_else(|| CoreError::ColumnMismatch("columns differ".into()))?;

        Err(CoreError::ColumnMismatch(format!(
            "column {pos} should be '{expected}' but is '{actual}'"
        )))
    }

    /// Predict every row of `table`; one output vector per row
    pub fn predict(&self, table: &FeatureTable) -> Result<Vec<Vec<f64>>> {
        self.check_columns(table)?;

        let rows = self.preprocessor.transform(table)?;
        let mut outputs = Vec::with_capacity(rows.len());

        for features in rows {
            let prediction = self.regressor.predict(&features)?;
            if let Some(pos) = prediction.iter().position(|v| !v.is_finite()) {
                return Err(CoreError::Inference(format!(
                    "non-finite prediction for '{}'",
                    self.target_names.get(pos).map(String::as_str).unwrap_or("?")
                )));
            }
            outputs.push(prediction);
        }

        Ok(outputs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::forest::RandomForest;
    use crate::preprocess::{OneHotEncoder, StandardScaler, Transformer, TransformerEntry};
    use crate::table::FeatureValue;
    use crate::tree::{Node, Tree};

    fn strings(names: &[&str]) -> Vec<String> {
        names.iter().map(|s| s.to_string()).collect()
    }

    /// Two inputs: x (scaled with mean 0 / scale 1) and oil (a|b).
    /// Output 0 splits on x, output 1 splits on the "b" indicator.
    fn small_pipeline() -> Pipeline {
        let preprocessor = ColumnTransformer {
            transformers: vec![
                TransformerEntry {
                    name: "num".into(),
                    transformer: Transformer::StandardScaler(StandardScaler {
                        mean: vec![0.0],
                        scale: vec![1.0],
                    }),
                    columns: strings(&["x"]),
                },
                TransformerEntry {
                    name: "cat".into(),
                    transformer: Transformer::OneHot(OneHotEncoder {
                        categories: vec![strings(&["a", "b"])],
                    }),
                    columns: strings(&["oil"]),
                },
            ],
        };

        let by_x = Tree::new(vec![
            Node::internal(0, 0.0, 1, 2, 4, false),
            Node::leaf(1.0, 1),
            Node::leaf(2.0, 3),
        ]);
        let by_oil = Tree::new(vec![
            Node::internal(2, 0.5, 1, 2, 4, true),
            Node::leaf(10.0, 3),
            Node::leaf(20.0, 1),
        ]);

        Pipeline::new(
            strings(&["x", "oil"]),
            strings(&["t0", "t1"]),
            preprocessor,
            MultiOutputRegressor::new(vec![
                RandomForest::new(vec![by_x]),
                RandomForest::new(vec![by_oil]),
            ]),
        )
    }

    fn row(x: FeatureValue, oil: FeatureValue) -> FeatureTable {
        FeatureTable::single_row(strings(&["x", "oil"]), vec![x, oil]).unwrap()
    }

    #[test]
    fn test_validate_ok() {
        assert!(small_pipeline().validate().is_ok());
    }

    #[test]
    fn test_predict_known_values() {
        let pipeline = small_pipeline();
        let out = pipeline
            .predict(&row(FeatureValue::Number(-1.0), FeatureValue::Category("b".into())))
            .unwrap();
        assert_eq!(out, vec![vec![1.0, 20.0]]);
    }

    #[test]
    fn test_predict_with_missing_values() {
        let pipeline = small_pipeline();
        let out = pipeline
            .predict(&row(FeatureValue::Missing, FeatureValue::Missing))
            .unwrap();
        // x missing -> majority (right) child; oil missing -> all-zero -> left
        assert_eq!(out, vec![vec![2.0, 10.0]]);
    }

    #[test]
    fn test_unknown_category_encodes_as_zero() {
        let pipeline = small_pipeline();
        let out = pipeline
            .predict(&row(FeatureValue::Number(1.0), FeatureValue::Category("z".into())))
            .unwrap();
        assert_eq!(out[0][1], 10.0);
    }

    #[test]
    fn test_reordered_columns_rejected() {
        let pipeline = small_pipeline();
        let table = FeatureTable::single_row(
            strings(&["oil", "x"]),
            vec![FeatureValue::Category("a".into()), FeatureValue::Number(0.0)],
        )
        .unwrap();

        let err = pipeline.predict(&table).unwrap_err();
        assert!(matches!(err, CoreError::ColumnMismatch(_)));
    }

    #[test]
    fn test_extra_column_rejected() {
        let pipeline = small_pipeline();
        let table = FeatureTable::single_row(
            strings(&["x", "oil", "y"]),
            vec![
                FeatureValue::Number(0.0),
                FeatureValue::Category("a".into()),
                FeatureValue::Number(0.0),
            ],
        )
        .unwrap();

        assert!(matches!(pipeline.predict(&table), Err(CoreError::ColumnMismatch(_))));
    }

    #[test]
    fn test_validate_rejects_target_mismatch() {
        let mut pipeline = small_pipeline();
        pipeline.target_names.pop();
        assert!(pipeline.validate().is_err());
    }
}
