//! Random forest ensembles
//!
//! A `RandomForest` averages its trees; a `MultiOutputRegressor` holds one
//! forest per target and returns their predictions in target order.

use serde::{Deserialize, Serialize};

use crate::errors::{CoreError, Result};
use crate::tree::Tree;

/// Bagged ensemble of regression trees
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RandomForest {
    pub trees: Vec<Tree>,
}

impl RandomForest {
    pub fn new(trees: Vec<Tree>) -> Self {
        Self { trees }
    }

    /// Mean of the tree outputs
    pub fn predict(&self, features: &[f64]) -> Result<f64> {
        if self.trees.is_empty() {
            return Err(CoreError::InvalidModel("forest has no trees".into()));
        }

        let mut sum = 0.0;
        for (i, tree) in self.trees.iter().enumerate() {
            sum += tree.evaluate(features).ok_or_else(|| {
                CoreError::Inference(format!(
                    "tree {i} could not evaluate a vector of {} features",
                    features.len()
                ))
            })?;
        }

        Ok(sum / self.trees.len() as f64)
    }

    pub fn num_trees(&self) -> usize {
        self.trees.len()
    }
}

/// One independent forest per output
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MultiOutputRegressor {
    pub estimators: Vec<RandomForest>,
}

impl MultiOutputRegressor {
    pub fn new(estimators: Vec<RandomForest>) -> Self {
        Self { estimators }
    }

    pub fn n_outputs(&self) -> usize {
        self.estimators.len()
    }

    pub fn predict(&self, features: &[f64]) -> Result<Vec<f64>> {
        self.estimators
            .iter()
            .map(|forest| forest.predict(features))
            .collect()
    }

    /// Check every tree and that no split reads past `n_features`
    pub fn validate(&self, n_features: usize) -> Result<()> {
        if self.estimators.is_empty() {
            return Err(CoreError::InvalidModel("regressor has no estimators".into()));
        }

        for (e, forest) in self.estimators.iter().enumerate() {
            if forest.trees.is_empty() {
                return Err(CoreError::InvalidModel(format!("estimator {e} has no trees")));
            }
            for (t, tree) in forest.trees.iter().enumerate() {
                tree.validate().map_err(|err| {
                    CoreError::InvalidModel(format!("estimator {e} tree {t}: {err}"))
                })?;
                if let Some(max) = tree.max_feature_index() {
                    if max >= n_features {
                        return Err(CoreError::InvalidModel(format!(
                            "estimator {e} tree {t} splits on feature {max}, but only {n_features} are produced"
                        )));
                    }
                }
            }
        }

        Ok(())
    }
}
