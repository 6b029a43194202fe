//! Random forest trainer
//!
//! Fits the column transformer on the training split, then grows one
//! bootstrap forest per target over the transformed matrix. Every tree draws
//! its bootstrap sample from an RNG seeded by `(seed, target, tree)`, so the
//! result depends only on the data and the parameters.

use tribo_core::{
    ColumnTransformer, EvaluationReport, MultiOutputRegressor, Pipeline, RandomForest,
    TargetMetrics, Tree,
};

use crate::cart::{CartBuilder, TreeConfig};
use crate::dataset::Dataset;
use crate::deterministic::{derive_seed, LcgRng};
use crate::errors::TrainerError;
use crate::metrics::{r2, rmse};

/// Forest training configuration
#[derive(Clone, Debug, PartialEq)]
pub struct TrainingParams {
    pub n_estimators: usize,
    pub max_depth: Option<usize>,
    pub min_samples_split: usize,
    pub min_samples_leaf: usize,
    /// Share of rows held out for evaluation
    pub test_fraction: f64,
    pub seed: u64,
}

impl Default for TrainingParams {
    fn default() -> Self {
        Self {
            n_estimators: 100,
            max_depth: None,
            min_samples_split: 2,
            min_samples_leaf: 1,
            test_fraction: 0.2,
            seed: 42,
        }
    }
}

impl TrainingParams {
    pub fn validate(&self) -> Result<(), TrainerError> {
        if self.n_estimators == 0 {
            return Err(TrainerError::Training("n_estimators must be at least 1".into()));
        }
        if self.min_samples_split < 2 {
            return Err(TrainerError::Training("min_samples_split must be at least 2".into()));
        }
        if self.min_samples_leaf == 0 {
            return Err(TrainerError::Training("min_samples_leaf must be at least 1".into()));
        }
        if self.max_depth == Some(0) {
            return Err(TrainerError::Training("max_depth must be at least 1".into()));
        }
        Ok(())
    }

    fn tree_config(&self) -> TreeConfig {
        TreeConfig {
            max_depth: self.max_depth,
            min_samples_split: self.min_samples_split,
            min_samples_leaf: self.min_samples_leaf,
        }
    }
}

/// A fitted pipeline with its holdout evaluation
#[derive(Debug, Clone)]
pub struct TrainedModel {
    pub pipeline: Pipeline,
    pub evaluation: EvaluationReport,
}

/// Multi-output random forest trainer
pub struct ForestTrainer {
    params: TrainingParams,
}

impl ForestTrainer {
    pub fn new(params: TrainingParams) -> Self {
        Self { params }
    }

    pub fn params(&self) -> &TrainingParams {
        &self.params
    }

    /// Split, fit on the training rows and evaluate on the holdout
    pub fn train(&self, dataset: &Dataset) -> Result<TrainedModel, TrainerError> {
        self.params.validate()?;

        let (train, test) = dataset.train_test_split(self.params.test_fraction, self.params.seed)?;
        tracing::info!(
            train_samples = train.len(),
            test_samples = test.len(),
            "holdout split"
        );

        let pipeline = self.fit(&train)?;
        let targets = evaluate(&pipeline, &test)?;

        for metrics in &targets {
            tracing::info!(
                target = %metrics.target,
                rmse = format_args!("{:.4}", metrics.rmse),
                r2 = format_args!("{:.4}", metrics.r2),
                "holdout evaluation"
            );
        }

        Ok(TrainedModel {
            pipeline,
            evaluation: EvaluationReport {
                train_samples: train.len(),
                test_samples: test.len(),
                targets,
            },
        })
    }

    /// Fit preprocessor and forests on every row of `dataset`
    pub fn fit(&self, dataset: &Dataset) -> Result<Pipeline, TrainerError> {
        self.params.validate()?;
        if dataset.is_empty() {
            return Err(TrainerError::Training("cannot fit on an empty dataset".into()));
        }

        let preprocessor = ColumnTransformer::fit(
            &dataset.table,
            &dataset.numerical_features,
            &dataset.categorical_features,
        )?;
        let matrix = preprocessor.transform(&dataset.table)?;
        tracing::debug!(
            rows = matrix.len(),
            width = preprocessor.output_width(),
            "preprocessor fitted"
        );

        let tree_config = self.params.tree_config();
        let mut estimators = Vec::with_capacity(dataset.target_names.len());

        for (target_idx, target_name) in dataset.target_names.iter().enumerate() {
            let targets = dataset.target_column(target_idx);
            let builder = CartBuilder::new(&matrix, &targets, tree_config.clone());

            let trees: Vec<Tree> = (0..self.params.n_estimators)
                .map(|tree_idx| {
                    let mut rng = LcgRng::new(derive_seed(
                        self.params.seed,
                        &[target_idx as u64, tree_idx as u64],
                    ));
                    builder.build(&rng.bootstrap(matrix.len()))
                })
                .collect();

            let node_count: usize = trees.iter().map(|t| t.nodes.len()).sum();
            tracing::info!(
                target = %target_name,
                trees = trees.len(),
                nodes = node_count,
                "forest trained"
            );

            estimators.push(RandomForest::new(trees));
        }

        let pipeline = Pipeline::new(
            dataset.table.columns().to_vec(),
            dataset.target_names.clone(),
            preprocessor,
            MultiOutputRegressor::new(estimators),
        );
        pipeline.validate()?;

        Ok(pipeline)
    }
}

/// Per-target RMSE and R² of `pipeline` on `dataset`
pub fn evaluate(pipeline: &Pipeline, dataset: &Dataset) -> Result<Vec<TargetMetrics>, TrainerError> {
    let predictions = pipeline.predict(&dataset.table)?;

    Ok(dataset
        .target_names
        .iter()
        .enumerate()
        .map(|(idx, name)| {
            let actual = dataset.target_column(idx);
            let predicted: Vec<f64> = predictions.iter().map(|row| row[idx]).collect();
            TargetMetrics {
                target: name.clone(),
                rmse: rmse(&actual, &predicted),
                r2: r2(&actual, &predicted),
            }
        })
        .collect())
}
