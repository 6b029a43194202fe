//! Tribo Trainer - Deterministic offline random forest trainer
//!
//! Fits the preprocessing + multi-output random forest pipeline on a CSV
//! dataset and writes the artifact together with its feature-order manifest.

pub mod cart;
pub mod dataset;
pub mod deterministic;
pub mod errors;
pub mod metrics;
pub mod trainer;

use std::path::Path;
use tribo_core::{save_artifact, FeatureManifest, Pipeline};

pub use cart::{CartBuilder, TreeConfig};
pub use dataset::Dataset;
pub use deterministic::{derive_seed, LcgRng, SplitTieBreaker};
pub use errors::TrainerError;
pub use trainer::{evaluate, ForestTrainer, TrainedModel, TrainingParams};

/// Result of a full training run
#[derive(Debug, Clone)]
pub struct TrainingOutcome {
    pub pipeline: Pipeline,
    pub manifest: FeatureManifest,
    /// `(column, min, max)` for each numeric feature of the loaded dataset
    pub feature_ranges: Vec<(String, f64, f64)>,
}

/// Train from a CSV file and write the artifact plus manifest.
///
/// Nothing is written unless loading and training succeed.
pub fn train_and_save(
    data_path: &Path,
    artifact_path: &Path,
    params: TrainingParams,
) -> Result<TrainingOutcome, TrainerError> {
    let dataset = Dataset::from_csv(data_path)?;
    tracing::info!(
        samples = dataset.len(),
        features = dataset.feature_count(),
        "dataset loaded"
    );

    let feature_ranges = dataset.feature_ranges();
    let seed = params.seed;
    let trained = ForestTrainer::new(params).train(&dataset)?;

    let manifest = FeatureManifest::for_pipeline(
        &trained.pipeline,
        dataset.numerical_features.clone(),
        dataset.categorical_features.clone(),
        VERSION,
        seed,
        Some(trained.evaluation),
    );
    let manifest = save_artifact(artifact_path, &trained.pipeline, manifest)?;

    Ok(TrainingOutcome {
        pipeline: trained.pipeline,
        manifest,
        feature_ranges,
    })
}

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
