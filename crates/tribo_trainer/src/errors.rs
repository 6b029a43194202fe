use std::path::PathBuf;
use thiserror::Error;
use tribo_core::{ArtifactError, CoreError};

/// Errors returned by the trainer.
#[derive(Debug, Error)]
pub enum TrainerError {
    #[error("training data not found at {}", .0.display())]
    DataMissing(PathBuf),

    #[error("training data schema error: {0}")]
    Schema(String),

    #[error("dataset error: {0}")]
    Dataset(String),

    #[error("training error: {0}")]
    Training(String),

    #[error(transparent)]
    Core(#[from] CoreError),

    #[error(transparent)]
    Artifact(#[from] ArtifactError),
}
