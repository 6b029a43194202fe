//! Prediction service error types

use thiserror::Error;
use tribo_core::ArtifactError;

/// Prediction service errors
#[derive(Error, Debug)]
pub enum ServiceError {
    #[error("Model not loaded.")]
    ModelNotLoaded,

    #[error("Error in input data structure: {0}")]
    InvalidInput(String),

    #[error("Prediction processing error: {0}")]
    Prediction(String),

    #[error("Model load failed: {0}")]
    Load(#[from] ArtifactError),

    #[error("Feature order unavailable: {0}")]
    FeatureOrder(String),

    #[error("Configuration error: {0}")]
    Config(String),
}
