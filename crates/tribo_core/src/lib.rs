//! Tribology model core
//!
//! Shared building blocks for the lubricant tribology predictor: the input
//! feature schema, single-table feature handling, preprocessing, the
//! multi-output random forest and the on-disk artifact format used by both
//! the offline trainer and the prediction service.
//!
//! Modules:
//! - `schema`: Declared input fields, aliases and target names
//! - `table`: Named-column feature tables with missing-value sentinels
//! - `alignment`: Mapping alias-keyed records onto an expected column order
//! - `preprocess`: Standard scaling, one-hot encoding and column transformer
//! - `tree`: Regression tree nodes and traversal
//! - `forest`: Random forest and multi-output regressor
//! - `pipeline`: Preprocessor + regressor bundle with column checks
//! - `artifact`: Artifact and feature-order manifest persistence
//! - `serde_canon`: Canonical JSON and BLAKE3 hashing

pub mod alignment;
pub mod artifact;
pub mod errors;
pub mod forest;
pub mod pipeline;
pub mod preprocess;
pub mod schema;
pub mod serde_canon;
pub mod table;
pub mod tree;
pub mod types;

pub use alignment::{align_record, AlignedRecord};
pub use artifact::{
    load_manifest, load_pipeline, manifest_path_for, save_artifact, ArtifactError,
    EvaluationReport, FeatureManifest, LoadedArtifact, TargetMetrics, MANIFEST_FORMAT_VERSION,
};
pub use errors::CoreError;
pub use forest::{MultiOutputRegressor, RandomForest};
pub use pipeline::{Pipeline, PIPELINE_FORMAT_VERSION};
pub use preprocess::{ColumnTransformer, OneHotEncoder, StandardScaler, Transformer, TransformerEntry};
pub use schema::{
    tribology_schema, FeatureField, FeatureKind, FeatureSchema, CATEGORICAL_FEATURE,
    SAMPLE_ID_COLUMN, TARGET_COLUMNS,
};
pub use table::{FeatureTable, FeatureValue};
pub use tree::{Node, Tree};
pub use types::TribologyPrediction;

/// Crate version string recorded in manifests and health reports
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
