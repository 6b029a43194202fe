//! Model artifact and feature-order manifest persistence
//!
//! The artifact is the fitted [`Pipeline`] written as canonical JSON. Next to
//! it the trainer writes a versioned manifest recording the expected input
//! column order, the artifact's BLAKE3 hash and the holdout evaluation, so the
//! service never has to guess the order at startup.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::errors::CoreError;
use crate::pipeline::Pipeline;
use crate::serde_canon::{hash_bytes_hex, to_canonical_json};

/// Current manifest layout version
pub const MANIFEST_FORMAT_VERSION: u32 = 1;

/// Artifact errors
#[derive(Error, Debug)]
pub enum ArtifactError {
    #[error("file not found: {}", .0.display())]
    NotFound(PathBuf),

    #[error("I/O error on {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("JSON error in {}: {source}", path.display())]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("serialization error: {0}")]
    Serialize(#[from] serde_json::Error),

    #[error("invalid pipeline: {0}")]
    InvalidPipeline(#[from] CoreError),

    #[error("unsupported manifest format version: {0}")]
    UnsupportedManifest(u32),

    #[error("artifact hash mismatch: manifest records {expected}, file hashes to {actual}")]
    HashMismatch { expected: String, actual: String },

    #[error("manifest does not match artifact: {0}")]
    ManifestMismatch(String),
}

impl ArtifactError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, ArtifactError::NotFound(_))
    }
}

/// Holdout metrics for one target
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TargetMetrics {
    pub target: String,
    pub rmse: f64,
    pub r2: f64,
}

/// Holdout evaluation recorded at training time
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EvaluationReport {
    pub train_samples: usize,
    pub test_samples: usize,
    pub targets: Vec<TargetMetrics>,
}

/// Sidecar describing how to feed an artifact
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeatureManifest {
    pub format_version: u32,
    pub feature_order: Vec<String>,
    pub numerical_features: Vec<String>,
    pub categorical_features: Vec<String>,
    pub target_names: Vec<String>,
    /// BLAKE3 of the artifact file bytes, filled in on save
    pub model_hash: String,
    pub trainer_version: String,
    pub created_at: DateTime<Utc>,
    pub seed: u64,
    #[serde(default)]
    pub evaluation: Option<EvaluationReport>,
}

impl FeatureManifest {
    /// Describe a pipeline; the hash is set when the artifact is saved
    pub fn for_pipeline(
        pipeline: &Pipeline,
        numerical_features: Vec<String>,
        categorical_features: Vec<String>,
        trainer_version: &str,
        seed: u64,
        evaluation: Option<EvaluationReport>,
    ) -> Self {
        Self {
            format_version: MANIFEST_FORMAT_VERSION,
            feature_order: pipeline.feature_names_in.clone(),
            numerical_features,
            categorical_features,
            target_names: pipeline.target_names.clone(),
            model_hash: String::new(),
            trainer_version: trainer_version.to_string(),
            created_at: Utc::now(),
            seed,
            evaluation,
        }
    }

    /// Check this manifest belongs to `artifact`
    pub fn verify_against(&self, artifact: &LoadedArtifact) -> Result<(), ArtifactError> {
        if self.model_hash != artifact.hash {
            return Err(ArtifactError::HashMismatch {
                expected: self.model_hash.clone(),
                actual: artifact.hash.clone(),
            });
        }

        if self.feature_order != artifact.pipeline.feature_names_in {
            return Err(ArtifactError::ManifestMismatch(
                "feature order differs from the pipeline's fitted columns".into(),
            ));
        }

        if self.target_names != artifact.pipeline.target_names {
            return Err(ArtifactError::ManifestMismatch(
                "target names differ from the pipeline's outputs".into(),
            ));
        }

        Ok(())
    }
}

/// A validated pipeline with the hash of the bytes it was read from
#[derive(Debug, Clone)]
pub struct LoadedArtifact {
    pub pipeline: Pipeline,
    pub hash: String,
}

/// Manifest location for an artifact: `model.json` -> `model.manifest.json`
pub fn manifest_path_for(artifact_path: &Path) -> PathBuf {
    artifact_path.with_extension("manifest.json")
}

/// Write the pipeline as canonical JSON and its manifest next to it.
///
/// Returns the manifest with `model_hash` filled in.
pub fn save_artifact(
    artifact_path: &Path,
    pipeline: &Pipeline,
    mut manifest: FeatureManifest,
) -> Result<FeatureManifest, ArtifactError> {
    pipeline.validate()?;

    let json = to_canonical_json(pipeline)?;
    manifest.model_hash = hash_bytes_hex(json.as_bytes());

    if let Some(parent) = artifact_path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).map_err(|source| ArtifactError::Io {
            path: parent.to_path_buf(),
            source,
        })?;
    }

    write_file(artifact_path, json.as_bytes())?;

    let manifest_path = manifest_path_for(artifact_path);
    let manifest_json = serde_json::to_string_pretty(&manifest)?;
    write_file(&manifest_path, manifest_json.as_bytes())?;

    tracing::debug!(
        artifact = %artifact_path.display(),
        manifest = %manifest_path.display(),
        hash = %manifest.model_hash,
        "artifact written"
    );

    Ok(manifest)
}

/// Read, parse and validate a pipeline artifact
pub fn load_pipeline(path: &Path) -> Result<LoadedArtifact, ArtifactError> {
    let bytes = read_file(path)?;
    let hash = hash_bytes_hex(&bytes);

    let pipeline: Pipeline = serde_json::from_slice(&bytes).map_err(|source| ArtifactError::Json {
        path: path.to_path_buf(),
        source,
    })?;
    pipeline.validate()?;

    Ok(LoadedArtifact { pipeline, hash })
}

/// Read a manifest; `Ok(None)` when the file does not exist
pub fn load_manifest(path: &Path) -> Result<Option<FeatureManifest>, ArtifactError> {
    let bytes = match read_file(path) {
        Ok(bytes) => bytes,
        Err(ArtifactError::NotFound(_)) => return Ok(None),
        Err(err) => return Err(err),
    };

    let manifest: FeatureManifest =
        serde_json::from_slice(&bytes).map_err(|source| ArtifactError::Json {
            path: path.to_path_buf(),
            source,
        })?;

    if manifest.format_version != MANIFEST_FORMAT_VERSION {
        return Err(ArtifactError::UnsupportedManifest(manifest.format_version));
    }

    Ok(Some(manifest))
}

fn read_file(path: &Path) -> Result<Vec<u8>, ArtifactError> {
    fs::read(path).map_err(|source| match source.kind() {
        ErrorKind::NotFound => ArtifactError::NotFound(path.to_path_buf()),
        _ => ArtifactError::Io {
            path: path.to_path_buf(),
            source,
        },
    })
}

fn write_file(path: &Path, bytes: &[u8]) -> Result<(), ArtifactError> {
    fs::write(path, bytes).map_err(|source| ArtifactError::Io {
        path: path.to_path_buf(),
        source,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::forest::{MultiOutputRegressor, RandomForest};
    use crate::preprocess::{ColumnTransformer, StandardScaler, Transformer, TransformerEntry};
    use crate::tree::{Node, Tree};
    use tempfile::TempDir;

    fn tiny_pipeline() -> Pipeline {
        let preprocessor = ColumnTransformer {
            transformers: vec![TransformerEntry {
                name: "num".into(),
                transformer: Transformer::StandardScaler(StandardScaler {
                    mean: vec![0.25],
                    scale: vec![1.5],
                }),
                columns: vec!["x".into()],
            }],
        };
        let tree = Tree::new(vec![
            Node::internal(0, 0.1, 1, 2, 3, true),
            Node::leaf(0.123456789, 2),
            Node::leaf(-7.5, 1),
        ]);

        Pipeline::new(
            vec!["x".into()],
            vec!["y".into()],
            preprocessor,
            MultiOutputRegressor::new(vec![RandomForest::new(vec![tree])]),
        )
    }

    fn manifest_for(pipeline: &Pipeline) -> FeatureManifest {
        FeatureManifest::for_pipeline(pipeline, vec!["x".into()], vec![], "test", 42, None)
    }

    #[test]
    fn test_manifest_path() {
        assert_eq!(
            manifest_path_for(Path::new("/srv/trained_rf_model.json")),
            PathBuf::from("/srv/trained_rf_model.manifest.json")
        );
    }

    #[test]
    fn test_save_load_roundtrip() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("models").join("model.json");
        let pipeline = tiny_pipeline();

        let manifest = save_artifact(&path, &pipeline, manifest_for(&pipeline)).unwrap();
        let loaded = load_pipeline(&path).unwrap();
        let stored = load_manifest(&manifest_path_for(&path)).unwrap().unwrap();

        assert_eq!(loaded.pipeline, pipeline);
        assert_eq!(loaded.hash, manifest.model_hash);
        assert_eq!(stored, manifest);
        assert!(stored.verify_against(&loaded).is_ok());
    }

    #[test]
    fn test_missing_files() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("absent.json");

        assert!(load_pipeline(&path).unwrap_err().is_not_found());
        assert!(load_manifest(&path).unwrap().is_none());
    }

    #[test]
    fn test_corrupt_artifact() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("model.json");
        fs::write(&path, b"{ not json").unwrap();

        assert!(matches!(load_pipeline(&path), Err(ArtifactError::Json { .. })));
    }

    #[test]
    fn test_tampered_artifact_fails_hash_check() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("model.json");
        let pipeline = tiny_pipeline();
        save_artifact(&path, &pipeline, manifest_for(&pipeline)).unwrap();

        let mut other = tiny_pipeline();
        other.regressor.estimators[0].trees[0].nodes[2].leaf = Some(99.0);
        fs::write(&path, to_canonical_json(&other).unwrap()).unwrap();

        let loaded = load_pipeline(&path).unwrap();
        let manifest = load_manifest(&manifest_path_for(&path)).unwrap().unwrap();
        assert!(matches!(
            manifest.verify_against(&loaded),
            Err(ArtifactError::HashMismatch { .. })
        ));
    }

    #[test]
    fn test_manifest_order_must_match_pipeline() {
        let pipeline = tiny_pipeline();
        let mut manifest = manifest_for(&pipeline);
        let loaded = LoadedArtifact {
            pipeline: pipeline.clone(),
            hash: "abc".into(),
        };
        manifest.model_hash = "abc".into();
        manifest.feature_order = vec!["z".into()];

        assert!(matches!(
            manifest.verify_against(&loaded),
            Err(ArtifactError::ManifestMismatch(_))
        ));
    }

    #[test]
    fn test_invalid_pipeline_not_saved() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("model.json");
        let mut pipeline = tiny_pipeline();
        pipeline.target_names.clear();

        assert!(save_artifact(&path, &pipeline, manifest_for(&pipeline)).is_err());
        assert!(!path.exists());
    }

    #[test]
    fn test_unsupported_manifest_version() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("model.manifest.json");
        let mut manifest = manifest_for(&tiny_pipeline());
        manifest.format_version = 7;
        fs::write(&path, serde_json::to_string(&manifest).unwrap()).unwrap();

        assert!(matches!(
            load_manifest(&path),
            Err(ArtifactError::UnsupportedManifest(7))
        ));
    }
}
