//! Service context: the loaded model and its expected feature order
//!
//! Built once at startup and shared read-only by every request handler.
//! Loading moves through `Unloaded -> Loading -> Ready | LoadFailed`; a
//! failed load is final for the life of the process.

use serde::Serialize;
use serde_json::{Map, Value};
use tracing::{debug, error, info, warn};
use tribo_core::{
    align_record, load_manifest, load_pipeline, tribology_schema, FeatureManifest, Pipeline,
    TribologyPrediction,
};

use crate::config::ServiceConfig;
use crate::errors::ServiceError;

/// Model load state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum LoadState {
    Unloaded,
    Loading,
    Ready,
    LoadFailed,
}

/// Where the expected feature order came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FeatureOrderSource {
    /// The manifest written by the trainer
    Manifest,
    /// The column transformer's per-transformer column lists
    Preprocessor,
    /// The input schema's declared order
    Schema,
}

/// A validated pipeline and the column order requests are aligned to
#[derive(Debug, Clone)]
pub struct LoadedModel {
    pub pipeline: Pipeline,
    pub hash: String,
    pub feature_order: Vec<String>,
    pub order_source: FeatureOrderSource,
    pub manifest: Option<FeatureManifest>,
}

impl LoadedModel {
    /// Load the artifact and its manifest, and settle the feature order
    pub fn load(config: &ServiceConfig) -> Result<Self, ServiceError> {
        let artifact = load_pipeline(&config.model_path)?;
        info!(
            path = %config.model_path.display(),
            hash = %artifact.hash,
            "model artifact loaded"
        );

        let manifest_path = config.manifest_path();
        let manifest = load_manifest(&manifest_path)?;
        match &manifest {
            Some(manifest) => {
                manifest.verify_against(&artifact)?;
                debug!(path = %manifest_path.display(), "feature manifest verified");
            }
            None => warn!(
                path = %manifest_path.display(),
                "no feature manifest found; introspecting the preprocessor"
            ),
        }

        let (feature_order, order_source) =
            resolve_feature_order(&artifact.pipeline, manifest.as_ref(), config.strict_feature_order)?;

        Ok(Self {
            pipeline: artifact.pipeline,
            hash: artifact.hash,
            feature_order,
            order_source,
            manifest,
        })
    }
}

/// Pick the expected feature order: manifest, then preprocessor, then schema.
///
/// The schema fallback is refused when `strict` is set.
pub fn resolve_feature_order(
    pipeline: &Pipeline,
    manifest: Option<&FeatureManifest>,
    strict: bool,
) -> Result<(Vec<String>, FeatureOrderSource), ServiceError> {
    if let Some(manifest) = manifest.filter(|m| !m.feature_order.is_empty()) {
        return Ok((manifest.feature_order.clone(), FeatureOrderSource::Manifest));
    }

    let introspected = pipeline.preprocessor.feature_order();
    if !introspected.is_empty() {
        if introspected != pipeline.feature_names_in {
            warn!(
                order = ?introspected,
                fitted = ?pipeline.feature_names_in,
                "preprocessor column order differs from the pipeline's fitted columns"
            );
        }
        return Ok((introspected, FeatureOrderSource::Preprocessor));
    }

    if strict {
        return Err(ServiceError::FeatureOrder(
            "could not determine feature order from the model and strict_feature_order is set"
                .into(),
        ));
    }

    let fallback = tribology_schema().column_names();
    warn!(
        order = ?fallback,
        "could not determine feature order from the model; falling back to schema order"
    );
    Ok((fallback, FeatureOrderSource::Schema))
}

/// Immutable state shared by all request handlers
#[derive(Debug)]
pub struct ServiceContext {
    state: LoadState,
    model: Option<LoadedModel>,
    load_error: Option<String>,
}

impl ServiceContext {
    /// A context with nothing loaded
    pub fn unloaded() -> Self {
        Self {
            state: LoadState::Unloaded,
            model: None,
            load_error: None,
        }
    }

    /// A ready context around an already loaded model
    pub fn ready(model: LoadedModel) -> Self {
        Self {
            state: LoadState::Ready,
            model: Some(model),
            load_error: None,
        }
    }

    /// Run the startup load. Failure leaves the context degraded.
    pub fn load(config: &ServiceConfig) -> Self {
        let mut ctx = Self::unloaded();
        ctx.transition(LoadState::Loading);

        match LoadedModel::load(config) {
            Ok(model) => {
                info!(
                    source = ?model.order_source,
                    features = model.feature_order.len(),
                    "expected feature order recovered"
                );
                debug!(order = ?model.feature_order, "expected feature order");
                ctx.model = Some(model);
                ctx.transition(LoadState::Ready);
            }
            Err(err) => {
                error!(path = %config.model_path.display(), error = %err, "model could not be loaded");
                ctx.load_error = Some(err.to_string());
                ctx.transition(LoadState::LoadFailed);
            }
        }

        ctx
    }

    fn transition(&mut self, next: LoadState) {
        info!(from = ?self.state, to = ?next, "model load state");
        self.state = next;
    }

    pub fn state(&self) -> LoadState {
        self.state
    }

    pub fn is_ready(&self) -> bool {
        self.state == LoadState::Ready && self.model.is_some()
    }

    pub fn model(&self) -> Option<&LoadedModel> {
        self.model.as_ref()
    }

    pub fn load_error(&self) -> Option<&str> {
        self.load_error.as_deref()
    }

    /// Expected feature order; empty when degraded
    pub fn feature_order(&self) -> &[String] {
        self.model
            .as_ref()
            .map(|m| m.feature_order.as_slice())
            .unwrap_or(&[])
    }

    pub fn order_source(&self) -> Option<FeatureOrderSource> {
        self.model.as_ref().map(|m| m.order_source)
    }

    /// Align one record to the expected order and run the pipeline
    pub fn predict(&self, record: &Map<String, Value>) -> Result<TribologyPrediction, ServiceError> {
        let model = match (&self.state, &self.model) {
            (LoadState::Ready, Some(model)) => model,
            _ => return Err(ServiceError::ModelNotLoaded),
        };

        let aligned = align_record(&model.feature_order, record, tribology_schema())
            .map_err(|err| ServiceError::InvalidInput(err.to_string()))?;

        if !aligned.missing.is_empty() {
            warn!(missing = ?aligned.missing, "features missing from payload, filled with missing values");
        }
        debug!(columns = ?aligned.table.columns(), "feature table for prediction");

        let outputs = model
            .pipeline
            .predict(&aligned.table)
            .map_err(|err| ServiceError::Prediction(err.to_string()))?;
        let row = outputs
            .first()
            .ok_or_else(|| ServiceError::Prediction("model returned no rows".into()))?;

        TribologyPrediction::from_outputs(row).map_err(|err| ServiceError::Prediction(err.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::path::Path;
    use tempfile::TempDir;
    use tribo_core::{
        manifest_path_for, save_artifact, ColumnTransformer, MultiOutputRegressor, Node,
        OneHotEncoder, RandomForest, StandardScaler, Transformer, TransformerEntry, Tree,
    };

    fn strings(names: &[&str]) -> Vec<String> {
        names.iter().map(|s| s.to_string()).collect()
    }

    fn constant_forest(value: f64) -> RandomForest {
        RandomForest::new(vec![Tree::new(vec![
            Node::internal(0, 0.0, 1, 2, 2, true),
            Node::leaf(value, 1),
            Node::leaf(value + 1.0, 1),
        ])])
    }

    /// Scales "Load,N" and encodes Base_Oil; output `i` is `i` or `i + 1`
    fn small_pipeline() -> Pipeline {
        let preprocessor = ColumnTransformer {
            transformers: vec![
                TransformerEntry {
                    name: "num".into(),
                    transformer: Transformer::StandardScaler(StandardScaler {
                        mean: vec![200.0],
                        scale: vec![100.0],
                    }),
                    columns: strings(&["Load,N"]),
                },
                TransformerEntry {
                    name: "cat".into(),
                    transformer: Transformer::OneHot(OneHotEncoder {
                        categories: vec![strings(&["Group II", "Group IV"])],
                    }),
                    columns: strings(&["Base_Oil"]),
                },
            ],
        };

        Pipeline::new(
            strings(&["Load,N", "Base_Oil"]),
            strings(&tribo_core::TARGET_COLUMNS),
            preprocessor,
            MultiOutputRegressor::new((0..4).map(|i| constant_forest(i as f64)).collect()),
        )
    }

    fn manifest_for(pipeline: &Pipeline) -> FeatureManifest {
        FeatureManifest::for_pipeline(
            pipeline,
            strings(&["Load,N"]),
            strings(&["Base_Oil"]),
            "test",
            42,
            None,
        )
    }

    fn config_for(path: &Path) -> ServiceConfig {
        ServiceConfig {
            model_path: path.to_path_buf(),
            ..ServiceConfig::default()
        }
    }

    fn as_map(value: Value) -> Map<String, Value> {
        match value {
            Value::Object(map) => map,
            _ => panic!("expected object"),
        }
    }

    #[test]
    fn test_missing_artifact_degrades() {
        let dir = TempDir::new().unwrap();
        let ctx = ServiceContext::load(&config_for(&dir.path().join("absent.json")));

        assert_eq!(ctx.state(), LoadState::LoadFailed);
        assert!(!ctx.is_ready());
        assert!(ctx.feature_order().is_empty());
        assert!(ctx.load_error().is_some());
        assert!(matches!(
            ctx.predict(&Map::new()),
            Err(ServiceError::ModelNotLoaded)
        ));
    }

    #[test]
    fn test_manifest_is_primary_source() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("model.json");
        let pipeline = small_pipeline();
        save_artifact(&path, &pipeline, manifest_for(&pipeline)).unwrap();

        let ctx = ServiceContext::load(&config_for(&path));
        assert_eq!(ctx.state(), LoadState::Ready);
        assert_eq!(ctx.order_source(), Some(FeatureOrderSource::Manifest));
        assert_eq!(ctx.feature_order(), strings(&["Load,N", "Base_Oil"]).as_slice());
    }

    #[test]
    fn test_introspection_without_manifest() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("model.json");
        let pipeline = small_pipeline();
        save_artifact(&path, &pipeline, manifest_for(&pipeline)).unwrap();
        std::fs::remove_file(manifest_path_for(&path)).unwrap();

        let ctx = ServiceContext::load(&config_for(&path));
        assert_eq!(ctx.order_source(), Some(FeatureOrderSource::Preprocessor));
        assert_eq!(ctx.feature_order(), strings(&["Load,N", "Base_Oil"]).as_slice());
    }

    #[test]
    fn test_mismatched_manifest_fails_load() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("model.json");
        let pipeline = small_pipeline();
        save_artifact(&path, &pipeline, manifest_for(&pipeline)).unwrap();

        let mut other = small_pipeline();
        other.regressor.estimators[0] = constant_forest(9.0);
        let other_dir = TempDir::new().unwrap();
        let other_path = other_dir.path().join("model.json");
        save_artifact(&other_path, &other, manifest_for(&other)).unwrap();

        let config = ServiceConfig {
            manifest_path: Some(manifest_path_for(&other_path)),
            ..config_for(&path)
        };
        let ctx = ServiceContext::load(&config);
        assert_eq!(ctx.state(), LoadState::LoadFailed);
        assert!(ctx.load_error().unwrap_or_default().contains("hash mismatch"));
    }

    #[test]
    fn test_schema_fallback_and_strict_mode() {
        let mut pipeline = small_pipeline();
        pipeline.preprocessor.transformers = vec![TransformerEntry {
            name: "remainder".into(),
            transformer: Transformer::Drop,
            columns: strings(&["Load,N"]),
        }];

        let (order, source) = resolve_feature_order(&pipeline, None, false).unwrap();
        assert_eq!(source, FeatureOrderSource::Schema);
        assert_eq!(order, tribology_schema().column_names());

        assert!(matches!(
            resolve_feature_order(&pipeline, None, true),
            Err(ServiceError::FeatureOrder(_))
        ));
    }

    #[test]
    fn test_empty_manifest_order_falls_through() {
        let pipeline = small_pipeline();
        let mut manifest = manifest_for(&pipeline);
        manifest.feature_order.clear();

        let (_, source) = resolve_feature_order(&pipeline, Some(&manifest), true).unwrap();
        assert_eq!(source, FeatureOrderSource::Preprocessor);
    }

    fn ready_context() -> ServiceContext {
        let pipeline = small_pipeline();
        ServiceContext::ready(LoadedModel {
            feature_order: pipeline.feature_names_in.clone(),
            pipeline,
            hash: "test".into(),
            order_source: FeatureOrderSource::Manifest,
            manifest: None,
        })
    }

    #[test]
    fn test_predict_by_alias_and_name() {
        let ctx = ready_context();

        let by_alias = ctx
            .predict(&as_map(json!({"Load,N": 100.0, "Base_Oil": "Group IV"})))
            .unwrap();
        let by_name = ctx
            .predict(&as_map(json!({"Load_N": 100.0, "Base_Oil": "Group IV"})))
            .unwrap();

        assert_eq!(by_alias, by_name);
        assert_eq!(by_alias.srv_cof, 0.0);
        assert_eq!(by_alias.friction_torque_nm, 3.0);
    }

    #[test]
    fn test_predict_imputes_missing_features() {
        let ctx = ready_context();
        let prediction = ctx.predict(&as_map(json!({"Base_Oil": "Group II"}))).unwrap();
        // Missing load follows the majority (left) branch
        assert_eq!(prediction.ehd_film_thickness_nm, 2.0);
    }

    #[test]
    fn test_predict_rejects_bad_types() {
        let ctx = ready_context();
        assert!(matches!(
            ctx.predict(&as_map(json!({"Load,N": "heavy"}))),
            Err(ServiceError::InvalidInput(_))
        ));
        assert!(matches!(
            ctx.predict(&as_map(json!({"Load,N": 1.0, "Load_N": 2.0}))),
            Err(ServiceError::InvalidInput(_))
        ));
    }

    #[test]
    fn test_schema_order_surfaces_prediction_error() {
        let pipeline = small_pipeline();
        let ctx = ServiceContext::ready(LoadedModel {
            feature_order: tribology_schema().column_names(),
            pipeline,
            hash: "test".into(),
            order_source: FeatureOrderSource::Schema,
            manifest: None,
        });

        let err = ctx
            .predict(&tribology_schema().example_record())
            .unwrap_err();
        assert!(matches!(err, ServiceError::Prediction(_)));
    }
}
