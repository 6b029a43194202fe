use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::{Context, Result};
use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::Serialize;
use serde_json::Value;
use tower_http::trace::TraceLayer;
use tracing::{info, warn};
use tribo_core::TribologyPrediction;

use crate::context::{FeatureOrderSource, LoadState, ServiceContext};
use crate::errors::ServiceError;

pub type SharedContext = Arc<ServiceContext>;

const WELCOME_MESSAGE: &str = "Welcome to the Lubricant Tribology Prediction API.";

#[derive(Debug, Serialize)]
struct WelcomeResponse {
    message: &'static str,
}

#[derive(Debug, Serialize)]
struct HealthResponse {
    status: &'static str,
    state: LoadState,
    model_loaded: bool,
    feature_order_source: Option<FeatureOrderSource>,
    feature_count: usize,
    model_hash: Option<String>,
    load_error: Option<String>,
    version: &'static str,
}

#[derive(Debug, Serialize)]
struct FeaturesResponse {
    loaded: bool,
    source: Option<FeatureOrderSource>,
    features: Vec<String>,
}

#[derive(Debug, Serialize)]
struct ErrorResponse {
    detail: String,
}

#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    message: String,
}

impl ApiError {
    fn new<S: Into<String>>(status: StatusCode, message: S) -> Self {
        Self {
            status,
            message: message.into(),
        }
    }

    fn unprocessable<S: Into<String>>(message: S) -> Self {
        Self::new(StatusCode::UNPROCESSABLE_ENTITY, message)
    }

    fn internal<S: Into<String>>(message: S) -> Self {
        Self::new(StatusCode::INTERNAL_SERVER_ERROR, message)
    }
}

impl From<ServiceError> for ApiError {
    fn from(err: ServiceError) -> Self {
        match err {
            ServiceError::InvalidInput(_) => ApiError::unprocessable(err.to_string()),
            ServiceError::ModelNotLoaded
            | ServiceError::Prediction(_)
            | ServiceError::Load(_)
            | ServiceError::FeatureOrder(_)
            | ServiceError::Config(_) => ApiError::internal(err.to_string()),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let payload = Json(ErrorResponse {
            detail: self.message,
        });
        (self.status, payload).into_response()
    }
}

/// Bind `addr` and serve until `shutdown` resolves
pub async fn start_server<F>(ctx: SharedContext, addr: &str, shutdown: F) -> Result<()>
where
    F: Future<Output = ()> + Send + 'static,
{
    let app = build_router(ctx);
    let listener = bind_listener(addr).await?;
    info!("Prediction service listening on {}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown)
        .await
        .context("prediction server terminated unexpectedly")
}

async fn bind_listener(addr: &str) -> Result<tokio::net::TcpListener> {
    if let Ok(socket_addr) = addr.parse::<SocketAddr>() {
        tokio::net::TcpListener::bind(socket_addr)
            .await
            .with_context(|| format!("failed to bind listener on {socket_addr}"))
    } else {
        tokio::net::TcpListener::bind(addr)
            .await
            .with_context(|| format!("failed to bind listener on {addr}"))
    }
}

pub fn build_router(ctx: SharedContext) -> Router {
    Router::new()
        .route("/", get(handle_root))
        .route("/health", get(handle_health))
        .route("/features", get(handle_features))
        .route("/predict", post(handle_predict))
        .layer(TraceLayer::new_for_http())
        .with_state(ctx)
}

async fn handle_root() -> Json<WelcomeResponse> {
    Json(WelcomeResponse {
        message: WELCOME_MESSAGE,
    })
}

async fn handle_health(State(ctx): State<SharedContext>) -> Json<HealthResponse> {
    let model = ctx.model();
    Json(HealthResponse {
        status: if ctx.is_ready() { "ok" } else { "degraded" },
        state: ctx.state(),
        model_loaded: ctx.is_ready(),
        feature_order_source: ctx.order_source(),
        feature_count: ctx.feature_order().len(),
        model_hash: model.map(|m| m.hash.clone()),
        load_error: ctx.load_error().map(str::to_string),
        version: crate::VERSION,
    })
}

async fn handle_features(State(ctx): State<SharedContext>) -> Json<FeaturesResponse> {
    Json(FeaturesResponse {
        loaded: ctx.is_ready(),
        source: ctx.order_source(),
        features: ctx.feature_order().to_vec(),
    })
}

async fn handle_predict(
    State(ctx): State<SharedContext>,
    payload: Result<Json<Value>, JsonRejection>,
) -> Result<Json<TribologyPrediction>, ApiError> {
    if !ctx.is_ready() {
        warn!("prediction requested but no model is loaded");
        return Err(ServiceError::ModelNotLoaded.into());
    }

    let Json(body) = payload.map_err(|rejection| {
        warn!(error = %rejection.body_text(), "rejected prediction payload");
        ApiError::from(ServiceError::InvalidInput(rejection.body_text()))
    })?;

    let record = match body {
        Value::Object(record) => record,
        other => {
            return Err(ServiceError::InvalidInput(format!(
                "expected a JSON object, got {}",
                json_kind(&other)
            ))
            .into())
        }
    };

    let prediction = ctx.predict(&record).map_err(|err| {
        warn!(error = %err, "prediction failed");
        ApiError::from(err)
    })?;

    Ok(Json(prediction))
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}
