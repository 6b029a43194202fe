//! Tribo Prediction Service
//!
//! Serves the trained tribology pipeline over HTTP. The model and its
//! expected feature order are loaded once at startup into an immutable
//! [`ServiceContext`]; each request is aligned to that order before inference.

pub mod config;
pub mod context;
pub mod errors;
pub mod server;

pub use config::{default_model_path, ServiceConfig, DEFAULT_MODEL_FILE};
pub use context::{resolve_feature_order, FeatureOrderSource, LoadState, LoadedModel, ServiceContext};
pub use errors::ServiceError;
pub use server::{build_router, start_server, ApiError, SharedContext};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
