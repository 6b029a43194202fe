//! Service configuration
//!
//! Values come from an optional TOML file, then `TRIBO_*` environment
//! variables, then command-line flags; each layer overrides the previous one.

use serde::{Deserialize, Serialize};
use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use tribo_core::manifest_path_for;

use crate::errors::ServiceError;

/// Artifact file name looked up next to the executable
pub const DEFAULT_MODEL_FILE: &str = "trained_rf_model.json";

/// Environment variable naming the TOML config file
pub const CONFIG_ENV: &str = "TRIBO_CONFIG";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ServiceConfig {
    pub host: String,
    pub port: u16,
    pub model_path: PathBuf,
    /// Defaults to the artifact path with a `manifest.json` extension
    pub manifest_path: Option<PathBuf>,
    /// Refuse to fall back to the schema's declared order
    pub strict_feature_order: bool,
    /// Exit instead of serving degraded when the model cannot be loaded
    pub require_model: bool,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8000,
            model_path: default_model_path(),
            manifest_path: None,
            strict_feature_order: false,
            require_model: false,
        }
    }
}

impl ServiceConfig {
    /// Load from `path` when given, else defaults; then apply environment overrides
    pub fn load(path: Option<&Path>) -> Result<Self, ServiceError> {
        let mut config = match path {
            Some(path) => Self::from_file(path)?,
            None => Self::default(),
        };
        config.apply_env_overrides(|key| env::var(key).ok())?;
        Ok(config)
    }

    /// Load configuration from a TOML file
    pub fn from_file(path: &Path) -> Result<Self, ServiceError> {
        let content = fs::read_to_string(path).map_err(|e| {
            ServiceError::Config(format!("Failed to read config file {}: {e}", path.display()))
        })?;
        Self::from_toml(&content)
    }

    pub fn from_toml(content: &str) -> Result<Self, ServiceError> {
        toml::from_str(content)
            .map_err(|e| ServiceError::Config(format!("Failed to parse config file: {e}")))
    }

    /// Apply `TRIBO_*` overrides read through `lookup`
    pub fn apply_env_overrides<F>(&mut self, lookup: F) -> Result<(), ServiceError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(host) = lookup("TRIBO_HOST") {
            self.host = host;
        }
        if let Some(port) = lookup("TRIBO_PORT") {
            self.port = parse_env("TRIBO_PORT", &port)?;
        }
        if let Some(path) = lookup("TRIBO_MODEL_PATH") {
            self.model_path = PathBuf::from(path);
        }
        if let Some(path) = lookup("TRIBO_MANIFEST_PATH") {
            self.manifest_path = Some(PathBuf::from(path));
        }
        if let Some(flag) = lookup("TRIBO_STRICT_FEATURE_ORDER") {
            self.strict_feature_order = parse_bool("TRIBO_STRICT_FEATURE_ORDER", &flag)?;
        }
        if let Some(flag) = lookup("TRIBO_REQUIRE_MODEL") {
            self.require_model = parse_bool("TRIBO_REQUIRE_MODEL", &flag)?;
        }
        Ok(())
    }

    /// Manifest location, explicit or derived from the artifact path
    pub fn manifest_path(&self) -> PathBuf {
        self.manifest_path
            .clone()
            .unwrap_or_else(|| manifest_path_for(&self.model_path))
    }

    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

/// `trained_rf_model.json` in the directory of the running executable
pub fn default_model_path() -> PathBuf {
    env::current_exe()
        .ok()
        .and_then(|exe| exe.parent().map(|dir| dir.join(DEFAULT_MODEL_FILE)))
        .unwrap_or_else(|| PathBuf::from(DEFAULT_MODEL_FILE))
}

fn parse_env<T: std::str::FromStr>(key: &str, value: &str) -> Result<T, ServiceError> {
    value
        .trim()
        .parse()
        .map_err(|_| ServiceError::Config(format!("invalid value for {key}: '{value}'")))
}

fn parse_bool(key: &str, value: &str) -> Result<bool, ServiceError> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        _ => Err(ServiceError::Config(format!(
            "invalid value for {key}: '{value}' (expected true/false)"
        ))),
    }
}
