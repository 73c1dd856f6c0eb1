//! Configuration loading for crisk.
//!
//! - resolve model.json, policy.json and the learning record path
//! - parse and validate each file, then the policy against the model
//! - keep raw file contents for the config snapshot hashes

pub use cr_config::model::{GeneratorConfig, LearningConfig, ModelConfig, NodeConfig};
pub use cr_config::policy::{ActionableFactor, MeasurementReference, Policy};
pub use cr_config::validate::ValidationError;
pub use cr_config::{ConfigPaths, ConfigSnapshot, ConfigSource, Located, PathOverrides};

use std::path::{Path, PathBuf};

use cr_config::validate::{validate_model, validate_policy, validate_policy_against_model};
use cr_config::{resolve_paths, ResolveError};
use cr_math::BetaParams;
use thiserror::Error;
use tracing::debug;

/// Errors that can occur during config loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error(transparent)]
    NotFound(#[from] ResolveError),

    #[error("invalid JSON in config file {path}: {source}")]
    ParseError {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("I/O error reading {path}: {source}")]
    IoError {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("semantic validation failed: {0}")]
    ValidationError(#[from] ValidationError),
}

impl From<ConfigError> for cr_common::Error {
    fn from(err: ConfigError) -> Self {
        match err {
            ConfigError::IoError { path, source } => cr_common::Error::Config(format!(
                "I/O error reading {}: {}",
                path.display(),
                source
            )),
            other => cr_common::Error::Config(other.to_string()),
        }
    }
}

/// Loaded, validated configuration with provenance.
#[derive(Debug, Clone)]
pub struct ResolvedConfig {
    pub model: ModelConfig,
    pub policy: Policy,
    pub paths: ConfigPaths,
    model_json: Option<String>,
    policy_json: Option<String>,
}

impl ResolvedConfig {
    /// Snapshot with content hashes of the files actually read.
    pub fn snapshot(&self) -> ConfigSnapshot {
        ConfigSnapshot::new(
            &self.model,
            &self.policy,
            &self.paths,
            self.model_json.as_deref(),
            self.policy_json.as_deref(),
        )
    }

    /// Learning prior from the model configuration.
    pub fn prior(&self) -> Result<BetaParams, ConfigError> {
        let learning = &self.model.learning;
        BetaParams::new(learning.prior_alpha, learning.prior_beta).ok_or_else(|| {
            ConfigError::ValidationError(ValidationError::InvalidValue {
                field: "learning".to_string(),
                message: "prior_alpha and prior_beta must be positive".to_string(),
            })
        })
    }
}

/// Resolve, load and validate configuration.
///
/// Explicit paths must exist; discovered locations are optional and fall
/// back to the built-in defaults.
pub fn load_config(overrides: &PathOverrides) -> Result<ResolvedConfig, ConfigError> {
    let paths = resolve_paths(overrides)?;

    let (model, model_json) = match &paths.model.path {
        Some(path) => {
            let (model, raw) = read_json::<ModelConfig>(path)?;
            (model, Some(raw))
        }
        None => (ModelConfig::default(), None),
    };
    let (policy, policy_json) = match &paths.policy.path {
        Some(path) => {
            let (policy, raw) = read_json::<Policy>(path)?;
            (policy, Some(raw))
        }
        None => (Policy::default(), None),
    };

    validate_model(&model)?;
    validate_policy(&policy)?;
    validate_policy_against_model(&policy, &model)?;

    debug!(
        model_source = %paths.model.source,
        policy_source = %paths.policy.source,
        state = %paths.state.display(),
        state_source = %paths.state_source,
        "configuration resolved"
    );

    Ok(ResolvedConfig {
        model,
        policy,
        paths,
        model_json,
        policy_json,
    })
}

fn read_json<T: serde::de::DeserializeOwned>(path: &Path) -> Result<(T, String), ConfigError> {
    let content = std::fs::read_to_string(path).map_err(|source| ConfigError::IoError {
        path: path.to_path_buf(),
        source,
    })?;
    let value = serde_json::from_str(&content).map_err(|source| ConfigError::ParseError {
        path: path.to_path_buf(),
        source,
    })?;
    Ok((value, content))
}
