//! Configuration snapshots for reproducibility.
//!
//! A snapshot captures the exact configuration a diagnosis was computed
//! with, so results can be audited and reproduced later.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::resolve::{ConfigPaths, ConfigSource};
use crate::{ModelConfig, Policy};

/// A frozen snapshot of configuration state.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConfigSnapshot {
    /// When this snapshot was taken.
    pub timestamp: DateTime<Utc>,

    /// Hostname where snapshot was taken.
    #[serde(default)]
    pub hostname: Option<String>,

    /// Schema version of the configuration.
    pub schema_version: String,

    /// SHA-256 hash of the model JSON content.
    #[serde(default)]
    pub model_hash: Option<String>,

    /// Path where the model was loaded from.
    #[serde(default)]
    pub model_path: Option<String>,

    /// Source of model configuration.
    pub model_source: String,

    /// SHA-256 hash of the policy JSON content.
    #[serde(default)]
    pub policy_hash: Option<String>,

    /// Path where policy was loaded from.
    #[serde(default)]
    pub policy_path: Option<String>,

    /// Source of policy configuration.
    pub policy_source: String,

    /// Combined hash of all config files (for quick comparison).
    pub combined_hash: String,

    /// Key configuration values for quick reference.
    pub summary: ConfigSummary,
}

/// Summary of key configuration values.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConfigSummary {
    pub target: String,
    pub node_count: usize,
    pub learned_nodes: Vec<String>,
    pub danger_threshold: f64,
    pub warning_threshold: f64,
    pub min_reduction: f64,
    pub actionable_factor_count: usize,
    pub measurement_count: usize,
}

impl ConfigSnapshot {
    /// Create a new snapshot from loaded configuration.
    pub fn new(
        model: &ModelConfig,
        policy: &Policy,
        paths: &ConfigPaths,
        model_json: Option<&str>,
        policy_json: Option<&str>,
    ) -> Self {
        let model_hash = model_json.map(hash_content);
        let policy_hash = policy_json.map(hash_content);

        let combined = format!(
            "{}:{}",
            model_hash.as_deref().unwrap_or("none"),
            policy_hash.as_deref().unwrap_or("none")
        );

        ConfigSnapshot {
            timestamp: Utc::now(),
            hostname: current_hostname(),
            schema_version: crate::CONFIG_SCHEMA_VERSION.to_string(),
            model_hash,
            model_path: paths.model.path.as_ref().map(|p| p.display().to_string()),
            model_source: paths.model.source.to_string(),
            policy_hash,
            policy_path: paths.policy.path.as_ref().map(|p| p.display().to_string()),
            policy_source: paths.policy.source.to_string(),
            combined_hash: hash_content(&combined),
            summary: ConfigSummary::from_config(model, policy),
        }
    }

    /// Create a snapshot with only defaults (no config files loaded).
    pub fn defaults_only() -> Self {
        ConfigSnapshot {
            timestamp: Utc::now(),
            hostname: current_hostname(),
            schema_version: crate::CONFIG_SCHEMA_VERSION.to_string(),
            model_hash: None,
            model_path: None,
            model_source: ConfigSource::Builtin.to_string(),
            policy_hash: None,
            policy_path: None,
            policy_source: ConfigSource::Builtin.to_string(),
            combined_hash: hash_content("none:none"),
            summary: ConfigSummary::from_config(&ModelConfig::default(), &Policy::default()),
        }
    }

    /// Serialize snapshot to JSON.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    /// Deserialize snapshot from JSON.
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    /// Check if this snapshot matches another (same config).
    pub fn matches(&self, other: &ConfigSnapshot) -> bool {
        self.combined_hash == other.combined_hash
    }

    /// Get a short identifier for this snapshot (first 12 chars of hash).
    pub fn short_id(&self) -> &str {
        &self.combined_hash[..12.min(self.combined_hash.len())]
    }
}

impl ConfigSummary {
    fn from_config(model: &ModelConfig, policy: &Policy) -> Self {
        ConfigSummary {
            target: model.target.clone(),
            node_count: model.nodes.len(),
            learned_nodes: model.learned_nodes().map(str::to_string).collect(),
            danger_threshold: policy.risk_levels.danger,
            warning_threshold: policy.risk_levels.warning,
            min_reduction: policy.sensitivity.min_reduction,
            actionable_factor_count: policy.actionable_factors.len(),
            measurement_count: policy.measurements.len(),
        }
    }
}

fn current_hostname() -> Option<String> {
    hostname::get()
        .ok()
        .map(|h| h.to_string_lossy().to_string())
}

/// Hash content with SHA-256 and return hex string.
pub fn hash_content(content: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(content.as_bytes());
    hex::encode(hasher.finalize())
}
