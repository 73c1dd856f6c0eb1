//! Network model configuration types.
//!
//! All variables are binary (No = 0, Yes = 1). A node's table is given as
//! `p_yes`, one entry per parent combination. Combinations are enumerated
//! with parents in declared order and the LAST declared parent varying
//! fastest, so for parents `(A, B)` the rows are `00, 01, 10, 11`.

use serde::{Deserialize, Serialize};

/// Complete model configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelConfig {
    pub schema_version: String,

    #[serde(default)]
    pub description: Option<String>,

    /// Variable whose P(Yes) is reported as the risk score.
    pub target: String,

    pub nodes: Vec<NodeConfig>,

    #[serde(default)]
    pub generator: GeneratorConfig,

    #[serde(default)]
    pub learning: LearningConfig,
}

/// One binary variable with its parents and reference table.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NodeConfig {
    pub name: String,

    #[serde(default)]
    pub label: Option<String>,

    #[serde(default)]
    pub parents: Vec<String>,

    /// P(Yes) per parent combination in canonical order.
    pub p_yes: Vec<f64>,

    /// When set, the learned network replaces this table with generated rows.
    #[serde(default)]
    pub learned: bool,
}

/// Constants of the sigmoid table generator.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeneratorConfig {
    #[serde(default = "default_bias")]
    pub bias: f64,

    #[serde(default = "default_weight_scale")]
    pub weight_scale: f64,

    #[serde(default = "default_clip_min")]
    pub clip_min: f64,

    #[serde(default = "default_clip_max")]
    pub clip_max: f64,
}

impl Default for GeneratorConfig {
    fn default() -> Self {
        Self {
            bias: default_bias(),
            weight_scale: default_weight_scale(),
            clip_min: default_clip_min(),
            clip_max: default_clip_max(),
        }
    }
}

fn default_bias() -> f64 {
    2.0
}

fn default_weight_scale() -> f64 {
    2.0
}

fn default_clip_min() -> f64 {
    0.01
}

fn default_clip_max() -> f64 {
    0.99
}

/// Prior of the learned base rate, used when no state file exists.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LearningConfig {
    #[serde(default = "default_prior")]
    pub prior_alpha: f64,

    #[serde(default = "default_prior")]
    pub prior_beta: f64,
}

impl Default for LearningConfig {
    fn default() -> Self {
        Self {
            prior_alpha: default_prior(),
            prior_beta: default_prior(),
        }
    }
}

fn default_prior() -> f64 {
    10.0
}

impl Default for ModelConfig {
    /// The reference productivity model.
    fn default() -> Self {
        Self {
            schema_version: crate::CONFIG_SCHEMA_VERSION.to_string(),
            description: Some("Workload, sleep and distraction drive concentration drops".to_string()),
            target: "ConcentrationDrop".to_string(),
            nodes: vec![
                root("Overworked", "Overworked", 0.2),
                root("SleepDeprived", "Sleep deprived", 0.3),
                root("SmartphoneDistraction", "Smartphone distraction", 0.5),
                NodeConfig {
                    name: "ConcentrationDrop".to_string(),
                    label: Some("Concentration drop".to_string()),
                    parents: vec![
                        "Overworked".to_string(),
                        "SleepDeprived".to_string(),
                        "SmartphoneDistraction".to_string(),
                    ],
                    p_yes: vec![0.05, 0.40, 0.30, 0.70, 0.40, 0.80, 0.70, 0.95],
                    learned: true,
                },
                NodeConfig {
                    name: "CarelessMistake".to_string(),
                    label: Some("Careless mistake".to_string()),
                    parents: vec!["ConcentrationDrop".to_string()],
                    p_yes: vec![0.10, 0.60],
                    learned: false,
                },
            ],
            generator: GeneratorConfig::default(),
            learning: LearningConfig::default(),
        }
    }
}

fn root(name: &str, label: &str, p_yes: f64) -> NodeConfig {
    NodeConfig {
        name: name.to_string(),
        label: Some(label.to_string()),
        parents: Vec::new(),
        p_yes: vec![p_yes],
        learned: false,
    }
}

impl ModelConfig {
    /// Load a model from a JSON file.
    pub fn from_file(path: &std::path::Path) -> Result<Self, crate::validate::ValidationError> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            crate::validate::ValidationError::IoError(format!(
                "Failed to read {}: {}",
                path.display(),
                e
            ))
        })?;

        Self::from_str(&content)
    }

    /// Parse a model from a JSON string.
    #[allow(clippy::should_implement_trait)]
    pub fn from_str(json: &str) -> Result<Self, crate::validate::ValidationError> {
        serde_json::from_str(json).map_err(|e| {
            crate::validate::ValidationError::ParseError(format!("Invalid JSON: {}", e))
        })
    }

    /// Look up a node by name.
    pub fn node(&self, name: &str) -> Option<&NodeConfig> {
        self.nodes.iter().find(|n| n.name == name)
    }

    /// Names of the nodes whose tables are generated from learned parameters.
    pub fn learned_nodes(&self) -> impl Iterator<Item = &str> {
        self.nodes.iter().filter(|n| n.learned).map(|n| n.name.as_str())
    }
}

impl NodeConfig {
    /// Number of rows the table must have: 2^parents.
    pub fn expected_rows(&self) -> usize {
        1usize << self.parents.len()
    }
}
