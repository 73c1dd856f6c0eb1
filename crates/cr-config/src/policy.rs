//! Diagnosis policy configuration types.
//!
//! The policy turns a probability into an actionable answer: risk level
//! thresholds, the advice shown per level, which observed causes the user
//! can act on, and reference distributions for continuous measurements.

use serde::{Deserialize, Serialize};

/// Complete policy configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Policy {
    pub schema_version: String,

    #[serde(default)]
    pub description: Option<String>,

    #[serde(default)]
    pub risk_levels: RiskLevels,

    #[serde(default)]
    pub advice: LevelAdvice,

    #[serde(default)]
    pub sensitivity: SensitivityConfig,

    /// Actionable factors in declaration order (used as the sort tiebreak).
    #[serde(default)]
    pub actionable_factors: Vec<ActionableFactor>,

    #[serde(default)]
    pub measurements: Vec<MeasurementReference>,
}

/// Strict-greater-than thresholds on P(target = Yes).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RiskLevels {
    #[serde(default = "default_danger")]
    pub danger: f64,

    #[serde(default = "default_warning")]
    pub warning: f64,
}

impl Default for RiskLevels {
    fn default() -> Self {
        Self {
            danger: default_danger(),
            warning: default_warning(),
        }
    }
}

fn default_danger() -> f64 {
    0.8
}

fn default_warning() -> f64 {
    0.5
}

/// Advice text per risk level.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LevelAdvice {
    pub safe: String,
    pub warning: String,
    pub danger: String,
}

impl Default for LevelAdvice {
    fn default() -> Self {
        Self {
            safe: "You are in good shape. Keep working.".to_string(),
            warning: "Take care. Make time to refresh.".to_string(),
            danger: "Risk is high. Take a break right away.".to_string(),
        }
    }
}

/// Counterfactual ranking settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SensitivityConfig {
    /// A suggestion is kept only if its reduction is strictly greater.
    #[serde(default = "default_min_reduction")]
    pub min_reduction: f64,
}

impl Default for SensitivityConfig {
    fn default() -> Self {
        Self {
            min_reduction: default_min_reduction(),
        }
    }
}

fn default_min_reduction() -> f64 {
    0.01
}

/// A cause the user can switch off, with the advice to give when it matters.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ActionableFactor {
    pub name: String,

    /// Missing advice is reported when the factor qualifies as a suggestion.
    #[serde(default)]
    pub advice: Option<String>,
}

/// Reference distribution for a continuous measurement of a binary variable.
///
/// Smaller values mean the adverse state is more likely.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MeasurementReference {
    /// Measurement key accepted from callers (e.g. `sleep_hours`).
    pub name: String,

    /// Variable the thresholded measurement is observed on.
    pub variable: String,

    pub mean: f64,
    pub std: f64,

    #[serde(default)]
    pub description: Option<String>,
}

impl Default for Policy {
    fn default() -> Self {
        Self {
            schema_version: crate::CONFIG_SCHEMA_VERSION.to_string(),
            description: Some("Default concentration risk policy".to_string()),
            risk_levels: RiskLevels::default(),
            advice: LevelAdvice::default(),
            sensitivity: SensitivityConfig::default(),
            actionable_factors: vec![
                ActionableFactor {
                    name: "Overworked".to_string(),
                    advice: Some("Cut back on workload and take a proper rest.".to_string()),
                },
                ActionableFactor {
                    name: "SleepDeprived".to_string(),
                    advice: Some("Get more sleep before demanding work.".to_string()),
                },
                ActionableFactor {
                    name: "SmartphoneDistraction".to_string(),
                    advice: Some("Put the smartphone out of reach while working.".to_string()),
                },
            ],
            measurements: vec![MeasurementReference {
                name: "sleep_hours".to_string(),
                variable: "SleepDeprived".to_string(),
                mean: 6.0,
                std: 1.5,
                description: Some("Hours slept last night".to_string()),
            }],
        }
    }
}

impl Policy {
    /// Load policy from a JSON file.
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

    /// Parse policy from a JSON string.
    #[allow(clippy::should_implement_trait)]
    pub fn from_str(json: &str) -> Result<Self, crate::validate::ValidationError> {
        serde_json::from_str(json).map_err(|e| {
            crate::validate::ValidationError::ParseError(format!("Invalid JSON: {}", e))
        })
    }

    /// Find the reference distribution for a measurement key.
    pub fn measurement(&self, name: &str) -> Option<&MeasurementReference> {
        self.measurements.iter().find(|m| m.name == name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_policy() {
        let policy = Policy::default();
        assert_eq!(policy.risk_levels.danger, 0.8);
        assert_eq!(policy.risk_levels.warning, 0.5);
        assert_eq!(policy.sensitivity.min_reduction, 0.01);
        assert_eq!(policy.actionable_factors.len(), 3);
        assert_eq!(policy.actionable_factors[0].name, "Overworked");

        let sleep = policy.measurement("sleep_hours").unwrap();
        assert_eq!(sleep.variable, "SleepDeprived");
        assert_eq!(sleep.mean, 6.0);
        assert_eq!(sleep.std, 1.5);
    }

    #[test]
    fn test_parse_partial_policy_fills_defaults() {
        let json = r#"{
            "schema_version": "1.0.0",
            "actionable_factors": [{"name": "Overworked"}]
        }"#;

        let policy = Policy::from_str(json).unwrap();
        assert_eq!(policy.risk_levels.danger, 0.8);
        assert!(policy.actionable_factors[0].advice.is_none());
        assert!(policy.measurements.is_empty());
        assert!(policy.measurement("sleep_hours").is_none());
    }
}
