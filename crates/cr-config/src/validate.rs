//! Configuration validation errors and semantic validation.
//!
//! Graph structure (cycles, edge/scope agreement) is checked when the
//! network is built; these checks cover everything that can be decided
//! from the files alone.

use std::collections::HashSet;

use thiserror::Error;

use crate::model::{GeneratorConfig, ModelConfig};
use crate::policy::Policy;

/// Validation result type.
pub type ValidationResult<T> = Result<T, ValidationError>;

/// Configuration validation errors.
#[derive(Error, Debug)]
pub enum ValidationError {
    #[error("I/O error: {0}")]
    IoError(String),

    #[error("Parse error: {0}")]
    ParseError(String),

    #[error("Semantic validation failed: {0}")]
    SemanticError(String),

    #[error("Invalid value for {field}: {message}")]
    InvalidValue { field: String, message: String },

    #[error("Version mismatch: expected {expected}, got {actual}")]
    VersionMismatch { expected: String, actual: String },
}

impl ValidationError {
    /// Error code for structured error reporting.
    pub fn code(&self) -> u32 {
        match self {
            ValidationError::IoError(_) => 60,
            ValidationError::ParseError(_) => 61,
            ValidationError::SemanticError(_) => 13,
            ValidationError::InvalidValue { .. } => 14,
            ValidationError::VersionMismatch { .. } => 15,
        }
    }
}

fn check_version(actual: &str) -> ValidationResult<()> {
    if actual != crate::CONFIG_SCHEMA_VERSION {
        return Err(ValidationError::VersionMismatch {
            expected: crate::CONFIG_SCHEMA_VERSION.to_string(),
            actual: actual.to_string(),
        });
    }
    Ok(())
}

/// Validate model configuration semantically.
pub fn validate_model(model: &ModelConfig) -> ValidationResult<()> {
    check_version(&model.schema_version)?;

    if model.nodes.is_empty() {
        return Err(ValidationError::SemanticError(
            "model must declare at least one node".to_string(),
        ));
    }

    let mut seen = HashSet::new();
    for node in &model.nodes {
        if node.name.is_empty() {
            return Err(ValidationError::SemanticError(
                "node names must be non-empty".to_string(),
            ));
        }
        if !seen.insert(node.name.as_str()) {
            return Err(ValidationError::SemanticError(format!(
                "duplicate node '{}'",
                node.name
            )));
        }
    }

    if !seen.contains(model.target.as_str()) {
        return Err(ValidationError::SemanticError(format!(
            "target '{}' is not a declared node",
            model.target
        )));
    }

    for node in &model.nodes {
        for parent in &node.parents {
            if !seen.contains(parent.as_str()) {
                return Err(ValidationError::SemanticError(format!(
                    "node '{}' names undeclared parent '{}'",
                    node.name, parent
                )));
            }
        }

        let expected = node.expected_rows();
        if node.p_yes.len() != expected {
            return Err(ValidationError::InvalidValue {
                field: format!("nodes.{}.p_yes", node.name),
                message: format!(
                    "expected {} rows for {} parents, got {}",
                    expected,
                    node.parents.len(),
                    node.p_yes.len()
                ),
            });
        }

        for (row, p) in node.p_yes.iter().enumerate() {
            if !p.is_finite() || !(0.0..=1.0).contains(p) {
                return Err(ValidationError::InvalidValue {
                    field: format!("nodes.{}.p_yes[{}]", node.name, row),
                    message: format!("Must be in [0, 1], got {}", p),
                });
            }
        }
    }

    validate_generator(&model.generator)?;

    let learning = &model.learning;
    for (field, value) in [
        ("learning.prior_alpha", learning.prior_alpha),
        ("learning.prior_beta", learning.prior_beta),
    ] {
        if !value.is_finite() || value <= 0.0 {
            return Err(ValidationError::InvalidValue {
                field: field.to_string(),
                message: format!("Must be positive, got {}", value),
            });
        }
    }

    Ok(())
}

fn validate_generator(generator: &GeneratorConfig) -> ValidationResult<()> {
    let GeneratorConfig {
        bias,
        weight_scale,
        clip_min,
        clip_max,
    } = *generator;

    if !bias.is_finite() {
        return Err(ValidationError::InvalidValue {
            field: "generator.bias".to_string(),
            message: format!("Must be finite, got {}", bias),
        });
    }

    if !weight_scale.is_finite() || weight_scale <= 0.0 {
        return Err(ValidationError::InvalidValue {
            field: "generator.weight_scale".to_string(),
            message: format!("Must be positive, got {}", weight_scale),
        });
    }

    if !(clip_min > 0.0 && clip_min < clip_max && clip_max < 1.0) {
        return Err(ValidationError::InvalidValue {
            field: "generator.clip_min/clip_max".to_string(),
            message: format!("Need 0 < min < max < 1, got [{}, {}]", clip_min, clip_max),
        });
    }

    Ok(())
}

/// Validate policy configuration semantically.
pub fn validate_policy(policy: &Policy) -> ValidationResult<()> {
    check_version(&policy.schema_version)?;

    let levels = &policy.risk_levels;
    if !(0.0 <= levels.warning && levels.warning <= levels.danger && levels.danger <= 1.0) {
        return Err(ValidationError::InvalidValue {
            field: "risk_levels".to_string(),
            message: format!(
                "Need 0 <= warning <= danger <= 1, got warning={} danger={}",
                levels.warning, levels.danger
            ),
        });
    }

    let min_reduction = policy.sensitivity.min_reduction;
    if !min_reduction.is_finite() || min_reduction < 0.0 {
        return Err(ValidationError::InvalidValue {
            field: "sensitivity.min_reduction".to_string(),
            message: format!("Must be non-negative, got {}", min_reduction),
        });
    }

    let mut factors = HashSet::new();
    for factor in &policy.actionable_factors {
        if !factors.insert(factor.name.as_str()) {
            return Err(ValidationError::SemanticError(format!(
                "actionable factor '{}' is listed twice",
                factor.name
            )));
        }
    }

    let mut measurements = HashSet::new();
    for m in &policy.measurements {
        if !measurements.insert(m.name.as_str()) {
            return Err(ValidationError::SemanticError(format!(
                "measurement '{}' is listed twice",
                m.name
            )));
        }
        if !m.mean.is_finite() {
            return Err(ValidationError::InvalidValue {
                field: format!("measurements.{}.mean", m.name),
                message: format!("Must be finite, got {}", m.mean),
            });
        }
        if !m.std.is_finite() || m.std <= 0.0 {
            return Err(ValidationError::InvalidValue {
                field: format!("measurements.{}.std", m.name),
                message: format!("Must be positive, got {}", m.std),
            });
        }
    }

    Ok(())
}

/// Check that every variable the policy refers to exists in the model.
pub fn validate_policy_against_model(policy: &Policy, model: &ModelConfig) -> ValidationResult<()> {
    for factor in &policy.actionable_factors {
        if model.node(&factor.name).is_none() {
            return Err(ValidationError::SemanticError(format!(
                "actionable factor '{}' is not a model node",
                factor.name
            )));
        }
    }

    for m in &policy.measurements {
        if model.node(&m.variable).is_none() {
            return Err(ValidationError::SemanticError(format!(
                "measurement '{}' targets unknown node '{}'",
                m.name, m.variable
            )));
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_validate() {
        let model = ModelConfig::default();
        let policy = Policy::default();
        assert!(validate_model(&model).is_ok());
        assert!(validate_policy(&policy).is_ok());
        assert!(validate_policy_against_model(&policy, &model).is_ok());
    }

    #[test]
    fn test_generator_clip_bounds() {
        let mut generator = GeneratorConfig::default();
        assert!(validate_generator(&generator).is_ok());

        generator.clip_min = 0.0;
        assert!(validate_generator(&generator).is_err());

        generator.clip_min = 0.6;
        generator.clip_max = 0.4;
        assert!(validate_generator(&generator).is_err());
    }

    #[test]
    fn test_row_count_mismatch() {
        let mut model = ModelConfig::default();
        model.nodes[3].p_yes.pop();
        let err = validate_model(&model).unwrap_err();
        assert!(matches!(err, ValidationError::InvalidValue { .. }));
        assert!(err.to_string().contains("expected 8 rows"));
    }

    #[test]
    fn test_unknown_target() {
        let mut model = ModelConfig::default();
        model.target = "Fatigue".to_string();
        assert!(matches!(
            validate_model(&model),
            Err(ValidationError::SemanticError(_))
        ));
    }

    #[test]
    fn test_non_positive_prior() {
        let mut model = ModelConfig::default();
        model.learning.prior_beta = 0.0;
        assert!(validate_model(&model).is_err());
    }

    #[test]
    fn test_measurement_std_must_be_positive() {
        let mut policy = Policy::default();
        policy.measurements[0].std = 0.0;
        assert!(matches!(
            validate_policy(&policy),
            Err(ValidationError::InvalidValue { .. })
        ));
    }

    #[test]
    fn test_cross_reference() {
        let model = ModelConfig::default();
        let mut policy = Policy::default();
        policy.measurements[0].variable = "Hydration".to_string();
        assert!(validate_policy_against_model(&policy, &model).is_err());
    }
}
