//! End-to-end diagnosis: evidence assembly, inference, classification and
//! optional what-if ranking.

use std::collections::BTreeMap;
use std::fmt;

use cr_common::{Error, Result};
use cr_config::policy::{Policy, RiskLevels};
use cr_math::round_to;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::evidence::{survival_probability, Evidence, MAPPING_THRESHOLD};
use crate::inference::infer;
use crate::learning::ParamsSnapshot;
use crate::network::Network;
use crate::sensitivity::{analyze_sensitivity, ImprovementSuggestion};

/// Decimal places of the reported risk score.
pub const SCORE_PRECISION: u32 = 4;

/// Coarse risk classification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum RiskLevel {
    Safe,
    Warning,
    Danger,
}

impl RiskLevel {
    /// `Danger` above the danger threshold, `Warning` above the warning
    /// threshold, `Safe` otherwise. Both comparisons are strict.
    pub fn classify(p_yes: f64, levels: &RiskLevels) -> Self {
        if p_yes > levels.danger {
            RiskLevel::Danger
        } else if p_yes > levels.warning {
            RiskLevel::Warning
        } else {
            RiskLevel::Safe
        }
    }

    pub fn advice<'a>(&self, policy: &'a Policy) -> &'a str {
        match self {
            RiskLevel::Safe => &policy.advice.safe,
            RiskLevel::Warning => &policy.advice.warning,
            RiskLevel::Danger => &policy.advice.danger,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            RiskLevel::Safe => "SAFE",
            RiskLevel::Warning => "WARNING",
            RiskLevel::Danger => "DANGER",
        }
    }
}

impl fmt::Display for RiskLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Raw diagnosis input.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DiagnosisRequest {
    /// Boolean observations keyed by variable name.
    #[serde(default)]
    pub observations: BTreeMap<String, bool>,
    /// Continuous measurements keyed by measurement name.
    #[serde(default)]
    pub measurements: BTreeMap<String, f64>,
    /// Rank improvement suggestions.
    #[serde(default)]
    pub what_if: bool,
}

/// A measurement after mapping to a hard observation.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MappedMeasurement {
    pub name: String,
    pub variable: String,
    pub value: f64,
    pub probability: f64,
    pub observed: bool,
}

/// Result of one diagnosis.
#[derive(Debug, Clone, Serialize)]
pub struct Diagnosis {
    pub target: String,
    pub risk_score: f64,
    pub risk_level: RiskLevel,
    pub advice: String,
    pub p_no: f64,
    pub p_yes: f64,
    pub evidence: Evidence,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub measurements: Vec<MappedMeasurement>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub suggestions: Option<Vec<ImprovementSuggestion>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parameters: Option<ParamsSnapshot>,
}

impl Diagnosis {
    /// Record the learned parameters the network was built from.
    pub fn with_parameters(mut self, params: ParamsSnapshot) -> Self {
        self.parameters = Some(params);
        self
    }
}

/// Resolve observations and measurements into typed evidence.
///
/// Measurements are looked up in the policy's reference table. A variable
/// that is both observed and measured is rejected.
pub fn assemble_evidence(
    network: &Network,
    request: &DiagnosisRequest,
    policy: &Policy,
) -> Result<(Evidence, Vec<MappedMeasurement>)> {
    let mut mapped = Vec::with_capacity(request.measurements.len());
    for (name, &value) in &request.measurements {
        let reference = policy.measurement(name).ok_or_else(|| {
            Error::evidence(format!("no reference distribution for measurement '{}'", name))
        })?;
        if request.observations.contains_key(&reference.variable) {
            return Err(Error::evidence(format!(
                "'{}' is both observed and measured by '{}'",
                reference.variable, name
            )));
        }
        let probability = survival_probability(value, reference.mean, reference.std)?;
        mapped.push(MappedMeasurement {
            name: name.clone(),
            variable: reference.variable.clone(),
            value,
            probability,
            observed: probability > MAPPING_THRESHOLD,
        });
    }

    let observations = request
        .observations
        .iter()
        .map(|(k, &v)| (k.as_str(), v))
        .chain(mapped.iter().map(|m| (m.variable.as_str(), m.observed)));
    let evidence = Evidence::resolve(network, observations)?;
    Ok((evidence, mapped))
}

/// Run the full diagnosis for `target`.
pub fn diagnose(
    network: &Network,
    request: &DiagnosisRequest,
    policy: &Policy,
    target: &str,
) -> Result<Diagnosis> {
    let (evidence, measurements) = assemble_evidence(network, request, policy)?;
    let result = infer(network, &evidence, target)?;
    let p_yes = result.p_yes();
    let level = RiskLevel::classify(p_yes, &policy.risk_levels);
    debug!(query = target, p_yes, level = %level, "diagnosis classified");

    let suggestions = if request.what_if {
        Some(analyze_sensitivity(
            network,
            &evidence,
            target,
            p_yes,
            &policy.actionable_factors,
            policy.sensitivity.min_reduction,
        )?)
    } else {
        None
    };

    Ok(Diagnosis {
        target: target.to_string(),
        risk_score: round_to(p_yes, SCORE_PRECISION),
        risk_level: level,
        advice: level.advice(policy).to_string(),
        p_no: result.p_no(),
        p_yes,
        evidence,
        measurements,
        suggestions,
        parameters: None,
    })
}
