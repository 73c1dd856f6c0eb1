//! Counterfactual ranking of actionable causes.
//!
//! For every actionable factor observed as Yes, the target is re-inferred
//! with that factor forced to No. The drop in `P(target = Yes)` is the
//! reduction attributed to fixing the factor.

use cr_common::{Error, Result};
use cr_config::policy::ActionableFactor;
use serde::Serialize;
use tracing::debug;

use crate::evidence::Evidence;
use crate::inference::infer;
use crate::network::{Network, NO};

/// Default minimum reduction for a factor to be suggested.
pub const DEFAULT_MIN_REDUCTION: f64 = 0.01;

/// Reductions within this distance of each other rank as equal.
const TIE_TOLERANCE: f64 = 1e-9;

/// A factor whose removal would lower the risk.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ImprovementSuggestion {
    pub factor: String,
    pub reduction: f64,
    pub advice: String,
}

/// Rank actionable factors by how much forcing them to No lowers the risk.
///
/// `baseline` is `P(target = Yes | evidence)`. A factor is kept only when
/// its reduction is strictly greater than `min_reduction`. The result is
/// sorted by descending reduction; equal reductions keep the order of
/// `factors`. A kept factor without advice text fails the whole call.
pub fn analyze_sensitivity(
    network: &Network,
    evidence: &Evidence,
    target: &str,
    baseline: f64,
    factors: &[ActionableFactor],
    min_reduction: f64,
) -> Result<Vec<ImprovementSuggestion>> {
    let mut suggestions = Vec::new();

    for factor in factors {
        if !evidence.is_yes(&factor.name) {
            continue;
        }
        let counterfactual = evidence.with_state(&factor.name, NO);
        let p = infer(network, &counterfactual, target)?.p_yes();
        let reduction = baseline - p;
        debug!(
            factor = %factor.name,
            baseline,
            counterfactual = p,
            reduction,
            "counterfactual evaluated"
        );

        if reduction > min_reduction {
            let advice = factor
                .advice
                .as_deref()
                .filter(|text| !text.trim().is_empty())
                .ok_or_else(|| Error::AdviceLookup {
                    factor: factor.name.clone(),
                })?;
            suggestions.push(ImprovementSuggestion {
                factor: factor.name.clone(),
                reduction,
                advice: advice.to_string(),
            });
        }
    }

    Ok(rank(suggestions))
}

/// Order by descending reduction without letting a later factor overtake
/// an earlier one it beats by no more than [`TIE_TOLERANCE`].
fn rank(suggestions: Vec<ImprovementSuggestion>) -> Vec<ImprovementSuggestion> {
    let mut ranked: Vec<ImprovementSuggestion> = Vec::with_capacity(suggestions.len());
    for suggestion in suggestions {
        let at = ranked
            .iter()
            .position(|r| suggestion.reduction - r.reduction > TIE_TOLERANCE)
            .unwrap_or(ranked.len());
        ranked.insert(at, suggestion);
    }
    ranked
}
