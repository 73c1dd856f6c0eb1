//! Tables regenerated from the learned base rate.
//!
//! The learned Beta parameters collapse to one scalar, the posterior mean,
//! which has to be spread over a table with one row per parent combination.
//! How that is done is a policy, so it sits behind [`CptGenerator`].

use cr_config::model::GeneratorConfig;
use cr_math::{clip_probability, sigmoid, BetaParams, PROB_CEIL, PROB_FLOOR};

use super::cpt::{binary_combination, Cpt};
use super::YES;

/// Produces a binary table for a variable from learned parameters.
///
/// Implementations must be pure: identical inputs give identical tables.
pub trait CptGenerator: Send + Sync {
    fn generate(&self, params: &BetaParams, parents: &[String]) -> Cpt;
}

/// Sigmoid of the count of active parents.
///
/// For a row with `k` parents in state Yes:
///
/// ```text
/// base  = alpha / (alpha + beta)
/// score = k * weight_scale * base
/// p_yes = clip(sigmoid(score - bias), clip_min, clip_max)
/// ```
///
/// Clipping keeps every row strictly interior so no evidence combination
/// becomes impossible.
#[derive(Debug, Clone, PartialEq)]
pub struct SigmoidActivation {
    pub bias: f64,
    pub weight_scale: f64,
    pub clip_min: f64,
    pub clip_max: f64,
}

impl Default for SigmoidActivation {
    fn default() -> Self {
        Self {
            bias: 2.0,
            weight_scale: 2.0,
            clip_min: PROB_FLOOR,
            clip_max: PROB_CEIL,
        }
    }
}

impl From<&GeneratorConfig> for SigmoidActivation {
    fn from(config: &GeneratorConfig) -> Self {
        Self {
            bias: config.bias,
            weight_scale: config.weight_scale,
            clip_min: config.clip_min,
            clip_max: config.clip_max,
        }
    }
}

impl SigmoidActivation {
    /// P(Yes) for a row with `active` parents in state Yes.
    pub fn p_yes(&self, base_prob: f64, active: usize) -> f64 {
        let score = active as f64 * self.weight_scale * base_prob;
        clip_probability(sigmoid(score - self.bias), self.clip_min, self.clip_max)
    }
}

impl CptGenerator for SigmoidActivation {
    fn generate(&self, params: &BetaParams, parents: &[String]) -> Cpt {
        let base = params.mean();
        let k = parents.len();
        let p_yes: Vec<f64> = (0..1usize << k)
            .map(|row| {
                let active = binary_combination(row, k)
                    .into_iter()
                    .filter(|&s| s == YES)
                    .count();
                self.p_yes(base, active)
            })
            .collect();
        Cpt::binary(parents.to_vec(), &p_yes)
    }
}
