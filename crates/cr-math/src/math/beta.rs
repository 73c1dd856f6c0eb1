//! Beta distribution parameters for the Beta-Bernoulli learning loop.
//!
//! The model uses:
//! - Prior: `p ~ Beta(α, β)`
//! - Likelihood: one Bernoulli observation per feedback event
//! - Posterior after a success: `Beta(α + 1, β)`; after a failure: `Beta(α, β + 1)`

use serde::{Deserialize, Serialize};

/// Mean of Beta(alpha, beta) = alpha / (alpha + beta).
pub fn beta_mean(alpha: f64, beta: f64) -> f64 {
    if alpha.is_nan() || beta.is_nan() || alpha <= 0.0 || beta <= 0.0 {
        return f64::NAN;
    }
    alpha / (alpha + beta)
}

/// Variance of Beta(alpha, beta).
pub fn beta_var(alpha: f64, beta: f64) -> f64 {
    if alpha.is_nan() || beta.is_nan() || alpha <= 0.0 || beta <= 0.0 {
        return f64::NAN;
    }
    let sum = alpha + beta;
    (alpha * beta) / (sum * sum * (sum + 1.0))
}

/// Parameters for a Beta distribution: Beta(alpha, beta).
///
/// Serializes to `{"alpha": .., "beta": ..}`, which is also the durable
/// record layout of the learning store.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BetaParams {
    /// Shape parameter alpha (successes + prior)
    pub alpha: f64,
    /// Shape parameter beta (failures + prior)
    pub beta: f64,
}

impl BetaParams {
    /// Create new Beta parameters with validation.
    ///
    /// Returns None if parameters are non-positive, NaN or infinite.
    pub fn new(alpha: f64, beta: f64) -> Option<Self> {
        let params = Self { alpha, beta };
        params.is_valid().then_some(params)
    }

    /// Symmetric prior Beta(s, s), centered at 0.5.
    pub fn symmetric(strength: f64) -> Option<Self> {
        Self::new(strength, strength)
    }

    /// Both shapes are finite and strictly positive.
    pub fn is_valid(&self) -> bool {
        self.alpha.is_finite() && self.beta.is_finite() && self.alpha > 0.0 && self.beta > 0.0
    }

    /// Posterior mean E[p] = α / (α + β).
    pub fn mean(&self) -> f64 {
        beta_mean(self.alpha, self.beta)
    }

    /// Posterior variance Var[p] = αβ / ((α+β)²(α+β+1)).
    pub fn variance(&self) -> f64 {
        beta_var(self.alpha, self.beta)
    }

    /// Conjugate update for a single Bernoulli observation.
    pub fn observe(&self, success: bool) -> Self {
        if success {
            Self {
                alpha: self.alpha + 1.0,
                beta: self.beta,
            }
        } else {
            Self {
                alpha: self.alpha,
                beta: self.beta + 1.0,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn approx_eq(a: f64, b: f64, tol: f64) -> bool {
        if a.is_nan() || b.is_nan() {
            return false;
        }
        (a - b).abs() <= tol
    }

    #[test]
    fn mean_and_var_match_closed_form() {
        let mean = beta_mean(2.0, 5.0);
        let var = beta_var(2.0, 5.0);
        assert!(approx_eq(mean, 2.0 / 7.0, 1e-12));
        assert!(approx_eq(var, 10.0 / 392.0, 1e-12));
    }

    #[test]
    fn invalid_shapes_are_rejected() {
        assert!(BetaParams::new(0.0, 1.0).is_none());
        assert!(BetaParams::new(1.0, -2.0).is_none());
        assert!(BetaParams::new(f64::NAN, 1.0).is_none());
        assert!(BetaParams::new(f64::INFINITY, 1.0).is_none());
        assert!(beta_mean(-1.0, 1.0).is_nan());
    }

    #[test]
    fn symmetric_prior_is_centered() {
        let p = BetaParams::symmetric(10.0).unwrap();
        assert_eq!(p.mean(), 0.5);
        assert_eq!(p.alpha + p.beta, 20.0);
    }

    #[test]
    fn observe_success_increments_alpha_only() {
        let p = BetaParams::symmetric(10.0).unwrap();
        let next = p.observe(true);
        assert_eq!(next.alpha, 11.0);
        assert_eq!(next.beta, 10.0);
        let twice = next.observe(true);
        assert_eq!(twice.alpha, 12.0);
    }

    #[test]
    fn observe_failure_increments_beta_only() {
        let p = BetaParams::new(3.0, 4.0).unwrap();
        let next = p.observe(false);
        assert_eq!(next.alpha, 3.0);
        assert_eq!(next.beta, 5.0);
    }

    #[test]
    fn serializes_as_flat_record() {
        let p = BetaParams::new(11.0, 10.0).unwrap();
        let json = serde_json::to_string(&p).unwrap();
        assert_eq!(json, r#"{"alpha":11.0,"beta":10.0}"#);
    }
}
