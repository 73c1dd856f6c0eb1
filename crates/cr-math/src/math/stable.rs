//! Numerically stable primitives for probability-domain math.

/// Smallest probability a generated table row may carry.
pub const PROB_FLOOR: f64 = 0.01;

/// Largest probability a generated table row may carry.
pub const PROB_CEIL: f64 = 0.99;

/// Logistic sigmoid 1 / (1 + exp(-x)).
///
/// Evaluated on the branch that never exponentiates a large positive
/// number, so the result is finite for every finite input.
pub fn sigmoid(x: f64) -> f64 {
    if x.is_nan() {
        return f64::NAN;
    }
    if x >= 0.0 {
        1.0 / (1.0 + (-x).exp())
    } else {
        let e = x.exp();
        e / (1.0 + e)
    }
}

/// Clip a probability into `[lo, hi]`.
///
/// NaN stays NaN so callers can detect it instead of silently
/// receiving a bound.
pub fn clip_probability(p: f64, lo: f64, hi: f64) -> f64 {
    if p.is_nan() {
        return f64::NAN;
    }
    p.clamp(lo, hi)
}

/// Round to a fixed number of decimal places (used for reported scores).
pub fn round_to(value: f64, places: u32) -> f64 {
    if !value.is_finite() {
        return value;
    }
    let scale = 10f64.powi(places as i32);
    (value * scale).round() / scale
}
