//! Normal survival function via the `statrs` crate.

use statrs::distribution::{ContinuousCDF, Normal};

/// Normal survival function P(X > x) for X ~ N(mean, std²).
///
/// Returns NaN when `std` is not strictly positive and finite, or when
/// either `x` or `mean` is NaN. Exactly 0.5 at the mean.
pub fn normal_sf(x: f64, mean: f64, std: f64) -> f64 {
    if x.is_nan() || mean.is_nan() || !std.is_finite() || std <= 0.0 {
        return f64::NAN;
    }
    if x == mean {
        return 0.5;
    }
    match Normal::new(mean, std) {
        Ok(dist) => dist.sf(x),
        Err(_) => f64::NAN,
    }
}
