use crate::errors::{MortError, RSMortResult};
use statrs::distribution::{ChiSquared, ContinuousCDF, Normal};

// ================================================
// PUBLIC FUNCTIONS
// ================================================

/// Two-sided standard normal quantile for a confidence level, e.g. 1.959964 for 0.95.
pub fn z_value(confidence: f64) -> RSMortResult<f64> {
    let normal = Normal::new(0.0, 1.0).map_err(|e| MortError::invalid_data(e.to_string()))?;
    let alpha = 1.0 - confidence;
    Ok(normal.inverse_cdf(1.0 - alpha / 2.0))
}

/// Exact two-sided confidence limits for a Poisson count.
///
/// ```text
/// O_L = χ²(α/2; 2O) / 2
/// O_U = χ²(1 - α/2; 2O + 2) / 2
/// ```
/// The lower limit is 0 when no events were observed.
pub fn poisson_limits(observed: f64, confidence: f64) -> RSMortResult<(f64, f64)> {
    let alpha = 1.0 - confidence;

    let lower = if observed > 0.0 {
        let chi2 = ChiSquared::new(2.0 * observed)
            .map_err(|e| MortError::invalid_data(e.to_string()))?;
        chi2.inverse_cdf(alpha / 2.0) / 2.0
    } else {
        0.0
    };

    let chi2 = ChiSquared::new(2.0 * observed + 2.0)
        .map_err(|e| MortError::invalid_data(e.to_string()))?;
    let upper = chi2.inverse_cdf(1.0 - alpha / 2.0) / 2.0;

    Ok((lower, upper))
}

/// Round half away from zero to `precision` decimal places.
pub fn round_to(value: f64, precision: u32) -> f64 {
    let factor = 10f64.powi(precision as i32);
    (value * factor).round() / factor
}
