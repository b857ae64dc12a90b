use crate::errors::RSMortResult;
use bon::bon;
use garde::Validate;

// =======================================
// CONFIDENCE INTERVAL METHOD
// =======================================

/// How the confidence interval around an age-standardised rate is formed.
///
/// - **Normal**: ASMR ± z·SE
/// - **Dobson**: exact Poisson limits on the total death count, scaled onto the ASMR
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CiMethod {
    /// Normal approximation around the standard error.
    Normal,

    /// Dobson et al. (1991) method for weighted sums of Poisson counts.
    Dobson,
}

// =======================================
// AGE-STANDARDISATION CONFIGURATION
// =======================================

/// Configuration for age-standardised rates.
///
/// Defaults: rates per 100,000, 95% confidence, normal-approximation interval.
#[derive(Debug, Clone, Validate)]
#[garde(allow_unvalidated)]
pub struct StandardisationConfig {
    /// Multiplier applied to deaths / population. Common values: 1,000 or 100,000.
    #[garde(custom(validate_positive))]
    pub rate_base: f64,

    /// Two-sided confidence level, strictly between 0 and 1.
    #[garde(custom(validate_confidence))]
    pub confidence: f64,

    pub ci_method: CiMethod,
}

#[bon]
impl StandardisationConfig {
    #[builder]
    pub fn new(
        #[builder(default = 100_000.0)] rate_base: f64,
        #[builder(default = 0.95)] confidence: f64,
        #[builder(default = CiMethod::Normal)] ci_method: CiMethod,
    ) -> RSMortResult<Self> {
        let config = StandardisationConfig {
            rate_base,
            confidence,
            ci_method,
        };

        config.validate()?;
        Ok(config)
    }
}

impl Default for StandardisationConfig {
    fn default() -> Self {
        Self {
            rate_base: 100_000.0,
            confidence: 0.95,
            ci_method: CiMethod::Normal,
        }
    }
}

// =======================================
// LIFE TABLE CONFIGURATION
// =======================================

/// Configuration for period life tables.
///
/// Defaults: radix 100,000, a0 of 0.1, life expectancy reported to 2 decimals, 95% confidence.
#[derive(Debug, Clone, Validate)]
#[garde(allow_unvalidated)]
pub struct LifeTableConfig {
    /// Starting cohort size l₀.
    #[garde(range(min = 1))]
    pub radix: u32,

    /// Average fraction of the first year lived by infants who die in it.
    #[garde(range(min = 0.0, max = 1.0))]
    pub a0: f64,

    /// Decimal places used when the table is reported. Never applied mid-computation.
    #[garde(range(max = 15))]
    pub precision: u32,

    /// Two-sided confidence level for life expectancy intervals.
    #[garde(custom(validate_confidence))]
    pub confidence: f64,
}

#[bon]
impl LifeTableConfig {
    #[builder]
    pub fn new(
        #[builder(default = 100_000)] radix: u32,
        #[builder(default = 0.1)] a0: f64,
        #[builder(default = 2)] precision: u32,
        #[builder(default = 0.95)] confidence: f64,
    ) -> RSMortResult<Self> {
        let config = LifeTableConfig {
            radix,
            a0,
            precision,
            confidence,
        };

        config.validate()?;
        Ok(config)
    }
}

impl Default for LifeTableConfig {
    fn default() -> Self {
        Self {
            radix: 100_000,
            a0: 0.1,
            precision: 2,
            confidence: 0.95,
        }
    }
}

// =======================================
// PRIVATE FUNCTIONS
// =======================================

fn validate_positive(value: &f64, _context: &()) -> garde::Result {
    if !value.is_finite() || *value <= 0.0 {
        return Err(garde::Error::new(format!(
            "rate base must be a positive finite number, got {value}"
        )));
    }
    Ok(())
}

fn validate_confidence(value: &f64, _context: &()) -> garde::Result {
    if !(*value > 0.0 && *value < 1.0) {
        return Err(garde::Error::new(format!(
            "confidence level must lie strictly between 0 and 1, got {value}"
        )));
    }
    Ok(())
}

// =======================================
// UNIT TESTS
// =======================================
#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::MortError;

    #[test]
    fn test_standardisation_defaults() {
        let config = StandardisationConfig::builder().build().unwrap();
        assert_eq!(config.rate_base, 100_000.0);
        assert_eq!(config.confidence, 0.95);
        assert_eq!(config.ci_method, CiMethod::Normal);

        let default = StandardisationConfig::default();
        assert_eq!(default.rate_base, config.rate_base);
    }

    #[test]
    fn test_life_table_defaults() {
        let config = LifeTableConfig::builder().build().unwrap();
        assert_eq!(config.radix, 100_000);
        assert_eq!(config.a0, 0.1);
        assert_eq!(config.precision, 2);
    }

    #[test]
    fn test_invalid_configs_rejected() {
        let result = StandardisationConfig::builder().rate_base(0.0).build();
        assert!(matches!(result, Err(MortError::Config(_))));

        let result = StandardisationConfig::builder().confidence(1.0).build();
        assert!(matches!(result, Err(MortError::Config(_))));

        let result = LifeTableConfig::builder().radix(0).build();
        assert!(matches!(result, Err(MortError::Config(_))));

        let result = LifeTableConfig::builder().a0(1.5).build();
        assert!(matches!(result, Err(MortError::Config(_))));
    }
}
