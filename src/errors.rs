//! # Errors
//!
//! One error type, [`MortError`], for every fallible operation in the crate.
//!
//! The computational variants map one-to-one onto the failure modes of the two
//! engines. They are raised at the first violation and no partial table or rate is
//! ever returned alongside them. The remaining variants wrap the ambient stack
//! (configuration validation, polars, spreadsheet readers and HTTP).
use polars::prelude::PolarsError;

/// Crate-wide result alias.
pub type RSMortResult<T> = Result<T, MortError>;

#[derive(Debug, thiserror::Error)]
pub enum MortError {
    // ---- Engine failures ----
    /// Population is zero for a stratum that contributes to a rate.
    #[error("population is zero in stratum '{stratum}', rate is undefined")]
    DivisionByZeroInStratum { stratum: String },

    /// Weight and data age-group partitions cannot be reconciled.
    #[error("age-group partitions cannot be reconciled: {0}")]
    PartitionMismatch(String),

    /// Non-contiguous, duplicate, or negative-count life table rows.
    #[error("malformed life table input: {0}")]
    MalformedLifeTableInput(String),

    /// Central mortality rate is zero at the open-ended terminal age band.
    #[error("person-years in the open-ended age band {age}+ are undefined: no deaths observed")]
    UndefinedTerminalPersonYears { age: u32 },

    // ---- Input validation ----
    #[error("cannot parse age group label '{0}'")]
    InvalidAgeGroup(String),

    #[error("invalid data: {0}")]
    InvalidData(String),

    // ---- Wrapped ----
    #[error(transparent)]
    Config(#[from] garde::Report),

    #[error(transparent)]
    Polars(#[from] PolarsError),

    #[error(transparent)]
    Spreadsheet(#[from] calamine::Error),

    #[error(transparent)]
    Ods(#[from] spreadsheet_ods::OdsError),

    #[error(transparent)]
    Http(#[from] reqwest::Error),
}

impl MortError {
    pub(crate) fn invalid_data(message: impl Into<String>) -> Self {
        MortError::InvalidData(message.into())
    }
}

// ================================================
// UNIT TESTS
// ================================================
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_names_stratum() {
        let err = MortError::DivisionByZeroInStratum {
            stratum: "85+".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "population is zero in stratum '85+', rate is undefined"
        );
    }

    #[test]
    fn test_polars_error_converts() {
        fn fails() -> RSMortResult<()> {
            Err(PolarsError::ColumnNotFound("deaths".into()))?
        }
        assert!(matches!(fails(), Err(MortError::Polars(_))));
    }
}
