//! # RSMort Prelude
//!
//! Re-exports the types and functions needed for standardised rates and life tables.
//!
//! ## Example
//!
//! ```rust
//! # use rsmort::prelude::*;
//! use polars::prelude::*;
//! let df = df! {
//!     "age_group" => ["0-64", "65+"],
//!     "deaths" => [120.0, 900.0],
//!     "population" => [80_000.0, 15_000.0],
//! }?;
//! let data = ObsData::from_df(df)?;
//! let esp = StdPop::from_pairs(&[("0-64", 80_000.0), ("65+", 20_000.0)])?;
//! let config = StandardisationConfig::builder()
//!     .rate_base(1_000.0)
//!     .confidence(0.99)
//!     .build()?;
//! let result = asmr().data(&data).std_pop(&esp).config(config).call()?;
//! println!("ASMR per 1,000: {:.3}", result.asmr);
//! # RSMortResult::Ok(())
//! ```

// Package Result and error types
pub use crate::RSMortResult;
pub use crate::errors::MortError;

// Age bands
pub use crate::age_group::AgeBand;

// Input data
pub use crate::data::{AgeGroupRecord, ObsData, SingleAgeRecord, StdPop, WeightRecord};

// Configuration
pub use crate::params::{CiMethod, LifeTableConfig, StandardisationConfig};

// Engines
pub use crate::life_table::*;
pub use crate::standardisation::*;

// Macro
pub use crate::obsdf;

// Most commonly used Polars types for working with results
pub use polars::prelude::{DataFrame, LazyFrame, PolarsError, PolarsResult, Series};
