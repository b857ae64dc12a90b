//! # RSMort
//!
//! Mortality statistics in Rust: age-standardised rates with confidence intervals and
//! period life tables, built on polars DataFrames.
//!
//! ## Features
//! - **Age Standardisation**: direct standardisation against any reference population,
//!   with the European Standard Population 2013 built in
//! - **Confidence Intervals**: normal approximation or Dobson exact Poisson limits
//! - **Life Tables**: single-year period life tables with Chiang II intervals on life expectancy
//! - **Flexible Data**: load from DataFrames, spreadsheets (ODS/XLSX) or a workbook URL
//! - **Builder Pattern**: every engine entry point and configuration uses a validated builder
//!
//! ## Quick Start
//!
//! ```rust
//! use rsmort::prelude::*;
//!
//! let data = obsdf! {
//!     "age_group" => ["0-49", "50+"],
//!     "deaths" => [50.0, 200.0],
//!     "population" => [10_000.0, 5_000.0],
//! }?;
//! let std_pop = StdPop::from_pairs(&[("0-49", 30_000.0), ("50+", 70_000.0)])?;
//!
//! let config = StandardisationConfig::builder()
//!     .ci_method(CiMethod::Dobson)
//!     .build()?;
//! let rate = asmr().data(&data).std_pop(&std_pop).config(config).call()?;
//! println!("ASMR per 100,000: {:.1} ({:.1} to {:.1})", rate.asmr, rate.ci_lower, rate.ci_upper);
//!
//! let single_year = obsdf! {
//!     "age" => [0u32, 1, 2],
//!     "deaths" => [4.0, 1.0, 60.0],
//!     "population" => [1_000.0, 1_000.0, 800.0],
//! }?;
//! let table = life_table().data(&single_year).call()?;
//! println!("{}", table.to_df()?);
//! # RSMortResult::Ok(())
//! ```
//!
//! ## Supported Functions
//!
//! - **Standardisation**: `asmr`, `asmr_from_records`, `coarsen`
//! - **Crude Rates**: `crude_rate`, `crude_rate_ci`
//! - **Life Tables**: `life_table`, `life_table_from_records`, `LifeTable::ex_confidence_intervals`
//!
//! ## Notes
//! - Engines never round; rounding is applied when a result is reported
//! - Failures are returned as [`errors::MortError`] and never yield partial results
//! - Diagnostics are emitted through `tracing`; install any subscriber to see them

pub use errors::RSMortResult;

pub mod age_group;
pub mod data;
pub mod errors;
pub mod helpers;
pub mod life_table;
mod macros;
pub mod params;
pub mod prelude;
pub mod standardisation;
