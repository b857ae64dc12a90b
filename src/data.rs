//! # Input Data
//!
//! Validated tabular inputs for both engines, held as polars DataFrames.
//!
//! - [`ObsData`]: observed deaths and population, keyed by single-year `age` or by `age_group`
//! - [`StdPop`]: a reference standard population (`age_group`, `weight`), including the
//!   built-in European Standard Population 2013
//!
//! Both load from DataFrames, XLSX/XLS and ODS workbooks, or a workbook URL. Schema
//! checks run on construction so the engines only see well-typed, non-negative counts.
//!
//! ## Quick Start
//! ```rust
//! # use rsmort::prelude::*;
//! use polars::prelude::*;
//!
//! let data = ObsData::from_df(df! {
//!     "age_group" => ["0-64", "65+"],
//!     "deaths" => [120.0, 900.0],
//!     "population" => [80_000.0, 15_000.0],
//! }?)?;
//! let std_pop = StdPop::from_pairs(&[("0-64", 80_000.0), ("65+", 20_000.0)])?;
//! println!("{} strata, total weight {}", data.records()?.len(), std_pop.total_weight()?);
//! # RSMortResult::Ok(())
//! ```

pub mod obs_data;
mod spreadsheet_helpers;
pub mod std_pop;

pub use self::obs_data::{AgeGroupRecord, ObsData, SingleAgeRecord};
pub use self::std_pop::{StdPop, WeightRecord};
