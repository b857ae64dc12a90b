//! # Period Life Table
//!
//! Builds a period life table from single-year deaths and population counts,
//! giving life expectancy at every age.
//!
//! ## Columns
//! ```text
//! mₓ = Dₓ / Pₓ                                central death rate
//! q₀ = m₀ / (1 + m₀)                          infant probability of death
//! qₓ = 2mₓ / (2 + mₓ)          x > 0
//! l₀ = radix,  lₓ = lₓ₋₁ · (1 - qₓ₋₁)         forward scan
//! dₓ = lₓ · qₓ
//! L₀ = l₁ + a₀ · d₀
//! Lₓ = (lₓ + lₓ₊₁) / 2         0 < x < N
//! L_N = l_N / m_N
//! T_N = L_N,  Tₓ = Tₓ₊₁ + Lₓ                   backward scan
//! eₓ = Tₓ / lₓ
//! ```
//!
//! Every column is kept at full precision. Rounding to the configured number of
//! decimals happens only in [`LifeTable::to_df`] and [`LifeTable::rounded_ex`].
//!
//! ## Quick Start
//! ```rust
//! # use rsmort::prelude::*;
//! use polars::prelude::*;
//!
//! let data = ObsData::from_df(df! {
//!     "age" => [0u32, 1],
//!     "deaths" => [10.0, 5.0],
//!     "population" => [1_000.0, 500.0],
//! }?)?;
//!
//! let table = life_table().data(&data).call()?;
//! assert!((table.ex_at(1).unwrap() - 100.0).abs() < 1e-9);
//! println!("{}", table.to_df()?);
//! # RSMortResult::Ok(())
//! ```

#![allow(non_snake_case)]

use crate::data::{ObsData, SingleAgeRecord};
use crate::errors::{MortError, RSMortResult};
use crate::helpers::{round_to, z_value};
use crate::params::LifeTableConfig;
use bon::builder;
use garde::Validate;
use polars::prelude::*;
use tracing::{debug, warn};

// =======================================
// RESULT TYPES
// =======================================

/// One age of a period life table.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LifeTableRow {
    pub age: u32,
    pub deaths: f64,
    pub population: f64,
    /// Central death rate
    pub mx: f64,
    /// Probability of dying between x and x + 1
    pub qx: f64,
    /// Survivors at exact age x
    pub lx: f64,
    /// Deaths between x and x + 1
    pub dx: f64,
    /// Person-years lived between x and x + 1
    pub Lx: f64,
    /// Person-years lived beyond x
    pub Tx: f64,
    /// Life expectancy at x
    pub ex: f64,
}

/// Life expectancy at one age with its Chiang II confidence interval.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LifeExpectancyCi {
    pub age: u32,
    pub ex: f64,
    pub se: f64,
    pub ci_lower: f64,
    pub ci_upper: f64,
}

/// A complete period life table, youngest age first. The last row is the open-ended band.
#[derive(Debug, Clone)]
pub struct LifeTable {
    pub rows: Vec<LifeTableRow>,
    pub config: LifeTableConfig,
}

impl LifeTable {
    pub fn row(&self, age: u32) -> Option<&LifeTableRow> {
        self.rows.iter().find(|r| r.age == age)
    }

    /// Life expectancy at `age`, full precision.
    pub fn ex_at(&self, age: u32) -> Option<f64> {
        self.row(age).map(|r| r.ex)
    }

    /// `(age, ex)` pairs rounded to the configured precision.
    pub fn rounded_ex(&self) -> Vec<(u32, f64)> {
        self.rows
            .iter()
            .map(|r| (r.age, round_to(r.ex, self.config.precision)))
            .collect()
    }

    /// Report the table as a DataFrame.
    ///
    /// Columns: `age`, `deaths`, `population`, `mx`, `qx`, `lx`, `dx`, `Lx`, `Tx`, `ex`.
    /// `ex` is rounded to the configured precision; all other columns are unrounded.
    pub fn to_df(&self) -> RSMortResult<DataFrame> {
        let column = |f: fn(&LifeTableRow) -> f64| self.rows.iter().map(f).collect::<Vec<f64>>();
        let precision = self.config.precision;

        let df = df! {
            "age" => self.rows.iter().map(|r| r.age).collect::<Vec<u32>>(),
            "deaths" => column(|r| r.deaths),
            "population" => column(|r| r.population),
            "mx" => column(|r| r.mx),
            "qx" => column(|r| r.qx),
            "lx" => column(|r| r.lx),
            "dx" => column(|r| r.dx),
            "Lx" => column(|r| r.Lx),
            "Tx" => column(|r| r.Tx),
            "ex" => self.rows.iter().map(|r| round_to(r.ex, precision)).collect::<Vec<f64>>(),
        }?;
        Ok(df)
    }

    /// Chiang II confidence intervals for life expectancy at every age.
    ///
    /// # Formula
    /// ```text
    /// Var(qᵢ)  = qᵢ² · (1 - qᵢ) / Dᵢ                     (0 when Dᵢ = 0)
    /// Var(m_N) = D_N / P_N²
    /// Var(eₓ)  = [ Σᵢ₌ₓ^{N-1} lᵢ² · ((1 - aᵢ) + eᵢ₊₁)² · Var(qᵢ) + l_N² / m_N⁴ · Var(m_N) ] / lₓ²
    /// ```
    /// with `a₀` from the configuration and `aᵢ = 0.5` elsewhere. The last term is the
    /// Silcocks adjustment for the open-ended band.
    pub fn ex_confidence_intervals(&self) -> RSMortResult<Vec<LifeExpectancyCi>> {
        let z = z_value(self.config.confidence)?;
        let last = self.rows.len().saturating_sub(1);

        // Per-row variance contributions, then a suffix sum over them
        let contributions: Vec<f64> = self
            .rows
            .iter()
            .enumerate()
            .map(|(i, r)| {
                if i == last {
                    let var_mx = r.deaths / r.population.powi(2);
                    r.lx.powi(2) / r.mx.powi(4) * var_mx
                } else {
                    let var_qx = if r.deaths > 0.0 {
                        r.qx.powi(2) * (1.0 - r.qx) / r.deaths
                    } else {
                        0.0
                    };
                    let ax = if i == 0 { self.config.a0 } else { 0.5 };
                    let e_next = self.rows[i + 1].ex;
                    r.lx.powi(2) * ((1.0 - ax) + e_next).powi(2) * var_qx
                }
            })
            .collect();

        let suffix_sums = suffix_scan(&contributions);

        let result = self
            .rows
            .iter()
            .zip(suffix_sums)
            .map(|(r, sum)| {
                let se = if r.lx > 0.0 {
                    (sum / r.lx.powi(2)).sqrt()
                } else {
                    0.0
                };
                LifeExpectancyCi {
                    age: r.age,
                    ex: r.ex,
                    se,
                    ci_lower: r.ex - z * se,
                    ci_upper: r.ex + z * se,
                }
            })
            .collect();
        Ok(result)
    }
}

// =======================================
// PUBLIC FUNCTIONS
// =======================================

/// Build a period life table from observed single-year data.
///
/// Rows are sorted by age first, so the frame may arrive in any order.
///
/// # Errors
/// - `InvalidData` if the data is keyed on age groups rather than single years
/// - all errors from [`life_table_from_records`]
#[builder]
pub fn life_table(
    data: &ObsData,
    #[builder(default)] config: LifeTableConfig,
) -> RSMortResult<LifeTable> {
    let mut records = data.single_year_records()?;
    records.sort_by_key(|r| r.age);
    life_table_from_records(&records, &config)
}

/// Build a period life table from ordered single-year records, ages `0..=N`.
///
/// All input checks run before any column is computed.
///
/// # Errors
/// - `MalformedLifeTableInput`: empty input, first age not 0, gaps, duplicates,
///   negative or non-finite counts
/// - `DivisionByZeroInStratum`: zero population at any age
/// - `UndefinedTerminalPersonYears`: no deaths in the open-ended band
/// - `Config`: invalid configuration
pub fn life_table_from_records(
    records: &[SingleAgeRecord],
    config: &LifeTableConfig,
) -> RSMortResult<LifeTable> {
    config.validate()?;
    validate_records(records)?;

    let last = records.len() - 1;
    let radix = f64::from(config.radix);

    // mₓ = Dₓ / Pₓ
    let mx: Vec<f64> = records.iter().map(|r| r.deaths / r.population).collect();

    // qₓ, with the infant band treated separately
    let qx: Vec<f64> = mx
        .iter()
        .enumerate()
        .map(|(i, &m)| {
            let q = if i == 0 {
                m / (1.0 + m)
            } else {
                2.0 * m / (2.0 + m)
            };
            if q > 1.0 {
                warn!(age = records[i].age, mx = m, "qx exceeds 1, capped at 1");
                1.0
            } else {
                q
            }
        })
        .collect();

    // lₓ = lₓ₋₁ · (1 - qₓ₋₁)
    let lx: Vec<f64> = qx
        .iter()
        .scan(radix, |survivors, &q| {
            let current = *survivors;
            *survivors = current * (1.0 - q);
            Some(current)
        })
        .collect();

    // dₓ = lₓ · qₓ
    let dx: Vec<f64> = lx.iter().zip(&qx).map(|(l, q)| l * q).collect();

    // Lₓ
    let Lx: Vec<f64> = (0..=last)
        .map(|i| {
            if i == last {
                lx[i] / mx[i]
            } else if i == 0 {
                lx[1] + config.a0 * dx[0]
            } else {
                (lx[i] + lx[i + 1]) / 2.0
            }
        })
        .collect();

    // Tₓ = Tₓ₊₁ + Lₓ
    let Tx = suffix_scan(&Lx);

    let rows: Vec<LifeTableRow> = records
        .iter()
        .enumerate()
        .map(|(i, r)| LifeTableRow {
            age: r.age,
            deaths: r.deaths,
            population: r.population,
            mx: mx[i],
            qx: qx[i],
            lx: lx[i],
            dx: dx[i],
            Lx: Lx[i],
            Tx: Tx[i],
            // No survivors means no remaining lifetime
            ex: if lx[i] > 0.0 { Tx[i] / lx[i] } else { 0.0 },
        })
        .collect();

    debug!(
        ages = rows.len(),
        e0 = rows[0].ex,
        "computed period life table"
    );

    Ok(LifeTable {
        rows,
        config: config.clone(),
    })
}

// =======================================
// PRIVATE FUNCTIONS
// =======================================

/// Reverse cumulative sum: out[i] = Σ values[i..].
fn suffix_scan(values: &[f64]) -> Vec<f64> {
    let mut sums: Vec<f64> = values
        .iter()
        .rev()
        .scan(0.0, |acc, &v| {
            *acc += v;
            Some(*acc)
        })
        .collect();
    sums.reverse();
    sums
}

fn validate_records(records: &[SingleAgeRecord]) -> RSMortResult<()> {
    let malformed = |msg: String| Err(MortError::MalformedLifeTableInput(msg));

    let Some(first) = records.first() else {
        return malformed("no ages supplied".to_string());
    };
    if first.age != 0 {
        return malformed(format!("ages must start at 0, first age is {}", first.age));
    }

    for pair in records.windows(2) {
        let (prev, next) = (pair[0].age, pair[1].age);
        if next == prev {
            return malformed(format!("age {next} appears more than once"));
        }
        if next != prev + 1 {
            return malformed(format!("ages are not contiguous: {prev} is followed by {next}"));
        }
    }

    for r in records {
        for (name, value) in [("deaths", r.deaths), ("population", r.population)] {
            if !value.is_finite() || value < 0.0 {
                return malformed(format!(
                    "{name} at age {} must be finite and non-negative, got {value}",
                    r.age
                ));
            }
        }
    }

    if let Some(r) = records.iter().find(|r| r.population == 0.0) {
        return Err(MortError::DivisionByZeroInStratum {
            stratum: r.age.to_string(),
        });
    }

    // Checked above: records is non-empty
    let terminal = records[records.len() - 1];
    if terminal.deaths == 0.0 {
        return Err(MortError::UndefinedTerminalPersonYears { age: terminal.age });
    }

    Ok(())
}
