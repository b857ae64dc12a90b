//! # Age Standardisation
//!
//! Age-specific and age-standardised mortality rates with confidence intervals.
//!
//! ## Pipeline
//! 1. **Reconcile** the age-group partitions of the observed data and the standard
//!    population. Standard bands with no observed counterpart join the computation
//!    as zero-death strata instead of being dropped.
//! 2. **Re-bucket** whichever side is finer. Standard weights nested in one observed
//!    band are coarsened onto it ([`coarsen`]), e.g. `85-89` + `90-94` + `95+` collapse
//!    into an observed `85+`. Observed bands tiling one standard band are summed into
//!    it, e.g. single years `1`, `2`, `3`, `4` into `1-4`.
//! 3. **Rates**: `rateᵢ = dᵢ / nᵢ · rate_base` for each stratum.
//! 4. **ASMR** and its variance:
//! ```text
//! ASMR   = Σ rateᵢ·wᵢ / Σ wᵢ
//! Var    = rate_base² · Σ (wᵢ² · dᵢ / nᵢ²) / (Σ wᵢ)²
//! SE     = √Var
//! ```
//! 5. **Confidence interval** by [`CiMethod`]:
//! ```text
//! Normal: ASMR ± z·SE
//! Dobson: ASMR + √(Var / O) · (O_L - O),  ASMR + √(Var / O) · (O_U - O)
//! ```
//! where `O = Σ dᵢ` and `O_L`, `O_U` are exact Poisson limits for `O`.
//!
//! ## Quick Start
//! ```rust
//! # use rsmort::prelude::*;
//! use polars::prelude::*;
//!
//! let data = ObsData::from_df(df! {
//!     "age_group" => ["0-49", "50+"],
//!     "deaths" => [50.0, 200.0],
//!     "population" => [10_000.0, 5_000.0],
//! }?)?;
//! let std_pop = StdPop::from_pairs(&[("0-49", 30_000.0), ("50+", 70_000.0)])?;
//!
//! let result = asmr().data(&data).std_pop(&std_pop).call()?;
//! assert!((result.asmr - 2950.0).abs() < 1e-9);
//! println!("ASMR {:.1} ({:.1} to {:.1})", result.asmr, result.ci_lower, result.ci_upper);
//! # RSMortResult::Ok(())
//! ```

use crate::age_group::{AgeBand, validate_partition};
use crate::data::{AgeGroupRecord, ObsData, StdPop, WeightRecord};
use crate::errors::{MortError, RSMortResult};
use crate::helpers::{poisson_limits, z_value};
use crate::params::{CiMethod, StandardisationConfig};
use bon::builder;
use garde::Validate;
use polars::prelude::*;
use tracing::{debug, warn};

// =======================================
// RESULT TYPES
// =======================================

/// Rate for one age stratum, together with the counts and weight behind it.
///
/// `rate` is `None` only for a stratum with zero population and zero weight, which
/// takes no part in the standardised rate.
#[derive(Debug, Clone, PartialEq)]
pub struct AgeSpecificRate {
    pub age_group: String,
    pub band: AgeBand,
    pub deaths: f64,
    pub population: f64,
    pub weight: f64,
    pub rate: Option<f64>,
}

/// Age-standardised rate with its standard error and confidence interval.
#[derive(Debug, Clone, PartialEq)]
pub struct StandardisedRate {
    pub asmr: f64,
    pub se: f64,
    pub ci_lower: f64,
    pub ci_upper: f64,
    pub total_deaths: f64,
    pub confidence: f64,
    pub ci_method: CiMethod,
    /// One entry per stratum of the reconciled partition, youngest first.
    pub per_group_rates: Vec<AgeSpecificRate>,
}

impl StandardisedRate {
    /// Age-specific rate for a stratum, looked up by label (`"85+"`, `"85 and over"` both work).
    pub fn rate(&self, age_group: &str) -> Option<f64> {
        let band: AgeBand = age_group.parse().ok()?;
        self.per_group_rates
            .iter()
            .find(|r| r.band == band)
            .and_then(|r| r.rate)
    }

    /// Per-stratum table: `age_group`, `deaths`, `population`, `weight`, `rate`.
    pub fn to_df(&self) -> RSMortResult<DataFrame> {
        let rows = &self.per_group_rates;
        let df = df! {
            "age_group" => rows.iter().map(|r| r.age_group.clone()).collect::<Vec<_>>(),
            "deaths" => rows.iter().map(|r| r.deaths).collect::<Vec<_>>(),
            "population" => rows.iter().map(|r| r.population).collect::<Vec<_>>(),
            "weight" => rows.iter().map(|r| r.weight).collect::<Vec<_>>(),
            "rate" => rows.iter().map(|r| r.rate).collect::<Vec<_>>(),
        }?;
        Ok(df)
    }
}

/// Crude (all-ages) rate with exact Poisson confidence limits.
#[derive(Debug, Clone, PartialEq)]
pub struct CrudeRate {
    pub rate: f64,
    pub ci_lower: f64,
    pub ci_upper: f64,
    pub deaths: f64,
    pub population: f64,
}

// =======================================
// PUBLIC FUNCTIONS
// =======================================

/// Age-specific rate: `deaths / population · rate_base`.
///
/// # Errors
/// - `DivisionByZeroInStratum` when `population` is zero
pub fn crude_rate(deaths: f64, population: f64, rate_base: f64, stratum: &str) -> RSMortResult<f64> {
    if population == 0.0 {
        return Err(MortError::DivisionByZeroInStratum {
            stratum: stratum.to_string(),
        });
    }
    Ok(deaths / population * rate_base)
}

/// Re-bucket standard weights onto a target partition.
///
/// Each weight band must lie inside exactly one target band, and its weight is added
/// to that band. Target bands that receive nothing get weight 0. The result is in
/// ascending age order, labelled by the target bands.
///
/// # Errors
/// - `PartitionMismatch` if target bands overlap, or a weight band straddles target
///   bands or lies outside all of them
///
/// # Examples
/// ```rust
/// # use rsmort::prelude::*;
/// let weights = vec![
///     WeightRecord::new("80-84", 2_500.0)?,
///     WeightRecord::new("85-89", 1_500.0)?,
///     WeightRecord::new("90+", 1_000.0)?,
/// ];
/// let target: [AgeBand; 2] = ["80-84".parse()?, "85+".parse()?];
/// let coarse = coarsen(&weights, &target)?;
/// assert_eq!(coarse[1].weight, 2_500.0);
/// # RSMortResult::Ok(())
/// ```
pub fn coarsen(weights: &[WeightRecord], target: &[AgeBand]) -> RSMortResult<Vec<WeightRecord>> {
    let target = validate_partition(target)?;
    let mut sums = vec![0.0; target.len()];

    for w in weights {
        let slot = target
            .iter()
            .position(|band| band.contains(&w.band))
            .ok_or_else(|| {
                MortError::PartitionMismatch(format!(
                    "standard age group {} does not fit inside any target age group",
                    w.band
                ))
            })?;
        sums[slot] += w.weight;
    }

    let result = target
        .into_iter()
        .zip(sums)
        .map(|(band, weight)| WeightRecord {
            age_group: band.to_string(),
            band,
            weight,
        })
        .collect();
    Ok(result)
}

/// Age-standardised mortality rate from observed data and a standard population.
///
/// See the module documentation for the full pipeline.
///
/// # Errors
/// - `PartitionMismatch`: overlapping observed age groups, observed and standard
///   bands cutting across each other, observed bands covering only part of a standard
///   band, or no weight on any observed stratum
/// - `DivisionByZeroInStratum`: zero population in a stratum with nonzero weight
/// - `Config`: invalid configuration
///
/// # Example
/// ```rust
/// # use rsmort::prelude::*;
/// # use polars::prelude::*;
/// let data = ObsData::from_df(df! {
///     "age_group" => ["0-4", "5-84", "85+"],
///     "deaths" => [4.0, 300.0, 900.0],
///     "population" => [40_000.0, 600_000.0, 15_000.0],
/// }?)?;
/// let esp = StdPop::from_builtin("ESP2013")?;
/// let config = StandardisationConfig::builder().ci_method(CiMethod::Dobson).build()?;
///
/// let result = asmr().data(&data).std_pop(&esp).config(config).call()?;
/// println!("{:.1} per 100,000", result.asmr);
/// # RSMortResult::Ok(())
/// ```
#[builder]
pub fn asmr(
    data: &ObsData,
    std_pop: &StdPop,
    #[builder(default)] config: StandardisationConfig,
) -> RSMortResult<StandardisedRate> {
    let records = data.records()?;
    let weights = std_pop.records()?;
    asmr_from_records(&records, &weights, &config)
}

/// Age-standardised mortality rate from in-memory records.
pub fn asmr_from_records(
    records: &[AgeGroupRecord],
    weights: &[WeightRecord],
    config: &StandardisationConfig,
) -> RSMortResult<StandardisedRate> {
    config.validate()?;

    let strata = reconcile(records, weights)?;
    let rate_base = config.rate_base;

    // Rates per stratum
    let mut per_group_rates = Vec::with_capacity(strata.len());
    for stratum in strata {
        let rate = match (&stratum.record, stratum.weight > 0.0) {
            (Some(r), true) => Some(crude_rate(r.deaths, r.population, rate_base, &r.age_group)?),
            (Some(r), false) if r.population == 0.0 => {
                warn!(
                    age_group = %r.age_group,
                    "zero population in a stratum with zero weight, stratum excluded"
                );
                None
            }
            (Some(r), false) => Some(r.deaths / r.population * rate_base),
            (None, _) => {
                warn!(
                    age_group = %stratum.band,
                    "no observed data for standard age group, counted as zero deaths"
                );
                Some(0.0)
            }
        };

        let (age_group, deaths, population) = match &stratum.record {
            Some(r) => (r.age_group.clone(), r.deaths, r.population),
            None => (stratum.band.to_string(), 0.0, 0.0),
        };

        per_group_rates.push(AgeSpecificRate {
            age_group,
            band: stratum.band,
            deaths,
            population,
            weight: stratum.weight,
            rate,
        });
    }

    let total_weight: f64 = per_group_rates.iter().map(|r| r.weight).sum();
    if total_weight <= 0.0 {
        return Err(MortError::PartitionMismatch(
            "standard population puts no weight on any observed age group".to_string(),
        ));
    }

    // ASMR = Σ rateᵢ·wᵢ / Σ wᵢ
    let weighted_sum: f64 = per_group_rates
        .iter()
        .filter_map(|r| r.rate.map(|rate| rate * r.weight))
        .sum();
    let asmr = weighted_sum / total_weight;

    // Var = rate_base² · Σ (wᵢ²·dᵢ/nᵢ²) / (Σ wᵢ)²
    let variance_sum: f64 = per_group_rates
        .iter()
        .filter(|r| r.weight > 0.0 && r.population > 0.0)
        .map(|r| r.weight.powi(2) * r.deaths / r.population.powi(2))
        .sum();
    let variance = rate_base.powi(2) * variance_sum / total_weight.powi(2);
    let se = variance.sqrt();

    let total_deaths: f64 = per_group_rates.iter().map(|r| r.deaths).sum();

    let (ci_lower, ci_upper) = match config.ci_method {
        CiMethod::Normal => {
            let z = z_value(config.confidence)?;
            (asmr - z * se, asmr + z * se)
        }
        CiMethod::Dobson => dobson_interval(asmr, variance, total_deaths, config.confidence)?,
    };

    debug!(
        strata = per_group_rates.len(),
        asmr,
        se,
        ci_lower,
        ci_upper,
        "computed age-standardised rate"
    );

    Ok(StandardisedRate {
        asmr,
        se,
        ci_lower,
        ci_upper,
        total_deaths,
        confidence: config.confidence,
        ci_method: config.ci_method,
        per_group_rates,
    })
}

/// Crude all-ages rate with exact Poisson confidence limits.
///
/// # Errors
/// - `DivisionByZeroInStratum` when the total population is zero
#[builder]
pub fn crude_rate_ci(
    data: &ObsData,
    #[builder(default)] config: StandardisationConfig,
) -> RSMortResult<CrudeRate> {
    config.validate()?;

    let deaths = data.total_deaths()?;
    let population = data.total_population()?;
    let rate = crude_rate(deaths, population, config.rate_base, "all ages")?;

    let (lower, upper) = poisson_limits(deaths, config.confidence)?;
    let scale = config.rate_base / population;

    Ok(CrudeRate {
        rate,
        ci_lower: lower * scale,
        ci_upper: upper * scale,
        deaths,
        population,
    })
}

// =======================================
// PRIVATE FUNCTIONS
// =======================================

/// A stratum of the reconciled partition: its band, its observed counts if any, its weight.
struct Stratum {
    band: AgeBand,
    record: Option<AgeGroupRecord>,
    weight: f64,
}

/// Align observed and standard age groups on one partition.
///
/// Both sides are merged into spans of ages that neither side splits. Within a span,
/// either one observed band holds nested standard bands (weights are coarsened onto
/// it) or one standard band holds observed bands that tile it (counts are summed
/// into it). A span with neither shape has no mapping.
fn reconcile(records: &[AgeGroupRecord], weights: &[WeightRecord]) -> RSMortResult<Vec<Stratum>> {
    if records.is_empty() {
        return Err(MortError::invalid_data("no observed age groups"));
    }

    let data_bands: Vec<AgeBand> = records.iter().map(|r| r.band).collect();
    validate_partition(&data_bands)?;

    let weight_bands: Vec<AgeBand> = weights.iter().map(|w| w.band).collect();
    validate_partition(&weight_bands)?;

    let all_bands: Vec<AgeBand> = data_bands.iter().chain(&weight_bands).copied().collect();

    let mut strata = Vec::new();
    for span in merged_spans(&all_bands) {
        let mut observed: Vec<&AgeGroupRecord> =
            records.iter().filter(|r| span.contains(&r.band)).collect();
        observed.sort_by_key(|r| r.band);
        let standard: Vec<WeightRecord> = weights
            .iter()
            .filter(|w| span.contains(&w.band))
            .cloned()
            .collect();

        let stratum = match observed.as_slice() {
            // Standard band with no observed counterpart: zero deaths
            [] => Stratum {
                band: span,
                record: None,
                weight: standard.iter().map(|w| w.weight).sum(),
            },
            // Standard bands nested in one observed band
            [single] if single.band == span => Stratum {
                band: span,
                record: Some((*single).clone()),
                weight: coarsen(&standard, &[span])?.iter().map(|w| w.weight).sum(),
            },
            // Observed bands nested in one standard band
            _ => match standard.as_slice() {
                [target] if target.band == span => Stratum {
                    band: span,
                    record: Some(aggregate(&observed, target)?),
                    weight: target.weight,
                },
                _ => {
                    return Err(MortError::PartitionMismatch(format!(
                        "observed and standard age groups cut across each other within ages {span}"
                    )));
                }
            },
        };
        strata.push(stratum);
    }
    Ok(strata)
}

/// Merge overlapping bands into disjoint spans, youngest first.
fn merged_spans(bands: &[AgeBand]) -> Vec<AgeBand> {
    let mut sorted = bands.to_vec();
    sorted.sort();

    let mut spans: Vec<AgeBand> = Vec::new();
    for band in sorted {
        match spans.last_mut() {
            Some(last) if last.overlaps(&band) => {
                last.upper = match (last.upper, band.upper) {
                    (Some(a), Some(b)) => Some(a.max(b)),
                    _ => None,
                };
            }
            _ => spans.push(band),
        }
    }
    spans
}

/// Sum observed bands that tile `target` exactly into one record labelled by `target`.
fn aggregate(observed: &[&AgeGroupRecord], target: &WeightRecord) -> RSMortResult<AgeGroupRecord> {
    let starts = observed
        .first()
        .is_some_and(|r| r.band.lower == target.band.lower);
    let contiguous = observed
        .windows(2)
        .all(|pair| pair[0].band.upper.is_some_and(|u| u + 1 == pair[1].band.lower));
    let ends = observed
        .last()
        .is_some_and(|r| r.band.upper == target.band.upper);

    if !(starts && contiguous && ends) {
        return Err(MortError::PartitionMismatch(format!(
            "observed age groups do not cover standard age group {}",
            target.age_group
        )));
    }

    debug!(
        age_group = %target.age_group,
        parts = observed.len(),
        "summed observed age groups into standard age group"
    );

    Ok(AgeGroupRecord {
        age_group: target.age_group.clone(),
        band: target.band,
        deaths: observed.iter().map(|r| r.deaths).sum(),
        population: observed.iter().map(|r| r.population).sum(),
    })
}

fn dobson_interval(
    asmr: f64,
    variance: f64,
    total_deaths: f64,
    confidence: f64,
) -> RSMortResult<(f64, f64)> {
    if total_deaths <= 0.0 {
        warn!("no deaths observed, Dobson interval collapses to the point estimate");
        return Ok((asmr, asmr));
    }

    let (lower, upper) = poisson_limits(total_deaths, confidence)?;
    let scale = (variance / total_deaths).sqrt();
    Ok((
        asmr + scale * (lower - total_deaths),
        asmr + scale * (upper - total_deaths),
    ))
}
