//! # Age Groups
//!
//! Parsing and comparison of age-group labels.
//!
//! Observed data and standard populations label their strata with free-text age
//! groups (`"0-4"`, `"85+"`, `"<1"`, `"90 and over"`). Re-bucketing one partition onto
//! another needs the numeric interval behind each label, which is what [`AgeBand`]
//! holds.
//!
//! ## Accepted labels
//! - Closed range: `"0-4"`, `"0 - 4"`, `"0 to 4"`
//! - Single year: `"7"`
//! - Open-ended: `"85+"`, `"85 and over"`, `"85 plus"`, `"85 or over"`
//! - Under one: `"<1"`, `"under 1"`
use crate::errors::{MortError, RSMortResult};
use std::fmt;
use std::str::FromStr;

/// Closed or open-ended interval of whole ages.
///
/// `upper` is inclusive. `None` marks an open-ended band such as `85+`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct AgeBand {
    pub lower: u32,
    pub upper: Option<u32>,
}

impl AgeBand {
    pub fn closed(lower: u32, upper: u32) -> RSMortResult<Self> {
        if upper < lower {
            return Err(MortError::InvalidAgeGroup(format!("{lower}-{upper}")));
        }
        Ok(Self {
            lower,
            upper: Some(upper),
        })
    }

    pub fn open(lower: u32) -> Self {
        Self { lower, upper: None }
    }

    pub fn single(age: u32) -> Self {
        Self {
            lower: age,
            upper: Some(age),
        }
    }

    pub fn is_open(&self) -> bool {
        self.upper.is_none()
    }

    /// Whether `other` lies entirely inside this band.
    pub fn contains(&self, other: &AgeBand) -> bool {
        if other.lower < self.lower {
            return false;
        }
        match (self.upper, other.upper) {
            (None, _) => true,
            (Some(_), None) => false,
            (Some(a), Some(b)) => b <= a,
        }
    }

    /// Whether the two bands share at least one age.
    pub fn overlaps(&self, other: &AgeBand) -> bool {
        let below = |band: &AgeBand, age: u32| band.upper.is_some_and(|u| u < age);
        !(below(self, other.lower) || below(other, self.lower))
    }
}

impl FromStr for AgeBand {
    type Err = MortError;

    fn from_str(label: &str) -> Result<Self, Self::Err> {
        let invalid = || MortError::InvalidAgeGroup(label.to_string());
        let parse_age = |s: &str| s.trim().parse::<u32>().map_err(|_| invalid());
        let s = label.trim().to_lowercase();

        if s.is_empty() {
            return Err(invalid());
        }

        // Under one
        if let Some(rest) = s.strip_prefix('<').or_else(|| s.strip_prefix("under")) {
            let bound = parse_age(rest)?;
            if bound == 0 {
                return Err(invalid());
            }
            return AgeBand::closed(0, bound - 1);
        }

        // Open-ended
        if let Some(rest) = s.strip_suffix('+') {
            return Ok(AgeBand::open(parse_age(rest)?));
        }
        for suffix in ["and over", "or over", "plus", "and older"] {
            if let Some(rest) = s.strip_suffix(suffix) {
                return Ok(AgeBand::open(parse_age(rest)?));
            }
        }

        // Closed range
        let range = s.split_once('-').or_else(|| s.split_once(" to "));
        if let Some((lo, hi)) = range {
            return AgeBand::closed(parse_age(lo)?, parse_age(hi)?);
        }

        // Single year. Spreadsheets hand whole numbers back as "5" or "5.0"
        let single = s.strip_suffix(".0").unwrap_or(&s);
        Ok(AgeBand::single(parse_age(single)?))
    }
}

impl fmt::Display for AgeBand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.upper {
            None => write!(f, "{}+", self.lower),
            Some(u) if u == self.lower => write!(f, "{u}"),
            Some(u) => write!(f, "{}-{u}", self.lower),
        }
    }
}

/// Check that a set of bands forms a partition: no two bands share an age.
///
/// Returns the bands sorted by lower bound. Gaps are allowed; an age group
/// missing from the data is handled by the caller.
pub fn validate_partition(bands: &[AgeBand]) -> RSMortResult<Vec<AgeBand>> {
    let mut sorted = bands.to_vec();
    sorted.sort();

    for pair in sorted.windows(2) {
        if pair[0].overlaps(&pair[1]) {
            return Err(MortError::PartitionMismatch(format!(
                "age groups {} and {} overlap",
                pair[0], pair[1]
            )));
        }
    }

    Ok(sorted)
}
