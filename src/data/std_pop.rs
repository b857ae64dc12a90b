use super::obs_data::key_strings;
use super::spreadsheet_helpers::{fetch_excel_frame, read_excel_frame, read_ods_frame};
use crate::age_group::AgeBand;
use crate::errors::{MortError, RSMortResult};
use polars::prelude::*;

/// European Standard Population 2013, per 100,000.
const ESP2013: [(&str, f64); 21] = [
    ("0", 1_000.0),
    ("1-4", 4_000.0),
    ("5-9", 5_500.0),
    ("10-14", 5_500.0),
    ("15-19", 5_500.0),
    ("20-24", 6_000.0),
    ("25-29", 6_000.0),
    ("30-34", 6_500.0),
    ("35-39", 7_000.0),
    ("40-44", 7_000.0),
    ("45-49", 7_000.0),
    ("50-54", 7_000.0),
    ("55-59", 6_500.0),
    ("60-64", 6_000.0),
    ("65-69", 5_500.0),
    ("70-74", 5_000.0),
    ("75-79", 4_000.0),
    ("80-84", 2_500.0),
    ("85-89", 1_500.0),
    ("90-94", 800.0),
    ("95+", 200.0),
];

/// One stratum of a reference standard population.
#[derive(Debug, Clone, PartialEq)]
pub struct WeightRecord {
    pub age_group: String,
    pub band: AgeBand,
    pub weight: f64,
}

impl WeightRecord {
    pub fn new(age_group: &str, weight: f64) -> RSMortResult<Self> {
        Ok(Self {
            age_group: age_group.trim().to_string(),
            band: age_group.parse()?,
            weight,
        })
    }
}

/// Reference standard population used to weight age-specific rates.
///
/// The DataFrame holds two columns: `age_group` (string) and `weight` (f64).
/// Weights need not sum to any particular total; rates are normalised by the
/// sum of weights actually used.
#[derive(Debug, Clone)]
pub struct StdPop {
    pub category: String,
    pub description: String,
    pub dataframe: DataFrame,
}

impl StdPop {
    /// Create a standard population from a DataFrame with `age_group` and `weight` columns.
    ///
    /// # Errors
    /// - Missing columns, empty frame
    /// - Missing, negative or non-finite weights
    /// - Unparseable or duplicated age-group labels
    pub fn new(category: String, description: String, dataframe: DataFrame) -> RSMortResult<Self> {
        let dataframe = setup_dataframe_to_correct_schema(dataframe)?;
        validate_df_values(&dataframe)?;

        Ok(Self {
            category,
            description,
            dataframe,
        })
    }

    pub fn from_df(df: DataFrame) -> RSMortResult<Self> {
        let category = "Standard Population".to_string();
        let description = "Created from DataFrame".to_string();
        Self::new(category, description, df)
    }

    /// Build a standard population from `(label, weight)` pairs.
    ///
    /// # Examples
    /// ```rust
    /// # use rsmort::prelude::*;
    /// let std_pop = StdPop::from_pairs(&[("0-64", 80_000.0), ("65+", 20_000.0)])?;
    /// assert_eq!(std_pop.total_weight()?, 100_000.0);
    /// # RSMortResult::Ok(())
    /// ```
    pub fn from_pairs(pairs: &[(&str, f64)]) -> RSMortResult<Self> {
        let (labels, weights): (Vec<&str>, Vec<f64>) = pairs.iter().copied().unzip();
        let df = df! {
            "age_group" => labels,
            "weight" => weights,
        }?;
        Self::from_df(df)
    }

    /// Load a standard population shipped with the crate.
    ///
    /// - `"ESP2013"`: European Standard Population 2013, 21 bands (`0`, `1-4`, ... `90-94`, `95+`)
    pub fn from_builtin(id: &str) -> RSMortResult<Self> {
        match id {
            "ESP2013" => {
                let mut std_pop = Self::from_pairs(&ESP2013)?;
                std_pop.category = "Built-in Standard Population".to_string();
                std_pop.description = "European Standard Population 2013".to_string();
                Ok(std_pop)
            }
            _ => Err(MortError::invalid_data(format!(
                "unknown built-in standard population: {id}"
            ))),
        }
    }

    pub fn from_xlsx(file_path: &str, sheet_name: &str) -> RSMortResult<Self> {
        let df = read_excel_frame(file_path, sheet_name)?;
        let category = "Standard Population".to_string();
        let description = format!("Created from XLSX file {file_path}, sheet {sheet_name}.");
        Self::new(category, description, df)
    }

    pub fn from_ods(file_path: &str, sheet_name: &str) -> RSMortResult<Self> {
        let df = read_ods_frame(file_path, sheet_name)?;
        let category = "Standard Population".to_string();
        let description = format!("Created from ODS file {file_path}, sheet {sheet_name}.");
        Self::new(category, description, df)
    }

    pub fn from_url(url: &str, sheet_name: &str) -> RSMortResult<Self> {
        let df = fetch_excel_frame(url, sheet_name)?;
        let category = "Standard Population".to_string();
        let description = format!("Downloaded from {url}, sheet {sheet_name}.");
        Self::new(category, description, df)
    }

    pub fn records(&self) -> RSMortResult<Vec<WeightRecord>> {
        let labels = key_strings(&self.dataframe, "age_group")?;
        let weights = self.dataframe.column("weight")?.f64()?.into_no_null_iter();
        labels
            .iter()
            .zip(weights)
            .map(|(label, weight)| WeightRecord::new(label, weight))
            .collect()
    }

    pub fn total_weight(&self) -> RSMortResult<f64> {
        Ok(self
            .dataframe
            .column("weight")?
            .f64()?
            .into_no_null_iter()
            .sum())
    }
}

// ================================================
// PRIVATE FUNCTIONS
// ================================================

fn setup_dataframe_to_correct_schema(df: DataFrame) -> RSMortResult<DataFrame> {
    if df.height() == 0 {
        return Err(MortError::invalid_data(
            "DataFrame must contain at least one row of data",
        ));
    }

    let names = df.get_column_names();
    if !(names.contains(&&"age_group".into()) && names.contains(&&"weight".into())) {
        return Err(MortError::invalid_data(
            "DataFrame columns must include ['age_group', 'weight']",
        ));
    }

    let columns = vec![
        df.column("age_group")?.cast(&DataType::String)?,
        df.column("weight")?.cast(&DataType::Float64)?,
    ];
    Ok(DataFrame::new(columns)?)
}

fn validate_df_values(df: &DataFrame) -> RSMortResult<()> {
    let weight = df.column("weight")?;
    if weight.null_count() > 0 {
        return Err(MortError::invalid_data("column 'weight' has missing values"));
    }
    if let Some(bad) = weight
        .f64()?
        .into_no_null_iter()
        .find(|v| !v.is_finite() || *v < 0.0)
    {
        return Err(MortError::invalid_data(format!(
            "weights must be finite and non-negative, found {bad}"
        )));
    }

    let mut bands = key_strings(df, "age_group")?
        .iter()
        .map(|label| label.parse::<AgeBand>())
        .collect::<RSMortResult<Vec<_>>>()?;
    bands.sort();
    if let Some(pair) = bands.windows(2).find(|pair| pair[0] == pair[1]) {
        return Err(MortError::invalid_data(format!(
            "age group {} appears more than once in the standard population",
            pair[0]
        )));
    }

    Ok(())
}

// ================================================
// UNIT TESTS
// ================================================
#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    #[test]
    fn test_esp2013_sums_to_100000() {
        let esp = StdPop::from_builtin("ESP2013").unwrap();
        assert_abs_diff_eq!(esp.total_weight().unwrap(), 100_000.0, epsilon = 1e-9);

        let records = esp.records().unwrap();
        assert_eq!(records.len(), 21);
        assert_eq!(records[0].band, AgeBand::single(0));
        assert_eq!(records[20].band, AgeBand::open(95));
    }

    #[test]
    fn test_unknown_builtin() {
        let result = StdPop::from_builtin("WHO2000");
        assert!(matches!(result, Err(MortError::InvalidData(_))));
    }

    #[test]
    fn test_validation_errors() {
        let negative = StdPop::from_pairs(&[("0-4", -1.0)]);
        assert!(matches!(negative, Err(MortError::InvalidData(_))));

        let duplicated = StdPop::from_pairs(&[("0-4", 1.0), ("0 - 4", 2.0)]);
        assert!(matches!(duplicated, Err(MortError::InvalidData(_))));

        let df = df! { "age_group" => ["0-4"], "w" => [1.0] }.unwrap();
        assert!(matches!(StdPop::from_df(df), Err(MortError::InvalidData(_))));
    }
}
