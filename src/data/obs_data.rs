use super::spreadsheet_helpers::{fetch_excel_frame, read_excel_frame, read_ods_frame};
use crate::age_group::AgeBand;
use crate::errors::{MortError, RSMortResult};
use polars::prelude::*;
use std::collections::HashSet;
use tracing::warn;

/// One age stratum of observed deaths and population at risk.
#[derive(Debug, Clone, PartialEq)]
pub struct AgeGroupRecord {
    pub age_group: String,
    pub band: AgeBand,
    pub deaths: f64,
    pub population: f64,
}

impl AgeGroupRecord {
    /// Build a record from a free-text age-group label, e.g. `"0-4"` or `"85+"`.
    pub fn new(age_group: &str, deaths: f64, population: f64) -> RSMortResult<Self> {
        Ok(Self {
            age_group: age_group.trim().to_string(),
            band: age_group.parse()?,
            deaths,
            population,
        })
    }
}

/// One single-year age row of life table input. The highest age is the open-ended band.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SingleAgeRecord {
    pub age: u32,
    pub deaths: f64,
    pub population: f64,
}

impl SingleAgeRecord {
    pub fn new(age: u32, deaths: f64, population: f64) -> Self {
        Self {
            age,
            deaths,
            population,
        }
    }
}

/// Observed deaths and population counts by age.
///
/// The DataFrame always holds exactly three columns after construction:
/// - `age` (u32, single years) **or** `age_group` (string labels)
/// - `deaths` (f64)
/// - `population` (f64)
#[derive(Debug, Clone)]
pub struct ObsData {
    pub category: String,
    pub description: String,
    pub dataframe: DataFrame,
}

impl ObsData {
    /// Create a new ObsData instance from a DataFrame.
    ///
    /// # Schema Requirements
    /// - An `age` column (whole numbers) or an `age_group` column (labels such as `"0-4"`, `"85+"`)
    /// - `deaths` and `population` columns, f64 convertible
    /// - No missing values; counts must be finite and non-negative
    /// - At least one row
    ///
    /// Extra columns are dropped.
    ///
    /// # Errors
    /// - Missing or mistyped columns
    /// - Negative, missing or non-finite counts
    /// - Unparseable age-group labels
    ///
    /// # Examples
    /// ```rust
    /// # use rsmort::prelude::*;
    /// use polars::prelude::*;
    ///
    /// let df = df! {
    ///     "age_group" => ["0-44", "45-64", "65+"],
    ///     "deaths" => [12.0, 80.0, 410.0],
    ///     "population" => [52_000.0, 21_000.0, 9_500.0],
    /// }?;
    /// let data = ObsData::new("Deaths".to_string(), "Registrations 2023".to_string(), df)?;
    /// assert_eq!(data.records()?.len(), 3);
    /// # RSMortResult::Ok(())
    /// ```
    pub fn new(category: String, description: String, dataframe: DataFrame) -> RSMortResult<Self> {
        let key = age_key(&dataframe)?;
        let dataframe = setup_dataframe_to_correct_schema(dataframe, key)?;
        validate_df_values(&dataframe, key)?;

        Ok(Self {
            category,
            description,
            dataframe,
        })
    }

    /// Create observed data from a DataFrame with a default category.
    pub fn from_df(df: DataFrame) -> RSMortResult<Self> {
        let category = "Observed Mortality Data".to_string();
        let description = "Created from DataFrame".to_string();
        Self::new(category, description, df)
    }

    /// Combine a deaths table and a population table into one observed dataset.
    ///
    /// Every population row is kept. Age groups with no row in the deaths table
    /// get zero deaths rather than being dropped, so they still count towards a
    /// weighted denominator.
    ///
    /// # Errors
    /// - The two tables key their rows on different age columns
    /// - A deaths row has no population row to divide by
    /// - All errors from `new()`
    ///
    /// # Examples
    /// ```rust
    /// # use rsmort::prelude::*;
    /// use polars::prelude::*;
    ///
    /// let deaths = df! { "age_group" => ["0-49"], "deaths" => [10.0] }?;
    /// let population = df! { "age_group" => ["0-49", "50+"], "population" => [100.0, 100.0] }?;
    /// let data = ObsData::from_deaths_and_population(deaths, population)?;
    /// let records = data.records()?;
    /// let older = records.iter().find(|r| r.age_group == "50+").unwrap();
    /// assert_eq!(older.deaths, 0.0);
    /// # RSMortResult::Ok(())
    /// ```
    pub fn from_deaths_and_population(
        deaths: DataFrame,
        population: DataFrame,
    ) -> RSMortResult<Self> {
        let key = age_key(&population)?;
        if age_key(&deaths)? != key {
            return Err(MortError::invalid_data(format!(
                "deaths and population tables must both be keyed on '{key}'"
            )));
        }

        let key_type = if key == "age" {
            DataType::UInt32
        } else {
            DataType::String
        };

        let deaths = deaths.lazy().select([
            col(key).cast(key_type.clone()),
            col("deaths").cast(DataType::Float64),
        ]);
        let population = population.lazy().select([
            col(key).cast(key_type),
            col("population").cast(DataType::Float64),
        ]);

        // Deaths without a population row cannot become a rate
        let death_keys = key_strings(&deaths.clone().collect()?, key)?;
        let population_keys: HashSet<String> =
            key_strings(&population.clone().collect()?, key)?.into_iter().collect();
        if let Some(orphan) = death_keys.iter().find(|k| !population_keys.contains(*k)) {
            return Err(MortError::invalid_data(format!(
                "deaths recorded for '{orphan}' but no population row exists"
            )));
        }

        let joined = population
            .join(deaths, [col(key)], [col(key)], JoinArgs::new(JoinType::Left))
            .with_column(col("deaths").fill_null(lit(0.0)))
            .select([col(key), col("deaths"), col("population")])
            .collect()?;

        let category = "Observed Mortality Data".to_string();
        let description = "Joined from deaths and population tables".to_string();
        Self::new(category, description, joined)
    }

    /// Load observed data from a sheet of a local XLSX/XLS workbook.
    ///
    /// The first row holds the headers; data runs until the first blank row.
    pub fn from_xlsx(file_path: &str, sheet_name: &str) -> RSMortResult<Self> {
        let df = read_excel_frame(file_path, sheet_name)?;
        let category = "Observed Mortality Data".to_string();
        let description = format!("Created from XLSX file {file_path}, sheet {sheet_name}.");
        Self::new(category, description, df)
    }

    /// Load observed data from a sheet of a local ODS workbook.
    pub fn from_ods(file_path: &str, sheet_name: &str) -> RSMortResult<Self> {
        let df = read_ods_frame(file_path, sheet_name)?;
        let category = "Observed Mortality Data".to_string();
        let description = format!("Created from ODS file {file_path}, sheet {sheet_name}.");
        Self::new(category, description, df)
    }

    /// Download an XLSX/XLS workbook and load observed data from one of its sheets.
    pub fn from_url(url: &str, sheet_name: &str) -> RSMortResult<Self> {
        let df = fetch_excel_frame(url, sheet_name)?;
        let category = "Observed Mortality Data".to_string();
        let description = format!("Downloaded from {url}, sheet {sheet_name}.");
        Self::new(category, description, df)
    }

    /// Name of the age column: `"age"` or `"age_group"`.
    pub fn age_column(&self) -> &'static str {
        if self.is_single_year() {
            "age"
        } else {
            "age_group"
        }
    }

    pub fn is_single_year(&self) -> bool {
        self.dataframe.get_column_names().contains(&&"age".into())
    }

    /// Rows as age-group records.
    ///
    /// For single-year data the highest age becomes the open-ended band (`90` → `90+`).
    pub fn records(&self) -> RSMortResult<Vec<AgeGroupRecord>> {
        let deaths = self.f64_values("deaths")?;
        let population = self.f64_values("population")?;

        if self.is_single_year() {
            let ages = self.age_values()?;
            let max_age = ages.iter().copied().max().unwrap_or(0);
            let records = ages
                .into_iter()
                .zip(deaths.into_iter().zip(population))
                .map(|(age, (d, p))| {
                    let band = if age == max_age {
                        AgeBand::open(age)
                    } else {
                        AgeBand::single(age)
                    };
                    AgeGroupRecord {
                        age_group: band.to_string(),
                        band,
                        deaths: d,
                        population: p,
                    }
                })
                .collect();
            return Ok(records);
        }

        let labels = key_strings(&self.dataframe, "age_group")?;
        labels
            .iter()
            .zip(deaths.into_iter().zip(population))
            .map(|(label, (d, p))| AgeGroupRecord::new(label, d, p))
            .collect()
    }

    /// Rows as single-year records, in the order stored.
    ///
    /// # Errors
    /// - The data is keyed on age-group labels rather than single years
    pub fn single_year_records(&self) -> RSMortResult<Vec<SingleAgeRecord>> {
        if !self.is_single_year() {
            return Err(MortError::invalid_data(
                "life tables need single-year ages in an 'age' column",
            ));
        }

        let ages = self.age_values()?;
        let deaths = self.f64_values("deaths")?;
        let population = self.f64_values("population")?;

        let records = ages
            .into_iter()
            .zip(deaths.into_iter().zip(population))
            .map(|(age, (d, p))| SingleAgeRecord::new(age, d, p))
            .collect();
        Ok(records)
    }

    pub fn total_deaths(&self) -> RSMortResult<f64> {
        Ok(self.f64_values("deaths")?.iter().sum())
    }

    pub fn total_population(&self) -> RSMortResult<f64> {
        Ok(self.f64_values("population")?.iter().sum())
    }

    fn f64_values(&self, column: &str) -> RSMortResult<Vec<f64>> {
        let values = self
            .dataframe
            .column(column)?
            .f64()?
            .into_no_null_iter()
            .collect();
        Ok(values)
    }

    fn age_values(&self) -> RSMortResult<Vec<u32>> {
        let values = self
            .dataframe
            .column("age")?
            .u32()?
            .into_no_null_iter()
            .collect();
        Ok(values)
    }
}

// ================================================
// PRIVATE FUNCTIONS
// ================================================

/// Pick the age column a frame is keyed on. Single-year `age` wins if both exist.
pub(super) fn age_key(df: &DataFrame) -> RSMortResult<&'static str> {
    let names = df.get_column_names();
    if names.contains(&&"age".into()) {
        Ok("age")
    } else if names.contains(&&"age_group".into()) {
        Ok("age_group")
    } else {
        Err(MortError::invalid_data(
            "DataFrame must contain an 'age' or 'age_group' column",
        ))
    }
}

/// Values of the key column rendered as strings.
pub(super) fn key_strings(df: &DataFrame, key: &str) -> RSMortResult<Vec<String>> {
    let column = df.column(key)?.cast(&DataType::String)?;
    let values = column
        .str()?
        .into_iter()
        .map(|opt| opt.map(str::to_string))
        .collect::<Option<Vec<String>>>()
        .ok_or_else(|| MortError::invalid_data(format!("column '{key}' has missing values")))?;
    Ok(values)
}

fn setup_dataframe_to_correct_schema(df: DataFrame, key: &str) -> RSMortResult<DataFrame> {
    if df.height() == 0 {
        return Err(MortError::invalid_data(
            "DataFrame must contain at least one row of data",
        ));
    }

    for name in ["deaths", "population"] {
        if !df.get_column_names().contains(&&name.into()) {
            return Err(MortError::invalid_data(format!(
                "DataFrame must contain a '{name}' column"
            )));
        }
    }

    let key_column = if key == "age" {
        whole_number_ages(&df)?
    } else {
        df.column(key)?.cast(&DataType::String)?
    };

    let columns = vec![
        key_column,
        df.column("deaths")?.cast(&DataType::Float64)?,
        df.column("population")?.cast(&DataType::Float64)?,
    ];

    Ok(DataFrame::new(columns)?)
}

/// Cast the age column to u32 after checking every value is a non-negative whole number.
fn whole_number_ages(df: &DataFrame) -> RSMortResult<Column> {
    let as_f64 = df.column("age")?.cast(&DataType::Float64)?;
    for value in as_f64.f64()?.into_iter() {
        match value {
            Some(v) if v >= 0.0 && v.fract() == 0.0 => {}
            Some(v) => {
                return Err(MortError::invalid_data(format!(
                    "age {v} must be a non-negative whole number"
                )));
            }
            None => return Err(MortError::invalid_data("column 'age' has missing values")),
        }
    }
    Ok(as_f64.cast(&DataType::UInt32)?)
}

fn validate_df_values(df: &DataFrame, key: &str) -> RSMortResult<()> {
    for name in ["deaths", "population"] {
        let column = df.column(name)?;
        if column.null_count() > 0 {
            return Err(MortError::invalid_data(format!(
                "column '{name}' has missing values"
            )));
        }
        if let Some(bad) = column
            .f64()?
            .into_no_null_iter()
            .find(|v| !v.is_finite() || *v < 0.0)
        {
            return Err(MortError::invalid_data(format!(
                "column '{name}' must be finite and non-negative, found {bad}"
            )));
        }
    }

    // Deaths are counts; modelled or pro-rated figures are kept but flagged
    let fractional = fractional_count(df.column("deaths")?.f64()?.into_no_null_iter());
    if fractional > 0 {
        warn!(
            rows = fractional,
            "deaths column holds non-integer counts, used as given"
        );
    }

    // Labels must parse now rather than at first use
    if key == "age_group" {
        for label in key_strings(df, key)? {
            label.parse::<AgeBand>()?;
        }
    }

    Ok(())
}

/// Number of values with a fractional part.
fn fractional_count(values: impl Iterator<Item = f64>) -> usize {
    values.filter(|v| v.fract() != 0.0).count()
}
