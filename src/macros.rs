/// Macro to create an ObsData from column vectors.
/// Usage:
/// ```rust
/// # use rsmort::prelude::*;
/// let data = obsdf! {
///     "age" => [0_u32, 1, 2],
///     "deaths" => [4.0_f64, 1.0, 60.0],
///     "population" => [1_000.0_f64, 1_000.0, 800.0],
/// }?;
/// # RSMortResult::Ok(())
/// ```
#[macro_export]
macro_rules! obsdf {
    ($($name:expr => $val:expr),+ $(,)?) => {{
        use $crate::data::ObsData;
        use polars::prelude::df;
        let df_result = df! { $($name => $val),+ };
        match df_result {
            Ok(df) => ObsData::from_df(df),
            Err(e) => Err($crate::errors::MortError::from(e)),
        }
    }};
}
