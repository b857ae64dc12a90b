//! # Integration Tests for RSMort Prelude
//!
//! Verifies that the prelude re-exports everything needed to load data, configure
//! and run both engines with a single `use` statement.

use polars::df;
use rsmort::prelude::*;

#[test]
fn test_prelude_imports_config_types() {
    let method = CiMethod::Dobson;
    assert!(matches!(method, CiMethod::Dobson));

    let std_config = StandardisationConfig::default();
    assert_eq!(std_config.rate_base, 100_000.0);
    assert_eq!(std_config.ci_method, CiMethod::Normal);

    let lt_config = LifeTableConfig::default();
    assert_eq!(lt_config.radix, 100_000);
}

#[test]
fn test_prelude_imports_polars_types() {
    let df_type_name = std::any::type_name::<DataFrame>();
    let series_type_name = std::any::type_name::<Series>();
    let result_type_name = std::any::type_name::<PolarsResult<f64>>();

    assert!(df_type_name.contains("DataFrame"));
    assert!(series_type_name.contains("Series"));
    assert!(result_type_name.contains("PolarsError"));
}

#[test]
fn test_prelude_imports_data_types() {
    assert!(std::any::type_name::<ObsData>().contains("ObsData"));
    assert!(std::any::type_name::<StdPop>().contains("StdPop"));
    assert!(std::any::type_name::<AgeBand>().contains("AgeBand"));
    assert!(std::any::type_name::<MortError>().contains("MortError"));
}

#[test]
fn test_prelude_function_accessibility() {
    let _asmr_fn = asmr;
    let _crude_fn = crude_rate;
    let _crude_ci_fn = crude_rate_ci;
    let _coarsen_fn = coarsen;
    let _life_table_fn = life_table;
    let _from_records_fn = life_table_from_records;
}

#[test]
fn test_prelude_with_mock_data() {
    let df = df! {
        "age_group" => ["0-64", "65+"],
        "deaths" => [120.0, 900.0],
        "population" => [80_000.0, 15_000.0],
    }
    .expect("Failed to create mock DataFrame");

    let data = ObsData::from_df(df).expect("Failed to create ObsData from DataFrame");
    let std_pop = StdPop::from_pairs(&[("0-64", 80_000.0), ("65+", 20_000.0)])
        .expect("Failed to create StdPop");

    let config = StandardisationConfig::builder()
        .rate_base(1_000.0)
        .build()
        .unwrap();

    let result = asmr()
        .data(&data)
        .std_pop(&std_pop)
        .config(config)
        .call()
        .expect("asmr should succeed");

    // (1.5 · 80,000 + 60 · 20,000) / 100,000
    assert!((result.asmr - 13.2).abs() < 1e-9);
    assert!(result.ci_lower < result.asmr && result.asmr < result.ci_upper);
}
