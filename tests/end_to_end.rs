//! # End-to-End Tests
//!
//! Both engines driven from DataFrames through the public builder API.

use approx::assert_abs_diff_eq;
use polars::df;
use rsmort::prelude::*;

const ESP_LABELS: [&str; 21] = [
    "0", "1-4", "5-9", "10-14", "15-19", "20-24", "25-29", "30-34", "35-39", "40-44", "45-49",
    "50-54", "55-59", "60-64", "65-69", "70-74", "75-79", "80-84", "85-89", "90-94", "95+",
];

fn esp_shaped_data(rate_per_person: impl Fn(usize) -> f64) -> ObsData {
    let population: Vec<f64> = (0..ESP_LABELS.len())
        .map(|i| 50_000.0 - 2_000.0 * i as f64)
        .collect();
    let deaths: Vec<f64> = population
        .iter()
        .enumerate()
        .map(|(i, p)| p * rate_per_person(i))
        .collect();
    obsdf! {
        "age_group" => ESP_LABELS,
        "deaths" => deaths,
        "population" => population,
    }
    .unwrap()
}

// ================================================
// AGE STANDARDISATION
// ================================================

#[test]
fn test_uniform_rates_standardise_to_themselves() {
    let data = esp_shaped_data(|_| 0.002);
    let esp = StdPop::from_builtin("ESP2013").unwrap();

    let result = asmr().data(&data).std_pop(&esp).call().unwrap();
    assert_abs_diff_eq!(result.asmr, 200.0, epsilon = 1e-9);
    assert_eq!(result.per_group_rates.len(), 21);
}

#[test]
fn test_dobson_and_normal_share_point_estimate() {
    let data = esp_shaped_data(|i| 0.0001 * (1.0 + i as f64));
    let esp = StdPop::from_builtin("ESP2013").unwrap();

    let normal = asmr().data(&data).std_pop(&esp).call().unwrap();
    let dobson_config = StandardisationConfig::builder()
        .ci_method(CiMethod::Dobson)
        .build()
        .unwrap();
    let dobson = asmr()
        .data(&data)
        .std_pop(&esp)
        .config(dobson_config)
        .call()
        .unwrap();

    assert_abs_diff_eq!(normal.asmr, dobson.asmr, epsilon = 1e-12);
    assert_abs_diff_eq!(normal.se, dobson.se, epsilon = 1e-12);
    assert!(dobson.ci_lower < dobson.asmr && dobson.asmr < dobson.ci_upper);
    // Poisson limits are skewed upwards
    assert!(dobson.ci_upper - dobson.asmr > dobson.asmr - dobson.ci_lower);
}

#[test]
fn test_open_band_coarsens_esp_tail() {
    let data = obsdf! {
        "age_group" => ["0-84", "85+"],
        "deaths" => [1_000.0, 500.0],
        "population" => [1_000_000.0, 25_000.0],
    }
    .unwrap();
    let esp = StdPop::from_builtin("ESP2013").unwrap();

    let result = asmr().data(&data).std_pop(&esp).call().unwrap();
    let weights: Vec<(String, f64)> = result
        .per_group_rates
        .iter()
        .map(|r| (r.age_group.clone(), r.weight))
        .collect();
    assert_eq!(
        weights,
        vec![("0-84".to_string(), 97_500.0), ("85+".to_string(), 2_500.0)]
    );

    // (100 · 97,500 + 2,000 · 2,500) / 100,000
    assert_abs_diff_eq!(result.asmr, 147.5, epsilon = 1e-9);
    assert_abs_diff_eq!(result.rate("85 and over").unwrap(), 2_000.0, epsilon = 1e-9);
}

#[test]
fn test_missing_deaths_rows_count_as_zero() {
    let deaths = df! {
        "age_group" => ["50+"],
        "deaths" => [200.0],
    }
    .unwrap();
    let population = df! {
        "age_group" => ["0-49", "50+"],
        "population" => [10_000.0, 5_000.0],
    }
    .unwrap();
    let data = ObsData::from_deaths_and_population(deaths, population).unwrap();
    let std_pop = StdPop::from_pairs(&[("0-49", 30_000.0), ("50+", 70_000.0)]).unwrap();

    let result = asmr().data(&data).std_pop(&std_pop).call().unwrap();
    // 0-49 keeps its weight in the denominator
    assert_abs_diff_eq!(result.asmr, 4_000.0 * 0.7, epsilon = 1e-9);
}

#[test]
fn test_straddling_partitions_fail() {
    let data = obsdf! {
        "age_group" => ["0-2", "3+"],
        "deaths" => [1.0, 10.0],
        "population" => [100.0, 100.0],
    }
    .unwrap();
    let esp = StdPop::from_builtin("ESP2013").unwrap();

    let result = asmr().data(&data).std_pop(&esp).call();
    assert!(matches!(result, Err(MortError::PartitionMismatch(_))));
}

#[test]
fn test_single_year_data_against_esp2013() {
    // Ages 0..=95, the last one read as 95+
    let ages: Vec<u32> = (0..=95).collect();
    let population: Vec<f64> = ages.iter().map(|&a| 20_000.0 - 100.0 * a as f64).collect();
    let deaths: Vec<f64> = population.iter().map(|p| p * 0.003).collect();
    let data = obsdf! {
        "age" => ages,
        "deaths" => deaths,
        "population" => population,
    }
    .unwrap();
    let esp = StdPop::from_builtin("ESP2013").unwrap();

    let result = asmr().data(&data).std_pop(&esp).call().unwrap();
    assert_eq!(result.per_group_rates.len(), 21);
    assert_abs_diff_eq!(result.asmr, 300.0, epsilon = 1e-9);

    let one_to_four = &result.per_group_rates[1];
    assert_eq!(one_to_four.age_group, "1-4");
    assert_eq!(one_to_four.weight, 4_000.0);
    assert_abs_diff_eq!(
        one_to_four.population,
        19_900.0 + 19_800.0 + 19_700.0 + 19_600.0,
        epsilon = 1e-9
    );
    assert_abs_diff_eq!(result.rate("95+").unwrap(), 300.0, epsilon = 1e-9);
}

#[test]
fn test_single_year_data_beyond_last_standard_band() {
    // 100+ and the single years 95..=99 all fold into ESP2013's 95+
    let ages: Vec<u32> = (0..=100).collect();
    let population = vec![1_000.0; ages.len()];
    let deaths: Vec<f64> = ages.iter().map(|&a| if a >= 95 { 100.0 } else { 1.0 }).collect();
    let data = obsdf! {
        "age" => ages,
        "deaths" => deaths,
        "population" => population,
    }
    .unwrap();
    let esp = StdPop::from_builtin("ESP2013").unwrap();

    let result = asmr().data(&data).std_pop(&esp).call().unwrap();
    let last = result.per_group_rates.last().unwrap();
    assert_eq!(last.age_group, "95+");
    assert_eq!((last.deaths, last.population), (600.0, 6_000.0));
    assert_abs_diff_eq!(last.rate.unwrap(), 10_000.0, epsilon = 1e-9);
}

#[test]
fn test_grouped_data_finer_than_standard() {
    let data = obsdf! {
        "age_group" => ["0-4", "5-9"],
        "deaths" => [10.0, 30.0],
        "population" => [1_000.0, 1_000.0],
    }
    .unwrap();
    let std_pop = StdPop::from_pairs(&[("0-9", 100.0)]).unwrap();

    let result = asmr().data(&data).std_pop(&std_pop).call().unwrap();
    assert_abs_diff_eq!(result.asmr, 2_000.0, epsilon = 1e-9);
    assert_eq!(result.rate("0-9").map(|r| r.round()), Some(2_000.0));
}

#[test]
fn test_crude_rate_interval() {
    let data = obsdf! {
        "age_group" => ["0-49", "50+"],
        "deaths" => [4.0, 6.0],
        "population" => [600.0, 400.0],
    }
    .unwrap();
    let config = StandardisationConfig::builder()
        .rate_base(1_000.0)
        .build()
        .unwrap();

    let crude = crude_rate_ci().data(&data).config(config).call().unwrap();
    assert_abs_diff_eq!(crude.rate, 10.0, epsilon = 1e-12);
    assert_abs_diff_eq!(crude.ci_lower, 4.795389, epsilon = 1e-3);
    assert_abs_diff_eq!(crude.ci_upper, 18.390356, epsilon = 1e-3);
}

#[test]
fn test_result_reports_as_dataframe() {
    let data = esp_shaped_data(|_| 0.001);
    let esp = StdPop::from_builtin("ESP2013").unwrap();
    let result = asmr().data(&data).std_pop(&esp).call().unwrap();

    let df = result.to_df().unwrap();
    assert_eq!(df.shape(), (21, 5));
}

// ================================================
// LIFE TABLE
// ================================================

#[test]
fn test_life_table_from_obsdf() {
    let data = obsdf! {
        "age" => [0_u32, 1],
        "deaths" => [10.0, 5.0],
        "population" => [1_000.0, 500.0],
    }
    .unwrap();

    let table = life_table().data(&data).call().unwrap();
    assert_abs_diff_eq!(table.ex_at(1).unwrap(), 100.0, epsilon = 1e-9);
    assert_abs_diff_eq!(table.ex_at(0).unwrap(), 100.00099, epsilon = 1e-5);
    assert_eq!(table.rounded_ex(), vec![(0, 100.0), (1, 100.0)]);
}

#[test]
fn test_life_table_with_custom_radix_keeps_expectancy() {
    let data = obsdf! {
        "age" => [0_u32, 1, 2, 3],
        "deaths" => [8.0, 1.0, 2.0, 50.0],
        "population" => [1_000.0, 1_000.0, 1_000.0, 400.0],
    }
    .unwrap();

    let default_table = life_table().data(&data).call().unwrap();
    let config = LifeTableConfig::builder().radix(1_000).build().unwrap();
    let small_table = life_table().data(&data).config(config).call().unwrap();

    for (a, b) in default_table.rows.iter().zip(&small_table.rows) {
        assert_abs_diff_eq!(a.ex, b.ex, epsilon = 1e-9);
        assert_abs_diff_eq!(a.lx / 100.0, b.lx, epsilon = 1e-9);
    }
}

#[test]
fn test_life_table_rejects_age_groups() {
    let data = obsdf! {
        "age_group" => ["0-4", "5+"],
        "deaths" => [1.0, 10.0],
        "population" => [100.0, 100.0],
    }
    .unwrap();

    let result = life_table().data(&data).call();
    assert!(matches!(result, Err(MortError::InvalidData(_))));
}

#[test]
fn test_life_table_gap_in_ages_fails() {
    let data = obsdf! {
        "age" => [0_u32, 1, 3],
        "deaths" => [1.0, 1.0, 10.0],
        "population" => [100.0, 100.0, 100.0],
    }
    .unwrap();

    let result = life_table().data(&data).call();
    assert!(matches!(result, Err(MortError::MalformedLifeTableInput(_))));
}

#[test]
fn test_life_expectancy_intervals_cover_estimate() {
    let data = obsdf! {
        "age" => [0_u32, 1, 2, 3],
        "deaths" => [8.0, 1.0, 2.0, 50.0],
        "population" => [1_000.0, 1_000.0, 1_000.0, 400.0],
    }
    .unwrap();
    let table = life_table().data(&data).call().unwrap();

    let cis = table.ex_confidence_intervals().unwrap();
    assert_eq!(cis.len(), 4);
    for ci in cis {
        assert!(ci.se > 0.0);
        assert!(ci.ci_lower < ci.ex && ci.ex < ci.ci_upper);
    }
}
