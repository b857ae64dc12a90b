//! # RSMort Basic Usage Example
//!
//! Age-standardised rates against ESP2013 and a period life table, both from
//! in-memory DataFrames.

use rsmort::prelude::*;

fn main() -> RSMortResult<()> {
    println!("RSMort Basic Usage Example");
    println!("==========================");
    println!();

    // Observed deaths and population, grouped with an 85+ open band
    let data = obsdf! {
        "age_group" => ["0-14", "15-44", "45-64", "65-84", "85+"],
        "deaths" => [40.0, 310.0, 1_450.0, 6_900.0, 4_800.0],
        "population" => [180_000.0, 390_000.0, 260_000.0, 140_000.0, 24_000.0],
    }?;

    // ESP2013 is coarsened onto the observed bands automatically
    let esp = StdPop::from_builtin("ESP2013")?;

    println!("=== Age-Standardised Rate (normal approximation) ===");
    let normal = asmr().data(&data).std_pop(&esp).call()?;
    println!(
        "ASMR per 100,000: {:.2} ({:.2} to {:.2})",
        normal.asmr, normal.ci_lower, normal.ci_upper
    );

    println!("\n=== Age-Standardised Rate (Dobson) ===");
    let config = StandardisationConfig::builder()
        .ci_method(CiMethod::Dobson)
        .confidence(0.99)
        .build()?;
    let dobson = asmr().data(&data).std_pop(&esp).config(config).call()?;
    println!(
        "ASMR per 100,000: {:.2} ({:.2} to {:.2}, 99%)",
        dobson.asmr, dobson.ci_lower, dobson.ci_upper
    );
    println!("{}", dobson.to_df()?);

    println!("\n=== Crude Rate ===");
    let crude = crude_rate_ci().data(&data).call()?;
    println!(
        "Crude per 100,000: {:.2} ({:.2} to {:.2})",
        crude.rate, crude.ci_lower, crude.ci_upper
    );

    // Single-year counts for a life table
    println!("\n=== Period Life Table ===");
    let ages: Vec<u32> = (0..=90).collect();
    let population = vec![12_000.0; ages.len()];
    let deaths: Vec<f64> = ages
        .iter()
        .map(|&age| {
            let mx = if age == 0 {
                0.0035
            } else {
                0.00006 * (0.092 * age as f64).exp()
            };
            (mx * 12_000.0).round().max(1.0)
        })
        .collect();
    let single_year = obsdf! {
        "age" => ages,
        "deaths" => deaths,
        "population" => population,
    }?;

    let table = life_table().data(&single_year).call()?;
    println!("{}", table.to_df()?);

    for ci in table.ex_confidence_intervals()?.iter().step_by(15) {
        println!(
            "e{:<3} {:>6.2} ({:.2} to {:.2})",
            ci.age, ci.ex, ci.ci_lower, ci.ci_upper
        );
    }

    Ok(())
}
