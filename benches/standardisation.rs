use codspeed_criterion_compat::{Criterion, criterion_group, criterion_main};
use rsmort::prelude::*;

/// Observed counts on the 21 ESP2013 bands, rising with age.
fn setup_esp_data() -> ObsData {
    let labels = [
        "0", "1-4", "5-9", "10-14", "15-19", "20-24", "25-29", "30-34", "35-39", "40-44",
        "45-49", "50-54", "55-59", "60-64", "65-69", "70-74", "75-79", "80-84", "85-89",
        "90-94", "95+",
    ];
    let deaths: Vec<f64> = (0..labels.len())
        .map(|i| 5.0 * (0.3 * i as f64).exp())
        .collect();
    let population: Vec<f64> = (0..labels.len())
        .map(|i| 60_000.0 - 2_500.0 * i as f64)
        .collect();
    obsdf! {
        "age_group" => labels,
        "deaths" => deaths,
        "population" => population,
    }
    .expect("Failed to build observed data")
}

fn bench_standardisation(c: &mut Criterion) {
    let data = setup_esp_data();
    let esp = StdPop::from_builtin("ESP2013").expect("Failed to load ESP2013");
    let dobson = StandardisationConfig::builder()
        .ci_method(CiMethod::Dobson)
        .build()
        .expect("Failed to build config");

    c.bench_function("asmr_normal_esp2013", |b| {
        b.iter(|| asmr().data(&data).std_pop(&esp).call().unwrap())
    });

    c.bench_function("asmr_dobson_esp2013", |b| {
        b.iter(|| {
            asmr()
                .data(&data)
                .std_pop(&esp)
                .config(dobson.clone())
                .call()
                .unwrap()
        })
    });

    // Coarsening the 5 oldest bands into 85+
    let coarse = obsdf! {
        "age_group" => ["0-84", "85+"],
        "deaths" => [2_000.0, 1_500.0],
        "population" => [900_000.0, 20_000.0],
    }
    .expect("Failed to build observed data");

    c.bench_function("asmr_with_coarsening", |b| {
        b.iter(|| asmr().data(&coarse).std_pop(&esp).call().unwrap())
    });
}

criterion_group!(benches, bench_standardisation);
criterion_main!(benches);
