//! Synthetic clinical tables shared by the integration tests

#![allow(dead_code)]

use polars::prelude::*;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

/// 30-day readmission table: encounter id, numeric vitals, a categorical
/// unit with a few missing entries, and a Y/N label driven by age and glucose.
pub fn readmission_table(n: usize, seed: u64) -> DataFrame {
    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    let mut ids = Vec::with_capacity(n);
    let mut age = Vec::with_capacity(n);
    let mut glucose = Vec::with_capacity(n);
    let mut unit: Vec<Option<&str>> = Vec::with_capacity(n);
    let mut label = Vec::with_capacity(n);

    for i in 0..n {
        let a: f64 = rng.gen_range(20.0..90.0);
        let g: f64 = rng.gen_range(70.0..200.0);
        let risk = (a - 55.0) / 15.0 + (g - 135.0) / 30.0 + rng.gen_range(-0.5..0.5);

        ids.push(format!("E{:04}", i));
        age.push(a);
        glucose.push(g);
        unit.push(match i % 7 {
            0 => None,
            1 | 2 | 3 => Some("medicine"),
            4 | 5 => Some("surgery"),
            _ => Some("icu"),
        });
        label.push(if risk > 0.0 { "Y" } else { "N" });
    }

    df!(
        "EncounterID" => ids,
        "Age" => age,
        "Glucose" => glucose,
        "Unit" => unit,
        "Readmitted" => label
    )
    .unwrap()
}

/// Length-of-stay table with a continuous target
pub fn length_of_stay_table(n: usize, seed: u64) -> DataFrame {
    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    let mut ids = Vec::with_capacity(n);
    let mut age = Vec::with_capacity(n);
    let mut comorbidities = Vec::with_capacity(n);
    let mut admit: Vec<&str> = Vec::with_capacity(n);
    let mut los = Vec::with_capacity(n);

    for i in 0..n {
        let a: f64 = rng.gen_range(20.0..90.0);
        let c = (i % 5) as f64;
        let emergency = i % 3 == 0;
        ids.push(format!("P{:04}", i));
        age.push(a);
        comorbidities.push(c);
        admit.push(if emergency { "emergency" } else { "elective" });
        los.push(1.0 + 0.05 * a + 0.8 * c + if emergency { 2.0 } else { 0.0 } + rng.gen_range(-0.3..0.3));
    }

    df!(
        "PatientID" => ids,
        "Age" => age,
        "Comorbidities" => comorbidities,
        "AdmitType" => admit,
        "LOS" => los
    )
    .unwrap()
}

/// Two well-separated clusters with a 0/1 label
pub fn separable_table(n: usize) -> DataFrame {
    let marker: Vec<f64> = (0..n)
        .map(|i| if i % 2 == 0 { i as f64 * 0.01 } else { 100.0 + i as f64 * 0.01 })
        .collect();
    let noise: Vec<f64> = (0..n).map(|i| ((i * 37) % 11) as f64).collect();
    let label: Vec<i64> = (0..n).map(|i| (i % 2) as i64).collect();
    df!("Marker" => marker, "Noise" => noise, "Label" => label).unwrap()
}
