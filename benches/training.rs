use caretrain::training::{Algorithm, ModelType, SupervisedTrainer, TrainerConfig, TrainingRequest};
use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use polars::prelude::*;
use rand::prelude::*;
use rand_chacha::ChaCha8Rng;

fn create_readmission_data(n_rows: usize, n_numeric: usize) -> DataFrame {
    let mut rng = ChaCha8Rng::seed_from_u64(42);

    let numeric: Vec<Vec<f64>> = (0..n_numeric)
        .map(|_| (0..n_rows).map(|_| rng.gen::<f64>() * 10.0).collect())
        .collect();
    let units: Vec<&str> = (0..n_rows)
        .map(|i| ["medicine", "surgery", "icu", "oncology"][i % 4])
        .collect();

    // Label from the first two vitals plus noise
    let label: Vec<&str> = (0..n_rows)
        .map(|i| {
            let risk = numeric[0][i] + numeric[1 % n_numeric][i] - 10.0 + rng.gen::<f64>() * 2.0 - 1.0;
            if risk > 0.0 {
                "Y"
            } else {
                "N"
            }
        })
        .collect();

    let mut columns: Vec<Column> = numeric
        .into_iter()
        .enumerate()
        .map(|(i, values)| Column::new(format!("vital_{}", i).into(), values))
        .collect();
    columns.push(Column::new("Unit".into(), units));
    columns.push(Column::new("Readmitted".into(), label));

    DataFrame::new(columns).unwrap()
}

fn trainer(df: &DataFrame) -> SupervisedTrainer {
    let request = TrainingRequest::new("Readmitted", ModelType::Classification);
    let config = TrainerConfig::default().with_n_estimators(20);
    SupervisedTrainer::new(df, request, config).unwrap()
}

fn bench_training(c: &mut Criterion) {
    let mut group = c.benchmark_group("training");
    group.sample_size(10); // Fewer samples for training benchmarks

    let df = create_readmission_data(2000, 8);
    let trainer = trainer(&df);
    for algorithm in Algorithm::PREFERENCE_ORDER {
        group.bench_with_input(
            BenchmarkId::new("train", algorithm.name(ModelType::Classification)),
            &algorithm,
            |b, &algorithm| b.iter(|| trainer.train(black_box(algorithm)).unwrap()),
        );
    }
    group.bench_function("ensemble", |b| b.iter(|| trainer.ensemble().unwrap()));

    group.finish();
}

fn bench_prediction(c: &mut Criterion) {
    let mut group = c.benchmark_group("prediction");

    // Train once
    let model = trainer(&create_readmission_data(2000, 8))
        .random_forest()
        .unwrap();

    for n_rows in [100, 1000, 5000].iter() {
        let test_df = create_readmission_data(*n_rows, 8);

        group.bench_with_input(BenchmarkId::new("predict", n_rows), &test_df, |b, df| {
            b.iter(|| model.make_predictions(black_box(df)).unwrap())
        });
        group.bench_with_input(BenchmarkId::new("factors", n_rows), &test_df, |b, df| {
            b.iter(|| model.make_predictions_with_k_factors(black_box(df), 3).unwrap())
        });
    }

    group.finish();
}

criterion_group!(benches, bench_training, bench_prediction);
criterion_main!(benches);
