use criterion::{criterion_group, criterion_main, Criterion};

use trialgen_ga::{optimize, GaConfig};

fn bench_optimize(c: &mut Criterion) {
    let config = GaConfig {
        num_trials: 225,
        num_generations: 20,
        fitness_threshold: 2.0,
        ..GaConfig::default()
    };

    c.bench_function("ga_twenty_generations", |b| {
        b.iter(|| {
            let _ = optimize(&config, 42).unwrap();
        })
    });
}

criterion_group!(benches, bench_optimize);
criterion_main!(benches);
