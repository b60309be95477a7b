use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion};

use varsel_ga::{
    error::Result,
    evolution::{ConcurrentPopulation, Evaluator, GaConfig, Population},
};

/// A ridge-like score whose cost grows with the number of selected columns,
/// standing in for a regression fit.
#[derive(Clone)]
struct SyntheticFit {
    coefficients: Vec<f64>,
}

impl SyntheticFit {
    fn new(num_variables: usize) -> Self {
        Self {
            coefficients: (0..num_variables)
                .map(|j| ((j * 7919) % 101) as f64 / 50.0 - 1.0)
                .collect(),
        }
    }
}

impl Evaluator for SyntheticFit {
    fn num_variables(&self) -> usize {
        self.coefficients.len()
    }

    fn evaluate(&mut self, columns: &[usize]) -> Result<f64> {
        let mut score = 0.0;
        for (k, &i) in columns.iter().enumerate() {
            for &j in &columns[k..] {
                score += self.coefficients[i] * self.coefficients[j] / (1.0 + (i + j) as f64);
            }
        }
        Ok(score - 0.1 * columns.len() as f64)
    }
}

fn config(threads: usize) -> GaConfig {
    GaConfig::builder()
        .chromosome_size(200)
        .population_size(120)
        .num_generations(10)
        .num_threads(threads)
        .min_variables(2)
        .max_variables(20)
        .seed(2024)
        .build()
        .unwrap()
}

fn bench_runs(c: &mut Criterion) {
    let mut group = c.benchmark_group("run");
    group.sample_size(10);

    group.bench_function(BenchmarkId::new("population", 1), |b| {
        b.iter(|| {
            Population::new(config(1), SyntheticFit::new(200))
                .unwrap()
                .run()
                .unwrap()
        })
    });

    for threads in [2, 4, 8].iter() {
        group.bench_with_input(
            BenchmarkId::new("partitioned", threads),
            threads,
            |b, &threads| {
                b.iter(|| {
                    Population::new(config(threads), SyntheticFit::new(200))
                        .unwrap()
                        .with_partitions(threads)
                        .unwrap()
                        .run()
                        .unwrap()
                })
            },
        );

        group.bench_with_input(
            BenchmarkId::new("concurrent", threads),
            threads,
            |b, &threads| {
                b.iter(|| {
                    ConcurrentPopulation::new(config(threads), SyntheticFit::new(200))
                        .unwrap()
                        .run()
                        .unwrap()
                })
            },
        );
    }

    group.finish();
}

criterion_group!(benches, bench_runs);
criterion_main!(benches);
