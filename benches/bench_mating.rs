use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};

use varsel_ga::{
    chromosome::Chromosome,
    evolution::{GaConfig, Generation},
    positions::ShuffledSet,
    rng::RandomNumberGenerator,
};

fn config(chromosome_size: usize) -> GaConfig {
    GaConfig::builder()
        .chromosome_size(chromosome_size)
        .population_size(100)
        .min_variables(5)
        .max_variables(chromosome_size / 4)
        .mutation_probability(0.01)
        .seed(1)
        .build()
        .unwrap()
}

fn bench_operators(c: &mut Criterion) {
    let mut group = c.benchmark_group("operators");

    for size in [64, 500, 5_000].iter() {
        let config = config(*size);
        let mut rng = RandomNumberGenerator::new(11);
        let mut positions = ShuffledSet::new(*size);
        let parent1 = Chromosome::random(&config, &mut rng, &mut positions);
        let parent2 = Chromosome::random(&config, &mut rng, &mut positions);
        let mut child1 = Chromosome::new(*size);
        let mut child2 = Chromosome::new(*size);

        group.bench_with_input(BenchmarkId::new("mate_with", size), size, |b, _| {
            b.iter(|| {
                parent1
                    .mate_with(black_box(&parent2), &mut rng, &mut child1, &mut child2)
                    .unwrap()
            })
        });

        group.bench_with_input(BenchmarkId::new("mutate", size), size, |b, _| {
            b.iter(|| {
                child1.copy_from(&parent1);
                black_box(child1.mutate(&config, &mut rng, &mut positions))
            })
        });

        group.bench_with_input(BenchmarkId::new("randomly_reset", size), size, |b, _| {
            b.iter(|| child2.randomly_reset(&config, &mut rng, &mut positions))
        });

        group.bench_with_input(BenchmarkId::new("column_indices", size), size, |b, _| {
            b.iter(|| black_box(parent1.column_indices()))
        });
    }

    group.finish();
}

fn bench_selection(c: &mut Criterion) {
    let mut group = c.benchmark_group("selection");
    let mut rng = RandomNumberGenerator::new(5);

    for size in [100, 1_000, 10_000].iter() {
        let chromosomes = (0..*size)
            .map(|i| {
                let mut chromosome = Chromosome::new(8);
                chromosome.set_fitness((i % 97) as f64 - 40.0);
                chromosome
            })
            .collect();
        let generation = Generation::new(chromosomes);

        group.bench_with_input(BenchmarkId::new("draw", size), &generation, |b, generation| {
            b.iter(|| black_box(generation.draw(&mut rng)))
        });
    }

    group.finish();
}

criterion_group!(benches, bench_operators, bench_selection);
criterion_main!(benches);
