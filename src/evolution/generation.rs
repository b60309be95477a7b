//! # Generation
//!
//! A `Generation` owns the evaluated chromosomes of one evolutionary step and
//! the cumulative selection weights used for fitness-proportional (roulette
//! wheel) selection of parents.
//!
//! Fitness values may be negative. Before selection they are shifted so the
//! smallest weight is at least [`MIN_SELECTION_WEIGHT`]; generations whose
//! fitness is already at least that large are used as they are.

use std::collections::HashSet;

use crate::{chromosome::Chromosome, rng::RandomNumberGenerator};

/// Smallest selection weight any chromosome can have.
pub const MIN_SELECTION_WEIGHT: f64 = 1e-8;

/// One evaluated population snapshot.
#[derive(Debug, Clone)]
pub struct Generation {
    chromosomes: Vec<Chromosome>,
    cumulative: Vec<f64>,
}

impl Generation {
    /// Wraps evaluated chromosomes and computes their selection weights.
    pub fn new(chromosomes: Vec<Chromosome>) -> Self {
        let mut generation = Self {
            chromosomes,
            cumulative: Vec::new(),
        };
        generation.refresh();
        generation
    }

    pub fn chromosomes(&self) -> &[Chromosome] {
        &self.chromosomes
    }

    pub fn len(&self) -> usize {
        self.chromosomes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.chromosomes.is_empty()
    }

    /// Sum of all selection weights.
    pub fn sum_fitness(&self) -> f64 {
        self.cumulative.last().copied().unwrap_or(0.0)
    }

    /// Lowest raw fitness in the generation.
    pub fn min_fitness(&self) -> f64 {
        self.chromosomes
            .iter()
            .map(Chromosome::fitness)
            .fold(f64::INFINITY, f64::min)
    }

    /// Highest raw fitness in the generation.
    pub fn max_fitness(&self) -> f64 {
        self.chromosomes
            .iter()
            .map(Chromosome::fitness)
            .fold(f64::NEG_INFINITY, f64::max)
    }

    pub fn mean_fitness(&self) -> f64 {
        if self.chromosomes.is_empty() {
            return f64::NAN;
        }
        self.chromosomes.iter().map(Chromosome::fitness).sum::<f64>()
            / self.chromosomes.len() as f64
    }

    /// Number of bit-distinct chromosomes.
    pub fn count_unique(&self) -> usize {
        self.chromosomes.iter().collect::<HashSet<_>>().len()
    }

    /// Recomputes the selection weights from the current fitness values.
    pub fn refresh(&mut self) {
        let min = self.min_fitness();
        let shift = if min < MIN_SELECTION_WEIGHT {
            MIN_SELECTION_WEIGHT - min
        } else {
            0.0
        };

        self.cumulative.clear();
        let mut running = 0.0;
        for chromosome in &self.chromosomes {
            running += chromosome.fitness() + shift;
            self.cumulative.push(running);
        }
    }

    /// Index of the chromosome whose cumulative weight first exceeds `draw`.
    ///
    /// Draws at or beyond the total weight (floating point overshoot) select
    /// the last chromosome.
    pub fn select(&self, draw: f64) -> usize {
        let index = self.cumulative.partition_point(|&c| c <= draw);
        index.min(self.chromosomes.len().saturating_sub(1))
    }

    /// Draws a chromosome index with probability proportional to its weight.
    pub fn draw(&self, rng: &mut RandomNumberGenerator) -> usize {
        self.select(rng.uniform(0.0, self.sum_fitness()))
    }

    /// Draws a chromosome index other than `excluded`, with probability
    /// proportional to the remaining weights.
    ///
    /// The draw runs over the wheel with the segment of `excluded` cut out, so
    /// a chromosome whose weight lies below the resolution of a single draw is
    /// still reachable. Requires at least two chromosomes.
    pub fn draw_excluding(&self, rng: &mut RandomNumberGenerator, excluded: usize) -> usize {
        let start = match excluded {
            0 => 0.0,
            _ => self.cumulative[excluded - 1],
        };
        let weight = self.cumulative[excluded] - start;
        let mut point = rng.uniform(0.0, self.sum_fitness() - weight);
        if point >= start {
            point += weight;
        }

        let index = self.select(point);
        if index != excluded {
            index
        } else if excluded + 1 < self.len() {
            // Rounding at a segment boundary
            excluded + 1
        } else {
            excluded.saturating_sub(1)
        }
    }

    /// Swaps `replacement` into the slots starting at `offset`; the previous
    /// occupants end up in `replacement`.
    ///
    /// Selection weights are stale until [`refresh`](Self::refresh) is called.
    pub(crate) fn swap_range(&mut self, offset: usize, replacement: &mut [Chromosome]) {
        self.chromosomes[offset..offset + replacement.len()].swap_with_slice(replacement);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn generation(fitness: &[f64]) -> Generation {
        let chromosomes = fitness
            .iter()
            .enumerate()
            .map(|(j, &f)| {
                let mut c = Chromosome::from_indices(fitness.len(), &[j]).unwrap();
                c.set_fitness(f);
                c
            })
            .collect();
        Generation::new(chromosomes)
    }

    #[test]
    fn test_positive_fitness_is_not_shifted() {
        let g = generation(&[1.0, 2.0, 3.0]);
        assert_eq!(g.sum_fitness(), 6.0);
        assert_eq!(g.select(0.0), 0);
        assert_eq!(g.select(0.999), 0);
        assert_eq!(g.select(1.0), 1);
        assert_eq!(g.select(2.5), 1);
        assert_eq!(g.select(3.0), 2);
        assert_eq!(g.select(5.999), 2);
    }

    #[test]
    fn test_negative_fitness_is_shifted() {
        let g = generation(&[-2.0, 0.0, 2.0]);
        let expected = 3.0 * MIN_SELECTION_WEIGHT + 2.0 + 4.0;
        assert!((g.sum_fitness() - expected).abs() < 1e-12);
        // The worst chromosome keeps a tiny but positive chance
        assert_eq!(g.select(MIN_SELECTION_WEIGHT / 2.0), 0);
        assert_eq!(g.select(1.0), 1);
        assert_eq!(g.select(5.0), 2);
    }

    #[test]
    fn test_overshoot_clamps_to_last() {
        let g = generation(&[1.0, 1.0]);
        assert_eq!(g.select(2.0), 1);
        assert_eq!(g.select(1e9), 1);
    }

    #[test]
    fn test_draw_is_proportional() {
        let g = generation(&[1.0, 3.0]);
        let mut rng = RandomNumberGenerator::new(4);
        let n = 40_000;
        let ones = (0..n).filter(|_| g.draw(&mut rng) == 1).count();
        let share = ones as f64 / n as f64;
        assert!((share - 0.75).abs() < 0.02, "share was {}", share);
    }

    #[test]
    fn test_draw_excluding_reaches_tiny_weights() {
        // Shifted weights are 1e-8 and 100 + 1e-8
        let g = generation(&[0.0, 100.0]);
        let mut rng = RandomNumberGenerator::new(42);
        for _ in 0..1000 {
            assert_eq!(g.draw_excluding(&mut rng, 1), 0);
            assert_eq!(g.draw_excluding(&mut rng, 0), 1);
        }

        let g = generation(&[-1000.0, -900.0]);
        assert_eq!(g.draw_excluding(&mut rng, 1), 0);
        assert_eq!(g.draw_excluding(&mut rng, 0), 1);
    }

    #[test]
    fn test_draw_excluding_is_proportional() {
        let g = generation(&[1.0, 1.0, 2.0]);
        let mut rng = RandomNumberGenerator::new(8);
        let n = 40_000;

        let mut counts = [0usize; 3];
        for _ in 0..n {
            counts[g.draw_excluding(&mut rng, 0)] += 1;
        }
        assert_eq!(counts[0], 0);
        let share = counts[2] as f64 / n as f64;
        assert!((share - 2.0 / 3.0).abs() < 0.02, "share was {}", share);

        let mut counts = [0usize; 3];
        for _ in 0..n {
            counts[g.draw_excluding(&mut rng, 2)] += 1;
        }
        assert_eq!(counts[2], 0);
        let share = counts[0] as f64 / n as f64;
        assert!((share - 0.5).abs() < 0.02, "share was {}", share);
    }

    #[test]
    fn test_statistics() {
        let g = generation(&[4.0, -1.0, 3.0]);
        assert_eq!(g.min_fitness(), -1.0);
        assert_eq!(g.max_fitness(), 4.0);
        assert_eq!(g.mean_fitness(), 2.0);
        assert_eq!(g.count_unique(), 3);
        assert_eq!(g.len(), 3);
    }

    #[test]
    fn test_swap_range() {
        let mut g = generation(&[1.0, 2.0, 3.0, 4.0]);
        let mut replacement = vec![Chromosome::new(4), Chromosome::new(4)];
        replacement[0].set_fitness(10.0);
        replacement[1].set_fitness(20.0);

        g.swap_range(1, &mut replacement);
        g.refresh();

        assert_eq!(g.chromosomes()[1].fitness(), 10.0);
        assert_eq!(g.chromosomes()[2].fitness(), 20.0);
        assert_eq!(replacement[0].fitness(), 2.0);
        assert_eq!(replacement[1].fitness(), 3.0);
        assert_eq!(g.sum_fitness(), 35.0);
    }
}
