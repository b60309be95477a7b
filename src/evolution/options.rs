//! # GaConfig
//!
//! The `GaConfig` struct holds every tunable of a variable-selection run: the
//! population and chromosome dimensions, the genetic operator parameters, the
//! retry budgets of the mating step, the number of threads, the seeds and the
//! verbosity of progress reporting.
//!
//! ## Example
//!
//! ```rust
//! use varsel_ga::evolution::options::{GaConfig, Verbosity};
//!
//! let config = GaConfig::builder()
//!     .chromosome_size(40)
//!     .population_size(60)
//!     .num_generations(25)
//!     .min_variables(2)
//!     .max_variables(8)
//!     .num_threads(4)
//!     .seed(42)
//!     .verbosity(Verbosity::On)
//!     .build()
//!     .unwrap();
//!
//! assert_eq!(config.get_num_threads(), 4);
//! assert_eq!(config.get_seeds(), &[42]);
//! ```
//!
//! ## Seeds
//!
//! A single seed drives the invoking thread; the seeds of the worker threads are
//! drawn from its stream. Passing exactly `num_threads` seeds instead pins every
//! thread's stream, `seeds[0]` being the invoking thread.

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::error::{GeneticError, Result};

/// How much progress information a run reports through `tracing`.
///
/// Verbosity never changes what the algorithm does.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub enum Verbosity {
    /// Only warnings.
    #[default]
    Off,
    /// One line per generation.
    On,
    /// Adds a fitness summary of every generation.
    Verbose,
    /// Adds the details of every mating.
    Debug,
}

#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, PartialEq)]
pub struct GaConfig {
    population_size: usize,
    num_generations: usize,
    num_threads: usize,
    chromosome_size: usize,
    min_variables: usize,
    max_variables: usize,
    mutation_probability: f64,
    elitism: usize,
    max_mating_tries: usize,
    bad_solution_threshold: f64,
    max_duplicate_elimination_tries: usize,
    verbosity: Verbosity,
    seeds: Vec<u32>,
}

impl GaConfig {
    /// Returns a builder for creating a `GaConfig` instance.
    pub fn builder() -> GaConfigBuilder {
        GaConfigBuilder::default()
    }

    pub fn get_population_size(&self) -> usize {
        self.population_size
    }

    pub fn get_num_generations(&self) -> usize {
        self.num_generations
    }

    pub fn get_num_threads(&self) -> usize {
        self.num_threads
    }

    /// Total number of candidate variables, i.e. bits per chromosome.
    pub fn get_chromosome_size(&self) -> usize {
        self.chromosome_size
    }

    pub fn get_min_variables(&self) -> usize {
        self.min_variables
    }

    pub fn get_max_variables(&self) -> usize {
        self.max_variables
    }

    /// Probability with which every single bit is flipped during mutation.
    pub fn get_mutation_probability(&self) -> f64 {
        self.mutation_probability
    }

    /// Capacity of the elite set.
    pub fn get_elitism(&self) -> usize {
        self.elitism
    }

    pub fn get_max_mating_tries(&self) -> usize {
        self.max_mating_tries
    }

    /// Fraction of the fitter parent's fitness a child may fall below before
    /// the pairing is abandoned.
    pub fn get_bad_solution_threshold(&self) -> f64 {
        self.bad_solution_threshold
    }

    pub fn get_max_duplicate_elimination_tries(&self) -> usize {
        self.max_duplicate_elimination_tries
    }

    pub fn get_verbosity(&self) -> Verbosity {
        self.verbosity
    }

    pub fn get_seeds(&self) -> &[u32] {
        &self.seeds
    }

    /// Sets the verbosity.
    pub fn set_verbosity(&mut self, verbosity: Verbosity) {
        self.verbosity = verbosity;
    }

    /// Checks that the configuration describes a run that can make progress.
    ///
    /// # Errors
    ///
    /// Returns [`GeneticError::Configuration`] describing the first violated rule.
    pub fn validate(&self) -> Result<()> {
        let fail = |msg: String| -> Result<()> { Err(GeneticError::Configuration(msg)) };

        if self.chromosome_size == 0 {
            return fail("Chromosome size cannot be zero".to_string());
        }
        if self.population_size < 2 {
            return fail(format!(
                "Population size must be at least 2, got {}",
                self.population_size
            ));
        }
        if self.num_threads == 0 {
            return fail("Number of threads cannot be zero".to_string());
        }
        if self.min_variables == 0 {
            return fail("Minimum number of variables must be at least 1".to_string());
        }
        if self.min_variables > self.max_variables {
            return fail(format!(
                "Minimum number of variables ({}) exceeds the maximum ({})",
                self.min_variables, self.max_variables
            ));
        }
        if self.max_variables > self.chromosome_size {
            return fail(format!(
                "Maximum number of variables ({}) exceeds the chromosome size ({})",
                self.max_variables, self.chromosome_size
            ));
        }
        if !(0.0..=1.0).contains(&self.mutation_probability) {
            return fail(format!(
                "Mutation probability must lie in [0, 1], got {}",
                self.mutation_probability
            ));
        }
        if !(0.0..=1.0).contains(&self.bad_solution_threshold) {
            return fail(format!(
                "Bad solution threshold must lie in [0, 1], got {}",
                self.bad_solution_threshold
            ));
        }
        if self.elitism == 0 {
            return fail("Elitism must keep at least one chromosome".to_string());
        }
        if self.seeds.len() != 1 && self.seeds.len() != self.num_threads {
            return fail(format!(
                "Expected 1 or {} seeds, got {}",
                self.num_threads,
                self.seeds.len()
            ));
        }

        let wanted = self.population_size as u128;
        let available = distinct_subsets(
            self.chromosome_size,
            self.min_variables,
            self.max_variables,
            wanted,
        );
        if available < wanted {
            return fail(format!(
                "Only {} distinct chromosomes exist, cannot fill a population of {}",
                available, self.population_size
            ));
        }

        Ok(())
    }
}

/// Number of subsets of `n` items with between `min` and `max` members,
/// saturating at `cap`.
fn distinct_subsets(n: usize, min: usize, max: usize, cap: u128) -> u128 {
    let mut total: u128 = 0;
    let mut binom: u128 = 1; // C(n, 0)
    for k in 1..=max {
        binom = match binom.checked_mul((n - k + 1) as u128) {
            Some(product) => product / k as u128,
            None => return cap,
        };
        if k >= min {
            total = total.saturating_add(binom);
            if total >= cap {
                return cap;
            }
        }
    }
    total
}

impl Default for GaConfig {
    /// Defaults for everything but the chromosome size, which is zero and has
    /// to be set before the configuration validates.
    fn default() -> Self {
        Self {
            population_size: 100,
            num_generations: 100,
            num_threads: 1,
            chromosome_size: 0,
            min_variables: 1,
            max_variables: 0,
            mutation_probability: 0.01,
            elitism: 10,
            max_mating_tries: 5,
            bad_solution_threshold: 0.1,
            max_duplicate_elimination_tries: 0,
            verbosity: Verbosity::Off,
            seeds: vec![0],
        }
    }
}

/// Builder for `GaConfig`.
///
/// Provides a fluent interface for constructing validated `GaConfig` instances.
#[derive(Debug, Clone, Default)]
pub struct GaConfigBuilder {
    population_size: Option<usize>,
    num_generations: Option<usize>,
    num_threads: Option<usize>,
    chromosome_size: Option<usize>,
    min_variables: Option<usize>,
    max_variables: Option<usize>,
    mutation_probability: Option<f64>,
    elitism: Option<usize>,
    max_mating_tries: Option<usize>,
    bad_solution_threshold: Option<f64>,
    max_duplicate_elimination_tries: Option<usize>,
    verbosity: Option<Verbosity>,
    seeds: Option<Vec<u32>>,
}

impl GaConfigBuilder {
    pub fn population_size(mut self, value: usize) -> Self {
        self.population_size = Some(value);
        self
    }

    pub fn num_generations(mut self, value: usize) -> Self {
        self.num_generations = Some(value);
        self
    }

    pub fn num_threads(mut self, value: usize) -> Self {
        self.num_threads = Some(value);
        self
    }

    pub fn chromosome_size(mut self, value: usize) -> Self {
        self.chromosome_size = Some(value);
        self
    }

    pub fn min_variables(mut self, value: usize) -> Self {
        self.min_variables = Some(value);
        self
    }

    /// Defaults to the chromosome size.
    pub fn max_variables(mut self, value: usize) -> Self {
        self.max_variables = Some(value);
        self
    }

    pub fn mutation_probability(mut self, value: f64) -> Self {
        self.mutation_probability = Some(value);
        self
    }

    pub fn elitism(mut self, value: usize) -> Self {
        self.elitism = Some(value);
        self
    }

    pub fn max_mating_tries(mut self, value: usize) -> Self {
        self.max_mating_tries = Some(value);
        self
    }

    pub fn bad_solution_threshold(mut self, value: f64) -> Self {
        self.bad_solution_threshold = Some(value);
        self
    }

    pub fn max_duplicate_elimination_tries(mut self, value: usize) -> Self {
        self.max_duplicate_elimination_tries = Some(value);
        self
    }

    pub fn verbosity(mut self, value: Verbosity) -> Self {
        self.verbosity = Some(value);
        self
    }

    /// Uses a single base seed.
    pub fn seed(mut self, value: u32) -> Self {
        self.seeds = Some(vec![value]);
        self
    }

    /// Uses one seed per thread (`seeds[0]` is the invoking thread).
    pub fn seeds(mut self, value: Vec<u32>) -> Self {
        self.seeds = Some(value);
        self
    }

    /// Builds and validates the `GaConfig` instance.
    ///
    /// Without an explicit seed, a random one is drawn from system entropy.
    pub fn build(self) -> Result<GaConfig> {
        let default = GaConfig::default();
        let chromosome_size = self.chromosome_size.unwrap_or(default.chromosome_size);
        let config = GaConfig {
            population_size: self.population_size.unwrap_or(default.population_size),
            num_generations: self.num_generations.unwrap_or(default.num_generations),
            num_threads: self.num_threads.unwrap_or(default.num_threads),
            chromosome_size,
            min_variables: self.min_variables.unwrap_or(default.min_variables),
            max_variables: self.max_variables.unwrap_or(chromosome_size),
            mutation_probability: self
                .mutation_probability
                .unwrap_or(default.mutation_probability),
            elitism: self.elitism.unwrap_or(default.elitism),
            max_mating_tries: self.max_mating_tries.unwrap_or(default.max_mating_tries),
            bad_solution_threshold: self
                .bad_solution_threshold
                .unwrap_or(default.bad_solution_threshold),
            max_duplicate_elimination_tries: self
                .max_duplicate_elimination_tries
                .unwrap_or(default.max_duplicate_elimination_tries),
            verbosity: self.verbosity.unwrap_or(default.verbosity),
            seeds: self.seeds.unwrap_or_else(|| vec![rand::random()]),
        };
        config.validate()?;
        Ok(config)
    }
}
