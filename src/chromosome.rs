//! # Chromosome
//!
//! A `Chromosome` is one candidate variable subset, packed one bit per
//! candidate variable into 64 bit words. Variable `j` lives in part `j / 64`
//! at bit `j % 64`; the bits of the last part beyond the chromosome size are
//! never set.
//!
//! Besides the bits, a chromosome carries the fitness assigned by the last
//! evaluation (`NaN` until then, and again after any operation that changes
//! the bits).
//!
//! ## Example
//!
//! ```rust
//! use varsel_ga::chromosome::Chromosome;
//! use varsel_ga::evolution::GaConfig;
//! use varsel_ga::positions::ShuffledSet;
//! use varsel_ga::rng::RandomNumberGenerator;
//!
//! let config = GaConfig::builder()
//!     .chromosome_size(10)
//!     .min_variables(2)
//!     .max_variables(5)
//!     .seed(42)
//!     .build()
//!     .unwrap();
//! let mut rng = RandomNumberGenerator::new(42);
//! let mut positions = ShuffledSet::new(10);
//!
//! let chromosome = Chromosome::random(&config, &mut rng, &mut positions);
//! assert!((2..=5).contains(&chromosome.variable_count()));
//! assert!(!chromosome.is_evaluated());
//! ```

use std::fmt;
use std::hash::{Hash, Hasher};

use rand::{Rng, RngCore};

use crate::{
    bits::{self, Part, BITS_PER_PART},
    error::{GeneticError, Result},
    evolution::options::GaConfig,
    positions::{GeometricSkips, ShuffledSet},
    rng::RandomNumberGenerator,
};

/// Bit-packed encoding of one candidate variable subset.
#[derive(Debug)]
pub struct Chromosome {
    parts: Vec<Part>,
    size: usize,
    fitness: f64,
}

impl Chromosome {
    /// Creates a chromosome of `size` variables with none selected.
    pub fn new(size: usize) -> Self {
        Self {
            parts: vec![0; size.div_ceil(BITS_PER_PART)],
            size,
            fitness: f64::NAN,
        }
    }

    /// Creates a chromosome with a random number of variables between the
    /// configured minimum and maximum, at random positions.
    pub fn random(
        config: &GaConfig,
        rng: &mut RandomNumberGenerator,
        positions: &mut ShuffledSet,
    ) -> Self {
        let mut chromosome = Self::new(config.get_chromosome_size());
        chromosome.randomly_reset(config, rng, positions);
        chromosome
    }

    /// Creates a chromosome selecting exactly the given columns.
    ///
    /// # Errors
    ///
    /// Returns [`GeneticError::OutOfBounds`] if a column is not below `size`.
    pub fn from_indices(size: usize, columns: &[usize]) -> Result<Self> {
        let mut chromosome = Self::new(size);
        for &column in columns {
            if column >= size {
                return Err(GeneticError::OutOfBounds(format!(
                    "column {} does not exist in a chromosome of {} variables",
                    column, size
                )));
            }
            chromosome.set(column);
        }
        Ok(chromosome)
    }

    /// Total number of candidate variables.
    pub fn size(&self) -> usize {
        self.size
    }

    /// The packed words.
    pub fn parts(&self) -> &[Part] {
        &self.parts
    }

    pub fn fitness(&self) -> f64 {
        self.fitness
    }

    pub fn set_fitness(&mut self, fitness: f64) {
        self.fitness = fitness;
    }

    /// Whether the fitness belongs to the current bits.
    pub fn is_evaluated(&self) -> bool {
        !self.fitness.is_nan()
    }

    /// Strict fitness comparison; equal fitness is not fitter.
    pub fn is_fitter_than(&self, other: &Chromosome) -> bool {
        self.fitness > other.fitness
    }

    /// Number of selected variables.
    pub fn variable_count(&self) -> usize {
        self.parts.iter().map(|&p| bits::popcount(p) as usize).sum()
    }

    pub fn is_selected(&self, column: usize) -> bool {
        column < self.size
            && self.parts[column / BITS_PER_PART] & (1 << (column % BITS_PER_PART)) != 0
    }

    /// The selected columns in ascending order.
    pub fn column_indices(&self) -> Vec<usize> {
        let mut columns = Vec::with_capacity(self.variable_count());
        self.column_indices_into(&mut columns);
        columns
    }

    /// Writes the selected columns in ascending order into `out`, reusing its
    /// allocation.
    pub fn column_indices_into(&self, out: &mut Vec<usize>) {
        out.clear();
        for (k, &part) in self.parts.iter().enumerate() {
            out.extend(bits::set_bits(part).map(|bit| k * BITS_PER_PART + bit));
        }
    }

    /// One flag per variable.
    pub fn to_mask(&self) -> Vec<bool> {
        (0..self.size).map(|j| self.is_selected(j)).collect()
    }

    /// Overwrites bits and fitness with those of `other`, reusing the allocation.
    pub fn copy_from(&mut self, other: &Chromosome) {
        self.parts.clone_from(&other.parts);
        self.size = other.size;
        self.fitness = other.fitness;
    }

    /// Flips every bit independently with the configured mutation probability,
    /// then repairs the variable count back into `[min, max]`.
    ///
    /// Returns whether any bit changed. A changed chromosome loses its fitness.
    pub fn mutate(
        &mut self,
        config: &GaConfig,
        rng: &mut RandomNumberGenerator,
        positions: &mut ShuffledSet,
    ) -> bool {
        let skips = GeometricSkips::new(config.get_mutation_probability(), self.size);
        let mut mutated = false;
        for column in skips.positions(rng) {
            self.flip(column);
            mutated = true;
        }

        mutated |= self.repair(config, rng, positions);
        if mutated {
            self.fitness = f64::NAN;
        }
        mutated
    }

    /// Uniform crossover: every bit of `child1` comes from `self` or `other`
    /// with probability 1/2, and `child2` gets the bit from the other parent.
    ///
    /// Crossover alone never introduces a variable neither parent has; the
    /// children may however leave the `[min, max]` bounds until mutated.
    ///
    /// # Errors
    ///
    /// Returns [`GeneticError::IncompatibleCopulation`] if the parents (or the
    /// output chromosomes) differ in size.
    pub fn mate_with(
        &self,
        other: &Chromosome,
        rng: &mut RandomNumberGenerator,
        child1: &mut Chromosome,
        child2: &mut Chromosome,
    ) -> Result<()> {
        for size in [other.size, child1.size, child2.size] {
            if size != self.size {
                return Err(GeneticError::IncompatibleCopulation {
                    left: self.size,
                    right: size,
                });
            }
        }

        for k in 0..self.parts.len() {
            let mask = rng.next_u64();
            let a = self.parts[k];
            let b = other.parts[k];
            child1.parts[k] = (a & mask) | (b & !mask);
            child2.parts[k] = (a & !mask) | (b & mask);
        }
        child1.fitness = f64::NAN;
        child2.fitness = f64::NAN;
        Ok(())
    }

    /// Re-initializes the chromosome at random, respecting the variable bounds.
    pub fn randomly_reset(
        &mut self,
        config: &GaConfig,
        rng: &mut RandomNumberGenerator,
        positions: &mut ShuffledSet,
    ) {
        self.parts.iter_mut().for_each(|p| *p = 0);
        self.fitness = f64::NAN;

        let count = rng.gen_range(config.get_min_variables()..=config.get_max_variables());
        for &column in positions.shuffle(count, rng) {
            self.set(column);
        }
    }

    /// Adds or removes random variables until the count is within bounds.
    fn repair(
        &mut self,
        config: &GaConfig,
        rng: &mut RandomNumberGenerator,
        positions: &mut ShuffledSet,
    ) -> bool {
        let count = self.variable_count();
        let (target_state, mut remaining) = if count < config.get_min_variables() {
            (false, config.get_min_variables() - count)
        } else if count > config.get_max_variables() {
            (true, count - config.get_max_variables())
        } else {
            return false;
        };

        for column in positions.iter(rng) {
            if self.is_selected(column) == target_state {
                self.flip(column);
                remaining -= 1;
                if remaining == 0 {
                    break;
                }
            }
        }
        true
    }

    fn set(&mut self, column: usize) {
        self.parts[column / BITS_PER_PART] |= 1 << (column % BITS_PER_PART);
    }

    fn flip(&mut self, column: usize) {
        self.parts[column / BITS_PER_PART] ^= 1 << (column % BITS_PER_PART);
    }
}

impl Clone for Chromosome {
    fn clone(&self) -> Self {
        Self {
            parts: self.parts.clone(),
            size: self.size,
            fitness: self.fitness,
        }
    }

    fn clone_from(&mut self, source: &Self) {
        self.copy_from(source);
    }
}

/// Bit-exact equality; the fitness is ignored.
impl PartialEq for Chromosome {
    fn eq(&self, other: &Self) -> bool {
        self.size == other.size && self.parts == other.parts
    }
}

impl Eq for Chromosome {}

impl Hash for Chromosome {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.size.hash(state);
        self.parts.hash(state);
    }
}

/// Prints the bits, variable 0 first.
impl fmt::Display for Chromosome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for column in 0..self.size {
            f.write_str(if self.is_selected(column) { "1" } else { "0" })?;
        }
        Ok(())
    }
}
