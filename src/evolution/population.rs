//! # Population
//!
//! `Population` runs the whole search on the invoking thread. Generation 0 is
//! drawn at random; every later generation is produced by the mating algorithm
//! in [`mating`](super::mating) and fully replaces its predecessor. The elite
//! set keeps the best distinct chromosomes seen across all generations and is
//! the result of a run.
//!
//! The next generation is split into index ranges, each mated by its own
//! worker with its own random stream. By default there is a single range; with
//! [`Population::with_partitions`] the same range layout as a
//! [`ConcurrentPopulation`](super::ConcurrentPopulation) with as many threads
//! is mated range by range, which yields the same elite for the same seeds.
//!
//! ## Example
//!
//! ```rust
//! use varsel_ga::evolution::{FnEvaluator, GaConfig, Population};
//!
//! let config = GaConfig::builder()
//!     .chromosome_size(12)
//!     .population_size(20)
//!     .num_generations(10)
//!     .min_variables(1)
//!     .max_variables(4)
//!     .elitism(3)
//!     .seed(7)
//!     .build()
//!     .unwrap();
//!
//! // Columns 0..4 are informative, every other column costs a little
//! let evaluator = FnEvaluator::new(12, |columns: &[usize]| {
//!     Ok(columns.iter().map(|&j| if j < 4 { 1.0 } else { -0.5 }).sum::<f64>())
//! });
//!
//! let mut population = Population::new(config, evaluator).unwrap();
//! let outcome = population.run().unwrap();
//!
//! assert_eq!(outcome.generations, 10);
//! assert_eq!(outcome.elite.len(), 3);
//! assert!(outcome.elite[0].fitness >= outcome.elite[2].fitness);
//! ```

use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc,
};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};
use tracing::{debug, info, trace};

use super::{
    elite::{EliteSet, EliteSolution},
    evaluator::Evaluator,
    generation::Generation,
    mating::MatingWorker,
    options::{GaConfig, Verbosity},
};
use crate::{
    chromosome::Chromosome,
    error::{GeneticError, Result},
    rng::RandomNumberGenerator,
};

/// What a completed run produced.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, PartialEq)]
pub struct SearchOutcome {
    /// The elite set, best first.
    pub elite: Vec<EliteSolution>,
    /// Number of generations produced after generation 0.
    pub generations: usize,
}

/// A cloneable flag to cancel a run from another thread.
///
/// ```rust
/// use varsel_ga::evolution::CancellationToken;
///
/// let token = CancellationToken::new();
/// let handle = token.clone();
/// assert!(!token.is_cancelled());
/// handle.cancel();
/// assert!(token.is_cancelled());
/// ```
#[derive(Debug, Clone, Default)]
pub struct CancellationToken {
    cancelled: Arc<AtomicBool>,
}

impl CancellationToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }
}

/// Single-threaded search engine.
#[derive(Debug)]
pub struct Population<E: Evaluator> {
    config: GaConfig,
    evaluator: E,
    partitions: usize,
    elite: EliteSet,
}

impl<E: Evaluator> Population<E> {
    /// Creates a population after validating `config` against `evaluator`.
    ///
    /// # Errors
    ///
    /// Returns [`GeneticError::Configuration`] if the configuration is invalid
    /// or the evaluator expects a different number of variables than the
    /// configured chromosome size.
    pub fn new(config: GaConfig, evaluator: E) -> Result<Self> {
        check_setup(&config, &evaluator)?;
        Ok(Self {
            elite: EliteSet::new(config.get_elitism()),
            config,
            evaluator,
            partitions: 1,
        })
    }

    /// Mates the next generation as `partitions` independent ranges, laid out
    /// like the ranges of a concurrent run with `num_threads = partitions`.
    ///
    /// Explicit per-thread seeds are used when their number equals
    /// `partitions`; otherwise the first seed is the base seed.
    pub fn with_partitions(mut self, partitions: usize) -> Result<Self> {
        if partitions == 0 {
            return Err(GeneticError::Configuration(
                "Number of partitions must be at least 1".to_string(),
            ));
        }
        self.partitions = partitions;
        Ok(self)
    }

    pub fn config(&self) -> &GaConfig {
        &self.config
    }

    pub fn partitions(&self) -> usize {
        self.partitions
    }

    /// The elite set of the latest run. After an interrupted run it holds the
    /// elite of every chromosome evaluated before the interruption.
    pub fn elite(&self) -> &EliteSet {
        &self.elite
    }

    /// Runs the configured number of generations.
    pub fn run(&mut self) -> Result<SearchOutcome> {
        self.run_with_interrupt(|| false)
    }

    /// Runs until done or until `token` is cancelled.
    pub fn run_with_cancel(&mut self, token: &CancellationToken) -> Result<SearchOutcome> {
        self.run_with_interrupt(|| token.is_cancelled())
    }

    /// Runs until done or until `interrupted` returns `true`.
    ///
    /// `interrupted` is polled while generation 0 is drawn, at the start of
    /// every generation and after every pairing of the last range.
    ///
    /// # Errors
    ///
    /// Returns [`GeneticError::Interrupted`] on interruption, or the first
    /// error raised by the evaluator.
    pub fn run_with_interrupt<F>(&mut self, interrupted: F) -> Result<SearchOutcome>
    where
        F: Fn() -> bool,
    {
        let config = &self.config;
        let check: &dyn Fn() -> bool = &interrupted;
        let size = config.get_chromosome_size();
        self.elite = EliteSet::new(config.get_elitism());

        let mut main = MatingWorker::new(
            self.evaluator.clone(),
            RandomNumberGenerator::new(config.get_seeds()[0]),
            size,
        );
        if config.get_verbosity() >= Verbosity::On {
            info!("Generating initial population");
        }
        let mut current = main.seed_generation(config, &mut self.elite, check)?;
        report_generation(config, 0, &current, &self.elite);

        let plan = RangePlan::new(config, self.partitions, || main.derive_seed());
        let mut ranges: Vec<(usize, MatingWorker<E>, Vec<Chromosome>)> = plan
            .workers
            .iter()
            .map(|range| {
                (
                    range.offset,
                    MatingWorker::new(
                        self.evaluator.clone(),
                        RandomNumberGenerator::new(range.seed),
                        size,
                    ),
                    current.chromosomes()[range.offset..range.offset + range.len].to_vec(),
                )
            })
            .collect();
        let mut main_children = current.chromosomes()[plan.main_offset..].to_vec();

        for generation in 1..=config.get_num_generations() {
            if check() {
                return Err(GeneticError::Interrupted);
            }
            announce_generation(config, generation);

            for (_, worker, children) in ranges.iter_mut() {
                worker.mate_range(config, &current, children, None)?;
            }
            main.mate_range(config, &current, &mut main_children, Some(check))?;

            for (offset, _, children) in ranges.iter_mut() {
                current.swap_range(*offset, children);
            }
            current.swap_range(plan.main_offset, &mut main_children);
            install_generation(config, &mut current, &mut self.elite, generation);
        }

        Ok(SearchOutcome {
            elite: self.elite.solutions(),
            generations: config.get_num_generations(),
        })
    }
}

/// Validates the configuration and its agreement with the evaluator.
pub(crate) fn check_setup<E: Evaluator>(config: &GaConfig, evaluator: &E) -> Result<()> {
    config.validate()?;
    if evaluator.num_variables() != config.get_chromosome_size() {
        return Err(GeneticError::Configuration(format!(
            "The evaluator expects {} variables but chromosomes have {}",
            evaluator.num_variables(),
            config.get_chromosome_size()
        )));
    }
    Ok(())
}

/// One worker's share of the next generation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct RangeAssignment {
    pub(crate) offset: usize,
    pub(crate) len: usize,
    pub(crate) seed: u32,
}

/// How the next generation is split between workers and the invoking thread.
///
/// Workers are numbered `0..participants - 1` and assigned from the highest
/// number down, each taking `population / participants` slots plus one while
/// the remainder lasts. Their ranges are laid out front to back in that order;
/// the invoking thread takes the rest. Worker seeds are either the explicit
/// per-thread seeds or drawn from the invoking thread's stream in assignment
/// order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct RangePlan {
    pub(crate) workers: Vec<RangeAssignment>,
    pub(crate) main_offset: usize,
}

impl RangePlan {
    pub(crate) fn new(
        config: &GaConfig,
        participants: usize,
        mut derive_seed: impl FnMut() -> u32,
    ) -> Self {
        let size = config.get_population_size();
        let participants = participants.max(1);
        let seeds = config.get_seeds();
        let explicit = participants > 1 && seeds.len() == participants;

        let per_participant = size / participants;
        let mut remaining = size % participants;
        let mut workers = Vec::with_capacity(participants - 1);
        let mut offset = 0;

        for index in (0..participants - 1).rev() {
            let mut len = per_participant;
            if remaining > 0 {
                len += 1;
                remaining -= 1;
            }
            let seed = if explicit {
                seeds[index + 1]
            } else {
                derive_seed()
            };
            workers.push(RangeAssignment { offset, len, seed });
            offset += len;
        }

        Self {
            workers,
            main_offset: offset,
        }
    }
}

pub(crate) fn announce_generation(config: &GaConfig, generation: usize) {
    if config.get_verbosity() >= Verbosity::On {
        info!(generation, "Generating generation");
    }
}

/// Makes freshly swapped-in chromosomes the current generation: recomputes
/// the selection weights and offers every chromosome to the elite in index
/// order.
pub(crate) fn install_generation(
    config: &GaConfig,
    current: &mut Generation,
    elite: &mut EliteSet,
    generation: usize,
) {
    current.refresh();
    for chromosome in current.chromosomes() {
        elite.offer(chromosome);
    }
    report_generation(config, generation, current, elite);
}

pub(crate) fn report_generation(
    config: &GaConfig,
    generation: usize,
    current: &Generation,
    elite: &EliteSet,
) {
    let verbosity = config.get_verbosity();
    if verbosity >= Verbosity::Verbose {
        debug!(
            generation,
            best = current.max_fitness(),
            mean = current.mean_fitness(),
            worst = current.min_fitness(),
            elite_best = elite.best().map_or(f64::NAN, Chromosome::fitness),
            "Generation summary"
        );
    }
    if verbosity >= Verbosity::Debug {
        trace!(generation, unique = current.count_unique(), "Unique chromosomes");
    }
}
