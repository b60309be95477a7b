//! # Mating
//!
//! A `MatingWorker` owns everything one thread needs to produce its share of
//! the next generation: an evaluator clone, its own random number generator,
//! a position generator and scratch chromosomes. It reads the current
//! generation and writes only into the slice of the next generation it is
//! handed, so several workers can run side by side without locking.
//!
//! Within its slice a worker fills slots pairwise from both ends towards the
//! middle. For every pair it:
//!
//! 1. draws two distinct parents by fitness-proportional selection,
//! 2. mates them, re-mating while both children are empty and replacing a
//!    single empty child by a copy of its sibling,
//! 3. evaluates the children, keeping the fitter one first,
//! 4. re-mates the same parents while the fitter child is below the fitter
//!    parent, adopting proposals that improve on the current children,
//! 5. abandons the pair if the fitter child stays too far below the fitter
//!    parent,
//! 6. mutates both children and settles each one into its slot unless it
//!    duplicates a chromosome already settled in the slice; a child that keeps
//!    duplicating is eventually reset at random.

use std::collections::HashSet;

use tracing::trace;

use super::{
    elite::EliteSet,
    evaluator::{evaluate_chromosome, Evaluator},
    generation::Generation,
    options::{GaConfig, Verbosity},
};
use crate::{
    chromosome::Chromosome,
    error::{GeneticError, Result},
    positions::ShuffledSet,
    rng::RandomNumberGenerator,
};

/// Pairings abandoned in a row after which the next pairing is kept regardless
/// of its quality. Bounds the work per slot when no pairing can satisfy the
/// bad solution threshold.
const MAX_CONSECUTIVE_ABANDONMENTS: usize = 1000;

/// Whether a child of fitness `child` is too far below the fitter parent's
/// fitness `reference` to be kept.
///
/// ```rust
/// use varsel_ga::evolution::mating::is_bad_solution;
///
/// assert!(is_bad_solution(4.9, 10.0, 0.5));
/// assert!(!is_bad_solution(5.1, 10.0, 0.5));
/// ```
pub fn is_bad_solution(child: f64, reference: f64, threshold: f64) -> bool {
    child < reference - threshold * reference.abs()
}

/// Per-thread mating state.
#[derive(Debug)]
pub(crate) struct MatingWorker<E> {
    evaluator: E,
    rng: RandomNumberGenerator,
    positions: ShuffledSet,
    child1: Chromosome,
    child2: Chromosome,
    proposal1: Chromosome,
    proposal2: Chromosome,
    columns: Vec<usize>,
}

impl<E: Evaluator> MatingWorker<E> {
    pub(crate) fn new(evaluator: E, rng: RandomNumberGenerator, chromosome_size: usize) -> Self {
        Self {
            evaluator,
            rng,
            positions: ShuffledSet::new(chromosome_size),
            child1: Chromosome::new(chromosome_size),
            child2: Chromosome::new(chromosome_size),
            proposal1: Chromosome::new(chromosome_size),
            proposal2: Chromosome::new(chromosome_size),
            columns: Vec::with_capacity(chromosome_size),
        }
    }

    /// Draws a seed for another worker from this worker's stream.
    pub(crate) fn derive_seed(&mut self) -> u32 {
        self.rng.next_u32()
    }

    /// Builds generation 0: random chromosomes until `population_size`
    /// distinct ones exist, each evaluated and offered to the elite on arrival.
    pub(crate) fn seed_generation(
        &mut self,
        config: &GaConfig,
        elite: &mut EliteSet,
        interrupted: &dyn Fn() -> bool,
    ) -> Result<Generation> {
        let size = config.get_population_size();
        let mut seen = HashSet::with_capacity(size);
        let mut chromosomes = Vec::with_capacity(size);

        while chromosomes.len() < size {
            let mut candidate = Chromosome::random(config, &mut self.rng, &mut self.positions);
            if !seen.contains(&candidate) {
                evaluate_chromosome(&mut self.evaluator, &mut candidate, &mut self.columns)?;
                elite.offer(&candidate);
                seen.insert(candidate.clone());
                chromosomes.push(candidate);
            }
            if interrupted() {
                return Err(GeneticError::Interrupted);
            }
        }

        Ok(Generation::new(chromosomes))
    }

    /// Overwrites every slot of `children` with offspring of `current`.
    ///
    /// `interrupted` is polled once per pairing; when it fires the slice is
    /// left partially written and [`GeneticError::Interrupted`] is returned.
    pub(crate) fn mate_range(
        &mut self,
        config: &GaConfig,
        current: &Generation,
        children: &mut [Chromosome],
        interrupted: Option<&dyn Fn() -> bool>,
    ) -> Result<()> {
        let max_duplicate_tries = config.get_max_duplicate_elimination_tries();
        let debug = config.get_verbosity() >= Verbosity::Debug;

        let (mut lo, mut hi) = (0, children.len());
        let (mut tries1, mut tries2) = (0, 0);
        let mut abandoned = 0;

        while lo < hi {
            // With one slot left, the second child only serves as scratch
            let single = hi - lo == 1;

            match self.breed_pair(config, current, abandoned >= MAX_CONSECUTIVE_ABANDONMENTS)? {
                None => abandoned += 1,
                Some((mutated1, mutated2)) => {
                    abandoned = 0;
                    let duplicated1 = is_settled(children, lo, hi, &self.child1);
                    let accept1 = !duplicated1 || {
                        tries1 += 1;
                        tries1 > max_duplicate_tries
                    };
                    if accept1 {
                        self.settle_first(config, duplicated1, mutated1)?;
                        if debug && tries1 > 0 {
                            trace!(tries = tries1, "needed retries to find a unique chromosome");
                        }
                        std::mem::swap(&mut children[lo], &mut self.child1);
                        lo += 1;
                        tries1 = 0;
                    }

                    // Checked only now so that a placed first child counts
                    let duplicated2 = !single && is_settled(children, lo, hi, &self.child2);
                    let accept2 = !single
                        && (!duplicated2 || {
                            tries2 += 1;
                            tries2 > max_duplicate_tries
                        });
                    if accept2 {
                        self.settle_second(config, duplicated2, mutated2)?;
                        if debug && tries2 > 0 {
                            trace!(tries = tries2, "needed retries to find a unique chromosome");
                        }
                        hi -= 1;
                        std::mem::swap(&mut children[hi], &mut self.child2);
                        tries2 = 0;
                    }
                }
            }

            if let Some(check) = interrupted {
                if check() {
                    return Err(GeneticError::Interrupted);
                }
            }
        }

        Ok(())
    }

    /// Runs steps 1 to 6 for one pair, leaving the children in `child1` and
    /// `child2`. Returns `None` if the pair was abandoned, otherwise whether
    /// mutation changed each child.
    fn breed_pair(
        &mut self,
        config: &GaConfig,
        current: &Generation,
        keep_anyway: bool,
    ) -> Result<Option<(bool, bool)>> {
        let debug = config.get_verbosity() >= Verbosity::Debug;
        let chromosomes = current.chromosomes();

        let first = current.draw(&mut self.rng);
        let second = current.draw_excluding(&mut self.rng, first);
        let (parent1, parent2) = (&chromosomes[first], &chromosomes[second]);
        let reference = parent1.fitness().max(parent2.fitness());

        parent1.mate_with(parent2, &mut self.rng, &mut self.child1, &mut self.child2)?;
        while self.child1.variable_count() == 0 && self.child2.variable_count() == 0 {
            parent1.mate_with(parent2, &mut self.rng, &mut self.child1, &mut self.child2)?;
        }
        if self.child1.variable_count() == 0 {
            self.child1.copy_from(&self.child2);
        } else if self.child2.variable_count() == 0 {
            self.child2.copy_from(&self.child1);
        }

        evaluate_chromosome(&mut self.evaluator, &mut self.child1, &mut self.columns)?;
        evaluate_chromosome(&mut self.evaluator, &mut self.child2, &mut self.columns)?;
        if self.child2.is_fitter_than(&self.child1) {
            std::mem::swap(&mut self.child1, &mut self.child2);
        }

        if debug {
            trace!(
                parent1 = %parent1,
                parent2 = %parent2,
                reference,
                child1 = self.child1.fitness(),
                child2 = self.child2.fitness(),
                "mating chromosomes"
            );
        }

        // The first mating counts towards the budget
        let mut matings = 1;
        while self.child1.fitness() < reference && matings < config.get_max_mating_tries() {
            matings += 1;
            parent1.mate_with(
                parent2,
                &mut self.rng,
                &mut self.proposal1,
                &mut self.proposal2,
            )?;
            adopt_if_better(
                &mut self.evaluator,
                &mut self.columns,
                &mut self.proposal1,
                &mut self.child1,
                &mut self.child2,
            )?;
            adopt_if_better(
                &mut self.evaluator,
                &mut self.columns,
                &mut self.proposal2,
                &mut self.child1,
                &mut self.child2,
            )?;

            if debug {
                trace!(
                    proposal1 = self.proposal1.fitness(),
                    proposal2 = self.proposal2.fitness(),
                    child1 = self.child1.fitness(),
                    child2 = self.child2.fitness(),
                    "proposed children"
                );
            }
        }

        if !keep_anyway
            && is_bad_solution(
                self.child1.fitness(),
                reference,
                config.get_bad_solution_threshold(),
            )
        {
            if debug {
                trace!(
                    child1 = self.child1.fitness(),
                    reference,
                    "abandoning pairing"
                );
            }
            return Ok(None);
        }

        let mutated1 = self.child1.mutate(config, &mut self.rng, &mut self.positions);
        let mutated2 = self.child2.mutate(config, &mut self.rng, &mut self.positions);
        Ok(Some((mutated1, mutated2)))
    }

    fn settle_first(&mut self, config: &GaConfig, reset: bool, mutated: bool) -> Result<()> {
        if reset {
            self.child1
                .randomly_reset(config, &mut self.rng, &mut self.positions);
        }
        if reset || mutated {
            evaluate_chromosome(&mut self.evaluator, &mut self.child1, &mut self.columns)?;
        }
        Ok(())
    }

    fn settle_second(&mut self, config: &GaConfig, reset: bool, mutated: bool) -> Result<()> {
        if reset {
            self.child2
                .randomly_reset(config, &mut self.rng, &mut self.positions);
        }
        if reset || mutated {
            evaluate_chromosome(&mut self.evaluator, &mut self.child2, &mut self.columns)?;
        }
        Ok(())
    }
}

/// Whether `child` equals a chromosome already settled at either end of the
/// unfilled slots `lo..hi`.
fn is_settled(children: &[Chromosome], lo: usize, hi: usize, child: &Chromosome) -> bool {
    children[..lo].iter().chain(&children[hi..]).any(|c| c == child)
}

/// Evaluates a non-empty `proposal` and swaps it in if it beats `child2`,
/// promoting it to `child1` if it beats that one too.
fn adopt_if_better<E: Evaluator>(
    evaluator: &mut E,
    columns: &mut Vec<usize>,
    proposal: &mut Chromosome,
    child1: &mut Chromosome,
    child2: &mut Chromosome,
) -> Result<()> {
    if proposal.variable_count() == 0 {
        return Ok(());
    }
    evaluate_chromosome(evaluator, proposal, columns)?;
    if proposal.is_fitter_than(child2) {
        if proposal.is_fitter_than(child1) {
            std::mem::swap(child1, child2);
            child1.copy_from(proposal);
        } else {
            child2.copy_from(proposal);
        }
    }
    Ok(())
}
