//! # ConcurrentPopulation
//!
//! Runs the same search as [`Population`](super::Population) with a pool of
//! `num_threads - 1` worker threads. The pool is spawned once per run and
//! joined when the run ends. Every generation each worker mates its own index
//! range of the next generation while the invoking thread mates the last
//! range; a [`GenerationBarrier`] separates the generations. Only after all
//! participants have arrived does the invoking thread swap the new ranges in,
//! refresh the selection weights and update the elite.
//!
//! Workers own an evaluator clone and a random stream seeded at startup, so
//! the outcome for given seeds does not depend on thread scheduling: it equals
//! the outcome of `Population::with_partitions(num_threads)`.
//!
//! If some worker threads cannot be spawned, their ranges are folded into the
//! invoking thread's range and the run continues with a warning.
//!
//! ## Example
//!
//! ```rust
//! use varsel_ga::evolution::{ConcurrentPopulation, FnEvaluator, GaConfig};
//!
//! let config = GaConfig::builder()
//!     .chromosome_size(16)
//!     .population_size(32)
//!     .num_generations(8)
//!     .max_variables(5)
//!     .num_threads(4)
//!     .seed(11)
//!     .build()
//!     .unwrap();
//!
//! let evaluator = FnEvaluator::new(16, |columns: &[usize]| {
//!     Ok(columns.iter().map(|&j| (j as f64 - 7.5).abs()).sum::<f64>())
//! });
//!
//! let mut population = ConcurrentPopulation::new(config, evaluator).unwrap();
//! let outcome = population.run().unwrap();
//! assert_eq!(outcome.elite.len(), 10);
//! ```

use std::{
    any::Any,
    panic::{catch_unwind, AssertUnwindSafe},
    sync::{Mutex, PoisonError, RwLock},
    thread,
};

use tracing::{info, warn};

use super::{
    barrier::{GenerationBarrier, ShutdownGuard, Signal},
    elite::EliteSet,
    evaluator::Evaluator,
    generation::Generation,
    mating::MatingWorker,
    options::{GaConfig, Verbosity},
    population::{
        announce_generation, check_setup, install_generation, report_generation, CancellationToken,
        RangePlan, SearchOutcome,
    },
};
use crate::{
    chromosome::Chromosome,
    error::{GeneticError, Result},
    rng::RandomNumberGenerator,
};

/// Multi-threaded search engine.
#[derive(Debug)]
pub struct ConcurrentPopulation<E: Evaluator> {
    config: GaConfig,
    evaluator: E,
    elite: EliteSet,
}

/// A worker's slice of the next generation and where it belongs.
#[derive(Debug, Default)]
struct RangeBuffer {
    offset: usize,
    children: Vec<Chromosome>,
}

/// State shared between the invoking thread and the workers.
#[derive(Debug)]
struct Shared {
    barrier: GenerationBarrier,
    current: RwLock<Generation>,
    failure: Mutex<Option<GeneticError>>,
}

impl Shared {
    /// Keeps the first failure of a round.
    fn record_failure(&self, error: GeneticError) {
        let mut failure = self.failure.lock().unwrap_or_else(PoisonError::into_inner);
        failure.get_or_insert(error);
    }

    fn take_failure(&self) -> Option<GeneticError> {
        self.failure
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take()
    }
}

impl<E: Evaluator> ConcurrentPopulation<E> {
    /// Creates a concurrent population.
    ///
    /// # Errors
    ///
    /// Returns [`GeneticError::Configuration`] if fewer than two threads are
    /// configured, if the configuration is invalid or if the evaluator expects a
    /// different number of variables than the configured chromosome size.
    pub fn new(config: GaConfig, evaluator: E) -> Result<Self> {
        if config.get_num_threads() <= 1 {
            return Err(GeneticError::Configuration(
                "The concurrent population requires at least 2 threads; use Population instead"
                    .to_string(),
            ));
        }
        check_setup(&config, &evaluator)?;
        Ok(Self {
            elite: EliteSet::new(config.get_elitism()),
            config,
            evaluator,
        })
    }

    pub fn config(&self) -> &GaConfig {
        &self.config
    }

    /// The elite set of the latest run.
    pub fn elite(&self) -> &EliteSet {
        &self.elite
    }

    pub fn run(&mut self) -> Result<SearchOutcome> {
        self.run_with_interrupt(|| false)
    }

    pub fn run_with_cancel(&mut self, token: &CancellationToken) -> Result<SearchOutcome> {
        self.run_with_interrupt(|| token.is_cancelled())
    }

    /// Runs until done or until `interrupted` returns `true`.
    ///
    /// `interrupted` is only ever called on the invoking thread: while
    /// generation 0 is drawn, at the start of every generation and after every
    /// pairing of the invoking thread's range. Worker threads are always shut
    /// down and joined before this returns, whether the run succeeded, was
    /// interrupted or failed.
    ///
    /// # Errors
    ///
    /// Returns [`GeneticError::Interrupted`] on interruption, the first error
    /// raised by an evaluator in any thread, or [`GeneticError::Threading`] if
    /// a worker panicked.
    pub fn run_with_interrupt<F>(&mut self, interrupted: F) -> Result<SearchOutcome>
    where
        F: Fn() -> bool,
    {
        let config = &self.config;
        let evaluator = &self.evaluator;
        let elite = &mut self.elite;
        let check: &dyn Fn() -> bool = &interrupted;
        let size = config.get_chromosome_size();
        let verbose = config.get_verbosity() >= Verbosity::On;
        *elite = EliteSet::new(config.get_elitism());

        let mut main = MatingWorker::new(
            evaluator.clone(),
            RandomNumberGenerator::new(config.get_seeds()[0]),
            size,
        );
        if verbose {
            info!("Generating initial population");
        }
        let initial = main.seed_generation(config, elite, check)?;
        report_generation(config, 0, &initial, elite);

        let plan = RangePlan::new(config, config.get_num_threads(), || main.derive_seed());
        let ranges: Vec<Mutex<RangeBuffer>> =
            plan.workers.iter().map(|_| Mutex::default()).collect();
        let shared = Shared {
            barrier: GenerationBarrier::new(0),
            current: RwLock::new(initial),
            failure: Mutex::new(None),
        };

        thread::scope(|scope| {
            let _shutdown = ShutdownGuard(&shared.barrier);

            let mut handles = Vec::with_capacity(plan.workers.len());
            let mut offset = 0;
            for (index, (assignment, range)) in plan.workers.iter().zip(&ranges).enumerate() {
                {
                    let current = shared.current.read().unwrap_or_else(PoisonError::into_inner);
                    let mut buffer = range.lock().unwrap_or_else(PoisonError::into_inner);
                    buffer.offset = offset;
                    buffer.children =
                        current.chromosomes()[offset..offset + assignment.len].to_vec();
                }

                let worker = MatingWorker::new(
                    evaluator.clone(),
                    RandomNumberGenerator::new(assignment.seed),
                    size,
                );
                let shared = &shared;
                let spawned = thread::Builder::new()
                    .name(format!("mating-worker-{}", index))
                    .spawn_scoped(scope, move || worker_loop(worker, config, shared, range));

                match spawned {
                    Ok(handle) => {
                        shared.barrier.add_participant();
                        handles.push(handle);
                        offset += assignment.len;
                    }
                    Err(error) => {
                        warn!(worker = index, %error, "Failed to spawn mating worker");
                        let mut buffer = range.lock().unwrap_or_else(PoisonError::into_inner);
                        *buffer = RangeBuffer::default();
                    }
                }
            }

            if handles.len() < plan.workers.len() {
                warn!(
                    spawned = handles.len(),
                    requested = plan.workers.len(),
                    "Only some mating workers could be spawned; the invoking thread takes over the rest"
                );
            } else if verbose {
                info!(workers = handles.len(), "Spawned mating workers");
            }

            let main_offset = offset;
            let mut main_children = shared
                .current
                .read()
                .unwrap_or_else(PoisonError::into_inner)
                .chromosomes()[main_offset..]
                .to_vec();

            let mut result = Ok(());
            for generation in 1..=config.get_num_generations() {
                if check() {
                    result = Err(GeneticError::Interrupted);
                    break;
                }
                announce_generation(config, generation);

                shared.barrier.start_round();
                let mated = {
                    let current = shared.current.read().unwrap_or_else(PoisonError::into_inner);
                    main.mate_range(config, &current, &mut main_children, Some(check))
                };
                shared.barrier.arrive_and_wait();

                if let Err(error) = mated {
                    result = Err(error);
                    break;
                }
                if let Some(error) = shared.take_failure() {
                    result = Err(error);
                    break;
                }

                let mut current = shared.current.write().unwrap_or_else(PoisonError::into_inner);
                for range in &ranges {
                    let mut buffer = range.lock().unwrap_or_else(PoisonError::into_inner);
                    let RangeBuffer { offset, children } = &mut *buffer;
                    current.swap_range(*offset, children);
                }
                current.swap_range(main_offset, &mut main_children);
                install_generation(config, &mut current, elite, generation);
            }

            shared.barrier.signal_shutdown();
            for handle in handles {
                if handle.join().is_err() && result.is_ok() {
                    result = Err(GeneticError::Threading(
                        "A mating worker panicked outside of mating".to_string(),
                    ));
                }
            }
            result
        })?;

        Ok(SearchOutcome {
            elite: elite.solutions(),
            generations: config.get_num_generations(),
        })
    }
}

/// Body of a worker thread: mate the assigned range once per round until the
/// barrier shuts down. Failures are recorded, never propagated, so the worker
/// always arrives at the barrier.
fn worker_loop<E: Evaluator>(
    mut worker: MatingWorker<E>,
    config: &GaConfig,
    shared: &Shared,
    range: &Mutex<RangeBuffer>,
) {
    while shared.barrier.wait_for_start() == Signal::Mate {
        let mated = {
            let current = shared.current.read().unwrap_or_else(PoisonError::into_inner);
            let mut buffer = range.lock().unwrap_or_else(PoisonError::into_inner);
            catch_unwind(AssertUnwindSafe(|| {
                worker.mate_range(config, &current, &mut buffer.children, None)
            }))
        };

        match mated {
            Ok(Ok(())) => {}
            Ok(Err(error)) => shared.record_failure(error),
            Err(payload) => shared.record_failure(GeneticError::Threading(format!(
                "A mating worker panicked: {}",
                panic_message(payload.as_ref())
            ))),
        }
        shared.barrier.arrive_and_wait();
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> &str {
    if let Some(message) = payload.downcast_ref::<&str>() {
        message
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message
    } else {
        "unknown panic payload"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::evolution::evaluator::FnEvaluator;

    type ScoreFn = fn(&[usize]) -> Result<f64>;

    fn score(columns: &[usize]) -> Result<f64> {
        Ok(columns.iter().map(|&j| ((j * 7) % 5) as f64 - 1.5).sum::<f64>())
    }

    fn config(threads: usize) -> GaConfig {
        GaConfig::builder()
            .chromosome_size(18)
            .population_size(15)
            .num_generations(6)
            .num_threads(threads)
            .max_variables(6)
            .elitism(5)
            .seed(21)
            .build()
            .unwrap()
    }

    #[test]
    fn test_single_thread_is_rejected() {
        match ConcurrentPopulation::new(config(1), FnEvaluator::new(18, score as ScoreFn)) {
            Err(GeneticError::Configuration(msg)) => assert!(msg.contains("at least 2 threads")),
            _ => panic!("Expected Configuration error"),
        }
    }

    #[test]
    fn test_run_matches_partitioned_population() {
        let mut concurrent =
            ConcurrentPopulation::new(config(3), FnEvaluator::new(18, score as ScoreFn)).unwrap();
        let expected = crate::evolution::Population::new(
            config(3),
            FnEvaluator::new(18, score as ScoreFn),
        )
        .unwrap()
        .with_partitions(3)
        .unwrap()
        .run()
        .unwrap();

        assert_eq!(concurrent.run().unwrap(), expected);
        assert_eq!(concurrent.elite().solutions(), expected.elite);
    }

    #[test]
    fn test_worker_panic_becomes_threading_error() {
        fn explosive(columns: &[usize]) -> Result<f64> {
            if std::thread::current()
                .name()
                .is_some_and(|name| name.starts_with("mating-worker"))
            {
                panic!("evaluator exploded");
            }
            score(columns)
        }

        let mut population =
            ConcurrentPopulation::new(config(2), FnEvaluator::new(18, explosive as ScoreFn))
                .unwrap();
        match population.run() {
            Err(GeneticError::Threading(msg)) => {
                assert!(msg.contains("evaluator exploded"), "unexpected message: {}", msg)
            }
            other => panic!("Expected Threading error, got {:?}", other),
        }
    }

    #[test]
    fn test_panic_message() {
        let payload: Box<dyn Any + Send> = Box::new("boom");
        assert_eq!(panic_message(payload.as_ref()), "boom");
        let payload: Box<dyn Any + Send> = Box::new(String::from("bang"));
        assert_eq!(panic_message(payload.as_ref()), "bang");
        let payload: Box<dyn Any + Send> = Box::new(3);
        assert_eq!(panic_message(payload.as_ref()), "unknown panic payload");
    }
}
