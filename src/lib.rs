pub mod bits;
pub mod chromosome;
pub mod error;
pub mod evolution;
pub mod positions;
pub mod rng;

// Re-export commonly used types for convenience
pub use chromosome::Chromosome;
pub use error::{GeneticError, Result, ResultExt};
pub use evolution::{
    CancellationToken, ConcurrentPopulation, EliteSolution, Evaluator, FnEvaluator, GaConfig,
    Population, SearchOutcome, Verbosity,
};
pub use rng::RandomNumberGenerator;
