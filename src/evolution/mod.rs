pub mod barrier;
pub mod concurrent;
pub mod elite;
pub mod evaluator;
pub mod generation;
pub mod mating;
pub mod options;
pub mod population;

pub use concurrent::ConcurrentPopulation;
pub use elite::{EliteSet, EliteSolution};
pub use evaluator::{Evaluator, FnEvaluator};
pub use generation::Generation;
pub use options::{GaConfig, GaConfigBuilder, Verbosity};
pub use population::{CancellationToken, Population, SearchOutcome};
