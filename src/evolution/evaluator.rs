//! # Evaluator
//!
//! The `Evaluator` trait is the seam between the genetic algorithm and the
//! regression model that scores a variable subset. The engine hands an
//! evaluator the selected column indices and receives a fitness, where higher
//! is better.
//!
//! Evaluators are cloned once per worker thread, so an implementation may keep
//! mutable scratch space or caches without any synchronization.
//!
//! ## Example
//!
//! ```rust
//! use varsel_ga::error::Result;
//! use varsel_ga::evolution::Evaluator;
//!
//! #[derive(Clone)]
//! struct Weights {
//!     weights: Vec<f64>,
//! }
//!
//! impl Evaluator for Weights {
//!     fn num_variables(&self) -> usize {
//!         self.weights.len()
//!     }
//!
//!     fn evaluate(&mut self, columns: &[usize]) -> Result<f64> {
//!         Ok(columns.iter().map(|&j| self.weights[j]).sum())
//!     }
//! }
//! ```

use crate::{
    chromosome::Chromosome,
    error::{GeneticError, Result},
};

/// Scores variable subsets.
pub trait Evaluator: Clone + Send {
    /// Number of candidate variables (columns) the evaluator expects.
    ///
    /// Must equal the configured chromosome size.
    fn num_variables(&self) -> usize;

    /// Fitness of the model using the given columns (ascending, non-empty).
    ///
    /// The returned value must be finite.
    fn evaluate(&mut self, columns: &[usize]) -> Result<f64>;
}

/// An `Evaluator` backed by a cloneable closure.
///
/// ```rust
/// use varsel_ga::evolution::{Evaluator, FnEvaluator};
///
/// let mut evaluator = FnEvaluator::new(8, |columns: &[usize]| Ok(columns.len() as f64));
/// assert_eq!(evaluator.evaluate(&[1, 4]).unwrap(), 2.0);
/// ```
#[derive(Debug, Clone)]
pub struct FnEvaluator<F> {
    num_variables: usize,
    score: F,
}

impl<F> FnEvaluator<F>
where
    F: FnMut(&[usize]) -> Result<f64> + Clone + Send,
{
    pub fn new(num_variables: usize, score: F) -> Self {
        Self {
            num_variables,
            score,
        }
    }
}

impl<F> Evaluator for FnEvaluator<F>
where
    F: FnMut(&[usize]) -> Result<f64> + Clone + Send,
{
    fn num_variables(&self) -> usize {
        self.num_variables
    }

    fn evaluate(&mut self, columns: &[usize]) -> Result<f64> {
        (self.score)(columns)
    }
}

/// Evaluates `chromosome` and stores the fitness on it.
///
/// `columns` is scratch space for the column indices.
pub(crate) fn evaluate_chromosome<E: Evaluator>(
    evaluator: &mut E,
    chromosome: &mut Chromosome,
    columns: &mut Vec<usize>,
) -> Result<f64> {
    chromosome.column_indices_into(columns);
    let fitness = evaluator.evaluate(columns)?;
    if !fitness.is_finite() {
        return Err(GeneticError::FitnessCalculation(format!(
            "Non-finite fitness score encountered: {} for columns {:?}",
            fitness, columns
        )));
    }
    chromosome.set_fitness(fitness);
    Ok(fitness)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_evaluate_chromosome_sets_fitness() {
        let mut evaluator = FnEvaluator::new(10, |columns: &[usize]| {
            Ok(columns.iter().map(|&j| j as f64).sum())
        });
        let mut chromosome = Chromosome::from_indices(10, &[2, 7]).unwrap();
        let mut columns = Vec::new();

        let fitness = evaluate_chromosome(&mut evaluator, &mut chromosome, &mut columns).unwrap();
        assert_eq!(fitness, 9.0);
        assert_eq!(chromosome.fitness(), 9.0);
        assert_eq!(columns, vec![2, 7]);
    }

    #[test]
    fn test_non_finite_fitness_is_rejected() {
        let mut evaluator = FnEvaluator::new(4, |_: &[usize]| Ok(f64::NAN));
        let mut chromosome = Chromosome::from_indices(4, &[1]).unwrap();
        let result = evaluate_chromosome(&mut evaluator, &mut chromosome, &mut Vec::new());
        assert!(matches!(result, Err(GeneticError::FitnessCalculation(_))));
        assert!(!chromosome.is_evaluated());
    }

    #[test]
    fn test_evaluator_errors_propagate() {
        let mut evaluator = FnEvaluator::new(4, |_: &[usize]| {
            Err(GeneticError::FitnessCalculation("singular matrix".to_string()))
        });
        let mut chromosome = Chromosome::from_indices(4, &[1]).unwrap();
        match evaluate_chromosome(&mut evaluator, &mut chromosome, &mut Vec::new()) {
            Err(GeneticError::FitnessCalculation(msg)) => assert_eq!(msg, "singular matrix"),
            other => panic!("Expected FitnessCalculation error, got {:?}", other),
        }
    }
}
