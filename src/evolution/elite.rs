//! # EliteSet
//!
//! The best distinct chromosomes seen during a whole run, kept in a bounded,
//! best-first list. This is the result of a search.

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::chromosome::Chromosome;

/// One entry of the result surface: a variable subset and its fitness.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, PartialEq)]
pub struct EliteSolution {
    /// Selected column indices, ascending.
    pub columns: Vec<usize>,
    /// Fitness assigned by the evaluator.
    pub fitness: f64,
}

/// Bounded archive of the fittest distinct chromosomes, best first.
#[derive(Debug, Clone)]
pub struct EliteSet {
    capacity: usize,
    members: Vec<Chromosome>,
}

impl EliteSet {
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity,
            members: Vec::with_capacity(capacity),
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn len(&self) -> usize {
        self.members.len()
    }

    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }

    /// Members ordered by decreasing fitness.
    pub fn members(&self) -> &[Chromosome] {
        &self.members
    }

    pub fn best(&self) -> Option<&Chromosome> {
        self.members.first()
    }

    /// Offers an evaluated chromosome to the archive.
    ///
    /// It is admitted if no bit-identical member exists and either the archive
    /// has room or it is strictly fitter than the current worst member, which
    /// is then evicted. Among equally fit members, earlier arrivals rank first.
    /// Returns whether the chromosome was admitted.
    pub fn offer(&mut self, chromosome: &Chromosome) -> bool {
        if self.capacity == 0 || self.members.contains(chromosome) {
            return false;
        }

        if self.members.len() == self.capacity {
            match self.members.last() {
                Some(worst) if chromosome.is_fitter_than(worst) => {
                    self.members.pop();
                }
                _ => return false,
            }
        }

        let position = self
            .members
            .partition_point(|member| !chromosome.is_fitter_than(member));
        self.members.insert(position, chromosome.clone());
        true
    }

    /// The archive as column sets with fitness, best first.
    pub fn solutions(&self) -> Vec<EliteSolution> {
        self.members
            .iter()
            .map(|member| EliteSolution {
                columns: member.column_indices(),
                fitness: member.fitness(),
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn chromosome(columns: &[usize], fitness: f64) -> Chromosome {
        let mut c = Chromosome::from_indices(8, columns).unwrap();
        c.set_fitness(fitness);
        c
    }

    fn fitness(elite: &EliteSet) -> Vec<f64> {
        elite.members().iter().map(Chromosome::fitness).collect()
    }

    #[test]
    fn test_fills_in_order() {
        let mut elite = EliteSet::new(3);
        assert!(elite.offer(&chromosome(&[0], 1.0)));
        assert!(elite.offer(&chromosome(&[1], 3.0)));
        assert!(elite.offer(&chromosome(&[2], 2.0)));
        assert_eq!(fitness(&elite), vec![3.0, 2.0, 1.0]);
        assert_eq!(elite.best().map(Chromosome::fitness), Some(3.0));
    }

    #[test]
    fn test_rejects_duplicates() {
        let mut elite = EliteSet::new(3);
        assert!(elite.offer(&chromosome(&[0, 1], 1.0)));
        assert!(!elite.offer(&chromosome(&[1, 0], 5.0)));
        assert_eq!(elite.len(), 1);
    }

    #[test]
    fn test_evicts_worst_only_on_strict_improvement() {
        let mut elite = EliteSet::new(2);
        elite.offer(&chromosome(&[0], 2.0));
        elite.offer(&chromosome(&[1], 1.0));

        assert!(!elite.offer(&chromosome(&[2], 1.0)));
        assert!(!elite.offer(&chromosome(&[3], 0.5)));
        assert_eq!(fitness(&elite), vec![2.0, 1.0]);

        assert!(elite.offer(&chromosome(&[4], 1.5)));
        assert_eq!(fitness(&elite), vec![2.0, 1.5]);
        assert_eq!(elite.len(), 2);
    }

    #[test]
    fn test_ties_keep_arrival_order() {
        let mut elite = EliteSet::new(3);
        elite.offer(&chromosome(&[0], 1.0));
        elite.offer(&chromosome(&[1], 1.0));
        assert_eq!(elite.members()[0].column_indices(), vec![0]);
        assert_eq!(elite.members()[1].column_indices(), vec![1]);
    }

    #[test]
    fn test_solutions() {
        let mut elite = EliteSet::new(2);
        elite.offer(&chromosome(&[0, 5], 1.0));
        elite.offer(&chromosome(&[3], 4.0));
        assert_eq!(
            elite.solutions(),
            vec![
                EliteSolution {
                    columns: vec![3],
                    fitness: 4.0
                },
                EliteSolution {
                    columns: vec![0, 5],
                    fitness: 1.0
                },
            ]
        );
    }

    #[test]
    fn test_zero_capacity() {
        let mut elite = EliteSet::new(0);
        assert_eq!(elite.capacity(), 0);
        assert!(!elite.offer(&chromosome(&[0], 1.0)));
        assert!(elite.is_empty());
    }
}
