//! # Error Types
//!
//! This module defines the error type shared by every part of the engine.
//! Construction-time problems (invalid configuration, an evaluator that does
//! not match the chromosome size) surface as [`GeneticError::Configuration`]
//! before any generation runs. A cooperative cancellation surfaces as
//! [`GeneticError::Interrupted`] once all worker threads have been joined.
//!
//! ## Examples
//!
//! Using the `Result` type:
//!
//! ```rust
//! use varsel_ga::error::{GeneticError, Result};
//!
//! fn check_bounds(min: usize, max: usize) -> Result<()> {
//!     if min > max {
//!         return Err(GeneticError::Configuration(format!(
//!             "minimum ({}) exceeds maximum ({})",
//!             min, max
//!         )));
//!     }
//!     Ok(())
//! }
//!
//! assert!(check_bounds(2, 5).is_ok());
//! assert!(check_bounds(5, 2).is_err());
//! ```
//!
//! Using the `ResultExt` trait inside an evaluator to add context to errors:
//!
//! ```rust
//! use varsel_ga::error::{Result, ResultExt};
//!
//! fn parse_weight(raw: &str) -> Result<f64> {
//!     raw.parse::<f64>().context("Failed to parse column weight")
//! }
//!
//! assert!(parse_weight("1.5").is_ok());
//! assert!(parse_weight("abc").is_err());
//! ```

use std::error::Error as StdError;
use std::fmt;
use thiserror::Error;

/// Represents errors that can occur while running the genetic algorithm.
#[derive(Error, Debug)]
pub enum GeneticError {
    /// Error that occurs when an invalid configuration is provided.
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Error that occurs when a worker thread fails in a way the engine cannot
    /// recover from (a panic during mating, a failed join).
    #[error("Threading error: {0}")]
    Threading(String),

    /// Error that occurs when two chromosomes of different sizes are mated.
    #[error("The two chromosomes are not compatible for mating ({left} vs. {right} variables)")]
    IncompatibleCopulation { left: usize, right: usize },

    /// Error that occurs when a fitness calculation fails.
    #[error("Fitness calculation error: {0}")]
    FitnessCalculation(String),

    /// Error that occurs when a column index lies outside the chromosome.
    #[error("Bounds error: {0}")]
    OutOfBounds(String),

    /// The run was cancelled through a cooperative interruption check.
    #[error("Evolution was interrupted")]
    Interrupted,

    /// A generic error with a custom message.
    #[error("{0}")]
    Other(String),
}

/// A specialized Result type for genetic algorithm operations.
pub type Result<T> = std::result::Result<T, GeneticError>;

/// Extension trait for Result to add context to errors.
///
/// Mostly useful for [`Evaluator`](crate::evolution::Evaluator) implementations
/// that call into fallible numeric code.
pub trait ResultExt<T, E> {
    /// Converts the error to a `GeneticError` with the provided context.
    fn context<C>(self, context: C) -> Result<T>
    where
        C: fmt::Display + Send + Sync + 'static;
}

impl<T, E> ResultExt<T, E> for std::result::Result<T, E>
where
    E: StdError + Send + Sync + 'static,
{
    fn context<C>(self, context: C) -> Result<T>
    where
        C: fmt::Display + Send + Sync + 'static,
    {
        self.map_err(|e| GeneticError::Other(format!("{}: {}", context, e)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_incompatible_copulation_message() {
        let err = GeneticError::IncompatibleCopulation { left: 10, right: 12 };
        assert_eq!(
            err.to_string(),
            "The two chromosomes are not compatible for mating (10 vs. 12 variables)"
        );
    }

    #[test]
    fn test_context() {
        let result: std::result::Result<u32, std::num::ParseIntError> = "x".parse::<u32>();
        match result.context("reading column count") {
            Err(GeneticError::Other(msg)) => assert!(msg.starts_with("reading column count: ")),
            _ => panic!("Expected Other error"),
        }
    }
}
