//! Boundary validation errors.
//!
//! Every failure mode is detected before any cost is computed; once the
//! inputs validate, the alignment itself is total and returns no errors.

use std::fmt;

use thiserror::Error;

/// Which of the two input graphs a validation error refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Side {
    Original,
    Suspect,
}

impl fmt::Display for Side {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Side::Original => f.write_str("original"),
            Side::Suspect => f.write_str("suspect"),
        }
    }
}

/// Errors raised by input validation in [`execute`](crate::execute).
#[derive(Debug, Error)]
pub enum AlignError {
    #[error("{side} graph has no vertices")]
    EmptyGraph { side: Side },

    #[error("signature provider returned {found} vectors for the {side} graph with {expected} vertices")]
    SignatureCount {
        side: Side,
        expected: usize,
        found: usize,
    },

    #[error("signature vector of {side} vertex {vertex} has length {found}, expected {expected}")]
    SignatureLength {
        side: Side,
        vertex: usize,
        expected: usize,
        found: usize,
    },

    #[error("orbit weight {index} is {value}, expected a finite non-negative value")]
    NonFiniteWeight { index: usize, value: f64 },

    #[error("orbit weights have length {found}, expected {expected}")]
    WeightLength { expected: usize, found: usize },

    #[error("parameter {name} is {value}, expected a value in [0, 1]")]
    ParameterRange { name: &'static str, value: f64 },
}
