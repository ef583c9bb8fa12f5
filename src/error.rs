//! Closed error surface for the execution core.
//!
//! Every fallible kernel, operator, and planner entry point returns [`Result`]. The
//! variant set below is closed and mirrors the error-kind table of the design: callers
//! are expected to `match` on it (a driver distinguishing a plan-time
//! [`Error::UnsupportedFunction`] from a runtime [`Error::ExecutionInvariant`], say)
//! rather than treat errors as opaque strings.

use crate::types::DataType;
use thiserror::Error;

/// Crate-wide result alias.
pub type Result<T> = std::result::Result<T, Error>;

/// Error surfaced across kernel, operator, and planner boundaries.
#[derive(Debug, Error)]
pub enum Error {
    /// Division/modulo by zero, or overflow while promoting an arithmetic operand.
    #[error("arithmetic error in {op}: {reason}")]
    Arithmetic { op: &'static str, reason: &'static str },

    /// Comparison or arithmetic attempted on incompatible types not covered by
    /// implicit promotion.
    #[error("type mismatch in {op}: {left:?} vs {right:?}")]
    TypeMismatch { op: &'static str, left: DataType, right: DataType },

    /// An aggregate was requested for an input type outside its overload set.
    #[error("aggregate {aggregate} does not support input type {input_type:?}")]
    UnsupportedFunction { aggregate: &'static str, input_type: DataType },

    /// An unstructured value read by a boolean predicate was not of `Bool` type.
    #[error("predicate expects Bool, found {found:?}")]
    PredicateType { found: DataType },

    /// An explicitly unreachable strategy combination (e.g. variable-length path
    /// tracking under the nTkS scheduler).
    #[error("not implemented: {0}")]
    NotImplemented(&'static str),

    /// A contract violation in a vector read/write: out-of-range access, a
    /// misaligned selection state, or a scheduler invariant failing to hold.
    #[error("execution invariant violated: {0}")]
    ExecutionInvariant(&'static str),
}
