//! Three-valued boolean kernels: `And, Or, Xor, Not` (spec §4.B), grounded directly on
//! the original `BinaryBooleanOperationExecutor`'s truth table (it differs from the
//! generic binary executor precisely because NULL is not absorbing for `And`/`Or`).
//!
//! Truth table: `NULL AND FALSE = FALSE`; `NULL OR TRUE = TRUE`; every other combination
//! touching NULL is NULL; `XOR` with either operand NULL is always NULL; `NOT NULL = NULL`.

use crate::ops::dispatch_binary;
use crate::vector::Vector;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BooleanOp {
    And,
    Or,
    Xor,
}

/// `(value, is_null)` pair in, `(value, is_null)` pair out — mirrors the original's
/// `FUNC::operation(left, right, &mut result, leftNull, rightNull)` shape so the
/// not-absorbing-NULL rule is visible in one place per op.
fn truth(op: BooleanOp, a: Option<bool>, b: Option<bool>) -> Option<bool> {
    match op {
        BooleanOp::And => match (a, b) {
            (Some(false), _) | (_, Some(false)) => Some(false),
            (Some(true), Some(true)) => Some(true),
            _ => None,
        },
        BooleanOp::Or => match (a, b) {
            (Some(true), _) | (_, Some(true)) => Some(true),
            (Some(false), Some(false)) => Some(false),
            _ => None,
        },
        BooleanOp::Xor => match (a, b) {
            (Some(a), Some(b)) => Some(a ^ b),
            _ => None,
        },
    }
}

fn value_of(v: &Vector, pos: usize) -> Option<bool> {
    if v.is_null(pos) { None } else { Some(v.get_bool(pos)) }
}

/// Write `op(left, right)` into `result`, dispatched over the four flatness
/// combinations via [`dispatch_binary`].
pub fn execute(op: BooleanOp, left: &Vector, right: &Vector, result: &mut Vector) {
    dispatch_binary(&left.state, &right.state, |lp, rp, resp| {
        match truth(op, value_of(left, lp), value_of(right, rp)) {
            Some(v) => {
                result.set_bool(resp, v);
                result.set_null(resp, false);
            }
            None => result.set_null(resp, true),
        }
    });
}

/// `select` shape: positions where the (three-valued) result is definitely `TRUE`.
pub fn select(op: BooleanOp, left: &Vector, right: &Vector, out: &mut Vec<u32>) -> usize {
    use crate::ops::dispatch_binary_select;
    dispatch_binary_select(&left.state, &right.state, out, |lp, rp| {
        truth(op, value_of(left, lp), value_of(right, rp)) == Some(true)
    })
}

/// `NOT`: `NOT NULL = NULL`, otherwise logical negation.
pub fn not(input: &Vector, result: &mut Vector) {
    for pos in input.state.borrow().iter_positions() {
        match value_of(input, pos) {
            Some(v) => {
                result.set_bool(pos, !v);
                result.set_null(pos, false);
            }
            None => result.set_null(pos, true),
        }
    }
}
