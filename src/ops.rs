//! Scalar operation library: arithmetic, comparison, boolean-with-NULL, cast, and hash
//! kernels, each dispatched over the four flatness combinations of their operands
//! (spec §4.B).
//!
//! [`dispatch_binary`] is the one place that shape lives; every concrete binary kernel is
//! a thin closure passed into it, instead of the four-branch match being duplicated per
//! operator (Design Notes §9: "translate to monomorphic code generated per
//! `(input_type, op)` pair").

pub mod arithmetic;
pub mod boolean;
pub mod cast;
pub mod comparison;
pub mod hash;

use crate::vector::{SelectionState, Vector};
use std::cell::RefCell;

/// Apply `f(left_pos, right_pos, result_pos)` over every logically-selected pair of
/// positions from `left` and `right`, writing into `result`'s positions.
///
/// Handles all four flatness combinations:
/// - both flat: one position pair.
/// - left flat, right unflat: fix the left position, iterate the right's selection.
/// - left unflat, right flat: fix the right position, iterate the left's selection.
/// - both unflat: the two sides are assumed co-selected (same `SelectionState`), so
///   iterate once and use the same position on both sides.
pub fn dispatch_binary(
    left: &RefCell<SelectionState>,
    right: &RefCell<SelectionState>,
    mut f: impl FnMut(usize, usize, usize),
) {
    let l = left.borrow();
    let r = right.borrow();
    match (l.is_flat, r.is_flat) {
        (true, true) => {
            let lp = l.position_of_curr_idx();
            let rp = r.position_of_curr_idx();
            f(lp, rp, rp);
        }
        (true, false) => {
            let lp = l.position_of_curr_idx();
            for rp in r.iter_positions() {
                f(lp, rp, rp);
            }
        }
        (false, true) => {
            let rp = r.position_of_curr_idx();
            for lp in l.iter_positions() {
                f(lp, rp, lp);
            }
        }
        (false, false) => {
            for p in l.iter_positions() {
                f(p, p, p);
            }
        }
    }
}

/// Same shape as [`dispatch_binary`] but collects the positions for which `pred` returns
/// true into `out`, returning the count written (the `select` shape of spec §4.B).
pub fn dispatch_binary_select(
    left: &RefCell<SelectionState>,
    right: &RefCell<SelectionState>,
    out: &mut Vec<u32>,
    mut pred: impl FnMut(usize, usize) -> bool,
) -> usize {
    out.clear();
    let l = left.borrow();
    let r = right.borrow();
    match (l.is_flat, r.is_flat) {
        (true, true) => {
            let lp = l.position_of_curr_idx();
            let rp = r.position_of_curr_idx();
            if pred(lp, rp) {
                out.push(rp as u32);
            }
        }
        (true, false) => {
            let lp = l.position_of_curr_idx();
            for rp in r.iter_positions() {
                if pred(lp, rp) {
                    out.push(rp as u32);
                }
            }
        }
        (false, true) => {
            let rp = r.position_of_curr_idx();
            for lp in l.iter_positions() {
                if pred(lp, rp) {
                    out.push(lp as u32);
                }
            }
        }
        (false, false) => {
            for p in l.iter_positions() {
                if pred(p, p) {
                    out.push(p as u32);
                }
            }
        }
    }
    out.len()
}

/// Apply `f(pos)` over every selected position of a single vector (the unary shape).
pub fn dispatch_unary(state: &RefCell<SelectionState>, mut f: impl FnMut(usize)) {
    for p in state.borrow().iter_positions() {
        f(p);
    }
}

/// Borrow a vector's shared selection state; a helper so callers don't need to reach
/// into `Vector::state` directly at every call site.
pub fn state_of(v: &Vector) -> &RefCell<SelectionState> {
    &*v.state
}
