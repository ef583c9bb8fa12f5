//! Comparison kernels: `Eq, Neq, Lt, Le, Gt, Ge` (spec §4.B). Operands must match type
//! after implicit widening (`Int64`/`Double` widen to `Double`); anything else is a
//! [`Error::TypeMismatch`]. Booleans compare as `0 < 1`.

use crate::error::{Error, Result};
use crate::ops::dispatch_binary_select;
use crate::types::DataType;
use crate::vector::Vector;
use std::cmp::Ordering;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ComparisonOp {
    Eq,
    Neq,
    Lt,
    Le,
    Gt,
    Ge,
}

fn from_ordering(op: ComparisonOp, ord: Ordering) -> bool {
    match op {
        ComparisonOp::Eq => ord == Ordering::Equal,
        ComparisonOp::Neq => ord != Ordering::Equal,
        ComparisonOp::Lt => ord == Ordering::Less,
        ComparisonOp::Le => ord != Ordering::Greater,
        ComparisonOp::Gt => ord == Ordering::Greater,
        ComparisonOp::Ge => ord != Ordering::Less,
    }
}

fn compare_at(op: ComparisonOp, left: &Vector, right: &Vector, lp: usize, rp: usize) -> Result<bool> {
    let ord = match (left.data_type, right.data_type) {
        (DataType::Bool, DataType::Bool) => left.get_bool(lp).cmp(&right.get_bool(rp)),
        (DataType::Int64, DataType::Int64) => left.get_int64(lp).cmp(&right.get_int64(rp)),
        (DataType::Double, DataType::Double) => {
            left.get_double(lp).total_cmp(&right.get_double(rp))
        }
        (DataType::Int64, DataType::Double) => {
            (left.get_int64(lp) as f64).total_cmp(&right.get_double(rp))
        }
        (DataType::Double, DataType::Int64) => {
            left.get_double(lp).total_cmp(&(right.get_int64(rp) as f64))
        }
        (DataType::String, DataType::String) => left.get_string(lp).cmp(right.get_string(rp)),
        (DataType::NodeID, DataType::NodeID) => left.get_node_id(lp).cmp(&right.get_node_id(rp)),
        (DataType::RelID, DataType::RelID) => left.get_rel_id(lp).cmp(&right.get_rel_id(rp)),
        (l, r) => return Err(Error::TypeMismatch { op: "comparison", left: l, right: r }),
    };
    Ok(from_ordering(op, ord))
}

/// The `select` shape: write surviving positions into `out`, skipping any pair with a
/// null operand (nulls never satisfy a comparison predicate), return the count.
pub fn select(
    op: ComparisonOp,
    left: &Vector,
    right: &Vector,
    out: &mut Vec<u32>,
) -> Result<usize> {
    let mut err = None;
    let count = dispatch_binary_select(&left.state, &right.state, out, |lp, rp| {
        if err.is_some() || left.is_null(lp) || right.is_null(rp) {
            return false;
        }
        match compare_at(op, left, right, lp, rp) {
            Ok(b) => b,
            Err(e) => {
                err = Some(e);
                false
            }
        }
    });
    if let Some(e) = err {
        return Err(e);
    }
    Ok(count)
}

/// The `execute` shape: write a `Bool` vector, nulling out any position with a null
/// operand.
pub fn execute(op: ComparisonOp, left: &Vector, right: &Vector, result: &mut Vector) -> Result<()> {
    use crate::ops::dispatch_binary;
    let mut err = None;
    dispatch_binary(&left.state, &right.state, |lp, rp, resp| {
        if err.is_some() {
            return;
        }
        if left.is_null(lp) || right.is_null(rp) {
            result.set_null(resp, true);
            return;
        }
        match compare_at(op, left, right, lp, rp) {
            Ok(b) => result.set_bool(resp, b),
            Err(e) => err = Some(e),
        }
    });
    if let Some(e) = err {
        return Err(e);
    }
    Ok(())
}
