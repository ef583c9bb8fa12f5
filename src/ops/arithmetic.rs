//! Arithmetic kernels: `Add, Subtract, Multiply, Divide, Modulo, Power, Negate` with the
//! numeric promotion rules of spec §4.B.

use crate::error::{Error, Result};
use crate::ops::dispatch_binary;
use crate::types::DataType;
use crate::vector::Vector;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ArithmeticOp {
    Add,
    Subtract,
    Multiply,
    Divide,
    Modulo,
    Power,
}

impl ArithmeticOp {
    fn name(self) -> &'static str {
        match self {
            ArithmeticOp::Add => "Add",
            ArithmeticOp::Subtract => "Subtract",
            ArithmeticOp::Multiply => "Multiply",
            ArithmeticOp::Divide => "Divide",
            ArithmeticOp::Modulo => "Modulo",
            ArithmeticOp::Power => "Power",
        }
    }
}

fn apply_int(op: ArithmeticOp, a: i64, b: i64) -> Result<i64> {
    match op {
        ArithmeticOp::Add => a.checked_add(b).ok_or(Error::Arithmetic { op: op.name(), reason: "overflow" }),
        ArithmeticOp::Subtract => {
            a.checked_sub(b).ok_or(Error::Arithmetic { op: op.name(), reason: "overflow" })
        }
        ArithmeticOp::Multiply => {
            a.checked_mul(b).ok_or(Error::Arithmetic { op: op.name(), reason: "overflow" })
        }
        ArithmeticOp::Divide => {
            if b == 0 {
                Err(Error::Arithmetic { op: op.name(), reason: "division by zero" })
            } else {
                Ok(a / b)
            }
        }
        ArithmeticOp::Modulo => {
            if b == 0 {
                Err(Error::Arithmetic { op: op.name(), reason: "modulo by zero" })
            } else {
                Ok(a % b)
            }
        }
        ArithmeticOp::Power => unreachable!("Power always promotes to Double"),
    }
}

fn apply_double(op: ArithmeticOp, a: f64, b: f64) -> Result<f64> {
    match op {
        ArithmeticOp::Add => Ok(a + b),
        ArithmeticOp::Subtract => Ok(a - b),
        ArithmeticOp::Multiply => Ok(a * b),
        ArithmeticOp::Divide => {
            if b == 0.0 {
                Err(Error::Arithmetic { op: op.name(), reason: "division by zero" })
            } else {
                Ok(a / b)
            }
        }
        ArithmeticOp::Modulo => {
            if b == 0.0 {
                Err(Error::Arithmetic { op: op.name(), reason: "modulo by zero" })
            } else {
                Ok(a % b) // Rust's f64 `%` is IEEE fmod.
            }
        }
        ArithmeticOp::Power => Ok(a.powf(b)),
    }
}

/// Execute a binary arithmetic op, writing into `result` and following the promotion
/// rules: `Int op Int -> Int` (except `Power -> Double`); any `Double` operand promotes
/// the result to `Double`.
pub fn execute(op: ArithmeticOp, left: &Vector, right: &Vector, result: &mut Vector) -> Result<()> {
    let both_int = left.data_type == DataType::Int64 && right.data_type == DataType::Int64;
    if both_int && op != ArithmeticOp::Power {
        let mut err = None;
        dispatch_binary(&left.state, &right.state, |lp, rp, resp| {
            if err.is_some() {
                return;
            }
            let l_null = left.is_null(lp);
            let r_null = right.is_null(rp);
            if l_null || r_null {
                return;
            }
            match apply_int(op, left.get_int64(lp), right.get_int64(rp)) {
                Ok(v) => result.set_int64(resp, v),
                Err(e) => err = Some(e),
            }
        });
        if let Some(e) = err {
            return Err(e);
        }
        return Ok(());
    }

    let lv = |pos: usize| -> Result<f64> {
        match left.data_type {
            DataType::Int64 => Ok(left.get_int64(pos) as f64),
            DataType::Double => Ok(left.get_double(pos)),
            other => Err(Error::TypeMismatch { op: op.name(), left: other, right: right.data_type }),
        }
    };
    let rv = |pos: usize| -> Result<f64> {
        match right.data_type {
            DataType::Int64 => Ok(right.get_int64(pos) as f64),
            DataType::Double => Ok(right.get_double(pos)),
            other => Err(Error::TypeMismatch { op: op.name(), left: left.data_type, right: other }),
        }
    };
    let mut err = None;
    dispatch_binary(&left.state, &right.state, |lp, rp, resp| {
        if err.is_some() {
            return;
        }
        if left.is_null(lp) || right.is_null(rp) {
            return;
        }
        let (a, b) = match (lv(lp), rv(rp)) {
            (Ok(a), Ok(b)) => (a, b),
            (Err(e), _) | (_, Err(e)) => {
                err = Some(e);
                return;
            }
        };
        match apply_double(op, a, b) {
            Ok(v) => result.set_double(resp, v),
            Err(e) => err = Some(e),
        }
    });
    if let Some(e) = err {
        return Err(e);
    }
    Ok(())
}

/// Unary negate; preserves the input type.
pub fn negate(input: &Vector, result: &mut Vector) -> Result<()> {
    for pos in input.state.borrow().iter_positions() {
        if input.is_null(pos) {
            continue;
        }
        match input.data_type {
            DataType::Int64 => result.set_int64(pos, -input.get_int64(pos)),
            DataType::Double => result.set_double(pos, -input.get_double(pos)),
            other => {
                return Err(Error::TypeMismatch { op: "Negate", left: other, right: other });
            }
        }
    }
    Ok(())
}
