//! Widening cast kernels used by projection expressions and `Unstructured` property
//! materialization. Only the casts an in-scope caller needs are provided (spec §4.B
//! Added): `Int64 -> Double`, `Int64 -> String`, `Double -> String`, `Bool -> String`.
//! Narrowing casts are intentionally absent.

use crate::vector::Vector;

pub fn int64_to_double(input: &Vector, result: &mut Vector) {
    for pos in input.state.borrow().iter_positions() {
        if input.is_null(pos) {
            result.set_null(pos, true);
            continue;
        }
        result.set_double(pos, input.get_int64(pos) as f64);
    }
}

pub fn int64_to_string(input: &Vector, result: &mut Vector) {
    for pos in input.state.borrow().iter_positions() {
        if input.is_null(pos) {
            result.set_null(pos, true);
            continue;
        }
        result.set_string(pos, &input.get_int64(pos).to_string());
    }
}

pub fn double_to_string(input: &Vector, result: &mut Vector) {
    for pos in input.state.borrow().iter_positions() {
        if input.is_null(pos) {
            result.set_null(pos, true);
            continue;
        }
        result.set_string(pos, &input.get_double(pos).to_string());
    }
}

pub fn bool_to_string(input: &Vector, result: &mut Vector) {
    for pos in input.state.borrow().iter_positions() {
        if input.is_null(pos) {
            result.set_null(pos, true);
            continue;
        }
        result.set_string(pos, if input.get_bool(pos) { "True" } else { "False" });
    }
}
