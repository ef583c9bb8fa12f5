//! Aggregate function quadruples: `(initialize, update, combine, finalize)` (spec §4.E).
//!
//! Modeled as a closed [`AggregateKind`] selecting a tagged [`AggregateState`] variant,
//! per Design Notes §9 ("the aggregate function's four-tuple of function pointers
//! becomes four closures or a tagged enum of aggregate kinds") and generalizing the
//! teacher's single-type `Sum<T>`/`Min<T>`/`Max<T>`/`AverageF64` combiners
//! (`combiners.rs`) to a null-aware, multiplicity-aware batch update contract.
//!
//! NULL handling is uniform across every kind: an incoming null value is skipped; a null
//! *state* is seeded from the first non-null input; combining with a null other-state is
//! a no-op.

use crate::error::{Error, Result};
use crate::types::DataType;
use crate::utils::OrdF64;
use crate::vector::Vector;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AggregateKind {
    CountStar,
    Count,
    Sum,
    Avg,
    Min,
    Max,
}

impl AggregateKind {
    fn name(self) -> &'static str {
        match self {
            AggregateKind::CountStar => "COUNT_STAR",
            AggregateKind::Count => "COUNT",
            AggregateKind::Sum => "SUM",
            AggregateKind::Avg => "AVG",
            AggregateKind::Min => "MIN",
            AggregateKind::Max => "MAX",
        }
    }
}

#[derive(Clone, Debug)]
pub enum AggregateState {
    CountStar { value: u64 },
    Count { value: u64 },
    SumInt64 { sum: i64, is_null: bool },
    SumDouble { sum: f64, is_null: bool },
    Avg { sum: f64, count: u64, is_null: bool },
    MinInt64 { value: i64, is_null: bool },
    MaxInt64 { value: i64, is_null: bool },
    MinDouble { value: OrdF64, is_null: bool },
    MaxDouble { value: OrdF64, is_null: bool },
    MinString { value: String, is_null: bool },
    MaxString { value: String, is_null: bool },
}

/// `initialize`: the zero state for `kind` applied to inputs of `input_type`.
/// `CountStar`/`Count` ignore `input_type` (COUNT_STAR has no input vector at all).
pub fn initialize(kind: AggregateKind, input_type: DataType) -> Result<AggregateState> {
    Ok(match kind {
        AggregateKind::CountStar => AggregateState::CountStar { value: 0 },
        AggregateKind::Count => AggregateState::Count { value: 0 },
        AggregateKind::Sum => match input_type {
            DataType::Int64 => AggregateState::SumInt64 { sum: 0, is_null: true },
            DataType::Double => AggregateState::SumDouble { sum: 0.0, is_null: true },
            other => {
                return Err(Error::UnsupportedFunction { aggregate: kind.name(), input_type: other });
            }
        },
        AggregateKind::Avg => match input_type {
            DataType::Int64 | DataType::Double => {
                AggregateState::Avg { sum: 0.0, count: 0, is_null: true }
            }
            other => {
                return Err(Error::UnsupportedFunction { aggregate: kind.name(), input_type: other });
            }
        },
        AggregateKind::Min => match input_type {
            DataType::Int64 => AggregateState::MinInt64 { value: i64::MAX, is_null: true },
            DataType::Double => {
                AggregateState::MinDouble { value: OrdF64(f64::INFINITY), is_null: true }
            }
            DataType::String => AggregateState::MinString { value: String::new(), is_null: true },
            other => {
                return Err(Error::UnsupportedFunction { aggregate: kind.name(), input_type: other });
            }
        },
        AggregateKind::Max => match input_type {
            DataType::Int64 => AggregateState::MaxInt64 { value: i64::MIN, is_null: true },
            DataType::Double => {
                AggregateState::MaxDouble { value: OrdF64(f64::NEG_INFINITY), is_null: true }
            }
            DataType::String => AggregateState::MaxString { value: String::new(), is_null: true },
            other => {
                return Err(Error::UnsupportedFunction { aggregate: kind.name(), input_type: other });
            }
        },
    })
}

/// `update`: fold every selected, non-null position of `input` (or, for `CountStar`,
/// just the batch's `multiplicity`) into `state`.
pub fn update(state: &mut AggregateState, input: Option<&Vector>, multiplicity: u64) -> Result<()> {
    match state {
        AggregateState::CountStar { value } => *value += multiplicity,
        AggregateState::Count { value } => {
            let input = input.expect("COUNT requires an input vector");
            for pos in input.state.borrow().iter_positions() {
                if !input.is_null(pos) {
                    *value += multiplicity;
                }
            }
        }
        AggregateState::SumInt64 { sum, is_null } => {
            let input = input.expect("SUM requires an input vector");
            for pos in input.state.borrow().iter_positions() {
                if input.is_null(pos) {
                    continue;
                }
                *sum += input.get_int64(pos) * multiplicity as i64;
                *is_null = false;
            }
        }
        AggregateState::SumDouble { sum, is_null } => {
            let input = input.expect("SUM requires an input vector");
            for pos in input.state.borrow().iter_positions() {
                if input.is_null(pos) {
                    continue;
                }
                *sum += input.get_double(pos) * multiplicity as f64;
                *is_null = false;
            }
        }
        AggregateState::Avg { sum, count, is_null } => {
            let input = input.expect("AVG requires an input vector");
            for pos in input.state.borrow().iter_positions() {
                if input.is_null(pos) {
                    continue;
                }
                let v = match input.data_type {
                    DataType::Int64 => input.get_int64(pos) as f64,
                    DataType::Double => input.get_double(pos),
                    other => {
                        return Err(Error::UnsupportedFunction { aggregate: "AVG", input_type: other });
                    }
                };
                *sum += v * multiplicity as f64;
                *count += multiplicity;
                *is_null = false;
            }
        }
        AggregateState::MinInt64 { value, is_null } => {
            let input = input.expect("MIN requires an input vector");
            for pos in input.state.borrow().iter_positions() {
                if input.is_null(pos) {
                    continue;
                }
                let v = input.get_int64(pos);
                if *is_null || v < *value {
                    *value = v;
                }
                *is_null = false;
            }
        }
        AggregateState::MaxInt64 { value, is_null } => {
            let input = input.expect("MAX requires an input vector");
            for pos in input.state.borrow().iter_positions() {
                if input.is_null(pos) {
                    continue;
                }
                let v = input.get_int64(pos);
                if *is_null || v > *value {
                    *value = v;
                }
                *is_null = false;
            }
        }
        AggregateState::MinDouble { value, is_null } => {
            let input = input.expect("MIN requires an input vector");
            for pos in input.state.borrow().iter_positions() {
                if input.is_null(pos) {
                    continue;
                }
                let v = OrdF64(input.get_double(pos));
                if *is_null || v < *value {
                    *value = v;
                }
                *is_null = false;
            }
        }
        AggregateState::MaxDouble { value, is_null } => {
            let input = input.expect("MAX requires an input vector");
            for pos in input.state.borrow().iter_positions() {
                if input.is_null(pos) {
                    continue;
                }
                let v = OrdF64(input.get_double(pos));
                if *is_null || v > *value {
                    *value = v;
                }
                *is_null = false;
            }
        }
        AggregateState::MinString { value, is_null } => {
            let input = input.expect("MIN requires an input vector");
            for pos in input.state.borrow().iter_positions() {
                if input.is_null(pos) {
                    continue;
                }
                let v = input.get_string(pos);
                if *is_null || v < value.as_str() {
                    *value = v.to_string();
                }
                *is_null = false;
            }
        }
        AggregateState::MaxString { value, is_null } => {
            let input = input.expect("MAX requires an input vector");
            for pos in input.state.borrow().iter_positions() {
                if input.is_null(pos) {
                    continue;
                }
                let v = input.get_string(pos);
                if *is_null || v > value.as_str() {
                    *value = v.to_string();
                }
                *is_null = false;
            }
        }
    }
    Ok(())
}

/// `combine`: merge `other` into `state` in place. A null `other` is a no-op.
pub fn combine(state: &mut AggregateState, other: &AggregateState) -> Result<()> {
    match (state, other) {
        (AggregateState::CountStar { value }, AggregateState::CountStar { value: ov }) => {
            *value += ov;
        }
        (AggregateState::Count { value }, AggregateState::Count { value: ov }) => {
            *value += ov;
        }
        (
            AggregateState::SumInt64 { sum, is_null },
            AggregateState::SumInt64 { sum: osum, is_null: ois_null },
        ) => {
            if !*ois_null {
                *sum += osum;
                *is_null = false;
            }
        }
        (
            AggregateState::SumDouble { sum, is_null },
            AggregateState::SumDouble { sum: osum, is_null: ois_null },
        ) => {
            if !*ois_null {
                *sum += osum;
                *is_null = false;
            }
        }
        (
            AggregateState::Avg { sum, count, is_null },
            AggregateState::Avg { sum: osum, count: ocount, is_null: ois_null },
        ) => {
            if !*ois_null {
                *sum += osum;
                *count += ocount;
                *is_null = false;
            }
        }
        (
            AggregateState::MinInt64 { value, is_null },
            AggregateState::MinInt64 { value: ov, is_null: ois_null },
        ) => {
            if !*ois_null && (*is_null || ov < value) {
                *value = *ov;
                *is_null = false;
            }
        }
        (
            AggregateState::MaxInt64 { value, is_null },
            AggregateState::MaxInt64 { value: ov, is_null: ois_null },
        ) => {
            if !*ois_null && (*is_null || ov > value) {
                *value = *ov;
                *is_null = false;
            }
        }
        (
            AggregateState::MinDouble { value, is_null },
            AggregateState::MinDouble { value: ov, is_null: ois_null },
        ) => {
            if !*ois_null && (*is_null || ov < value) {
                *value = *ov;
                *is_null = false;
            }
        }
        (
            AggregateState::MaxDouble { value, is_null },
            AggregateState::MaxDouble { value: ov, is_null: ois_null },
        ) => {
            if !*ois_null && (*is_null || ov > value) {
                *value = *ov;
                *is_null = false;
            }
        }
        (
            AggregateState::MinString { value, is_null },
            AggregateState::MinString { value: ov, is_null: ois_null },
        ) => {
            if !*ois_null && (*is_null || ov < value) {
                *value = ov.clone();
                *is_null = false;
            }
        }
        (
            AggregateState::MaxString { value, is_null },
            AggregateState::MaxString { value: ov, is_null: ois_null },
        ) => {
            if !*ois_null && (*is_null || ov > value) {
                *value = ov.clone();
                *is_null = false;
            }
        }
        _ => {
            return Err(Error::ExecutionInvariant("combine called on mismatched aggregate states"));
        }
    }
    Ok(())
}

/// `finalize`: the aggregate's logical scalar result.
pub fn finalize(state: &AggregateState) -> crate::types::Value {
    use crate::types::Value;
    match state {
        AggregateState::CountStar { value } => Value::Int64(*value as i64),
        AggregateState::Count { value } => Value::Int64(*value as i64),
        AggregateState::SumInt64 { sum, is_null } => {
            if *is_null { Value::Null } else { Value::Int64(*sum) }
        }
        AggregateState::SumDouble { sum, is_null } => {
            if *is_null { Value::Null } else { Value::Double(*sum) }
        }
        AggregateState::Avg { sum, count, is_null } => {
            if *is_null || *count == 0 { Value::Null } else { Value::Double(*sum / *count as f64) }
        }
        AggregateState::MinInt64 { value, is_null } | AggregateState::MaxInt64 { value, is_null } => {
            if *is_null { Value::Null } else { Value::Int64(*value) }
        }
        AggregateState::MinDouble { value, is_null } | AggregateState::MaxDouble { value, is_null } => {
            if *is_null { Value::Null } else { Value::Double(value.0) }
        }
        AggregateState::MinString { value, is_null } | AggregateState::MaxString { value, is_null } => {
            if *is_null { Value::Null } else { Value::String(value.clone()) }
        }
    }
}

/// Scalar convenience over [`update`] for callers (the aggregate hash table) that have
/// already extracted one logical value per row rather than a whole vector.
pub fn update_scalar(
    state: &mut AggregateState,
    data_type: DataType,
    value: Option<&crate::types::Value>,
    multiplicity: u64,
) -> Result<()> {
    use crate::types::Value;
    use crate::vector::{SelectionState, Vector};
    use std::cell::RefCell;
    use std::rc::Rc;

    let sel = Rc::new(RefCell::new(SelectionState::new_flat()));
    let mut v = Vector::new(data_type, sel);
    match value {
        None => v.set_null(0, true),
        Some(Value::Null) => v.set_null(0, true),
        Some(Value::Bool(b)) => v.set_bool(0, *b),
        Some(Value::Int64(i)) => v.set_int64(0, *i),
        Some(Value::Double(d)) => v.set_double(0, *d),
        Some(Value::String(s)) => v.set_string(0, s),
        Some(Value::NodeId(id)) => v.set_node_id(0, *id),
        Some(Value::RelId(id)) => v.set_rel_id(0, *id),
        Some(Value::Date(_) | Value::Timestamp(_) | Value::Interval(_)) => {
            return Err(Error::UnsupportedFunction { aggregate: "aggregate", input_type: data_type });
        }
    }
    update(state, Some(&v), multiplicity)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::vector::{SelectionState, Vector};
    use std::cell::RefCell;
    use std::rc::Rc;

    fn int_vector(values: &[Option<i64>]) -> Vector {
        let state = Rc::new(RefCell::new(SelectionState::new_unfiltered(values.len())));
        let mut v = Vector::new(DataType::Int64, state);
        for (i, value) in values.iter().enumerate() {
            match value {
                Some(x) => v.set_int64(i, *x),
                None => v.set_null(i, true),
            }
        }
        v
    }

    #[test]
    fn count_star_with_combine() {
        let mut state = initialize(AggregateKind::CountStar, DataType::Int64).unwrap();
        update(&mut state, None, 100).unwrap();
        let other = AggregateState::CountStar { value: 10 };
        combine(&mut state, &other).unwrap();
        assert_eq!(finalize(&state), crate::types::Value::Int64(110));
    }

    #[test]
    fn count_skips_nulls() {
        let values: Vec<Option<i64>> =
            (0..100).map(|i| if i % 2 == 0 { None } else { Some(i) }).collect();
        let v = int_vector(&values);
        let mut state = initialize(AggregateKind::Count, DataType::Int64).unwrap();
        update(&mut state, Some(&v), 1).unwrap();
        combine(&mut state, &AggregateState::Count { value: 10 }).unwrap();
        assert_eq!(finalize(&state), crate::types::Value::Int64(60));
    }

    #[test]
    fn sum_of_odd_values() {
        let values: Vec<Option<i64>> =
            (0..100).map(|i| if i % 2 == 0 { None } else { Some(i) }).collect();
        let v = int_vector(&values);
        let mut state = initialize(AggregateKind::Sum, DataType::Int64).unwrap();
        update(&mut state, Some(&v), 1).unwrap();
        let expected: i64 = (1..100).step_by(2).sum();
        combine(&mut state, &AggregateState::SumInt64 { sum: 10, is_null: false }).unwrap();
        assert_eq!(finalize(&state), crate::types::Value::Int64(expected + 10));
    }

    #[test]
    fn avg_combine_with_seeded_count() {
        let values: Vec<Option<i64>> = (0..100).map(|i| if i % 2 == 0 { None } else { Some(i) }).collect();
        let v = int_vector(&values);
        let mut state = initialize(AggregateKind::Avg, DataType::Int64).unwrap();
        update(&mut state, Some(&v), 1).unwrap();
        let sum: i64 = (1..100).step_by(2).sum();
        combine(&mut state, &AggregateState::Avg { sum: 10.0, count: 1, is_null: false }).unwrap();
        assert_eq!(finalize(&state), crate::types::Value::Double((sum as f64 + 10.0) / 51.0));
    }

    #[test]
    fn min_max_seeded() {
        let v = int_vector(&(0..100).map(Some).collect::<Vec<_>>());
        let mut min_state = initialize(AggregateKind::Min, DataType::Int64).unwrap();
        update(&mut min_state, Some(&v), 1).unwrap();
        combine(&mut min_state, &AggregateState::MinInt64 { value: -10, is_null: false }).unwrap();
        assert_eq!(finalize(&min_state), crate::types::Value::Int64(-10));

        let mut max_state = initialize(AggregateKind::Max, DataType::Int64).unwrap();
        update(&mut max_state, Some(&v), 1).unwrap();
        combine(&mut max_state, &AggregateState::MaxInt64 { value: 101, is_null: false }).unwrap();
        assert_eq!(finalize(&max_state), crate::types::Value::Int64(101));
    }
}
