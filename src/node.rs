//! The vectorized physical operator tree (spec §4.C): a closed sum of operator kinds,
//! each implementing `init_result_set` / `re_init_to_rerun` / `next` / `clone`.
//! Generalized from the teacher's `DynOp`/`Node` tagged-enum dispatch (match-based, no
//! vtable for the tree shape itself) into the pull-based operator contract §4.C and §5
//! describe: the planner's materializer builds one logical tree, then the engine
//! `clone()`s it per worker so each has private selection state, aggregate states, and
//! intermediate vectors.

use crate::error::Result;
use crate::interfaces::MemoryManager;
use crate::operators::aggregate_op::AggregateOp;
use crate::operators::extend::{AdjColumnExtend, AdjListExtend};
use crate::operators::filter::Filter;
use crate::operators::flatten::Flatten;
use crate::operators::hash_join::HashJoin;
use crate::operators::intersect::Intersect;
use crate::operators::projection::Projection;
use crate::operators::recursive_join::RecursiveJoin;
use crate::operators::result_collector::ResultCollector;
use crate::operators::scan_node_id::ScanNodeId;
use crate::operators::scan_property::ScanProperty;
use crate::operators::select_scan::SelectScan;
use crate::vector::ResultSet;
use std::sync::Arc;

/// Closed physical-operator sum (spec §4.C). Each variant owns its child (where it has
/// one) as a `Box<Operator>`, so the tree clones cheaply.
#[derive(Clone)]
pub enum Operator {
    ScanNodeId(ScanNodeId),
    AdjColumnExtend(AdjColumnExtend),
    AdjListExtend(AdjListExtend),
    ScanProperty(ScanProperty),
    Filter(Filter),
    Flatten(Flatten),
    Projection(Projection),
    HashJoin(HashJoin),
    Intersect(Intersect),
    Aggregate(AggregateOp),
    ResultCollector(ResultCollector),
    SelectScan(SelectScan),
    RecursiveJoin(RecursiveJoin),
}

macro_rules! for_each_op {
    ($self:ident, $op:ident => $body:expr) => {
        match $self {
            Operator::ScanNodeId($op) => $body,
            Operator::AdjColumnExtend($op) => $body,
            Operator::AdjListExtend($op) => $body,
            Operator::ScanProperty($op) => $body,
            Operator::Filter($op) => $body,
            Operator::Flatten($op) => $body,
            Operator::Projection($op) => $body,
            Operator::HashJoin($op) => $body,
            Operator::Intersect($op) => $body,
            Operator::Aggregate($op) => $body,
            Operator::ResultCollector($op) => $body,
            Operator::SelectScan($op) => $body,
            Operator::RecursiveJoin($op) => $body,
        }
    };
}

impl Operator {
    /// Allocate this operator's (and transitively its children's) output `ResultSet`
    /// shape. Called once per worker before the first `next()`.
    pub fn init_result_set(&mut self, mm: &Arc<dyn MemoryManager>) {
        for_each_op!(self, op => op.init_result_set(mm))
    }

    /// Pull one more batch. `false` means end of stream; the caller must not call
    /// `next` again without first calling `re_init_to_rerun` (spec §4.C).
    pub fn next(&mut self) -> Result<bool> {
        for_each_op!(self, op => op.next())
    }

    /// Reset one-shot/cursor state for correlated-subquery re-execution (spec §4.C,
    /// §5: "operators implement `re_init_to_rerun` for subquery iteration").
    pub fn re_init_to_rerun(&mut self) {
        for_each_op!(self, op => op.re_init_to_rerun())
    }

    /// Tracing/debug name, not part of the data contract (spec §4.C Added).
    pub fn name(&self) -> &'static str {
        match self {
            Operator::ScanNodeId(_) => "ScanNodeId",
            Operator::AdjColumnExtend(_) => "AdjColumnExtend",
            Operator::AdjListExtend(_) => "AdjListExtend",
            Operator::ScanProperty(_) => "ScanProperty",
            Operator::Filter(_) => "Filter",
            Operator::Flatten(_) => "Flatten",
            Operator::Projection(_) => "Projection",
            Operator::HashJoin(_) => "HashJoin",
            Operator::Intersect(_) => "Intersect",
            Operator::Aggregate(_) => "Aggregate",
            Operator::ResultCollector(_) => "ResultCollector",
            Operator::SelectScan(_) => "SelectScan",
            Operator::RecursiveJoin(_) => "RecursiveJoin",
        }
    }

    /// The operator's current output, valid after a `next()` that returned `true`.
    pub fn result_set(&self) -> &ResultSet {
        for_each_op!(self, op => &op.result_set)
    }
}
