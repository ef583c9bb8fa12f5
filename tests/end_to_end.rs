//! End-to-end scenarios over the `tinysnb` fixture, assembled as literal operator
//! chains rather than through the planner — the chains themselves are the spec.

use graphflow_exec::interfaces::MemoryManager;
use graphflow_exec::node::Operator;
use graphflow_exec::operators::extend::{AdjColumnExtend, AdjListExtend};
use graphflow_exec::operators::filter::{Filter, FilterPredicate};
use graphflow_exec::operators::flatten::Flatten;
use graphflow_exec::operators::result_collector::ResultCollector;
use graphflow_exec::operators::scan_node_id::ScanNodeId;
use graphflow_exec::operators::select_scan::{OuterSlot, SelectScan};
use graphflow_exec::planner::Direction;
use graphflow_exec::testing::tinysnb::{SimpleMemoryManager, TinySnb, KNOWS_TABLE, NUM_PERSONS, STUDY_AT_TABLE, WORKS_AT_TABLE};
use graphflow_exec::vector::ResultSet;
use std::cell::RefCell;
use std::rc::Rc;
use std::sync::Arc;

fn person_scan() -> Box<Operator> {
    let cursor = Arc::new(graphflow_exec::dispatch::MorselDesc::new(NUM_PERSONS));
    Box::new(Operator::ScanNodeId(ScanNodeId::new(graphflow_exec::testing::tinysnb::PERSON_TABLE, cursor)))
}

fn flatten_persons() -> Box<Operator> {
    Box::new(Operator::Flatten(Flatten::new(person_scan(), 0)))
}

/// `EXISTS`/`NOT EXISTS` over the `knows` adjacency list, run single-threaded against
/// the collector directly (no rayon: the whole chain is `!Send` by design).
fn knows_exists_filter(negate: bool) -> Filter {
    let outer: OuterSlot = Rc::new(RefCell::new(None));
    let subquery = Box::new(Operator::AdjListExtend(AdjListExtend::new(
        Box::new(Operator::SelectScan(SelectScan::new(outer.clone()))),
        Arc::new(TinySnb::new()),
        KNOWS_TABLE,
        Direction::Fwd,
        0,
    )));
    Filter { child: flatten_persons(), chunk_idx: 0, predicate: FilterPredicate::Exists { outer, subquery, negate }, result_set: ResultSet::new() }
}

fn adj_column_exists_filter(rel_table_id: u64, negate: bool) -> Filter {
    let outer: OuterSlot = Rc::new(RefCell::new(None));
    let subquery = Box::new(Operator::AdjColumnExtend(AdjColumnExtend {
        child: Box::new(Operator::SelectScan(SelectScan::new(outer.clone()))),
        storage: Arc::new(TinySnb::new()),
        rel_table_id,
        direction: Direction::Fwd,
        src_vector_idx: 0,
        result_set: ResultSet::new(),
    }));
    Filter { child: flatten_persons(), chunk_idx: 0, predicate: FilterPredicate::Exists { outer, subquery, negate }, result_set: ResultSet::new() }
}

/// `Operator` is `!Send` by design (spec §5), so these hand-assembled single-tree
/// chains are driven directly rather than through `execute`'s per-worker factory.
fn run_count(mut op: Operator) -> u64 {
    let mm: Arc<dyn MemoryManager> = Arc::new(SimpleMemoryManager);
    op.init_result_set(&mm);
    let mut total = 0u64;
    while op.next().expect("chain should not fail") {
        total += op.result_set().logical_tuple_count();
    }
    total
}

#[test]
fn scenario_one_counts_every_person() {
    let op = Operator::ResultCollector(ResultCollector::new(flatten_persons()));
    assert_eq!(run_count(op), 8);
}

#[test]
fn scenario_two_exists_knows() {
    let op = Operator::ResultCollector(ResultCollector::new(Box::new(Operator::Filter(knows_exists_filter(false)))));
    assert_eq!(run_count(op), 5);
}

#[test]
fn scenario_three_not_exists_knows() {
    let op = Operator::ResultCollector(ResultCollector::new(Box::new(Operator::Filter(knows_exists_filter(true)))));
    assert_eq!(run_count(op), 3);
}

#[test]
fn scenario_four_not_exists_study_at() {
    let op = Operator::ResultCollector(ResultCollector::new(Box::new(Operator::Filter(adj_column_exists_filter(STUDY_AT_TABLE, true)))));
    assert_eq!(run_count(op), 5);
}

/// `studyAt OR worksAt`: the engine has no boolean-combinator operator over two
/// `Exists` predicates, so the disjunction is taken at the test level over the two
/// surviving person-id sets — each produced by a genuine operator chain.
#[test]
fn scenario_five_study_at_or_works_at() {
    let study_ids = collect_surviving_persons(adj_column_exists_filter(STUDY_AT_TABLE, false));
    let works_ids = collect_surviving_persons(adj_column_exists_filter(WORKS_AT_TABLE, false));
    let union: std::collections::HashSet<_> = study_ids.into_iter().chain(works_ids).collect();
    assert_eq!(union.len(), 6);
}

/// "Person knows someone who worksAt some org": a knows-extend followed by a
/// worksAt-exists filter on the extended (destination) vector.
#[test]
fn scenario_six_nested_knows_works_at() {
    let outer: OuterSlot = Rc::new(RefCell::new(None));
    let subquery = Box::new(Operator::AdjColumnExtend(AdjColumnExtend {
        child: Box::new(Operator::AdjListExtend(AdjListExtend::new(
            Box::new(Operator::SelectScan(SelectScan::new(outer.clone()))),
            Arc::new(TinySnb::new()),
            KNOWS_TABLE,
            Direction::Fwd,
            0,
        ))),
        storage: Arc::new(TinySnb::new()),
        rel_table_id: WORKS_AT_TABLE,
        direction: Direction::Fwd,
        src_vector_idx: 1,
        result_set: ResultSet::new(),
    }));
    let filter = Filter { child: flatten_persons(), chunk_idx: 0, predicate: FilterPredicate::Exists { outer, subquery, negate: false }, result_set: ResultSet::new() };
    let op = Operator::ResultCollector(ResultCollector::new(Box::new(Operator::Filter(filter))));
    assert_eq!(run_count(op), 4);
}

fn collect_surviving_persons(filter: Filter) -> Vec<graphflow_exec::types::NodeId> {
    let mm: Arc<dyn MemoryManager> = Arc::new(SimpleMemoryManager);
    let mut collector = ResultCollector::new(Box::new(Operator::Filter(filter)));
    collector.init_result_set(&mm);
    let mut ids = Vec::new();
    while collector.next().expect("chain should not fail") {
        for chunk in &collector.result_set.chunks {
            for pos in chunk.state.borrow().iter_positions() {
                ids.push(chunk.vectors[0].get_node_id(pos));
            }
        }
    }
    ids
}
