//! `Filter` (spec §4.C): evaluates a boolean expression to a filtered position list,
//! tightens the selection state in place, and retries the child until it either finds
//! ≥1 surviving tuple or EOS.

use crate::error::Result;
use crate::interfaces::MemoryManager;
use crate::node::Operator;
use crate::operators::select_scan::OuterSlot;
use crate::vector::{DataChunk, ResultSet, SelectionState};
use std::cell::RefCell;
use std::rc::Rc;
use std::sync::Arc;

fn detach_chunk_state(chunk: &mut DataChunk) {
    let snapshot = chunk.state.borrow().clone();
    let fresh = Rc::new(RefCell::new(snapshot));
    chunk.state = fresh.clone();
    for v in chunk.vectors.iter_mut() {
        v.state = fresh.clone();
    }
}

/// What a [`Filter`] evaluates per candidate position.
#[derive(Clone)]
pub enum FilterPredicate {
    /// An already-materialized `Bool` vector, e.g. the output of a `Projection`
    /// computing a comparison/boolean expression. A null entry never passes.
    Column { vector_idx: usize },
    /// `EXISTS`/`NOT EXISTS` over a correlated subquery: the one flat candidate row is
    /// pushed through `outer` into the subquery's `SelectScan`, and the predicate is
    /// whether the subquery produces at least one row.
    Exists { outer: OuterSlot, subquery: Box<Operator>, negate: bool },
}

#[derive(Clone)]
pub struct Filter {
    pub child: Box<Operator>,
    pub chunk_idx: usize,
    pub predicate: FilterPredicate,
    pub result_set: ResultSet,
}

impl Filter {
    pub fn init_result_set(&mut self, mm: &Arc<dyn MemoryManager>) {
        self.child.init_result_set(mm);
        if let FilterPredicate::Exists { subquery, .. } = &mut self.predicate {
            subquery.init_result_set(mm);
        }
    }

    pub fn next(&mut self) -> Result<bool> {
        loop {
            if !self.child.next()? {
                return Ok(false);
            }
            let mut chunk = self.child.result_set().chunks[self.chunk_idx].clone();
            detach_chunk_state(&mut chunk);
            let positions: Vec<usize> = chunk.state.borrow().iter_positions().collect();

            let mut kept = Vec::with_capacity(positions.len());
            for pos in positions {
                if self.evaluate(&chunk, pos)? {
                    kept.push(pos as u32);
                }
            }
            if kept.is_empty() {
                continue;
            }
            chunk.state.borrow_mut().set_filtered(kept);

            let mut result_set = self.child.result_set().clone();
            result_set.chunks[self.chunk_idx] = chunk;
            self.result_set = result_set;
            return Ok(true);
        }
    }

    fn evaluate(&mut self, chunk: &DataChunk, pos: usize) -> Result<bool> {
        match &mut self.predicate {
            FilterPredicate::Column { vector_idx } => {
                let v = &chunk.vectors[*vector_idx];
                Ok(!v.is_null(pos) && v.get_bool(pos))
            }
            FilterPredicate::Exists { outer, subquery, negate } => {
                *outer.borrow_mut() = Some(one_row_chunk(chunk, pos));
                subquery.re_init_to_rerun();
                let exists = subquery.next()?;
                Ok(exists != *negate)
            }
        }
    }

    pub fn re_init_to_rerun(&mut self) {
        self.child.re_init_to_rerun();
        if let FilterPredicate::Exists { subquery, .. } = &mut self.predicate {
            subquery.re_init_to_rerun();
        }
    }
}

/// Copy every vector's value at `pos` into a freshly allocated, single-row flat chunk —
/// the "exactly one flat tuple" a `SelectScan` expects (spec §4.C).
fn one_row_chunk(chunk: &DataChunk, pos: usize) -> DataChunk {
    let state = Rc::new(RefCell::new(SelectionState::new_flat()));
    let mut out = DataChunk::new(state);
    for v in &chunk.vectors {
        let idx = out.add_vector(v.data_type);
        let value = v.get_value(pos);
        out.vectors[idx].set_value(0, &value);
    }
    out
}
