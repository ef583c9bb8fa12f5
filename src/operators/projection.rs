//! `Projection` (spec §4.C): computes a list of expressions into result vectors and
//! rewrites the output `ResultSet`. Discarded input chunks are recorded and their
//! tuple-count folded into `multiplicity` so downstream operators still see correct
//! cardinality.

use crate::error::Result;
use crate::interfaces::MemoryManager;
use crate::node::Operator;
use crate::types::{DataType, Value};
use crate::vector::{DataChunk, ResultSet};
use std::cell::RefCell;
use std::rc::Rc;
use std::sync::Arc;

/// One projected column: its output type and the per-position closure that computes it
/// against the designated source chunk.
#[derive(Clone)]
pub struct ProjExpr {
    pub output_type: DataType,
    pub eval: Arc<dyn Fn(&DataChunk, usize) -> Value + Send + Sync>,
}

fn detach_chunk_state(chunk: &mut DataChunk) {
    let snapshot = chunk.state.borrow().clone();
    let fresh = Rc::new(RefCell::new(snapshot));
    chunk.state = fresh.clone();
    for v in chunk.vectors.iter_mut() {
        v.state = fresh.clone();
    }
}

#[derive(Clone)]
pub struct Projection {
    pub child: Box<Operator>,
    /// Which of the child's chunks the expressions are evaluated against, one position
    /// at a time; every other chunk is discarded and its tuple-count folded into
    /// `multiplicity`.
    pub chunk_idx: usize,
    pub exprs: Vec<ProjExpr>,
    pub result_set: ResultSet,
}

impl Projection {
    pub fn init_result_set(&mut self, mm: &Arc<dyn MemoryManager>) {
        self.child.init_result_set(mm);
    }

    pub fn next(&mut self) -> Result<bool> {
        if !self.child.next()? {
            return Ok(false);
        }
        let child_rs = self.child.result_set();

        let mut folded_multiplicity: u64 = 1;
        for (idx, c) in child_rs.chunks.iter().enumerate() {
            if idx != self.chunk_idx {
                folded_multiplicity *= c.state.borrow().selected_size.max(1) as u64;
            }
        }

        let src_chunk = &child_rs.chunks[self.chunk_idx];
        let mut out_chunk = src_chunk.clone();
        detach_chunk_state(&mut out_chunk);
        out_chunk.vectors.clear();
        for expr in &self.exprs {
            out_chunk.add_vector(expr.output_type);
        }

        let positions: Vec<usize> = out_chunk.state.borrow().iter_positions().collect();
        for pos in positions {
            for (vec_idx, expr) in self.exprs.iter().enumerate() {
                let value = (expr.eval)(src_chunk, pos);
                out_chunk.vectors[vec_idx].set_value(pos, &value);
            }
        }

        self.result_set = ResultSet { chunks: vec![out_chunk], multiplicity: child_rs.multiplicity * folded_multiplicity };
        Ok(true)
    }

    pub fn re_init_to_rerun(&mut self) {
        self.child.re_init_to_rerun();
    }
}
