//! `AdjColumnExtend` and `AdjListExtend` (spec §4.C): read the resident adjacency
//! structure at each bound node produced by the child operator.

use crate::error::Result;
use crate::interfaces::{MemoryManager, Storage};
use crate::node::Operator;
use crate::planner::Direction;
use crate::types::DataType;
use crate::vector::{DataChunk, SelectionState};
use std::cell::RefCell;
use std::rc::Rc;
use std::sync::Arc;

/// Re-parent `chunk` onto a fresh, unshared [`SelectionState`] so mutating it (tightening
/// the selection after a null-neighbor filter) never reaches back into the child's own
/// retained state.
fn detach_chunk_state(chunk: &mut DataChunk) {
    let snapshot = chunk.state.borrow().clone();
    let fresh = Rc::new(RefCell::new(snapshot));
    chunk.state = fresh.clone();
    for v in chunk.vectors.iter_mut() {
        v.state = fresh.clone();
    }
}

#[derive(Clone)]
pub struct AdjColumnExtend {
    pub child: Box<Operator>,
    pub storage: Arc<dyn Storage>,
    pub rel_table_id: u64,
    pub direction: Direction,
    pub src_vector_idx: usize,
    pub result_set: crate::vector::ResultSet,
}

impl AdjColumnExtend {
    pub fn init_result_set(&mut self, mm: &Arc<dyn MemoryManager>) {
        self.child.init_result_set(mm);
    }

    /// Reads the adjacency column at each selected bound node; rows whose neighbor is
    /// null are dropped from the (now-private) selection state, so every surviving row
    /// has a non-null neighbor (spec §4.C invariant).
    pub fn next(&mut self) -> Result<bool> {
        if !self.child.next()? {
            return Ok(false);
        }
        let mut chunk = self.child.result_set().chunks[0].clone();
        detach_chunk_state(&mut chunk);

        let positions: Vec<usize> = chunk.state.borrow().iter_positions().collect();
        let new_vec_idx = chunk.add_vector(DataType::NodeID);
        let mut kept = Vec::with_capacity(positions.len());
        for pos in positions {
            let src_node = chunk.vectors[self.src_vector_idx].get_node_id(pos);
            if let Some(neighbor) = self.storage.read_adj_column(self.direction, self.rel_table_id, src_node) {
                chunk.vectors[new_vec_idx].set_node_id(pos, neighbor);
                kept.push(pos as u32);
            }
        }
        chunk.state.borrow_mut().set_filtered(kept);

        self.result_set = crate::vector::ResultSet { chunks: vec![chunk], multiplicity: self.child.result_set().multiplicity };
        Ok(true)
    }

    pub fn re_init_to_rerun(&mut self) {
        self.child.re_init_to_rerun();
    }
}

/// `AdjListExtend`: a lazy per-bound-node neighbor stream. Because list widths vary, it
/// buffers the current bound node's remaining neighbors between `next()` calls and
/// exhausts them fully before advancing (spec §4.C).
#[derive(Clone)]
pub struct AdjListExtend {
    pub child: Box<Operator>,
    pub storage: Arc<dyn Storage>,
    pub rel_table_id: u64,
    pub direction: Direction,
    pub src_vector_idx: usize,
    pub result_set: crate::vector::ResultSet,
    /// The bound node whose neighbor list is currently buffered, and the remaining,
    /// not-yet-emitted `(neighbor, rel)` pairs for it.
    pending: Option<(crate::types::NodeId, std::vec::IntoIter<(crate::types::NodeId, crate::types::RelId)>)>,
}

impl AdjListExtend {
    pub fn new(child: Box<Operator>, storage: Arc<dyn Storage>, rel_table_id: u64, direction: Direction, src_vector_idx: usize) -> Self {
        Self { child, storage, rel_table_id, direction, src_vector_idx, result_set: crate::vector::ResultSet::new(), pending: None }
    }

    pub fn init_result_set(&mut self, mm: &Arc<dyn MemoryManager>) {
        self.child.init_result_set(mm);
    }

    pub fn next(&mut self) -> Result<bool> {
        use crate::config::VECTOR_CAPACITY;

        loop {
            if self.pending.is_none() {
                if !self.child.next()? {
                    return Ok(false);
                }
                let chunk = &self.child.result_set().chunks[0];
                let positions: Vec<usize> = chunk.state.borrow().iter_positions().collect();
                let Some(&first) = positions.first() else {
                    continue;
                };
                let src_node = chunk.vectors[self.src_vector_idx].get_node_id(first);
                let neighbors = self.storage.read_adj_list(self.direction, self.rel_table_id, src_node);
                self.pending = Some((src_node, neighbors.into_iter()));
            }

            let (src_node, iter) = self.pending.as_mut().unwrap();
            let src_node = *src_node;
            let mut batch: Vec<(crate::types::NodeId, crate::types::RelId)> = Vec::with_capacity(VECTOR_CAPACITY);
            for item in iter.by_ref() {
                batch.push(item);
                if batch.len() >= VECTOR_CAPACITY {
                    break;
                }
            }
            if batch.is_empty() {
                self.pending = None;
                continue;
            }

            let state = Rc::new(RefCell::new(SelectionState::new_unfiltered(batch.len())));
            let mut chunk = DataChunk::new(state);
            let src_idx = chunk.add_vector(DataType::NodeID);
            let dst_idx = chunk.add_vector(DataType::NodeID);
            let rel_idx = chunk.add_vector(DataType::RelID);
            for (i, (neighbor, rel)) in batch.iter().enumerate() {
                chunk.vectors[src_idx].set_node_id(i, src_node);
                chunk.vectors[dst_idx].set_node_id(i, *neighbor);
                chunk.vectors[rel_idx].set_rel_id(i, *rel);
            }
            self.result_set = crate::vector::ResultSet { chunks: vec![chunk], multiplicity: 1 };
            return Ok(true);
        }
    }

    pub fn re_init_to_rerun(&mut self) {
        self.pending = None;
        self.child.re_init_to_rerun();
    }
}
