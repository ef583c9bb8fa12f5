//! `ScanProperty` (spec §4.C): structured (fixed-width column) and unstructured (packed
//! `(key,type,value)` list walk) property reads for a NodeID column, via the [`Storage`]
//! trait.

use crate::error::Result;
use crate::interfaces::{MemoryManager, Storage};
use crate::node::Operator;
use crate::types::DataType;
use crate::vector::{DataChunk, ResultSet, SelectionState, Vector};
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

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PropertyKind {
    Structured,
    Unstructured,
}

#[derive(Clone)]
pub struct ScanProperty {
    pub child: Box<Operator>,
    pub chunk_idx: usize,
    pub node_vector_idx: usize,
    pub node_table_id: u64,
    pub property: String,
    pub kind: PropertyKind,
    pub output_type: DataType,
    pub storage: Arc<dyn Storage>,
    pub result_set: ResultSet,
}

impl ScanProperty {
    pub fn init_result_set(&mut self, mm: &Arc<dyn MemoryManager>) {
        self.child.init_result_set(mm);
    }

    pub fn next(&mut self) -> Result<bool> {
        if !self.child.next()? {
            return Ok(false);
        }
        let mut chunk = self.child.result_set().chunks[self.chunk_idx].clone();
        detach_chunk_state(&mut chunk);
        let out_idx = chunk.add_vector(self.output_type);
        let positions: Vec<usize> = chunk.state.borrow().iter_positions().collect();

        for pos in positions {
            let node = chunk.vectors[self.node_vector_idx].get_node_id(pos);
            match self.kind {
                PropertyKind::Structured => {
                    let flat_state = Rc::new(RefCell::new(SelectionState::new_flat()));
                    let mut tmp = Vector::new(self.output_type, flat_state);
                    self.storage.read_property(self.node_table_id, &self.property, &[node], &mut tmp)?;
                    let value = tmp.get_value(0);
                    chunk.vectors[out_idx].set_value(pos, &value);
                }
                PropertyKind::Unstructured => match self.storage.read_unstructured(self.node_table_id, node, &self.property) {
                    Some(value) => chunk.vectors[out_idx].set_value(pos, &value),
                    None => chunk.vectors[out_idx].set_null(pos, true),
                },
            }
        }

        self.result_set = ResultSet { chunks: vec![chunk], multiplicity: self.child.result_set().multiplicity };
        Ok(true)
    }

    pub fn re_init_to_rerun(&mut self) {
        self.child.re_init_to_rerun();
    }
}
