//! `Aggregate` (spec §4.C, §4.D): the physical operator wrapping an
//! [`AggregateHashTable`]. Build phase drains the child, appending every row's
//! group-key/aggregate-input tuple; probe phase emits the finalized groups,
//! `VECTOR_CAPACITY` rows at a time.

use crate::aggregate::{AggregateHashTable, AggregateKind};
use crate::config::VECTOR_CAPACITY;
use crate::error::Result;
use crate::interfaces::MemoryManager;
use crate::node::Operator;
use crate::types::{DataType, Value};
use crate::vector::{DataChunk, ResultSet, SelectionState};
use std::cell::RefCell;
use std::rc::Rc;
use std::sync::Arc;

#[derive(Clone)]
pub struct AggregateOp {
    pub child: Box<Operator>,
    pub chunk_idx: usize,
    pub group_vector_idxs: Vec<usize>,
    /// One entry per aggregate: `None` for `COUNT_STAR`, which has no input vector.
    pub agg_vector_idxs: Vec<Option<usize>>,
    pub aggregate_kinds: Vec<AggregateKind>,
    pub aggregate_input_types: Vec<DataType>,
    pub group_types: Vec<DataType>,
    pub result_set: ResultSet,
    table: AggregateHashTable,
    built: bool,
    finalized: Vec<(Vec<Value>, Vec<Value>)>,
    emit_idx: usize,
}

impl AggregateOp {
    pub fn new(
        child: Box<Operator>,
        chunk_idx: usize,
        group_vector_idxs: Vec<usize>,
        group_types: Vec<DataType>,
        agg_vector_idxs: Vec<Option<usize>>,
        aggregate_kinds: Vec<AggregateKind>,
        aggregate_input_types: Vec<DataType>,
    ) -> Self {
        let table = AggregateHashTable::new(group_types.clone(), aggregate_kinds.clone(), aggregate_input_types.clone());
        Self {
            child,
            chunk_idx,
            group_vector_idxs,
            agg_vector_idxs,
            aggregate_kinds,
            aggregate_input_types,
            group_types,
            result_set: ResultSet::new(),
            table,
            built: false,
            finalized: Vec::new(),
            emit_idx: 0,
        }
    }

    pub fn init_result_set(&mut self, mm: &Arc<dyn MemoryManager>) {
        self.child.init_result_set(mm);
        self.table = AggregateHashTable::new(self.group_types.clone(), self.aggregate_kinds.clone(), self.aggregate_input_types.clone());
        self.built = false;
        self.finalized.clear();
        self.emit_idx = 0;
    }

    pub fn next(&mut self) -> Result<bool> {
        if !self.built {
            self.build()?;
            self.built = true;
            self.finalized = self.table.iter_finalized().map(|(keys, vals)| (keys.to_vec(), vals)).collect();
            self.emit_idx = 0;
        }
        if self.emit_idx >= self.finalized.len() {
            return Ok(false);
        }
        let end = (self.emit_idx + VECTOR_CAPACITY).min(self.finalized.len());
        let batch = &self.finalized[self.emit_idx..end];

        let state = Rc::new(RefCell::new(SelectionState::new_unfiltered(batch.len())));
        let mut chunk = DataChunk::new(state);
        for t in &self.group_types {
            chunk.add_vector(*t);
        }
        let value_output_types: Vec<DataType> = batch
            .first()
            .map(|(_, vals)| vals.iter().map(|v| v.data_type().unwrap_or(DataType::Int64)).collect())
            .unwrap_or_default();
        for t in &value_output_types {
            chunk.add_vector(*t);
        }

        for (row, (keys, vals)) in batch.iter().enumerate() {
            for (i, k) in keys.iter().enumerate() {
                chunk.vectors[i].set_value(row, k);
            }
            let offset = self.group_types.len();
            for (i, v) in vals.iter().enumerate() {
                chunk.vectors[offset + i].set_value(row, v);
            }
        }

        self.emit_idx = end;
        self.result_set = ResultSet { chunks: vec![chunk], multiplicity: 1 };
        Ok(true)
    }

    fn build(&mut self) -> Result<()> {
        while self.child.next()? {
            let rs = self.child.result_set();
            let multiplicity = rs.multiplicity;
            let chunk = &rs.chunks[self.chunk_idx];
            for pos in chunk.state.borrow().iter_positions() {
                let group_keys: Vec<Value> = self.group_vector_idxs.iter().map(|&idx| chunk.vectors[idx].get_value(pos)).collect();
                let agg_inputs: Vec<Option<Value>> = self
                    .agg_vector_idxs
                    .iter()
                    .map(|idx| idx.map(|i| chunk.vectors[i].get_value(pos)))
                    .collect();
                self.table.append(&group_keys, &agg_inputs, multiplicity)?;
            }
        }
        Ok(())
    }

    pub fn re_init_to_rerun(&mut self) {
        self.child.re_init_to_rerun();
        self.table = AggregateHashTable::new(self.group_types.clone(), self.aggregate_kinds.clone(), self.aggregate_input_types.clone());
        self.built = false;
        self.finalized.clear();
        self.emit_idx = 0;
    }
}
