//! `HashJoin` (spec §4.C): two-phase operator. The build phase drains the right child
//! into a hash table keyed on the join column; the probe phase drains the left child,
//! emitting matching row pairs.
//!
//! **[Added simplification, see `DESIGN.md`]** Rows are materialized into scalar
//! `Vec<Value>` tuples rather than kept as vector positions, since build-side rows must
//! outlive the batch that produced them (the child's own chunk is reused/overwritten on
//! its next `next()` call). This trades per-row allocation for not having to pin the
//! build child's buffers for the probe phase's whole lifetime.

use crate::config::VECTOR_CAPACITY;
use crate::error::Result;
use crate::interfaces::MemoryManager;
use crate::node::Operator;
use crate::types::{DataType, Value};
use crate::vector::{DataChunk, ResultSet, SelectionState};
use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;
use std::sync::Arc;

/// Sideways-information-passing policy (spec §4.C hint), chosen by the materializer
/// from the probe/build cardinality ratio against [`crate::config::SIP_RATIO`]. Recorded
/// here for tracing; this in-memory operator has no external I/O to prune, so it does
/// not otherwise change probe behavior (documented as a simplification in `DESIGN.md`).
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SipPolicy {
    AllowBoth,
    ProhibitProbeToBuild,
    ProhibitBuildToProbe,
}

fn fnv1a(bytes: &[u8]) -> u64 {
    let mut hash: u64 = 0xcbf29ce484222325;
    for &b in bytes {
        hash ^= b as u64;
        hash = hash.wrapping_mul(0x100000001b3);
    }
    hash
}

fn hash_value(v: &Value) -> u64 {
    use crate::ops::hash::{hash_node_id, hash_rel_id};
    match v {
        Value::Null => 0,
        Value::Bool(b) => *b as u64,
        Value::Int64(i) => *i as u64,
        Value::Double(d) => d.to_bits(),
        Value::String(s) => fnv1a(s.as_bytes()),
        Value::NodeId(id) => hash_node_id(*id),
        Value::RelId(id) => hash_rel_id(*id),
        Value::Date(d) => d.0 as u64,
        Value::Timestamp(t) => t.0 as u64,
        Value::Interval(i) => (i.months as u64) ^ (i.days as u64) ^ (i.micros as u64),
    }
}

#[derive(Clone)]
pub struct HashJoin {
    pub probe_child: Box<Operator>,
    pub build_child: Box<Operator>,
    pub probe_chunk_idx: usize,
    pub probe_key_idx: usize,
    pub build_chunk_idx: usize,
    pub build_key_idx: usize,
    pub probe_vector_types: Vec<DataType>,
    pub build_vector_types: Vec<DataType>,
    pub sip: SipPolicy,
    pub result_set: ResultSet,
    table: HashMap<u64, Vec<(Value, Vec<Value>)>>,
    built: bool,
    pending_matches: Vec<(Vec<Value>, Vec<Value>)>,
}

impl HashJoin {
    pub fn new(
        probe_child: Box<Operator>,
        build_child: Box<Operator>,
        probe_chunk_idx: usize,
        probe_key_idx: usize,
        build_chunk_idx: usize,
        build_key_idx: usize,
        probe_vector_types: Vec<DataType>,
        build_vector_types: Vec<DataType>,
        sip: SipPolicy,
    ) -> Self {
        Self {
            probe_child,
            build_child,
            probe_chunk_idx,
            probe_key_idx,
            build_chunk_idx,
            build_key_idx,
            probe_vector_types,
            build_vector_types,
            sip,
            result_set: ResultSet::new(),
            table: HashMap::new(),
            built: false,
            pending_matches: Vec::new(),
        }
    }

    pub fn init_result_set(&mut self, mm: &Arc<dyn MemoryManager>) {
        self.probe_child.init_result_set(mm);
        self.build_child.init_result_set(mm);
        self.table.clear();
        self.built = false;
        self.pending_matches.clear();
    }

    fn build(&mut self) -> Result<()> {
        while self.build_child.next()? {
            let rs = self.build_child.result_set();
            let chunk = &rs.chunks[self.build_chunk_idx];
            for pos in chunk.state.borrow().iter_positions() {
                let key = chunk.vectors[self.build_key_idx].get_value(pos);
                if key.is_null() {
                    continue;
                }
                let row: Vec<Value> = chunk.vectors.iter().map(|v| v.get_value(pos)).collect();
                self.table.entry(hash_value(&key)).or_default().push((key, row));
            }
        }
        Ok(())
    }

    /// Pull probe batches until at least one match is buffered, or the probe side is
    /// exhausted.
    fn fill_pending(&mut self) -> Result<bool> {
        while self.pending_matches.is_empty() {
            if !self.probe_child.next()? {
                return Ok(false);
            }
            let rs = self.probe_child.result_set();
            let chunk = &rs.chunks[self.probe_chunk_idx];
            for pos in chunk.state.borrow().iter_positions() {
                let key = chunk.vectors[self.probe_key_idx].get_value(pos);
                if key.is_null() {
                    continue;
                }
                let Some(bucket) = self.table.get(&hash_value(&key)) else { continue };
                let probe_row: Vec<Value> = chunk.vectors.iter().map(|v| v.get_value(pos)).collect();
                for (k, build_row) in bucket {
                    if *k == key {
                        self.pending_matches.push((probe_row.clone(), build_row.clone()));
                    }
                }
            }
        }
        Ok(true)
    }

    pub fn next(&mut self) -> Result<bool> {
        if !self.built {
            self.build()?;
            self.built = true;
        }
        if self.pending_matches.is_empty() && !self.fill_pending()? {
            return Ok(false);
        }

        let n = self.pending_matches.len().min(VECTOR_CAPACITY);
        let batch: Vec<(Vec<Value>, Vec<Value>)> = self.pending_matches.drain(..n).collect();

        let state = Rc::new(RefCell::new(SelectionState::new_unfiltered(batch.len())));
        let mut chunk = DataChunk::new(state);
        for t in &self.probe_vector_types {
            chunk.add_vector(*t);
        }
        for t in &self.build_vector_types {
            chunk.add_vector(*t);
        }
        let probe_width = self.probe_vector_types.len();
        for (row_idx, (probe_row, build_row)) in batch.iter().enumerate() {
            for (i, v) in probe_row.iter().enumerate() {
                chunk.vectors[i].set_value(row_idx, v);
            }
            for (i, v) in build_row.iter().enumerate() {
                chunk.vectors[probe_width + i].set_value(row_idx, v);
            }
        }

        self.result_set = ResultSet { chunks: vec![chunk], multiplicity: 1 };
        Ok(true)
    }

    pub fn re_init_to_rerun(&mut self) {
        self.probe_child.re_init_to_rerun();
        self.pending_matches.clear();
    }
}
