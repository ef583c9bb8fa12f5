//! `Intersect` (spec §4.C): the worst-case-optimal multi-way join. The probe side
//! supplies one binding for the intersect node; each build side supplies a neighbor
//! list for that binding; the operator emits the set intersection of every build's
//! neighbor list.

use crate::error::Result;
use crate::interfaces::MemoryManager;
use crate::node::Operator;
use crate::operators::select_scan::OuterSlot;
use crate::types::{DataType, NodeId};
use crate::vector::{DataChunk, ResultSet, SelectionState};
use std::cell::RefCell;
use std::collections::{HashSet, VecDeque};
use std::rc::Rc;
use std::sync::Arc;

/// Copy every vector's value at `pos` into a freshly allocated, single-row flat chunk.
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

/// One build side: a correlated subquery (typically an adjacency-list extend rooted at
/// the probe's bound node) plus where in its output the neighbor NodeID column lives.
#[derive(Clone)]
pub struct IntersectBuild {
    pub outer: OuterSlot,
    pub subquery: Box<Operator>,
    pub node_chunk_idx: usize,
    pub node_vector_idx: usize,
}

#[derive(Clone)]
pub struct Intersect {
    pub probe_child: Box<Operator>,
    pub probe_chunk_idx: usize,
    pub builds: Vec<IntersectBuild>,
    pub result_set: ResultSet,
    current_probe_row: Option<DataChunk>,
    queue: VecDeque<NodeId>,
}

impl Intersect {
    pub fn new(probe_child: Box<Operator>, probe_chunk_idx: usize, builds: Vec<IntersectBuild>) -> Self {
        Self { probe_child, probe_chunk_idx, builds, result_set: ResultSet::new(), current_probe_row: None, queue: VecDeque::new() }
    }

    pub fn init_result_set(&mut self, mm: &Arc<dyn MemoryManager>) {
        self.probe_child.init_result_set(mm);
        for build in &mut self.builds {
            build.subquery.init_result_set(mm);
        }
        self.current_probe_row = None;
        self.queue.clear();
    }

    pub fn next(&mut self) -> Result<bool> {
        loop {
            if let Some(node) = self.queue.pop_front() {
                let mut chunk = self.current_probe_row.clone().expect("queue only populated after a probe row is bound");
                let idx = chunk.add_vector(DataType::NodeID);
                chunk.vectors[idx].set_node_id(0, node);
                self.result_set = ResultSet { chunks: vec![chunk], multiplicity: 1 };
                return Ok(true);
            }

            if !self.probe_child.next()? {
                return Ok(false);
            }
            let probe_chunk = &self.probe_child.result_set().chunks[self.probe_chunk_idx];
            let pos = probe_chunk.state.borrow().position_of_curr_idx();
            let one_row = one_row_chunk(probe_chunk, pos);
            self.current_probe_row = Some(one_row.clone());

            let mut intersection: Option<HashSet<NodeId>> = None;
            for build in &mut self.builds {
                *build.outer.borrow_mut() = Some(one_row.clone());
                build.subquery.re_init_to_rerun();
                let mut set = HashSet::new();
                while build.subquery.next()? {
                    let rs = build.subquery.result_set();
                    let c = &rs.chunks[build.node_chunk_idx];
                    for p in c.state.borrow().iter_positions() {
                        set.insert(c.vectors[build.node_vector_idx].get_node_id(p));
                    }
                }
                intersection = Some(match intersection {
                    None => set,
                    Some(acc) => acc.intersection(&set).copied().collect(),
                });
            }

            let mut nodes: Vec<NodeId> = intersection.unwrap_or_default().into_iter().collect();
            nodes.sort_by_key(|n| (n.table_id, n.offset));
            self.queue = nodes.into();
        }
    }

    pub fn re_init_to_rerun(&mut self) {
        self.probe_child.re_init_to_rerun();
        self.current_probe_row = None;
        self.queue.clear();
    }
}
