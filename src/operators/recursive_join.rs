//! `RecursiveJoin` (spec §4.F, §4.G): the physical operator wiring a [`FactorizedTable`]
//! source into a shared [`MorselDispatcher`], extending each assigned frontier slice
//! over adjacency lists and emitting finished `(dst, path_length)` rows per assigned
//! write morsel.
//!
//! The dispatcher is built lazily, once, behind an `Arc<OnceLock<_>>` shared across every
//! worker's cloned copy of this operator — whichever worker calls `next()` first builds
//! it by fully draining the `FactorizedTable`'s source-row morsels; every other clone
//! observes the same instance (spec §5: "shared state lives only behind the
//! coordination points").

use crate::bfs::{BfsSharedState, ExtendMorsel, Strategy, TargetDstNodes, WorkerId, WriteMorsel};
use crate::config::VECTOR_CAPACITY;
use crate::dispatch::{Assignment, MorselDispatcher, SchedulerMode};
use crate::error::Result;
use crate::interfaces::{FactorizedTable, MemoryManager, Storage};
use crate::planner::Direction;
use crate::types::{DataType, NodeId};
use crate::vector::{DataChunk, ResultSet, SelectionState};
use std::cell::RefCell;
use std::rc::Rc;
use std::sync::{Arc, Mutex, OnceLock};

#[derive(Clone)]
pub struct RecursiveJoin {
    pub ftable: Arc<dyn FactorizedTable>,
    pub storage: Arc<dyn Storage>,
    pub rel_table_id: u64,
    pub direction: Direction,
    pub strategy: Strategy,
    pub lower_bound: u32,
    pub upper_bound: u32,
    pub target_dst_nodes: TargetDstNodes,
    pub mode: SchedulerMode,
    /// Distinct per worker clone; the engine must call [`Self::set_worker`] on each
    /// per-thread copy of the operator tree before its first `next()` (spec §4.G.3's
    /// ABA check is keyed on worker identity).
    pub worker: WorkerId,
    dispatcher: Arc<OnceLock<MorselDispatcher>>,
    pub result_set: ResultSet,
}

impl RecursiveJoin {
    /// `dispatcher` is supplied by the caller (rather than created fresh here) so that
    /// every worker's independently-constructed copy of this operator (spec §5: trees
    /// are thread-local, built per worker) shares the one `MorselDispatcher` instance —
    /// build it once with `Arc::new(OnceLock::new())` and clone the `Arc` into each
    /// worker's construction (see `execute.rs`, `materializer::materialize_recursive_join`).
    pub fn new(
        ftable: Arc<dyn FactorizedTable>,
        storage: Arc<dyn Storage>,
        rel_table_id: u64,
        direction: Direction,
        strategy: Strategy,
        lower_bound: u32,
        upper_bound: u32,
        target_dst_nodes: TargetDstNodes,
        mode: SchedulerMode,
        dispatcher: Arc<OnceLock<MorselDispatcher>>,
    ) -> Self {
        Self {
            ftable,
            storage,
            rel_table_id,
            direction,
            strategy,
            lower_bound,
            upper_bound,
            target_dst_nodes,
            mode,
            worker: WorkerId(0),
            dispatcher,
            result_set: ResultSet::new(),
        }
    }

    pub fn set_worker(&mut self, worker: WorkerId) {
        self.worker = worker;
    }

    pub fn init_result_set(&mut self, _mm: &Arc<dyn MemoryManager>) {
        self.result_set = ResultSet::new();
    }

    fn build_dispatcher(&self) -> MorselDispatcher {
        let mut src_nodes = Vec::new();
        loop {
            let morsel = self.ftable.claim_morsel(VECTOR_CAPACITY as u64);
            if morsel.num_tuples == 0 {
                break;
            }
            for i in 0..morsel.num_tuples {
                src_nodes.push(self.ftable.src_node_at(morsel.start_tuple_idx + i));
            }
        }
        MorselDispatcher::new(src_nodes, self.mode, self.strategy, self.lower_bound, self.upper_bound, self.target_dst_nodes.clone())
    }

    pub fn next(&mut self) -> Result<bool> {
        let dispatcher = self.dispatcher.get_or_init(|| self.build_dispatcher());
        loop {
            match dispatcher.get_bfs_morsel(self.worker) {
                Assignment::Extend { shared, slot: _, morsel } => {
                    self.do_extend(&shared, morsel);
                    shared.lock().unwrap().finish_bfs_morsel();
                }
                Assignment::Write { shared, slot: _, morsel } => {
                    let chunk = self.build_output_chunk(&shared, morsel);
                    if chunk.state.borrow().selected_size == 0 {
                        continue;
                    }
                    self.result_set = ResultSet { chunks: vec![chunk], multiplicity: 1 };
                    return Ok(true);
                }
                Assignment::NoWorkToShare => continue,
                Assignment::Complete => return Ok(false),
            }
        }
    }

    /// Read adjacency lists for every frontier node in `morsel` (outside the state's
    /// lock: storage has no need of it) then fold every discovery into the shared state
    /// under one lock acquisition.
    fn do_extend(&self, shared: &Arc<Mutex<BfsSharedState>>, morsel: ExtendMorsel) {
        let frontier_slice = {
            let guard = shared.lock().unwrap();
            guard.current_frontier.nodes[morsel.start..morsel.end].to_vec()
        };
        let mut discoveries = Vec::new();
        for src in frontier_slice {
            for (neighbor, rel) in self.storage.read_adj_list(self.direction, self.rel_table_id, src) {
                discoveries.push((src, neighbor, rel));
            }
        }
        let mut guard = shared.lock().unwrap();
        for (src, neighbor, rel) in discoveries {
            guard.mark_visited(neighbor, Some((src, rel)));
        }
    }

    fn build_output_chunk(&self, shared: &Arc<Mutex<BfsSharedState>>, morsel: WriteMorsel) -> DataChunk {
        let guard = shared.lock().unwrap();
        let lower_bound = guard.lower_bound;
        let rows: Vec<(NodeId, u32)> = guard.finished_dst_nodes()[morsel.start..morsel.end]
            .iter()
            .filter_map(|&dst| guard.path_length.get(&dst).filter(|&&len| len >= lower_bound).map(|&len| (dst, len)))
            .collect();
        drop(guard);

        let state = Rc::new(RefCell::new(SelectionState::new_unfiltered(rows.len())));
        let mut chunk = DataChunk::new(state);
        let dst_idx = chunk.add_vector(DataType::NodeID);
        let len_idx = chunk.add_vector(DataType::Int64);
        for (i, (dst, len)) in rows.iter().enumerate() {
            chunk.vectors[dst_idx].set_node_id(i, *dst);
            chunk.vectors[len_idx].set_int64(i, *len as i64);
        }
        chunk
    }

    pub fn re_init_to_rerun(&mut self) {
        self.result_set = ResultSet::new();
    }
}
