//! Per-source BFS shared state (spec §3.6), grounded on
//! `original_source/.../bfs_state.h`'s `BFSSharedState`/`BaseBFSMorsel` layout and the
//! scheduling contracts exercised by `bfs_scheduler.cpp` (spec §4.G).

use crate::bfs::frontier::Frontier;
use crate::bfs::strategies::Strategy;
use crate::config::VECTOR_CAPACITY;
use crate::types::NodeId;
use std::collections::{HashMap, HashSet};

/// Visit status of one node within a single source's BFS (spec §3.6 Added). The `New`
/// suffix marks a node discovered at the *current* level, not yet folded into the
/// stable visited set until the level finishes; the `Dst` variants distinguish
/// destination (target) nodes for early-exit bookkeeping.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum VisitedState {
    NotVisited,
    Visited,
    VisitedNew,
    NotVisitedDst,
    VisitedDst,
    VisitedDstNew,
}

impl VisitedState {
    pub fn is_visited(self) -> bool {
        matches!(self, VisitedState::Visited | VisitedState::VisitedNew | VisitedState::VisitedDst | VisitedState::VisitedDstNew)
    }

    pub fn is_dst(self) -> bool {
        matches!(self, VisitedState::NotVisitedDst | VisitedState::VisitedDst | VisitedState::VisitedDstNew)
    }
}

/// SSSP-local lifecycle (spec §3.6): `ExtendInProgress -> PathLengthWriteInProgress ->
/// MorselComplete`. `NoWorkToShare` is transient — returned to callers but never stored
/// on the shared state itself.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SsspLocalState {
    ExtendInProgress,
    PathLengthWriteInProgress,
    MorselComplete,
}

/// A semi-mask filter over destination nodes: either "every node is a valid
/// destination" or an explicit restricted set (spec §3.6 Added, grounded on
/// `TargetDstNodes`).
#[derive(Clone, Debug)]
pub enum TargetDstNodes {
    Unrestricted,
    Restricted(HashSet<NodeId>),
}

impl TargetDstNodes {
    pub fn contains(&self, node: NodeId) -> bool {
        match self {
            TargetDstNodes::Unrestricted => true,
            TargetDstNodes::Restricted(set) => set.contains(&node),
        }
    }

    pub fn num_targets(&self) -> Option<usize> {
        match self {
            TargetDstNodes::Unrestricted => None,
            TargetDstNodes::Restricted(set) => Some(set.len()),
        }
    }
}

/// An opaque worker identity, supplied by the caller (the engine's worker pool), used
/// only to check the ABA-prevention condition in [`BfsSharedState::can_complete`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct WorkerId(pub u64);

/// A contiguous range of frontier-node offsets handed to one worker as one unit of
/// extend work.
#[derive(Clone, Copy, Debug)]
pub struct ExtendMorsel {
    pub start: usize,
    pub end: usize,
}

/// A contiguous range of destination-array offsets handed to one worker to write path
/// lengths for.
#[derive(Clone, Copy, Debug)]
pub struct WriteMorsel {
    pub start: usize,
    pub end: usize,
}

/// The three-way result of [`BfsSharedState::write_morsel`], mirroring
/// `writeDstNodeIDAndPathLength`'s `-1`/`0`/`>0` contract: rows to write, nothing left
/// but someone else owns completing it, or (exactly once, for exactly one caller) this
/// call was the one that transitioned the state to `MorselComplete`. The dispatcher acts
/// on `Completed` to decrement its active-source count under its own lock, taken before
/// any per-source lock (spec §4.G.3 lock-ordering rule).
#[derive(Clone, Copy, Debug)]
pub enum WriteOutcome {
    Wrote(WriteMorsel),
    EmptyNotComplete,
    Completed,
    /// Not yet in `PathLengthWriteInProgress` — still extending.
    NotReady,
}

/// Per-source BFS bookkeeping, mutated by whichever worker currently holds the morsel
/// dispatcher's lock for this source (spec §5: this struct's own mutex, guarded in turn
/// by the dispatcher's lock-ordering rule — enforced by the dispatcher, not by this
/// struct, since a single-threaded `BfsSharedState` has no need to lock itself).
pub struct BfsSharedState {
    pub src: NodeId,
    pub strategy: Strategy,
    pub lower_bound: u32,
    pub upper_bound: u32,
    pub target_dst_nodes: TargetDstNodes,

    pub visited: HashMap<NodeId, VisitedState>,
    pub path_length: HashMap<NodeId, u32>,

    pub current_frontier: Frontier,
    pub next_frontier: Frontier,
    pub level: u32,
    pub num_visited_dst_nodes: usize,

    pub ssp_local_state: SsspLocalState,
    pub num_threads_active: u32,
    /// Workers that have previously written this state's path lengths; membership
    /// here is half of the ABA-prevention check in [`Self::can_complete`].
    pub path_length_thread_writers: HashSet<WorkerId>,

    /// Scan cursor into `current_frontier.nodes` for handing out [`ExtendMorsel`]s.
    next_extend_idx: usize,
    /// Scan cursor into the finished frontier's node list for handing out
    /// [`WriteMorsel`]s once extension for this source is done.
    next_write_idx: usize,
    finished_dst_nodes: Vec<NodeId>,

    pub input_ftable_tuple_idx: u64,
}

impl BfsSharedState {
    pub fn new(
        src: NodeId,
        strategy: Strategy,
        lower_bound: u32,
        upper_bound: u32,
        target_dst_nodes: TargetDstNodes,
        input_ftable_tuple_idx: u64,
    ) -> Self {
        let track_mult = strategy.tracks_multiplicity();
        let track_paths = strategy.tracks_paths();
        let mut state = Self {
            src,
            strategy,
            lower_bound,
            upper_bound,
            target_dst_nodes,
            visited: HashMap::new(),
            path_length: HashMap::new(),
            current_frontier: Frontier::new(track_mult, track_paths),
            next_frontier: Frontier::new(track_mult, track_paths),
            level: 0,
            num_visited_dst_nodes: 0,
            ssp_local_state: SsspLocalState::ExtendInProgress,
            num_threads_active: 0,
            path_length_thread_writers: HashSet::new(),
            next_extend_idx: 0,
            next_write_idx: 0,
            finished_dst_nodes: Vec::new(),
            input_ftable_tuple_idx,
        };
        state.mark_src();
        state.maybe_finalize();
        state
    }

    /// Reset this (possibly previously-used) shared state for a new source, matching
    /// `MorselDispatcher::setUpNewBFSSharedState`'s reuse path: callers must hold
    /// exclusive access (the dispatcher does, under its lock) while calling this.
    pub fn reset(
        &mut self,
        src: NodeId,
        strategy: Strategy,
        lower_bound: u32,
        upper_bound: u32,
        target_dst_nodes: TargetDstNodes,
        input_ftable_tuple_idx: u64,
    ) {
        let track_mult = strategy.tracks_multiplicity();
        let track_paths = strategy.tracks_paths();
        self.src = src;
        self.strategy = strategy;
        self.lower_bound = lower_bound;
        self.upper_bound = upper_bound;
        self.target_dst_nodes = target_dst_nodes;
        self.visited.clear();
        self.path_length.clear();
        self.current_frontier = Frontier::new(track_mult, track_paths);
        self.next_frontier = Frontier::new(track_mult, track_paths);
        self.level = 0;
        self.num_visited_dst_nodes = 0;
        self.ssp_local_state = SsspLocalState::ExtendInProgress;
        self.num_threads_active = 0;
        self.path_length_thread_writers.clear();
        self.next_extend_idx = 0;
        self.next_write_idx = 0;
        self.finished_dst_nodes.clear();
        self.input_ftable_tuple_idx = input_ftable_tuple_idx;
        self.mark_src();
        self.maybe_finalize();
    }

    pub fn mark_src(&mut self) {
        let is_dst = self.target_dst_nodes.contains(self.src);
        self.visited.insert(self.src, if is_dst { VisitedState::VisitedDst } else { VisitedState::Visited });
        if is_dst {
            self.num_visited_dst_nodes += 1;
        }
        if self.lower_bound == 0 && is_dst {
            self.path_length.insert(self.src, 0);
        }
        self.current_frontier.nodes.push(self.src);
    }

    /// Mark `node` reached at the current level via `via`, folding the discovery into
    /// `next_frontier` under this state's strategy. Returns `true` if this is a new
    /// discovery (the caller should continue extending through it at the next level).
    pub fn mark_visited(&mut self, node: NodeId, via: Option<(NodeId, crate::types::RelId)>) -> bool {
        let already = self.visited.get(&node).map(|s| s.is_visited()).unwrap_or(false);
        if already && !self.strategy.tracks_multiplicity() && !self.strategy.tracks_paths() {
            return false;
        }
        let is_dst = self.target_dst_nodes.contains(node);
        if !already {
            self.visited.insert(
                node,
                if is_dst { VisitedState::VisitedDstNew } else { VisitedState::VisitedNew },
            );
            if is_dst {
                self.num_visited_dst_nodes += 1;
            }
            let length = self.level + 1;
            if length >= self.lower_bound && is_dst {
                self.path_length.entry(node).or_insert(length);
            }
        }
        self.next_frontier.discover(node, via);
        !already
    }

    /// Termination predicate per the active strategy (spec §4.F's table).
    pub fn is_complete(&self) -> bool {
        if self.ssp_local_state == SsspLocalState::MorselComplete {
            return true;
        }
        if self.current_frontier.is_empty() || self.level >= self.upper_bound {
            return true;
        }
        self.strategy.extra_termination(self)
    }

    /// Whether the dispatcher should keep offering this slot to workers: anything short
    /// of `MorselComplete`, since a state stuck at "extension done, nothing left to
    /// extend" still needs a `write_morsel` call to either hand out rows or (for the one
    /// eligible caller) perform the completion transition.
    pub fn has_work(&self) -> bool {
        self.ssp_local_state != SsspLocalState::MorselComplete
    }

    /// `get_bfs_morsel`: carve an extend morsel off the current frontier (spec §4.G.1).
    /// Returns `None` ("NoWorkToShare") if the state is complete or mid path-length-write.
    pub fn get_bfs_morsel(&mut self) -> Option<ExtendMorsel> {
        if self.is_complete() || self.ssp_local_state == SsspLocalState::PathLengthWriteInProgress {
            return None;
        }
        let remaining = self.current_frontier.nodes.len() - self.next_extend_idx;
        if remaining == 0 {
            return None;
        }
        let size = remaining.min(VECTOR_CAPACITY);
        let start = self.next_extend_idx;
        let end = start + size;
        self.next_extend_idx = end;
        self.num_threads_active += 1;
        Some(ExtendMorsel { start, end })
    }

    /// `finish_bfs_morsel`: a worker reports its extend morsel done. If this was the
    /// last active worker for the level, advance to the next level or transition into
    /// path-length-write mode (spec §4.G.2).
    pub fn finish_bfs_morsel(&mut self) {
        debug_assert!(self.num_threads_active > 0);
        self.num_threads_active -= 1;
        if self.num_threads_active == 0 && self.next_extend_idx >= self.current_frontier.nodes.len() {
            self.advance_level();
        }
    }

    fn advance_level(&mut self) {
        self.level += 1;
        // Fold this level's "New" visited markers into the stable state.
        for state in self.visited.values_mut() {
            *state = match state {
                VisitedState::VisitedNew => VisitedState::Visited,
                VisitedState::VisitedDstNew => VisitedState::VisitedDst,
                other => *other,
            };
        }
        self.next_frontier.sort();
        std::mem::swap(&mut self.current_frontier, &mut self.next_frontier);
        self.next_frontier.clear();
        self.next_extend_idx = 0;

        self.maybe_finalize();
    }

    /// If extension has reached a terminal condition (possibly immediately, e.g.
    /// `upper_bound == 0`, before any morsel was ever handed out), snapshot the finished
    /// destination set and move into path-length-write mode. Idempotent and a no-op once
    /// already past `ExtendInProgress`.
    fn maybe_finalize(&mut self) {
        if self.ssp_local_state == SsspLocalState::ExtendInProgress && self.is_complete() {
            self.finished_dst_nodes = self.visited.iter().filter(|(_, s)| s.is_dst()).map(|(n, _)| *n).collect();
            self.finished_dst_nodes.sort_by_key(|n| (n.table_id, n.offset));
            self.ssp_local_state = SsspLocalState::PathLengthWriteInProgress;
        }
    }

    /// `write_morsel`: carve a range of the finished destination array into a writer.
    /// On the worker that empties the range, mark `MorselComplete` only if both (a) the
    /// worker previously wrote this state and (b) no other worker is still active —
    /// the two-part check that prevents the ABA completion bug (spec §4.G.3). Mirrors
    /// `writeDstNodeIDAndPathLength`'s three-way return contract.
    pub fn write_morsel(&mut self, worker: WorkerId) -> WriteOutcome {
        if self.ssp_local_state != SsspLocalState::PathLengthWriteInProgress {
            return WriteOutcome::NotReady;
        }
        let remaining = self.finished_dst_nodes.len() - self.next_write_idx;
        if remaining == 0 {
            if self.can_complete(worker) {
                self.ssp_local_state = SsspLocalState::MorselComplete;
                return WriteOutcome::Completed;
            }
            return WriteOutcome::EmptyNotComplete;
        }
        let size = remaining.min(VECTOR_CAPACITY);
        let start = self.next_write_idx;
        let end = start + size;
        self.next_write_idx = end;
        self.path_length_thread_writers.insert(worker);
        WriteOutcome::Wrote(WriteMorsel { start, end })
    }

    pub fn finished_dst_nodes(&self) -> &[NodeId] {
        &self.finished_dst_nodes
    }

    /// The two-part ABA-prevention check: the thread must be a prior path-length
    /// writer of *this* state, and no thread may currently be active on it.
    fn can_complete(&self, worker: WorkerId) -> bool {
        self.path_length_thread_writers.contains(&worker) && self.num_threads_active == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::RelId;

    fn node(offset: u64) -> NodeId {
        NodeId::new(1, offset)
    }

    #[test]
    fn shortest_path_over_a_chain_finds_target_at_level_two() {
        let mut target = HashSet::new();
        target.insert(node(2));
        let mut state = BfsSharedState::new(node(0), Strategy::ShortestPath { track_paths: false }, 0, 2, TargetDstNodes::Restricted(target), 0);
        assert!(!state.is_complete());

        let morsel = state.get_bfs_morsel().expect("level 0 has work");
        assert_eq!((morsel.start, morsel.end), (0, 1));
        assert!(state.mark_visited(node(1), Some((node(0), RelId::new(99, 0)))));
        state.finish_bfs_morsel();
        assert_eq!(state.level, 1);

        let morsel = state.get_bfs_morsel().expect("level 1 has work");
        assert_eq!((morsel.start, morsel.end), (0, 1));
        assert!(state.mark_visited(node(2), Some((node(1), RelId::new(99, 1)))));
        state.finish_bfs_morsel();

        assert_eq!(state.level, 2);
        assert!(state.is_complete());
        assert_eq!(state.path_length.get(&node(2)), Some(&2));
        assert_eq!(state.finished_dst_nodes(), &[node(2)]);
    }

    #[test]
    fn write_morsel_completion_requires_the_prior_writer_to_ask_again() {
        let mut target = HashSet::new();
        target.insert(node(0));
        // upper_bound 0 with the source itself a target finalizes immediately in `new`.
        let mut state = BfsSharedState::new(node(0), Strategy::ShortestPath { track_paths: false }, 0, 0, TargetDstNodes::Restricted(target), 0);
        assert_eq!(state.finished_dst_nodes(), &[node(0)]);

        let worker_a = WorkerId(1);
        let worker_b = WorkerId(2);

        match state.write_morsel(worker_a) {
            WriteOutcome::Wrote(m) => assert_eq!((m.start, m.end), (0, 1)),
            other => panic!("expected Wrote, got {other:?}"),
        }
        // A worker that never wrote this state can't be the one to complete it.
        match state.write_morsel(worker_b) {
            WriteOutcome::EmptyNotComplete => {}
            other => panic!("expected EmptyNotComplete, got {other:?}"),
        }
        match state.write_morsel(worker_a) {
            WriteOutcome::Completed => {}
            other => panic!("expected Completed, got {other:?}"),
        }
    }
}
