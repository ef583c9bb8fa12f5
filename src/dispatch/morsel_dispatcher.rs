//! `MorselDispatcher`: coordinates many single-source [`BfsSharedState`] instances
//! across worker threads (spec §4.G), grounded on `bfs_scheduler.cpp`'s
//! `MorselDispatcher::getBFSMorsel`/`setUpNewBFSSharedState`/`findAvailableSSSP`.
//!
//! Lock ordering (spec §4.G.3, stated verbatim in the original as "HOLD LOCKS in this
//! relative order ALWAYS"): the dispatcher's own mutex is always acquired before the
//! mutex of any individual [`BfsSharedState`] it hands out.

use crate::bfs::shared_state::{BfsSharedState, ExtendMorsel, TargetDstNodes, WorkerId, WriteMorsel, WriteOutcome};
use crate::bfs::strategies::Strategy;
use crate::dispatch::morsel_desc::MorselDesc;
use crate::types::NodeId;
use std::sync::{Arc, Mutex};

/// 1T1S (one thread fully owns one source to completion before touching another) vs
/// nTkS (up to `max_active` sources are kept in flight, and any idle worker may help
/// extend or write any one of them) — spec §4.G's two scheduling modes.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SchedulerMode {
    OneThreadOneSource,
    NThreadsKSources { max_active: usize },
}

/// Whole-dispatcher lifecycle, independent of any single source's state.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum GlobalSsspState {
    InProgress,
    InProgressAllSrcScanned,
    Complete,
}

/// What `get_bfs_morsel` hands back to a calling worker.
pub enum Assignment {
    Extend { shared: Arc<Mutex<BfsSharedState>>, slot: usize, morsel: ExtendMorsel },
    Write { shared: Arc<Mutex<BfsSharedState>>, slot: usize, morsel: WriteMorsel },
    /// Nothing is available right now, but the dispatcher isn't done — retry later.
    NoWorkToShare,
    /// Every source has been scanned and every active slot has completed.
    Complete,
}

struct DispatcherInner {
    global_state: GlobalSsspState,
    active: Vec<Option<Arc<Mutex<BfsSharedState>>>>,
    num_active: usize,
}

/// Per-query dispatcher: one `src_scan` cursor over the resident source-node table plus
/// a fixed-size pool of concurrently live [`BfsSharedState`] slots.
pub struct MorselDispatcher {
    src_scan: MorselDesc,
    src_nodes: Vec<NodeId>,
    mode: SchedulerMode,
    strategy: Strategy,
    lower_bound: u32,
    upper_bound: u32,
    target_dst_nodes: TargetDstNodes,
    inner: Mutex<DispatcherInner>,
}

impl MorselDispatcher {
    pub fn new(
        src_nodes: Vec<NodeId>,
        mode: SchedulerMode,
        strategy: Strategy,
        lower_bound: u32,
        upper_bound: u32,
        target_dst_nodes: TargetDstNodes,
    ) -> Self {
        let num_slots = match mode {
            SchedulerMode::OneThreadOneSource => 1,
            SchedulerMode::NThreadsKSources { max_active } => max_active.max(1),
        };
        let src_scan = MorselDesc::new(src_nodes.len() as u64);
        Self {
            src_scan,
            src_nodes,
            mode,
            strategy,
            lower_bound,
            upper_bound,
            target_dst_nodes,
            inner: Mutex::new(DispatcherInner {
                global_state: GlobalSsspState::InProgress,
                active: (0..num_slots).map(|_| None).collect(),
                num_active: 0,
            }),
        }
    }

    /// `getBFSMorsel`: find an active source with work, or start a new one if a slot is
    /// free and the source scan isn't exhausted. Always tries extend-work before
    /// write-work, matching the original's precedence (a source stays in
    /// `ExtendInProgress` until its frontier truly has nothing left).
    pub fn get_bfs_morsel(&self, worker: WorkerId) -> Assignment {
        let mut inner = self.inner.lock().unwrap();

        if let Some((slot, shared)) = self.find_assignable(&inner) {
            if let Some(assignment) = self.try_assign(&mut inner, slot, shared, worker) {
                return assignment;
            }
        }

        if let Some((slot, shared)) = self.start_new_source(&mut inner) {
            if let Some(assignment) = self.try_assign(&mut inner, slot, shared, worker) {
                return assignment;
            }
        }

        if inner.global_state == GlobalSsspState::Complete {
            Assignment::Complete
        } else {
            Assignment::NoWorkToShare
        }
    }

    /// Try extend-work then write-work on one slot's state. Returns `None` (meaning
    /// "try something else") when this call was the one that completed the source —
    /// the slot is retired in that case, freeing it for the next source.
    fn try_assign(
        &self,
        inner: &mut DispatcherInner,
        slot: usize,
        shared: Arc<Mutex<BfsSharedState>>,
        worker: WorkerId,
    ) -> Option<Assignment> {
        let mut guard = shared.lock().unwrap();
        if let Some(morsel) = guard.get_bfs_morsel() {
            drop(guard);
            return Some(Assignment::Extend { shared, slot, morsel });
        }
        match guard.write_morsel(worker) {
            WriteOutcome::Wrote(morsel) => {
                drop(guard);
                Some(Assignment::Write { shared, slot, morsel })
            }
            WriteOutcome::Completed => {
                drop(guard);
                self.retire_slot(inner, slot);
                None
            }
            WriteOutcome::EmptyNotComplete | WriteOutcome::NotReady => None,
        }
    }

    /// Two-tier scan for a slot with outstanding work: every occupied slot is a
    /// candidate; each is locked only long enough to decide. Mirrors `findAvailableSSSP`.
    fn find_assignable(&self, inner: &DispatcherInner) -> Option<(usize, Arc<Mutex<BfsSharedState>>)> {
        for (slot, entry) in inner.active.iter().enumerate() {
            let Some(shared) = entry else { continue };
            let has_work = {
                let guard = shared.lock().unwrap();
                guard.has_work()
            };
            if has_work {
                return Some((slot, Arc::clone(shared)));
            }
        }
        None
    }

    /// Reclaim a slot whose state reached `MorselComplete`: prefer an empty (`None`)
    /// slot, else the first slot whose occupant `is_complete()`, then install a fresh
    /// `BfsSharedState` for the next unscanned source node — matching
    /// `setUpNewBFSSharedState`'s reuse-before-allocate policy.
    fn start_new_source(&self, inner: &mut DispatcherInner) -> Option<(usize, Arc<Mutex<BfsSharedState>>)> {
        if inner.global_state == GlobalSsspState::Complete {
            return None;
        }
        let morsel = self.src_scan.get_morsel(1);
        if morsel.num_tuples == 0 {
            inner.global_state = if inner.num_active == 0 {
                GlobalSsspState::Complete
            } else {
                GlobalSsspState::InProgressAllSrcScanned
            };
            return None;
        }
        let src = self.src_nodes[morsel.start_tuple_idx as usize];

        let reuse_slot = inner
            .active
            .iter()
            .position(|e| e.is_none())
            .or_else(|| {
                inner.active.iter().position(|e| {
                    e.as_ref().is_some_and(|s| s.lock().unwrap().is_complete())
                })
            });

        let Some(slot) = reuse_slot else {
            // No slot free even though the scan handed us a source: per nTkS policy
            // this shouldn't happen since we only scan when find_assignable found
            // nothing and a retired slot frees one, but guard defensively.
            return None;
        };

        let state = BfsSharedState::new(
            src,
            self.strategy,
            self.lower_bound,
            self.upper_bound,
            self.target_dst_nodes.clone(),
            morsel.start_tuple_idx,
        );
        let shared = Arc::new(Mutex::new(state));
        if inner.active[slot].is_none() {
            inner.num_active += 1;
        }
        inner.active[slot] = Some(Arc::clone(&shared));
        Some((slot, shared))
    }

    /// Called once a worker observes `WriteOutcome::Completed` for the state in `slot`:
    /// frees the slot and, if every source has been scanned and no slot remains active,
    /// flips the dispatcher to `Complete`. Takes the dispatcher lock before touching any
    /// per-source state, preserving the documented lock order.
    fn retire_slot(&self, inner: &mut DispatcherInner, slot: usize) {
        if inner.active[slot].take().is_some() {
            inner.num_active -= 1;
        }
        if inner.num_active == 0 && inner.global_state == GlobalSsspState::InProgressAllSrcScanned {
            inner.global_state = GlobalSsspState::Complete;
        }
    }

    pub fn mode(&self) -> SchedulerMode {
        self.mode
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::NodeId;

    fn node(offset: i64) -> NodeId {
        NodeId::new(0, offset)
    }

    #[test]
    fn drains_all_sources_to_completion() {
        let sources = vec![node(0), node(1), node(2)];
        let dispatcher = MorselDispatcher::new(
            sources,
            SchedulerMode::NThreadsKSources { max_active: 2 },
            Strategy::ShortestPath { track_paths: false },
            0,
            0,
            TargetDstNodes::Unrestricted,
        );
        let worker = WorkerId(1);
        let mut guard_rail = 0;
        loop {
            guard_rail += 1;
            assert!(guard_rail < 10_000, "dispatcher never reached Complete");
            match dispatcher.get_bfs_morsel(worker) {
                Assignment::Extend { shared, .. } => {
                    let mut s = shared.lock().unwrap();
                    s.finish_bfs_morsel();
                }
                Assignment::Write { .. } => {}
                Assignment::NoWorkToShare => continue,
                Assignment::Complete => break,
            }
        }
    }
}
