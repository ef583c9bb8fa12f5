//! A BFS frontier: the set of nodes reached at one level, plus the optional per-node
//! bookkeeping the active [`Strategy`](crate::bfs::Strategy) needs to carry forward
//! (spec §3.6).

use crate::types::{NodeId, RelId};
use std::collections::HashMap;

/// One level's worth of reached nodes.
#[derive(Clone, Debug, Default)]
pub struct Frontier {
    pub nodes: Vec<NodeId>,
    /// Per-node path multiplicity, tracked only under [`Strategy::VariableLength`] and
    /// [`Strategy::AllShortestPath`] (spec §3.6's `multiplicityAndLevel` list,
    /// represented here as a map since the touched offset range is sparse).
    pub multiplicity: Option<HashMap<NodeId, u64>>,
    /// Reverse-edge adjacency for path reconstruction: `node -> [(prev_node, rel)]`.
    /// Present only when the query tracks full paths.
    pub bwd_edges: Option<HashMap<NodeId, Vec<(NodeId, RelId)>>>,
}

impl Frontier {
    pub fn new(track_multiplicity: bool, track_paths: bool) -> Self {
        Self {
            nodes: Vec::new(),
            multiplicity: track_multiplicity.then(HashMap::new),
            bwd_edges: track_paths.then(HashMap::new),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn clear(&mut self) {
        self.nodes.clear();
        if let Some(m) = &mut self.multiplicity {
            m.clear();
        }
        if let Some(b) = &mut self.bwd_edges {
            b.clear();
        }
    }

    /// Record a newly discovered node at this level, folding in multiplicity/backward
    /// edge bookkeeping if this frontier tracks them. Returns `true` if this is the
    /// first time `node` has been added to *this* frontier (callers use this to avoid
    /// pushing the same node onto `nodes` twice within one level).
    pub fn discover(&mut self, node: NodeId, via: Option<(NodeId, RelId)>) -> bool {
        let first_time = match &self.bwd_edges {
            Some(edges) => !edges.contains_key(&node),
            None => !self.nodes.contains(&node),
        };
        if first_time {
            self.nodes.push(node);
        }
        if let Some(mult) = &mut self.multiplicity {
            *mult.entry(node).or_insert(0) += 1;
        }
        if let (Some(edges), Some((prev, rel))) = (&mut self.bwd_edges, via) {
            edges.entry(node).or_default().push((prev, rel));
        }
        first_time
    }

    /// Sort the frontier's node list by offset so scanning yields a deterministic order
    /// (`BaseBFSMorsel::moveNextLevelAsCurrentLevel` sorts before swapping — spec §4.F
    /// Added).
    pub fn sort(&mut self) {
        self.nodes.sort_by_key(|n| (n.table_id, n.offset));
    }
}
