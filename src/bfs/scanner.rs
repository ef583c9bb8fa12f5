//! Output scanners that turn a finished [`BfsSharedState`] into result rows (spec §4.F:
//! "a FrontierScanner walks the k'th frontier's destinations, optionally doing DFS
//! through bwd edges to emit complete paths").

use crate::bfs::shared_state::BfsSharedState;
use crate::types::{NodeId, RelId};

/// One emitted row: a destination, its path length, and (if tracked) the full path of
/// `(node, rel)` hops from source to destination, in source-to-destination order.
#[derive(Clone, Debug, PartialEq)]
pub struct PathRow {
    pub dst: NodeId,
    pub length: u32,
    pub path: Option<Vec<(NodeId, RelId)>>,
}

/// Emits one row per finished destination at or above `lower_bound`, without path
/// reconstruction — the common case for `ShortestPath`/`VariableLength` when the query
/// does not ask for the path itself.
pub fn scan_lengths_only(state: &BfsSharedState) -> Vec<PathRow> {
    state
        .finished_dst_nodes()
        .iter()
        .filter_map(|&dst| {
            state
                .path_length
                .get(&dst)
                .filter(|&&len| len >= state.lower_bound)
                .map(|&length| PathRow { dst, length, path: None })
        })
        .collect()
}

/// `DstNodeWithMultiplicityScanner`: emits a destination `multiplicity` times (spec
/// §4.F). Used by `VariableLength` when the caller wants one row per path rather than
/// one row per distinct destination.
pub fn scan_with_multiplicity(state: &BfsSharedState, multiplicity: &std::collections::HashMap<NodeId, u64>) -> Vec<PathRow> {
    let mut rows = Vec::new();
    for row in scan_lengths_only(state) {
        let times = multiplicity.get(&row.dst).copied().unwrap_or(1);
        for _ in 0..times {
            rows.push(row.clone());
        }
    }
    rows
}

/// `PathScanner`: DFS over each level's `bwd_edges` to emit complete `source -> dst`
/// paths. Self-loops are included; multi-edges at the same level produce multiple
/// distinct paths.
pub fn scan_paths(state: &BfsSharedState, bwd_edges_by_level: &[std::collections::HashMap<NodeId, Vec<(NodeId, RelId)>>]) -> Vec<PathRow> {
    let mut rows = Vec::new();
    for &dst in state.finished_dst_nodes() {
        let Some(&length) = state.path_length.get(&dst) else { continue };
        if length < state.lower_bound {
            continue;
        }
        if length == 0 {
            rows.push(PathRow { dst, length, path: Some(Vec::new()) });
            continue;
        }
        let mut stack: Vec<(NodeId, usize, Vec<(NodeId, RelId)>)> = vec![(dst, length as usize, Vec::new())];
        while let Some((node, level, mut acc)) = stack.pop() {
            if level == 0 {
                acc.reverse();
                rows.push(PathRow { dst, length, path: Some(acc) });
                continue;
            }
            let Some(edges) = bwd_edges_by_level.get(level - 1).and_then(|m| m.get(&node)) else {
                continue;
            };
            for &(prev, rel) in edges {
                let mut next_acc = acc.clone();
                next_acc.push((node, rel));
                stack.push((prev, level - 1, next_acc));
            }
        }
    }
    rows
}
