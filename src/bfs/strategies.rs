//! The closed strategy family for recursive-extend joins (spec §4.F table):
//! `ShortestPath`, `VariableLength`, `AllShortestPath`.

use crate::bfs::shared_state::BfsSharedState;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Strategy {
    ShortestPath { track_paths: bool },
    VariableLength { track_paths: bool },
    AllShortestPath,
}

impl Strategy {
    pub fn tracks_paths(self) -> bool {
        matches!(
            self,
            Strategy::ShortestPath { track_paths: true } | Strategy::VariableLength { track_paths: true }
        )
    }

    /// VariableLength and AllShortestPath both need per-node path counts; ShortestPath
    /// has no multiplicity concept (spec §4.F Added: `getBoundNodeMultiplicity` is
    /// always 0 for `ShortestPathMorsel`).
    pub fn tracks_multiplicity(self) -> bool {
        matches!(self, Strategy::VariableLength { .. } | Strategy::AllShortestPath)
    }

    /// Extra termination condition beyond "frontier empty" / "depth == upper", applied
    /// on top of the common checks in [`BfsSharedState::is_complete`].
    pub fn extra_termination(self, state: &BfsSharedState) -> bool {
        match self {
            Strategy::ShortestPath { .. } => {
                state.target_dst_nodes.num_targets().is_some_and(|n| state.num_visited_dst_nodes >= n)
            }
            Strategy::VariableLength { .. } => false,
            Strategy::AllShortestPath => {
                let all_targets_visited =
                    state.target_dst_nodes.num_targets().is_some_and(|n| state.num_visited_dst_nodes >= n);
                all_targets_visited && state.level > min_distance_lower_bound(state)
            }
        }
    }

    /// Whether this strategy may need multiple `write_morsel` passes to emit all output
    /// rows for one finished destination (ShortestPath writes once and is done; per
    /// spec §4.F Added, `hasMoreToWrite` is always false for it).
    pub fn has_more_to_write(self, _state: &BfsSharedState) -> bool {
        matches!(self, Strategy::VariableLength { .. } | Strategy::AllShortestPath)
    }
}

fn min_distance_lower_bound(state: &BfsSharedState) -> u32 {
    state.path_length.values().copied().min().unwrap_or(state.upper_bound)
}
