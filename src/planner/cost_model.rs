//! Cost formulas over already-estimated cardinalities (spec §4.I). Pure functions, no
//! state — the DP solver calls these while building each level's candidate trees.

use crate::config::BUILD_PENALTY;

/// `extend_cost(child) = child.cost + child.card`.
pub fn extend_cost(child_cost: u64, child_card: u64) -> u64 {
    child_cost + child_card
}

/// `recursive_extend_cost(upper, rate, child) = BUILD_PENALTY * child.card * rate * upper`.
pub fn recursive_extend_cost(upper_bound: u32, rate: f64, child_card: u64) -> u64 {
    (BUILD_PENALTY * child_card as f64 * rate * upper_bound as f64).max(1.0).round() as u64
}

/// `hash_join_cost(keys, probe, build) = probe.cost + build.cost + probe.card +
/// BUILD_PENALTY * build_flat_card`.
pub fn hash_join_cost(probe_cost: u64, build_cost: u64, probe_card: u64, build_flat_card: u64) -> u64 {
    probe_cost + build_cost + probe_card + (BUILD_PENALTY * build_flat_card as f64).round() as u64
}

/// `mark_join_cost = hash_join_cost` (spec §4.I: semi-join/mark-join variants of a hash
/// join share the same cost formula as the full hash join).
pub fn mark_join_cost(probe_cost: u64, build_cost: u64, probe_card: u64, build_flat_card: u64) -> u64 {
    hash_join_cost(probe_cost, build_cost, probe_card, build_flat_card)
}

/// `intersect_cost(probe, builds) = probe.cost + probe.card + sum(build.cost)`.
pub fn intersect_cost(probe_cost: u64, probe_card: u64, build_costs: &[u64]) -> u64 {
    probe_cost + probe_card + build_costs.iter().sum::<u64>()
}
