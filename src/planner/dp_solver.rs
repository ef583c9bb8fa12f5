//! Cost-based dynamic-programming join-order solver (spec §4.H), grounded on
//! `join_order_solver.h`'s `JoinOrderSolver` (`dpTable`, `cardinalityEstimator`,
//! `planLevel`/`planBaseScans`/`planBinaryJoin`/`planWorstCaseOptimalJoin`/
//! `tryPlanIndexNestedLoopJoin`/`planHashJoin`).

use crate::error::{Error, Result};
use crate::planner::cardinality::{CardinalityEstimator, Statistics};
use crate::planner::cost_model::{hash_join_cost, intersect_cost};
use crate::planner::join_tree::{Direction, JoinTree, JoinTreeNode, Predicate, PropertyExprCollection, QueryGraph};
use std::collections::{HashMap, HashSet};

/// A bitmask over query-graph slots (node indices `0..nodes.len()`, then rel indices
/// `nodes.len()..nodes.len()+rels.len()`), used as the DP table's key (spec §4.H Added).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct SubqueryGraph(pub u64);

impl SubqueryGraph {
    pub const fn empty() -> Self {
        Self(0)
    }

    pub fn single(slot: usize) -> Self {
        Self(1u64 << slot)
    }

    pub fn contains(self, slot: usize) -> bool {
        self.0 & (1u64 << slot) != 0
    }

    pub fn union(self, other: Self) -> Self {
        Self(self.0 | other.0)
    }

    pub fn intersects(self, other: Self) -> bool {
        self.0 & other.0 != 0
    }

    pub fn size(self) -> u32 {
        self.0.count_ones()
    }

    pub fn slots(self, total: usize) -> impl Iterator<Item = usize> {
        (0..total).filter(move |&i| self.contains(i))
    }
}

/// Best plan found so far for each subgraph (spec §3.5/§4.H: `DPTable`).
#[derive(Default)]
pub struct DpTable {
    best: HashMap<u64, JoinTree>,
}

impl DpTable {
    fn get(&self, key: SubqueryGraph) -> Option<&JoinTree> {
        self.best.get(&key.0)
    }

    /// Insert `candidate` at `key` only if it beats the current best. Ties keep the
    /// first-inserted tree (spec §4.H: "on equal cost, retain the first-inserted tree").
    fn offer(&mut self, key: SubqueryGraph, candidate: JoinTree) {
        match self.best.get(&key.0) {
            Some(existing) if existing.cost <= candidate.cost => {}
            _ => {
                self.best.insert(key.0, candidate);
            }
        }
    }
}

/// `connecting_nodes`: the set of query-node indices a subgraph touches, whether through
/// a directly-included `NodeScan` slot or as the endpoint of an included rel (spec §4.H:
/// "Compute the join-node set").
fn connecting_nodes(qg: &QueryGraph, sg: SubqueryGraph) -> HashSet<usize> {
    let mut nodes = HashSet::new();
    for slot in sg.slots(qg.num_slots()) {
        if slot < qg.nodes.len() {
            nodes.insert(slot);
        } else {
            let rel_index = slot - qg.nodes.len();
            let (src, dst) = qg.rel_endpoints(rel_index);
            nodes.insert(src);
            nodes.insert(dst);
        }
    }
    nodes
}

fn rel_slot(qg: &QueryGraph, rel_index: usize) -> usize {
    qg.nodes.len() + rel_index
}

pub struct JoinOrderSolver<'a> {
    query_graph: &'a QueryGraph,
    predicates: &'a [Predicate],
    property_collection: &'a PropertyExprCollection,
    estimator: CardinalityEstimator<'a>,
    dp_table: DpTable,
}

impl<'a> JoinOrderSolver<'a> {
    /// Plans a plain subquery graph. Correlated-subquery join trees (spec §4.H's
    /// `ExprScan` over a `CorrelatedContext`) are assembled by hand rather than planned
    /// here — see `Materializer::materialize_correlated` — since a bound correlated
    /// expression carries no query-node affinity for this solver's subgraph-connectivity
    /// check (`connecting_nodes`) to key off of.
    pub fn new(
        query_graph: &'a QueryGraph,
        predicates: &'a [Predicate],
        property_collection: &'a PropertyExprCollection,
        statistics: &'a Statistics,
    ) -> Self {
        Self {
            query_graph,
            predicates,
            property_collection,
            estimator: CardinalityEstimator::new(statistics),
            dp_table: DpTable::default(),
        }
    }

    /// `plan(query_graph, predicates, property_collection, statistics) -> JoinTree`
    /// (spec §6). Errors only when the graph has no slots to plan at all.
    pub fn solve(mut self) -> Result<JoinTree> {
        let num_slots = self.query_graph.num_slots();
        if num_slots == 0 {
            return Err(Error::ExecutionInvariant("join-order solver: empty query graph"));
        }
        if num_slots > 63 {
            return Err(Error::ExecutionInvariant("join-order solver: query graph exceeds bitmask width"));
        }

        self.plan_base_scans();

        // Every level is enumerated exactly; the only cutoff is the `num_slots > 63`
        // bitmask-width guard above. See `MAX_LEVEL_TO_PLAN_EXACTLY`'s doc comment
        // (config.rs) for why there is no separate greedy-fallback bound here.
        for level in 2..=num_slots {
            self.plan_level(level, num_slots);
        }

        let top = SubqueryGraph((1u64 << num_slots) - 1);
        self.dp_table
            .get(top)
            .cloned()
            .ok_or(Error::ExecutionInvariant("join-order solver: no plan found for full query graph"))
    }

    /// Level 1: a leaf per node and per rel, each carrying its own filter selectivity.
    fn plan_base_scans(&mut self) {
        for node in &self.query_graph.nodes {
            let node_preds: Vec<&Predicate> = self.predicates.iter().filter(|p| p.on_node == Some(node.index)).collect();
            let base_card = self.estimator.estimate_scan_node(&node.table_ids);
            let card = node_preds.iter().fold(base_card, |c, p| self.estimator.estimate_filter(c, p));
            let properties = self.property_collection.node_properties(node.index).to_vec();
            let tree = JoinTree {
                root: JoinTreeNode::NodeScan { node_index: node.index, table_ids: node.table_ids.clone(), properties },
                cardinality: card,
                cost: card,
            };
            self.dp_table.offer(SubqueryGraph::single(node.index), tree);
        }

        for rel in &self.query_graph.rels {
            let rel_preds: Vec<&Predicate> = self.predicates.iter().filter(|p| p.on_rel == Some(rel.index)).collect();
            let base_card = self.estimator.statistics.rel_table_size(rel.table_id);
            let card = rel_preds.iter().fold(base_card.max(1), |c, p| self.estimator.estimate_filter(c, p));
            let properties = self.property_collection.rel_properties(rel.index).to_vec();
            let tree = JoinTree {
                root: JoinTreeNode::RelScan { rel_index: rel.index, direction: Direction::Fwd, properties },
                cardinality: card,
                cost: card,
            };
            self.dp_table.offer(SubqueryGraph::single(rel_slot(self.query_graph, rel.index)), tree);
        }
    }

    /// Level `L`: enumerate every `(left_size, right_size)` split with
    /// `left_size <= L/2`, and every disjoint, previously-planned pair of subgraphs of
    /// those sizes whose join-node sets intersect.
    fn plan_level(&mut self, level: usize, num_slots: usize) {
        let full = (1u64 << num_slots) - 1;
        let mut candidates: Vec<(SubqueryGraph, JoinTree)> = Vec::new();

        for mask in 1..=full {
            if mask.count_ones() as usize != level {
                continue;
            }
            let sg = SubqueryGraph(mask);
            let mut submask = (mask - 1) & mask;
            let mut best: Option<JoinTree> = None;
            while submask != 0 {
                let left_size = submask.count_ones() as usize;
                if left_size * 2 <= level || (left_size * 2 == level && submask < (mask ^ submask)) {
                    let left_sg = SubqueryGraph(submask);
                    let right_sg = SubqueryGraph(mask ^ submask);
                    if let (Some(left), Some(right)) = (self.dp_table.get(left_sg), self.dp_table.get(right_sg)) {
                        if self.subgraphs_connect(left_sg, right_sg) {
                            if let Some(candidate) = self.plan_pair(left_sg, left.clone(), right_sg, right.clone()) {
                                best = Some(match best {
                                    Some(b) if b.cost <= candidate.cost => b,
                                    _ => candidate,
                                });
                            }
                        }
                    }
                }
                submask = (submask - 1) & mask;
            }
            if let Some(tree) = best {
                candidates.push((sg, tree));
            }
        }

        for (sg, tree) in candidates {
            self.dp_table.offer(sg, tree);
        }
    }

    fn subgraphs_connect(&self, left: SubqueryGraph, right: SubqueryGraph) -> bool {
        if left.intersects(right) {
            return false;
        }
        let left_nodes = connecting_nodes(self.query_graph, left);
        let right_nodes = connecting_nodes(self.query_graph, right);
        !left_nodes.is_disjoint(&right_nodes)
    }

    /// Choose the best join strategy for one `(left, right)` pair: worst-case-optimal
    /// join, then index-nested-loop join (which prunes hash-join alternatives), else a
    /// hash join tried in both build orientations.
    fn plan_pair(&self, left_sg: SubqueryGraph, left: JoinTree, right_sg: SubqueryGraph, right: JoinTree) -> Option<JoinTree> {
        if let Some(wcoj) = self.try_worst_case_optimal_join(left_sg, &left, right_sg, &right) {
            return Some(wcoj);
        }
        if let Some(inlj) = self.try_index_nested_loop_join(left_sg, &left, right_sg, &right) {
            return Some(inlj);
        }
        self.plan_hash_join(left_sg, left, right_sg, right)
    }

    /// WCOJ trigger (spec §4.H): the smaller side has `size >= 2`, and the other side is
    /// purely rel slots all sharing exactly one common node — that node becomes the
    /// probe binding, each rel a build side supplying a neighbor list to intersect.
    fn try_worst_case_optimal_join(&self, left_sg: SubqueryGraph, left: &JoinTree, right_sg: SubqueryGraph, right: &JoinTree) -> Option<JoinTree> {
        let (probe_sg, probe, rel_sg, _rel_tree) = if left_sg.size() >= 2 && self.is_all_rels(right_sg) {
            (left_sg, left, right_sg, right)
        } else if right_sg.size() >= 2 && self.is_all_rels(left_sg) {
            (right_sg, right, left_sg, left)
        } else {
            return None;
        };
        let rel_indices: Vec<usize> = rel_sg.slots(self.query_graph.num_slots()).map(|s| s - self.query_graph.nodes.len()).collect();
        if rel_indices.len() < 2 {
            return None;
        }
        let common_node = self.single_shared_node(&rel_indices)?;
        if !connecting_nodes(self.query_graph, probe_sg).contains(&common_node) {
            return None;
        }

        let build_trees = self.rel_scan_leaves(&rel_indices)?;
        let build_cards: Vec<u64> = build_trees.iter().map(|t| t.cardinality).collect();
        let build_costs: Vec<u64> = build_trees.iter().map(|t| t.cost).collect();
        let key = vec![(self.query_graph.rels[rel_indices[0]].table_id, "id".to_string())];
        let card = self.estimator.estimate_intersect(&key, probe.cardinality, &build_cards);
        let cost = intersect_cost(probe.cost, probe.cardinality, &build_costs);

        Some(JoinTree {
            root: JoinTreeNode::MultiwayJoin { probe: Box::new(probe.root.clone()), builds: build_trees.into_iter().map(|t| t.root).collect(), join_node: common_node },
            cardinality: card,
            cost,
        })
    }

    fn is_all_rels(&self, sg: SubqueryGraph) -> bool {
        let n = self.query_graph.nodes.len();
        sg.slots(self.query_graph.num_slots()).all(|s| s >= n)
    }

    fn single_shared_node(&self, rel_indices: &[usize]) -> Option<usize> {
        let mut iter = rel_indices.iter();
        let first = *iter.next()?;
        let (mut a, mut b) = self.query_graph.rel_endpoints(first);
        for &r in iter {
            let (s, d) = self.query_graph.rel_endpoints(r);
            let shared_with_a = s == a || d == a;
            let shared_with_b = s == b || d == b;
            if shared_with_a && !shared_with_b {
                b = a;
            } else if !shared_with_a && shared_with_b {
                a = b;
            } else if !shared_with_a && !shared_with_b {
                return None;
            }
        }
        if a == b { Some(a) } else { None }
    }

    fn rel_scan_leaves(&self, rel_indices: &[usize]) -> Option<Vec<JoinTree>> {
        rel_indices
            .iter()
            .map(|&r| self.dp_table.get(SubqueryGraph::single(rel_slot(self.query_graph, r))).cloned())
            .collect()
    }

    /// INLJ: one side is a single rel, the other a single node whose index matches one
    /// of that rel's endpoints — an index lookup, not a hash build. When it applies it
    /// is strictly cheaper, so hash-join alternatives for this pair are skipped (spec
    /// §4.H: "prune all hash-join alternatives for that subgraph pair").
    fn try_index_nested_loop_join(&self, left_sg: SubqueryGraph, left: &JoinTree, right_sg: SubqueryGraph, right: &JoinTree) -> Option<JoinTree> {
        let (node_sg, node_tree, rel_sg, rel_tree) = match (&left.root, &right.root) {
            (JoinTreeNode::NodeScan { node_index, .. }, JoinTreeNode::RelScan { rel_index, .. }) => {
                let (s, d) = self.query_graph.rel_endpoints(*rel_index);
                if *node_index == s || *node_index == d {
                    (left_sg, left, right_sg, right)
                } else {
                    return None;
                }
            }
            (JoinTreeNode::RelScan { rel_index, .. }, JoinTreeNode::NodeScan { node_index, .. }) => {
                let (s, d) = self.query_graph.rel_endpoints(*rel_index);
                if *node_index == s || *node_index == d {
                    (right_sg, right, left_sg, left)
                } else {
                    return None;
                }
            }
            _ => return None,
        };
        let _ = (node_sg, rel_sg);
        let JoinTreeNode::RelScan { rel_index, .. } = &rel_tree.root else { return None };
        let (src, dst) = self.query_graph.rel_endpoints(*rel_index);
        let node_table = self.query_graph.nodes[src].table_ids.first().copied().unwrap_or(0);
        let rate = self.estimator.extension_rate(self.query_graph.rels[*rel_index].table_id, node_table);
        let card = self.estimator.estimate_hash_join(&[], node_tree.cardinality, rel_tree.cardinality.max(1));
        let cost = crate::planner::cost_model::extend_cost(node_tree.cost, node_tree.cardinality) + (rate * rel_tree.cost as f64).round() as u64;
        Some(JoinTree {
            root: JoinTreeNode::BinaryJoin { left: Box::new(node_tree.root.clone()), right: Box::new(rel_tree.root.clone()), join_nodes: vec![dst] },
            cardinality: card,
            cost,
        })
    }

    /// Plain hash join, tried in both build orientations; the cheaper orientation wins.
    fn plan_hash_join(&self, left_sg: SubqueryGraph, left: JoinTree, right_sg: SubqueryGraph, right: JoinTree) -> Option<JoinTree> {
        let left_nodes = connecting_nodes(self.query_graph, left_sg);
        let right_nodes = connecting_nodes(self.query_graph, right_sg);
        let join_nodes: Vec<usize> = left_nodes.intersection(&right_nodes).copied().collect();
        if join_nodes.is_empty() {
            return None;
        }
        let keys: Vec<(u64, String)> = join_nodes
            .iter()
            .flat_map(|&n| self.query_graph.nodes[n].table_ids.first().map(|&t| (t, "id".to_string())))
            .collect();

        let left_as_build = {
            let card = self.estimator.estimate_hash_join(&keys, right.cardinality, left.cardinality);
            let cost = hash_join_cost(right.cost, left.cost, right.cardinality, left.cardinality);
            JoinTree {
                root: JoinTreeNode::BinaryJoin { left: Box::new(right.root.clone()), right: Box::new(left.root.clone()), join_nodes: join_nodes.clone() },
                cardinality: card,
                cost,
            }
        };
        let right_as_build = {
            let card = self.estimator.estimate_hash_join(&keys, left.cardinality, right.cardinality);
            let cost = hash_join_cost(left.cost, right.cost, left.cardinality, right.cardinality);
            JoinTree {
                root: JoinTreeNode::BinaryJoin { left: Box::new(left.root.clone()), right: Box::new(right.root.clone()), join_nodes },
                cardinality: card,
                cost,
            }
        };
        Some(if right_as_build.cost <= left_as_build.cost { right_as_build } else { left_as_build })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::planner::join_tree::QueryGraph;

    fn stats() -> Statistics {
        let mut s = Statistics::default();
        s.node_table_sizes.insert(0, 8);
        s.node_table_sizes.insert(1, 3);
        s.rel_table_sizes.insert(0, 14);
        s
    }

    #[test]
    fn two_node_one_rel_solves_to_single_binary_join() {
        let mut qg = QueryGraph::new();
        let a = qg.add_node(vec![0]);
        let b = qg.add_node(vec![0]);
        qg.add_rel(0, a, b);
        let predicates = Vec::new();
        let props = PropertyExprCollection::new();
        let statistics = stats();
        let solver = JoinOrderSolver::new(&qg, &predicates, &props, &statistics);
        let plan = solver.solve().expect("solver should find a plan");
        assert!(plan.cardinality >= 1);
        assert!(matches!(plan.root, JoinTreeNode::BinaryJoin { .. }));
    }

    #[test]
    fn single_node_graph_solves_to_node_scan() {
        let mut qg = QueryGraph::new();
        qg.add_node(vec![0]);
        let predicates = Vec::new();
        let props = PropertyExprCollection::new();
        let statistics = stats();
        let solver = JoinOrderSolver::new(&qg, &predicates, &props, &statistics);
        let plan = solver.solve().expect("solver should find a plan");
        assert_eq!(plan.cardinality, 8);
        assert!(matches!(plan.root, JoinTreeNode::NodeScan { .. }));
    }
}
