//! Cardinality estimation (spec §4.I), grounded on `join_order_solver.h`'s
//! `CardinalityEstimator` member of `JoinOrderSolver`.

use crate::config::{EQUALITY_PREDICATE_SELECTIVITY, NON_EQUALITY_PREDICATE_SELECTIVITY};
use crate::planner::join_tree::{Predicate, QueryGraph};
use std::collections::HashMap;

/// Immutable per-table/per-property statistics the estimator reads. A driver builds one
/// of these from the catalog/storage snapshot once per query.
#[derive(Clone, Debug, Default)]
pub struct Statistics {
    /// Row count per node table ID.
    pub node_table_sizes: HashMap<u64, u64>,
    /// Row count per rel table ID.
    pub rel_table_sizes: HashMap<u64, u64>,
    /// Distinct-value domain size for `(table_id, property)`.
    pub domain_sizes: HashMap<(u64, String), u64>,
}

impl Statistics {
    pub fn node_table_size(&self, table_id: u64) -> u64 {
        self.node_table_sizes.get(&table_id).copied().unwrap_or(1)
    }

    pub fn rel_table_size(&self, table_id: u64) -> u64 {
        self.rel_table_sizes.get(&table_id).copied().unwrap_or(1)
    }

    pub fn domain_size(&self, table_id: u64, property: &str) -> u64 {
        self.domain_sizes.get(&(table_id, property.to_string())).copied().unwrap_or(1)
    }
}

/// Clamp every estimate to at least 1 (spec §4.I: "All estimates are clamped to ≥ 1").
fn clamp(card: f64) -> u64 {
    card.max(1.0).round() as u64
}

pub struct CardinalityEstimator<'a> {
    pub statistics: &'a Statistics,
}

impl<'a> CardinalityEstimator<'a> {
    pub fn new(statistics: &'a Statistics) -> Self {
        Self { statistics }
    }

    /// `estimate_scan_node(n) = |node.table(s)| summed`.
    pub fn estimate_scan_node(&self, table_ids: &[u64]) -> u64 {
        clamp(table_ids.iter().map(|&t| self.statistics.node_table_size(t) as f64).sum())
    }

    /// `estimate_hash_join(keys, probe, build) = probe.card * build_flat_card /
    /// product(dom(key_i))`. `build_flat_card` is the build side's cardinality with any
    /// unflat join-key multiplicities re-flattened — callers supply it directly since
    /// flattening depends on which groups the build side's join keys came from.
    pub fn estimate_hash_join(&self, key_table_and_property: &[(u64, String)], probe_card: u64, build_flat_card: u64) -> u64 {
        let domain_product: f64 = key_table_and_property
            .iter()
            .map(|(table, prop)| self.statistics.domain_size(*table, prop) as f64)
            .product::<f64>()
            .max(1.0);
        clamp((probe_card as f64 * build_flat_card as f64) / domain_product)
    }

    /// `estimate_cross_product(a, b) = a.card * b.card`.
    pub fn estimate_cross_product(&self, a_card: u64, b_card: u64) -> u64 {
        clamp(a_card as f64 * b_card as f64)
    }

    /// `estimate_intersect(keys, probe, builds) = min(probe.card * NON_EQ_SEL,
    /// probe.card * product(build.card) / product(dom(key)))`.
    pub fn estimate_intersect(&self, key_table_and_property: &[(u64, String)], probe_card: u64, build_cards: &[u64]) -> u64 {
        let domain_product: f64 = key_table_and_property
            .iter()
            .map(|(table, prop)| self.statistics.domain_size(*table, prop) as f64)
            .product::<f64>()
            .max(1.0);
        let build_product: f64 = build_cards.iter().map(|&c| c as f64).product();
        let sel_bound = probe_card as f64 * NON_EQUALITY_PREDICATE_SELECTIVITY;
        let key_bound = probe_card as f64 * build_product / domain_product;
        clamp(sel_bound.min(key_bound))
    }

    /// `estimate_filter(plan, pred)`: a primary-key equality yields 1; otherwise the
    /// configured equality/non-equality selectivity.
    pub fn estimate_filter(&self, card: u64, pred: &Predicate) -> u64 {
        if pred.is_primary_key && pred.is_equality {
            return 1;
        }
        let sel = if pred.is_equality { EQUALITY_PREDICATE_SELECTIVITY } else { NON_EQUALITY_PREDICATE_SELECTIVITY };
        clamp(card as f64 * sel)
    }

    /// Product of per-predicate selectivities applying to a given node/rel index
    /// (spec §4.H level-1: "multiplied by the product of per-predicate selectivities
    /// from `estimate_filters`").
    pub fn estimate_filters(&self, base_card: u64, predicates: &[Predicate]) -> u64 {
        predicates.iter().fold(base_card, |card, pred| self.estimate_filter(card, pred))
    }

    /// Extension rate for a rel `r` pinned at node `n`: `|r| / |n|`.
    pub fn extension_rate(&self, rel_table_id: u64, node_table_id: u64) -> f64 {
        self.statistics.rel_table_size(rel_table_id) as f64 / self.statistics.node_table_size(node_table_id).max(1) as f64
    }

    pub fn query_graph_base_card(&self, qg: &QueryGraph, node_index: usize) -> u64 {
        self.estimate_scan_node(&qg.nodes[node_index].table_ids)
    }
}
