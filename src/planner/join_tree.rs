//! Query graph and join-tree types (spec §3.5): the planner's input and output shapes.

use crate::types::DataType;
use std::collections::HashMap;

/// Direction an adjacency is traversed in, relative to how the rel's src/dst were
/// declared in the query graph.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Direction {
    Fwd,
    Bwd,
}

/// One node variable in the query graph: a position that can bind to any of
/// `table_ids`' node tables.
#[derive(Clone, Debug)]
pub struct QueryNode {
    pub index: usize,
    pub table_ids: Vec<u64>,
}

/// One rel variable, pinned between two query nodes.
#[derive(Clone, Debug)]
pub struct QueryRel {
    pub index: usize,
    pub table_id: u64,
    pub src_node: usize,
    pub dst_node: usize,
}

/// The planner's input shape: a set of node and rel variables, connected by the rels'
/// `src_node`/`dst_node` endpoints.
#[derive(Clone, Debug, Default)]
pub struct QueryGraph {
    pub nodes: Vec<QueryNode>,
    pub rels: Vec<QueryRel>,
}

impl QueryGraph {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_node(&mut self, table_ids: Vec<u64>) -> usize {
        let index = self.nodes.len();
        self.nodes.push(QueryNode { index, table_ids });
        index
    }

    pub fn add_rel(&mut self, table_id: u64, src_node: usize, dst_node: usize) -> usize {
        let index = self.rels.len();
        self.rels.push(QueryRel { index, table_id, src_node, dst_node });
        index
    }

    /// Total number of planning slots (nodes then rels), the width of a `SubqueryGraph`
    /// bitmask over this graph.
    pub fn num_slots(&self) -> usize {
        self.nodes.len() + self.rels.len()
    }

    /// The query nodes a rel touches, as slot indices within its own bit (node slots
    /// only — rels don't directly connect to other rels except through a shared node).
    pub fn rel_endpoints(&self, rel_index: usize) -> (usize, usize) {
        let r = &self.rels[rel_index];
        (r.src_node, r.dst_node)
    }
}

/// A predicate attached to a node or rel pattern (spec §4.H/§4.I: `estimate_filter`
/// distinguishes primary-key equality from other selectivities).
#[derive(Clone, Debug)]
pub struct Predicate {
    pub on_node: Option<usize>,
    pub on_rel: Option<usize>,
    pub property: String,
    pub is_equality: bool,
    pub is_primary_key: bool,
}

/// Maps a query pattern (node or rel) to the properties that must be scanned for it,
/// populated by the planner as it decides what `ScanProperty` calls the materializer
/// will need (spec §4.H: `PropertyExprCollection`).
#[derive(Clone, Debug, Default)]
pub struct PropertyExprCollection {
    node_properties: HashMap<usize, Vec<String>>,
    rel_properties: HashMap<usize, Vec<String>>,
}

impl PropertyExprCollection {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_node_property(&mut self, node_index: usize, property: impl Into<String>) {
        self.node_properties.entry(node_index).or_default().push(property.into());
    }

    pub fn add_rel_property(&mut self, rel_index: usize, property: impl Into<String>) {
        self.rel_properties.entry(rel_index).or_default().push(property.into());
    }

    pub fn node_properties(&self, node_index: usize) -> &[String] {
        self.node_properties.get(&node_index).map_or(&[], Vec::as_slice)
    }

    pub fn rel_properties(&self, rel_index: usize) -> &[String] {
        self.rel_properties.get(&rel_index).map_or(&[], Vec::as_slice)
    }
}

/// A bound correlated expression, carried by `ExprScan` nodes (spec §4.H Added:
/// `CorrelatedContext`).
#[derive(Clone, Debug)]
pub struct CorrExpr {
    pub name: String,
    pub data_type: DataType,
}

/// What kind of correlated subquery this solve is planning for, mirroring
/// `setCorrExprs`'s `SubqueryType` in the original join-order solver.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SubqueryType {
    Exists,
    Count,
    Projection,
}

/// Optional context making this a correlated-subquery plan: the outer pipeline's bound
/// expressions are reused via a single `ExprScan` leaf rather than re-scanned.
#[derive(Clone, Debug)]
pub struct CorrelatedContext {
    pub subquery_type: SubqueryType,
    pub corr_exprs: Vec<CorrExpr>,
    pub corr_cardinality: u64,
}

/// The closed join-tree node sum (spec §3.5).
#[derive(Clone, Debug)]
pub enum JoinTreeNode {
    NodeScan { node_index: usize, table_ids: Vec<u64>, properties: Vec<String> },
    RelScan { rel_index: usize, direction: Direction, properties: Vec<String> },
    ExprScan { corr_exprs: Vec<CorrExpr> },
    BinaryJoin { left: Box<JoinTreeNode>, right: Box<JoinTreeNode>, join_nodes: Vec<usize> },
    MultiwayJoin { probe: Box<JoinTreeNode>, builds: Vec<JoinTreeNode>, join_node: usize },
}

/// A planned subtree with its estimated cardinality and cost, keyed in the DP table by
/// the `SubqueryGraph` of slots it covers.
#[derive(Clone, Debug)]
pub struct JoinTree {
    pub root: JoinTreeNode,
    pub cardinality: u64,
    pub cost: u64,
}
