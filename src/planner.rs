//! Query planner: cost-based join-order solver over a query graph (spec §3.5, §4.H,
//! §4.I), grounded on `join_order_solver.h`'s `JoinOrderSolver` class and generalized
//! from the teacher's single linear-chain `build_plan` pass pipeline into a bottom-up
//! subgraph-enumeration DP solver.

pub mod cardinality;
pub mod cost_model;
pub mod dp_solver;
pub mod join_tree;

pub use cardinality::{CardinalityEstimator, Statistics};
pub use dp_solver::{DpTable, JoinOrderSolver, SubqueryGraph};
pub use join_tree::{
    CorrExpr, CorrelatedContext, Direction, JoinTree, JoinTreeNode, Predicate, PropertyExprCollection, QueryGraph, QueryNode, QueryRel,
    SubqueryType,
};
