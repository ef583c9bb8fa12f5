//! # graphflow-exec
//!
//! The query execution core of an embedded analytical graph database: a vectorized
//! expression/operator runtime, a cost-based dynamic-programming join-order solver, and
//! a morsel-dispatched recursive-extend (BFS) engine.
//!
//! This crate is the execution layer alone — it has no parser, no catalog persistence,
//! and no storage engine of its own. A driver embedding it supplies concrete
//! [`interfaces::Storage`], [`interfaces::Catalog`], [`interfaces::MemoryManager`], and
//! [`interfaces::FactorizedTable`] implementations (spec §6); [`testing::tinysnb`]
//! supplies in-memory ones this crate's own tests run against.
//!
//! ## Pipeline
//!
//! 1. A query is expressed as a [`planner::QueryGraph`] (nodes, rels, predicates,
//!    correlated subqueries).
//! 2. [`planner::JoinOrderSolver`] enumerates join orders bottom-up by subgraph size,
//!    choosing among a hash join, an index-nested-loop join, and (when the shape
//!    qualifies) a worst-case-optimal multi-way join at each step, and returns the
//!    cheapest [`planner::JoinTree`] (spec §4.H, §4.I).
//! 3. [`materializer::Materializer`] lowers that `JoinTree` into a physical
//!    [`node::Operator`] tree (spec §4.J); recursive/variable-length extends lower
//!    directly via [`materializer::materialize_recursive_join`], bypassing the solver.
//! 4. [`execute::execute`] drives the tree to completion, one independently-built copy
//!    per worker thread, and returns an [`execute::QueryResult`] (spec §5, §6).
//!
//! ## Vectorized execution
//!
//! Every operator pulls [`vector::DataChunk`] batches of up to
//! [`config::VECTOR_CAPACITY`] rows through [`node::Operator::next`], each column held in
//! a [`vector::Vector`] with its own selection state (spec §3.1–§3.3, §4.A–§4.C). Scalar
//! kernels in [`ops`] dispatch once over flat/unflat operand shapes rather than branching
//! per call site; [`aggregate`] builds a linear-probed hash table of running aggregate
//! states (spec §4.D, §4.E) on top of those kernels.
//!
//! ## Concurrency
//!
//! [`dispatch::MorselDesc`] is the CAS-advanced cursor feeding parallel node scans;
//! [`dispatch::MorselDispatcher`] coordinates many independent single-source BFS
//! instances ([`bfs::BfsSharedState`]) across worker threads for recursive extends (spec
//! §4.F–§4.G, §5). `Operator`'s own selection state is thread-confined by design (an
//! `Rc<RefCell<_>>`, never `Send`) — see `execute.rs` for why that shapes the driver.

pub mod aggregate;
pub mod bfs;
pub mod config;
pub mod dispatch;
pub mod error;
pub mod execute;
pub mod interfaces;
pub mod materializer;
pub mod node;
pub mod operators;
pub mod ops;
pub mod planner;
pub mod testing;
pub mod types;
pub mod utils;
pub mod vector;

pub use config::{
    BUILD_PENALTY, EQUALITY_PREDICATE_SELECTIVITY, INLINE_STRING_LEN, LOAD_FACTOR, MAX_LEVEL_TO_PLAN_EXACTLY, NON_EQUALITY_PREDICATE_SELECTIVITY,
    SIP_RATIO, VECTOR_CAPACITY,
};
pub use error::{Error, Result};
pub use execute::{execute, execute_default, ExecutionConfig, QueryResult, RowBatch};
pub use interfaces::{Catalog, FactorizedTable, MemoryManager, Storage};
pub use materializer::{materialize_aggregate, materialize_recursive_join, Materializer};
pub use node::Operator;
pub use planner::{CardinalityEstimator, DpTable, JoinOrderSolver, JoinTree, JoinTreeNode, QueryGraph, Statistics, SubqueryGraph};
pub use types::{DataType, NodeId, RelId, Value};
pub use vector::{DataChunk, ResultSet, SelectionState, Vector};
