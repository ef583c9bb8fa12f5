//! Tunable constants used throughout the planner, aggregate hash table, and vector model.
//!
//! Collected in one place instead of scattered as magic numbers so a driver can override
//! them (via [`ExecutionConfig`](crate::execute::ExecutionConfig)) without hunting through
//! every module that reads one.

/// Maximum number of tuples a [`Vector`](crate::vector::Vector) can hold at once.
pub const VECTOR_CAPACITY: usize = 2048;

/// Aggregate hash table resize threshold: `num_groups / capacity` must stay below this.
pub const LOAD_FACTOR: f64 = 0.75;

/// Below this probe/build cardinality ratio, sideways information is not pushed from
/// build to probe (the build side is too small relative to the probe side for the filter
/// to pay for itself).
pub const SIP_RATIO: f64 = 0.3;

/// Multiplier applied to the flattened build-side cardinality in hash-join and
/// recursive-extend cost estimates, penalizing materialization of the build side.
pub const BUILD_PENALTY: f64 = 2.0;

/// Default selectivity assumed for an equality predicate without primary-key info.
pub const EQUALITY_PREDICATE_SELECTIVITY: f64 = 0.1;

/// Default selectivity assumed for a non-equality predicate.
pub const NON_EQUALITY_PREDICATE_SELECTIVITY: f64 = 0.3;

/// Unused by the DP join-order solver, which enumerates every level exactly (the only
/// cutoff is the bitmask-width guard on `num_slots` in `JoinOrderSolver::solve`). Kept as
/// a named constant so a caller wiring in a greedy fallback for very large query graphs
/// has a documented threshold to hang it off; see `DESIGN.md`.
#[allow(dead_code)]
pub const MAX_LEVEL_TO_PLAN_EXACTLY: usize = 8;

/// Inline string threshold: strings at or under this length are stored directly in a
/// vector's slot instead of in the overflow heap.
pub const INLINE_STRING_LEN: usize = 12;
