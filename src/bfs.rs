//! The recursive-extend (BFS) engine: frontier management and the three traversal
//! strategies (spec §3.6, §4.F).

pub mod frontier;
pub mod scanner;
pub mod shared_state;
pub mod strategies;

pub use frontier::Frontier;
pub use shared_state::{BfsSharedState, ExtendMorsel, SsspLocalState, TargetDstNodes, VisitedState, WorkerId, WriteMorsel, WriteOutcome};
pub use strategies::Strategy;
