//! Aggregate hash table (§4.D) and aggregate function state machines (§4.E).

pub mod functions;
pub mod hash_table;

pub use functions::{AggregateKind, AggregateState};
pub use hash_table::AggregateHashTable;
