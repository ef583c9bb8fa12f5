//! In-crate test fixtures (spec §8).
//!
//! [`tinysnb`] is the canonical small dataset the end-to-end scenarios are stated over:
//! 8 `Person` nodes, a `knows` adjacency list, and `studyAt`/`worksAt` adjacency columns
//! into an `Organisation` table. Unlike the teacher's `testing` module (pipeline
//! assertion helpers, test-data builders, debug inspectors for a batch-dataflow graph),
//! this crate's tests drive real [`crate::node::Operator`] chains against in-memory
//! [`crate::interfaces`] implementations, so the fixture is the dataset itself plus those
//! implementations rather than a pipeline-introspection toolkit.

pub mod tinysnb;
