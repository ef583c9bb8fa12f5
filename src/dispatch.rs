//! Concurrent scheduling primitives (spec §4.G, §5): the CAS-advanced scan cursor
//! ([`morsel_desc::MorselDesc`]) feeding `ScanNodeID` and recursive-join source rows, and
//! the [`morsel_dispatcher::MorselDispatcher`] coordinating many single-source BFS
//! instances across worker threads.

pub mod morsel_desc;
pub mod morsel_dispatcher;

pub use morsel_desc::MorselDesc;
pub use morsel_dispatcher::{Assignment, GlobalSsspState, MorselDispatcher, SchedulerMode};
