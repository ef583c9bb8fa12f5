//! Execution driver (spec §5, §6): builds one `Operator` tree per worker and drives it
//! to completion on rayon's thread pool. Generalized from the teacher's `Runner`
//! (`ExecMode`, `exec_seq`/`exec_par`) to the pull-based operator contract.
//!
//! `Operator`'s selection state is `Rc<RefCell<_>>` by design (spec §5: "each worker has
//! private selection state, aggregate states, and intermediate vectors") — thread-confined,
//! never `Send`. So unlike the teacher's `Runner`, which builds one dataflow graph and
//! moves pieces of it across threads, this driver hands every worker a *factory* closure
//! that builds its own operator tree from scratch, entirely on that worker's own thread;
//! the `Send + Sync` coordination handles underneath a tree (a `MorselDesc` scan cursor, a
//! `MorselDispatcher`) are shared instead by capturing pre-built `Arc`s in the closure's
//! environment (`Materializer`'s cursor cache; `materializer::materialize_recursive_join`'s
//! `dispatcher` parameter). Each worker's finished batches are converted to a `Send`-safe
//! scalar snapshot (`RowBatch`) before they cross back to the calling thread — the same
//! materialize-to-`Vec<Value>` idiom `operators/hash_join.rs` and `operators/intersect.rs`
//! already use at their own phase boundaries.
//!
//! `build` also receives this worker's [`WorkerId`], a plain `Copy` value rather than a
//! piece of the `!Send` tree, so it can thread through to every
//! `materializer::materialize_recursive_join` call the closure makes — any
//! [`RecursiveJoin`](crate::operators::recursive_join::RecursiveJoin) in the built tree
//! must carry a distinct id per worker before its first `next()` (spec §4.G.3's
//! ABA-prevention check is keyed on worker identity).

use crate::bfs::WorkerId;
use crate::error::Result;
use crate::interfaces::MemoryManager;
use crate::node::Operator;
use crate::types::Value;
use crate::vector::ResultSet;
use rayon::prelude::*;
use std::sync::Arc;

#[derive(Clone, Copy, Debug)]
pub struct ExecutionConfig {
    pub num_threads: usize,
}

impl Default for ExecutionConfig {
    fn default() -> Self {
        Self { num_threads: num_cpus::get().max(1) }
    }
}

/// One finished tuple's columns, in output order — the `Send`-safe form a chunk takes
/// once it leaves its producing worker thread.
pub type RowBatch = Vec<Vec<Value>>;

/// The accumulated output of a query (spec §6): every worker's finished batches,
/// flattened in arrival order. No ordering guarantee holds across workers.
#[derive(Default)]
pub struct QueryResult {
    pub batches: Vec<RowBatch>,
}

impl QueryResult {
    pub fn total_tuples(&self) -> u64 {
        self.batches.iter().map(|b| b.len() as u64).sum()
    }

    pub fn rows(&self) -> impl Iterator<Item = &[Value]> {
        self.batches.iter().flat_map(|b| b.iter().map(Vec::as_slice))
    }
}

fn snapshot(rs: &ResultSet) -> Vec<RowBatch> {
    rs.chunks
        .iter()
        .map(|chunk| {
            chunk
                .state
                .borrow()
                .iter_positions()
                .map(|pos| chunk.vectors.iter().map(|v| v.get_value(pos)).collect())
                .collect()
        })
        .collect()
}

/// Build one private operator tree, drive it to completion, and hand back only the
/// `Send`-safe scalar snapshot of its output — the `Operator` itself never leaves this
/// function, so it never has to satisfy `Send` (see module docs).
fn run_worker(build: &(dyn Fn(WorkerId) -> Operator + Send + Sync), worker: WorkerId, mm: &Arc<dyn MemoryManager>) -> Result<Vec<RowBatch>> {
    let mut op = build(worker);
    op.init_result_set(mm);
    let mut out = Vec::new();
    while op.next()? {
        out.extend(snapshot(op.result_set()));
    }
    Ok(out)
}

/// `execute(operator, memory_manager, num_threads) -> QueryResult` (spec §6). `build` is
/// called exactly once per worker, each call running start-to-finish on that worker's own
/// thread (see module docs for why a bare pre-built `Operator` can't be handed across
/// threads instead), and is passed that worker's distinct [`WorkerId`] (`0..num_threads`).
pub fn execute(build: impl Fn(WorkerId) -> Operator + Send + Sync, memory_manager: Arc<dyn MemoryManager>, num_threads: usize) -> Result<QueryResult> {
    let threads = num_threads.max(1);

    let per_worker: Vec<Result<Vec<RowBatch>>> = if threads == 1 {
        vec![run_worker(&build, WorkerId(0), &memory_manager)]
    } else {
        (0..threads).into_par_iter().map(|i| run_worker(&build, WorkerId(i as u64), &memory_manager)).collect()
    };

    let mut batches = Vec::new();
    for worker_result in per_worker {
        batches.extend(worker_result?);
    }
    Ok(QueryResult { batches })
}

/// Convenience entry point using [`ExecutionConfig::default`]'s thread count.
pub fn execute_default(build: impl Fn(WorkerId) -> Operator + Send + Sync, memory_manager: Arc<dyn MemoryManager>) -> Result<QueryResult> {
    execute(build, memory_manager, ExecutionConfig::default().num_threads)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dispatch::MorselDesc;
    use crate::operators::result_collector::ResultCollector;
    use crate::operators::scan_node_id::ScanNodeId;

    #[derive(Default)]
    struct NullMemoryManager;
    impl MemoryManager for NullMemoryManager {
        fn allocate(&self, num_bytes: usize) -> Vec<u8> {
            vec![0u8; num_bytes]
        }
    }

    fn build_scan(cursor: Arc<MorselDesc>) -> Operator {
        Operator::ResultCollector(ResultCollector::new(Box::new(Operator::ScanNodeId(ScanNodeId::new(0, cursor)))))
    }

    #[test]
    fn single_threaded_scan_visits_every_row() {
        let max = 8u64;
        let cursor = Arc::new(MorselDesc::new(max));
        let mm: Arc<dyn MemoryManager> = Arc::new(NullMemoryManager);
        let result = execute(move |_worker| build_scan(cursor.clone()), mm, 1).expect("scan should not fail");
        assert_eq!(result.total_tuples(), max);
    }

    #[test]
    fn parallel_workers_share_one_cursor_without_duplicating_rows() {
        let max = 8u64;
        let cursor = Arc::new(MorselDesc::new(max));
        let mm: Arc<dyn MemoryManager> = Arc::new(NullMemoryManager);
        let result = execute(move |_worker| build_scan(cursor.clone()), mm, 4).expect("scan should not fail");
        assert_eq!(result.total_tuples(), max);
    }

    #[test]
    fn each_worker_receives_a_distinct_id() {
        let max = 4u64;
        let cursor = Arc::new(MorselDesc::new(max));
        let mm: Arc<dyn MemoryManager> = Arc::new(NullMemoryManager);
        let seen: Arc<std::sync::Mutex<Vec<WorkerId>>> = Arc::new(std::sync::Mutex::new(Vec::new()));
        let seen_clone = seen.clone();
        execute(
            move |worker| {
                seen_clone.lock().unwrap().push(worker);
                build_scan(cursor.clone())
            },
            mm,
            4,
        )
        .expect("scan should not fail");
        let mut ids: Vec<u64> = seen.lock().unwrap().iter().map(|w| w.0).collect();
        ids.sort_unstable();
        assert_eq!(ids, vec![0, 1, 2, 3]);
    }
}
