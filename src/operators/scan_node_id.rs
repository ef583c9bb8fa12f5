//! `ScanNodeID` (spec §4.C): emits sequential node IDs off a shared [`MorselDesc`]
//! counter, `VECTOR_CAPACITY` at a time.

use crate::config::VECTOR_CAPACITY;
use crate::dispatch::MorselDesc;
use crate::error::Result;
use crate::interfaces::MemoryManager;
use crate::types::{DataType, NodeId};
use crate::vector::{DataChunk, ResultSet, SelectionState};
use std::cell::RefCell;
use std::rc::Rc;
use std::sync::Arc;

#[derive(Clone)]
pub struct ScanNodeId {
    pub table_id: u64,
    pub cursor: Arc<MorselDesc>,
    pub result_set: ResultSet,
}

impl ScanNodeId {
    pub fn new(table_id: u64, cursor: Arc<MorselDesc>) -> Self {
        Self { table_id, cursor, result_set: ResultSet::new() }
    }

    pub fn init_result_set(&mut self, _mm: &Arc<dyn MemoryManager>) {
        let state = Rc::new(RefCell::new(SelectionState::new_unfiltered(0)));
        let mut chunk = DataChunk::new(state);
        chunk.add_vector(DataType::NodeID);
        self.result_set = ResultSet::new();
        self.result_set.chunks.push(chunk);
    }

    /// `get_bfs_morsel`-style reservation: atomically claim up to `VECTOR_CAPACITY`
    /// offsets; EOS when the cursor reports zero tuples.
    pub fn next(&mut self) -> Result<bool> {
        let morsel = self.cursor.get_morsel(VECTOR_CAPACITY as u64);
        if morsel.num_tuples == 0 {
            return Ok(false);
        }
        let chunk = &mut self.result_set.chunks[0];
        let vector = &mut chunk.vectors[0];
        for i in 0..morsel.num_tuples as usize {
            vector.set_node_id(i, NodeId::new(self.table_id, morsel.start_tuple_idx + i as u64));
        }
        chunk.state.borrow_mut().set_unfiltered(morsel.num_tuples as usize);
        Ok(true)
    }

    pub fn re_init_to_rerun(&mut self) {
        self.cursor = Arc::new(MorselDesc::new(self.cursor.max()));
    }
}
