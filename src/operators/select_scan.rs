//! `SelectScan` (spec §4.C): the correlated-subquery driver. Copies exactly one flat
//! tuple from an outer pipeline into an inner pipeline's `ResultSet` on the first call,
//! then reports EOS; `re_init_to_rerun` rearms it for the next outer row.

use crate::error::Result;
use crate::interfaces::MemoryManager;
use crate::vector::{DataChunk, ResultSet};
use std::cell::RefCell;
use std::rc::Rc;
use std::sync::Arc;

/// The single outer row a [`SelectScan`] reads from, written by the enclosing operator
/// (typically a correlated `Filter`) before each re-run.
pub type OuterSlot = Rc<RefCell<Option<DataChunk>>>;

#[derive(Clone)]
pub struct SelectScan {
    pub outer: OuterSlot,
    pub done: bool,
    pub result_set: ResultSet,
}

impl SelectScan {
    pub fn new(outer: OuterSlot) -> Self {
        Self { outer, done: false, result_set: ResultSet::new() }
    }

    pub fn init_result_set(&mut self, _mm: &Arc<dyn MemoryManager>) {
        self.result_set = ResultSet::new();
    }

    pub fn next(&mut self) -> Result<bool> {
        if self.done {
            return Ok(false);
        }
        let Some(chunk) = self.outer.borrow().clone() else {
            return Ok(false);
        };
        self.result_set = ResultSet { chunks: vec![chunk], multiplicity: 1 };
        self.done = true;
        Ok(true)
    }

    pub fn re_init_to_rerun(&mut self) {
        self.done = false;
    }
}
