//! `Flatten` (spec §4.C): chooses one chunk to flatten, advancing `current_idx` through
//! its selected positions one at a time and refilling from its child when exhausted.

use crate::error::Result;
use crate::interfaces::MemoryManager;
use crate::node::Operator;
use crate::vector::{DataChunk, ResultSet};
use std::cell::RefCell;
use std::rc::Rc;
use std::sync::Arc;

fn detach_chunk_state(chunk: &mut DataChunk) {
    let snapshot = chunk.state.borrow().clone();
    let fresh = Rc::new(RefCell::new(snapshot));
    chunk.state = fresh.clone();
    for v in chunk.vectors.iter_mut() {
        v.state = fresh.clone();
    }
}

#[derive(Clone)]
pub struct Flatten {
    pub child: Box<Operator>,
    pub chunk_idx: usize,
    pub result_set: ResultSet,
    current: usize,
    total: usize,
    has_batch: bool,
}

impl Flatten {
    pub fn new(child: Box<Operator>, chunk_idx: usize) -> Self {
        Self { child, chunk_idx, result_set: ResultSet::new(), current: 0, total: 0, has_batch: false }
    }

    pub fn init_result_set(&mut self, mm: &Arc<dyn MemoryManager>) {
        self.child.init_result_set(mm);
    }

    pub fn next(&mut self) -> Result<bool> {
        loop {
            if self.has_batch && self.current + 1 < self.total {
                self.current += 1;
                self.result_set.chunks[self.chunk_idx].state.borrow_mut().current_idx = self.current;
                return Ok(true);
            }
            if !self.child.next()? {
                self.has_batch = false;
                return Ok(false);
            }
            let mut chunk = self.child.result_set().chunks[self.chunk_idx].clone();
            detach_chunk_state(&mut chunk);
            self.total = chunk.state.borrow().selected_size;
            if self.total == 0 {
                self.has_batch = false;
                continue;
            }
            {
                let mut s = chunk.state.borrow_mut();
                s.is_flat = true;
                s.current_idx = 0;
            }
            let mut result_set = self.child.result_set().clone();
            result_set.chunks[self.chunk_idx] = chunk;
            self.result_set = result_set;
            self.current = 0;
            self.has_batch = true;
            return Ok(true);
        }
    }

    pub fn re_init_to_rerun(&mut self) {
        self.has_batch = false;
        self.current = 0;
        self.total = 0;
        self.child.re_init_to_rerun();
    }
}
