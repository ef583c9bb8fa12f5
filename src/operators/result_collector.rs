//! `ResultCollector` (spec §4.C): drains its child, copying each produced `ResultSet`
//! into an owned result log. String-heap bytes live inside each `Vector`'s own buffer
//! (spec §3.2), so cloning a `ResultSet` already keeps them alive past the pipeline.

use crate::error::Result;
use crate::interfaces::MemoryManager;
use crate::node::Operator;
use crate::vector::ResultSet;
use std::sync::Arc;

#[derive(Clone)]
pub struct ResultCollector {
    pub child: Box<Operator>,
    pub collected: Vec<ResultSet>,
    pub result_set: ResultSet,
}

impl ResultCollector {
    pub fn new(child: Box<Operator>) -> Self {
        Self { child, collected: Vec::new(), result_set: ResultSet::new() }
    }

    pub fn init_result_set(&mut self, mm: &Arc<dyn MemoryManager>) {
        self.child.init_result_set(mm);
        self.collected.clear();
    }

    pub fn next(&mut self) -> Result<bool> {
        if !self.child.next()? {
            return Ok(false);
        }
        let rs = self.child.result_set().clone();
        self.collected.push(rs.clone());
        self.result_set = rs;
        Ok(true)
    }

    pub fn re_init_to_rerun(&mut self) {
        self.collected.clear();
        self.child.re_init_to_rerun();
    }

    /// Sum of `logical_tuple_count()` across every batch collected so far, the scalar
    /// callers most often want (e.g. a bare `COUNT(*)` query with no group-by).
    pub fn total_tuples(&self) -> u64 {
        self.collected.iter().map(|rs| rs.logical_tuple_count()).sum()
    }
}
