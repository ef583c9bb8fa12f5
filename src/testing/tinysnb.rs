//! The canonical `tinysnb` fixture (spec §8): 8 `Person` nodes, a `knows` adjacency list,
//! and `studyAt`/`worksAt` adjacency columns into an `Organisation` table, sized so the
//! six end-to-end scenarios yield their literal counts (5/3/5/6/4 plus the trivial 8).
//!
//! Edge layout, chosen to satisfy every scenario simultaneously:
//! - `knows`: `0->3, 1->4, 2->5, 3->0, 4->7` (persons `5,6,7` have no outgoing edge, so
//!   `EXISTS(knows)` holds for exactly `{0,1,2,3,4}` — 5 persons).
//! - `studyAt`: persons `{0,1,2}` (3 persons; `NOT EXISTS(studyAt)` holds for the other 5).
//! - `worksAt`: persons `{0,3,4,5}` (4 persons; union with `studyAt` is `{0,1,2,3,4,5}` —
//!   6 persons, matching the disjunction scenario).
//! - Nested existence ("knows someone who worksAt"): of `{0,1,2,3,4}`'s knows-targets
//!   `{3,4,5,0,7}`, exactly `{3,4,5,0}` are in the `worksAt` set — 4 persons.

use crate::dispatch::MorselDesc;
use crate::dispatch::morsel_desc::TableMorsel;
use crate::error::Result;
use crate::interfaces::{Catalog, FactorizedTable, MemoryManager, Storage};
use crate::planner::Direction;
use crate::types::{DataType, NodeId, RelId, Value};
use crate::vector::Vector;
use std::collections::HashMap;

pub const PERSON_TABLE: u64 = 1;
pub const ORGANISATION_TABLE: u64 = 2;
pub const KNOWS_TABLE: u64 = 10;
pub const STUDY_AT_TABLE: u64 = 11;
pub const WORKS_AT_TABLE: u64 = 12;

pub const NUM_PERSONS: u64 = 8;
pub const NUM_ORGANISATIONS: u64 = 2;

fn person(offset: u64) -> NodeId {
    NodeId::new(PERSON_TABLE, offset)
}

fn org(offset: u64) -> NodeId {
    NodeId::new(ORGANISATION_TABLE, offset)
}

/// In-memory [`Storage`] backing the `tinysnb` dataset.
pub struct TinySnb {
    knows: HashMap<NodeId, Vec<(NodeId, RelId)>>,
    study_at: HashMap<NodeId, NodeId>,
    works_at: HashMap<NodeId, NodeId>,
}

impl TinySnb {
    pub fn new() -> Self {
        let mut knows: HashMap<NodeId, Vec<(NodeId, RelId)>> = HashMap::new();
        for (i, (src, dst)) in [(0u64, 3u64), (1, 4), (2, 5), (3, 0), (4, 7)].into_iter().enumerate() {
            knows.entry(person(src)).or_default().push((person(dst), RelId::new(KNOWS_TABLE, i as u64)));
        }

        let mut study_at = HashMap::new();
        for p in [0u64, 1, 2] {
            study_at.insert(person(p), org(p % NUM_ORGANISATIONS));
        }

        let mut works_at = HashMap::new();
        for p in [0u64, 3, 4, 5] {
            works_at.insert(person(p), org(p % NUM_ORGANISATIONS));
        }

        Self { knows, study_at, works_at }
    }
}

impl Default for TinySnb {
    fn default() -> Self {
        Self::new()
    }
}

impl Storage for TinySnb {
    fn max_offset(&self, node_table_id: u64) -> u64 {
        match node_table_id {
            PERSON_TABLE => NUM_PERSONS,
            ORGANISATION_TABLE => NUM_ORGANISATIONS,
            _ => 0,
        }
    }

    fn read_property(&self, _node_table_id: u64, _property: &str, node_ids: &[NodeId], out: &mut Vector) -> Result<()> {
        for (pos, _) in node_ids.iter().enumerate() {
            out.set_null(pos, true);
        }
        Ok(())
    }

    fn read_adj_column(&self, _direction: Direction, rel_table: u64, src: NodeId) -> Option<NodeId> {
        match rel_table {
            STUDY_AT_TABLE => self.study_at.get(&src).copied(),
            WORKS_AT_TABLE => self.works_at.get(&src).copied(),
            _ => None,
        }
    }

    fn read_adj_list(&self, _direction: Direction, rel_table: u64, src: NodeId) -> Vec<(NodeId, RelId)> {
        match rel_table {
            KNOWS_TABLE => self.knows.get(&src).cloned().unwrap_or_default(),
            _ => Vec::new(),
        }
    }

    fn read_unstructured(&self, _node_table_id: u64, _node: NodeId, _key: &str) -> Option<Value> {
        None
    }
}

/// Schema metadata matching [`TinySnb`]'s tables.
pub struct TinySnbCatalog;

impl Catalog for TinySnbCatalog {
    fn node_table_id(&self, name: &str) -> Option<u64> {
        match name {
            "Person" => Some(PERSON_TABLE),
            "Organisation" => Some(ORGANISATION_TABLE),
            _ => None,
        }
    }

    fn rel_table_id(&self, name: &str) -> Option<u64> {
        match name {
            "knows" => Some(KNOWS_TABLE),
            "studyAt" => Some(STUDY_AT_TABLE),
            "worksAt" => Some(WORKS_AT_TABLE),
            _ => None,
        }
    }

    fn node_property_type(&self, _node_table_id: u64, _property: &str) -> Option<DataType> {
        None
    }

    fn is_many(&self, rel_table_id: u64, _direction: Direction) -> bool {
        rel_table_id == KNOWS_TABLE
    }

    fn bound_node_table(&self, rel_table_id: u64, direction: Direction) -> u64 {
        match (rel_table_id, direction) {
            (KNOWS_TABLE, _) => PERSON_TABLE,
            (STUDY_AT_TABLE, Direction::Fwd) | (WORKS_AT_TABLE, Direction::Fwd) => PERSON_TABLE,
            (STUDY_AT_TABLE, Direction::Bwd) | (WORKS_AT_TABLE, Direction::Bwd) => ORGANISATION_TABLE,
            _ => PERSON_TABLE,
        }
    }
}

/// Allocates plain zeroed buffers; the fixture has no pooling to exercise.
#[derive(Default)]
pub struct SimpleMemoryManager;

impl MemoryManager for SimpleMemoryManager {
    fn allocate(&self, num_bytes: usize) -> Vec<u8> {
        vec![0u8; num_bytes]
    }
}

/// A [`FactorizedTable`] over an explicit, fixed row list — enough to drive a
/// [`crate::operators::recursive_join::RecursiveJoin`] from a chosen set of source
/// nodes without a real table scan.
pub struct VecFactorizedTable {
    rows: Vec<NodeId>,
    cursor: MorselDesc,
}

impl VecFactorizedTable {
    pub fn new(rows: Vec<NodeId>) -> Self {
        let max = rows.len() as u64;
        Self { rows, cursor: MorselDesc::new(max) }
    }
}

impl FactorizedTable for VecFactorizedTable {
    fn num_tuples(&self) -> u64 {
        self.rows.len() as u64
    }

    fn claim_morsel(&self, batch_size: u64) -> TableMorsel {
        self.cursor.get_morsel(batch_size)
    }

    fn src_node_at(&self, tuple_idx: u64) -> NodeId {
        self.rows[tuple_idx as usize]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn knows_out_degree_matches_scenario_two() {
        let storage = TinySnb::new();
        let count = (0..NUM_PERSONS).filter(|&p| !storage.read_adj_list(Direction::Fwd, KNOWS_TABLE, person(p)).is_empty()).count();
        assert_eq!(count, 5);
    }

    #[test]
    fn study_at_or_works_at_matches_scenario_five() {
        let storage = TinySnb::new();
        let count = (0..NUM_PERSONS)
            .filter(|&p| {
                storage.read_adj_column(Direction::Fwd, STUDY_AT_TABLE, person(p)).is_some()
                    || storage.read_adj_column(Direction::Fwd, WORKS_AT_TABLE, person(p)).is_some()
            })
            .count();
        assert_eq!(count, 6);
    }

    #[test]
    fn nested_knows_works_at_matches_scenario_six() {
        let storage = TinySnb::new();
        let count = (0..NUM_PERSONS)
            .filter(|&p| {
                storage
                    .read_adj_list(Direction::Fwd, KNOWS_TABLE, person(p))
                    .iter()
                    .any(|(dst, _)| storage.read_adj_column(Direction::Fwd, WORKS_AT_TABLE, *dst).is_some())
            })
            .count();
        assert_eq!(count, 4);
    }
}
