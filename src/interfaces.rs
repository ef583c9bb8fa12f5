//! External interfaces the execution core depends on but does not define (spec §6):
//! storage, catalog, memory management, and the factorized-table source for recursive
//! joins. A driver embedding this crate supplies concrete implementations; `testing.rs`
//! supplies in-memory ones for the crate's own tests.

use crate::dispatch::morsel_desc::TableMorsel;
use crate::error::Result;
use crate::planner::Direction;
use crate::types::{DataType, NodeId, RelId, Value};
use crate::vector::Vector;

/// Column and adjacency reads over the resident graph (spec §6: "`NodeTable::max_offset`,
/// column reads `read(node_ids, out_vector)`, adjacency-column and adjacency-list
/// iterators ... unstructured-property-list walks").
pub trait Storage: Send + Sync {
    fn max_offset(&self, node_table_id: u64) -> u64;

    /// Structured property read: fixed-width column lookup at each of `node_ids`,
    /// written into `out` at the same positions.
    fn read_property(&self, node_table_id: u64, property: &str, node_ids: &[NodeId], out: &mut Vector) -> Result<()>;

    /// Single-neighbor adjacency column read (n:1 / 1:1 relationships).
    fn read_adj_column(&self, direction: Direction, rel_table: u64, src: NodeId) -> Option<NodeId>;

    /// Multi-neighbor adjacency list read (n:m relationships), each with the rel
    /// identity connecting `src` to the neighbor.
    fn read_adj_list(&self, direction: Direction, rel_table: u64, src: NodeId) -> Vec<(NodeId, RelId)>;

    /// Walk `node`'s packed unstructured `(key, type, value)` list for `key`.
    fn read_unstructured(&self, node_table_id: u64, node: NodeId, key: &str) -> Option<Value>;
}

/// Schema metadata (spec §6: "node/rel table IDs, table properties, multiplicity flags,
/// and direction-aware bound/neighbor table IDs for a rel table").
pub trait Catalog: Send + Sync {
    fn node_table_id(&self, name: &str) -> Option<u64>;
    fn rel_table_id(&self, name: &str) -> Option<u64>;
    fn node_property_type(&self, node_table_id: u64, property: &str) -> Option<DataType>;
    /// Whether traversing `rel_table_id` in `direction` may yield more than one neighbor
    /// per bound node (selects `AdjListExtend` over `AdjColumnExtend` at materialize time).
    fn is_many(&self, rel_table_id: u64, direction: Direction) -> bool;
    fn bound_node_table(&self, rel_table_id: u64, direction: Direction) -> u64;
}

/// Owned-buffer allocation for vectors and aggregate hash table blocks (spec §6).
/// Implementations may pool and reuse buffers on drop; this crate never assumes that.
pub trait MemoryManager: Send + Sync {
    fn allocate(&self, num_bytes: usize) -> Vec<u8>;
}

/// The morsel-claimable input to a recursive join: one source node per tuple (spec §6:
/// "supplies worker-claim morsels `{start_tuple_idx, num_tuples}`; the core scans rows
/// on demand and never modifies it").
pub trait FactorizedTable: Send + Sync {
    fn num_tuples(&self) -> u64;
    fn claim_morsel(&self, batch_size: u64) -> TableMorsel;
    fn src_node_at(&self, tuple_idx: u64) -> NodeId;
}
