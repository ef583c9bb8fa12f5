//! Group-key hashing for the aggregate hash table (spec §4.D: "compute a 64-bit hash of
//! the group-key tuple (combine per-key hashes)").
//!
//! The distilled spec does not pin down a bit-mixing scheme, so this crate defines its
//! own deterministic one (documented in `DESIGN.md` as a new, not ported, choice): a
//! `splitmix64`-style mix for fixed-width values, FNV-1a for byte strings, combined
//! across keys with a boost::hash_combine-style fold so key order affects the result.

use crate::types::{NodeId, RelId};
use crate::vector::Vector;

#[inline]
fn splitmix64(mut x: u64) -> u64 {
    x = x.wrapping_add(0x9E3779B97F4A7C15);
    x = (x ^ (x >> 30)).wrapping_mul(0xBF58476D1CE4E5B9);
    x = (x ^ (x >> 27)).wrapping_mul(0x94D049BB133111EB);
    x ^ (x >> 31)
}

#[inline]
fn fnv1a(bytes: &[u8]) -> u64 {
    let mut hash: u64 = 0xcbf29ce484222325;
    for &b in bytes {
        hash ^= b as u64;
        hash = hash.wrapping_mul(0x100000001b3);
    }
    hash
}

/// Combine a running hash with the next key's hash (ordering-sensitive).
#[inline]
pub fn combine(acc: u64, next: u64) -> u64 {
    acc ^ (next.wrapping_add(0x9E3779B97F4A7C15).wrapping_add(acc << 6).wrapping_add(acc >> 2))
}

/// Hash a single vector position; `NULL` hashes to a fixed sentinel so distinct-null
/// groups still collapse into one group (standard SQL group-by NULL semantics).
pub fn hash_position(v: &Vector, pos: usize) -> u64 {
    if v.is_null(pos) {
        return 0x9E3779B97F4A7C15;
    }
    match v.data_type {
        crate::types::DataType::Bool => splitmix64(v.get_bool(pos) as u64),
        crate::types::DataType::Int64 => splitmix64(v.get_int64(pos) as u64),
        crate::types::DataType::Double => splitmix64(v.get_double(pos).to_bits()),
        crate::types::DataType::String => fnv1a(v.get_string(pos).as_bytes()),
        crate::types::DataType::NodeID => hash_node_id(v.get_node_id(pos)),
        crate::types::DataType::RelID => hash_rel_id(v.get_rel_id(pos)),
        crate::types::DataType::Date => splitmix64(0),
        crate::types::DataType::Timestamp => splitmix64(0),
        crate::types::DataType::Interval => splitmix64(0),
        crate::types::DataType::Unstructured => splitmix64(0),
    }
}

pub fn hash_node_id(id: NodeId) -> u64 {
    combine(splitmix64(id.table_id), splitmix64(id.offset))
}

pub fn hash_rel_id(id: RelId) -> u64 {
    combine(splitmix64(id.table_id), splitmix64(id.offset))
}
