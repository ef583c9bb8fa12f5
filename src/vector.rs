//! The vectorized value model: [`SelectionState`], [`Vector`], [`DataChunk`], and
//! [`ResultSet`] (spec §3.2-3.4).
//!
//! A `Vector` never reads or writes a position its `SelectionState` doesn't select; all
//! kernels in [`crate::ops`] are written against that contract. Out-of-range access is a
//! contract violation, not a recoverable error (spec §4.A) — this crate enforces it with
//! `debug_assert!` so release builds keep the documented fast path while test/debug builds
//! catch the violation immediately.

use crate::config::{INLINE_STRING_LEN, VECTOR_CAPACITY};
use crate::types::{DataType, Date, Interval, NodeId, RelId, Timestamp, Value};
use std::rc::Rc;
use std::cell::RefCell;

/// Shared selection cursor for all vectors in one [`DataChunk`] (spec §3.3).
#[derive(Clone, Debug)]
pub struct SelectionState {
    pub selected_size: usize,
    /// `None` means "unfiltered": positions `0..selected_size` are all selected.
    pub selected_positions: Option<Vec<u32>>,
    pub is_flat: bool,
    pub current_idx: usize,
}

impl SelectionState {
    pub fn new_unfiltered(selected_size: usize) -> Self {
        debug_assert!(selected_size <= VECTOR_CAPACITY);
        Self { selected_size, selected_positions: None, is_flat: false, current_idx: 0 }
    }

    pub fn new_flat() -> Self {
        Self { selected_size: 1, selected_positions: None, is_flat: true, current_idx: 0 }
    }

    /// True when every selected position is exactly `0..selected_size` (the common,
    /// cheap-to-iterate case).
    pub fn is_unfiltered(&self) -> bool {
        self.selected_positions.is_none()
    }

    /// The single live position when `is_flat`.
    pub fn position_of_curr_idx(&self) -> usize {
        debug_assert!(self.is_flat);
        match &self.selected_positions {
            Some(positions) => positions[self.current_idx] as usize,
            None => self.current_idx,
        }
    }

    /// Iterate the logical positions this state currently selects.
    pub fn iter_positions(&self) -> SelectionIter<'_> {
        if self.is_flat {
            SelectionIter::Flat(Some(self.position_of_curr_idx()))
        } else {
            match &self.selected_positions {
                Some(positions) => SelectionIter::Filtered(positions[..self.selected_size].iter()),
                None => SelectionIter::Range(0..self.selected_size),
            }
        }
    }

    pub fn set_filtered(&mut self, positions: Vec<u32>) {
        debug_assert!(positions.len() <= VECTOR_CAPACITY);
        self.selected_size = positions.len();
        self.selected_positions = Some(positions);
    }

    pub fn set_unfiltered(&mut self, selected_size: usize) {
        debug_assert!(selected_size <= VECTOR_CAPACITY);
        self.selected_size = selected_size;
        self.selected_positions = None;
    }
}

/// Iterator over the logical positions a [`SelectionState`] currently exposes.
pub enum SelectionIter<'a> {
    Range(std::ops::Range<usize>),
    Filtered(std::slice::Iter<'a, u32>),
    Flat(Option<usize>),
}

impl Iterator for SelectionIter<'_> {
    type Item = usize;
    fn next(&mut self) -> Option<usize> {
        match self {
            SelectionIter::Range(r) => r.next(),
            SelectionIter::Filtered(it) => it.next().map(|&p| p as usize),
            SelectionIter::Flat(slot) => slot.take(),
        }
    }
}

/// A typed, fixed-capacity column buffer plus its null mask (spec §3.2).
///
/// Strings ≤ [`INLINE_STRING_LEN`] bytes live directly in `string_inline`; longer ones are
/// appended to `string_heap` and referenced by `(offset, len)`.
#[derive(Clone, Debug)]
pub struct Vector {
    pub data_type: DataType,
    nulls: Vec<bool>,
    bools: Vec<u8>,
    ints: Vec<i64>,
    doubles: Vec<f64>,
    node_ids: Vec<NodeId>,
    rel_ids: Vec<RelId>,
    dates: Vec<Date>,
    timestamps: Vec<Timestamp>,
    intervals: Vec<Interval>,
    string_inline: Vec<[u8; INLINE_STRING_LEN]>,
    string_len: Vec<u32>,
    string_heap_offset: Vec<u32>,
    string_heap: Vec<u8>,
    /// Fast-path hint: true only if every selected position is known non-null.
    no_nulls_guarantee: bool,
    pub state: Rc<RefCell<SelectionState>>,
}

impl Vector {
    pub fn new(data_type: DataType, state: Rc<RefCell<SelectionState>>) -> Self {
        let cap = VECTOR_CAPACITY;
        Self {
            data_type,
            nulls: vec![false; cap],
            bools: vec![0; cap],
            ints: vec![0; cap],
            doubles: vec![0.0; cap],
            node_ids: vec![NodeId::new(0, 0); cap],
            rel_ids: vec![RelId::new(0, 0); cap],
            dates: vec![Date(0); cap],
            timestamps: vec![Timestamp(0); cap],
            intervals: vec![Interval { months: 0, days: 0, micros: 0 }; cap],
            string_inline: vec![[0u8; INLINE_STRING_LEN]; cap],
            string_len: vec![0; cap],
            string_heap_offset: vec![0; cap],
            string_heap: Vec::new(),
            no_nulls_guarantee: false,
            state,
        }
    }

    /// Grow the backing buffers to `capacity`, preserving prefix contents.
    pub fn reserve(&mut self, capacity: usize) {
        self.nulls.resize(capacity, false);
        self.bools.resize(capacity, 0);
        self.ints.resize(capacity, 0);
        self.doubles.resize(capacity, 0.0);
        self.node_ids.resize(capacity, NodeId::new(0, 0));
        self.rel_ids.resize(capacity, RelId::new(0, 0));
        self.dates.resize(capacity, Date(0));
        self.timestamps.resize(capacity, Timestamp(0));
        self.intervals.resize(capacity, Interval { months: 0, days: 0, micros: 0 });
        self.string_inline.resize(capacity, [0u8; INLINE_STRING_LEN]);
        self.string_len.resize(capacity, 0);
        self.string_heap_offset.resize(capacity, 0);
    }

    pub fn is_null(&self, pos: usize) -> bool {
        self.nulls[pos]
    }

    pub fn set_null(&mut self, pos: usize, is_null: bool) {
        self.nulls[pos] = is_null;
        if is_null {
            self.no_nulls_guarantee = false;
        }
    }

    pub fn has_no_nulls_guarantee(&self) -> bool {
        self.no_nulls_guarantee
    }

    pub fn set_no_nulls_guarantee(&mut self, v: bool) {
        self.no_nulls_guarantee = v;
    }

    pub fn get_bool(&self, pos: usize) -> bool {
        debug_assert_eq!(self.data_type, DataType::Bool);
        self.bools[pos] != 0
    }

    pub fn set_bool(&mut self, pos: usize, v: bool) {
        debug_assert_eq!(self.data_type, DataType::Bool);
        self.bools[pos] = v as u8;
    }

    pub fn get_int64(&self, pos: usize) -> i64 {
        debug_assert_eq!(self.data_type, DataType::Int64);
        self.ints[pos]
    }

    pub fn set_int64(&mut self, pos: usize, v: i64) {
        debug_assert_eq!(self.data_type, DataType::Int64);
        self.ints[pos] = v;
    }

    pub fn get_double(&self, pos: usize) -> f64 {
        debug_assert_eq!(self.data_type, DataType::Double);
        self.doubles[pos]
    }

    pub fn set_double(&mut self, pos: usize, v: f64) {
        debug_assert_eq!(self.data_type, DataType::Double);
        self.doubles[pos] = v;
    }

    pub fn get_node_id(&self, pos: usize) -> NodeId {
        debug_assert_eq!(self.data_type, DataType::NodeID);
        self.node_ids[pos]
    }

    pub fn set_node_id(&mut self, pos: usize, v: NodeId) {
        debug_assert_eq!(self.data_type, DataType::NodeID);
        self.node_ids[pos] = v;
    }

    pub fn get_rel_id(&self, pos: usize) -> RelId {
        debug_assert_eq!(self.data_type, DataType::RelID);
        self.rel_ids[pos]
    }

    pub fn set_rel_id(&mut self, pos: usize, v: RelId) {
        debug_assert_eq!(self.data_type, DataType::RelID);
        self.rel_ids[pos] = v;
    }

    /// Append (or overwrite at `pos`) a string value, inlining short payloads and
    /// spilling longer ones into the overflow heap.
    pub fn set_string(&mut self, pos: usize, s: &str) {
        debug_assert_eq!(self.data_type, DataType::String);
        let bytes = s.as_bytes();
        self.string_len[pos] = bytes.len() as u32;
        if bytes.len() <= INLINE_STRING_LEN {
            self.string_inline[pos][..bytes.len()].copy_from_slice(bytes);
        } else {
            self.string_heap_offset[pos] = self.string_heap.len() as u32;
            self.string_heap.extend_from_slice(bytes);
        }
    }

    pub fn get_string(&self, pos: usize) -> &str {
        debug_assert_eq!(self.data_type, DataType::String);
        let len = self.string_len[pos] as usize;
        let bytes = if len <= INLINE_STRING_LEN {
            &self.string_inline[pos][..len]
        } else {
            let off = self.string_heap_offset[pos] as usize;
            &self.string_heap[off..off + len]
        };
        std::str::from_utf8(bytes).expect("vector strings are always valid utf8")
    }

    /// Read position `pos` as a self-describing [`Value`], for callers (group-by keys,
    /// the aggregate hash table, hash-join keys) that work one scalar at a time instead
    /// of against the vectorized kernel contract. Calendar types are not read this way
    /// since no caller needs them as hash-table keys yet.
    pub fn get_value(&self, pos: usize) -> Value {
        if self.is_null(pos) {
            return Value::Null;
        }
        match self.data_type {
            DataType::Bool => Value::Bool(self.get_bool(pos)),
            DataType::Int64 => Value::Int64(self.get_int64(pos)),
            DataType::Double => Value::Double(self.get_double(pos)),
            DataType::String => Value::String(self.get_string(pos).to_string()),
            DataType::NodeID => Value::NodeId(self.get_node_id(pos)),
            DataType::RelID => Value::RelId(self.get_rel_id(pos)),
            DataType::Date => Value::Null,
            DataType::Timestamp => Value::Null,
            DataType::Interval => Value::Null,
            DataType::Unstructured => Value::Null,
        }
    }

    /// Write a self-describing [`Value`] at `pos`, the inverse of [`Self::get_value`].
    pub fn set_value(&mut self, pos: usize, value: &Value) {
        match value {
            Value::Null => self.set_null(pos, true),
            Value::Bool(b) => self.set_bool(pos, *b),
            Value::Int64(i) => self.set_int64(pos, *i),
            Value::Double(d) => self.set_double(pos, *d),
            Value::String(s) => self.set_string(pos, s),
            Value::NodeId(id) => self.set_node_id(pos, *id),
            Value::RelId(id) => self.set_rel_id(pos, *id),
            Value::Date(_) | Value::Timestamp(_) | Value::Interval(_) => self.set_null(pos, true),
        }
    }
}

/// A list of vectors sharing one [`SelectionState`] (spec §3.4).
#[derive(Clone)]
pub struct DataChunk {
    pub vectors: Vec<Vector>,
    pub state: Rc<RefCell<SelectionState>>,
}

impl DataChunk {
    pub fn new(state: Rc<RefCell<SelectionState>>) -> Self {
        Self { vectors: Vec::new(), state }
    }

    pub fn add_vector(&mut self, data_type: DataType) -> usize {
        self.vectors.push(Vector::new(data_type, self.state.clone()));
        self.vectors.len() - 1
    }
}

/// An ordered list of [`DataChunk`]s plus a lazy cross-product `multiplicity` (spec §3.4).
///
/// Logical tuple count = product of each chunk's `selected_size` × `multiplicity`.
#[derive(Clone)]
pub struct ResultSet {
    pub chunks: Vec<DataChunk>,
    pub multiplicity: u64,
}

impl ResultSet {
    pub fn new() -> Self {
        Self { chunks: Vec::new(), multiplicity: 1 }
    }

    pub fn logical_tuple_count(&self) -> u64 {
        let product: u64 =
            self.chunks.iter().map(|c| c.state.borrow().selected_size as u64).product();
        product * self.multiplicity
    }
}

impl Default for ResultSet {
    fn default() -> Self {
        Self::new()
    }
}
