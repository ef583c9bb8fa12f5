//! Primitive type system: the closed set of value kinds a [`Vector`](crate::vector::Vector)
//! can hold, plus the identifier and calendar newtypes built on top of it.

use std::fmt;

/// Closed enumeration of semantic value kinds (spec §3.1).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum DataType {
    Bool,
    Int64,
    Double,
    String,
    Date,
    Timestamp,
    Interval,
    NodeID,
    RelID,
    Unstructured,
}

/// `(table_id, offset)` identity of a node.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId {
    pub table_id: u64,
    pub offset: u64,
}

impl NodeId {
    pub const fn new(table_id: u64, offset: u64) -> Self {
        Self { table_id, offset }
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.table_id, self.offset)
    }
}

/// `(table_id, offset)` identity of a relationship.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RelId {
    pub table_id: u64,
    pub offset: u64,
}

impl RelId {
    pub const fn new(table_id: u64, offset: u64) -> Self {
        Self { table_id, offset }
    }
}

/// Days since the epoch. Newtype, not arithmetic-compatible with `Int64` (spec §3.1 Added:
/// no cross-type promotion is specified between calendar types and numerics).
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Date(pub i32);

/// Microseconds since the epoch.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Timestamp(pub i64);

/// A calendar interval, kept as the three independent components the original
/// representation uses rather than normalized into one unit (months are not a fixed
/// number of days).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct Interval {
    pub months: i32,
    pub days: i32,
    pub micros: i64,
}

/// A self-describing value, used for `Unstructured` properties and for literals bound
/// into expressions. `Double` wraps `ordered_float::OrderedFloat` so `Value` can derive
/// `Eq`/`Hash` and be used as a hash-join / group-by key.
#[derive(Clone, Debug, PartialEq)]
pub enum Value {
    Null,
    Bool(bool),
    Int64(i64),
    Double(f64),
    String(String),
    Date(Date),
    Timestamp(Timestamp),
    Interval(Interval),
    NodeId(NodeId),
    RelId(RelId),
}

impl Value {
    pub fn data_type(&self) -> Option<DataType> {
        match self {
            Value::Null => None,
            Value::Bool(_) => Some(DataType::Bool),
            Value::Int64(_) => Some(DataType::Int64),
            Value::Double(_) => Some(DataType::Double),
            Value::String(_) => Some(DataType::String),
            Value::Date(_) => Some(DataType::Date),
            Value::Timestamp(_) => Some(DataType::Timestamp),
            Value::Interval(_) => Some(DataType::Interval),
            Value::NodeId(_) => Some(DataType::NodeID),
            Value::RelId(_) => Some(DataType::RelID),
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }
}
