//! # Row Queries
//!
//! A small filter/order description understood by every `RowStore`.
//! Deliberately narrow: equality, range and membership filters plus a single
//! order column. There is no limit/offset.

use serde::Serialize;
use serde_json::Value;

/// A single backend row as a JSON object.
pub type Row = serde_json::Map<String, Value>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FilterOp {
    Eq,
    Gte,
    Lt,
    /// `value` is a JSON array of candidates
    In,
}

impl FilterOp {
    pub fn as_str(&self) -> &'static str {
        match self {
            FilterOp::Eq => "eq",
            FilterOp::Gte => "gte",
            FilterOp::Lt => "lt",
            FilterOp::In => "in",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Filter {
    pub column: String,
    pub op: FilterOp,
    pub value: Value,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Order {
    pub column: String,
    pub ascending: bool,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct RowQuery {
    pub filters: Vec<Filter>,
    pub order: Option<Order>,
}

// Filter operands are ids, timestamps and strings; serializing them cannot fail.
fn scalar(value: impl Serialize) -> Value {
    serde_json::to_value(value).unwrap_or(Value::Null)
}

impl RowQuery {
    pub fn new() -> Self {
        Self::default()
    }

    fn push(mut self, column: &str, op: FilterOp, value: Value) -> Self {
        self.filters.push(Filter {
            column: column.to_string(),
            op,
            value,
        });
        self
    }

    pub fn eq(self, column: &str, value: impl Serialize) -> Self {
        self.push(column, FilterOp::Eq, scalar(value))
    }

    pub fn gte(self, column: &str, value: impl Serialize) -> Self {
        self.push(column, FilterOp::Gte, scalar(value))
    }

    pub fn lt(self, column: &str, value: impl Serialize) -> Self {
        self.push(column, FilterOp::Lt, scalar(value))
    }

    pub fn in_list<I, V>(self, column: &str, values: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: Serialize,
    {
        let values = values.into_iter().map(scalar).collect();
        self.push(column, FilterOp::In, Value::Array(values))
    }

    pub fn order_by(mut self, column: &str, ascending: bool) -> Self {
        self.order = Some(Order {
            column: column.to_string(),
            ascending,
        });
        self
    }
}
