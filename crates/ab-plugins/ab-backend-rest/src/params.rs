//! Rendering of `RowQuery` into REST query parameters:
//! `col=eq.v`, `col=gte.v`, `col=lt.v`, `col=in.(a,b)` and `order=col.asc|desc`.

use ab_core::{FilterOp, RowQuery};
use serde_json::Value;

fn operand(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

pub(crate) fn render(query: &RowQuery) -> Vec<(String, String)> {
    let mut params = vec![("select".to_string(), "*".to_string())];
    for filter in &query.filters {
        let rhs = match (filter.op, &filter.value) {
            (FilterOp::In, Value::Array(items)) => {
                let items: Vec<String> = items.iter().map(operand).collect();
                format!("in.({})", items.join(","))
            }
            (op, value) => format!("{}.{}", op.as_str(), operand(value)),
        };
        params.push((filter.column.clone(), rhs));
    }
    if let Some(order) = &query.order {
        let dir = if order.ascending { "asc" } else { "desc" };
        params.push(("order".to_string(), format!("{}.{dir}", order.column)));
    }
    params
}
