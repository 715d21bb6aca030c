//! Aggregate executor.
//!
//! Folds an array-valued variable into a single number: `count`, `sum`,
//! `avg` (zero for an empty array), `max`, `min`. Field values coerce
//! through the usual numeric table. `max`/`min` fold from the infinite
//! identity, so an empty array yields the fold identity itself, which has
//! no JSON representation and is stored as null.

use serde_json::Value;

use crate::design::{AggregateConfig, AggregateMethod, Node};
use crate::nodes::RunContext;
use crate::runner::RunnerError;
use crate::value::{DataType, number_or_zero, number_value};

pub async fn run(
    cfg: &AggregateConfig,
    node: &Node,
    cx: &mut RunContext<'_>,
) -> Result<Option<String>, RunnerError> {
    let next = cx.design.default_target(&node.id).map(String::from);

    let Some(output) = &cfg.output else {
        tracing::warn!(node = %node.id, "aggregate node has no output binding; skipping");
        return Ok(next);
    };
    let Some(method) = cfg.method else {
        tracing::warn!(node = %node.id, "aggregate node has no method; skipping");
        return Ok(next);
    };

    let items: Vec<Value> = match cfg.source.as_ref().and_then(|r| cx.vars.resolve_ref(r)) {
        Some(Value::Array(items)) => items,
        Some(_) => {
            tracing::warn!(node = %node.id, "aggregate source is not an array; treating as empty");
            Vec::new()
        }
        None => {
            tracing::warn!(node = %node.id, "aggregate source is unset; treating as empty");
            Vec::new()
        }
    };

    let field = cfg.field.as_deref().unwrap_or("");
    let numbers = || items.iter().map(|item| field_number(item, field));

    let value = match method {
        AggregateMethod::Count => number_value(items.len() as f64),
        AggregateMethod::Sum => number_value(numbers().sum()),
        AggregateMethod::Avg => {
            if items.is_empty() {
                number_value(0.0)
            } else {
                number_value(numbers().sum::<f64>() / items.len() as f64)
            }
        }
        AggregateMethod::Max => number_value(numbers().fold(f64::NEG_INFINITY, f64::max)),
        AggregateMethod::Min => number_value(numbers().fold(f64::INFINITY, f64::min)),
    };

    let data_type = output.data_type.unwrap_or(DataType::Number);
    cx.vars.set(&output.id, data_type, value);
    Ok(next)
}

fn field_number(item: &Value, field: &str) -> f64 {
    let value = match (item, field) {
        (Value::Object(map), f) if !f.is_empty() => map.get(f).cloned().unwrap_or(Value::Null),
        _ => item.clone(),
    };
    number_or_zero(&value)
}
