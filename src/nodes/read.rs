//! Read executor.
//!
//! Pulls data from a form (or from the run's `$INPUT` payload) into one
//! output variable. Form data flows through an ordered pipeline: static
//! range filters (primary-key allow-list, discrete attribute paths,
//! continuous segments), then the legacy ad-hoc field conditions, then
//! column projection, then the read mode. A non-cell mode always writes an
//! array (possibly empty) and never leaves the output undefined.

use serde_json::Value;
use std::cmp::Ordering;

use crate::design::{
    Node, OutputBinding, ReadConfig, ReadMode, ReadSource, SortDirection, SortSpec,
};
use crate::nodes::RunContext;
use crate::resolver::resolve_key;
use crate::runner::RunnerError;
use crate::store::{FormSchema, Record, StoreError, record_value};
use crate::value::{DataType, coerce_number, display_string, loose_eq};
use crate::variables;

pub async fn run(
    cfg: &ReadConfig,
    node: &Node,
    cx: &mut RunContext<'_>,
) -> Result<Option<String>, RunnerError> {
    let next = cx.design.default_target(&node.id).map(String::from);

    let Some(output) = &cfg.output else {
        tracing::warn!(node = %node.id, "read node has no output binding; skipping");
        return Ok(next);
    };

    match &cfg.source {
        None => {
            tracing::warn!(node = %node.id, "read node has no source; writing default");
            write_empty(cfg, output, cx);
        }
        Some(ReadSource::Input) => read_input(cfg, output, cx),
        Some(ReadSource::Form { form_id }) => read_form(cfg, output, form_id, node, cx).await?,
    }
    Ok(next)
}

/// Batch-style reads degrade to an empty array; a cell read that cannot
/// produce a value leaves the output unset.
fn write_empty(cfg: &ReadConfig, output: &OutputBinding, cx: &mut RunContext<'_>) {
    if !matches!(cfg.mode, Some(ReadMode::Cell { .. })) {
        cx.vars
            .set(&output.id, DataType::Array, Value::Array(Vec::new()));
    }
}

fn read_input(cfg: &ReadConfig, output: &OutputBinding, cx: &mut RunContext<'_>) {
    let input = cx
        .vars
        .value(variables::INPUT)
        .cloned()
        .unwrap_or(Value::Null);

    match &cfg.mode {
        Some(ReadMode::Cell { field, .. }) => {
            let projected = match (&input, field.as_deref()) {
                (Value::Object(map), Some(f)) if !f.is_empty() => {
                    Some(map.get(f).cloned().unwrap_or(Value::Null))
                }
                _ => None,
            };
            let value = projected.unwrap_or(input);
            let data_type = output.data_type.unwrap_or_else(|| DataType::infer(&value));
            cx.vars.set(&output.id, data_type, value);
        }
        Some(ReadMode::Batch { .. }) => {
            let items = match input {
                Value::Array(items) => items,
                Value::Null => Vec::new(),
                other => vec![other],
            };
            cx.vars
                .set(&output.id, DataType::Array, Value::Array(items));
        }
        None => {
            let data_type = output.data_type.unwrap_or_else(|| DataType::infer(&input));
            cx.vars.set(&output.id, data_type, input);
        }
    }
}

async fn read_form(
    cfg: &ReadConfig,
    output: &OutputBinding,
    form_id: &str,
    node: &Node,
    cx: &mut RunContext<'_>,
) -> Result<(), RunnerError> {
    let schema = match cx.store.get_form(form_id).await {
        Ok(schema) => schema,
        Err(StoreError::FormNotFound { .. }) => {
            tracing::warn!(node = %node.id, form = form_id, "read source form not found; writing default");
            write_empty(cfg, output, cx);
            return Ok(());
        }
        Err(err) => return Err(err.into()),
    };
    let mut records = cx.store.list_records(form_id).await?;

    apply_range_filters(cfg, &schema, &mut records);
    apply_conditions(cfg, &mut records);
    apply_projection(cfg, &schema, &mut records);

    match &cfg.mode {
        Some(ReadMode::Cell { key, field }) => {
            let Some(key) = key else {
                tracing::warn!(node = %node.id, "cell read has no key source; output left unset");
                return Ok(());
            };
            let Some(field) = field.as_deref().filter(|f| !f.is_empty()) else {
                tracing::warn!(node = %node.id, "cell read has no field; output left unset");
                return Ok(());
            };
            let Some(key_value) = resolve_key(key, cx.vars, cx.env) else {
                tracing::warn!(node = %node.id, "cell read key did not resolve; output left unset");
                return Ok(());
            };
            let record = records.iter().find(|r| {
                r.get(&schema.primary_key)
                    .is_some_and(|v| loose_eq(v, &key_value))
            });
            match record {
                Some(record) => {
                    let value = record.get(field).cloned().unwrap_or(Value::Null);
                    let data_type = output.data_type.unwrap_or_else(|| DataType::infer(&value));
                    cx.vars.set(&output.id, data_type, value);
                }
                None => {
                    tracing::warn!(node = %node.id, key = %key_value, "cell read found no record; output left unset");
                }
            }
        }
        Some(ReadMode::Batch { sort, max_count }) => {
            if let Some(spec) = sort {
                sort_records(&mut records, spec);
            }
            if let Some(cap) = max_count {
                records.truncate(*cap);
            }
            let items: Vec<Value> = records.iter().map(record_value).collect();
            cx.vars
                .set(&output.id, DataType::Array, Value::Array(items));
        }
        None => {
            tracing::warn!(node = %node.id, "read node has no mode; writing the filtered array");
            let items: Vec<Value> = records.iter().map(record_value).collect();
            cx.vars
                .set(&output.id, DataType::Array, Value::Array(items));
        }
    }
    Ok(())
}

fn apply_range_filters(cfg: &ReadConfig, schema: &FormSchema, records: &mut Vec<Record>) {
    if !cfg.key_filter.is_empty() {
        records.retain(|record| {
            record
                .get(&schema.primary_key)
                .is_some_and(|key| cfg.key_filter.iter().any(|allowed| loose_eq(key, allowed)))
        });
    }

    if !cfg.attribute_filters.is_empty() {
        records.retain(|record| {
            cfg.attribute_filters.iter().any(|path| {
                !path.values.is_empty()
                    && path.values.iter().all(|(field, expected)| {
                        record.get(field).is_some_and(|v| loose_eq(v, expected))
                    })
            })
        });
    }

    for filter in &cfg.segment_filters {
        if filter.segments.is_empty() {
            continue;
        }
        records.retain(|record| {
            let value = record.get(&filter.field).unwrap_or(&Value::Null);
            match coerce_number(value) {
                Some(n) => filter
                    .segments
                    .iter()
                    .any(|segment| n >= segment.min && n < segment.max),
                None => false,
            }
        });
    }
}

fn apply_conditions(cfg: &ReadConfig, records: &mut Vec<Record>) {
    for condition in &cfg.conditions {
        records.retain(|record| {
            let value = record.get(&condition.field).cloned().unwrap_or(Value::Null);
            condition.operator.evaluate(&value, &condition.value)
        });
    }
}

fn apply_projection(cfg: &ReadConfig, schema: &FormSchema, records: &mut Vec<Record>) {
    if cfg.selected_fields.is_empty() {
        return;
    }
    for record in records.iter_mut() {
        record.retain(|field, _| {
            field == &schema.primary_key || cfg.selected_fields.iter().any(|f| f == field)
        });
    }
}

fn sort_records(records: &mut [Record], spec: &SortSpec) {
    records.sort_by(|a, b| {
        let ordering = compare_field(a, b, &spec.field);
        match spec.direction {
            SortDirection::Asc => ordering,
            SortDirection::Desc => ordering.reverse(),
        }
    });
}

fn compare_field(a: &Record, b: &Record, field: &str) -> Ordering {
    let left = a.get(field).unwrap_or(&Value::Null);
    let right = b.get(field).unwrap_or(&Value::Null);
    match (coerce_number(left), coerce_number(right)) {
        (Some(x), Some(y)) => x.partial_cmp(&y).unwrap_or(Ordering::Equal),
        _ => display_string(left).cmp(&display_string(right)),
    }
}
