//! Write executor.
//!
//! Three modes against one target form: `batch` iterates a source array and
//! writes one record per element, `single` writes exactly one new record,
//! `cell` overwrites one field of one existing record (plus its `updatedAt`
//! stamp). Auto-incremented primary keys scan the form's current maximum
//! numeric key and add one.
//!
//! Failures inside a batch are per-item recoverable: the failing element is
//! logged and counted, the loop continues, and the final written/failed
//! counts land in the run report. Everything else follows the usual split:
//! missing configuration degrades to a no-op, while store I/O errors abort
//! the run.

use chrono::Utc;
use serde_json::Value;

use crate::design::{
    BatchMapping, BatchMappingValue, FieldMapping, KeyMode, KeySource, MappingValue, Node,
    SingleSource, VarRef, WriteConfig, WriteMode,
};
use crate::env::SessionIdentity;
use crate::nodes::RunContext;
use crate::resolver::{resolve_key, system_value};
use crate::runner::{BatchWriteReport, RunnerError};
use crate::store::{FormSchema, Record, SYSTEM_FIELDS, StoreError, UPDATED_AT, value_record};
use crate::value::{coerce_number, loose_eq, number_value};
use crate::variables::{self, VariableStore};

pub async fn run(
    cfg: &WriteConfig,
    node: &Node,
    cx: &mut RunContext<'_>,
) -> Result<Option<String>, RunnerError> {
    let next = cx.design.default_target(&node.id).map(String::from);

    let Some(form_id) = cfg.target_form.as_deref().filter(|f| !f.is_empty()) else {
        tracing::warn!(node = %node.id, "write node has no target form; skipping");
        return Ok(next);
    };
    let Some(mode) = &cfg.mode else {
        tracing::warn!(node = %node.id, "write node has no mode; skipping");
        return Ok(next);
    };
    let schema = match cx.store.get_form(form_id).await {
        Ok(schema) => schema,
        Err(StoreError::FormNotFound { .. }) => {
            tracing::warn!(node = %node.id, form = form_id, "write target form not found; skipping");
            return Ok(next);
        }
        Err(err) => return Err(err.into()),
    };

    match mode {
        WriteMode::Batch {
            source,
            mappings,
            key,
        } => write_batch(form_id, &schema, source.as_ref(), mappings, *key, node, cx).await?,
        WriteMode::Single { source } => {
            write_single(form_id, &schema, source.as_ref(), node, cx).await?;
        }
        WriteMode::Cell { key, field, value } => {
            write_cell(
                form_id,
                &schema,
                key.as_ref(),
                field.as_deref(),
                value.as_ref(),
                node,
                cx,
            )
            .await?;
        }
    }
    Ok(next)
}

// ============================================================================
// Batch
// ============================================================================

async fn write_batch(
    form_id: &str,
    schema: &FormSchema,
    source: Option<&VarRef>,
    mappings: &[BatchMapping],
    key_mode: KeyMode,
    node: &Node,
    cx: &mut RunContext<'_>,
) -> Result<(), RunnerError> {
    let Some(source) = source else {
        tracing::warn!(node = %node.id, "batch write has no source variable; skipping");
        return Ok(());
    };
    let Some(value) = cx.vars.resolve_ref(source) else {
        tracing::warn!(node = %node.id, variable = %source.id, "batch write source is unset; skipping");
        return Ok(());
    };
    let Value::Array(items) = value else {
        tracing::warn!(node = %node.id, variable = %source.id, "batch write source is not an array; skipping");
        return Ok(());
    };

    // One scan up front; read-after-write within the run makes a local
    // counter equivalent to rescanning per element.
    let mut next_key = match key_mode {
        KeyMode::Auto => Some(next_auto_key(form_id, schema, cx).await?),
        KeyMode::FromSource => None,
    };

    let mut written = 0usize;
    let mut failed = 0usize;

    for (index, item) in items.iter().enumerate() {
        cx.vars.set_inferred(variables::ITEM, item.clone());
        cx.vars
            .set_inferred(variables::INDEX, number_value(index as f64));

        let outcome =
            write_batch_element(form_id, schema, item, mappings, key_mode, &mut next_key, cx)
                .await;

        match outcome {
            Ok(()) => written += 1,
            Err(err) => {
                failed += 1;
                tracing::warn!(node = %node.id, index, error = %err, "batch write element failed; continuing");
            }
        }
    }

    cx.vars.remove(variables::ITEM);
    cx.vars.remove(variables::INDEX);

    tracing::debug!(node = %node.id, written, failed, "batch write finished");
    cx.batch_reports.push(BatchWriteReport {
        node_id: node.id.clone(),
        written,
        failed,
    });
    Ok(())
}

#[derive(Debug, thiserror::Error)]
enum ElementError {
    #[error("element is not a record")]
    NotARecord,
    #[error("element has no usable primary key")]
    MissingKey,
    #[error(transparent)]
    Store(#[from] StoreError),
}

async fn write_batch_element(
    form_id: &str,
    schema: &FormSchema,
    item: &Value,
    mappings: &[BatchMapping],
    key_mode: KeyMode,
    next_key: &mut Option<f64>,
    cx: &RunContext<'_>,
) -> Result<(), ElementError> {
    let mut record = if mappings.is_empty() {
        // 1:1 copy minus system fields.
        let mut record = value_record(item).ok_or(ElementError::NotARecord)?;
        record.retain(|field, _| !SYSTEM_FIELDS.contains(&field.as_str()));
        record
    } else {
        let mut record = Record::default();
        for mapping in mappings {
            let value = match &mapping.value {
                BatchMappingValue::Variable { field } => match item {
                    Value::Object(map) => map.get(field).cloned().unwrap_or(Value::Null),
                    _ => Value::Null,
                },
                BatchMappingValue::Fixed { value } => value.clone(),
                BatchMappingValue::System { token } => {
                    system_value(token, cx.env.identity.as_ref())
                }
            };
            record.insert(mapping.target_field.clone(), value);
        }
        record
    };

    match key_mode {
        KeyMode::FromSource => {
            let key = item
                .as_object()
                .and_then(|map| map.get(&schema.primary_key))
                .cloned()
                .filter(|k| !k.is_null())
                .ok_or(ElementError::MissingKey)?;
            record.insert(schema.primary_key.clone(), key);
        }
        KeyMode::Auto => {
            let key = next_key.get_or_insert(1.0);
            record.insert(schema.primary_key.clone(), number_value(*key));
            *key += 1.0;
        }
    }

    cx.store.create_record(form_id, record).await?;
    Ok(())
}

// ============================================================================
// Single
// ============================================================================

async fn write_single(
    form_id: &str,
    schema: &FormSchema,
    source: Option<&SingleSource>,
    node: &Node,
    cx: &mut RunContext<'_>,
) -> Result<(), RunnerError> {
    let Some(source) = source else {
        tracing::warn!(node = %node.id, "single write has no source; skipping");
        return Ok(());
    };

    let mut record = match source {
        SingleSource::Copy { variable } => {
            let Some(value) = cx.vars.resolve_ref(variable) else {
                tracing::warn!(node = %node.id, variable = %variable.id, "single write source is unset; skipping");
                return Ok(());
            };
            let Some(mut record) = value_record(&value) else {
                tracing::warn!(node = %node.id, variable = %variable.id, "single write source is not a record; skipping");
                return Ok(());
            };
            record.retain(|field, _| !SYSTEM_FIELDS.contains(&field.as_str()));
            record.remove(&schema.primary_key);
            record
        }
        SingleSource::Mapped { mappings } => {
            build_mapped_record(mappings, cx.vars, cx.env.identity.as_ref())
        }
    };

    // The primary key of a single write is always auto-incremented.
    let key = next_auto_key(form_id, schema, cx).await?;
    record.insert(schema.primary_key.clone(), number_value(key));
    cx.store.create_record(form_id, record).await?;
    Ok(())
}

fn build_mapped_record(
    mappings: &[FieldMapping],
    vars: &VariableStore,
    identity: &dyn SessionIdentity,
) -> Record {
    let mut record = Record::default();
    for mapping in mappings {
        let value = mapping_value(&mapping.value, vars, identity);
        record.insert(mapping.target_field.clone(), value);
    }
    record
}

fn mapping_value(value: &MappingValue, vars: &VariableStore, identity: &dyn SessionIdentity) -> Value {
    match value {
        MappingValue::Constant { value } => value.clone(),
        MappingValue::Variable { id } => vars.value(id).cloned().unwrap_or(Value::Null),
        MappingValue::VarPath { id, path } => vars
            .resolve_path(&format!("{id}.{path}"))
            .unwrap_or(Value::Null),
        MappingValue::System { token } => system_value(token, identity),
    }
}

// ============================================================================
// Cell
// ============================================================================

async fn write_cell(
    form_id: &str,
    schema: &FormSchema,
    key: Option<&KeySource>,
    field: Option<&str>,
    value: Option<&MappingValue>,
    node: &Node,
    cx: &mut RunContext<'_>,
) -> Result<(), RunnerError> {
    let Some(key) = key else {
        tracing::warn!(node = %node.id, "cell write has no key source; skipping");
        return Ok(());
    };
    let Some(field) = field.filter(|f| !f.is_empty()) else {
        tracing::warn!(node = %node.id, "cell write has no field; skipping");
        return Ok(());
    };
    let Some(value) = value else {
        tracing::warn!(node = %node.id, "cell write has no value; skipping");
        return Ok(());
    };
    let Some(key_value) = resolve_key(key, cx.vars, cx.env) else {
        tracing::warn!(node = %node.id, "cell write key did not resolve; skipping");
        return Ok(());
    };

    // Locate first so a missing record issues no mutation call at all.
    let records = cx.store.list_records(form_id).await?;
    let exists = records.iter().any(|record| {
        record
            .get(&schema.primary_key)
            .is_some_and(|k| loose_eq(k, &key_value))
    });
    if !exists {
        tracing::warn!(node = %node.id, key = %key_value, "cell write found no record; skipping");
        return Ok(());
    }

    let new_value = mapping_value(value, cx.vars, cx.env.identity.as_ref());
    let mut fields = Record::default();
    fields.insert(field.to_string(), new_value);
    fields.insert(
        UPDATED_AT.to_string(),
        Value::String(Utc::now().to_rfc3339()),
    );
    cx.store.update_record(form_id, &key_value, fields).await?;
    Ok(())
}

// ============================================================================
// Keys
// ============================================================================

/// `1 + max(existing numeric primary keys)`; `1` for an empty form.
/// Non-numeric keys are ignored by the scan.
async fn next_auto_key(
    form_id: &str,
    schema: &FormSchema,
    cx: &RunContext<'_>,
) -> Result<f64, StoreError> {
    let records = cx.store.list_records(form_id).await?;
    let max = records
        .iter()
        .filter_map(|record| record.get(&schema.primary_key))
        .filter_map(coerce_number)
        .fold(0.0f64, f64::max);
    Ok(max + 1.0)
}
