//! The record store seam: form schemas, records, and the async contract the
//! engine issues its reads and writes through.
//!
//! The engine never talks to a concrete backend. Everything goes through the
//! [`RecordStore`] trait, injected as an `Arc<dyn RecordStore>`; the real
//! deployment wires the hosted persistence adapter in, while tests and
//! headless runs use the bundled [`InMemoryRecordStore`].
//!
//! The engine mutates record *instances* only; form schemas are read-only
//! from its perspective.

use async_trait::async_trait;
use miette::Diagnostic;
use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::Mutex;
use thiserror::Error;

use crate::value::loose_eq;

/// One row of a form: a plain field-id → value map.
pub type Record = FxHashMap<String, Value>;

/// System-maintained field stamped on cell updates.
pub const UPDATED_AT: &str = "updatedAt";
/// System-maintained creation timestamp field.
pub const CREATED_AT: &str = "createdAt";
/// Fields excluded from 1:1 record copies.
pub const SYSTEM_FIELDS: &[&str] = &[CREATED_AT, UPDATED_AT];

/// View a record as a JSON object value for storage in a variable.
#[must_use]
pub fn record_value(record: &Record) -> Value {
    Value::Object(
        record
            .iter()
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect(),
    )
}

/// View a JSON object value as a record; `None` for non-objects.
#[must_use]
pub fn value_record(value: &Value) -> Option<Record> {
    match value {
        Value::Object(map) => Some(map.iter().map(|(k, v)| (k.clone(), v.clone())).collect()),
        _ => None,
    }
}

/// Declared field of a form.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FieldDef {
    pub id: String,
    #[serde(default)]
    pub name: String,
}

impl FieldDef {
    pub fn new(id: impl Into<String>) -> Self {
        let id = id.into();
        Self {
            name: id.clone(),
            id,
        }
    }
}

/// Schema of a form: its primary-key field id and declared field list.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FormSchema {
    pub id: String,
    #[serde(default)]
    pub name: String,
    pub primary_key: String,
    #[serde(default)]
    pub fields: Vec<FieldDef>,
}

impl FormSchema {
    pub fn new(id: impl Into<String>, primary_key: impl Into<String>) -> Self {
        let id = id.into();
        Self {
            name: id.clone(),
            id,
            primary_key: primary_key.into(),
            fields: Vec::new(),
        }
    }

    #[must_use]
    pub fn with_field(mut self, id: impl Into<String>) -> Self {
        self.fields.push(FieldDef::new(id));
        self
    }
}

/// Errors surfaced by record store implementations.
///
/// `FormNotFound` is the only variant the executors treat as
/// configuration-incomplete (a design pointing at a deleted form); everything
/// else is resolution-fatal and aborts the run.
#[derive(Debug, Error, Diagnostic)]
pub enum StoreError {
    #[error("form not found: {form_id}")]
    #[diagnostic(
        code(formflow::store::form_not_found),
        help("The design references a form that no longer exists.")
    )]
    FormNotFound { form_id: String },

    #[error("record not found in form {form_id}: key {key}")]
    #[diagnostic(code(formflow::store::record_not_found))]
    RecordNotFound { form_id: String, key: String },

    #[error("record store backend error: {message}")]
    #[diagnostic(code(formflow::store::backend))]
    Backend { message: String },
}

/// Async contract between the engine and the record persistence layer.
///
/// The store is shared and externally synchronized; within one run the engine
/// assumes read-after-write consistency for the calls it issues, and makes no
/// atomicity claim across concurrent runs.
#[async_trait]
pub trait RecordStore: Send + Sync {
    async fn get_form(&self, form_id: &str) -> Result<FormSchema, StoreError>;

    async fn list_records(&self, form_id: &str) -> Result<Vec<Record>, StoreError>;

    async fn create_record(&self, form_id: &str, fields: Record) -> Result<Record, StoreError>;

    /// Merge `fields` into the record whose primary key loosely equals `key`.
    async fn update_record(
        &self,
        form_id: &str,
        key: &Value,
        fields: Record,
    ) -> Result<Record, StoreError>;

    async fn delete_record(&self, form_id: &str, key: &Value) -> Result<(), StoreError>;
}

struct StoredForm {
    schema: FormSchema,
    records: Vec<Record>,
}

/// Volatile record store for tests, benches and headless runs.
///
/// Mirrors the backend contract exactly: loose primary-key matching, merge
/// semantics on update, idempotent delete.
#[derive(Default)]
pub struct InMemoryRecordStore {
    forms: Mutex<FxHashMap<String, StoredForm>>,
}

impl InMemoryRecordStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style form registration for test setup.
    #[must_use]
    pub fn with_form(self, schema: FormSchema, records: Vec<Record>) -> Self {
        self.insert_form(schema, records);
        self
    }

    /// Register (or replace) a form and its records.
    pub fn insert_form(&self, schema: FormSchema, records: Vec<Record>) {
        let mut forms = self.forms.lock().expect("record store lock poisoned");
        forms.insert(schema.id.clone(), StoredForm { schema, records });
    }

    /// Snapshot of a form's records, for assertions.
    #[must_use]
    pub fn records(&self, form_id: &str) -> Vec<Record> {
        let forms = self.forms.lock().expect("record store lock poisoned");
        forms
            .get(form_id)
            .map(|f| f.records.clone())
            .unwrap_or_default()
    }
}

#[async_trait]
impl RecordStore for InMemoryRecordStore {
    async fn get_form(&self, form_id: &str) -> Result<FormSchema, StoreError> {
        let forms = self.forms.lock().expect("record store lock poisoned");
        forms
            .get(form_id)
            .map(|f| f.schema.clone())
            .ok_or_else(|| StoreError::FormNotFound {
                form_id: form_id.to_string(),
            })
    }

    async fn list_records(&self, form_id: &str) -> Result<Vec<Record>, StoreError> {
        let forms = self.forms.lock().expect("record store lock poisoned");
        forms
            .get(form_id)
            .map(|f| f.records.clone())
            .ok_or_else(|| StoreError::FormNotFound {
                form_id: form_id.to_string(),
            })
    }

    async fn create_record(&self, form_id: &str, fields: Record) -> Result<Record, StoreError> {
        let mut forms = self.forms.lock().expect("record store lock poisoned");
        let form = forms
            .get_mut(form_id)
            .ok_or_else(|| StoreError::FormNotFound {
                form_id: form_id.to_string(),
            })?;
        form.records.push(fields.clone());
        Ok(fields)
    }

    async fn update_record(
        &self,
        form_id: &str,
        key: &Value,
        fields: Record,
    ) -> Result<Record, StoreError> {
        let mut forms = self.forms.lock().expect("record store lock poisoned");
        let form = forms
            .get_mut(form_id)
            .ok_or_else(|| StoreError::FormNotFound {
                form_id: form_id.to_string(),
            })?;
        let pk = form.schema.primary_key.clone();
        let record = form
            .records
            .iter_mut()
            .find(|r| r.get(&pk).is_some_and(|v| loose_eq(v, key)))
            .ok_or_else(|| StoreError::RecordNotFound {
                form_id: form_id.to_string(),
                key: key.to_string(),
            })?;
        for (field, value) in fields {
            record.insert(field, value);
        }
        Ok(record.clone())
    }

    async fn delete_record(&self, form_id: &str, key: &Value) -> Result<(), StoreError> {
        let mut forms = self.forms.lock().expect("record store lock poisoned");
        let form = forms
            .get_mut(form_id)
            .ok_or_else(|| StoreError::FormNotFound {
                form_id: form_id.to_string(),
            })?;
        let pk = form.schema.primary_key.clone();
        form.records
            .retain(|r| !r.get(&pk).is_some_and(|v| loose_eq(v, key)));
        Ok(())
    }
}
