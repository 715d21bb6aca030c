#![allow(dead_code)]

use async_trait::async_trait;
use serde_json::{Value, json};
use std::sync::{Arc, Mutex};

use formflow::design::{Design, Edge, Node, NodeConfig};
use formflow::repository::InMemoryDesignRepository;
use formflow::runner::FlowEngine;
use formflow::store::{FormSchema, InMemoryRecordStore, Record, RecordStore, StoreError};

/// Build a record from field/value pairs.
pub fn record(pairs: &[(&str, Value)]) -> Record {
    pairs
        .iter()
        .map(|(k, v)| (k.to_string(), v.clone()))
        .collect()
}

/// The `people` form used across suites: numeric `id` primary key plus
/// `name`, `age`, `email`.
pub fn people_form() -> FormSchema {
    FormSchema::new("people", "id")
        .with_field("id")
        .with_field("name")
        .with_field("age")
        .with_field("email")
}

pub fn people_records() -> Vec<Record> {
    vec![
        record(&[
            ("id", json!(1)),
            ("name", json!("ada")),
            ("age", json!(36)),
            ("email", json!("a@x.com")),
        ]),
        record(&[
            ("id", json!(2)),
            ("name", json!("grace")),
            ("age", json!(45)),
            ("email", json!("g@x.com")),
        ]),
        record(&[
            ("id", json!(3)),
            ("name", json!("alan")),
            ("age", json!(41)),
            ("email", json!("al@x.com")),
        ]),
    ]
}

pub fn people_store() -> InMemoryRecordStore {
    InMemoryRecordStore::new().with_form(people_form(), people_records())
}

/// Engine over the given store with an empty design repository; tests drive
/// it through `run_design`.
pub fn engine_over(store: Arc<dyn RecordStore>) -> FlowEngine {
    FlowEngine::new(store, Arc::new(InMemoryDesignRepository::new()))
}

/// A start node wired to one subject node: the smallest useful design.
pub fn start_then(subject: Node) -> Design {
    let subject_id = subject.id.clone();
    Design::new(
        vec![Node::new("start", NodeConfig::Start), subject],
        vec![Edge::new("start", subject_id)],
    )
}

/// Record-store wrapper that logs every call for determinism and
/// no-mutation assertions.
pub struct RecordingStore {
    inner: InMemoryRecordStore,
    calls: Mutex<Vec<String>>,
}

impl RecordingStore {
    pub fn new(inner: InMemoryRecordStore) -> Self {
        Self {
            inner,
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    pub fn mutation_calls(&self) -> Vec<String> {
        self.calls()
            .into_iter()
            .filter(|c| {
                c.starts_with("create:") || c.starts_with("update:") || c.starts_with("delete:")
            })
            .collect()
    }

    fn log(&self, entry: String) {
        self.calls.lock().unwrap().push(entry);
    }
}

#[async_trait]
impl RecordStore for RecordingStore {
    async fn get_form(&self, form_id: &str) -> Result<FormSchema, StoreError> {
        self.log(format!("get_form:{form_id}"));
        self.inner.get_form(form_id).await
    }

    async fn list_records(&self, form_id: &str) -> Result<Vec<Record>, StoreError> {
        self.log(format!("list:{form_id}"));
        self.inner.list_records(form_id).await
    }

    async fn create_record(&self, form_id: &str, fields: Record) -> Result<Record, StoreError> {
        let mut keys: Vec<&String> = fields.keys().collect();
        keys.sort();
        self.log(format!(
            "create:{form_id}:{}",
            keys.into_iter().cloned().collect::<Vec<_>>().join(",")
        ));
        self.inner.create_record(form_id, fields).await
    }

    async fn update_record(
        &self,
        form_id: &str,
        key: &Value,
        fields: Record,
    ) -> Result<Record, StoreError> {
        self.log(format!("update:{form_id}:{key}"));
        self.inner.update_record(form_id, key, fields).await
    }

    async fn delete_record(&self, form_id: &str, key: &Value) -> Result<(), StoreError> {
        self.log(format!("delete:{form_id}:{key}"));
        self.inner.delete_record(form_id, key).await
    }
}
