//! The per-run variable store.
//!
//! Every run owns exactly one [`VariableStore`]: created empty (apart from
//! the seeded trigger payload) when the run starts, mutated only by the
//! executors of that run, and discarded when the run ends. Nothing is shared
//! across runs, so concurrent runs can never observe each other's variables.
//!
//! Lookup is always fail-soft: an unset id resolves to `None`, never an
//! error, and a field path applied to a scalar degrades to the scalar itself.
//! Indexing into a payload only happens after checking the variable's
//! declared [`DataType`] discriminant, so "path on a scalar" is an explicit
//! branch rather than duck-typed fallthrough.

use rustc_hash::FxHashMap;
use serde_json::Value;

use crate::design::VarRef;
use crate::value::{DataType, Variable};

/// Reserved id for the payload handed to the flow by its trigger.
pub const INPUT: &str = "$INPUT";
/// Reserved id for the current element of a loop context.
pub const ITEM: &str = "$item";
/// Reserved id for the current index of a loop context.
pub const INDEX: &str = "$index";

/// Run-scoped mapping from variable id to its typed dynamic value.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct VariableStore {
    vars: FxHashMap<String, Variable>,
}

impl VariableStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a store for a fresh run, seeding `$INPUT` when the trigger
    /// supplied a payload.
    #[must_use]
    pub fn seeded(input: Option<Value>) -> Self {
        let mut store = Self::new();
        if let Some(value) = input {
            store.set_inferred(INPUT, value);
        }
        store
    }

    /// Create or overwrite a variable. The id stays stable for the remainder
    /// of the run; overwriting replaces the payload, never the identity.
    pub fn set(&mut self, id: &str, data_type: DataType, value: Value) {
        self.vars
            .insert(id.to_string(), Variable::new(id, data_type, value));
    }

    /// Create or overwrite a variable, inferring its data type from the
    /// payload.
    pub fn set_inferred(&mut self, id: &str, value: Value) {
        self.vars.insert(id.to_string(), Variable::inferred(id, value));
    }

    /// Remove a variable; used to clear loop-context ids after iteration.
    pub fn remove(&mut self, id: &str) {
        self.vars.remove(id);
    }

    #[must_use]
    pub fn get(&self, id: &str) -> Option<&Variable> {
        self.vars.get(id)
    }

    #[must_use]
    pub fn value(&self, id: &str) -> Option<&Value> {
        self.vars.get(id).map(|v| &v.value)
    }

    #[must_use]
    pub fn contains(&self, id: &str) -> bool {
        self.vars.contains_key(id)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.vars.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.vars.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &Variable)> {
        self.vars.iter()
    }

    /// Resolve a `variableId` or `variableId.fieldPath` reference.
    ///
    /// Splits on the first `.`; everything after it is one field name. The
    /// field is only indexed when the variable's declared type admits it
    /// (object/array, or an untyped value whose payload is an object);
    /// otherwise the root value is returned unchanged. An unset root id
    /// resolves to `None`.
    ///
    /// # Examples
    ///
    /// ```
    /// use formflow::variables::VariableStore;
    /// use serde_json::json;
    ///
    /// let mut vars = VariableStore::new();
    /// vars.set_inferred("user", json!({"email": "a@x.com"}));
    /// vars.set_inferred("age", json!(30));
    ///
    /// assert_eq!(vars.resolve_path("user.email"), Some(json!("a@x.com")));
    /// // A path on a scalar degrades to the scalar.
    /// assert_eq!(vars.resolve_path("age.years"), Some(json!(30)));
    /// assert_eq!(vars.resolve_path("missing"), None);
    /// ```
    #[must_use]
    pub fn resolve_path(&self, path: &str) -> Option<Value> {
        let (root, field) = match path.split_once('.') {
            Some((root, rest)) => (root, Some(rest)),
            None => (path, None),
        };
        let var = self.vars.get(root)?;

        let indexable = match var.data_type {
            DataType::Object | DataType::Array => true,
            DataType::Value => var.value.is_object(),
            DataType::Number | DataType::String | DataType::Boolean => false,
        };

        if indexable
            && let Some(field) = field
            && !field.is_empty()
            && let Value::Object(map) = &var.value
        {
            return Some(map.get(field).cloned().unwrap_or(Value::Null));
        }

        Some(var.value.clone())
    }

    /// Resolve a [`VarRef`] (id plus optional field path).
    #[must_use]
    pub fn resolve_ref(&self, var_ref: &VarRef) -> Option<Value> {
        match var_ref.path.as_deref() {
            Some(path) if !path.is_empty() => {
                self.resolve_path(&format!("{}.{path}", var_ref.id))
            }
            _ => self.value(&var_ref.id).cloned(),
        }
    }
}
