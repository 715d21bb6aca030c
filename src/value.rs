//! Dynamic value model for the formflow engine.
//!
//! Flow designs are authored against loosely-typed data: a variable may hold a
//! scalar, a whole record, or an array of records, and comparisons between
//! them follow coercion rules rather than strict typing. This module provides
//! the tagged representation ([`DataType`] + [`Variable`]) and the coercion
//! and comparison helpers shared by the branch, exist-check, read and
//! calculate executors.
//!
//! The coercion table mirrors the behavior the rest of the engine is specified
//! against:
//!
//! - numeric comparisons coerce both sides like `Number(...)`: numbers pass
//!   through, strings parse (blank strings are `0`), booleans are `0`/`1`,
//!   null is `0`, objects and arrays do not coerce and the comparison fails;
//! - equality is loose: numbers and numeric strings compare numerically,
//!   strings compare as strings, null equals only null;
//! - string operators (`contains`, `startsWith`, `endsWith`) render both
//!   sides as display strings, with null rendering as the empty string.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;

/// Declared shape of a variable's payload.
///
/// The discriminant is stored alongside the payload rather than derived from
/// it on every access: path resolution and the branch executor consult it
/// explicitly before indexing or comparing, so "field path on a scalar" is a
/// deliberate, testable branch instead of an accident of duck typing.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DataType {
    /// Untyped scalar; the catch-all for values produced without a
    /// declared type.
    #[default]
    Value,
    Number,
    String,
    Boolean,
    /// A single record (field-id → value map).
    Object,
    /// An ordered collection, typically of records.
    Array,
}

impl DataType {
    /// Infer a data type from a JSON payload.
    #[must_use]
    pub fn infer(value: &Value) -> Self {
        match value {
            Value::Null => DataType::Value,
            Value::Bool(_) => DataType::Boolean,
            Value::Number(_) => DataType::Number,
            Value::String(_) => DataType::String,
            Value::Array(_) => DataType::Array,
            Value::Object(_) => DataType::Object,
        }
    }

    /// Returns `true` for the compound shapes (`Object`/`Array`) that require
    /// a field path before they can participate in a comparison.
    #[must_use]
    pub fn is_compound(&self) -> bool {
        matches!(self, DataType::Object | DataType::Array)
    }
}

impl fmt::Display for DataType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            DataType::Value => "value",
            DataType::Number => "number",
            DataType::String => "string",
            DataType::Boolean => "boolean",
            DataType::Object => "object",
            DataType::Array => "array",
        };
        write!(f, "{s}")
    }
}

/// A run-scoped variable: stable id, declared shape, dynamic payload.
///
/// Variables are created by the node that produces them (read, calculate,
/// aggregate) and keep their id for the remainder of the run; executors never
/// rename an existing variable.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Variable {
    pub id: String,
    #[serde(default)]
    pub data_type: DataType,
    #[serde(default)]
    pub value: Value,
}

impl Variable {
    pub fn new(id: impl Into<String>, data_type: DataType, value: Value) -> Self {
        Self {
            id: id.into(),
            data_type,
            value,
        }
    }

    /// Build a variable with the data type inferred from the payload.
    pub fn inferred(id: impl Into<String>, value: Value) -> Self {
        let data_type = DataType::infer(&value);
        Self::new(id, data_type, value)
    }
}

/// Comparison operators available to branch conditions, exist-check match
/// rules and read filters.
///
/// Serialized forms match the authored design JSON (`"=="`, `">="`,
/// `"contains"`, ...); the legacy single `"="` spelling used by ad-hoc read
/// filters is accepted as an alias for equality.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum CompareOp {
    #[serde(rename = "==", alias = "=")]
    Eq,
    #[serde(rename = "!=")]
    Ne,
    #[serde(rename = ">")]
    Gt,
    #[serde(rename = ">=")]
    Ge,
    #[serde(rename = "<")]
    Lt,
    #[serde(rename = "<=")]
    Le,
    #[serde(rename = "contains")]
    Contains,
    #[serde(rename = "startsWith")]
    StartsWith,
    #[serde(rename = "endsWith")]
    EndsWith,
}

impl Default for CompareOp {
    /// Match rules that omit an operator compare for equality.
    fn default() -> Self {
        CompareOp::Eq
    }
}

impl CompareOp {
    /// Evaluate `left <op> right` under the engine's coercion rules.
    ///
    /// Numeric operators that cannot coerce both sides to a number evaluate
    /// to `false` rather than erroring; this is part of the engine-wide
    /// fail-soft policy for half-configured designs.
    ///
    /// # Examples
    ///
    /// ```
    /// use formflow::value::CompareOp;
    /// use serde_json::json;
    ///
    /// assert!(CompareOp::Gt.evaluate(&json!("42"), &json!(10)));
    /// assert!(CompareOp::Eq.evaluate(&json!("5"), &json!(5)));
    /// assert!(CompareOp::Contains.evaluate(&json!("a@x.com"), &json!("@x")));
    /// assert!(!CompareOp::Lt.evaluate(&json!({"a": 1}), &json!(10)));
    /// ```
    #[must_use]
    pub fn evaluate(&self, left: &Value, right: &Value) -> bool {
        match self {
            CompareOp::Eq => loose_eq(left, right),
            CompareOp::Ne => !loose_eq(left, right),
            CompareOp::Gt => numeric_cmp(left, right, |a, b| a > b),
            CompareOp::Ge => numeric_cmp(left, right, |a, b| a >= b),
            CompareOp::Lt => numeric_cmp(left, right, |a, b| a < b),
            CompareOp::Le => numeric_cmp(left, right, |a, b| a <= b),
            CompareOp::Contains => display_string(left).contains(&display_string(right)),
            CompareOp::StartsWith => display_string(left).starts_with(&display_string(right)),
            CompareOp::EndsWith => display_string(left).ends_with(&display_string(right)),
        }
    }
}

impl fmt::Display for CompareOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            CompareOp::Eq => "==",
            CompareOp::Ne => "!=",
            CompareOp::Gt => ">",
            CompareOp::Ge => ">=",
            CompareOp::Lt => "<",
            CompareOp::Le => "<=",
            CompareOp::Contains => "contains",
            CompareOp::StartsWith => "startsWith",
            CompareOp::EndsWith => "endsWith",
        };
        write!(f, "{s}")
    }
}

fn numeric_cmp(left: &Value, right: &Value, cmp: impl FnOnce(f64, f64) -> bool) -> bool {
    match (coerce_number(left), coerce_number(right)) {
        (Some(a), Some(b)) => cmp(a, b),
        _ => false,
    }
}

/// Coerce a value to a number the way `Number(...)` would.
///
/// Returns `None` where the coercion would produce NaN (non-numeric strings,
/// objects, arrays).
#[must_use]
pub fn coerce_number(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => {
            let trimmed = s.trim();
            if trimmed.is_empty() {
                Some(0.0)
            } else {
                trimmed.parse::<f64>().ok().filter(|n| !n.is_nan())
            }
        }
        Value::Bool(b) => Some(if *b { 1.0 } else { 0.0 }),
        Value::Null => Some(0.0),
        Value::Array(_) | Value::Object(_) => None,
    }
}

/// Coerce to a number, collapsing NaN to zero (`Number(x) || 0`).
///
/// This is the arithmetic coercion used by the calculate executor: a missing
/// variable or a non-numeric operand contributes `0` instead of poisoning the
/// whole result.
#[must_use]
pub fn number_or_zero(value: &Value) -> f64 {
    coerce_number(value).unwrap_or(0.0)
}

/// Render a value as the string the end user would see.
///
/// Null (and by extension unset variables) renders as the empty string,
/// matching the concat rule; compound values render as their JSON text.
#[must_use]
pub fn display_string(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(s) => s.clone(),
        Value::Bool(b) => b.to_string(),
        Value::Number(n) => n.to_string(),
        Value::Array(_) | Value::Object(_) => value.to_string(),
    }
}

/// Loose equality over dynamic operands.
///
/// Strings compare as strings, numbers (and numeric strings, and booleans)
/// compare numerically, null equals only null, and compound values compare
/// structurally.
#[must_use]
pub fn loose_eq(left: &Value, right: &Value) -> bool {
    match (left, right) {
        (Value::Null, Value::Null) => true,
        (Value::Null, _) | (_, Value::Null) => false,
        (Value::String(a), Value::String(b)) => a == b,
        (Value::Bool(a), Value::Bool(b)) => a == b,
        (Value::Number(_), Value::Number(_))
        | (Value::Number(_), Value::String(_))
        | (Value::String(_), Value::Number(_))
        | (Value::Bool(_), _)
        | (_, Value::Bool(_)) => match (coerce_number(left), coerce_number(right)) {
            (Some(a), Some(b)) => a == b,
            _ => false,
        },
        (Value::Array(_), Value::Array(_)) | (Value::Object(_), Value::Object(_)) => left == right,
        _ => false,
    }
}

/// Wrap a float as a JSON value.
///
/// Integral results are stored as integers so written primary keys and
/// calculation outputs read naturally; non-finite results have no JSON
/// representation and are stored as null.
#[must_use]
pub fn number_value(n: f64) -> Value {
    if n.fract() == 0.0 && n >= i64::MIN as f64 && n <= i64::MAX as f64 {
        return Value::from(n as i64);
    }
    serde_json::Number::from_f64(n)
        .map(Value::Number)
        .unwrap_or(Value::Null)
}

/// Truthiness of a dynamic value: false for null, `false`, zero and the empty
/// string; true otherwise.
#[must_use]
pub fn truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|f| f != 0.0),
        Value::String(s) => !s.is_empty(),
        Value::Array(_) | Value::Object(_) => true,
    }
}
