//! Shared resolution helpers: system tokens, comparison operands, key
//! sources and message templates.
//!
//! Everything here is fail-soft. An unknown token, an unset variable or a
//! missing URL parameter resolves to null (or `None` where the caller needs
//! to distinguish "unresolvable"), and the caller degrades per the engine's
//! error policy instead of aborting the run.

use chrono::Utc;
use serde_json::Value;

use crate::design::{KeySource, Operand};
use crate::env::{RunEnv, SessionIdentity};
use crate::value::display_string;
use crate::variables::VariableStore;

/// Current timestamp token.
pub const NOW: &str = "@NOW";
/// Date-only token.
pub const TODAY: &str = "@TODAY";
/// Session identity tokens.
pub const USER: &str = "@USER";
pub const USERNAME: &str = "@USERNAME";

/// Resolve a system token to a value.
///
/// `@NOW` renders as an RFC 3339 UTC timestamp and `@TODAY` as `YYYY-MM-DD`;
/// the identity tokens come from the session collaborator. Unknown tokens
/// resolve to null with a logged warning.
#[must_use]
pub fn system_value(token: &str, identity: &dyn SessionIdentity) -> Value {
    match token {
        NOW => Value::String(Utc::now().to_rfc3339()),
        TODAY => Value::String(Utc::now().format("%Y-%m-%d").to_string()),
        USER | USERNAME => identity
            .current_user()
            .map(Value::String)
            .unwrap_or(Value::Null),
        other => {
            tracing::warn!(token = other, "unknown system token");
            Value::Null
        }
    }
}

/// Resolve a comparison operand against the run's variables and session.
#[must_use]
pub fn resolve_operand(
    operand: &Operand,
    vars: &VariableStore,
    identity: &dyn SessionIdentity,
) -> Value {
    match operand {
        Operand::Fixed { value } => value.clone(),
        Operand::Variable { id, path } => {
            let resolved = match path.as_deref() {
                Some(p) if !p.is_empty() => vars.resolve_path(&format!("{id}.{p}")),
                _ => vars.resolve_path(id),
            };
            resolved.unwrap_or(Value::Null)
        }
        Operand::System { token } => system_value(token, identity),
    }
}

/// Resolve a primary-key source to a concrete key value.
///
/// Returns `None` when the source cannot produce a key (unset variable,
/// missing URL parameter, fixed null); the caller logs and skips the lookup.
#[must_use]
pub fn resolve_key(key: &KeySource, vars: &VariableStore, env: &RunEnv) -> Option<Value> {
    let value = match key {
        KeySource::Fixed { value } => value.clone(),
        KeySource::Variable { id, path } => {
            let resolved = match path.as_deref() {
                Some(p) if !p.is_empty() => vars.resolve_path(&format!("{id}.{p}")),
                _ => vars.resolve_path(id),
            };
            resolved.unwrap_or(Value::Null)
        }
        KeySource::Param { name } => env
            .params
            .get(name)
            .map(Value::String)
            .unwrap_or(Value::Null),
    };
    if value.is_null() { None } else { Some(value) }
}

/// Substitute `{variableId.fieldPath}` and `{@TOKEN}` placeholders in a
/// user-facing message.
///
/// Unresolvable placeholders render as the empty string; an unterminated
/// brace is kept literally.
#[must_use]
pub fn render_template(text: &str, vars: &VariableStore, identity: &dyn SessionIdentity) -> String {
    let mut out = String::with_capacity(text.len());
    let mut rest = text;
    while let Some(start) = rest.find('{') {
        out.push_str(&rest[..start]);
        let after = &rest[start + 1..];
        match after.find('}') {
            Some(end) => {
                let token = after[..end].trim();
                let value = if token.starts_with('@') {
                    system_value(token, identity)
                } else {
                    vars.resolve_path(token).unwrap_or(Value::Null)
                };
                out.push_str(&display_string(&value));
                rest = &after[end + 1..];
            }
            None => {
                out.push_str(&rest[start..]);
                rest = "";
            }
        }
    }
    out.push_str(rest);
    out
}
