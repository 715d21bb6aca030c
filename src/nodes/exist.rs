//! Exist-check executor.
//!
//! Tests whether any record of the target form matches the subject variable
//! under every configured match rule, short-circuiting on the first fully
//! matching record. Missing configuration reads as non-existence, never as an
//! error, and routing goes through the `yes`/`no` output ports with the
//! default edge as fallback.

use serde_json::Value;

use crate::design::{ExistConfig, MatchRule, Node, OutputPort};
use crate::nodes::RunContext;
use crate::runner::RunnerError;
use crate::store::{Record, StoreError};

pub async fn run(
    cfg: &ExistConfig,
    node: &Node,
    cx: &mut RunContext<'_>,
) -> Result<Option<String>, RunnerError> {
    let found = any_match(cfg, node, cx).await?;
    tracing::debug!(node = %node.id, found, "exist-check resolved");

    let port = if found { OutputPort::Yes } else { OutputPort::No };
    let next = cx
        .design
        .port_target(&node.id, port)
        .or_else(|| cx.design.default_target(&node.id))
        .map(String::from);
    Ok(next)
}

async fn any_match(
    cfg: &ExistConfig,
    node: &Node,
    cx: &RunContext<'_>,
) -> Result<bool, RunnerError> {
    let (Some(source), Some(form_id)) = (
        cfg.source_variable.as_deref().filter(|s| !s.is_empty()),
        cfg.target_form.as_deref().filter(|s| !s.is_empty()),
    ) else {
        tracing::warn!(node = %node.id, "exist-check missing subject or target form; taking the no branch");
        return Ok(false);
    };
    if cfg.match_rules.is_empty() {
        tracing::warn!(node = %node.id, "exist-check has no match rules; taking the no branch");
        return Ok(false);
    }
    let Some(subject) = cx.vars.value(source).cloned() else {
        tracing::warn!(node = %node.id, variable = source, "exist-check subject is unset; taking the no branch");
        return Ok(false);
    };

    let records = match cx.store.list_records(form_id).await {
        Ok(records) => records,
        Err(StoreError::FormNotFound { .. }) => {
            tracing::warn!(node = %node.id, form = form_id, "exist-check target form not found; taking the no branch");
            return Ok(false);
        }
        Err(err) => return Err(err.into()),
    };

    Ok(records
        .iter()
        .any(|record| cfg.match_rules.iter().all(|rule| rule_holds(rule, &subject, record))))
}

fn rule_holds(rule: &MatchRule, subject: &Value, record: &Record) -> bool {
    // Object subjects are read through the rule's source field; a scalar
    // subject compares wholesale.
    let left = match (subject, rule.source_field.as_deref()) {
        (Value::Object(map), Some(field)) if !field.is_empty() => {
            map.get(field).cloned().unwrap_or(Value::Null)
        }
        _ => subject.clone(),
    };
    let right = record
        .get(&rule.target_field)
        .cloned()
        .unwrap_or(Value::Null);
    rule.operator.evaluate(&left, &right)
}
