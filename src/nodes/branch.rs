//! Binary branch executor.
//!
//! Decides a boolean outcome in one of two modes, a structured
//! left/operator/right comparison (the default) or a free-text expression,
//! and routes to the true or false path. The false path never falls back to
//! the default edge: an unresolved false branch ends the run.

use serde_json::Value;

use crate::design::{BranchConfig, BranchMode, EdgeLabel, Node};
use crate::expr;
use crate::nodes::{RunContext, resolve_outcome};
use crate::resolver::resolve_operand;
use crate::runner::RunnerError;

pub async fn run(
    cfg: &BranchConfig,
    node: &Node,
    cx: &mut RunContext<'_>,
) -> Result<Option<String>, RunnerError> {
    let outcome = match cfg.mode {
        BranchMode::Expression => eval_expression(cfg, node, cx),
        BranchMode::Compare => eval_compare(cfg, node, cx),
    };
    tracing::debug!(node = %node.id, outcome, "branch condition resolved");

    let next = if outcome {
        resolve_outcome(
            cx.design,
            &node.id,
            cfg.true_action.as_ref(),
            EdgeLabel::True,
            true,
        )
    } else {
        resolve_outcome(
            cx.design,
            &node.id,
            cfg.false_action.as_ref(),
            EdgeLabel::False,
            false,
        )
    };
    Ok(next)
}

fn eval_expression(cfg: &BranchConfig, node: &Node, cx: &RunContext<'_>) -> bool {
    let Some(text) = cfg.expression.as_deref().filter(|s| !s.trim().is_empty()) else {
        tracing::warn!(node = %node.id, "expression branch without an expression; taking false");
        return false;
    };
    match expr::evaluate(text, cx.vars, cx.env.identity.as_ref()) {
        Ok(outcome) => outcome,
        Err(err) => {
            tracing::warn!(node = %node.id, expression = text, error = %err, "malformed branch expression; taking false");
            false
        }
    }
}

fn eval_compare(cfg: &BranchConfig, node: &Node, cx: &RunContext<'_>) -> bool {
    let Some(left_ref) = &cfg.left else {
        tracing::warn!(node = %node.id, "branch condition has no left operand; taking false");
        return false;
    };
    let Some(left_var) = cx.vars.get(&left_ref.id) else {
        tracing::warn!(node = %node.id, variable = %left_ref.id, "branch left variable is unset; taking false");
        return false;
    };

    // An object or array cannot be compared wholesale; without a field path
    // the condition is incomplete.
    let path_missing = left_ref.path.as_deref().is_none_or(str::is_empty);
    if left_var.data_type.is_compound() && path_missing {
        tracing::warn!(
            node = %node.id,
            variable = %left_ref.id,
            data_type = %left_var.data_type,
            "branch left operand needs a field path; taking false"
        );
        return false;
    }

    let Some(op) = cfg.operator else {
        tracing::warn!(node = %node.id, "branch condition has no operator; taking false");
        return false;
    };
    let Some(right) = &cfg.right else {
        tracing::warn!(node = %node.id, "branch condition has no right operand; taking false");
        return false;
    };

    let left_value = cx.vars.resolve_ref(left_ref).unwrap_or(Value::Null);
    let right_value = resolve_operand(right, cx.vars, cx.env.identity.as_ref());
    op.evaluate(&left_value, &right_value)
}
