//! Calculate executor.
//!
//! Produces exactly one output variable under the node's stable output id.
//! Numeric operands coerce through [`number_or_zero`], so missing variables
//! and non-numeric payloads contribute zero instead of failing the node, and
//! division by zero yields zero. An operation kind this engine does not
//! recognize leaves the output variable unset.

use serde_json::Value;

use crate::design::{CalcOperation, CalculateConfig, ConcatPart, Node, VarRef};
use crate::nodes::RunContext;
use crate::runner::RunnerError;
use crate::value::{DataType, display_string, number_or_zero, number_value};
use crate::variables::VariableStore;

pub async fn run(
    cfg: &CalculateConfig,
    node: &Node,
    cx: &mut RunContext<'_>,
) -> Result<Option<String>, RunnerError> {
    let next = cx.design.default_target(&node.id).map(String::from);

    let Some(output) = &cfg.output else {
        tracing::warn!(node = %node.id, "calculate node has no output binding; skipping");
        return Ok(next);
    };
    let Some(operation) = &cfg.operation else {
        tracing::warn!(node = %node.id, "calculate node has no operation; skipping");
        return Ok(next);
    };

    if matches!(operation, CalcOperation::Unknown) {
        tracing::warn!(node = %node.id, output = %output.id, "unrecognized calculate operation; output left unset");
        return Ok(next);
    }

    let value = compute(operation, cx.vars);
    let data_type = output.data_type.unwrap_or_else(|| DataType::infer(&value));
    cx.vars.set(&output.id, data_type, value);
    Ok(next)
}

fn compute(operation: &CalcOperation, vars: &VariableStore) -> Value {
    match operation {
        CalcOperation::Assign { source } => source
            .as_ref()
            .and_then(|var_ref| vars.resolve_ref(var_ref))
            .unwrap_or(Value::Null),

        CalcOperation::Addition { constant, terms } => {
            let sum: f64 = terms
                .iter()
                .map(|term| term.coefficient * resolve_number(term.source.as_ref(), vars))
                .sum();
            number_value(constant + sum)
        }

        CalcOperation::Subtraction {
            minuend,
            subtrahend,
        } => number_value(
            resolve_number(minuend.as_ref(), vars) - resolve_number(subtrahend.as_ref(), vars),
        ),

        CalcOperation::Multiplication { factors } => {
            if factors.is_empty() {
                return number_value(0.0);
            }
            let product = factors
                .iter()
                .fold(1.0, |acc, factor| acc * resolve_number(Some(factor), vars));
            number_value(product)
        }

        CalcOperation::Division { dividend, divisor } => {
            let divisor = resolve_number(divisor.as_ref(), vars);
            if divisor == 0.0 {
                // Divide-by-zero yields zero rather than an error.
                return number_value(0.0);
            }
            number_value(resolve_number(dividend.as_ref(), vars) / divisor)
        }

        CalcOperation::Concat { parts } => {
            let mut out = String::new();
            for part in parts {
                match part {
                    ConcatPart::Text { value } => out.push_str(value),
                    ConcatPart::Variable { id, path } => {
                        let var_ref = VarRef {
                            id: id.clone(),
                            path: path.clone(),
                        };
                        let value = vars.resolve_ref(&var_ref).unwrap_or(Value::Null);
                        out.push_str(&display_string(&value));
                    }
                }
            }
            Value::String(out)
        }

        CalcOperation::Unknown => Value::Null,
    }
}

fn resolve_number(var_ref: Option<&VarRef>, vars: &VariableStore) -> f64 {
    let value = var_ref
        .and_then(|r| vars.resolve_ref(r))
        .unwrap_or(Value::Null);
    number_or_zero(&value)
}
