use serde_json::json;
use std::sync::Arc;

use formflow::design::{
    CalcOperation, CalculateConfig, ConcatPart, Design, Node, NodeConfig, OutputBinding, Term,
    VarRef,
};
use formflow::runner::RunReport;

mod common;
use common::*;

fn calc_node(operation: CalcOperation) -> Node {
    Node::new(
        "calc",
        NodeConfig::Calculate(CalculateConfig {
            operation: Some(operation),
            output: Some(OutputBinding::new("result")),
        }),
    )
}

async fn run(design: &Design, input: Option<serde_json::Value>) -> RunReport {
    let engine = engine_over(Arc::new(people_store()));
    engine.run_design(design, None, input).await.unwrap()
}

#[tokio::test]
async fn addition_applies_constant_and_weighted_terms() {
    // constant 10, one term 2 * v1 where v1 = $INPUT = 5 -> 20
    let design = start_then(calc_node(CalcOperation::Addition {
        constant: 10.0,
        terms: vec![Term {
            coefficient: 2.0,
            source: Some(VarRef::new("$INPUT")),
        }],
    }));
    let report = run(&design, Some(json!(5))).await;
    assert_eq!(report.variables.value("result"), Some(&json!(20)));
}

#[tokio::test]
async fn addition_accepts_negative_coefficients() {
    let design = start_then(calc_node(CalcOperation::Addition {
        constant: 0.0,
        terms: vec![Term {
            coefficient: -3.0,
            source: Some(VarRef::new("$INPUT")),
        }],
    }));
    let report = run(&design, Some(json!(4))).await;
    assert_eq!(report.variables.value("result"), Some(&json!(-12)));
}

#[tokio::test]
async fn division_by_zero_yields_zero() {
    let design = start_then(calc_node(CalcOperation::Division {
        dividend: Some(VarRef::new("$INPUT")),
        divisor: Some(VarRef::new("never_set")),
    }));
    let report = run(&design, Some(json!(10))).await;
    assert_eq!(report.variables.value("result"), Some(&json!(0)));
}

#[tokio::test]
async fn division_of_configured_operands() {
    let design = start_then(calc_node(CalcOperation::Division {
        dividend: Some(VarRef::field("$INPUT", "a")),
        divisor: Some(VarRef::field("$INPUT", "b")),
    }));
    let report = run(&design, Some(json!({"a": 9, "b": 2}))).await;
    assert_eq!(report.variables.value("result"), Some(&json!(4.5)));
}

#[tokio::test]
async fn subtraction_and_multiplication() {
    let design = start_then(calc_node(CalcOperation::Subtraction {
        minuend: Some(VarRef::field("$INPUT", "a")),
        subtrahend: Some(VarRef::field("$INPUT", "b")),
    }));
    let report = run(&design, Some(json!({"a": 7, "b": 10}))).await;
    assert_eq!(report.variables.value("result"), Some(&json!(-3)));

    let design = start_then(calc_node(CalcOperation::Multiplication {
        factors: vec![VarRef::field("$INPUT", "a"), VarRef::field("$INPUT", "b")],
    }));
    let report = run(&design, Some(json!({"a": 6, "b": 7}))).await;
    assert_eq!(report.variables.value("result"), Some(&json!(42)));
}

#[tokio::test]
async fn non_numeric_operands_collapse_to_zero() {
    let design = start_then(calc_node(CalcOperation::Addition {
        constant: 1.0,
        terms: vec![Term {
            coefficient: 5.0,
            source: Some(VarRef::new("$INPUT")),
        }],
    }));
    let report = run(&design, Some(json!("not a number"))).await;
    assert_eq!(report.variables.value("result"), Some(&json!(1)));
}

#[tokio::test]
async fn assign_projects_a_field() {
    let design = start_then(calc_node(CalcOperation::Assign {
        source: Some(VarRef::field("$INPUT", "name")),
    }));
    let report = run(&design, Some(json!({"name": "ada"}))).await;
    assert_eq!(report.variables.value("result"), Some(&json!("ada")));
}

#[tokio::test]
async fn concat_stringifies_and_renders_null_empty() {
    let design = start_then(calc_node(CalcOperation::Concat {
        parts: vec![
            ConcatPart::Text {
                value: "user: ".into(),
            },
            ConcatPart::Variable {
                id: "$INPUT".into(),
                path: Some("name".into()),
            },
            ConcatPart::Text { value: " #".into() },
            ConcatPart::Variable {
                id: "$INPUT".into(),
                path: Some("rank".into()),
            },
            ConcatPart::Variable {
                id: "never_set".into(),
                path: None,
            },
        ],
    }));
    let report = run(&design, Some(json!({"name": "ada", "rank": 7}))).await;
    assert_eq!(report.variables.value("result"), Some(&json!("user: ada #7")));
}

#[tokio::test]
async fn unknown_operation_leaves_output_unset() {
    // An operation kind saved by a newer editor deserializes to Unknown.
    let node: Node = serde_json::from_value(json!({
        "id": "calc",
        "kind": "calculate",
        "operation": {"op": "modulo"},
        "output": {"id": "result"}
    }))
    .unwrap();
    let design = start_then(node);
    let report = run(&design, None).await;
    assert!(report.variables.value("result").is_none());
}

#[tokio::test]
async fn output_id_is_stable_across_reruns() {
    let design = start_then(calc_node(CalcOperation::Assign {
        source: Some(VarRef::new("$INPUT")),
    }));
    let report = run(&design, Some(json!(1))).await;
    assert_eq!(report.variables.get("result").unwrap().id, "result");
    let report = run(&design, Some(json!(2))).await;
    assert_eq!(report.variables.value("result"), Some(&json!(2)));
}

#[tokio::test]
async fn empty_config_is_a_noop() {
    let design = start_then(Node::new(
        "calc",
        NodeConfig::Calculate(CalculateConfig::default()),
    ));
    let report = run(&design, None).await;
    assert!(report.variables.is_empty());
}
