use serde_json::json;
use std::sync::Arc;

use formflow::design::{
    BranchAction, BranchConfig, BranchMode, Design, Edge, EdgeLabel, Node, NodeConfig, Operand,
    VarRef,
};
use formflow::env::{RunEnv, StaticIdentity};
use formflow::value::CompareOp;

mod common;
use common::*;

fn compare_branch(left: VarRef, operator: CompareOp, right: Operand) -> BranchConfig {
    BranchConfig {
        left: Some(left),
        operator: Some(operator),
        right: Some(right),
        ..Default::default()
    }
}

/// start -> branch, with labeled true/false edges to two terminal marker
/// nodes (modeled as start-kind nodes, which just follow their default edge
/// and stop).
fn branch_design(cfg: BranchConfig) -> Design {
    Design::new(
        vec![
            Node::new("start", NodeConfig::Start),
            Node::new("branch", NodeConfig::Branch(cfg)),
            Node::new("on_true", NodeConfig::Start),
            Node::new("on_false", NodeConfig::Start),
        ],
        vec![
            Edge::new("start", "branch"),
            Edge::new("branch", "on_true").labeled(EdgeLabel::True),
            Edge::new("branch", "on_false").labeled(EdgeLabel::False),
        ],
    )
}

async fn last_visited(design: &Design, input: Option<serde_json::Value>) -> String {
    let engine = engine_over(Arc::new(people_store()));
    let report = engine.run_design(design, None, input).await.unwrap();
    report.visited.last().unwrap().clone()
}

#[tokio::test]
async fn structured_compare_routes_true() {
    let design = branch_design(compare_branch(
        VarRef::new("$INPUT"),
        CompareOp::Ge,
        Operand::Fixed { value: json!(18) },
    ));
    assert_eq!(last_visited(&design, Some(json!(21))).await, "on_true");
    assert_eq!(last_visited(&design, Some(json!(17))).await, "on_false");
}

#[tokio::test]
async fn numeric_compare_coerces_strings() {
    let design = branch_design(compare_branch(
        VarRef::new("$INPUT"),
        CompareOp::Gt,
        Operand::Fixed { value: json!("10") },
    ));
    assert_eq!(last_visited(&design, Some(json!("42"))).await, "on_true");
}

#[tokio::test]
async fn object_left_without_path_is_incomplete_and_false() {
    let design = branch_design(compare_branch(
        VarRef::new("$INPUT"),
        CompareOp::Eq,
        Operand::Fixed { value: json!(1) },
    ));
    // $INPUT is an object and the left ref has no field path: the condition
    // must resolve false rather than compare the object wholesale.
    assert_eq!(
        last_visited(&design, Some(json!({"a": 1}))).await,
        "on_false"
    );
}

#[tokio::test]
async fn object_left_with_path_compares_the_field() {
    let design = branch_design(compare_branch(
        VarRef::field("$INPUT", "age"),
        CompareOp::Lt,
        Operand::Fixed { value: json!(40) },
    ));
    assert_eq!(
        last_visited(&design, Some(json!({"age": 36}))).await,
        "on_true"
    );
}

#[tokio::test]
async fn missing_left_variable_takes_false() {
    let design = branch_design(compare_branch(
        VarRef::new("never_set"),
        CompareOp::Eq,
        Operand::Fixed { value: json!(1) },
    ));
    assert_eq!(last_visited(&design, None).await, "on_false");
}

#[tokio::test]
async fn system_right_operand_resolves_session_user() {
    let design = branch_design(compare_branch(
        VarRef::new("$INPUT"),
        CompareOp::Eq,
        Operand::System {
            token: "@USER".into(),
        },
    ));
    let engine = engine_over(Arc::new(people_store()))
        .with_env(RunEnv::default().with_identity(StaticIdentity("ada".into())));
    let report = engine
        .run_design(&design, None, Some(json!("ada")))
        .await
        .unwrap();
    assert_eq!(report.visited.last().unwrap(), "on_true");
}

#[tokio::test]
async fn explicit_target_beats_labeled_edge() {
    let mut cfg = compare_branch(
        VarRef::new("$INPUT"),
        CompareOp::Eq,
        Operand::Fixed { value: json!(1) },
    );
    cfg.true_action = Some(BranchAction::Node {
        target: "elsewhere".into(),
    });
    let mut design = branch_design(cfg);
    design.nodes.push(Node::new("elsewhere", NodeConfig::Start));
    assert_eq!(last_visited(&design, Some(json!(1))).await, "elsewhere");
}

#[tokio::test]
async fn unresolved_false_branch_terminates() {
    let cfg = compare_branch(
        VarRef::new("$INPUT"),
        CompareOp::Eq,
        Operand::Fixed { value: json!(1) },
    );
    // Only a default edge exists; false must NOT fall back to it.
    let design = Design::new(
        vec![
            Node::new("start", NodeConfig::Start),
            Node::new("branch", NodeConfig::Branch(cfg)),
            Node::new("after", NodeConfig::Start),
        ],
        vec![
            Edge::new("start", "branch"),
            Edge::new("branch", "after"),
        ],
    );
    assert_eq!(last_visited(&design, Some(json!(0))).await, "branch");
}

#[tokio::test]
async fn true_branch_falls_back_to_default_edge() {
    let cfg = compare_branch(
        VarRef::new("$INPUT"),
        CompareOp::Eq,
        Operand::Fixed { value: json!(1) },
    );
    let design = Design::new(
        vec![
            Node::new("start", NodeConfig::Start),
            Node::new("branch", NodeConfig::Branch(cfg)),
            Node::new("after", NodeConfig::Start),
        ],
        vec![
            Edge::new("start", "branch"),
            Edge::new("branch", "after"),
        ],
    );
    assert_eq!(last_visited(&design, Some(json!(1))).await, "after");
}

#[tokio::test]
async fn flow_handoff_is_terminal() {
    let mut cfg = compare_branch(
        VarRef::new("$INPUT"),
        CompareOp::Eq,
        Operand::Fixed { value: json!(1) },
    );
    cfg.true_action = Some(BranchAction::Flow {
        flow_id: "other-flow".into(),
    });
    let design = branch_design(cfg);
    assert_eq!(last_visited(&design, Some(json!(1))).await, "branch");
}

#[tokio::test]
async fn expression_mode_evaluates() {
    let cfg = BranchConfig {
        mode: BranchMode::Expression,
        expression: Some("$INPUT.age >= 18 && $INPUT.name == 'ada'".into()),
        ..Default::default()
    };
    let design = branch_design(cfg);
    assert_eq!(
        last_visited(&design, Some(json!({"age": 36, "name": "ada"}))).await,
        "on_true"
    );
    assert_eq!(
        last_visited(&design, Some(json!({"age": 12, "name": "ada"}))).await,
        "on_false"
    );
}

#[tokio::test]
async fn malformed_expression_is_logged_false() {
    let cfg = BranchConfig {
        mode: BranchMode::Expression,
        expression: Some("age > ".into()),
        ..Default::default()
    };
    let design = branch_design(cfg);
    assert_eq!(last_visited(&design, None).await, "on_false");
}

#[tokio::test]
async fn empty_branch_config_takes_false() {
    let design = branch_design(BranchConfig::default());
    assert_eq!(last_visited(&design, None).await, "on_false");
}
