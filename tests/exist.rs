use serde_json::json;
use std::sync::Arc;

use formflow::design::{
    Design, Edge, ExistConfig, MatchRule, Node, NodeConfig, OutputPort,
};
use formflow::value::CompareOp;

mod common;
use common::*;

fn email_rule() -> MatchRule {
    MatchRule {
        source_field: Some("email".into()),
        target_field: "email".into(),
        operator: CompareOp::Eq,
    }
}

fn exist_design(cfg: ExistConfig) -> Design {
    Design::new(
        vec![
            Node::new("start", NodeConfig::Start),
            Node::new("check", NodeConfig::ExistCheck(cfg)),
            Node::new("found", NodeConfig::Start),
            Node::new("missing", NodeConfig::Start),
        ],
        vec![
            Edge::new("start", "check"),
            Edge::new("check", "found").from_port(OutputPort::Yes),
            Edge::new("check", "missing").from_port(OutputPort::No),
        ],
    )
}

async fn outcome(cfg: ExistConfig, input: serde_json::Value) -> String {
    let design = exist_design(cfg);
    let engine = engine_over(Arc::new(people_store()));
    let report = engine
        .run_design(&design, None, Some(input))
        .await
        .unwrap();
    report.visited.last().unwrap().clone()
}

#[tokio::test]
async fn matching_record_follows_the_yes_port() {
    let cfg = ExistConfig {
        source_variable: Some("$INPUT".into()),
        target_form: Some("people".into()),
        match_rules: vec![email_rule()],
    };
    assert_eq!(outcome(cfg, json!({"email": "a@x.com"})).await, "found");
}

#[tokio::test]
async fn no_match_follows_the_no_port() {
    let cfg = ExistConfig {
        source_variable: Some("$INPUT".into()),
        target_form: Some("people".into()),
        match_rules: vec![email_rule()],
    };
    assert_eq!(outcome(cfg, json!({"email": "zzz@x.com"})).await, "missing");
}

#[tokio::test]
async fn all_rules_must_hold() {
    let cfg = ExistConfig {
        source_variable: Some("$INPUT".into()),
        target_form: Some("people".into()),
        match_rules: vec![
            email_rule(),
            MatchRule {
                source_field: Some("name".into()),
                target_field: "name".into(),
                operator: CompareOp::Eq,
            },
        ],
    };
    // Email matches ada's record but the name does not.
    assert_eq!(
        outcome(
            cfg,
            json!({"email": "a@x.com", "name": "someone else"})
        )
        .await,
        "missing"
    );
}

#[tokio::test]
async fn scalar_subject_compares_wholesale() {
    let cfg = ExistConfig {
        source_variable: Some("$INPUT".into()),
        target_form: Some("people".into()),
        match_rules: vec![MatchRule {
            source_field: None,
            target_field: "name".into(),
            operator: CompareOp::Eq,
        }],
    };
    assert_eq!(outcome(cfg, json!("grace")).await, "found");
}

#[tokio::test]
async fn numeric_rule_coerces_both_sides() {
    let cfg = ExistConfig {
        source_variable: Some("$INPUT".into()),
        target_form: Some("people".into()),
        match_rules: vec![MatchRule {
            source_field: Some("age".into()),
            target_field: "age".into(),
            operator: CompareOp::Ge,
        }],
    };
    assert_eq!(outcome(cfg.clone(), json!({"age": "45"})).await, "found");
    assert_eq!(outcome(cfg, json!({"age": 1})).await, "missing");
}

#[tokio::test]
async fn missing_config_reads_as_non_existence() {
    assert_eq!(
        outcome(ExistConfig::default(), json!({"email": "a@x.com"})).await,
        "missing"
    );
    // Subject and rules but no target form.
    let cfg = ExistConfig {
        source_variable: Some("$INPUT".into()),
        target_form: None,
        match_rules: vec![email_rule()],
    };
    assert_eq!(outcome(cfg, json!({"email": "a@x.com"})).await, "missing");
}

#[tokio::test]
async fn deleted_form_reads_as_non_existence() {
    let cfg = ExistConfig {
        source_variable: Some("$INPUT".into()),
        target_form: Some("gone".into()),
        match_rules: vec![email_rule()],
    };
    assert_eq!(outcome(cfg, json!({"email": "a@x.com"})).await, "missing");
}

#[tokio::test]
async fn falls_back_to_default_edge_without_ports() {
    let cfg = ExistConfig {
        source_variable: Some("$INPUT".into()),
        target_form: Some("people".into()),
        match_rules: vec![email_rule()],
    };
    let design = Design::new(
        vec![
            Node::new("start", NodeConfig::Start),
            Node::new("check", NodeConfig::ExistCheck(cfg)),
            Node::new("after", NodeConfig::Start),
        ],
        vec![Edge::new("start", "check"), Edge::new("check", "after")],
    );
    let engine = engine_over(Arc::new(people_store()));
    let report = engine
        .run_design(&design, None, Some(json!({"email": "a@x.com"})))
        .await
        .unwrap();
    assert_eq!(report.visited.last().unwrap(), "after");
}
