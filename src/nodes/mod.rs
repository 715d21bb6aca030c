//! Node executors: one per node kind, dispatched by the walker.
//!
//! An executor is an async function of `(config, node, run context)` that may
//! call the record store, mutate the variable store, and returns the id of
//! the next node, or `None` to end the run. Side effects are limited to
//! exactly those two surfaces plus the collaborators in
//! [`RunEnv`](crate::env::RunEnv).
//!
//! All executors share the engine's fail-soft policy: an empty or
//! half-edited configuration degrades to a conservative default (false
//! conditions, empty reads, skipped writes) with a logged warning, and never
//! fails the run. Only record-store I/O failures and walker-level errors
//! propagate.

pub mod aggregate;
pub mod alert;
pub mod branch;
pub mod calculate;
pub mod exist;
pub mod jump;
pub mod read;
pub mod write;

use crate::design::{BranchAction, Design, EdgeLabel, Node, NodeConfig};
use crate::env::RunEnv;
use crate::runner::{BatchWriteReport, RunnerError};
use crate::store::RecordStore;
use crate::variables::VariableStore;

/// Everything an executor sees of the run in progress.
///
/// One context is constructed per step; the variable store and the batch
/// report list are the only mutable surfaces.
pub struct RunContext<'a> {
    pub design: &'a Design,
    pub vars: &'a mut VariableStore,
    pub store: &'a dyn RecordStore,
    pub env: &'a RunEnv,
    pub step: u64,
    pub batch_reports: &'a mut Vec<BatchWriteReport>,
}

/// Execute one node and resolve the id of the next.
pub async fn execute(node: &Node, cx: &mut RunContext<'_>) -> Result<Option<String>, RunnerError> {
    match &node.config {
        NodeConfig::Start => Ok(cx.design.default_target(&node.id).map(String::from)),
        NodeConfig::Read(cfg) => read::run(cfg, node, cx).await,
        NodeConfig::Write(cfg) => write::run(cfg, node, cx).await,
        NodeConfig::Branch(cfg) => branch::run(cfg, node, cx).await,
        NodeConfig::ExistCheck(cfg) => exist::run(cfg, node, cx).await,
        NodeConfig::Calculate(cfg) => calculate::run(cfg, node, cx).await,
        NodeConfig::Aggregate(cfg) => aggregate::run(cfg, node, cx).await,
        NodeConfig::Alert(cfg) => alert::run(cfg, node, cx).await,
        NodeConfig::Jump(cfg) => jump::run(cfg, node, cx).await,
    }
}

/// Resolve a branch-style outcome to the next node.
///
/// Precedence: an explicit config-level action always wins over edge-derived
/// targets; a flow handoff is terminal from this engine's perspective. With
/// no action, the edge carrying the outcome's label is followed, then (for
/// the positive outcome only) the node's default edge. An unresolved
/// negative outcome terminates the run rather than guessing.
pub(crate) fn resolve_outcome(
    design: &Design,
    node_id: &str,
    action: Option<&BranchAction>,
    label: EdgeLabel,
    fall_back_to_default: bool,
) -> Option<String> {
    match action {
        Some(BranchAction::Node { target }) if !target.is_empty() => {
            return Some(target.clone());
        }
        Some(BranchAction::Flow { flow_id }) => {
            tracing::debug!(node = node_id, flow = %flow_id, "flow handoff; ending run");
            return None;
        }
        _ => {}
    }
    if let Some(target) = design.labeled_target(node_id, label) {
        return Some(target.to_string());
    }
    if fall_back_to_default {
        return design.default_target(node_id).map(String::from);
    }
    None
}
